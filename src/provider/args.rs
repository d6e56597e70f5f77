//! Constructor arguments handed to factories.

use std::any::type_name;
use std::collections::HashMap;
use std::sync::Arc;

use crate::definition::{unwrap_exposed, AnyArc};
use crate::error::{DiError, DiResult};
use crate::proxy::{LookupTarget, ObjectProvider, ProxyTarget, ScopedProxy};

use super::ComponentSet;

pub(crate) enum ResolvedArg {
    Instance(AnyArc),
    Absent,
    Collection(Vec<(String, AnyArc)>),
    Proxy(Arc<ProxyTarget>),
    Lookup(Arc<LookupTarget>),
}

impl ResolvedArg {
    pub(crate) fn into_instance(self) -> Option<AnyArc> {
        match self {
            ResolvedArg::Instance(value) => Some(value),
            _ => None,
        }
    }
}

/// Resolved constructor arguments, one slot per declared dependency.
///
/// Slot `i` holds the value for the `i`-th [`depends_on`](crate::DefinitionBuilder::depends_on)
/// call. Each slot must be read with the accessor matching its
/// [`DependencyKind`](crate::DependencyKind); any other accessor returns
/// [`DiError::ArgumentMismatch`]. Errors convert into the factory's error
/// type with `?` and keep their kind.
///
/// # Examples
///
/// ```rust
/// use ferrous_ioc::{ComponentCollection, ComponentDefinition, Dependency, Resolver};
/// use std::sync::Arc;
///
/// struct Clock;
/// struct Audit;
/// struct Service { clock: Arc<Clock>, audit: Option<Arc<Audit>> }
///
/// let mut components = ComponentCollection::new();
/// components
///     .register(ComponentDefinition::builder::<Clock>("clock").factory(|_| Ok(Clock)))
///     .unwrap()
///     .register(ComponentDefinition::builder::<Service>("service")
///         .depends_on(Dependency::on::<Clock>())
///         .depends_on(Dependency::optional::<Audit>())
///         .factory(|args| Ok(Service {
///             clock: args.required(0)?,
///             audit: args.optional(1)?,
///         })))
///     .unwrap();
///
/// let service = components.open().unwrap().get::<Service>().unwrap();
/// assert!(service.audit.is_none());
/// ```
pub struct ResolvedArgs {
    component: String,
    args: Vec<ResolvedArg>,
}

impl ResolvedArgs {
    pub(crate) fn new(component: &str, args: Vec<ResolvedArg>) -> Self {
        Self {
            component: component.to_string(),
            args,
        }
    }

    #[cfg(test)]
    pub(crate) fn empty(component: &str) -> Self {
        Self::new(component, Vec::new())
    }

    /// Id of the component being constructed.
    pub fn component(&self) -> &str {
        &self.component
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    fn slot(&self, index: usize, expected: &'static str) -> DiResult<&ResolvedArg> {
        self.args
            .get(index)
            .ok_or(DiError::ArgumentMismatch { index, expected })
    }

    fn unwrap<T: ?Sized + 'static>(&self, value: &AnyArc) -> DiResult<Arc<T>> {
        unwrap_exposed::<T>(value).ok_or_else(|| DiError::TypeMismatch {
            id: self.component.clone(),
            expected: type_name::<T>(),
        })
    }

    fn entries<T: ?Sized + 'static>(&self, index: usize, expected: &'static str) -> DiResult<Vec<(String, Arc<T>)>> {
        match self.slot(index, expected)? {
            ResolvedArg::Collection(entries) => entries
                .iter()
                .map(|(id, value)| Ok((id.clone(), self.unwrap::<T>(value)?)))
                .collect(),
            _ => Err(DiError::ArgumentMismatch { index, expected }),
        }
    }

    /// Value of a [`Dependency::on`](crate::Dependency::on) slot.
    pub fn required<T: ?Sized + Send + Sync + 'static>(&self, index: usize) -> DiResult<Arc<T>> {
        match self.slot(index, "required")? {
            ResolvedArg::Instance(value) => self.unwrap::<T>(value),
            ResolvedArg::Absent => Err(DiError::MissingDependency {
                required: type_name::<T>().to_string(),
                path: vec![self.component.clone()],
            }),
            _ => Err(DiError::ArgumentMismatch { index, expected: "required" }),
        }
    }

    /// Value of a [`Dependency::optional`](crate::Dependency::optional) slot.
    pub fn optional<T: ?Sized + Send + Sync + 'static>(&self, index: usize) -> DiResult<Option<Arc<T>>> {
        match self.slot(index, "optional")? {
            ResolvedArg::Instance(value) => self.unwrap::<T>(value).map(Some),
            ResolvedArg::Absent => Ok(None),
            _ => Err(DiError::ArgumentMismatch { index, expected: "optional" }),
        }
    }

    /// Ordered values of a [`Dependency::list_of`](crate::Dependency::list_of) slot.
    pub fn list<T: ?Sized + Send + Sync + 'static>(&self, index: usize) -> DiResult<Vec<Arc<T>>> {
        Ok(self
            .entries::<T>(index, "list")?
            .into_iter()
            .map(|(_, value)| value)
            .collect())
    }

    /// Id-keyed values of a [`Dependency::map_of`](crate::Dependency::map_of) slot.
    pub fn map<T: ?Sized + Send + Sync + 'static>(&self, index: usize) -> DiResult<HashMap<String, Arc<T>>> {
        Ok(self.entries::<T>(index, "map")?.into_iter().collect())
    }

    /// Either collection slot with ids and registration order kept.
    pub fn components<T: ?Sized + Send + Sync + 'static>(&self, index: usize) -> DiResult<ComponentSet<T>> {
        Ok(ComponentSet::from_entries(self.entries::<T>(index, "collection")?))
    }

    /// Handle for a [`Dependency::scoped_proxy`](crate::Dependency::scoped_proxy) slot.
    pub fn scoped_proxy<T: ?Sized + Send + Sync + 'static>(&self, index: usize) -> DiResult<ScopedProxy<T>> {
        match self.slot(index, "scoped proxy")? {
            ResolvedArg::Proxy(target) => Ok(ScopedProxy::new(target.clone())),
            _ => Err(DiError::ArgumentMismatch { index, expected: "scoped proxy" }),
        }
    }

    /// Handle for a [`Dependency::provider`](crate::Dependency::provider) slot.
    pub fn provider<T: ?Sized + Send + Sync + 'static>(&self, index: usize) -> DiResult<ObjectProvider<T>> {
        match self.slot(index, "provider")? {
            ResolvedArg::Lookup(target) => Ok(ObjectProvider::new(target.clone())),
            _ => Err(DiError::ArgumentMismatch { index, expected: "provider" }),
        }
    }
}
