//! Deferred handles: scoped proxies and object providers.
//!
//! Both are resolved at call time instead of construction time, which is
//! what lets a long-lived consumer hold on to a shorter-lived dependency.
//! They keep only a weak reference to the container; once the container is
//! gone every call fails with [`DiError::ContainerClosed`].

use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, Weak};

use crate::definition::{unwrap_exposed, ComponentDefinition};
use crate::error::{DiError, DiResult};
use crate::key::TypeKey;
use crate::lifetime::ScopePolicy;
use crate::provider::{ComponentSet, ContainerInner, ScopeContext, Site};

pub(crate) struct ProxyTarget {
    container: Weak<ContainerInner>,
    id: String,
    scope: ScopePolicy,
    key: TypeKey,
}

impl ProxyTarget {
    pub(crate) fn new(container: Weak<ContainerInner>, def: &ComponentDefinition, key: TypeKey) -> Self {
        Self {
            container,
            id: def.id().to_string(),
            scope: def.scope().clone(),
            key,
        }
    }

    fn container(&self) -> DiResult<Arc<ContainerInner>> {
        self.container.upgrade().ok_or(DiError::ContainerClosed)
    }
}

/// Handle to a component bound by id, resolved against the currently active
/// context on every call.
///
/// Injected for [`Dependency::scoped_proxy`](crate::Dependency::scoped_proxy)
/// dependencies. A singleton holding a proxy to a request-scoped component
/// sees a different instance in each request context, and
/// [`DiError::NoActiveScope`] when called outside of one.
///
/// # Examples
///
/// ```rust
/// use ferrous_ioc::{ComponentCollection, ComponentDefinition, Dependency, DiError, Resolver, ScopedProxy};
/// use std::sync::Arc;
///
/// struct RequestLog { id: u64 }
/// struct Service { log: ScopedProxy<RequestLog> }
///
/// let mut components = ComponentCollection::new();
/// let next = std::sync::atomic::AtomicU64::new(0);
/// components
///     .register(ComponentDefinition::builder::<RequestLog>("requestLog")
///         .custom_scope("request")
///         .factory(move |_| Ok(RequestLog {
///             id: next.fetch_add(1, std::sync::atomic::Ordering::SeqCst),
///         })))
///     .unwrap()
///     .register(ComponentDefinition::builder::<Service>("service")
///         .depends_on(Dependency::scoped_proxy::<RequestLog>())
///         .factory(|args| Ok(Service { log: args.scoped_proxy(0)? })))
///     .unwrap();
/// let container = components.open().unwrap();
///
/// let service = container.get::<Service>().unwrap();
/// assert!(matches!(service.log.get(), Err(DiError::NoActiveScope { .. })));
///
/// let first = container.enter_scope("request").unwrap();
/// let a = service.log.get().unwrap().id;
/// first.close();
///
/// let second = container.enter_scope("request").unwrap();
/// let b = service.log.get().unwrap().id;
/// second.close();
/// assert_ne!(a, b);
/// ```
pub struct ScopedProxy<T: ?Sized> {
    target: Arc<ProxyTarget>,
    _marker: PhantomData<fn() -> Arc<T>>,
}

impl<T: ?Sized + Send + Sync + 'static> ScopedProxy<T> {
    pub(crate) fn new(target: Arc<ProxyTarget>) -> Self {
        Self {
            target,
            _marker: PhantomData,
        }
    }

    /// Resolves the target in the context active on this thread.
    pub fn get(&self) -> DiResult<Arc<T>> {
        self.resolve(Site::thread())
    }

    /// Resolves the target in `context`, whether or not it is attached here.
    pub fn get_in(&self, context: &ScopeContext) -> DiResult<Arc<T>> {
        self.resolve(Site::within(context.inner()))
    }

    fn resolve(&self, site: Site<'_>) -> DiResult<Arc<T>> {
        let container = self.target.container()?;
        let exposed = container.resolve_id(&self.target.id, &self.target.key, site)?;
        unwrap_exposed::<T>(&exposed).ok_or_else(|| DiError::TypeMismatch {
            id: self.target.id.clone(),
            expected: self.target.key.display_name(),
        })
    }

    /// Id of the component this proxy forwards to.
    pub fn target_id(&self) -> &str {
        &self.target.id
    }

    pub fn scope(&self) -> &ScopePolicy {
        &self.target.scope
    }
}

impl<T: ?Sized> Clone for ScopedProxy<T> {
    fn clone(&self) -> Self {
        Self {
            target: self.target.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: ?Sized> fmt::Debug for ScopedProxy<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopedProxy")
            .field("target", &self.target.id)
            .field("scope", &self.target.scope)
            .finish()
    }
}

pub(crate) struct LookupTarget {
    container: Weak<ContainerInner>,
    key: TypeKey,
    qualifier: Option<String>,
}

impl LookupTarget {
    pub(crate) fn new(container: Weak<ContainerInner>, key: TypeKey, qualifier: Option<String>) -> Self {
        Self {
            container,
            key,
            qualifier,
        }
    }
}

/// Lookup handle performing a fresh by-type resolution on each call.
///
/// Injected for [`Dependency::provider`](crate::Dependency::provider). With a
/// Prototype target every [`get`](Self::get) builds a new instance, which is
/// how a singleton obtains fresh prototypes over its lifetime.
///
/// ```rust
/// use ferrous_ioc::{ComponentCollection, ComponentDefinition, Dependency, ObjectProvider, Resolver};
/// use std::sync::Arc;
///
/// struct PrototypeBean;
/// struct ClientBean { beans: ObjectProvider<PrototypeBean> }
///
/// let mut components = ComponentCollection::new();
/// components
///     .register(ComponentDefinition::builder::<PrototypeBean>("prototypeBean")
///         .prototype()
///         .factory(|_| Ok(PrototypeBean)))
///     .unwrap()
///     .register(ComponentDefinition::builder::<ClientBean>("clientBean")
///         .depends_on(Dependency::provider::<PrototypeBean>())
///         .factory(|args| Ok(ClientBean { beans: args.provider(0)? })))
///     .unwrap();
/// let container = components.open().unwrap();
///
/// let client = container.get::<ClientBean>().unwrap();
/// let a = client.beans.get().unwrap();
/// let b = client.beans.get().unwrap();
/// assert!(!Arc::ptr_eq(&a, &b));
/// ```
pub struct ObjectProvider<T: ?Sized> {
    target: Arc<LookupTarget>,
    _marker: PhantomData<fn() -> Arc<T>>,
}

impl<T: ?Sized + Send + Sync + 'static> ObjectProvider<T> {
    pub(crate) fn new(target: Arc<LookupTarget>) -> Self {
        Self {
            target,
            _marker: PhantomData,
        }
    }

    /// Resolves the single matching component.
    pub fn get(&self) -> DiResult<Arc<T>> {
        let container = self.target.container.upgrade().ok_or(DiError::ContainerClosed)?;
        let exposed = container.resolve_type(&self.target.key, self.target.qualifier.as_deref(), Site::thread())?;
        unwrap_exposed::<T>(&exposed).ok_or_else(|| DiError::TypeMismatch {
            id: self.target.key.display_name().to_string(),
            expected: self.target.key.display_name(),
        })
    }

    /// Like [`get`](Self::get), but `Ok(None)` when nothing matches.
    pub fn get_if_available(&self) -> DiResult<Option<Arc<T>>> {
        match self.get() {
            Ok(value) => Ok(Some(value)),
            Err(DiError::NoSuchComponent { .. }) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Every matching component in registration order.
    pub fn get_all(&self) -> DiResult<ComponentSet<T>> {
        let container = self.target.container.upgrade().ok_or(DiError::ContainerClosed)?;
        let entries = container.resolve_all(&self.target.key, Site::thread())?;
        crate::provider::typed_set::<T>(entries, &self.target.key)
    }

    pub fn qualifier(&self) -> Option<&str> {
        self.target.qualifier.as_deref()
    }
}

impl<T: ?Sized> Clone for ObjectProvider<T> {
    fn clone(&self) -> Self {
        Self {
            target: self.target.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: ?Sized> fmt::Debug for ObjectProvider<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectProvider")
            .field("type", &self.target.key)
            .field("qualifier", &self.target.qualifier)
            .finish()
    }
}
