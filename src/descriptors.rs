//! Component descriptors for introspection and diagnostics.

use crate::definition::{ComponentDefinition, Dependency};
use crate::key::TypeKey;
use crate::lifetime::ScopePolicy;
use crate::registration::{RegistrationSource, Registry};

/// Component descriptor for introspection and diagnostics
///
/// A detached snapshot of one registered definition: what it is, how it is
/// scoped, what it can be looked up by and what it needs.
///
/// # Examples
///
/// ```rust
/// use ferrous_ioc::{ComponentCollection, ComponentDefinition, Dependency, ScopePolicy};
/// use std::sync::Arc;
///
/// trait Policy: Send + Sync {}
/// struct Rate;
/// impl Policy for Rate {}
/// struct Orders;
///
/// let mut components = ComponentCollection::new();
/// components
///     .register(ComponentDefinition::builder::<Rate>("rateDiscountPolicy")
///         .exposes(|r| r as Arc<dyn Policy>)
///         .qualifier("mainDiscountPolicy")
///         .factory(|_| Ok(Rate)))
///     .unwrap()
///     .register(ComponentDefinition::builder::<Orders>("orderService")
///         .depends_on(Dependency::on::<dyn Policy>())
///         .factory(|_| Ok(Orders)))
///     .unwrap();
///
/// let descriptors = components.descriptors();
/// let rate = descriptors.iter().find(|d| d.id == "rateDiscountPolicy").unwrap();
/// assert_eq!(rate.scope, ScopePolicy::Singleton);
/// assert_eq!(rate.qualifier.as_deref(), Some("mainDiscountPolicy"));
/// assert!(rate.type_name().ends_with("Rate"));
/// assert_eq!(rate.exposed_types.len(), 2);
///
/// let orders = descriptors.iter().find(|d| d.id == "orderService").unwrap();
/// assert_eq!(orders.dependencies.len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct ComponentDescriptor {
    /// Component id
    pub id: String,
    /// Concrete type produced by the factory
    pub implementation_type: TypeKey,
    /// Every type the component can be looked up by, the concrete type first
    pub exposed_types: Vec<TypeKey>,
    pub scope: ScopePolicy,
    pub primary: bool,
    pub qualifier: Option<String>,
    pub source: RegistrationSource,
    /// Constructor dependencies followed by setter dependencies
    pub dependencies: Vec<Dependency>,
    pub has_init_hook: bool,
    pub has_destroy_hook: bool,
}

impl ComponentDescriptor {
    pub(crate) fn describe(def: &ComponentDefinition, registry: &Registry) -> Self {
        Self {
            id: def.id().to_string(),
            implementation_type: def.implementation_type(),
            exposed_types: def.exposed_types(),
            scope: def.scope().clone(),
            primary: def.is_primary(),
            qualifier: def.qualifier().map(str::to_string),
            source: registry.source_of(def.id()).unwrap_or(RegistrationSource::Manual),
            dependencies: def.all_dependencies().cloned().collect(),
            has_init_hook: def.has_init_hook(),
            has_destroy_hook: def.has_destroy_hook(),
        }
    }

    /// Human-readable name of the implementation type.
    pub fn type_name(&self) -> &'static str {
        self.implementation_type.display_name()
    }

    pub fn is_qualified(&self) -> bool {
        self.qualifier.is_some()
    }

    pub fn exposes(&self, key: &TypeKey) -> bool {
        self.exposed_types.contains(key)
    }
}
