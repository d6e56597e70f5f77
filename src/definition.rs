//! Component definitions: the recipe the container builds instances from.

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use tracing::warn;

use crate::error::BoxError;
use crate::key::TypeKey;
use crate::lifetime::ScopePolicy;
use crate::provider::ResolvedArgs;
use crate::traits::{Dispose, Initialize};

/// Type-erased `Arc` used for instance storage.
///
/// Instances are stored as the concrete `Arc<C>`; values handed across the
/// resolver boundary are *exposed* values, i.e. an `Arc<I>` boxed once more
/// into `Arc<dyn Any>` for the requested type `I`.
pub type AnyArc = Arc<dyn Any + Send + Sync>;

pub(crate) type FactoryFn = Arc<dyn Fn(&ResolvedArgs) -> Result<AnyArc, BoxError> + Send + Sync>;
pub(crate) type InitFn = Arc<dyn Fn(&AnyArc) -> Result<(), BoxError> + Send + Sync>;
pub(crate) type DestroyFn = Arc<dyn Fn(&AnyArc) + Send + Sync>;
type CastFn = Arc<dyn Fn(&AnyArc) -> Option<AnyArc> + Send + Sync>;
type SetterFn = Arc<dyn Fn(&AnyArc, Option<&AnyArc>) -> Result<(), BoxError> + Send + Sync>;

/// Recovers an `Arc<T>` from an exposed value.
#[inline]
pub(crate) fn unwrap_exposed<T: ?Sized + 'static>(value: &AnyArc) -> Option<Arc<T>> {
    value.downcast_ref::<Arc<T>>().cloned()
}

/// How a declared dependency is satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DependencyKind {
    /// Exactly one instance; missing candidates are an error
    Single,
    /// At most one instance; missing candidates resolve to `None`
    Optional,
    /// Every candidate keyed by component id
    Map,
    /// Every candidate in registration order
    List,
    /// A [`ScopedProxy`](crate::ScopedProxy) bound to the selected candidate, resolved at call time
    ScopedProxy,
    /// An [`ObjectProvider`](crate::ObjectProvider) performing a fresh lookup on each call
    Provider,
}

impl DependencyKind {
    /// Whether an empty candidate set is acceptable for this kind.
    pub fn allows_absent(&self) -> bool {
        !matches!(self, DependencyKind::Single | DependencyKind::ScopedProxy)
    }

    /// Whether the edge is resolved at call time rather than construction time.
    pub fn is_deferred(&self) -> bool {
        matches!(self, DependencyKind::ScopedProxy | DependencyKind::Provider)
    }
}

/// A declared dependency: requested type, optional qualifier and kind.
///
/// # Examples
///
/// ```rust
/// use ferrous_ioc::{Dependency, DependencyKind};
///
/// trait DiscountPolicy: Send + Sync {}
///
/// let dep = Dependency::on::<dyn DiscountPolicy>().qualified("rate");
/// assert_eq!(dep.kind(), DependencyKind::Single);
/// assert_eq!(dep.qualifier(), Some("rate"));
///
/// let all = Dependency::list_of::<dyn DiscountPolicy>();
/// assert!(all.kind().allows_absent());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    key: TypeKey,
    qualifier: Option<String>,
    kind: DependencyKind,
}

impl Dependency {
    fn new(key: TypeKey, kind: DependencyKind) -> Self {
        Self { key, qualifier: None, kind }
    }

    /// Required single instance of `T`.
    pub fn on<T: ?Sized + 'static>() -> Self {
        Self::new(TypeKey::of::<T>(), DependencyKind::Single)
    }

    /// Single instance of `T`, or absent.
    pub fn optional<T: ?Sized + 'static>() -> Self {
        Self::new(TypeKey::of::<T>(), DependencyKind::Optional)
    }

    /// All instances of `T` keyed by component id.
    pub fn map_of<T: ?Sized + 'static>() -> Self {
        Self::new(TypeKey::of::<T>(), DependencyKind::Map)
    }

    /// All instances of `T` in registration order.
    pub fn list_of<T: ?Sized + 'static>() -> Self {
        Self::new(TypeKey::of::<T>(), DependencyKind::List)
    }

    /// Deferred handle to the single candidate for `T`.
    pub fn scoped_proxy<T: ?Sized + 'static>() -> Self {
        Self::new(TypeKey::of::<T>(), DependencyKind::ScopedProxy)
    }

    /// Lookup handle for `T`.
    pub fn provider<T: ?Sized + 'static>() -> Self {
        Self::new(TypeKey::of::<T>(), DependencyKind::Provider)
    }

    /// Narrows candidates to those tagged (or named) `qualifier`.
    pub fn qualified(mut self, qualifier: impl Into<String>) -> Self {
        self.qualifier = Some(qualifier.into());
        self
    }

    pub fn key(&self) -> TypeKey {
        self.key
    }

    pub fn qualifier(&self) -> Option<&str> {
        self.qualifier.as_deref()
    }

    pub fn kind(&self) -> DependencyKind {
        self.kind
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.qualifier {
            Some(q) => write!(f, "{} @{}", self.key, q),
            None => write!(f, "{}", self.key),
        }
    }
}

#[derive(Clone)]
struct Exposure {
    key: TypeKey,
    cast: CastFn,
}

#[derive(Clone)]
pub(crate) struct Setter {
    pub(crate) dependency: Dependency,
    apply: SetterFn,
}

impl Setter {
    pub(crate) fn apply(&self, instance: &AnyArc, value: Option<&AnyArc>) -> Result<(), BoxError> {
        (self.apply)(instance, value)
    }
}

/// A named, typed recipe for producing an instance plus its metadata.
///
/// Built with [`ComponentDefinition::builder`]. The id must be unique within
/// a [`ComponentCollection`](crate::ComponentCollection).
///
/// # Examples
///
/// ```rust
/// use ferrous_ioc::{ComponentDefinition, Dependency, ScopePolicy};
/// use std::sync::Arc;
///
/// trait Repository: Send + Sync {}
/// struct MemoryRepository;
/// impl Repository for MemoryRepository {}
///
/// struct MemberService {
///     repository: Arc<dyn Repository>,
/// }
///
/// let repository = ComponentDefinition::builder::<MemoryRepository>("memberRepository")
///     .exposes(|r| r as Arc<dyn Repository>)
///     .factory(|_| Ok(MemoryRepository));
///
/// let service = ComponentDefinition::builder::<MemberService>("memberService")
///     .depends_on(Dependency::on::<dyn Repository>())
///     .factory(|args| Ok(MemberService { repository: args.required(0)? }));
///
/// assert_eq!(repository.id(), "memberRepository");
/// assert_eq!(service.scope(), &ScopePolicy::Singleton);
/// assert_eq!(service.dependencies().len(), 1);
/// ```
pub struct ComponentDefinition {
    pub(crate) id: String,
    pub(crate) implementation: TypeKey,
    exposures: Vec<Exposure>,
    pub(crate) dependencies: Vec<Dependency>,
    pub(crate) setters: Vec<Setter>,
    pub(crate) scope: ScopePolicy,
    pub(crate) primary: bool,
    pub(crate) qualifier: Option<String>,
    pub(crate) init: Option<InitFn>,
    pub(crate) destroy: Option<DestroyFn>,
    pub(crate) factory: FactoryFn,
}

impl ComponentDefinition {
    /// Starts a definition for component type `C` under `id`.
    ///
    /// The definition is Singleton-scoped and exposes `C` itself until told
    /// otherwise.
    pub fn builder<C: Send + Sync + 'static>(id: impl Into<String>) -> DefinitionBuilder<C> {
        DefinitionBuilder::new(id.into())
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn scope(&self) -> &ScopePolicy {
        &self.scope
    }

    pub fn is_primary(&self) -> bool {
        self.primary
    }

    pub fn qualifier(&self) -> Option<&str> {
        self.qualifier.as_deref()
    }

    /// Constructor dependencies in declaration order.
    pub fn dependencies(&self) -> &[Dependency] {
        &self.dependencies
    }

    /// Optional dependencies applied by setters after construction.
    pub fn setter_dependencies(&self) -> impl Iterator<Item = &Dependency> {
        self.setters.iter().map(|s| &s.dependency)
    }

    /// Constructor and setter dependencies together.
    pub(crate) fn all_dependencies(&self) -> impl Iterator<Item = &Dependency> {
        self.dependencies.iter().chain(self.setter_dependencies())
    }

    /// Concrete type produced by the factory.
    pub fn implementation_type(&self) -> TypeKey {
        self.implementation
    }

    /// Every type this component can be looked up by.
    pub fn exposed_types(&self) -> Vec<TypeKey> {
        self.exposures.iter().map(|e| e.key).collect()
    }

    pub fn exposes(&self, key: &TypeKey) -> bool {
        self.exposures.iter().any(|e| &e.key == key)
    }

    /// A qualifier matches the tag, or the id itself.
    pub fn matches_qualifier(&self, qualifier: &str) -> bool {
        self.qualifier.as_deref() == Some(qualifier) || self.id == qualifier
    }

    pub fn has_init_hook(&self) -> bool {
        self.init.is_some()
    }

    pub fn has_destroy_hook(&self) -> bool {
        self.destroy.is_some()
    }

    /// Converts a stored instance into the exposed value for `key`.
    pub(crate) fn cast(&self, instance: &AnyArc, key: &TypeKey) -> Option<AnyArc> {
        self.exposures
            .iter()
            .find(|e| &e.key == key)
            .and_then(|e| (e.cast)(instance))
    }
}

impl fmt::Debug for ComponentDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentDefinition")
            .field("id", &self.id)
            .field("implementation", &self.implementation)
            .field("exposes", &self.exposed_types())
            .field("dependencies", &self.dependencies)
            .field("scope", &self.scope)
            .field("primary", &self.primary)
            .field("qualifier", &self.qualifier)
            .finish()
    }
}

/// Fluent builder for [`ComponentDefinition`].
///
/// Finished with [`factory`](Self::factory) or [`instance`](Self::instance).
pub struct DefinitionBuilder<C> {
    id: String,
    scope: ScopePolicy,
    primary: bool,
    qualifier: Option<String>,
    dependencies: Vec<Dependency>,
    exposures: Vec<Exposure>,
    setters: Vec<Setter>,
    init: Option<InitFn>,
    destroy: Option<DestroyFn>,
    _marker: PhantomData<fn() -> C>,
}

impl<C: Send + Sync + 'static> DefinitionBuilder<C> {
    fn new(id: String) -> Self {
        let own: CastFn = Arc::new(|instance: &AnyArc| {
            instance
                .clone()
                .downcast::<C>()
                .ok()
                .map(|c| Arc::new(c) as AnyArc)
        });
        Self {
            id,
            scope: ScopePolicy::Singleton,
            primary: false,
            qualifier: None,
            dependencies: Vec::new(),
            exposures: vec![Exposure { key: TypeKey::of::<C>(), cast: own }],
            setters: Vec::new(),
            init: None,
            destroy: None,
            _marker: PhantomData,
        }
    }

    pub fn scope(mut self, scope: ScopePolicy) -> Self {
        self.scope = scope;
        self
    }

    pub fn prototype(self) -> Self {
        self.scope(ScopePolicy::Prototype)
    }

    pub fn custom_scope(self, name: impl Into<String>) -> Self {
        self.scope(ScopePolicy::custom(name))
    }

    /// Marks this definition as the preferred candidate for ambiguous lookups.
    pub fn primary(mut self) -> Self {
        self.primary = true;
        self
    }

    /// Tags this definition for qualifier-based disambiguation.
    pub fn qualifier(mut self, tag: impl Into<String>) -> Self {
        self.qualifier = Some(tag.into());
        self
    }

    /// Appends a constructor dependency; factories read it at the same index.
    pub fn depends_on(mut self, dependency: Dependency) -> Self {
        self.dependencies.push(dependency);
        self
    }

    /// Exposes this component as `I`, usually a trait object.
    ///
    /// ```rust
    /// # use ferrous_ioc::ComponentDefinition;
    /// # use std::sync::Arc;
    /// trait Greeter: Send + Sync { fn hello(&self) -> String; }
    /// struct English;
    /// impl Greeter for English { fn hello(&self) -> String { "hello".into() } }
    ///
    /// let def = ComponentDefinition::builder::<English>("english")
    ///     .exposes(|e| e as Arc<dyn Greeter>)
    ///     .factory(|_| Ok(English));
    /// assert_eq!(def.exposed_types().len(), 2);
    /// ```
    pub fn exposes<I, F>(mut self, cast: F) -> Self
    where
        I: ?Sized + Send + Sync + 'static,
        F: Fn(Arc<C>) -> Arc<I> + Send + Sync + 'static,
    {
        let key = TypeKey::of::<I>();
        let cast: CastFn = Arc::new(move |instance: &AnyArc| {
            let concrete = instance.clone().downcast::<C>().ok()?;
            Some(Arc::new(cast(concrete)) as AnyArc)
        });
        self.exposures.retain(|e| e.key != key);
        self.exposures.push(Exposure { key, cast });
        self
    }

    /// Optional post-construction injection of `T`.
    ///
    /// Runs between construction and the init hook with `None` when no
    /// candidate exists.
    pub fn setter<T, F>(self, apply: F) -> Self
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&C, Option<Arc<T>>) + Send + Sync + 'static,
    {
        self.add_setter(Dependency::optional::<T>(), apply)
    }

    /// Like [`setter`](Self::setter), narrowed by a qualifier.
    pub fn qualified_setter<T, F>(self, qualifier: impl Into<String>, apply: F) -> Self
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&C, Option<Arc<T>>) + Send + Sync + 'static,
    {
        self.add_setter(Dependency::optional::<T>().qualified(qualifier), apply)
    }

    fn add_setter<T, F>(mut self, dependency: Dependency, apply: F) -> Self
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&C, Option<Arc<T>>) + Send + Sync + 'static,
    {
        let apply: SetterFn = Arc::new(move |instance: &AnyArc, value: Option<&AnyArc>| {
            let component = instance
                .downcast_ref::<C>()
                .ok_or("setter target has an unexpected type")?;
            let value = match value {
                Some(v) => Some(unwrap_exposed::<T>(v).ok_or("setter value has an unexpected type")?),
                None => None,
            };
            apply(component, value);
            Ok(())
        });
        self.setters.push(Setter { dependency, apply });
        self
    }

    /// Init hook, invoked exactly once after injection.
    ///
    /// An `Err` discards the instance and surfaces as
    /// [`DiError::InitializationFailure`](crate::DiError::InitializationFailure).
    pub fn on_init<F>(mut self, hook: F) -> Self
    where
        F: Fn(&C) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.init = Some(Arc::new(move |instance: &AnyArc| {
            let component = instance
                .downcast_ref::<C>()
                .ok_or("init target has an unexpected type")?;
            hook(component)
        }));
        self
    }

    /// Destroy hook, invoked at most once when the owning scope ends.
    pub fn on_destroy<F>(mut self, hook: F) -> Self
    where
        F: Fn(&C) + Send + Sync + 'static,
    {
        self.destroy = Some(Arc::new(move |instance: &AnyArc| {
            if let Some(component) = instance.downcast_ref::<C>() {
                hook(component);
            }
        }));
        self
    }

    /// Uses [`Initialize::initialize`] as the init hook.
    pub fn with_initialize(self) -> Self
    where
        C: Initialize,
    {
        self.on_init(|c: &C| c.initialize())
    }

    /// Uses [`Dispose::dispose`] as the destroy hook.
    pub fn with_dispose(self) -> Self
    where
        C: Dispose,
    {
        self.on_destroy(|c: &C| c.dispose())
    }

    /// Finishes the definition with a factory receiving the resolved
    /// constructor arguments.
    pub fn factory<F>(self, factory: F) -> ComponentDefinition
    where
        F: Fn(&ResolvedArgs) -> Result<C, BoxError> + Send + Sync + 'static,
    {
        let factory: FactoryFn =
            Arc::new(move |args: &ResolvedArgs| factory(args).map(|c| Arc::new(c) as AnyArc));
        self.finish(factory)
    }

    /// Finishes the definition with an already built instance.
    ///
    /// Every construction hands out the same `Arc`, so the definition is
    /// always Singleton-scoped whatever scope was set before.
    pub fn instance(mut self, value: Arc<C>) -> ComponentDefinition {
        if self.scope != ScopePolicy::Singleton {
            warn!(
                component = %self.id,
                scope = %self.scope,
                "prebuilt instance registered as Singleton"
            );
            self.scope = ScopePolicy::Singleton;
        }
        let factory: FactoryFn = Arc::new(move |_: &ResolvedArgs| Ok(value.clone() as AnyArc));
        self.finish(factory)
    }

    fn finish(self, factory: FactoryFn) -> ComponentDefinition {
        ComponentDefinition {
            id: self.id,
            implementation: TypeKey::of::<C>(),
            exposures: self.exposures,
            dependencies: self.dependencies,
            setters: self.setters,
            scope: self.scope,
            primary: self.primary,
            qualifier: self.qualifier,
            init: self.init,
            destroy: self.destroy,
            factory,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Shape: Send + Sync {
        fn sides(&self) -> u32;
    }

    struct Square;
    impl Shape for Square {
        fn sides(&self) -> u32 {
            4
        }
    }

    #[test]
    fn exposes_concrete_and_trait_types() {
        let def = ComponentDefinition::builder::<Square>("square")
            .exposes(|s| s as Arc<dyn Shape>)
            .factory(|_| Ok(Square));

        assert!(def.exposes(&TypeKey::of::<Square>()));
        assert!(def.exposes(&TypeKey::of::<dyn Shape>()));
        assert!(!def.exposes(&TypeKey::of::<String>()));

        let instance: AnyArc = Arc::new(Square);
        let exposed = def.cast(&instance, &TypeKey::of::<dyn Shape>()).unwrap();
        let shape = unwrap_exposed::<dyn Shape>(&exposed).unwrap();
        assert_eq!(shape.sides(), 4);

        let concrete = def.cast(&instance, &TypeKey::of::<Square>()).unwrap();
        assert!(unwrap_exposed::<Square>(&concrete).is_some());
    }

    #[test]
    fn cast_rejects_foreign_instances() {
        let def = ComponentDefinition::builder::<Square>("square").factory(|_| Ok(Square));
        let wrong: AnyArc = Arc::new(5u8);
        assert!(def.cast(&wrong, &TypeKey::of::<Square>()).is_none());
    }

    #[test]
    fn qualifier_matches_tag_or_id() {
        let def = ComponentDefinition::builder::<Square>("squareShape")
            .qualifier("main")
            .factory(|_| Ok(Square));
        assert!(def.matches_qualifier("main"));
        assert!(def.matches_qualifier("squareShape"));
        assert!(!def.matches_qualifier("other"));
    }

    #[test]
    fn setters_are_optional_dependencies() {
        let def = ComponentDefinition::builder::<Square>("square")
            .setter::<String, _>(|_, _| {})
            .qualified_setter::<u32, _>("sides", |_, _| {})
            .factory(|_| Ok(Square));
        let deps: Vec<_> = def.setter_dependencies().collect();
        assert_eq!(deps.len(), 2);
        assert!(deps.iter().all(|d| d.kind() == DependencyKind::Optional));
        assert_eq!(deps[1].qualifier(), Some("sides"));
        assert_eq!(def.all_dependencies().count(), 2);
    }

    #[test]
    fn dependency_display_includes_qualifier() {
        let dep = Dependency::on::<u32>().qualified("port");
        assert_eq!(dep.to_string(), "u32 @port");
        assert!(!dep.kind().allows_absent());
        assert!(Dependency::provider::<u32>().kind().is_deferred());
    }
}
