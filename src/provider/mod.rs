//! Container module: the opened, resolving side of the component graph.
//!
//! This module contains the [`Container`] type together with scope contexts,
//! factory arguments and collection results.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use tracing::{debug, trace, warn};

use crate::config::ContainerOptions;
use crate::definition::{unwrap_exposed, AnyArc, ComponentDefinition};
use crate::descriptors::ComponentDescriptor;
use crate::error::{DiError, DiResult};
use crate::internal::{current_path, ResolutionGuard};
use crate::key::TypeKey;
use crate::lifecycle::{LifecycleCoordinator, LifecycleState, ManagedInstance};
use crate::lifetime::ScopePolicy;
use crate::proxy::{LookupTarget, ProxyTarget};
use crate::registration::Registry;
use crate::resolver::{DependencyResolver, PlannedArg};
use crate::singletons::SingletonCache;
use crate::traits::ResolverCore;
use crate::validation::{self, ValidationReport};

mod args;
pub mod scope;
mod set;

pub use args::ResolvedArgs;
pub(crate) use args::ResolvedArg;
pub use scope::{ContextGuard, ContextState, ScopeContext};
pub(crate) use scope::ContextInner;
pub use set::ComponentSet;

static NEXT_CONTAINER_SERIAL: AtomicU64 = AtomicU64::new(1);

/// Opened component container.
///
/// Produced by [`ComponentCollection::open`](crate::ComponentCollection::open).
/// Resolves components by id or type according to their scope policy and
/// owns every singleton it creates until [`close`](Self::close).
///
/// # Thread Safety
///
/// `Container` is cheap to clone (it is an `Arc` internally) and can be
/// shared across threads. Concurrent first lookups of a singleton construct
/// it exactly once.
///
/// # Examples
///
/// ```rust
/// use ferrous_ioc::{ComponentCollection, ComponentDefinition, Dependency, Resolver};
/// use std::sync::Arc;
///
/// struct Database { url: String }
/// struct UserService { db: Arc<Database> }
///
/// let mut components = ComponentCollection::new();
/// components
///     .register(ComponentDefinition::builder::<Database>("database")
///         .factory(|_| Ok(Database { url: "postgres://localhost".to_string() })))
///     .unwrap()
///     .register(ComponentDefinition::builder::<UserService>("userService")
///         .prototype()
///         .depends_on(Dependency::on::<Database>())
///         .factory(|args| Ok(UserService { db: args.required(0)? })))
///     .unwrap();
///
/// let container = components.open().unwrap();
/// let a = container.get::<UserService>().unwrap();
/// let b = container.get::<UserService>().unwrap();
/// assert!(!Arc::ptr_eq(&a, &b));
/// assert!(Arc::ptr_eq(&a.db, &b.db));
/// assert_eq!(a.db.url, "postgres://localhost");
/// container.close();
/// ```
#[derive(Clone)]
pub struct Container {
    inner: Arc<ContainerInner>,
}

pub(crate) struct ContainerInner {
    serial: u64,
    self_ref: Weak<ContainerInner>,
    registry: Registry,
    options: ContainerOptions,
    singletons: SingletonCache,
    closed: AtomicBool,
}

/// Where a resolution runs: inside an explicit context, or against whatever
/// contexts are bound to the calling thread.
#[derive(Clone, Copy, Default)]
pub(crate) struct Site<'a> {
    context: Option<&'a Arc<ContextInner>>,
}

impl<'a> Site<'a> {
    pub(crate) fn thread() -> Self {
        Self { context: None }
    }

    pub(crate) fn within(context: &'a Arc<ContextInner>) -> Self {
        Self { context: Some(context) }
    }
}

pub(crate) fn typed_set<T: ?Sized + 'static>(
    entries: Vec<(String, AnyArc)>,
    key: &TypeKey,
) -> DiResult<ComponentSet<T>> {
    let typed = entries
        .into_iter()
        .map(|(id, value)| match unwrap_exposed::<T>(&value) {
            Some(v) => Ok((id, v)),
            None => Err(DiError::TypeMismatch {
                id,
                expected: key.display_name(),
            }),
        })
        .collect::<DiResult<Vec<_>>>()?;
    Ok(ComponentSet::from_entries(typed))
}

impl ContainerInner {
    fn ensure_open(&self) -> DiResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(DiError::ContainerClosed);
        }
        Ok(())
    }

    pub(crate) fn resolve_id(&self, id: &str, key: &TypeKey, site: Site<'_>) -> DiResult<AnyArc> {
        self.ensure_open()?;
        let def = self.registry.by_id(id)?;
        let instance = self.instance_of(def, site)?;
        expose(def, &instance, key)
    }

    pub(crate) fn resolve_type(&self, key: &TypeKey, qualifier: Option<&str>, site: Site<'_>) -> DiResult<AnyArc> {
        self.ensure_open()?;
        let def = DependencyResolver::new(&self.registry).select_required(key, qualifier)?;
        let instance = self.instance_of(def, site)?;
        expose(def, &instance, key)
    }

    pub(crate) fn resolve_all(&self, key: &TypeKey, site: Site<'_>) -> DiResult<Vec<(String, AnyArc)>> {
        self.ensure_open()?;
        let defs = DependencyResolver::new(&self.registry).candidates(key);
        self.collect(&defs, key, site)
    }

    fn collect(&self, defs: &[&Arc<ComponentDefinition>], key: &TypeKey, site: Site<'_>) -> DiResult<Vec<(String, AnyArc)>> {
        defs.iter()
            .map(|def| {
                let instance = self.instance_of(def, site)?;
                Ok((def.id().to_string(), expose(def, &instance, key)?))
            })
            .collect()
    }

    /// Stored instance of `def`, honoring its scope policy.
    fn instance_of(&self, def: &Arc<ComponentDefinition>, site: Site<'_>) -> DiResult<AnyArc> {
        let max_depth = self.options.max_depth;
        match def.scope() {
            ScopePolicy::Singleton => {
                if let Some(cached) = self.singletons.get(def.id()) {
                    return Ok(cached.clone());
                }
                let _guard = ResolutionGuard::enter(def.id(), max_depth)?;
                self.singletons.get_or_create(def.id(), || self.construct(def, site))
            }
            ScopePolicy::Prototype => {
                let _guard = ResolutionGuard::enter(def.id(), max_depth)?;
                let managed = self.construct(def, site)?;
                trace!(component = %def.id(), "prototype created");
                Ok(managed.value().clone())
            }
            ScopePolicy::Custom(scope) => {
                let context = self.context_for(scope, site)?;
                if let Some(existing) = context.get(def.id()) {
                    return Ok(existing);
                }
                let _guard = ResolutionGuard::enter(def.id(), max_depth)?;
                context.get_or_create(def.id(), || self.construct(def, Site::within(&context)))
            }
        }
    }

    fn context_for(&self, scope: &str, site: Site<'_>) -> DiResult<Arc<ContextInner>> {
        if let Some(context) = site.context {
            if context.scope_name() == scope && context.container_serial() == self.serial && context.is_open() {
                return Ok(context.clone());
            }
        }
        scope::bound_context(self.serial, scope).ok_or_else(|| DiError::NoActiveScope {
            scope: scope.to_string(),
        })
    }

    fn construct(&self, def: &Arc<ComponentDefinition>, site: Site<'_>) -> DiResult<Arc<ManagedInstance>> {
        let plan = DependencyResolver::new(&self.registry).plan(def, &current_path())?;
        let args = ResolvedArgs::new(def.id(), self.materialize(&plan.constructor, site)?);
        LifecycleCoordinator::bring_up(def, &args, || {
            Ok(self
                .materialize(&plan.setters, site)?
                .into_iter()
                .map(ResolvedArg::into_instance)
                .collect())
        })
    }

    fn materialize(&self, plan: &[PlannedArg<'_>], site: Site<'_>) -> DiResult<Vec<ResolvedArg>> {
        plan.iter()
            .map(|arg| {
                Ok(match arg {
                    PlannedArg::Component { def, key } => {
                        let instance = self.instance_of(def, site)?;
                        ResolvedArg::Instance(expose(def, &instance, key)?)
                    }
                    PlannedArg::Absent => ResolvedArg::Absent,
                    PlannedArg::Collection { defs, key } => ResolvedArg::Collection(self.collect(defs, key, site)?),
                    PlannedArg::Deferred { def, key } => {
                        ResolvedArg::Proxy(Arc::new(ProxyTarget::new(self.self_ref.clone(), def, *key)))
                    }
                    PlannedArg::Lookup { key, qualifier } => ResolvedArg::Lookup(Arc::new(LookupTarget::new(
                        self.self_ref.clone(),
                        *key,
                        qualifier.clone(),
                    ))),
                })
            })
            .collect()
    }

    fn close(&self) -> bool {
        if self.closed.swap(true, Ordering::AcqRel) {
            return false;
        }
        let destroyed = self.singletons.destroy_all();
        debug!(container = self.serial, destroyed, "container closed");
        true
    }
}

impl Drop for ContainerInner {
    fn drop(&mut self) {
        if !self.closed.load(Ordering::Acquire) {
            warn!(container = self.serial, "container dropped without close(); destroying singletons");
            self.close();
        }
    }
}

fn expose(def: &ComponentDefinition, instance: &AnyArc, key: &TypeKey) -> DiResult<AnyArc> {
    def.cast(instance, key).ok_or_else(|| DiError::TypeMismatch {
        id: def.id().to_string(),
        expected: key.display_name(),
    })
}

impl Container {
    pub(crate) fn new(registry: Registry, options: ContainerOptions) -> Self {
        let singletons = SingletonCache::new(&registry);
        let inner = Arc::new_cyclic(|self_ref| ContainerInner {
            serial: NEXT_CONTAINER_SERIAL.fetch_add(1, Ordering::Relaxed),
            self_ref: self_ref.clone(),
            registry,
            options,
            singletons,
            closed: AtomicBool::new(false),
        });
        Self { inner }
    }

    /// Builds every singleton now, in registration order.
    pub(crate) fn instantiate_singletons(&self) -> DiResult<usize> {
        let inner = &self.inner;
        let mut count = 0;
        for def in inner.registry.iter() {
            if matches!(def.scope(), ScopePolicy::Singleton) {
                inner.instance_of(def, Site::thread())?;
                count += 1;
            }
        }
        debug!(count, "singletons instantiated eagerly");
        Ok(count)
    }

    /// Opens a new context of the custom scope `scope_name`, bound to the
    /// current thread.
    ///
    /// Contexts nest: while an inner context of the same scope is open on
    /// this thread, lookups use it.
    pub fn enter_scope(&self, scope_name: impl Into<String>) -> DiResult<ScopeContext> {
        self.inner.ensure_open()?;
        let context = Arc::new(ContextInner::new(scope_name.into(), self.inner.serial));
        scope::bind(&context);
        debug!(scope = %context.scope_name(), "scope context entered");
        Ok(ScopeContext::new(context, self.clone()))
    }

    /// Innermost open context of `scope_name` bound to the current thread.
    pub fn current_scope(&self, scope_name: &str) -> Option<ScopeContext> {
        scope::bound_context(self.inner.serial, scope_name).map(|inner| ScopeContext::new(inner, self.clone()))
    }

    /// Destroys all singletons in reverse creation order. Idempotent.
    ///
    /// Outstanding scope contexts are owned by their creators and stay open.
    /// Every lookup after close fails with [`DiError::ContainerClosed`].
    pub fn close(&self) {
        self.inner.close();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.inner.registry.contains(id)
    }

    /// Component ids in registration order.
    pub fn definition_names(&self) -> Vec<String> {
        self.inner.registry.iter().map(|d| d.id().to_string()).collect()
    }

    pub fn descriptors(&self) -> Vec<ComponentDescriptor> {
        self.inner
            .registry
            .iter()
            .map(|d| ComponentDescriptor::describe(d, &self.inner.registry))
            .collect()
    }

    pub fn descriptor(&self, id: &str) -> Option<ComponentDescriptor> {
        self.inner
            .registry
            .get(id)
            .map(|d| ComponentDescriptor::describe(d, &self.inner.registry))
    }

    /// Lifecycle state of the singleton `id`, `None` until it is created.
    pub fn singleton_state(&self, id: &str) -> Option<LifecycleState> {
        self.inner.singletons.state(id)
    }

    /// Number of singletons created so far.
    pub fn singleton_count(&self) -> usize {
        self.inner.singletons.created_count()
    }

    pub fn options(&self) -> &ContainerOptions {
        &self.inner.options
    }

    /// Re-runs graph validation on the opened registry.
    pub fn validate(&self) -> ValidationReport {
        validation::validate(&self.inner.registry)
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("components", &self.inner.registry.len())
            .field("singletons", &self.inner.singletons.created_count())
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl ResolverCore for Container {
    fn resolve_by_id(&self, id: &str, key: &TypeKey) -> DiResult<AnyArc> {
        self.inner.resolve_id(id, key, Site::thread())
    }

    fn resolve_by_type(&self, key: &TypeKey, qualifier: Option<&str>) -> DiResult<AnyArc> {
        self.inner.resolve_type(key, qualifier, Site::thread())
    }

    fn resolve_all(&self, key: &TypeKey) -> DiResult<Vec<(String, AnyArc)>> {
        self.inner.resolve_all(key, Site::thread())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ComponentCollection, Dependency, Resolver};
    use std::sync::atomic::AtomicUsize;

    #[derive(Debug)]
    struct Leaf;
    #[derive(Debug)]
    struct Branch {
        leaf: Arc<Leaf>,
    }

    #[test]
    fn lookups_after_close_fail() {
        let mut components = ComponentCollection::new();
        components
            .register(ComponentDefinition::builder::<Leaf>("leaf").factory(|_| Ok(Leaf)))
            .unwrap();
        let container = components.open().unwrap();
        assert!(container.get::<Leaf>().is_ok());

        container.close();
        container.close();
        assert!(container.is_closed());
        assert!(matches!(container.get::<Leaf>(), Err(DiError::ContainerClosed)));
        assert!(matches!(container.enter_scope("request"), Err(DiError::ContainerClosed)));
    }

    #[test]
    fn dropping_the_last_handle_destroys_singletons() {
        let destroyed = Arc::new(AtomicUsize::new(0));
        let counter = destroyed.clone();
        let mut components = ComponentCollection::new();
        components
            .register(
                ComponentDefinition::builder::<Leaf>("leaf")
                    .on_destroy(move |_| {
                        counter.fetch_add(1, Ordering::SeqCst);
                    })
                    .factory(|_| Ok(Leaf)),
            )
            .unwrap();

        let container = components.open().unwrap();
        container.get::<Leaf>().unwrap();
        drop(container);
        assert_eq!(destroyed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failed_singleton_is_retried_with_shared_dependencies_kept() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let seen = attempts.clone();
        let mut components = ComponentCollection::new();
        components
            .register(ComponentDefinition::builder::<Leaf>("leaf").factory(|_| Ok(Leaf)))
            .unwrap()
            .register(
                ComponentDefinition::builder::<Branch>("branch")
                    .depends_on(Dependency::on::<Leaf>())
                    .on_init(move |_| {
                        if seen.fetch_add(1, Ordering::SeqCst) == 0 {
                            Err("first attempt fails".into())
                        } else {
                            Ok(())
                        }
                    })
                    .factory(|args| Ok(Branch { leaf: args.required(0)? })),
            )
            .unwrap();
        let container = components.open().unwrap();

        let err = container.get::<Branch>().unwrap_err();
        assert!(matches!(err, DiError::InitializationFailure { ref id, .. } if id == "branch"));
        assert_eq!(container.singleton_state("leaf"), Some(LifecycleState::Ready));
        assert_eq!(container.singleton_state("branch"), None);

        let branch = container.get::<Branch>().unwrap();
        assert!(Arc::ptr_eq(&branch.leaf, &container.get::<Leaf>().unwrap()));
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }
}
