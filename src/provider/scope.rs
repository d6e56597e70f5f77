//! Custom scope contexts and their thread binding.
//!
//! A context is created by [`Container::enter_scope`](super::Container::enter_scope)
//! and bound to the creating thread. Resolution of a Custom-scoped component
//! uses the innermost open context of that scope bound to the calling thread.
//! Work handed to another thread carries the context along with
//! [`ScopeContext::attach`], or resolves through the context directly since
//! it implements [`Resolver`](crate::Resolver).

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::definition::AnyArc;
use crate::error::{DiError, DiResult};
use crate::internal::DisposeBag;
use crate::key::TypeKey;
use crate::lifecycle::{LifecycleState, ManagedInstance};
use crate::traits::ResolverCore;

use super::{Container, Site};

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static BOUND_CONTEXTS: RefCell<Vec<Weak<ContextInner>>> = RefCell::new(Vec::new());
}

pub(crate) fn bind(context: &Arc<ContextInner>) {
    BOUND_CONTEXTS.with(|bound| bound.borrow_mut().push(Arc::downgrade(context)));
}

pub(crate) fn unbind(context: &Arc<ContextInner>) {
    BOUND_CONTEXTS.with(|bound| {
        let mut bound = bound.borrow_mut();
        if let Some(pos) = bound.iter().rposition(|w| w.as_ptr() == Arc::as_ptr(context)) {
            bound.remove(pos);
        }
    });
}

/// Innermost open context for `scope` of container `container_serial` bound
/// to this thread.
pub(crate) fn bound_context(container_serial: u64, scope: &str) -> Option<Arc<ContextInner>> {
    // Upgraded handles are dropped only after the borrow ends: dropping the
    // last one closes its context and runs destroy hooks, which may look up
    // bound contexts again.
    let live: Vec<Arc<ContextInner>> = BOUND_CONTEXTS.with(|bound| {
        let mut bound = bound.borrow_mut();
        let live: Vec<_> = bound.iter().filter_map(Weak::upgrade).collect();
        bound.retain(|w| live.iter().any(|c| w.as_ptr() == Arc::as_ptr(c) && c.is_open()));
        live
    });
    live.iter()
        .rev()
        .find(|c| c.is_open() && c.container_serial == container_serial && c.scope_name == scope)
        .cloned()
}

type InstanceCell = Arc<OnceCell<Arc<ManagedInstance>>>;

pub(crate) struct ContextInner {
    id: u64,
    scope_name: String,
    container_serial: u64,
    instances: Mutex<HashMap<String, InstanceCell>>,
    disposers: Mutex<DisposeBag>,
    closed: AtomicBool,
}

impl ContextInner {
    pub(crate) fn new(scope_name: String, container_serial: u64) -> Self {
        Self {
            id: NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed),
            scope_name,
            container_serial,
            instances: Mutex::new(HashMap::new()),
            disposers: Mutex::new(DisposeBag::default()),
            closed: AtomicBool::new(false),
        }
    }

    pub(crate) fn scope_name(&self) -> &str {
        &self.scope_name
    }

    pub(crate) fn container_serial(&self) -> u64 {
        self.container_serial
    }

    pub(crate) fn is_open(&self) -> bool {
        !self.closed.load(Ordering::Acquire)
    }

    pub(crate) fn get(&self, id: &str) -> Option<AnyArc> {
        let cell = self.instances.lock().get(id).cloned()?;
        cell.get().map(|m| m.value().clone())
    }

    /// Context-local instance for `id`, created once per context.
    ///
    /// The map lock only guards the cell lookup; construction runs on the
    /// cell, so same-context dependencies can be created while it is held.
    pub(crate) fn get_or_create<F>(&self, id: &str, create: F) -> DiResult<AnyArc>
    where
        F: FnOnce() -> DiResult<Arc<ManagedInstance>>,
    {
        if !self.is_open() {
            return Err(DiError::NoActiveScope {
                scope: self.scope_name.clone(),
            });
        }

        let cell = self
            .instances
            .lock()
            .entry(id.to_string())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone();

        let mut fresh = false;
        let managed = cell.get_or_try_init(|| {
            let managed = create()?;
            fresh = true;
            Ok::<_, DiError>(managed)
        })?;

        if fresh {
            // Closed while we were building: tear the orphan down now.
            if let Err(orphan) = self.disposers.lock().push(managed.clone()) {
                orphan.destroy();
                return Err(DiError::NoActiveScope {
                    scope: self.scope_name.clone(),
                });
            }
            trace!(component = %id, scope = %self.scope_name, context = self.id, "scoped instance created");
        }
        Ok(managed.value().clone())
    }

    /// Destroys context-local instances in reverse creation order. Idempotent.
    pub(crate) fn close(&self) -> bool {
        if self.closed.swap(true, Ordering::AcqRel) {
            return false;
        }
        let drained = self.disposers.lock().seal_and_drain();
        let destroyed = drained.iter().filter(|m| m.destroy()).count();
        self.instances.lock().clear();
        debug!(scope = %self.scope_name, context = self.id, destroyed, "scope context closed");
        true
    }

    fn instance_count(&self) -> usize {
        self.disposers.lock().len()
    }

    fn state_of(&self, id: &str) -> Option<LifecycleState> {
        self.disposers.lock().find(id).map(|m| m.state())
    }
}

impl Drop for ContextInner {
    fn drop(&mut self) {
        if self.is_open() {
            debug!(scope = %self.scope_name, context = self.id, "scope context dropped while open");
            self.close();
        }
    }
}

/// Handle to one open context of a custom scope.
///
/// Clones share the same context. The context closes on [`close`](Self::close)
/// or when the last handle is dropped; either way its instances' destroy
/// hooks run once, in reverse creation order.
///
/// # Examples
///
/// ```rust
/// use ferrous_ioc::{ComponentCollection, ComponentDefinition, Resolver};
/// use std::sync::Arc;
///
/// struct RequestLog;
///
/// let mut components = ComponentCollection::new();
/// components
///     .register(ComponentDefinition::builder::<RequestLog>("log")
///         .custom_scope("request")
///         .factory(|_| Ok(RequestLog)))
///     .unwrap();
/// let container = components.open().unwrap();
///
/// let first = container.enter_scope("request").unwrap();
/// let a1 = first.get::<RequestLog>().unwrap();
/// let a2 = first.get::<RequestLog>().unwrap();
/// assert!(Arc::ptr_eq(&a1, &a2));
///
/// let second = container.enter_scope("request").unwrap();
/// let b = second.get::<RequestLog>().unwrap();
/// assert!(!Arc::ptr_eq(&a1, &b));
///
/// second.close();
/// first.close();
/// assert!(!first.is_open());
/// ```
#[derive(Clone)]
pub struct ScopeContext {
    inner: Arc<ContextInner>,
    container: Container,
}

/// Whether a context still accepts lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    Open,
    Closed,
}

impl ScopeContext {
    pub(crate) fn new(inner: Arc<ContextInner>, container: Container) -> Self {
        Self { inner, container }
    }

    pub(crate) fn inner(&self) -> &Arc<ContextInner> {
        &self.inner
    }

    /// Process-unique id of this context.
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn scope_name(&self) -> &str {
        &self.inner.scope_name
    }

    pub fn is_open(&self) -> bool {
        self.inner.is_open()
    }

    pub fn state(&self) -> ContextState {
        if self.is_open() {
            ContextState::Open
        } else {
            ContextState::Closed
        }
    }

    /// Number of live context-local instances.
    pub fn instance_count(&self) -> usize {
        self.inner.instance_count()
    }

    /// Lifecycle state of the context-local instance of `id`, if created.
    pub fn lifecycle_state(&self, id: &str) -> Option<LifecycleState> {
        self.inner.state_of(id)
    }

    /// Closes the context and destroys its instances. Idempotent.
    ///
    /// Also unbinds the context from the calling thread.
    pub fn close(&self) {
        unbind(&self.inner);
        self.inner.close();
    }

    /// Binds this context to the current thread until the guard drops.
    ///
    /// ```rust
    /// # use ferrous_ioc::{ComponentCollection, ComponentDefinition, Resolver};
    /// # use std::sync::Arc;
    /// # struct RequestLog;
    /// # let mut components = ComponentCollection::new();
    /// # components.register(ComponentDefinition::builder::<RequestLog>("log")
    /// #     .custom_scope("request").factory(|_| Ok(RequestLog))).unwrap();
    /// # let container = components.open().unwrap();
    /// let context = container.enter_scope("request").unwrap();
    /// let here = context.get::<RequestLog>().unwrap();
    ///
    /// let worker = {
    ///     let context = context.clone();
    ///     let container = container.clone();
    ///     std::thread::spawn(move || {
    ///         let _attached = context.attach();
    ///         container.get::<RequestLog>().unwrap()
    ///     })
    /// };
    /// assert!(Arc::ptr_eq(&here, &worker.join().unwrap()));
    /// context.close();
    /// ```
    pub fn attach(&self) -> ContextGuard {
        bind(&self.inner);
        ContextGuard {
            context: self.inner.clone(),
            _not_send: PhantomData,
        }
    }

    pub fn container(&self) -> &Container {
        &self.container
    }
}

impl fmt::Debug for ScopeContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopeContext")
            .field("id", &self.inner.id)
            .field("scope", &self.inner.scope_name)
            .field("state", &self.state())
            .finish()
    }
}

impl ResolverCore for ScopeContext {
    fn resolve_by_id(&self, id: &str, key: &TypeKey) -> DiResult<AnyArc> {
        self.container.inner.resolve_id(id, key, Site::within(&self.inner))
    }

    fn resolve_by_type(&self, key: &TypeKey, qualifier: Option<&str>) -> DiResult<AnyArc> {
        self.container.inner.resolve_type(key, qualifier, Site::within(&self.inner))
    }

    fn resolve_all(&self, key: &TypeKey) -> DiResult<Vec<(String, AnyArc)>> {
        self.container.inner.resolve_all(key, Site::within(&self.inner))
    }
}

/// Keeps a context bound to the current thread. Not `Send`: it unbinds from
/// the thread it was created on.
pub struct ContextGuard {
    context: Arc<ContextInner>,
    _not_send: PhantomData<*const ()>,
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        unbind(&self.context);
    }
}

impl fmt::Debug for ContextGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextGuard")
            .field("context", &self.context.id)
            .finish()
    }
}
