//! Lifecycle coordination: construction, injection, init and destroy hooks.

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{trace, warn};

use crate::definition::{AnyArc, ComponentDefinition, DestroyFn};
use crate::error::{DiError, DiResult};
use crate::provider::ResolvedArgs;

/// Lifecycle state of a managed instance.
///
/// Instances move strictly forward:
/// `Created -> Injected -> Initialized -> Ready -> Destroying -> Destroyed`.
/// An instance whose injection or init hook fails ends in `Failed` and is
/// never handed out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    Created,
    Injected,
    Initialized,
    Ready,
    Destroying,
    Destroyed,
    Failed,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleState::Created => "created",
            LifecycleState::Injected => "injected",
            LifecycleState::Initialized => "initialized",
            LifecycleState::Ready => "ready",
            LifecycleState::Destroying => "destroying",
            LifecycleState::Destroyed => "destroyed",
            LifecycleState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// An instance together with its lifecycle bookkeeping.
pub(crate) struct ManagedInstance {
    id: String,
    value: AnyArc,
    state: Mutex<LifecycleState>,
    destroy: Option<DestroyFn>,
}

impl ManagedInstance {
    fn new(def: &ComponentDefinition, value: AnyArc) -> Self {
        Self {
            id: def.id.clone(),
            value,
            state: Mutex::new(LifecycleState::Created),
            destroy: def.destroy.clone(),
        }
    }

    pub(crate) fn id(&self) -> &str {
        &self.id
    }

    pub(crate) fn value(&self) -> &AnyArc {
        &self.value
    }

    pub(crate) fn state(&self) -> LifecycleState {
        *self.state.lock()
    }

    fn advance(&self, next: LifecycleState) {
        let mut state = self.state.lock();
        trace!(component = %self.id, from = %*state, to = %next, "lifecycle transition");
        *state = next;
    }

    /// Runs the destroy hook once. Returns `false` if the instance was not Ready.
    ///
    /// A panicking hook is logged and the instance still ends Destroyed, so
    /// one faulty hook does not stop the rest of a close.
    pub(crate) fn destroy(&self) -> bool {
        {
            let mut state = self.state.lock();
            if *state != LifecycleState::Ready {
                return false;
            }
            *state = LifecycleState::Destroying;
        }

        if let Some(hook) = &self.destroy {
            trace!(component = %self.id, "running destroy hook");
            if catch_unwind(AssertUnwindSafe(|| hook(&self.value))).is_err() {
                warn!(component = %self.id, "destroy hook panicked");
            }
        }

        self.advance(LifecycleState::Destroyed);
        true
    }
}

impl fmt::Debug for ManagedInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagedInstance")
            .field("id", &self.id)
            .field("state", &self.state())
            .finish()
    }
}

/// Drives a definition from factory call to Ready.
pub(crate) struct LifecycleCoordinator;

impl LifecycleCoordinator {
    /// Builds an instance of `def` and brings it to Ready.
    ///
    /// `inject` resolves the setter values; it runs after the factory so
    /// setter dependencies are only looked up for instances that exist. Any
    /// failure after construction marks the instance Failed and drops it
    /// without running its destroy hook.
    pub(crate) fn bring_up<F>(
        def: &ComponentDefinition,
        args: &ResolvedArgs,
        inject: F,
    ) -> DiResult<Arc<ManagedInstance>>
    where
        F: FnOnce() -> DiResult<Vec<Option<AnyArc>>>,
    {
        let value = (def.factory)(args).map_err(|e| DiError::from_hook(&def.id, e))?;
        let instance = ManagedInstance::new(def, value);
        trace!(component = %def.id, "instance created");

        match Self::inject_and_init(def, &instance, inject) {
            Ok(()) => {
                instance.advance(LifecycleState::Ready);
                Ok(Arc::new(instance))
            }
            Err(err) => {
                instance.advance(LifecycleState::Failed);
                warn!(component = %def.id, error = %err, "instance discarded");
                Err(err)
            }
        }
    }

    fn inject_and_init<F>(def: &ComponentDefinition, instance: &ManagedInstance, inject: F) -> DiResult<()>
    where
        F: FnOnce() -> DiResult<Vec<Option<AnyArc>>>,
    {
        if !def.setters.is_empty() {
            let values = inject()?;
            for (setter, value) in def.setters.iter().zip(values.iter()) {
                setter
                    .apply(instance.value(), value.as_ref())
                    .map_err(|e| DiError::from_hook(&def.id, e))?;
            }
        }
        instance.advance(LifecycleState::Injected);

        if let Some(init) = &def.init {
            init(instance.value()).map_err(|e| DiError::from_hook(&def.id, e))?;
        }
        instance.advance(LifecycleState::Initialized);
        Ok(())
    }
}
