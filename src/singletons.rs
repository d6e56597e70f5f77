//! Singleton cache with per-id serialized construction.

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use tracing::debug;

use crate::definition::AnyArc;
use crate::error::{DiError, DiResult};
use crate::internal::DisposeBag;
use crate::lifecycle::{LifecycleState, ManagedInstance};
use crate::lifetime::ScopePolicy;
use crate::registration::Registry;

/// Singleton instances for one container.
///
/// The id map is built once at open time and never mutated afterwards, so
/// lookups take no lock. Each id owns a `OnceCell`: the first caller runs the
/// construction while concurrent callers for the same id block on the cell,
/// then share the result. A failed construction leaves the cell empty and
/// the next lookup retries.
pub(crate) struct SingletonCache {
    cells: HashMap<String, OnceCell<Arc<ManagedInstance>>>,
    created: Mutex<DisposeBag>,
}

impl SingletonCache {
    pub(crate) fn new(registry: &Registry) -> Self {
        let cells = registry
            .iter()
            .filter(|def| matches!(def.scope(), ScopePolicy::Singleton))
            .map(|def| (def.id().to_string(), OnceCell::new()))
            .collect();
        Self {
            cells,
            created: Mutex::new(DisposeBag::default()),
        }
    }

    /// Cached instance for `id`, if already built.
    #[inline]
    pub(crate) fn get(&self, id: &str) -> Option<&AnyArc> {
        self.cells.get(id)?.get().map(|m| m.value())
    }

    pub(crate) fn state(&self, id: &str) -> Option<LifecycleState> {
        self.cells.get(id)?.get().map(|m| m.state())
    }

    /// Returns the cached instance or runs `create` exactly once for `id`.
    pub(crate) fn get_or_create<F>(&self, id: &str, create: F) -> DiResult<AnyArc>
    where
        F: FnOnce() -> DiResult<Arc<ManagedInstance>>,
    {
        let cell = self
            .cells
            .get(id)
            .ok_or_else(|| DiError::NoSuchComponent { what: id.to_string() })?;

        let mut fresh = false;
        let managed = cell.get_or_try_init(|| {
            let managed = create()?;
            fresh = true;
            Ok::<_, DiError>(managed)
        })?;

        if fresh {
            if let Err(orphan) = self.created.lock().push(managed.clone()) {
                orphan.destroy();
                return Err(DiError::ContainerClosed);
            }
            debug!(component = %id, "singleton created");
        }
        Ok(managed.value().clone())
    }

    /// Number of singletons built so far.
    pub(crate) fn created_count(&self) -> usize {
        self.created.lock().len()
    }

    /// Destroys every created singleton in reverse creation order.
    ///
    /// Hooks run outside the bag lock. Later creations are refused.
    pub(crate) fn destroy_all(&self) -> usize {
        let drained = self.created.lock().seal_and_drain();
        let mut destroyed = 0;
        for managed in drained {
            if managed.destroy() {
                destroyed += 1;
            }
        }
        destroyed
    }
}
