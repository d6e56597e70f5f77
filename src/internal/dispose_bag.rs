//! Internal disposal bag for managing destroy order.

use std::sync::Arc;

use crate::lifecycle::ManagedInstance;

/// Instances awaiting destruction, run in LIFO order.
///
/// Entries are pushed when an instance becomes Ready, so dependencies always
/// precede their dependents. Once sealed the bag refuses new entries; a
/// creation that races with `close()` gets its instance back and must destroy
/// it itself.
#[derive(Default)]
pub(crate) struct DisposeBag {
    entries: Vec<Arc<ManagedInstance>>,
    sealed: bool,
}

impl DisposeBag {
    /// Add a ready instance, or hand it back if the bag is sealed.
    pub(crate) fn push(&mut self, instance: Arc<ManagedInstance>) -> Result<(), Arc<ManagedInstance>> {
        if self.sealed {
            return Err(instance);
        }
        self.entries.push(instance);
        Ok(())
    }

    /// Seal the bag and take its entries in reverse creation order.
    pub(crate) fn seal_and_drain(&mut self) -> Vec<Arc<ManagedInstance>> {
        self.sealed = true;
        let mut drained = std::mem::take(&mut self.entries);
        drained.reverse();
        drained
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn find(&self, id: &str) -> Option<&Arc<ManagedInstance>> {
        self.entries.iter().find(|m| m.id() == id)
    }
}
