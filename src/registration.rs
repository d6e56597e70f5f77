//! Component registry: definitions indexed by id and by exposed type.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::definition::ComponentDefinition;
use crate::error::{DiError, DiResult};
use crate::key::TypeKey;

/// Where a definition came from.
///
/// Manual registrations always win over scanned ones with the same id,
/// regardless of which arrived first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegistrationSource {
    /// Registered directly on the collection
    Manual,
    /// Contributed by a [`ComponentModule`](crate::ComponentModule) during a scan
    Scanned,
}

impl fmt::Display for RegistrationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistrationSource::Manual => f.write_str("manual"),
            RegistrationSource::Scanned => f.write_str("scanned"),
        }
    }
}

/// Result of a single registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Registered {
    Added,
    Replaced,
    Skipped,
}

struct Entry {
    definition: Arc<ComponentDefinition>,
    source: RegistrationSource,
}

/// Definition registry
///
/// Keeps registration order: by-type candidate lists are sorted by the slot
/// a definition was first registered in, and an overriding definition takes
/// over the slot of the one it replaces.
pub(crate) struct Registry {
    entries: Vec<Entry>,
    by_id: HashMap<String, usize>,
    by_type: HashMap<TypeKey, Vec<usize>>,
    allow_overriding: bool,
}

impl Registry {
    pub(crate) fn new(allow_overriding: bool) -> Self {
        Self {
            entries: Vec::new(),
            by_id: HashMap::new(),
            by_type: HashMap::new(),
            allow_overriding,
        }
    }

    pub(crate) fn set_allow_overriding(&mut self, allow: bool) {
        self.allow_overriding = allow;
    }

    /// Adds `definition`, applying the override rules for an existing id.
    pub(crate) fn register(
        &mut self,
        definition: ComponentDefinition,
        source: RegistrationSource,
    ) -> DiResult<Registered> {
        let Some(&slot) = self.by_id.get(definition.id()) else {
            let slot = self.entries.len();
            debug!(component = %definition.id(), %source, scope = %definition.scope(), "component registered");
            self.by_id.insert(definition.id.clone(), slot);
            self.index(slot, &definition);
            self.entries.push(Entry {
                definition: Arc::new(definition),
                source,
            });
            return Ok(Registered::Added);
        };

        let existing = self.entries[slot].source;
        match (existing, source) {
            (RegistrationSource::Manual, RegistrationSource::Scanned) => {
                debug!(component = %definition.id(), "scanned definition shadowed by manual registration");
                Ok(Registered::Skipped)
            }
            (RegistrationSource::Scanned, RegistrationSource::Manual) => {
                debug!(component = %definition.id(), "manual registration replaces scanned definition");
                self.replace(slot, definition, source);
                Ok(Registered::Replaced)
            }
            _ if self.allow_overriding => {
                warn!(component = %definition.id(), "overriding existing definition");
                self.replace(slot, definition, source);
                Ok(Registered::Replaced)
            }
            _ => Err(DiError::DuplicateRegistration {
                id: definition.id.clone(),
            }),
        }
    }

    fn replace(&mut self, slot: usize, definition: ComponentDefinition, source: RegistrationSource) {
        for key in self.entries[slot].definition.exposed_types() {
            if let Some(slots) = self.by_type.get_mut(&key) {
                slots.retain(|&s| s != slot);
            }
        }
        self.index(slot, &definition);
        self.entries[slot] = Entry {
            definition: Arc::new(definition),
            source,
        };
    }

    fn index(&mut self, slot: usize, definition: &ComponentDefinition) {
        for key in definition.exposed_types() {
            let slots = self.by_type.entry(key).or_default();
            if let Err(pos) = slots.binary_search(&slot) {
                slots.insert(pos, slot);
            }
        }
    }

    pub(crate) fn get(&self, id: &str) -> Option<&Arc<ComponentDefinition>> {
        self.by_id.get(id).map(|&slot| &self.entries[slot].definition)
    }

    pub(crate) fn by_id(&self, id: &str) -> DiResult<&Arc<ComponentDefinition>> {
        self.get(id).ok_or_else(|| DiError::NoSuchComponent { what: id.to_string() })
    }

    /// Every definition exposing `key`, in registration order.
    pub(crate) fn all_by_type(&self, key: &TypeKey) -> Vec<&Arc<ComponentDefinition>> {
        self.by_type
            .get(key)
            .map(|slots| slots.iter().map(|&s| &self.entries[s].definition).collect())
            .unwrap_or_default()
    }

    pub(crate) fn source_of(&self, id: &str) -> Option<RegistrationSource> {
        self.by_id.get(id).map(|&slot| self.entries[slot].source)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Arc<ComponentDefinition>> {
        self.entries.iter().map(|e| &e.definition)
    }

    pub(crate) fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}
