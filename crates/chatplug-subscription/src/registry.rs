//! The registration map consulted for every inbound frame.

use std::collections::HashMap;

use crate::{SubscriptionId, SubscriptionKind};

/// Maps live subscription IDs to the kind of body they carry.
///
/// Keyed by ID so each inbound frame is one lookup. At most one ID is
/// registered per kind: registering a kind again replaces its previous ID,
/// and frames still tagged with the old ID are dropped from then on.
///
/// Not thread-safe on its own. The router task owns it exclusively and
/// receives registrations as commands.
#[derive(Debug, Default)]
pub struct Registry {
    by_id: HashMap<SubscriptionId, SubscriptionKind>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `id` for `kind`, returning the ID it replaced, if any.
    pub fn register(
        &mut self,
        id: SubscriptionId,
        kind: SubscriptionKind,
    ) -> Option<SubscriptionId> {
        let replaced = self.id_of(kind).cloned();
        if let Some(old) = &replaced {
            self.by_id.remove(old);
        }
        self.by_id.insert(id, kind);
        replaced
    }

    /// The kind registered under `id`.
    pub fn lookup(&self, id: &str) -> Option<SubscriptionKind> {
        self.by_id.get(id).copied()
    }

    /// The ID currently registered for `kind`.
    pub fn id_of(&self, kind: SubscriptionKind) -> Option<&SubscriptionId> {
        self.by_id
            .iter()
            .find_map(|(id, k)| (*k == kind).then_some(id))
    }

    /// Drops the registration for `id`.
    pub fn remove(&mut self, id: &str) -> Option<SubscriptionKind> {
        self.by_id.remove(id)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}
