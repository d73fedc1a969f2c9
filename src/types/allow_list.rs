use std::collections::BTreeSet;

use super::entity::EntityId;

/// Entities that are always desired, whatever their rules say.
///
/// The toggler's own identifier is always a member; it is held apart from
/// the stored entries so that persisting the list never writes it back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowList {
    self_id: EntityId,
    stored: BTreeSet<EntityId>,
}

impl AllowList {
    pub fn new<I, T>(self_id: impl Into<EntityId>, stored: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<EntityId>,
    {
        Self {
            self_id: self_id.into(),
            stored: stored.into_iter().map(Into::into).collect(),
        }
    }

    #[must_use]
    pub fn self_id(&self) -> &EntityId {
        &self.self_id
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.self_id.as_str() == id || self.stored.contains(id)
    }

    /// Every member, including the toggler itself.
    pub fn iter(&self) -> impl Iterator<Item = &EntityId> {
        std::iter::once(&self.self_id).chain(self.stored.iter().filter(|id| **id != self.self_id))
    }

    /// Only the entries that came from storage.
    pub fn stored(&self) -> impl Iterator<Item = &EntityId> {
        self.stored.iter()
    }
}
