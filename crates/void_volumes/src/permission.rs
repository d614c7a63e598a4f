//! Gate deciding which entities may trigger volumes

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::types::{EntityId, EntitySnapshot};

/// Decides whether an entity takes part in volume detection at all
pub trait PermissionGate: Send + Sync {
    /// Check an entity at the time of a position sample
    fn may_trigger(&self, entity: &EntitySnapshot) -> bool;
}

impl<F> PermissionGate for F
where
    F: Fn(&EntitySnapshot) -> bool + Send + Sync,
{
    fn may_trigger(&self, entity: &EntitySnapshot) -> bool {
        self(entity)
    }
}

/// Lets every entity trigger
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl PermissionGate for AllowAll {
    fn may_trigger(&self, _entity: &EntitySnapshot) -> bool {
        true
    }
}

/// Allow/block lists of entity IDs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntityFilter {
    /// Specific entity IDs that can trigger (empty = any)
    pub allowed_entities: HashSet<EntityId>,
    /// Specific entity IDs that cannot trigger
    pub blocked_entities: HashSet<EntityId>,
}

impl EntityFilter {
    /// Create a new filter that accepts everything
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow only specific entities
    pub fn only_entities<I: IntoIterator<Item = EntityId>>(mut self, entities: I) -> Self {
        self.allowed_entities = entities.into_iter().collect();
        self
    }

    /// Block specific entities
    pub fn block_entities<I: IntoIterator<Item = EntityId>>(mut self, entities: I) -> Self {
        self.blocked_entities.extend(entities);
        self
    }

    /// Whether both lists are empty
    pub fn is_empty(&self) -> bool {
        self.allowed_entities.is_empty() && self.blocked_entities.is_empty()
    }

    /// Check if an entity passes this filter
    pub fn passes(&self, entity: EntityId) -> bool {
        if self.blocked_entities.contains(&entity) {
            return false;
        }
        self.allowed_entities.is_empty() || self.allowed_entities.contains(&entity)
    }
}

impl PermissionGate for EntityFilter {
    fn may_trigger(&self, entity: &EntitySnapshot) -> bool {
        self.passes(entity.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Position;

    fn entity(id: u64) -> EntitySnapshot {
        EntitySnapshot::new(EntityId(id), "e", Position::new("world", 0.0, 0.0, 0.0))
    }

    #[test]
    fn test_filter_blocked() {
        let filter = EntityFilter::new().block_entities([EntityId(100), EntityId(200)]);

        assert!(filter.may_trigger(&entity(50)));
        assert!(!filter.may_trigger(&entity(100)));
        assert!(!filter.may_trigger(&entity(200)));
    }

    #[test]
    fn test_filter_allow_list() {
        let filter = EntityFilter::new().only_entities([EntityId(1)]);

        assert!(filter.may_trigger(&entity(1)));
        assert!(!filter.may_trigger(&entity(2)));
    }

    #[test]
    fn test_block_wins_over_allow() {
        let filter = EntityFilter::new()
            .only_entities([EntityId(1)])
            .block_entities([EntityId(1)]);
        assert!(!filter.may_trigger(&entity(1)));
    }

    #[test]
    fn test_closure_gate() {
        let gate = |e: &EntitySnapshot| e.id.0 % 2 == 0;
        assert!(gate.may_trigger(&entity(4)));
        assert!(!gate.may_trigger(&entity(3)));
        assert!(AllowAll.may_trigger(&entity(3)));
    }
}
