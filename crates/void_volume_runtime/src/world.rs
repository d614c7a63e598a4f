//! Simulated world: online entities, permissions, and the action host

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use void_volumes::{
    ActionHost, Destination, DispatchError, EntityFilter, EntityId, EntitySnapshot, PermissionGate, Position,
};

/// Per-entity permission grants for one permission node.
///
/// Cloned handles share the same table, so the world can grant and revoke
/// while the engine holds another handle as its gate. The configured entity
/// filter applies on top of the grants.
#[derive(Debug, Clone)]
pub struct PermissionTable {
    node: String,
    grant_by_default: bool,
    filter: EntityFilter,
    overrides: Arc<RwLock<HashMap<EntityId, bool>>>,
}

impl PermissionTable {
    /// Create a table for a permission node
    pub fn new(node: impl Into<String>, grant_by_default: bool) -> Self {
        Self {
            node: node.into(),
            grant_by_default,
            filter: EntityFilter::default(),
            overrides: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Apply a static allow/block list
    pub fn with_filter(mut self, filter: EntityFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Permission node name
    pub fn node(&self) -> &str {
        &self.node
    }

    /// Grant the node to an entity
    pub fn grant(&self, entity: EntityId) {
        self.overrides.write().insert(entity, true);
    }

    /// Revoke the node from an entity
    pub fn revoke(&self, entity: EntityId) {
        self.overrides.write().insert(entity, false);
    }

    /// Drop an entity's override
    pub fn reset(&self, entity: EntityId) {
        self.overrides.write().remove(&entity);
    }

    /// Check if an entity holds the node
    pub fn has(&self, entity: EntityId) -> bool {
        self.overrides
            .read()
            .get(&entity)
            .copied()
            .unwrap_or(self.grant_by_default)
    }
}

impl PermissionGate for PermissionTable {
    fn may_trigger(&self, entity: &EntitySnapshot) -> bool {
        self.filter.passes(entity.id) && self.has(entity.id)
    }
}

/// Online entities and everything actions did to them
#[derive(Debug)]
pub struct SimWorld {
    entities: HashMap<EntityId, EntitySnapshot>,
    permissions: PermissionTable,
    transcript: Vec<String>,
}

impl SimWorld {
    /// Create an empty world
    pub fn new(permissions: PermissionTable) -> Self {
        Self {
            entities: HashMap::new(),
            permissions,
            transcript: Vec::new(),
        }
    }

    /// Bring an entity online
    pub fn connect(&mut self, id: EntityId, name: &str, spawn: Position) -> &EntitySnapshot {
        log::info!("{} ({}) connected", name, id);
        self.entities
            .entry(id)
            .and_modify(|e| {
                e.name = name.to_string();
                e.position = spawn.clone();
            })
            .or_insert_with(|| EntitySnapshot::new(id, name, spawn))
    }

    /// Take an entity offline
    pub fn disconnect(&mut self, id: EntityId) -> Option<EntitySnapshot> {
        let removed = self.entities.remove(&id);
        if let Some(entity) = &removed {
            log::info!("{} ({}) disconnected", entity.name, id);
        }
        removed
    }

    /// Move an online entity and return its new snapshot
    pub fn move_entity(&mut self, id: EntityId, position: Position) -> Option<EntitySnapshot> {
        let entity = self.entities.get_mut(&id)?;
        entity.position = position;
        Some(entity.clone())
    }

    /// Current snapshot of an online entity
    pub fn snapshot(&self, id: EntityId) -> Option<&EntitySnapshot> {
        self.entities.get(&id)
    }

    /// Number of online entities
    pub fn online_count(&self) -> usize {
        self.entities.len()
    }

    /// Shared permission table
    pub fn permissions(&self) -> &PermissionTable {
        &self.permissions
    }

    /// Output lines produced since the last call
    pub fn take_transcript(&mut self) -> Vec<String> {
        std::mem::take(&mut self.transcript)
    }

    fn require_online(&self, entity: &EntitySnapshot) -> Result<(), String> {
        if self.entities.contains_key(&entity.id) {
            Ok(())
        } else {
            Err(format!("{} is offline", entity.name))
        }
    }
}

impl ActionHost for SimWorld {
    fn run_as_entity(&mut self, entity: &EntitySnapshot, command: &str) -> Result<(), String> {
        self.require_online(entity)?;
        self.transcript.push(format!("[{}] /{}", entity.name, command));
        Ok(())
    }

    fn run_as_system(&mut self, command: &str) -> Result<(), String> {
        self.transcript.push(format!("[console] {}", command));
        Ok(())
    }

    fn send_message(&mut self, entity: &EntitySnapshot, text: &str) -> Result<(), String> {
        self.require_online(entity)?;
        self.transcript.push(format!("[to {}] {}", entity.name, text));
        Ok(())
    }

    fn teleport(&mut self, entity: &EntitySnapshot, destination: &Destination) -> Result<(), String> {
        let target = self
            .entities
            .get_mut(&entity.id)
            .ok_or_else(|| format!("{} is offline", entity.name))?;
        target.position = destination.position.clone();
        target.yaw = destination.yaw;
        target.pitch = destination.pitch;

        let p = &destination.position;
        self.transcript
            .push(format!("[tp {}] {} {} {} {}", entity.name, p.world, p.x, p.y, p.z));
        Ok(())
    }

    fn report_failure(&mut self, entity: &EntitySnapshot, error: &DispatchError) {
        let message = match error {
            DispatchError::TeleportArity { .. } | DispatchError::TeleportNumber { .. } => {
                "Invalid teleport coordinates".to_string()
            }
            other => format!("Action failed: {}", other),
        };
        if self.entities.contains_key(&entity.id) {
            self.transcript.push(format!("[to {}] {}", entity.name, message));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world() -> SimWorld {
        SimWorld::new(PermissionTable::new("triggervolumes.use", true))
    }

    #[test]
    fn test_permission_handles_share_state() {
        let table = PermissionTable::new("node", false);
        let gate = table.clone();
        let entity = EntitySnapshot::new(EntityId(3), "e", Position::new("world", 0.0, 0.0, 0.0));

        assert!(!gate.may_trigger(&entity));
        table.grant(EntityId(3));
        assert!(gate.may_trigger(&entity));
        table.reset(EntityId(3));
        assert!(!gate.may_trigger(&entity));
    }

    #[test]
    fn test_filter_overrides_grants() {
        let table = PermissionTable::new("node", true).with_filter(EntityFilter::new().block_entities([EntityId(5)]));
        let blocked = EntitySnapshot::new(EntityId(5), "bot", Position::new("world", 0.0, 0.0, 0.0));
        let other = EntitySnapshot::new(EntityId(6), "e", Position::new("world", 0.0, 0.0, 0.0));

        table.grant(EntityId(5));
        assert!(table.has(EntityId(5)));
        assert!(!table.may_trigger(&blocked));
        assert!(table.may_trigger(&other));
    }

    #[test]
    fn test_teleport_moves_entity() {
        let mut world = world();
        let snapshot = world
            .connect(EntityId(1), "Steve", Position::new("world", 0.0, 64.0, 0.0))
            .clone();

        let destination = Destination {
            position: Position::new("world", 100.0, 70.0, -5.0),
            yaw: 90.0,
            pitch: 0.0,
        };
        world.teleport(&snapshot, &destination).unwrap();

        let moved = world.snapshot(EntityId(1)).unwrap();
        assert_eq!(moved.position, destination.position);
        assert_eq!(moved.yaw, 90.0);
        assert_eq!(world.take_transcript(), vec!["[tp Steve] world 100 70 -5"]);
    }

    #[test]
    fn test_offline_entity_rejects_actions() {
        let mut world = world();
        let ghost = EntitySnapshot::new(EntityId(9), "Ghost", Position::new("world", 0.0, 0.0, 0.0));

        assert!(world.send_message(&ghost, "hi").is_err());
        assert!(world.run_as_system("say still works").is_ok());
    }

    #[test]
    fn test_bad_teleport_is_reported_to_entity() {
        let mut world = world();
        let steve = world
            .connect(EntityId(1), "Steve", Position::new("world", 0.0, 0.0, 0.0))
            .clone();

        let error = DispatchError::TeleportArity {
            payload: "1 2".into(),
            count: 2,
        };
        world.report_failure(&steve, &error);
        assert_eq!(world.take_transcript(), vec!["[to Steve] Invalid teleport coordinates"]);
    }
}
