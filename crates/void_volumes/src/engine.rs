//! Trigger engine: detection, cooldown gating and dispatch for position updates

use std::collections::HashSet;
use std::time::Duration;

use crate::config::TriggerConfig;
use crate::cooldown::CooldownGate;
use crate::detector::TransitionDetector;
use crate::dispatch::{ActionDispatcher, ActionHost};
use crate::events::{TransitionEvent, TransitionHandler, TransitionKind};
use crate::permission::{AllowAll, PermissionGate};
use crate::spatial::SpatialIndex;
use crate::types::{EntityId, EntitySnapshot};
use crate::volume::{volume_key, VolumeSource};

/// What happened to a detected transition
#[derive(Debug, Clone, PartialEq)]
pub enum Disposition {
    /// The action list ran
    Fired {
        /// Actions that completed
        executed: usize,
        /// Actions that failed
        failed: usize,
    },
    /// Still cooling down; the list did not run
    Suppressed {
        /// Time until the next dispatch is allowed
        remaining: Duration,
    },
    /// The volume has no actions for this direction
    NoActions,
    /// The volume no longer exists in the source
    Missing,
}

/// A detected transition and its disposition
#[derive(Debug, Clone, PartialEq)]
pub struct EventRecord {
    pub event: TransitionEvent,
    pub disposition: Disposition,
}

/// Result of one position update
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOutcome {
    /// The entity may not trigger volumes; nothing is tracked
    Denied,
    /// Moved within the last checked block; not evaluated
    Unchanged,
    /// Evaluated; events in processing order (leaves first)
    Evaluated(Vec<EventRecord>),
}

impl UpdateOutcome {
    /// Events of an evaluated update
    pub fn events(&self) -> &[EventRecord] {
        match self {
            Self::Evaluated(events) => events,
            _ => &[],
        }
    }

    /// Transition events only, in processing order
    pub fn transitions(&self) -> Vec<TransitionEvent> {
        self.events().iter().map(|r| r.event.clone()).collect()
    }
}

/// Runs the detection pipeline for every entity position update.
///
/// All updates must come from one sequential worker; the engine takes
/// `&mut self` for every mutating call.
pub struct TriggerEngine {
    index: SpatialIndex,
    detector: TransitionDetector,
    cooldowns: CooldownGate,
    dispatcher: ActionDispatcher,
    permission: Box<dyn PermissionGate>,
    handlers: Vec<TransitionHandler>,
    /// Source revision the index was built from
    synced_revision: Option<u64>,
    /// Current simulation time
    current_time: Duration,
    /// Entities moved by teleport actions, awaiting a post-teleport check
    pending_teleports: Vec<EntityId>,
}

impl TriggerEngine {
    /// Create an engine from configuration
    pub fn new(config: &TriggerConfig) -> Self {
        Self {
            index: SpatialIndex::new(config.cell_size),
            detector: TransitionDetector::new(),
            cooldowns: CooldownGate::from_config(&config.cooldowns),
            dispatcher: ActionDispatcher::new(),
            permission: Box::new(AllowAll),
            handlers: Vec::new(),
            synced_revision: None,
            current_time: Duration::ZERO,
            pending_teleports: Vec::new(),
        }
    }

    /// Set the permission gate
    pub fn with_permission<P: PermissionGate + 'static>(mut self, permission: P) -> Self {
        self.permission = Box::new(permission);
        self
    }

    /// Register an observer for transition events
    pub fn add_handler(&mut self, handler: TransitionHandler) {
        self.handlers.push(handler);
    }

    /// Advance the simulation clock
    pub fn advance(&mut self, delta: Duration) {
        self.current_time += delta;
    }

    /// Current simulation time
    pub fn now(&self) -> Duration {
        self.current_time
    }

    /// Rebuild the index from the source and purge state of volumes that no
    /// longer exist. Call after every store mutation.
    ///
    /// Stored membership is re-checked against the new geometry at each
    /// entity's last checked position, so a volume deleted and recreated
    /// elsewhere under the same name is no longer counted as occupied.
    pub fn sync<S: VolumeSource + ?Sized>(&mut self, source: &S) {
        self.index.rebuild(source.volumes());

        let live: HashSet<String> = source.volumes().map(|v| v.key()).collect();
        let dropped = self.detector.reconcile(&self.index);
        self.cooldowns.retain_volumes(|key| live.contains(key));
        self.detector.invalidate_positions();
        self.synced_revision = Some(source.revision());

        log::debug!(
            "Synced {} volumes at revision {} ({} stale memberships dropped)",
            self.index.len(),
            source.revision(),
            dropped
        );
    }

    /// Purge one deleted volume without a full rebuild
    pub fn forget_volume(&mut self, name: &str) {
        let key = volume_key(name);
        self.index.remove(&key);
        let inside = self.detector.purge_volume(&key);
        let cooldowns = self.cooldowns.purge_volume(&key);
        log::debug!(
            "Purged volume '{}' ({} members, {} cooldowns)",
            key,
            inside,
            cooldowns
        );
    }

    /// Entity connected or spawned
    pub fn on_connect(&mut self, entity: EntityId) {
        self.detector.track(entity);
    }

    /// Entity disconnected or despawned. State is dropped without leave events.
    pub fn on_disconnect(&mut self, entity: EntityId) {
        if let Some(membership) = self.detector.forget(entity) {
            if !membership.volumes.is_empty() {
                log::debug!(
                    "Entity {} removed while inside {} volume(s); no leave actions run",
                    entity,
                    membership.volumes.len()
                );
            }
        }
        self.cooldowns.purge_entity(entity);
        self.pending_teleports.retain(|e| *e != entity);
    }

    /// Process a movement sample
    pub fn on_move<S, H>(&mut self, entity: &EntitySnapshot, source: &S, host: &mut H) -> UpdateOutcome
    where
        S: VolumeSource + ?Sized,
        H: ActionHost + ?Sized,
    {
        self.process(entity, source, host, false)
    }

    /// Process the position of an entity after a teleport has completed.
    /// Always evaluated, even inside the last checked block.
    pub fn on_teleport<S, H>(&mut self, entity: &EntitySnapshot, source: &S, host: &mut H) -> UpdateOutcome
    where
        S: VolumeSource + ?Sized,
        H: ActionHost + ?Sized,
    {
        self.process(entity, source, host, true)
    }

    /// Entities teleported by dispatched actions since the last call. The
    /// host re-checks each one with [`TriggerEngine::on_teleport`] once the
    /// teleport has been applied.
    pub fn take_pending_teleports(&mut self) -> Vec<EntityId> {
        std::mem::take(&mut self.pending_teleports)
    }

    fn process<S, H>(&mut self, entity: &EntitySnapshot, source: &S, host: &mut H, force: bool) -> UpdateOutcome
    where
        S: VolumeSource + ?Sized,
        H: ActionHost + ?Sized,
    {
        if !self.permission.may_trigger(entity) {
            self.detector.forget(entity.id);
            return UpdateOutcome::Denied;
        }

        if self.synced_revision != Some(source.revision()) {
            self.sync(source);
        }

        if !force && !self.detector.needs_check(entity.id, &entity.position) {
            return UpdateOutcome::Unchanged;
        }

        let transition = self.detector.detect(entity.id, &entity.position, &self.index);
        let mut records = Vec::with_capacity(transition.left.len() + transition.entered.len());

        for key in &transition.left {
            let event = TransitionEvent::leave(entity.id, key.as_str());
            records.push(self.handle_event(event, entity, source, host));
        }
        for key in &transition.entered {
            let event = TransitionEvent::enter(entity.id, key.as_str());
            records.push(self.handle_event(event, entity, source, host));
        }

        self.detector.commit(entity.id, &entity.position, transition);
        UpdateOutcome::Evaluated(records)
    }

    fn handle_event<S, H>(
        &mut self,
        event: TransitionEvent,
        entity: &EntitySnapshot,
        source: &S,
        host: &mut H,
    ) -> EventRecord
    where
        S: VolumeSource + ?Sized,
        H: ActionHost + ?Sized,
    {
        log::debug!("{}", event);
        for handler in &self.handlers {
            handler.handle(&event);
        }

        let disposition = self.gate_and_dispatch(&event, entity, source, host);
        EventRecord { event, disposition }
    }

    fn gate_and_dispatch<S, H>(
        &mut self,
        event: &TransitionEvent,
        entity: &EntitySnapshot,
        source: &S,
        host: &mut H,
    ) -> Disposition
    where
        S: VolumeSource + ?Sized,
        H: ActionHost + ?Sized,
    {
        let Some(volume) = source.get(&event.volume) else {
            return Disposition::Missing;
        };
        let actions = volume.actions(event.kind);
        if actions.is_empty() {
            return Disposition::NoActions;
        }

        let now = self.current_time;
        let remaining = self.cooldowns.remaining(entity.id, &event.volume, event.kind, now);
        if !remaining.is_zero() {
            log::debug!("{} suppressed, {:?} cooldown left", event, remaining);
            return Disposition::Suppressed { remaining };
        }

        let report = self.dispatcher.execute_all(entity, actions, host);
        if report.teleported.is_some() && !self.pending_teleports.contains(&entity.id) {
            self.pending_teleports.push(entity.id);
        }
        self.cooldowns.record(entity.id, &event.volume, event.kind, now);

        Disposition::Fired {
            executed: report.executed,
            failed: report.failures.len(),
        }
    }

    /// Volumes an entity is currently inside
    pub fn membership(&self, entity: EntityId) -> Vec<String> {
        self.detector
            .membership(entity)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Check if an entity is inside a volume
    pub fn is_inside(&self, entity: EntityId, volume: &str) -> bool {
        self.detector.is_inside(entity, &volume_key(volume))
    }

    /// Remaining cooldown for a triple
    pub fn cooldown_remaining(&self, entity: EntityId, volume: &str, kind: TransitionKind) -> Duration {
        self.cooldowns
            .remaining(entity, &volume_key(volume), kind, self.current_time)
    }

    /// Spatial index
    pub fn index(&self) -> &SpatialIndex {
        &self.index
    }

    /// Cooldown gate
    pub fn cooldowns(&self) -> &CooldownGate {
        &self.cooldowns
    }

    /// Action dispatcher counters
    pub fn dispatcher(&self) -> &ActionDispatcher {
        &self.dispatcher
    }

    /// Number of tracked entities
    pub fn tracked_count(&self) -> usize {
        self.detector.tracked_count()
    }
}

impl Default for TriggerEngine {
    fn default() -> Self {
        Self::new(&TriggerConfig::default())
    }
}

impl std::fmt::Debug for TriggerEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TriggerEngine")
            .field("volumes", &self.index.len())
            .field("tracked_entities", &self.detector.tracked_count())
            .field("cooldowns", &self.cooldowns.len())
            .field("handlers", &self.handlers.len())
            .field("synced_revision", &self.synced_revision)
            .field("current_time", &self.current_time)
            .finish()
    }
}
