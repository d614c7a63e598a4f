//! Per-entity, per-volume, per-direction cooldowns

use std::collections::HashMap;
use std::time::Duration;

use crate::config::CooldownConfig;
use crate::events::TransitionKind;
use crate::types::EntityId;

type CooldownKey = (EntityId, String, TransitionKind);

/// Suppresses repeated action dispatch within a time window.
///
/// Timestamps are simulation time as kept by the engine clock.
#[derive(Debug, Clone)]
pub struct CooldownGate {
    enabled: bool,
    window: Duration,
    last_fired: HashMap<CooldownKey, Duration>,
}

impl CooldownGate {
    /// Create an enabled gate with the given window
    pub fn new(window: Duration) -> Self {
        Self {
            enabled: true,
            window,
            last_fired: HashMap::new(),
        }
    }

    /// Create a gate from configuration
    pub fn from_config(config: &CooldownConfig) -> Self {
        Self {
            enabled: config.enabled,
            window: config.window(),
            last_fired: HashMap::new(),
        }
    }

    /// Whether cooldowns are applied at all
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Cooldown window
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Check if an action list may fire now
    pub fn can_fire(
        &self,
        entity: EntityId,
        volume: &str,
        kind: TransitionKind,
        now: Duration,
    ) -> bool {
        self.remaining(entity, volume, kind, now).is_zero()
    }

    /// Time left until the triple may fire again (zero if it may fire now)
    pub fn remaining(
        &self,
        entity: EntityId,
        volume: &str,
        kind: TransitionKind,
        now: Duration,
    ) -> Duration {
        if !self.enabled {
            return Duration::ZERO;
        }
        match self.last_fired.get(&(entity, volume.to_string(), kind)) {
            Some(&last) => (last + self.window).saturating_sub(now),
            None => Duration::ZERO,
        }
    }

    /// Record a successful dispatch
    pub fn record(&mut self, entity: EntityId, volume: &str, kind: TransitionKind, now: Duration) {
        if !self.enabled {
            return;
        }
        self.last_fired.insert((entity, volume.to_string(), kind), now);
    }

    /// Drop every entry for an entity
    pub fn purge_entity(&mut self, entity: EntityId) -> usize {
        let before = self.last_fired.len();
        self.last_fired.retain(|(e, _, _), _| *e != entity);
        before - self.last_fired.len()
    }

    /// Drop every entry for a volume
    pub fn purge_volume(&mut self, volume: &str) -> usize {
        let before = self.last_fired.len();
        self.last_fired.retain(|(_, v, _), _| v != volume);
        before - self.last_fired.len()
    }

    /// Drop entries for volumes not accepted by `keep`
    pub fn retain_volumes<F>(&mut self, mut keep: F)
    where
        F: FnMut(&str) -> bool,
    {
        self.last_fired.retain(|(_, v, _), _| keep(v));
    }

    /// Number of tracked entries
    pub fn len(&self) -> usize {
        self.last_fired.len()
    }

    /// Whether no entries are tracked
    pub fn is_empty(&self) -> bool {
        self.last_fired.is_empty()
    }
}

impl Default for CooldownGate {
    fn default() -> Self {
        Self::from_config(&CooldownConfig::default())
    }
}
