//! Per-entity membership tracking and enter/leave detection

use std::collections::{BTreeSet, HashMap};

use crate::spatial::SpatialIndex;
use crate::types::{EntityId, Position};

/// Stored state of one entity
#[derive(Debug, Clone, Default)]
pub struct Membership {
    /// Volume keys the entity was inside at its last checked position
    pub volumes: BTreeSet<String>,
    /// Last checked position (None forces the next sample to be evaluated)
    pub last_position: Option<Position>,
    /// The next sample is evaluated even inside the last checked block
    pub stale: bool,
}

/// Result of diffing a new sample against stored membership.
///
/// Leave events are always processed before enter events.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transition {
    /// Volumes the entity was in and is no longer in
    pub left: Vec<String>,
    /// Volumes the entity is in and was not in before
    pub entered: Vec<String>,
    /// Full membership at the new position
    pub current: BTreeSet<String>,
}

impl Transition {
    /// Whether the sample changed nothing
    pub fn is_empty(&self) -> bool {
        self.left.is_empty() && self.entered.is_empty()
    }
}

/// Tracks which volumes every entity occupies
#[derive(Debug, Clone, Default)]
pub struct TransitionDetector {
    memberships: HashMap<EntityId, Membership>,
}

impl TransitionDetector {
    /// Create a new detector
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a sample must be evaluated. Movement within the last checked
    /// block is skipped.
    pub fn needs_check(&self, entity: EntityId, position: &Position) -> bool {
        match self.memberships.get(&entity) {
            Some(Membership {
                last_position: Some(last),
                stale: false,
                ..
            }) => !last.same_block(position),
            _ => true,
        }
    }

    /// Diff the volumes at the new position against stored membership
    pub fn diff(&self, entity: EntityId, current: BTreeSet<String>) -> Transition {
        let empty = BTreeSet::new();
        let previous = self
            .memberships
            .get(&entity)
            .map(|m| &m.volumes)
            .unwrap_or(&empty);

        Transition {
            left: previous.difference(&current).cloned().collect(),
            entered: current.difference(previous).cloned().collect(),
            current,
        }
    }

    /// Look up the volumes at a position and diff them
    pub fn detect(&self, entity: EntityId, position: &Position, index: &SpatialIndex) -> Transition {
        self.diff(entity, index.volumes_at(position))
    }

    /// Replace stored membership once every event of a pass was handled
    pub fn commit(&mut self, entity: EntityId, position: &Position, transition: Transition) {
        let membership = self.memberships.entry(entity).or_default();
        membership.volumes = transition.current;
        membership.last_position = Some(position.clone());
        membership.stale = false;
    }

    /// Start tracking an entity with empty membership
    pub fn track(&mut self, entity: EntityId) {
        self.memberships.entry(entity).or_default();
    }

    /// Stop tracking an entity. No leave events are produced.
    pub fn forget(&mut self, entity: EntityId) -> Option<Membership> {
        self.memberships.remove(&entity)
    }

    /// Remove a volume from every membership set. Returns how many entities
    /// were inside it.
    pub fn purge_volume(&mut self, volume: &str) -> usize {
        let mut inside = 0;
        for membership in self.memberships.values_mut() {
            if membership.volumes.remove(volume) {
                inside += 1;
            }
        }
        inside
    }

    /// Drop stored volumes that no longer contain the entity's last checked
    /// position under `index`. Entities never checked keep nothing.
    /// Returns how many memberships were dropped.
    pub fn reconcile(&mut self, index: &SpatialIndex) -> usize {
        let mut dropped = 0;
        for membership in self.memberships.values_mut() {
            let before = membership.volumes.len();
            match &membership.last_position {
                Some(last) => {
                    let inside = index.volumes_at(last);
                    membership.volumes.retain(|v| inside.contains(v));
                }
                None => membership.volumes.clear(),
            }
            dropped += before - membership.volumes.len();
        }
        dropped
    }

    /// Force the next sample of every entity to be evaluated
    pub fn invalidate_positions(&mut self) {
        for membership in self.memberships.values_mut() {
            membership.stale = true;
        }
    }

    /// Volumes an entity is currently inside
    pub fn membership(&self, entity: EntityId) -> Option<&BTreeSet<String>> {
        self.memberships.get(&entity).map(|m| &m.volumes)
    }

    /// Check if an entity is inside a volume
    pub fn is_inside(&self, entity: EntityId, volume: &str) -> bool {
        self.membership(entity)
            .map(|set| set.contains(volume))
            .unwrap_or(false)
    }

    /// Number of tracked entities
    pub fn tracked_count(&self) -> usize {
        self.memberships.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::volume::{Volume, VolumeBounds};

    const E: EntityId = EntityId(1);

    fn set(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn at(x: f64, y: f64, z: f64) -> Position {
        Position::new("world", x, y, z)
    }

    #[test]
    fn test_unseen_entity_enters_everything() {
        let detector = TransitionDetector::new();
        let transition = detector.diff(E, set(&["a", "b"]));

        assert_eq!(transition.entered, vec!["a", "b"]);
        assert!(transition.left.is_empty());
    }

    #[test]
    fn test_diff_and_commit() {
        let mut detector = TransitionDetector::new();
        let t = detector.diff(E, set(&["a", "b"]));
        detector.commit(E, &at(0.0, 0.0, 0.0), t);

        let t = detector.diff(E, set(&["b", "c"]));
        assert_eq!(t.left, vec!["a"]);
        assert_eq!(t.entered, vec!["c"]);

        // Nothing is stored until commit
        assert!(detector.is_inside(E, "a"));
        detector.commit(E, &at(5.0, 0.0, 0.0), t);
        assert!(!detector.is_inside(E, "a"));
        assert!(detector.is_inside(E, "c"));
    }

    #[test]
    fn test_same_sample_is_idempotent() {
        let mut detector = TransitionDetector::new();
        let t = detector.diff(E, set(&["a"]));
        detector.commit(E, &at(0.0, 0.0, 0.0), t);

        assert!(detector.diff(E, set(&["a"])).is_empty());
    }

    #[test]
    fn test_needs_check_skips_same_block() {
        let mut detector = TransitionDetector::new();
        assert!(detector.needs_check(E, &at(0.2, 0.0, 0.2)));

        detector.commit(E, &at(0.2, 0.0, 0.2), Transition::default());
        assert!(!detector.needs_check(E, &at(0.9, 0.5, 0.9)));
        assert!(detector.needs_check(E, &at(1.0, 0.5, 0.9)));
        assert!(detector.needs_check(E, &Position::new("nether", 0.2, 0.0, 0.2)));

        detector.invalidate_positions();
        assert!(detector.needs_check(E, &at(0.2, 0.0, 0.2)));
    }

    #[test]
    fn test_purge_volume() {
        let mut detector = TransitionDetector::new();
        detector.commit(E, &at(0.0, 0.0, 0.0), detector.diff(E, set(&["a", "b"])));
        detector.commit(EntityId(2), &at(0.0, 0.0, 0.0), detector.diff(EntityId(2), set(&["a"])));

        assert_eq!(detector.purge_volume("a"), 2);
        assert_eq!(detector.membership(E), Some(&set(&["b"])));
        assert!(detector.diff(E, set(&["b"])).is_empty());
    }

    #[test]
    fn test_reconcile_drops_volumes_moved_away() {
        let mut index = SpatialIndex::default();
        let old = Volume::new("v", "world", VolumeBounds::from_corners([0.0; 3], [3.0; 3]).unwrap()).unwrap();
        index.rebuild([&old]);

        let mut detector = TransitionDetector::new();
        let position = at(1.0, 1.0, 1.0);
        detector.commit(E, &position, detector.detect(E, &position, &index));
        assert!(detector.is_inside(E, "v"));

        // Unchanged geometry keeps membership
        assert_eq!(detector.reconcile(&index), 0);
        assert!(detector.is_inside(E, "v"));

        let moved = Volume::new(
            "V",
            "world",
            VolumeBounds::from_corners([100.0; 3], [103.0; 3]).unwrap(),
        )
        .unwrap();
        index.rebuild([&moved]);
        assert_eq!(detector.reconcile(&index), 1);
        assert!(!detector.is_inside(E, "v"));
        assert!(detector.detect(E, &at(1.2, 1.0, 1.0), &index).is_empty());
    }

    #[test]
    fn test_forget() {
        let mut detector = TransitionDetector::new();
        detector.commit(E, &at(0.0, 0.0, 0.0), detector.diff(E, set(&["a"])));

        let removed = detector.forget(E).unwrap();
        assert_eq!(removed.volumes, set(&["a"]));
        assert_eq!(detector.tracked_count(), 0);
        assert_eq!(detector.diff(E, set(&["a"])).entered, vec!["a"]);
    }
}
