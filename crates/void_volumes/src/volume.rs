//! Trigger volume geometry and action lists

use serde::{Deserialize, Serialize};

use crate::action::Action;
use crate::error::GeometryError;
use crate::events::TransitionKind;
use crate::types::Position;

/// Lookup key for a volume name (names are case-insensitive)
pub fn volume_key(name: &str) -> String {
    name.to_lowercase()
}

/// Axis-aligned box in block coordinates, normalized so `min <= max`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolumeBounds {
    min: [f64; 3],
    max: [f64; 3],
}

impl VolumeBounds {
    /// Create bounds from two opposite corners in any order
    pub fn from_corners(a: [f64; 3], b: [f64; 3]) -> Result<Self, GeometryError> {
        const AXES: [char; 3] = ['x', 'y', 'z'];
        for i in 0..3 {
            for value in [a[i], b[i]] {
                if !value.is_finite() {
                    return Err(GeometryError::NonFinite {
                        axis: AXES[i],
                        value,
                    });
                }
            }
        }

        Ok(Self {
            min: [a[0].min(b[0]), a[1].min(b[1]), a[2].min(b[2])],
            max: [a[0].max(b[0]), a[1].max(b[1]), a[2].max(b[2])],
        })
    }

    /// Minimum corner
    #[inline]
    pub fn min(&self) -> [f64; 3] {
        self.min
    }

    /// Maximum corner
    #[inline]
    pub fn max(&self) -> [f64; 3] {
        self.max
    }

    /// Check if a point is inside.
    ///
    /// A block spans `[n, n + 1)`, so the max corner is extended by one to
    /// cover the whole block it names. Upper bounds are exclusive: touching
    /// volumes never share a face.
    #[inline]
    pub fn contains(&self, x: f64, y: f64, z: f64) -> bool {
        x >= self.min[0]
            && x < self.max[0] + 1.0
            && y >= self.min[1]
            && y < self.max[1] + 1.0
            && z >= self.min[2]
            && z < self.max[2] + 1.0
    }

    /// Center point
    pub fn center(&self) -> [f64; 3] {
        [
            (self.min[0] + self.max[0]) / 2.0,
            (self.min[1] + self.max[1]) / 2.0,
            (self.min[2] + self.max[2]) / 2.0,
        ]
    }

    /// Size in blocks along each axis
    pub fn extent(&self) -> [f64; 3] {
        [
            self.max[0] - self.min[0] + 1.0,
            self.max[1] - self.min[1] + 1.0,
            self.max[2] - self.min[2] + 1.0,
        ]
    }

    /// Enclosed volume in cubic blocks
    pub fn volume(&self) -> f64 {
        let e = self.extent();
        e[0] * e[1] * e[2]
    }
}

/// A named trigger volume with its enter and leave actions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Volume {
    name: String,
    world: String,
    bounds: VolumeBounds,
    enter_actions: Vec<Action>,
    leave_actions: Vec<Action>,
}

impl Volume {
    /// Create a volume with no actions
    pub fn new(
        name: impl Into<String>,
        world: impl Into<String>,
        bounds: VolumeBounds,
    ) -> Result<Self, GeometryError> {
        let name = name.into();
        let world = world.into();
        if name.trim().is_empty() {
            return Err(GeometryError::EmptyName);
        }
        if world.trim().is_empty() {
            return Err(GeometryError::EmptyWorld);
        }

        Ok(Self {
            name,
            world,
            bounds,
            enter_actions: Vec::new(),
            leave_actions: Vec::new(),
        })
    }

    /// Display name as created
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Case-insensitive lookup key
    pub fn key(&self) -> String {
        volume_key(&self.name)
    }

    /// World this volume lives in
    pub fn world(&self) -> &str {
        &self.world
    }

    /// Geometry
    pub fn bounds(&self) -> &VolumeBounds {
        &self.bounds
    }

    /// Check if a position is inside (world and box)
    pub fn contains(&self, position: &Position) -> bool {
        position.world == self.world && self.bounds.contains(position.x, position.y, position.z)
    }

    /// Actions for one direction, in execution order
    pub fn actions(&self, kind: TransitionKind) -> &[Action] {
        match kind {
            TransitionKind::Enter => &self.enter_actions,
            TransitionKind::Leave => &self.leave_actions,
        }
    }

    /// Append an action to one direction's list
    pub fn add_action(&mut self, kind: TransitionKind, action: Action) {
        self.actions_mut(kind).push(action);
    }

    /// Remove every action of one direction
    pub fn clear_actions(&mut self, kind: TransitionKind) {
        self.actions_mut(kind).clear();
    }

    /// Remove every enter and leave action
    pub fn clear_all_actions(&mut self) {
        self.enter_actions.clear();
        self.leave_actions.clear();
    }

    /// Replace both action lists with copies of another volume's lists
    pub fn copy_actions_from(&mut self, other: &Volume) {
        self.enter_actions = other.enter_actions.clone();
        self.leave_actions = other.leave_actions.clone();
    }

    fn actions_mut(&mut self, kind: TransitionKind) -> &mut Vec<Action> {
        match kind {
            TransitionKind::Enter => &mut self.enter_actions,
            TransitionKind::Leave => &mut self.leave_actions,
        }
    }
}

/// Read access to the set of defined volumes.
///
/// Implementors bump [`VolumeSource::revision`] on every mutation so the
/// engine knows when its spatial index must be rebuilt.
pub trait VolumeSource {
    /// Look up a volume by name (case-insensitive)
    fn get(&self, name: &str) -> Option<&Volume>;

    /// Every defined volume
    fn volumes(&self) -> Box<dyn Iterator<Item = &Volume> + '_>;

    /// Mutation counter
    fn revision(&self) -> u64;
}
