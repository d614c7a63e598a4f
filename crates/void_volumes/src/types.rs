//! Entity identity and positions

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier of an entity that can trigger volumes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for EntityId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// A point in a named world
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// World identifier
    pub world: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    /// Create a new position
    pub fn new(world: impl Into<String>, x: f64, y: f64, z: f64) -> Self {
        Self {
            world: world.into(),
            x,
            y,
            z,
        }
    }

    /// The block this position falls into
    #[inline]
    pub fn block(&self) -> BlockPos {
        BlockPos {
            x: self.x.floor() as i64,
            y: self.y.floor() as i64,
            z: self.z.floor() as i64,
        }
    }

    /// Whether both positions are in the same world and block
    pub fn same_block(&self, other: &Position) -> bool {
        self.world == other.world && self.block() == other.block()
    }
}

/// Integer block coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockPos {
    pub x: i64,
    pub y: i64,
    pub z: i64,
}

/// Everything the engine needs to know about an entity for one update
#[derive(Debug, Clone)]
pub struct EntitySnapshot {
    /// Entity ID
    pub id: EntityId,
    /// Display name, substituted for `%entity%`
    pub name: String,
    /// Current position
    pub position: Position,
    /// Facing yaw in degrees
    pub yaw: f32,
    /// Facing pitch in degrees
    pub pitch: f32,
}

impl EntitySnapshot {
    /// Create a snapshot at a position with default facing
    pub fn new(id: EntityId, name: impl Into<String>, position: Position) -> Self {
        Self {
            id,
            name: name.into(),
            position,
            yaw: 0.0,
            pitch: 0.0,
        }
    }

    /// Set facing
    pub fn with_facing(mut self, yaw: f32, pitch: f32) -> Self {
        self.yaw = yaw;
        self.pitch = pitch;
        self
    }

    /// Set position
    pub fn with_position(mut self, position: Position) -> Self {
        self.position = position;
        self
    }
}
