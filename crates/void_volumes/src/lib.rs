//! Void Volumes - Trigger Volume System
//!
//! Named axis-aligned regions that run configured actions when an entity
//! enters or leaves them.
//!
//! # Features
//!
//! - Column-based spatial index per world
//! - Enter/Leave detection with leave-before-enter ordering
//! - Per-entity, per-volume, per-direction cooldowns
//! - Command, console, message and teleport actions with placeholders
//! - Permission gate and transition observers
//!
//! # Example
//!
//! ```ignore
//! use void_volumes::prelude::*;
//!
//! let mut engine = TriggerEngine::new(&TriggerConfig::default());
//! engine.add_handler(TransitionHandler::new().on_enter(|e| println!("{}", e)));
//!
//! let outcome = engine.on_move(&snapshot, &store, &mut host);
//! ```

pub mod action;
pub mod config;
pub mod cooldown;
pub mod detector;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod events;
pub mod permission;
pub mod spatial;
pub mod types;
pub mod volume;

pub mod prelude {
    pub use crate::action::{Action, ActionKind, TeleportTarget};
    pub use crate::config::{CooldownConfig, TriggerConfig};
    pub use crate::cooldown::CooldownGate;
    pub use crate::detector::{Membership, Transition, TransitionDetector};
    pub use crate::dispatch::{ActionDispatcher, ActionHost, Destination, DispatchReport};
    pub use crate::engine::{Disposition, EventRecord, TriggerEngine, UpdateOutcome};
    pub use crate::error::{ActionParseError, DispatchError, GeometryError};
    pub use crate::events::{TransitionEvent, TransitionHandler, TransitionKind};
    pub use crate::permission::{AllowAll, EntityFilter, PermissionGate};
    pub use crate::spatial::SpatialIndex;
    pub use crate::types::{BlockPos, EntityId, EntitySnapshot, Position};
    pub use crate::volume::{volume_key, Volume, VolumeBounds, VolumeSource};
}

pub use prelude::*;
