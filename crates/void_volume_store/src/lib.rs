//! Void Volume Store - trigger volume definitions
//!
//! Owns the volume set the trigger engine reads through
//! [`void_volumes::VolumeSource`], plus named groups for batch editing and a
//! JSON file format with atomic saves.

pub mod error;
pub mod group;
pub mod persist;
pub mod store;

pub use error::{Result, StoreError};
pub use group::{VolumeGroup, MIN_GROUP_SIZE};
pub use persist::{from_json, load, save, to_json};
pub use store::VolumeStore;
