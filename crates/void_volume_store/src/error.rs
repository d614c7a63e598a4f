//! Store errors

use thiserror::Error;
use void_volumes::GeometryError;

/// Volume store errors. All of them are reported to the caller and never
/// touch detection state.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A volume with this name exists (names are case-insensitive)
    #[error("Volume already exists: {0}")]
    DuplicateVolume(String),
    /// No such volume
    #[error("Volume not found: {0}")]
    VolumeNotFound(String),
    /// A group with this name exists
    #[error("Group already exists: {0}")]
    DuplicateGroup(String),
    /// No such group
    #[error("Group not found: {0}")]
    GroupNotFound(String),
    /// Groups need at least two members
    #[error("Group '{name}' needs at least 2 volumes, got {count}")]
    GroupTooSmall { name: String, count: usize },
    /// Volume already a member
    #[error("Volume '{volume}' is already in group '{group}'")]
    AlreadyInGroup { group: String, volume: String },
    /// Volume not a member
    #[error("Volume '{volume}' is not in group '{group}'")]
    NotInGroup { group: String, volume: String },
    /// Name resolves to neither a group nor a volume
    #[error("No volume or group named: {0}")]
    TargetNotFound(String),
    /// Invalid volume geometry
    #[error("Invalid geometry: {0}")]
    Geometry(#[from] GeometryError),
    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// Deserialization error
    #[error("Deserialization error: {0}")]
    Deserialization(String),
}

/// Store result type
pub type Result<T> = std::result::Result<T, StoreError>;
