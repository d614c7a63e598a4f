//! Error types for trigger volumes

use thiserror::Error;

use crate::action::ActionKind;

/// Invalid volume geometry or identity
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    /// A corner coordinate is NaN or infinite
    #[error("Non-finite coordinate on axis {axis}: {value}")]
    NonFinite { axis: char, value: f64 },

    /// Volume name is empty or whitespace
    #[error("Volume name must not be empty")]
    EmptyName,

    /// World identifier is empty
    #[error("World name must not be empty")]
    EmptyWorld,
}

/// Unknown action type in stored or user-supplied data
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown action type: {0}")]
pub struct ActionParseError(pub String);

/// Failure while executing a single action
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DispatchError {
    /// Teleport payload has fewer than three tokens
    #[error("Teleport expects 'x y z [yaw pitch]', got {count} value(s) in '{payload}'")]
    TeleportArity { payload: String, count: usize },

    /// Teleport payload token is not a number
    #[error("Invalid teleport coordinate '{token}' in '{payload}'")]
    TeleportNumber { payload: String, token: String },

    /// Command payload is empty after substitution
    #[error("Empty {0} payload")]
    EmptyPayload(ActionKind),

    /// The host refused or failed to carry out the action
    #[error("Host rejected {kind} action: {reason}")]
    Rejected { kind: ActionKind, reason: String },
}
