//! Trigger actions and placeholder substitution

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{ActionParseError, DispatchError};
use crate::types::EntitySnapshot;

/// Kind of action, without payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Command executed as the triggering entity
    RunAsEntity,
    /// Command executed by the server console
    RunAsSystem,
    /// Message sent to the triggering entity
    SendMessage,
    /// Move the triggering entity
    Teleport,
}

impl ActionKind {
    /// Canonical name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RunAsEntity => "run_as_entity",
            Self::RunAsSystem => "run_as_system",
            Self::SendMessage => "send_message",
            Self::Teleport => "teleport",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = ActionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "run_as_entity" | "entity" | "player" | "player_command" => Ok(Self::RunAsEntity),
            "run_as_system" | "system" | "console" | "console_command" => Ok(Self::RunAsSystem),
            "send_message" | "message" | "msg" => Ok(Self::SendMessage),
            "teleport" | "tp" => Ok(Self::Teleport),
            _ => Err(ActionParseError(s.to_string())),
        }
    }
}

/// An action bound to a volume transition.
///
/// Payloads are templates: placeholders are resolved on a copy at execution
/// time and the stored value is never modified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Action {
    /// Command executed as the triggering entity
    RunAsEntity(String),
    /// Command executed by the server console
    RunAsSystem(String),
    /// Message sent to the triggering entity
    SendMessage(String),
    /// Teleport target, `"x y z"` or `"x y z yaw pitch"`
    Teleport(String),
}

impl Action {
    /// Build an action from a kind and payload
    pub fn new(kind: ActionKind, payload: impl Into<String>) -> Self {
        let payload = payload.into();
        match kind {
            ActionKind::RunAsEntity => Self::RunAsEntity(payload),
            ActionKind::RunAsSystem => Self::RunAsSystem(payload),
            ActionKind::SendMessage => Self::SendMessage(payload),
            ActionKind::Teleport => Self::Teleport(payload),
        }
    }

    /// Parse from a stored type name and payload
    pub fn parse(kind: &str, payload: impl Into<String>) -> Result<Self, ActionParseError> {
        Ok(Self::new(kind.parse()?, payload))
    }

    /// Kind of this action
    pub fn kind(&self) -> ActionKind {
        match self {
            Self::RunAsEntity(_) => ActionKind::RunAsEntity,
            Self::RunAsSystem(_) => ActionKind::RunAsSystem,
            Self::SendMessage(_) => ActionKind::SendMessage,
            Self::Teleport(_) => ActionKind::Teleport,
        }
    }

    /// Stored payload template
    pub fn payload(&self) -> &str {
        match self {
            Self::RunAsEntity(p) | Self::RunAsSystem(p) | Self::SendMessage(p) | Self::Teleport(p) => p,
        }
    }

    /// Payload with placeholders resolved for an entity
    pub fn resolve(&self, entity: &EntitySnapshot) -> String {
        substitute(self.payload(), entity)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind(), self.payload())
    }
}

/// Resolve `%entity%` / `%id%` (and the older `%player%` / `%uuid%`)
pub fn substitute(template: &str, entity: &EntitySnapshot) -> String {
    if !template.contains('%') {
        return template.to_string();
    }
    let id = entity.id.to_string();
    template
        .replace("%entity%", &entity.name)
        .replace("%player%", &entity.name)
        .replace("%id%", &id)
        .replace("%uuid%", &id)
}

/// Parsed teleport destination
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TeleportTarget {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    /// Yaw and pitch, if given
    pub facing: Option<(f32, f32)>,
}

impl TeleportTarget {
    /// Parse `"x y z [yaw pitch]"`. Yaw and pitch apply only as a pair; a
    /// lone fourth token and anything past the fifth are ignored.
    pub fn parse(payload: &str) -> Result<Self, DispatchError> {
        let tokens: Vec<&str> = payload.split_whitespace().collect();
        if tokens.len() < 3 {
            return Err(DispatchError::TeleportArity {
                payload: payload.to_string(),
                count: tokens.len(),
            });
        }

        let number = |token: &str| -> Result<f64, DispatchError> {
            token
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| DispatchError::TeleportNumber {
                    payload: payload.to_string(),
                    token: token.to_string(),
                })
        };

        let x = number(tokens[0])?;
        let y = number(tokens[1])?;
        let z = number(tokens[2])?;
        let facing = if tokens.len() >= 5 {
            Some((number(tokens[3])? as f32, number(tokens[4])? as f32))
        } else {
            None
        };

        Ok(Self { x, y, z, facing })
    }
}
