//! Transition events

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::EntityId;

/// Direction of a volume transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionKind {
    /// Entity entered the volume
    Enter,
    /// Entity left the volume
    Leave,
}

impl fmt::Display for TransitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Enter => f.write_str("enter"),
            Self::Leave => f.write_str("leave"),
        }
    }
}

/// An entity entered or left a volume
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionEvent {
    /// Type of event
    pub kind: TransitionKind,
    /// The entity that moved
    pub entity: EntityId,
    /// Volume key (lowercase name)
    pub volume: String,
}

impl TransitionEvent {
    /// Create an enter event
    pub fn enter(entity: EntityId, volume: impl Into<String>) -> Self {
        Self {
            kind: TransitionKind::Enter,
            entity,
            volume: volume.into(),
        }
    }

    /// Create a leave event
    pub fn leave(entity: EntityId, volume: impl Into<String>) -> Self {
        Self {
            kind: TransitionKind::Leave,
            entity,
            volume: volume.into(),
        }
    }

    /// Check if this is an enter event
    pub fn is_enter(&self) -> bool {
        self.kind == TransitionKind::Enter
    }

    /// Check if this is a leave event
    pub fn is_leave(&self) -> bool {
        self.kind == TransitionKind::Leave
    }
}

impl fmt::Display for TransitionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} '{}'", self.entity, self.kind, self.volume)
    }
}

/// Callback type for transition events
pub type TransitionCallback = Box<dyn Fn(&TransitionEvent) + Send + Sync>;

/// Observer for transition events (metrics, auditing, scripting hooks)
pub struct TransitionHandler {
    /// Callback for enter events
    pub on_enter: Option<TransitionCallback>,
    /// Callback for leave events
    pub on_leave: Option<TransitionCallback>,
}

impl TransitionHandler {
    /// Create a new empty handler
    pub fn new() -> Self {
        Self {
            on_enter: None,
            on_leave: None,
        }
    }

    /// Set enter callback
    pub fn on_enter<F>(mut self, f: F) -> Self
    where
        F: Fn(&TransitionEvent) + Send + Sync + 'static,
    {
        self.on_enter = Some(Box::new(f));
        self
    }

    /// Set leave callback
    pub fn on_leave<F>(mut self, f: F) -> Self
    where
        F: Fn(&TransitionEvent) + Send + Sync + 'static,
    {
        self.on_leave = Some(Box::new(f));
        self
    }

    /// Handle an event
    pub fn handle(&self, event: &TransitionEvent) {
        let callback = match event.kind {
            TransitionKind::Enter => &self.on_enter,
            TransitionKind::Leave => &self.on_leave,
        };
        if let Some(callback) = callback {
            callback(event);
        }
    }
}

impl Default for TransitionHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TransitionHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransitionHandler")
            .field("on_enter", &self.on_enter.is_some())
            .field("on_leave", &self.on_leave.is_some())
            .finish()
    }
}
