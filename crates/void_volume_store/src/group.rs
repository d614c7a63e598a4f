//! Named volume groups for batch editing

use serde::{Deserialize, Serialize};
use void_volumes::volume_key;

/// Minimum number of members a group may have
pub const MIN_GROUP_SIZE: usize = 2;

/// An ordered set of volume names
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeGroup {
    name: String,
    members: Vec<String>,
}

impl VolumeGroup {
    /// Create a group. Duplicate members (ignoring case) are dropped.
    pub fn new<I, S>(name: impl Into<String>, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut group = Self {
            name: name.into(),
            members: Vec::new(),
        };
        for member in members {
            group.add(member);
        }
        group
    }

    /// Display name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Member names in insertion order
    pub fn members(&self) -> &[String] {
        &self.members
    }

    /// Membership check using volume key folding
    pub fn contains(&self, volume: &str) -> bool {
        let key = volume_key(volume);
        self.members.iter().any(|m| volume_key(m) == key)
    }

    /// Add a member. Returns false if already present.
    pub fn add(&mut self, volume: impl Into<String>) -> bool {
        let volume = volume.into();
        if self.contains(&volume) {
            return false;
        }
        self.members.push(volume);
        true
    }

    /// Remove a member. Returns false if absent.
    pub fn remove(&mut self, volume: &str) -> bool {
        let key = volume_key(volume);
        let before = self.members.len();
        self.members.retain(|m| volume_key(m) != key);
        self.members.len() != before
    }

    /// Number of members
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the group has no members
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Whether the group still meets the minimum size
    pub fn is_viable(&self) -> bool {
        self.members.len() >= MIN_GROUP_SIZE
    }
}
