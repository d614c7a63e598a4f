//! In-memory volume store with groups

use std::collections::BTreeMap;

use void_volumes::{volume_key, Action, TransitionKind, Volume, VolumeBounds, VolumeSource};

use crate::error::{Result, StoreError};
use crate::group::{VolumeGroup, MIN_GROUP_SIZE};

/// Owns every volume definition and group.
///
/// Keys are lowercased names. Every mutation bumps the revision so a
/// [`void_volumes::TriggerEngine`] reading the store rebuilds its index.
#[derive(Debug, Clone, Default)]
pub struct VolumeStore {
    volumes: BTreeMap<String, Volume>,
    groups: BTreeMap<String, VolumeGroup>,
    revision: u64,
}

impl VolumeStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    fn bump(&mut self) {
        self.revision += 1;
    }

    fn volume_mut(&mut self, name: &str) -> Result<&mut Volume> {
        self.volumes
            .get_mut(&volume_key(name))
            .ok_or_else(|| StoreError::VolumeNotFound(name.to_string()))
    }

    // ========== Volumes ==========

    /// Create a volume from two opposite corners
    pub fn create_volume(
        &mut self,
        name: &str,
        world: &str,
        a: [f64; 3],
        b: [f64; 3],
    ) -> Result<&Volume> {
        let bounds = VolumeBounds::from_corners(a, b)?;
        self.insert_volume(Volume::new(name, world, bounds)?)
    }

    /// Insert a prebuilt volume
    pub fn insert_volume(&mut self, volume: Volume) -> Result<&Volume> {
        let key = volume.key();
        if self.volumes.contains_key(&key) {
            return Err(StoreError::DuplicateVolume(volume.name().to_string()));
        }
        log::info!("Created volume '{}' in {}", volume.name(), volume.world());
        self.bump();
        Ok(self.volumes.entry(key).or_insert(volume))
    }

    /// Delete a volume and drop it from every group. Groups left with fewer
    /// than two members are deleted too.
    pub fn delete_volume(&mut self, name: &str) -> Result<Volume> {
        let volume = self
            .volumes
            .remove(&volume_key(name))
            .ok_or_else(|| StoreError::VolumeNotFound(name.to_string()))?;

        for group in self.groups.values_mut() {
            group.remove(name);
        }
        self.prune_groups();
        self.bump();

        log::info!("Deleted volume '{}'", volume.name());
        Ok(volume)
    }

    /// Look up a volume
    pub fn get(&self, name: &str) -> Option<&Volume> {
        self.volumes.get(&volume_key(name))
    }

    /// Whether a volume exists
    pub fn contains(&self, name: &str) -> bool {
        self.volumes.contains_key(&volume_key(name))
    }

    /// Every volume, ordered by key
    pub fn list_all(&self) -> impl Iterator<Item = &Volume> {
        self.volumes.values()
    }

    /// Display names of every volume
    pub fn names(&self) -> Vec<String> {
        self.volumes.values().map(|v| v.name().to_string()).collect()
    }

    /// Number of volumes
    pub fn len(&self) -> usize {
        self.volumes.len()
    }

    /// Whether the store holds no volumes
    pub fn is_empty(&self) -> bool {
        self.volumes.is_empty()
    }

    // ========== Actions ==========

    /// Append an action to one of a volume's lists
    pub fn add_action(&mut self, name: &str, kind: TransitionKind, action: Action) -> Result<()> {
        self.volume_mut(name)?.add_action(kind, action);
        self.bump();
        Ok(())
    }

    /// Clear one list, or both when `kind` is `None`
    pub fn clear_actions(&mut self, name: &str, kind: Option<TransitionKind>) -> Result<()> {
        let volume = self.volume_mut(name)?;
        match kind {
            Some(kind) => volume.clear_actions(kind),
            None => volume.clear_all_actions(),
        }
        self.bump();
        Ok(())
    }

    /// Replace the target's action lists with copies of the source's
    pub fn clone_actions(&mut self, source: &str, target: &str) -> Result<()> {
        let source_volume = self
            .get(source)
            .cloned()
            .ok_or_else(|| StoreError::VolumeNotFound(source.to_string()))?;
        self.volume_mut(target)?.copy_actions_from(&source_volume);
        self.bump();
        Ok(())
    }

    // ========== Groups ==========

    /// Create a group of at least two existing volumes
    pub fn create_group<I, S>(&mut self, name: &str, members: I) -> Result<&VolumeGroup>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let key = volume_key(name);
        if self.groups.contains_key(&key) {
            return Err(StoreError::DuplicateGroup(name.to_string()));
        }

        let group = VolumeGroup::new(name, members);
        if let Some(missing) = group.members().iter().find(|m| !self.contains(m)) {
            return Err(StoreError::VolumeNotFound(missing.clone()));
        }
        if !group.is_viable() {
            return Err(StoreError::GroupTooSmall {
                name: name.to_string(),
                count: group.len(),
            });
        }

        log::info!("Created group '{}' with {} volumes", name, group.len());
        self.bump();
        Ok(self.groups.entry(key).or_insert(group))
    }

    /// Delete a group. Its volumes are kept.
    pub fn delete_group(&mut self, name: &str) -> Result<VolumeGroup> {
        let group = self
            .groups
            .remove(&volume_key(name))
            .ok_or_else(|| StoreError::GroupNotFound(name.to_string()))?;
        self.bump();
        Ok(group)
    }

    /// Add an existing volume to a group
    pub fn add_to_group(&mut self, group: &str, volume: &str) -> Result<()> {
        if !self.contains(volume) {
            return Err(StoreError::VolumeNotFound(volume.to_string()));
        }
        let entry = self
            .groups
            .get_mut(&volume_key(group))
            .ok_or_else(|| StoreError::GroupNotFound(group.to_string()))?;
        if !entry.add(volume) {
            return Err(StoreError::AlreadyInGroup {
                group: group.to_string(),
                volume: volume.to_string(),
            });
        }
        self.bump();
        Ok(())
    }

    /// Remove a volume from a group, deleting the group if it drops below two
    /// members. Returns whether the group was deleted.
    pub fn remove_from_group(&mut self, group: &str, volume: &str) -> Result<bool> {
        let key = volume_key(group);
        let entry = self
            .groups
            .get_mut(&key)
            .ok_or_else(|| StoreError::GroupNotFound(group.to_string()))?;
        if !entry.remove(volume) {
            return Err(StoreError::NotInGroup {
                group: group.to_string(),
                volume: volume.to_string(),
            });
        }

        let dissolved = !entry.is_viable();
        if dissolved {
            self.groups.remove(&key);
            log::info!("Group '{}' fell below {} volumes and was deleted", group, MIN_GROUP_SIZE);
        }
        self.bump();
        Ok(dissolved)
    }

    /// Look up a group
    pub fn group(&self, name: &str) -> Option<&VolumeGroup> {
        self.groups.get(&volume_key(name))
    }

    /// Display names of every group
    pub fn group_names(&self) -> Vec<String> {
        self.groups.values().map(|g| g.name().to_string()).collect()
    }

    /// Every group, ordered by key
    pub fn groups(&self) -> impl Iterator<Item = &VolumeGroup> {
        self.groups.values()
    }

    /// Names of the groups containing a volume
    pub fn groups_for_volume(&self, volume: &str) -> Vec<String> {
        self.groups
            .values()
            .filter(|g| g.contains(volume))
            .map(|g| g.name().to_string())
            .collect()
    }

    pub(crate) fn insert_group_unchecked(&mut self, group: VolumeGroup) {
        self.groups.insert(volume_key(group.name()), group);
        self.bump();
    }

    fn prune_groups(&mut self) {
        self.groups.retain(|_, group| {
            let keep = group.is_viable();
            if !keep {
                log::info!("Group '{}' fell below {} volumes and was deleted", group.name(), MIN_GROUP_SIZE);
            }
            keep
        });
    }

    // ========== Fan-out ==========

    /// Resolve a target name: a group resolves to its members, a volume to
    /// itself. Groups take precedence when both exist.
    pub fn resolve_targets(&self, name: &str) -> Result<Vec<String>> {
        if let Some(group) = self.group(name) {
            return Ok(group.members().to_vec());
        }
        match self.get(name) {
            Some(volume) => Ok(vec![volume.name().to_string()]),
            None => Err(StoreError::TargetNotFound(name.to_string())),
        }
    }

    /// Append an action to a volume or every member of a group. Returns the
    /// number of volumes updated.
    pub fn add_action_to(&mut self, target: &str, kind: TransitionKind, action: &Action) -> Result<usize> {
        let mut updated = 0;
        for name in self.resolve_targets(target)? {
            match self.add_action(&name, kind, action.clone()) {
                Ok(()) => updated += 1,
                Err(e) => log::warn!("Skipping '{}': {}", name, e),
            }
        }
        Ok(updated)
    }

    /// Clear actions of a volume or every member of a group. Returns the
    /// number of volumes updated.
    pub fn clear_actions_of(&mut self, target: &str, kind: Option<TransitionKind>) -> Result<usize> {
        let mut updated = 0;
        for name in self.resolve_targets(target)? {
            match self.clear_actions(&name, kind) {
                Ok(()) => updated += 1,
                Err(e) => log::warn!("Skipping '{}': {}", name, e),
            }
        }
        Ok(updated)
    }
}

impl VolumeSource for VolumeStore {
    fn get(&self, name: &str) -> Option<&Volume> {
        VolumeStore::get(self, name)
    }

    fn volumes(&self) -> Box<dyn Iterator<Item = &Volume> + '_> {
        Box::new(self.volumes.values())
    }

    fn revision(&self) -> u64 {
        self.revision
    }
}
