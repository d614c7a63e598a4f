//! JSON persistence for the volume store
//!
//! The whole store is rewritten on every save. Writes are atomic (write to a
//! temp file in the same directory, then rename), so a crash leaves either
//! the old or the new file, never a partial one.
//!
//! Loading is lenient: a volume with bad geometry or an action with an
//! unknown type is logged and skipped, and the rest of the file still loads.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use void_volumes::{Action, TransitionKind, Volume, VolumeBounds};

use crate::error::{Result, StoreError};
use crate::group::VolumeGroup;
use crate::store::VolumeStore;

/// Stored form of one action
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredAction {
    #[serde(rename = "type")]
    kind: String,
    value: String,
}

impl From<&Action> for StoredAction {
    fn from(action: &Action) -> Self {
        Self {
            kind: action.kind().as_str().to_string(),
            value: action.payload().to_string(),
        }
    }
}

/// Stored form of one volume
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredVolume {
    world: String,
    min: [f64; 3],
    max: [f64; 3],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    enter_actions: Option<Vec<StoredAction>>,
    #[serde(default)]
    leave_actions: Vec<StoredAction>,
    /// Single action list of older files, read as enter actions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    actions: Option<Vec<StoredAction>>,
}

/// The file as written. Volumes stay untyped until each entry is validated
/// on its own.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreDocument {
    #[serde(default)]
    volumes: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    groups: BTreeMap<String, Vec<String>>,
}

/// Load a store. A missing file yields an empty store.
pub fn load(path: impl AsRef<Path>) -> Result<VolumeStore> {
    let path = path.as_ref();
    if !path.exists() {
        log::info!("No volume file at {}, starting empty", path.display());
        return Ok(VolumeStore::new());
    }

    let text = fs::read_to_string(path)?;
    let store = from_json(&text)?;
    log::info!(
        "Loaded {} trigger volumes and {} groups from {}",
        store.len(),
        store.group_names().len(),
        path.display()
    );
    Ok(store)
}

/// Save a store, replacing the file atomically
pub fn save(store: &VolumeStore, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
    if let Some(dir) = dir {
        fs::create_dir_all(dir)?;
    }

    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "volumes.json".to_string());
    let temp_path = path.with_file_name(format!(".{}.tmp", filename));

    let document = to_document(store)?;
    {
        let file = File::create(&temp_path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &document)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        writer.flush()?;
    }
    fs::rename(&temp_path, path)?;

    log::debug!("Saved {} volumes to {}", store.len(), path.display());
    Ok(())
}

/// Parse a store from JSON text
pub fn from_json(text: &str) -> Result<VolumeStore> {
    let document: StoreDocument =
        serde_json::from_str(text).map_err(|e| StoreError::Deserialization(e.to_string()))?;

    let mut store = VolumeStore::new();
    for (name, value) in document.volumes {
        match read_volume(&name, value) {
            Ok(volume) => {
                if let Err(e) = store.insert_volume(volume) {
                    log::warn!("Skipping volume '{}': {}", name, e);
                }
            }
            Err(e) => log::warn!("Skipping volume '{}': {}", name, e),
        }
    }

    for (name, members) in document.groups {
        let requested = members.len();
        let members: Vec<String> = members.into_iter().filter(|m| store.contains(m)).collect();
        if members.len() != requested {
            log::warn!(
                "Group '{}' references {} missing volume(s)",
                name,
                requested - members.len()
            );
        }

        let group = VolumeGroup::new(name.as_str(), members);
        if group.is_viable() {
            store.insert_group_unchecked(group);
        } else {
            log::warn!("Skipping group '{}': fewer than 2 volumes", name);
        }
    }

    Ok(store)
}

/// Serialize a store to pretty JSON text
pub fn to_json(store: &VolumeStore) -> Result<String> {
    let document = to_document(store)?;
    serde_json::to_string_pretty(&document).map_err(|e| StoreError::Serialization(e.to_string()))
}

fn to_document(store: &VolumeStore) -> Result<StoreDocument> {
    let mut document = StoreDocument::default();
    for volume in store.list_all() {
        let stored = StoredVolume {
            world: volume.world().to_string(),
            min: volume.bounds().min(),
            max: volume.bounds().max(),
            enter_actions: Some(stored_actions(volume, TransitionKind::Enter)),
            leave_actions: stored_actions(volume, TransitionKind::Leave),
            actions: None,
        };
        let value = serde_json::to_value(stored).map_err(|e| StoreError::Serialization(e.to_string()))?;
        document.volumes.insert(volume.name().to_string(), value);
    }
    for group in store.groups() {
        document
            .groups
            .insert(group.name().to_string(), group.members().to_vec());
    }
    Ok(document)
}

fn stored_actions(volume: &Volume, kind: TransitionKind) -> Vec<StoredAction> {
    volume.actions(kind).iter().map(StoredAction::from).collect()
}

fn read_volume(name: &str, value: serde_json::Value) -> Result<Volume> {
    let stored: StoredVolume =
        serde_json::from_value(value).map_err(|e| StoreError::Deserialization(e.to_string()))?;

    let bounds = VolumeBounds::from_corners(stored.min, stored.max)?;
    let mut volume = Volume::new(name, stored.world.as_str(), bounds)?;

    let enter = match (stored.enter_actions, stored.actions) {
        (Some(enter), _) => enter,
        (None, Some(legacy)) => legacy,
        (None, None) => Vec::new(),
    };
    for (kind, list) in [(TransitionKind::Enter, enter), (TransitionKind::Leave, stored.leave_actions)] {
        for entry in list {
            match Action::parse(&entry.kind, entry.value) {
                Ok(action) => volume.add_action(kind, action),
                Err(e) => log::warn!("Volume '{}': {}", name, e),
            }
        }
    }
    Ok(volume)
}
