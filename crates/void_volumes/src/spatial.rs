//! Horizontal cell index over trigger volumes
//!
//! Volumes are bucketed per world into square cells on the X/Z plane. A
//! lookup returns the volumes registered in the cell under a point; callers
//! still run the exact box test since a cell may hold volumes that only
//! partially overlap it. Height is not partitioned.

use std::collections::{BTreeSet, HashMap};

use crate::types::Position;
use crate::volume::{Volume, VolumeBounds};

/// Default cell edge length in world units
pub const DEFAULT_CELL_SIZE: f64 = 16.0;

/// Volumes spanning more cells than this are kept in a per-world list and
/// tested on every lookup instead
pub const MAX_CELLS_PER_VOLUME: i64 = 65_536;

/// Packed cell coordinate: X in the high 32 bits, Z in the low 32 bits
pub type CellKey = i64;

/// Pack two cell coordinates into one key
#[inline]
pub fn pack_cell(cx: i32, cz: i32) -> CellKey {
    ((cx as i64) << 32) | (cz as u32 as i64)
}

/// Volume entry stored in a cell
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedVolume {
    /// Volume key
    pub key: String,
    /// Geometry copy used for the exact test
    pub bounds: VolumeBounds,
}

/// Spatial index of volumes
#[derive(Debug, Clone)]
pub struct SpatialIndex {
    cell_size: f64,
    /// world -> cell -> volumes
    worlds: HashMap<String, HashMap<CellKey, Vec<IndexedVolume>>>,
    /// world -> volumes spanning more than [`MAX_CELLS_PER_VOLUME`] cells
    oversized: HashMap<String, Vec<IndexedVolume>>,
    /// Number of distinct volumes indexed
    volume_count: usize,
}

impl SpatialIndex {
    /// Create an empty index. Non-positive or non-finite sizes fall back to
    /// [`DEFAULT_CELL_SIZE`].
    pub fn new(cell_size: f64) -> Self {
        let cell_size = if cell_size.is_finite() && cell_size > 0.0 {
            cell_size
        } else {
            log::warn!(
                "Invalid cell size {}, using {}",
                cell_size,
                DEFAULT_CELL_SIZE
            );
            DEFAULT_CELL_SIZE
        };

        Self {
            cell_size,
            worlds: HashMap::new(),
            oversized: HashMap::new(),
            volume_count: 0,
        }
    }

    /// Cell edge length
    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    /// Cell coordinate along one horizontal axis
    #[inline]
    fn cell_coord(&self, value: f64) -> i32 {
        (value / self.cell_size).floor() as i32
    }

    /// Key of the cell containing a horizontal point
    #[inline]
    pub fn cell_of(&self, x: f64, z: f64) -> CellKey {
        pack_cell(self.cell_coord(x), self.cell_coord(z))
    }

    /// Clear and repopulate from the full volume set
    pub fn rebuild<'a, I>(&mut self, volumes: I)
    where
        I: IntoIterator<Item = &'a Volume>,
    {
        self.worlds.clear();
        self.oversized.clear();
        self.volume_count = 0;
        for volume in volumes {
            self.register(volume);
        }
        log::debug!(
            "Rebuilt spatial index: {} volumes in {} worlds",
            self.volume_count,
            self.worlds.len()
        );
    }

    /// Register a volume in every cell its box spans, replacing any entry
    /// with the same key
    pub fn insert(&mut self, volume: &Volume) {
        self.remove(&volume.key());
        self.register(volume);
    }

    /// Add a volume known not to be indexed yet
    fn register(&mut self, volume: &Volume) {
        let entry = IndexedVolume {
            key: volume.key(),
            bounds: *volume.bounds(),
        };
        let min = entry.bounds.min();
        let max = entry.bounds.max();
        let (min_cx, max_cx) = (self.cell_coord(min[0]), self.cell_coord(max[0] + 1.0));
        let (min_cz, max_cz) = (self.cell_coord(min[2]), self.cell_coord(max[2] + 1.0));

        // Cell coordinates saturate at the i32 range for extreme boxes
        let span = (max_cx as i64 - min_cx as i64 + 1).saturating_mul(max_cz as i64 - min_cz as i64 + 1);
        if span > MAX_CELLS_PER_VOLUME {
            log::warn!(
                "Volume '{}' spans {} cells, checking it on every lookup in {}",
                entry.key,
                span,
                volume.world()
            );
            self.oversized
                .entry(volume.world().to_string())
                .or_default()
                .push(entry);
            self.volume_count += 1;
            return;
        }

        let cells = self.worlds.entry(volume.world().to_string()).or_default();
        for cx in min_cx..=max_cx {
            for cz in min_cz..=max_cz {
                cells.entry(pack_cell(cx, cz)).or_default().push(entry.clone());
            }
        }
        self.volume_count += 1;
    }

    /// Remove a volume from every cell. Returns whether it was indexed.
    pub fn remove(&mut self, key: &str) -> bool {
        let mut found = false;
        for cells in self.worlds.values_mut() {
            cells.retain(|_, entries| {
                let before = entries.len();
                entries.retain(|e| e.key != key);
                found |= entries.len() != before;
                !entries.is_empty()
            });
        }
        self.worlds.retain(|_, cells| !cells.is_empty());
        for entries in self.oversized.values_mut() {
            let before = entries.len();
            entries.retain(|e| e.key != key);
            found |= entries.len() != before;
        }
        self.oversized.retain(|_, entries| !entries.is_empty());
        if found {
            self.volume_count -= 1;
        }
        found
    }

    /// Volumes registered in the cell containing a point
    pub fn candidates(&self, world: &str, x: f64, z: f64) -> &[IndexedVolume] {
        self.worlds
            .get(world)
            .and_then(|cells| cells.get(&self.cell_of(x, z)))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Volumes too large to register cell by cell in a world
    pub fn oversized(&self, world: &str) -> &[IndexedVolume] {
        self.oversized.get(world).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Keys of every volume that exactly contains a position
    pub fn volumes_at(&self, position: &Position) -> BTreeSet<String> {
        self.candidates(&position.world, position.x, position.z)
            .iter()
            .chain(self.oversized(&position.world))
            .filter(|entry| entry.bounds.contains(position.x, position.y, position.z))
            .map(|entry| entry.key.clone())
            .collect()
    }

    /// Number of distinct volumes indexed
    pub fn len(&self) -> usize {
        self.volume_count
    }

    /// Whether the index holds no volumes
    pub fn is_empty(&self) -> bool {
        self.volume_count == 0
    }
}

impl Default for SpatialIndex {
    fn default() -> Self {
        Self::new(DEFAULT_CELL_SIZE)
    }
}
