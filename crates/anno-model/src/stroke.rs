//! Fixed-capacity brush stroke record
//!
//! A freehand stroke must present a constant per-record stride to the
//! packing pass while interactive drawing grows it one voxel at a time.
//! The record therefore reserves space for a fixed maximum number of
//! voxels and carries the live count denormalized at the front; only the
//! first `num_voxels` coordinate triples are meaningful, the rest is
//! zeroed slack that ships with every copy.

use bytemuck::{Pod, Zeroable};
use tracing::debug;

use crate::geometry::Vec3;

/// Maximum number of voxels a single stroke can record
pub const STROKE_CAPACITY: usize = 2000;

/// Serialized size of one stroke record in bytes:
/// count (4) + capacity coordinate triples (capacity × 12) + RGB color (12)
pub const STROKE_RECORD_BYTES: usize = 4 + STROKE_CAPACITY * 3 * 4 + 3 * 4;

/// Default maximum distance between consecutive stroke voxels
///
/// Guards against a stroke silently jumping across unrelated image
/// regions when pointer events are dropped.
pub const DEFAULT_MAX_JUMP_DISTANCE: f32 = 10.0;

/// One brush stroke as a fixed-size binary record
///
/// Layout: `[count: u32][capacity × (x, y, z): f32][color r, g, b: f32]`,
/// native-endian IEEE-754 words.
#[repr(C)]
#[derive(Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct StrokeRecord {
    num_voxels: u32,
    voxel_coords: [[f32; 3]; STROKE_CAPACITY],
    color: [f32; 3],
}

// Catches layout drift against the record width the render consumer maps.
const _: () = assert!(std::mem::size_of::<StrokeRecord>() == STROKE_RECORD_BYTES);

impl StrokeRecord {
    /// Number of meaningful voxels in this record
    pub fn num_voxels(&self) -> usize {
        self.num_voxels as usize
    }

    /// Voxel coordinate at `index` (must be < `num_voxels()`)
    pub fn voxel(&self, index: usize) -> Vec3 {
        self.voxel_coords[index].into()
    }

    /// RGB color shared by the whole stroke, components in [0, 1]
    pub fn color(&self) -> [f32; 3] {
        self.color
    }

    pub fn set_color(&mut self, color: [f32; 3]) {
        self.color = color;
    }

    /// The full backing record as raw bytes (always `STROKE_RECORD_BYTES` long)
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }

    /// Unchecked append; callers enforce the capacity bound
    fn push(&mut self, voxel: Vec3) {
        self.voxel_coords[self.num_voxels as usize] = voxel.into();
        self.num_voxels += 1;
    }
}

impl Default for StrokeRecord {
    fn default() -> Self {
        Zeroable::zeroed()
    }
}

impl std::fmt::Debug for StrokeRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StrokeRecord")
            .field("num_voxels", &self.num_voxels)
            .field("color", &self.color)
            .finish_non_exhaustive()
    }
}

/// Result of attempting to add a voxel to a stroke
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoxelOutcome {
    /// The voxel was appended
    Added,
    /// The voxel rounds to the same cell as the previous one
    DuplicateDiscarded,
    /// The voxel is farther from the previous one than the jump threshold
    TooFarDiscarded,
    /// The stroke already holds `STROKE_CAPACITY` voxels
    CapacityReached,
}

impl VoxelOutcome {
    pub fn is_added(&self) -> bool {
        matches!(self, VoxelOutcome::Added)
    }
}

/// An in-progress or completed freehand stroke
///
/// Incoming coordinates are floored to integer voxels and filtered for
/// spatial continuity; discarded points are logged and never abort the
/// drawing session. Whether `CapacityReached` is an error is the
/// caller's decision - the stroke itself is left unchanged either way.
#[derive(Debug, Clone, PartialEq)]
pub struct BrushStroke {
    record: Box<StrokeRecord>,
    max_jump_distance: f32,
}

impl BrushStroke {
    /// Create a stroke starting at `first_voxel` with the given RGB color
    pub fn new(first_voxel: Vec3, color: [f32; 3]) -> Self {
        let mut stroke = Self {
            record: Box::new(StrokeRecord::default()),
            max_jump_distance: DEFAULT_MAX_JUMP_DISTANCE,
        };
        stroke.record.set_color(color);
        stroke.add_voxel(first_voxel);
        stroke
    }

    /// Rebuild a stroke from an ordered voxel list, bypassing the
    /// interactive duplicate and jump-distance filters
    ///
    /// Coordinates are still floored; entries beyond `STROKE_CAPACITY`
    /// are ignored (restore paths validate the count beforehand).
    pub fn from_voxels(voxels: &[Vec3], color: [f32; 3]) -> Self {
        let mut record = Box::new(StrokeRecord::default());
        record.set_color(color);
        for voxel in voxels.iter().take(STROKE_CAPACITY) {
            record.push(voxel.floor());
        }
        Self { record, max_jump_distance: DEFAULT_MAX_JUMP_DISTANCE }
    }

    /// Override the jump-distance threshold (`f32::INFINITY` disables the guard)
    pub fn with_max_jump_distance(mut self, distance: f32) -> Self {
        self.max_jump_distance = distance;
        self
    }

    /// Floor `coord` to a voxel and append it, subject to the continuity filters
    pub fn add_voxel(&mut self, coord: Vec3) -> VoxelOutcome {
        let voxel = coord.floor();
        if let Some(last) = self.last_voxel() {
            if last == voxel {
                debug!(?voxel, "discarding repeated voxel");
                return VoxelOutcome::DuplicateDiscarded;
            }
            if last.distance_to(&voxel) > self.max_jump_distance {
                debug!(?voxel, ?last, "discarding voxel too far from the previous one");
                return VoxelOutcome::TooFarDiscarded;
            }
        }
        if self.num_voxels() >= STROKE_CAPACITY {
            debug!(capacity = STROKE_CAPACITY, "stroke is full, discarding voxel");
            return VoxelOutcome::CapacityReached;
        }
        self.record.push(voxel);
        VoxelOutcome::Added
    }

    pub fn num_voxels(&self) -> usize {
        self.record.num_voxels()
    }

    /// Voxel coordinate at `index` (must be < `num_voxels()`)
    pub fn voxel(&self, index: usize) -> Vec3 {
        self.record.voxel(index)
    }

    /// The voxel the stroke started at
    pub fn first_voxel(&self) -> Vec3 {
        self.record.voxel(0)
    }

    fn last_voxel(&self) -> Option<Vec3> {
        match self.num_voxels() {
            0 => None,
            n => Some(self.record.voxel(n - 1)),
        }
    }

    /// Iterate over the meaningful voxels in draw order
    pub fn voxels(&self) -> impl Iterator<Item = Vec3> + '_ {
        (0..self.num_voxels()).map(|index| self.record.voxel(index))
    }

    pub fn color(&self) -> [f32; 3] {
        self.record.color()
    }

    pub fn set_color(&mut self, color: [f32; 3]) {
        self.record.set_color(color);
    }

    /// Direct access to the backing record
    pub fn record(&self) -> &StrokeRecord {
        &self.record
    }

    /// Bulk-copy the whole backing record into `out`
    ///
    /// Always copies the full capacity worth of coordinate slots (unused
    /// slack included, deterministically zero) so the record width stays
    /// constant regardless of `num_voxels()`.
    pub fn fill_record(&self, out: &mut [u8]) {
        out[..STROKE_RECORD_BYTES].copy_from_slice(self.record.as_bytes());
    }
}
