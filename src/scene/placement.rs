//! Ground-plane placement for newly loaded instances: a greedy, deterministic
//! grid scan with a rightward fallback. Not a general packer; ties are broken
//! by scan order and the constants below are part of the behavior.

use crate::engine::Aabb;
use glam::Vec3;

/// Candidate grid extends from -GRID_RANGE to +GRID_RANGE on both axes.
pub const GRID_RANGE: f32 = 5.0;
/// Distance between candidate grid points.
pub const GRID_STEP: f32 = 1.5;
/// Margin added around the new footprint before overlap testing.
pub const GRID_PADDING: f32 = 0.2;
/// Extra gap past the rightmost edge when the grid is full.
pub const FALLBACK_GAP: f32 = 0.5;

/// Axis-aligned rectangle in the ground plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundRect {
    pub min_x: f32,
    pub max_x: f32,
    pub min_z: f32,
    pub max_z: f32,
}

impl GroundRect {
    pub fn from_bounds(bounds: &Aabb) -> Self {
        Self {
            min_x: bounds.min.x,
            max_x: bounds.max.x,
            min_z: bounds.min.z,
            max_z: bounds.max.z,
        }
    }

    pub fn overlaps(&self, other: &GroundRect) -> bool {
        !(self.max_x < other.min_x
            || self.min_x > other.max_x
            || self.max_z < other.min_z
            || self.min_z > other.max_z)
    }
}

/// Choose a root position for a new instance with the given footprint, given
/// the ground rectangles of every instance already placed. The first
/// instance goes to the origin; otherwise candidates are scanned row-major
/// (x outer, z inner) and the first whose padded footprint is free wins.
/// When the whole grid is occupied, the instance is placed just past the
/// rightmost existing edge.
pub fn choose_position(footprint: &Aabb, existing: &[GroundRect]) -> Vec3 {
    if existing.is_empty() {
        return Vec3::ZERO;
    }

    let width = footprint.width();
    let depth = footprint.depth();

    let mut x = -GRID_RANGE;
    while x <= GRID_RANGE {
        let mut z = -GRID_RANGE;
        while z <= GRID_RANGE {
            let candidate = GroundRect {
                min_x: x - width / 2.0 - GRID_PADDING,
                max_x: x + width / 2.0 + GRID_PADDING,
                min_z: z - depth / 2.0 - GRID_PADDING,
                max_z: z + depth / 2.0 + GRID_PADDING,
            };
            if !existing.iter().any(|rect| rect.overlaps(&candidate)) {
                return Vec3::new(x, 0.0, z);
            }
            z += GRID_STEP;
        }
        x += GRID_STEP;
    }

    let mut max_right_x = 0.0f32;
    for rect in existing {
        if rect.max_x > max_right_x {
            max_right_x = rect.max_x;
        }
    }
    Vec3::new(max_right_x + width + FALLBACK_GAP, 0.0, 0.0)
}
