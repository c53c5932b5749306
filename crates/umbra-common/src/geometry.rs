//! Planar geometry helpers.
//!
//! Units move on a ground plane (XZ); the Y axis is height and is ignored by
//! every distance used for decisions.

pub use glam::Vec3;

/// Distance between two points projected on the ground plane.
#[must_use]
pub fn flat_distance(a: Vec3, b: Vec3) -> f32 {
    flatten(b - a).length()
}

/// Drops the vertical component of a vector.
#[must_use]
pub fn flatten(v: Vec3) -> Vec3 {
    Vec3::new(v.x, 0.0, v.z)
}

/// Unit direction from `from` towards `to` on the ground plane.
///
/// Returns `Vec3::ZERO` when the points coincide.
#[must_use]
pub fn flat_direction(from: Vec3, to: Vec3) -> Vec3 {
    flatten(to - from).normalize_or_zero()
}

/// Ground-plane perpendicular of a direction (rotated 90° counter-clockwise).
#[must_use]
pub fn flat_perpendicular(dir: Vec3) -> Vec3 {
    Vec3::new(-dir.z, 0.0, dir.x)
}

/// Index of the point nearest to `origin`, or `None` for an empty slice.
#[must_use]
pub fn nearest_index(origin: Vec3, points: &[Vec3]) -> Option<usize> {
    points
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| flat_distance(origin, **a).total_cmp(&flat_distance(origin, **b)))
        .map(|(i, _)| i)
}
