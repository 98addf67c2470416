//! Vector type aliases for model-space positions.

use nalgebra::{Vector2, Vector3};

/// 3D vector type for model positions and cell-local coordinates.
///
/// This is a simple alias for `nalgebra::Vector3<f64>`, used for trajectory
/// positions (x, y, z in model length units) and for local release
/// coordinates in `[0, 1]^3`.
pub type Vec3 = Vector3<f64>;

/// Planar vector type for map-view geometry (vertices, well points, river lines).
pub type Vec2 = Vector2<f64>;
