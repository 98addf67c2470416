//! Core types and utilities

pub mod geometry;
pub mod ids;
pub mod termination;
pub mod vec3;

pub use geometry::{PointLocation, Rect};
pub use ids::{GroupId, ParticleId, ParticleKey};
pub use termination::TerminationReason;
pub use vec3::{Vec2, Vec3};
