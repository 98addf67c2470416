//! Particle release points on refined-grid cells

pub mod face;
pub mod point;
pub mod scheme;

pub use face::{Face, FaceSubdivision, FaceSubdivisions};
pub use point::{prp_records, PrpRecord, ReleasePoint};
pub use scheme::{ReleaseGroup, ReleaseScheme};
