//! Well and river placement on the refined grid
//!
//! Assignments are returned explicitly and threaded through model assembly;
//! nothing here keeps global state.

pub mod feature;
pub mod locator;

pub use feature::{
    BoundaryAssignment, BoundaryAttributes, BoundaryCell, BoundaryFeature, BoundaryGeometry,
    FeatureAttributes, FeatureKind, FlowFaceFlags, StressPeriodRow,
};
pub use locator::{locate, locate_all, BoundaryLocator};
