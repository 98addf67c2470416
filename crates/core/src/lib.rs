//! Well Capture-Zone Core Library
//!
//! Delineates the capture zone of a pumping well by particle tracking on a
//! quadtree-refined vertex grid. Particles are released around the well cell,
//! tracked backward with two independent engines, and their trajectories are
//! normalized into one schema for comparison.
//!
//! ## Pipeline
//!
//! - Grid refinement: structured base grid refined inside nested polygons
//! - Boundary placement: wells and rivers resolved to refined-grid cells
//! - Release generation: explicit or face-subdivided particle seeds
//! - Flow-field reversal: time-reversed head and face-flux series
//! - Tracking adapters: PRT and MODPATH 7 output normalized to trajectories
//! - Reconciliation: per-particle records, capture zone, engine consistency

// Core types and utilities
pub mod core_types;
pub mod error;

// Model construction
pub mod boundary;
pub mod grid;
pub mod release;

// Flow and tracking
pub mod flow;
pub mod reconcile;
pub mod tracking;

// Configuration and assembly
pub mod scenario;

// Re-export core types
pub use core_types::{GroupId, ParticleId, ParticleKey, Rect, TerminationReason, Vec2, Vec3};
pub use error::{
    AdapterError, ConfigError, GridError, LocateError, PipelineError, ReconcileError,
    ReleaseError, ReversalError,
};

// Re-export model construction types
pub use boundary::{BoundaryAssignment, BoundaryFeature, BoundaryGeometry, BoundaryLocator};
pub use grid::{BaseGrid, Grid, GridRefiner, RefinementFeature};
pub use release::{Face, FaceSubdivisions, ReleaseGroup, ReleasePoint, ReleaseScheme};

// Re-export flow and tracking types
pub use flow::{FlowFieldFrame, FlowFieldReverser, FlowFieldTimeSeries, TimeDiscretization};
pub use reconcile::{CaptureZone, ConsistencyReport, ReconciledRecord, TrajectoryReconciler};
pub use tracking::{
    Mp7Adapter, PrtAdapter, TrackingAdapter, TrackingDirection, TrackingEngine, Trajectory,
};

pub use scenario::{AssembledModel, CaptureAnalysis, Scenario, ScenarioConfig};
