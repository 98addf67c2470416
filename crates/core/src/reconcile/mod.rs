//! Merging engine trajectories into one record set and delineating capture zones

pub mod capture;
pub mod classify;
pub mod record;

pub use capture::{CaptureZone, ConsistencyReport, EngineComparison};
pub use classify::{LayerClass, Subproblem};
pub use record::{
    EngineTrajectories, ReconciledRecord, ReconciledRow, TrajectoryReconciler,
    DEFAULT_RELEASE_TOLERANCE,
};
