//! Tracking-engine adapters and the canonical trajectory schema

pub mod engine;
pub mod mp7;
pub mod prt;
mod table;
pub mod trajectory;

pub use engine::{
    EngineOutput, EngineRun, EngineRunner, EngineSettings, Mp7Settings, PrtSettings,
    RecordedRunner, TrackingAdapter, TrackingDirection, TrackingEngine, WeakCellOption,
};
pub use mp7::Mp7Adapter;
pub use prt::PrtAdapter;
pub use trajectory::{Trajectory, TrajectoryPoint, TrajectoryRecord};
