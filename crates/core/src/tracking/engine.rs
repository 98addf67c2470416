//! Tracking-engine boundary
//!
//! The integration kernels themselves run outside this crate. An
//! [`EngineRunner`] hands them a flow field and seeds and returns their raw
//! output text; a [`TrackingAdapter`] prepares the run and normalizes the
//! output into canonical trajectories.

use super::trajectory::Trajectory;
use crate::error::AdapterError;
use crate::flow::FlowFieldTimeSeries;
use crate::release::ReleasePoint;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingDirection {
    Forward,
    Backward,
}

impl fmt::Display for TrackingDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Forward => "forward",
            Self::Backward => "backward",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingEngine {
    /// MODFLOW 6 particle tracking model
    Prt,
    /// MODPATH 7
    Mp7,
}

impl fmt::Display for TrackingEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Prt => "PRT",
            Self::Mp7 => "MP7",
        })
    }
}

/// Weak sink/source handling requested from an engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeakCellOption {
    PassThrough,
    Stop,
}

/// PRT run options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrtSettings {
    /// Replaced by the scenario porosity when built from a scenario
    pub porosity: f64,
    /// Times at which positions are reported in addition to events
    pub track_times: Vec<f64>,
    pub exit_solve_tolerance: f64,
}

impl Default for PrtSettings {
    fn default() -> Self {
        Self {
            porosity: 0.1,
            track_times: (0..72).map(|i| f64::from(i) * 1000.0).collect(),
            exit_solve_tolerance: 1e-5,
        }
    }
}

/// MODPATH 7 run options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mp7Settings {
    /// Replaced by the scenario porosity when built from a scenario
    pub porosity: f64,
    pub weak_sink: WeakCellOption,
    pub weak_source: WeakCellOption,
    pub reference_time: f64,
    /// Extend the final period's flow field past the end of the simulation
    pub extend_stop_time: bool,
    pub time_points: Vec<f64>,
}

impl Default for Mp7Settings {
    fn default() -> Self {
        Self {
            porosity: 0.1,
            weak_sink: WeakCellOption::PassThrough,
            weak_source: WeakCellOption::PassThrough,
            reference_time: 0.0,
            extend_stop_time: true,
            time_points: vec![500.0, 1000.0],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "engine", rename_all = "snake_case")]
pub enum EngineSettings {
    Prt(PrtSettings),
    Mp7(Mp7Settings),
}

/// Everything an external engine needs for one batch run
#[derive(Debug, Clone, Copy)]
pub struct EngineRun<'a> {
    pub engine: TrackingEngine,
    /// Direction the engine itself integrates in
    pub direction: TrackingDirection,
    pub field: &'a FlowFieldTimeSeries,
    pub seeds: &'a [ReleasePoint],
    pub settings: &'a EngineSettings,
}

/// Raw engine output
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineOutput {
    /// Track / pathline table (CSV)
    pub tracks: String,
    /// Endpoint table (CSV), for engines that write one
    pub endpoints: Option<String>,
}

/// External tracking-engine invocation
///
/// A run is all-or-nothing: it returns the complete output or fails.
pub trait EngineRunner {
    fn run(&self, run: &EngineRun<'_>) -> Result<EngineOutput, AdapterError>;
}

/// Replays output that an engine produced earlier
#[derive(Debug, Clone, Default)]
pub struct RecordedRunner {
    output: EngineOutput,
}

impl RecordedRunner {
    pub fn new(output: EngineOutput) -> Self {
        Self { output }
    }

    pub fn from_text(tracks: impl Into<String>, endpoints: Option<String>) -> Self {
        Self::new(EngineOutput {
            tracks: tracks.into(),
            endpoints,
        })
    }

    /// Load a track table and, optionally, an endpoint table from disk
    pub fn from_files(tracks: &Path, endpoints: Option<&Path>) -> Result<Self, AdapterError> {
        let read = |path: &Path| {
            fs::read_to_string(path).map_err(|source| AdapterError::Io {
                path: path.to_path_buf(),
                source,
            })
        };
        Ok(Self::from_text(read(tracks)?, endpoints.map(read).transpose()?))
    }
}

impl EngineRunner for RecordedRunner {
    fn run(&self, _run: &EngineRun<'_>) -> Result<EngineOutput, AdapterError> {
        Ok(self.output.clone())
    }
}

/// Uniform interface over the tracking engines
pub trait TrackingAdapter {
    fn engine(&self) -> TrackingEngine;

    /// Direction the caller asked for
    fn direction(&self) -> TrackingDirection;

    /// Replace the seeded particles
    fn seed(&mut self, points: &[ReleasePoint]);

    /// Run the engine over `field` and normalize its trajectories
    fn step(&mut self, field: &FlowFieldTimeSeries) -> Result<Vec<Trajectory>, AdapterError>;

    fn track(
        &mut self,
        points: &[ReleasePoint],
        field: &FlowFieldTimeSeries,
    ) -> Result<Vec<Trajectory>, AdapterError> {
        self.seed(points);
        self.step(field)
    }
}
