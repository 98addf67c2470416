//! Error taxonomy
//!
//! Each component validates its own preconditions and fails with its own error
//! type. Variants carry enough context (feature name, cell id, particle key,
//! row number) to diagnose a failure without re-running the pipeline.
//! `PipelineError` aggregates them for scenario assembly and the binary.

use crate::core_types::ParticleKey;
use crate::tracking::TrackingEngine;
use std::path::PathBuf;
use thiserror::Error;

/// Invalid or ambiguous grid refinement
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GridError {
    #[error("invalid base grid: {reason}")]
    InvalidBaseGrid { reason: String },

    #[error("refinement feature '{feature}' is invalid: {reason}")]
    InvalidFeature { feature: String, reason: String },

    #[error(
        "refinement feature '{feature}' applies to layers {layers:?} but all {nlay} layers must be refined together"
    )]
    LayerMismatch {
        feature: String,
        layers: Vec<usize>,
        nlay: usize,
    },

    #[error(
        "refinement feature '{feature}' (level {level}) is not contained in any level {parent_level} feature"
    )]
    NotNested {
        feature: String,
        level: u8,
        parent_level: u8,
    },

    #[error("refined cell {cell} has a self-intersecting polygon")]
    SelfIntersecting { cell: usize },

    #[error("cell {cell} out of range (grid has {count} cells)")]
    CellOutOfRange { cell: usize, count: usize },
}

/// Boundary feature could not be resolved to grid cells
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LocateError {
    #[error("feature '{feature}': point ({x}, {y}) lies outside the grid")]
    OutsideGrid { feature: String, x: f64, y: f64 },

    #[error("feature '{feature}': point ({x}, {y}) is ambiguous between cells {cells:?}")]
    Ambiguous {
        feature: String,
        x: f64,
        y: f64,
        cells: Vec<usize>,
    },

    #[error("feature '{feature}': line does not cross the grid")]
    LineOutsideGrid { feature: String },

    #[error("feature '{feature}': degenerate geometry ({reason})")]
    DegenerateGeometry {
        feature: String,
        reason: &'static str,
    },

    #[error("feature '{feature}': {kind} features cannot use {geometry} geometry")]
    GeometryMismatch {
        feature: String,
        kind: &'static str,
        geometry: &'static str,
    },

    #[error("feature '{feature}': layer {layer} out of range (grid has {nlay} layers)")]
    LayerOutOfRange {
        feature: String,
        layer: usize,
        nlay: usize,
    },

    #[error("feature '{feature}': {points} points but {rates} pumping rates")]
    RateCountMismatch {
        feature: String,
        points: usize,
        rates: usize,
    },
}

/// Malformed flow-field time series
#[derive(Error, Debug)]
pub enum ReversalError {
    #[error("flow-field time series is empty")]
    Empty,

    #[error("frame {frame} has an invalid time span [{start}, {end})")]
    InvalidSpan { frame: usize, start: f64, end: f64 },

    #[error(
        "frame {frame} starts at {start} before the previous frame ends at {previous_end}; cumulative time must increase"
    )]
    NonMonotonic {
        frame: usize,
        start: f64,
        previous_end: f64,
    },

    #[error("frame {frame} has {found} {field} values, expected {expected}")]
    InconsistentFrame {
        frame: usize,
        field: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("failed to access flow-field file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse flow-field file {}: {source}", .path.display())]
    Format {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Release points could not be generated
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReleaseError {
    #[error("release target cell {cell} out of range (grid has {count} cells)")]
    CellOutOfRange { cell: usize, count: usize },

    #[error("release point {index} has local coordinate {value} outside [0, 1]")]
    LocalCoordinateOutOfRange { index: usize, value: f64 },

    #[error("cannot drape release points: no active cell in the stack of cell2d {icpl}")]
    NoActiveCell { icpl: usize },

    #[error("release scheme produces no points")]
    EmptyScheme,
}

/// Raw tracking-engine output could not be normalized
#[derive(Error, Debug)]
pub enum AdapterError {
    #[error("{engine}: step called before any particles were seeded")]
    NotSeeded { engine: TrackingEngine },

    #[error("{engine}: required column '{column}' is missing")]
    MissingColumn {
        engine: TrackingEngine,
        column: &'static str,
    },

    #[error("{engine}: row {row}, column '{column}': cannot parse '{value}'")]
    InvalidValue {
        engine: TrackingEngine,
        row: usize,
        column: &'static str,
        value: String,
    },

    #[error("{engine}: malformed table: {source}")]
    Csv {
        engine: TrackingEngine,
        #[source]
        source: csv::Error,
    },

    #[error("{engine}: expected {expected} {what}, found {found}")]
    RowCountMismatch {
        engine: TrackingEngine,
        what: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("{engine}: particle {key} has no seeded release point")]
    UnknownParticle {
        engine: TrackingEngine,
        key: ParticleKey,
    },

    #[error("{engine}: particle {key} time decreases at point {index}")]
    NonMonotonicTime {
        engine: TrackingEngine,
        key: ParticleKey,
        index: usize,
    },

    #[error("{engine}: particle {key} has no terminal point")]
    NonTerminal {
        engine: TrackingEngine,
        key: ParticleKey,
    },

    #[error("{engine}: particle {key} has unknown status code {status}")]
    UnknownStatus {
        engine: TrackingEngine,
        key: ParticleKey,
        status: i64,
    },

    #[error("failed to read engine output {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{engine}: flow field could not be prepared: {source}")]
    Field {
        engine: TrackingEngine,
        #[source]
        source: ReversalError,
    },

    #[error("{engine}: engine run failed: {message}")]
    Runner {
        engine: TrackingEngine,
        message: String,
    },
}

/// Engine trajectories could not be merged
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReconcileError {
    #[error("{engine} supplied more than one trajectory set")]
    DuplicateEngine { engine: TrackingEngine },

    #[error("{engine} produced more than one trajectory for particle {key}")]
    DuplicateKey {
        engine: TrackingEngine,
        key: ParticleKey,
    },

    #[error(
        "particle {key}: release time {first} ({first_engine}) contradicts {second} ({second_engine}); indexing mismatch upstream?"
    )]
    ContradictoryRelease {
        key: ParticleKey,
        first_engine: TrackingEngine,
        first: f64,
        second_engine: TrackingEngine,
        second: f64,
    },

    #[error("{engine} trajectory for particle {key} has no points")]
    EmptyTrajectory {
        engine: TrackingEngine,
        key: ParticleKey,
    },
}

/// Scenario configuration could not be loaded or saved
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to access config {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize config: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("scenario has no release groups")]
    NoReleaseGroups,

    #[error("releases target the well but the scenario has no well")]
    NoWellTarget,
}

/// Any failure along the capture-zone pipeline
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Grid(#[from] GridError),

    #[error(transparent)]
    Locate(#[from] LocateError),

    #[error(transparent)]
    Reversal(#[from] ReversalError),

    #[error(transparent)]
    Release(#[from] ReleaseError),

    #[error(transparent)]
    Adapter(#[from] AdapterError),

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("output error: {0}")]
    Output(String),
}
