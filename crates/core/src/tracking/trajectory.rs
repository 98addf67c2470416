//! Canonical trajectory schema shared by every tracking engine

use super::engine::TrackingEngine;
use crate::core_types::{ParticleKey, TerminationReason, Vec3};
use crate::error::AdapterError;
use serde::{Deserialize, Serialize};

/// One tracked position
///
/// Node and layer numbers are 1-based whichever engine produced the point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryPoint {
    pub key: ParticleKey,
    /// 1-based node
    pub cell: usize,
    /// 1-based layer
    pub layer: usize,
    pub position: Vec3,
    pub time: f64,
    /// `Released` on the release point, the terminal reason on the last
    /// point, `None` in between
    pub reason: Option<TerminationReason>,
}

/// Time-ordered points of one particle ending in a terminal reason
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    pub key: ParticleKey,
    pub points: Vec<TrajectoryPoint>,
}

impl Trajectory {
    /// Validate and build a trajectory
    ///
    /// Points must be non-empty, share `key`, never decrease in time, and the
    /// last must carry a terminal reason.
    pub fn new(
        engine: TrackingEngine,
        key: ParticleKey,
        points: Vec<TrajectoryPoint>,
    ) -> Result<Self, AdapterError> {
        let last = points
            .last()
            .ok_or(AdapterError::NonTerminal { engine, key })?;
        if !last.reason.is_some_and(TerminationReason::is_terminal) {
            return Err(AdapterError::NonTerminal { engine, key });
        }
        if let Some(point) = points.iter().find(|p| p.key != key) {
            return Err(AdapterError::UnknownParticle {
                engine,
                key: point.key,
            });
        }
        if let Some(index) = points
            .windows(2)
            .position(|w| w[1].time < w[0].time || w[1].time.is_nan())
        {
            return Err(AdapterError::NonMonotonicTime {
                engine,
                key,
                index: index + 1,
            });
        }
        Ok(Self { key, points })
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Minimum time over the trajectory
    pub fn release_time(&self) -> f64 {
        self.points
            .iter()
            .map(|p| p.time)
            .fold(f64::INFINITY, f64::min)
    }

    /// Maximum time over the trajectory
    pub fn termination_time(&self) -> f64 {
        self.points
            .iter()
            .map(|p| p.time)
            .fold(f64::NEG_INFINITY, f64::max)
    }

    pub fn terminal_point(&self) -> Option<&TrajectoryPoint> {
        self.points.last()
    }

    pub fn termination_reason(&self) -> Option<TerminationReason> {
        self.terminal_point().and_then(|p| p.reason)
    }

    /// Flat rows in the canonical tabular schema
    pub fn records(&self) -> impl Iterator<Item = TrajectoryRecord> + '_ {
        self.points.iter().map(TrajectoryRecord::from)
    }
}

/// Canonical trajectory row: group, particle, node, layer, x, y, z, time, reason code
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryRecord {
    pub group: u32,
    pub particle: u32,
    pub cell: usize,
    pub layer: usize,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub time: f64,
    pub reason: Option<u8>,
}

impl From<&TrajectoryPoint> for TrajectoryRecord {
    fn from(point: &TrajectoryPoint) -> Self {
        Self {
            group: point.key.group.0,
            particle: point.key.particle.0,
            cell: point.cell,
            layer: point.layer,
            x: point.position.x,
            y: point.position.y,
            z: point.position.z,
            time: point.time,
            reason: point.reason.map(TerminationReason::code),
        }
    }
}
