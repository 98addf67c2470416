//! Per-particle records merged across engines

use super::classify::{LayerClass, Subproblem};
use crate::core_types::{ParticleKey, TerminationReason, Vec3};
use crate::error::ReconcileError;
use crate::tracking::{Trajectory, TrackingEngine};
use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Release times closer than this are the same release
pub const DEFAULT_RELEASE_TOLERANCE: f64 = 1e-6;

/// Trajectories produced by one engine
#[derive(Debug, Clone, Copy)]
pub struct EngineTrajectories<'a> {
    pub engine: TrackingEngine,
    pub trajectories: &'a [Trajectory],
}

impl<'a> EngineTrajectories<'a> {
    pub fn new(engine: TrackingEngine, trajectories: &'a [Trajectory]) -> Self {
        Self {
            engine,
            trajectories,
        }
    }
}

/// Summary of one particle's trajectory from one engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciledRecord {
    pub key: ParticleKey,
    pub engine: TrackingEngine,
    pub release_time: f64,
    pub termination_time: f64,
    pub termination_reason: TerminationReason,
    /// 1-based layer of the last point
    pub termination_layer: usize,
    /// 1-based node of the last point
    pub termination_cell: usize,
    pub termination_position: Vec3,
    pub layer_class: LayerClass,
    pub subproblem: Subproblem,
}

impl ReconciledRecord {
    pub fn from_trajectory(
        engine: TrackingEngine,
        trajectory: &Trajectory,
    ) -> Result<Self, ReconcileError> {
        let key = trajectory.key;
        let empty = ReconcileError::EmptyTrajectory { engine, key };
        let last = trajectory.terminal_point().ok_or_else(|| empty.clone())?;
        let termination_reason = last.reason.ok_or(empty)?;
        Ok(Self {
            key,
            engine,
            release_time: trajectory.release_time(),
            termination_time: trajectory.termination_time(),
            termination_reason,
            termination_layer: last.layer,
            termination_cell: last.cell,
            termination_position: last.position,
            layer_class: LayerClass::from_layer(last.layer),
            subproblem: Subproblem::from_group(key.group),
        })
    }

    pub fn travel_time(&self) -> f64 {
        self.termination_time - self.release_time
    }

    pub fn is_boundary_exit(&self) -> bool {
        self.termination_reason == TerminationReason::BoundaryExit
    }

    /// Flat row for tabular output
    pub fn row(&self) -> ReconciledRow {
        ReconciledRow {
            group: self.key.group.0,
            particle: self.key.particle.0,
            engine: self.engine,
            release_time: self.release_time,
            termination_time: self.termination_time,
            reason: self.termination_reason,
            reason_code: self.termination_reason.code(),
            layer: self.termination_layer,
            cell: self.termination_cell,
            x: self.termination_position.x,
            y: self.termination_position.y,
            z: self.termination_position.z,
            layer_class: self.layer_class,
            subproblem: self.subproblem,
        }
    }
}

/// CSV-friendly form of [`ReconciledRecord`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReconciledRow {
    pub group: u32,
    pub particle: u32,
    pub engine: TrackingEngine,
    pub release_time: f64,
    pub termination_time: f64,
    pub reason: TerminationReason,
    pub reason_code: u8,
    pub layer: usize,
    pub cell: usize,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub layer_class: LayerClass,
    pub subproblem: Subproblem,
}

/// Merges normalized trajectories from several engines into one record set
///
/// Records for the same particle from different engines are kept side by
/// side; agreement between engines is checked by [`super::ConsistencyReport`],
/// never assumed.
#[derive(Debug, Clone, Copy)]
pub struct TrajectoryReconciler {
    pub release_tolerance: f64,
}

impl Default for TrajectoryReconciler {
    fn default() -> Self {
        Self {
            release_tolerance: DEFAULT_RELEASE_TOLERANCE,
        }
    }
}

impl TrajectoryReconciler {
    pub fn new(release_tolerance: f64) -> Self {
        Self { release_tolerance }
    }

    /// Reconcile two engines' trajectories
    pub fn reconcile(
        &self,
        first: EngineTrajectories<'_>,
        second: EngineTrajectories<'_>,
    ) -> Result<Vec<ReconciledRecord>, ReconcileError> {
        self.reconcile_all(&[first, second])
    }

    /// Reconcile any number of engines; output is sorted by (group, particle, engine)
    ///
    /// Each engine may supply at most one set, so records stay unique per
    /// (key, engine).
    pub fn reconcile_all(
        &self,
        sets: &[EngineTrajectories<'_>],
    ) -> Result<Vec<ReconciledRecord>, ReconcileError> {
        let mut engines = FxHashSet::default();
        if let Some(set) = sets.iter().find(|set| !engines.insert(set.engine)) {
            return Err(ReconcileError::DuplicateEngine { engine: set.engine });
        }

        let mut records = Vec::new();
        for set in sets {
            let mut seen = FxHashSet::default();
            if let Some(t) = set.trajectories.iter().find(|t| !seen.insert(t.key)) {
                return Err(ReconcileError::DuplicateKey {
                    engine: set.engine,
                    key: t.key,
                });
            }
            let engine_records = set
                .trajectories
                .par_iter()
                .map(|t| ReconciledRecord::from_trajectory(set.engine, t))
                .collect::<Result<Vec<_>, _>>()?;
            debug!("{}: {} records", set.engine, engine_records.len());
            records.extend(engine_records);
        }
        records.sort_by(|a, b| a.key.cmp(&b.key).then(a.engine.cmp(&b.engine)));

        let mut engines_per_key: FxHashMap<ParticleKey, usize> = FxHashMap::default();
        for pair in records.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            if a.key != b.key {
                continue;
            }
            if (a.release_time - b.release_time).abs() > self.release_tolerance {
                return Err(ReconcileError::ContradictoryRelease {
                    key: a.key,
                    first_engine: a.engine,
                    first: a.release_time,
                    second_engine: b.engine,
                    second: b.release_time,
                });
            }
        }
        for record in &records {
            *engines_per_key.entry(record.key).or_default() += 1;
        }
        let unmatched = engines_per_key
            .values()
            .filter(|&&n| n < sets.len())
            .count();
        if unmatched > 0 {
            warn!(
                "{} particles have no counterpart in every engine",
                unmatched
            );
        }

        info!(
            "Reconciled {} records for {} particles from {} engines",
            records.len(),
            engines_per_key.len(),
            sets.len()
        );
        Ok(records)
    }
}
