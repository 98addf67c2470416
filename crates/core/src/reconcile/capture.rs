//! Capture-zone delineation and cross-engine consistency

use super::record::ReconciledRecord;
use crate::core_types::{GroupId, ParticleKey, Vec3};
use crate::tracking::TrackingEngine;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

/// Boundary-exit records partitioned by release group
///
/// For a backward run the terminal positions are the recharge origins of the
/// water reaching the well.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CaptureZone {
    pub groups: BTreeMap<GroupId, Vec<ReconciledRecord>>,
}

impl CaptureZone {
    pub fn delineate(records: &[ReconciledRecord]) -> Self {
        let mut groups: BTreeMap<GroupId, Vec<ReconciledRecord>> = BTreeMap::new();
        for record in records.iter().filter(|r| r.is_boundary_exit()) {
            groups.entry(record.key.group).or_default().push(record.clone());
        }
        let zone = Self { groups };
        info!(
            "Capture zone: {} boundary-exit records over {} groups",
            zone.len(),
            zone.groups.len()
        );
        zone
    }

    pub fn len(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn group(&self, group: GroupId) -> &[ReconciledRecord] {
        self.groups.get(&group).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Terminal positions of one group as traced by one engine
    pub fn origins(&self, group: GroupId, engine: TrackingEngine) -> Vec<Vec3> {
        self.group(group)
            .iter()
            .filter(|r| r.engine == engine)
            .map(|r| r.termination_position)
            .collect()
    }
}

/// One particle traced by two engines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineComparison {
    pub key: ParticleKey,
    /// Absolute termination-time difference
    pub time_difference: f64,
    pub same_reason: bool,
    pub same_layer: bool,
}

/// Agreement between two engines over their shared particles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsistencyReport {
    pub first: TrackingEngine,
    pub second: TrackingEngine,
    pub comparisons: Vec<EngineComparison>,
    /// Particles only `first` traced
    pub only_first: Vec<ParticleKey>,
    /// Particles only `second` traced
    pub only_second: Vec<ParticleKey>,
}

impl ConsistencyReport {
    pub fn compare(records: &[ReconciledRecord], first: TrackingEngine, second: TrackingEngine) -> Self {
        let by_engine = |engine: TrackingEngine| {
            records
                .iter()
                .filter(|r| r.engine == engine)
                .map(|r| (r.key, r))
                .collect::<FxHashMap<_, _>>()
        };
        let a = by_engine(first);
        let b = by_engine(second);

        let mut comparisons: Vec<EngineComparison> = a
            .iter()
            .filter_map(|(key, ra)| {
                let rb = b.get(key)?;
                Some(EngineComparison {
                    key: *key,
                    time_difference: (ra.termination_time - rb.termination_time).abs(),
                    same_reason: ra.termination_reason == rb.termination_reason,
                    same_layer: ra.termination_layer == rb.termination_layer,
                })
            })
            .collect();
        comparisons.sort_by_key(|c| c.key);

        let mut only_first: Vec<ParticleKey> =
            a.keys().filter(|k| !b.contains_key(*k)).copied().collect();
        let mut only_second: Vec<ParticleKey> =
            b.keys().filter(|k| !a.contains_key(*k)).copied().collect();
        only_first.sort_unstable();
        only_second.sort_unstable();

        Self {
            first,
            second,
            comparisons,
            only_first,
            only_second,
        }
    }

    pub fn comparison(&self, key: ParticleKey) -> Option<&EngineComparison> {
        self.comparisons
            .binary_search_by_key(&key, |c| c.key)
            .ok()
            .map(|i| &self.comparisons[i])
    }

    /// Largest termination-time difference, `None` with no shared particles
    pub fn max_time_difference(&self) -> Option<f64> {
        self.comparisons
            .iter()
            .map(|c| c.time_difference)
            .reduce(f64::max)
    }

    pub fn mean_time_difference(&self) -> Option<f64> {
        if self.comparisons.is_empty() {
            return None;
        }
        let total: f64 = self.comparisons.iter().map(|c| c.time_difference).sum();
        Some(total / self.comparisons.len() as f64)
    }

    pub fn reason_mismatches(&self) -> usize {
        self.comparisons.iter().filter(|c| !c.same_reason).count()
    }

    pub fn layer_mismatches(&self) -> usize {
        self.comparisons.iter().filter(|c| !c.same_layer).count()
    }

    /// Both engines traced the same particles, to the same reason and layer,
    /// with termination times no further apart than `tolerance`
    pub fn within(&self, tolerance: f64) -> bool {
        self.only_first.is_empty()
            && self.only_second.is_empty()
            && self.reason_mismatches() == 0
            && self.layer_mismatches() == 0
            && self.max_time_difference().is_none_or(|d| d <= tolerance)
    }
}
