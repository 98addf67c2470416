//! Column-addressed access to engine CSV output

use super::engine::TrackingEngine;
use super::trajectory::{Trajectory, TrajectoryPoint};
use crate::core_types::ParticleKey;
use crate::error::AdapterError;
use crate::release::ReleasePoint;
use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};
use std::str::FromStr;

/// Parsed CSV with case-insensitive header lookup
pub(crate) struct Table {
    engine: TrackingEngine,
    headers: FxHashMap<String, usize>,
    rows: Vec<csv::StringRecord>,
}

impl Table {
    pub(crate) fn parse(engine: TrackingEngine, text: &str) -> Result<Self, AdapterError> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(text.as_bytes());
        let headers = reader
            .headers()
            .map_err(|source| AdapterError::Csv { engine, source })?
            .iter()
            .enumerate()
            .map(|(i, name)| (name.to_ascii_lowercase(), i))
            .collect();
        let rows = reader
            .records()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|source| AdapterError::Csv { engine, source })?;
        Ok(Self {
            engine,
            headers,
            rows,
        })
    }

    pub(crate) fn len(&self) -> usize {
        self.rows.len()
    }

    pub(crate) fn column(&self, name: &'static str) -> Result<Column, AdapterError> {
        self.headers
            .get(name)
            .map(|&index| Column { name, index })
            .ok_or(AdapterError::MissingColumn {
                engine: self.engine,
                column: name,
            })
    }

    /// Parse a cell; `row` is the 1-based data row
    pub(crate) fn get<T: FromStr>(&self, row: usize, column: Column) -> Result<T, AdapterError> {
        let raw = self.rows[row - 1].get(column.index).unwrap_or("");
        raw.parse().map_err(|_| AdapterError::InvalidValue {
            engine: self.engine,
            row,
            column: column.name,
            value: raw.to_string(),
        })
    }

    /// Integer cell that may be written as a float ("3.0")
    pub(crate) fn get_index(&self, row: usize, column: Column) -> Result<i64, AdapterError> {
        let value: f64 = self.get(row, column)?;
        if value.fract() == 0.0 && value.is_finite() {
            Ok(value as i64)
        } else {
            Err(AdapterError::InvalidValue {
                engine: self.engine,
                row,
                column: column.name,
                value: value.to_string(),
            })
        }
    }

    /// Integer cell shifted by `offset` that must end up positive
    pub(crate) fn get_id(&self, row: usize, column: Column, offset: i64) -> Result<u32, AdapterError> {
        let raw = self.get_index(row, column)?;
        u32::try_from(raw + offset)
            .ok()
            .filter(|&id| id > 0)
            .ok_or_else(|| AdapterError::InvalidValue {
                engine: self.engine,
                row,
                column: column.name,
                value: raw.to_string(),
            })
    }

    pub(crate) fn rows(&self) -> impl Iterator<Item = usize> {
        1..=self.rows.len()
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Column {
    name: &'static str,
    index: usize,
}

/// Group points by particle in first-appearance order, keeping row order
pub(crate) fn group_points(
    points: Vec<TrajectoryPoint>,
) -> (Vec<ParticleKey>, FxHashMap<ParticleKey, Vec<TrajectoryPoint>>) {
    let mut order = Vec::new();
    let mut groups: FxHashMap<ParticleKey, Vec<TrajectoryPoint>> = FxHashMap::default();
    for point in points {
        groups
            .entry(point.key)
            .or_insert_with(|| {
                order.push(point.key);
                Vec::new()
            })
            .push(point);
    }
    (order, groups)
}

/// Build validated trajectories in parallel, sorted by key
pub(crate) fn build_trajectories(
    engine: TrackingEngine,
    groups: FxHashMap<ParticleKey, Vec<TrajectoryPoint>>,
) -> Result<Vec<Trajectory>, AdapterError> {
    let mut trajectories = groups
        .into_par_iter()
        .map(|(key, points)| Trajectory::new(engine, key, points))
        .collect::<Result<Vec<_>, _>>()?;
    trajectories.sort_by_key(|t| t.key);
    Ok(trajectories)
}

/// One trajectory per seed, and no trajectory without a seed
pub(crate) fn check_against_seeds(
    engine: TrackingEngine,
    trajectories: &[Trajectory],
    seeds: &[ReleasePoint],
) -> Result<(), AdapterError> {
    if trajectories.len() != seeds.len() {
        return Err(AdapterError::RowCountMismatch {
            engine,
            what: "trajectories",
            expected: seeds.len(),
            found: trajectories.len(),
        });
    }
    let seeded: FxHashSet<ParticleKey> = seeds.iter().map(ReleasePoint::key).collect();
    match trajectories.iter().find(|t| !seeded.contains(&t.key)) {
        Some(t) => Err(AdapterError::UnknownParticle { engine, key: t.key }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let table = Table::parse(TrackingEngine::Prt, "IPRP, irpt ,t\n1,2,3.5\n").unwrap();
        assert_eq!(table.len(), 1);
        let t = table.column("t").unwrap();
        let irpt = table.column("irpt").unwrap();
        assert_eq!(table.get::<f64>(1, t).unwrap(), 3.5);
        assert_eq!(table.get_id(1, irpt, 0).unwrap(), 2);
        assert!(table.column("iprp").is_ok());
    }

    #[test]
    fn test_missing_column_and_bad_value() {
        let table = Table::parse(TrackingEngine::Mp7, "particlegroup,time\n0,abc\n").unwrap();
        assert!(matches!(
            table.column("node"),
            Err(AdapterError::MissingColumn { column: "node", .. })
        ));
        let time = table.column("time").unwrap();
        match table.get::<f64>(1, time) {
            Err(AdapterError::InvalidValue { row, value, .. }) => {
                assert_eq!(row, 1);
                assert_eq!(value, "abc");
            }
            other => panic!("unexpected {other:?}"),
        }
        let group = table.column("particlegroup").unwrap();
        assert!(table.get_id(1, group, 0).is_err());
        assert_eq!(table.get_id(1, group, 1).unwrap(), 1);
    }

    #[test]
    fn test_ragged_rows_are_rejected() {
        assert!(matches!(
            Table::parse(TrackingEngine::Prt, "a,b\n1,2\n3\n"),
            Err(AdapterError::Csv { .. })
        ));
    }
}
