//! MODPATH 7 adapter
//!
//! MODPATH tracks backward natively, so it always gets the unreversed field
//! together with the requested direction. Its pathline and endpoint tables
//! are 0-based (`particlegroup`, `particleidloc`, `k`, `node`) and are shifted
//! to the canonical 1-based numbering here. The canonical particle id is the
//! within-group index, which lines up with PRT's `irpt`.

use super::engine::{
    EngineRun, EngineRunner, EngineSettings, Mp7Settings, TrackingAdapter, TrackingDirection,
    TrackingEngine,
};
use super::table::{build_trajectories, check_against_seeds, group_points, Table};
use super::trajectory::{Trajectory, TrajectoryPoint};
use crate::core_types::{ParticleKey, TerminationReason, Vec2, Vec3};
use crate::error::AdapterError;
use crate::flow::FlowFieldTimeSeries;
use crate::release::ReleasePoint;
use rustc_hash::FxHashMap;
use tracing::{debug, info, warn};

const ENGINE: TrackingEngine = TrackingEngine::Mp7;

/// Terminal reason for a MODPATH endpoint `status`, `None` when unknown
///
/// | status | meaning                                 | reason              |
/// |--------|-----------------------------------------|---------------------|
/// | 0      | release still pending                   | `Error`             |
/// | 1      | active at the stop time                 | `StopTimeReached`   |
/// | 2      | terminated at a boundary or sink        | `BoundaryExit`      |
/// | 3      | terminated in a stop zone               | `BoundaryExit`      |
/// | 4      | never released                          | `Error`             |
/// | 5      | stranded in an inactive cell            | `Error`             |
/// | 6      | stopped after the step-count limit      | `MaxStepsExceeded`  |
/// | 7      | terminated for an unknown reason        | `Error`             |
pub fn terminal_reason(status: i64) -> Option<TerminationReason> {
    match status {
        1 => Some(TerminationReason::StopTimeReached),
        2 | 3 => Some(TerminationReason::BoundaryExit),
        6 => Some(TerminationReason::MaxStepsExceeded),
        0 | 4 | 5 | 7 => Some(TerminationReason::Error),
        _ => None,
    }
}

/// Endpoint status per particle from an endpoint table
pub fn parse_endpoints(text: &str) -> Result<FxHashMap<ParticleKey, i64>, AdapterError> {
    let table = Table::parse(ENGINE, text)?;
    let group = table.column("particlegroup")?;
    let particle = table.column("particleidloc")?;
    let status = table.column("status")?;

    let mut statuses = FxHashMap::default();
    for row in table.rows() {
        let key = ParticleKey::new(table.get_id(row, group, 1)?, table.get_id(row, particle, 1)?);
        statuses.insert(key, table.get_index(row, status)?);
    }
    if statuses.len() != table.len() {
        return Err(AdapterError::RowCountMismatch {
            engine: ENGINE,
            what: "distinct endpoint particles",
            expected: table.len(),
            found: statuses.len(),
        });
    }
    Ok(statuses)
}

/// Normalize a pathline table plus endpoint table into canonical trajectories
///
/// `origin` is added to pathline x/y when MODPATH reports coordinates relative
/// to the grid's lower-left corner rather than model coordinates.
pub fn parse_pathlines(
    pathlines: &str,
    endpoints: &str,
    origin: Vec2,
) -> Result<Vec<Trajectory>, AdapterError> {
    let statuses = parse_endpoints(endpoints)?;

    let table = Table::parse(ENGINE, pathlines)?;
    let group = table.column("particlegroup")?;
    let particle = table.column("particleidloc")?;
    let time = table.column("time")?;
    let x = table.column("x")?;
    let y = table.column("y")?;
    let z = table.column("z")?;
    let k = table.column("k")?;
    let node = table.column("node")?;

    let mut points = Vec::with_capacity(table.len());
    for row in table.rows() {
        points.push(TrajectoryPoint {
            key: ParticleKey::new(table.get_id(row, group, 1)?, table.get_id(row, particle, 1)?),
            cell: table.get_id(row, node, 1)? as usize,
            layer: table.get_id(row, k, 1)? as usize,
            position: Vec3::new(
                table.get::<f64>(row, x)? + origin.x,
                table.get::<f64>(row, y)? + origin.y,
                table.get(row, z)?,
            ),
            time: table.get(row, time)?,
            reason: None,
        });
    }

    let (order, mut groups) = group_points(points);
    if order.len() != statuses.len() {
        return Err(AdapterError::RowCountMismatch {
            engine: ENGINE,
            what: "endpoints",
            expected: order.len(),
            found: statuses.len(),
        });
    }

    for key in &order {
        let status = *statuses.get(key).ok_or(AdapterError::UnknownParticle {
            engine: ENGINE,
            key: *key,
        })?;
        let reason = terminal_reason(status).ok_or(AdapterError::UnknownStatus {
            engine: ENGINE,
            key: *key,
            status,
        })?;
        if let Some(points) = groups.get_mut(key) {
            if let Some(first) = points.first_mut() {
                first.reason = Some(TerminationReason::Released);
            }
            if let Some(last) = points.last_mut() {
                last.reason = Some(reason);
            }
        }
    }

    debug!(
        "MP7 pathline table: {} rows, {} particles",
        table.len(),
        order.len()
    );
    build_trajectories(ENGINE, groups)
}

/// Adapter over a MODPATH 7 run
#[derive(Debug, Clone)]
pub struct Mp7Adapter<R> {
    runner: R,
    direction: TrackingDirection,
    settings: EngineSettings,
    origin: Vec2,
    seeds: Vec<ReleasePoint>,
}

impl<R: EngineRunner> Mp7Adapter<R> {
    pub fn new(runner: R, direction: TrackingDirection) -> Self {
        Self::with_settings(runner, direction, Mp7Settings::default())
    }

    pub fn with_settings(runner: R, direction: TrackingDirection, settings: Mp7Settings) -> Self {
        Self {
            runner,
            direction,
            settings: EngineSettings::Mp7(settings),
            origin: Vec2::zeros(),
            seeds: Vec::new(),
        }
    }

    /// Offset added to reported x/y
    pub fn with_origin(mut self, origin: Vec2) -> Self {
        self.origin = origin;
        self
    }

    pub fn seeds(&self) -> &[ReleasePoint] {
        &self.seeds
    }
}

impl<R: EngineRunner> TrackingAdapter for Mp7Adapter<R> {
    fn engine(&self) -> TrackingEngine {
        ENGINE
    }

    fn direction(&self) -> TrackingDirection {
        self.direction
    }

    fn seed(&mut self, points: &[ReleasePoint]) {
        self.seeds = points.to_vec();
    }

    fn step(&mut self, field: &FlowFieldTimeSeries) -> Result<Vec<Trajectory>, AdapterError> {
        if self.seeds.is_empty() {
            return Err(AdapterError::NotSeeded { engine: ENGINE });
        }

        let output = self.runner.run(&EngineRun {
            engine: ENGINE,
            direction: self.direction,
            field,
            seeds: &self.seeds,
            settings: &self.settings,
        })?;
        let Some(endpoints) = output.endpoints.as_deref() else {
            warn!("MP7 run returned no endpoint table");
            return Err(AdapterError::RowCountMismatch {
                engine: ENGINE,
                what: "endpoint tables",
                expected: 1,
                found: 0,
            });
        };

        let trajectories = parse_pathlines(&output.tracks, endpoints, self.origin)?;
        check_against_seeds(ENGINE, &trajectories, &self.seeds)?;
        info!(
            "MP7 ({} tracking): {} trajectories",
            self.direction,
            trajectories.len()
        );
        Ok(trajectories)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_types::{GroupId, ParticleId};
    use crate::flow::{FlowFieldFrame, TimeSpan};
    use crate::tracking::engine::{EngineOutput, RecordedRunner};
    use std::cell::Cell;

    const PATHLINES: &str = "\
particleid,particlegroup,sequencenumber,particleidloc,time,x,y,z,k,node
0,0,0,0,0.0,4750.0,5250.0,100.0,2,1502
0,0,0,0,300.0,4900.0,5500.0,250.0,2,1400
0,0,0,0,905.0,9999.0,5400.0,330.0,0,79
16,1,16,0,0.0,4700.0,5300.0,200.0,2,1502
16,1,16,0,1000.0,4000.0,7000.0,210.0,1,849
";

    const ENDPOINTS: &str = "\
particleid,particlegroup,sequencenumber,particleidloc,status,time0,time
0,0,0,0,2,0.0,905.0
16,1,16,0,1,0.0,1000.0
";

    fn seeds() -> Vec<ReleasePoint> {
        [(1, 1), (2, 1)]
            .into_iter()
            .map(|(g, p)| ReleasePoint {
                group: GroupId(g),
                particle: ParticleId(p),
                cell: 1502,
                local: Vec3::new(0.5, 0.5, 0.5),
                drape: false,
                release_time: 0.0,
            })
            .collect()
    }

    fn field() -> FlowFieldTimeSeries {
        FlowFieldTimeSeries::new(vec![FlowFieldFrame {
            stress_period: 1,
            time_step: 1,
            span: TimeSpan::new(0.0, 1000.0),
            head: vec![7.0],
            face_flux: vec![vec![1.0]],
        }])
        .unwrap()
    }

    struct DirectionRunner {
        direction: Cell<Option<TrackingDirection>>,
    }

    impl EngineRunner for DirectionRunner {
        fn run(&self, run: &EngineRun<'_>) -> Result<EngineOutput, AdapterError> {
            self.direction.set(Some(run.direction));
            Ok(EngineOutput {
                tracks: PATHLINES.to_string(),
                endpoints: Some(ENDPOINTS.to_string()),
            })
        }
    }

    #[test]
    fn test_indices_shift_to_one_based() {
        let trajectories = parse_pathlines(PATHLINES, ENDPOINTS, Vec2::zeros()).unwrap();
        assert_eq!(trajectories.len(), 2);

        let first = &trajectories[0];
        assert_eq!(first.key, ParticleKey::new(1, 1));
        assert_eq!(first.points[0].cell, 1503);
        assert_eq!(first.points[0].layer, 3);
        assert_eq!(first.points[0].reason, Some(TerminationReason::Released));
        assert_eq!(first.terminal_point().map(|p| p.layer), Some(1));
        assert_eq!(first.termination_reason(), Some(TerminationReason::BoundaryExit));
        assert_eq!(first.termination_time(), 905.0);

        // Group 2's first particle is particle 1, not its global sequence number
        assert_eq!(trajectories[1].key, ParticleKey::new(2, 1));
        assert_eq!(
            trajectories[1].termination_reason(),
            Some(TerminationReason::StopTimeReached)
        );
    }

    #[test]
    fn test_endpoint_status_codes() {
        use TerminationReason::{BoundaryExit, Error, MaxStepsExceeded, StopTimeReached};
        let expected = [
            (0, Some(Error)),
            (1, Some(StopTimeReached)),
            (2, Some(BoundaryExit)),
            (3, Some(BoundaryExit)),
            (4, Some(Error)),
            (5, Some(Error)),
            (6, Some(MaxStepsExceeded)),
            (7, Some(Error)),
            (8, None),
        ];
        for (status, reason) in expected {
            assert_eq!(terminal_reason(status), reason, "status {status}");
        }

        let step_limited = "particlegroup,particleidloc,status\n0,0,2\n1,0,6\n";
        let trajectories = parse_pathlines(PATHLINES, step_limited, Vec2::zeros()).unwrap();
        assert_eq!(
            trajectories[1].termination_reason(),
            Some(TerminationReason::MaxStepsExceeded)
        );
    }

    #[test]
    fn test_backward_run_keeps_field_and_direction() {
        let runner = DirectionRunner {
            direction: Cell::new(None),
        };
        let mut adapter = Mp7Adapter::new(runner, TrackingDirection::Backward);
        let trajectories = adapter.track(&seeds(), &field()).unwrap();
        assert_eq!(trajectories.len(), 2);
        assert_eq!(adapter.runner.direction.get(), Some(TrackingDirection::Backward));
    }

    #[test]
    fn test_origin_offset() {
        let trajectories =
            parse_pathlines(PATHLINES, ENDPOINTS, Vec2::new(100.0, -50.0)).unwrap();
        let p = &trajectories[0].points[0];
        assert_eq!((p.position.x, p.position.y), (4850.0, 5200.0));
    }

    #[test]
    fn test_endpoint_mismatches() {
        let one = "particlegroup,particleidloc,status\n0,0,2\n";
        assert!(matches!(
            parse_pathlines(PATHLINES, one, Vec2::zeros()),
            Err(AdapterError::RowCountMismatch {
                what: "endpoints",
                expected: 2,
                found: 1,
                ..
            })
        ));

        let wrong = "particlegroup,particleidloc,status\n0,0,2\n1,5,1\n";
        assert!(matches!(
            parse_pathlines(PATHLINES, wrong, Vec2::zeros()),
            Err(AdapterError::UnknownParticle { .. })
        ));

        let duplicated = "particlegroup,particleidloc,status\n0,0,2\n0,0,2\n";
        assert!(matches!(
            parse_endpoints(duplicated),
            Err(AdapterError::RowCountMismatch { .. })
        ));

        let bad_status = "particlegroup,particleidloc,status\n0,0,2\n1,0,99\n";
        assert!(matches!(
            parse_pathlines(PATHLINES, bad_status, Vec2::zeros()),
            Err(AdapterError::UnknownStatus { status: 99, .. })
        ));
    }

    #[test]
    fn test_missing_endpoint_table() {
        let mut adapter = Mp7Adapter::new(
            RecordedRunner::from_text(PATHLINES, None),
            TrackingDirection::Backward,
        );
        assert!(matches!(
            adapter.track(&seeds(), &field()),
            Err(AdapterError::RowCountMismatch {
                what: "endpoint tables",
                ..
            })
        ));
    }
}
