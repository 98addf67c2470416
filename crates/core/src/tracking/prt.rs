//! MODFLOW 6 PRT adapter
//!
//! PRT only tracks forward. A backward request is served by replaying the
//! reversed flow field forward. Its track CSV is already 1-based: `iprp` is
//! the release package (group) and `irpt` the release point within it.

use super::engine::{
    EngineRun, EngineRunner, EngineSettings, PrtSettings, TrackingAdapter, TrackingDirection,
    TrackingEngine,
};
use super::table::{build_trajectories, check_against_seeds, group_points, Table};
use super::trajectory::{Trajectory, TrajectoryPoint};
use crate::core_types::{ParticleKey, TerminationReason, Vec3};
use crate::error::AdapterError;
use crate::flow::{self, FlowFieldTimeSeries};
use crate::release::ReleasePoint;
use rustc_hash::FxHashMap;
use std::borrow::Cow;
use tracing::{debug, info};

const ENGINE: TrackingEngine = TrackingEngine::Prt;

/// `ireason` of a release event
const REASON_RELEASE: i64 = 0;

/// Terminal reason for a PRT `istatus` code, `None` when unknown
///
/// | istatus | meaning                               | reason                  |
/// |---------|---------------------------------------|-------------------------|
/// | 0       | release still pending                 | `Error`                 |
/// | 1       | active when the simulation ended      | `StopTimeReached`       |
/// | 2       | left through a boundary face          | `BoundaryExit`          |
/// | 3       | terminated in a weak sink cell        | `WeakSinkPassThrough`   |
/// | 4       | terminated in a weak source cell      | `WeakSourcePassThrough` |
/// | 5       | cell has no exit face                 | `Error`                 |
/// | 6       | entered a stop zone                   | `BoundaryExit`          |
/// | 7       | entered an inactive cell              | `Error`                 |
/// | 8       | terminated immediately upon release   | `Error`                 |
/// | 9       | subcell has no exit face              | `Error`                 |
/// | 10      | timed out at the stop time            | `StopTimeReached`       |
///
/// A stop zone ends the path where the zone begins, the same as a zone
/// termination in MODPATH 7.
pub fn terminal_reason(istatus: i64) -> Option<TerminationReason> {
    match istatus {
        1 | 10 => Some(TerminationReason::StopTimeReached),
        2 | 6 => Some(TerminationReason::BoundaryExit),
        3 => Some(TerminationReason::WeakSinkPassThrough),
        4 => Some(TerminationReason::WeakSourcePassThrough),
        0 | 5 | 7..=9 => Some(TerminationReason::Error),
        _ => None,
    }
}

/// Normalize a PRT track CSV into canonical trajectories
pub fn parse_tracks(text: &str) -> Result<Vec<Trajectory>, AdapterError> {
    let table = Table::parse(ENGINE, text)?;
    let iprp = table.column("iprp")?;
    let irpt = table.column("irpt")?;
    let ilay = table.column("ilay")?;
    let icell = table.column("icell")?;
    let istatus = table.column("istatus")?;
    let ireason = table.column("ireason")?;
    let t = table.column("t")?;
    let x = table.column("x")?;
    let y = table.column("y")?;
    let z = table.column("z")?;

    let mut points = Vec::with_capacity(table.len());
    let mut statuses = Vec::with_capacity(table.len());
    for row in table.rows() {
        let key = ParticleKey::new(table.get_id(row, iprp, 0)?, table.get_id(row, irpt, 0)?);
        let reason = (table.get_index(row, ireason)? == REASON_RELEASE)
            .then_some(TerminationReason::Released);
        statuses.push(table.get_index(row, istatus)?);
        points.push(TrajectoryPoint {
            key,
            cell: table.get_id(row, icell, 0)? as usize,
            layer: table.get_id(row, ilay, 0)? as usize,
            position: Vec3::new(table.get(row, x)?, table.get(row, y)?, table.get(row, z)?),
            time: table.get(row, t)?,
            reason,
        });
    }

    // Terminal status comes from each particle's final row
    let mut last_row = FxHashMap::default();
    for (row, point) in points.iter().enumerate() {
        last_row.insert(point.key, row);
    }
    for (key, row) in last_row {
        let status = statuses[row];
        let reason = terminal_reason(status).ok_or(AdapterError::UnknownStatus {
            engine: ENGINE,
            key,
            status,
        })?;
        points[row].reason = Some(reason);
    }

    let (order, groups) = group_points(points);
    debug!("PRT track table: {} rows, {} particles", table.len(), order.len());
    build_trajectories(ENGINE, groups)
}

/// Adapter over a PRT model run
#[derive(Debug, Clone)]
pub struct PrtAdapter<R> {
    runner: R,
    direction: TrackingDirection,
    settings: EngineSettings,
    seeds: Vec<ReleasePoint>,
}

impl<R: EngineRunner> PrtAdapter<R> {
    pub fn new(runner: R, direction: TrackingDirection) -> Self {
        Self::with_settings(runner, direction, PrtSettings::default())
    }

    pub fn with_settings(runner: R, direction: TrackingDirection, settings: PrtSettings) -> Self {
        Self {
            runner,
            direction,
            settings: EngineSettings::Prt(settings),
            seeds: Vec::new(),
        }
    }

    pub fn seeds(&self) -> &[ReleasePoint] {
        &self.seeds
    }
}

impl<R: EngineRunner> TrackingAdapter for PrtAdapter<R> {
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

        let field = match self.direction {
            TrackingDirection::Forward => Cow::Borrowed(field),
            TrackingDirection::Backward => Cow::Owned(
                flow::reverse(field).map_err(|source| AdapterError::Field {
                    engine: ENGINE,
                    source,
                })?,
            ),
        };

        let output = self.runner.run(&EngineRun {
            engine: ENGINE,
            direction: TrackingDirection::Forward,
            field: &field,
            seeds: &self.seeds,
            settings: &self.settings,
        })?;

        let trajectories = parse_tracks(&output.tracks)?;
        check_against_seeds(ENGINE, &trajectories, &self.seeds)?;
        info!(
            "PRT ({} tracking): {} trajectories",
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
    use std::cell::RefCell;

    const TRACKS: &str = "\
kper,kstp,imdl,iprp,irpt,ilay,icell,izone,istatus,ireason,trelease,t,x,y,z,name
1,1,1,1,1,3,1503,0,1,0,0.0,0.0,4750.0,5250.0,100.0,
1,1,1,1,1,3,1480,0,1,1,0.0,120.5,4800.0,5400.0,150.0,
1,1,1,1,1,1,80,0,2,3,0.0,900.0,9999.0,5400.0,330.0,
1,1,1,2,1,3,1503,0,1,0,0.0,0.0,4700.0,5300.0,200.0,
1,1,1,2,1,2,850,0,10,3,0.0,1000.0,4000.0,7000.0,210.0,
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
        FlowFieldTimeSeries::new(vec![
            FlowFieldFrame {
                stress_period: 1,
                time_step: 1,
                span: TimeSpan::new(0.0, 400.0),
                head: vec![1.0],
                face_flux: vec![vec![1.0]],
            },
            FlowFieldFrame {
                stress_period: 1,
                time_step: 2,
                span: TimeSpan::new(400.0, 1000.0),
                head: vec![2.0],
                face_flux: vec![vec![2.0]],
            },
        ])
        .unwrap()
    }

    /// Records what the engine was asked to do
    struct InspectingRunner {
        seen: RefCell<Vec<(TrackingDirection, f64)>>,
    }

    impl EngineRunner for InspectingRunner {
        fn run(&self, run: &EngineRun<'_>) -> Result<EngineOutput, AdapterError> {
            self.seen
                .borrow_mut()
                .push((run.direction, run.field.frames[0].head[0]));
            Ok(EngineOutput {
                tracks: TRACKS.to_string(),
                endpoints: None,
            })
        }
    }

    #[test]
    fn test_parse_tracks() {
        let trajectories = parse_tracks(TRACKS).unwrap();
        assert_eq!(trajectories.len(), 2);

        let first = &trajectories[0];
        assert_eq!(first.key, ParticleKey::new(1, 1));
        assert_eq!(first.len(), 3);
        assert_eq!(first.points[0].reason, Some(TerminationReason::Released));
        assert_eq!(first.points[1].reason, None);
        assert_eq!(first.termination_reason(), Some(TerminationReason::BoundaryExit));
        assert_eq!(first.termination_time(), 900.0);
        assert_eq!(first.terminal_point().map(|p| p.layer), Some(1));

        assert_eq!(
            trajectories[1].termination_reason(),
            Some(TerminationReason::StopTimeReached)
        );
    }

    #[test]
    fn test_every_istatus_code() {
        use TerminationReason::{
            BoundaryExit, Error, StopTimeReached, WeakSinkPassThrough, WeakSourcePassThrough,
        };
        let expected = [
            (0, Some(Error)),
            (1, Some(StopTimeReached)),
            (2, Some(BoundaryExit)),
            (3, Some(WeakSinkPassThrough)),
            (4, Some(WeakSourcePassThrough)),
            (5, Some(Error)),
            (6, Some(BoundaryExit)),
            (7, Some(Error)),
            (8, Some(Error)),
            (9, Some(Error)),
            (10, Some(StopTimeReached)),
            (11, None),
            (-1, None),
        ];
        for (istatus, reason) in expected {
            assert_eq!(terminal_reason(istatus), reason, "istatus {istatus}");
        }
    }

    #[test]
    fn test_final_row_status_sets_reason() {
        let track = |istatus: i64| {
            format!(
                "iprp,irpt,ilay,icell,istatus,ireason,t,x,y,z\n\
                 1,1,3,1503,1,0,0.0,0,0,0\n\
                 1,1,2,850,{istatus},3,72000.0,0,0,0\n"
            )
        };
        let reason = |istatus| {
            parse_tracks(&track(istatus)).unwrap()[0]
                .termination_reason()
                .unwrap()
        };
        assert_eq!(reason(10), TerminationReason::StopTimeReached);
        assert_eq!(reason(4), TerminationReason::WeakSourcePassThrough);
        assert_eq!(reason(5), TerminationReason::Error);
        assert_eq!(reason(9), TerminationReason::Error);
        assert_eq!(reason(6), TerminationReason::BoundaryExit);
    }

    #[test]
    fn test_backward_replays_reversed_field_forward() {
        let runner = InspectingRunner {
            seen: RefCell::new(Vec::new()),
        };
        let mut adapter = PrtAdapter::new(runner, TrackingDirection::Backward);
        let trajectories = adapter.track(&seeds(), &field()).unwrap();
        assert_eq!(trajectories.len(), 2);
        // Last frame first, direction forward
        assert_eq!(
            adapter.runner.seen.borrow().as_slice(),
            &[(TrackingDirection::Forward, 2.0)]
        );
    }

    #[test]
    fn test_forward_passes_field_through() {
        let runner = InspectingRunner {
            seen: RefCell::new(Vec::new()),
        };
        let mut adapter = PrtAdapter::new(runner, TrackingDirection::Forward);
        adapter.track(&seeds(), &field()).unwrap();
        assert_eq!(
            adapter.runner.seen.borrow().as_slice(),
            &[(TrackingDirection::Forward, 1.0)]
        );
    }

    #[test]
    fn test_unseeded_and_count_mismatch() {
        let mut adapter = PrtAdapter::new(
            RecordedRunner::from_text(TRACKS, None),
            TrackingDirection::Backward,
        );
        assert!(matches!(
            adapter.step(&field()),
            Err(AdapterError::NotSeeded { .. })
        ));

        let mut three = seeds();
        three.push(ReleasePoint {
            particle: ParticleId(2),
            ..three[0].clone()
        });
        assert!(matches!(
            adapter.track(&three, &field()),
            Err(AdapterError::RowCountMismatch {
                expected: 3,
                found: 2,
                ..
            })
        ));

        let mut other = seeds();
        other[1].group = GroupId(3);
        assert!(matches!(
            adapter.track(&other, &field()),
            Err(AdapterError::UnknownParticle { .. })
        ));
    }

    #[test]
    fn test_malformed_tracks() {
        let missing = "iprp,irpt,ilay,icell,istatus,t,x,y,z\n1,1,1,1,2,0.0,0,0,0\n";
        assert!(matches!(
            parse_tracks(missing),
            Err(AdapterError::MissingColumn {
                column: "ireason",
                ..
            })
        ));

        let unknown = "iprp,irpt,ilay,icell,istatus,ireason,t,x,y,z\n1,1,1,1,42,3,0.0,0,0,0\n";
        assert!(matches!(
            parse_tracks(unknown),
            Err(AdapterError::UnknownStatus { status: 42, .. })
        ));

        let backwards = "iprp,irpt,ilay,icell,istatus,ireason,t,x,y,z\n\
                         1,1,1,1,1,0,10.0,0,0,0\n\
                         1,1,1,1,2,3,5.0,0,0,0\n";
        assert!(matches!(
            parse_tracks(backwards),
            Err(AdapterError::NonMonotonicTime { index: 1, .. })
        ));
    }
}
