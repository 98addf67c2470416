//! Scenario configuration and model assembly
//!
//! A scenario describes the refined grid, the boundary features, the flow
//! solver's time axis and the release groups. Assembly threads every
//! intermediate result explicitly: the refined grid feeds the locator and the
//! release schemes, and the resolved well cells pick the release target.
//!
//! The default scenario is the three-layer, three-level quadpatch problem with
//! a pumping well in the lower aquifer and a river along the east edge.

use crate::boundary::{
    BoundaryAssignment, BoundaryFeature, BoundaryLocator, FeatureKind, StressPeriodRow,
};
use crate::core_types::{Vec2, Vec3};
use crate::error::{ConfigError, PipelineError};
use crate::flow::{FlowFieldTimeSeries, TimeDiscretization};
use crate::grid::{BaseGrid, Grid, GridRefiner, RefinementFeature};
use crate::reconcile::{
    CaptureZone, ConsistencyReport, EngineTrajectories, ReconciledRecord, TrajectoryReconciler,
    DEFAULT_RELEASE_TOLERANCE,
};
use crate::release::{
    prp_records, Face, FaceSubdivision, FaceSubdivisions, PrpRecord, ReleaseGroup, ReleasePoint,
    ReleaseScheme,
};
use crate::tracking::{Mp7Settings, PrtSettings, TrackingAdapter};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Areal recharge applied to the top of every column
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Recharge {
    /// Recharge flux (length / time)
    pub rate: f64,
    pub iface: i32,
    pub iflowface: i32,
}

impl Default for Recharge {
    fn default() -> Self {
        Self {
            rate: 0.005,
            iface: 6,
            iflowface: -1,
        }
    }
}

impl Recharge {
    /// One row per cell2d in the top layer
    pub fn rows(&self, grid: &Grid) -> Vec<StressPeriodRow> {
        (0..grid.ncpl())
            .map(|icpl| StressPeriodRow {
                layer: 0,
                icpl,
                values: vec![self.rate],
                iface: self.iface,
                iflowface: self.iflowface,
            })
            .collect()
    }
}

/// Node the release groups are placed on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReleaseTarget {
    /// First cell of the first well, in the well's layer
    #[default]
    Well,
    /// Explicit 0-based node
    Node { node: usize },
}

/// Everything needed to assemble a capture-zone model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioConfig {
    pub name: String,
    pub base: BaseGrid,
    pub refinement: Vec<RefinementFeature>,
    pub boundaries: Vec<BoundaryFeature>,
    #[serde(default)]
    pub recharge: Recharge,
    #[serde(default)]
    pub tdis: TimeDiscretization,
    /// Effective porosity handed to both tracking engines
    pub porosity: f64,
    #[serde(default)]
    pub release_target: ReleaseTarget,
    pub releases: Vec<ReleaseGroup>,
    #[serde(default)]
    pub prt: PrtSettings,
    #[serde(default)]
    pub mp7: Mp7Settings,
    #[serde(default = "default_release_tolerance")]
    pub release_tolerance: f64,
}

fn default_release_tolerance() -> f64 {
    DEFAULT_RELEASE_TOLERANCE
}

/// Explicit local coordinates of subproblem A: four points along the middle
/// of each side face
fn side_face_points() -> Vec<Vec3> {
    let q = [0.125, 0.375, 0.625, 0.875];
    let mut points = Vec::with_capacity(16);
    points.extend(q.iter().map(|&y| Vec3::new(0.0, y, 0.5)));
    points.extend(q.iter().map(|&y| Vec3::new(1.0, y, 0.5)));
    points.extend(q.iter().map(|&x| Vec3::new(x, 0.0, 0.5)));
    points.extend(q.iter().map(|&x| Vec3::new(x, 1.0, 0.5)));
    points
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        let nlay = 3;
        let base = BaseGrid {
            nlay,
            nrow: 21,
            ncol: 20,
            delr: 500.0,
            delc: 500.0,
            top: 400.0,
            botm: vec![220.0, 200.0, 0.0],
            kh: vec![50.0, 0.01, 200.0],
            kv: vec![10.0, 0.01, 20.0],
        };
        let (lx, ly) = (base.extent_x(), base.extent_y());

        let refinement = vec![
            RefinementFeature::rectangle("outer", (3500.0, 4000.0), (6000.0, 6500.0), 1, nlay),
            RefinementFeature::rectangle("middle", (4000.0, 4500.0), (5500.0, 6000.0), 2, nlay),
            RefinementFeature::rectangle("inner", (4500.0, 5000.0), (5000.0, 5500.0), 3, nlay),
        ];

        let boundaries = vec![
            BoundaryFeature::well("well", Vec2::new(4718.45, 5281.25), -150000.0, 2),
            BoundaryFeature::river(
                "river",
                vec![Vec2::new(lx - 1.0, ly), Vec2::new(lx - 1.0, 0.0)],
                320.0,
                1.0e5,
                318.0,
                0,
            )
            .with_flags(6, -1),
        ];

        let releases = vec![
            ReleaseGroup::new(1, ReleaseScheme::explicit(side_face_points())),
            ReleaseGroup::new(
                2,
                ReleaseScheme::subdivided(
                    FaceSubdivisions::sides(10, 10).with_face(Face::Top, FaceSubdivision::new(4, 4)),
                ),
            ),
        ];

        Self {
            name: "well-capture-quadpatch".to_string(),
            base,
            refinement,
            boundaries,
            recharge: Recharge::default(),
            tdis: TimeDiscretization::default(),
            porosity: 0.1,
            release_target: ReleaseTarget::Well,
            releases,
            prt: PrtSettings::default(),
            mp7: Mp7Settings::default(),
            release_tolerance: DEFAULT_RELEASE_TOLERANCE,
        }
    }
}

impl ScenarioConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("Loaded scenario '{}' from {}", config.name, path.display());
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let text = serde_json::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        fs::write(path, text).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// PRT settings with the scenario porosity applied
    pub fn prt_settings(&self) -> PrtSettings {
        PrtSettings {
            porosity: self.porosity,
            ..self.prt.clone()
        }
    }

    /// MODPATH settings with the scenario porosity applied
    pub fn mp7_settings(&self) -> Mp7Settings {
        Mp7Settings {
            porosity: self.porosity,
            ..self.mp7.clone()
        }
    }

    /// Refine the grid, place the boundaries and generate every release group
    pub fn assemble(&self) -> Result<AssembledModel, PipelineError> {
        Scenario::assemble(self)
    }
}

/// Release points of one group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReleaseSet {
    pub group: ReleaseGroup,
    pub points: Vec<ReleasePoint>,
}

/// Assembled model: refined grid, resolved boundaries, release sets
#[derive(Debug, Clone)]
pub struct AssembledModel {
    pub grid: Grid,
    pub wells: Vec<BoundaryAssignment>,
    pub rivers: Vec<BoundaryAssignment>,
    pub recharge: Vec<StressPeriodRow>,
    /// 0-based node every release group is placed on
    pub release_target: usize,
    pub releases: Vec<ReleaseSet>,
}

impl AssembledModel {
    /// All release points across groups, in group order
    pub fn release_points(&self) -> Vec<ReleasePoint> {
        self.releases
            .iter()
            .flat_map(|set| set.points.iter().cloned())
            .collect()
    }

    /// PRT release-package rows per group
    pub fn prp_records(&self) -> Result<Vec<(ReleaseGroup, Vec<PrpRecord>)>, PipelineError> {
        self.releases
            .iter()
            .map(|set| Ok((set.group.clone(), prp_records(&set.points, &self.grid)?)))
            .collect()
    }
}

/// Result of tracking both engines and reconciling them
#[derive(Debug, Clone)]
pub struct CaptureAnalysis {
    pub records: Vec<ReconciledRecord>,
    pub capture_zone: CaptureZone,
    pub consistency: ConsistencyReport,
}

/// Pipeline entry points
pub struct Scenario;

impl Scenario {
    /// Refine the grid, place the boundaries and generate every release group
    pub fn assemble(config: &ScenarioConfig) -> Result<AssembledModel, PipelineError> {
        if config.releases.is_empty() {
            return Err(ConfigError::NoReleaseGroups.into());
        }

        let mut refiner = GridRefiner::new(config.base.clone());
        for feature in &config.refinement {
            refiner.add_feature(feature.clone());
        }
        let grid = refiner.refine()?;

        let locator = BoundaryLocator::new(&grid);
        let mut wells = Vec::new();
        let mut rivers = Vec::new();
        for feature in &config.boundaries {
            let assignment = locator.locate(feature)?;
            match assignment.kind {
                FeatureKind::Well => wells.push(assignment),
                FeatureKind::River => rivers.push(assignment),
            }
        }

        let release_target = match config.release_target {
            ReleaseTarget::Node { node } => node,
            ReleaseTarget::Well => wells
                .first()
                .and_then(|w| w.cells.first())
                .map(|c| c.node)
                .ok_or(ConfigError::NoWellTarget)?,
        };

        let releases = config
            .releases
            .iter()
            .map(|group| {
                Ok(ReleaseSet {
                    group: group.clone(),
                    points: group.generate(release_target, &grid)?,
                })
            })
            .collect::<Result<Vec<_>, PipelineError>>()?;

        let recharge = config.recharge.rows(&grid);
        info!(
            "Assembled '{}': {} nodes, {} well cells, {} river cells, {} release points on node {}",
            config.name,
            grid.nnodes(),
            wells.iter().map(|w| w.cells.len()).sum::<usize>(),
            rivers.iter().map(|r| r.cells.len()).sum::<usize>(),
            releases.iter().map(|s| s.points.len()).sum::<usize>(),
            release_target
        );

        Ok(AssembledModel {
            grid,
            wells,
            rivers,
            recharge,
            release_target,
            releases,
        })
    }

    /// Track the model's release points with two engines and reconcile them
    pub fn analyze(
        model: &AssembledModel,
        field: &FlowFieldTimeSeries,
        first: &mut dyn TrackingAdapter,
        second: &mut dyn TrackingAdapter,
        reconciler: &TrajectoryReconciler,
    ) -> Result<CaptureAnalysis, PipelineError> {
        let points = model.release_points();
        let a = first.track(&points, field)?;
        let b = second.track(&points, field)?;

        let records = reconciler.reconcile(
            EngineTrajectories::new(first.engine(), &a),
            EngineTrajectories::new(second.engine(), &b),
        )?;
        let capture_zone = CaptureZone::delineate(&records);
        let consistency = ConsistencyReport::compare(&records, first.engine(), second.engine());

        Ok(CaptureAnalysis {
            records,
            capture_zone,
            consistency,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::BoundaryAttributes;

    #[test]
    fn test_default_scenario_assembles() {
        let model = ScenarioConfig::default().assemble().unwrap();
        assert_eq!(model.grid.nlay(), 3);
        assert_eq!(model.grid.ncpl(), 651);
        assert_eq!(model.grid.level_histogram(), vec![395, 64, 128, 64]);

        // The well sits in a level-3 cell of the bottom layer
        let well = &model.wells[0];
        assert_eq!(well.cells.len(), 1);
        let icpl = well.cells[0].icpl;
        assert_eq!(model.grid.cell2d(icpl).map(|c| c.level), Some(3));
        assert_eq!(model.release_target, model.grid.node(2, icpl));
        assert_eq!(
            well.cells[0].attributes,
            BoundaryAttributes::Well { rate: -150000.0 }
        );

        // River runs down the last column: one cell per base row
        assert_eq!(model.rivers[0].cells.len(), 21);
        assert!(model.rivers[0].cells.iter().all(|c| c.node < model.grid.ncpl()));

        assert_eq!(model.releases.len(), 2);
        assert_eq!(model.releases[0].points.len(), 16);
        assert_eq!(model.releases[1].points.len(), 416);
        assert_eq!(model.release_points().len(), 432);
        assert_eq!(model.recharge.len(), 651);
    }

    #[test]
    fn test_config_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scenario.json");
        let config = ScenarioConfig::default();
        config.save(&path).unwrap();
        assert_eq!(ScenarioConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_porosity_reaches_both_engines() {
        let defaults = ScenarioConfig::default();
        let config = ScenarioConfig {
            porosity: 0.25,
            prt: PrtSettings {
                porosity: 0.1,
                ..defaults.prt.clone()
            },
            mp7: Mp7Settings {
                porosity: 0.3,
                ..defaults.mp7.clone()
            },
            ..defaults
        };

        let prt = config.prt_settings();
        let mp7 = config.mp7_settings();
        assert_eq!(prt.porosity, 0.25);
        assert_eq!(mp7.porosity, 0.25);
        // Everything else is carried over untouched
        assert_eq!(PrtSettings { porosity: 0.1, ..prt }, config.prt);
        assert_eq!(Mp7Settings { porosity: 0.3, ..mp7 }, config.mp7);
    }

    #[test]
    fn test_config_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.json");
        assert!(matches!(
            ScenarioConfig::load(&missing),
            Err(ConfigError::Io { .. })
        ));

        let broken = dir.path().join("broken.json");
        fs::write(&broken, "{ \"name\": ").unwrap();
        assert!(matches!(
            ScenarioConfig::load(&broken),
            Err(ConfigError::Parse { .. })
        ));

        let config = ScenarioConfig {
            releases: Vec::new(),
            ..ScenarioConfig::default()
        };
        assert!(matches!(
            config.assemble(),
            Err(PipelineError::Config(ConfigError::NoReleaseGroups))
        ));

        let mut config = ScenarioConfig::default();
        config.boundaries.retain(|b| b.kind() == FeatureKind::River);
        assert!(matches!(
            config.assemble(),
            Err(PipelineError::Config(ConfigError::NoWellTarget))
        ));

        // An explicit node needs no well
        config.release_target = ReleaseTarget::Node { node: 5 };
        let model = config.assemble().unwrap();
        assert!(model.wells.is_empty());
        assert_eq!(model.releases[1].points[0].cell, 5);
    }
}
