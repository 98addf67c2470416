//! Release schemes: how particles are laid out on a target cell

use super::face::FaceSubdivisions;
use super::point::ReleasePoint;
use crate::core_types::{GroupId, ParticleId, Vec3};
use crate::error::ReleaseError;
use crate::grid::Grid;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Closed set of release layouts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReleaseScheme {
    /// Caller-supplied local coordinates, replicated onto the target cell
    ExplicitList {
        points: Vec<Vec3>,
        #[serde(default)]
        drape: bool,
    },
    /// rows × columns points on each face, sized independently per face
    SubdividedFace {
        faces: FaceSubdivisions,
        #[serde(default)]
        drape: bool,
    },
}

impl ReleaseScheme {
    pub fn explicit(points: Vec<Vec3>) -> Self {
        Self::ExplicitList {
            points,
            drape: false,
        }
    }

    pub fn subdivided(faces: FaceSubdivisions) -> Self {
        Self::SubdividedFace {
            faces,
            drape: false,
        }
    }

    pub fn with_drape(mut self, enabled: bool) -> Self {
        match &mut self {
            Self::ExplicitList { drape, .. } | Self::SubdividedFace { drape, .. } => {
                *drape = enabled;
            }
        }
        self
    }

    pub fn drape(&self) -> bool {
        match self {
            Self::ExplicitList { drape, .. } | Self::SubdividedFace { drape, .. } => *drape,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::ExplicitList { .. } => "explicit-list",
            Self::SubdividedFace { .. } => "subdivided-face",
        }
    }

    /// Local coordinates in generation order
    pub fn local_points(&self) -> Vec<Vec3> {
        match self {
            Self::ExplicitList { points, .. } => points.clone(),
            Self::SubdividedFace { faces, .. } => faces.points(),
        }
    }

    /// Release points on node `target`, group 1, released at t = 0
    pub fn generate(&self, target: usize, grid: &Grid) -> Result<Vec<ReleasePoint>, ReleaseError> {
        self.generate_for(GroupId::default(), 0.0, target, grid)
    }

    /// Release points on node `target` for a given group and release time
    ///
    /// With drape set, each point moves to the shallowest active node of the
    /// target's stack and its local z snaps to that cell's top.
    pub fn generate_for(
        &self,
        group: GroupId,
        release_time: f64,
        target: usize,
        grid: &Grid,
    ) -> Result<Vec<ReleasePoint>, ReleaseError> {
        let count = grid.nnodes();
        if target >= count {
            return Err(ReleaseError::CellOutOfRange {
                cell: target,
                count,
            });
        }

        let locals = self.local_points();
        if locals.is_empty() {
            return Err(ReleaseError::EmptyScheme);
        }
        for (index, local) in locals.iter().enumerate() {
            if let Some(&value) = local
                .iter()
                .find(|v| !(v.is_finite() && (0.0..=1.0).contains(*v)))
            {
                return Err(ReleaseError::LocalCoordinateOutOfRange { index, value });
            }
        }

        let drape = self.drape();
        let cell = if drape {
            let (_, icpl) = grid.layer_and_icpl(target);
            grid.shallowest_active(icpl)
                .ok_or(ReleaseError::NoActiveCell { icpl })?
        } else {
            target
        };

        let points: Vec<ReleasePoint> = locals
            .into_iter()
            .enumerate()
            .map(|(i, mut local)| {
                if drape {
                    local.z = 1.0;
                }
                ReleasePoint {
                    group,
                    particle: ParticleId(i as u32 + 1),
                    cell,
                    local,
                    drape,
                    release_time,
                }
            })
            .collect();

        debug!(
            "Generated {} {} release points for {} on node {}",
            points.len(),
            self.name(),
            group,
            cell
        );
        Ok(points)
    }
}

/// A release group: one scheme, one release time, one group id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReleaseGroup {
    pub group: GroupId,
    pub scheme: ReleaseScheme,
    #[serde(default)]
    pub release_time: f64,
}

impl ReleaseGroup {
    pub fn new(group: u32, scheme: ReleaseScheme) -> Self {
        Self {
            group: GroupId(group),
            scheme,
            release_time: 0.0,
        }
    }

    pub fn generate(&self, target: usize, grid: &Grid) -> Result<Vec<ReleasePoint>, ReleaseError> {
        self.scheme
            .generate_for(self.group, self.release_time, target, grid)
    }
}
