//! Release points and their model-coordinate form

use crate::core_types::{GroupId, ParticleId, ParticleKey, Vec3};
use crate::error::ReleaseError;
use crate::grid::Grid;
use serde::{Deserialize, Serialize};

/// Particle seed, immutable once generated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReleasePoint {
    pub group: GroupId,
    /// 1-based within the group, in generation order
    pub particle: ParticleId,
    /// Node the particle starts in
    pub cell: usize,
    /// Local coordinates in [0, 1]^3
    pub local: Vec3,
    pub drape: bool,
    pub release_time: f64,
}

impl ReleasePoint {
    pub fn key(&self) -> ParticleKey {
        ParticleKey {
            group: self.group,
            particle: self.particle,
        }
    }

    /// Model x, y, z from the cell footprint and layer elevations
    pub fn model_coordinates(&self, grid: &Grid) -> Result<Vec3, ReleaseError> {
        let count = grid.nnodes();
        let out_of_range = ReleaseError::CellOutOfRange {
            cell: self.cell,
            count,
        };
        let cell = grid.cell(self.cell).ok_or_else(|| out_of_range.clone())?;
        let bounds = grid.cell2d(cell.icpl).ok_or(out_of_range)?.bounds;
        Ok(Vec3::new(
            bounds.min.x + self.local.x * bounds.width(),
            bounds.min.y + self.local.y * bounds.height(),
            cell.bottom + self.local.z * (cell.top - cell.bottom),
        ))
    }

    /// Release-package row for this point
    pub fn prp_record(&self, grid: &Grid) -> Result<PrpRecord, ReleaseError> {
        let position = self.model_coordinates(grid)?;
        let (k, icpl) = grid.layer_and_icpl(self.cell);
        Ok(PrpRecord {
            irpt: self.particle.0,
            k,
            icpl,
            x: position.x,
            y: position.y,
            z: position.z,
        })
    }
}

/// One row of a PRT particle release package: 1-based release point number,
/// 0-based (layer, cell2d) and model coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PrpRecord {
    pub irpt: u32,
    pub k: usize,
    pub icpl: usize,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Release-package rows for a point set, in order
pub fn prp_records(points: &[ReleasePoint], grid: &Grid) -> Result<Vec<PrpRecord>, ReleaseError> {
    points.iter().map(|p| p.prp_record(grid)).collect()
}
