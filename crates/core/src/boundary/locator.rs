//! Resolves point and line boundary features to refined-grid cells

use super::feature::{
    BoundaryAssignment, BoundaryAttributes, BoundaryCell, BoundaryFeature, BoundaryGeometry,
    FeatureAttributes, FeatureKind,
};
use crate::core_types::geometry::{self, PointLocation, EPSILON};
use crate::core_types::{Rect, Vec2};
use crate::error::LocateError;
use crate::grid::Grid;
use rayon::prelude::*;
use rustc_hash::FxHashSet;
use tracing::debug;

/// Places wells and rivers on a refined grid
#[derive(Debug, Clone, Copy)]
pub struct BoundaryLocator<'g> {
    grid: &'g Grid,
    tolerance: f64,
}

impl<'g> BoundaryLocator<'g> {
    pub fn new(grid: &'g Grid) -> Self {
        let extent = grid.extent();
        Self {
            grid,
            tolerance: EPSILON * extent.width().max(extent.height()).max(1.0),
        }
    }

    /// Resolve a feature to its cells in the feature's layer
    pub fn locate(&self, feature: &BoundaryFeature) -> Result<BoundaryAssignment, LocateError> {
        let nlay = self.grid.nlay();
        if feature.layer >= nlay {
            return Err(LocateError::LayerOutOfRange {
                feature: feature.name.clone(),
                layer: feature.layer,
                nlay,
            });
        }

        let kind = feature.kind();
        let cells = match (&feature.attributes, &feature.geometry) {
            (
                FeatureAttributes::Well { rates },
                BoundaryGeometry::Point(_) | BoundaryGeometry::MultiPoint(_),
            ) => {
                if rates.len() != feature.geometry.len() {
                    return Err(LocateError::RateCountMismatch {
                        feature: feature.name.clone(),
                        points: feature.geometry.len(),
                        rates: rates.len(),
                    });
                }
                let hits = self.locate_points(&feature.name, &feature.geometry)?;
                // Points sharing a cell pump from it together
                let mut cells: Vec<BoundaryCell> = Vec::with_capacity(hits.len());
                for (icpl, rate) in hits.into_iter().zip(rates) {
                    match cells.iter_mut().find(|c| c.icpl == icpl) {
                        Some(BoundaryCell {
                            attributes: BoundaryAttributes::Well { rate: total },
                            ..
                        }) => *total += rate,
                        _ => cells.push(BoundaryCell {
                            icpl,
                            node: self.grid.node(feature.layer, icpl),
                            attributes: BoundaryAttributes::Well { rate: *rate },
                        }),
                    }
                }
                cells
            }
            (
                &FeatureAttributes::River {
                    stage,
                    conductance,
                    bottom,
                },
                BoundaryGeometry::Polyline(line),
            ) => self
                .locate_line(&feature.name, line)?
                .into_iter()
                .map(|icpl| BoundaryCell {
                    icpl,
                    node: self.grid.node(feature.layer, icpl),
                    attributes: BoundaryAttributes::River {
                        stage,
                        conductance,
                        bottom,
                    },
                })
                .collect(),
            (attributes, geometry) => {
                return Err(LocateError::GeometryMismatch {
                    feature: feature.name.clone(),
                    kind: attributes.kind().name(),
                    geometry: geometry.name(),
                })
            }
        };

        debug!(
            "Located {} '{}' in layer {}: {} cells",
            kind,
            feature.name,
            feature.layer + 1,
            cells.len()
        );

        Ok(BoundaryAssignment {
            name: feature.name.clone(),
            kind,
            geometry: feature.geometry.clone(),
            layer: feature.layer,
            flags: feature.flags,
            cells,
        })
    }

    /// Resolve a bare geometry to cell2d indices
    ///
    /// Points resolve to one cell each (deduplicated in order), lines to every
    /// cell they cross in order of first intersection.
    pub fn locate_geometry(
        &self,
        name: &str,
        geometry: &BoundaryGeometry,
    ) -> Result<Vec<usize>, LocateError> {
        match geometry {
            BoundaryGeometry::Point(_) | BoundaryGeometry::MultiPoint(_) => {
                let mut seen = FxHashSet::default();
                Ok(self
                    .locate_points(name, geometry)?
                    .into_iter()
                    .filter(|icpl| seen.insert(*icpl))
                    .collect())
            }
            BoundaryGeometry::Polyline(line) => self.locate_line(name, line),
        }
    }

    /// The unique cell containing `point`
    pub fn locate_point(&self, name: &str, point: &Vec2) -> Result<usize, LocateError> {
        if !(point.x.is_finite() && point.y.is_finite()) {
            return Err(LocateError::DegenerateGeometry {
                feature: name.to_string(),
                reason: "non-finite coordinate",
            });
        }

        let tol = self.tolerance;
        let mut hits: Vec<usize> = self
            .grid
            .cells2d()
            .par_iter()
            .filter(|cell| cell.bounds.contains(point, tol))
            .filter(|cell| {
                geometry::locate_point(&self.grid.polygon(cell.icpl), point, tol)
                    != PointLocation::Outside
            })
            .map(|cell| cell.icpl)
            .collect();
        hits.sort_unstable();

        match hits.as_slice() {
            [] => Err(LocateError::OutsideGrid {
                feature: name.to_string(),
                x: point.x,
                y: point.y,
            }),
            [icpl] => Ok(*icpl),
            _ => Err(LocateError::Ambiguous {
                feature: name.to_string(),
                x: point.x,
                y: point.y,
                cells: hits,
            }),
        }
    }

    fn locate_points(&self, name: &str, geometry: &BoundaryGeometry) -> Result<Vec<usize>, LocateError> {
        let points: &[Vec2] = match geometry {
            BoundaryGeometry::Point(p) => std::slice::from_ref(p),
            BoundaryGeometry::MultiPoint(points) | BoundaryGeometry::Polyline(points) => points,
        };
        if points.is_empty() {
            return Err(LocateError::DegenerateGeometry {
                feature: name.to_string(),
                reason: "no points",
            });
        }
        points.iter().map(|p| self.locate_point(name, p)).collect()
    }

    fn locate_line(&self, name: &str, line: &[Vec2]) -> Result<Vec<usize>, LocateError> {
        let degenerate = |reason| LocateError::DegenerateGeometry {
            feature: name.to_string(),
            reason,
        };
        if line.len() < 2 {
            return Err(degenerate("polyline needs at least 2 vertices"));
        }
        if line.iter().any(|p| !(p.x.is_finite() && p.y.is_finite())) {
            return Err(degenerate("non-finite coordinate"));
        }
        let length: f64 = line.windows(2).map(|w| (w[1] - w[0]).norm()).sum();
        if length <= self.tolerance {
            return Err(degenerate("zero-length polyline"));
        }

        let mut seen = FxHashSet::default();
        let mut ordered = Vec::new();
        for segment in line.windows(2) {
            let (a, b) = (&segment[0], &segment[1]);
            let seg_len = (b - a).norm();
            if seg_len <= self.tolerance {
                continue;
            }
            let bbox = Rect::new(a.inf(b), a.sup(b));

            let mut crossed: Vec<(f64, usize)> = self
                .grid
                .cells2d()
                .par_iter()
                .filter(|cell| cell.bounds.touches(&bbox, self.tolerance))
                .filter_map(|cell| {
                    let (t0, t1) = cell.bounds.clip_segment(a, b)?;
                    ((t1 - t0) * seg_len > self.tolerance).then_some((t0, cell.icpl))
                })
                .collect();
            crossed.sort_by(|x, y| x.0.total_cmp(&y.0).then(x.1.cmp(&y.1)));

            ordered.extend(
                crossed
                    .into_iter()
                    .map(|(_, icpl)| icpl)
                    .filter(|icpl| seen.insert(*icpl)),
            );
        }

        if ordered.is_empty() {
            return Err(LocateError::LineOutsideGrid {
                feature: name.to_string(),
            });
        }
        Ok(ordered)
    }
}

/// Resolve one feature against a grid
pub fn locate(grid: &Grid, feature: &BoundaryFeature) -> Result<BoundaryAssignment, LocateError> {
    BoundaryLocator::new(grid).locate(feature)
}

/// Resolve every feature of one kind, failing on the first unresolved one
pub fn locate_all(
    grid: &Grid,
    features: &[BoundaryFeature],
    kind: FeatureKind,
) -> Result<Vec<BoundaryAssignment>, LocateError> {
    let locator = BoundaryLocator::new(grid);
    features
        .iter()
        .filter(|f| f.kind() == kind)
        .map(|f| locator.locate(f))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{BaseGrid, GridRefiner, RefinementFeature};

    /// 3×3 base of 100 m cells, center cell refined once, 2 layers
    fn grid() -> Grid {
        let base = BaseGrid::new(
            3,
            3,
            100.0,
            100.0,
            50.0,
            vec![20.0, 0.0],
            vec![1.0, 1.0],
            vec![1.0, 1.0],
        )
        .unwrap();
        GridRefiner::new(base)
            .with_feature(RefinementFeature::rectangle(
                "center",
                (110.0, 110.0),
                (190.0, 190.0),
                1,
                2,
            ))
            .refine()
            .unwrap()
    }

    #[test]
    fn test_well_inside_refined_cell() {
        let grid = grid();
        let well = BoundaryFeature::well("w", Vec2::new(125.0, 175.0), -10.0, 1);
        let assignment = locate(&grid, &well).unwrap();
        assert_eq!(assignment.kind, FeatureKind::Well);
        assert_eq!(assignment.cells.len(), 1);
        let cell = &assignment.cells[0];
        let c2d = grid.cell2d(cell.icpl).unwrap();
        assert_eq!(c2d.level, 1);
        assert!(c2d.bounds.contains(&Vec2::new(125.0, 175.0), 0.0));
        assert_eq!(cell.node, grid.node(1, cell.icpl));
        assert_eq!(cell.attributes, BoundaryAttributes::Well { rate: -10.0 });
    }

    #[test]
    fn test_well_on_refinement_boundary_is_ambiguous() {
        let grid = grid();
        // Shared edge between the coarse west neighbour and a refined child
        let well = BoundaryFeature::well("edge", Vec2::new(100.0, 175.0), -10.0, 0);
        let err = locate(&grid, &well).unwrap_err();
        match err {
            LocateError::Ambiguous { cells, .. } => assert_eq!(cells.len(), 2),
            other => panic!("expected ambiguity, got {other:?}"),
        }

        // Corner shared by the four children
        let well = BoundaryFeature::well("corner", Vec2::new(150.0, 150.0), -10.0, 0);
        match locate(&grid, &well).unwrap_err() {
            LocateError::Ambiguous { cells, .. } => assert_eq!(cells.len(), 4),
            other => panic!("expected ambiguity, got {other:?}"),
        }
    }

    #[test]
    fn test_well_outside_grid() {
        let grid = grid();
        let well = BoundaryFeature::well("far", Vec2::new(500.0, 50.0), -1.0, 0);
        assert!(matches!(
            locate(&grid, &well),
            Err(LocateError::OutsideGrid { .. })
        ));
    }

    #[test]
    fn test_multi_point_well_merges_cells() {
        let grid = grid();
        let feature = BoundaryFeature {
            name: "field".into(),
            geometry: BoundaryGeometry::MultiPoint(vec![
                Vec2::new(20.0, 20.0),
                Vec2::new(30.0, 30.0),
                Vec2::new(250.0, 250.0),
            ]),
            layer: 0,
            flags: Default::default(),
            attributes: FeatureAttributes::Well {
                rates: vec![-1.0, -2.0, -4.0],
            },
        };
        let assignment = locate(&grid, &feature).unwrap();
        assert_eq!(assignment.cells.len(), 2);
        assert_eq!(assignment.cells[0].attributes, BoundaryAttributes::Well { rate: -3.0 });

        let mut bad = feature;
        bad.attributes = FeatureAttributes::Well { rates: vec![-1.0] };
        assert!(matches!(
            locate(&grid, &bad),
            Err(LocateError::RateCountMismatch { points: 3, rates: 1, .. })
        ));
    }

    #[test]
    fn test_river_cells_in_crossing_order() {
        let grid = grid();
        // North to south through the middle column at x = 160
        let river = BoundaryFeature::river(
            "r",
            vec![Vec2::new(160.0, 300.0), Vec2::new(160.0, 0.0)],
            30.0,
            1e3,
            25.0,
            0,
        )
        .with_flags(6, -1);
        let assignment = locate(&grid, &river).unwrap();

        let ys: Vec<f64> = assignment
            .icpls()
            .iter()
            .map(|&i| grid.cell2d(i).unwrap().center.y)
            .collect();
        assert_eq!(ys, vec![250.0, 175.0, 125.0, 50.0]);

        let rows = assignment.stress_period_rows();
        assert_eq!(rows[0].values, vec![30.0, 1e3, 25.0]);
        assert_eq!((rows[0].iface, rows[0].iflowface), (6, -1));
    }

    #[test]
    fn test_river_on_grid_edge_assigns_edge_cells() {
        let grid = grid();
        // Along the east boundary, inside each eastern cell's closed footprint
        let river = BoundaryFeature::river(
            "edge",
            vec![Vec2::new(300.0, 300.0), Vec2::new(300.0, 0.0)],
            1.0,
            1.0,
            0.0,
            0,
        );
        let assignment = locate(&grid, &river).unwrap();
        assert_eq!(assignment.cells.len(), 3);
    }

    #[test]
    fn test_degenerate_and_mismatched_geometry() {
        let grid = grid();
        let river = BoundaryFeature::river(
            "dot",
            vec![Vec2::new(10.0, 10.0), Vec2::new(10.0, 10.0)],
            1.0,
            1.0,
            0.0,
            0,
        );
        assert!(matches!(
            locate(&grid, &river),
            Err(LocateError::DegenerateGeometry { .. })
        ));

        let outside = BoundaryFeature::river(
            "away",
            vec![Vec2::new(400.0, 0.0), Vec2::new(400.0, 300.0)],
            1.0,
            1.0,
            0.0,
            0,
        );
        assert!(matches!(
            locate(&grid, &outside),
            Err(LocateError::LineOutsideGrid { .. })
        ));

        let mut well = BoundaryFeature::well("w", Vec2::new(10.0, 10.0), -1.0, 0);
        well.geometry = BoundaryGeometry::Polyline(vec![Vec2::new(0.0, 0.0), Vec2::new(1.0, 1.0)]);
        assert!(matches!(
            locate(&grid, &well),
            Err(LocateError::GeometryMismatch { .. })
        ));

        let deep = BoundaryFeature::well("deep", Vec2::new(10.0, 10.0), -1.0, 5);
        assert!(matches!(
            locate(&grid, &deep),
            Err(LocateError::LayerOutOfRange { layer: 5, nlay: 2, .. })
        ));
    }
}
