//! Nested quadtree refinement of a base grid
//!
//! Each refinement level splits the cells of the previous level that overlap
//! a level polygon into 2×2 children. Leaves are tracked in integer "finest
//! units" (1 / 2^max_level of a base cell) so shared vertices deduplicate
//! exactly and hanging vertices can be found by walking cell edges.
//!
//! # Cell numbering
//!
//! Base cells are visited row-major (row 0 is the northern row). Within a base
//! cell, a split leaf is replaced in place by its children in NW, NE, SW, SE
//! order, recursively. The resulting order is the cell2d numbering shared by
//! every layer and every downstream model.

use crate::core_types::geometry::{self, EPSILON};
use crate::core_types::{Rect, Vec2};
use crate::error::GridError;
use crate::grid::base::BaseGrid;
use crate::grid::vertex_grid::{Cell, Cell2d, Grid};
use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Deepest supported level; 2^12 finest units per base cell side
pub const MAX_REFINEMENT_LEVEL: u8 = 12;

/// Polygon region refined to a target level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefinementFeature {
    pub name: String,
    /// Polygon ring; a repeated closing vertex is accepted
    pub polygon: Vec<Vec2>,
    /// Target level (1 = one 2×2 split of a base cell)
    pub level: u8,
    /// 0-based layers the feature applies to
    pub layers: Vec<usize>,
}

impl RefinementFeature {
    pub fn new(name: impl Into<String>, polygon: Vec<Vec2>, level: u8, layers: Vec<usize>) -> Self {
        Self {
            name: name.into(),
            polygon,
            level,
            layers,
        }
    }

    /// Feature applied to every layer of an `nlay`-layer grid
    pub fn all_layers(name: impl Into<String>, polygon: Vec<Vec2>, level: u8, nlay: usize) -> Self {
        Self::new(name, polygon, level, (0..nlay).collect())
    }

    /// Axis-aligned rectangular feature
    pub fn rectangle(
        name: impl Into<String>,
        min: (f64, f64),
        max: (f64, f64),
        level: u8,
        nlay: usize,
    ) -> Self {
        let rect = Rect::new(Vec2::new(min.0, min.1), Vec2::new(max.0, max.1));
        Self::all_layers(name, rect.ring().to_vec(), level, nlay)
    }
}

/// Quadtree leaf in finest units; `j` grows southward from the grid top
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Leaf {
    i0: u32,
    j0: u32,
    size: u32,
    level: u8,
}

impl Leaf {
    fn children(self) -> [Leaf; 4] {
        let half = self.size / 2;
        let level = self.level + 1;
        [
            Leaf { i0: self.i0, j0: self.j0, size: half, level },
            Leaf { i0: self.i0 + half, j0: self.j0, size: half, level },
            Leaf { i0: self.i0, j0: self.j0 + half, size: half, level },
            Leaf { i0: self.i0 + half, j0: self.j0 + half, size: half, level },
        ]
    }
}

/// Maps finest-unit coordinates to model coordinates
#[derive(Debug, Clone, Copy)]
struct UnitFrame {
    dx: f64,
    dy: f64,
    top: f64,
}

impl UnitFrame {
    fn point(&self, i: u32, j: u32) -> Vec2 {
        Vec2::new(f64::from(i) * self.dx, self.top - f64::from(j) * self.dy)
    }

    fn rect(&self, leaf: &Leaf) -> Rect {
        let min = self.point(leaf.i0, leaf.j0 + leaf.size);
        let max = self.point(leaf.i0 + leaf.size, leaf.j0);
        Rect::new(min, max)
    }
}

/// Builds a refined vertex grid from a base grid and refinement features
#[derive(Debug, Clone)]
pub struct GridRefiner {
    base: BaseGrid,
    features: Vec<RefinementFeature>,
}

impl GridRefiner {
    pub fn new(base: BaseGrid) -> Self {
        Self {
            base,
            features: Vec::new(),
        }
    }

    pub fn with_feature(mut self, feature: RefinementFeature) -> Self {
        self.features.push(feature);
        self
    }

    pub fn add_feature(&mut self, feature: RefinementFeature) {
        self.features.push(feature);
    }

    pub fn base(&self) -> &BaseGrid {
        &self.base
    }

    pub fn features(&self) -> &[RefinementFeature] {
        &self.features
    }

    /// Build the refined grid
    ///
    /// Features are applied in ascending level order. Fails when a feature is
    /// malformed, restricted to a subset of layers, or not nested inside a
    /// feature of the previous level, and when any output cell polygon is not
    /// simple.
    pub fn refine(&self) -> Result<Grid, GridError> {
        self.base.validate()?;

        let mut features = self
            .features
            .iter()
            .map(|f| prepare_feature(f, self.base.nlay))
            .collect::<Result<Vec<_>, _>>()?;
        features.sort_by_key(|f| f.level);
        check_nesting(&features)?;

        let max_level = features.last().map_or(0, |f| f.level);
        let scale = 1u32 << max_level;
        let frame = UnitFrame {
            dx: self.base.delr / f64::from(scale),
            dy: self.base.delc / f64::from(scale),
            top: self.base.extent_y(),
        };

        // One leaf list per base cell, row-major
        let mut stacks: Vec<Vec<Leaf>> = (0..self.base.nrow)
            .flat_map(|row| {
                (0..self.base.ncol).map(move |col| {
                    vec![Leaf {
                        i0: col as u32 * scale,
                        j0: row as u32 * scale,
                        size: scale,
                        level: 0,
                    }]
                })
            })
            .collect();

        for level in 1..=max_level {
            let polygons: Vec<&PreparedFeature> =
                features.iter().filter(|f| f.level == level).collect();
            let mut refined_by = vec![0usize; polygons.len()];

            for leaves in &mut stacks {
                let mut next = Vec::with_capacity(leaves.len());
                for leaf in leaves.iter() {
                    let mut split = false;
                    if leaf.level + 1 == level {
                        let rect = frame.rect(leaf);
                        let min_area = EPSILON * rect.area().max(1.0);
                        for (n, feature) in polygons.iter().enumerate() {
                            if feature.bounds.touches(&rect, 0.0)
                                && rect.overlap_area(&feature.ring) > min_area
                            {
                                refined_by[n] += 1;
                                split = true;
                            }
                        }
                    }
                    if split {
                        next.extend(leaf.children());
                    } else {
                        next.push(*leaf);
                    }
                }
                *leaves = next;
            }

            for (feature, count) in polygons.iter().zip(&refined_by) {
                if *count == 0 {
                    warn!(
                        "Refinement feature '{}' (level {}) does not overlap any level {} cell",
                        feature.name,
                        level,
                        level - 1
                    );
                } else {
                    debug!(
                        "Refinement feature '{}' split {} cells at level {}",
                        feature.name, count, level
                    );
                }
            }
        }

        let leaves: Vec<Leaf> = stacks.into_iter().flatten().collect();
        let grid = assemble(&self.base, &leaves, frame);
        validate_polygons(&grid)?;

        info!(
            "Refined grid built: {} layers, {} cells per layer, {} vertices, levels {:?}",
            grid.nlay(),
            grid.ncpl(),
            grid.vertices().len(),
            grid.level_histogram()
        );
        Ok(grid)
    }
}

/// Convenience wrapper around [`GridRefiner`]
pub fn refine(base: &BaseGrid, features: &[RefinementFeature]) -> Result<Grid, GridError> {
    GridRefiner {
        base: base.clone(),
        features: features.to_vec(),
    }
    .refine()
}

#[derive(Debug)]
struct PreparedFeature {
    name: String,
    ring: Vec<Vec2>,
    level: u8,
    bounds: Rect,
}

fn prepare_feature(feature: &RefinementFeature, nlay: usize) -> Result<PreparedFeature, GridError> {
    let invalid = |reason: String| GridError::InvalidFeature {
        feature: feature.name.clone(),
        reason,
    };

    if feature.level == 0 || feature.level > MAX_REFINEMENT_LEVEL {
        return Err(invalid(format!(
            "level {} outside 1..={MAX_REFINEMENT_LEVEL}",
            feature.level
        )));
    }

    let mut layers = feature.layers.clone();
    layers.sort_unstable();
    layers.dedup();
    if layers != (0..nlay).collect::<Vec<_>>() {
        return Err(GridError::LayerMismatch {
            feature: feature.name.clone(),
            layers: feature.layers.clone(),
            nlay,
        });
    }

    let ring = geometry::open_ring(&feature.polygon);
    if ring.len() < 3 || ring.iter().any(|p| !(p.x.is_finite() && p.y.is_finite())) {
        return Err(invalid("polygon needs at least 3 finite vertices".into()));
    }
    if geometry::signed_area(&ring).abs() <= EPSILON {
        return Err(invalid("polygon has zero area".into()));
    }
    if !geometry::is_simple(&ring) {
        return Err(invalid("polygon is self-intersecting".into()));
    }

    let (mut min, mut max) = (ring[0], ring[0]);
    for p in &ring {
        min = min.inf(p);
        max = max.sup(p);
    }

    Ok(PreparedFeature {
        name: feature.name.clone(),
        ring,
        level: feature.level,
        bounds: Rect::new(min, max),
    })
}

/// Level n > 1 polygons must lie inside some level n - 1 polygon
fn check_nesting(features: &[PreparedFeature]) -> Result<(), GridError> {
    for feature in features.iter().filter(|f| f.level > 1) {
        let parent_level = feature.level - 1;
        let nested = features
            .iter()
            .filter(|p| p.level == parent_level)
            .any(|p| geometry::polygon_contains(&p.ring, &feature.ring, EPSILON));
        if !nested {
            return Err(GridError::NotNested {
                feature: feature.name.clone(),
                level: feature.level,
                parent_level,
            });
        }
    }
    Ok(())
}

/// Clockwise ring walk in finest units, picking up every vertex on the boundary
fn ring_keys(leaf: &Leaf, corners: &FxHashSet<(u32, u32)>) -> Vec<(u32, u32)> {
    let (i0, j0) = (leaf.i0, leaf.j0);
    let (i1, j1) = (leaf.i0 + leaf.size, leaf.j0 + leaf.size);
    let mut ring = Vec::with_capacity(4);

    // North edge west → east, east edge north → south, then back
    let walk = (i0..i1)
        .map(|i| (i, j0))
        .chain((j0..j1).map(|j| (i1, j)))
        .chain((i0 + 1..=i1).rev().map(|i| (i, j1)))
        .chain((j0 + 1..=j1).rev().map(|j| (i0, j)));
    for key in walk {
        if corners.contains(&key) {
            ring.push(key);
        }
    }
    ring
}

fn assemble(base: &BaseGrid, leaves: &[Leaf], frame: UnitFrame) -> Grid {
    let corners: FxHashSet<(u32, u32)> = leaves
        .iter()
        .flat_map(|l| {
            let (i1, j1) = (l.i0 + l.size, l.j0 + l.size);
            [(l.i0, l.j0), (i1, l.j0), (i1, j1), (l.i0, j1)]
        })
        .collect();

    let mut vertex_ids: FxHashMap<(u32, u32), usize> = FxHashMap::default();
    let mut vertices = Vec::with_capacity(corners.len());
    let mut cells2d = Vec::with_capacity(leaves.len());

    for (icpl, leaf) in leaves.iter().enumerate() {
        let ring = ring_keys(leaf, &corners)
            .into_iter()
            .map(|key| {
                *vertex_ids.entry(key).or_insert_with(|| {
                    vertices.push(frame.point(key.0, key.1));
                    vertices.len() - 1
                })
            })
            .collect();
        let bounds = frame.rect(leaf);
        cells2d.push(Cell2d {
            icpl,
            center: bounds.center(),
            ring,
            level: leaf.level,
            bounds,
        });
    }

    // Unit edge segments: (i, j, horizontal?) → cells touching it
    let mut edges: FxHashMap<(u32, u32, bool), Vec<usize>> = FxHashMap::default();
    for (icpl, leaf) in leaves.iter().enumerate() {
        let (i1, j1) = (leaf.i0 + leaf.size, leaf.j0 + leaf.size);
        for i in leaf.i0..i1 {
            edges.entry((i, leaf.j0, true)).or_default().push(icpl);
            edges.entry((i, j1, true)).or_default().push(icpl);
        }
        for j in leaf.j0..j1 {
            edges.entry((leaf.i0, j, false)).or_default().push(icpl);
            edges.entry((i1, j, false)).or_default().push(icpl);
        }
    }
    let mut neighbors: Vec<FxHashSet<usize>> = vec![FxHashSet::default(); leaves.len()];
    for shared in edges.values().filter(|c| c.len() == 2) {
        neighbors[shared[0]].insert(shared[1]);
        neighbors[shared[1]].insert(shared[0]);
    }
    let neighbors = neighbors
        .into_iter()
        .map(|set| {
            let mut list: Vec<usize> = set.into_iter().collect();
            list.sort_unstable();
            list
        })
        .collect();

    let ncpl = leaves.len();
    let cells = (0..base.nlay)
        .flat_map(|k| {
            (0..ncpl).map(move |icpl| Cell {
                id: k * ncpl + icpl,
                layer: k,
                icpl,
                top: base.layer_top(k),
                bottom: base.layer_bottom(k),
                kh: base.kh[k],
                kv: base.kv[k],
                active: true,
            })
        })
        .collect();

    Grid {
        nlay: base.nlay,
        vertices,
        cells2d,
        cells,
        neighbors,
        extent: base.extent(),
    }
}

fn validate_polygons(grid: &Grid) -> Result<(), GridError> {
    let bad = grid
        .cells2d()
        .par_iter()
        .find_first(|cell| cell.ring.len() < 4 || !geometry::is_simple(&grid.polygon(cell.icpl)));
    match bad {
        Some(cell) => Err(GridError::SelfIntersecting { cell: cell.icpl }),
        None => Ok(()),
    }
}
