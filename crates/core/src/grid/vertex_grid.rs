//! Refined vertex grid (DISV-style unstructured description)
//!
//! Cells are stacked: cell2d `icpl` has the same footprint in every layer and
//! its node number in layer `k` is `k * ncpl + icpl`. Both the flow model and
//! the particle-tracking models rely on this shared numbering.

use crate::core_types::{Rect, Vec2};
use crate::error::GridError;
use serde::{Deserialize, Serialize};

/// Planar cell shared by every layer of a stack
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell2d {
    /// 0-based cell-per-layer index
    pub icpl: usize,
    /// Footprint center
    pub center: Vec2,
    /// Clockwise vertex ring (indices into the grid's vertex list),
    /// including hanging vertices contributed by finer neighbours
    pub ring: Vec<usize>,
    /// Quadtree refinement level (0 = base cell)
    pub level: u8,
    /// Axis-aligned footprint
    pub bounds: Rect,
}

/// One cell of one layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    /// 0-based node number (`layer * ncpl + icpl`)
    pub id: usize,
    /// 0-based layer
    pub layer: usize,
    pub icpl: usize,
    pub top: f64,
    pub bottom: f64,
    /// Horizontal hydraulic conductivity
    pub kh: f64,
    /// Vertical hydraulic conductivity
    pub kv: f64,
    pub active: bool,
}

/// Serializable DISV description, as consumed by the flow and tracking models
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Disv {
    pub nlay: usize,
    pub ncpl: usize,
    pub nvert: usize,
    pub top: Vec<f64>,
    pub botm: Vec<Vec<f64>>,
    /// (iv, x, y)
    pub vertices: Vec<(usize, f64, f64)>,
    /// (icell2d, xc, yc, ncvert, ring...)
    pub cell2d: Vec<(usize, f64, f64, usize, Vec<usize>)>,
    pub idomain: Vec<Vec<i32>>,
}

/// Quad-refined, layered vertex grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    pub(crate) nlay: usize,
    pub(crate) vertices: Vec<Vec2>,
    pub(crate) cells2d: Vec<Cell2d>,
    /// All layers, node-ordered
    pub(crate) cells: Vec<Cell>,
    /// Edge-sharing neighbours per cell2d, ascending
    pub(crate) neighbors: Vec<Vec<usize>>,
    pub(crate) extent: Rect,
}

impl Grid {
    pub fn nlay(&self) -> usize {
        self.nlay
    }

    /// Cells per layer
    pub fn ncpl(&self) -> usize {
        self.cells2d.len()
    }

    /// Total node count over all layers
    pub fn nnodes(&self) -> usize {
        self.cells.len()
    }

    pub fn vertices(&self) -> &[Vec2] {
        &self.vertices
    }

    pub fn cells2d(&self) -> &[Cell2d] {
        &self.cells2d
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn extent(&self) -> Rect {
        self.extent
    }

    pub fn cell(&self, node: usize) -> Option<&Cell> {
        self.cells.get(node)
    }

    pub fn cell2d(&self, icpl: usize) -> Option<&Cell2d> {
        self.cells2d.get(icpl)
    }

    /// Node number of cell2d `icpl` in layer `layer`
    pub fn node(&self, layer: usize, icpl: usize) -> usize {
        layer * self.ncpl() + icpl
    }

    /// (layer, icpl) of a node
    pub fn layer_and_icpl(&self, node: usize) -> (usize, usize) {
        let ncpl = self.ncpl();
        (node / ncpl, node % ncpl)
    }

    /// Vertex coordinates of a cell2d ring, clockwise
    pub fn polygon(&self, icpl: usize) -> Vec<Vec2> {
        self.cells2d
            .get(icpl)
            .map(|c| c.ring.iter().map(|&iv| self.vertices[iv]).collect())
            .unwrap_or_default()
    }

    /// Edge-sharing neighbours of a cell2d within its layer
    pub fn neighbors(&self, icpl: usize) -> &[usize] {
        self.neighbors.get(icpl).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Nodes of a stack, shallowest first
    pub fn stack(&self, icpl: usize) -> impl Iterator<Item = usize> + '_ {
        (0..self.nlay).map(move |k| self.node(k, icpl))
    }

    /// Shallowest active node of a stack
    pub fn shallowest_active(&self, icpl: usize) -> Option<usize> {
        self.stack(icpl).find(|&node| self.cells[node].active)
    }

    /// Mark a node active or inactive (idomain)
    pub fn set_active(&mut self, node: usize, active: bool) -> Result<(), GridError> {
        let count = self.cells.len();
        let cell = self
            .cells
            .get_mut(node)
            .ok_or(GridError::CellOutOfRange { cell: node, count })?;
        cell.active = active;
        Ok(())
    }

    /// Number of cell2d at each refinement level
    pub fn level_histogram(&self) -> Vec<usize> {
        let max = self.cells2d.iter().map(|c| c.level).max().unwrap_or(0) as usize;
        let mut counts = vec![0; max + 1];
        for cell in &self.cells2d {
            counts[cell.level as usize] += 1;
        }
        counts
    }

    /// Nodes of one layer
    fn layer(&self, k: usize) -> &[Cell] {
        let ncpl = self.ncpl();
        &self.cells[k * ncpl..(k + 1) * ncpl]
    }

    /// Export the DISV package description
    pub fn disv(&self) -> Disv {
        Disv {
            nlay: self.nlay,
            ncpl: self.ncpl(),
            nvert: self.vertices.len(),
            top: self.layer(0).iter().map(|c| c.top).collect(),
            botm: (0..self.nlay)
                .map(|k| self.layer(k).iter().map(|c| c.bottom).collect())
                .collect(),
            vertices: self
                .vertices
                .iter()
                .enumerate()
                .map(|(iv, v)| (iv, v.x, v.y))
                .collect(),
            cell2d: self
                .cells2d
                .iter()
                .map(|c| (c.icpl, c.center.x, c.center.y, c.ring.len(), c.ring.clone()))
                .collect(),
            idomain: (0..self.nlay)
                .map(|k| self.layer(k).iter().map(|c| i32::from(c.active)).collect())
                .collect(),
        }
    }
}
