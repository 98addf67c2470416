//! Grid construction: structured base grid, quadtree refinement, vertex grid

pub mod base;
pub mod refine;
pub mod vertex_grid;

pub use base::BaseGrid;
pub use refine::{refine, GridRefiner, RefinementFeature, MAX_REFINEMENT_LEVEL};
pub use vertex_grid::{Cell, Cell2d, Disv, Grid};
