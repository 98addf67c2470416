//! Structured layered base grid (the DIS description refinement starts from)

use crate::core_types::{Rect, Vec2};
use crate::error::GridError;
use serde::{Deserialize, Serialize};

/// Regular rectangular base grid with stacked layers
///
/// Origin is the south-west corner at (0, 0). Row 0 is the northern row, so
/// row `r` spans `y ∈ [(nrow - r - 1)·delc, (nrow - r)·delc]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseGrid {
    pub nlay: usize,
    pub nrow: usize,
    pub ncol: usize,
    /// Column width (model length units)
    pub delr: f64,
    /// Row height (model length units)
    pub delc: f64,
    /// Top elevation of layer 1
    pub top: f64,
    /// Bottom elevation of each layer
    pub botm: Vec<f64>,
    /// Horizontal hydraulic conductivity per layer
    pub kh: Vec<f64>,
    /// Vertical hydraulic conductivity per layer
    pub kv: Vec<f64>,
}

impl BaseGrid {
    /// Create a validated base grid
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        nrow: usize,
        ncol: usize,
        delr: f64,
        delc: f64,
        top: f64,
        botm: Vec<f64>,
        kh: Vec<f64>,
        kv: Vec<f64>,
    ) -> Result<Self, GridError> {
        let grid = Self {
            nlay: botm.len(),
            nrow,
            ncol,
            delr,
            delc,
            top,
            botm,
            kh,
            kv,
        };
        grid.validate()?;
        Ok(grid)
    }

    /// Check dimensions, spacing, elevations and conductivities
    pub fn validate(&self) -> Result<(), GridError> {
        let invalid = |reason: String| Err(GridError::InvalidBaseGrid { reason });

        if self.nlay == 0 || self.nrow == 0 || self.ncol == 0 {
            return invalid(format!(
                "dimensions must be positive, got nlay={} nrow={} ncol={}",
                self.nlay, self.nrow, self.ncol
            ));
        }
        if !(self.delr.is_finite() && self.delr > 0.0 && self.delc.is_finite() && self.delc > 0.0)
        {
            return invalid(format!(
                "cell spacing must be finite and positive, got delr={} delc={}",
                self.delr, self.delc
            ));
        }
        for (name, values) in [("botm", &self.botm), ("kh", &self.kh), ("kv", &self.kv)] {
            if values.len() != self.nlay {
                return invalid(format!(
                    "{name} has {} values for {} layers",
                    values.len(),
                    self.nlay
                ));
            }
        }

        let mut above = self.top;
        for (k, &bottom) in self.botm.iter().enumerate() {
            if !bottom.is_finite() || bottom >= above {
                return invalid(format!(
                    "layer {} bottom {bottom} is not below its top {above}",
                    k + 1
                ));
            }
            above = bottom;
        }

        if let Some(k) = self
            .kh
            .iter()
            .chain(&self.kv)
            .position(|&v| !(v.is_finite() && v > 0.0))
        {
            return invalid(format!(
                "hydraulic conductivity entry {k} must be finite and positive"
            ));
        }
        Ok(())
    }

    /// Total width (x extent)
    pub fn extent_x(&self) -> f64 {
        self.delr * self.ncol as f64
    }

    /// Total height (y extent)
    pub fn extent_y(&self) -> f64 {
        self.delc * self.nrow as f64
    }

    pub fn extent(&self) -> Rect {
        Rect::new(
            Vec2::new(0.0, 0.0),
            Vec2::new(self.extent_x(), self.extent_y()),
        )
    }

    /// Top elevation of layer `k` (0-based)
    pub fn layer_top(&self, k: usize) -> f64 {
        if k == 0 {
            self.top
        } else {
            self.botm[k - 1]
        }
    }

    /// Bottom elevation of layer `k` (0-based)
    pub fn layer_bottom(&self, k: usize) -> f64 {
        self.botm[k]
    }

    /// Footprint of base cell (row, col)
    pub fn cell_rect(&self, row: usize, col: usize) -> Rect {
        let x0 = col as f64 * self.delr;
        let y1 = self.extent_y() - row as f64 * self.delc;
        Rect::new(Vec2::new(x0, y1 - self.delc), Vec2::new(x0 + self.delr, y1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn three_layer() -> BaseGrid {
        BaseGrid::new(
            21,
            20,
            500.0,
            500.0,
            400.0,
            vec![220.0, 200.0, 0.0],
            vec![50.0, 0.01, 200.0],
            vec![10.0, 0.01, 20.0],
        )
        .unwrap()
    }

    #[test]
    fn test_extent_and_layers() {
        let grid = three_layer();
        assert_eq!(grid.nlay, 3);
        assert_relative_eq!(grid.extent_x(), 10000.0);
        assert_relative_eq!(grid.extent_y(), 10500.0);
        assert_relative_eq!(grid.layer_top(0), 400.0);
        assert_relative_eq!(grid.layer_top(2), 200.0);
        assert_relative_eq!(grid.layer_bottom(2), 0.0);
    }

    #[test]
    fn test_row_zero_is_north() {
        let grid = three_layer();
        let rect = grid.cell_rect(0, 0);
        assert_relative_eq!(rect.max.y, 10500.0);
        assert_relative_eq!(rect.min.y, 10000.0);
        let rect = grid.cell_rect(20, 19);
        assert_relative_eq!(rect.min.y, 0.0);
        assert_relative_eq!(rect.max.x, 10000.0);
    }

    #[test]
    fn test_rejects_inverted_layers() {
        let err = BaseGrid::new(
            1,
            1,
            1.0,
            1.0,
            10.0,
            vec![5.0, 6.0],
            vec![1.0, 1.0],
            vec![1.0, 1.0],
        )
        .unwrap_err();
        assert!(matches!(err, GridError::InvalidBaseGrid { .. }));
    }

    #[test]
    fn test_rejects_mismatched_conductivity() {
        let err = BaseGrid::new(1, 1, 1.0, 1.0, 10.0, vec![5.0], vec![1.0, 2.0], vec![1.0])
            .unwrap_err();
        assert!(matches!(err, GridError::InvalidBaseGrid { .. }));
    }
}
