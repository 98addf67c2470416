//! Boundary feature description and resolved assignments

use crate::core_types::Vec2;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Geometry of a boundary feature in model coordinates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates", rename_all = "snake_case")]
pub enum BoundaryGeometry {
    Point(Vec2),
    MultiPoint(Vec<Vec2>),
    Polyline(Vec<Vec2>),
}

impl BoundaryGeometry {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Point(_) => "point",
            Self::MultiPoint(_) => "multi-point",
            Self::Polyline(_) => "polyline",
        }
    }

    /// Number of input points (vertices for a polyline)
    pub fn len(&self) -> usize {
        match self {
            Self::Point(_) => 1,
            Self::MultiPoint(points) | Self::Polyline(points) => points.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureKind {
    Well,
    River,
}

impl FeatureKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Well => "well",
            Self::River => "river",
        }
    }
}

impl fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Auxiliary flags the tracking models read from boundary packages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FlowFaceFlags {
    /// Face the boundary flow is assigned to (0 = distributed internally, 6 = top)
    pub iface: i32,
    /// Face flow-direction flag; negative assigns the flow to the top face
    pub iflowface: i32,
}

/// Feature-level attributes, before resolution to cells
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeatureAttributes {
    /// One pumping rate per point (negative = extraction)
    Well { rates: Vec<f64> },
    River {
        stage: f64,
        conductance: f64,
        bottom: f64,
    },
}

impl FeatureAttributes {
    pub fn kind(&self) -> FeatureKind {
        match self {
            Self::Well { .. } => FeatureKind::Well,
            Self::River { .. } => FeatureKind::River,
        }
    }
}

/// A well or river to be placed on the grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundaryFeature {
    pub name: String,
    pub geometry: BoundaryGeometry,
    /// 0-based model layer the feature is applied in
    pub layer: usize,
    #[serde(default)]
    pub flags: FlowFaceFlags,
    pub attributes: FeatureAttributes,
}

impl BoundaryFeature {
    /// Single pumping well
    pub fn well(name: impl Into<String>, location: Vec2, rate: f64, layer: usize) -> Self {
        Self {
            name: name.into(),
            geometry: BoundaryGeometry::Point(location),
            layer,
            flags: FlowFaceFlags::default(),
            attributes: FeatureAttributes::Well { rates: vec![rate] },
        }
    }

    /// River reach along a polyline
    pub fn river(
        name: impl Into<String>,
        line: Vec<Vec2>,
        stage: f64,
        conductance: f64,
        bottom: f64,
        layer: usize,
    ) -> Self {
        Self {
            name: name.into(),
            geometry: BoundaryGeometry::Polyline(line),
            layer,
            flags: FlowFaceFlags::default(),
            attributes: FeatureAttributes::River {
                stage,
                conductance,
                bottom,
            },
        }
    }

    pub fn with_flags(mut self, iface: i32, iflowface: i32) -> Self {
        self.flags = FlowFaceFlags { iface, iflowface };
        self
    }

    pub fn kind(&self) -> FeatureKind {
        self.attributes.kind()
    }
}

/// Per-cell package values
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BoundaryAttributes {
    Well {
        rate: f64,
    },
    River {
        stage: f64,
        conductance: f64,
        bottom: f64,
    },
}

impl BoundaryAttributes {
    /// Package values in stress-period column order
    pub fn values(&self) -> Vec<f64> {
        match *self {
            Self::Well { rate } => vec![rate],
            Self::River {
                stage,
                conductance,
                bottom,
            } => vec![stage, conductance, bottom],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundaryCell {
    pub icpl: usize,
    /// Node in the assignment's layer
    pub node: usize,
    pub attributes: BoundaryAttributes,
}

/// One stress-period row: cell id, package values, auxiliary flags
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StressPeriodRow {
    pub layer: usize,
    pub icpl: usize,
    pub values: Vec<f64>,
    pub iface: i32,
    pub iflowface: i32,
}

/// A feature resolved to grid cells
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundaryAssignment {
    pub name: String,
    pub kind: FeatureKind,
    pub geometry: BoundaryGeometry,
    pub layer: usize,
    pub flags: FlowFaceFlags,
    /// Resolved cells, deduplicated, in order of first intersection
    pub cells: Vec<BoundaryCell>,
}

impl BoundaryAssignment {
    pub fn nodes(&self) -> Vec<usize> {
        self.cells.iter().map(|c| c.node).collect()
    }

    pub fn icpls(&self) -> Vec<usize> {
        self.cells.iter().map(|c| c.icpl).collect()
    }

    pub fn stress_period_rows(&self) -> Vec<StressPeriodRow> {
        self.cells
            .iter()
            .map(|cell| StressPeriodRow {
                layer: self.layer,
                icpl: cell.icpl,
                values: cell.attributes.values(),
                iface: self.flags.iface,
                iflowface: self.flags.iflowface,
            })
            .collect()
    }
}
