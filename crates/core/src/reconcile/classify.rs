//! Small total classifications used when presenting reconciled records

use crate::core_types::GroupId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Hydrostratigraphic class of the layer a particle terminated in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerClass {
    /// Layer 1
    Upper,
    /// Layer 2
    Confining,
    /// Layer 3 and below
    Lower,
}

impl LayerClass {
    /// Class of a 1-based layer
    pub fn from_layer(layer: usize) -> Self {
        match layer {
            1 => Self::Upper,
            2 => Self::Confining,
            _ => Self::Lower,
        }
    }

    /// Plot color conventionally used for the class
    pub fn color(self) -> &'static str {
        match self {
            Self::Upper => "green",
            Self::Confining => "yellow",
            Self::Lower => "red",
        }
    }
}

impl fmt::Display for LayerClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Upper => "upper",
            Self::Confining => "confining",
            Self::Lower => "lower",
        })
    }
}

/// Release-group label: group 1 is subproblem A, group 2 is B
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Subproblem {
    A,
    B,
    Unlabeled,
}

impl Subproblem {
    pub fn from_group(group: GroupId) -> Self {
        match group.0 {
            1 => Self::A,
            2 => Self::B,
            _ => Self::Unlabeled,
        }
    }
}

impl fmt::Display for Subproblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::A => "A",
            Self::B => "B",
            Self::Unlabeled => "-",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_class_is_total() {
        assert_eq!(LayerClass::from_layer(1), LayerClass::Upper);
        assert_eq!(LayerClass::from_layer(2), LayerClass::Confining);
        assert_eq!(LayerClass::from_layer(3), LayerClass::Lower);
        assert_eq!(LayerClass::from_layer(0), LayerClass::Lower);
        assert_eq!(LayerClass::from_layer(17).color(), "red");
    }

    #[test]
    fn test_subproblem_labels() {
        assert_eq!(Subproblem::from_group(GroupId(1)), Subproblem::A);
        assert_eq!(Subproblem::from_group(GroupId(2)), Subproblem::B);
        assert_eq!(Subproblem::from_group(GroupId(3)), Subproblem::Unlabeled);
        assert_eq!(Subproblem::B.to_string(), "B");
    }
}
