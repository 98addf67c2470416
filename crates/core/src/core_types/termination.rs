//! Canonical termination reason codes

use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a trajectory point was recorded / why a particle stopped
///
/// `Released` marks the seed point; every other variant is terminal and is
/// carried by the last point of a trajectory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    Released,
    BoundaryExit,
    WeakSinkPassThrough,
    WeakSourcePassThrough,
    StopTimeReached,
    MaxStepsExceeded,
    Error,
}

impl TerminationReason {
    /// All codes in code order
    pub const ALL: [TerminationReason; 7] = [
        Self::Released,
        Self::BoundaryExit,
        Self::WeakSinkPassThrough,
        Self::WeakSourcePassThrough,
        Self::StopTimeReached,
        Self::MaxStepsExceeded,
        Self::Error,
    ];

    /// Integer code used in the canonical trajectory record format
    pub const fn code(self) -> u8 {
        match self {
            Self::Released => 0,
            Self::BoundaryExit => 1,
            Self::WeakSinkPassThrough => 2,
            Self::WeakSourcePassThrough => 3,
            Self::StopTimeReached => 4,
            Self::MaxStepsExceeded => 5,
            Self::Error => 6,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.code() == code)
    }

    /// Terminal reasons may only appear on the last point of a trajectory
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Released)
    }
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Released => "released",
            Self::BoundaryExit => "boundary-exit",
            Self::WeakSinkPassThrough => "weak-sink-pass-through",
            Self::WeakSourcePassThrough => "weak-source-pass-through",
            Self::StopTimeReached => "stop-time-reached",
            Self::MaxStepsExceeded => "max-steps-exceeded",
            Self::Error => "error",
        };
        f.write_str(name)
    }
}
