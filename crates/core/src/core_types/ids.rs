//! Particle identity
//!
//! Both tracking engines number particles differently. Everything downstream of
//! the adapters uses the canonical 1-based `(group, particle)` pair defined here.

use serde::{Deserialize, Serialize};
use std::fmt;

/// 1-based particle release group (one group per release package / particle group)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(pub u32);

/// 1-based particle index within its release group
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticleId(pub u32);

/// Canonical particle identity shared by both engines
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ParticleKey {
    pub group: GroupId,
    pub particle: ParticleId,
}

impl ParticleKey {
    pub const fn new(group: u32, particle: u32) -> Self {
        Self {
            group: GroupId(group),
            particle: ParticleId(particle),
        }
    }
}

impl Default for GroupId {
    fn default() -> Self {
        GroupId(1)
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ParticleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ParticleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(group {}, particle {})", self.group, self.particle)
    }
}
