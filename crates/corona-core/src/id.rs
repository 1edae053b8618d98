//! Strongly-typed identifiers.

use std::fmt;

/// Identifies a macro-particle within a species.
///
/// Ids are assigned sequentially at injection. A particle that has been
/// removed by a boundary or by redistribution carries [`ParticleId::INVALID`]
/// until the next compaction pass drops it from its tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParticleId(pub i64);

impl ParticleId {
    /// Sentinel marking a lost particle.
    pub const INVALID: Self = Self(-1);

    /// Returns `true` unless this is the lost-particle sentinel.
    pub fn is_valid(self) -> bool {
        self.0 >= 0
    }
}

impl fmt::Display for ParticleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for ParticleId {
    fn from(v: i64) -> Self {
        Self(v)
    }
}

/// Monotonically increasing step counter for one mesh level.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StepId(pub u64);

impl StepId {
    /// The step that follows this one.
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for StepId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_sentinel_is_not_valid() {
        assert!(!ParticleId::INVALID.is_valid());
        assert!(ParticleId(0).is_valid());
        assert!(ParticleId(42).is_valid());
    }

    #[test]
    fn step_id_next_increments() {
        assert_eq!(StepId(3).next(), StepId(4));
        assert_eq!(StepId::default(), StepId(0));
    }
}
