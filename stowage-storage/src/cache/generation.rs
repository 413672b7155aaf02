//! Per-key generation counter for stale-response detection.
//!
//! A load captures the generation of its key when it starts. Invalidating the
//! key bumps the generation, so a load that settles afterwards can tell its
//! result belongs to an older epoch and must be dropped.

use std::fmt;

/// Monotonically increasing epoch of a cache key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Generation(u64);

impl Generation {
    /// Generation of a key that was never invalidated.
    pub const ZERO: Generation = Generation(0);

    /// The generation after one more invalidation.
    pub fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
