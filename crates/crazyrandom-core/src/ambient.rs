//! Ambient entropy providers.
//!
//! The adaptive automaton re-seeds its mixing tiers from the clock and from
//! object identity. Those reads go through [`AmbientEntropy`] so tests can
//! substitute [`FixedAmbient`] and get a fully reproducible stream.

use std::sync::OnceLock;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// Source of the non-deterministic values mixed into generator state.
pub trait AmbientEntropy {
    /// High-resolution timestamp in nanoseconds.
    fn nanos(&self) -> i64;

    /// Wall-clock time in milliseconds.
    fn millis(&self) -> i64;

    /// Identity value for an object, given its address.
    fn identity(&self, address: usize) -> i64;
}

/// Reads the real clocks and derives identity from addresses.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemAmbient;

impl AmbientEntropy for SystemAmbient {
    fn nanos(&self) -> i64 {
        static EPOCH: OnceLock<Instant> = OnceLock::new();
        let epoch = EPOCH.get_or_init(Instant::now);
        let wall = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos() as i64;
        wall.wrapping_add(epoch.elapsed().as_nanos() as i64)
    }

    fn millis(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as i64
    }

    fn identity(&self, address: usize) -> i64 {
        // Fibonacci hashing spreads nearby allocations across all 64 bits.
        (address as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15) as i64
    }
}

/// Returns the same values on every call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedAmbient {
    pub nanos: i64,
    pub millis: i64,
    pub identity: i64,
}

impl FixedAmbient {
    pub const fn new(nanos: i64, millis: i64, identity: i64) -> Self {
        Self {
            nanos,
            millis,
            identity,
        }
    }
}

impl Default for FixedAmbient {
    fn default() -> Self {
        Self::new(0x1234_5678_9ABC, 1_530_000_000_000, 0x5EED)
    }
}

impl AmbientEntropy for FixedAmbient {
    fn nanos(&self) -> i64 {
        self.nanos
    }

    fn millis(&self) -> i64 {
        self.millis
    }

    fn identity(&self, _address: usize) -> i64 {
        self.identity
    }
}
