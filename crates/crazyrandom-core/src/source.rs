//! Seed-entropy source trait and runtime state.
//!
//! Seed sources feed the [`SeedPool`](crate::pool::SeedPool), which in turn
//! seeds the adaptive automaton. Each source declares metadata through
//! [`SourceInfo`] and hands out raw, unconditioned bytes.

use std::time::Duration;

/// Category of seed source based on its mechanism.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceCategory {
    /// Operating-system CSPRNG.
    System,
    /// Timer and scheduling jitter.
    Timing,
}

impl std::fmt::Display for SourceCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::System => write!(f, "system"),
            Self::Timing => write!(f, "timing"),
        }
    }
}

/// Metadata about a seed source.
#[derive(Debug, Clone)]
pub struct SourceInfo {
    /// Unique identifier (e.g. `"clock_jitter"`).
    pub name: &'static str,
    /// One-line human-readable description.
    pub description: &'static str,
    pub category: SourceCategory,
    /// Estimated entropy rate in bits per output byte.
    pub entropy_rate_estimate: f64,
}

/// Trait that every seed source must implement.
pub trait EntropySource: Send + Sync {
    fn info(&self) -> &SourceInfo;

    /// Check if this source can operate on the current machine.
    fn is_available(&self) -> bool;

    /// Collect up to `n_samples` raw bytes. An empty result counts as a failure.
    fn collect(&self, n_samples: usize) -> Vec<u8>;

    fn name(&self) -> &'static str {
        self.info().name
    }
}

/// Runtime state for a registered source in the pool.
pub struct SourceState {
    pub source: Box<dyn EntropySource>,
    pub total_bytes: u64,
    pub failures: u64,
    pub last_entropy: f64,
    pub last_collect_time: Duration,
    pub healthy: bool,
}

impl SourceState {
    pub fn new(source: Box<dyn EntropySource>) -> Self {
        Self {
            source,
            total_bytes: 0,
            failures: 0,
            last_entropy: 0.0,
            last_collect_time: Duration::ZERO,
            healthy: true,
        }
    }
}
