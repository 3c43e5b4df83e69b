//! Multi-source seed pool with health monitoring.
//!
//! 1. Register seed sources (auto-discovered or explicit)
//! 2. Collect raw bytes from every source in parallel
//! 3. Track per-source health; a failing source is skipped, not fatal
//! 4. Stretch the concatenated bytes to the requested length with SHA-256,
//!    unless every source failed

use std::io;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use log::{debug, warn};
use serde::Serialize;

use crate::conditioning::{quick_shannon, sha256_stretch};
use crate::error::{Error, Result};
use crate::source::{EntropySource, SourceState};

/// Raw bytes requested from each source per collection round.
const SAMPLES_PER_SOURCE: usize = 256;

/// Thread-safe pool of seed sources.
pub struct SeedPool {
    sources: Vec<Mutex<SourceState>>,
    total_output: Mutex<u64>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl SeedPool {
    /// Create an empty pool.
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
            total_output: Mutex::new(0),
        }
    }

    /// Create a pool with every source available on this machine.
    pub fn auto() -> Self {
        let mut pool = Self::new();
        for source in crate::sources::detect_available_sources() {
            pool.add_source(source);
        }
        pool
    }

    pub fn add_source(&mut self, source: Box<dyn EntropySource>) {
        self.sources.push(Mutex::new(SourceState::new(source)));
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// Collect `n_samples` from every source in parallel and concatenate the
    /// results in registration order.
    pub fn collect_all(&self, n_samples: usize) -> Vec<u8> {
        std::thread::scope(|s| {
            let handles: Vec<_> = self
                .sources
                .iter()
                .map(|state| s.spawn(move || Self::collect_one(state, n_samples)))
                .collect();
            handles
                .into_iter()
                .flat_map(|h| h.join().unwrap_or_default())
                .collect()
        })
    }

    fn collect_one(state: &Mutex<SourceState>, n_samples: usize) -> Vec<u8> {
        let mut ss = lock(state);
        let t0 = Instant::now();
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            ss.source.collect(n_samples)
        }));
        ss.last_collect_time = t0.elapsed();
        match outcome {
            Ok(data) if !data.is_empty() => {
                ss.total_bytes += data.len() as u64;
                ss.last_entropy = quick_shannon(&data);
                ss.healthy = ss.last_entropy > 1.0;
                data
            }
            _ => {
                warn!("seed source {} produced no data", ss.source.name());
                ss.failures += 1;
                ss.healthy = false;
                Vec::new()
            }
        }
    }

    /// Return exactly `n_bytes` of seed material.
    ///
    /// Collects one round from every source and stretches the result with
    /// chained SHA-256.
    ///
    /// # Errors
    /// [`Error::Io`] if no source produced data, or none of the data passed
    /// the health check.
    pub fn seed_bytes(&self, n_bytes: usize) -> Result<Vec<u8>> {
        let raw = self.collect_all(SAMPLES_PER_SOURCE);
        let healthy = self.sources.iter().filter(|&state| lock(state).healthy).count();
        if raw.is_empty() || healthy == 0 {
            warn!(
                "seed pool collected {} bytes, {healthy}/{} sources healthy",
                raw.len(),
                self.sources.len()
            );
            return Err(Error::Io(io::Error::other(format!(
                "no healthy seed source among {}",
                self.sources.len()
            ))));
        }
        debug!("seed pool stretching {} raw bytes to {n_bytes}", raw.len());
        *lock(&self.total_output) += n_bytes as u64;
        Ok(sha256_stretch(&raw, n_bytes))
    }

    /// Health report as structured data.
    pub fn health_report(&self) -> HealthReport {
        let sources: Vec<SourceHealth> = self
            .sources
            .iter()
            .map(|state| {
                let ss = lock(state);
                SourceHealth {
                    name: ss.source.name().to_string(),
                    healthy: ss.healthy,
                    bytes: ss.total_bytes,
                    entropy: ss.last_entropy,
                    time: ss.last_collect_time.as_secs_f64(),
                    failures: ss.failures,
                }
            })
            .collect();

        HealthReport {
            healthy: sources.iter().filter(|s| s.healthy).count(),
            total: sources.len(),
            raw_bytes: sources.iter().map(|s| s.bytes).sum(),
            output_bytes: *lock(&self.total_output),
            sources,
        }
    }
}

impl Default for SeedPool {
    fn default() -> Self {
        Self::new()
    }
}

/// Overall health report for the seed pool.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub healthy: usize,
    pub total: usize,
    /// Total raw bytes collected across all sources.
    pub raw_bytes: u64,
    /// Total stretched seed bytes handed out.
    pub output_bytes: u64,
    pub sources: Vec<SourceHealth>,
}

/// Health status of a single seed source.
#[derive(Debug, Clone, Serialize)]
pub struct SourceHealth {
    pub name: String,
    /// Whether the last collection exceeded 1.0 bits/byte of Shannon entropy.
    pub healthy: bool,
    pub bytes: u64,
    pub entropy: f64,
    /// Duration of the last collection in seconds.
    pub time: f64,
    pub failures: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{SourceCategory, SourceInfo};

    struct Silent;

    static SILENT_INFO: SourceInfo = SourceInfo {
        name: "silent",
        description: "never produces anything",
        category: SourceCategory::System,
        entropy_rate_estimate: 0.0,
    };

    impl EntropySource for Silent {
        fn info(&self) -> &SourceInfo {
            &SILENT_INFO
        }

        fn is_available(&self) -> bool {
            true
        }

        fn collect(&self, _n_samples: usize) -> Vec<u8> {
            Vec::new()
        }
    }

    /// Same byte every time: plenty of data, no entropy.
    struct Stuck;

    static STUCK_INFO: SourceInfo = SourceInfo {
        name: "stuck",
        description: "0x55 forever",
        category: SourceCategory::System,
        entropy_rate_estimate: 0.0,
    };

    impl EntropySource for Stuck {
        fn info(&self) -> &SourceInfo {
            &STUCK_INFO
        }

        fn is_available(&self) -> bool {
            true
        }

        fn collect(&self, n_samples: usize) -> Vec<u8> {
            vec![0x55; n_samples]
        }
    }

    struct Counting;

    static COUNTING_INFO: SourceInfo = SourceInfo {
        name: "counting",
        description: "0, 1, 2, ...",
        category: SourceCategory::System,
        entropy_rate_estimate: 8.0,
    };

    impl EntropySource for Counting {
        fn info(&self) -> &SourceInfo {
            &COUNTING_INFO
        }

        fn is_available(&self) -> bool {
            true
        }

        fn collect(&self, n_samples: usize) -> Vec<u8> {
            (0..n_samples).map(|i| i as u8).collect()
        }
    }

    #[test]
    fn empty_pool_is_an_error() {
        let pool = SeedPool::new();
        assert!(matches!(pool.seed_bytes(16), Err(Error::Io(_))));
        assert_eq!(pool.health_report().total, 0);
        assert_eq!(pool.health_report().output_bytes, 0);
    }

    #[test]
    fn pool_of_failing_sources_is_an_error() {
        let mut pool = SeedPool::new();
        pool.add_source(Box::new(Silent));
        pool.add_source(Box::new(Silent));
        assert!(matches!(pool.seed_bytes(4096), Err(Error::Io(_))));
        let report = pool.health_report();
        assert_eq!(report.healthy, 0);
        assert!(report.sources.iter().all(|s| s.failures == 1));
    }

    #[test]
    fn pool_of_stuck_sources_is_an_error() {
        let mut pool = SeedPool::new();
        pool.add_source(Box::new(Stuck));
        assert!(pool.seed_bytes(64).is_err());
        assert_eq!(pool.health_report().raw_bytes, SAMPLES_PER_SOURCE as u64);
    }

    #[test]
    fn failing_source_is_marked_unhealthy() {
        let mut pool = SeedPool::new();
        pool.add_source(Box::new(Silent));
        pool.add_source(Box::new(Counting));
        let seed = pool.seed_bytes(64).unwrap();
        assert_eq!(seed.len(), 64);

        let report = pool.health_report();
        assert_eq!(report.total, 2);
        assert_eq!(report.healthy, 1);
        assert_eq!(report.sources[0].failures, 1);
        assert_eq!(report.raw_bytes, SAMPLES_PER_SOURCE as u64);
        assert_eq!(report.output_bytes, 64);
    }

    #[test]
    fn deterministic_sources_give_deterministic_seed() {
        let mut a = SeedPool::new();
        a.add_source(Box::new(Counting));
        let mut b = SeedPool::new();
        b.add_source(Box::new(Counting));
        assert_eq!(a.seed_bytes(100).unwrap(), b.seed_bytes(100).unwrap());
    }

    #[test]
    fn auto_pool_has_sources() {
        let pool = SeedPool::auto();
        assert!(pool.source_count() >= 1);
        let seed = pool.seed_bytes(128).unwrap();
        assert!(seed.iter().any(|&b| b != 0));
    }
}
