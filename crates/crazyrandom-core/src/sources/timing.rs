//! Timing-based seed sources: clock jitter and sleep jitter.
//!
//! **Raw output characteristics:** LSBs of timing deltas. Low entropy per
//! byte; the pool hashes everything before use.

use std::thread;
use std::time::{Duration, SystemTime};

use crate::source::{EntropySource, SourceCategory, SourceInfo};

use super::helpers::{extract_lsbs, monotonic_nanos};

// ---------------------------------------------------------------------------
// ClockJitterSource
// ---------------------------------------------------------------------------

/// Times a small variable workload against the monotonic clock and XORs in
/// the wall clock. One output byte takes eight deltas.
pub struct ClockJitterSource;

static CLOCK_JITTER_INFO: SourceInfo = SourceInfo {
    name: "clock_jitter",
    description: "LSBs of monotonic timer deltas around a variable workload",
    category: SourceCategory::Timing,
    entropy_rate_estimate: 0.5,
};

impl EntropySource for ClockJitterSource {
    fn info(&self) -> &SourceInfo {
        &CLOCK_JITTER_INFO
    }

    fn is_available(&self) -> bool {
        true
    }

    fn collect(&self, n_samples: usize) -> Vec<u8> {
        let mut deltas = Vec::with_capacity(n_samples * 8);
        for i in 0..n_samples * 8 {
            let t0 = monotonic_nanos();

            let mut sink = t0;
            for _ in 0..(i % 7) + 1 {
                sink = sink.wrapping_mul(6364136223846793005).wrapping_add(1);
            }
            std::hint::black_box(sink);

            let wall = SystemTime::now()
                .duration_since(SystemTime::UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos() as u64;
            let t1 = monotonic_nanos();
            deltas.push(t1.wrapping_sub(t0) ^ wall);
        }
        extract_lsbs(&deltas)
    }
}

// ---------------------------------------------------------------------------
// SleepJitterSource
// ---------------------------------------------------------------------------

/// Requests zero-duration sleeps and keeps the low byte of the actual
/// elapsed time, which reflects scheduler decisions.
pub struct SleepJitterSource;

static SLEEP_JITTER_INFO: SourceInfo = SourceInfo {
    name: "sleep_jitter",
    description: "Elapsed time of zero-duration sleeps",
    category: SourceCategory::Timing,
    entropy_rate_estimate: 1.0,
};

impl EntropySource for SleepJitterSource {
    fn info(&self) -> &SourceInfo {
        &SLEEP_JITTER_INFO
    }

    fn is_available(&self) -> bool {
        true
    }

    fn collect(&self, n_samples: usize) -> Vec<u8> {
        (0..n_samples)
            .map(|_| {
                let t0 = monotonic_nanos();
                thread::sleep(Duration::ZERO);
                monotonic_nanos().wrapping_sub(t0) as u8
            })
            .collect()
    }
}
