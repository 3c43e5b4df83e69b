//! Low-level primitives shared by the timing sources.

use std::sync::OnceLock;
use std::time::Instant;

/// Nanoseconds since a process-local epoch.
pub fn monotonic_nanos() -> u64 {
    static EPOCH: OnceLock<Instant> = OnceLock::new();
    let epoch = EPOCH.get_or_init(Instant::now);
    epoch.elapsed().as_nanos() as u64
}

/// Extract the least-significant bit of each delta and pack into bytes.
///
/// For every 8 input values, one output byte is produced (MSB-first packing).
/// A trailing partial byte is dropped.
pub fn extract_lsbs(deltas: &[u64]) -> Vec<u8> {
    deltas
        .chunks_exact(8)
        .map(|chunk| {
            chunk
                .iter()
                .fold(0u8, |acc, &d| (acc << 1) | (d & 1) as u8)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lsbs_pack_msb_first() {
        let deltas = [1, 0, 0, 0, 0, 0, 0, 3, 5];
        assert_eq!(extract_lsbs(&deltas), vec![0b1000_0001]);
    }

    #[test]
    fn monotonic_never_goes_back() {
        let a = monotonic_nanos();
        let b = monotonic_nanos();
        assert!(b >= a);
    }
}
