//! Operating-system CSPRNG via `getrandom`.

use crate::source::{EntropySource, SourceCategory, SourceInfo};

/// Reads the kernel CSPRNG. Works on every platform `getrandom` supports.
pub struct OsRandomSource;

static OS_RANDOM_INFO: SourceInfo = SourceInfo {
    name: "os_random",
    description: "Operating-system CSPRNG (getrandom)",
    category: SourceCategory::System,
    entropy_rate_estimate: 8.0,
};

impl EntropySource for OsRandomSource {
    fn info(&self) -> &SourceInfo {
        &OS_RANDOM_INFO
    }

    fn is_available(&self) -> bool {
        getrandom::fill(&mut [0u8; 1]).is_ok()
    }

    fn collect(&self, n_samples: usize) -> Vec<u8> {
        let mut buf = vec![0u8; n_samples];
        match getrandom::fill(&mut buf) {
            Ok(()) => buf,
            Err(_) => Vec::new(),
        }
    }
}
