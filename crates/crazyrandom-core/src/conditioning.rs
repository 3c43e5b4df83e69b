//! Seed conditioning and quick quality metrics.
//!
//! Seed bytes gathered by the [`SeedPool`](crate::pool::SeedPool) are
//! stretched here before they reach a generator. The quick metrics give a
//! cheap sanity check on any byte stream, generator output included.

use std::io::Write;

use flate2::Compression;
use flate2::write::ZlibEncoder;
use serde::Serialize;
use sha2::{Digest, Sha256};

/// Stretch or compress raw bytes to exactly `n_output` bytes.
///
/// Each 32-byte block is SHA-256(state || chunk || counter), where `state` is
/// the previous block and `chunk` walks `raw` 64 bytes at a time, wrapping.
pub fn sha256_stretch(raw: &[u8], n_output: usize) -> Vec<u8> {
    if raw.is_empty() {
        return vec![0u8; n_output];
    }
    let mut output = Vec::with_capacity(n_output + 32);
    let mut state = [0u8; 32];
    let mut offset = 0;
    let mut counter: u64 = 0;
    while output.len() < n_output {
        let end = (offset + 64).min(raw.len());
        let mut h = Sha256::new();
        h.update(state);
        h.update(&raw[offset..end]);
        h.update(counter.to_le_bytes());
        state = h.finalize().into();
        output.extend_from_slice(&state);
        offset += 64;
        counter += 1;
        if offset >= raw.len() {
            offset = 0;
        }
    }
    output.truncate(n_output);
    output
}

/// Shannon entropy in bits per byte (0.0 to 8.0).
pub fn quick_shannon(data: &[u8]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let mut counts = [0u64; 256];
    for &b in data {
        counts[b as usize] += 1;
    }
    let n = data.len() as f64;
    counts
        .iter()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let p = c as f64 / n;
            -p * p.log2()
        })
        .sum()
}

/// zlib-compressed size over input size. Random data sits at or just above 1.0.
pub fn compression_ratio(data: &[u8]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
    if encoder.write_all(data).is_err() {
        return 0.0;
    }
    let compressed = encoder.finish().unwrap_or_default();
    compressed.len() as f64 / data.len() as f64
}

/// Quick quality assessment: entropy, compressibility and byte coverage.
pub fn quick_quality(data: &[u8]) -> QualityReport {
    if data.len() < 16 {
        return QualityReport {
            samples: data.len(),
            unique_values: 0,
            shannon_entropy: 0.0,
            compression_ratio: 0.0,
            quality_score: 0.0,
            grade: 'F',
        };
    }

    let shannon = quick_shannon(data);
    let comp_ratio = compression_ratio(data);

    let mut seen = [false; 256];
    for &b in data {
        seen[b as usize] = true;
    }
    let unique = seen.iter().filter(|&&s| s).count();

    let score = (shannon / 8.0) * 60.0
        + comp_ratio.min(1.0) * 20.0
        + (unique as f64 / 256.0).min(1.0) * 20.0;
    let grade = match score {
        s if s >= 80.0 => 'A',
        s if s >= 60.0 => 'B',
        s if s >= 40.0 => 'C',
        s if s >= 20.0 => 'D',
        _ => 'F',
    };

    QualityReport {
        samples: data.len(),
        unique_values: unique,
        shannon_entropy: shannon,
        compression_ratio: comp_ratio,
        quality_score: score,
        grade,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct QualityReport {
    pub samples: usize,
    pub unique_values: usize,
    pub shannon_entropy: f64,
    pub compression_ratio: f64,
    pub quality_score: f64,
    pub grade: char,
}
