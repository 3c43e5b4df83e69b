//! Statistical checks for generator output, modelled on NIST SP 800-22.
//!
//! Every check reads its input as a bit stream, most significant bit of each
//! byte first, and reports a [`TestResult`]. Checks with a p-value pass at
//! the 1% significance level; grades run from A down to F.

use std::io::Write;

use flate2::Compression;
use flate2::write::ZlibEncoder;
use rustfft::{FftPlanner, num_complex::Complex};
use statrs::distribution::{ChiSquared, ContinuousCDF, Normal};
use statrs::function::erf::erfc;

/// Significance level used by every p-value check.
const ALPHA: f64 = 0.01;

/// Lowest p-value that still earns each grade.
const P_GRADES: [(f64, char); 4] = [(0.1, 'A'), (0.01, 'B'), (0.001, 'C'), (0.0001, 'D')];

/// Lowest overall score that still earns each grade.
const SCORE_GRADES: [(f64, char); 4] = [(80.0, 'A'), (60.0, 'B'), (40.0, 'C'), (20.0, 'D')];

/// Outcome of one check.
#[derive(Debug, Clone)]
pub struct TestResult {
    pub name: String,
    pub passed: bool,
    pub p_value: Option<f64>,
    pub statistic: f64,
    pub details: String,
    pub grade: char,
}

impl TestResult {
    /// Grade a p-value: A from 0.1, B from 0.01, C from 0.001, D from
    /// 0.0001, F below that or when there is no p-value.
    pub fn grade_from_p(p: Option<f64>) -> char {
        let Some(p) = p else { return 'F' };
        P_GRADES
            .iter()
            .find(|&&(floor, _)| p >= floor)
            .map_or('F', |&(_, grade)| grade)
    }

    /// True when a p-value exists and reaches `threshold`.
    pub fn pass_from_p(p: Option<f64>, threshold: f64) -> bool {
        p.is_some_and(|p| p >= threshold)
    }

    fn from_p(name: &str, p: f64, statistic: f64, details: String) -> Self {
        Self {
            name: name.to_string(),
            passed: Self::pass_from_p(Some(p), ALPHA),
            p_value: Some(p),
            statistic,
            details,
            grade: Self::grade_from_p(Some(p)),
        }
    }

    fn failed(name: &str, details: String) -> Self {
        Self {
            name: name.to_string(),
            passed: false,
            p_value: None,
            statistic: 0.0,
            details,
            grade: 'F',
        }
    }
}

fn to_bits(data: &[u8]) -> Vec<u8> {
    data.iter()
        .flat_map(|&byte| (0..8).rev().map(move |shift| (byte >> shift) & 1))
        .collect()
}

fn count_ones(bits: &[u8]) -> usize {
    bits.iter().filter(|&&b| b == 1).count()
}

fn insufficient(name: &str, needed: usize, got: usize) -> TestResult {
    TestResult::failed(name, format!("Insufficient data: need {needed}, got {got}"))
}

/// Upper-tail probability of a chi-squared statistic; 0.0 for a bad `df`.
fn chi2_sf(df: f64, statistic: f64) -> f64 {
    ChiSquared::new(df).map_or(0.0, |dist| dist.sf(statistic))
}

/// Pearson statistic of observed counts against expected counts.
fn pearson<I>(cells: I) -> f64
where
    I: IntoIterator<Item = (f64, f64)>,
{
    cells
        .into_iter()
        .map(|(observed, expected)| (observed - expected).powi(2) / expected)
        .sum()
}

// Balance

/// Excess of ones over zeros across the whole stream, normalised by `sqrt(n)`.
pub fn monobit_frequency(data: &[u8]) -> TestResult {
    let name = "Monobit Frequency";
    let bits = to_bits(data);
    let n = bits.len();
    if n < 100 {
        return insufficient(name, 100, n);
    }
    let s = 2 * count_ones(&bits) as i64 - n as i64;
    let s_obs = s.unsigned_abs() as f64 / (n as f64).sqrt();
    let p = erfc(s_obs / std::f64::consts::SQRT_2);
    TestResult::from_p(name, p, s_obs, format!("S={s}, n={n}"))
}

/// Share of ones inside each 128-bit block, summed as a chi-squared statistic.
pub fn block_frequency(data: &[u8]) -> TestResult {
    let name = "Block Frequency";
    let block_size: usize = 128;
    let bits = to_bits(data);
    let n = bits.len();
    let num_blocks = n / block_size;
    if num_blocks < 10 {
        return insufficient(name, block_size * 10, n);
    }
    let spread: f64 = bits
        .chunks_exact(block_size)
        .map(|block| (count_ones(block) as f64 / block_size as f64 - 0.5).powi(2))
        .sum();
    let chi2 = 4.0 * block_size as f64 * spread;
    let p = chi2_sf(num_blocks as f64, chi2);
    TestResult::from_p(name, p, chi2, format!("blocks={num_blocks}, M={block_size}"))
}

/// How evenly the 256 byte values occur.
pub fn byte_frequency(data: &[u8]) -> TestResult {
    let name = "Byte Frequency";
    let n = data.len();
    if n < 2560 {
        return insufficient(name, 2560, n);
    }
    let mut hist = [0u64; 256];
    data.iter().for_each(|&b| hist[usize::from(b)] += 1);
    let expected = n as f64 / 256.0;
    let chi2 = pearson(hist.iter().map(|&c| (c as f64, expected)));
    let p = chi2_sf(255.0, chi2);
    TestResult::from_p(name, p, chi2, format!("n={n}, expected_per_bin={expected:.1}"))
}

/// Ones counted separately at each of the eight bit positions of a byte.
///
/// Catches a stuck or biased sign bit that the monobit count averages away.
pub fn bit_position_balance(data: &[u8]) -> TestResult {
    let name = "Bit Position Balance";
    let n = data.len();
    if n < 100 {
        return insufficient(name, 100, n);
    }
    let mut ones = [0u64; 8];
    for &byte in data {
        for (pos, count) in ones.iter_mut().enumerate() {
            *count += u64::from((byte >> (7 - pos)) & 1);
        }
    }
    let half = n as f64 / 2.0;
    // Ones and zeros deviate equally, so each position contributes twice.
    let chi2 = 2.0 * pearson(ones.iter().map(|&c| (c as f64, half)));
    let p = chi2_sf(8.0, chi2);
    let worst = ones
        .iter()
        .map(|&c| (c as f64 / n as f64 - 0.5).abs())
        .fold(0.0, f64::max);
    TestResult::from_p(name, p, chi2, format!("max_deviation={worst:.4}, n={n}"))
}

// Runs

/// Count of maximal same-bit runs against its expectation.
///
/// Streams whose ones proportion is already far from one half fail up front.
pub fn runs_test(data: &[u8]) -> TestResult {
    let name = "Runs Test";
    let bits = to_bits(data);
    let n = bits.len();
    if n < 100 {
        return insufficient(name, 100, n);
    }
    let nf = n as f64;
    let prop = count_ones(&bits) as f64 / nf;
    if (prop - 0.5).abs() >= 2.0 / nf.sqrt() {
        return TestResult {
            p_value: Some(0.0),
            ..TestResult::failed(name, format!("Pre-test failed: proportion={prop:.4}"))
        };
    }
    let runs = 1 + bits.windows(2).filter(|pair| pair[0] != pair[1]).count();
    let balance = prop * (1.0 - prop);
    let expected = 2.0 * nf * balance + 1.0;
    let z = (runs as f64 - expected).abs() / (2.0 * (2.0 * nf).sqrt() * balance);
    let p = erfc(z / std::f64::consts::SQRT_2);
    TestResult::from_p(name, p, z, format!("runs={runs}, expected={expected:.0}"))
}

/// Longest stretch of ones in each byte, binned as 1 or less, 2, 3, 4 or more.
pub fn longest_run_of_ones(data: &[u8]) -> TestResult {
    // Bin probabilities for 8-bit blocks.
    const BIN_PROBS: [f64; 4] = [0.2148, 0.3672, 0.2305, 0.1875];

    let name = "Longest Run of Ones";
    let bits = to_bits(data);
    let n = bits.len();
    if n < 128 {
        return insufficient(name, 128, n);
    }
    let block_size = 8;
    let num_blocks = n / block_size;

    let mut bins = [0u64; 4];
    for block in bits.chunks_exact(block_size) {
        let (longest, _) = block.iter().fold((0u32, 0u32), |(longest, run), &bit| {
            let run = if bit == 1 { run + 1 } else { 0 };
            (longest.max(run), run)
        });
        bins[(longest.clamp(1, 4) - 1) as usize] += 1;
    }

    let chi2 = pearson(
        bins.iter()
            .zip(BIN_PROBS)
            .map(|(&observed, prob)| (observed as f64, prob * num_blocks as f64)),
    );
    let p = chi2_sf(3.0, chi2);
    TestResult::from_p(name, p, chi2, format!("blocks={num_blocks}, M={block_size}"))
}

// Patterns

/// Psi-squared of all `m`-bit windows, wrapping around the end of `bits`.
fn psi_sq(bits: &[u8], m: usize) -> f64 {
    if m == 0 {
        return 0.0;
    }
    let n = bits.len();
    let mut counts = vec![0u64; 1 << m];
    for start in 0..n {
        let pattern = (0..m).fold(0usize, |acc, j| (acc << 1) | usize::from(bits[(start + j) % n]));
        counts[pattern] += 1;
    }
    let sum_sq: f64 = counts.iter().map(|&c| (c as f64).powi(2)).sum();
    sum_sq * counts.len() as f64 / n as f64 - n as f64
}

/// First difference of psi-squared for 4-bit windows over at most 20 000 bits.
pub fn serial_test(data: &[u8]) -> TestResult {
    let name = "Serial Test";
    let m = 4usize;
    let needed = (1 << m) + 10;
    let mut bits = to_bits(data);
    bits.truncate(20_000);
    let n = bits.len();
    if n < needed {
        return insufficient(name, needed, n);
    }
    let delta = psi_sq(&bits, m) - psi_sq(&bits, m - 1);
    let p = chi2_sf((1u64 << (m - 1)) as f64, delta);
    TestResult::from_p(name, p, delta, format!("m={m}, n_bits={n}"))
}

/// Share of Fourier peaks under the 95% bound, which periodic streams miss.
pub fn dft_spectral(data: &[u8]) -> TestResult {
    let name = "DFT Spectral";
    let bits = to_bits(data);
    let n = bits.len();
    if n < 64 {
        return insufficient(name, 64, n);
    }

    let mut signal: Vec<Complex<f64>> = bits
        .iter()
        .map(|&b| Complex::new(if b == 1 { 1.0 } else { -1.0 }, 0.0))
        .collect();
    FftPlanner::new().plan_fft_forward(n).process(&mut signal);

    let half = n / 2;
    // sqrt(ln(1 / 0.05) * n)
    let bound = (2.995732274 * n as f64).sqrt();
    let below = signal[..half].iter().filter(|c| c.norm() < bound).count() as f64;
    let d = (below - 0.95 * half as f64) / (n as f64 * 0.95 * 0.05 / 4.0).sqrt();
    let p = erfc(d.abs() / std::f64::consts::SQRT_2);
    TestResult::from_p(name, p, d, format!("peaks_below_threshold={}/{half}", below as u64))
}

// Structure

fn zlib(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(data)?;
    encoder.finish()
}

/// Compressed size over input size at zlib's best level.
///
/// Has no p-value; passes above 0.85, since random input hardly shrinks.
pub fn compression_ratio(data: &[u8]) -> TestResult {
    let name = "Compression Ratio";
    let n = data.len();
    if n < 32 {
        return insufficient(name, 32, n);
    }
    let compressed = match zlib(data) {
        Ok(c) => c.len(),
        Err(e) => return TestResult::failed(name, format!("compression failed: {e}")),
    };
    let ratio = compressed as f64 / n as f64;
    let grade = match ratio {
        r if r > 0.95 => 'A',
        r if r > 0.85 => 'B',
        r if r > 0.7 => 'C',
        r if r > 0.5 => 'D',
        _ => 'F',
    };
    TestResult {
        name: name.to_string(),
        passed: ratio > 0.85,
        p_value: None,
        statistic: ratio,
        details: format!("{compressed}/{n} = {ratio:.4}"),
        grade,
    }
}

/// Largest distance from zero reached by the forward ±1 walk.
pub fn cusum_test(data: &[u8]) -> TestResult {
    let name = "Cumulative Sums";
    let bits = to_bits(data);
    let n = bits.len();
    if n < 100 {
        return insufficient(name, 100, n);
    }

    let (_, z) = bits.iter().fold((0i64, 0u64), |(walk, peak), &bit| {
        let walk = walk + if bit == 1 { 1 } else { -1 };
        (walk, peak.max(walk.unsigned_abs()))
    });
    if z == 0 {
        return TestResult::from_p(name, 1.0, 0.0, format!("max|S|=0, n={n}"));
    }

    let nf = n as f64;
    let zf = z as f64;
    let norm = Normal::standard();
    let phi = |k: i64, offset: f64| norm.cdf((4.0 * k as f64 + offset) * zf / nf.sqrt());
    let k_max = ((nf / zf - 1.0) / 4.0).floor() as i64;

    let first: f64 = (((-nf / zf + 1.0) / 4.0).floor() as i64..=k_max)
        .map(|k| phi(k, 1.0) - phi(k, -1.0))
        .sum();
    let second: f64 = (((-nf / zf - 3.0) / 4.0).floor() as i64..=k_max)
        .map(|k| phi(k, 3.0) - phi(k, 1.0))
        .sum();
    let p = (1.0 - first + second).clamp(0.0, 1.0);
    TestResult::from_p(name, p, zf, format!("max|S|={z}, n={n}"))
}

// Battery

/// Every check, in report order. A check that panics is recorded as a failure.
pub fn run_all_tests(data: &[u8]) -> Vec<TestResult> {
    let checks: [fn(&[u8]) -> TestResult; 10] = [
        monobit_frequency,
        block_frequency,
        byte_frequency,
        bit_position_balance,
        runs_test,
        longest_run_of_ones,
        serial_test,
        dft_spectral,
        compression_ratio,
        cusum_test,
    ];

    checks
        .iter()
        .map(|check| {
            std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| check(data)))
                .unwrap_or_else(|_| TestResult::failed("Unknown", "Test panicked".to_string()))
        })
        .collect()
}

fn grade_points(grade: char) -> f64 {
    match grade {
        'A' => 100.0,
        'B' => 75.0,
        'C' => 50.0,
        'D' => 25.0,
        _ => 0.0,
    }
}

/// Mean of per-check points (A 100, B 75, C 50, D 25, F 0); 0 for no results.
pub fn calculate_quality_score(results: &[TestResult]) -> f64 {
    if results.is_empty() {
        return 0.0;
    }
    results.iter().map(|r| grade_points(r.grade)).sum::<f64>() / results.len() as f64
}

/// Letter grade for an overall quality score.
pub fn grade_from_score(score: f64) -> char {
    SCORE_GRADES
        .iter()
        .find(|&&(floor, _)| score >= floor)
        .map_or('F', |&(_, grade)| grade)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 64-bit LCG bytes; good enough to clear most checks.
    fn lcg_bytes(n: usize) -> Vec<u8> {
        let mut state: u64 = 0xDEAD_BEEF_CAFE_BABE;
        (0..n)
            .map(|_| {
                state = state
                    .wrapping_mul(6364136223846793005)
                    .wrapping_add(1442695040888963407);
                (state >> 33) as u8
            })
            .collect()
    }

    fn graded(grade: char) -> TestResult {
        TestResult {
            grade,
            passed: grade == 'A',
            ..TestResult::failed(&grade.to_string(), String::new())
        }
    }

    #[test]
    fn bits_unpack_high_bit_first() {
        assert_eq!(to_bits(&[0b1011_0001]), vec![1, 0, 1, 1, 0, 0, 0, 1]);
    }

    #[test]
    fn p_value_grades_follow_floors() {
        let cases = [(0.5, 'A'), (0.1, 'A'), (0.05, 'B'), (0.005, 'C'), (0.0005, 'D'), (1e-8, 'F')];
        for (p, grade) in cases {
            assert_eq!(TestResult::grade_from_p(Some(p)), grade, "p = {p}");
        }
        assert_eq!(TestResult::grade_from_p(None), 'F');
    }

    #[test]
    fn missing_p_value_never_passes() {
        assert!(TestResult::pass_from_p(Some(0.05), 0.01));
        assert!(!TestResult::pass_from_p(Some(0.005), 0.01));
        assert!(!TestResult::pass_from_p(None, 0.01));
    }

    #[test]
    fn short_input_is_reported() {
        let result = monobit_frequency(&[0u8; 5]);
        assert!(!result.passed);
        assert!(result.details.contains("Insufficient"));
    }

    #[test]
    fn all_zero_stream_fails_most_checks() {
        let results = run_all_tests(&vec![0u8; 4000]);
        let passed = results.iter().filter(|r| r.passed).count();
        assert!(passed < results.len() / 2);
    }

    #[test]
    fn lcg_stream_passes_most_checks() {
        let results = run_all_tests(&lcg_bytes(10_000));
        let passed = results.iter().filter(|r| r.passed).count();
        assert!(passed > results.len() / 2, "only {passed}/{} passed", results.len());
    }

    #[test]
    fn stuck_sign_bit_fails_position_balance() {
        let data: Vec<u8> = lcg_bytes(10_000).into_iter().map(|b| b | 0x80).collect();
        assert!(!bit_position_balance(&data).passed);
    }

    #[test]
    fn runs_pretest_rejects_lopsided_stream() {
        let result = runs_test(&[0xFF; 100]);
        assert!(!result.passed);
        assert_eq!(result.p_value, Some(0.0));
    }

    #[test]
    fn quality_score_averages_grade_points() {
        let score = calculate_quality_score(&[graded('A'), graded('F')]);
        assert!((score - 50.0).abs() < 0.01);
        assert_eq!(grade_from_score(score), 'C');
        assert_eq!(grade_from_score(80.0), 'A');
        assert_eq!(grade_from_score(19.9), 'F');
    }

    #[test]
    fn no_results_score_zero() {
        assert_eq!(calculate_quality_score(&[]), 0.0);
    }

    #[test]
    fn battery_runs_ten_checks() {
        assert_eq!(run_all_tests(&lcg_bytes(10_000)).len(), 10);
    }

    #[test]
    fn alternating_bits_barely_walk() {
        assert_eq!(cusum_test(&[0b0101_0101; 200]).statistic, 1.0);
    }

    #[test]
    fn lcg_bytes_hardly_compress() {
        let result = compression_ratio(&lcg_bytes(10_000));
        assert!(result.statistic > 0.9, "ratio {}", result.statistic);
    }
}
