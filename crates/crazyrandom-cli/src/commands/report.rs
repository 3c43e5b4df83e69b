use std::time::Instant;

use crazyrandom_core::{BitSource, Configuration, Error, Result};
use crazyrandom_tests::{TestResult, calculate_quality_score, grade_from_score, run_all_tests};

pub fn run(
    generators: &str,
    preset: Configuration,
    seed: Option<i64>,
    samples: usize,
    output_path: Option<&str>,
) -> Result<()> {
    let names = super::parse_generators(generators);
    if names.is_empty() {
        return Err(Error::InvalidArgument("no generators selected".to_string()));
    }

    println!(
        "Running test battery on {} generator(s), {samples} bytes each...\n",
        names.len()
    );

    let mut all_results = Vec::new();
    for name in names {
        print!("  Drawing from {name}...");
        let t0 = Instant::now();
        let mut source = super::make_generator(name, preset, seed)?;
        let data = source.next_bytes(samples);
        let results = run_all_tests(&data);
        let score = calculate_quality_score(&results);
        let passed = results.iter().filter(|r| r.passed).count();
        println!(
            " → {score:.0}/100 ({passed}/{} passed) [{:.1}s]",
            results.len(),
            t0.elapsed().as_secs_f64()
        );
        all_results.push((name.to_string(), results));
    }

    println!("\n{}", "=".repeat(60));
    println!("{:<12} {:>6} {:>6} {:>8}", "Generator", "Score", "Grade", "Pass");
    println!("{}", "-".repeat(60));
    for (name, results) in &all_results {
        let score = calculate_quality_score(results);
        let passed = results.iter().filter(|r| r.passed).count();
        println!(
            "  {:<10} {:>5.1} {:>6} {:>4}/{}",
            name,
            score,
            grade_from_score(score),
            passed,
            results.len()
        );
        for failed in results.iter().filter(|r| !r.passed) {
            println!("      ✗ {}: {}", failed.name, failed.details);
        }
    }

    if let Some(path) = output_path {
        let report = json_report(preset, seed, samples, &all_results);
        let text = serde_json::to_string_pretty(&report)
            .map_err(|e| Error::InvalidArgument(format!("cannot encode report: {e}")))?;
        std::fs::write(path, text)?;
        println!("\nReport saved to: {path}");
    }
    Ok(())
}

fn json_report(
    preset: Configuration,
    seed: Option<i64>,
    samples: usize,
    results: &[(String, Vec<TestResult>)],
) -> serde_json::Value {
    let generators: Vec<_> = results
        .iter()
        .map(|(name, tests)| {
            let score = calculate_quality_score(tests);
            serde_json::json!({
                "generator": name,
                "score": score,
                "grade": grade_from_score(score).to_string(),
                "tests": tests
                    .iter()
                    .map(|t| serde_json::json!({
                        "name": t.name,
                        "passed": t.passed,
                        "p_value": t.p_value,
                        "statistic": t.statistic,
                        "details": t.details,
                        "grade": t.grade.to_string(),
                    }))
                    .collect::<Vec<_>>(),
            })
        })
        .collect();

    serde_json::json!({
        "version": crazyrandom_core::VERSION,
        "preset": preset.to_string(),
        "seed": seed,
        "samples": samples,
        "generators": generators,
    })
}
