use std::time::Instant;

use crazyrandom_core::{BitSource, Configuration, Result};

pub fn run(n_bytes: usize, preset: Configuration) -> Result<()> {
    println!("Benchmarking {} generators, {n_bytes} bytes each (preset {preset})...\n", super::GENERATORS.len());

    let mut results = Vec::new();
    for name in super::GENERATORS {
        let t_build = Instant::now();
        let mut source = super::make_generator(name, preset, Some(0x5EED))?;
        let build = t_build.elapsed().as_secs_f64();

        let t0 = Instant::now();
        let data = source.next_bytes(n_bytes);
        let elapsed = t0.elapsed().as_secs_f64().max(1e-9);
        let bits_per_sec = (data.len() * 8) as f64 / elapsed;
        let quality = crazyrandom_core::quick_quality(&data);

        println!(
            "  {} {:<10} {:>12.0} bit/s  H={:.3}  setup {:.3}s",
            quality.grade, name, bits_per_sec, quality.shannon_entropy, build
        );
        results.push((name, bits_per_sec, quality));
    }

    results.sort_by(|a, b| b.1.total_cmp(&a.1));

    println!("\n{}", "=".repeat(56));
    println!("{:<12} {:>14} {:>8} {:>8}", "Generator", "bit/s", "Shannon", "Grade");
    println!("{}", "-".repeat(56));
    for (name, rate, quality) in &results {
        println!(
            "{:<12} {:>14.0} {:>8.3} {:>8}",
            name, rate, quality.shannon_entropy, quality.grade
        );
    }
    Ok(())
}
