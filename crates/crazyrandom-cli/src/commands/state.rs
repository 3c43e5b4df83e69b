use crazyrandom_core::{AdaptiveAutomaton, BitSource, Result, SeedPool, SystemAmbient};

pub fn create(path: &str, weak: bool) -> Result<()> {
    let automaton = if weak {
        AdaptiveAutomaton::weak(SystemAmbient)
    } else {
        let pool = SeedPool::auto();
        let seeded = AdaptiveAutomaton::from_pool(&pool, SystemAmbient);
        let health = pool.health_report();
        println!("Seed pool: {}/{} sources healthy", health.healthy, health.total);
        for src in health.sources.iter().filter(|s| !s.healthy) {
            println!("  ✗ {} ({} failures)", src.name, src.failures);
        }
        seeded?
    };
    automaton.save_to_file(path)?;
    println!("Wrote {}-bit state to {path}", automaton.state().len());
    Ok(())
}

pub fn show(path: &str, sample: usize) -> Result<()> {
    let mut automaton = AdaptiveAutomaton::from_file(path, SystemAmbient)?;
    let ones = automaton.state().iter().filter(|&&b| b).count();
    let total = automaton.state().len();
    println!("State file: {path}");
    println!("  Bits:        {total}");
    println!("  Ones:        {ones} ({:.2}%)", 100.0 * ones as f64 / total as f64);
    println!("  Start index: {}", automaton.index());

    if sample > 0 {
        let data = automaton.next_bytes(sample);
        let q = crazyrandom_core::quick_quality(&data);
        println!(
            "  Sample:      {} bytes, H={:.3}, compression={:.3}, unique={}, grade {}",
            q.samples, q.shannon_entropy, q.compression_ratio, q.unique_values, q.grade
        );
    }
    Ok(())
}
