pub mod bench;
pub mod report;
pub mod state;
pub mod stream;

use crazyrandom_core::{
    AdaptiveAutomaton, AmbientEntropy, BitSource, Configuration, DynSource, Ensemble, ForeignSource,
    MatrixEngine, Result, RollingAutomaton, SystemAmbient,
};

/// Generator names accepted on the command line.
pub const GENERATORS: [&str; 5] = ["rolling", "adaptive", "ensemble", "matrix", "os"];

/// Matrix side used by the CLI.
const MATRIX_SIDE: usize = 8;

/// Members in the CLI ensemble.
const ENSEMBLE_MEMBERS: usize = 8;

/// Build a boxed generator by name.
///
/// `seed` fixes the pseudo generators; without it they are seeded from the
/// clock. The adaptive generator always draws from the seed pool.
pub fn make_generator(name: &str, preset: Configuration, seed: Option<i64>) -> Result<DynSource> {
    let clock = SystemAmbient;
    let seed = seed.unwrap_or_else(|| clock.nanos());
    let generator: DynSource = match name {
        "rolling" => Box::new(RollingAutomaton::from_seed(seed, preset)),
        "adaptive" => Box::new(AdaptiveAutomaton::strong(clock)?),
        "ensemble" => {
            let mut seeder = RollingAutomaton::from_seed(seed, preset);
            let material = seeder.next_bytes(ENSEMBLE_MEMBERS * 32);
            Box::new(Ensemble::from_bytes(preset, &material)?)
        }
        "matrix" => Box::new(MatrixEngine::new(MATRIX_SIDE, seed)?),
        "os" => Box::new(ForeignSource::from_os_rng()),
        other => {
            return Err(crazyrandom_core::Error::InvalidArgument(format!(
                "unknown generator '{other}', expected one of {}",
                GENERATORS.join(", ")
            )));
        }
    };
    Ok(generator)
}

/// Parse a comma-separated generator list, or "all".
pub fn parse_generators(list: &str) -> Vec<&str> {
    if list == "all" {
        GENERATORS.to_vec()
    } else {
        list.split(',').map(str::trim).filter(|s| !s.is_empty()).collect()
    }
}

pub fn base64_encode(data: &[u8]) -> String {
    const CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";
    let mut result = String::with_capacity(data.len().div_ceil(3) * 4);
    for chunk in data.chunks(3) {
        let b0 = chunk[0] as u32;
        let b1 = chunk.get(1).copied().unwrap_or(0) as u32;
        let b2 = chunk.get(2).copied().unwrap_or(0) as u32;
        let triple = (b0 << 16) | (b1 << 8) | b2;
        result.push(CHARS[((triple >> 18) & 0x3F) as usize] as char);
        result.push(CHARS[((triple >> 12) & 0x3F) as usize] as char);
        if chunk.len() > 1 {
            result.push(CHARS[((triple >> 6) & 0x3F) as usize] as char);
        } else {
            result.push('=');
        }
        if chunk.len() > 2 {
            result.push(CHARS[(triple & 0x3F) as usize] as char);
        } else {
            result.push('=');
        }
    }
    result
}
