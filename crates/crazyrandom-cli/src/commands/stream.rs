use std::io::Write;

use crazyrandom_core::{BitSource, Configuration, Result};

pub fn run(
    generator: &str,
    preset: Configuration,
    seed: Option<i64>,
    n_bytes: usize,
    format: &str,
) -> Result<()> {
    let mut source = super::make_generator(generator, preset, seed)?;
    let chunk_size = 4096;
    let mut total = 0usize;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    loop {
        if n_bytes > 0 && total >= n_bytes {
            break;
        }
        let want = if n_bytes == 0 {
            chunk_size
        } else {
            chunk_size.min(n_bytes - total)
        };

        let data = source.next_bytes(want);

        let write_result = match format {
            "hex" => {
                let hex: String = data.iter().map(|b| format!("{b:02x}")).collect();
                out.write_all(hex.as_bytes())
            }
            "base64" => out.write_all(super::base64_encode(&data).as_bytes()),
            _ => out.write_all(&data),
        };

        if write_result.is_err() {
            break; // Broken pipe
        }
        let _ = out.flush();

        total += data.len();
    }
    if format != "raw" {
        let _ = writeln!(out);
    }
    Ok(())
}
