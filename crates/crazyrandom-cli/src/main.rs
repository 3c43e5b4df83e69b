//! CLI for crazyrandom: bit-level cellular-automaton random generators.

mod commands;

use clap::{Parser, Subcommand};
use crazyrandom_core::Configuration;

#[derive(Parser)]
#[command(name = "crazyrandom")]
#[command(about = "crazyrandom: random numbers from bit-level cellular automata")]
#[command(version = crazyrandom_core::VERSION)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Stream generator output to stdout (pipe-friendly)
    Stream {
        /// Generator: rolling, adaptive, ensemble, matrix, os
        #[arg(long, default_value = "rolling", value_parser = commands::GENERATORS)]
        generator: String,

        /// Rolling automaton preset: heavy, medium, light, or five comma-separated periods
        #[arg(long, default_value = "heavy")]
        preset: Configuration,

        /// Seed for the pseudo generators (default: clock)
        #[arg(long)]
        seed: Option<i64>,

        /// Total bytes (0 = infinite)
        #[arg(long, default_value = "1024")]
        bytes: usize,

        /// Output format
        #[arg(long, default_value = "raw", value_parser = ["raw", "hex", "base64"])]
        format: String,
    },

    /// Run the randomness test battery over generator output
    Report {
        /// Generators to test (comma-separated, or "all")
        #[arg(long, default_value = "all")]
        generators: String,

        /// Rolling automaton preset
        #[arg(long, default_value = "heavy")]
        preset: Configuration,

        /// Seed for the pseudo generators (default: clock)
        #[arg(long)]
        seed: Option<i64>,

        /// Number of bytes to draw per generator
        #[arg(long, default_value = "20000")]
        samples: usize,

        /// Write machine-readable results as JSON
        #[arg(long)]
        output: Option<String>,
    },

    /// Measure throughput of every generator
    Bench {
        /// Bytes drawn from each generator
        #[arg(long, default_value = "65536")]
        bytes: usize,

        /// Rolling automaton preset
        #[arg(long, default_value = "heavy")]
        preset: Configuration,
    },

    /// Create or inspect adaptive automaton state files
    State {
        #[command(subcommand)]
        action: StateAction,
    },
}

#[derive(Subcommand)]
enum StateAction {
    /// Write a freshly seeded 32,000-bit state to a file
    Create {
        /// Destination path
        path: String,

        /// Seed from the clock only instead of the seed pool
        #[arg(long)]
        weak: bool,
    },

    /// Summarise a state file and sample its output
    Show {
        /// State file path
        path: String,

        /// Sample bytes to draw and grade
        #[arg(long, default_value = "4096")]
        sample: usize,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let outcome = match cli.command {
        Commands::Stream {
            generator,
            preset,
            seed,
            bytes,
            format,
        } => commands::stream::run(&generator, preset, seed, bytes, &format),
        Commands::Report {
            generators,
            preset,
            seed,
            samples,
            output,
        } => commands::report::run(&generators, preset, seed, samples, output.as_deref()),
        Commands::Bench { bytes, preset } => commands::bench::run(bytes, preset),
        Commands::State { action } => match action {
            StateAction::Create { path, weak } => commands::state::create(&path, weak),
            StateAction::Show { path, sample } => commands::state::show(&path, sample),
        },
    };

    if let Err(e) = outcome {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
