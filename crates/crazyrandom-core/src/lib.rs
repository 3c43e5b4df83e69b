//! # crazyrandom-core
//!
//! **Random numbers from bit-level cellular automata.**
//!
//! Every generator here produces one bit at a time through the [`BitSource`]
//! trait; bytes, integers, floats and bounded draws are all assembled from
//! those bits in a single, fixed order (most significant bit first).
//!
//! ## Quick Start
//!
//! ```
//! use crazyrandom_core::{BitSource, Configuration, RollingAutomaton};
//!
//! let mut rng = RollingAutomaton::from_seed(42, Configuration::HEAVY);
//! let roll = rng.next_bounded_int(6).unwrap() + 1;
//! assert!((1..=6).contains(&roll));
//!
//! let x = rng.next_double01();
//! assert!((0.0..1.0).contains(&x));
//! ```
//!
//! ## Engines
//!
//! - [`RollingAutomaton`]: 256-bit state, five periodic transformations,
//!   fully reproducible from its seed.
//! - [`AdaptiveAutomaton`]: 32,000-bit state that re-mixes itself with the
//!   clock as it is used. Seed it from the [`SeedPool`] for real use; give it a
//!   [`FixedAmbient`] for reproducible tests.
//! - [`Ensemble`]: several sources, the active one choosing its successor.
//! - [`MatrixEngine`]: an integer matrix squared on every 32-bit draw.
//!
//! Every engine is `Clone`, and a clone continues the exact same stream.

pub mod adapters;
pub mod adaptive;
pub mod ambient;
pub mod bit_source;
pub mod bits;
pub mod conditioning;
pub mod ensemble;
pub mod error;
pub mod matrix;
pub mod pool;
pub mod rolling;
pub mod source;
pub mod sources;

pub use adapters::{BufferedSource, ConstantSource, ForeignSource};
pub use adaptive::AdaptiveAutomaton;
pub use ambient::{AmbientEntropy, FixedAmbient, SystemAmbient};
pub use bit_source::{BitSource, CloneSource, DynSource, SourceRng, required_bits};
pub use bits::{BitReader, BitWriter};
pub use conditioning::{QualityReport, quick_quality, quick_shannon, sha256_stretch};
pub use ensemble::Ensemble;
pub use error::{Error, Result};
pub use matrix::MatrixEngine;
pub use pool::{HealthReport, SeedPool, SourceHealth};
pub use rolling::{Configuration, RollingAutomaton};
pub use source::{EntropySource, SourceCategory, SourceInfo};
pub use sources::detect_available_sources;

/// Library version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
