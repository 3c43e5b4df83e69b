//! AdaptiveAutomaton: the 32,000-bit self-mixing engine.
//!
//! A large bit buffer is read at a moving index. Most calls just step the
//! index backwards. A 16-bit usage counter (one unit per bit, two per `true`
//! bit) escalates through four mixing tiers:
//!
//! | trigger                 | tier   | re-seed from                       | spans |
//! |-------------------------|--------|------------------------------------|-------|
//! | counter % 45 == 0       | weak   | clock                              | 10    |
//! | counter % 123 == 0      | medium | clock                              | 40    |
//! | counter % 421 == 0      | strong | clock + three buffer words, 4-way  | 100   |
//! | counter is 2998 or 2999 | super  | clock + identities, 20-way         | 1000  |
//!
//! Every tier is followed by a trace-clear pass. Because the tiers read the
//! [`AmbientEntropy`] provider, output is only reproducible across runs when
//! a fixed provider is supplied.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use log::debug;

use crate::ambient::{AmbientEntropy, SystemAmbient};
use crate::bit_source::{BitSource, draw_below};
use crate::bits::{self, BitReader, BitWriter};
use crate::ensemble::Ensemble;
use crate::error::{Error, Result};
use crate::pool::SeedPool;
use crate::rolling::{Configuration, RollingAutomaton};

/// Number of bits in the state buffer.
pub const STATE_BITS: usize = 32_000;

/// Largest start index; leaves room for reads up to `index + 1024`.
pub const MAX_INDEX: usize = STATE_BITS - 1025;

/// Minimum seed material accepted by [`AdaptiveAutomaton::from_entropy`].
pub const MIN_SEED_BYTES: usize = 33;

/// Seed material drawn from the pool by [`AdaptiveAutomaton::strong`].
const STRONG_SEED_BYTES: usize = 4096;

const WEAK_PERIOD: u16 = 45;
const MEDIUM_PERIOD: u16 = 123;
const STRONG_PERIOD: u16 = 421;
const SUPER_TRIGGERS: [u16; 2] = [2998, 2999];

/// Bits flipped at the new index at the end of trace-clear.
const TRACE_FLIP_SPAN: usize = 1024;

/// The 32,000-bit adaptive automaton.
#[derive(Clone)]
pub struct AdaptiveAutomaton<A = SystemAmbient> {
    state: Vec<bool>,
    index: usize,
    counter: u16,
    ambient: A,
}

impl<A: AmbientEntropy> AdaptiveAutomaton<A> {
    /// Wrap an existing state buffer.
    ///
    /// # Errors
    /// - [`Error::InvalidState`] unless `state.len() == 32_000`.
    /// - [`Error::InvalidArgument`] if `index > MAX_INDEX`.
    pub fn new(state: Vec<bool>, index: usize, ambient: A) -> Result<Self> {
        if state.len() != STATE_BITS {
            return Err(Error::InvalidState {
                expected: STATE_BITS,
                actual: state.len(),
            });
        }
        if index > MAX_INDEX {
            return Err(Error::invalid_argument(format!(
                "start index {index} exceeds {MAX_INDEX}"
            )));
        }
        Ok(Self {
            state,
            index,
            counter: 0,
            ambient,
        })
    }

    /// Quick construction: a clock-seeded heavy rolling automaton fills the
    /// buffer and picks the index, then one super mix runs.
    pub fn weak(ambient: A) -> Self {
        let mut seeder = RollingAutomaton::from_ambient(&ambient, Configuration::HEAVY);
        let state = seeder.next_bits(STATE_BITS);
        let index = draw_below(&mut seeder, MAX_INDEX as u64) as usize;
        let mut automaton = Self {
            state,
            index,
            counter: 0,
            ambient,
        };
        automaton.super_mix();
        automaton
    }

    /// Stretch collaborator-supplied seed material into a full state.
    ///
    /// The first 32 bytes seed an initial rolling automaton. It picks 50..=81
    /// further automata, each seeded from a pseudo-random 32-byte window of
    /// `seed`; their 32,000-bit outputs are XORed together and then the parity
    /// of every seed byte is folded in.
    ///
    /// # Errors
    /// [`Error::InvalidArgument`] if fewer than [`MIN_SEED_BYTES`] are given.
    pub fn from_entropy(seed: &[u8], ambient: A) -> Result<Self> {
        if seed.len() < MIN_SEED_BYTES {
            return Err(Error::invalid_argument(format!(
                "need at least {MIN_SEED_BYTES} seed bytes, got {}",
                seed.len()
            )));
        }
        let mut initial = RollingAutomaton::from_seeds(words_at(seed, 0), Configuration::HEAVY);
        let count = 50 + draw_below(&mut initial, 32) as usize;
        let window_limit = (seed.len() - 32) as u64;

        let mut state = vec![false; STATE_BITS];
        for _ in 0..count {
            let offset = draw_below(&mut initial, window_limit) as usize;
            let mut member = RollingAutomaton::from_seeds(words_at(seed, offset), Configuration::HEAVY);
            for slot in state.iter_mut() {
                *slot ^= member.next_bit();
            }
        }
        for (i, byte) in seed.iter().enumerate() {
            state[i % STATE_BITS] ^= byte % 2 == 0;
        }

        let index = draw_below(&mut initial, MAX_INDEX as u64) as usize;
        Self::new(state, index, ambient)
    }

    /// [`from_entropy`](Self::from_entropy) fed by the default [`SeedPool`].
    ///
    /// # Errors
    /// [`Error::Io`] if no seed source on this machine produced usable data.
    pub fn strong(ambient: A) -> Result<Self> {
        Self::from_pool(&SeedPool::auto(), ambient)
    }

    /// [`from_entropy`](Self::from_entropy) fed by `pool`.
    ///
    /// # Errors
    /// [`Error::Io`] if every source in `pool` failed or was unhealthy.
    pub fn from_pool(pool: &SeedPool, ambient: A) -> Result<Self> {
        let seed = pool.seed_bytes(STRONG_SEED_BYTES)?;
        Self::from_entropy(&seed, ambient)
    }

    /// Read a persisted state. The start index comes from the wall clock.
    ///
    /// # Errors
    /// [`Error::Io`] if the stream is truncated.
    pub fn load_from<R: Read>(reader: R, ambient: A) -> Result<Self> {
        let mut input = BitReader::new(reader);
        let state = input.read_bits(STATE_BITS)?;
        input.terminate();
        let index = ambient.millis().rem_euclid(MAX_INDEX as i64 + 1) as usize;
        Self::new(state, index, ambient)
    }

    /// Load a state file written by [`save_to_file`](Self::save_to_file).
    ///
    /// # Errors
    /// - [`Error::Io`] if the file cannot be read or is truncated.
    /// - [`Error::InvalidArgument`] if the file holds more than one state.
    pub fn from_file(path: impl AsRef<Path>, ambient: A) -> Result<Self> {
        let mut reader = BufReader::new(File::open(path.as_ref())?);
        let mut raw = Vec::with_capacity(STATE_BITS / 8);
        reader.read_to_end(&mut raw)?;
        if raw.len() > STATE_BITS / 8 {
            return Err(Error::invalid_argument(format!(
                "state file holds {} bytes, expected {}",
                raw.len(),
                STATE_BITS / 8
            )));
        }
        Self::load_from(raw.as_slice(), ambient)
    }

    /// Persist the state buffer (not the index or counter).
    pub fn save_to<W: Write>(&self, writer: W) -> Result<W> {
        let mut output = BitWriter::new(writer);
        output.write_bits(&self.state)?;
        Ok(output.terminate()?)
    }

    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = File::create(path.as_ref())?;
        self.save_to(BufWriter::new(file))?;
        Ok(())
    }

    pub fn state(&self) -> &[bool] {
        &self.state
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn counter(&self) -> u16 {
        self.counter
    }

    pub fn ambient(&self) -> &A {
        &self.ambient
    }

    // -----------------------------------------------------------------------
    // Mixing tiers
    // -----------------------------------------------------------------------

    fn weak_mix(&mut self) {
        let mut mixer = RollingAutomaton::from_seed(self.ambient.nanos(), Configuration::HEAVY);
        for _ in 0..10 {
            let at = draw_below(&mut mixer, MAX_INDEX as u64 + 1) as usize;
            let value = mixer.next_long();
            self.write_long(at, value);
        }

        let span = 5_000 + draw_below(&mut mixer, 10_000) as usize;
        let start = draw_below(&mut mixer, (STATE_BITS - span) as u64) as usize;
        self.invert(start, span);
    }

    fn medium_mix(&mut self) {
        let mut mixer = RollingAutomaton::from_seed(self.ambient.nanos(), Configuration::HEAVY);
        for _ in 0..40 {
            let at = draw_below(&mut mixer, MAX_INDEX as u64 + 1) as usize;
            let value = mixer.next_long();
            self.write_long(at, value);
        }
    }

    fn strong_mix(&mut self) {
        let mut first = RollingAutomaton::from_seeds(
            [
                self.ambient.nanos(),
                self.read_long(self.index),
                self.read_long(self.index + 256),
                self.read_long(self.index + 512),
            ],
            Configuration::HEAVY,
        );
        self.splatter(&mut first, 4, 100);
    }

    fn super_mix(&mut self) {
        let own = self.ambient.identity(self.state.as_ptr() as usize);
        let process = self.ambient.identity(super_mix_marker());
        let mut first = RollingAutomaton::from_seeds(
            [self.ambient.nanos(), own, self.ambient.millis(), process],
            Configuration::HEAVY,
        );
        self.splatter(&mut first, 20, 1_000);
    }

    /// Expand `seeder` into a `members`-way ensemble and add `spans` longs at
    /// pseudo-random offsets.
    fn splatter(&mut self, seeder: &mut RollingAutomaton, members: usize, spans: usize) {
        let mut ensemble = Ensemble::drawn_from(seeder, Configuration::HEAVY, members);
        for _ in 0..spans {
            let at = draw_below(&mut ensemble, MAX_INDEX as u64 + 1) as usize;
            let value = ensemble.next_long();
            self.add_long(at, value);
        }
    }

    fn clear_trace(&mut self) {
        let i = self.index;
        let mut temp = RollingAutomaton::from_seeds(
            [
                self.read_long(i),
                self.read_long(i + 256),
                self.read_long(i + 512),
                self.read_long(i + 768),
            ],
            Configuration::HEAVY,
        );
        for offset in [0, 256, 512, 768] {
            let value = temp.next_long();
            self.add_long(i + offset, value);
        }
        self.index += draw_below(&mut temp, MAX_INDEX as u64 + 1) as usize;
        if self.index > MAX_INDEX {
            self.index -= MAX_INDEX;
        }
        self.invert(self.index, TRACE_FLIP_SPAN);
    }

    // -----------------------------------------------------------------------
    // Buffer access
    // -----------------------------------------------------------------------

    fn read_long(&self, at: usize) -> i64 {
        bits::read_u64(&self.state, at) as i64
    }

    fn write_long(&mut self, at: usize, value: i64) {
        bits::write_u64(&mut self.state, at, value as u64);
    }

    fn add_long(&mut self, at: usize, value: i64) {
        let sum = self.read_long(at).wrapping_add(value);
        self.write_long(at, sum);
    }

    fn invert(&mut self, start: usize, span: usize) {
        for bit in &mut self.state[start..start + span] {
            *bit = !*bit;
        }
    }
}

/// Process-wide address mixed into the super tier.
fn super_mix_marker() -> usize {
    static MARKER: u8 = 0;
    &MARKER as *const u8 as usize
}

/// Four big-endian 64-bit words starting at byte `offset`.
fn words_at(seed: &[u8], offset: usize) -> [i64; 4] {
    let mut words = [0i64; 4];
    for (k, word) in words.iter_mut().enumerate() {
        let start = offset + k * 8;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&seed[start..start + 8]);
        *word = i64::from_be_bytes(raw);
    }
    words
}

impl<A: AmbientEntropy> BitSource for AdaptiveAutomaton<A> {
    fn next_bit(&mut self) -> bool {
        let result = self.state[self.index];
        self.counter = self.counter.wrapping_add(1);
        if result {
            self.counter = self.counter.wrapping_add(1);
        }

        if self.counter % WEAK_PERIOD == 0 {
            debug!("weak mix at counter {}", self.counter);
            self.weak_mix();
            self.clear_trace();
        } else if self.counter % MEDIUM_PERIOD == 0 {
            debug!("medium mix at counter {}", self.counter);
            self.medium_mix();
            self.clear_trace();
        } else if self.counter % STRONG_PERIOD == 0 {
            debug!("strong mix at counter {}", self.counter);
            self.strong_mix();
            self.clear_trace();
        } else if SUPER_TRIGGERS.contains(&self.counter) {
            debug!("super mix at counter {}", self.counter);
            self.super_mix();
            self.clear_trace();
            self.counter = 0;
        } else {
            self.index = if self.index <= 1 { MAX_INDEX } else { self.index - 1 };
        }
        result
    }

    fn is_pseudo(&self) -> bool {
        false
    }
}

impl<A> std::fmt::Debug for AdaptiveAutomaton<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdaptiveAutomaton")
            .field("index", &self.index)
            .field("counter", &self.counter)
            .field("ones", &self.state.iter().filter(|&&b| b).count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ambient::FixedAmbient;
    use crate::source::{EntropySource, SourceCategory, SourceInfo};

    fn seeded(ambient: FixedAmbient) -> AdaptiveAutomaton<FixedAmbient> {
        let mut filler = RollingAutomaton::from_seed(2018, Configuration::LIGHT);
        AdaptiveAutomaton::new(filler.next_bits(STATE_BITS), 12_345, ambient).unwrap()
    }

    #[test]
    fn wrong_length_is_invalid_state() {
        for len in [0, 256, 31_999, 32_001] {
            let err = AdaptiveAutomaton::new(vec![false; len], 0, FixedAmbient::default()).unwrap_err();
            assert!(
                matches!(err, Error::InvalidState { expected: 32_000, actual } if actual == len),
                "len {len}"
            );
        }
    }

    #[test]
    fn index_beyond_headroom_is_rejected() {
        let err = AdaptiveAutomaton::new(vec![false; STATE_BITS], MAX_INDEX + 1, SystemAmbient)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        assert!(AdaptiveAutomaton::new(vec![false; STATE_BITS], MAX_INDEX, SystemAmbient).is_ok());
    }

    #[test]
    fn fixed_ambient_makes_the_stream_reproducible() {
        let mut a = seeded(FixedAmbient::default());
        let mut b = seeded(FixedAmbient::default());
        // 6,000 bits pass every tier, including at least two super mixes.
        assert_eq!(a.next_bits(6_000), b.next_bits(6_000));
        assert_eq!(a.state(), b.state());
    }

    #[test]
    fn different_ambient_diverges_after_first_mix() {
        let mut a = seeded(FixedAmbient::new(1, 2, 3));
        let mut b = seeded(FixedAmbient::new(4, 5, 6));
        a.next_bits(200);
        b.next_bits(200);
        assert_ne!(a.state(), b.state());
    }

    #[test]
    fn clone_forks_independent_stream() {
        let mut original = seeded(FixedAmbient::default());
        original.next_bits(1_000);
        let mut fork = original.clone();
        assert_eq!(original.next_bits(3_000), fork.next_bits(3_000));

        let snapshot = fork.state().to_vec();
        original.next_bits(500);
        assert_eq!(fork.state(), snapshot.as_slice());
    }

    #[test]
    fn index_and_counter_stay_in_range() {
        let mut automaton = seeded(FixedAmbient::default());
        for _ in 0..4_000 {
            automaton.next_bit();
            assert!(automaton.index() <= MAX_INDEX);
            assert!(automaton.counter() < 3_000);
        }
    }

    #[test]
    fn cheap_path_walks_index_backwards() {
        let mut automaton = AdaptiveAutomaton::new(vec![false; STATE_BITS], 1, FixedAmbient::default()).unwrap();
        automaton.next_bit();
        assert_eq!(automaton.index(), MAX_INDEX);
        automaton.next_bit();
        assert_eq!(automaton.index(), MAX_INDEX - 1);
        assert_eq!(automaton.counter(), 2);
    }

    #[test]
    fn never_pseudo() {
        assert!(!seeded(FixedAmbient::default()).is_pseudo());
    }

    #[test]
    fn from_entropy_validates_and_balances() {
        assert!(matches!(
            AdaptiveAutomaton::from_entropy(&[0u8; 32], FixedAmbient::default()),
            Err(Error::InvalidArgument(_))
        ));

        let seed: Vec<u8> = (0..200u32).map(|i| (i * 31 + 7) as u8).collect();
        let a = AdaptiveAutomaton::from_entropy(&seed, FixedAmbient::default()).unwrap();
        assert!(a.index() <= MAX_INDEX);
        let ones = a.state().iter().filter(|&&b| b).count();
        assert!((15_000..17_000).contains(&ones), "ones = {ones}");
    }

    /// All-false state read from index 20 000, counter preset.
    fn parked(counter: u16, first_bit: bool) -> AdaptiveAutomaton<FixedAmbient> {
        let mut state = vec![false; STATE_BITS];
        state[20_000] = first_bit;
        let mut automaton = AdaptiveAutomaton::new(state, 20_000, FixedAmbient::default()).unwrap();
        automaton.counter = counter;
        automaton
    }

    #[test]
    fn cheap_path_below_first_tier_leaves_state_alone() {
        let mut automaton = parked(0, false);
        for step in 1..=44u16 {
            assert!(!automaton.next_bit());
            assert_eq!(automaton.counter(), step);
            assert_eq!(automaton.index(), 20_000 - step as usize);
        }
        assert!(automaton.state().iter().all(|&b| !b));
    }

    #[test]
    fn tier_thresholds_mix_instead_of_stepping() {
        for trigger in [45u16, 90, 123, 421, 2998] {
            let mut automaton = parked(trigger - 1, false);
            assert!(!automaton.next_bit());
            let ones = automaton.state().iter().filter(|&&b| b).count();
            assert!(ones > 0, "no mix at counter {trigger}");
        }
    }

    #[test]
    fn top_tier_resets_the_counter() {
        let mut automaton = parked(2997, false);
        automaton.next_bit();
        assert_eq!(automaton.counter(), 0);

        // A true bit steps 2997 straight to 2999.
        let mut automaton = parked(2997, true);
        assert!(automaton.next_bit());
        assert_eq!(automaton.counter(), 0);
    }

    #[test]
    fn lower_tiers_keep_counting() {
        let mut automaton = parked(44, false);
        automaton.next_bit();
        assert_eq!(automaton.counter(), 45);
    }

    struct Silent;

    static SILENT_INFO: SourceInfo = SourceInfo {
        name: "silent",
        description: "never produces anything",
        category: SourceCategory::System,
        entropy_rate_estimate: 0.0,
    };

    impl EntropySource for Silent {
        fn info(&self) -> &SourceInfo {
            &SILENT_INFO
        }

        fn is_available(&self) -> bool {
            true
        }

        fn collect(&self, _n_samples: usize) -> Vec<u8> {
            Vec::new()
        }
    }

    #[test]
    fn failing_pool_refuses_to_seed() {
        let mut pool = SeedPool::new();
        pool.add_source(Box::new(Silent));
        let result = AdaptiveAutomaton::from_pool(&pool, FixedAmbient::default());
        assert!(matches!(result, Err(Error::Io(_))));

        let empty = AdaptiveAutomaton::from_pool(&SeedPool::new(), FixedAmbient::default());
        assert!(matches!(empty, Err(Error::Io(_))));
    }

    #[test]
    fn healthy_pool_seeds_a_valid_state() {
        let mut pool = SeedPool::new();
        pool.add_source(Box::new(Silent));
        pool.add_source(Box::new(crate::sources::os::OsRandomSource));
        let automaton = AdaptiveAutomaton::from_pool(&pool, FixedAmbient::default()).unwrap();
        assert!(automaton.index() <= MAX_INDEX);
        assert_eq!(pool.health_report().healthy, 1);
    }

    #[test]
    fn weak_construction_with_fixed_ambient_is_reproducible() {
        let a = AdaptiveAutomaton::weak(FixedAmbient::default());
        let b = AdaptiveAutomaton::weak(FixedAmbient::default());
        assert_eq!(a.state(), b.state());
        assert!(a.index() <= MAX_INDEX);
    }

    #[test]
    fn save_and_load_preserve_state() {
        let automaton = seeded(FixedAmbient::default());
        let bytes = automaton.save_to(Vec::new()).unwrap();
        assert_eq!(bytes.len(), STATE_BITS / 8);

        let ambient = FixedAmbient::new(0, 40_000, 0);
        let loaded = AdaptiveAutomaton::load_from(bytes.as_slice(), ambient).unwrap();
        assert_eq!(loaded.state(), automaton.state());
        assert_eq!(loaded.index(), 40_000 % (MAX_INDEX + 1));
    }

    #[test]
    fn truncated_state_is_an_io_error() {
        let err = AdaptiveAutomaton::load_from(&[0u8; 100][..], FixedAmbient::default()).unwrap_err();
        assert!(matches!(err, Error::Io(ref e) if e.kind() == std::io::ErrorKind::UnexpectedEof));
    }
}
