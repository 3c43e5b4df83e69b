//! RollingAutomaton: the 256-bit self-indexing engine.
//!
//! The whole state is one 256-bit circular buffer. The read position lives
//! inside the buffer itself (one byte at bit offset 77, stored biased by 128),
//! so every mutation of the buffer can also move the index.
//!
//! Each extraction runs, in order:
//!
//! ```text
//! read bit at index → xor → shift1 → replace → shift2 → invert → index update
//! ```
//!
//! Every operator has its own period counter. An operator fires when its
//! counter is zero or below and then reloads the configured period; otherwise
//! the counter drops by one, or by two when its tap bit is set.

use std::fmt;
use std::str::FromStr;

use crate::ambient::AmbientEntropy;
use crate::bit_source::BitSource;
use crate::bits;
use crate::error::{Error, Result};

/// Number of bits in the state buffer.
pub const STATE_BITS: usize = 256;

/// Bit offset of the byte holding the read index.
const INDEX_OFFSET: i32 = 77;

/// Bit offset of the byte that drives the first shift.
const SHIFTER_OFFSET: i32 = 214;

/// Relative offsets that expand one indirect index into eight permutation entries.
const REPLACE_OFFSETS: [i32; 8] = [0, 23, 143, 12, -74, -213, 176, 58];

/// Number of contiguous bits flipped by the invert operator.
const INVERT_SPAN: usize = 15;

/// Fixed mask XORed into the buffer by the xor operator.
const XOR_MASK: &[u8; STATE_BITS] = b"\
1101000101001000010011100000101000000101100011101001010100000010\
0010001001001111010111000010011110110101100111000010010100100111\
1110000101001001000110101000011010111101101010001100100010010011\
1100010001100010110011001001000010100101001011110111110011011100";

/// Operator periods of a [`RollingAutomaton`].
///
/// Lower periods mean heavier (slower, less reversible) mixing. A period of
/// zero makes the operator fire on every extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Configuration {
    pub xor_period: u32,
    pub shift_period1: u32,
    pub replace_period: u32,
    pub shift_period2: u32,
    pub invert_period: u32,
}

impl Configuration {
    /// Every cheap operator on every call, replace every 30th call.
    pub const HEAVY: Self = Self::new(0, 0, 29, 0, 0);
    pub const MEDIUM: Self = Self::new(10, 11, 12, 101, 13);
    pub const LIGHT: Self = Self::new(57, 34, 491, 40, 67);

    pub const fn new(
        xor_period: u32,
        shift_period1: u32,
        replace_period: u32,
        shift_period2: u32,
        invert_period: u32,
    ) -> Self {
        Self {
            xor_period,
            shift_period1,
            replace_period,
            shift_period2,
            invert_period,
        }
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self::HEAVY
    }
}

impl fmt::Display for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::HEAVY => write!(f, "heavy"),
            Self::MEDIUM => write!(f, "medium"),
            Self::LIGHT => write!(f, "light"),
            c => write!(
                f,
                "{},{},{},{},{}",
                c.xor_period, c.shift_period1, c.replace_period, c.shift_period2, c.invert_period
            ),
        }
    }
}

impl FromStr for Configuration {
    type Err = Error;

    /// Accepts `heavy`, `medium`, `light`, or five comma-separated periods.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "heavy" | "legacy" => return Ok(Self::HEAVY),
            "medium" => return Ok(Self::MEDIUM),
            "light" => return Ok(Self::LIGHT),
            _ => {}
        }
        let periods = s
            .split(',')
            .map(|p| p.trim().parse::<u32>())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| Error::invalid_argument(format!("bad configuration '{s}': {e}")))?;
        match periods[..] {
            [a, b, c, d, e] => Ok(Self::new(a, b, c, d, e)),
            _ => Err(Error::invalid_argument(format!(
                "configuration needs 5 periods, got {}",
                periods.len()
            ))),
        }
    }
}

/// The 256-bit rolling automaton. Fully deterministic for its whole lifetime.
#[derive(Clone, PartialEq, Eq)]
pub struct RollingAutomaton {
    data: [bool; STATE_BITS],
    config: Configuration,
    xor_counter: i32,
    shift1_counter: i32,
    replace_counter: i32,
    shift2_counter: i32,
    invert_counter: i32,
    shift_amount: i8,
}

impl RollingAutomaton {
    fn with_data(data: [bool; STATE_BITS], config: Configuration) -> Self {
        Self {
            data,
            config,
            xor_counter: 0,
            shift1_counter: 0,
            replace_counter: 0,
            shift2_counter: 0,
            invert_counter: 0,
            shift_amount: 0,
        }
    }

    /// Use `bits` directly as the state buffer.
    ///
    /// # Errors
    /// [`Error::InvalidState`] unless `bits.len() == 256`.
    pub fn from_bits(bits: &[bool], config: Configuration) -> Result<Self> {
        let data: [bool; STATE_BITS] = bits.try_into().map_err(|_| Error::InvalidState {
            expected: STATE_BITS,
            actual: bits.len(),
        })?;
        Ok(Self::with_data(data, config))
    }

    /// Expand one seed into four 64-bit words.
    pub fn from_seed(seed: i64, config: Configuration) -> Self {
        Self::from_seeds(
            [
                seed,
                seed / 3_487_834,
                seed.wrapping_mul(9_678_538),
                seed.wrapping_sub(14_396),
            ],
            config,
        )
    }

    /// Write four 64-bit words at bit offsets 0, 64, 128 and 192.
    pub fn from_seeds(seeds: [i64; 4], config: Configuration) -> Self {
        let mut data = [false; STATE_BITS];
        for (i, seed) in seeds.iter().enumerate() {
            bits::write_u64(&mut data, i * 64, *seed as u64);
        }
        Self::with_data(data, config)
    }

    /// Expand two 32-bit seeds into eight 32-bit words.
    pub fn from_int_seeds(seed1: i32, seed2: i32, config: Configuration) -> Self {
        let expand = |s: i32| [s, s / 31, s.wrapping_mul(97), s.wrapping_sub(198_345)];
        let [a, b, c, d] = expand(seed1);
        let [e, f, g, h] = expand(seed2);
        Self::from_ints([a, b, c, d, e, f, g, h], config)
    }

    /// Write eight 32-bit words at bit offsets 0, 32, ..., 224.
    pub fn from_ints(words: [i32; 8], config: Configuration) -> Self {
        let mut data = [false; STATE_BITS];
        for (i, word) in words.iter().enumerate() {
            for (j, byte) in word.to_be_bytes().iter().enumerate() {
                bits::write_byte(&mut data, i * 32 + j * 8, *byte);
            }
        }
        Self::with_data(data, config)
    }

    /// Seed from text. Each UTF-16 code unit fills 16 bits; every block of
    /// 16 units covers the buffer once, so the last block wins.
    ///
    /// # Errors
    /// [`Error::InvalidArgument`] unless the UTF-16 length is a multiple of 16.
    pub fn from_seed_str(seed: &str, config: Configuration) -> Result<Self> {
        let units: Vec<u16> = seed.encode_utf16().collect();
        if units.len() % 16 != 0 {
            return Err(Error::invalid_argument(format!(
                "seed length {} is not a multiple of 16",
                units.len()
            )));
        }
        let mut data = [false; STATE_BITS];
        for (n, unit) in units.iter().enumerate() {
            let base = (n % 16) * 16;
            for bit in 0..16 {
                data[base + bit] = (unit >> (15 - bit)) & 1 == 1;
            }
        }
        Ok(Self::with_data(data, config))
    }

    /// Seed from the ambient clock.
    pub fn from_ambient<A: AmbientEntropy + ?Sized>(ambient: &A, config: Configuration) -> Self {
        let millis = ambient.millis();
        let nanos = ambient.nanos();
        Self::from_seeds(
            [
                millis.wrapping_mul(millis),
                nanos.wrapping_mul(nanos),
                millis.wrapping_mul(nanos),
                millis.wrapping_add(nanos),
            ],
            config,
        )
    }

    /// Snapshot of the state buffer.
    pub fn bits(&self) -> [bool; STATE_BITS] {
        self.data
    }

    pub fn configuration(&self) -> Configuration {
        self.config
    }

    pub fn set_configuration(&mut self, config: Configuration) {
        self.config = config;
    }

    /// Current read index, always in `[0, 256)`.
    pub fn index(&self) -> usize {
        self.byte_at(INDEX_OFFSET)
    }

    // -----------------------------------------------------------------------
    // Wrapping buffer access
    // -----------------------------------------------------------------------

    fn wrap(position: i32) -> usize {
        position.rem_euclid(STATE_BITS as i32) as usize
    }

    /// Byte at `position` read as a signed value and biased into `[0, 256)`.
    fn byte_at(&self, position: i32) -> usize {
        let start = Self::wrap(position);
        let raw = (0..8).fold(0u8, |acc, i| {
            (acc << 1) | self.data[(start + i) % STATE_BITS] as u8
        });
        (raw ^ 0x80) as usize
    }

    /// Inverse of [`byte_at`](Self::byte_at) for values in `[0, 256)`.
    fn set_byte_at(&mut self, position: i32, value: usize) {
        let start = Self::wrap(position);
        let raw = (value as u8) ^ 0x80;
        for i in 0..8 {
            self.data[(start + i) % STATE_BITS] = (raw >> (7 - i)) & 1 == 1;
        }
    }

    // -----------------------------------------------------------------------
    // Operators
    // -----------------------------------------------------------------------

    /// Advance one period counter; `true` when the operator should fire.
    fn tick(counter: &mut i32, period: u32, tap: bool) -> bool {
        if *counter <= 0 {
            *counter = period as i32;
            true
        } else {
            *counter -= 1;
            if tap {
                *counter -= 1;
            }
            false
        }
    }

    fn xor_mask(&mut self, start: usize) {
        for (offset, &mask_bit) in XOR_MASK.iter().enumerate() {
            if mask_bit == b'1' {
                let at = (start + offset) % STATE_BITS;
                self.data[at] = !self.data[at];
            }
        }
    }

    /// Rotate the whole buffer so that the old bit 0 lands at `position`.
    fn shift(&mut self, position: i32) {
        self.data.rotate_right(Self::wrap(position));
    }

    fn replace(&mut self, base: i32) {
        let mut first = [0i32; 32];
        for (i, slot) in first.iter_mut().enumerate() {
            *slot = self.byte_at(base + i as i32 * 8) as i32;
        }
        let mut permutation = [0usize; STATE_BITS];
        for (i, &indirect) in first.iter().enumerate() {
            for (k, offset) in REPLACE_OFFSETS.iter().enumerate() {
                permutation[i * 8 + k] = self.byte_at(indirect + offset);
            }
        }
        let snapshot = self.data;
        for (slot, &from) in self.data.iter_mut().zip(permutation.iter()) {
            *slot = snapshot[from];
        }
    }

    fn invert(&mut self, position: i32) {
        let start = Self::wrap(position);
        for i in 0..INVERT_SPAN {
            let at = (start + i) % STATE_BITS;
            self.data[at] = !self.data[at];
        }
    }
}

impl BitSource for RollingAutomaton {
    fn next_bit(&mut self) -> bool {
        let old_index = self.index();
        let result = self.data[old_index];

        if Self::tick(&mut self.xor_counter, self.config.xor_period, self.data[10]) {
            self.xor_mask(old_index);
        }

        if Self::tick(&mut self.shift1_counter, self.config.shift_period1, self.data[7]) {
            let target = self.byte_at(SHIFTER_OFFSET) as i32 + 50;
            self.shift(target);
        }

        if Self::tick(&mut self.replace_counter, self.config.replace_period, result) {
            self.replace(self.index() as i32 + 69);
        }

        if Self::tick(&mut self.shift2_counter, self.config.shift_period2, self.data[12]) {
            let target = self.byte_at(self.index() as i32 - 22) as i32 + self.shift_amount as i32;
            self.shift_amount = self.shift_amount.wrapping_add(1);
            self.shift(target);
        }

        if Self::tick(&mut self.invert_counter, self.config.invert_period, self.data[3]) {
            self.invert(self.byte_at(self.index() as i32 + 17) as i32);
        }

        let next_index = self.byte_at(self.index() as i32 - 96);
        self.set_byte_at(INDEX_OFFSET, next_index);
        result
    }

    fn is_pseudo(&self) -> bool {
        true
    }
}

impl fmt::Display for RollingAutomaton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PR[")?;
        for &bit in &self.data {
            f.write_str(if bit { "1" } else { "0" })?;
        }
        f.write_str("]")
    }
}

impl fmt::Debug for RollingAutomaton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RollingAutomaton")
            .field("index", &self.index())
            .field("config", &self.config)
            .field(
                "counters",
                &[
                    self.xor_counter,
                    self.shift1_counter,
                    self.replace_counter,
                    self.shift2_counter,
                    self.invert_counter,
                ],
            )
            .field("shift_amount", &self.shift_amount)
            .finish()
    }
}
