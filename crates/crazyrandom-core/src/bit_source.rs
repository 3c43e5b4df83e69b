//! The bit-source contract shared by every generator.
//!
//! An implementation supplies exactly one primitive, [`BitSource::next_bit`];
//! every wider value is assembled from successive bits. Bits fill a byte from
//! the most significant position down, and bytes fill wider integers from the
//! most significant byte down.

use crate::error::{Error, Result};

/// Trait that every generator must implement.
pub trait BitSource {
    /// Produce the next bit. `true` and `false` must be equally likely.
    fn next_bit(&mut self) -> bool;

    /// Whether the stream is a pure function of its construction inputs.
    ///
    /// Composite and ambient-entropy generators report `false`; such streams
    /// are suitable for general use, pseudo streams mostly for testing and
    /// reproducible simulation.
    fn is_pseudo(&self) -> bool;

    /// Alias of [`next_bit`](Self::next_bit).
    fn next_boolean(&mut self) -> bool {
        self.next_bit()
    }

    /// Collect `n` bits in extraction order.
    fn next_bits(&mut self, n: usize) -> Vec<bool> {
        (0..n).map(|_| self.next_bit()).collect()
    }

    /// Eight bits, first bit most significant.
    fn next_byte(&mut self) -> u8 {
        (0..8).fold(0u8, |acc, _| (acc << 1) | self.next_bit() as u8)
    }

    fn next_short(&mut self) -> i16 {
        let hi = self.next_byte();
        let lo = self.next_byte();
        i16::from_be_bytes([hi, lo])
    }

    /// Sixteen bits as an unsigned code unit.
    fn next_char(&mut self) -> u16 {
        self.next_short() as u16
    }

    fn next_int(&mut self) -> i32 {
        let mut bytes = [0u8; 4];
        self.fill_bytes(&mut bytes);
        i32::from_be_bytes(bytes)
    }

    fn next_long(&mut self) -> i64 {
        let mut bytes = [0u8; 8];
        self.fill_bytes(&mut bytes);
        i64::from_be_bytes(bytes)
    }

    /// Any 32-bit pattern reinterpreted as a float, NaN and infinities included.
    fn next_raw_float(&mut self) -> f32 {
        f32::from_bits(self.next_int() as u32)
    }

    /// Any 64-bit pattern reinterpreted as a double, NaN and infinities included.
    fn next_raw_double(&mut self) -> f64 {
        f64::from_bits(self.next_long() as u64)
    }

    /// A float in `[0, 1)`, every representable value in range equally likely.
    ///
    /// The top byte is the sign bit, a zero, then six random exponent bits.
    /// When those six bits are all ones the next byte's top bit must be clear,
    /// otherwise the exponent would reach 127 and the value 1.0 or more.
    fn next_float01(&mut self) -> f32 {
        let b0 = self.next_byte();
        let b1 = self.next_byte();
        let top = draw_bits(self, 6) as u8;
        let b2 = if top < 63 {
            self.next_byte()
        } else {
            loop {
                let candidate = self.next_byte();
                if candidate < 0x80 {
                    break candidate;
                }
            }
        };
        f32::from_bits(u32::from_be_bytes([top, b2, b1, b0]))
    }

    /// A double in `[0, 1)`, every representable value in range equally likely.
    ///
    /// The top byte holds six random exponent bits. When it equals 63 the
    /// following byte is redrawn while it lies in `[-16, -1]` as a signed byte,
    /// which would otherwise push the exponent to 1023 (values in `[1, 2)`).
    fn next_double01(&mut self) -> f64 {
        let mut bytes = [0u8; 8];
        for slot in bytes[2..].iter_mut().rev() {
            *slot = self.next_byte();
        }
        let top = draw_bits(self, 6) as u8;
        let second = if top < 63 {
            self.next_byte()
        } else {
            loop {
                let candidate = self.next_byte() as i8;
                if !(-16..=-1).contains(&candidate) {
                    break candidate as u8;
                }
            }
        };
        bytes[0] = top;
        bytes[1] = second;
        f64::from_bits(u64::from_be_bytes(bytes))
    }

    /// Uniform integer in `[0, bound)` by rejection sampling.
    ///
    /// # Errors
    /// [`Error::InvalidArgument`] if `bound <= 0`; nothing is drawn in that case.
    fn next_bounded_int(&mut self, bound: i32) -> Result<i32> {
        if bound <= 0 {
            return Err(Error::invalid_argument(format!(
                "bound must be positive, got {bound}"
            )));
        }
        Ok(draw_below(self, bound as u64) as i32)
    }

    /// Uniform long in `[0, bound)` by rejection sampling.
    ///
    /// # Errors
    /// [`Error::InvalidArgument`] if `bound <= 0`; nothing is drawn in that case.
    fn next_bounded_long(&mut self, bound: i64) -> Result<i64> {
        if bound <= 0 {
            return Err(Error::invalid_argument(format!(
                "bound must be positive, got {bound}"
            )));
        }
        Ok(draw_below(self, bound as u64) as i64)
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for slot in dest.iter_mut() {
            *slot = self.next_byte();
        }
    }

    fn next_bytes(&mut self, n: usize) -> Vec<u8> {
        let mut bytes = vec![0u8; n];
        self.fill_bytes(&mut bytes);
        bytes
    }

    fn next_ints(&mut self, n: usize) -> Vec<i32> {
        (0..n).map(|_| self.next_int()).collect()
    }

    fn next_longs(&mut self, n: usize) -> Vec<i64> {
        (0..n).map(|_| self.next_long()).collect()
    }

    fn next_doubles01(&mut self, n: usize) -> Vec<f64> {
        (0..n).map(|_| self.next_double01()).collect()
    }
}

/// Minimal bit width `w` such that `2^w > value`.
pub fn required_bits(value: u64) -> u32 {
    u64::BITS - value.leading_zeros()
}

/// Draw `width` bits (at most 64) as an unsigned integer, first bit most significant.
pub(crate) fn draw_bits<S: BitSource + ?Sized>(source: &mut S, width: u32) -> u64 {
    (0..width).fold(0u64, |acc, _| (acc << 1) | source.next_bit() as u64)
}

/// Rejection-sample a value in `[0, bound)`. `bound` must be at least 1.
pub(crate) fn draw_below<S: BitSource + ?Sized>(source: &mut S, bound: u64) -> u64 {
    debug_assert!(bound >= 1);
    let width = required_bits(bound - 1);
    loop {
        let candidate = draw_bits(source, width);
        if candidate < bound {
            return candidate;
        }
    }
}

// ---------------------------------------------------------------------------
// Boxed, cloneable sources
// ---------------------------------------------------------------------------

/// Object-safe extension for bit sources that can be deep-copied behind a box.
///
/// Implemented automatically for every `BitSource + Clone + Send`.
pub trait CloneSource: BitSource + Send {
    fn clone_boxed(&self) -> Box<dyn CloneSource>;
}

impl<T: BitSource + Clone + Send + 'static> CloneSource for T {
    fn clone_boxed(&self) -> Box<dyn CloneSource> {
        Box::new(self.clone())
    }
}

/// A heterogeneous, owned, cloneable bit source.
pub type DynSource = Box<dyn CloneSource>;

impl Clone for Box<dyn CloneSource> {
    fn clone(&self) -> Self {
        (**self).clone_boxed()
    }
}

impl BitSource for Box<dyn CloneSource> {
    fn next_bit(&mut self) -> bool {
        (**self).next_bit()
    }

    fn is_pseudo(&self) -> bool {
        (**self).is_pseudo()
    }
}

// ---------------------------------------------------------------------------
// rand interop
// ---------------------------------------------------------------------------

/// Exposes any [`BitSource`] as a [`rand::RngCore`].
#[derive(Debug, Clone)]
pub struct SourceRng<S>(pub S);

impl<S: BitSource> rand::RngCore for SourceRng<S> {
    fn next_u32(&mut self) -> u32 {
        self.0.next_int() as u32
    }

    fn next_u64(&mut self) -> u64 {
        self.0.next_long() as u64
    }

    fn fill_bytes(&mut self, dst: &mut [u8]) {
        self.0.fill_bytes(dst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Replays a fixed bit pattern forever.
    #[derive(Clone)]
    struct Script {
        bits: Vec<bool>,
        at: usize,
    }

    impl Script {
        fn new(pattern: &str) -> Self {
            Self {
                bits: pattern.chars().map(|c| c == '1').collect(),
                at: 0,
            }
        }
    }

    impl BitSource for Script {
        fn next_bit(&mut self) -> bool {
            let bit = self.bits[self.at % self.bits.len()];
            self.at += 1;
            bit
        }

        fn is_pseudo(&self) -> bool {
            true
        }
    }

    #[test]
    fn required_bits_edges() {
        assert_eq!(required_bits(0), 0);
        assert_eq!(required_bits(1), 1);
        assert_eq!(required_bits(2), 2);
        assert_eq!(required_bits(16), 5);
        assert_eq!(required_bits(u64::MAX), 64);
    }

    #[test]
    fn byte_and_int_order() {
        let mut s = Script::new("10000000000000010000000000000000");
        assert_eq!(s.next_int(), 0x8001_0000u32 as i32);
        let mut s = Script::new("11000000");
        assert_eq!(s.next_byte(), 0xC0);
    }

    #[test]
    fn bound_one_consumes_nothing() {
        let mut s = Script::new("1");
        assert_eq!(s.next_bounded_int(1).unwrap(), 0);
        assert_eq!(s.at, 0);
    }

    #[test]
    fn rejection_redraws_out_of_range() {
        // bound 5 needs 3 bits: 111 (7) and 110 (6) are rejected, then 011 (3).
        let mut s = Script::new("111110011");
        assert_eq!(s.next_bounded_int(5).unwrap(), 3);
        assert_eq!(s.at, 9);
    }

    #[test]
    fn non_positive_bound_is_rejected_before_drawing() {
        let mut s = Script::new("1");
        assert!(matches!(s.next_bounded_int(0), Err(Error::InvalidArgument(_))));
        assert!(matches!(s.next_bounded_long(-3), Err(Error::InvalidArgument(_))));
        assert_eq!(s.at, 0);
    }

    #[test]
    fn double_never_reaches_one_even_from_all_ones() {
        // All-ones would otherwise encode exponent 1023; the resampling loop
        // needs a byte outside [0xF0, 0xFF] so feed a pattern that offers one.
        let mut s = Script::new(&("1".repeat(62) + &"0".repeat(8)));
        let d = s.next_double01();
        assert!((0.0..1.0).contains(&d), "got {d}");
    }

    #[test]
    fn float_from_all_ones_stays_below_one() {
        let mut s = Script::new(&("1".repeat(30) + "0"));
        for _ in 0..50 {
            let f = s.next_float01();
            assert!((0.0..1.0).contains(&f), "got {f}");
        }
    }

    #[test]
    fn boxed_sources_clone_deeply() {
        let mut a: DynSource = Box::new(Script::new("0110"));
        a.next_bit();
        let mut b = a.clone();
        assert_eq!(a.next_bits(8), b.next_bits(8));
        assert!(b.is_pseudo());
    }

    #[test]
    fn source_rng_bridges_rand() {
        use rand::RngCore;
        let mut rng = SourceRng(Script::new("1"));
        assert_eq!(rng.next_u32(), u32::MAX);
        let mut buf = [0u8; 3];
        rng.fill_bytes(&mut buf);
        assert_eq!(buf, [0xFF; 3]);
    }
}
