//! Thin bit sources: a periodic proxy, a constant source and a bridge from
//! the `rand` ecosystem.

use log::trace;
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};

use crate::bit_source::BitSource;
use crate::error::{Error, Result};

/// Always yields `true`. Useful for exercising edge cases, never for randomness.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConstantSource;

impl BitSource for ConstantSource {
    fn next_bit(&mut self) -> bool {
        true
    }

    fn is_pseudo(&self) -> bool {
        true
    }
}

/// Replays a block of bits drawn from a backing source.
///
/// Each buffered bit is served once per cycle. After `period` complete
/// cycles the block is redrawn from the backer.
#[derive(Debug, Clone)]
pub struct BufferedSource<S> {
    backer: S,
    block: Vec<bool>,
    period: usize,
    cycles: usize,
    at: usize,
}

impl<S: BitSource> BufferedSource<S> {
    /// Draws the first block immediately.
    ///
    /// # Errors
    /// [`Error::InvalidArgument`] if `block_size` or `period` is zero.
    pub fn new(mut backer: S, block_size: usize, period: usize) -> Result<Self> {
        if block_size == 0 {
            return Err(Error::invalid_argument("block size must be at least 1"));
        }
        if period == 0 {
            return Err(Error::invalid_argument("refill period must be at least 1"));
        }
        let block = backer.next_bits(block_size);
        Ok(Self {
            backer,
            block,
            period,
            cycles: 0,
            at: 0,
        })
    }

    pub fn backer(&self) -> &S {
        &self.backer
    }

    pub fn block(&self) -> &[bool] {
        &self.block
    }
}

impl<S: BitSource> BitSource for BufferedSource<S> {
    fn next_bit(&mut self) -> bool {
        if self.at == self.block.len() {
            self.at = 0;
            self.cycles += 1;
            if self.cycles >= self.period {
                trace!("refilling {}-bit block after {} cycles", self.block.len(), self.cycles);
                for slot in self.block.iter_mut() {
                    *slot = self.backer.next_bit();
                }
                self.cycles = 0;
            }
        }
        let bit = self.block[self.at];
        self.at += 1;
        bit
    }

    fn is_pseudo(&self) -> bool {
        self.backer.is_pseudo()
    }
}

/// Bit source backed by any [`rand::RngCore`].
#[derive(Debug, Clone)]
pub struct ForeignSource<R> {
    rng: R,
}

impl<R: RngCore + Clone> ForeignSource<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    pub fn into_inner(self) -> R {
        self.rng
    }
}

impl ForeignSource<StdRng> {
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    pub fn from_os_rng() -> Self {
        Self::new(StdRng::from_os_rng())
    }
}

impl<R: RngCore + Clone> BitSource for ForeignSource<R> {
    fn next_bit(&mut self) -> bool {
        self.rng.random()
    }

    fn is_pseudo(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rolling::{Configuration, RollingAutomaton};

    /// Yields 0, 1, 0, 1, ... and counts what it has handed out.
    #[derive(Clone, Default)]
    struct Alternating {
        drawn: usize,
    }

    impl BitSource for Alternating {
        fn next_bit(&mut self) -> bool {
            self.drawn += 1;
            self.drawn % 2 == 0
        }

        fn is_pseudo(&self) -> bool {
            false
        }
    }

    #[test]
    fn constant_is_all_ones() {
        let mut c = ConstantSource;
        assert_eq!(c.next_long(), -1);
        assert!(c.is_pseudo());
    }

    #[test]
    fn zero_sizes_are_rejected() {
        assert!(matches!(
            BufferedSource::new(ConstantSource, 0, 3),
            Err(Error::InvalidArgument(_))
        ));
        assert!(BufferedSource::new(ConstantSource, 3, 0).is_err());
    }

    #[test]
    fn each_bit_served_once_per_cycle() {
        let mut proxy = BufferedSource::new(Alternating::default(), 3, 2).unwrap();
        // Block is [0, 1, 0]; two cycles replay it, then a refill gives [1, 0, 1].
        let bits: Vec<u8> = proxy.next_bits(9).into_iter().map(u8::from).collect();
        assert_eq!(bits, [0, 1, 0, 0, 1, 0, 1, 0, 1]);
        assert_eq!(proxy.backer().drawn, 6);
    }

    #[test]
    fn period_one_refills_every_cycle() {
        let mut proxy = BufferedSource::new(Alternating::default(), 4, 1).unwrap();
        proxy.next_bits(12);
        assert_eq!(proxy.backer().drawn, 12);
    }

    #[test]
    fn buffered_pseudo_follows_backer() {
        let proxy = BufferedSource::new(Alternating::default(), 2, 2).unwrap();
        assert!(!proxy.is_pseudo());
        let proxy = BufferedSource::new(RollingAutomaton::from_seed(1, Configuration::LIGHT), 8, 2).unwrap();
        assert!(proxy.is_pseudo());
    }

    #[test]
    fn buffered_clone_forks_backer_too() {
        let backer = RollingAutomaton::from_seed(5, Configuration::HEAVY);
        let mut a = BufferedSource::new(backer, 16, 3).unwrap();
        a.next_bits(20);
        let mut b = a.clone();
        assert_eq!(a.next_bits(500), b.next_bits(500));
    }

    #[test]
    fn foreign_seeded_is_reproducible() {
        let mut a = ForeignSource::seeded(7);
        let mut b = ForeignSource::seeded(7);
        assert_eq!(a.next_longs(16), b.next_longs(16));
        let mut c = a.clone();
        assert_eq!(a.next_bits(100), c.next_bits(100));
    }

    #[test]
    fn foreign_os_rng_produces_both_values() {
        let mut source = ForeignSource::from_os_rng();
        let bits = source.next_bits(256);
        assert!(bits.iter().any(|&b| b) && bits.iter().any(|&b| !b));
    }
}
