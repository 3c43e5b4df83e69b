//! Ensemble: several owned bit sources with a self-driven active member.
//!
//! Bits come from the active member. After every 81 or 82 units of usage
//! (one unit per bit, two for a `true` bit) the active member itself draws
//! the index of its successor.

use log::debug;

use crate::bit_source::{BitSource, DynSource, draw_below};
use crate::error::{Error, Result};
use crate::rolling::{Configuration, RollingAutomaton};

/// Bytes of seed material consumed per generated member.
const BYTES_PER_MEMBER: usize = 32;

/// A combinator over `S` members, heterogeneous by default.
#[derive(Debug, Clone)]
pub struct Ensemble<S = DynSource> {
    members: Vec<S>,
    active: usize,
    counter: u32,
}

impl<S: BitSource> Ensemble<S> {
    /// # Errors
    /// [`Error::InvalidArgument`] if `members` is empty.
    pub fn new(members: Vec<S>) -> Result<Self> {
        if members.is_empty() {
            return Err(Error::invalid_argument("an ensemble needs at least one member"));
        }
        Ok(Self {
            members,
            active: 0,
            counter: 0,
        })
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Index of the member currently supplying bits.
    pub fn active(&self) -> usize {
        self.active
    }

    pub fn members(&self) -> &[S] {
        &self.members
    }
}

impl Ensemble<RollingAutomaton> {
    /// One rolling automaton per started 32-byte block of `bytes`.
    ///
    /// A short final block is zero-padded. Each member is seeded from eight
    /// big-endian 32-bit words.
    ///
    /// # Errors
    /// [`Error::InvalidArgument`] if `bytes` is empty.
    pub fn from_bytes(config: Configuration, bytes: &[u8]) -> Result<Self> {
        let members = bytes
            .chunks(BYTES_PER_MEMBER)
            .map(|chunk| {
                let mut block = [0u8; BYTES_PER_MEMBER];
                block[..chunk.len()].copy_from_slice(chunk);
                let mut words = [0i32; 8];
                for (word, raw) in words.iter_mut().zip(block.chunks_exact(4)) {
                    *word = i32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]);
                }
                RollingAutomaton::from_ints(words, config)
            })
            .collect();
        Self::new(members)
    }

    /// At least one member (`count` of zero still yields one), each seeded
    /// from eight ints drawn from `seeder`. Draws the same stream as
    /// [`from_bytes`](Self::from_bytes) over `seeder.next_bytes(count * 32)`.
    pub(crate) fn drawn_from<B: BitSource>(seeder: &mut B, config: Configuration, count: usize) -> Self {
        let members = (0..count.max(1))
            .map(|_| RollingAutomaton::from_ints(std::array::from_fn(|_| seeder.next_int()), config))
            .collect();
        Self {
            members,
            active: 0,
            counter: 0,
        }
    }
}

impl<S: BitSource> BitSource for Ensemble<S> {
    fn next_bit(&mut self) -> bool {
        let result = self.members[self.active].next_bit();
        self.counter += 1;
        if result {
            self.counter += 1;
        }
        if self.counter == 81 || self.counter == 82 {
            let count = self.members.len() as u64;
            let next = draw_below(&mut self.members[self.active], count) as usize;
            debug!("ensemble switching member {} -> {next}", self.active);
            self.active = next;
            self.counter = 0;
        }
        result
    }

    /// `true` only when every member is pseudo.
    fn is_pseudo(&self) -> bool {
        self.members.iter().all(BitSource::is_pseudo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ConstantSource;

    /// Pseudo or not on demand; alternates bits.
    #[derive(Clone)]
    struct Flagged {
        pseudo: bool,
        state: bool,
    }

    impl BitSource for Flagged {
        fn next_bit(&mut self) -> bool {
            self.state = !self.state;
            self.state
        }

        fn is_pseudo(&self) -> bool {
            self.pseudo
        }
    }

    fn flagged(pseudo: bool) -> DynSource {
        Box::new(Flagged {
            pseudo,
            state: false,
        })
    }

    #[test]
    fn empty_ensemble_is_rejected() {
        let err = Ensemble::<RollingAutomaton>::new(Vec::new()).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        assert!(Ensemble::from_bytes(Configuration::HEAVY, &[]).is_err());
    }

    #[test]
    fn is_pseudo_is_a_logical_and() {
        let all = Ensemble::new(vec![flagged(true), flagged(true), flagged(true)]).unwrap();
        assert!(all.is_pseudo());

        let one_off = Ensemble::new(vec![flagged(true), flagged(false), flagged(true)]).unwrap();
        assert!(!one_off.is_pseudo());
    }

    #[test]
    fn member_count_follows_byte_blocks() {
        assert_eq!(Ensemble::from_bytes(Configuration::HEAVY, &[7; 128]).unwrap().len(), 4);
        assert_eq!(Ensemble::from_bytes(Configuration::HEAVY, &[7; 640]).unwrap().len(), 20);
        assert_eq!(Ensemble::from_bytes(Configuration::HEAVY, &[7; 33]).unwrap().len(), 2);
    }

    #[test]
    fn switch_happens_at_threshold() {
        // All-true members count two per bit, so the counter hits 82 on bit 41.
        let members: Vec<DynSource> = (0..4).map(|_| Box::new(ConstantSource) as DynSource).collect();
        let mut ensemble = Ensemble::new(members).unwrap();
        for _ in 0..40 {
            ensemble.next_bit();
        }
        assert_eq!(ensemble.counter, 80);
        ensemble.next_bit();
        assert_eq!(ensemble.counter, 0);
        // A constant-true source draws 11 (3) for bound 4.
        assert_eq!(ensemble.active(), 3);
    }

    #[test]
    fn clone_is_deep_and_deterministic() {
        let mut a = Ensemble::from_bytes(Configuration::MEDIUM, &[0xA5; 96]).unwrap();
        a.next_bits(500);
        let mut b = a.clone();
        assert_eq!(a.next_bits(3_000), b.next_bits(3_000));
        assert_eq!(a.active(), b.active());
    }

    #[test]
    fn drawn_members_match_byte_seeding() {
        let mut seeder = RollingAutomaton::from_seed(3, Configuration::LIGHT);
        let mut twin = seeder.clone();
        let mut drawn = Ensemble::drawn_from(&mut seeder, Configuration::HEAVY, 4);
        let material = twin.next_bytes(4 * BYTES_PER_MEMBER);
        let mut bytes = Ensemble::from_bytes(Configuration::HEAVY, &material).unwrap();
        assert_eq!(drawn.len(), 4);
        assert_eq!(drawn.next_bits(500), bytes.next_bits(500));
        assert_eq!(seeder.next_long(), twin.next_long());
    }

    #[test]
    fn drawn_ensemble_is_never_empty() {
        let mut seeder = ConstantSource;
        assert_eq!(Ensemble::drawn_from(&mut seeder, Configuration::LIGHT, 0).len(), 1);
    }

    #[test]
    fn single_member_ensemble_works() {
        let mut solo = Ensemble::from_bytes(Configuration::LIGHT, &[1, 2, 3]).unwrap();
        let bits = solo.next_bits(1_000);
        assert_eq!(solo.active(), 0);
        assert!(bits.iter().any(|&b| b) && bits.iter().any(|&b| !b));
    }
}
