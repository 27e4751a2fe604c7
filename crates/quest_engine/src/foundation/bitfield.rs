//! Fixed-width 96-bit flag sets
//!
//! A [`Bitfield`] tags a component type with a single bit and describes an
//! entity's capabilities as the union of the bits of everything attached to it.
//! Membership queries are plain word-wise mask tests.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// Number of 32-bit words in a bitfield
pub const BITFIELD_WORDS: usize = 3;

/// Total number of distinct flags a bitfield can hold
pub const BITFIELD_CAPACITY: u32 = (BITFIELD_WORDS as u32) * 32;

/// 96 independent flag slots stored as three 32-bit words
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Bitfield {
    words: [u32; BITFIELD_WORDS],
}

impl Bitfield {
    /// All-zero bitfield
    pub const fn empty() -> Self {
        Self { words: [0; BITFIELD_WORDS] }
    }

    /// Bitfield with exactly one bit set, or `None` past the capacity
    pub const fn single(bit: u32) -> Option<Self> {
        if bit >= BITFIELD_CAPACITY {
            return None;
        }
        let mut words = [0; BITFIELD_WORDS];
        words[(bit / 32) as usize] = 1 << (bit % 32);
        Some(Self { words })
    }

    /// Raw words, lowest first
    pub const fn words(&self) -> [u32; BITFIELD_WORDS] {
        self.words
    }

    /// OR `other` into this bitfield in place
    pub fn insert(&mut self, other: Self) {
        for (word, bits) in self.words.iter_mut().zip(other.words) {
            *word |= bits;
        }
    }

    /// Clear every bit of `other` in place
    pub fn remove(&mut self, other: Self) {
        for (word, bits) in self.words.iter_mut().zip(other.words) {
            *word &= !bits;
        }
    }

    /// True iff every bit set in `mask` is also set in `self`
    pub fn mask_test(&self, mask: Self) -> bool {
        self.words
            .iter()
            .zip(mask.words)
            .all(|(word, bits)| word & bits == bits)
    }

    /// True iff the two bitfields share at least one bit
    pub fn intersects(&self, other: Self) -> bool {
        self.words.iter().zip(other.words).any(|(word, bits)| word & bits != 0)
    }

    /// True when no bit is set
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|word| *word == 0)
    }

    /// Number of bits set
    pub fn count(&self) -> u32 {
        self.words.iter().map(|word| word.count_ones()).sum()
    }
}

impl BitOr for Bitfield {
    type Output = Self;

    fn bitor(mut self, rhs: Self) -> Self {
        self.insert(rhs);
        self
    }
}

impl BitOrAssign for Bitfield {
    fn bitor_assign(&mut self, rhs: Self) {
        self.insert(rhs);
    }
}

impl fmt::Debug for Bitfield {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Bitfield({:#010x}, {:#010x}, {:#010x})",
            self.words[0], self.words[1], self.words[2]
        )
    }
}

/// Hands out single-bit bitfields in allocation order
///
/// Bits are never reused while the allocator lives. Once all
/// [`BITFIELD_CAPACITY`] bits are taken every further request fails.
#[derive(Debug, Default)]
pub struct BitfieldAllocator {
    next: u32,
}

impl BitfieldAllocator {
    /// Create an allocator starting at bit zero
    pub const fn new() -> Self {
        Self { next: 0 }
    }

    /// Allocate the next unused bit
    pub fn next_bitfield(&mut self) -> Option<Bitfield> {
        let bitfield = Bitfield::single(self.next)?;
        self.next += 1;
        Some(bitfield)
    }

    /// Number of bits handed out so far
    pub const fn allocated(&self) -> u32 {
        self.next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_bits_land_in_the_right_word() {
        assert_eq!(Bitfield::single(0).unwrap().words(), [1, 0, 0]);
        assert_eq!(Bitfield::single(33).unwrap().words(), [0, 2, 0]);
        assert_eq!(Bitfield::single(95).unwrap().words(), [0, 0, 1 << 31]);
        assert!(Bitfield::single(96).is_none());
    }

    #[test]
    fn test_mask_test_subset_and_superset() {
        let mut allocator = BitfieldAllocator::new();
        let bits: Vec<Bitfield> = (0..40).map(|_| allocator.next_bitfield().unwrap()).collect();

        let mut entity = Bitfield::empty();
        for bit in &bits[..35] {
            entity.insert(*bit);
        }

        let query = bits[0] | bits[17] | bits[34];
        assert!(entity.mask_test(query));
        assert!(entity.mask_test(Bitfield::empty()));

        // Any extra type not on the entity fails the test
        assert!(!entity.mask_test(query | bits[39]));
    }

    #[test]
    fn test_allocator_capacity_is_enforced() {
        let mut allocator = BitfieldAllocator::new();
        for _ in 0..BITFIELD_CAPACITY {
            assert!(allocator.next_bitfield().is_some());
        }
        assert!(allocator.next_bitfield().is_none());
        assert_eq!(allocator.allocated(), BITFIELD_CAPACITY);
    }

    #[test]
    fn test_count_and_intersects() {
        let a = Bitfield::single(3).unwrap() | Bitfield::single(64).unwrap();
        let b = Bitfield::single(64).unwrap();
        assert_eq!(a.count(), 2);
        assert!(a.intersects(b));
        assert!(!b.intersects(Bitfield::single(3).unwrap()));
        assert!(Bitfield::empty().is_empty());
    }
}
