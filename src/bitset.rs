//! Compact bitset over leaf indices.
//!
//! # Overview
//! The distance kernel needs, for every edge, the set of leaves reachable
//! through that edge. With leaves mapped to compact indices `[0..n)` such a
//! set is one bit per leaf, stored in `u64` words: membership tests inside
//! the accumulation loops are a shift and a mask instead of a hash lookup.

/// A fixed-capacity set of leaf indices, one bit per index.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Bitset(pub Vec<u64>);

impl Bitset {
    /// Creates an empty bitset of `words` u64 words (capacity `64 × words`
    /// indices; use `n.div_ceil(64)` for `n` leaves).
    pub fn zeros(words: usize) -> Self {
        Bitset(vec![0u64; words])
    }

    /// Marks index `idx` as present.
    #[inline]
    pub fn set(&mut self, idx: usize) {
        let word = idx >> 6;
        let bit = idx & 63;
        self.0[word] |= 1u64 << bit;
    }

    /// Whether index `idx` is present.
    #[inline]
    pub fn contains(&self, idx: usize) -> bool {
        let word = idx >> 6;
        let bit = idx & 63;
        (self.0[word] >> bit) & 1 != 0
    }

    /// Number of set bits.
    #[inline]
    pub fn count_ones(&self) -> usize {
        self.0.iter().map(|w| w.count_ones() as usize).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_contains() {
        let mut bs = Bitset::zeros(1);
        bs.set(0);
        bs.set(5);
        assert!(bs.contains(0));
        assert!(!bs.contains(1));
        assert!(bs.contains(5));
        assert_eq!(bs.count_ones(), 2);
    }

    #[test]
    fn crosses_word_boundaries() {
        let mut bs = Bitset::zeros(2);
        bs.set(63);
        bs.set(64);
        bs.set(127);
        assert!(bs.contains(63));
        assert!(bs.contains(64));
        assert!(bs.contains(127));
        assert!(!bs.contains(65));
        assert_eq!(bs.count_ones(), 3);
    }
}
