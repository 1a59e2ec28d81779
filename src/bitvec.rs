//! Fixed-length bit vector packed into u64 words.

use num_integer::Integer;
use serde::{Deserialize, Serialize};

use crate::error::{CipherError, Result};

/// `nbits` bits, bit `b` stored at `(words[b / 64] >> (b % 64)) & 1`.
///
/// The backing words are kept exactly as supplied, including any stray bits
/// past `nbits` in the last word, so a vector read from disk is written back
/// unchanged. Those trailing bits are never addressed and never compared.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct BitVector {
    nbits: usize,
    words: Vec<u64>,
}

/// Words needed to hold `nbits` bits.
#[inline]
pub(crate) fn word_count(nbits: usize) -> usize {
    Integer::div_ceil(&nbits, &64)
}

impl BitVector {
    /// Zeroed vector of `nbits` bits.
    #[must_use]
    pub fn make(nbits: usize) -> Self {
        Self {
            nbits,
            words: vec![0; word_count(nbits)],
        }
    }

    /// Wraps raw words, truncating or zero-extending to `ceil(nbits / 64)`.
    #[must_use]
    pub fn from_words(nbits: usize, mut words: Vec<u64>) -> Self {
        words.resize(word_count(nbits), 0);
        Self { nbits, words }
    }

    /// The low `nbits` bits of `x` (`nbits` ≤ 128 keeps every bit of `x`
    /// that fits).
    #[must_use]
    pub fn from_low_bits(nbits: usize, x: u128) -> Self {
        let mut v = Self::make(nbits);
        for (i, w) in v.words.iter_mut().take(2).enumerate() {
            *w = (x >> (64 * i)) as u64;
        }
        v.clear_tail();
        v
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nbits
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nbits == 0
    }

    /// Backing words, verbatim.
    #[must_use]
    pub fn words(&self) -> &[u64] {
        &self.words
    }

    /// Reads bit `i`.
    ///
    /// # Errors
    /// [`CipherError::Index`] if `i >= len()`.
    pub fn get(&self, i: usize) -> Result<bool> {
        self.check(i)?;
        Ok((self.words[i / 64] >> (i % 64)) & 1 == 1)
    }

    /// Bit `i`, or `false` when `i` is out of range.
    #[must_use]
    pub fn get_or_zero(&self, i: usize) -> bool {
        self.get(i).unwrap_or(false)
    }

    /// Writes bit `i`.
    ///
    /// # Errors
    /// [`CipherError::Index`] if `i >= len()`.
    pub fn set(&mut self, i: usize, bit: bool) -> Result<()> {
        self.check(i)?;
        let mask = 1u64 << (i % 64);
        if bit {
            self.words[i / 64] |= mask;
        } else {
            self.words[i / 64] &= !mask;
        }
        Ok(())
    }

    /// Number of set bits among the addressed ones.
    #[must_use]
    pub fn count_ones(&self) -> usize {
        (0..self.words.len())
            .map(|i| self.masked_word(i).count_ones() as usize)
            .sum()
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        (0..self.words.len()).all(|i| self.masked_word(i) == 0)
    }

    /// `self ⊕ other`, with the length of `self`; bits of `other` past its own
    /// length read as zero.
    #[must_use]
    pub fn xor(&self, other: &Self) -> Self {
        self.zip_with(other, |a, b| a ^ b)
    }

    /// `self ∧ other`.
    #[must_use]
    pub fn and(&self, other: &Self) -> Self {
        self.zip_with(other, |a, b| a & b)
    }

    /// `self ∧ ¬other`.
    #[must_use]
    pub fn and_not(&self, other: &Self) -> Self {
        self.zip_with(other, |a, b| a & !b)
    }

    /// Inner product over GF(2).
    #[must_use]
    pub fn parity_dot(&self, other: &Self) -> bool {
        let n = self.words.len().min(other.words.len());
        let ones: u32 = (0..n)
            .map(|i| (self.masked_word(i) & other.masked_word(i)).count_ones())
            .sum();
        ones & 1 == 1
    }

    fn zip_with(&self, other: &Self, f: impl Fn(u64, u64) -> u64) -> Self {
        let words = (0..self.words.len())
            .map(|i| {
                let b = if i < other.words.len() { other.masked_word(i) } else { 0 };
                f(self.masked_word(i), b)
            })
            .collect();
        let mut out = Self { nbits: self.nbits, words };
        out.clear_tail();
        out
    }

    /// Word `i` with the bits past `nbits` cleared.
    fn masked_word(&self, i: usize) -> u64 {
        let w = self.words[i];
        let rem = self.nbits % 64;
        if i + 1 == self.words.len() && rem != 0 {
            w & ((1u64 << rem) - 1)
        } else {
            w
        }
    }

    /// Same vector with the stray bits past `nbits` cleared.
    #[must_use]
    pub(crate) fn without_tail(mut self) -> Self {
        self.clear_tail();
        self
    }

    fn clear_tail(&mut self) {
        if let Some(last) = self.words.len().checked_sub(1) {
            self.words[last] = self.masked_word(last);
        }
    }

    fn check(&self, i: usize) -> Result<()> {
        if i >= self.nbits {
            return Err(CipherError::Index {
                index: i,
                len: self.nbits,
            });
        }
        Ok(())
    }
}

impl PartialEq for BitVector {
    fn eq(&self, other: &Self) -> bool {
        self.nbits == other.nbits
            && (0..self.words.len()).all(|i| self.masked_word(i) == other.masked_word(i))
    }
}

impl Eq for BitVector {}
