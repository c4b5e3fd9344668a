//! Packed bit set over 64-bit words.
//!
//! The table-1 survivor filter is persisted as raw `u64` words in the
//! phase-2 checkpoint, so the word layout here *is* the wire layout:
//! bit `i` lives in word `i / 64` at bit position `i % 64`.

pub const BITS_PER_WORD: usize = 64;

/// A fixed-length bit set.
///
/// Reconstructed from checkpoint words the length is always a multiple
/// of 64; a freshly allocated bitfield keeps the exact bit count it was
/// created with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitfield {
    words: Vec<u64>,
    bits: usize,
}

impl Bitfield {
    /// Allocate a zeroed bitfield of `bits` bits.
    #[must_use]
    pub fn new(bits: usize) -> Self {
        let words = vec![0u64; bits.div_ceil(BITS_PER_WORD)];
        Self { words, bits }
    }

    /// Rebuild a bitfield from persisted words. The bit count is
    /// `words.len() * 64`.
    #[must_use]
    pub fn from_words(words: Vec<u64>) -> Self {
        let bits = words.len() * BITS_PER_WORD;
        Self { words, bits }
    }

    /// Set bit `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range; callers size the filter to the
    /// table's entry count up front.
    pub fn set(&mut self, index: usize) {
        assert!(index < self.bits, "bit index {index} out of range {}", self.bits);
        self.words[index / BITS_PER_WORD] |= 1u64 << (index % BITS_PER_WORD);
    }

    /// Whether bit `index` is set. Out-of-range bits read as unset.
    #[must_use]
    pub fn get(&self, index: usize) -> bool {
        if index >= self.bits {
            return false;
        }
        self.words[index / BITS_PER_WORD] & (1u64 << (index % BITS_PER_WORD)) != 0
    }

    /// Number of bits in the field.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bits
    }

    /// Whether the field holds zero bits.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    /// Total number of set bits.
    #[must_use]
    pub fn count_set(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// The backing words, in wire order.
    #[must_use]
    pub fn words(&self) -> &[u64] {
        &self.words
    }

    /// Physical index of the `rank`-th set bit (0-based), scanning from
    /// bit `start_bit`. Returns `None` when fewer than `rank + 1` set
    /// bits remain.
    #[must_use]
    pub fn select_from(&self, start_bit: usize, mut rank: usize) -> Option<usize> {
        let mut bit = start_bit;
        while bit < self.bits {
            let word_idx = bit / BITS_PER_WORD;
            // Mask off bits below the scan position within this word.
            let mut word = self.words[word_idx] & (u64::MAX << (bit % BITS_PER_WORD));
            let ones = word.count_ones() as usize;
            if rank >= ones {
                rank -= ones;
                bit = (word_idx + 1) * BITS_PER_WORD;
                continue;
            }
            // The answer is inside this word.
            for _ in 0..rank {
                word &= word - 1; // clear lowest set bit
            }
            let found = word_idx * BITS_PER_WORD + word.trailing_zeros() as usize;
            return (found < self.bits).then_some(found);
        }
        None
    }
}
