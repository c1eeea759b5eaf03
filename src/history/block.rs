//! Padded raw state buffers for word-granularity scanning.
//!
//! Each block stores one complete serialized emulation state, word-rounded,
//! followed by a fixed padding tail: three zero words, one sentinel word
//! derived from the allocation tag, and eight more zero words. Two blocks
//! carrying different tags therefore always differ at or before the
//! sentinel, so `codec::scan::find_change` over a pair of blocks terminates
//! inside the padding even when every logical word matches, and
//! `find_same`'s pair-wise scan always finds an equal zero pair there.

use crate::RewindError;

/// Padding words appended past the logical end of every block.
pub const PAD_WORDS: usize = 12;

/// Word offset of the sentinel within the padding tail.
const SENTINEL_AT: usize = 3;

/// One raw state buffer, exclusively owned by a `StateLog` and rotated
/// between the "last committed" and "write scratch" roles by index, never
/// by copying.
#[derive(Debug)]
pub struct StateBlock {
    words: Vec<u16>,
    logical_words: usize,
}

impl StateBlock {
    /// Allocates a zeroed block for `len_bytes` of state, rounded up to a
    /// word boundary, with the padding tail and a `tag`-derived sentinel.
    /// Blocks built with distinct tags have distinct sentinel words.
    pub fn allocate(len_bytes: usize, tag: u16) -> Result<Self, RewindError> {
        let logical_words = len_bytes.div_ceil(2);
        let total = logical_words + PAD_WORDS;

        let mut words = Vec::new();
        words.try_reserve_exact(total)?;
        words.resize(total, 0);
        words[logical_words + SENTINEL_AT] = !tag;

        Ok(Self {
            words,
            logical_words,
        })
    }

    /// Logical content as bytes (word-rounded length).
    pub fn as_bytes(&self) -> &[u8] {
        &bytemuck::cast_slice(&self.words)[..self.logical_words * 2]
    }

    /// Mutable logical content as bytes.
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut bytemuck::cast_slice_mut(&mut self.words)[..self.logical_words * 2]
    }

    /// Full padded word storage, sentinel included, for scan and patch code.
    pub fn words(&self) -> &[u16] {
        &self.words
    }

    /// Mutable padded word storage.
    pub fn words_mut(&mut self) -> &mut [u16] {
        &mut self.words
    }

    /// Number of logical words the block holds.
    pub fn logical_words(&self) -> usize {
        self.logical_words
    }
}
