//! Compress/decompress pair for word-granularity state deltas.
//!
//! A patch is a sequence of records, each a little-endian
//! `(changed: u16, skip: u16)` pair followed by `changed` literal words:
//! skip that many unchanged words, then overwrite the next `changed` words.
//! A record with `changed == 0` instead carries a 32-bit skip count (low
//! word first) for unchanged runs past 65535 words; when that count is also
//! zero the record is the terminator. Applying a patch to a buffer holding
//! the basis content rewrites it into the target content.
//!
//! Nothing here allocates. Inputs of mismatched length are a caller bug:
//! both buffers must cover `len` words and the patch destination must be
//! sized with [`max_patch_size`]. That invariant is asserted in debug
//! builds only, since these run per frame.

use crate::codec::scan::{find_change, find_same};

// Byte widths of a record header and of the triple-u16 wide/terminator
// records.
const RECORD_HEADER: usize = 4;
const TERMINATOR: usize = 6;

/// Worst-case patch size for a state of `len_bytes` bytes.
///
/// Every word changed, one record header per 65535-word run, plus the
/// terminator. Callers must size compression destinations with this.
pub fn max_patch_size(len_bytes: usize) -> usize {
    // Bytes one maximal changed record can cover
    const RECORD_COVER: usize = u16::MAX as usize * 2;
    let rounded = len_bytes + (len_bytes & 1);
    let records = len_bytes.div_ceil(RECORD_COVER);
    rounded + records * RECORD_HEADER + TERMINATOR
}

/// Compresses the difference between `basis` and `target` into `patch`.
///
/// Only the first `len` words of each input participate; both slices may
/// extend further (padded state blocks do). Returns the number of patch
/// bytes written, terminator included. Decompressing the result against a
/// buffer pre-seeded with `basis` content yields `target` exactly.
pub fn compress_into(basis: &[u16], target: &[u16], len: usize, patch: &mut [u8]) -> usize {
    debug_assert!(len <= basis.len() && len <= target.len());
    debug_assert!(patch.len() >= max_patch_size(len * 2));

    let mut pos = 0;
    let mut out = 0;

    while pos < len {
        let skip = find_change(&basis[pos..], &target[pos..]);
        if skip >= len - pos {
            break;
        }

        if skip > u16::MAX as usize {
            // Wide skip record. Runs past u32::MAX words advance only by
            // the encoded amount and re-scan the remainder next pass.
            let wide = skip.min(u32::MAX as usize);
            put_u16(patch, out, 0);
            put_u16(patch, out + 2, wide as u16);
            put_u16(patch, out + 4, (wide >> 16) as u16);
            out += TERMINATOR;
            pos += wide;
            continue;
        }
        pos += skip;

        let changed = find_same(&basis[pos..], &target[pos..])
            .min(len - pos)
            .min(u16::MAX as usize);

        put_u16(patch, out, changed as u16);
        put_u16(patch, out + 2, skip as u16);
        out += RECORD_HEADER;

        let literals = &mut patch[out..out + changed * 2];
        for (chunk, &word) in literals.chunks_exact_mut(2).zip(&target[pos..pos + changed]) {
            chunk.copy_from_slice(&word.to_le_bytes());
        }
        out += changed * 2;
        pos += changed;
    }

    patch[out..out + TERMINATOR].fill(0);
    out + TERMINATOR
}

/// Replays `patch` onto `out`, which must be pre-seeded with the basis
/// content: skip records keep what is already there, changed records
/// overwrite. Stops at the terminator record.
pub fn decompress_into(patch: &[u8], out: &mut [u16]) {
    let mut pos = 0;
    let mut at = 0;

    loop {
        let changed = get_u16(patch, pos) as usize;
        pos += 2;

        if changed > 0 {
            at += get_u16(patch, pos) as usize;
            pos += 2;

            let literals = &patch[pos..pos + changed * 2];
            for (word, chunk) in out[at..at + changed].iter_mut().zip(literals.chunks_exact(2)) {
                *word = u16::from_le_bytes([chunk[0], chunk[1]]);
            }
            pos += changed * 2;
            at += changed;
        } else {
            let lo = get_u16(patch, pos) as u32;
            let hi = get_u16(patch, pos + 2) as u32;
            pos += 4;
            if lo == 0 && hi == 0 {
                break;
            }
            at += ((hi << 16) | lo) as usize;
        }
    }
}

fn put_u16(buf: &mut [u8], pos: usize, v: u16) {
    buf[pos..pos + 2].copy_from_slice(&v.to_le_bytes());
}

fn get_u16(buf: &[u8], pos: usize) -> u16 {
    u16::from_le_bytes([buf[pos], buf[pos + 1]])
}
