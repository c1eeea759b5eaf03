//! Run-length delta codec over 16-bit words.
//!
//! Emulated memory regions overwhelmingly change in even-aligned word units,
//! so diffing at `u16` granularity halves the number of run boundaries
//! relative to byte diffing. `scan` holds the forward scan primitives and
//! `patch` the compress/decompress pair built on top of them.

pub mod patch;
pub mod scan;
