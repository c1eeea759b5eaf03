//! Rewind and state-delta compression primitives for emulator frontends.
//!
//! The crate keeps one uncompressed copy of the most recent emulation state
//! and a circular log of compressed word-granularity deltas between
//! consecutive frames, so a fixed byte budget holds minutes of rewind
//! history. `codec` holds the delta codec, `history` the state blocks and
//! the circular patch log, and `session` the per-frame facade an emulation
//! loop drives.

use std::collections::TryReserveError;

use thiserror::Error;

pub mod codec;
pub mod history;
pub mod session;

/// Error type for rewind subsystem construction.
///
/// Steady-state operations never fail: arena space is reclaimed by eviction
/// and running out of history is an ordinary status, so errors only arise
/// while building a [`history::log::StateLog`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RewindError {
    #[error("serialized state size must be nonzero")]
    ZeroStateSize,
    #[error("arena capacity {capacity} is below the {required}-byte minimum for this state size")]
    ArenaTooSmall { capacity: usize, required: usize },
    #[error("failed to reserve rewind memory: {0}")]
    Allocation(#[from] TryReserveError),
}
