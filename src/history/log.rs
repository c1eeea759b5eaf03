//! Circular log of compressed state patches.
//!
//! `StateLog` owns a single byte arena holding a chain of variable-length
//! patch records plus two raw [`StateBlock`]s: `this` (the last committed
//! state, uncompressed) and `next` (the scratch target for the incoming
//! one). Committing compresses the delta between them, appends it, and
//! swaps the block roles; popping either hands back `this` directly or
//! replays the newest patch onto it to step one state further into the
//! past.
//!
//! Each arena record is `[forward link][patch bytes][back link]`, where the
//! links are 8-byte little-endian byte offsets: the forward link (written
//! once the record is sealed) names the next record's start and the back
//! link names this record's own start, so the chain walks both ways without
//! an index. `head` is the next record start, `tail` the oldest retained
//! record. Offsets, not pointers; all wraparound is modulo arithmetic.
//!
//! Invariants:
//! - The free span between `head` and `tail` stays above `max_comp_size`,
//!   restored by evicting the oldest records before each append.
//! - `head` always has one worst-case record of contiguous space before the
//!   physical end; a record whose tail would encroach on that margin parks
//!   its back link at offset 0 and wraps `head` to the arena start instead
//!   of splitting.
//! - The `this` block always reflects the state exactly one pop behind
//!   `head`, so each stored patch applies cleanly to its successor state.
//! - `entries` equals retained patches plus one when `this` is valid.

use crate::codec::patch::{compress_into, decompress_into, max_patch_size};
use crate::history::block::StateBlock;
use crate::RewindError;

/// Byte width of one record link.
const LINK: usize = std::mem::size_of::<u64>();

/// Circular log buffer manager for state snapshots.
#[derive(Debug)]
pub struct StateLog {
    data: Vec<u8>,
    capacity: usize,
    head: usize,
    tail: usize,
    blocks: [StateBlock; 2],
    this: usize,
    state_words: usize,
    max_comp_size: usize,
    entries: usize,
    this_valid: bool,
}

impl StateLog {
    /// Builds a log for states of `state_size` bytes in an arena of
    /// `capacity` bytes.
    ///
    /// Fails on a zero state size, on a capacity below two worst-case patch
    /// records, or on allocation failure; any partial allocation is
    /// released before returning.
    pub fn new(state_size: usize, capacity: usize) -> Result<Self, RewindError> {
        if state_size == 0 {
            return Err(RewindError::ZeroStateSize);
        }

        let block_bytes = state_size + (state_size & 1);
        let max_comp_size = max_patch_size(block_bytes) + 2 * LINK;
        // Two worst-case records: one being written plus the headroom the
        // eviction policy preserves. Below this the wrap logic could land a
        // record on top of itself.
        let required = 2 * max_comp_size;
        if capacity < required {
            return Err(RewindError::ArenaTooSmall { capacity, required });
        }

        let mut data = Vec::new();
        data.try_reserve_exact(capacity)?;
        data.resize(capacity, 0);

        let blocks = array_init::try_array_init(|i| StateBlock::allocate(block_bytes, i as u16))?;

        Ok(Self {
            data,
            capacity,
            head: LINK,
            tail: LINK,
            blocks,
            this: 0,
            state_words: block_bytes / 2,
            max_comp_size,
            entries: 0,
            this_valid: false,
        })
    }

    /// Number of states currently retrievable through [`Self::pop_previous`].
    pub fn entries(&self) -> usize {
        self.entries
    }

    /// Logical bytes of the block holding the last committed (or last
    /// popped) state.
    pub fn current_block(&self) -> &[u8] {
        self.blocks[self.this].as_bytes()
    }

    /// Returns the scratch block for the caller to fill with a freshly
    /// serialized state, to be sealed by [`Self::commit_write_target`].
    ///
    /// If the log was popped dry, the most recent historical patch is first
    /// replayed so the upcoming commit has a valid state to diff against.
    pub fn reserve_write_target(&mut self) -> &mut [u8] {
        if !self.this_valid && self.pop_previous().is_some() {
            self.this_valid = true;
            self.entries += 1;
        }
        self.blocks[self.this ^ 1].as_bytes_mut()
    }

    /// Compresses the reserved state against the previous one, appends the
    /// patch (evicting the oldest records as needed), and swaps the block
    /// roles. The very first commit has nothing to diff against and only
    /// marks the state valid.
    pub fn commit_write_target(&mut self) {
        if self.this_valid {
            self.evict_headroom();

            let record_start = self.head;
            let patch_len = {
                let data = &mut self.data;
                let blocks = &self.blocks;
                // The stored patch rewrites the newer state into the older
                // one, so popping replays it onto the successor state.
                let basis = blocks[self.this ^ 1].words();
                let target = blocks[self.this].words();
                compress_into(
                    basis,
                    target,
                    self.state_words,
                    &mut data[record_start + LINK..],
                )
            };

            let mut link_pos = record_start + LINK + patch_len;
            if link_pos + self.max_comp_size > self.capacity {
                // Not enough room before the physical end for the next
                // record: park the back link at the start and wrap. A tail
                // sitting on the wrap target loses its record first.
                link_pos = 0;
                if self.tail == LINK {
                    self.tail = self.read_link(self.tail);
                    self.entries -= 1;
                }
            }
            self.write_link(link_pos, record_start);
            let new_head = link_pos + LINK;
            self.write_link(record_start, new_head);
            self.head = new_head;
        } else {
            self.this_valid = true;
        }

        self.this ^= 1;
        self.entries += 1;
    }

    /// Steps one state into the past, or `None` when the history is empty.
    ///
    /// The fast path returns the still-uncompressed `this` block and marks
    /// it consumed; afterwards each pop replays the patch behind `head`
    /// onto the block, retreating through the chain. The returned borrow is
    /// valid until the next call into the log.
    pub fn pop_previous(&mut self) -> Option<&[u8]> {
        if self.this_valid {
            self.this_valid = false;
            self.entries -= 1;
            return Some(self.blocks[self.this].as_bytes());
        }

        if self.head == self.tail {
            return None;
        }

        let record_start = self.read_link(self.head - LINK);
        self.head = record_start;
        self.entries -= 1;

        {
            let data = &self.data;
            let blocks = &mut self.blocks;
            decompress_into(&data[record_start + LINK..], blocks[self.this].words_mut());
        }
        Some(self.blocks[self.this].as_bytes())
    }

    /// Advances `tail` past the oldest records until one worst-case patch
    /// fits between `head` and `tail`.
    fn evict_headroom(&mut self) {
        loop {
            let remaining =
                (self.tail + self.capacity - LINK - self.head - 1) % self.capacity + 1;
            if remaining > self.max_comp_size {
                return;
            }
            self.tail = self.read_link(self.tail);
            self.entries -= 1;
        }
    }

    fn read_link(&self, pos: usize) -> usize {
        u64::from_le_bytes(self.data[pos..pos + LINK].try_into().unwrap()) as usize
    }

    fn write_link(&mut self, pos: usize, value: usize) {
        self.data[pos..pos + LINK].copy_from_slice(&(value as u64).to_le_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn push(log: &mut StateLog, state: &[u8]) {
        let target = log.reserve_write_target();
        target[..state.len()].copy_from_slice(state);
        log.commit_write_target();
    }

    fn state(seed: u8, len: usize) -> Vec<u8> {
        (0..len).map(|i| seed.wrapping_mul(31).wrapping_add(i as u8)).collect()
    }

    #[test]
    fn rejects_zero_state_size() {
        assert_eq!(
            StateLog::new(0, 4096).unwrap_err(),
            RewindError::ZeroStateSize
        );
    }

    #[test]
    fn rejects_an_arena_without_headroom() {
        // 16-byte states carry a 42-byte worst-case record; the arena must
        // hold two of them before any history fits.
        let err = StateLog::new(16, 80).unwrap_err();
        assert!(matches!(err, RewindError::ArenaTooSmall { .. }));
        assert!(StateLog::new(16, 84).is_ok());
    }

    #[test]
    fn first_commit_only_validates() {
        let mut log = StateLog::new(16, 4096).unwrap();
        assert_eq!(log.entries(), 0);
        assert!(log.pop_previous().is_none());

        push(&mut log, &state(1, 16));
        assert_eq!(log.entries(), 1);
        assert_eq!(log.current_block(), &state(1, 16)[..]);
    }

    #[test]
    fn pops_return_pushed_states_byte_for_byte() {
        let mut log = StateLog::new(32, 4096).unwrap();
        let states: Vec<_> = (0..5).map(|i| state(i, 32)).collect();
        for s in &states {
            push(&mut log, s);
        }

        for s in states.iter().rev() {
            assert_eq!(log.pop_previous().unwrap(), &s[..]);
        }
        assert!(log.pop_previous().is_none());
        assert_eq!(log.entries(), 0);
    }

    #[test]
    fn pop_then_push_interleaving() {
        let mut log = StateLog::new(16, 4096).unwrap();
        let (s1, s2, s3, s4) = (state(1, 16), state(2, 16), state(3, 16), state(4, 16));

        push(&mut log, &s1);
        push(&mut log, &s2);
        push(&mut log, &s3);

        // Fast path, then the decompression path.
        assert_eq!(log.pop_previous().unwrap(), &s3[..]);
        assert_eq!(log.pop_previous().unwrap(), &s2[..]);

        // Pushing here must rebuild a diff basis from the remaining patch.
        push(&mut log, &s4);

        assert_eq!(log.pop_previous().unwrap(), &s4[..]);
        assert_eq!(log.pop_previous().unwrap(), &s1[..]);
        assert!(log.pop_previous().is_none());
    }

    #[test]
    fn eviction_drops_the_oldest_and_keeps_the_rest_exact() {
        // Room for only a handful of worst-case records.
        let mut log = StateLog::new(16, 256).unwrap();
        let states: Vec<_> = (0..20).map(|i| state(i, 16)).collect();
        for s in &states {
            push(&mut log, s);
            assert!(log.entries() <= 20);
        }

        // Walk back: newest first, every retrieved state exact, and the
        // floor hit strictly before the full history.
        let mut retrieved = 0;
        let mut expect = states.len();
        while let Some(got) = log.pop_previous() {
            expect -= 1;
            assert_eq!(got, &states[expect][..], "state {expect} corrupted");
            retrieved += 1;
        }
        assert!(retrieved > 0);
        assert!(retrieved < states.len());
    }

    #[test]
    fn entries_match_what_pop_can_actually_reach() {
        let mut log = StateLog::new(16, 256).unwrap();
        let mut peak = 0;
        for i in 0..50 {
            push(&mut log, &state(i, 16));
            peak = peak.max(log.entries());
        }
        assert!(peak < 50);

        let counted = log.entries();
        let mut pops = 0;
        while log.pop_previous().is_some() {
            pops += 1;
        }
        assert_eq!(pops, counted);
    }

    #[test]
    fn survives_many_wraps() {
        let mut log = StateLog::new(24, 300).unwrap();
        for round in 0..40u8 {
            push(&mut log, &state(round, 24));
        }
        // Whatever survived must still replay exactly.
        let mut expect = 40;
        while let Some(got) = log.pop_previous() {
            expect -= 1;
            assert_eq!(got, &state(expect, 24)[..]);
        }
        assert!(expect < 40);
    }

    #[test]
    fn reserve_after_popping_dry_rebuilds_a_basis() {
        let mut log = StateLog::new(16, 4096).unwrap();
        push(&mut log, &state(1, 16));
        push(&mut log, &state(2, 16));

        assert_eq!(log.pop_previous().unwrap(), &state(2, 16)[..]);
        assert_eq!(log.pop_previous().unwrap(), &state(1, 16)[..]);
        assert!(log.pop_previous().is_none());

        // History is gone but the floor state is still the diff basis.
        push(&mut log, &state(9, 16));
        assert_eq!(log.pop_previous().unwrap(), &state(9, 16)[..]);
        assert!(log.pop_previous().is_none());
    }

    #[test]
    fn identical_consecutive_states_stay_cheap_and_correct() {
        let mut log = StateLog::new(64, 4096).unwrap();
        let s = state(7, 64);
        for _ in 0..30 {
            push(&mut log, &s);
        }
        // All-identical patches are terminator-sized, so nothing evicts.
        assert_eq!(log.entries(), 30);
        for _ in 0..30 {
            assert_eq!(log.pop_previous().unwrap(), &s[..]);
        }
        assert!(log.pop_previous().is_none());
    }
}
