//! The rewind session driven once per emulated frame.

use crate::history::log::StateLog;
use crate::session::hooks::{ReplayRecorder, ReversalObserver, StateSource};
use crate::session::{FrameReport, RewindConfig, RewindStatus};

/// One rewind session, living exactly as long as the emulation session
/// that owns it.
///
/// A session that fails to initialize stays usable: every call reports
/// [`RewindStatus::Disabled`] and touches nothing. All other conditions are
/// reported by value; nothing in here panics on host input.
#[derive(Debug)]
pub struct RewindSession {
    log: Option<StateLog>,
    state_size: usize,
    frame_is_reverse: bool,
    frame_counter: u32,
}

impl RewindSession {
    /// Builds a session and seeds it with the host's current state.
    ///
    /// The subsystem is left disabled, with one diagnostic logged, when the
    /// host reports a zero state size or a threaded audio callback, when
    /// the arena cannot be built, or when the initial serialization fails.
    pub fn initialize<S: StateSource>(config: &RewindConfig, source: &mut S) -> Self {
        let mut session = Self {
            log: None,
            state_size: 0,
            frame_is_reverse: false,
            frame_counter: 0,
        };

        if source.audio_callback_active() {
            log::error!("rewind is not supported with a threaded audio callback");
            return session;
        }

        let state_size = source.state_size();
        if state_size == 0 {
            log::error!("core does not support save states, cannot use rewind");
            return session;
        }

        let mut log_buf = match StateLog::new(state_size, config.buffer_size) {
            Ok(log_buf) => log_buf,
            Err(err) => {
                log::warn!("failed to initialize rewind buffer ({err}), rewinding disabled");
                return session;
            }
        };

        // Seed the log with the current state.
        let target = log_buf.reserve_write_target();
        if !source.save_state(&mut target[..state_size]) {
            log::error!("failed initial serialization, cannot use rewind");
            return session;
        }
        log_buf.commit_write_target();

        log::info!(
            "initialized rewind buffer with size: {} MB",
            config.buffer_size / 1_000_000
        );
        session.log = Some(log_buf);
        session.state_size = state_size;
        session
    }

    /// True when the subsystem initialized and has not been torn down.
    pub fn is_enabled(&self) -> bool {
        self.log.is_some()
    }

    /// True while the emulation loop is stepping backward through history.
    pub fn frame_is_reversed(&self) -> bool {
        self.frame_is_reverse
    }

    /// Number of states currently retrievable.
    pub fn entries(&self) -> usize {
        self.log.as_ref().map_or(0, StateLog::entries)
    }

    /// Releases the rewind buffer and clears the reversal flag. Idempotent.
    pub fn deinitialize(&mut self) {
        self.log = None;
        self.state_size = 0;
        self.frame_is_reverse = false;
        self.frame_counter = 0;
    }

    /// Per-frame entry point.
    ///
    /// While `pressed`, pops one state per call and feeds it to the host,
    /// bottoming out in a no-op reload of the oldest state. Otherwise
    /// pushes a fresh state every `granularity` frames, or every frame
    /// while the recorder is active. `paused` only stretches the suggested
    /// message display.
    pub fn check_rewind<S, O, R>(
        &mut self,
        source: &mut S,
        observer: &mut O,
        recorder: &mut R,
        pressed: bool,
        granularity: u32,
        paused: bool,
    ) -> FrameReport
    where
        S: StateSource,
        O: ReversalObserver,
        R: ReplayRecorder,
    {
        let Some(log) = self.log.as_mut() else {
            return FrameReport::silent(RewindStatus::Disabled);
        };

        if pressed {
            let popped = log.pop_previous().is_some();
            // After a pop the current block holds the popped state; at the
            // floor it still holds the oldest one, re-applied unchanged.
            source.load_state(&log.current_block()[..self.state_size]);

            if popped {
                if !self.frame_is_reverse {
                    observer.desync_window_opened();
                }
                self.frame_is_reverse = true;
                recorder.frame_rewound();
                return FrameReport {
                    status: RewindStatus::Rewound,
                    message: Some("Rewinding."),
                    message_frames: if paused { 1 } else { 30 },
                };
            }
            if self.frame_is_reverse {
                observer.desync_window_closed();
            }
            self.frame_is_reverse = false;
            return FrameReport {
                status: RewindStatus::ReachedEnd,
                message: Some("Reached end of rewind buffer."),
                message_frames: 30,
            };
        }

        if self.frame_is_reverse {
            observer.desync_window_closed();
        }
        self.frame_is_reverse = false;

        self.frame_counter = (self.frame_counter + 1) % granularity.max(1);
        if self.frame_counter == 0 || recorder.is_active() {
            let target = log.reserve_write_target();
            if source.save_state(&mut target[..self.state_size]) {
                log.commit_write_target();
                return FrameReport::silent(RewindStatus::Recorded);
            }
        }
        FrameReport::silent(RewindStatus::Idle)
    }
}
