//! Per-session rewind facade and its host-facing seams.
//!
//! `hooks` defines the collaborator traits the hosting emulation loop
//! implements, and `rewind` the session object it drives once per emulated
//! frame. The shared vocabulary (configuration and per-frame reports) lives
//! here.

pub mod hooks;
pub mod rewind;

/// The entire external configuration surface: a byte budget for the patch
/// arena and a frame cadence for automatic pushes. Nothing is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewindConfig {
    /// Total arena capacity in bytes.
    pub buffer_size: usize,
    /// Push a state every this many non-rewinding frames. Zero behaves
    /// as one.
    pub granularity: u32,
}

impl Default for RewindConfig {
    fn default() -> Self {
        Self {
            buffer_size: 20 << 20,
            granularity: 1,
        }
    }
}

/// What a [`rewind::RewindSession::check_rewind`] call did this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewindStatus {
    /// One state was popped and handed to the host for deserialization.
    Rewound,
    /// The history floor: the oldest retained state was re-applied as-is.
    ReachedEnd,
    /// A fresh state was serialized and committed to the log.
    Recorded,
    /// Nothing to do this frame (between granularity ticks).
    Idle,
    /// The subsystem never initialized or was torn down.
    Disabled,
}

/// Per-frame report for the host's on-screen-message collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameReport {
    pub status: RewindStatus,
    /// Transient status line to display, if any.
    pub message: Option<&'static str>,
    /// Suggested display duration in frames.
    pub message_frames: u32,
}

impl FrameReport {
    pub(crate) fn silent(status: RewindStatus) -> Self {
        Self {
            status,
            message: None,
            message_frames: 0,
        }
    }
}
