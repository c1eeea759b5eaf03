//! Collaborator traits between the rewind engine and its host.
//!
//! The engine never reaches into the emulator: it receives serialized
//! snapshots, hands back previous ones, and raises a handful of
//! notifications. The unit type implements the optional collaborators for
//! hosts that do not care.

/// Core serialization provider.
///
/// The reported size is treated as fixed for the lifetime of one session
/// and is not re-queried per frame; a host whose true state size varies has
/// no defined behavior here.
pub trait StateSource {
    /// Size in bytes of one serialized state snapshot.
    fn state_size(&mut self) -> usize;

    /// Serializes the live state into `buf`, returning false on failure.
    fn save_state(&mut self, buf: &mut [u8]) -> bool;

    /// Restores the live state from `buf`.
    fn load_state(&mut self, buf: &[u8]);

    /// True when serialization is driven from a threaded audio callback,
    /// which cannot guarantee deterministic frame boundaries.
    fn audio_callback_active(&self) -> bool {
        false
    }
}

/// Netplay-style collaborator told when rewound frames begin and end, so it
/// can suspend synchronization checks in between.
pub trait ReversalObserver {
    fn desync_window_opened(&mut self) {}
    fn desync_window_closed(&mut self) {}
}

impl ReversalObserver for () {}

/// Movie/replay recorder collaborator. An active recording forces a state
/// push every frame regardless of granularity, and is told whenever a
/// frame is rewound out from under it.
pub trait ReplayRecorder {
    fn is_active(&self) -> bool {
        false
    }
    fn frame_rewound(&mut self) {}
}

impl ReplayRecorder for () {}
