//! External collaborators
//!
//! The engine consults two booleans it does not own: whether the user is
//! exempt from promotional content, and whether host content is playing.
//! Callers resolve any asynchronous lookup before the engine asks.

use std::sync::atomic::{AtomicBool, Ordering};

pub trait EntitlementGate: Send + Sync {
    fn is_exempt(&self) -> bool;
}

pub trait PlaybackSignal: Send + Sync {
    fn is_actively_playing(&self) -> bool;
}

/// A pre-resolved entitlement answer that never changes.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticEntitlement(pub bool);

impl EntitlementGate for StaticEntitlement {
    fn is_exempt(&self) -> bool {
        self.0
    }
}

/// Entitlement flag the host flips when a purchase resolves.
#[derive(Debug, Default)]
pub struct EntitlementFlag(AtomicBool);

impl EntitlementFlag {
    pub fn new(exempt: bool) -> Self {
        Self(AtomicBool::new(exempt))
    }

    pub fn set(&self, exempt: bool) {
        self.0.store(exempt, Ordering::SeqCst);
    }
}

impl EntitlementGate for EntitlementFlag {
    fn is_exempt(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Playback flag mirrored from the host player's state callbacks.
#[derive(Debug, Default)]
pub struct PlaybackFlag(AtomicBool);

impl PlaybackFlag {
    pub fn new(playing: bool) -> Self {
        Self(AtomicBool::new(playing))
    }

    pub fn set(&self, playing: bool) {
        self.0.store(playing, Ordering::SeqCst);
    }
}

impl PlaybackSignal for PlaybackFlag {
    fn is_actively_playing(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Host without a media player.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverPlaying;

impl PlaybackSignal for NeverPlaying {
    fn is_actively_playing(&self) -> bool {
        false
    }
}
