//! Admission Module
//!
//! Decides, per delivery channel, whether promotional content may be
//! requested or shown right now, and records what happened afterwards.

pub mod backoff;
pub mod banner;
pub mod clock;
mod decision;
pub mod engine;
pub mod interstitial;
pub mod jitter;
pub mod native;
pub mod recorder;
pub mod signals;
pub mod state;
pub mod upsell;

pub use backoff::Backoff;
pub use clock::{Clock, ManualClock, SystemClock};
pub use decision::{Channel, Decision, Reason};
pub use engine::AdmissionEngine;
pub use jitter::{FixedInterval, IntervalSource, SeededJitter};
pub use recorder::OutcomeRecorder;
pub use signals::{EntitlementFlag, EntitlementGate, NeverPlaying, PlaybackFlag, PlaybackSignal, StaticEntitlement};
pub use state::{
    BannerChannelState, EngineSnapshot, EngineState, InterstitialChannelState, LastFailure, LoadMetrics,
    NativeChannelState, ScopeKey,
};
pub use upsell::UpsellSignal;
