//! Session State
//!
//! Per-channel counters, timestamps and failure history. Everything here is
//! in-memory and lives for one application session; a process restart (or
//! `reset_session`) is the reset mechanism.
//!
//! Only the outcome recorder mutates these records. Evaluators receive shared
//! references, and callers only ever see cloned [`EngineSnapshot`]s.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, VecDeque};
use std::fmt;

use super::decision::Channel;

/// Identifier used to deduplicate native impressions, e.g. a content-group id.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScopeKey(String);

impl ScopeKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ScopeKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl From<String> for ScopeKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl fmt::Display for ScopeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The most recent load error reported for a channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastFailure {
    pub code: i32,
    pub message: String,
    pub at_ms: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BannerChannelState {
    pub last_refresh_at: Option<i64>,
    /// Jittered interval drawn at the last successful refresh.
    pub refresh_interval_ms: Option<i64>,
    pub last_failure_at: Option<i64>,
    pub consecutive_failures: u32,
    pub is_visible: bool,
    pub is_foreground: bool,
    pub last_failure: Option<LastFailure>,
}

impl Default for BannerChannelState {
    fn default() -> Self {
        Self {
            last_refresh_at: None,
            refresh_interval_ms: None,
            last_failure_at: None,
            consecutive_failures: 0,
            is_visible: false,
            is_foreground: true,
            last_failure: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeChannelState {
    /// Set semantics keep each key at most once per session.
    pub shown_for_key: BTreeSet<ScopeKey>,
    pub last_loaded_at: Option<i64>,
    pub last_failure_at: Option<i64>,
    pub consecutive_failures: u32,
    pub impression_count: u32,
    pub last_failure: Option<LastFailure>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterstitialChannelState {
    pub last_shown_at: Option<i64>,
    pub last_loaded_at: Option<i64>,
    pub shown_count: u32,
    pub is_preloaded: bool,
    pub last_failure_at: Option<i64>,
    pub consecutive_failures: u32,
    pub last_failure: Option<LastFailure>,
}

/// Rolling window of recent load latencies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadMetrics {
    recent_load_times: VecDeque<i64>,
    capacity: usize,
    average_load_time_ms: i64,
}

impl LoadMetrics {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            recent_load_times: VecDeque::with_capacity(capacity),
            capacity,
            average_load_time_ms: 0,
        }
    }

    /// Append a sample, evicting the oldest past capacity. Negative samples
    /// are clamped to zero.
    pub fn record(&mut self, load_time_ms: i64) {
        self.recent_load_times.push_back(load_time_ms.max(0));
        while self.recent_load_times.len() > self.capacity {
            self.recent_load_times.pop_front();
        }
        let sum: i64 = self.recent_load_times.iter().sum();
        self.average_load_time_ms = sum / self.recent_load_times.len() as i64;
    }

    pub fn average_load_time_ms(&self) -> i64 {
        self.average_load_time_ms
    }

    pub fn samples(&self) -> impl Iterator<Item = i64> + '_ {
        self.recent_load_times.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.recent_load_times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recent_load_times.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// The complete state block guarded by the engine lock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineState {
    pub banner: BannerChannelState,
    pub native: NativeChannelState,
    pub interstitial: InterstitialChannelState,
    pub metrics: LoadMetrics,
    pub upsell_pending: bool,
}

/// Immutable copy of the state block handed to callers.
pub type EngineSnapshot = EngineState;

impl EngineState {
    pub fn new(metrics_capacity: usize) -> Self {
        Self {
            banner: BannerChannelState::default(),
            native: NativeChannelState::default(),
            interstitial: InterstitialChannelState::default(),
            metrics: LoadMetrics::new(metrics_capacity),
            upsell_pending: false,
        }
    }

    pub fn consecutive_failures(&self, channel: Channel) -> u32 {
        match channel {
            Channel::Banner => self.banner.consecutive_failures,
            Channel::Native => self.native.consecutive_failures,
            Channel::Interstitial => self.interstitial.consecutive_failures,
        }
    }
}
