//! Outcome Recorder
//!
//! The only code allowed to mutate channel state: load successes, load
//! failures, impressions, plus the lifecycle toggles and explicit resets.
//! Callers hold the engine's write lock around every call.

use tracing::{info, warn};

use super::decision::Channel;
use super::jitter::IntervalSource;
use super::state::{EngineState, LastFailure, ScopeKey};
use crate::config::AdmissionConfig;

#[derive(Debug, Clone)]
pub struct OutcomeRecorder {
    min_refresh_ms: i64,
    max_refresh_ms: i64,
    banner_failure_cap: u32,
    native_failure_cap: u32,
    upsell_threshold: u32,
    interstitial_cap: u32,
}

impl OutcomeRecorder {
    pub fn new(config: &AdmissionConfig) -> Self {
        Self {
            min_refresh_ms: config.banner.min_refresh_ms,
            max_refresh_ms: config.banner.max_refresh_ms,
            banner_failure_cap: config.banner.max_consecutive_failures,
            native_failure_cap: config.native.max_consecutive_failures,
            upsell_threshold: config.upsell.native_impression_threshold,
            interstitial_cap: config.interstitial.max_per_session,
        }
    }

    /// A unit loaded. Resets the failure streak and feeds the latency window.
    pub fn record_success(
        &self,
        state: &mut EngineState,
        channel: Channel,
        now_ms: i64,
        load_time_ms: i64,
        jitter: &mut dyn IntervalSource,
    ) {
        match channel {
            Channel::Banner => {
                let banner = &mut state.banner;
                banner.consecutive_failures = 0;
                banner.last_refresh_at = Some(now_ms);
                banner.refresh_interval_ms =
                    Some(jitter.next_interval_ms(self.min_refresh_ms, self.max_refresh_ms));
            }
            Channel::Native => {
                state.native.consecutive_failures = 0;
                state.native.last_loaded_at = Some(now_ms);
            }
            Channel::Interstitial => {
                let interstitial = &mut state.interstitial;
                interstitial.consecutive_failures = 0;
                interstitial.last_loaded_at = Some(now_ms);
                interstitial.is_preloaded = true;
            }
        }

        state.metrics.record(load_time_ms);
        info!(
            "✅ Admission: {} loaded in {}ms (rolling avg {}ms)",
            channel,
            load_time_ms.max(0),
            state.metrics.average_load_time_ms()
        );
    }

    pub fn record_failure(&self, state: &mut EngineState, channel: Channel, now_ms: i64, code: i32, message: &str) {
        let failure = LastFailure {
            code,
            message: message.to_string(),
            at_ms: now_ms,
        };

        let streak = match channel {
            Channel::Banner => {
                let banner = &mut state.banner;
                banner.consecutive_failures = banner.consecutive_failures.saturating_add(1);
                banner.last_failure_at = Some(now_ms);
                banner.last_failure = Some(failure);
                banner.consecutive_failures
            }
            Channel::Native => {
                let native = &mut state.native;
                native.consecutive_failures = native.consecutive_failures.saturating_add(1);
                native.last_failure_at = Some(now_ms);
                native.last_failure = Some(failure);
                native.consecutive_failures
            }
            Channel::Interstitial => {
                let interstitial = &mut state.interstitial;
                interstitial.consecutive_failures = interstitial.consecutive_failures.saturating_add(1);
                interstitial.last_failure_at = Some(now_ms);
                interstitial.last_failure = Some(failure);
                interstitial.is_preloaded = false;
                interstitial.consecutive_failures
            }
        };

        warn!(
            "📉 Admission: {} load failed (code {}: {}), streak {}",
            channel, code, message, streak
        );

        match channel {
            Channel::Banner if streak == self.banner_failure_cap => {
                warn!("🛑 Admission: banner suppressed until reset after {} failures", streak);
            }
            Channel::Native if streak == self.native_failure_cap => {
                warn!("🛑 Admission: native suppressed for the session after {} failures", streak);
            }
            _ => {}
        }
    }

    /// Returns true when this impression raised the upsell signal.
    pub fn record_impression(
        &self,
        state: &mut EngineState,
        channel: Channel,
        now_ms: i64,
        scope_key: Option<ScopeKey>,
    ) -> bool {
        match channel {
            Channel::Banner => {
                state.banner.is_visible = true;
                info!("Admission: banner impression");
                false
            }
            Channel::Native => {
                let native = &mut state.native;
                native.impression_count = native.impression_count.saturating_add(1);
                if let Some(key) = scope_key {
                    native.shown_for_key.insert(key);
                }
                info!(
                    "Admission: native impression #{} ({} scopes shown)",
                    native.impression_count,
                    native.shown_for_key.len()
                );

                if native.impression_count >= self.upsell_threshold {
                    let raised = !state.upsell_pending;
                    state.upsell_pending = true;
                    if raised {
                        info!("💎 Admission: upsell signal raised");
                    }
                    raised
                } else {
                    false
                }
            }
            Channel::Interstitial => {
                let interstitial = &mut state.interstitial;
                interstitial.last_shown_at = Some(now_ms);
                interstitial.is_preloaded = false;
                if interstitial.shown_count >= self.interstitial_cap {
                    warn!(
                        "⚠️ Admission: interstitial impression past the session cap of {} not counted",
                        self.interstitial_cap
                    );
                } else {
                    interstitial.shown_count += 1;
                    info!("Admission: interstitial impression #{}", interstitial.shown_count);
                }
                false
            }
        }
    }

    pub fn record_banner_hidden(&self, state: &mut EngineState) {
        state.banner.is_visible = false;
    }

    /// Going to background also forgets the last refresh, so the first
    /// foreground evaluation is not held back by a stale interval.
    pub fn on_background(&self, state: &mut EngineState) {
        state.banner.is_foreground = false;
        state.banner.last_refresh_at = None;
        state.banner.refresh_interval_ms = None;
        info!("Admission: app backgrounded");
    }

    pub fn on_foreground(&self, state: &mut EngineState) {
        state.banner.is_foreground = true;
        info!("Admission: app foregrounded");
    }

    pub fn reset_failures(&self, state: &mut EngineState, channel: Channel) {
        match channel {
            Channel::Banner => {
                state.banner.consecutive_failures = 0;
                state.banner.last_failure_at = None;
            }
            Channel::Native => {
                state.native.consecutive_failures = 0;
                state.native.last_failure_at = None;
            }
            Channel::Interstitial => {
                state.interstitial.consecutive_failures = 0;
                state.interstitial.last_failure_at = None;
            }
        }
        info!("Admission: {} failure streak reset", channel);
    }
}
