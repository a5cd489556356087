//! Admission Engine
//!
//! One instance per application session, built by the composition root and
//! shared by handle (`Arc<AdmissionEngine>`). Evaluations take the read lock
//! and never mutate; outcome recording takes the write lock, so a recorded
//! outcome is visible to every evaluation issued after the call returns.

use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info};

use super::banner::BannerPolicy;
use super::clock::{Clock, SystemClock};
use super::decision::{Channel, Decision};
use super::interstitial::InterstitialPolicy;
use super::jitter::{IntervalSource, SeededJitter};
use super::native::NativePolicy;
use super::recorder::OutcomeRecorder;
use super::signals::{EntitlementGate, PlaybackSignal};
use super::state::{EngineSnapshot, EngineState, ScopeKey};
use super::upsell::UpsellSignal;
use crate::config::AdmissionConfig;
use crate::error::Result;

pub struct AdmissionEngine {
    config: AdmissionConfig,
    banner: BannerPolicy,
    native: NativePolicy,
    interstitial: InterstitialPolicy,
    recorder: OutcomeRecorder,
    clock: Arc<dyn Clock>,
    entitlement: Arc<dyn EntitlementGate>,
    playback: Arc<dyn PlaybackSignal>,
    state: RwLock<EngineState>,
    /// Only taken while the state write lock is held.
    jitter: Mutex<Box<dyn IntervalSource>>,
    upsell: UpsellSignal,
}

impl AdmissionEngine {
    pub fn new(
        config: AdmissionConfig,
        entitlement: Arc<dyn EntitlementGate>,
        playback: Arc<dyn PlaybackSignal>,
    ) -> Result<Self> {
        config.validate()?;

        let engine = Self {
            banner: BannerPolicy::new(config.banner.clone(), config.is_production()),
            native: NativePolicy::new(config.native.clone()),
            interstitial: InterstitialPolicy::new(config.interstitial.clone()),
            recorder: OutcomeRecorder::new(&config),
            clock: Arc::new(SystemClock),
            entitlement,
            playback,
            state: RwLock::new(EngineState::new(config.metrics.sample_capacity)),
            jitter: Mutex::new(Box::new(SeededJitter::from_entropy())),
            upsell: UpsellSignal::new(),
            config,
        };

        info!(
            "🛡️  Admission engine ready ({:?}, interstitial cap {}/session)",
            engine.config.environment,
            engine.interstitial.max_per_session()
        );
        Ok(engine)
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_interval_source(mut self, source: impl IntervalSource + 'static) -> Self {
        self.jitter = Mutex::new(Box::new(source));
        self
    }

    pub fn config(&self) -> &AdmissionConfig {
        &self.config
    }

    // ──────────────────────────────────────────────────────────────────────
    // Evaluation
    // ──────────────────────────────────────────────────────────────────────

    pub fn evaluate_banner(&self, is_content_area_occluded: bool) -> Decision {
        let exempt = self.entitlement.is_exempt();
        let now = self.clock.now_ms();
        let decision = {
            let state = self.state.read();
            self.banner.evaluate(&state.banner, now, exempt, is_content_area_occluded)
        };
        trace_decision(&decision);
        decision
    }

    pub fn evaluate_native(&self, scope_key: &ScopeKey, scope_size: i64, has_user_engaged: bool) -> Decision {
        let exempt = self.entitlement.is_exempt();
        let now = self.clock.now_ms();
        let decision = {
            let state = self.state.read();
            self.native
                .evaluate(&state.native, now, exempt, scope_key, scope_size, has_user_engaged)
        };
        trace_decision(&decision);
        decision
    }

    /// Reads the playback signal on every call; call this immediately
    /// before display.
    pub fn evaluate_interstitial(&self) -> Decision {
        let exempt = self.entitlement.is_exempt();
        let playing = self.playback.is_actively_playing();
        let now = self.clock.now_ms();
        let decision = {
            let state = self.state.read();
            self.interstitial.evaluate(&state.interstitial, now, exempt, playing)
        };
        trace_decision(&decision);
        decision
    }

    /// Evaluate and, when permitted, record the impression under one write
    /// lock. Two callers racing for the last session slot get one permit.
    pub fn admit_interstitial(&self) -> Decision {
        let exempt = self.entitlement.is_exempt();
        let playing = self.playback.is_actively_playing();
        let now = self.clock.now_ms();
        let decision = {
            let mut state = self.state.write();
            let decision = self.interstitial.evaluate(&state.interstitial, now, exempt, playing);
            if decision.permit {
                self.recorder
                    .record_impression(&mut state, Channel::Interstitial, now, None);
            }
            decision
        };
        trace_decision(&decision);
        decision
    }

    // ──────────────────────────────────────────────────────────────────────
    // Outcome recording
    // ──────────────────────────────────────────────────────────────────────

    pub fn record_success(&self, channel: Channel, load_time_ms: i64) {
        let now = self.clock.now_ms();
        let mut state = self.state.write();
        let mut jitter = self.jitter.lock();
        self.recorder
            .record_success(&mut state, channel, now, load_time_ms, &mut **jitter);
    }

    pub fn record_failure(&self, channel: Channel, code: i32, message: &str) {
        let now = self.clock.now_ms();
        let mut state = self.state.write();
        self.recorder.record_failure(&mut state, channel, now, code, message);
    }

    pub fn record_impression(&self, channel: Channel, scope_key: Option<ScopeKey>) {
        let now = self.clock.now_ms();
        let mut state = self.state.write();
        if self.recorder.record_impression(&mut state, channel, now, scope_key) {
            self.upsell.publish(true);
        }
    }

    pub fn record_banner_hidden(&self) {
        let mut state = self.state.write();
        self.recorder.record_banner_hidden(&mut state);
    }

    /// Explicitly lift a failure streak, e.g. after the host fixed its
    /// network or the user asked to retry.
    pub fn reset_failures(&self, channel: Channel) {
        let mut state = self.state.write();
        self.recorder.reset_failures(&mut state, channel);
    }

    /// Start a fresh session: caps, scope keys, streaks, metrics and the
    /// upsell flag return to their defaults. Foreground state is kept.
    pub fn reset_session(&self) {
        let mut state = self.state.write();
        let is_foreground = state.banner.is_foreground;
        *state = EngineState::new(self.config.metrics.sample_capacity);
        state.banner.is_foreground = is_foreground;
        self.upsell.publish(false);
        info!("🔄 Admission: session state reset");
    }

    // ──────────────────────────────────────────────────────────────────────
    // Lifecycle
    // ──────────────────────────────────────────────────────────────────────

    pub fn on_background(&self) {
        let mut state = self.state.write();
        self.recorder.on_background(&mut state);
    }

    pub fn on_foreground(&self) {
        let mut state = self.state.write();
        self.recorder.on_foreground(&mut state);
    }

    // ──────────────────────────────────────────────────────────────────────
    // Upsell
    // ──────────────────────────────────────────────────────────────────────

    pub fn upsell_signal(&self) -> watch::Receiver<bool> {
        self.upsell.subscribe()
    }

    pub fn is_upsell_pending(&self) -> bool {
        self.state.read().upsell_pending
    }

    pub fn acknowledge_upsell(&self) {
        let mut state = self.state.write();
        state.upsell_pending = false;
        self.upsell.publish(false);
        info!("Admission: upsell acknowledged");
    }

    // ──────────────────────────────────────────────────────────────────────
    // Diagnostics
    // ──────────────────────────────────────────────────────────────────────

    pub fn average_load_time_ms(&self) -> i64 {
        self.state.read().metrics.average_load_time_ms()
    }

    /// Advisory only: lets callers slow their own request rate.
    pub fn is_load_latency_high(&self) -> bool {
        self.average_load_time_ms() > self.config.metrics.high_latency_threshold_ms
    }

    pub fn load_sample_count(&self) -> usize {
        self.state.read().metrics.len()
    }

    /// Cooldown a channel would owe after `consecutive_failures` failures.
    /// Interstitials have no timed backoff.
    pub fn backoff_cooldown_ms(&self, channel: Channel, consecutive_failures: u32) -> Option<i64> {
        match channel {
            Channel::Banner => Some(self.banner.backoff().cooldown_ms(consecutive_failures)),
            Channel::Native => Some(self.native.backoff().cooldown_ms(consecutive_failures)),
            Channel::Interstitial => None,
        }
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        self.state.read().clone()
    }
}

fn trace_decision(decision: &Decision) {
    if decision.permit {
        debug!("Admission: {}", decision);
    } else {
        debug!("Admission denied: {}", decision);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admission::clock::ManualClock;
    use crate::admission::decision::Reason;
    use crate::admission::jitter::FixedInterval;
    use crate::admission::signals::{EntitlementFlag, PlaybackFlag, StaticEntitlement};

    fn engine_with(clock: Arc<ManualClock>) -> AdmissionEngine {
        AdmissionEngine::new(
            AdmissionConfig::default(),
            Arc::new(StaticEntitlement(false)),
            Arc::new(PlaybackFlag::new(false)),
        )
        .unwrap()
        .with_clock(clock)
        .with_interval_source(FixedInterval(60_000))
    }

    #[test]
    fn test_rejects_invalid_config() {
        let mut config = AdmissionConfig::default();
        config.metrics.sample_capacity = 0;
        let result = AdmissionEngine::new(
            config,
            Arc::new(StaticEntitlement(false)),
            Arc::new(PlaybackFlag::new(false)),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_banner_refresh_cycle() {
        let clock = Arc::new(ManualClock::new(1_000_000));
        let engine = engine_with(clock.clone());

        assert!(engine.evaluate_banner(false).permit);
        engine.record_success(Channel::Banner, 400);

        let d = engine.evaluate_banner(false);
        assert_eq!(d.reason, Reason::RefreshInterval);
        assert_eq!(d.retry_after_ms, Some(60_000));

        clock.advance_ms(60_000);
        assert!(engine.evaluate_banner(false).permit);
    }

    #[test]
    fn test_entitlement_flip_applies_immediately() {
        let gate = Arc::new(EntitlementFlag::new(false));
        let engine = AdmissionEngine::new(
            AdmissionConfig::default(),
            gate.clone(),
            Arc::new(PlaybackFlag::new(false)),
        )
        .unwrap();

        assert!(engine.evaluate_banner(false).permit);
        gate.set(true);
        assert_eq!(engine.evaluate_banner(false).reason, Reason::ExemptUser);
    }

    #[test]
    fn test_playback_read_at_call_time() {
        let playback = Arc::new(PlaybackFlag::new(false));
        let engine = AdmissionEngine::new(
            AdmissionConfig::default(),
            Arc::new(StaticEntitlement(false)),
            playback.clone(),
        )
        .unwrap();
        engine.record_success(Channel::Interstitial, 500);
        assert!(engine.evaluate_interstitial().permit);

        playback.set(true);
        assert_eq!(engine.evaluate_interstitial().reason, Reason::HostContentPlaying);
    }

    #[test]
    fn test_latency_diagnostics() {
        let engine = engine_with(Arc::new(ManualClock::new(0)));
        assert_eq!(engine.average_load_time_ms(), 0);
        assert!(!engine.is_load_latency_high());

        engine.record_success(Channel::Native, 1_400);
        engine.record_success(Channel::Native, 1_700);
        assert_eq!(engine.average_load_time_ms(), 1_550);
        assert!(engine.is_load_latency_high());
        assert_eq!(engine.load_sample_count(), 2);
    }

    #[test]
    fn test_reset_session_keeps_foreground_flag() {
        let engine = engine_with(Arc::new(ManualClock::new(0)));
        engine.record_impression(Channel::Interstitial, None);
        engine.record_impression(Channel::Native, Some("a".into()));
        engine.record_impression(Channel::Native, Some("b".into()));
        engine.on_background();
        assert!(engine.is_upsell_pending());

        engine.reset_session();
        let snapshot = engine.snapshot();
        assert_eq!(snapshot.interstitial.shown_count, 0);
        assert!(snapshot.native.shown_for_key.is_empty());
        assert!(!snapshot.banner.is_foreground);
        assert!(!engine.is_upsell_pending());
    }

    #[test]
    fn test_admit_interstitial_counts_impression() {
        let clock = Arc::new(ManualClock::new(0));
        let engine = engine_with(clock.clone());
        engine.record_success(Channel::Interstitial, 200);

        assert!(engine.admit_interstitial().permit);
        let snapshot = engine.snapshot();
        assert_eq!(snapshot.interstitial.shown_count, 1);
        assert!(!snapshot.interstitial.is_preloaded);

        assert_eq!(engine.admit_interstitial().reason, Reason::MinimumInterval);
        clock.advance_ms(180_000);
        // Interval passed, but the shown unit was consumed
        assert_eq!(engine.admit_interstitial().reason, Reason::NotReady);
        assert_eq!(engine.snapshot().interstitial.shown_count, 1);
    }

    #[test]
    fn test_upsell_republished_after_acknowledgment() {
        let engine = engine_with(Arc::new(ManualClock::new(0)));
        let rx = engine.upsell_signal();
        engine.record_impression(Channel::Native, Some("a".into()));
        engine.record_impression(Channel::Native, Some("b".into()));
        assert!(*rx.borrow());

        engine.acknowledge_upsell();
        assert!(!*rx.borrow());
        engine.record_impression(Channel::Native, Some("c".into()));
        assert!(*rx.borrow());
    }

    #[test]
    fn test_backoff_cooldown_lookup() {
        let engine = engine_with(Arc::new(ManualClock::new(0)));
        assert_eq!(engine.backoff_cooldown_ms(Channel::Banner, 3), Some(120_000));
        assert_eq!(engine.backoff_cooldown_ms(Channel::Native, 2), Some(120_000));
        assert_eq!(engine.backoff_cooldown_ms(Channel::Interstitial, 2), None);
    }
}
