//! Interstitial (full-attention) admission policy.
//!
//! Never shown over playing host content. The playback flag must be read
//! by the caller immediately before display, never cached.

use super::decision::{Channel, Decision, Reason};
use super::state::InterstitialChannelState;
use crate::config::InterstitialConfig;

#[derive(Debug, Clone)]
pub struct InterstitialPolicy {
    config: InterstitialConfig,
}

impl InterstitialPolicy {
    pub fn new(config: InterstitialConfig) -> Self {
        Self { config }
    }

    pub fn max_per_session(&self) -> u32 {
        self.config.max_per_session
    }

    pub fn evaluate(
        &self,
        state: &InterstitialChannelState,
        now_ms: i64,
        is_entitlement_exempt: bool,
        is_host_content_playing: bool,
    ) -> Decision {
        if is_entitlement_exempt {
            return Decision::deny(Channel::Interstitial, Reason::ExemptUser);
        }

        if is_host_content_playing {
            return Decision::deny(Channel::Interstitial, Reason::HostContentPlaying);
        }

        if state.shown_count >= self.config.max_per_session {
            return Decision::deny(Channel::Interstitial, Reason::SessionCapReached);
        }

        if let Some(last_shown) = state.last_shown_at {
            let elapsed = (now_ms - last_shown).max(0);
            if elapsed < self.config.min_interval_ms {
                return Decision::deny_until(
                    Channel::Interstitial,
                    Reason::MinimumInterval,
                    self.config.min_interval_ms - elapsed,
                );
            }
        }

        // Preload completion is event-driven, so there is no retry time.
        if !state.is_preloaded {
            return Decision::deny(Channel::Interstitial, Reason::NotReady);
        }

        Decision::permit(Channel::Interstitial)
    }
}
