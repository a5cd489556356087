//! Banner admission policy.
//!
//! Checks run in a fixed order and the first failing one decides. The
//! failure cap is consulted before the timed backoff so that a capped
//! channel always reports the permanent denial.

use super::backoff::Backoff;
use super::decision::{Channel, Decision, Reason};
use super::state::BannerChannelState;
use crate::config::BannerConfig;

#[derive(Debug, Clone)]
pub struct BannerPolicy {
    config: BannerConfig,
    backoff: Backoff,
    enforce_occlusion: bool,
}

impl BannerPolicy {
    /// `enforce_occlusion` is false in sandbox mode, where test layouts
    /// routinely overlap the banner slot.
    pub fn new(config: BannerConfig, enforce_occlusion: bool) -> Self {
        let backoff = Backoff::new(config.base_cooldown_ms, config.max_backoff_multiplier);
        Self {
            config,
            backoff,
            enforce_occlusion,
        }
    }

    pub fn backoff(&self) -> &Backoff {
        &self.backoff
    }

    pub fn evaluate(
        &self,
        state: &BannerChannelState,
        now_ms: i64,
        is_entitlement_exempt: bool,
        is_content_area_occluded: bool,
    ) -> Decision {
        if is_entitlement_exempt {
            return Decision::deny(Channel::Banner, Reason::ExemptUser);
        }

        if state.consecutive_failures >= self.config.max_consecutive_failures {
            return Decision::deny(Channel::Banner, Reason::FailureCapReached);
        }

        if let Some(remaining) =
            self.backoff
                .remaining_ms(now_ms, state.last_failure_at, state.consecutive_failures)
        {
            return Decision::deny_until(Channel::Banner, Reason::BackoffCooldown, remaining);
        }

        if is_content_area_occluded && self.enforce_occlusion {
            return Decision::deny(Channel::Banner, Reason::ContentAreaOccluded);
        }

        if !state.is_foreground {
            return Decision::deny(Channel::Banner, Reason::Backgrounded);
        }

        if let Some(last_refresh) = state.last_refresh_at {
            let interval = state.refresh_interval_ms.unwrap_or(self.config.min_refresh_ms);
            let elapsed = (now_ms - last_refresh).max(0);
            if elapsed < interval {
                return Decision::deny_until(Channel::Banner, Reason::RefreshInterval, interval - elapsed);
            }
        }

        Decision::permit(Channel::Banner)
    }
}
