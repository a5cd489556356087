//! Native (contextual) admission policy.
//!
//! Unlike banners, native content that fails twice in a row stays off for
//! the rest of the session; the timed backoff only covers the failures
//! before that point.

use super::backoff::Backoff;
use super::decision::{Channel, Decision, Reason};
use super::state::{NativeChannelState, ScopeKey};
use crate::config::NativeConfig;

#[derive(Debug, Clone)]
pub struct NativePolicy {
    config: NativeConfig,
    backoff: Backoff,
}

impl NativePolicy {
    pub fn new(config: NativeConfig) -> Self {
        let backoff = Backoff::new(config.base_cooldown_ms, config.max_backoff_multiplier);
        Self { config, backoff }
    }

    pub fn backoff(&self) -> &Backoff {
        &self.backoff
    }

    pub fn evaluate(
        &self,
        state: &NativeChannelState,
        now_ms: i64,
        is_entitlement_exempt: bool,
        scope_key: &ScopeKey,
        scope_size: i64,
        has_user_engaged: bool,
    ) -> Decision {
        if is_entitlement_exempt {
            return Decision::deny(Channel::Native, Reason::ExemptUser);
        }

        if !has_user_engaged {
            return Decision::deny(Channel::Native, Reason::NoUserEngagement);
        }

        if scope_size.max(0) < self.config.minimum_scope_size {
            return Decision::deny(Channel::Native, Reason::ScopeTooSmall);
        }

        if state.shown_for_key.contains(scope_key) {
            return Decision::deny(Channel::Native, Reason::AlreadyShownForScope);
        }

        if state.consecutive_failures >= self.config.max_consecutive_failures {
            return Decision::deny(Channel::Native, Reason::SessionSuppressed);
        }

        if let Some(remaining) =
            self.backoff
                .remaining_ms(now_ms, state.last_failure_at, state.consecutive_failures)
        {
            return Decision::deny_until(Channel::Native, Reason::BackoffCooldown, remaining);
        }

        Decision::permit(Channel::Native)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> NativePolicy {
        NativePolicy::new(NativeConfig {
            base_cooldown_ms: 2_000,
            ..NativeConfig::default()
        })
    }

    fn key(k: &str) -> ScopeKey {
        ScopeKey::new(k)
    }

    #[test]
    fn test_happy_path() {
        let d = policy().evaluate(&NativeChannelState::default(), 0, false, &key("album-1"), 25, true);
        assert!(d.permit);
    }

    #[test]
    fn test_requires_engagement_before_scope() {
        let d = policy().evaluate(&NativeChannelState::default(), 0, false, &key("a"), 3, false);
        assert_eq!(d.reason, Reason::NoUserEngagement);
    }

    #[test]
    fn test_scope_size_gate() {
        let state = NativeChannelState::default();
        assert_eq!(
            policy().evaluate(&state, 0, false, &key("a"), 9, true).reason,
            Reason::ScopeTooSmall
        );
        assert_eq!(
            policy().evaluate(&state, 0, false, &key("a"), -40, true).reason,
            Reason::ScopeTooSmall
        );
        assert!(policy().evaluate(&state, 0, false, &key("a"), 10, true).permit);
    }

    #[test]
    fn test_frequency_cap_per_key() {
        let mut state = NativeChannelState::default();
        state.shown_for_key.insert(key("a"));
        assert_eq!(
            policy().evaluate(&state, 0, false, &key("a"), 50, true).reason,
            Reason::AlreadyShownForScope
        );
        assert!(policy().evaluate(&state, 0, false, &key("b"), 50, true).permit);
    }

    #[test]
    fn test_single_failure_backs_off_then_recovers() {
        let state = NativeChannelState {
            consecutive_failures: 1,
            last_failure_at: Some(1_000),
            ..Default::default()
        };
        let d = policy().evaluate(&state, 1_500, false, &key("a"), 50, true);
        assert_eq!(d.reason, Reason::BackoffCooldown);
        assert_eq!(d.retry_after_ms, Some(1_500));
        assert!(policy().evaluate(&state, 3_000, false, &key("a"), 50, true).permit);
    }

    #[test]
    fn test_two_failures_suppress_for_session() {
        let state = NativeChannelState {
            consecutive_failures: 2,
            last_failure_at: Some(0),
            ..Default::default()
        };
        let d = policy().evaluate(&state, i64::MAX / 2, false, &key("a"), 50, true);
        assert_eq!(d.reason, Reason::SessionSuppressed);
        assert!(d.is_permanent_denial());
    }
}
