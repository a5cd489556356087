use serde::{Deserialize, Serialize};
use std::fmt;

/// One independently policed promotional surface.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Banner,
    Native,
    Interstitial,
}

impl Channel {
    pub const ALL: [Channel; 3] = [Channel::Banner, Channel::Native, Channel::Interstitial];

    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Banner => "banner",
            Channel::Native => "native",
            Channel::Interstitial => "interstitial",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Channel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "banner" => Ok(Channel::Banner),
            "native" => Ok(Channel::Native),
            "interstitial" => Ok(Channel::Interstitial),
            other => Err(format!("unknown channel: {}", other)),
        }
    }
}

/// Why a decision came out the way it did. Diagnostic only; callers act on
/// `permit` and `retry_after_ms`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Reason {
    Admitted,
    ExemptUser,
    BackoffCooldown,
    FailureCapReached,
    SessionSuppressed,
    ContentAreaOccluded,
    Backgrounded,
    RefreshInterval,
    NoUserEngagement,
    ScopeTooSmall,
    AlreadyShownForScope,
    HostContentPlaying,
    SessionCapReached,
    MinimumInterval,
    NotReady,
}

impl Reason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Reason::Admitted => "admitted",
            Reason::ExemptUser => "exempt user",
            Reason::BackoffCooldown => "backoff cooldown after load failure",
            Reason::FailureCapReached => "consecutive failure cap reached",
            Reason::SessionSuppressed => "suppressed for session after repeated failures",
            Reason::ContentAreaOccluded => "content area occluded",
            Reason::Backgrounded => "app in background",
            Reason::RefreshInterval => "refresh interval not elapsed",
            Reason::NoUserEngagement => "no user engagement yet",
            Reason::ScopeTooSmall => "scope below minimum size",
            Reason::AlreadyShownForScope => "already shown for scope this session",
            Reason::HostContentPlaying => "host content playing",
            Reason::SessionCapReached => "session cap reached",
            Reason::MinimumInterval => "minimum interval not elapsed",
            Reason::NotReady => "not ready",
        }
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The verdict of one policy evaluation.
///
/// `retry_after_ms` is only present on denials that clear on their own after
/// a known delay; permanent and event-driven denials leave it empty.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Decision {
    pub permit: bool,
    pub channel: Channel,
    pub reason: Reason,
    pub retry_after_ms: Option<i64>,
}

impl Decision {
    pub fn permit(channel: Channel) -> Self {
        Self {
            permit: true,
            channel,
            reason: Reason::Admitted,
            retry_after_ms: None,
        }
    }

    pub fn deny(channel: Channel, reason: Reason) -> Self {
        Self {
            permit: false,
            channel,
            reason,
            retry_after_ms: None,
        }
    }

    /// A denial that lifts after `retry_after_ms`, clamped to at least 1ms.
    pub fn deny_until(channel: Channel, reason: Reason, retry_after_ms: i64) -> Self {
        Self {
            permit: false,
            channel,
            reason,
            retry_after_ms: Some(retry_after_ms.max(1)),
        }
    }

    pub fn is_permanent_denial(&self) -> bool {
        !self.permit && self.retry_after_ms.is_none()
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verdict = if self.permit { "PERMIT" } else { "DENY" };
        write!(f, "[{}] {} ({})", self.channel, verdict, self.reason)?;
        if let Some(ms) = self.retry_after_ms {
            write!(f, " retry in {}ms", ms)?;
        }
        Ok(())
    }
}
