//! Expiration decisions and actions.

use std::fmt;

use chrono::Duration;
use serde::{Deserialize, Serialize};

/// The answer an expiration policy gives for one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpirationDecision {
    /// The session has expired. The duration is zero or negative.
    Expired(Duration),

    /// The session expires after the (positive) duration.
    ExpiresIn(Duration),

    /// No opinion. Another mechanism, usually the store's native idle
    /// timeout, decides.
    Defer,
}

impl ExpirationDecision {
    /// Classify a remaining lifetime: positive is `ExpiresIn`, otherwise `Expired`.
    pub fn from_remaining(remaining: Duration) -> Self {
        if remaining > Duration::zero() {
            Self::ExpiresIn(remaining)
        } else {
            Self::Expired(remaining)
        }
    }

    /// The remaining lifetime, or `None` for `Defer`.
    pub fn remaining(&self) -> Option<Duration> {
        match *self {
            Self::Expired(d) | Self::ExpiresIn(d) => Some(d),
            Self::Defer => None,
        }
    }

    pub fn is_expired(&self) -> bool {
        matches!(self, Self::Expired(_))
    }

    pub fn is_deferred(&self) -> bool {
        matches!(self, Self::Defer)
    }
}

impl fmt::Display for ExpirationDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Expired(d) => write!(f, "expired {}s ago", -d.num_seconds()),
            Self::ExpiresIn(d) => write!(f, "expires in {}s", d.num_seconds()),
            Self::Defer => f.write_str("deferred to native expiration"),
        }
    }
}

/// What happens to a store entry when its session expires.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpirationAction {
    /// Remove the entry.
    Destroy,

    /// Drop the entry's value, keeping the key.
    #[default]
    Invalidate,
}

impl fmt::Display for ExpirationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Destroy => f.write_str("destroy"),
            Self::Invalidate => f.write_str("invalidate"),
        }
    }
}
