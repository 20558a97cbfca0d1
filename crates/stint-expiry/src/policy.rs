//! Idle-timeout and fixed-duration expiration policies.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use stint_session::Session;

use crate::decision::{ExpirationAction, ExpirationDecision};
use crate::error::{ExpiryError, Result};

/// Default idle timeout (30 minutes).
pub const DEFAULT_IDLE_TIMEOUT_SECS: i64 = 30 * 60;

/// Decides how long a session has left to live.
pub trait ExpirationPolicy: Send + Sync {
    /// Decide for `session` as of `now`.
    fn decide_at(&self, session: &Session, now: DateTime<Utc>) -> ExpirationDecision;

    /// Decide for `session` as of the current time.
    fn decide(&self, session: &Session) -> ExpirationDecision {
        self.decide_at(session, Utc::now())
    }

    /// What the store should do once the session expires.
    fn action(&self) -> ExpirationAction {
        ExpirationAction::Invalidate
    }
}

impl<P: ExpirationPolicy + ?Sized> ExpirationPolicy for Arc<P> {
    fn decide_at(&self, session: &Session, now: DateTime<Utc>) -> ExpirationDecision {
        (**self).decide_at(session, now)
    }

    fn action(&self) -> ExpirationAction {
        (**self).action()
    }
}

impl<P: ExpirationPolicy + ?Sized> ExpirationPolicy for Box<P> {
    fn decide_at(&self, session: &Session, now: DateTime<Utc>) -> ExpirationDecision {
        (**self).decide_at(session, now)
    }

    fn action(&self) -> ExpirationAction {
        (**self).action()
    }
}

/// Expires a session after a period of inactivity.
///
/// The remaining time is `idle_timeout - (now - last_accessed_time)`. With no
/// idle timeout configured the policy defers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdleTimeoutPolicy {
    idle_timeout: Option<Duration>,
    action: ExpirationAction,
}

impl IdleTimeoutPolicy {
    pub fn new(idle_timeout: Option<Duration>) -> Self {
        Self {
            idle_timeout,
            action: ExpirationAction::default(),
        }
    }

    /// A policy that always defers.
    pub fn disabled() -> Self {
        Self::new(None)
    }

    /// Replace the idle timeout, e.g. with the store's configured max
    /// inactive interval once it is known.
    pub fn with_idle_timeout(mut self, idle_timeout: Option<Duration>) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    pub fn with_action(mut self, action: ExpirationAction) -> Self {
        self.action = action;
        self
    }

    pub fn idle_timeout(&self) -> Option<Duration> {
        self.idle_timeout
    }
}

impl Default for IdleTimeoutPolicy {
    fn default() -> Self {
        Self::new(Some(Duration::seconds(DEFAULT_IDLE_TIMEOUT_SECS)))
    }
}

impl ExpirationPolicy for IdleTimeoutPolicy {
    fn decide_at(&self, session: &Session, now: DateTime<Utc>) -> ExpirationDecision {
        match self.idle_timeout {
            Some(timeout) => {
                let idle = (now - session.last_accessed_time()).max(Duration::zero());
                ExpirationDecision::from_remaining(timeout - idle)
            }
            None => ExpirationDecision::Defer,
        }
    }

    fn action(&self) -> ExpirationAction {
        self.action
    }
}

/// Caps a session's lifetime at a fixed duration from its creation time.
///
/// When the idle timeout would fire first (strictly earlier than the fixed
/// cap) the policy defers, leaving expiry to the idle timeout. When the two
/// are equal the idle timeout still handles it. Otherwise the answer is the
/// remaining fixed lifetime, `fixed - max(now - creation_time, 0)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedDurationPolicy {
    fixed_duration: Duration,
    idle: IdleTimeoutPolicy,
    action: ExpirationAction,
}

impl FixedDurationPolicy {
    pub fn new(fixed_duration: Duration, idle: IdleTimeoutPolicy) -> Self {
        Self {
            fixed_duration,
            idle,
            action: ExpirationAction::default(),
        }
    }

    /// A fixed-duration policy with no idle timeout.
    pub fn fixed_only(fixed_duration: Duration) -> Self {
        Self::new(fixed_duration, IdleTimeoutPolicy::disabled())
    }

    /// Build from an optional duration, e.g. straight from configuration.
    pub fn try_new(fixed_duration: Option<Duration>, idle: IdleTimeoutPolicy) -> Result<Self> {
        let fixed_duration = fixed_duration.ok_or(ExpiryError::MissingFixedDuration)?;
        Ok(Self::new(fixed_duration, idle))
    }

    pub fn with_action(mut self, action: ExpirationAction) -> Self {
        self.action = action;
        self
    }

    pub fn fixed_duration(&self) -> Duration {
        self.fixed_duration
    }

    pub fn idle_policy(&self) -> &IdleTimeoutPolicy {
        &self.idle
    }

    fn fixed_remaining(&self, session: &Session, now: DateTime<Utc>) -> Duration {
        self.fixed_duration - (now - session.creation_time()).max(Duration::zero())
    }
}

impl ExpirationPolicy for FixedDurationPolicy {
    fn decide_at(&self, session: &Session, now: DateTime<Utc>) -> ExpirationDecision {
        let fixed = self.fixed_remaining(session, now);

        if let Some(idle) = self.idle.decide_at(session, now).remaining()
            && idle <= fixed
        {
            return ExpirationDecision::Defer;
        }

        ExpirationDecision::from_remaining(fixed)
    }

    fn action(&self) -> ExpirationAction {
        self.action
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn session_created_at(created: i64, last_accessed: i64) -> Session {
        Session::with_id("s-1")
            .unwrap()
            .with_creation_time(at(created))
            .with_last_accessed_time(at(last_accessed))
    }

    #[test]
    fn test_idle_remaining() {
        let policy = IdleTimeoutPolicy::new(Some(Duration::seconds(60)));
        let session = session_created_at(0, 0);

        assert_eq!(
            policy.decide_at(&session, at(30)),
            ExpirationDecision::ExpiresIn(Duration::seconds(30))
        );
    }

    #[test]
    fn test_idle_boundary() {
        let policy = IdleTimeoutPolicy::new(Some(Duration::seconds(60)));
        let session = session_created_at(0, 0);

        assert!(policy.decide_at(&session, at(60)).is_expired());
        assert_eq!(
            policy.decide_at(&session, at(61)),
            ExpirationDecision::Expired(Duration::seconds(-1))
        );
    }

    #[test]
    fn test_idle_clock_skew_counts_as_zero_idle() {
        let policy = IdleTimeoutPolicy::new(Some(Duration::seconds(60)));
        let session = session_created_at(0, 100);

        assert_eq!(
            policy.decide_at(&session, at(50)),
            ExpirationDecision::ExpiresIn(Duration::seconds(60))
        );
    }

    #[test]
    fn test_idle_disabled_defers() {
        let session = session_created_at(0, 0);

        assert!(IdleTimeoutPolicy::disabled().decide_at(&session, at(10_000)).is_deferred());
    }

    #[test]
    fn test_idle_default_is_thirty_minutes() {
        let policy = IdleTimeoutPolicy::default();

        assert_eq!(policy.idle_timeout(), Some(Duration::minutes(30)));
        assert_eq!(policy.action(), ExpirationAction::Invalidate);
    }

    #[test]
    fn test_idle_with_idle_timeout_replaces_value() {
        let policy = IdleTimeoutPolicy::disabled().with_idle_timeout(Some(Duration::seconds(5)));

        assert_eq!(policy.idle_timeout(), Some(Duration::seconds(5)));
    }

    #[test]
    fn test_fixed_requires_duration() {
        let result = FixedDurationPolicy::try_new(None, IdleTimeoutPolicy::default());
        assert!(matches!(result, Err(ExpiryError::MissingFixedDuration)));

        let policy =
            FixedDurationPolicy::try_new(Some(Duration::seconds(10)), IdleTimeoutPolicy::default())
                .unwrap();
        assert_eq!(policy.fixed_duration(), Duration::seconds(10));
    }

    #[test]
    fn test_fixed_without_idle_reports_fixed_remaining() {
        let policy = FixedDurationPolicy::fixed_only(Duration::seconds(2));
        let session = session_created_at(0, 0);

        assert_eq!(
            policy.decide_at(&session, at(1)),
            ExpirationDecision::ExpiresIn(Duration::seconds(1))
        );
        assert!(policy.decide_at(&session, at(2)).is_expired());
    }

    #[test]
    fn test_fixed_clock_skew_never_extends_cap() {
        let policy = FixedDurationPolicy::fixed_only(Duration::seconds(10));
        // Created "in the future" by a node whose clock runs ahead.
        let session = session_created_at(100, 100);

        assert_eq!(
            policy.decide_at(&session, at(0)),
            ExpirationDecision::ExpiresIn(Duration::seconds(10))
        );
    }

    #[test]
    fn test_fixed_defers_when_idle_fires_first() {
        let policy = FixedDurationPolicy::new(
            Duration::seconds(600),
            IdleTimeoutPolicy::new(Some(Duration::seconds(60))),
        );
        let session = session_created_at(0, 0);

        assert!(policy.decide_at(&session, at(10)).is_deferred());
    }

    #[test]
    fn test_fixed_wins_when_cap_comes_first() {
        let policy = FixedDurationPolicy::new(
            Duration::seconds(100),
            IdleTimeoutPolicy::new(Some(Duration::seconds(60))),
        );
        // Created long ago, accessed just now.
        let session = session_created_at(0, 80);

        assert_eq!(
            policy.decide_at(&session, at(80)),
            ExpirationDecision::ExpiresIn(Duration::seconds(20))
        );
        assert!(policy.decide_at(&session, at(100)).is_expired());
    }

    #[test]
    fn test_fixed_tie_defers_to_idle() {
        // Idle 8s, fixed 10s, session created 2s before last access.
        let policy = FixedDurationPolicy::new(
            Duration::seconds(10),
            IdleTimeoutPolicy::new(Some(Duration::seconds(8))),
        );
        let session = session_created_at(0, 2);

        assert!(policy.decide_at(&session, at(2)).is_deferred());

        // One more second since creation tips the cap below the idle window.
        let session = session_created_at(0, 3);
        assert_eq!(
            policy.decide_at(&session, at(3)),
            ExpirationDecision::ExpiresIn(Duration::seconds(7))
        );
    }

    #[test]
    fn test_action_is_configurable() {
        let policy =
            FixedDurationPolicy::fixed_only(Duration::seconds(1)).with_action(ExpirationAction::Destroy);
        assert_eq!(policy.action(), ExpirationAction::Destroy);

        let shared: Arc<dyn ExpirationPolicy> = Arc::new(policy);
        assert_eq!(shared.action(), ExpirationAction::Destroy);
    }
}
