//! Lazy expiration enforced on read.

use chrono::{DateTime, Duration, Utc};
use stint_session::{Result, Session, SessionRepository};
use tracing::{debug, warn};

use crate::policy::{ExpirationPolicy, FixedDurationPolicy};

/// Repository decorator that enforces an expiration policy on every lookup.
///
/// A session found by [`find_by_id`](SessionRepository::find_by_id) whose
/// policy decision is `Expired` is deleted from the delegate and reported as
/// absent. Deferred decisions count as not expired. Writes pass through.
#[derive(Debug)]
pub struct FixedDurationExpirationRepository<R, P = FixedDurationPolicy> {
    delegate: R,
    policy: P,
}

impl<R: SessionRepository> FixedDurationExpirationRepository<R> {
    /// Cap sessions in `delegate` at `fixed_duration` from creation.
    pub fn new(delegate: R, fixed_duration: Duration) -> Self {
        Self::with_policy(delegate, FixedDurationPolicy::fixed_only(fixed_duration))
    }
}

impl<R, P> FixedDurationExpirationRepository<R, P>
where
    R: SessionRepository,
    P: ExpirationPolicy,
{
    pub fn with_policy(delegate: R, policy: P) -> Self {
        Self { delegate, policy }
    }

    pub fn delegate(&self) -> &R {
        &self.delegate
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    /// Look up a session as of `now`, deleting it if it has expired.
    pub fn find_by_id_at(&self, id: &str, now: DateTime<Utc>) -> Result<Option<Session>> {
        let Some(session) = self.delegate.find_by_id(id)? else {
            return Ok(None);
        };

        let decision = self.policy.decide_at(&session, now);
        if !decision.is_expired() {
            return Ok(Some(session));
        }

        debug!(session_id = id, %decision, "Session expired on read");
        if let Err(e) = self.delegate.delete_by_id(id) {
            warn!(session_id = id, error = %e, "Failed to delete expired session");
        }
        Ok(None)
    }
}

impl<R, P> SessionRepository for FixedDurationExpirationRepository<R, P>
where
    R: SessionRepository,
    P: ExpirationPolicy,
{
    fn create_session(&self) -> Result<Session> {
        self.delegate.create_session()
    }

    fn save(&self, session: &Session) -> Result<()> {
        self.delegate.save(session)
    }

    fn find_by_id(&self, id: &str) -> Result<Option<Session>> {
        self.find_by_id_at(id, Utc::now())
    }

    fn delete_by_id(&self, id: &str) -> Result<()> {
        self.delegate.delete_by_id(id)
    }
}
