//! Session repository backed by a region.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use stint_codec::AnyValue;
use stint_session::{Error, Result, Session, SessionRepository, SharedSession};
use tracing::debug;

use crate::error::RegionError;
use crate::region::SessionRegion;

/// Stores sessions in a [`SessionRegion`], keyed by session id.
#[derive(Debug, Clone)]
pub struct RegionSessionRepository {
    region: Arc<SessionRegion>,
    max_inactive_interval: Option<chrono::Duration>,
}

impl RegionSessionRepository {
    pub fn new(region: Arc<SessionRegion>) -> Self {
        Self {
            region,
            max_inactive_interval: None,
        }
    }

    /// Max inactive interval given to sessions created by this repository.
    pub fn with_max_inactive_interval(mut self, interval: chrono::Duration) -> Self {
        self.max_inactive_interval = Some(interval);
        self
    }

    pub fn region(&self) -> &Arc<SessionRegion> {
        &self.region
    }

    /// Look up a session as of `now`.
    pub fn find_by_id_at(&self, id: &str, now: DateTime<Utc>) -> Result<Option<Session>> {
        let value = self.region.get_at(id, now).map_err(to_repository_error)?;
        Ok(value.and_then(into_session))
    }
}

impl SessionRepository for RegionSessionRepository {
    fn create_session(&self) -> Result<Session> {
        let session = Session::new();
        Ok(match self.max_inactive_interval {
            Some(interval) => session.with_max_inactive_interval(interval),
            None => session,
        })
    }

    fn save(&self, session: &Session) -> Result<()> {
        let mut stored = session.clone();
        stored.attributes_mut().commit();
        self.region
            .put(session.id(), &stored)
            .map_err(to_repository_error)
    }

    fn find_by_id(&self, id: &str) -> Result<Option<Session>> {
        self.find_by_id_at(id, Utc::now())
    }

    fn delete_by_id(&self, id: &str) -> Result<()> {
        self.region.remove(id);
        Ok(())
    }
}

fn into_session(value: AnyValue) -> Option<Session> {
    let value = match value.downcast::<Session>() {
        Ok(session) => return Some(*session),
        Err(value) => value,
    };
    match value.downcast::<SharedSession>() {
        Ok(shared) => Some(shared.read().clone()),
        Err(_) => {
            debug!("Region value is not a session");
            None
        }
    }
}

fn to_repository_error(e: RegionError) -> Error {
    Error::Repository(e.to_string())
}
