//! Repository contract for loading and saving sessions.
//!
//! The [`SessionRepository`] trait keeps decorators (such as lazy expiration)
//! decoupled from the storage behind them. A decorator needs nothing beyond
//! these four operations.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::trace;

use crate::error::Result;
use crate::session::Session;

/// Trait for session repositories.
///
/// Implement this trait to connect sessions to a storage backend. Entry
/// points are synchronous; they run on whatever thread services the request.
pub trait SessionRepository: Send + Sync {
    /// Create a new, unsaved session.
    fn create_session(&self) -> Result<Session>;

    /// Save a session, replacing any stored state with the same id.
    fn save(&self, session: &Session) -> Result<()>;

    /// Find a session by id.
    ///
    /// Return `Ok(None)` if the session doesn't exist.
    fn find_by_id(&self, id: &str) -> Result<Option<Session>>;

    /// Delete a session by id. Deleting a missing session is not an error.
    fn delete_by_id(&self, id: &str) -> Result<()>;
}

impl<R: SessionRepository + ?Sized> SessionRepository for Arc<R> {
    fn create_session(&self) -> Result<Session> {
        (**self).create_session()
    }

    fn save(&self, session: &Session) -> Result<()> {
        (**self).save(session)
    }

    fn find_by_id(&self, id: &str) -> Result<Option<Session>> {
        (**self).find_by_id(id)
    }

    fn delete_by_id(&self, id: &str) -> Result<()> {
        (**self).delete_by_id(id)
    }
}

/// A plain in-memory repository with no expiration of its own.
#[derive(Debug, Default)]
pub struct MapSessionRepository {
    sessions: RwLock<HashMap<String, Session>>,
}

impl MapSessionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}

impl SessionRepository for MapSessionRepository {
    fn create_session(&self) -> Result<Session> {
        Ok(Session::new())
    }

    fn save(&self, session: &Session) -> Result<()> {
        let mut stored = session.clone();
        stored.attributes_mut().commit();
        trace!(session_id = %session.id(), "Saving session");
        self.sessions.write().insert(session.id().to_string(), stored);
        Ok(())
    }

    fn find_by_id(&self, id: &str) -> Result<Option<Session>> {
        Ok(self.sessions.read().get(id).cloned())
    }

    fn delete_by_id(&self, id: &str) -> Result<()> {
        self.sessions.write().remove(id);
        Ok(())
    }
}
