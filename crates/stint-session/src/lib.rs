//! Session snapshot model and repository contract.
//!
//! This crate provides the types every other stint crate works against:
//! - [`Session`], the snapshot evaluated by expiration policies and written by codecs
//! - [`SessionAttributes`] with delta tracking driven by a [`DirtyPredicate`]
//! - [`SessionRepository`], the create/find/save/delete contract decorators wrap
//!
//! # Example
//!
//! ```rust,ignore
//! use stint_session::{MapSessionRepository, SessionRepository};
//!
//! let repo = MapSessionRepository::new();
//! let mut session = repo.create_session()?;
//! session.set_attribute("cart", serde_json::json!(["book"]));
//! repo.save(&session)?;
//! ```

pub mod dirty;
mod error;
mod repository;
mod session;

pub use dirty::{AlwaysDirty, DirtyPredicate, DirtyPredicateExt, EqualsDirty, NeverDirty};
pub use error::{Error, Result};
pub use repository::{MapSessionRepository, SessionRepository};
pub use session::{
    DEFAULT_MAX_INACTIVE_INTERVAL_SECS, Session, SessionAttributes, SharedSession,
    is_valid_session_id,
};
