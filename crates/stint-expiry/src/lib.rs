//! Session expiration policies.
//!
//! This crate decides when a session should be considered expired:
//! - [`IdleTimeoutPolicy`] expires sessions after a period of inactivity
//! - [`FixedDurationPolicy`] caps a session's lifetime from its creation time
//! - [`SessionExpiryAdapter`] turns policy decisions into a store's per-entry
//!   expiration attributes
//! - [`FixedDurationExpirationRepository`] enforces a policy lazily on every read
//!
//! Policies answer with an [`ExpirationDecision`]. `Defer` means "no opinion"
//! and lets the store's native idle timeout decide; it is never the same as
//! "expires now".
//!
//! # Example
//!
//! ```rust,ignore
//! use chrono::Duration;
//! use stint_expiry::{FixedDurationPolicy, IdleTimeoutPolicy, SessionExpiryAdapter};
//!
//! let policy = FixedDurationPolicy::new(
//!     Duration::hours(8),
//!     IdleTimeoutPolicy::new(Some(Duration::minutes(30))),
//! );
//! let expiry = SessionExpiryAdapter::new(policy);
//! ```

mod custom_expiry;
mod decision;
mod error;
mod lazy;
mod policy;

pub use custom_expiry::{
    CustomExpiry, ExpirationAttributes, MAX_TIMEOUT_SECS, NativeExpirationAction, RegionEntry,
    SessionExpiryAdapter, to_timeout_secs,
};
pub use decision::{ExpirationAction, ExpirationDecision};
pub use error::{ExpiryError, Result};
pub use lazy::FixedDurationExpirationRepository;
pub use policy::{
    DEFAULT_IDLE_TIMEOUT_SECS, ExpirationPolicy, FixedDurationPolicy, IdleTimeoutPolicy,
};
