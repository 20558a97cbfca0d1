//! In-memory session region with LRU eviction and custom expiry.
//!
//! This crate provides a store that speaks the same protocols a data grid
//! region does:
//! - values cross the boundary encoded through a [`DataSerializerRegistry`]
//! - an optional [`CustomExpiry`] hook sets per-entry timeout and action,
//!   falling back to the region's native idle timeout
//! - LRU eviction keeps the region under its configured capacity
//!
//! [`RegionSessionRepository`] exposes a region as a [`SessionRepository`].
//!
//! # Example
//!
//! ```rust,ignore
//! use stint_region::{RegionConfig, SessionRegion};
//!
//! let region = SessionRegion::new(RegionConfig::default(), registry)
//!     .with_custom_expiry(Arc::new(SessionExpiryAdapter::new(policy)));
//! region.put("s-1", &session)?;
//! let removed = region.sweep(Utc::now());
//! ```
//!
//! [`DataSerializerRegistry`]: stint_codec::DataSerializerRegistry
//! [`CustomExpiry`]: stint_expiry::CustomExpiry
//! [`SessionRepository`]: stint_session::SessionRepository

mod config;
mod error;
mod region;
mod repository;

pub use config::{DEFAULT_MAX_ENTRIES, DEFAULT_NATIVE_IDLE_TIMEOUT_SECS, RegionConfig};
pub use error::{RegionError, Result};
pub use region::{EntryView, RegionStats, SessionRegion, SweepReport};
pub use repository::RegionSessionRepository;
