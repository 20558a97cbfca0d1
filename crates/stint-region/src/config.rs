//! Configuration for a session region.

use chrono::Duration;
use stint_expiry::NativeExpirationAction;

/// Default maximum number of entries before LRU eviction.
pub const DEFAULT_MAX_ENTRIES: usize = 10_000;

/// Default native idle timeout (30 minutes).
pub const DEFAULT_NATIVE_IDLE_TIMEOUT_SECS: i64 = 30 * 60;

/// Configuration for a session region.
#[derive(Debug, Clone)]
pub struct RegionConfig {
    /// Maximum number of entries before LRU eviction.
    pub max_entries: usize,

    /// Idle timeout applied when no custom expiry answers for an entry.
    /// `None` means entries never expire natively.
    pub native_idle_timeout: Option<Duration>,

    /// Action taken when the native idle timeout fires.
    pub native_action: NativeExpirationAction,
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
            native_idle_timeout: Some(Duration::seconds(DEFAULT_NATIVE_IDLE_TIMEOUT_SECS)),
            native_action: NativeExpirationAction::Invalidate,
        }
    }
}

impl RegionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_entries(mut self, max: usize) -> Self {
        self.max_entries = max;
        self
    }

    pub fn with_native_idle_timeout(mut self, timeout: Duration) -> Self {
        self.native_idle_timeout = Some(timeout);
        self
    }

    /// Disable the native idle timeout.
    pub fn without_native_idle_timeout(mut self) -> Self {
        self.native_idle_timeout = None;
        self
    }

    pub fn with_native_action(mut self, action: NativeExpirationAction) -> Self {
        self.native_action = action;
        self
    }
}
