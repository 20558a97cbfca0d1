//! Session region with LRU eviction and per-entry expiry.

use std::any::Any;
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use lru::LruCache;
use parking_lot::RwLock;
use stint_codec::{AnyValue, DataSerializerRegistry};
use stint_expiry::{CustomExpiry, NativeExpirationAction, RegionEntry};
use tracing::{debug, trace};

use crate::config::RegionConfig;
use crate::error::{RegionError, Result};

/// A decoded entry handed to the custom expiry hook.
pub struct EntryView {
    key: String,
    value: Option<AnyValue>,
}

impl EntryView {
    pub fn new(key: impl Into<String>, value: Option<AnyValue>) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }

    pub fn into_value(self) -> Option<AnyValue> {
        self.value
    }
}

impl RegionEntry for EntryView {
    fn key(&self) -> &str {
        &self.key
    }

    fn value(&self) -> Option<&(dyn Any + Send + Sync)> {
        self.value.as_deref()
    }
}

impl fmt::Debug for EntryView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntryView")
            .field("key", &self.key)
            .field("has_value", &self.value.is_some())
            .finish()
    }
}

/// Entry stored in the region.
#[derive(Debug, Clone)]
struct StoredEntry {
    /// Encoded value; `None` once invalidated.
    value: Option<Bytes>,

    last_accessed: DateTime<Utc>,

    /// When the entry expires, if ever.
    deadline: Option<DateTime<Utc>>,

    action: NativeExpirationAction,
}

impl StoredEntry {
    fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.value.is_some() && self.deadline.is_some_and(|d| d <= now)
    }
}

/// Entries removed or emptied by a sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub destroyed: Vec<String>,
    pub invalidated: Vec<String>,
}

impl SweepReport {
    pub fn total(&self) -> usize {
        self.destroyed.len() + self.invalidated.len()
    }
}

/// Region statistics.
#[derive(Debug, Clone)]
pub struct RegionStats {
    /// Number of keys in the region, including invalidated ones.
    pub size: usize,

    /// Maximum capacity.
    pub capacity: usize,

    /// Number of keys whose value has been invalidated.
    pub invalidated: usize,
}

/// In-memory session region.
///
/// Values are stored encoded. Every write and every read asks the custom
/// expiry hook (if any) for the entry's timeout and action, measured from
/// that moment; when the hook has no answer the native idle timeout applies.
/// [`sweep`](Self::sweep) then expires every entry whose deadline has passed.
pub struct SessionRegion {
    inner: Arc<RwLock<LruCache<String, StoredEntry>>>,
    config: RegionConfig,
    registry: Arc<DataSerializerRegistry>,
    expiry: Option<Arc<dyn CustomExpiry<EntryView>>>,
}

impl SessionRegion {
    pub fn new(config: RegionConfig, registry: Arc<DataSerializerRegistry>) -> Self {
        let cap = NonZeroUsize::new(config.max_entries).unwrap_or(NonZeroUsize::MIN);

        Self {
            inner: Arc::new(RwLock::new(LruCache::new(cap))),
            config,
            registry,
            expiry: None,
        }
    }

    /// Install a per-entry expiry hook.
    pub fn with_custom_expiry(mut self, expiry: Arc<dyn CustomExpiry<EntryView>>) -> Self {
        self.expiry = Some(expiry);
        self
    }

    pub fn config(&self) -> &RegionConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<DataSerializerRegistry> {
        &self.registry
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// Store `value` under `key`.
    pub fn put(&self, key: &str, value: &(dyn Any + Send + Sync)) -> Result<()> {
        self.put_at(key, value, Utc::now())
    }

    /// Store `value` under `key` as of `now`.
    pub fn put_at(
        &self,
        key: &str,
        value: &(dyn Any + Send + Sync),
        now: DateTime<Utc>,
    ) -> Result<()> {
        let bytes = self
            .registry
            .encode(value)?
            .ok_or_else(|| RegionError::NoSerializer(key.to_string()))?;

        let view = EntryView::new(key, self.registry.decode(bytes.clone())?);
        let (deadline, action) = self.schedule(&view, now);

        let entry = StoredEntry {
            value: Some(bytes),
            last_accessed: now,
            deadline,
            action,
        };

        let mut lru = self.inner.write();
        if let Some((evicted, _)) = lru.push(key.to_string(), entry)
            && evicted != key
        {
            debug!(key = %evicted, "Evicting LRU entry to make room");
        }

        trace!(key, ?deadline, %action, size = lru.len(), "Entry stored");
        Ok(())
    }

    /// Read the value under `key`, resetting its idle clock.
    pub fn get(&self, key: &str) -> Result<Option<AnyValue>> {
        self.get_at(key, Utc::now())
    }

    /// Read the value under `key` as of `now`.
    ///
    /// An entry whose deadline has passed is expired first and reads as
    /// absent.
    pub fn get_at(&self, key: &str, now: DateTime<Utc>) -> Result<Option<AnyValue>> {
        let mut lru = self.inner.write();

        let Some(entry) = lru.get(key) else {
            return Ok(None);
        };
        if entry.is_due(now) {
            let action = entry.action;
            debug!(key, %action, "Entry expired, applying action");
            Self::apply(&mut lru, key, action);
            return Ok(None);
        }
        let Some(bytes) = entry.value.clone() else {
            return Ok(None);
        };

        let view = EntryView::new(key, self.registry.decode(bytes)?);
        let (deadline, action) = self.schedule(&view, now);
        if let Some(entry) = lru.get_mut(key) {
            entry.last_accessed = now;
            entry.deadline = deadline;
            entry.action = action;
        }

        trace!(key, ?deadline, "Entry read");
        Ok(view.into_value())
    }

    /// Read the value under `key` without touching it.
    pub fn peek_at(&self, key: &str, now: DateTime<Utc>) -> Result<Option<AnyValue>> {
        let lru = self.inner.read();
        match lru.peek(key) {
            Some(entry) if !entry.is_due(now) => match &entry.value {
                Some(bytes) => Ok(self.registry.decode(bytes.clone())?),
                None => Ok(None),
            },
            _ => Ok(None),
        }
    }

    /// True if `key` is present, even if its value was invalidated.
    pub fn contains_key(&self, key: &str) -> bool {
        self.inner.read().contains(key)
    }

    /// True if `key` holds a value.
    pub fn contains_value_for_key(&self, key: &str) -> bool {
        self.inner
            .read()
            .peek(key)
            .is_some_and(|entry| entry.value.is_some())
    }

    /// When `key` was last written or read.
    pub fn last_accessed(&self, key: &str) -> Option<DateTime<Utc>> {
        self.inner.read().peek(key).map(|entry| entry.last_accessed)
    }

    /// Remove `key`. Returns true if it was present.
    pub fn remove(&self, key: &str) -> bool {
        let removed = self.inner.write().pop(key).is_some();
        if removed {
            debug!(key, "Entry removed");
        }
        removed
    }

    /// Drop the value under `key`, keeping the key.
    pub fn invalidate(&self, key: &str) {
        let mut lru = self.inner.write();
        Self::apply(&mut lru, key, NativeExpirationAction::Invalidate);
    }

    /// Expire every entry whose deadline is at or before `now`.
    pub fn sweep(&self, now: DateTime<Utc>) -> SweepReport {
        let mut lru = self.inner.write();
        let due: Vec<(String, NativeExpirationAction)> = lru
            .iter()
            .filter(|(_, entry)| entry.is_due(now))
            .map(|(key, entry)| (key.clone(), entry.action))
            .collect();

        let mut report = SweepReport::default();
        for (key, action) in due {
            Self::apply(&mut lru, &key, action);
            if action.removes_entry() {
                report.destroyed.push(key);
            } else {
                report.invalidated.push(key);
            }
        }

        if report.total() > 0 {
            debug!(
                destroyed = report.destroyed.len(),
                invalidated = report.invalidated.len(),
                "Swept expired entries"
            );
        }
        report
    }

    pub fn stats(&self) -> RegionStats {
        let lru = self.inner.read();
        RegionStats {
            size: lru.len(),
            capacity: self.config.max_entries,
            invalidated: lru.iter().filter(|(_, e)| e.value.is_none()).count(),
        }
    }

    /// Timeout and action for an entry evaluated at `now`.
    fn schedule(
        &self,
        view: &EntryView,
        now: DateTime<Utc>,
    ) -> (Option<DateTime<Utc>>, NativeExpirationAction) {
        if let Some(attributes) = self.expiry.as_ref().and_then(|e| e.expiry_at(view, now)) {
            return (Some(now + attributes.timeout()), attributes.action());
        }
        (
            self.config.native_idle_timeout.map(|timeout| now + timeout),
            self.config.native_action,
        )
    }

    fn apply(lru: &mut LruCache<String, StoredEntry>, key: &str, action: NativeExpirationAction) {
        if action.removes_entry() {
            lru.pop(key);
        } else if let Some(entry) = lru.peek_mut(key) {
            entry.value = None;
            entry.deadline = None;
        }
    }
}

impl Clone for SessionRegion {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            config: self.config.clone(),
            registry: Arc::clone(&self.registry),
            expiry: self.expiry.clone(),
        }
    }
}

impl fmt::Debug for SessionRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionRegion")
            .field("config", &self.config)
            .field("len", &self.len())
            .field("custom_expiry", &self.expiry.is_some())
            .finish()
    }
}
