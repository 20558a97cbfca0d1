//! Session snapshot and attribute map.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, SubsecRound, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::dirty::{DirtyPredicate, EqualsDirty};
use crate::error::{Error, Result};

/// Default max inactive interval for new sessions (30 minutes).
pub const DEFAULT_MAX_INACTIVE_INTERVAL_SECS: i64 = 30 * 60;

/// A session instance shared between the application and the store.
///
/// Codecs hold the read lock for the whole time they write the fields, so
/// an encoded session never mixes fields from two concurrent updates.
pub type SharedSession = Arc<RwLock<Session>>;

/// Returns true if `id` is usable as a session identifier (non-blank).
pub fn is_valid_session_id(id: &str) -> bool {
    !id.trim().is_empty()
}

/// Attribute map of a session.
///
/// Every write is checked against a [`DirtyPredicate`]; dirty writes are
/// recorded in the delta until [`commit`](Self::commit) is called.
#[derive(Clone, Serialize, Deserialize)]
#[serde(
    from = "HashMap<String, Value>",
    into = "HashMap<String, Value>"
)]
pub struct SessionAttributes {
    values: HashMap<String, Value>,
    delta: HashSet<String>,
    dirty: Arc<dyn DirtyPredicate>,
}

impl SessionAttributes {
    /// Create an empty attribute map using [`EqualsDirty`].
    pub fn new() -> Self {
        Self::with_predicate(Arc::new(EqualsDirty))
    }

    /// Create an empty attribute map using the given dirty predicate.
    pub fn with_predicate(dirty: Arc<dyn DirtyPredicate>) -> Self {
        Self {
            values: HashMap::new(),
            delta: HashSet::new(),
            dirty,
        }
    }

    /// Replace the dirty predicate used for future writes.
    pub fn set_predicate(&mut self, dirty: Arc<dyn DirtyPredicate>) {
        self.dirty = dirty;
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Set an attribute. Setting `Value::Null` removes it.
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        if value.is_null() {
            self.remove(&name);
            return;
        }

        if self.dirty.is_dirty(self.values.get(&name), Some(&value)) {
            self.delta.insert(name.clone());
        }
        self.values.insert(name, value);
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        let old = self.values.remove(name);
        if old.is_some() && self.dirty.is_dirty(old.as_ref(), None) {
            self.delta.insert(name.to_string());
        }
        old
    }

    /// Copy every entry of `other` into this map.
    pub fn extend(&mut self, other: HashMap<String, Value>) {
        for (name, value) in other {
            self.set(name, value);
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Whether any dirty write happened since the last commit.
    pub fn has_delta(&self) -> bool {
        !self.delta.is_empty()
    }

    /// Names of attributes changed since the last commit.
    pub fn delta(&self) -> impl Iterator<Item = &str> {
        self.delta.iter().map(String::as_str)
    }

    /// Clear the delta after the changes have been shipped.
    pub fn commit(&mut self) {
        self.delta.clear();
    }

    /// Copy of the plain name/value map.
    pub fn to_map(&self) -> HashMap<String, Value> {
        self.values.clone()
    }
}

impl Default for SessionAttributes {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for SessionAttributes {
    fn eq(&self, other: &Self) -> bool {
        self.values == other.values
    }
}

impl fmt::Debug for SessionAttributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionAttributes")
            .field("values", &self.values)
            .field("delta", &self.delta)
            .finish()
    }
}

impl From<HashMap<String, Value>> for SessionAttributes {
    fn from(values: HashMap<String, Value>) -> Self {
        Self {
            values,
            delta: HashSet::new(),
            dirty: Arc::new(EqualsDirty),
        }
    }
}

impl From<SessionAttributes> for HashMap<String, Value> {
    fn from(attributes: SessionAttributes) -> Self {
        attributes.values
    }
}

/// Snapshot of a session's state.
///
/// Timestamps are kept at millisecond precision and the max inactive
/// interval at whole seconds, which is what the wire formats carry.
/// Deserialization applies the same checks as the constructors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSession")]
pub struct Session {
    id: String,
    creation_time: DateTime<Utc>,
    last_accessed_time: DateTime<Utc>,
    #[serde(rename = "max_inactive_interval_secs", with = "interval_secs")]
    max_inactive_interval: Duration,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    principal_name: Option<String>,
    #[serde(default)]
    attributes: SessionAttributes,
}

impl Session {
    /// Create a new session with a random id, created and accessed now.
    pub fn new() -> Self {
        let now = Utc::now().trunc_subsecs(3);
        Self {
            id: new_session_id(),
            creation_time: now,
            last_accessed_time: now,
            max_inactive_interval: Duration::seconds(DEFAULT_MAX_INACTIVE_INTERVAL_SECS),
            principal_name: None,
            attributes: SessionAttributes::new(),
        }
    }

    /// Create a new session with the given id.
    pub fn with_id(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if !is_valid_session_id(&id) {
            return Err(Error::InvalidSessionId(id));
        }
        Ok(Self { id, ..Self::new() })
    }

    /// Set the creation time.
    pub fn with_creation_time(mut self, ts: DateTime<Utc>) -> Self {
        self.creation_time = ts.trunc_subsecs(3);
        self
    }

    /// Set the last accessed time.
    pub fn with_last_accessed_time(mut self, ts: DateTime<Utc>) -> Self {
        self.set_last_accessed_time(ts);
        self
    }

    /// Set the max inactive interval.
    pub fn with_max_inactive_interval(mut self, interval: Duration) -> Self {
        self.set_max_inactive_interval(interval);
        self
    }

    /// Set the principal name.
    pub fn with_principal_name(mut self, name: impl Into<String>) -> Self {
        self.principal_name = Some(name.into());
        self
    }

    /// Replace the attribute map.
    pub fn with_attributes(mut self, attributes: SessionAttributes) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Assign a fresh random id and return it.
    pub fn change_session_id(&mut self) -> &str {
        self.id = new_session_id();
        &self.id
    }

    pub fn creation_time(&self) -> DateTime<Utc> {
        self.creation_time
    }

    pub fn last_accessed_time(&self) -> DateTime<Utc> {
        self.last_accessed_time
    }

    pub fn set_last_accessed_time(&mut self, ts: DateTime<Utc>) {
        self.last_accessed_time = ts.trunc_subsecs(3);
    }

    /// Record an access at the current time.
    pub fn touch(&mut self) {
        self.set_last_accessed_time(Utc::now());
    }

    pub fn max_inactive_interval(&self) -> Duration {
        self.max_inactive_interval
    }

    pub fn set_max_inactive_interval(&mut self, interval: Duration) {
        self.max_inactive_interval = Duration::seconds(interval.num_seconds());
    }

    pub fn principal_name(&self) -> Option<&str> {
        self.principal_name.as_deref()
    }

    pub fn set_principal_name(&mut self, name: Option<String>) {
        self.principal_name = name;
    }

    pub fn attributes(&self) -> &SessionAttributes {
        &self.attributes
    }

    pub fn attributes_mut(&mut self) -> &mut SessionAttributes {
        &mut self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    pub fn set_attribute(&mut self, name: impl Into<String>, value: Value) {
        self.attributes.set(name, value);
    }

    pub fn remove_attribute(&mut self, name: &str) -> Option<Value> {
        self.attributes.remove(name)
    }

    /// Whether the session's own max inactive interval has elapsed at `now`.
    ///
    /// A zero or negative interval means the session never goes idle.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.max_inactive_interval > Duration::zero()
            && now - self.last_accessed_time >= self.max_inactive_interval
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Wrap the session for sharing between threads.
    pub fn into_shared(self) -> SharedSession {
        Arc::new(RwLock::new(self))
    }
}

/// Session fields as they appear on the wire, before validation.
#[derive(Deserialize)]
struct RawSession {
    id: String,
    creation_time: DateTime<Utc>,
    last_accessed_time: DateTime<Utc>,
    #[serde(rename = "max_inactive_interval_secs", with = "interval_secs")]
    max_inactive_interval: Duration,
    #[serde(default)]
    principal_name: Option<String>,
    #[serde(default)]
    attributes: SessionAttributes,
}

impl TryFrom<RawSession> for Session {
    type Error = Error;

    fn try_from(raw: RawSession) -> Result<Self> {
        let mut session = Session::with_id(raw.id)?
            .with_creation_time(raw.creation_time)
            .with_last_accessed_time(raw.last_accessed_time)
            .with_max_inactive_interval(raw.max_inactive_interval)
            .with_attributes(raw.attributes);
        session.set_principal_name(raw.principal_name);
        Ok(session)
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

fn new_session_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

mod interval_secs {
    use chrono::Duration;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(interval: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_i64(interval.num_seconds())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = i64::deserialize(d)?;
        Duration::try_seconds(secs)
            .ok_or_else(|| serde::de::Error::custom(format!("interval out of range: {secs}")))
    }
}
