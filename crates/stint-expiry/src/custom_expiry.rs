//! Bridge from expiration policies to a store's per-entry expiry hook.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use stint_codec::{FormatSerializer, StructuredInstance, StructuredReader, StructuredSerializer};
use stint_session::{Session, SharedSession};
use tracing::{debug, trace};

use crate::decision::{ExpirationAction, ExpirationDecision};
use crate::policy::ExpirationPolicy;

/// Largest timeout a store accepts, in seconds.
pub const MAX_TIMEOUT_SECS: u32 = i32::MAX as u32;

/// Expiration actions understood by the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NativeExpirationAction {
    #[default]
    Invalidate,
    LocalInvalidate,
    Destroy,
    LocalDestroy,
}

impl NativeExpirationAction {
    /// True if the entry is removed rather than emptied.
    pub fn removes_entry(&self) -> bool {
        matches!(self, Self::Destroy | Self::LocalDestroy)
    }
}

impl From<ExpirationAction> for NativeExpirationAction {
    fn from(action: ExpirationAction) -> Self {
        match action {
            ExpirationAction::Destroy => Self::Destroy,
            ExpirationAction::Invalidate => Self::Invalidate,
        }
    }
}

impl fmt::Display for NativeExpirationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Invalidate => "invalidate",
            Self::LocalInvalidate => "local-invalidate",
            Self::Destroy => "destroy",
            Self::LocalDestroy => "local-destroy",
        };
        f.write_str(name)
    }
}

/// Per-entry expiration settings handed to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpirationAttributes {
    timeout_secs: u32,
    action: NativeExpirationAction,
}

impl ExpirationAttributes {
    /// Build attributes, clamping the timeout into `[1, MAX_TIMEOUT_SECS]`.
    pub fn new(timeout: Duration, action: NativeExpirationAction) -> Self {
        Self {
            timeout_secs: to_timeout_secs(timeout),
            action,
        }
    }

    pub fn timeout_secs(&self) -> u32 {
        self.timeout_secs
    }

    pub fn timeout(&self) -> Duration {
        Duration::seconds(i64::from(self.timeout_secs))
    }

    pub fn action(&self) -> NativeExpirationAction {
        self.action
    }
}

/// Convert a duration to whole seconds accepted by the store.
///
/// Zero and negative durations become 1 second so that expiry happens on
/// the store's next check.
pub fn to_timeout_secs(duration: Duration) -> u32 {
    duration.num_seconds().clamp(1, i64::from(MAX_TIMEOUT_SECS)) as u32
}

/// An entry as seen by the store's expiry hook.
pub trait RegionEntry {
    fn key(&self) -> &str;

    /// The entry's value, `None` once it has been invalidated.
    fn value(&self) -> Option<&(dyn Any + Send + Sync)>;
}

/// The store's per-entry expiry hook. `None` means "use the native idle timeout".
pub trait CustomExpiry<E: ?Sized>: Send + Sync {
    fn expiry_at(&self, entry: &E, now: DateTime<Utc>) -> Option<ExpirationAttributes>;

    fn expiry(&self, entry: &E) -> Option<ExpirationAttributes> {
        self.expiry_at(entry, Utc::now())
    }
}

/// Answers the store's expiry hook by evaluating an [`ExpirationPolicy`].
///
/// Entry values may be a [`Session`], a [`SharedSession`] or, when a
/// structured serializer is configured, a [`StructuredInstance`] that decodes
/// to a session. Anything else gets the native idle timeout.
pub struct SessionExpiryAdapter<P> {
    policy: P,
    structured: Option<Arc<StructuredSerializer>>,
}

impl<P: ExpirationPolicy> SessionExpiryAdapter<P> {
    pub fn new(policy: P) -> Self {
        Self {
            policy,
            structured: None,
        }
    }

    /// Decode structured entry values with `serializer` before evaluating them.
    pub fn with_structured_serializer(mut self, serializer: Arc<StructuredSerializer>) -> Self {
        self.structured = Some(serializer);
        self
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    /// Evaluate the policy against an entry value.
    ///
    /// Returns `None` when the value is not a session.
    pub fn decide_value(
        &self,
        value: &(dyn Any + Send + Sync),
        now: DateTime<Utc>,
    ) -> Option<ExpirationDecision> {
        if let Some(session) = value.downcast_ref::<Session>() {
            return Some(self.policy.decide_at(session, now));
        }

        if let Some(shared) = value.downcast_ref::<SharedSession>() {
            return Some(self.policy.decide_at(&shared.read(), now));
        }

        if let Some(instance) = value.downcast_ref::<StructuredInstance>() {
            let session = self.decode_structured(instance)?;
            return Some(self.policy.decide_at(&session, now));
        }

        None
    }

    fn decode_structured(&self, instance: &StructuredInstance) -> Option<Session> {
        let serializer = self.structured.as_ref()?;
        let mut reader = StructuredReader::new(instance.clone());

        match serializer.from_data(&mut reader) {
            Ok(Some(value)) => match value.downcast::<Session>() {
                Ok(session) => Some(*session),
                Err(_) => {
                    trace!(type_name = instance.type_name(), "Structured value is not a session");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                debug!(type_name = instance.type_name(), error = %e, "Failed to decode structured session");
                None
            }
        }
    }

    fn attributes_for(&self, decision: ExpirationDecision) -> Option<ExpirationAttributes> {
        let remaining = decision.remaining()?;
        Some(ExpirationAttributes::new(remaining, self.policy.action().into()))
    }
}

impl<P, E> CustomExpiry<E> for SessionExpiryAdapter<P>
where
    P: ExpirationPolicy,
    E: RegionEntry + ?Sized,
{
    fn expiry_at(&self, entry: &E, now: DateTime<Utc>) -> Option<ExpirationAttributes> {
        let decision = self.decide_value(entry.value()?, now)?;
        let attributes = self.attributes_for(decision);
        trace!(key = entry.key(), %decision, "Evaluated session expiry");
        attributes
    }
}

impl<P: fmt::Debug> fmt::Debug for SessionExpiryAdapter<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionExpiryAdapter")
            .field("policy", &self.policy)
            .field("structured", &self.structured.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{FixedDurationPolicy, IdleTimeoutPolicy};
    use chrono::TimeZone;
    use proptest::prelude::*;
    use stint_codec::{StructuredWriter, session_structured_serializer};

    struct Entry {
        key: String,
        value: Option<Box<dyn Any + Send + Sync>>,
    }

    impl Entry {
        fn new(value: impl Any + Send + Sync) -> Self {
            Self {
                key: "s-1".to_string(),
                value: Some(Box::new(value)),
            }
        }
    }

    impl RegionEntry for Entry {
        fn key(&self) -> &str {
            &self.key
        }

        fn value(&self) -> Option<&(dyn Any + Send + Sync)> {
            self.value.as_deref()
        }
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn session() -> Session {
        Session::with_id("s-1")
            .unwrap()
            .with_creation_time(at(0))
            .with_last_accessed_time(at(0))
    }

    fn idle_adapter(secs: i64) -> SessionExpiryAdapter<IdleTimeoutPolicy> {
        SessionExpiryAdapter::new(IdleTimeoutPolicy::new(Some(Duration::seconds(secs))))
    }

    #[test]
    fn test_session_value() {
        let adapter = idle_adapter(60);
        let attrs = adapter.expiry_at(&Entry::new(session()), at(0)).unwrap();

        assert_eq!(attrs.timeout_secs(), 60);
        assert_eq!(attrs.action(), NativeExpirationAction::Invalidate);
    }

    #[test]
    fn test_shared_session_value() {
        let adapter = idle_adapter(60);
        let attrs = adapter
            .expiry_at(&Entry::new(session().into_shared()), at(15))
            .unwrap();

        assert_eq!(attrs.timeout_secs(), 45);
    }

    #[test]
    fn test_expired_session_clamps_to_one_second() {
        let adapter = idle_adapter(60);
        let attrs = adapter.expiry_at(&Entry::new(session()), at(61)).unwrap();

        assert_eq!(attrs.timeout_secs(), 1);
    }

    #[test]
    fn test_deferred_decision_has_no_attributes() {
        let adapter = SessionExpiryAdapter::new(IdleTimeoutPolicy::disabled());

        assert!(adapter.expiry_at(&Entry::new(session()), at(0)).is_none());
    }

    #[test]
    fn test_non_session_value_has_no_attributes() {
        let adapter = idle_adapter(60);

        assert!(adapter.expiry_at(&Entry::new("plain text"), at(0)).is_none());
        assert!(adapter.expiry_at(&Entry::new(42u64), at(0)).is_none());
    }

    #[test]
    fn test_invalidated_entry_has_no_attributes() {
        let adapter = idle_adapter(60);
        let entry = Entry {
            key: "s-1".to_string(),
            value: None,
        };

        assert!(adapter.expiry_at(&entry, at(0)).is_none());
    }

    #[test]
    fn test_policy_action_is_carried() {
        let policy = FixedDurationPolicy::fixed_only(Duration::seconds(30))
            .with_action(ExpirationAction::Destroy);
        let adapter = SessionExpiryAdapter::new(policy);
        let attrs = adapter.expiry_at(&Entry::new(session()), at(10)).unwrap();

        assert_eq!(attrs.timeout_secs(), 20);
        assert_eq!(attrs.action(), NativeExpirationAction::Destroy);
        assert!(attrs.action().removes_entry());
    }

    #[test]
    fn test_structured_value_is_decoded() {
        let serializer: Arc<StructuredSerializer> = Arc::new(session_structured_serializer());
        let mut writer = StructuredWriter::new();
        assert!(serializer.to_data(&session(), &mut writer).unwrap());
        let instance = writer.finish().unwrap();

        let without = idle_adapter(60);
        assert!(without.expiry_at(&Entry::new(instance.clone()), at(0)).is_none());

        let with = idle_adapter(60).with_structured_serializer(serializer);
        let attrs = with.expiry_at(&Entry::new(instance), at(20)).unwrap();
        assert_eq!(attrs.timeout_secs(), 40);
    }

    #[test]
    fn test_structured_value_of_other_type_is_ignored() {
        let serializer: Arc<StructuredSerializer> = Arc::new(session_structured_serializer());
        let mut writer = StructuredWriter::new();
        writer.set_type_name("app.Cart");
        writer.write_string("id", "cart-1");
        let instance = writer.finish().unwrap();

        let adapter = idle_adapter(60).with_structured_serializer(serializer);
        assert!(adapter.expiry_at(&Entry::new(instance), at(0)).is_none());
    }

    #[test]
    fn test_timeout_clamp_edges() {
        assert_eq!(to_timeout_secs(Duration::zero()), 1);
        assert_eq!(to_timeout_secs(Duration::seconds(-30)), 1);
        assert_eq!(to_timeout_secs(Duration::milliseconds(1500)), 1);
        assert_eq!(to_timeout_secs(Duration::seconds(i64::from(i32::MAX) + 10)), MAX_TIMEOUT_SECS);
    }

    #[test]
    fn test_native_action_serde() {
        let json = serde_json::to_string(&NativeExpirationAction::LocalDestroy).unwrap();
        assert_eq!(json, "\"local-destroy\"");
    }

    proptest! {
        #[test]
        fn prop_timeout_clamped(secs in -1_000_000_000_000i64..1_000_000_000_000i64) {
            let timeout = to_timeout_secs(Duration::seconds(secs));
            prop_assert!(timeout >= 1);
            prop_assert!(timeout <= MAX_TIMEOUT_SECS);
            if (1..=i64::from(MAX_TIMEOUT_SECS)).contains(&secs) {
                prop_assert_eq!(i64::from(timeout), secs);
            }
        }
    }
}
