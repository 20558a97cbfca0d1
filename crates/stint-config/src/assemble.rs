//! Build configured components from a [`StintConfig`].

use std::sync::Arc;

use chrono::Duration;
use stint_codec::{
    CodecChain, DataSerializerRegistry, StructuredSerializer, session_data_serializer,
    session_structured_serializer,
};
use stint_expiry::{
    ExpirationPolicy, FixedDurationExpirationRepository, FixedDurationPolicy, IdleTimeoutPolicy,
    SessionExpiryAdapter,
};
use stint_region::{RegionConfig, SessionRegion};
use stint_session::SessionRepository;

use crate::error::{ConfigError, Result};
use crate::types::{CodecName, StintConfig};

fn secs(field: &str, value: u64) -> Result<Duration> {
    i64::try_from(value)
        .ok()
        .and_then(Duration::try_seconds)
        .ok_or_else(|| ConfigError::InvalidValue {
            field: field.to_string(),
            reason: format!("{value} seconds is out of range"),
        })
}

/// Zero disables.
fn optional_secs(field: &str, value: u64) -> Result<Option<Duration>> {
    if value == 0 {
        return Ok(None);
    }
    secs(field, value).map(Some)
}

impl StintConfig {
    /// The configured idle-timeout policy.
    pub fn idle_policy(&self) -> Result<IdleTimeoutPolicy> {
        let expiration = self.expiration();
        let timeout = optional_secs("expiration.idle_timeout_secs", expiration.idle_timeout_secs)?;
        Ok(IdleTimeoutPolicy::new(timeout).with_action(expiration.action))
    }

    /// True if a fixed session lifetime is configured.
    pub fn has_fixed_duration(&self) -> bool {
        self.expiration().fixed_duration_secs.is_some()
    }

    /// The configured fixed-duration policy, composed with the idle policy.
    ///
    /// Fails if no fixed duration is configured.
    pub fn fixed_policy(&self) -> Result<FixedDurationPolicy> {
        let expiration = self.expiration();
        let fixed = expiration
            .fixed_duration_secs
            .map(|s| secs("expiration.fixed_duration_secs", s))
            .transpose()?;
        let policy = FixedDurationPolicy::try_new(fixed, self.idle_policy()?)?;
        Ok(policy.with_action(expiration.action))
    }

    /// The policy the lazy decorator evaluates on reads, if a fixed
    /// duration is configured.
    ///
    /// It checks the fixed lifetime alone: with the idle timeout composed in,
    /// an idle-dominated session would defer and never be evicted on read.
    pub fn lazy_policy(&self) -> Result<Option<FixedDurationPolicy>> {
        if !self.has_fixed_duration() {
            return Ok(None);
        }
        let fixed = self.fixed_policy()?;
        Ok(Some(
            FixedDurationPolicy::fixed_only(fixed.fixed_duration()).with_action(fixed.action()),
        ))
    }

    /// The policy the store should evaluate: fixed-duration when configured,
    /// otherwise idle-timeout.
    pub fn expiry_policy(&self) -> Result<Arc<dyn ExpirationPolicy>> {
        if self.has_fixed_duration() {
            return Ok(Arc::new(self.fixed_policy()?));
        }
        Ok(Arc::new(self.idle_policy()?))
    }

    /// Wrap `repository` so that reads enforce the fixed session lifetime.
    ///
    /// Without a fixed duration the repository is returned as is.
    pub fn decorate<R>(&self, repository: R) -> Result<Box<dyn SessionRepository>>
    where
        R: SessionRepository + 'static,
    {
        match self.lazy_policy()? {
            Some(policy) => Ok(Box::new(FixedDurationExpirationRepository::with_policy(
                repository, policy,
            ))),
            None => Ok(Box::new(repository)),
        }
    }

    /// Compose the configured structured codecs, followed by `extra`, into
    /// one structured serializer.
    pub fn structured_chain(
        &self,
        extra: impl IntoIterator<Item = Arc<StructuredSerializer>>,
    ) -> Result<Arc<StructuredSerializer>> {
        let mut members: Vec<Arc<StructuredSerializer>> = Vec::new();
        for codec in self.serialization().codecs {
            if codec == CodecName::SessionStructured {
                members.push(Arc::new(session_structured_serializer()));
            }
        }
        members.extend(extra);
        Ok(CodecChain::compose(members)?)
    }

    /// A registry holding the configured data serializers.
    pub fn data_registry(&self) -> Result<DataSerializerRegistry> {
        let mut registry = DataSerializerRegistry::new();
        for codec in self.serialization().codecs {
            if codec == CodecName::SessionData {
                registry.register(Arc::new(session_data_serializer()))?;
            }
        }
        Ok(registry)
    }

    /// The store's expiry hook for the configured policy.
    ///
    /// Structured entry values are decoded when a structured codec is configured.
    pub fn custom_expiry(&self) -> Result<SessionExpiryAdapter<Arc<dyn ExpirationPolicy>>> {
        let adapter = SessionExpiryAdapter::new(self.expiry_policy()?);
        if self.serialization().contains(CodecName::SessionStructured) {
            return Ok(adapter.with_structured_serializer(self.structured_chain([])?));
        }
        Ok(adapter)
    }

    pub fn region_config(&self) -> Result<RegionConfig> {
        let region = self.region();
        let config = RegionConfig::new()
            .with_max_entries(region.max_entries)
            .with_native_action(region.native_action);
        let timeout = optional_secs(
            "region.native_idle_timeout_secs",
            region.native_idle_timeout_secs,
        )?;
        Ok(match timeout {
            Some(timeout) => config.with_native_idle_timeout(timeout),
            None => config.without_native_idle_timeout(),
        })
    }

    /// A region wired with the configured serializers and expiry hook.
    pub fn build_region(&self) -> Result<SessionRegion> {
        let registry = Arc::new(self.data_registry()?);
        let expiry = Arc::new(self.custom_expiry()?);
        Ok(SessionRegion::new(self.region_config()?, registry).with_custom_expiry(expiry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use stint_codec::{FormatSerializer, StructuredWriter};
    use stint_expiry::{ExpirationAction, ExpirationDecision};
    use stint_session::{MapSessionRepository, Session};

    use crate::error::ConfigError;
    use crate::types::ExpirationConfig;

    fn config(toml: &str) -> StintConfig {
        let config = StintConfig::from_toml(toml).unwrap();
        config.validate().unwrap();
        config
    }

    fn session_at(created: i64) -> Session {
        let ts = Utc.timestamp_opt(1_700_000_000 + created, 0).unwrap();
        Session::with_id("s-1")
            .unwrap()
            .with_creation_time(ts)
            .with_last_accessed_time(ts)
    }

    #[test]
    fn test_idle_policy_defaults() {
        let policy = StintConfig::new().idle_policy().unwrap();

        assert_eq!(policy.idle_timeout(), Some(Duration::minutes(30)));
    }

    #[test]
    fn test_zero_idle_timeout_disables() {
        let config = config("[expiration]\nidle_timeout_secs = 0\n");

        assert_eq!(config.idle_policy().unwrap().idle_timeout(), None);
    }

    #[test]
    fn test_fixed_policy_requires_duration() {
        let err = StintConfig::new().fixed_policy().unwrap_err();

        assert!(matches!(err, ConfigError::Expiry(_)));
    }

    #[test]
    fn test_fixed_policy_composes_idle() {
        let config = config(
            "[expiration]\nidle_timeout_secs = 60\nfixed_duration_secs = 600\naction = \"destroy\"\n",
        );
        let policy = config.fixed_policy().unwrap();

        assert_eq!(policy.fixed_duration(), Duration::seconds(600));
        assert_eq!(policy.idle_policy().idle_timeout(), Some(Duration::seconds(60)));
        assert_eq!(policy.action(), ExpirationAction::Destroy);
    }

    #[test]
    fn test_expiry_policy_selection() {
        let session = session_at(0);
        let now = session.creation_time() + Duration::seconds(10);

        let idle_only = config("[expiration]\nidle_timeout_secs = 60\n");
        assert_eq!(
            idle_only.expiry_policy().unwrap().decide_at(&session, now),
            ExpirationDecision::ExpiresIn(Duration::seconds(50))
        );

        let fixed = config("[expiration]\nidle_timeout_secs = 0\nfixed_duration_secs = 20\n");
        assert_eq!(
            fixed.expiry_policy().unwrap().decide_at(&session, now),
            ExpirationDecision::ExpiresIn(Duration::seconds(10))
        );
    }

    #[test]
    fn test_decorate_without_fixed_duration_passes_through() {
        let repo = StintConfig::new().decorate(MapSessionRepository::new()).unwrap();
        let session = session_at(-1_000_000);
        repo.save(&session).unwrap();

        assert!(repo.find_by_id("s-1").unwrap().is_some());
    }

    #[test]
    fn test_decorate_with_fixed_duration_evicts() {
        let config = config("[expiration]\nfixed_duration_secs = 60\n");
        let repo = config.decorate(MapSessionRepository::new()).unwrap();

        // Created long ago; the fixed lifetime has passed.
        repo.save(&session_at(0)).unwrap();

        assert!(repo.find_by_id("s-1").unwrap().is_none());
    }

    #[test]
    fn test_lazy_policy_ignores_idle_timeout() {
        assert!(StintConfig::new().lazy_policy().unwrap().is_none());

        let config = config(
            "[expiration]\nidle_timeout_secs = 60\nfixed_duration_secs = 600\naction = \"destroy\"\n",
        );
        let policy = config.lazy_policy().unwrap().unwrap();

        assert_eq!(policy.fixed_duration(), Duration::seconds(600));
        assert_eq!(policy.idle_policy().idle_timeout(), None);
        assert_eq!(policy.action(), ExpirationAction::Destroy);
    }

    #[test]
    fn test_out_of_range_seconds_are_errors_without_validate() {
        let huge = StintConfig {
            expiration: Some(ExpirationConfig {
                idle_timeout_secs: 0,
                fixed_duration_secs: Some(u64::MAX),
                action: ExpirationAction::Invalidate,
            }),
            ..StintConfig::new()
        };
        let err = huge.fixed_policy().unwrap_err();
        assert!(
            matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "expiration.fixed_duration_secs")
        );

        // Fits in i64 but not in a chrono duration.
        let overflow = StintConfig::from_toml(
            "[expiration]\nidle_timeout_secs = 9223372036854775807\n",
        )
        .unwrap();
        assert!(matches!(
            overflow.idle_policy(),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(overflow.expiry_policy().is_err());
    }

    #[test]
    fn test_structured_chain_with_extra_member() {
        let config = StintConfig::new();
        let extra: Arc<StructuredSerializer> = Arc::new(session_structured_serializer());
        let chain = config.structured_chain([extra]).unwrap();

        let mut writer = StructuredWriter::new();
        assert!(chain.to_data(&session_at(0), &mut writer).unwrap());
    }

    #[test]
    fn test_structured_chain_empty_is_error() {
        let config = config("[serialization]\ncodecs = [\"session-data\"]\n");

        assert!(matches!(
            config.structured_chain([]),
            Err(ConfigError::Codec(_))
        ));
    }

    #[test]
    fn test_data_registry_follows_codec_list() {
        assert_eq!(StintConfig::new().data_registry().unwrap().len(), 1);

        let structured_only = config("[serialization]\ncodecs = [\"session-structured\"]\n");
        assert!(structured_only.data_registry().unwrap().is_empty());
    }

    #[test]
    fn test_region_config() {
        let config = config("[region]\nmax_entries = 7\nnative_idle_timeout_secs = 0\n");
        let region = config.region_config().unwrap();

        assert_eq!(region.max_entries, 7);
        assert_eq!(region.native_idle_timeout, None);
    }

    #[test]
    fn test_build_region_round_trips_sessions() {
        let region = StintConfig::new().build_region().unwrap();
        let session = Session::new();

        region.put(session.id(), &session).unwrap();
        let value = region.get(session.id()).unwrap().unwrap();

        assert_eq!(*value.downcast::<Session>().unwrap(), session);
    }
}
