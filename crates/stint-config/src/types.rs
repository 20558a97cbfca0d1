//! Configuration types mapping to the TOML schema.
//!
//! Top-level config:
//! ```toml
//! [expiration]
//! idle_timeout_secs = 1800        # 0 disables the idle opinion
//! fixed_duration_secs = 7200      # optional; caps session lifetime
//! action = "invalidate"           # or "destroy"
//!
//! [serialization]
//! codecs = ["session-data", "session-structured"]
//!
//! [region]
//! max_entries = 10000
//! native_idle_timeout_secs = 1800
//! native_action = "invalidate"
//! ```

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use stint_expiry::{DEFAULT_IDLE_TIMEOUT_SECS, ExpirationAction, MAX_TIMEOUT_SECS, NativeExpirationAction};
use stint_region::{DEFAULT_MAX_ENTRIES, DEFAULT_NATIVE_IDLE_TIMEOUT_SECS};

use crate::error::{ConfigError, Result};

// ─────────────────────────────────────────────────────────────────────────────
// Top-level Config
// ─────────────────────────────────────────────────────────────────────────────

/// Root configuration structure.
///
/// All sections are optional so that partial configs (e.g., project-local
/// overrides) can be loaded and merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StintConfig {
    /// Expiration policy settings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiration: Option<ExpirationConfig>,

    /// Codec selection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serialization: Option<SerializationConfig>,

    /// Region settings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<RegionSection>,
}

impl StintConfig {
    /// Create an empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Merge another config on top of this one (other takes priority).
    ///
    /// Sections replace each other wholesale.
    pub fn merge(&mut self, other: StintConfig) {
        if other.expiration.is_some() {
            self.expiration = other.expiration;
        }

        if other.serialization.is_some() {
            self.serialization = other.serialization;
        }

        if other.region.is_some() {
            self.region = other.region;
        }
    }

    /// Expiration section, or defaults.
    pub fn expiration(&self) -> ExpirationConfig {
        self.expiration.clone().unwrap_or_default()
    }

    /// Serialization section, or defaults.
    pub fn serialization(&self) -> SerializationConfig {
        self.serialization.clone().unwrap_or_default()
    }

    /// Region section, or defaults.
    pub fn region(&self) -> RegionSection {
        self.region.clone().unwrap_or_default()
    }

    /// Check every value is in range.
    pub fn validate(&self) -> Result<()> {
        let expiration = self.expiration();
        check_secs("expiration.idle_timeout_secs", expiration.idle_timeout_secs)?;
        if let Some(fixed) = expiration.fixed_duration_secs {
            if fixed == 0 {
                return Err(invalid(
                    "expiration.fixed_duration_secs",
                    "must be greater than zero",
                ));
            }
            check_secs("expiration.fixed_duration_secs", fixed)?;
        }

        let serialization = self.serialization();
        if serialization.codecs.is_empty() {
            return Err(invalid("serialization.codecs", "at least one codec is required"));
        }
        let mut seen = HashSet::new();
        for codec in &serialization.codecs {
            if !seen.insert(codec) {
                return Err(invalid(
                    "serialization.codecs",
                    format!("codec '{codec}' is listed more than once"),
                ));
            }
        }

        let region = self.region();
        if region.max_entries == 0 {
            return Err(invalid("region.max_entries", "must be greater than zero"));
        }
        check_secs("region.native_idle_timeout_secs", region.native_idle_timeout_secs)?;

        Ok(())
    }
}

fn check_secs(field: &str, secs: u64) -> Result<()> {
    if secs > u64::from(MAX_TIMEOUT_SECS) {
        return Err(invalid(
            field,
            format!("must be at most {MAX_TIMEOUT_SECS} seconds"),
        ));
    }
    Ok(())
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        reason: reason.into(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Expiration Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Expiration section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpirationConfig {
    /// Idle timeout in seconds. 0 disables it.
    pub idle_timeout_secs: u64,

    /// Maximum session lifetime from creation, in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fixed_duration_secs: Option<u64>,

    /// Action taken when a session expires.
    pub action: ExpirationAction,
}

impl Default for ExpirationConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: DEFAULT_IDLE_TIMEOUT_SECS as u64,
            fixed_duration_secs: None,
            action: ExpirationAction::default(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Serialization Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// A built-in codec selectable from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CodecName {
    /// Session data serializer (binary frames).
    SessionData,
    /// Session structured serializer.
    SessionStructured,
}

impl fmt::Display for CodecName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SessionData => f.write_str("session-data"),
            Self::SessionStructured => f.write_str("session-structured"),
        }
    }
}

/// Serialization section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerializationConfig {
    /// Codecs in registration order. Earlier entries win ties.
    pub codecs: Vec<CodecName>,
}

impl Default for SerializationConfig {
    fn default() -> Self {
        Self {
            codecs: vec![CodecName::SessionData, CodecName::SessionStructured],
        }
    }
}

impl SerializationConfig {
    pub fn contains(&self, codec: CodecName) -> bool {
        self.codecs.contains(&codec)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Region Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Region section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionSection {
    /// Maximum entries before LRU eviction.
    pub max_entries: usize,

    /// Native idle timeout in seconds. 0 disables it.
    pub native_idle_timeout_secs: u64,

    /// Action taken when the native idle timeout fires.
    pub native_action: NativeExpirationAction,
}

impl Default for RegionSection {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
            native_idle_timeout_secs: DEFAULT_NATIVE_IDLE_TIMEOUT_SECS as u64,
            native_action: NativeExpirationAction::default(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
