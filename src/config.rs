//! Admission Configuration
//!
//! Every threshold the policies consult lives here so tests can run the
//! engine with compressed time scales. Missing fields fall back to the
//! production defaults.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::error::ConfigError;

/// Whether the host runs in production or in a test/sandbox mode.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeEnvironment {
    #[default]
    Production,
    Sandbox,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AdmissionConfig {
    pub environment: RuntimeEnvironment,
    pub banner: BannerConfig,
    pub native: NativeConfig,
    pub interstitial: InterstitialConfig,
    pub metrics: MetricsConfig,
    pub upsell: UpsellConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BannerConfig {
    /// Cooldown after the first failure; doubles per further failure.
    pub base_cooldown_ms: i64,
    pub max_backoff_multiplier: u32,
    /// Failure streak at which banners stop until an explicit reset.
    pub max_consecutive_failures: u32,
    pub min_refresh_ms: i64,
    pub max_refresh_ms: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NativeConfig {
    pub base_cooldown_ms: i64,
    pub max_backoff_multiplier: u32,
    /// Failure streak at which native content is off for the session.
    pub max_consecutive_failures: u32,
    /// Smallest content group that may carry native content.
    pub minimum_scope_size: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct InterstitialConfig {
    pub max_per_session: u32,
    pub min_interval_ms: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MetricsConfig {
    pub sample_capacity: usize,
    pub high_latency_threshold_ms: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct UpsellConfig {
    pub native_impression_threshold: u32,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            environment: RuntimeEnvironment::Production,
            banner: BannerConfig::default(),
            native: NativeConfig::default(),
            interstitial: InterstitialConfig::default(),
            metrics: MetricsConfig::default(),
            upsell: UpsellConfig::default(),
        }
    }
}

impl Default for BannerConfig {
    fn default() -> Self {
        Self {
            base_cooldown_ms: 30_000,
            max_backoff_multiplier: 8,
            max_consecutive_failures: 3,
            min_refresh_ms: 60_000,
            max_refresh_ms: 90_000,
        }
    }
}

impl Default for NativeConfig {
    fn default() -> Self {
        Self {
            base_cooldown_ms: 60_000,
            max_backoff_multiplier: 4,
            max_consecutive_failures: 2,
            minimum_scope_size: 10,
        }
    }
}

impl Default for InterstitialConfig {
    fn default() -> Self {
        Self {
            max_per_session: 2,
            min_interval_ms: 3 * 60 * 1000,
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            sample_capacity: 10,
            high_latency_threshold_ms: 1_500,
        }
    }
}

impl Default for UpsellConfig {
    fn default() -> Self {
        Self {
            native_impression_threshold: 2,
        }
    }
}

impl AdmissionConfig {
    /// Parse and validate a YAML document.
    pub fn from_yaml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a JSON document.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from disk, picking the format from the file extension.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        let parse: fn(&str) -> Result<Self, ConfigError> = match ext.as_deref() {
            Some("yaml") | Some("yml") => Self::from_yaml_str,
            Some("json") => Self::from_json_str,
            _ => return Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
        };

        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let config = parse(&raw)?;
        info!("Loaded admission config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let b = &self.banner;
        if b.base_cooldown_ms < 0 {
            return Err(ConfigError::invalid("banner.base_cooldown_ms", "must be >= 0"));
        }
        if b.max_backoff_multiplier == 0 {
            return Err(ConfigError::invalid("banner.max_backoff_multiplier", "must be > 0"));
        }
        if b.max_consecutive_failures == 0 {
            return Err(ConfigError::invalid("banner.max_consecutive_failures", "must be > 0"));
        }
        if b.min_refresh_ms < 0 {
            return Err(ConfigError::invalid("banner.min_refresh_ms", "must be >= 0"));
        }
        if b.min_refresh_ms > b.max_refresh_ms {
            return Err(ConfigError::invalid(
                "banner.min_refresh_ms",
                format!("{} exceeds max_refresh_ms {}", b.min_refresh_ms, b.max_refresh_ms),
            ));
        }

        let n = &self.native;
        if n.base_cooldown_ms < 0 {
            return Err(ConfigError::invalid("native.base_cooldown_ms", "must be >= 0"));
        }
        if n.max_backoff_multiplier == 0 {
            return Err(ConfigError::invalid("native.max_backoff_multiplier", "must be > 0"));
        }
        if n.max_consecutive_failures == 0 {
            return Err(ConfigError::invalid("native.max_consecutive_failures", "must be > 0"));
        }
        if n.minimum_scope_size < 0 {
            return Err(ConfigError::invalid("native.minimum_scope_size", "must be >= 0"));
        }

        if self.interstitial.max_per_session == 0 {
            return Err(ConfigError::invalid("interstitial.max_per_session", "must be > 0"));
        }
        if self.interstitial.min_interval_ms < 0 {
            return Err(ConfigError::invalid("interstitial.min_interval_ms", "must be >= 0"));
        }

        if self.metrics.sample_capacity == 0 {
            return Err(ConfigError::invalid("metrics.sample_capacity", "must be > 0"));
        }
        if self.upsell.native_impression_threshold == 0 {
            return Err(ConfigError::invalid("upsell.native_impression_threshold", "must be > 0"));
        }

        Ok(())
    }

    /// The occlusion check only applies in production.
    pub fn is_production(&self) -> bool {
        self.environment == RuntimeEnvironment::Production
    }
}
