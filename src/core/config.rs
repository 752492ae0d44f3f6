//! Configuration for the telemetry subsystem.
//!
//! Provides serde-deserializable configuration with sensible defaults,
//! a builder for programmatic construction, and validation.

use crate::core::{Result, TallyError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Complete configuration for the telemetry subsystem
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Service name attached to HTTP instrumentation tags
    pub service_name: Option<String>,
    /// Path to the taxonomy catalog file (YAML). When absent only the
    /// built-in catalog is consulted.
    pub taxonomy_path: Option<PathBuf>,
    /// Interval between automatic flushes
    #[serde(with = "humantime_serde")]
    pub flush_interval: Duration,
    /// Route normalization configuration
    pub routes: RouteConfig,
}

/// Route normalization configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteConfig {
    /// Derive placeholder names from the preceding path segment
    /// (`/users/123` becomes `/users/:userId`)
    pub context_aware_placeholders: bool,
    /// Keep a trailing slash instead of stripping it
    pub preserve_trailing_slash: bool,
    /// Estimated-cardinality threshold above which a route is flagged
    pub cardinality_warn_threshold: u64,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: None,
            taxonomy_path: None,
            flush_interval: Duration::from_secs(60),
            routes: RouteConfig::default(),
        }
    }
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            context_aware_placeholders: true,
            preserve_trailing_slash: false,
            cardinality_warn_threshold: 10_000,
        }
    }
}

impl TelemetryConfig {
    /// Create a builder for programmatic configuration.
    pub fn builder() -> TelemetryConfigBuilder {
        TelemetryConfigBuilder::default()
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.flush_interval.is_zero() {
            return Err(TallyError::config("flush_interval must be greater than zero"));
        }
        if let Some(name) = &self.service_name {
            if name.is_empty() {
                return Err(TallyError::config("service_name must not be empty"));
            }
        }
        Ok(())
    }
}

/// Builder for [`TelemetryConfig`].
#[derive(Debug, Default)]
pub struct TelemetryConfigBuilder {
    config: TelemetryConfig,
}

impl TelemetryConfigBuilder {
    /// Set the service name used in HTTP instrumentation tags.
    pub fn service_name(mut self, name: impl Into<String>) -> Self {
        self.config.service_name = Some(name.into());
        self
    }

    /// Set the taxonomy catalog file path.
    pub fn taxonomy_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.taxonomy_path = Some(path.into());
        self
    }

    /// Set the automatic flush interval.
    pub fn flush_interval(mut self, interval: Duration) -> Self {
        self.config.flush_interval = interval;
        self
    }

    /// Disable context-aware route placeholders.
    pub fn generic_placeholders(mut self) -> Self {
        self.config.routes.context_aware_placeholders = false;
        self
    }

    /// Validate and build the configuration.
    pub fn build(self) -> Result<TelemetryConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = TelemetryConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.flush_interval, Duration::from_secs(60));
        assert!(config.routes.context_aware_placeholders);
    }

    #[test]
    fn test_builder() {
        let config = TelemetryConfig::builder()
            .service_name("ecommerce")
            .flush_interval(Duration::from_secs(15))
            .generic_placeholders()
            .build()
            .unwrap();

        assert_eq!(config.service_name.as_deref(), Some("ecommerce"));
        assert_eq!(config.flush_interval, Duration::from_secs(15));
        assert!(!config.routes.context_aware_placeholders);
    }

    #[test]
    fn test_zero_flush_interval_rejected() {
        let result = TelemetryConfig::builder()
            .flush_interval(Duration::ZERO)
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_yaml_round_trip() {
        let yaml = "service_name: checkout\nflush_interval: 30s\n";
        let config: TelemetryConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.service_name.as_deref(), Some("checkout"));
        assert_eq!(config.flush_interval, Duration::from_secs(30));
    }
}
