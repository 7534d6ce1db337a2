//! Configuration management for the throttler.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

use crate::error::{Result, ThrottlerError};
use crate::throttle::SlidingWindowLimiter;

/// Main configuration for the throttler.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ThrottlerConfig {
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Rule used for throttles that are not configured by name
    #[serde(default)]
    pub default: ThrottleRule,

    /// Named throttles
    #[serde(default)]
    pub throttles: HashMap<String, ThrottleRule>,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Level filter, overridden by `RUST_LOG` when set
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON log lines
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// A sliding window rule: at most `rate_limit` entries per `period_secs`.
///
/// Values are kept untyped so that zero or negative numbers are rejected
/// when the limiter is built rather than when the file is parsed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThrottleRule {
    /// Maximum admissions per window
    #[serde(default = "default_rate_limit")]
    pub rate_limit: i64,

    /// Window length in seconds
    #[serde(default = "default_period_secs")]
    pub period_secs: f64,
}

impl Default for ThrottleRule {
    fn default() -> Self {
        Self {
            rate_limit: default_rate_limit(),
            period_secs: default_period_secs(),
        }
    }
}

fn default_rate_limit() -> i64 {
    10
}

fn default_period_secs() -> f64 {
    1.0
}

impl ThrottleRule {
    /// Build a limiter enforcing this rule.
    pub fn build(&self) -> Result<SlidingWindowLimiter> {
        SlidingWindowLimiter::from_secs_f64(self.rate_limit, self.period_secs)
    }
}

impl ThrottlerConfig {
    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading throttler configuration");

        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Load configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| ThrottlerError::Config(format!("Failed to parse throttler config: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_parse_full_config() {
        let yaml = r#"
logging:
  level: debug
  json: true
default:
  rate_limit: 20
  period_secs: 2.5
throttles:
  github:
    rate_limit: 5
    period_secs: 1.0
  search:
    rate_limit: 1
    period_secs: 0.2
"#;
        let config = ThrottlerConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json);
        assert_eq!(config.default.rate_limit, 20);
        assert_eq!(config.default.period_secs, 2.5);
        assert_eq!(config.throttles.len(), 2);
        assert_eq!(
            config.throttles["github"],
            ThrottleRule {
                rate_limit: 5,
                period_secs: 1.0
            }
        );
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let yaml = r#"
throttles:
  github:
    rate_limit: 3
"#;
        let config = ThrottlerConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.logging.level, "info");
        assert!(!config.logging.json);
        assert_eq!(config.default, ThrottleRule::default());
        assert_eq!(config.throttles["github"].rate_limit, 3);
        assert_eq!(config.throttles["github"].period_secs, 1.0);
    }

    #[test]
    fn test_negative_values_parse_but_fail_to_build() {
        let yaml = r#"
throttles:
  broken:
    rate_limit: -1
    period_secs: -1
"#;
        let config = ThrottlerConfig::from_yaml(yaml).unwrap();
        assert!(matches!(
            config.throttles["broken"].build(),
            Err(ThrottlerError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_rule_build() {
        let rule = ThrottleRule {
            rate_limit: 4,
            period_secs: 0.25,
        };
        let limiter = rule.build().unwrap();
        assert_eq!(limiter.rate_limit(), 4);
        assert_eq!(limiter.period(), Duration::from_millis(250));
    }

    #[test]
    fn test_invalid_yaml() {
        let result = ThrottlerConfig::from_yaml("throttles: [not, a, map]");
        assert!(matches!(result, Err(ThrottlerError::Config(_))));
    }

    #[test]
    fn test_missing_file() {
        let result = ThrottlerConfig::from_file("/nonexistent/throttler.yaml");
        assert!(matches!(result, Err(ThrottlerError::Io(_))));
    }
}
