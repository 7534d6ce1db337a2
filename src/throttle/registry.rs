//! Named throttles built from configuration.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info};

use super::limiter::SlidingWindowLimiter;
use crate::config::ThrottlerConfig;
use crate::error::{Result, ThrottlerError};

/// Process-local set of limiters indexed by name.
///
/// Each name has its own history; limiters never share state. Unknown names
/// get a limiter with the default rule on first use.
pub struct ThrottleRegistry {
    /// Limiters indexed by name
    throttles: RwLock<HashMap<String, Arc<SlidingWindowLimiter>>>,
    /// Template for names that are not configured
    default: SlidingWindowLimiter,
}

impl ThrottleRegistry {
    /// Create an empty registry using `default` as the template for unknown names.
    pub fn new(default: SlidingWindowLimiter) -> Self {
        Self {
            throttles: RwLock::new(HashMap::new()),
            default,
        }
    }

    /// Build a registry from configuration.
    ///
    /// Fails if the default rule or any named rule is invalid.
    pub fn from_config(config: &ThrottlerConfig) -> Result<Self> {
        let default = config
            .default
            .build()
            .map_err(|e| with_throttle_name("default", e))?;
        let registry = Self::new(default);

        for (name, rule) in &config.throttles {
            let limiter = rule.build().map_err(|e| with_throttle_name(name, e))?;
            registry.insert(name.clone(), limiter);
        }

        info!(
            throttles = registry.len(),
            default_rate_limit = registry.default.rate_limit(),
            default_period = ?registry.default.period(),
            "Throttle registry built"
        );
        Ok(registry)
    }

    /// Register a limiter under `name`, replacing any previous one.
    pub fn insert(&self, name: impl Into<String>, limiter: SlidingWindowLimiter) -> Arc<SlidingWindowLimiter> {
        let limiter = Arc::new(limiter);
        self.throttles.write().insert(name.into(), Arc::clone(&limiter));
        limiter
    }

    /// Get the limiter registered under `name`.
    pub fn get(&self, name: &str) -> Option<Arc<SlidingWindowLimiter>> {
        self.throttles.read().get(name).cloned()
    }

    /// Get the limiter registered under `name`, creating one with the
    /// default rule if none exists.
    pub fn get_or_default(&self, name: &str) -> Arc<SlidingWindowLimiter> {
        if let Some(limiter) = self.get(name) {
            return limiter;
        }

        let mut throttles = self.throttles.write();
        let limiter = throttles.entry(name.to_string()).or_insert_with(|| {
            debug!(
                name = %name,
                rate_limit = self.default.rate_limit(),
                period = ?self.default.period(),
                "Creating throttle with default rule"
            );
            Arc::new(self.default.fresh())
        });
        Arc::clone(limiter)
    }

    /// Names of all registered throttles, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.throttles.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Get the number of registered throttles.
    pub fn len(&self) -> usize {
        self.throttles.read().len()
    }

    /// Whether no throttles are registered.
    pub fn is_empty(&self) -> bool {
        self.throttles.read().is_empty()
    }
}

fn with_throttle_name(name: &str, error: ThrottlerError) -> ThrottlerError {
    match error {
        ThrottlerError::InvalidConfiguration(msg) => {
            ThrottlerError::InvalidConfiguration(format!("throttle '{}': {}", name, msg))
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ThrottleRule;
    use futures::FutureExt;
    use std::time::Duration;

    fn config() -> ThrottlerConfig {
        ThrottlerConfig::from_yaml(
            r#"
default:
  rate_limit: 2
  period_secs: 0.5
throttles:
  github:
    rate_limit: 1
    period_secs: 1.0
  search:
    rate_limit: 3
    period_secs: 0.1
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_registry_from_config() {
        let registry = ThrottleRegistry::from_config(&config()).unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.names(), vec!["github".to_string(), "search".to_string()]);

        let github = registry.get("github").unwrap();
        assert_eq!(github.rate_limit(), 1);
        assert_eq!(github.period(), Duration::from_secs(1));
        assert!(registry.get("unknown").is_none());
    }

    #[test]
    fn test_invalid_rule_names_the_throttle() {
        let mut config = config();
        config.throttles.insert(
            "broken".to_string(),
            ThrottleRule {
                rate_limit: 0,
                period_secs: 1.0,
            },
        );

        match ThrottleRegistry::from_config(&config) {
            Err(ThrottlerError::InvalidConfiguration(msg)) => assert!(msg.contains("broken")),
            other => panic!("expected InvalidConfiguration, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_invalid_default_rule() {
        let mut config = config();
        config.default.period_secs = 0.0;

        assert!(matches!(
            ThrottleRegistry::from_config(&config),
            Err(ThrottlerError::InvalidConfiguration(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_or_default_creates_once() {
        let registry = ThrottleRegistry::from_config(&config()).unwrap();

        let first = registry.get_or_default("new");
        let second = registry.get_or_default("new");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.rate_limit(), 2);
        assert_eq!(first.period(), Duration::from_millis(500));
        assert_eq!(registry.len(), 3);

        let github = registry.get_or_default("github");
        assert_eq!(github.rate_limit(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_throttles_do_not_share_history() {
        let registry = ThrottleRegistry::from_config(&config()).unwrap();
        let github = registry.get("github").unwrap();

        github.acquire().await;
        assert!(github.acquire().now_or_never().is_none());

        let other = registry.get_or_default("other");
        assert!(other.acquire().now_or_never().is_some());
        assert_eq!(github.recorded(), 1);
    }

    #[test]
    fn test_insert_replaces() {
        let registry = ThrottleRegistry::new(SlidingWindowLimiter::new(1, Duration::from_secs(1)).unwrap());
        assert!(registry.is_empty());

        registry.insert("api", SlidingWindowLimiter::new(5, Duration::from_secs(1)).unwrap());
        registry.insert("api", SlidingWindowLimiter::new(7, Duration::from_secs(1)).unwrap());

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("api").unwrap().rate_limit(), 7);
    }
}
