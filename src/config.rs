//! Configuration types.

use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Qualification and batching policy for sync runs.
///
/// Defaults mirror the product's original behavior: only items scoring 80 or
/// higher qualify unless the integration overrides the threshold, and one
/// run attempts at most 50 items.
#[derive(Debug, Clone)]
pub struct SyncPolicy {
    /// Minimum priority score when the integration sets none.
    pub default_min_priority: i64,
    /// Maximum number of items attempted in one run.
    pub max_items_per_run: usize,
}

impl Default for SyncPolicy {
    fn default() -> Self {
        Self {
            default_min_priority: 80,
            max_items_per_run: 50,
        }
    }
}

/// Connection settings for the external classification service.
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    /// Full chat-completions endpoint URL.
    pub endpoint: String,
    pub api_key: SecretString,
    pub model: String,
    pub temperature: f32,
    /// Upper bound on one classification call.
    pub timeout: Duration,
}

impl ClassifierConfig {
    /// Read classifier settings from the environment.
    ///
    /// `FEEDBACKIQ_CLASSIFIER_KEY` is required; endpoint and model fall back
    /// to the product's default AI gateway.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = std::env::var("FEEDBACKIQ_CLASSIFIER_KEY")
            .map_err(|_| ConfigError::MissingEnvVar("FEEDBACKIQ_CLASSIFIER_KEY".into()))?;

        let endpoint = std::env::var("FEEDBACKIQ_CLASSIFIER_URL").unwrap_or_else(|_| {
            "https://ai.gateway.lovable.dev/v1/chat/completions".to_string()
        });

        let model = std::env::var("FEEDBACKIQ_CLASSIFIER_MODEL")
            .unwrap_or_else(|_| "google/gemini-2.5-flash".to_string());

        let timeout_secs: u64 = match std::env::var("FEEDBACKIQ_CLASSIFIER_TIMEOUT_SECS") {
            Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
                key: "FEEDBACKIQ_CLASSIFIER_TIMEOUT_SECS".into(),
                message: format!("not a number: {raw}"),
            })?,
            Err(_) => 30,
        };

        Ok(Self {
            endpoint,
            api_key: SecretString::from(api_key),
            model,
            temperature: 0.7,
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

/// Shared HTTP settings for destination adapters.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Upper bound on one destination call (test or push).
    pub timeout: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sync_policy_defaults_match_product() {
        let policy = SyncPolicy::default();
        assert_eq!(policy.default_min_priority, 80);
        assert_eq!(policy.max_items_per_run, 50);
    }

    #[test]
    fn http_config_has_bounded_timeout() {
        assert!(HttpConfig::default().timeout <= Duration::from_secs(60));
    }
}
