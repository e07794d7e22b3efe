//! Classifier client — calls the external text-classification service.
//!
//! The service speaks an OpenAI-style chat-completions protocol. One call in,
//! one structured `Judgment` out; no retries at this layer (retry policy
//! belongs to whoever invokes the analysis).

mod parse;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use tracing::{debug, warn};

use crate::config::ClassifierConfig;
use crate::error::ClassifierError;
use crate::model::{Judgment, Segment};

/// System prompt the classification service is driven with. The taxonomy and
/// field contract here are what `classifier::parse` validates against.
const SYSTEM_PROMPT: &str = "You are a feedback analysis expert. Analyze customer feedback and return ONLY a JSON object with no additional text. The JSON must have this exact structure:
{
  \"category\": \"one of: Bug, Feature Request, UX Issue, Performance Issue, Pricing Concern, Documentation, Integration Request, Complaint, Praise\",
  \"urgency\": \"High, Medium, or Low based on customer frustration and business impact\",
  \"sentiment\": \"Positive, Neutral, or Negative\",
  \"impact_score\": \"number between 1-10 based on potential business impact\",
  \"key_themes\": [\"array\", \"of\", \"2-4\", \"key\", \"themes\"],
  \"summary\": \"One sentence summary of the core issue or request\"
}";

/// A text-classification backend.
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Classify one piece of feedback text for the given customer segment.
    async fn classify(
        &self,
        text: &str,
        segment: Segment,
    ) -> Result<Judgment, ClassifierError>;
}

/// HTTP classifier backed by a chat-completions gateway.
pub struct ClassifierClient {
    config: ClassifierConfig,
    client: reqwest::Client,
}

impl ClassifierClient {
    pub fn new(config: ClassifierConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { config, client }
    }

    fn user_prompt(text: &str, segment: Segment) -> String {
        format!("Feedback: {text}\nCustomer Segment: {segment}")
    }
}

#[async_trait]
impl Classifier for ClassifierClient {
    async fn classify(
        &self,
        text: &str,
        segment: Segment,
    ) -> Result<Judgment, ClassifierError> {
        if text.trim().is_empty() {
            return Err(ClassifierError::EmptyFeedback);
        }

        let body = serde_json::json!({
            "model": &self.config.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": Self::user_prompt(text, segment) },
            ],
            "temperature": self.config.temperature,
        });

        let resp = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(self.config.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| ClassifierError::ServiceUnavailable {
                reason: e.to_string(),
            })?;

        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            warn!(%status, "Classification service returned an error");
            return Err(ClassifierError::ServiceUnavailable {
                reason: format!("{status}: {detail}"),
            });
        }

        let data: serde_json::Value =
            resp.json()
                .await
                .map_err(|e| ClassifierError::MalformedResponse {
                    reason: format!("response body is not JSON: {e}"),
                })?;

        let content = data["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| ClassifierError::MalformedResponse {
                reason: "no message content in completion".into(),
            })?;

        debug!(model = %self.config.model, "Classifier responded");
        parse::parse_judgment(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_prompt_carries_text_and_segment() {
        let prompt = ClassifierClient::user_prompt("Exports are broken", Segment::Enterprise);
        assert_eq!(
            prompt,
            "Feedback: Exports are broken\nCustomer Segment: Enterprise"
        );
    }

    #[test]
    fn system_prompt_names_the_full_taxonomy() {
        for category in [
            "Bug",
            "Feature Request",
            "UX Issue",
            "Performance Issue",
            "Pricing Concern",
            "Documentation",
            "Integration Request",
            "Complaint",
            "Praise",
        ] {
            assert!(SYSTEM_PROMPT.contains(category), "missing {category}");
        }
    }

    #[tokio::test]
    async fn empty_feedback_is_rejected_before_any_io() {
        let config = ClassifierConfig {
            endpoint: "http://127.0.0.1:1/never".into(),
            api_key: secrecy::SecretString::from("test-key"),
            model: "test-model".into(),
            temperature: 0.7,
            timeout: std::time::Duration::from_secs(1),
        };
        let client = ClassifierClient::new(config);
        let result = client.classify("   ", Segment::Free).await;
        assert!(matches!(result, Err(ClassifierError::EmptyFeedback)));
    }
}
