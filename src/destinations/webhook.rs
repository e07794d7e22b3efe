//! Generic webhook destination (Zapier-style) — forwards a JSON envelope to
//! a user-supplied URL. No response contract beyond the status code.

use async_trait::async_trait;
use chrono::Utc;
use secrecy::ExposeSecret;
use tracing::debug;

use crate::model::FeedbackItem;

use super::{
    ConnectionResult, Destination, DestinationKind, IntegrationSettings, PushResult,
    error_detail,
};

pub struct WebhookDestination {
    client: reqwest::Client,
}

impl WebhookDestination {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

/// JSON envelope forwarded for one feedback item.
pub(crate) fn build_envelope(item: &FeedbackItem) -> serde_json::Value {
    let mut feedback = serde_json::json!({
        "id": item.id,
        "feedback_text": &item.feedback_text,
        "source": item.source,
        "customer_segment": item.customer_segment,
        "status": item.status,
        "customer_name": &item.customer_name,
        "customer_email": &item.customer_email,
        "created_at": item.created_at.to_rfc3339(),
    });

    if let Some(analysis) = &item.analysis {
        feedback["category"] = serde_json::json!(analysis.category);
        feedback["urgency"] = serde_json::json!(analysis.urgency);
        feedback["sentiment"] = serde_json::json!(analysis.sentiment);
        feedback["impact_score"] = serde_json::json!(analysis.impact_score);
        feedback["key_themes"] = serde_json::json!(&analysis.key_themes);
        feedback["priority_score"] = serde_json::json!(analysis.priority_score);
    }

    serde_json::json!({
        "event": "feedback.high_priority",
        "feedback": feedback,
        "sent_at": Utc::now().to_rfc3339(),
    })
}

#[async_trait]
impl Destination for WebhookDestination {
    fn kind(&self) -> DestinationKind {
        DestinationKind::Zapier
    }

    async fn test_connection(&self, settings: &IntegrationSettings) -> ConnectionResult {
        let Some(url) = settings.credentials.webhook_url() else {
            return ConnectionResult::Failed {
                reason: "Webhook integration requires a webhook URL".into(),
            };
        };

        let test_body = serde_json::json!({
            "test": true,
            "timestamp": Utc::now().to_rfc3339(),
            "message": "Test connection from FeedbackIQ",
        });

        let resp = self
            .client
            .post(url.expose_secret())
            .json(&test_body)
            .send()
            .await;

        match resp {
            Ok(resp) if resp.status().is_success() => ConnectionResult::Ok {
                display_name: "Webhook".into(),
            },
            Ok(resp) => ConnectionResult::Failed {
                reason: format!("Webhook returned {}", resp.status()),
            },
            Err(e) => ConnectionResult::Failed {
                reason: e.to_string(),
            },
        }
    }

    async fn push_item(
        &self,
        settings: &IntegrationSettings,
        item: &FeedbackItem,
    ) -> PushResult {
        let Some(url) = settings.credentials.webhook_url() else {
            return PushResult::rejected("Webhook integration requires a webhook URL");
        };

        let envelope = build_envelope(item);

        let resp = self
            .client
            .post(url.expose_secret())
            .json(&envelope)
            .send()
            .await;

        match resp {
            Ok(resp) if resp.status().is_success() => {
                debug!(item_id = %item.id, "Webhook delivered");
                PushResult::Delivered { reference: None }
            }
            Ok(resp) => PushResult::rejected(error_detail(resp).await),
            Err(e) => PushResult::rejected(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Analysis, Category, FeedbackItem, Segment, Sentiment, Source, Urgency};
    use uuid::Uuid;

    #[test]
    fn envelope_carries_item_and_analysis() {
        let mut item = FeedbackItem::new(
            Uuid::new_v4(),
            "Please add a dark mode",
            Source::Survey,
            Segment::Trial,
        );
        item.analysis = Some(Analysis {
            category: Category::FeatureRequest,
            urgency: Urgency::Low,
            sentiment: Sentiment::Positive,
            impact_score: 4,
            key_themes: vec!["theming".into(), "accessibility".into()],
            priority_score: 45,
        });

        let envelope = build_envelope(&item);
        assert_eq!(envelope["event"], "feedback.high_priority");
        assert_eq!(envelope["feedback"]["feedback_text"], "Please add a dark mode");
        assert_eq!(envelope["feedback"]["category"], "Feature Request");
        assert_eq!(envelope["feedback"]["priority_score"], 45);
        assert_eq!(envelope["feedback"]["customer_segment"], "Trial");
        assert!(envelope["sent_at"].is_string());
    }

    #[test]
    fn envelope_for_unanalyzed_item_has_no_derived_fields() {
        let item = FeedbackItem::new(
            Uuid::new_v4(),
            "hello",
            Source::Email,
            Segment::Free,
        );
        let envelope = build_envelope(&item);
        assert!(envelope["feedback"].get("priority_score").is_none());
        assert!(envelope["feedback"].get("category").is_none());
    }
}
