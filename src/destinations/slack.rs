//! Slack destination — posts block-formatted messages to an incoming
//! webhook. Fire-and-forget: Slack keeps nothing we can reference back.

use async_trait::async_trait;
use secrecy::ExposeSecret;
use tracing::debug;

use crate::model::FeedbackItem;
use crate::scoring;

use super::{
    ConnectionResult, Destination, DestinationKind, IntegrationSettings, PushResult,
    error_detail,
};

pub struct SlackDestination {
    client: reqwest::Client,
}

impl SlackDestination {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

/// Emoji banding for the message header: 🔴 ≥90, 🟠 ≥80, 🟡 below.
pub(crate) fn priority_emoji(score: i64) -> &'static str {
    if score >= 90 {
        "🔴"
    } else if score >= 80 {
        "🟠"
    } else {
        "🟡"
    }
}

/// Build the webhook message for one feedback item.
pub(crate) fn build_message(item: &FeedbackItem) -> serde_json::Value {
    let score = item.priority_score().unwrap_or(0);
    let emoji = priority_emoji(score);

    let urgency = item
        .analysis
        .as_ref()
        .map(|a| a.urgency.as_str())
        .unwrap_or("N/A");
    let category = item
        .analysis
        .as_ref()
        .map(|a| a.category.as_str())
        .unwrap_or("Uncategorized");

    let mut blocks = vec![
        serde_json::json!({
            "type": "header",
            "text": { "type": "plain_text", "text": format!("{emoji} High Priority Feedback") },
        }),
        serde_json::json!({
            "type": "section",
            "fields": [
                {
                    "type": "mrkdwn",
                    "text": format!("*Priority Score:*\n{}/100", scoring::clamp_for_display(score)),
                },
                { "type": "mrkdwn", "text": format!("*Urgency:*\n{urgency}") },
                { "type": "mrkdwn", "text": format!("*Category:*\n{category}") },
                { "type": "mrkdwn", "text": format!("*Source:*\n{}", item.source) },
            ],
        }),
        serde_json::json!({
            "type": "section",
            "text": { "type": "mrkdwn", "text": format!("*Feedback:*\n{}", item.feedback_text) },
        }),
    ];

    if item.customer_name.is_some() || item.customer_email.is_some() {
        blocks.push(serde_json::json!({
            "type": "section",
            "fields": [
                {
                    "type": "mrkdwn",
                    "text": format!("*Customer:*\n{}", item.customer_name.as_deref().unwrap_or("N/A")),
                },
                {
                    "type": "mrkdwn",
                    "text": format!("*Email:*\n{}", item.customer_email.as_deref().unwrap_or("N/A")),
                },
            ],
        }));
    }

    serde_json::json!({
        "text": format!("{emoji} High Priority Feedback Detected"),
        "blocks": blocks,
    })
}

/// Test message sent by `test_connection`.
fn build_test_message() -> serde_json::Value {
    serde_json::json!({
        "text": "✅ FeedbackIQ Slack Integration Test",
        "blocks": [
            {
                "type": "header",
                "text": { "type": "plain_text", "text": "✅ Connection Successful!" },
            },
            {
                "type": "section",
                "text": {
                    "type": "mrkdwn",
                    "text": "Your Slack integration is working correctly. You will receive notifications here when high-priority feedback is detected.",
                },
            },
        ],
    })
}

#[async_trait]
impl Destination for SlackDestination {
    fn kind(&self) -> DestinationKind {
        DestinationKind::Slack
    }

    async fn test_connection(&self, settings: &IntegrationSettings) -> ConnectionResult {
        let Some(url) = settings.credentials.webhook_url() else {
            return ConnectionResult::Failed {
                reason: "Slack integration requires a webhook URL".into(),
            };
        };

        let resp = self
            .client
            .post(url.expose_secret())
            .json(&build_test_message())
            .send()
            .await;

        match resp {
            Ok(resp) if resp.status().is_success() => ConnectionResult::Ok {
                display_name: "Slack webhook".into(),
            },
            Ok(resp) => ConnectionResult::Failed {
                reason: format!("Slack API error: {}", resp.status()),
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
            return PushResult::rejected("Slack integration requires a webhook URL");
        };

        let message = build_message(item);

        let resp = self
            .client
            .post(url.expose_secret())
            .json(&message)
            .send()
            .await;

        match resp {
            Ok(resp) if resp.status().is_success() => {
                debug!(item_id = %item.id, "Slack notification sent");
                PushResult::Delivered { reference: None }
            }
            Ok(resp) => PushResult::rejected(error_detail(resp).await),
            Err(e) => PushResult::rejected(e.to_string()),
        }
    }
}
