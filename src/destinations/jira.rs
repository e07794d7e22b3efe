//! Jira destination — creates one issue per feedback item via the REST v3
//! API with HTTP Basic auth.
//!
//! The created issue key is returned as the push reference so the sync
//! orchestrator can write it back to the feedback item's notes.

use async_trait::async_trait;
use secrecy::ExposeSecret;
use tracing::debug;

use crate::model::FeedbackItem;
use crate::scoring;

use super::{
    ConnectionResult, Destination, DestinationKind, IntegrationSettings, PushResult,
    error_detail,
};

const DEFAULT_ISSUE_TYPE: &str = "Task";

pub struct JiraDestination {
    client: reqwest::Client,
}

impl JiraDestination {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

/// Atlassian Document Format description for one feedback item.
pub(crate) fn build_description(item: &FeedbackItem) -> serde_json::Value {
    let score = item.priority_score().unwrap_or(0);
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

    let mut content = vec![
        adf_heading(2, "Feedback Details"),
        adf_paragraph(&item.feedback_text),
        adf_heading(3, "Metadata"),
        adf_bullet_list(&[
            format!(
                "Priority Score: {}/100",
                scoring::clamp_for_display(score)
            ),
            format!("Urgency: {urgency}"),
            format!("Category: {category}"),
            format!("Source: {}", item.source),
        ]),
    ];

    if item.customer_name.is_some() || item.customer_email.is_some() {
        content.push(adf_heading(3, "Customer Information"));
        content.push(adf_bullet_list(&[
            format!("Name: {}", item.customer_name.as_deref().unwrap_or("N/A")),
            format!("Email: {}", item.customer_email.as_deref().unwrap_or("N/A")),
        ]));
    }

    serde_json::json!({ "type": "doc", "version": 1, "content": content })
}

/// Issue-create payload for one feedback item.
pub(crate) fn build_issue(
    item: &FeedbackItem,
    project_key: &str,
    settings: &IntegrationSettings,
) -> serde_json::Value {
    let score = item.priority_score().unwrap_or(0);
    let category = item
        .analysis
        .as_ref()
        .map(|a| a.category.as_str())
        .unwrap_or("User Feedback");
    let urgency_label = item
        .analysis
        .as_ref()
        .map(|a| a.urgency.as_str().to_lowercase())
        .unwrap_or_else(|| "medium".to_string());
    let issue_type = settings
        .options
        .issue_type
        .as_deref()
        .unwrap_or(DEFAULT_ISSUE_TYPE);

    let mut fields = serde_json::json!({
        "project": { "key": project_key },
        "summary": format!("[Feedback] {category} - Priority {score}"),
        "description": build_description(item),
        "issuetype": { "name": issue_type },
        "labels": ["feedback", format!("priority-{score}"), urgency_label],
    });

    if let Some(assignee) = settings.options.default_assignee.as_deref() {
        fields["assignee"] = serde_json::json!({ "name": assignee });
    }

    serde_json::json!({ "fields": fields })
}

fn adf_heading(level: u8, text: &str) -> serde_json::Value {
    serde_json::json!({
        "type": "heading",
        "attrs": { "level": level },
        "content": [{ "type": "text", "text": text }],
    })
}

fn adf_paragraph(text: &str) -> serde_json::Value {
    serde_json::json!({
        "type": "paragraph",
        "content": [{ "type": "text", "text": text }],
    })
}

fn adf_bullet_list(items: &[String]) -> serde_json::Value {
    let list_items: Vec<serde_json::Value> = items
        .iter()
        .map(|text| {
            serde_json::json!({
                "type": "listItem",
                "content": [{
                    "type": "paragraph",
                    "content": [{ "type": "text", "text": text }],
                }],
            })
        })
        .collect();
    serde_json::json!({ "type": "bulletList", "content": list_items })
}

#[async_trait]
impl Destination for JiraDestination {
    fn kind(&self) -> DestinationKind {
        DestinationKind::Jira
    }

    async fn test_connection(&self, settings: &IntegrationSettings) -> ConnectionResult {
        let Some((domain, email, token)) = settings.credentials.basic() else {
            return ConnectionResult::Failed {
                reason: "Jira integration requires domain, email, and API token".into(),
            };
        };
        let Some(project_key) = settings.routing.as_deref() else {
            return ConnectionResult::Failed {
                reason: "Jira integration requires a project key".into(),
            };
        };

        let resp = self
            .client
            .get(format!("https://{domain}/rest/api/3/project/{project_key}"))
            .basic_auth(email, Some(token.expose_secret()))
            .header("Accept", "application/json")
            .send()
            .await;

        match resp {
            Ok(resp) if resp.status().is_success() => {
                let project: serde_json::Value = resp.json().await.unwrap_or_default();
                let display_name = project["name"]
                    .as_str()
                    .unwrap_or(project_key)
                    .to_string();
                ConnectionResult::Ok { display_name }
            }
            Ok(resp) => ConnectionResult::Failed {
                reason: format!("Failed to connect to Jira: {}", resp.status()),
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
        let Some((domain, email, token)) = settings.credentials.basic() else {
            return PushResult::rejected("Jira integration requires domain, email, and API token");
        };
        let Some(project_key) = settings.routing.as_deref() else {
            return PushResult::rejected("Jira integration requires a project key");
        };

        let issue = build_issue(item, project_key, settings);

        let resp = self
            .client
            .post(format!("https://{domain}/rest/api/3/issue"))
            .basic_auth(email, Some(token.expose_secret()))
            .header("Accept", "application/json")
            .json(&issue)
            .send()
            .await;

        match resp {
            Ok(resp) if resp.status().is_success() => {
                let created: serde_json::Value = resp.json().await.unwrap_or_default();
                let reference = created["key"]
                    .as_str()
                    .map(|key| format!("Jira ticket created: {key}"));
                debug!(item_id = %item.id, issue = ?created["key"], "Jira issue created");
                PushResult::Delivered { reference }
            }
            Ok(resp) => PushResult::rejected(error_detail(resp).await),
            Err(e) => PushResult::rejected(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::destinations::{Credentials, DestinationOptions};
    use crate::model::{Analysis, Category, FeedbackItem, Segment, Sentiment, Source, Urgency};
    use secrecy::SecretString;
    use uuid::Uuid;

    fn settings(options: DestinationOptions) -> IntegrationSettings {
        IntegrationSettings {
            organization_id: Uuid::new_v4(),
            kind: DestinationKind::Jira,
            credentials: Credentials::Basic {
                domain: "acme.atlassian.net".into(),
                email: "pm@acme.test".into(),
                api_token: SecretString::from("jira-token"),
            },
            routing: Some("FB".into()),
            is_active: true,
            last_synced_at: None,
            options,
        }
    }

    fn analyzed_item() -> FeedbackItem {
        let mut item = FeedbackItem::new(
            Uuid::new_v4(),
            "CSV import silently drops rows with commas in quoted fields",
            Source::Email,
            Segment::Enterprise,
        );
        item.analysis = Some(Analysis {
            category: Category::Bug,
            urgency: Urgency::High,
            sentiment: Sentiment::Negative,
            impact_score: 9,
            key_themes: vec!["import".into(), "data integrity".into()],
            priority_score: 105,
        });
        item
    }

    #[test]
    fn summary_line_names_category_and_score() {
        let issue = build_issue(&analyzed_item(), "FB", &settings(Default::default()));
        assert_eq!(
            issue["fields"]["summary"],
            "[Feedback] Bug - Priority 105"
        );
        assert_eq!(issue["fields"]["project"]["key"], "FB");
    }

    #[test]
    fn labels_include_priority_and_lowercased_urgency() {
        let issue = build_issue(&analyzed_item(), "FB", &settings(Default::default()));
        let labels = issue["fields"]["labels"].as_array().unwrap();
        assert_eq!(labels[0], "feedback");
        assert_eq!(labels[1], "priority-105");
        assert_eq!(labels[2], "high");
    }

    #[test]
    fn issue_type_defaults_to_task_and_honors_settings() {
        let issue = build_issue(&analyzed_item(), "FB", &settings(Default::default()));
        assert_eq!(issue["fields"]["issuetype"]["name"], "Task");

        let custom = settings(DestinationOptions {
            issue_type: Some("Story".into()),
            ..Default::default()
        });
        let issue = build_issue(&analyzed_item(), "FB", &custom);
        assert_eq!(issue["fields"]["issuetype"]["name"], "Story");
    }

    #[test]
    fn assignee_only_when_configured() {
        let issue = build_issue(&analyzed_item(), "FB", &settings(Default::default()));
        assert!(issue["fields"].get("assignee").is_none());

        let assigned = settings(DestinationOptions {
            default_assignee: Some("jsmith".into()),
            ..Default::default()
        });
        let issue = build_issue(&analyzed_item(), "FB", &assigned);
        assert_eq!(issue["fields"]["assignee"]["name"], "jsmith");
    }

    #[test]
    fn description_structure_heading_paragraph_bullets() {
        let doc = build_description(&analyzed_item());
        assert_eq!(doc["type"], "doc");
        let content = doc["content"].as_array().unwrap();
        assert_eq!(content[0]["type"], "heading");
        assert_eq!(content[1]["type"], "paragraph");
        assert_eq!(content[3]["type"], "bulletList");
        let bullets = content[3]["content"].as_array().unwrap();
        assert_eq!(bullets.len(), 4);
        assert!(
            bullets[0]["content"][0]["content"][0]["text"]
                .as_str()
                .unwrap()
                .contains("100/100")
        );
    }

    #[test]
    fn customer_section_only_when_customer_known() {
        let item = analyzed_item();
        let doc = build_description(&item);
        assert_eq!(doc["content"].as_array().unwrap().len(), 4);

        let mut with_customer = item;
        with_customer.customer_name = Some("Grace".into());
        let doc = build_description(&with_customer);
        let content = doc["content"].as_array().unwrap();
        assert_eq!(content.len(), 6);
        assert_eq!(
            content[4]["content"][0]["text"],
            "Customer Information"
        );
    }
}
