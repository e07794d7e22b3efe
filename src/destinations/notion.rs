//! Notion destination — creates one database page per feedback item.
//!
//! Duplicate pushes create duplicate pages; Notion gives us no natural
//! idempotency key, and the product documents that limitation rather than
//! deduplicating.

use async_trait::async_trait;
use secrecy::ExposeSecret;
use tracing::debug;

use crate::model::FeedbackItem;

use super::{
    ConnectionResult, Destination, DestinationKind, IntegrationSettings, PushResult,
    error_detail,
};

const NOTION_API: &str = "https://api.notion.com/v1";
const NOTION_VERSION: &str = "2022-06-28";

/// Max characters of feedback text used for the page title.
const TITLE_MAX_CHARS: usize = 100;

pub struct NotionDestination {
    client: reqwest::Client,
}

impl NotionDestination {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

/// Build the page-create payload for one feedback item.
pub(crate) fn build_page(item: &FeedbackItem, database_id: &str) -> serde_json::Value {
    let mut properties = serde_json::json!({
        "Title": {
            "title": [{ "text": { "content": item.title(TITLE_MAX_CHARS) } }],
        },
        "Customer Segment": { "select": { "name": item.customer_segment.as_str() } },
        "Status": { "select": { "name": item.status.as_str() } },
        "Source": { "select": { "name": item.source.as_str() } },
        "Created Date": { "date": { "start": item.created_at.to_rfc3339() } },
    });

    if let Some(analysis) = &item.analysis {
        properties["Category"] =
            serde_json::json!({ "select": { "name": analysis.category.as_str() } });
        properties["Urgency"] =
            serde_json::json!({ "select": { "name": analysis.urgency.as_str() } });
        properties["Sentiment"] =
            serde_json::json!({ "select": { "name": analysis.sentiment.as_str() } });
        properties["Priority Score"] =
            serde_json::json!({ "number": analysis.priority_score });
        properties["Impact Score"] =
            serde_json::json!({ "number": analysis.impact_score });
    }

    let mut children = vec![serde_json::json!({
        "object": "block",
        "type": "paragraph",
        "paragraph": { "rich_text": [{ "text": { "content": &item.feedback_text } }] },
    })];

    if item.customer_name.is_some() || item.customer_email.is_some() {
        children.push(heading("Customer Details"));
        children.push(paragraph(format!(
            "Name: {}\nEmail: {}",
            item.customer_name.as_deref().unwrap_or("N/A"),
            item.customer_email.as_deref().unwrap_or("N/A"),
        )));
    }

    if let Some(notes) = item.notes.as_deref().filter(|n| !n.is_empty()) {
        children.push(heading("Notes"));
        children.push(paragraph(notes.to_string()));
    }

    serde_json::json!({
        "parent": { "database_id": database_id },
        "properties": properties,
        "children": children,
    })
}

fn heading(text: &str) -> serde_json::Value {
    serde_json::json!({
        "object": "block",
        "type": "heading_3",
        "heading_3": { "rich_text": [{ "text": { "content": text } }] },
    })
}

fn paragraph(text: String) -> serde_json::Value {
    serde_json::json!({
        "object": "block",
        "type": "paragraph",
        "paragraph": { "rich_text": [{ "text": { "content": text } }] },
    })
}

#[async_trait]
impl Destination for NotionDestination {
    fn kind(&self) -> DestinationKind {
        DestinationKind::Notion
    }

    async fn test_connection(&self, settings: &IntegrationSettings) -> ConnectionResult {
        let Some(secret) = settings.credentials.api_key() else {
            return ConnectionResult::Failed {
                reason: "Notion integration requires an API secret".into(),
            };
        };
        let Some(database_id) = settings.routing.as_deref() else {
            return ConnectionResult::Failed {
                reason: "Notion integration requires a database id".into(),
            };
        };

        let resp = self
            .client
            .get(format!("{NOTION_API}/databases/{database_id}"))
            .bearer_auth(secret.expose_secret())
            .header("Notion-Version", NOTION_VERSION)
            .send()
            .await;

        match resp {
            Ok(resp) if resp.status().is_success() => {
                let database: serde_json::Value = resp.json().await.unwrap_or_default();
                let display_name = database["title"][0]["plain_text"]
                    .as_str()
                    .unwrap_or("Untitled")
                    .to_string();
                ConnectionResult::Ok { display_name }
            }
            Ok(resp) => ConnectionResult::Failed {
                reason: format!("Notion API error: {}", error_detail(resp).await),
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
        let Some(secret) = settings.credentials.api_key() else {
            return PushResult::rejected("Notion integration requires an API secret");
        };
        let Some(database_id) = settings.routing.as_deref() else {
            return PushResult::rejected("Notion integration requires a database id");
        };

        let page = build_page(item, database_id);

        let resp = self
            .client
            .post(format!("{NOTION_API}/pages"))
            .bearer_auth(secret.expose_secret())
            .header("Notion-Version", NOTION_VERSION)
            .json(&page)
            .send()
            .await;

        match resp {
            Ok(resp) if resp.status().is_success() => {
                debug!(item_id = %item.id, "Notion page created");
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

    fn analyzed_item() -> FeedbackItem {
        let mut item = FeedbackItem::new(
            Uuid::new_v4(),
            "Search results take ten seconds to load on large workspaces",
            Source::SupportTicket,
            Segment::Enterprise,
        );
        item.analysis = Some(Analysis {
            category: Category::PerformanceIssue,
            urgency: Urgency::High,
            sentiment: Sentiment::Negative,
            impact_score: 9,
            key_themes: vec!["search".into(), "latency".into()],
            priority_score: 105,
        });
        item
    }

    #[test]
    fn page_targets_the_configured_database() {
        let item = analyzed_item();
        let page = build_page(&item, "db-123");
        assert_eq!(page["parent"]["database_id"], "db-123");
    }

    #[test]
    fn page_carries_typed_properties() {
        let item = analyzed_item();
        let page = build_page(&item, "db-123");
        let props = &page["properties"];
        assert_eq!(props["Category"]["select"]["name"], "Performance Issue");
        assert_eq!(props["Urgency"]["select"]["name"], "High");
        assert_eq!(props["Sentiment"]["select"]["name"], "Negative");
        assert_eq!(props["Priority Score"]["number"], 105);
        assert_eq!(props["Impact Score"]["number"], 9);
        assert_eq!(props["Customer Segment"]["select"]["name"], "Enterprise");
        assert_eq!(props["Source"]["select"]["name"], "Support Ticket");
    }

    #[test]
    fn title_is_truncated_to_100_chars() {
        let mut item = analyzed_item();
        item.feedback_text = "x".repeat(500);
        let page = build_page(&item, "db");
        let title = page["properties"]["Title"]["title"][0]["text"]["content"]
            .as_str()
            .unwrap();
        assert_eq!(title.len(), 100);
    }

    #[test]
    fn unanalyzed_item_omits_derived_properties() {
        let mut item = analyzed_item();
        item.analysis = None;
        let page = build_page(&item, "db");
        assert!(page["properties"].get("Category").is_none());
        assert!(page["properties"].get("Priority Score").is_none());
    }

    #[test]
    fn customer_and_notes_sections_are_optional() {
        let mut item = analyzed_item();
        let page = build_page(&item, "db");
        // Body paragraph only
        assert_eq!(page["children"].as_array().unwrap().len(), 1);

        item.customer_name = Some("Ada".into());
        item.notes = Some("Escalated by CSM".into());
        let page = build_page(&item, "db");
        let children = page["children"].as_array().unwrap();
        assert_eq!(children.len(), 5);
        assert_eq!(
            children[1]["heading_3"]["rich_text"][0]["text"]["content"],
            "Customer Details"
        );
        assert_eq!(
            children[3]["heading_3"]["rich_text"][0]["text"]["content"],
            "Notes"
        );
    }
}
