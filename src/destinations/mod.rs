//! Destination adapters — one per external system a feedback item can be
//! pushed to.
//!
//! Every adapter implements the same capability set: a non-mutating
//! connectivity test and a single-item push. Adapters catch their own
//! transport failures and fold them into `Rejected` so the sync orchestrator
//! can keep processing the rest of a batch.

pub mod jira;
pub mod notion;
pub mod slack;
pub mod webhook;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::HttpConfig;
use crate::model::FeedbackItem;

pub use jira::JiraDestination;
pub use notion::NotionDestination;
pub use slack::SlackDestination;
pub use webhook::WebhookDestination;

/// Supported destination types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DestinationKind {
    Notion,
    Slack,
    Jira,
    Zapier,
}

impl DestinationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Notion => "notion",
            Self::Slack => "slack",
            Self::Jira => "jira",
            Self::Zapier => "zapier",
        }
    }
}

impl std::fmt::Display for DestinationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DestinationKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "notion" => Ok(Self::Notion),
            "slack" => Ok(Self::Slack),
            "jira" => Ok(Self::Jira),
            "zapier" => Ok(Self::Zapier),
            other => Err(format!("unknown destination: {other}")),
        }
    }
}

/// Opaque authentication material for one destination.
///
/// Secrets stay wrapped in `SecretString` through the whole call chain and
/// are exposed only when building the outbound request (or when the settings
/// store persists them). `Debug` output redacts them.
#[derive(Debug, Clone)]
pub enum Credentials {
    /// Bearer-style API secret (Notion).
    ApiKey { secret: SecretString },
    /// The webhook URL itself is the secret (Slack, Zapier).
    WebhookUrl { url: SecretString },
    /// HTTP Basic triple (Jira).
    Basic {
        domain: String,
        email: String,
        api_token: SecretString,
    },
}

impl Credentials {
    pub(crate) fn api_key(&self) -> Option<&SecretString> {
        match self {
            Self::ApiKey { secret } => Some(secret),
            _ => None,
        }
    }

    pub(crate) fn webhook_url(&self) -> Option<&SecretString> {
        match self {
            Self::WebhookUrl { url } => Some(url),
            _ => None,
        }
    }

    pub(crate) fn basic(&self) -> Option<(&str, &str, &SecretString)> {
        match self {
            Self::Basic {
                domain,
                email,
                api_token,
            } => Some((domain, email, api_token)),
            _ => None,
        }
    }
}

/// Type-specific options bag stored with each integration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DestinationOptions {
    /// Push newly analyzed high-priority items without a manual trigger.
    pub auto_sync: bool,
    /// Per-integration override of the qualification threshold.
    pub min_priority_score: Option<i64>,
    /// Jira issue type (defaults to "Task" at push time).
    pub issue_type: Option<String>,
    /// Jira assignee login, if issues should be pre-assigned.
    pub default_assignee: Option<String>,
}

/// One configured integration for an (organization, destination) pair.
#[derive(Debug, Clone)]
pub struct IntegrationSettings {
    pub organization_id: Uuid,
    pub kind: DestinationKind,
    pub credentials: Credentials,
    /// Destination-specific routing id: Notion database id, Jira project key.
    pub routing: Option<String>,
    pub is_active: bool,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub options: DestinationOptions,
}

/// Outcome of a connectivity test. Never mutates destination state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionResult {
    Ok { display_name: String },
    Failed { reason: String },
}

/// Outcome of pushing one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushResult {
    /// Destination accepted the item. `reference` carries a durable
    /// back-reference (e.g. a Jira issue key note) when the destination
    /// returns one.
    Delivered { reference: Option<String> },
    /// Destination refused the item, or the call failed in transport.
    Rejected { detail: String },
}

impl PushResult {
    pub(crate) fn rejected(detail: impl Into<String>) -> Self {
        Self::Rejected {
            detail: detail.into(),
        }
    }
}

/// Common capability set for all destinations.
#[async_trait]
pub trait Destination: Send + Sync {
    fn kind(&self) -> DestinationKind;

    /// Minimal read/ping against the destination to verify credentials and
    /// routing. Must not create or modify anything remote.
    async fn test_connection(&self, settings: &IntegrationSettings) -> ConnectionResult;

    /// Render and submit one feedback item. Transport failures are folded
    /// into `PushResult::Rejected`; this never returns a raw error.
    async fn push_item(
        &self,
        settings: &IntegrationSettings,
        item: &FeedbackItem,
    ) -> PushResult;
}

/// Registry mapping destination kinds to adapters.
pub struct DestinationRegistry {
    adapters: HashMap<DestinationKind, Arc<dyn Destination>>,
}

impl DestinationRegistry {
    pub fn new() -> Self {
        Self {
            adapters: HashMap::new(),
        }
    }

    /// Registry with all four built-in adapters sharing one timeout-bounded
    /// HTTP client.
    pub fn with_defaults(http: &HttpConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(http.timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        let mut registry = Self::new();
        registry.register(Arc::new(NotionDestination::new(client.clone())));
        registry.register(Arc::new(SlackDestination::new(client.clone())));
        registry.register(Arc::new(JiraDestination::new(client.clone())));
        registry.register(Arc::new(WebhookDestination::new(client)));
        registry
    }

    pub fn register(&mut self, adapter: Arc<dyn Destination>) {
        self.adapters.insert(adapter.kind(), adapter);
    }

    pub fn get(&self, kind: DestinationKind) -> Option<Arc<dyn Destination>> {
        self.adapters.get(&kind).cloned()
    }
}

impl Default for DestinationRegistry {
    fn default() -> Self {
        Self::with_defaults(&HttpConfig::default())
    }
}

/// Shared helper: read a response body for an error detail, bounded so one
/// hostile destination cannot bloat a sync run record.
pub(crate) async fn error_detail(resp: reqwest::Response) -> String {
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    bound_detail(format!("{status}: {body}"))
}

/// Cap a detail string at 500 bytes, cutting on a char boundary so multibyte
/// response bodies cannot panic the push path.
fn bound_detail(mut detail: String) -> String {
    if detail.len() > 500 {
        let mut cut = 500;
        while !detail.is_char_boundary(cut) {
            cut -= 1;
        }
        detail.truncate(cut);
    }
    detail
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_defaults_cover_all_kinds() {
        let registry = DestinationRegistry::default();
        for kind in [
            DestinationKind::Notion,
            DestinationKind::Slack,
            DestinationKind::Jira,
            DestinationKind::Zapier,
        ] {
            let adapter = registry.get(kind).expect("adapter registered");
            assert_eq!(adapter.kind(), kind);
        }
    }

    #[test]
    fn kind_roundtrips_through_strings() {
        for kind in [
            DestinationKind::Notion,
            DestinationKind::Slack,
            DestinationKind::Jira,
            DestinationKind::Zapier,
        ] {
            assert_eq!(kind.as_str().parse::<DestinationKind>().unwrap(), kind);
        }
        assert!("salesforce".parse::<DestinationKind>().is_err());
    }

    #[test]
    fn credentials_debug_redacts_secrets() {
        let creds = Credentials::ApiKey {
            secret: SecretString::from("ntn_very_secret"),
        };
        let debug = format!("{creds:?}");
        assert!(!debug.contains("ntn_very_secret"));
    }

    #[test]
    fn bound_detail_cuts_multibyte_bodies_on_char_boundaries() {
        // 250 two-byte chars after the status prefix puts byte 500 mid-char
        let body = "é".repeat(400);
        let bounded = bound_detail(format!("500 Internal Server Error: {body}"));
        assert!(bounded.len() <= 500);
        assert!(bounded.is_char_boundary(bounded.len()));
        assert!(bounded.starts_with("500 Internal Server Error: "));

        let short = bound_detail("404 Not Found: gone".to_string());
        assert_eq!(short, "404 Not Found: gone");

        let ascii = bound_detail("x".repeat(600));
        assert_eq!(ascii.len(), 500);
    }

    #[test]
    fn credential_accessors_reject_mismatched_shapes() {
        let creds = Credentials::WebhookUrl {
            url: SecretString::from("https://hooks.slack.com/services/x"),
        };
        assert!(creds.api_key().is_none());
        assert!(creds.basic().is_none());
        assert!(creds.webhook_url().is_some());
    }
}
