//! Domain model — feedback items, classifier judgments, derived analysis.
//!
//! Enum spellings (`"In-App"`, `"UX Issue"`, ...) match what the product
//! stores and what the classification service is prompted to return, so the
//! same strings flow through serde, the database, and destination payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Channel a piece of feedback arrived through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Source {
    Survey,
    #[serde(rename = "In-App")]
    InApp,
    #[serde(rename = "Social Media")]
    SocialMedia,
    #[serde(rename = "Support Ticket")]
    SupportTicket,
    Email,
}

/// Customer segment the feedback author belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Segment {
    Enterprise,
    Pro,
    Free,
    Trial,
}

/// Workflow status of a feedback item (controlled outside the core).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    New,
    #[serde(rename = "In Progress")]
    InProgress,
    Completed,
}

/// Fixed feedback taxonomy the classifier is prompted with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    Bug,
    #[serde(rename = "Feature Request")]
    FeatureRequest,
    #[serde(rename = "UX Issue")]
    UxIssue,
    #[serde(rename = "Performance Issue")]
    PerformanceIssue,
    #[serde(rename = "Pricing Concern")]
    PricingConcern,
    Documentation,
    #[serde(rename = "Integration Request")]
    IntegrationRequest,
    Complaint,
    Praise,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Urgency {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

macro_rules! enum_strings {
    ($ty:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(format!(
                        concat!("unknown ", stringify!($ty), ": {}"),
                        other
                    )),
                }
            }
        }
    };
}

enum_strings!(Source {
    Survey => "Survey",
    InApp => "In-App",
    SocialMedia => "Social Media",
    SupportTicket => "Support Ticket",
    Email => "Email",
});

enum_strings!(Segment {
    Enterprise => "Enterprise",
    Pro => "Pro",
    Free => "Free",
    Trial => "Trial",
});

enum_strings!(Status {
    New => "New",
    InProgress => "In Progress",
    Completed => "Completed",
});

enum_strings!(Category {
    Bug => "Bug",
    FeatureRequest => "Feature Request",
    UxIssue => "UX Issue",
    PerformanceIssue => "Performance Issue",
    PricingConcern => "Pricing Concern",
    Documentation => "Documentation",
    IntegrationRequest => "Integration Request",
    Complaint => "Complaint",
    Praise => "Praise",
});

enum_strings!(Urgency {
    High => "High",
    Medium => "Medium",
    Low => "Low",
});

enum_strings!(Sentiment {
    Positive => "Positive",
    Neutral => "Neutral",
    Negative => "Negative",
});

/// Structured categorical output of the classifier for one feedback item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Judgment {
    pub category: Category,
    pub urgency: Urgency,
    pub sentiment: Sentiment,
    pub impact_score: u8,
    pub key_themes: Vec<String>,
    pub summary: String,
}

/// Derived analysis fields. Set together, atomically, by one analysis pass —
/// a `FeedbackItem` either has all of them (`Some`) or none (`None`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub category: Category,
    pub urgency: Urgency,
    pub sentiment: Sentiment,
    pub impact_score: u8,
    pub key_themes: Vec<String>,
    pub priority_score: i64,
}

/// One piece of customer feedback plus its derived analysis.
#[derive(Debug, Clone)]
pub struct FeedbackItem {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub feedback_text: String,
    pub source: Source,
    pub customer_segment: Segment,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub status: Status,
    pub analysis: Option<Analysis>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl FeedbackItem {
    /// Create an unanalyzed item with a fresh id.
    pub fn new(
        organization_id: Uuid,
        feedback_text: impl Into<String>,
        source: Source,
        customer_segment: Segment,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            organization_id,
            feedback_text: feedback_text.into(),
            source,
            customer_segment,
            customer_name: None,
            customer_email: None,
            status: Status::New,
            analysis: None,
            notes: None,
            created_at: Utc::now(),
        }
    }

    /// Derived priority score, if the item has been analyzed.
    pub fn priority_score(&self) -> Option<i64> {
        self.analysis.as_ref().map(|a| a.priority_score)
    }

    /// First `max_chars` characters of the feedback text, for titles.
    pub fn title(&self, max_chars: usize) -> String {
        self.feedback_text.chars().take(max_chars).collect()
    }

    /// True once the derived fields have been populated.
    pub fn is_analyzed(&self) -> bool {
        self.analysis.is_some()
    }
}
