//! FeedbackIQ — customer feedback analysis and dispatch.
//!
//! Classifies raw feedback with an LLM, derives a priority score, and pushes
//! high-priority items to configured destinations (Notion, Slack, Jira,
//! Zapier webhooks) with a durable audit trail of every sync run.

pub mod analysis;
pub mod classifier;
pub mod config;
pub mod destinations;
pub mod error;
pub mod model;
pub mod scoring;
pub mod store;
pub mod sync;

pub use error::{Error, Result};
