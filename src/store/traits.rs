//! Unified `Database` trait — single async interface for the feedback,
//! settings, and sync-history collaborators.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::destinations::{DestinationKind, IntegrationSettings};
use crate::error::StoreError;
use crate::model::{Analysis, FeedbackItem};
use crate::sync::SyncRun;

/// Backend-agnostic persistence trait covering feedback items, integration
/// settings, and the sync-run audit trail.
#[async_trait]
pub trait Database: Send + Sync {
    /// Run all pending schema migrations.
    async fn run_migrations(&self) -> Result<(), StoreError>;

    // ── Feedback ────────────────────────────────────────────────────

    /// Insert a new feedback item (intake, derived fields unset).
    async fn insert_feedback(&self, item: &FeedbackItem) -> Result<(), StoreError>;

    /// Get a feedback item by id.
    async fn get_feedback(&self, id: Uuid) -> Result<Option<FeedbackItem>, StoreError>;

    /// Analyzed items for an organization with `priority_score >= min_score`,
    /// ordered by priority score descending, capped at `limit`.
    async fn list_feedback_min_score(
        &self,
        organization_id: Uuid,
        min_score: i64,
        limit: usize,
    ) -> Result<Vec<FeedbackItem>, StoreError>;

    /// Replace all derived fields of one item in a single atomic write.
    /// Fails with `NotFound` unless exactly one row is affected.
    async fn update_analysis(&self, id: Uuid, analysis: &Analysis) -> Result<(), StoreError>;

    /// Prepend a note line to an item's notes, preserving prior content,
    /// as one atomic statement.
    async fn append_note(&self, id: Uuid, note: &str) -> Result<(), StoreError>;

    // ── Integration settings ────────────────────────────────────────

    /// The settings row for (organization, destination), if one exists,
    /// active or not. Callers gate on `is_active` themselves.
    async fn get_settings(
        &self,
        organization_id: Uuid,
        kind: DestinationKind,
    ) -> Result<Option<IntegrationSettings>, StoreError>;

    /// Insert or replace the settings row for (organization, destination).
    /// At most one row exists per pair.
    async fn save_settings(&self, settings: &IntegrationSettings) -> Result<(), StoreError>;

    /// Update only the last-synced timestamp of one settings row.
    async fn update_last_synced(
        &self,
        organization_id: Uuid,
        kind: DestinationKind,
        ts: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    // ── Sync history ────────────────────────────────────────────────

    /// Append one immutable sync-run record.
    async fn append_sync_run(&self, run: &SyncRun) -> Result<(), StoreError>;

    /// Most recent sync runs for an organization, newest first.
    async fn list_sync_runs(
        &self,
        organization_id: Uuid,
        limit: usize,
    ) -> Result<Vec<SyncRun>, StoreError>;
}
