//! Sync orchestrator — pushes qualifying feedback items to one configured
//! destination and records an auditable run outcome.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::SyncPolicy;
use crate::destinations::{Destination, DestinationKind, DestinationRegistry, PushResult};
use crate::error::SyncError;
use crate::store::Database;

/// What caused a sync run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerKind {
    Manual,
    Scheduled,
    Event,
}

impl TriggerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Scheduled => "scheduled",
            Self::Event => "event",
        }
    }
}

impl std::fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TriggerKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "manual" => Ok(Self::Manual),
            "scheduled" => Ok(Self::Scheduled),
            "event" => Ok(Self::Event),
            other => Err(format!("unknown trigger kind: {other}")),
        }
    }
}

/// Run-level outcome. `Partial` means at least one success and at least one
/// failure; `Failed` means every attempted item failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncStatus {
    Success,
    Partial,
    Failed,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "Success",
            Self::Partial => "Partial",
            Self::Failed => "Failed",
        }
    }
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SyncStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "Success" => Ok(Self::Success),
            "Partial" => Ok(Self::Partial),
            "Failed" => Ok(Self::Failed),
            other => Err(format!("unknown sync status: {other}")),
        }
    }
}

/// One item-level failure inside a run, in processing order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncItemError {
    pub item_id: Uuid,
    pub detail: String,
}

/// Immutable audit record of one sync run.
#[derive(Debug, Clone)]
pub struct SyncRun {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub destination: DestinationKind,
    pub trigger: TriggerKind,
    pub items_synced: u32,
    pub status: SyncStatus,
    pub errors: Vec<SyncItemError>,
    pub created_at: DateTime<Utc>,
}

/// Classify a finished run from its counts.
fn classify_status(synced: u32, failed: usize) -> SyncStatus {
    match (synced, failed) {
        (_, 0) => SyncStatus::Success,
        (0, _) => SyncStatus::Failed,
        _ => SyncStatus::Partial,
    }
}

/// Orchestrates batch pushes to configured destinations.
pub struct SyncEngine {
    db: Arc<dyn Database>,
    destinations: Arc<DestinationRegistry>,
    policy: SyncPolicy,
}

impl SyncEngine {
    pub fn new(
        db: Arc<dyn Database>,
        destinations: Arc<DestinationRegistry>,
        policy: SyncPolicy,
    ) -> Self {
        Self {
            db,
            destinations,
            policy,
        }
    }

    /// Run one sync for (organization, destination).
    ///
    /// Fails fast with `NotConfigured` (no run record) when there is no
    /// active integration. Otherwise a run record is always appended, even
    /// when every push failed. The batch body executes on a spawned task so
    /// a cancelled caller cannot lose the audit record of work already done.
    pub async fn run_sync(
        &self,
        organization_id: Uuid,
        kind: DestinationKind,
        trigger: TriggerKind,
    ) -> Result<SyncRun, SyncError> {
        let settings = self
            .db
            .get_settings(organization_id, kind)
            .await?
            .filter(|s| s.is_active)
            .ok_or(SyncError::NotConfigured {
                organization_id,
                kind,
            })?;

        let adapter = self
            .destinations
            .get(kind)
            .ok_or(SyncError::AdapterMissing { kind })?;

        let min_score = settings
            .options
            .min_priority_score
            .unwrap_or(self.policy.default_min_priority);

        let candidates = self
            .db
            .list_feedback_min_score(organization_id, min_score, self.policy.max_items_per_run)
            .await?;

        info!(
            organization_id = %organization_id,
            destination = %kind,
            trigger = %trigger,
            min_score,
            candidates = candidates.len(),
            "Starting sync run"
        );

        let db = Arc::clone(&self.db);
        let handle = tokio::spawn(push_batch(
            db, adapter, settings, candidates, organization_id, kind, trigger,
        ));

        handle
            .await
            .map_err(|e| SyncError::TaskFailed(e.to_string()))?
    }
}

/// Push every candidate in order, then persist the run record and bump the
/// settings' last-synced timestamp on Success/Partial.
async fn push_batch(
    db: Arc<dyn Database>,
    adapter: Arc<dyn Destination>,
    settings: crate::destinations::IntegrationSettings,
    candidates: Vec<crate::model::FeedbackItem>,
    organization_id: Uuid,
    kind: DestinationKind,
    trigger: TriggerKind,
) -> Result<SyncRun, SyncError> {
    let mut items_synced: u32 = 0;
    let mut errors: Vec<SyncItemError> = Vec::new();

    for item in &candidates {
        match adapter.push_item(&settings, item).await {
            PushResult::Delivered { reference } => {
                items_synced += 1;
                if let Some(reference) = reference {
                    // Durable back-reference (e.g. Jira issue key). A failed
                    // note write doesn't undo a successful push.
                    if let Err(e) = db.append_note(item.id, &reference).await {
                        warn!(item_id = %item.id, error = %e, "Failed to append push reference");
                    }
                }
            }
            PushResult::Rejected { detail } => {
                warn!(item_id = %item.id, destination = %kind, detail, "Item push rejected");
                errors.push(SyncItemError {
                    item_id: item.id,
                    detail,
                });
            }
        }
    }

    let completed_at = Utc::now();
    let run = SyncRun {
        id: Uuid::new_v4(),
        organization_id,
        destination: kind,
        trigger,
        items_synced,
        status: classify_status(items_synced, errors.len()),
        errors,
        created_at: completed_at,
    };

    db.append_sync_run(&run).await?;

    if matches!(run.status, SyncStatus::Success | SyncStatus::Partial) {
        db.update_last_synced(organization_id, kind, completed_at)
            .await?;
    }

    info!(
        organization_id = %organization_id,
        destination = %kind,
        status = %run.status,
        items_synced = run.items_synced,
        failures = run.errors.len(),
        "Sync run complete"
    );

    Ok(run)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classification() {
        assert_eq!(classify_status(0, 0), SyncStatus::Success);
        assert_eq!(classify_status(5, 0), SyncStatus::Success);
        assert_eq!(classify_status(3, 2), SyncStatus::Partial);
        assert_eq!(classify_status(0, 4), SyncStatus::Failed);
    }

    #[test]
    fn trigger_and_status_roundtrip() {
        for trigger in [TriggerKind::Manual, TriggerKind::Scheduled, TriggerKind::Event] {
            assert_eq!(trigger.as_str().parse::<TriggerKind>().unwrap(), trigger);
        }
        for status in [SyncStatus::Success, SyncStatus::Partial, SyncStatus::Failed] {
            assert_eq!(status.as_str().parse::<SyncStatus>().unwrap(), status);
        }
        assert!("cron".parse::<TriggerKind>().is_err());
    }
}
