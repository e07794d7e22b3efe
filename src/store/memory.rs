//! In-memory `Database` backend for tests and demos.
//!
//! Mirrors the libSQL backend's semantics (exactly-one-row updates, note
//! prepend, one settings row per (org, destination), descending-score
//! candidate ordering) without touching disk.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::destinations::{DestinationKind, IntegrationSettings};
use crate::error::StoreError;
use crate::model::{Analysis, FeedbackItem};
use crate::store::traits::Database;
use crate::sync::SyncRun;

#[derive(Default)]
struct Inner {
    feedback: HashMap<Uuid, FeedbackItem>,
    settings: HashMap<(Uuid, DestinationKind), IntegrationSettings>,
    sync_runs: Vec<SyncRun>,
}

/// Hash-map backed store behind one async mutex.
pub struct MemoryBackend {
    inner: Mutex<Inner>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
        }
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Database for MemoryBackend {
    async fn run_migrations(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn insert_feedback(&self, item: &FeedbackItem) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        inner.feedback.insert(item.id, item.clone());
        Ok(())
    }

    async fn get_feedback(&self, id: Uuid) -> Result<Option<FeedbackItem>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner.feedback.get(&id).cloned())
    }

    async fn list_feedback_min_score(
        &self,
        organization_id: Uuid,
        min_score: i64,
        limit: usize,
    ) -> Result<Vec<FeedbackItem>, StoreError> {
        let inner = self.inner.lock().await;
        let mut items: Vec<FeedbackItem> = inner
            .feedback
            .values()
            .filter(|item| item.organization_id == organization_id)
            .filter(|item| item.priority_score().is_some_and(|s| s >= min_score))
            .cloned()
            .collect();
        items.sort_by_key(|item| std::cmp::Reverse(item.priority_score().unwrap_or(0)));
        items.truncate(limit);
        Ok(items)
    }

    async fn update_analysis(&self, id: Uuid, analysis: &Analysis) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        match inner.feedback.get_mut(&id) {
            Some(item) => {
                item.analysis = Some(analysis.clone());
                Ok(())
            }
            None => Err(StoreError::NotFound {
                entity: "feedback".into(),
                id: id.to_string(),
            }),
        }
    }

    async fn append_note(&self, id: Uuid, note: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        match inner.feedback.get_mut(&id) {
            Some(item) => {
                item.notes = Some(match item.notes.take().filter(|n| !n.is_empty()) {
                    Some(existing) => format!("{note}\n{existing}"),
                    None => note.to_string(),
                });
                Ok(())
            }
            None => Err(StoreError::NotFound {
                entity: "feedback".into(),
                id: id.to_string(),
            }),
        }
    }

    async fn get_settings(
        &self,
        organization_id: Uuid,
        kind: DestinationKind,
    ) -> Result<Option<IntegrationSettings>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner.settings.get(&(organization_id, kind)).cloned())
    }

    async fn save_settings(&self, settings: &IntegrationSettings) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        inner.settings.insert(
            (settings.organization_id, settings.kind),
            settings.clone(),
        );
        Ok(())
    }

    async fn update_last_synced(
        &self,
        organization_id: Uuid,
        kind: DestinationKind,
        ts: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        match inner.settings.get_mut(&(organization_id, kind)) {
            Some(settings) => {
                settings.last_synced_at = Some(ts);
                Ok(())
            }
            None => Err(StoreError::NotFound {
                entity: "integration_settings".into(),
                id: format!("{organization_id}/{kind}"),
            }),
        }
    }

    async fn append_sync_run(&self, run: &SyncRun) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        inner.sync_runs.push(run.clone());
        Ok(())
    }

    async fn list_sync_runs(
        &self,
        organization_id: Uuid,
        limit: usize,
    ) -> Result<Vec<SyncRun>, StoreError> {
        let inner = self.inner.lock().await;
        let mut runs: Vec<SyncRun> = inner
            .sync_runs
            .iter()
            .filter(|run| run.organization_id == organization_id)
            .cloned()
            .collect();
        runs.reverse();
        runs.truncate(limit);
        Ok(runs)
    }
}
