//! End-to-end sync orchestration over the in-memory backend with a scripted
//! destination adapter.

use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::SecretString;
use uuid::Uuid;

use feedbackiq::config::SyncPolicy;
use feedbackiq::destinations::{
    ConnectionResult, Credentials, Destination, DestinationKind, DestinationOptions,
    DestinationRegistry, IntegrationSettings, PushResult,
};
use feedbackiq::error::SyncError;
use feedbackiq::model::{
    Analysis, Category, FeedbackItem, Segment, Sentiment, Source, Urgency,
};
use feedbackiq::store::{Database, MemoryBackend};
use feedbackiq::sync::{SyncEngine, SyncStatus, TriggerKind};

/// Adapter double: rejects items whose priority score is in `reject_scores`,
/// optionally hands back a reference string or sleeps per push, and records
/// push order.
struct FakeDestination {
    kind: DestinationKind,
    reject_scores: Vec<i64>,
    reference: Option<String>,
    delay: Option<Duration>,
    pushed: Mutex<Vec<i64>>,
}

impl FakeDestination {
    fn new(kind: DestinationKind) -> Self {
        Self {
            kind,
            reject_scores: Vec::new(),
            reference: None,
            delay: None,
            pushed: Mutex::new(Vec::new()),
        }
    }

    fn rejecting(mut self, scores: Vec<i64>) -> Self {
        self.reject_scores = scores;
        self
    }

    fn with_reference(mut self, reference: &str) -> Self {
        self.reference = Some(reference.to_string());
        self
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn pushed_scores(&self) -> Vec<i64> {
        self.pushed.lock().unwrap().clone()
    }
}

#[async_trait]
impl Destination for FakeDestination {
    fn kind(&self) -> DestinationKind {
        self.kind
    }

    async fn test_connection(&self, _settings: &IntegrationSettings) -> ConnectionResult {
        ConnectionResult::Ok {
            display_name: "fake".into(),
        }
    }

    async fn push_item(
        &self,
        _settings: &IntegrationSettings,
        item: &FeedbackItem,
    ) -> PushResult {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let score = item.priority_score().unwrap_or(0);
        self.pushed.lock().unwrap().push(score);
        if self.reject_scores.contains(&score) {
            PushResult::Rejected {
                detail: format!("rejected score {score}"),
            }
        } else {
            PushResult::Delivered {
                reference: self.reference.clone(),
            }
        }
    }
}

fn analysis(score: i64) -> Analysis {
    Analysis {
        category: Category::Bug,
        urgency: Urgency::High,
        sentiment: Sentiment::Negative,
        impact_score: 8,
        key_themes: vec!["crash".into(), "data loss".into()],
        priority_score: score,
    }
}

async fn seed_item(db: &MemoryBackend, org: Uuid, score: i64) -> FeedbackItem {
    let mut item = FeedbackItem::new(
        org,
        format!("item scoring {score}"),
        Source::InApp,
        Segment::Enterprise,
    );
    item.analysis = Some(analysis(score));
    db.insert_feedback(&item).await.unwrap();
    item
}

fn settings(org: Uuid, kind: DestinationKind) -> IntegrationSettings {
    IntegrationSettings {
        organization_id: org,
        kind,
        credentials: Credentials::WebhookUrl {
            url: SecretString::from("https://hooks.example.test/x"),
        },
        routing: None,
        is_active: true,
        last_synced_at: None,
        options: DestinationOptions::default(),
    }
}

fn engine_with(
    db: Arc<MemoryBackend>,
    adapter: Arc<FakeDestination>,
) -> SyncEngine {
    let mut registry = DestinationRegistry::new();
    registry.register(adapter);
    SyncEngine::new(db, Arc::new(registry), SyncPolicy::default())
}

#[tokio::test]
async fn empty_batch_still_records_a_success_run() {
    let db = Arc::new(MemoryBackend::new());
    let org = Uuid::new_v4();
    db.save_settings(&settings(org, DestinationKind::Slack))
        .await
        .unwrap();

    let adapter = Arc::new(FakeDestination::new(DestinationKind::Slack));
    let engine = engine_with(db.clone(), adapter);

    let run = engine
        .run_sync(org, DestinationKind::Slack, TriggerKind::Manual)
        .await
        .unwrap();
    assert_eq!(run.status, SyncStatus::Success);
    assert_eq!(run.items_synced, 0);
    assert!(run.errors.is_empty());

    let runs = db.list_sync_runs(org, 10).await.unwrap();
    assert_eq!(runs.len(), 1);
}

#[tokio::test]
async fn mixed_outcome_is_partial_and_bumps_last_synced() {
    let db = Arc::new(MemoryBackend::new());
    let org = Uuid::new_v4();
    db.save_settings(&settings(org, DestinationKind::Slack))
        .await
        .unwrap();
    for score in [115, 105, 95, 90, 85] {
        seed_item(&db, org, score).await;
    }

    let adapter =
        Arc::new(FakeDestination::new(DestinationKind::Slack).rejecting(vec![105, 90]));
    let engine = engine_with(db.clone(), adapter.clone());

    let run = engine
        .run_sync(org, DestinationKind::Slack, TriggerKind::Scheduled)
        .await
        .unwrap();
    assert_eq!(run.status, SyncStatus::Partial);
    assert_eq!(run.items_synced, 3);
    assert_eq!(run.errors.len(), 2);

    // Candidates are attempted highest score first
    assert_eq!(adapter.pushed_scores(), vec![115, 105, 95, 90, 85]);

    let stored = db
        .get_settings(org, DestinationKind::Slack)
        .await
        .unwrap()
        .unwrap();
    assert!(stored.last_synced_at.is_some());
}

#[tokio::test]
async fn total_failure_is_failed_and_last_synced_untouched() {
    let db = Arc::new(MemoryBackend::new());
    let org = Uuid::new_v4();
    db.save_settings(&settings(org, DestinationKind::Zapier))
        .await
        .unwrap();
    for score in [100, 90] {
        seed_item(&db, org, score).await;
    }

    let adapter =
        Arc::new(FakeDestination::new(DestinationKind::Zapier).rejecting(vec![100, 90]));
    let engine = engine_with(db.clone(), adapter);

    let run = engine
        .run_sync(org, DestinationKind::Zapier, TriggerKind::Manual)
        .await
        .unwrap();
    assert_eq!(run.status, SyncStatus::Failed);
    assert_eq!(run.items_synced, 0);
    assert_eq!(run.errors.len(), 2);

    let stored = db
        .get_settings(org, DestinationKind::Zapier)
        .await
        .unwrap()
        .unwrap();
    assert!(stored.last_synced_at.is_none());

    // The failed run is still on the audit trail
    let runs = db.list_sync_runs(org, 10).await.unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].status, SyncStatus::Failed);
}

#[tokio::test]
async fn missing_or_inactive_integration_writes_no_run() {
    let db = Arc::new(MemoryBackend::new());
    let org = Uuid::new_v4();

    let adapter = Arc::new(FakeDestination::new(DestinationKind::Notion));
    let engine = engine_with(db.clone(), adapter);

    // No settings at all
    let err = engine
        .run_sync(org, DestinationKind::Notion, TriggerKind::Manual)
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::NotConfigured { .. }));

    // Settings exist but are disabled
    let mut disabled = settings(org, DestinationKind::Notion);
    disabled.is_active = false;
    db.save_settings(&disabled).await.unwrap();

    let err = engine
        .run_sync(org, DestinationKind::Notion, TriggerKind::Manual)
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::NotConfigured { .. }));

    assert!(db.list_sync_runs(org, 10).await.unwrap().is_empty());
}

#[tokio::test]
async fn delivery_reference_is_prepended_to_notes() {
    let db = Arc::new(MemoryBackend::new());
    let org = Uuid::new_v4();
    db.save_settings(&settings(org, DestinationKind::Jira))
        .await
        .unwrap();
    let mut item = seed_item(&db, org, 95).await;
    item.notes = Some("Escalated by CSM".into());
    db.insert_feedback(&item).await.unwrap();

    let adapter = Arc::new(
        FakeDestination::new(DestinationKind::Jira)
            .with_reference("Jira ticket created: FB-42"),
    );
    let engine = engine_with(db.clone(), adapter);

    engine
        .run_sync(org, DestinationKind::Jira, TriggerKind::Manual)
        .await
        .unwrap();

    let stored = db.get_feedback(item.id).await.unwrap().unwrap();
    assert_eq!(
        stored.notes.as_deref(),
        Some("Jira ticket created: FB-42\nEscalated by CSM")
    );
}

#[tokio::test]
async fn batch_is_capped_at_policy_limit() {
    let db = Arc::new(MemoryBackend::new());
    let org = Uuid::new_v4();
    db.save_settings(&settings(org, DestinationKind::Slack))
        .await
        .unwrap();
    for i in 0..55 {
        seed_item(&db, org, 80 + (i % 30)).await;
    }

    let adapter = Arc::new(FakeDestination::new(DestinationKind::Slack));
    let engine = engine_with(db.clone(), adapter.clone());

    let run = engine
        .run_sync(org, DestinationKind::Slack, TriggerKind::Manual)
        .await
        .unwrap();
    assert_eq!(run.items_synced, 50);
    assert_eq!(adapter.pushed_scores().len(), 50);
}

#[tokio::test]
async fn integration_threshold_overrides_default() {
    let db = Arc::new(MemoryBackend::new());
    let org = Uuid::new_v4();
    let mut configured = settings(org, DestinationKind::Slack);
    configured.options.min_priority_score = Some(100);
    db.save_settings(&configured).await.unwrap();
    for score in [115, 95, 85] {
        seed_item(&db, org, score).await;
    }

    let adapter = Arc::new(FakeDestination::new(DestinationKind::Slack));
    let engine = engine_with(db.clone(), adapter.clone());

    let run = engine
        .run_sync(org, DestinationKind::Slack, TriggerKind::Manual)
        .await
        .unwrap();
    assert_eq!(run.items_synced, 1);
    assert_eq!(adapter.pushed_scores(), vec![115]);
}

#[tokio::test]
async fn dropped_caller_does_not_lose_the_run_record() {
    let db = Arc::new(MemoryBackend::new());
    let org = Uuid::new_v4();
    db.save_settings(&settings(org, DestinationKind::Slack))
        .await
        .unwrap();
    for score in [95, 85] {
        seed_item(&db, org, score).await;
    }

    let adapter = Arc::new(
        FakeDestination::new(DestinationKind::Slack).with_delay(Duration::from_millis(50)),
    );
    let engine = engine_with(db.clone(), adapter.clone());

    // Caller gives up mid-batch; the spawned run body keeps going.
    let caller = tokio::time::timeout(
        Duration::from_millis(10),
        engine.run_sync(org, DestinationKind::Slack, TriggerKind::Manual),
    )
    .await;
    assert!(caller.is_err());

    let mut runs = Vec::new();
    for _ in 0..100 {
        runs = db.list_sync_runs(org, 10).await.unwrap();
        if !runs.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].status, SyncStatus::Success);
    assert_eq!(runs[0].items_synced, 2);
    assert_eq!(adapter.pushed_scores(), vec![95, 85]);
}

#[tokio::test]
async fn unregistered_adapter_is_a_distinct_error() {
    let db = Arc::new(MemoryBackend::new());
    let org = Uuid::new_v4();
    db.save_settings(&settings(org, DestinationKind::Jira))
        .await
        .unwrap();

    // Registry holds a Slack adapter only
    let adapter = Arc::new(FakeDestination::new(DestinationKind::Slack));
    let engine = engine_with(db.clone(), adapter);

    let err = engine
        .run_sync(org, DestinationKind::Jira, TriggerKind::Manual)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SyncError::AdapterMissing {
            kind: DestinationKind::Jira
        }
    ));
}
