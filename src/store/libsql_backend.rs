//! libSQL backend — async `Database` trait implementation over a local file
//! or in-memory database.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Connection, Database as LibSqlDatabase, params};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info};
use uuid::Uuid;

use crate::destinations::{
    Credentials, DestinationKind, DestinationOptions, IntegrationSettings,
};
use crate::error::StoreError;
use crate::model::{Analysis, FeedbackItem};
use crate::store::migrations;
use crate::store::traits::Database;
use crate::sync::{SyncItemError, SyncRun, SyncStatus, TriggerKind};

/// libSQL database backend.
///
/// Stores a single connection that is reused for all operations.
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlBackend {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlBackend {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::Connection(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| StoreError::Connection(format!("Failed to open database: {e}")))?;

        let conn = db
            .connect()
            .map_err(|e| StoreError::Connection(format!("Failed to create connection: {e}")))?;

        let backend = Self {
            db: Arc::new(db),
            conn,
        };
        backend.run_migrations().await?;
        info!(path = %path.display(), "Database opened");
        Ok(backend)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, StoreError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                StoreError::Connection(format!("Failed to create in-memory database: {e}"))
            })?;

        let conn = db
            .connect()
            .map_err(|e| StoreError::Connection(format!("Failed to create connection: {e}")))?;

        let backend = Self {
            db: Arc::new(db),
            conn,
        };
        backend.run_migrations().await?;
        Ok(backend)
    }

    fn conn(&self) -> &Connection {
        &self.conn
    }
}

// ── Helper functions ────────────────────────────────────────────────

/// Parse an RFC 3339 or SQLite datetime string into DateTime<Utc>.
fn parse_datetime(s: &str) -> Result<DateTime<Utc>, StoreError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return Ok(ndt.and_utc());
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Ok(ndt.and_utc());
    }
    Err(StoreError::Serialization(format!("invalid datetime: {s}")))
}

/// Convert `Option<&str>` to a libsql Value.
fn opt_text(s: Option<&str>) -> libsql::Value {
    match s {
        Some(s) => libsql::Value::Text(s.to_string()),
        None => libsql::Value::Null,
    }
}

fn parse_uuid(s: &str, entity: &str) -> Result<Uuid, StoreError> {
    Uuid::parse_str(s).map_err(|e| StoreError::Serialization(format!("{entity} id: {e}")))
}

fn parse_enum<T: std::str::FromStr<Err = String>>(
    s: &str,
    column: &str,
) -> Result<T, StoreError> {
    s.parse()
        .map_err(|e| StoreError::Serialization(format!("{column}: {e}")))
}

/// Serialize credentials for the settings row. This is the one place secret
/// material is deliberately exposed outside a request builder.
fn credentials_to_json(credentials: &Credentials) -> String {
    let value = match credentials {
        Credentials::ApiKey { secret } => serde_json::json!({
            "type": "api_key",
            "secret": secret.expose_secret(),
        }),
        Credentials::WebhookUrl { url } => serde_json::json!({
            "type": "webhook_url",
            "url": url.expose_secret(),
        }),
        Credentials::Basic {
            domain,
            email,
            api_token,
        } => serde_json::json!({
            "type": "basic",
            "domain": domain,
            "email": email,
            "api_token": api_token.expose_secret(),
        }),
    };
    value.to_string()
}

fn credentials_from_json(raw: &str) -> Result<Credentials, StoreError> {
    let value: serde_json::Value = serde_json::from_str(raw)
        .map_err(|e| StoreError::Serialization(format!("credentials: {e}")))?;

    let field = |key: &str| -> Result<String, StoreError> {
        value[key]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| StoreError::Serialization(format!("credentials missing {key}")))
    };

    match value["type"].as_str() {
        Some("api_key") => Ok(Credentials::ApiKey {
            secret: SecretString::from(field("secret")?),
        }),
        Some("webhook_url") => Ok(Credentials::WebhookUrl {
            url: SecretString::from(field("url")?),
        }),
        Some("basic") => Ok(Credentials::Basic {
            domain: field("domain")?,
            email: field("email")?,
            api_token: SecretString::from(field("api_token")?),
        }),
        other => Err(StoreError::Serialization(format!(
            "unknown credentials type: {other:?}"
        ))),
    }
}

// ── Row mappers ─────────────────────────────────────────────────────

const FEEDBACK_COLUMNS: &str = "id, organization_id, feedback_text, source, customer_segment, \
     customer_name, customer_email, status, category, urgency, sentiment, impact_score, \
     key_themes, priority_score, notes, created_at";

fn row_to_feedback(row: &libsql::Row) -> Result<FeedbackItem, StoreError> {
    let query_err = |e: libsql::Error| StoreError::Query(format!("feedback row: {e}"));

    let id: String = row.get(0).map_err(query_err)?;
    let organization_id: String = row.get(1).map_err(query_err)?;
    let feedback_text: String = row.get(2).map_err(query_err)?;
    let source: String = row.get(3).map_err(query_err)?;
    let customer_segment: String = row.get(4).map_err(query_err)?;
    let customer_name: Option<String> = row.get(5).ok();
    let customer_email: Option<String> = row.get(6).ok();
    let status: String = row.get(7).map_err(query_err)?;
    let category: Option<String> = row.get(8).ok();
    let urgency: Option<String> = row.get(9).ok();
    let sentiment: Option<String> = row.get(10).ok();
    let impact_score: Option<i64> = row.get(11).ok();
    let key_themes: Option<String> = row.get(12).ok();
    let priority_score: Option<i64> = row.get(13).ok();
    let notes: Option<String> = row.get(14).ok();
    let created_at: String = row.get(15).map_err(query_err)?;

    // Derived fields are all-or-nothing; a row written by update_analysis
    // always has the full set.
    let analysis = match (category, urgency, sentiment, impact_score, priority_score) {
        (Some(category), Some(urgency), Some(sentiment), Some(impact), Some(score)) => {
            let themes: Vec<String> = key_themes
                .as_deref()
                .map(serde_json::from_str)
                .transpose()
                .map_err(|e| StoreError::Serialization(format!("key_themes: {e}")))?
                .unwrap_or_default();
            Some(Analysis {
                category: parse_enum(&category, "category")?,
                urgency: parse_enum(&urgency, "urgency")?,
                sentiment: parse_enum(&sentiment, "sentiment")?,
                impact_score: impact as u8,
                key_themes: themes,
                priority_score: score,
            })
        }
        _ => None,
    };

    Ok(FeedbackItem {
        id: parse_uuid(&id, "feedback")?,
        organization_id: parse_uuid(&organization_id, "organization")?,
        feedback_text,
        source: parse_enum(&source, "source")?,
        customer_segment: parse_enum(&customer_segment, "customer_segment")?,
        customer_name,
        customer_email,
        status: parse_enum(&status, "status")?,
        analysis,
        notes,
        created_at: parse_datetime(&created_at)?,
    })
}

const SETTINGS_COLUMNS: &str = "organization_id, integration_type, credentials, routing, \
     is_active, last_synced_at, settings";

fn row_to_settings(row: &libsql::Row) -> Result<IntegrationSettings, StoreError> {
    let query_err = |e: libsql::Error| StoreError::Query(format!("settings row: {e}"));

    let organization_id: String = row.get(0).map_err(query_err)?;
    let integration_type: String = row.get(1).map_err(query_err)?;
    let credentials: String = row.get(2).map_err(query_err)?;
    let routing: Option<String> = row.get(3).ok();
    let is_active: i64 = row.get(4).map_err(query_err)?;
    let last_synced_at: Option<String> = row.get(5).ok();
    let options: String = row.get(6).map_err(query_err)?;

    Ok(IntegrationSettings {
        organization_id: parse_uuid(&organization_id, "organization")?,
        kind: parse_enum(&integration_type, "integration_type")?,
        credentials: credentials_from_json(&credentials)?,
        routing,
        is_active: is_active != 0,
        last_synced_at: last_synced_at.as_deref().map(parse_datetime).transpose()?,
        options: serde_json::from_str(&options)
            .map_err(|e| StoreError::Serialization(format!("settings options: {e}")))?,
    })
}

const RUN_COLUMNS: &str =
    "id, organization_id, integration_type, trigger_kind, items_synced, status, \
     error_details, created_at";

fn row_to_run(row: &libsql::Row) -> Result<SyncRun, StoreError> {
    let query_err = |e: libsql::Error| StoreError::Query(format!("sync run row: {e}"));

    let id: String = row.get(0).map_err(query_err)?;
    let organization_id: String = row.get(1).map_err(query_err)?;
    let integration_type: String = row.get(2).map_err(query_err)?;
    let trigger_kind: String = row.get(3).map_err(query_err)?;
    let items_synced: i64 = row.get(4).map_err(query_err)?;
    let status: String = row.get(5).map_err(query_err)?;
    let error_details: String = row.get(6).map_err(query_err)?;
    let created_at: String = row.get(7).map_err(query_err)?;

    let errors: Vec<SyncItemError> = serde_json::from_str(&error_details)
        .map_err(|e| StoreError::Serialization(format!("error_details: {e}")))?;

    Ok(SyncRun {
        id: parse_uuid(&id, "sync run")?,
        organization_id: parse_uuid(&organization_id, "organization")?,
        destination: parse_enum::<DestinationKind>(&integration_type, "integration_type")?,
        trigger: parse_enum::<TriggerKind>(&trigger_kind, "trigger_kind")?,
        items_synced: items_synced as u32,
        status: parse_enum::<SyncStatus>(&status, "status")?,
        errors,
        created_at: parse_datetime(&created_at)?,
    })
}

// ── Trait implementation ────────────────────────────────────────────

#[async_trait]
impl Database for LibSqlBackend {
    async fn run_migrations(&self) -> Result<(), StoreError> {
        migrations::run_migrations(self.conn()).await
    }

    // ── Feedback ────────────────────────────────────────────────────

    async fn insert_feedback(&self, item: &FeedbackItem) -> Result<(), StoreError> {
        let now = Utc::now().to_rfc3339();
        self.conn()
            .execute(
                "INSERT INTO feedback (id, organization_id, feedback_text, source, \
                 customer_segment, customer_name, customer_email, status, notes, \
                 created_at, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    item.id.to_string(),
                    item.organization_id.to_string(),
                    item.feedback_text.clone(),
                    item.source.as_str(),
                    item.customer_segment.as_str(),
                    opt_text(item.customer_name.as_deref()),
                    opt_text(item.customer_email.as_deref()),
                    item.status.as_str(),
                    opt_text(item.notes.as_deref()),
                    item.created_at.to_rfc3339(),
                    now,
                ],
            )
            .await
            .map_err(|e| StoreError::Query(format!("insert_feedback: {e}")))?;

        debug!(item_id = %item.id, "Feedback inserted");
        Ok(())
    }

    async fn get_feedback(&self, id: Uuid) -> Result<Option<FeedbackItem>, StoreError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {FEEDBACK_COLUMNS} FROM feedback WHERE id = ?1"),
                params![id.to_string()],
            )
            .await
            .map_err(|e| StoreError::Query(format!("get_feedback: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_feedback(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(StoreError::Query(format!("get_feedback: {e}"))),
        }
    }

    async fn list_feedback_min_score(
        &self,
        organization_id: Uuid,
        min_score: i64,
        limit: usize,
    ) -> Result<Vec<FeedbackItem>, StoreError> {
        let mut rows = self
            .conn()
            .query(
                &format!(
                    "SELECT {FEEDBACK_COLUMNS} FROM feedback \
                     WHERE organization_id = ?1 AND priority_score >= ?2 \
                     ORDER BY priority_score DESC LIMIT ?3"
                ),
                params![organization_id.to_string(), min_score, limit as i64],
            )
            .await
            .map_err(|e| StoreError::Query(format!("list_feedback_min_score: {e}")))?;

        let mut items = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            match row_to_feedback(&row) {
                Ok(item) => items.push(item),
                Err(e) => {
                    tracing::warn!("Skipping feedback row: {e}");
                }
            }
        }
        Ok(items)
    }

    async fn update_analysis(&self, id: Uuid, analysis: &Analysis) -> Result<(), StoreError> {
        let themes = serde_json::to_string(&analysis.key_themes)
            .map_err(|e| StoreError::Serialization(format!("key_themes: {e}")))?;
        let now = Utc::now().to_rfc3339();

        let changed = self
            .conn()
            .execute(
                "UPDATE feedback SET category = ?1, urgency = ?2, sentiment = ?3, \
                 impact_score = ?4, key_themes = ?5, priority_score = ?6, updated_at = ?7 \
                 WHERE id = ?8",
                params![
                    analysis.category.as_str(),
                    analysis.urgency.as_str(),
                    analysis.sentiment.as_str(),
                    i64::from(analysis.impact_score),
                    themes,
                    analysis.priority_score,
                    now,
                    id.to_string(),
                ],
            )
            .await
            .map_err(|e| StoreError::Query(format!("update_analysis: {e}")))?;

        if changed != 1 {
            return Err(StoreError::NotFound {
                entity: "feedback".into(),
                id: id.to_string(),
            });
        }

        debug!(item_id = %id, priority_score = analysis.priority_score, "Analysis persisted");
        Ok(())
    }

    async fn append_note(&self, id: Uuid, note: &str) -> Result<(), StoreError> {
        let now = Utc::now().to_rfc3339();
        let changed = self
            .conn()
            .execute(
                "UPDATE feedback SET notes = CASE \
                     WHEN notes IS NULL OR notes = '' THEN ?1 \
                     ELSE ?1 || char(10) || notes \
                 END, updated_at = ?2 WHERE id = ?3",
                params![note, now, id.to_string()],
            )
            .await
            .map_err(|e| StoreError::Query(format!("append_note: {e}")))?;

        if changed != 1 {
            return Err(StoreError::NotFound {
                entity: "feedback".into(),
                id: id.to_string(),
            });
        }
        Ok(())
    }

    // ── Integration settings ────────────────────────────────────────

    async fn get_settings(
        &self,
        organization_id: Uuid,
        kind: DestinationKind,
    ) -> Result<Option<IntegrationSettings>, StoreError> {
        let mut rows = self
            .conn()
            .query(
                &format!(
                    "SELECT {SETTINGS_COLUMNS} FROM integration_settings \
                     WHERE organization_id = ?1 AND integration_type = ?2"
                ),
                params![organization_id.to_string(), kind.as_str()],
            )
            .await
            .map_err(|e| StoreError::Query(format!("get_settings: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_settings(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(StoreError::Query(format!("get_settings: {e}"))),
        }
    }

    async fn save_settings(&self, settings: &IntegrationSettings) -> Result<(), StoreError> {
        let options = serde_json::to_string(&settings.options)
            .map_err(|e| StoreError::Serialization(format!("settings options: {e}")))?;
        let now = Utc::now().to_rfc3339();

        self.conn()
            .execute(
                "INSERT INTO integration_settings (id, organization_id, integration_type, \
                 credentials, routing, is_active, last_synced_at, settings, created_at, \
                 updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9) \
                 ON CONFLICT (organization_id, integration_type) DO UPDATE SET \
                     credentials = excluded.credentials, \
                     routing = excluded.routing, \
                     is_active = excluded.is_active, \
                     last_synced_at = excluded.last_synced_at, \
                     settings = excluded.settings, \
                     updated_at = excluded.updated_at",
                params![
                    Uuid::new_v4().to_string(),
                    settings.organization_id.to_string(),
                    settings.kind.as_str(),
                    credentials_to_json(&settings.credentials),
                    opt_text(settings.routing.as_deref()),
                    settings.is_active as i64,
                    opt_text(settings.last_synced_at.map(|ts| ts.to_rfc3339()).as_deref()),
                    options,
                    now,
                ],
            )
            .await
            .map_err(|e| StoreError::Query(format!("save_settings: {e}")))?;
        Ok(())
    }

    async fn update_last_synced(
        &self,
        organization_id: Uuid,
        kind: DestinationKind,
        ts: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let changed = self
            .conn()
            .execute(
                "UPDATE integration_settings SET last_synced_at = ?1, updated_at = ?1 \
                 WHERE organization_id = ?2 AND integration_type = ?3",
                params![
                    ts.to_rfc3339(),
                    organization_id.to_string(),
                    kind.as_str(),
                ],
            )
            .await
            .map_err(|e| StoreError::Query(format!("update_last_synced: {e}")))?;

        if changed != 1 {
            return Err(StoreError::NotFound {
                entity: "integration_settings".into(),
                id: format!("{organization_id}/{kind}"),
            });
        }
        Ok(())
    }

    // ── Sync history ────────────────────────────────────────────────

    async fn append_sync_run(&self, run: &SyncRun) -> Result<(), StoreError> {
        let errors = serde_json::to_string(&run.errors)
            .map_err(|e| StoreError::Serialization(format!("error_details: {e}")))?;

        self.conn()
            .execute(
                "INSERT INTO sync_history (id, organization_id, integration_type, \
                 trigger_kind, items_synced, status, error_details, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    run.id.to_string(),
                    run.organization_id.to_string(),
                    run.destination.as_str(),
                    run.trigger.as_str(),
                    i64::from(run.items_synced),
                    run.status.as_str(),
                    errors,
                    run.created_at.to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| StoreError::Query(format!("append_sync_run: {e}")))?;

        debug!(run_id = %run.id, status = %run.status, "Sync run recorded");
        Ok(())
    }

    async fn list_sync_runs(
        &self,
        organization_id: Uuid,
        limit: usize,
    ) -> Result<Vec<SyncRun>, StoreError> {
        let mut rows = self
            .conn()
            .query(
                &format!(
                    "SELECT {RUN_COLUMNS} FROM sync_history \
                     WHERE organization_id = ?1 ORDER BY created_at DESC LIMIT ?2"
                ),
                params![organization_id.to_string(), limit as i64],
            )
            .await
            .map_err(|e| StoreError::Query(format!("list_sync_runs: {e}")))?;

        let mut runs = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            match row_to_run(&row) {
                Ok(run) => runs.push(run),
                Err(e) => {
                    tracing::warn!("Skipping sync run row: {e}");
                }
            }
        }
        Ok(runs)
    }
}
