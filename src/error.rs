//! Error types for the FeedbackIQ core.

use uuid::Uuid;

use crate::destinations::DestinationKind;

/// Top-level error type for the pipeline.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Classifier error: {0}")]
    Classifier(#[from] ClassifierError),

    #[error("Analysis error: {0}")]
    Analysis(#[from] AnalysisError),

    #[error("Sync error: {0}")]
    Sync(#[from] SyncError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Persistence errors from the storage backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Errors from the external classification service.
///
/// `ServiceUnavailable` and `MalformedResponse` are surfaced distinctly so
/// callers can decide whether a retry makes sense (it does for the former,
/// not for the latter).
#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    #[error("Feedback text is empty")]
    EmptyFeedback,

    #[error("Classification service unavailable: {reason}")]
    ServiceUnavailable { reason: String },

    #[error("Malformed classifier response: {reason}")]
    MalformedResponse { reason: String },
}

/// Errors from a single analysis invocation.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("Feedback item not found: {id}")]
    NotFound { id: Uuid },

    #[error("Classification failed: {0}")]
    ClassificationFailed(#[from] ClassifierError),

    #[error("Failed to persist analysis for {id}: {reason}")]
    PersistFailed { id: Uuid, reason: String },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Errors from a sync run invocation.
///
/// Per-item destination failures are NOT errors at this level — they are
/// recorded inside the `SyncRun` so one bad item never aborts a run.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("No active {kind} integration configured for organization {organization_id}")]
    NotConfigured {
        organization_id: Uuid,
        kind: DestinationKind,
    },

    #[error("No adapter registered for destination {kind}")]
    AdapterMissing { kind: DestinationKind },

    #[error("Sync run task failed: {0}")]
    TaskFailed(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Result type alias for the pipeline.
pub type Result<T> = std::result::Result<T, Error>;
