//! Analysis orchestrator — classify one feedback item, score it, persist
//! the derived fields as a single atomic update.

use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use crate::classifier::Classifier;
use crate::error::AnalysisError;
use crate::model::Analysis;
use crate::scoring;
use crate::store::Database;

/// What one analysis pass produced. The `analysis` is what was persisted;
/// the `summary` is the classifier's one-sentence digest, surfaced to the
/// caller but not stored on the item.
#[derive(Debug, Clone)]
pub struct AnalysisResult {
    pub feedback_id: Uuid,
    pub analysis: Analysis,
    pub summary: String,
}

/// Runs the classify → score → persist pipeline for single feedback items.
///
/// Re-invoking on an already-analyzed item overwrites the prior derived
/// fields wholesale — last write wins, nothing is merged.
pub struct AnalysisEngine {
    classifier: Arc<dyn Classifier>,
    db: Arc<dyn Database>,
}

impl AnalysisEngine {
    pub fn new(classifier: Arc<dyn Classifier>, db: Arc<dyn Database>) -> Self {
        Self { classifier, db }
    }

    /// Analyze one feedback item by id.
    ///
    /// Fails with `NotFound` for an unknown id, `ClassificationFailed` when
    /// the classifier errors (malformed vs unavailable preserved for the
    /// caller's retry decision), and `PersistFailed` when the atomic update
    /// does not land on exactly one row.
    pub async fn analyze(&self, feedback_id: Uuid) -> Result<AnalysisResult, AnalysisError> {
        let item = self
            .db
            .get_feedback(feedback_id)
            .await?
            .ok_or(AnalysisError::NotFound { id: feedback_id })?;

        let judgment = self
            .classifier
            .classify(&item.feedback_text, item.customer_segment)
            .await
            .map_err(|e| {
                warn!(feedback_id = %feedback_id, error = %e, "Classification failed");
                AnalysisError::ClassificationFailed(e)
            })?;

        let priority_score = scoring::priority_score(&judgment);
        let analysis = Analysis {
            category: judgment.category,
            urgency: judgment.urgency,
            sentiment: judgment.sentiment,
            impact_score: judgment.impact_score,
            key_themes: judgment.key_themes,
            priority_score,
        };

        self.db
            .update_analysis(feedback_id, &analysis)
            .await
            .map_err(|e| AnalysisError::PersistFailed {
                id: feedback_id,
                reason: e.to_string(),
            })?;

        info!(
            feedback_id = %feedback_id,
            category = %analysis.category,
            urgency = %analysis.urgency,
            priority_score,
            "Feedback analyzed"
        );

        Ok(AnalysisResult {
            feedback_id,
            analysis,
            summary: judgment.summary,
        })
    }
}
