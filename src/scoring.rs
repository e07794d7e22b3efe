//! Priority scoring — pure, deterministic, no I/O.
//!
//! `priority_score = impact_score * 10 + urgency_weight * 5` with weights
//! High=3, Medium=2, Low=1. The scale is deliberately uncapped: impact 10 at
//! High urgency scores 115. Storage keeps the raw value; anything presenting
//! it as "/100" must clamp at the display boundary only.

use crate::model::{Judgment, Urgency};

/// Multiplier applied to the urgency weight.
const URGENCY_FACTOR: i64 = 5;

/// Multiplier applied to the impact score.
const IMPACT_FACTOR: i64 = 10;

/// Weight for an urgency level.
pub fn urgency_weight(urgency: Urgency) -> i64 {
    match urgency {
        Urgency::High => 3,
        Urgency::Medium => 2,
        Urgency::Low => 1,
    }
}

/// Compute the priority score for a classifier judgment.
///
/// Identical judgments always yield identical scores. Range: 15 (impact 1,
/// Low) to 115 (impact 10, High).
pub fn priority_score(judgment: &Judgment) -> i64 {
    i64::from(judgment.impact_score) * IMPACT_FACTOR
        + urgency_weight(judgment.urgency) * URGENCY_FACTOR
}

/// Clamp a stored score for "/100" presentation. Display-only — never apply
/// before persistence.
pub fn clamp_for_display(score: i64) -> i64 {
    score.min(100)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Category, Sentiment};

    fn judgment(impact: u8, urgency: Urgency) -> Judgment {
        Judgment {
            category: Category::Bug,
            urgency,
            sentiment: Sentiment::Negative,
            impact_score: impact,
            key_themes: vec!["crash".into(), "data loss".into()],
            summary: "App crashes on save".into(),
        }
    }

    #[test]
    fn formula_matches_weights() {
        assert_eq!(priority_score(&judgment(8, Urgency::High)), 95);
        assert_eq!(priority_score(&judgment(5, Urgency::Medium)), 60);
        assert_eq!(priority_score(&judgment(3, Urgency::Low)), 35);
    }

    #[test]
    fn range_floor_and_ceiling() {
        assert_eq!(priority_score(&judgment(1, Urgency::Low)), 15);
        assert_eq!(priority_score(&judgment(10, Urgency::High)), 115);
    }

    #[test]
    fn deterministic_for_identical_judgments() {
        let j = judgment(7, Urgency::Medium);
        assert_eq!(priority_score(&j), priority_score(&j.clone()));
    }

    #[test]
    fn display_clamp_caps_at_one_hundred() {
        assert_eq!(clamp_for_display(115), 100);
        assert_eq!(clamp_for_display(95), 95);
    }
}
