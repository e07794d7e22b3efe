//! Parsing of classifier responses into structured judgments.
//!
//! The service is prompted to return only a JSON object, but gateway models
//! routinely wrap it in a markdown code fence or surrounding prose. We strip
//! that here; anything that still fails to parse or validate is a
//! `MalformedResponse` — never silently defaulted.

use crate::error::ClassifierError;
use crate::model::Judgment;

/// Extract a JSON object from model output that might contain markdown
/// fences or extra text.
pub(crate) fn extract_json_object(text: &str) -> &str {
    let trimmed = text.trim();

    // Already a JSON object
    if trimmed.starts_with('{') && trimmed.ends_with('}') {
        return trimmed;
    }

    // Wrapped in a ```json fence
    if let Some(start) = trimmed.find("```json") {
        let after = &trimmed[start + 7..];
        if let Some(end) = after.find("```") {
            return after[..end].trim();
        }
    }

    // Wrapped in a bare ``` fence
    if let Some(start) = trimmed.find("```") {
        let after = &trimmed[start + 3..];
        if let Some(end) = after.find("```") {
            let inner = after[..end].trim();
            if inner.starts_with('{') {
                return inner;
            }
        }
    }

    // Last resort: outermost brace bounds
    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if end > start {
            return &trimmed[start..=end];
        }
    }

    trimmed
}

/// Parse and validate one judgment from raw model output.
pub(crate) fn parse_judgment(content: &str) -> Result<Judgment, ClassifierError> {
    let json_str = extract_json_object(content);

    let judgment: Judgment =
        serde_json::from_str(json_str).map_err(|e| ClassifierError::MalformedResponse {
            reason: e.to_string(),
        })?;

    validate(&judgment)?;
    Ok(judgment)
}

/// Reject judgments outside the prompted contract.
fn validate(judgment: &Judgment) -> Result<(), ClassifierError> {
    if !(1..=10).contains(&judgment.impact_score) {
        return Err(ClassifierError::MalformedResponse {
            reason: format!("impact_score out of range: {}", judgment.impact_score),
        });
    }
    if !(2..=4).contains(&judgment.key_themes.len()) {
        return Err(ClassifierError::MalformedResponse {
            reason: format!("expected 2-4 key themes, got {}", judgment.key_themes.len()),
        });
    }
    Ok(())
}
