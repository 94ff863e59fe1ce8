use serde_json::Value;

use crate::model::{CandidateRejection, RejectionReason, RuleCandidate, RuleType};
use crate::semantic::normalize_whitespace;

/// Validates one normalized candidate against the RuleCandidate contract,
/// the requested rule type and the grounding invariant. `grounded_texts`
/// are the whitespace-collapsed texts of the supplied source chunks.
///
/// The grounding check is the pipeline's only defense against the provider
/// inventing a citation: a quote that cannot be located verbatim in the
/// retrieved source is rejected, never repaired.
pub fn validate_candidate(
    normalized: &Value,
    requested: RuleType,
    grounded_texts: &[String],
) -> Result<RuleCandidate, CandidateRejection> {
    let issues = schema_issues(normalized);
    if !issues.is_empty() {
        return Err(reject(
            RejectionReason::SchemaViolation,
            issues.join("; "),
            normalized,
        ));
    }

    let candidate: RuleCandidate = match serde_json::from_value(normalized.clone()) {
        Ok(candidate) => candidate,
        Err(err) => {
            return Err(reject(
                RejectionReason::SchemaViolation,
                format!("contract deserialization failed: {err}"),
                normalized,
            ));
        }
    };

    if candidate.rule_type != requested {
        return Err(reject(
            RejectionReason::TypeMismatch,
            format!(
                "candidate rule_type '{}' does not match requested '{}'",
                candidate.rule_type, requested
            ),
            normalized,
        ));
    }

    let quoted = normalize_whitespace(&candidate.source_text);
    if !grounded_texts.iter().any(|chunk| chunk.contains(&quoted)) {
        return Err(reject(
            RejectionReason::Ungrounded,
            format!(
                "source_text not found verbatim in any supplied chunk: \"{}\"",
                truncate(&quoted, 160)
            ),
            normalized,
        ));
    }

    Ok(candidate)
}

fn reject(reason: RejectionReason, detail: String, candidate: &Value) -> CandidateRejection {
    CandidateRejection {
        reason,
        detail,
        candidate: candidate.clone(),
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

fn schema_issues(value: &Value) -> Vec<String> {
    let Value::Object(fields) = value else {
        return vec!["candidate is not a JSON object".to_string()];
    };

    let mut issues = Vec::new();

    match fields.get("rule_type").and_then(Value::as_str) {
        Some(rule_type) if RuleType::ALL.iter().any(|known| known.as_str() == rule_type) => {}
        Some(rule_type) => issues.push(format!("rule_type '{rule_type}' is not a known rule type")),
        None => issues.push("rule_type is required and must be a string".to_string()),
    }

    let status = fields.get("status").and_then(Value::as_str);
    match status {
        Some("candidate" | "unclear" | "blocked") => {}
        Some(other) => {
            issues.push(format!("status '{other}' is not one of candidate/unclear/blocked"))
        }
        None => issues.push("status is required and must be a string".to_string()),
    }

    match fields.get("source_pages") {
        Some(Value::Array(pages)) if !pages.is_empty() && pages.iter().all(Value::is_u64) => {}
        Some(Value::Array(_)) => {
            issues.push("source_pages must be a non-empty array of positive integers".to_string())
        }
        _ => issues.push("source_pages is required and must be an array".to_string()),
    }

    match fields.get("source_text").and_then(Value::as_str) {
        Some(text) if !text.trim().is_empty() => {}
        _ => issues.push("source_text is required and must be a non-empty string".to_string()),
    }

    match fields.get("confidence").and_then(Value::as_f64) {
        Some(confidence) if (0.0..=1.0).contains(&confidence) => {}
        Some(_) => issues.push("confidence must lie in [0, 1]".to_string()),
        None => issues.push("confidence is required and must be a number".to_string()),
    }

    if !fields.get("rule_data").map(Value::is_object).unwrap_or(false) {
        issues.push("rule_data is required and must be an object".to_string());
    }

    match fields.get("extracted_at").and_then(Value::as_str) {
        Some(timestamp) if !timestamp.trim().is_empty() => {}
        _ => issues.push("extracted_at is required and must be a string".to_string()),
    }

    let ambiguity_present = fields
        .get("ambiguity_reason")
        .and_then(Value::as_str)
        .map(str::trim)
        .is_some_and(|reason| !reason.is_empty());
    let conflict_count = fields
        .get("conflicting_candidates")
        .and_then(Value::as_array)
        .map(Vec::len);

    match status {
        Some("unclear") => {
            if !ambiguity_present {
                issues.push("status 'unclear' requires a non-null ambiguity_reason".to_string());
            }
            if !matches!(conflict_count, Some(count) if count > 0) {
                issues.push(
                    "status 'unclear' requires a non-empty conflicting_candidates list".to_string(),
                );
            }
        }
        Some("blocked") => {
            if !ambiguity_present {
                issues.push(
                    "status 'blocked' requires ambiguity_reason naming the missing data"
                        .to_string(),
                );
            }
        }
        _ => {}
    }

    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::normalize::normalize_candidate;
    use crate::model::CandidateStatus;
    use serde_json::json;

    fn grounded(chunks: &[&str]) -> Vec<String> {
        chunks.iter().map(|text| normalize_whitespace(text)).collect()
    }

    fn raw_rate_candidate(source_text: &str) -> Value {
        json!({
            "rule_type": "rate",
            "status": "candidate",
            "source_pages": [1],
            "source_text": source_text,
            "confidence": 0.9,
            "rule_data": { "rate": 15.0, "unit": "percent" },
            "extracted_at": "2026-02-01T00:00:00Z"
        })
    }

    #[test]
    fn grounded_candidate_validates_cleanly() {
        let chunks = grounded(&["The rate is fifteen percent."]);
        let normalized = normalize_candidate(&raw_rate_candidate("The rate is fifteen percent."));

        let candidate =
            validate_candidate(&normalized, RuleType::Rate, &chunks).expect("must validate");
        assert_eq!(candidate.rule_type, RuleType::Rate);
        assert_eq!(candidate.status, CandidateStatus::Candidate);
    }

    #[test]
    fn invented_quote_is_rejected_as_ungrounded() {
        let chunks = grounded(&["The rate is fifteen percent."]);
        let normalized = normalize_candidate(&raw_rate_candidate("the rate is twenty percent"));

        let rejection = validate_candidate(&normalized, RuleType::Rate, &chunks)
            .expect_err("invented quote must be rejected");
        assert_eq!(rejection.reason, RejectionReason::Ungrounded);
    }

    #[test]
    fn quote_matches_across_whitespace_differences() {
        let chunks = grounded(&["The  rate\n   is fifteen percent of total income."]);
        let normalized =
            normalize_candidate(&raw_rate_candidate("rate is fifteen   percent"));

        assert!(validate_candidate(&normalized, RuleType::Rate, &chunks).is_ok());
    }

    #[test]
    fn rule_type_mismatch_is_rejected() {
        let chunks = grounded(&["The rate is fifteen percent."]);
        let normalized = normalize_candidate(&raw_rate_candidate("The rate is fifteen percent."));

        let rejection = validate_candidate(&normalized, RuleType::Threshold, &chunks)
            .expect_err("mismatched type must be rejected");
        assert_eq!(rejection.reason, RejectionReason::TypeMismatch);
        assert!(rejection.detail.contains("threshold"));
    }

    #[test]
    fn missing_required_fields_are_schema_violations() {
        let chunks = grounded(&["anything"]);
        let normalized = normalize_candidate(&json!({ "rule_type": "rate" }));

        let rejection = validate_candidate(&normalized, RuleType::Rate, &chunks)
            .expect_err("incomplete candidate must be rejected");
        assert_eq!(rejection.reason, RejectionReason::SchemaViolation);
        assert!(rejection.detail.contains("status"));
        assert!(rejection.detail.contains("source_text"));
    }

    #[test]
    fn unknown_rule_type_string_is_a_schema_violation() {
        let chunks = grounded(&["The rate is fifteen percent."]);
        let mut raw = raw_rate_candidate("The rate is fifteen percent.");
        raw["rule_type"] = json!("penalty");

        let rejection = validate_candidate(&normalize_candidate(&raw), RuleType::Rate, &chunks)
            .expect_err("unknown rule type must be rejected");
        assert_eq!(rejection.reason, RejectionReason::SchemaViolation);
    }

    #[test]
    fn unclear_without_conflicts_is_rejected() {
        let chunks = grounded(&["surcharge of 15% applies"]);
        let mut raw = raw_rate_candidate("surcharge of 15% applies");
        raw["status"] = json!("unclear");
        raw["ambiguity_reason"] = json!("two readings");

        let rejection = validate_candidate(&normalize_candidate(&raw), RuleType::Rate, &chunks)
            .expect_err("unclear without conflicts must be rejected");
        assert_eq!(rejection.reason, RejectionReason::SchemaViolation);
        assert!(rejection.detail.contains("conflicting_candidates"));
    }

    #[test]
    fn blocked_requires_ambiguity_reason() {
        let chunks = grounded(&["as specified in the Second Schedule"]);
        let mut raw = raw_rate_candidate("as specified in the Second Schedule");
        raw["status"] = json!("blocked");

        let rejection = validate_candidate(&normalize_candidate(&raw), RuleType::Rate, &chunks)
            .expect_err("blocked without reason must be rejected");
        assert_eq!(rejection.reason, RejectionReason::SchemaViolation);
        assert!(rejection.detail.contains("ambiguity_reason"));
    }
}
