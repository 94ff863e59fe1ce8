use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::errors::{ExtractError, ExtractResult};
use crate::model::{CandidateRejection, RuleCandidate, RuleType};
use crate::semantic::normalize_whitespace;

pub mod normalize;
pub mod prompt;
pub mod provider;
pub mod validate;

pub use prompt::build_extraction_prompt;
pub use provider::{GenerationProvider, HttpProvider, ProviderKind};

/// One retrieved chunk handed to the extraction pipeline.
#[derive(Debug, Clone)]
pub struct SourceChunk {
    pub text: String,
    pub page: u32,
}

/// The pipeline's successful outcome. `errors` is `None` only when every
/// produced candidate validated cleanly; callers treat a non-empty error
/// list as informational, not fatal.
#[derive(Debug, Serialize)]
pub struct Extraction {
    pub candidates: Vec<RuleCandidate>,
    pub errors: Option<Vec<CandidateRejection>>,
}

/// Runs grounded extraction over the supplied chunks: prompt the provider,
/// parse and normalize its candidates, validate each against the contract,
/// the requested rule type and the grounding invariant.
///
/// Per-candidate failures land in the error set and processing continues;
/// raised errors are reserved for call-level fatal conditions, including a
/// batch in which nothing survives validation.
pub fn extract(
    chunks: &[SourceChunk],
    rule_type: RuleType,
    provider: &dyn GenerationProvider,
) -> ExtractResult<Extraction> {
    let prompt = build_extraction_prompt(chunks, rule_type);
    let response = provider.generate(&prompt)?;
    let raw_candidates = parse_candidate_payload(&response)?;

    let grounded_texts: Vec<String> = chunks
        .iter()
        .map(|chunk| normalize_whitespace(&chunk.text))
        .collect();

    let mut candidates = Vec::<RuleCandidate>::new();
    let mut rejections = Vec::<CandidateRejection>::new();

    for raw in &raw_candidates {
        let normalized = normalize::normalize_candidate(raw);
        match validate::validate_candidate(&normalized, rule_type, &grounded_texts) {
            Ok(candidate) => {
                debug!(
                    status = candidate.status.as_str(),
                    confidence = candidate.confidence,
                    "candidate accepted"
                );
                candidates.push(candidate);
            }
            Err(rejection) => {
                warn!(
                    reason = rejection.reason.as_str(),
                    detail = %rejection.detail,
                    "candidate rejected"
                );
                rejections.push(rejection);
            }
        }
    }

    if candidates.is_empty() {
        return Err(ExtractError::AllCandidatesRejected { rejections });
    }

    info!(
        rule_type = rule_type.as_str(),
        accepted = candidates.len(),
        rejected = rejections.len(),
        "extraction batch validated"
    );

    Ok(Extraction {
        candidates,
        errors: if rejections.is_empty() {
            None
        } else {
            Some(rejections)
        },
    })
}

fn parse_candidate_payload(response: &str) -> ExtractResult<Vec<Value>> {
    let body = strip_code_fences(response);
    let value: Value = serde_json::from_str(body)
        .map_err(|err| ExtractError::MalformedResponse(err.to_string()))?;

    match value {
        Value::Array(items) => Ok(items),
        object @ Value::Object(_) => Ok(vec![object]),
        other => Err(ExtractError::MalformedResponse(format!(
            "expected a JSON object or array of candidates, found {}",
            json_type_name(&other)
        ))),
    }
}

fn strip_code_fences(response: &str) -> &str {
    let trimmed = response.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    rest.trim()
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CandidateStatus, RejectionReason, RuleData};
    use serde_json::json;

    struct MockProvider {
        response: String,
    }

    impl MockProvider {
        fn returning(value: serde_json::Value) -> Self {
            Self {
                response: value.to_string(),
            }
        }
    }

    impl GenerationProvider for MockProvider {
        fn generate(&self, _prompt: &str) -> ExtractResult<String> {
            Ok(self.response.clone())
        }
    }

    fn rate_chunk() -> Vec<SourceChunk> {
        vec![SourceChunk {
            text: "The rate of income-tax shall be fifteen percent of total income.".to_string(),
            page: 12,
        }]
    }

    #[test]
    fn grounded_candidate_survives_the_full_pipeline() {
        let provider = MockProvider::returning(json!([{
            "rule_type": "rate",
            "status": "candidate",
            "source_pages": ["12"],
            "source_text": "\"The rate of income-tax shall be  fifteen percent\"",
            "confidence": "92%",
            "rule_data": { "rate": "15%", "applies_to": "total income" }
        }]));

        let extraction = extract(&rate_chunk(), RuleType::Rate, &provider).expect("must succeed");

        assert_eq!(extraction.candidates.len(), 1);
        assert!(extraction.errors.is_none());

        let candidate = &extraction.candidates[0];
        assert_eq!(candidate.status, CandidateStatus::Candidate);
        assert_eq!(candidate.confidence, 0.92);
        assert_eq!(candidate.source_pages, vec![12]);
        assert!(!candidate.extracted_at.is_empty());
        match &candidate.rule_data {
            RuleData::Rate { rate, unit, .. } => {
                assert_eq!(*rate, 15.0);
                assert_eq!(unit, "percent");
            }
            other => panic!("expected canonical rate payload, got {other:?}"),
        }
    }

    #[test]
    fn bare_object_response_is_coerced_to_one_element_batch() {
        let provider = MockProvider::returning(json!({
            "rule_type": "rate",
            "status": "candidate",
            "source_pages": [12],
            "source_text": "fifteen percent of total income",
            "confidence": 0.8,
            "rule_data": { "rate": 15.0 }
        }));

        let extraction = extract(&rate_chunk(), RuleType::Rate, &provider).expect("must succeed");
        assert_eq!(extraction.candidates.len(), 1);
    }

    #[test]
    fn fenced_json_responses_are_accepted() {
        let body = json!([{
            "rule_type": "rate",
            "status": "candidate",
            "source_pages": [12],
            "source_text": "fifteen percent",
            "confidence": 0.8,
            "rule_data": { "rate": 15.0 }
        }]);
        let provider = MockProvider {
            response: format!("```json\n{body}\n```"),
        };

        let extraction = extract(&rate_chunk(), RuleType::Rate, &provider).expect("must succeed");
        assert_eq!(extraction.candidates.len(), 1);
    }

    #[test]
    fn unparseable_response_is_fatal_for_the_call() {
        let provider = MockProvider {
            response: "I could not find any rules, sorry.".to_string(),
        };

        let error = extract(&rate_chunk(), RuleType::Rate, &provider).expect_err("must fail");
        assert!(matches!(error, ExtractError::MalformedResponse(_)));
    }

    #[test]
    fn ungrounded_candidate_lands_in_the_error_set() {
        let provider = MockProvider::returning(json!([
            {
                "rule_type": "rate",
                "status": "candidate",
                "source_pages": [12],
                "source_text": "fifteen percent of total income",
                "confidence": 0.9,
                "rule_data": { "rate": 15.0 }
            },
            {
                "rule_type": "rate",
                "status": "candidate",
                "source_pages": [12],
                "source_text": "the rate is twenty percent",
                "confidence": 0.9,
                "rule_data": { "rate": 20.0 }
            }
        ]));

        let extraction = extract(&rate_chunk(), RuleType::Rate, &provider).expect("must succeed");

        assert_eq!(extraction.candidates.len(), 1);
        let errors = extraction.errors.expect("one rejection expected");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].reason, RejectionReason::Ungrounded);
    }

    #[test]
    fn type_mismatched_candidate_is_rejected() {
        let provider = MockProvider::returning(json!([
            {
                "rule_type": "threshold",
                "status": "candidate",
                "source_pages": [12],
                "source_text": "fifteen percent of total income",
                "confidence": 0.9,
                "rule_data": { "value": 1000000.0, "unit": "inr" }
            },
            {
                "rule_type": "rate",
                "status": "candidate",
                "source_pages": [12],
                "source_text": "The rate of income-tax shall be fifteen percent",
                "confidence": 0.9,
                "rule_data": { "rate": 15.0 }
            }
        ]));

        let extraction =
            extract(&rate_chunk(), RuleType::Threshold, &provider).expect("must succeed");

        assert_eq!(extraction.candidates.len(), 1);
        let errors = extraction.errors.expect("mismatch rejection expected");
        assert_eq!(errors[0].reason, RejectionReason::TypeMismatch);
    }

    #[test]
    fn conflicting_sources_yield_an_unclear_candidate() {
        let chunks = vec![
            SourceChunk {
                text: "A surcharge of 15% applies on the amount of income-tax.".to_string(),
                page: 3,
            },
            SourceChunk {
                text: "A surcharge of 25% applies on the amount of income-tax.".to_string(),
                page: 9,
            },
        ];
        let provider = MockProvider::returning(json!([{
            "rule_type": "rate",
            "status": "unclear",
            "source_pages": [3, 9],
            "source_text": "surcharge of 15% applies",
            "confidence": 0.5,
            "ambiguity_reason": "pages 3 and 9 state different surcharge rates for the same unqualified condition",
            "conflicting_candidates": [
                {
                    "rule_type": "rate",
                    "status": "candidate",
                    "source_pages": [3],
                    "source_text": "surcharge of 15% applies",
                    "confidence": 0.5,
                    "rule_data": { "rate": "15%" }
                },
                {
                    "rule_type": "rate",
                    "status": "candidate",
                    "source_pages": [9],
                    "source_text": "surcharge of 25% applies",
                    "confidence": 0.5,
                    "rule_data": { "rate": "25%" }
                }
            ],
            "rule_data": { "rate": "15%" }
        }]));

        let extraction = extract(&chunks, RuleType::Rate, &provider).expect("must succeed");

        let unclear = &extraction.candidates[0];
        assert_eq!(unclear.status, CandidateStatus::Unclear);
        assert!(unclear.ambiguity_reason.is_some());
        let conflicts = unclear
            .conflicting_candidates
            .as_ref()
            .expect("conflicts listed");
        assert_eq!(conflicts.len(), 2);
    }

    #[test]
    fn batch_with_nothing_usable_raises_aggregate_error() {
        let provider = MockProvider::returning(json!([{
            "rule_type": "rate",
            "status": "candidate",
            "source_pages": [12],
            "source_text": "a rate that appears nowhere in the source",
            "confidence": 0.9,
            "rule_data": { "rate": 10.0 }
        }]));

        let error = extract(&rate_chunk(), RuleType::Rate, &provider).expect_err("must fail");
        match error {
            ExtractError::AllCandidatesRejected { rejections } => {
                assert_eq!(rejections.len(), 1);
                assert_eq!(rejections[0].reason, RejectionReason::Ungrounded);
            }
            other => panic!("expected aggregate rejection, got {other:?}"),
        }
    }

    #[test]
    fn empty_candidate_array_is_an_aggregate_failure() {
        let provider = MockProvider::returning(json!([]));
        let error = extract(&rate_chunk(), RuleType::Rate, &provider).expect_err("must fail");
        assert!(matches!(
            error,
            ExtractError::AllCandidatesRejected { .. }
        ));
    }
}
