use crate::model::CandidateRejection;

/// Call-level fatal conditions for the extraction pipeline. Per-candidate
/// validation failures are values ([`CandidateRejection`]), never raised.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("unknown rule type '{0}' (expected tax_slab, rate, threshold, exemption or definition)")]
    UnknownRuleType(String),

    #[error("no API credential configured for provider '{provider}' (set {env_var})")]
    MissingCredential { provider: String, env_var: String },

    #[error("text-generation provider call failed: {0}")]
    Provider(String),

    #[error("provider response is not usable JSON: {0}")]
    MalformedResponse(String),

    #[error("extraction produced no usable candidates ({} rejected)", rejections.len())]
    AllCandidatesRejected { rejections: Vec<CandidateRejection> },
}

pub type ExtractResult<T> = Result<T, ExtractError>;
