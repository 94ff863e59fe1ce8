use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::ExtractError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageText {
    pub page_number: u32,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageTextDocument {
    pub document_id: String,
    pub pdf_hash: String,
    pub page_count: usize,
    pub pages: Vec<PageText>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub chunk_id: String,
    pub page_number: u32,
    pub text: String,
    pub char_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkStats {
    pub total_chunks: usize,
    pub max_chunk_size: usize,
    pub min_chunk_size: usize,
    pub avg_chunk_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkedDocument {
    pub document_id: String,
    pub total_chunks: usize,
    pub chunking_strategy: String,
    pub preferred_max_size: usize,
    pub absolute_max_size: usize,
    pub stats: ChunkStats,
    pub chunks: Vec<Chunk>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddedChunk {
    pub chunk_id: String,
    pub page_number: u32,
    pub text: String,
    pub char_count: usize,
    pub embedding: Vec<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddedIndexFile {
    pub document_id: String,
    pub total_chunks: usize,
    pub embedding_model: String,
    pub embedding_dimensions: usize,
    pub chunks: Vec<EmbeddedChunk>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub chunk_id: String,
    pub page_number: u32,
    pub text: String,
    pub char_count: usize,
    pub similarity: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleType {
    TaxSlab,
    Rate,
    Threshold,
    Exemption,
    Definition,
}

impl RuleType {
    pub const ALL: [RuleType; 5] = [
        RuleType::TaxSlab,
        RuleType::Rate,
        RuleType::Threshold,
        RuleType::Exemption,
        RuleType::Definition,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::TaxSlab => "tax_slab",
            Self::Rate => "rate",
            Self::Threshold => "threshold",
            Self::Exemption => "exemption",
            Self::Definition => "definition",
        }
    }
}

impl fmt::Display for RuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RuleType {
    type Err = ExtractError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|rule_type| rule_type.as_str() == normalized)
            .ok_or_else(|| ExtractError::UnknownRuleType(value.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateStatus {
    Candidate,
    Unclear,
    Blocked,
}

impl CandidateStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Candidate => "candidate",
            Self::Unclear => "unclear",
            Self::Blocked => "blocked",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlabEntry {
    pub from: f64,
    pub to: Option<f64>,
    pub rate: f64,
    pub unit: String,
}

/// Canonical rule payloads. Untagged: variants are tried in declaration
/// order and `Other` preserves unrecognized provider shapes unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleData {
    TaxSlab {
        slabs: Vec<SlabEntry>,
    },
    Rate {
        rate: f64,
        unit: String,
        #[serde(default)]
        applies_to: Option<String>,
    },
    Threshold {
        value: f64,
        unit: String,
        #[serde(default)]
        description: Option<String>,
    },
    Exemption {
        description: String,
        #[serde(default)]
        conditions: Option<Vec<String>>,
    },
    Definition {
        term: String,
        definition: String,
    },
    Other(serde_json::Value),
}

/// A schema-constrained claim about one legal rule. Never mutated after
/// validation; a rejected candidate is discarded, not repaired.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleCandidate {
    pub rule_type: RuleType,
    pub status: CandidateStatus,
    pub source_pages: Vec<u32>,
    pub source_text: String,
    pub confidence: f64,
    #[serde(default)]
    pub ambiguity_reason: Option<String>,
    #[serde(default)]
    pub conflicting_candidates: Option<Vec<RuleCandidate>>,
    pub rule_data: RuleData,
    pub extracted_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    SchemaViolation,
    TypeMismatch,
    Ungrounded,
}

impl RejectionReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SchemaViolation => "schema_violation",
            Self::TypeMismatch => "type_mismatch",
            Self::Ungrounded => "ungrounded",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CandidateRejection {
    pub reason: RejectionReason,
    pub detail: String,
    pub candidate: serde_json::Value,
}
