use anyhow::{Context, Result, bail};
use serde::Serialize;
use tracing::{info, warn};

use crate::cli::ExtractArgs;
use crate::enhancer::QueryEnhancer;
use crate::extract::{self, HttpProvider, SourceChunk};
use crate::index::EmbeddedIndex;
use crate::model::{CandidateRejection, RuleCandidate, RuleType};
use crate::semantic::HashEmbedder;
use crate::util::{now_utc_string, write_json_pretty};

#[derive(Debug, Serialize)]
struct ExtractionReport {
    document_id: String,
    rule_type: String,
    query: String,
    generated_at: String,
    retrieved_chunks: usize,
    candidates: Vec<RuleCandidate>,
    errors: Option<Vec<CandidateRejection>>,
}

pub fn run(args: ExtractArgs) -> Result<()> {
    // Config checks run before retrieval or any network call: an unknown
    // rule type or a missing credential fails without touching the index.
    let rule_type: RuleType = args.rule_type.parse()?;
    let provider = HttpProvider::from_env(args.provider, args.timeout_ms)?;

    let index = EmbeddedIndex::load(&args.index)?;
    if index.is_empty() {
        bail!("index {} contains no chunks to extract from", args.index.display());
    }
    let embedder = HashEmbedder::for_model(index.embedding_model());
    let enhancer = QueryEnhancer::new();

    let results = index.search(
        &args.query,
        args.top_k,
        args.skip_enhancement,
        &enhancer,
        &embedder,
    );

    info!(
        rule_type = rule_type.as_str(),
        provider = args.provider.as_str(),
        model = provider.model(),
        retrieved = results.len(),
        "running grounded extraction"
    );

    let chunks: Vec<SourceChunk> = results
        .iter()
        .map(|result| SourceChunk {
            text: result.text.clone(),
            page: result.page_number,
        })
        .collect();

    let extraction = extract::extract(&chunks, rule_type, &provider)?;

    if let Some(errors) = &extraction.errors {
        warn!(rejected = errors.len(), "some candidates were rejected");
    }

    let report = ExtractionReport {
        document_id: index.document_id().to_string(),
        rule_type: rule_type.as_str().to_string(),
        query: args.query.clone(),
        generated_at: now_utc_string(),
        retrieved_chunks: chunks.len(),
        candidates: extraction.candidates,
        errors: extraction.errors,
    };

    match &args.output {
        Some(path) => {
            write_json_pretty(path, &report)?;
            info!(
                path = %path.display(),
                candidates = report.candidates.len(),
                "extraction report written"
            );
        }
        None => {
            let rendered = serde_json::to_string_pretty(&report)
                .context("failed to render extraction report")?;
            println!("{rendered}");
        }
    }

    Ok(())
}
