use anyhow::{Context, Result};
use tracing::info;

use crate::cli::SearchArgs;
use crate::enhancer::QueryEnhancer;
use crate::index::EmbeddedIndex;
use crate::semantic::HashEmbedder;

pub fn run(args: SearchArgs) -> Result<()> {
    let index = EmbeddedIndex::load(&args.index)?;
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
        document_id = index.document_id(),
        indexed_chunks = index.len(),
        returned = results.len(),
        skip_enhancement = args.skip_enhancement,
        "search completed"
    );

    if args.json {
        let rendered =
            serde_json::to_string_pretty(&results).context("failed to render search results")?;
        println!("{rendered}");
        return Ok(());
    }

    for (rank, result) in results.iter().enumerate() {
        println!(
            "{:>2}. {} (page {}, similarity {:.4}, {} chars)",
            rank + 1,
            result.chunk_id,
            result.page_number,
            result.similarity,
            result.char_count
        );
        let preview: String = result.text.chars().take(160).collect();
        println!("    {preview}");
    }

    Ok(())
}
