use std::time::Instant;

use anyhow::Result;
use tracing::info;

use crate::cli::EmbedArgs;
use crate::index::EmbeddedIndex;
use crate::model::ChunkedDocument;
use crate::semantic::{Embedder, HashEmbedder};
use crate::util::read_json;

pub fn run(args: EmbedArgs) -> Result<()> {
    let document: ChunkedDocument = read_json(&args.input)?;
    let embedder = HashEmbedder::for_model(&args.model_id);

    let started = Instant::now();
    let index = EmbeddedIndex::build(&document, &embedder);
    index.save(&args.output)?;

    info!(
        path = %args.output.display(),
        document_id = index.document_id(),
        model_id = embedder.model_id(),
        dimensions = embedder.dimensions(),
        total_chunks = index.len(),
        duration_ms = started.elapsed().as_millis() as u64,
        "embedded index written"
    );

    Ok(())
}
