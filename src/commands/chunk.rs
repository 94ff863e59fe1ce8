use anyhow::{Result, bail};
use tracing::{info, warn};

use crate::chunker::{ChunkConfig, chunk_document};
use crate::cli::ChunkArgs;
use crate::model::PageTextDocument;
use crate::util::{read_json, write_json_pretty};

pub fn run(args: ChunkArgs) -> Result<()> {
    if args.preferred_max == 0 || args.absolute_max < args.preferred_max {
        bail!(
            "invalid chunk limits: preferred_max={} absolute_max={}",
            args.preferred_max,
            args.absolute_max
        );
    }

    let document: PageTextDocument = read_json(&args.input)?;
    if document.pages.len() != document.page_count {
        warn!(
            declared = document.page_count,
            found = document.pages.len(),
            "page_count does not match the supplied pages"
        );
    }

    let config = ChunkConfig {
        preferred_max: args.preferred_max,
        absolute_max: args.absolute_max,
    };
    let chunked = chunk_document(&document, config);

    write_json_pretty(&args.output, &chunked)?;

    info!(
        path = %args.output.display(),
        document_id = %chunked.document_id,
        pdf_hash = %document.pdf_hash,
        total_chunks = chunked.total_chunks,
        max_chunk_size = chunked.stats.max_chunk_size,
        avg_chunk_size = chunked.stats.avg_chunk_size,
        "chunked document written"
    );

    Ok(())
}
