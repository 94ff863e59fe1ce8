use anyhow::Result;
use tracing::info;

use crate::cli::StatusArgs;
use crate::index::EmbeddedIndex;
use crate::util::sha256_file;

pub fn run(args: StatusArgs) -> Result<()> {
    let fingerprint = sha256_file(&args.index)?;
    let index = EmbeddedIndex::load(&args.index)?;

    info!(
        path = %args.index.display(),
        document_id = index.document_id(),
        embedding_model = index.embedding_model(),
        dimensions = index.embedding_dimensions(),
        total_chunks = index.len(),
        sha256 = %fingerprint,
        "embedded index status"
    );

    println!("index:       {}", args.index.display());
    println!("document:    {}", index.document_id());
    println!("model:       {}", index.embedding_model());
    println!("dimensions:  {}", index.embedding_dimensions());
    println!("chunks:      {}", index.len());
    println!("sha256:      {fingerprint}");

    Ok(())
}
