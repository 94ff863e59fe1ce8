use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::chunker::{DEFAULT_ABSOLUTE_MAX, DEFAULT_PREFERRED_MAX};
use crate::extract::ProviderKind;

#[derive(Parser, Debug)]
#[command(
    name = "lexrule",
    version,
    about = "Statutory text chunking, retrieval and grounded rule extraction"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Chunk(ChunkArgs),
    Embed(EmbedArgs),
    Search(SearchArgs),
    Extract(ExtractArgs),
    Status(StatusArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ChunkArgs {
    /// Page-text document produced by the PDF extraction step
    #[arg(long)]
    pub input: PathBuf,

    #[arg(long)]
    pub output: PathBuf,

    #[arg(long, default_value_t = DEFAULT_PREFERRED_MAX)]
    pub preferred_max: usize,

    #[arg(long, default_value_t = DEFAULT_ABSOLUTE_MAX)]
    pub absolute_max: usize,
}

#[derive(Args, Debug, Clone)]
pub struct EmbedArgs {
    /// Chunked document produced by `lexrule chunk`
    #[arg(long)]
    pub input: PathBuf,

    #[arg(long)]
    pub output: PathBuf,

    #[arg(long, default_value = "miniLM-L6-v2-local-v1")]
    pub model_id: String,
}

#[derive(Args, Debug, Clone)]
pub struct SearchArgs {
    #[arg(long)]
    pub index: PathBuf,

    #[arg(long)]
    pub query: String,

    #[arg(long, default_value_t = 5)]
    pub top_k: usize,

    #[arg(long, default_value_t = false)]
    pub skip_enhancement: bool,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ExtractArgs {
    #[arg(long)]
    pub index: PathBuf,

    #[arg(long)]
    pub query: String,

    /// One of: tax_slab, rate, threshold, exemption, definition
    #[arg(long)]
    pub rule_type: String,

    #[arg(long, value_enum, default_value_t = ProviderKind::Openai)]
    pub provider: ProviderKind,

    #[arg(long, default_value_t = 5)]
    pub top_k: usize,

    #[arg(long, default_value_t = false)]
    pub skip_enhancement: bool,

    #[arg(long, default_value_t = 30_000)]
    pub timeout_ms: u64,

    /// Where the extraction report is written; stdout when omitted
    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    #[arg(long)]
    pub index: PathBuf,
}
