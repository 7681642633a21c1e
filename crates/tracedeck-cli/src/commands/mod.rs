pub mod delete;
pub mod ingest;
pub mod log;
pub mod mcp;
pub mod sample;
pub mod show;
pub mod stats;
pub mod version;

use std::path::Path;

use anyhow::{Context, Result};
use clap::Subcommand;

use tracedeck_store::TraceStore;

#[derive(Subcommand)]
pub enum Commands {
    /// Ingest a trace payload from a JSON file (or stdin with "-")
    Ingest(ingest::IngestArgs),
    /// List runs (most recently started first)
    Log(log::LogArgs),
    /// Show a run with its derived analytics
    Show(show::ShowArgs),
    /// Delete a run and everything it owns
    Delete(delete::DeleteArgs),
    /// Ingest a built-in sample trace
    Sample(sample::SampleArgs),
    /// Show aggregate statistics across all stored runs
    Stats,
    /// Run the MCP server on stdio
    Mcp,
    /// Print version information
    Version,
}

pub fn open_store(db_path: &Path) -> Result<TraceStore> {
    TraceStore::open(db_path)
        .with_context(|| format!("Failed to open trace database at {}", db_path.display()))
}
