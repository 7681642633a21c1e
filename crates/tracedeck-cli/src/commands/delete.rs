use anyhow::{Context, Result};
use clap::Args;

use tracedeck_core::config::TraceConfig;

#[derive(Args)]
pub struct DeleteArgs {
    /// Run ID to delete, along with its steps and tool calls
    pub id: String,
}

pub fn run(args: &DeleteArgs, config: &TraceConfig) -> Result<()> {
    let mut store = super::open_store(&config.db_path)?;

    match store.delete_run(&args.id) {
        Ok(()) => {
            println!("Deleted run {}", args.id);
            Ok(())
        }
        Err(e) if e.is_not_found() => anyhow::bail!("Run not found: {}", args.id),
        Err(e) => Err(e).context("Failed to delete run"),
    }
}
