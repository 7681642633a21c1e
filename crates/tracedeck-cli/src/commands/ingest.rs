use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use tracedeck_core::config::TraceConfig;
use tracedeck_core::normalize::normalize;
use tracedeck_core::validate::parse_submission;

#[derive(Args)]
pub struct IngestArgs {
    /// Path to a JSON payload, or "-" for stdin
    pub path: PathBuf,
}

pub fn run(args: &IngestArgs, config: &TraceConfig) -> Result<()> {
    let raw = if args.path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read stdin")?;
        buf
    } else {
        std::fs::read_to_string(&args.path)
            .with_context(|| format!("Failed to read {}", args.path.display()))?
    };

    let value: serde_json::Value =
        serde_json::from_str(&raw).context("Payload is not valid JSON")?;
    let submission =
        parse_submission(&value).map_err(|e| anyhow::anyhow!("Invalid payload: {e}"))?;
    let graph = normalize(submission);

    let mut store = super::open_store(&config.db_path)?;
    let id = store.create_run(&graph).context("Failed to store run")?;

    println!("Created run {id}");
    Ok(())
}
