use anyhow::{Context, Result};
use clap::Args;

use tracedeck_analytics::summarize;
use tracedeck_core::config::TraceConfig;

use crate::output::format::{format_analytics_text, format_run_detail};
use crate::output::OutputFormat;

#[derive(Args)]
pub struct ShowArgs {
    /// Run ID
    pub id: String,

    /// Show only the analytics summary
    #[arg(long)]
    pub analytics: bool,
}

pub fn run(args: &ShowArgs, config: &TraceConfig, format: OutputFormat) -> Result<()> {
    let store = super::open_store(&config.db_path)?;

    let run = match store.get_run(&args.id) {
        Ok(run) => run,
        Err(e) if e.is_not_found() => anyhow::bail!("Run not found: {}", args.id),
        Err(e) => return Err(e).context("Failed to read run"),
    };
    let analytics = summarize(&run);

    let output = if args.analytics {
        match format {
            OutputFormat::Json => serde_json::to_string_pretty(&analytics).unwrap_or_default(),
            OutputFormat::Text => format_analytics_text(&analytics),
        }
    } else {
        format_run_detail(&run, &analytics, format)
    };

    println!("{output}");
    Ok(())
}
