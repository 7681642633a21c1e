use anyhow::{Context, Result};
use clap::Args;

use tracedeck_core::config::TraceConfig;
use tracedeck_core::model::{Framework, RunStatus};
use tracedeck_store::ListOptions;

use crate::output::format::format_run_list;
use crate::output::OutputFormat;

#[derive(Args)]
pub struct LogArgs {
    /// Maximum number of entries
    #[arg(short = 'n', long, default_value = "20")]
    pub limit: usize,

    /// Filter by exact run status (RUNNING, SUCCESS, FAILED)
    #[arg(long)]
    pub status: Option<String>,

    /// Filter by exact framework (LANGCHAIN, LANGGRAPH, CREWAI, OTHER)
    #[arg(long)]
    pub framework: Option<String>,

    /// Free text matched against run id, run name, and tag names
    #[arg(short, long)]
    pub query: Option<String>,
}

pub fn run(args: &LogArgs, config: &TraceConfig, format: OutputFormat) -> Result<()> {
    let status = args
        .status
        .as_deref()
        .map(RunStatus::parse)
        .transpose()
        .map_err(|e| anyhow::anyhow!("Invalid --status: {e}"))?;
    let framework = args
        .framework
        .as_deref()
        .map(Framework::parse)
        .transpose()
        .map_err(|e| anyhow::anyhow!("Invalid --framework: {e}"))?;

    let store = super::open_store(&config.db_path)?;
    let opts = ListOptions {
        status,
        framework,
        query: args.query.clone(),
        limit: Some(args.limit),
    };
    let runs = store.list_runs(&opts).context("Failed to list runs")?;

    print!("{}", format_run_list(&runs, format));
    Ok(())
}
