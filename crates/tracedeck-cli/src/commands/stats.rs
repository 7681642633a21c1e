use std::collections::BTreeMap;

use anyhow::{Context, Result};

use tracedeck_core::config::TraceConfig;
use tracedeck_store::ListOptions;

use crate::output::OutputFormat;

pub fn run(config: &TraceConfig, format: OutputFormat) -> Result<()> {
    let store = super::open_store(&config.db_path)?;
    let runs = store
        .list_runs(&ListOptions::default())
        .context("Failed to list runs")?;

    if runs.is_empty() {
        println!("No runs found.");
        return Ok(());
    }

    let total = runs.len();
    let mut total_steps: i64 = 0;
    let mut by_status: BTreeMap<&'static str, usize> = BTreeMap::new();
    let mut by_framework: BTreeMap<&'static str, usize> = BTreeMap::new();

    // list_runs returns most recently started first
    let latest = runs.first().map(|r| r.started_at);
    let earliest = runs.last().map(|r| r.started_at);

    for run in &runs {
        total_steps += run.step_count;
        *by_status.entry(run.status.as_str()).or_default() += 1;
        *by_framework.entry(run.framework.as_str()).or_default() += 1;
    }

    match format {
        OutputFormat::Json => {
            let stats = serde_json::json!({
                "total_runs": total,
                "total_steps": total_steps,
                "earliest": earliest,
                "latest": latest,
                "by_status": by_status,
                "by_framework": by_framework,
            });
            println!("{}", serde_json::to_string_pretty(&stats).unwrap_or_default());
        }
        OutputFormat::Text => {
            println!("Trace Statistics");
            println!("================");
            println!("Total runs:   {total}");
            println!("Total steps:  {total_steps}");
            if let (Some(e), Some(l)) = (earliest, latest) {
                println!(
                    "Date range:   {} to {}",
                    e.format("%Y-%m-%d"),
                    l.format("%Y-%m-%d")
                );
            }
            println!();

            println!("By Status:");
            for (status, count) in &by_status {
                println!("  {status}: {count}");
            }
            println!();

            println!("By Framework:");
            for (framework, count) in &by_framework {
                println!("  {framework}: {count}");
            }
        }
    }

    Ok(())
}
