use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use clap::Args;
use serde_json::json;

use tracedeck_core::config::TraceConfig;
use tracedeck_core::normalize::normalize;
use tracedeck_core::validate::parse_submission;

#[derive(Args)]
pub struct SampleArgs {
    /// Print the sample payload instead of ingesting it
    #[arg(long)]
    pub print: bool,
}

pub fn run(args: &SampleArgs, config: &TraceConfig) -> Result<()> {
    let payload = sample_payload();

    if args.print {
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    let submission =
        parse_submission(&payload).map_err(|e| anyhow::anyhow!("Sample payload invalid: {e}"))?;
    let graph = normalize(submission);

    let mut store = super::open_store(&config.db_path)?;
    let id = store.create_run(&graph).context("Failed to store sample run")?;

    println!("Created sample run {id}");
    println!("Try: tracedeck show {id}");
    Ok(())
}

/// A representative support-bot trace: three steps, a mix of tool latencies,
/// and one failed call so the analytics have something to show.
fn sample_payload() -> serde_json::Value {
    let now = Utc::now();
    let at = |secs_ago: i64| (now - Duration::seconds(secs_ago)).to_rfc3339();

    json!({
        "name": "Support bot troubleshooting",
        "framework": "LANGGRAPH",
        "status": "SUCCESS",
        "startedAt": at(300),
        "endedAt": at(210),
        "metadata": {"user": "demo-user", "sessionId": "demo-session-1"},
        "tags": ["demo", "support"],
        "steps": [
            {
                "index": 0,
                "name": "Collect context",
                "kind": "THOUGHT",
                "input": {"user_message": "My deployment is failing with 502"},
                "output": {"summary": "Need system status and last deployment logs."},
                "status": "SUCCESS",
                "startedAt": at(300),
                "endedAt": at(288)
            },
            {
                "index": 1,
                "name": "Check status page",
                "kind": "TOOL",
                "status": "SUCCESS",
                "startedAt": at(288),
                "endedAt": at(270),
                "toolCalls": [
                    {
                        "name": "status_api.get",
                        "input": {"service": "api"},
                        "output": {"status": "operational"},
                        "status": "SUCCESS",
                        "startedAt": at(288),
                        "endedAt": at(286)
                    },
                    {
                        "name": "logs.search",
                        "input": {"query": "deploy 502", "window": "15m"},
                        "output": {"hits": 42},
                        "status": "SUCCESS",
                        "startedAt": at(286),
                        "endedAt": at(274)
                    }
                ]
            },
            {
                "index": 2,
                "name": "Draft reply",
                "kind": "ACTION",
                "status": "SUCCESS",
                "startedAt": at(270),
                "endedAt": at(210),
                "toolCalls": [
                    {
                        "name": "kb.lookup",
                        "input": {"article": "rollback-deploy"},
                        "error": "knowledge base timeout",
                        "status": "FAILED",
                        "startedAt": at(270),
                        "endedAt": at(265)
                    }
                ]
            }
        ]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_payload_is_a_valid_submission() {
        let submission = parse_submission(&sample_payload()).unwrap();
        assert_eq!(submission.steps.len(), 3);
        let calls: usize = submission.steps.iter().map(|s| s.tool_calls.len()).sum();
        assert_eq!(calls, 3);
        assert!(submission.ended_at.is_some());
    }
}
