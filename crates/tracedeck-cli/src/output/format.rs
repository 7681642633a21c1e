use tracedeck_analytics::RunAnalytics;
use tracedeck_core::model::{RunRecord, RunSummary};

use super::OutputFormat;

pub fn format_run_list(runs: &[RunSummary], fmt: OutputFormat) -> String {
    match fmt {
        OutputFormat::Json => serde_json::to_string_pretty(runs).unwrap_or_default(),
        OutputFormat::Text => format_run_list_text(runs),
    }
}

fn format_run_list_text(runs: &[RunSummary]) -> String {
    if runs.is_empty() {
        return "No runs found.\n".to_string();
    }

    let mut out = String::new();
    for run in runs {
        let short_id = &run.id.as_str()[..8.min(run.id.as_str().len())];
        let name = run.name.as_deref().unwrap_or("(untitled)");
        let time = run.started_at.format("%Y-%m-%d %H:%M");
        let tags = if run.tags.is_empty() {
            String::new()
        } else {
            format!(" #{}", run.tags.join(" #"))
        };
        out.push_str(&format!(
            "\u{25c6} {short_id} {name} [{}/{}] {} step(s){tags}  {time}\n",
            run.framework.as_str(),
            run.status.as_str(),
            run.step_count
        ));
    }
    out
}

pub fn format_run_detail(run: &RunRecord, analytics: &RunAnalytics, fmt: OutputFormat) -> String {
    match fmt {
        OutputFormat::Json => serde_json::to_string_pretty(&serde_json::json!({
            "run": run,
            "analytics": analytics,
        }))
        .unwrap_or_default(),
        OutputFormat::Text => format_run_detail_text(run, analytics),
    }
}

fn format_run_detail_text(run: &RunRecord, analytics: &RunAnalytics) -> String {
    let mut out = String::new();

    out.push_str(&format!("Run: {}\n", run.id));
    out.push_str(&format!(
        "Name:      {}\n",
        run.name.as_deref().unwrap_or("(untitled)")
    ));
    out.push_str(&format!("Framework: {}\n", run.framework.as_str()));
    out.push_str(&format!("Status:    {}\n", run.status.as_str()));
    out.push_str(&format!(
        "Started:   {}\n",
        run.started_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    if let Some(ended) = run.ended_at {
        out.push_str(&format!(
            "Ended:     {}\n",
            ended.format("%Y-%m-%d %H:%M:%S UTC")
        ));
    }
    if !run.tags.is_empty() {
        let names: Vec<_> = run.tags.iter().map(|t| t.name.as_str()).collect();
        out.push_str(&format!("Tags:      {}\n", names.join(", ")));
    }
    if let Some(metadata) = &run.metadata {
        out.push_str("\n--- Metadata ---\n");
        out.push_str(&serde_json::to_string_pretty(metadata).unwrap_or_default());
        out.push('\n');
    }

    out.push_str("\n--- Analytics ---\n");
    out.push_str(&format_analytics_text(analytics));

    out.push_str(&format!("\n--- Steps ({}) ---\n", run.steps.len()));
    let timings: std::collections::HashMap<&str, Option<i64>> = analytics
        .step_timings
        .iter()
        .map(|t| (t.step_id.as_str(), t.duration_secs))
        .collect();
    for step in &run.steps {
        let kind = step.kind.map(|k| k.as_str()).unwrap_or("-");
        let name = step.name.as_deref().unwrap_or("(untitled)");
        let duration = timings
            .get(step.id.as_str())
            .copied()
            .flatten()
            .map(|d| format!(" {d}s"))
            .unwrap_or_default();
        out.push_str(&format!(
            "[{}] {name} ({kind}, {}{duration})\n",
            step.index,
            step.status.as_str()
        ));
        if let Some(input) = &step.input {
            out.push_str(&format!(
                "    in:  {}\n",
                serde_json::to_string(input).unwrap_or_default()
            ));
        }
        if let Some(output) = &step.output {
            out.push_str(&format!(
                "    out: {}\n",
                serde_json::to_string(output).unwrap_or_default()
            ));
        }
        if let Some(error) = &step.error {
            out.push_str(&format!("    err: {error}\n"));
        }
        for call in &step.tool_calls {
            let marker = match call.status.as_str() {
                "FAILED" => " [FAILED]",
                "RUNNING" => " [RUNNING]",
                _ => "",
            };
            out.push_str(&format!("    -> {}{marker}\n", call.name));
            if let Some(input) = &call.input {
                out.push_str(&format!(
                    "       in:  {}\n",
                    serde_json::to_string(input).unwrap_or_default()
                ));
            }
            if let Some(output) = &call.output {
                out.push_str(&format!(
                    "       out: {}\n",
                    serde_json::to_string(output).unwrap_or_default()
                ));
            }
            if let Some(error) = &call.error {
                out.push_str(&format!("       err: {error}\n"));
            }
        }
    }

    out
}

pub fn format_analytics_text(analytics: &RunAnalytics) -> String {
    let mut out = String::new();

    match analytics.run_duration_secs {
        Some(secs) => out.push_str(&format!("Run duration: {secs}s\n")),
        None => out.push_str("Run duration: n/a\n"),
    }
    out.push_str(&format!(
        "Tool calls:   {} (success {}, failed {})\n",
        analytics.total_tool_calls, analytics.tool_successes, analytics.tool_failures
    ));
    match analytics.tool_success_rate_pct {
        Some(rate) => out.push_str(&format!("Success rate: {rate}%\n")),
        None => out.push_str("Success rate: n/a\n"),
    }

    if analytics.latency_buckets.iter().any(|b| b.count > 0) {
        out.push_str("Tool latency:\n");
        for bucket in &analytics.latency_buckets {
            out.push_str(&format!("  {:<6} {} call(s)\n", bucket.label, bucket.count));
        }
    }

    if !analytics.per_tool.is_empty() {
        out.push_str("Per-tool breakdown:\n");
        for (name, stats) in &analytics.per_tool {
            let avg = stats
                .avg_duration_secs
                .map(|a| format!("{a}s"))
                .unwrap_or_else(|| "n/a".to_string());
            out.push_str(&format!(
                "  {name}: {} call(s), success {}, failed {}, avg {avg}\n",
                stats.calls, stats.successes, stats.failures
            ));
        }
    }

    out
}
