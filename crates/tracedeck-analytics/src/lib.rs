//! Derived analytics over a retrieved run graph.
//!
//! Everything here is a pure function of the input: no side effects, no
//! caching, safe to recompute on every read. Durations are whole seconds
//! (`endedAt - startedAt`) and are never estimated; a missing `endedAt`
//! means "not applicable", not zero.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use tracedeck_core::model::{RunRecord, ToolStatus};

/// Fixed latency buckets: half-open, upper-inclusive ranges in seconds.
/// A duration of exactly 1 s lands in the first bucket, exactly 10 s in the
/// third. Durations of 0 s (sub-second calls truncate to zero) and negative
/// durations land in no bucket at all.
const LATENCY_BUCKETS: [(&str, i64, Option<i64>); 4] = [
    ("<1s", 0, Some(1)),
    ("1-3s", 1, Some(3)),
    ("3-10s", 3, Some(10)),
    ("10s+", 10, None),
];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunAnalytics {
    pub run_duration_secs: Option<i64>,
    pub step_timings: Vec<StepTiming>,
    pub total_tool_calls: usize,
    pub tool_successes: usize,
    pub tool_failures: usize,
    /// Nearest-integer percent; absent when there are no tool calls.
    pub tool_success_rate_pct: Option<u32>,
    pub latency_buckets: Vec<LatencyBucket>,
    pub per_tool: BTreeMap<String, ToolBreakdown>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepTiming {
    pub step_id: String,
    pub index: i64,
    pub duration_secs: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LatencyBucket {
    pub label: &'static str,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ToolBreakdown {
    pub calls: usize,
    pub successes: usize,
    pub failures: usize,
    /// Average over calls with a defined duration only, rounded to one
    /// decimal; absent when no call has timestamps.
    pub avg_duration_secs: Option<f64>,
}

/// Whole-second duration, or `None` when the end timestamp is missing.
pub fn duration_secs(started: DateTime<Utc>, ended: Option<DateTime<Utc>>) -> Option<i64> {
    ended.map(|e| (e - started).num_seconds())
}

/// Compute the analytics summary for one run. Idempotent by construction.
pub fn summarize(run: &RunRecord) -> RunAnalytics {
    let run_duration_secs = duration_secs(run.started_at, run.ended_at);
    let step_timings = run
        .steps
        .iter()
        .map(|step| StepTiming {
            step_id: step.id.clone(),
            index: step.index,
            duration_secs: duration_secs(step.started_at, step.ended_at),
        })
        .collect();

    #[derive(Default)]
    struct Accum {
        calls: usize,
        successes: usize,
        failures: usize,
        total_duration: i64,
        samples: usize,
    }

    let mut total_tool_calls = 0usize;
    let mut tool_successes = 0usize;
    let mut tool_failures = 0usize;
    let mut durations: Vec<i64> = Vec::new();
    let mut accum: BTreeMap<String, Accum> = BTreeMap::new();

    for step in &run.steps {
        for call in &step.tool_calls {
            total_tool_calls += 1;
            match call.status {
                ToolStatus::Success => tool_successes += 1,
                ToolStatus::Failed => tool_failures += 1,
                ToolStatus::Running => {}
            }

            let duration = duration_secs(call.started_at, call.ended_at);
            if let Some(d) = duration {
                durations.push(d);
            }

            let entry = accum.entry(call.name.clone()).or_default();
            entry.calls += 1;
            match call.status {
                ToolStatus::Success => entry.successes += 1,
                ToolStatus::Failed => entry.failures += 1,
                ToolStatus::Running => {}
            }
            if let Some(d) = duration {
                entry.total_duration += d;
                entry.samples += 1;
            }
        }
    }

    let tool_success_rate_pct = if total_tool_calls == 0 {
        None
    } else {
        Some(((tool_successes as f64 / total_tool_calls as f64) * 100.0).round() as u32)
    };

    let latency_buckets = LATENCY_BUCKETS
        .iter()
        .map(|&(label, min, max)| LatencyBucket {
            label,
            count: durations
                .iter()
                .filter(|&&d| d > min && max.map_or(true, |m| d <= m))
                .count(),
        })
        .collect();

    let per_tool = accum
        .into_iter()
        .map(|(name, a)| {
            let avg_duration_secs = (a.samples > 0)
                .then(|| (a.total_duration as f64 / a.samples as f64 * 10.0).round() / 10.0);
            (
                name,
                ToolBreakdown {
                    calls: a.calls,
                    successes: a.successes,
                    failures: a.failures,
                    avg_duration_secs,
                },
            )
        })
        .collect();

    RunAnalytics {
        run_duration_secs,
        step_timings,
        total_tool_calls,
        tool_successes,
        tool_failures,
        tool_success_rate_pct,
        latency_buckets,
        per_tool,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tracedeck_core::model::{
        Framework, RunId, RunStatus, StepRecord, StepStatus, ToolCallRecord,
    };

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_767_225_600 + secs, 0).unwrap()
    }

    fn call(name: &str, status: ToolStatus, span: Option<(i64, i64)>) -> ToolCallRecord {
        ToolCallRecord {
            id: format!("tc-{name}-{}", span.map_or(0, |(s, _)| s)),
            name: name.into(),
            input: None,
            output: None,
            error: None,
            status,
            started_at: at(span.map_or(0, |(s, _)| s)),
            ended_at: span.map(|(_, e)| at(e)),
        }
    }

    fn run_with_calls(calls: Vec<ToolCallRecord>) -> RunRecord {
        RunRecord {
            id: RunId::new(),
            name: None,
            framework: Framework::Other,
            status: RunStatus::Success,
            started_at: at(0),
            ended_at: Some(at(90)),
            metadata: None,
            tags: Vec::new(),
            steps: vec![StepRecord {
                id: "s0".into(),
                index: 0,
                name: None,
                kind: None,
                input: None,
                output: None,
                error: None,
                status: StepStatus::Success,
                started_at: at(0),
                ended_at: Some(at(30)),
                tool_calls: calls,
            }],
        }
    }

    #[test]
    fn test_run_and_step_duration() {
        let run = run_with_calls(Vec::new());
        let analytics = summarize(&run);
        assert_eq!(analytics.run_duration_secs, Some(90));
        assert_eq!(analytics.step_timings.len(), 1);
        assert_eq!(analytics.step_timings[0].duration_secs, Some(30));
    }

    #[test]
    fn test_missing_end_means_not_applicable() {
        let mut run = run_with_calls(Vec::new());
        run.ended_at = None;
        run.steps[0].ended_at = None;
        let analytics = summarize(&run);
        assert_eq!(analytics.run_duration_secs, None);
        assert_eq!(analytics.step_timings[0].duration_secs, None);
    }

    #[test]
    fn test_success_rate_not_applicable_with_zero_calls() {
        let analytics = summarize(&run_with_calls(Vec::new()));
        assert_eq!(analytics.total_tool_calls, 0);
        assert_eq!(analytics.tool_success_rate_pct, None);
        assert!(analytics.per_tool.is_empty());
        assert!(analytics.latency_buckets.iter().all(|b| b.count == 0));
    }

    #[test]
    fn test_success_rate_rounds_to_nearest_percent() {
        let analytics = summarize(&run_with_calls(vec![
            call("a", ToolStatus::Success, None),
            call("a", ToolStatus::Success, None),
            call("a", ToolStatus::Failed, None),
        ]));
        assert_eq!(analytics.total_tool_calls, 3);
        assert_eq!(analytics.tool_successes, 2);
        assert_eq!(analytics.tool_failures, 1);
        assert_eq!(analytics.tool_success_rate_pct, Some(67));
    }

    #[test]
    fn test_running_calls_count_toward_total_only() {
        let analytics = summarize(&run_with_calls(vec![
            call("a", ToolStatus::Running, None),
            call("a", ToolStatus::Success, None),
        ]));
        assert_eq!(analytics.total_tool_calls, 2);
        assert_eq!(analytics.tool_successes, 1);
        assert_eq!(analytics.tool_failures, 0);
        assert_eq!(analytics.tool_success_rate_pct, Some(50));
    }

    #[test]
    fn test_histogram_boundaries() {
        let analytics = summarize(&run_with_calls(vec![
            call("t", ToolStatus::Success, Some((0, 1))),   // exactly 1s -> <1s
            call("t", ToolStatus::Success, Some((0, 3))),   // exactly 3s -> 1-3s
            call("t", ToolStatus::Success, Some((0, 10))),  // exactly 10s -> 3-10s
            call("t", ToolStatus::Success, Some((0, 11))),  // 11s -> 10s+
        ]));
        let counts: Vec<_> = analytics
            .latency_buckets
            .iter()
            .map(|b| (b.label, b.count))
            .collect();
        assert_eq!(
            counts,
            vec![("<1s", 1), ("1-3s", 1), ("3-10s", 1), ("10s+", 1)]
        );
    }

    #[test]
    fn test_histogram_excludes_undefined_and_zero_durations() {
        let analytics = summarize(&run_with_calls(vec![
            call("t", ToolStatus::Success, None),          // no endedAt
            call("t", ToolStatus::Success, Some((5, 5))),  // 0s, below every bucket
            call("t", ToolStatus::Success, Some((0, 2))),
        ]));
        let total_bucketed: usize = analytics.latency_buckets.iter().map(|b| b.count).sum();
        assert_eq!(total_bucketed, 1);
    }

    #[test]
    fn test_per_tool_average_excludes_undated_calls() {
        let analytics = summarize(&run_with_calls(vec![
            call("x", ToolStatus::Success, Some((0, 4))),
            call("x", ToolStatus::Success, None),
        ]));
        let x = &analytics.per_tool["x"];
        assert_eq!(x.calls, 2);
        assert_eq!(x.avg_duration_secs, Some(4.0));
    }

    #[test]
    fn test_per_tool_average_rounds_to_one_decimal() {
        let analytics = summarize(&run_with_calls(vec![
            call("x", ToolStatus::Success, Some((0, 1))),
            call("x", ToolStatus::Success, Some((0, 2))),
            call("x", ToolStatus::Failed, Some((0, 2))),
        ]));
        let x = &analytics.per_tool["x"];
        assert_eq!(x.calls, 3);
        assert_eq!(x.successes, 2);
        assert_eq!(x.failures, 1);
        // (1 + 2 + 2) / 3 = 1.666..., rounded to 1.7
        assert_eq!(x.avg_duration_secs, Some(1.7));
    }

    #[test]
    fn test_per_tool_grouping_is_case_sensitive() {
        let analytics = summarize(&run_with_calls(vec![
            call("search", ToolStatus::Success, None),
            call("Search", ToolStatus::Success, None),
        ]));
        assert_eq!(analytics.per_tool.len(), 2);
    }

    #[test]
    fn test_summarize_is_idempotent() {
        let run = run_with_calls(vec![
            call("a", ToolStatus::Success, Some((0, 2))),
            call("b", ToolStatus::Failed, None),
        ]);
        assert_eq!(summarize(&run), summarize(&run));
    }
}
