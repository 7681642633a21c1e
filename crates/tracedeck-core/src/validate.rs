//! Payload validation: an untrusted, arbitrarily-shaped JSON value either
//! becomes a fully-typed, defaulted [`RunSubmission`] or is rejected with a
//! field-path-annotated [`ValidationError`]. All-or-nothing; the normalizer
//! never sees a partially valid payload.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde_json::{Map, Value};

use crate::error::{CoreError, ValidationError};
use crate::model::{
    Framework, RunStatus, RunSubmission, StepKind, StepStatus, StepSubmission,
    ToolCallSubmission, ToolStatus,
};

const RUN_KEYS: &[&str] = &[
    "name",
    "framework",
    "status",
    "startedAt",
    "endedAt",
    "metadata",
    "tags",
    "steps",
];

/// Validate and default an inbound trace submission.
///
/// Unknown fields are ignored; JSON `null` counts as absent. Every omitted
/// `startedAt` defaults to the same instant, captured once per call.
pub fn parse_submission(value: &Value) -> Result<RunSubmission, ValidationError> {
    let now = Utc::now();
    let obj = value
        .as_object()
        .ok_or_else(|| ValidationError::new("payload", "expected a JSON object"))?;

    for key in obj.keys() {
        if !RUN_KEYS.contains(&key.as_str()) {
            tracing::debug!("Ignoring unknown payload field: {key}");
        }
    }

    let name = optional_string(obj, "name", "name")?;
    let framework =
        optional_enum(obj, "framework", "framework", Framework::parse)?.unwrap_or_default();
    let status = optional_enum(obj, "status", "status", RunStatus::parse)?.unwrap_or_default();
    let started_at = optional_timestamp(obj, "startedAt", "startedAt")?.unwrap_or(now);
    let ended_at = optional_timestamp(obj, "endedAt", "endedAt")?;
    let metadata = opaque_field(obj, "metadata");
    let tags = parse_tags(obj)?;
    let steps = parse_steps(obj, now)?;

    Ok(RunSubmission {
        name,
        framework,
        status,
        started_at,
        ended_at,
        metadata,
        tags,
        steps,
    })
}

fn parse_steps(
    obj: &Map<String, Value>,
    now: DateTime<Utc>,
) -> Result<Vec<StepSubmission>, ValidationError> {
    match present(obj, "steps") {
        None => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(i, item)| parse_step(item, i, now))
            .collect(),
        Some(_) => Err(ValidationError::new("steps", "expected an array")),
    }
}

fn parse_step(
    value: &Value,
    position: usize,
    now: DateTime<Utc>,
) -> Result<StepSubmission, ValidationError> {
    let path = format!("steps[{position}]");
    let obj = value
        .as_object()
        .ok_or_else(|| ValidationError::new(&path, "expected an object"))?;

    let index = parse_index(obj, &path)?;
    let name = optional_string(obj, "name", &format!("{path}.name"))?;
    let kind = optional_enum(obj, "kind", &format!("{path}.kind"), StepKind::parse)?;
    let status = optional_enum(obj, "status", &format!("{path}.status"), StepStatus::parse)?
        .unwrap_or_default();
    let started_at =
        optional_timestamp(obj, "startedAt", &format!("{path}.startedAt"))?.unwrap_or(now);
    let ended_at = optional_timestamp(obj, "endedAt", &format!("{path}.endedAt"))?;
    let error = optional_string(obj, "error", &format!("{path}.error"))?;

    let tool_calls = match present(obj, "toolCalls") {
        None => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(j, item)| parse_tool_call(item, &format!("{path}.toolCalls[{j}]"), now))
            .collect::<Result<_, _>>()?,
        Some(_) => {
            return Err(ValidationError::new(
                format!("{path}.toolCalls"),
                "expected an array",
            ))
        }
    };

    Ok(StepSubmission {
        index,
        name,
        kind,
        input: opaque_field(obj, "input"),
        output: opaque_field(obj, "output"),
        error,
        status,
        started_at,
        ended_at,
        tool_calls,
    })
}

fn parse_tool_call(
    value: &Value,
    path: &str,
    now: DateTime<Utc>,
) -> Result<ToolCallSubmission, ValidationError> {
    let obj = value
        .as_object()
        .ok_or_else(|| ValidationError::new(path, "expected an object"))?;

    let name = match present(obj, "name") {
        Some(Value::String(s)) => s.clone(),
        Some(_) => return Err(ValidationError::new(format!("{path}.name"), "expected a string")),
        None => return Err(ValidationError::new(format!("{path}.name"), "required")),
    };
    let status = optional_enum(obj, "status", &format!("{path}.status"), ToolStatus::parse)?
        .unwrap_or_default();
    let started_at =
        optional_timestamp(obj, "startedAt", &format!("{path}.startedAt"))?.unwrap_or(now);
    let ended_at = optional_timestamp(obj, "endedAt", &format!("{path}.endedAt"))?;
    let error = optional_string(obj, "error", &format!("{path}.error"))?;

    Ok(ToolCallSubmission {
        name,
        input: opaque_field(obj, "input"),
        output: opaque_field(obj, "output"),
        error,
        status,
        started_at,
        ended_at,
    })
}

fn parse_tags(obj: &Map<String, Value>) -> Result<Vec<String>, ValidationError> {
    match present(obj, "tags") {
        None => Ok(Vec::new()),
        Some(Value::Array(items)) => {
            let mut tags = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                match item {
                    Value::String(s) => tags.push(s.clone()),
                    _ => {
                        return Err(ValidationError::new(
                            format!("tags[{i}]"),
                            "expected a string",
                        ))
                    }
                }
            }
            Ok(tags)
        }
        Some(_) => Err(ValidationError::new("tags", "expected an array of strings")),
    }
}

fn parse_index(obj: &Map<String, Value>, step_path: &str) -> Result<i64, ValidationError> {
    let path = format!("{step_path}.index");
    let value =
        present(obj, "index").ok_or_else(|| ValidationError::new(&path, "required"))?;
    let index = match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(i)
            } else {
                // Tolerate whole-number floats (3.0) the way the wire format does.
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                    .map(|f| f as i64)
            }
        }
        _ => None,
    };
    match index {
        Some(i) if i >= 0 => Ok(i),
        _ => Err(ValidationError::new(path, "must be a non-negative integer")),
    }
}

/// A field counts as present only when it exists and is not JSON `null`.
fn present<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    obj.get(key).filter(|v| !v.is_null())
}

/// Opaque values (`metadata`, `input`, `output`) pass through uninterpreted.
fn opaque_field(obj: &Map<String, Value>, key: &str) -> Option<Value> {
    present(obj, key).cloned()
}

fn optional_string(
    obj: &Map<String, Value>,
    key: &str,
    path: &str,
) -> Result<Option<String>, ValidationError> {
    match present(obj, key) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(ValidationError::new(path, "expected a string")),
    }
}

fn optional_enum<T>(
    obj: &Map<String, Value>,
    key: &str,
    path: &str,
    parse: fn(&str) -> Result<T, CoreError>,
) -> Result<Option<T>, ValidationError> {
    match present(obj, key) {
        None => Ok(None),
        Some(Value::String(s)) => parse(s)
            .map(Some)
            .map_err(|_| ValidationError::new(path, format!("invalid enum value {s:?}"))),
        Some(_) => Err(ValidationError::new(path, "expected a string")),
    }
}

fn optional_timestamp(
    obj: &Map<String, Value>,
    key: &str,
    path: &str,
) -> Result<Option<DateTime<Utc>>, ValidationError> {
    match present(obj, key) {
        None => Ok(None),
        Some(v) => coerce_timestamp(v, path).map(Some),
    }
}

fn coerce_timestamp(value: &Value, path: &str) -> Result<DateTime<Utc>, ValidationError> {
    match value {
        Value::String(s) => parse_datetime_str(s)
            .ok_or_else(|| ValidationError::new(path, format!("uncoercible timestamp {s:?}"))),
        Value::Number(n) => {
            // Numbers are epoch milliseconds, as Date.now()-style clients send.
            let millis = n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f.round() as i64))
                .ok_or_else(|| ValidationError::new(path, "uncoercible timestamp"))?;
            Utc.timestamp_millis_opt(millis)
                .single()
                .ok_or_else(|| ValidationError::new(path, "timestamp out of range"))
        }
        _ => Err(ValidationError::new(path, "expected a timestamp")),
    }
}

fn parse_datetime_str(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // Naive ISO date-times are treated as UTC.
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_object_gets_defaults() {
        let before = Utc::now();
        let sub = parse_submission(&json!({})).unwrap();
        assert_eq!(sub.framework, Framework::Other);
        assert_eq!(sub.status, RunStatus::Running);
        assert!(sub.name.is_none());
        assert!(sub.ended_at.is_none());
        assert!(sub.tags.is_empty());
        assert!(sub.steps.is_empty());
        assert!(sub.started_at >= before);
    }

    #[test]
    fn test_full_payload() {
        let payload = json!({
            "name": "Checkout investigation",
            "framework": "LANGCHAIN",
            "status": "SUCCESS",
            "startedAt": "2026-03-01T10:00:00Z",
            "endedAt": "2026-03-01T10:01:30Z",
            "tags": ["prod", "checkout"],
            "metadata": {"ticket_id": "TCK-123"},
            "steps": [
                {
                    "index": 0,
                    "name": "Understand issue",
                    "kind": "THOUGHT",
                    "input": {"customer": "alice"},
                    "status": "SUCCESS"
                },
                {
                    "index": 1,
                    "name": "Call payments API",
                    "kind": "TOOL",
                    "status": "SUCCESS",
                    "toolCalls": [
                        {
                            "name": "payments.lookup",
                            "input": {"order": "ord_123"},
                            "output": {"status": "declined"},
                            "status": "SUCCESS"
                        }
                    ]
                }
            ]
        });

        let sub = parse_submission(&payload).unwrap();
        assert_eq!(sub.name.as_deref(), Some("Checkout investigation"));
        assert_eq!(sub.framework, Framework::Langchain);
        assert_eq!(sub.status, RunStatus::Success);
        assert_eq!(sub.tags, vec!["prod", "checkout"]);
        assert_eq!(sub.metadata, Some(json!({"ticket_id": "TCK-123"})));
        assert_eq!(sub.steps.len(), 2);
        assert_eq!(sub.steps[0].kind, Some(StepKind::Thought));
        assert_eq!(sub.steps[0].input, Some(json!({"customer": "alice"})));
        assert_eq!(sub.steps[1].tool_calls.len(), 1);
        assert_eq!(sub.steps[1].tool_calls[0].name, "payments.lookup");
        assert_eq!(sub.steps[1].tool_calls[0].status, ToolStatus::Success);
        let dur = sub.ended_at.unwrap() - sub.started_at;
        assert_eq!(dur.num_seconds(), 90);
    }

    #[test]
    fn test_invalid_run_status_rejected() {
        let err = parse_submission(&json!({"status": "BOGUS"})).unwrap_err();
        assert_eq!(err.path, "status");
        assert!(err.to_string().contains("invalid enum value"));
    }

    #[test]
    fn test_invalid_nested_enum_reports_full_path() {
        let payload = json!({
            "steps": [
                {"index": 0},
                {"index": 1, "toolCalls": [{"name": "x", "status": "BOGUS"}]}
            ]
        });
        let err = parse_submission(&payload).unwrap_err();
        assert_eq!(err.path, "steps[1].toolCalls[0].status");
    }

    #[test]
    fn test_step_index_must_be_non_negative_integer() {
        for bad in [json!(-1), json!(1.5), json!("0"), Value::Null] {
            let err = parse_submission(&json!({"steps": [{"index": bad}]})).unwrap_err();
            assert_eq!(err.path, "steps[0].index");
        }
        // Whole-number floats are tolerated.
        let sub = parse_submission(&json!({"steps": [{"index": 3.0}]})).unwrap();
        assert_eq!(sub.steps[0].index, 3);
    }

    #[test]
    fn test_tool_call_name_required() {
        let payload = json!({"steps": [{"index": 0, "toolCalls": [{"status": "RUNNING"}]}]});
        let err = parse_submission(&payload).unwrap_err();
        assert_eq!(err.path, "steps[0].toolCalls[0].name");
        assert_eq!(err.reason, "required");
    }

    #[test]
    fn test_timestamp_coercion_forms() {
        // RFC 3339 with offset
        let sub = parse_submission(&json!({"startedAt": "2026-03-01T12:00:00+02:00"})).unwrap();
        assert_eq!(sub.started_at.to_rfc3339(), "2026-03-01T10:00:00+00:00");

        // Epoch milliseconds
        let sub = parse_submission(&json!({"startedAt": 1_767_225_600_000_i64})).unwrap();
        assert_eq!(sub.started_at.timestamp_millis(), 1_767_225_600_000);

        // Naive date-time, treated as UTC
        let sub = parse_submission(&json!({"startedAt": "2026-03-01T10:00:00.250"})).unwrap();
        assert_eq!(sub.started_at.timestamp_subsec_millis(), 250);
    }

    #[test]
    fn test_uncoercible_timestamp_rejected() {
        let err = parse_submission(&json!({"startedAt": "yesterday"})).unwrap_err();
        assert_eq!(err.path, "startedAt");
        assert!(err.reason.contains("uncoercible"));

        let err = parse_submission(&json!({"steps": [{"index": 0, "endedAt": true}]}))
            .unwrap_err();
        assert_eq!(err.path, "steps[0].endedAt");
    }

    #[test]
    fn test_tags_must_be_strings() {
        let err = parse_submission(&json!({"tags": ["ok", 7]})).unwrap_err();
        assert_eq!(err.path, "tags[1]");

        let err = parse_submission(&json!({"tags": "demo"})).unwrap_err();
        assert_eq!(err.path, "tags");
    }

    #[test]
    fn test_steps_must_be_an_array() {
        let err = parse_submission(&json!({"steps": {}})).unwrap_err();
        assert_eq!(err.path, "steps");
    }

    #[test]
    fn test_payload_must_be_an_object() {
        let err = parse_submission(&json!([1, 2, 3])).unwrap_err();
        assert_eq!(err.path, "payload");
    }

    #[test]
    fn test_null_counts_as_absent() {
        let sub = parse_submission(&json!({
            "name": null,
            "framework": null,
            "metadata": null,
            "steps": null
        }))
        .unwrap();
        assert!(sub.name.is_none());
        assert_eq!(sub.framework, Framework::Other);
        assert!(sub.metadata.is_none());
        assert!(sub.steps.is_empty());
    }

    #[test]
    fn test_unknown_fields_ignored() {
        let sub = parse_submission(&json!({
            "name": "run",
            "totally_unknown": {"nested": true},
            "steps": [{"index": 0, "extra": 1}]
        }))
        .unwrap();
        assert_eq!(sub.name.as_deref(), Some("run"));
        assert_eq!(sub.steps.len(), 1);
    }

    #[test]
    fn test_opaque_values_pass_through_verbatim() {
        let blob = json!({"deep": {"list": [1, "two", null], "flag": false}});
        let sub = parse_submission(&json!({
            "metadata": blob,
            "steps": [{"index": 0, "input": "plain string", "output": 42}]
        }))
        .unwrap();
        assert_eq!(sub.metadata, Some(blob));
        assert_eq!(sub.steps[0].input, Some(json!("plain string")));
        assert_eq!(sub.steps[0].output, Some(json!(42)));
    }
}
