use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::tool_call::{NewToolCall, ToolCallRecord, ToolCallSubmission};
use crate::error::CoreError;

/// What a step represents in the agent loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepKind {
    Thought,
    Action,
    Tool,
    Observation,
}

impl StepKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepKind::Thought => "THOUGHT",
            StepKind::Action => "ACTION",
            StepKind::Tool => "TOOL",
            StepKind::Observation => "OBSERVATION",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "THOUGHT" => Ok(StepKind::Thought),
            "ACTION" => Ok(StepKind::Action),
            "TOOL" => Ok(StepKind::Tool),
            "OBSERVATION" => Ok(StepKind::Observation),
            other => Err(CoreError::Parse(format!("unknown step kind: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepStatus {
    Pending,
    Running,
    Success,
    Failed,
}

impl StepStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepStatus::Pending => "PENDING",
            StepStatus::Running => "RUNNING",
            StepStatus::Success => "SUCCESS",
            StepStatus::Failed => "FAILED",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "PENDING" => Ok(StepStatus::Pending),
            "RUNNING" => Ok(StepStatus::Running),
            "SUCCESS" => Ok(StepStatus::Success),
            "FAILED" => Ok(StepStatus::Failed),
            other => Err(CoreError::Parse(format!("unknown step status: {other}"))),
        }
    }
}

impl Default for StepStatus {
    fn default() -> Self {
        StepStatus::Pending
    }
}

/// One validated step of a submission. `index` is caller-supplied ordering;
/// it is not required to be unique or contiguous within the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepSubmission {
    pub index: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<StepKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub status: StepStatus,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCallSubmission>,
}

/// A step with its identity assigned, part of a [`super::NewRun`] graph.
#[derive(Debug, Clone, PartialEq)]
pub struct NewStep {
    pub id: String,
    pub index: i64,
    pub name: Option<String>,
    pub kind: Option<StepKind>,
    pub input: Option<serde_json::Value>,
    pub output: Option<serde_json::Value>,
    pub error: Option<String>,
    pub status: StepStatus,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub tool_calls: Vec<NewToolCall>,
}

/// A persisted step as read back from the store, tool calls in submitted order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepRecord {
    pub id: String,
    pub index: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<StepKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub status: StepStatus,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tool_calls: Vec<ToolCallRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_kind_roundtrip() {
        for kind in [
            StepKind::Thought,
            StepKind::Action,
            StepKind::Tool,
            StepKind::Observation,
        ] {
            assert_eq!(StepKind::parse(kind.as_str()).unwrap(), kind);
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
        assert!(StepKind::parse("PLAN").is_err());
    }

    #[test]
    fn test_step_status_default_is_pending() {
        assert_eq!(StepStatus::default(), StepStatus::Pending);
        assert!(StepStatus::parse("BOGUS").is_err());
    }

    #[test]
    fn test_step_record_serde_uses_camel_case() {
        let step = StepRecord {
            id: "s1".into(),
            index: 0,
            name: Some("plan".into()),
            kind: Some(StepKind::Thought),
            input: None,
            output: None,
            error: None,
            status: StepStatus::Success,
            started_at: Utc::now(),
            ended_at: None,
            tool_calls: Vec::new(),
        };
        let json = serde_json::to_string(&step).unwrap();
        assert!(json.contains("\"startedAt\""));
        assert!(json.contains("\"kind\":\"THOUGHT\""));
        let parsed: StepRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(step, parsed);
    }
}
