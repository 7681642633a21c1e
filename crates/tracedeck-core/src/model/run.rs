use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::step::{NewStep, StepRecord, StepSubmission};
use crate::error::CoreError;

/// A unique identifier for a run.
/// Generated as UUID v4 hex (no dashes) when a submission is normalized.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub String);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().as_simple().to_string())
    }

    /// Parse and validate an ID string. Must be at least 2 characters.
    pub fn parse(s: impl Into<String>) -> Result<Self, CoreError> {
        let s = s.into();
        if s.len() < 2 {
            return Err(CoreError::InvalidId(format!(
                "ID must be at least 2 characters, got {}",
                s.len()
            )));
        }
        Ok(Self(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for RunId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for RunId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// The agent system that produced a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Framework {
    Langchain,
    Langgraph,
    Crewai,
    Other,
}

impl Framework {
    pub fn as_str(&self) -> &'static str {
        match self {
            Framework::Langchain => "LANGCHAIN",
            Framework::Langgraph => "LANGGRAPH",
            Framework::Crewai => "CREWAI",
            Framework::Other => "OTHER",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "LANGCHAIN" => Ok(Framework::Langchain),
            "LANGGRAPH" => Ok(Framework::Langgraph),
            "CREWAI" => Ok(Framework::Crewai),
            "OTHER" => Ok(Framework::Other),
            other => Err(CoreError::Parse(format!("unknown framework: {other}"))),
        }
    }
}

impl Default for Framework {
    fn default() -> Self {
        Framework::Other
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Running,
    Success,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Running => "RUNNING",
            RunStatus::Success => "SUCCESS",
            RunStatus::Failed => "FAILED",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "RUNNING" => Ok(RunStatus::Running),
            "SUCCESS" => Ok(RunStatus::Success),
            "FAILED" => Ok(RunStatus::Failed),
            other => Err(CoreError::Parse(format!("unknown run status: {other}"))),
        }
    }
}

impl Default for RunStatus {
    fn default() -> Self {
        RunStatus::Running
    }
}

/// A validated, fully-defaulted trace submission. Produced by
/// [`crate::validate::parse_submission`]; the only input the normalizer takes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSubmission {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub framework: Framework,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default)]
    pub steps: Vec<StepSubmission>,
}

/// The entity graph produced by normalization, ready for one atomic store
/// write. Tags are still names here; cross-submission resolution against the
/// unique-name table is the store's job.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRun {
    pub id: RunId,
    pub name: Option<String>,
    pub framework: Framework,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub metadata: Option<serde_json::Value>,
    pub tags: Vec<String>,
    pub steps: Vec<NewStep>,
}

/// A shared, de-duplicated label. Tags outlive the runs they are attached to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub name: String,
}

/// A persisted run with its full owned subgraph, as read back from the store.
/// Steps are ordered ascending by `index`, tool calls in submitted order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRecord {
    pub id: RunId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub framework: Framework,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub steps: Vec<StepRecord>,
}

/// A listing row: the run header plus tag names and a step count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub id: RunId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub framework: Framework,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    pub step_count: i64,
}
