use chrono::Utc;

use tracedeck_core::model::{
    Framework, NewRun, RunId, RunStatus, RunSubmission, StepKind, StepStatus, StepSubmission,
    ToolCallSubmission, ToolStatus,
};
use tracedeck_core::normalize::normalize;
use tracedeck_store::{StoreError, TraceStore};

/// A fluent session for recording a run programmatically.
///
/// Use this from agent code to capture steps and tool calls as they happen,
/// then submit the finished run in one atomic write. Steps are indexed in the
/// order they are logged; timestamps are taken at each call.
pub struct TraceSession {
    name: Option<String>,
    framework: Framework,
    status: RunStatus,
    metadata: Option<serde_json::Value>,
    tags: Vec<String>,
    steps: Vec<StepSubmission>,
    started_at: chrono::DateTime<Utc>,
    ended_at: Option<chrono::DateTime<Utc>>,
}

impl TraceSession {
    /// Begin a new session for the given framework.
    pub fn begin(name: Option<&str>, framework: Framework) -> Self {
        Self {
            name: name.map(String::from),
            framework,
            status: RunStatus::Running,
            metadata: None,
            tags: Vec::new(),
            steps: Vec::new(),
            started_at: Utc::now(),
            ended_at: None,
        }
    }

    /// Add a tag. Duplicates are dropped at normalization.
    pub fn tag(&mut self, tag: &str) -> &mut Self {
        self.tags.push(tag.to_string());
        self
    }

    /// Attach opaque run metadata, stored verbatim.
    pub fn metadata(&mut self, metadata: serde_json::Value) -> &mut Self {
        self.metadata = Some(metadata);
        self
    }

    /// Start a new step. Its index is the number of steps logged so far.
    pub fn log_step(&mut self, name: &str, kind: Option<StepKind>) -> &mut Self {
        let index = self.steps.len() as i64;
        self.steps.push(StepSubmission {
            index,
            name: Some(name.to_string()),
            kind,
            input: None,
            output: None,
            error: None,
            status: StepStatus::Running,
            started_at: Utc::now(),
            ended_at: None,
            tool_calls: Vec::new(),
        });
        self
    }

    /// Set the current step's opaque input.
    pub fn step_input(&mut self, input: serde_json::Value) -> &mut Self {
        if let Some(step) = self.steps.last_mut() {
            step.input = Some(input);
        }
        self
    }

    /// Set the current step's opaque output.
    pub fn step_output(&mut self, output: serde_json::Value) -> &mut Self {
        if let Some(step) = self.steps.last_mut() {
            step.output = Some(output);
        }
        self
    }

    /// Mark the current step successful and stamp its end time.
    pub fn complete_step(&mut self) -> &mut Self {
        if let Some(step) = self.steps.last_mut() {
            step.status = StepStatus::Success;
            step.ended_at = Some(Utc::now());
        }
        self
    }

    /// Mark the current step failed with an error message.
    pub fn fail_step(&mut self, error: &str) -> &mut Self {
        if let Some(step) = self.steps.last_mut() {
            step.status = StepStatus::Failed;
            step.error = Some(error.to_string());
            step.ended_at = Some(Utc::now());
        }
        self
    }

    /// Record a tool invocation on the current step. Starts an unnamed TOOL
    /// step first if no step is open.
    pub fn log_tool_call(&mut self, name: &str, input: Option<serde_json::Value>) -> &mut Self {
        if self.steps.is_empty() {
            tracing::debug!("log_tool_call before any step; opening a TOOL step");
            let index = self.steps.len() as i64;
            self.steps.push(StepSubmission {
                index,
                name: None,
                kind: Some(StepKind::Tool),
                input: None,
                output: None,
                error: None,
                status: StepStatus::Running,
                started_at: Utc::now(),
                ended_at: None,
                tool_calls: Vec::new(),
            });
        }
        if let Some(step) = self.steps.last_mut() {
            step.tool_calls.push(ToolCallSubmission {
                name: name.to_string(),
                input,
                output: None,
                error: None,
                status: ToolStatus::Running,
                started_at: Utc::now(),
                ended_at: None,
            });
        }
        self
    }

    /// Mark the latest tool call successful with an optional output.
    pub fn complete_tool_call(&mut self, output: Option<serde_json::Value>) -> &mut Self {
        if let Some(call) = self.last_tool_call_mut() {
            call.status = ToolStatus::Success;
            call.output = output;
            call.ended_at = Some(Utc::now());
        }
        self
    }

    /// Mark the latest tool call failed with an error message.
    pub fn fail_tool_call(&mut self, error: &str) -> &mut Self {
        if let Some(call) = self.last_tool_call_mut() {
            call.status = ToolStatus::Failed;
            call.error = Some(error.to_string());
            call.ended_at = Some(Utc::now());
        }
        self
    }

    /// Finish the run with a final status and stamp its end time.
    pub fn finish(&mut self, status: RunStatus) -> &mut Self {
        self.status = status;
        self.ended_at = Some(Utc::now());
        self
    }

    /// Build the normalized entity graph without storing it.
    pub fn build(self) -> NewRun {
        normalize(RunSubmission {
            name: self.name,
            framework: self.framework,
            status: self.status,
            started_at: self.started_at,
            ended_at: self.ended_at,
            metadata: self.metadata,
            tags: self.tags,
            steps: self.steps,
        })
    }

    /// Finalize and persist the run in one atomic write.
    pub fn submit_to(self, store: &mut TraceStore) -> Result<RunId, StoreError> {
        store.create_run(&self.build())
    }

    fn last_tool_call_mut(&mut self) -> Option<&mut ToolCallSubmission> {
        self.steps.last_mut().and_then(|s| s.tool_calls.last_mut())
    }
}
