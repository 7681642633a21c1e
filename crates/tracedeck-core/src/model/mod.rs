pub mod run;
pub mod step;
pub mod tool_call;

pub use run::{Framework, NewRun, RunId, RunRecord, RunStatus, RunSubmission, RunSummary, Tag};
pub use step::{NewStep, StepKind, StepRecord, StepStatus, StepSubmission};
pub use tool_call::{NewToolCall, ToolCallRecord, ToolCallSubmission, ToolStatus};
