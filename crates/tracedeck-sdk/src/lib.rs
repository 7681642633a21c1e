//! Fluent Rust SDK for recording agent runs as tracedeck submissions.
//!
//! # Example
//! ```no_run
//! use tracedeck_core::model::{Framework, RunStatus, StepKind};
//! use tracedeck_sdk::TraceSession;
//! use tracedeck_store::TraceStore;
//!
//! let mut store = TraceStore::open_in_memory().unwrap();
//!
//! let mut session = TraceSession::begin(Some("checkout probe"), Framework::Langchain);
//! session.tag("prod");
//! session.log_step("plan", Some(StepKind::Thought));
//! session.complete_step();
//! session.log_step("call payments", Some(StepKind::Tool));
//! session.log_tool_call("payments.lookup", Some(serde_json::json!({"order": "ord_1"})));
//! session.complete_tool_call(Some(serde_json::json!({"status": "ok"})));
//! session.complete_step();
//! session.finish(RunStatus::Success);
//!
//! let id = session.submit_to(&mut store).unwrap();
//! println!("run stored: {id}");
//! ```

mod session;

pub use session::TraceSession;

// Re-export core types that SDK users may need
pub use tracedeck_core::model::{
    Framework, NewRun, RunId, RunStatus, StepKind, StepStatus, ToolStatus,
};
pub use tracedeck_store::TraceStore;
