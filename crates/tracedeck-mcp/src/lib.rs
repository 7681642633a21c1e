use std::path::PathBuf;

use rmcp::model::{ServerCapabilities, ServerInfo};
use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    tool, tool_handler, tool_router, ServerHandler,
};
use schemars::JsonSchema;
use serde::Deserialize;

use tracedeck_analytics::summarize;
use tracedeck_core::model::{Framework, RunStatus};
use tracedeck_core::normalize::normalize;
use tracedeck_core::validate::parse_submission;
use tracedeck_store::{ListOptions, StoreError, TraceStore};

/// MCP server exposing trace ingestion and retrieval to agent frameworks.
///
/// Stores `db_path: PathBuf` instead of `TraceStore` because
/// `rusqlite::Connection` is `!Sync` and rmcp requires `ServerHandler: Send + Sync + 'static`.
/// Each tool handler opens the store fresh per request.
#[derive(Debug, Clone)]
pub struct TraceMcpServer {
    db_path: PathBuf,
    tool_router: ToolRouter<Self>,
}

impl TraceMcpServer {
    /// Create a new MCP server backed by the database at the given path.
    pub fn new(db_path: PathBuf) -> Self {
        Self {
            db_path,
            tool_router: Self::tool_router(),
        }
    }

    fn open_store(&self) -> Result<TraceStore, String> {
        TraceStore::open(&self.db_path).map_err(|e| {
            tracing::error!("Failed to open trace store: {e}");
            "Internal error: storage unavailable".to_string()
        })
    }
}

/// Internal failures stay in the log; callers get an opaque message.
/// "Not found" is always surfaced distinctly.
fn surface(action: &str, err: StoreError) -> String {
    match err {
        StoreError::NotFound { id } => format!("Run not found: {id}"),
        other => {
            tracing::error!("Failed to {action}: {other}");
            format!("Internal error: failed to {action}")
        }
    }
}

// -- Tool parameter structs --

#[derive(Debug, Deserialize, JsonSchema)]
pub struct IngestParams {
    /// The run payload: name, framework, status, tags, metadata, and an
    /// ordered `steps` array, each step optionally carrying `toolCalls`
    pub payload: serde_json::Value,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ShowParams {
    /// Run ID as returned by trace_ingest
    pub id: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct LogParams {
    /// Maximum number of entries (default: 10)
    pub limit: Option<usize>,
    /// Filter by exact run status (RUNNING, SUCCESS, FAILED)
    pub status: Option<String>,
    /// Filter by exact framework (LANGCHAIN, LANGGRAPH, CREWAI, OTHER)
    pub framework: Option<String>,
    /// Free text matched against run id, run name, and tag names
    pub query: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct DeleteParams {
    /// Run ID to delete, along with all of its steps and tool calls
    pub id: String,
}

// -- Tool implementations --

#[tool_router]
impl TraceMcpServer {
    #[tool(
        description = "Submit one agent run for storage: a run object with optional tags and an ordered steps array, each step optionally carrying toolCalls. Validates, normalizes, and persists the whole trace atomically; returns the new run id."
    )]
    fn trace_ingest(
        &self,
        Parameters(params): Parameters<IngestParams>,
    ) -> Result<String, String> {
        let submission =
            parse_submission(&params.payload).map_err(|e| format!("Invalid payload: {e}"))?;
        let mut store = self.open_store()?;
        let graph = normalize(submission);
        match store.create_run(&graph) {
            Ok(id) => Ok(format!("Created run {id}")),
            Err(e) => Err(surface("store run", e)),
        }
    }

    #[tool(
        description = "Show one stored run: header, tags, derived analytics (duration, tool-call success rate, latency histogram, per-tool breakdown), and the step-by-step replay."
    )]
    fn trace_show(&self, Parameters(params): Parameters<ShowParams>) -> Result<String, String> {
        let store = self.open_store()?;
        let run = store
            .get_run(&params.id)
            .map_err(|e| surface("read run", e))?;
        let analytics = summarize(&run);

        let mut out = String::new();
        out.push_str(&format!("Run: {}\n", run.id));
        out.push_str(&format!(
            "Name: {}\n",
            run.name.as_deref().unwrap_or("(untitled)")
        ));
        out.push_str(&format!(
            "Framework: {}  Status: {}\n",
            run.framework.as_str(),
            run.status.as_str()
        ));
        out.push_str(&format!(
            "Started: {}\n",
            run.started_at.format("%Y-%m-%d %H:%M:%S UTC")
        ));
        if !run.tags.is_empty() {
            let names: Vec<_> = run.tags.iter().map(|t| t.name.as_str()).collect();
            out.push_str(&format!("Tags: {}\n", names.join(", ")));
        }

        match analytics.run_duration_secs {
            Some(secs) => out.push_str(&format!("Duration: {secs}s\n")),
            None => out.push_str("Duration: n/a\n"),
        }
        out.push_str(&format!(
            "Tool calls: {} (success {}, failed {})",
            analytics.total_tool_calls, analytics.tool_successes, analytics.tool_failures
        ));
        match analytics.tool_success_rate_pct {
            Some(rate) => out.push_str(&format!("  Success rate: {rate}%\n")),
            None => out.push_str("  Success rate: n/a\n"),
        }

        if analytics.latency_buckets.iter().any(|b| b.count > 0) {
            out.push_str("Latency: ");
            let parts: Vec<_> = analytics
                .latency_buckets
                .iter()
                .map(|b| format!("{} {}", b.label, b.count))
                .collect();
            out.push_str(&parts.join(", "));
            out.push('\n');
        }

        if !analytics.per_tool.is_empty() {
            out.push_str("\nPer-tool breakdown:\n");
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

        out.push_str(&format!("\nSteps ({}):\n", run.steps.len()));
        for step in &run.steps {
            let kind = step.kind.map(|k| k.as_str()).unwrap_or("-");
            let name = step.name.as_deref().unwrap_or("(untitled)");
            out.push_str(&format!(
                "  [{}] {name} ({kind}, {})\n",
                step.index,
                step.status.as_str()
            ));
            for call in &step.tool_calls {
                out.push_str(&format!("      {} [{}]\n", call.name, call.status.as_str()));
            }
        }

        Ok(out)
    }

    #[tool(
        description = "List stored runs, most recently started first. Filter by exact status, exact framework, and/or a free-text token matched against run id, run name, and tag names."
    )]
    fn trace_log(&self, Parameters(params): Parameters<LogParams>) -> Result<String, String> {
        let status = params
            .status
            .as_deref()
            .map(RunStatus::parse)
            .transpose()
            .map_err(|e| format!("Invalid status filter: {e}"))?;
        let framework = params
            .framework
            .as_deref()
            .map(Framework::parse)
            .transpose()
            .map_err(|e| format!("Invalid framework filter: {e}"))?;

        let store = self.open_store()?;
        let opts = ListOptions {
            status,
            framework,
            query: params.query.clone(),
            limit: Some(params.limit.unwrap_or(10)),
        };
        let runs = store
            .list_runs(&opts)
            .map_err(|e| surface("list runs", e))?;

        if runs.is_empty() {
            return Ok("No runs found.".to_string());
        }

        let mut out = format!("{} run(s):\n\n", runs.len());
        for run in &runs {
            let short_id = &run.id.as_str()[..8.min(run.id.as_str().len())];
            let name = run.name.as_deref().unwrap_or("(untitled)");
            let date = run.started_at.format("%Y-%m-%d %H:%M");
            let tags = if run.tags.is_empty() {
                String::new()
            } else {
                format!("  tags: {}", run.tags.join(", "))
            };
            out.push_str(&format!(
                "- {short_id} [{}/{}] {date} {} step(s)\n  {name}{tags}\n",
                run.framework.as_str(),
                run.status.as_str(),
                run.step_count
            ));
        }
        Ok(out)
    }

    #[tool(
        description = "Delete a stored run and everything it owns (steps, tool calls, tag associations). Shared tags are kept."
    )]
    fn trace_delete(
        &self,
        Parameters(params): Parameters<DeleteParams>,
    ) -> Result<String, String> {
        let mut store = self.open_store()?;
        store
            .delete_run(&params.id)
            .map_err(|e| surface("delete run", e))?;
        Ok(format!("Deleted run {}", params.id))
    }
}

#[tool_handler]
impl ServerHandler for TraceMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Tracedeck MCP Server - Submit agent execution traces (runs with steps \
                 and tool calls) and query them back with derived analytics."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

/// Start the MCP server on stdio transport.
pub async fn run_stdio(db_path: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    use rmcp::transport::stdio;
    use rmcp::ServiceExt;

    let server = TraceMcpServer::new(db_path);
    let service = server.serve(stdio()).await?;
    service.waiting().await?;
    Ok(())
}
