use anyhow::{Context, Result};

use tracedeck_core::config::TraceConfig;

pub fn run(config: &TraceConfig) -> Result<()> {
    let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
    rt.block_on(async {
        tracedeck_mcp::run_stdio(config.db_path.clone())
            .await
            .map_err(|e| anyhow::anyhow!("MCP server error: {e}"))
    })
}
