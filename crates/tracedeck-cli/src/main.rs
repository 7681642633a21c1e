use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use tracedeck_core::config::TraceConfig;

mod commands;
mod output;

#[derive(Parser)]
#[command(
    name = "tracedeck",
    version,
    about = "Structured trace store and analytics for agent frameworks"
)]
struct Cli {
    /// Increase verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Output format
    #[arg(long, global = true, default_value = "text")]
    format: output::OutputFormat,

    /// Database file (defaults to $TRACEDECK_DB, then ./tracedeck.db)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: commands::Commands,
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match &cli.db {
        Some(path) => TraceConfig::with_db_path(path.clone()),
        None => TraceConfig::from_env(),
    };

    match &cli.command {
        commands::Commands::Ingest(args) => commands::ingest::run(args, &config),
        commands::Commands::Log(args) => commands::log::run(args, &config, cli.format),
        commands::Commands::Show(args) => commands::show::run(args, &config, cli.format),
        commands::Commands::Delete(args) => commands::delete::run(args, &config),
        commands::Commands::Sample(args) => commands::sample::run(args, &config),
        commands::Commands::Stats => commands::stats::run(&config, cli.format),
        commands::Commands::Mcp => commands::mcp::run(&config),
        commands::Commands::Version => commands::version::run(),
    }
}
