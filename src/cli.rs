//! Command-line interface definition.

use std::path::PathBuf;

use clap::Parser;

/// Bounded-retry web automation agent.
#[derive(Debug, Parser)]
#[command(name = "webagent", version, about = "Bounded-retry web automation agent")]
pub struct CliArgs {
    /// Natural-language task, e.g. "Log into HackerNews. Username is 'bob'. Password is 'secret'."
    #[arg(long)]
    pub task: String,

    /// Target origin URL (typically the login page).
    #[arg(long)]
    pub domain: String,

    /// Path to a YAML config file.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Skip the pre-task crawl and plan without retrieved context.
    #[arg(long)]
    pub skip_crawl: bool,

    /// Dry-run with deterministic mock collaborators (no network, no model).
    #[arg(long)]
    pub offline: bool,

    /// Log level when RUST_LOG is unset.
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Force debug-level logging.
    #[arg(long)]
    pub debug: bool,
}
