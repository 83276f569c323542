use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "identus-report",
    version,
    about = "Aggregate integration test results and publish versioned reports"
)]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Normalize runner results, render the report and notify on failure
    Report(ReportArgs),
    Version,
}

/// Flags override the `IDENTUS_*` environment configuration.
#[derive(Parser, Debug)]
pub struct ReportArgs {
    /// Base64-encoded environment document
    #[arg(long = "env", env = "ENV", hide_env_values = true)]
    pub environment: Option<String>,

    /// Root of the published site
    #[arg(long)]
    pub site_root: Option<PathBuf>,

    /// Directory holding one results directory per runner
    #[arg(long)]
    pub work_root: Option<PathBuf>,

    /// Public base URL of the site
    #[arg(long)]
    pub site_url: Option<String>,

    /// Workflow run URL prefix
    #[arg(long)]
    pub workflow_url: Option<String>,

    /// Renderer command line (e.g. "npx allure")
    #[arg(long)]
    pub renderer: Option<String>,

    /// Renderer timeout in seconds
    #[arg(long)]
    pub renderer_timeout: Option<u64>,

    /// passed-wins | worst-status-wins
    #[arg(long)]
    pub dedup_policy: Option<String>,

    /// Numbered reports kept per component
    #[arg(long)]
    pub history_limit: Option<usize>,

    /// Never send failure notifications
    #[arg(long)]
    pub no_notify: bool,
}
