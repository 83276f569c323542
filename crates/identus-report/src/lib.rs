//! Report and release pipeline for Identus integration test runs.
//!
//! After the SDK runners have written their raw result files, this crate:
//!
//! - Normalizes each runner's results (labels, pass/fail with retry dedup)
//! - Merges all runners into one staging directory and sums their statistics
//! - Reserves the report slot: a numbered report inside a bounded history
//!   window, or a versioned release snapshot with draft promotion
//! - Renders and publishes the report into the static site
//! - Notifies on failure
//!
//! # Quick Start
//!
//! ```no_run
//! use identus_report::{Environment, PipelineConfig, ReportPipeline};
//!
//! # async fn example(blob: &str) -> identus_report::ReportResult<()> {
//! let env = Environment::decode(blob)?;
//! let pipeline = ReportPipeline::from_config(PipelineConfig::from_env()?)?;
//! let outcome = pipeline.run(&env).await;
//! println!("report: {} ({:?})", outcome.report_url, outcome.status());
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration
//!
//! | Environment Variable | Description |
//! |---------------------|-------------|
//! | `IDENTUS_SITE_ROOT` | Site root (default: `public`) |
//! | `IDENTUS_WORK_ROOT` | Runner results and staging (default: `tmp`) |
//! | `IDENTUS_SITE_URL` | Public site URL |
//! | `IDENTUS_WORKFLOW_URL` | Workflow run URL prefix |
//! | `IDENTUS_RENDERER` | Renderer command (default: `npx allure`) |
//! | `IDENTUS_RENDERER_TIMEOUT` | Renderer timeout in seconds |
//! | `SLACK_WEBHOOK` | Slack incoming webhook for failure notifications |
//! | `IDENTUS_DEDUP_POLICY` | `passed-wins` (default) or `worst-status-wins` |
//! | `IDENTUS_HISTORY_LIMIT` | Numbered reports kept per component (default: 10) |

pub mod aggregate;
pub mod config;
pub mod environment;
pub mod error;
pub mod history;
mod io;
pub mod model;
pub mod normalize;
pub mod notify;
pub mod pipeline;
pub mod publish;
pub mod release;

// Re-export main types
pub use aggregate::{AggregateOutcome, ResultAggregator};
pub use config::PipelineConfig;
pub use environment::{Component, Environment, Runner};
pub use error::{ReportError, ReportResult};
pub use history::{HistoryAdvance, HistoryWindow, DEFAULT_HISTORY_LIMIT};
pub use model::{RunnerOutcome, TestResult, TestStats, TestStatus};
pub use normalize::{normalize_runner, DedupPolicy};
pub use notify::{FailureMessage, FailureNotifier, Notifier, NotifyStatus, SlackNotifier};
pub use pipeline::{PipelineOutcome, ReportPipeline, RunStatus};
pub use publish::{
    CommandRenderer, PublishRequest, Publisher, ReportLinks, ReportRenderer, ReportTarget,
    SiteLayout,
};
pub use release::{
    ParsedVersion, ReleaseManager, ReleaseManifest, ReleaseManifestEntry, ReleaseMetadata,
    ReleaseStatus,
};
