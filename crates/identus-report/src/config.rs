//! Pipeline configuration.

use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;
use url::Url;

use crate::environment::Environment;
use crate::error::{ReportError, ReportResult};
use crate::history::DEFAULT_HISTORY_LIMIT;
use crate::normalize::DedupPolicy;
use crate::publish::{SiteLayout, DEFAULT_RENDERER};

pub const DEFAULT_SITE_URL: &str = "https://hyperledger-identus.github.io/integration/";
pub const DEFAULT_WORKFLOW_URL: &str =
    "https://github.com/hyperledger-identus/integration/actions/runs/";

/// Name of the merged results directory below the work root.
pub const STAGING_DIR: &str = "results";

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Root of the published site (`reports/`, `latest-history/`).
    pub site_root: PathBuf,
    /// Holds one result directory per runner plus the staging directory.
    pub work_root: PathBuf,
    /// Public base URL of the site; always ends with `/`.
    pub site_url: Url,
    /// Workflow run URL prefix; the run id is appended.
    pub workflow_url: String,
    pub renderer: String,
    pub renderer_timeout: Option<Duration>,
    pub slack_webhook: Option<Url>,
    pub dedup_policy: DedupPolicy,
    pub history_limit: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            site_root: PathBuf::from("public"),
            work_root: PathBuf::from("tmp"),
            site_url: default_site_url(),
            workflow_url: DEFAULT_WORKFLOW_URL.to_string(),
            renderer: DEFAULT_RENDERER.to_string(),
            renderer_timeout: None,
            slack_webhook: None,
            dedup_policy: DedupPolicy::default(),
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

fn default_site_url() -> Url {
    Url::parse(DEFAULT_SITE_URL).expect("static site url")
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn config_error(message: impl Into<String>) -> ReportError {
    ReportError::Config {
        message: message.into(),
    }
}

/// Parse a site URL, adding the trailing slash `Url::join` relies on.
pub fn parse_site_url(raw: &str) -> ReportResult<Url> {
    let mut raw = raw.trim().to_string();
    if !raw.ends_with('/') {
        raw.push('/');
    }
    let url = Url::parse(&raw).map_err(|e| config_error(format!("invalid site url '{}': {}", raw, e)))?;
    if url.cannot_be_a_base() {
        return Err(config_error(format!("site url '{}' cannot be a base url", raw)));
    }
    Ok(url)
}

/// Parse a webhook URL. An invalid value disables notifications with a warning.
pub fn parse_webhook(raw: &str) -> Option<Url> {
    match Url::parse(raw.trim()) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Some(url),
        Ok(url) => {
            warn!(scheme = url.scheme(), "webhook url is not http(s), notifications disabled");
            None
        }
        Err(e) => {
            warn!(error = %e, "invalid webhook url, notifications disabled");
            None
        }
    }
}

impl PipelineConfig {
    /// Create config from environment variables.
    ///
    /// | Variable | Description |
    /// |----------|-------------|
    /// | `IDENTUS_SITE_ROOT` | Site root directory |
    /// | `IDENTUS_WORK_ROOT` | Runner results / staging directory |
    /// | `IDENTUS_SITE_URL` | Public site base URL |
    /// | `IDENTUS_WORKFLOW_URL` | Workflow run URL prefix |
    /// | `IDENTUS_RENDERER` | Renderer command line |
    /// | `IDENTUS_RENDERER_TIMEOUT` | Renderer timeout in seconds |
    /// | `SLACK_WEBHOOK` | Slack incoming webhook |
    /// | `IDENTUS_DEDUP_POLICY` | `passed-wins` or `worst-status-wins` |
    /// | `IDENTUS_HISTORY_LIMIT` | Numbered reports kept per component |
    pub fn from_env() -> ReportResult<Self> {
        let mut config = Self::default();
        if let Some(v) = non_empty_var("IDENTUS_SITE_ROOT") {
            config.site_root = PathBuf::from(v);
        }
        if let Some(v) = non_empty_var("IDENTUS_WORK_ROOT") {
            config.work_root = PathBuf::from(v);
        }
        if let Some(v) = non_empty_var("IDENTUS_SITE_URL") {
            config.site_url = parse_site_url(&v)?;
        }
        if let Some(v) = non_empty_var("IDENTUS_WORKFLOW_URL") {
            config.workflow_url = v;
        }
        if let Some(v) = non_empty_var("IDENTUS_RENDERER") {
            config.renderer = v;
        }
        if let Some(v) = non_empty_var("IDENTUS_RENDERER_TIMEOUT") {
            let secs: u64 = v
                .trim()
                .parse()
                .map_err(|_| config_error(format!("IDENTUS_RENDERER_TIMEOUT must be seconds, got '{}'", v)))?;
            config.renderer_timeout = Some(Duration::from_secs(secs));
        }
        config.slack_webhook = non_empty_var("SLACK_WEBHOOK").and_then(|v| parse_webhook(&v));
        if let Some(v) = non_empty_var("IDENTUS_DEDUP_POLICY") {
            config.dedup_policy = v.parse()?;
        }
        if let Some(v) = non_empty_var("IDENTUS_HISTORY_LIMIT") {
            let limit: usize = v
                .trim()
                .parse()
                .map_err(|_| config_error(format!("IDENTUS_HISTORY_LIMIT must be a number, got '{}'", v)))?;
            config.history_limit = limit;
        }
        Ok(config)
    }

    pub fn with_site_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.site_root = path.into();
        self
    }

    pub fn with_work_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.work_root = path.into();
        self
    }

    pub fn with_site_url(mut self, url: Url) -> Self {
        self.site_url = url;
        self
    }

    pub fn with_workflow_url(mut self, url: impl Into<String>) -> Self {
        self.workflow_url = url.into();
        self
    }

    pub fn with_renderer(mut self, command: impl Into<String>) -> Self {
        self.renderer = command.into();
        self
    }

    pub fn with_renderer_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.renderer_timeout = timeout;
        self
    }

    pub fn with_slack_webhook(mut self, webhook: Option<Url>) -> Self {
        self.slack_webhook = webhook;
        self
    }

    pub fn with_dedup_policy(mut self, policy: DedupPolicy) -> Self {
        self.dedup_policy = policy;
        self
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    pub fn staging_dir(&self) -> PathBuf {
        self.work_root.join(STAGING_DIR)
    }

    pub fn site_layout(&self) -> SiteLayout {
        SiteLayout::new(&self.site_root)
    }

    /// Link to the CI run that produced `env`.
    pub fn workflow_run_url(&self, env: &Environment) -> String {
        format!("{}{}", self.workflow_url, env.run_id_label())
    }
}
