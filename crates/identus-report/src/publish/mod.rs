//! Report publishing: stage metadata, render, post-process, link.
//!
//! Site layout:
//!
//! ```text
//! <site_root>/
//!   reports/<component>/<id>/      # numbered report (non-release)
//!   reports/<component>/index.html # redirect to the newest id
//!   reports/release/<version>/     # release snapshot
//!   latest-history/<component>/    # trend data carried between runs
//! ```

pub mod environment_file;
pub mod postprocess;
pub mod redirect;
pub mod renderer;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::fs;
use tracing::{info, warn};
use url::Url;

use crate::environment::{Component, Environment};
use crate::error::{ReportError, ReportResult};
use crate::io;
use crate::release::METADATA_FILE;

pub use environment_file::{environment_properties, ExecutorInfo, ENVIRONMENT_FILE, EXECUTOR_FILE};
pub use postprocess::{navigation_script, postprocess_report, rewrite_app_js};
pub use redirect::{redirect_page, INDEX_FILE};
pub use renderer::{CommandRenderer, ReportRenderer, DEFAULT_RENDERER};

/// Directory holding trend data inside a staged or rendered report.
pub const HISTORY_DIR: &str = "history";

/// Paths below the site root.
#[derive(Debug, Clone)]
pub struct SiteLayout {
    site_root: PathBuf,
}

impl SiteLayout {
    pub fn new(site_root: impl Into<PathBuf>) -> Self {
        Self {
            site_root: site_root.into(),
        }
    }

    pub fn site_root(&self) -> &Path {
        &self.site_root
    }

    pub fn component_dir(&self, component: Component) -> PathBuf {
        self.site_root.join("reports").join(component.as_str())
    }

    pub fn report_dir(&self, component: Component, target: &ReportTarget) -> PathBuf {
        self.component_dir(component).join(target.segment())
    }

    pub fn latest_history(&self, component: Component) -> PathBuf {
        self.site_root.join("latest-history").join(component.as_str())
    }

    pub fn release_root(&self) -> PathBuf {
        self.component_dir(Component::Release)
    }
}

/// Where one run's report lands below its component directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportTarget {
    Numbered(u64),
    Release(String),
}

impl ReportTarget {
    pub fn segment(&self) -> String {
        match self {
            Self::Numbered(id) => id.to_string(),
            Self::Release(version) => version.clone(),
        }
    }
}

/// Public URLs of a report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportLinks {
    /// The rendered report itself: `<site>reports/<component>/<segment>`.
    pub inner: String,
    /// The report as routed by the site frame: `<site><route>/<segment>`.
    pub external: String,
    /// Path of the site URL, e.g. `/integration/`; prefixes every routed path.
    pub base_path: String,
}

impl ReportLinks {
    /// Links for `segment`, or for the component page when no report exists yet.
    pub fn new(site_url: &Url, component: Component, segment: Option<&str>) -> ReportResult<Self> {
        let (inner, external) = match segment {
            Some(segment) => (
                format!("reports/{}/{}", component, segment),
                format!("{}/{}", component.route_segment(), segment),
            ),
            None => (
                format!("reports/{}/", component),
                component.route_segment().to_string(),
            ),
        };
        let join = |path: &str| {
            site_url
                .join(path)
                .map(String::from)
                .map_err(|e| ReportError::Config {
                    message: format!("cannot build report URL from {}: {}", site_url, e),
                })
        };
        Ok(Self {
            inner: join(&inner)?,
            external: join(&external)?,
            base_path: site_url.path().to_string(),
        })
    }
}

/// Everything [`Publisher::publish`] needs for one report.
#[derive(Debug, Clone, Copy)]
pub struct PublishRequest<'a> {
    pub env: &'a Environment,
    pub target: &'a ReportTarget,
    pub staging_dir: &'a Path,
    pub links: &'a ReportLinks,
    pub workflow_url: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedReport {
    pub report_dir: PathBuf,
    pub history_carried: bool,
}

pub struct Publisher {
    layout: SiteLayout,
    renderer: Arc<dyn ReportRenderer>,
}

impl Publisher {
    pub fn new(layout: SiteLayout, renderer: Arc<dyn ReportRenderer>) -> Self {
        Self { layout, renderer }
    }

    pub fn layout(&self) -> &SiteLayout {
        &self.layout
    }

    pub async fn publish(&self, req: PublishRequest<'_>) -> ReportResult<PublishedReport> {
        let component = req.env.component;
        let executor = ExecutorInfo::new(req.env, &req.links.inner, req.workflow_url);
        environment_file::write_environment_files(req.staging_dir, req.env, &executor).await?;

        let mut history_carried = false;
        if !component.is_release() {
            history_carried = self.carry_history_in(component, req.staging_dir).await?;
        }

        let report_dir = self.layout.report_dir(component, req.target);
        self.renderer.render(req.staging_dir, &report_dir).await?;
        postprocess_report(&report_dir, &req.links.base_path).await?;

        match req.target {
            ReportTarget::Numbered(id) => {
                let index = self.layout.component_dir(component).join(INDEX_FILE);
                io::write_atomic(&index, &redirect_page(component, *id, &req.links.base_path)).await?;
                self.carry_history_out(component, &report_dir).await?;
            }
            ReportTarget::Release(_) => {
                let from = req.staging_dir.join(METADATA_FILE);
                let to = report_dir.join(METADATA_FILE);
                fs::copy(&from, &to)
                    .await
                    .map_err(|e| ReportError::io(&from, e))?;
            }
        }

        info!(
            component = %component,
            report = %req.target.segment(),
            url = %req.links.external,
            "report published"
        );
        Ok(PublishedReport {
            report_dir,
            history_carried,
        })
    }

    async fn carry_history_in(&self, component: Component, staging_dir: &Path) -> ReportResult<bool> {
        let latest = self.layout.latest_history(component);
        if !latest.is_dir() {
            warn!(component = %component, "history not found, skipping");
            return Ok(false);
        }
        let copied = io::copy_dir_contents(&latest, &staging_dir.join(HISTORY_DIR)).await?;
        Ok(copied > 0)
    }

    async fn carry_history_out(&self, component: Component, report_dir: &Path) -> ReportResult<()> {
        let rendered = report_dir.join(HISTORY_DIR);
        if !rendered.is_dir() {
            warn!(component = %component, "rendered report has no history, latest history unchanged");
            return Ok(());
        }
        io::copy_dir_contents(&rendered, &self.layout.latest_history(component)).await?;
        Ok(())
    }
}
