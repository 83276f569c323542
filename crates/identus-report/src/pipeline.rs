//! One report run for one [`Environment`].
//!
//! Steps run in order: reset staging, aggregate runner results, reserve the
//! report slot (history window or release manifest), publish. The first step
//! error aborts the remaining steps. Afterwards a failed or aborted run is
//! reported through the [`FailureNotifier`]; its outcome is kept apart from the
//! step error so the caller decides how the two combine.

use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info};

use crate::aggregate::{AggregateOutcome, ResultAggregator};
use crate::config::PipelineConfig;
use crate::environment::{Component, Environment};
use crate::error::{ReportError, ReportResult};
use crate::history::HistoryWindow;
use crate::io;
use crate::notify::{should_notify, FailureNotifier, Notifier, NotifyStatus, SlackNotifier};
use crate::publish::{
    CommandRenderer, PublishRequest, Publisher, ReportLinks, ReportRenderer, ReportTarget,
    HISTORY_DIR,
};
use crate::release::{ReleaseManager, ReleaseMetadata};

/// Overall verdict of a run, most severe first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    NotificationFailed,
    StepFailed,
    TestsFailed,
    Passed,
}

#[derive(Debug)]
pub struct PipelineOutcome {
    pub component: Component,
    pub aggregate: Option<AggregateOutcome>,
    pub target: Option<ReportTarget>,
    /// URL of the published report, or of the component page when none was reserved.
    pub report_url: String,
    pub step_error: Option<ReportError>,
    pub notification: NotifyStatus,
}

impl PipelineOutcome {
    /// Whether every enabled runner passed. False when aggregation never ran.
    pub fn execution_passed(&self) -> bool {
        self.aggregate
            .as_ref()
            .map(|a| a.execution_passed)
            .unwrap_or(false)
    }

    pub fn status(&self) -> RunStatus {
        if self.notification.is_failed() {
            RunStatus::NotificationFailed
        } else if self.step_error.is_some() {
            RunStatus::StepFailed
        } else if !self.execution_passed() {
            RunStatus::TestsFailed
        } else {
            RunStatus::Passed
        }
    }

    /// Collapse into a single result: the notification error wins over the step error.
    pub fn into_result(self) -> ReportResult<Option<AggregateOutcome>> {
        if let NotifyStatus::Failed(e) = self.notification {
            return Err(e);
        }
        match self.step_error {
            Some(e) => Err(e),
            None => Ok(self.aggregate),
        }
    }
}

#[derive(Default)]
struct RunState {
    aggregate: Option<AggregateOutcome>,
    target: Option<ReportTarget>,
}

pub struct ReportPipeline {
    config: PipelineConfig,
    renderer: Arc<dyn ReportRenderer>,
    notifier: FailureNotifier,
}

impl ReportPipeline {
    pub fn new(
        config: PipelineConfig,
        renderer: Arc<dyn ReportRenderer>,
        notifier: FailureNotifier,
    ) -> Self {
        Self {
            config,
            renderer,
            notifier,
        }
    }

    /// Renderer command and Slack transport taken from `config`.
    pub fn from_config(config: PipelineConfig) -> ReportResult<Self> {
        let renderer = CommandRenderer::from_command_line(&config.renderer)?
            .with_timeout(config.renderer_timeout);
        let transport = match &config.slack_webhook {
            Some(webhook) => {
                Some(Arc::new(SlackNotifier::new(webhook.clone())?) as Arc<dyn Notifier>)
            }
            None => None,
        };
        Ok(Self::new(
            config,
            Arc::new(renderer),
            FailureNotifier::new(transport),
        ))
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub async fn run(&self, env: &Environment) -> PipelineOutcome {
        info!(
            component = %env.component,
            run_id = %env.run_id_label(),
            runners = ?env.enabled_runners(),
            "report pipeline started"
        );

        let mut state = RunState::default();
        let step_error = self.execute(env, &mut state).await.err();
        if let Some(e) = &step_error {
            error!(component = %env.component, error = %e, "report pipeline step failed");
        }

        let segment = state.target.as_ref().map(ReportTarget::segment);
        let report_url = ReportLinks::new(&self.config.site_url, env.component, segment.as_deref())
            .map(|links| links.external)
            .unwrap_or_else(|_| self.config.site_url.to_string());

        let execution_passed = state
            .aggregate
            .as_ref()
            .map(|a| a.execution_passed)
            .unwrap_or(false);
        let notification = if should_notify(execution_passed, step_error.is_some()) {
            self.notifier
                .notify_failure(env, &report_url, &self.config.workflow_run_url(env))
                .await
        } else {
            NotifyStatus::NotRequired
        };

        let outcome = PipelineOutcome {
            component: env.component,
            aggregate: state.aggregate,
            target: state.target,
            report_url,
            step_error,
            notification,
        };
        info!(
            component = %outcome.component,
            status = ?outcome.status(),
            report = %outcome.report_url,
            "report pipeline finished"
        );
        outcome
    }

    async fn execute(&self, env: &Environment, state: &mut RunState) -> ReportResult<()> {
        let staging = self.config.staging_dir();
        io::reset_dir(&staging).await?;
        io::create_dir_all(&staging.join(HISTORY_DIR)).await?;

        let aggregator =
            ResultAggregator::new(&self.config.work_root, &staging, self.config.dedup_policy);
        let aggregate = aggregator.aggregate(&env.enabled_runners()).await;
        let stats = aggregate.stats;
        state.aggregate = Some(aggregate);

        let layout = self.config.site_layout();
        let workflow_url = self.config.workflow_run_url(env);
        let target = if env.component.is_release() {
            let version = env
                .release_version
                .as_deref()
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| ReportError::InvalidReleaseVersion {
                    version: String::new(),
                    reason: "release component requires releaseVersion".to_string(),
                })?;
            let today = Utc::now().format("%Y-%m-%d").to_string();
            let metadata = ReleaseMetadata::new(env, version, stats, workflow_url.clone(), today);
            ReleaseManager::new(layout.release_root())
                .prepare(&metadata, &staging)
                .await?;
            ReportTarget::Release(version.to_string())
        } else {
            let window = HistoryWindow::with_limit(
                layout.component_dir(env.component),
                self.config.history_limit,
            );
            ReportTarget::Numbered(window.advance().await?.next_report_id)
        };
        state.target = Some(target.clone());

        let links = ReportLinks::new(&self.config.site_url, env.component, Some(&target.segment()))?;
        Publisher::new(layout, Arc::clone(&self.renderer))
            .publish(PublishRequest {
                env,
                target: &target,
                staging_dir: &staging,
                links: &links,
                workflow_url: &workflow_url,
            })
            .await?;
        Ok(())
    }
}
