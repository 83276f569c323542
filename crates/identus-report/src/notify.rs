//! Failure notifications.
//!
//! The pipeline asks [`FailureNotifier`] to report a failed run at most once.
//! Delivery goes through a [`Notifier`] transport; [`SlackNotifier`] posts to
//! an incoming webhook. A run without a transport only logs a warning, while a
//! transport that fails is reported back as [`NotifyStatus::Failed`] so the
//! caller can fail the run.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde_json::json;
use tracing::{error, info, warn};
use url::Url;

use crate::environment::{Component, Environment};
use crate::error::{ReportError, ReportResult};

const USER_AGENT_VALUE: &str = concat!("identus-report/", env!("CARGO_PKG_VERSION"));

/// Request timeout for webhook delivery.
pub const DEFAULT_NOTIFY_TIMEOUT_SECS: u64 = 30;

/// One rendered failure message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureMessage {
    pub component: Component,
    pub text: String,
}

impl FailureMessage {
    pub fn new(env: &Environment, report_url: &str, workflow_url: &str) -> Self {
        let subject = match version_annotation(env) {
            Some(annotation) => format!("`{}` ({})", env.component, annotation),
            None => format!("`{}`", env.component),
        };
        Self {
            component: env.component,
            text: format!(
                ":x: Integration of {} failed: <{}|Report> | <{}|Workflow execution>",
                subject, report_url, workflow_url
            ),
        }
    }
}

/// What was under test, as shown next to the component name.
fn version_annotation(env: &Environment) -> Option<String> {
    let annotation = match env.component {
        Component::Release => env.release_version.clone().unwrap_or_default(),
        Component::Weekly => "latest".to_string(),
        Component::CloudAgent => env.services.agent.version.clone(),
        Component::Mediator => env.services.mediator.version.clone(),
        Component::PrismNode => env.services.node.version.clone(),
        Component::SdkTs | Component::SdkKmp | Component::SdkSwift => env
            .component
            .runner()
            .map(|r| env.runner(r).version.clone())
            .unwrap_or_default(),
        Component::Manual => env
            .enabled_runners()
            .into_iter()
            .map(|r| format!("{}@{}", r, env.runner(r).version))
            .collect::<Vec<_>>()
            .join(", "),
    };
    (!annotation.is_empty()).then_some(annotation)
}

/// Only a failed or aborted run is reported.
pub fn should_notify(execution_passed: bool, exception_occurred: bool) -> bool {
    !execution_passed || exception_occurred
}

/// Message transport.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, message: &FailureMessage) -> ReportResult<()>;
}

/// Posts `{"text": ...}` to a Slack incoming webhook.
#[derive(Debug, Clone)]
pub struct SlackNotifier {
    client: reqwest::Client,
    webhook: Url,
}

impl SlackNotifier {
    pub fn new(webhook: Url) -> ReportResult<Self> {
        Self::with_timeout(webhook, Duration::from_secs(DEFAULT_NOTIFY_TIMEOUT_SECS))
    }

    pub fn with_timeout(webhook: Url, timeout: Duration) -> ReportResult<Self> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(default_headers)
            .build()
            .map_err(|e| ReportError::Config {
                message: format!("failed to create HTTP client: {}", e),
            })?;

        Ok(Self { client, webhook })
    }
}

#[async_trait]
impl Notifier for SlackNotifier {
    async fn send(&self, message: &FailureMessage) -> ReportResult<()> {
        let failed = |e: reqwest::Error| ReportError::Notification {
            component: message.component.to_string(),
            message: e.to_string(),
        };
        self.client
            .post(self.webhook.clone())
            .json(&json!({ "text": message.text }))
            .send()
            .await
            .map_err(failed)?
            .error_for_status()
            .map_err(failed)?;
        Ok(())
    }
}

/// Outcome of the notification step of one run.
#[derive(Debug)]
pub enum NotifyStatus {
    /// The run passed; nothing to report.
    NotRequired,
    /// The run failed but no transport is configured.
    Skipped,
    Delivered,
    Failed(ReportError),
}

impl NotifyStatus {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    pub fn error(&self) -> Option<&ReportError> {
        match self {
            Self::Failed(e) => Some(e),
            _ => None,
        }
    }
}

#[derive(Clone, Default)]
pub struct FailureNotifier {
    transport: Option<Arc<dyn Notifier>>,
}

impl FailureNotifier {
    pub fn new(transport: Option<Arc<dyn Notifier>>) -> Self {
        Self { transport }
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        self.transport.is_some()
    }

    pub async fn notify_failure(
        &self,
        env: &Environment,
        report_url: &str,
        workflow_url: &str,
    ) -> NotifyStatus {
        let Some(transport) = &self.transport else {
            warn!(component = %env.component, "webhook not set, skipping failure notification");
            return NotifyStatus::Skipped;
        };

        let message = FailureMessage::new(env, report_url, workflow_url);
        match transport.send(&message).await {
            Ok(()) => {
                info!(component = %env.component, "failure notification sent");
                NotifyStatus::Delivered
            }
            Err(e) => {
                error!(component = %env.component, error = %e, "failed to send failure notification");
                NotifyStatus::Failed(e)
            }
        }
    }
}

impl std::fmt::Debug for FailureNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FailureNotifier")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::{RunnerConfig, RunnerConfigs, ServiceConfig, Services, Workflow};
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn env(component: Component) -> Environment {
        Environment {
            component,
            release_version: Some("1.0.0-draft".into()),
            workflow: Workflow { run_id: Some(99) },
            services: Services {
                agent: ServiceConfig {
                    version: "2.1.0".into(),
                },
                mediator: ServiceConfig {
                    version: "1.2.0".into(),
                },
                node: ServiceConfig {
                    version: "2.5.0".into(),
                },
            },
            runners: RunnerConfigs {
                sdk_ts: RunnerConfig {
                    enabled: true,
                    build: false,
                    version: "7.0.0".into(),
                },
                sdk_kmp: RunnerConfig::default(),
                sdk_swift: RunnerConfig {
                    enabled: true,
                    build: false,
                    version: "6.1.0".into(),
                },
            },
        }
    }

    #[test]
    fn test_gating() {
        assert!(!should_notify(true, false));
        assert!(should_notify(false, false));
        assert!(should_notify(true, true));
        assert!(should_notify(false, true));
    }

    #[test]
    fn test_message_annotations() {
        let text = |c| FailureMessage::new(&env(c), "R", "W").text;
        assert_eq!(
            text(Component::SdkTs),
            ":x: Integration of `sdk-ts` (7.0.0) failed: <R|Report> | <W|Workflow execution>"
        );
        assert!(text(Component::Release).contains("`release` (1.0.0-draft)"));
        assert!(text(Component::Weekly).contains("`weekly` (latest)"));
        assert!(text(Component::PrismNode).contains("`prism-node` (2.5.0)"));
        assert!(text(Component::CloudAgent).contains("`cloud-agent` (2.1.0)"));
        assert!(text(Component::Manual).contains("`manual` (sdk-ts@7.0.0, sdk-swift@6.1.0)"));
        // sdk-kmp has no version configured
        assert!(text(Component::SdkKmp).contains("`sdk-kmp` failed"));
    }

    #[tokio::test]
    async fn test_missing_transport_is_skipped() {
        let status = FailureNotifier::disabled()
            .notify_failure(&env(Component::Weekly), "R", "W")
            .await;
        assert!(matches!(status, NotifyStatus::Skipped));
    }

    #[tokio::test]
    async fn test_slack_delivery() {
        let server = MockServer::start().await;
        let expected = FailureMessage::new(&env(Component::Mediator), "R", "W");
        Mock::given(method("POST"))
            .and(path("/hook"))
            .and(body_json(json!({ "text": expected.text })))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .expect(1)
            .mount(&server)
            .await;

        let webhook = Url::parse(&format!("{}/hook", server.uri())).unwrap();
        let notifier = FailureNotifier::new(Some(Arc::new(SlackNotifier::new(webhook).unwrap())));
        let status = notifier
            .notify_failure(&env(Component::Mediator), "R", "W")
            .await;
        assert!(matches!(status, NotifyStatus::Delivered));
    }

    #[tokio::test]
    async fn test_slack_error_status_is_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let webhook = Url::parse(&server.uri()).unwrap();
        let notifier = FailureNotifier::new(Some(Arc::new(SlackNotifier::new(webhook).unwrap())));
        let status = notifier.notify_failure(&env(Component::SdkTs), "R", "W").await;
        assert!(status.is_failed());
        assert!(status.error().unwrap().is_notification());
    }

    #[tokio::test]
    async fn test_unreachable_webhook_is_failure() {
        let webhook = Url::parse("http://127.0.0.1:9/hook").unwrap();
        let notifier = SlackNotifier::with_timeout(webhook, Duration::from_secs(2)).unwrap();
        let message = FailureMessage::new(&env(Component::Weekly), "R", "W");
        let err = notifier.send(&message).await.unwrap_err();
        assert!(matches!(err, ReportError::Notification { ref component, .. } if component == "weekly"));
    }
}
