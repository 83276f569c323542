//! End-to-end pipeline runs against a temp site.
//!
//! The renderer is replaced by an in-process fake and the Slack webhook by a
//! wiremock server, so these tests exercise every step without external tools.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use identus_report::environment::{RunnerConfig, RunnerConfigs, ServiceConfig, Services, Workflow};
use identus_report::{
    Component, Environment, FailureNotifier, NotifyStatus, PipelineConfig, ReportError,
    ReportPipeline, ReportRenderer, ReportResult, ReportTarget, RunStatus, SlackNotifier,
};
use serde_json::json;
use tempfile::TempDir;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Writes `index.html`, `app.js` and a one-file `history/` like the real renderer.
#[derive(Default)]
struct FakeRenderer {
    calls: AtomicUsize,
    fail: bool,
}

#[async_trait]
impl ReportRenderer for FakeRenderer {
    async fn render(&self, input: &Path, output: &Path) -> ReportResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(ReportError::Renderer {
                message: "renderer exploded".into(),
            });
        }
        let _ = std::fs::remove_dir_all(output);
        std::fs::create_dir_all(output.join("history")).unwrap();
        let results = std::fs::read_dir(input)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with("-result.json"))
            .count();
        std::fs::write(output.join("index.html"), format!("{} results", results)).unwrap();
        std::fs::write(output.join("app.js"), "var app;").unwrap();
        std::fs::write(output.join("history").join("history.json"), "{}").unwrap();
        Ok(())
    }
}

struct Site {
    _tmp: TempDir,
    root: PathBuf,
    work: PathBuf,
}

impl Site {
    fn new() -> Self {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("public");
        let work = tmp.path().join("tmp");
        Self {
            _tmp: tmp,
            root,
            work,
        }
    }

    fn config(&self) -> PipelineConfig {
        PipelineConfig::default()
            .with_site_root(&self.root)
            .with_work_root(&self.work)
            .with_site_url(Url::parse("https://example.org/integration/").unwrap())
            .with_workflow_url("https://ci.example/runs/")
    }

    fn seed(&self, runner: &str, statuses: &[(&str, &str)]) {
        let dir = self.work.join(runner);
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        for (i, (case, status)) in statuses.iter().enumerate() {
            let body = json!({
                "uuid": format!("{}-{}", runner, i),
                "testCaseId": case,
                "status": status,
                "labels": [{"name": "feature", "value": "connections"}],
            });
            std::fs::write(dir.join(format!("{}-{}-result.json", runner, i)), body.to_string())
                .unwrap();
        }
    }

    fn reports(&self, component: &str) -> PathBuf {
        self.root.join("reports").join(component)
    }
}

fn env(component: Component, release_version: Option<&str>) -> Environment {
    let enabled = |version: &str| RunnerConfig {
        enabled: true,
        build: false,
        version: version.to_string(),
    };
    Environment {
        component,
        release_version: release_version.map(str::to_string),
        workflow: Workflow { run_id: Some(777) },
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
            sdk_ts: enabled("7.0.0"),
            sdk_kmp: RunnerConfig::default(),
            sdk_swift: enabled("6.1.0"),
        },
    }
}

fn pipeline(site: &Site, renderer: Arc<FakeRenderer>, webhook: Option<Url>) -> ReportPipeline {
    let transport = webhook.map(|url| {
        Arc::new(SlackNotifier::new(url).unwrap()) as Arc<dyn identus_report::Notifier>
    });
    ReportPipeline::new(site.config(), renderer, FailureNotifier::new(transport))
}

async fn slack(status: u16, expected_calls: u64) -> (MockServer, Url) {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(status))
        .expect(expected_calls)
        .mount(&server)
        .await;
    let url = Url::parse(&format!("{}/hook", server.uri())).unwrap();
    (server, url)
}

#[tokio::test]
async fn test_clean_run_publishes_without_notifying() {
    let site = Site::new();
    site.seed("sdk-ts", &[("a", "passed"), ("b", "skipped")]);
    site.seed("sdk-swift", &[("c", "failed"), ("c", "passed")]);
    let (_server, hook) = slack(200, 0).await;

    let renderer = Arc::new(FakeRenderer::default());
    let outcome = pipeline(&site, renderer.clone(), Some(hook))
        .run(&env(Component::Weekly, None))
        .await;

    assert_eq!(outcome.status(), RunStatus::Passed);
    assert!(matches!(outcome.notification, NotifyStatus::NotRequired));
    assert_eq!(outcome.target, Some(ReportTarget::Numbered(1)));
    assert_eq!(outcome.report_url, "https://example.org/integration/weekly/1");

    let aggregate = outcome.aggregate.as_ref().unwrap();
    assert_eq!(aggregate.stats.total, 4);
    assert_eq!(aggregate.stats.failed, 1);
    assert!(aggregate.stats.is_consistent());

    let report = site.reports("weekly").join("1");
    assert_eq!(std::fs::read_to_string(report.join("index.html")).unwrap(), "4 results");
    assert!(site.reports("weekly").join("index.html").is_file());
    assert!(site.root.join("latest-history").join("weekly").join("history.json").is_file());
    assert_eq!(renderer.calls.load(Ordering::SeqCst), 1);

    let staged = site.work.join("results").join("environment.properties");
    let props = std::fs::read_to_string(staged).unwrap();
    assert!(props.contains("sdk-ts: 7.0.0"));
    assert!(!props.contains("sdk-kmp"));

    let rewritten: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(site.work.join("sdk-ts").join("sdk-ts-0-result.json")).unwrap(),
    )
    .unwrap();
    let labels = rewritten["labels"].as_array().unwrap();
    assert!(labels.contains(&json!({"name": "suite", "value": "sdk-ts"})));
    assert!(labels.contains(&json!({"name": "epic", "value": "sdk-ts"})));
}

#[tokio::test]
async fn test_failed_tests_notify_exactly_once() {
    let site = Site::new();
    site.seed("sdk-ts", &[("a", "failed")]);
    site.seed("sdk-swift", &[("b", "passed")]);
    let (server, hook) = slack(200, 1).await;

    let outcome = pipeline(&site, Arc::new(FakeRenderer::default()), Some(hook))
        .run(&env(Component::SdkTs, None))
        .await;

    assert_eq!(outcome.status(), RunStatus::TestsFailed);
    assert!(matches!(outcome.notification, NotifyStatus::Delivered));

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    let text = body["text"].as_str().unwrap();
    assert!(text.starts_with(":x: Integration of `sdk-ts` (7.0.0) failed"));
    assert!(text.contains("<https://example.org/integration/typescript/1|Report>"));
    assert!(text.contains("<https://ci.example/runs/777|Workflow execution>"));
}

#[tokio::test]
async fn test_missing_runner_results_fail_the_run() {
    let site = Site::new();
    site.seed("sdk-ts", &[("a", "passed")]);

    let outcome = pipeline(&site, Arc::new(FakeRenderer::default()), None)
        .run(&env(Component::Manual, None))
        .await;

    assert_eq!(outcome.status(), RunStatus::TestsFailed);
    assert!(matches!(outcome.notification, NotifyStatus::Skipped));
    let errors: Vec<_> = outcome.aggregate.as_ref().unwrap().errors().collect();
    assert_eq!(errors.len(), 1);
    assert!(site.reports("manual").join("1").is_dir());
}

#[tokio::test]
async fn test_step_error_still_notifies_and_transport_failure_is_fatal() {
    let site = Site::new();
    site.seed("sdk-ts", &[("a", "passed")]);
    site.seed("sdk-swift", &[("b", "passed")]);
    let (_server, hook) = slack(500, 1).await;

    let renderer = Arc::new(FakeRenderer {
        fail: true,
        ..Default::default()
    });
    let outcome = pipeline(&site, renderer, Some(hook))
        .run(&env(Component::Mediator, None))
        .await;

    assert!(outcome.execution_passed());
    assert!(matches!(outcome.step_error, Some(ReportError::Renderer { .. })));
    assert_eq!(outcome.status(), RunStatus::NotificationFailed);
    assert!(outcome.into_result().unwrap_err().is_notification());
}

#[tokio::test]
async fn test_history_window_across_runs() {
    let site = Site::new();
    site.seed("sdk-ts", &[("a", "passed")]);
    site.seed("sdk-swift", &[("b", "passed")]);
    let p = pipeline(&site, Arc::new(FakeRenderer::default()), None);
    let e = env(Component::CloudAgent, None);

    for expected in 1..=12u64 {
        let outcome = p.run(&e).await;
        assert_eq!(outcome.target, Some(ReportTarget::Numbered(expected)));
    }

    let mut ids: Vec<u64> = std::fs::read_dir(site.reports("cloud-agent"))
        .unwrap()
        .filter_map(|e| e.ok()?.file_name().to_str()?.parse().ok())
        .collect();
    ids.sort_unstable();
    assert_eq!(ids, (3..=12).collect::<Vec<_>>());
    let index = std::fs::read_to_string(site.reports("cloud-agent").join("index.html")).unwrap();
    assert!(index.contains("\"12/?c=\""));
}

#[tokio::test]
async fn test_release_draft_then_final() {
    let site = Site::new();
    site.seed("sdk-ts", &[("a", "passed")]);
    site.seed("sdk-swift", &[("b", "passed")]);
    let p = pipeline(&site, Arc::new(FakeRenderer::default()), None);

    let draft = p.run(&env(Component::Release, Some("2.0.0-draft"))).await;
    assert_eq!(draft.status(), RunStatus::Passed);
    let release_root = site.reports("release");
    assert!(release_root.join("2.0.0-draft").join("release-info.json").is_file());

    p.run(&env(Component::Release, Some("1.0.0"))).await;
    let final_run = p.run(&env(Component::Release, Some("2.0.0"))).await;
    assert_eq!(final_run.status(), RunStatus::Passed);
    assert_eq!(
        final_run.report_url,
        "https://example.org/integration/release/2.0.0"
    );

    assert!(!release_root.join("2.0.0-draft").exists());
    let info: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(release_root.join("2.0.0").join("release-info.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(info["status"], "released");
    assert_eq!(info["testResults"]["total"], 2);
    assert_eq!(info["workflow"]["url"], "https://ci.example/runs/777");

    let manifest: Vec<serde_json::Value> = serde_json::from_str(
        &std::fs::read_to_string(release_root.join("releases.json")).unwrap(),
    )
    .unwrap();
    let versions: Vec<&str> = manifest.iter().map(|e| e["version"].as_str().unwrap()).collect();
    assert_eq!(versions, vec!["2.0.0", "1.0.0"]);
    assert_eq!(manifest[0]["path"], "./2.0.0/index.html");
    assert!(!release_root.join("index.html").exists());
}

#[tokio::test]
async fn test_release_without_version_is_a_step_error() {
    let site = Site::new();
    let (_server, hook) = slack(200, 1).await;

    let outcome = pipeline(&site, Arc::new(FakeRenderer::default()), Some(hook))
        .run(&env(Component::Release, None))
        .await;

    assert_eq!(outcome.status(), RunStatus::StepFailed);
    assert!(matches!(
        outcome.step_error,
        Some(ReportError::InvalidReleaseVersion { .. })
    ));
    assert!(matches!(outcome.notification, NotifyStatus::Delivered));
    assert_eq!(outcome.report_url, "https://example.org/integration/release");
}
