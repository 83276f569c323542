//! Supporting files the renderer picks up from the staging directory.

use std::path::Path;

use serde::Serialize;

use crate::environment::Environment;
use crate::error::{ReportError, ReportResult};
use crate::io;

pub const ENVIRONMENT_FILE: &str = "environment.properties";
pub const EXECUTOR_FILE: &str = "executor.json";

/// `key: value` lines: services first, then every enabled runner.
pub fn environment_properties(env: &Environment) -> String {
    let mut lines = vec![
        format!("agent: {}", env.services.agent.version),
        format!("mediator: {}", env.services.mediator.version),
        format!("prism-node: {}", env.services.node.version),
    ];
    for runner in env.enabled_runners() {
        lines.push(format!("{}: {}", runner, env.runner(runner).version));
    }
    lines.join("\n")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutorInfo {
    pub report_name: String,
    pub report_url: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub build_name: Option<u64>,
    pub build_url: String,
}

impl ExecutorInfo {
    pub fn new(env: &Environment, report_url: &str, build_url: &str) -> Self {
        Self {
            report_name: format!("{} Integration", env.component),
            report_url: report_url.to_string(),
            name: "identus-integration".to_string(),
            kind: "github".to_string(),
            build_name: env.workflow.run_id,
            build_url: build_url.to_string(),
        }
    }
}

pub async fn write_environment_files(
    staging_dir: &Path,
    env: &Environment,
    executor: &ExecutorInfo,
) -> ReportResult<()> {
    io::write_atomic(
        &staging_dir.join(ENVIRONMENT_FILE),
        &environment_properties(env),
    )
    .await?;

    let json = serde_json::to_string_pretty(executor).map_err(|e| ReportError::Renderer {
        message: format!("failed to serialize executor info: {}", e),
    })?;
    io::write_atomic(&staging_dir.join(EXECUTOR_FILE), &json).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::{
        Component, RunnerConfig, RunnerConfigs, ServiceConfig, Services, Workflow,
    };

    fn env() -> Environment {
        Environment {
            component: Component::Manual,
            release_version: None,
            workflow: Workflow { run_id: None },
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
                    build: true,
                    version: "abc123".into(),
                },
                sdk_kmp: RunnerConfig {
                    enabled: false,
                    build: false,
                    version: "3.0.0".into(),
                },
                sdk_swift: RunnerConfig {
                    enabled: true,
                    build: false,
                    version: "6.1.0".into(),
                },
            },
        }
    }

    #[test]
    fn test_properties_list_only_enabled_runners() {
        assert_eq!(
            environment_properties(&env()),
            "agent: 2.1.0\nmediator: 1.2.0\nprism-node: 2.5.0\nsdk-ts: abc123\nsdk-swift: 6.1.0"
        );
    }

    #[test]
    fn test_executor_json_shape() {
        let info = ExecutorInfo::new(&env(), "https://site/reports/manual/3", "https://ci/runs/null");
        let v = serde_json::to_value(&info).unwrap();
        assert_eq!(v["reportName"], "manual Integration");
        assert_eq!(v["reportUrl"], "https://site/reports/manual/3");
        assert_eq!(v["name"], "identus-integration");
        assert_eq!(v["type"], "github");
        assert!(v["buildName"].is_null());
        assert_eq!(v["buildUrl"], "https://ci/runs/null");
    }

    #[tokio::test]
    async fn test_files_are_written_into_staging() {
        let tmp = tempfile::TempDir::new().unwrap();
        let e = env();
        let info = ExecutorInfo::new(&e, "u", "b");
        write_environment_files(tmp.path(), &e, &info).await.unwrap();
        assert!(tmp.path().join(ENVIRONMENT_FILE).is_file());
        assert!(tmp.path().join(EXECUTOR_FILE).is_file());
    }
}
