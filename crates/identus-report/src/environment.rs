//! Typed pipeline environment.
//!
//! The environment is produced upstream (version discovery) and handed to the
//! pipeline as a base64-encoded JSON blob. [`Environment::decode`] is the only
//! place that touches the encoded form; everything downstream borrows the
//! typed value.

use std::fmt;

use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::{ReportError, ReportResult};

/// One SDK test runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Runner {
    #[serde(rename = "sdk-ts")]
    SdkTs,
    #[serde(rename = "sdk-kmp")]
    SdkKmp,
    #[serde(rename = "sdk-swift")]
    SdkSwift,
}

impl Runner {
    /// All runners, in environment file order.
    pub const ALL: [Runner; 3] = [Runner::SdkTs, Runner::SdkKmp, Runner::SdkSwift];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::SdkTs => "sdk-ts",
            Self::SdkKmp => "sdk-kmp",
            Self::SdkSwift => "sdk-swift",
        }
    }
}

impl fmt::Display for Runner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Subject of one pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Component {
    SdkTs,
    SdkKmp,
    SdkSwift,
    CloudAgent,
    Mediator,
    PrismNode,
    Weekly,
    Manual,
    Release,
}

impl Component {
    pub const ALL: [Component; 9] = [
        Component::SdkTs,
        Component::SdkKmp,
        Component::SdkSwift,
        Component::CloudAgent,
        Component::Mediator,
        Component::PrismNode,
        Component::Weekly,
        Component::Manual,
        Component::Release,
    ];

    /// Directory name under `reports/`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SdkTs => "sdk-ts",
            Self::SdkKmp => "sdk-kmp",
            Self::SdkSwift => "sdk-swift",
            Self::CloudAgent => "cloud-agent",
            Self::Mediator => "mediator",
            Self::PrismNode => "prism-node",
            Self::Weekly => "weekly",
            Self::Manual => "manual",
            Self::Release => "release",
        }
    }

    /// Path segment used by the site router for this component.
    pub fn route_segment(self) -> &'static str {
        match self {
            Self::SdkTs => "typescript",
            Self::SdkKmp => "kotlin",
            Self::SdkSwift => "swift",
            other => other.as_str(),
        }
    }

    pub fn is_release(self) -> bool {
        matches!(self, Self::Release)
    }

    /// The runner this component tests, for single-SDK components.
    pub fn runner(self) -> Option<Runner> {
        match self {
            Self::SdkTs => Some(Runner::SdkTs),
            Self::SdkKmp => Some(Runner::SdkKmp),
            Self::SdkSwift => Some(Runner::SdkSwift),
            _ => None,
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workflow {
    /// CI workflow run id; absent for local runs.
    #[serde(default)]
    pub run_id: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub version: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Services {
    pub agent: ServiceConfig,
    pub mediator: ServiceConfig,
    pub node: ServiceConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunnerConfig {
    pub enabled: bool,
    /// Build the SDK from source instead of using a published package.
    #[serde(default)]
    pub build: bool,
    #[serde(default)]
    pub version: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunnerConfigs {
    #[serde(rename = "sdk-ts")]
    pub sdk_ts: RunnerConfig,
    #[serde(rename = "sdk-kmp")]
    pub sdk_kmp: RunnerConfig,
    #[serde(rename = "sdk-swift")]
    pub sdk_swift: RunnerConfig,
}

/// Immutable input of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Environment {
    pub component: Component,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_version: Option<String>,
    #[serde(default)]
    pub workflow: Workflow,
    pub services: Services,
    pub runners: RunnerConfigs,
}

impl Environment {
    /// Decode the base64-encoded JSON blob handed over by the CI workflow.
    pub fn decode(blob: &str) -> ReportResult<Self> {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(blob.trim())
            .map_err(|e| ReportError::Environment {
                message: format!("not valid base64: {}", e),
            })?;
        serde_json::from_slice(&bytes).map_err(|e| ReportError::Environment {
            message: format!("not a valid environment document: {}", e),
        })
    }

    /// Encode into the same representation [`Environment::decode`] accepts.
    pub fn encode(&self) -> ReportResult<String> {
        let json = serde_json::to_vec(self).map_err(|e| ReportError::Environment {
            message: e.to_string(),
        })?;
        Ok(base64::engine::general_purpose::STANDARD.encode(json))
    }

    pub fn runner(&self, runner: Runner) -> &RunnerConfig {
        match runner {
            Runner::SdkTs => &self.runners.sdk_ts,
            Runner::SdkKmp => &self.runners.sdk_kmp,
            Runner::SdkSwift => &self.runners.sdk_swift,
        }
    }

    pub fn enabled_runners(&self) -> Vec<Runner> {
        Runner::ALL
            .into_iter()
            .filter(|r| self.runner(*r).enabled)
            .collect()
    }

    /// Run id as rendered in reports and links (`null` when unknown).
    pub fn run_id_label(&self) -> String {
        self.workflow
            .run_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "null".to_string())
    }
}
