//! `release-info.json` written next to each release snapshot.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::environment::{Environment, Services};
use crate::model::TestStats;

use super::version::is_draft;

/// File name of the metadata document.
pub const METADATA_FILE: &str = "release-info.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReleaseStatus {
    Draft,
    Released,
}

impl ReleaseStatus {
    pub fn for_version(version: &str) -> Self {
        if is_draft(version) {
            Self::Draft
        } else {
            Self::Released
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowLink {
    pub run_id: Option<u64>,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseMetadata {
    pub version: String,
    pub status: ReleaseStatus,
    pub components: Services,
    /// Runner name -> tested SDK version, every runner included.
    pub runners: BTreeMap<String, String>,
    pub test_results: TestStats,
    pub last_updated: String,
    pub workflow: WorkflowLink,
}

impl ReleaseMetadata {
    pub fn new(
        env: &Environment,
        version: &str,
        stats: TestStats,
        workflow_url: String,
        last_updated: String,
    ) -> Self {
        let runners = crate::environment::Runner::ALL
            .into_iter()
            .map(|r| (r.as_str().to_string(), env.runner(r).version.clone()))
            .collect();
        Self {
            version: version.to_string(),
            status: ReleaseStatus::for_version(version),
            components: env.services.clone(),
            runners,
            test_results: stats,
            last_updated,
            workflow: WorkflowLink {
                run_id: env.workflow.run_id,
                url: workflow_url,
            },
        }
    }
}
