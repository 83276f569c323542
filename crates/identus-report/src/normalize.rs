//! Per-runner result normalization.
//!
//! Every `*-result.json` file of a runner gets a `suite` label (and an `epic`
//! label when it carries a `feature`) naming the runner, so the merged report
//! groups results by SDK. Counting and pass/fail resolution happen in the
//! same pass.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, warn};

use crate::environment::Runner;
use crate::error::{ReportError, ReportResult};
use crate::model::{RunnerOutcome, TestResult, TestStats, TestStatus};

/// File name suffix of raw result records.
pub const RESULT_SUFFIX: &str = "-result.json";

/// How repeated attempts of one test case resolve to a single status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DedupPolicy {
    /// A passed attempt sticks; otherwise the attempt read last wins.
    ///
    /// "Last" follows directory listing order, which is not stable across
    /// filesystems when a case has several non-passing attempts.
    #[default]
    PassedWins,
    /// A passed attempt sticks; otherwise the most severe status wins.
    WorstStatusWins,
}

impl FromStr for DedupPolicy {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "passed-wins" => Ok(Self::PassedWins),
            "worst-status-wins" => Ok(Self::WorstStatusWins),
            other => Err(ReportError::Config {
                message: format!(
                    "unknown dedup policy '{}' (expected passed-wins or worst-status-wins)",
                    other
                ),
            }),
        }
    }
}

impl fmt::Display for DedupPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PassedWins => f.write_str("passed-wins"),
            Self::WorstStatusWins => f.write_str("worst-status-wins"),
        }
    }
}

/// Resolved status per test case.
#[derive(Debug, Clone, Default)]
pub struct CaseVerdicts {
    policy: DedupPolicy,
    cases: HashMap<String, TestStatus>,
}

impl CaseVerdicts {
    pub fn new(policy: DedupPolicy) -> Self {
        Self {
            policy,
            cases: HashMap::new(),
        }
    }

    /// Fold one attempt of `case_id` into the map.
    pub fn observe(&mut self, case_id: &str, status: TestStatus) {
        let resolved = match (self.cases.get(case_id).copied(), self.policy) {
            (Some(TestStatus::Passed), _) => return,
            (None, _) | (Some(_), DedupPolicy::PassedWins) => status,
            (Some(prev), DedupPolicy::WorstStatusWins) => {
                if status == TestStatus::Passed || status.severity() > prev.severity() {
                    status
                } else {
                    prev
                }
            }
        };
        self.cases.insert(case_id.to_string(), resolved);
    }

    pub fn status(&self, case_id: &str) -> Option<TestStatus> {
        self.cases.get(case_id).copied()
    }

    /// True iff no case resolved to failed, broken or unknown.
    pub fn passed(&self) -> bool {
        !self.cases.values().any(|s| s.is_failing())
    }
}

/// Attach the runner labels to one record.
pub fn label_for_runner(result: TestResult, runner: Runner) -> TestResult {
    let result = result.with_label("suite", runner.as_str());
    if result.label("feature").is_some() {
        result.with_label("epic", runner.as_str())
    } else {
        result
    }
}

async fn read_result(path: &Path) -> ReportResult<TestResult> {
    let raw = fs::read_to_string(path)
        .await
        .map_err(|e| ReportError::io(path, e))?;
    serde_json::from_str(&raw).map_err(|e| ReportError::MalformedResult {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

async fn persist_result(path: &Path, result: &TestResult) -> ReportResult<()> {
    let json = serde_json::to_string(result).map_err(|e| ReportError::MalformedResult {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    fs::write(path, json)
        .await
        .map_err(|e| ReportError::io(path, e))
}

/// Normalize every result file in `dir`.
///
/// Ingestion errors never escape: they become a failed outcome with zeroed
/// stats so the other runners keep going.
pub async fn normalize_runner(dir: &Path, runner: Runner, policy: DedupPolicy) -> RunnerOutcome {
    match normalize_dir(dir, runner, policy).await {
        Ok(outcome) => outcome,
        Err(e) => {
            warn!(runner = %runner, dir = %dir.display(), error = %e, "could not ingest runner results");
            RunnerOutcome::failed(runner, e.to_string())
        }
    }
}

async fn normalize_dir(
    dir: &Path,
    runner: Runner,
    policy: DedupPolicy,
) -> ReportResult<RunnerOutcome> {
    let mut entries = fs::read_dir(dir)
        .await
        .map_err(|e| ReportError::io(dir, e))?;

    let mut stats = TestStats::default();
    let mut verdicts = CaseVerdicts::new(policy);

    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| ReportError::io(dir, e))?
    {
        let file_name = entry.file_name().to_string_lossy().into_owned();
        if !file_name.ends_with(RESULT_SUFFIX) {
            continue;
        }
        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        let result = label_for_runner(read_result(&path).await?, runner);
        persist_result(&path, &result).await?;

        stats.record(result.status);
        let case_id = result.case_id().unwrap_or(file_name.as_str()).to_string();
        verdicts.observe(&case_id, result.status);
    }

    debug!(runner = %runner, total = stats.total, "normalized runner results");
    Ok(RunnerOutcome {
        runner,
        passed: verdicts.passed(),
        stats,
        error: None,
    })
}
