use std::ops::AddAssign;

use serde::{Deserialize, Serialize};

use crate::environment::Runner;

/// Status of one test execution as written by the Allure adapters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Passed,
    Failed,
    Broken,
    Skipped,
    #[default]
    #[serde(other)]
    Unknown,
}

impl TestStatus {
    /// Whether a case resolved to this status makes its runner fail.
    pub fn is_failing(self) -> bool {
        matches!(self, Self::Failed | Self::Broken | Self::Unknown)
    }

    /// Severity used by the worst-status-wins dedup policy.
    pub(crate) fn severity(self) -> u8 {
        match self {
            Self::Passed => 0,
            Self::Skipped => 1,
            Self::Failed => 2,
            Self::Broken => 3,
            Self::Unknown => 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
    pub value: String,
}

/// One raw test result record (`<uuid>-result.json`).
///
/// Only the fields the pipeline reads are typed; everything else is carried
/// through `extra` so a rewritten file keeps the renderer's data intact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_case_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history_id: Option<String>,
    #[serde(default)]
    pub status: TestStatus,
    #[serde(default)]
    pub labels: Vec<Label>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl TestResult {
    /// Identity shared by all retries of the same test case.
    pub fn case_id(&self) -> Option<&str> {
        self.test_case_id
            .as_deref()
            .or(self.history_id.as_deref())
            .or(self.uuid.as_deref())
    }

    pub fn label(&self, name: &str) -> Option<&str> {
        self.labels
            .iter()
            .find(|l| l.name == name)
            .map(|l| l.value.as_str())
    }

    /// Set `name` to `value`. Every existing label of that name collapses
    /// into one, kept at the position of the first.
    pub fn with_label(mut self, name: &str, value: &str) -> Self {
        let mut seen = false;
        self.labels.retain_mut(|l| {
            if l.name != name {
                return true;
            }
            if seen {
                return false;
            }
            seen = true;
            l.value = value.to_string();
            true
        });
        if !seen {
            self.labels.push(Label {
                name: name.to_string(),
                value: value.to_string(),
            });
        }
        self
    }
}

/// Per-status counters. `total` always equals the sum of the buckets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestStats {
    pub passed: u64,
    pub failed: u64,
    pub broken: u64,
    pub skipped: u64,
    pub total: u64,
}

impl TestStats {
    /// Count one record. `unknown` lands in the broken bucket.
    pub fn record(&mut self, status: TestStatus) {
        match status {
            TestStatus::Passed => self.passed += 1,
            TestStatus::Failed => self.failed += 1,
            TestStatus::Broken | TestStatus::Unknown => self.broken += 1,
            TestStatus::Skipped => self.skipped += 1,
        }
        self.total += 1;
    }

    pub fn is_consistent(&self) -> bool {
        self.total == self.passed + self.failed + self.broken + self.skipped
    }
}

impl AddAssign for TestStats {
    fn add_assign(&mut self, rhs: Self) {
        self.passed += rhs.passed;
        self.failed += rhs.failed;
        self.broken += rhs.broken;
        self.skipped += rhs.skipped;
        self.total += rhs.total;
    }
}

/// Result of normalizing one runner's artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerOutcome {
    pub runner: Runner,
    pub passed: bool,
    pub stats: TestStats,
    pub error: Option<String>,
}

impl RunnerOutcome {
    /// A runner whose artifacts could not be ingested.
    pub fn failed(runner: Runner, error: impl Into<String>) -> Self {
        Self {
            runner,
            passed: false,
            stats: TestStats::default(),
            error: Some(error.into()),
        }
    }
}
