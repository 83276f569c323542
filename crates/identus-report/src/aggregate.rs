//! Fan-out over enabled runners, fan-in into one set of totals.
//!
//! Each runner is normalized and copied into the staging directory on its own
//! task. Totals are folded only after every task has been joined, on the
//! caller's task, so no shared counter is touched concurrently.

use std::path::{Path, PathBuf};

use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::environment::Runner;
use crate::io;
use crate::model::{RunnerOutcome, TestStats};
use crate::normalize::{normalize_runner, DedupPolicy};

/// Combined outcome of all runners of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateOutcome {
    pub execution_passed: bool,
    pub stats: TestStats,
    /// Per-runner outcomes in [`Runner::ALL`] order.
    pub runners: Vec<RunnerOutcome>,
}

impl AggregateOutcome {
    /// Sequential reduce over completed runner outcomes.
    pub fn from_outcomes(mut outcomes: Vec<RunnerOutcome>) -> Self {
        outcomes.sort_by_key(|o| o.runner);

        let mut stats = TestStats::default();
        let mut execution_passed = true;
        for outcome in &outcomes {
            stats += outcome.stats;
            execution_passed = execution_passed && outcome.passed;
        }

        Self {
            execution_passed,
            stats,
            runners: outcomes,
        }
    }

    pub fn errors(&self) -> impl Iterator<Item = (Runner, &str)> {
        self.runners
            .iter()
            .filter_map(|o| o.error.as_deref().map(|e| (o.runner, e)))
    }
}

/// Merges per-runner artifacts from `<work_root>/<runner>` into one staging directory.
#[derive(Debug, Clone)]
pub struct ResultAggregator {
    work_root: PathBuf,
    staging_dir: PathBuf,
    policy: DedupPolicy,
}

impl ResultAggregator {
    pub fn new(
        work_root: impl Into<PathBuf>,
        staging_dir: impl Into<PathBuf>,
        policy: DedupPolicy,
    ) -> Self {
        Self {
            work_root: work_root.into(),
            staging_dir: staging_dir.into(),
            policy,
        }
    }

    pub fn runner_dir(&self, runner: Runner) -> PathBuf {
        self.work_root.join(runner.as_str())
    }

    pub fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }

    pub async fn aggregate(&self, runners: &[Runner]) -> AggregateOutcome {
        let mut join_set = JoinSet::new();
        for &runner in runners {
            let dir = self.runner_dir(runner);
            let staging = self.staging_dir.clone();
            let policy = self.policy;
            join_set.spawn(async move { process_runner(&dir, &staging, runner, policy).await });
        }

        let mut outcomes = Vec::with_capacity(runners.len());
        while let Some(res) = join_set.join_next().await {
            match res {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => error!(error = %e, "runner task did not complete"),
            }
        }

        // A task that panicked left no outcome behind; its runner still counts as failed.
        for &runner in runners {
            if !outcomes.iter().any(|o| o.runner == runner) {
                outcomes.push(RunnerOutcome::failed(runner, "runner task did not complete"));
            }
        }

        let aggregate = AggregateOutcome::from_outcomes(outcomes);
        for outcome in &aggregate.runners {
            info!(
                runner = %outcome.runner,
                passed = outcome.passed,
                total = outcome.stats.total,
                failed = outcome.stats.failed,
                broken = outcome.stats.broken,
                skipped = outcome.stats.skipped,
                "runner summary"
            );
        }
        for (runner, err) in aggregate.errors() {
            warn!(runner = %runner, error = err, "runner results incomplete");
        }
        info!(
            execution_passed = aggregate.execution_passed,
            total = aggregate.stats.total,
            passed = aggregate.stats.passed,
            failed = aggregate.stats.failed,
            broken = aggregate.stats.broken,
            skipped = aggregate.stats.skipped,
            "aggregate summary"
        );
        aggregate
    }
}

async fn process_runner(
    dir: &Path,
    staging: &Path,
    runner: Runner,
    policy: DedupPolicy,
) -> RunnerOutcome {
    let mut outcome = normalize_runner(dir, runner, policy).await;
    if outcome.error.is_some() {
        return outcome;
    }

    if let Err(e) = io::copy_dir_contents(dir, staging).await {
        warn!(runner = %runner, error = %e, "could not merge runner results into staging");
        outcome.passed = false;
        outcome.error = Some(e.to_string());
    }
    outcome
}
