//! Numbered report snapshots for non-release components.
//!
//! ```text
//! reports/<component>/
//!   1/ 2/ ... N/     # one rendered report per pipeline run
//!   index.html       # redirect stub to the latest N
//! ```

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{ReportError, ReportResult};
use crate::io;

/// Number of numbered reports kept per component.
pub const DEFAULT_HISTORY_LIMIT: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
struct NumberedDir {
    id: u64,
    name: String,
}

/// Result of [`HistoryWindow::advance`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryAdvance {
    pub next_report_id: u64,
    pub evicted: Vec<u64>,
}

/// Bounded window of numbered report directories under one report root.
#[derive(Debug, Clone)]
pub struct HistoryWindow {
    report_root: PathBuf,
    limit: usize,
}

impl HistoryWindow {
    pub fn new(report_root: impl Into<PathBuf>) -> Self {
        Self::with_limit(report_root, DEFAULT_HISTORY_LIMIT)
    }

    /// `limit` counts the report about to be written; it is clamped to at least 1.
    pub fn with_limit(report_root: impl Into<PathBuf>, limit: usize) -> Self {
        Self {
            report_root: report_root.into(),
            limit: limit.max(1),
        }
    }

    pub fn report_root(&self) -> &Path {
        &self.report_root
    }

    async fn numbered_dirs(&self) -> ReportResult<Vec<NumberedDir>> {
        let mut dirs: Vec<NumberedDir> = io::subdirectories(&self.report_root)
            .await?
            .into_iter()
            .filter_map(|name| name.parse::<u64>().ok().map(|id| NumberedDir { id, name }))
            .collect();
        dirs.sort_by_key(|d| d.id);
        Ok(dirs)
    }

    /// Existing report ids, ascending.
    pub async fn report_ids(&self) -> ReportResult<Vec<u64>> {
        Ok(self.numbered_dirs().await?.into_iter().map(|d| d.id).collect())
    }

    /// Compute the next report id and make room for it.
    ///
    /// The id is derived from the listing taken before eviction, so ids keep
    /// increasing while old reports are dropped.
    pub async fn advance(&self) -> ReportResult<HistoryAdvance> {
        io::create_dir_all(&self.report_root).await?;
        let dirs = self.numbered_dirs().await?;

        let next_report_id = match dirs.last() {
            Some(last) => last.id.checked_add(1).ok_or_else(|| ReportError::HistoryExhausted {
                path: self.report_root.display().to_string(),
                message: format!("report '{}' already has the largest id", last.name),
            })?,
            None => 1,
        };

        let keep = self.limit - 1;
        let excess = dirs.len().saturating_sub(keep);
        let mut evicted = Vec::with_capacity(excess);
        for dir in dirs.iter().take(excess) {
            io::remove_dir_if_exists(&self.report_root.join(&dir.name)).await?;
            debug!(report_id = dir.id, "evicted report");
            evicted.push(dir.id);
        }

        info!(
            report_root = %self.report_root.display(),
            next_report_id,
            evicted = evicted.len(),
            "history window advanced"
        );
        Ok(HistoryAdvance {
            next_report_id,
            evicted,
        })
    }
}
