//! Release snapshots: one directory per version plus `releases.json`.
//!
//! ```text
//! reports/release/
//!   releases.json        # newest-first manifest
//!   1.1.0-draft/         # until 1.1.0 is published
//!   1.0.0/
//!     index.html
//!     release-info.json
//! ```
//!
//! Publishing a final version removes its draft (directory and manifest entry)
//! before the new snapshot is written, so the two never coexist afterwards.

pub mod manifest;
pub mod metadata;
pub mod version;

use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{ReportError, ReportResult};
use crate::io;

pub use manifest::{ReleaseManifest, ReleaseManifestEntry, MANIFEST_FILE};
pub use metadata::{ReleaseMetadata, ReleaseStatus, WorkflowLink, METADATA_FILE};
pub use version::{draft_of, is_draft, newest_first, ParsedVersion, DRAFT_SUFFIX};

/// Reject versions that cannot be used as a single path segment.
pub fn validate_release_version(version: &str) -> ReportResult<()> {
    let reason = if version.trim().is_empty() {
        Some("version is empty")
    } else if version.contains('/') || version.contains('\\') {
        Some("version contains a path separator")
    } else if version.contains("..") || version == "." {
        Some("version contains a relative path component")
    } else {
        None
    };
    match reason {
        Some(reason) => Err(ReportError::InvalidReleaseVersion {
            version: version.to_string(),
            reason: reason.to_string(),
        }),
        None => Ok(()),
    }
}

/// What [`ReleaseManager::prepare`] did on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedRelease {
    pub version: String,
    pub version_dir: PathBuf,
    /// Draft version that was superseded by this final version, if any.
    pub removed_draft: Option<String>,
}

/// Owns `reports/release/`.
#[derive(Debug, Clone)]
pub struct ReleaseManager {
    release_root: PathBuf,
}

impl ReleaseManager {
    pub fn new(release_root: impl Into<PathBuf>) -> Self {
        Self {
            release_root: release_root.into(),
        }
    }

    pub fn release_root(&self) -> &Path {
        &self.release_root
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.release_root.join(MANIFEST_FILE)
    }

    pub fn version_dir(&self, version: &str) -> PathBuf {
        self.release_root.join(version)
    }

    pub async fn manifest(&self) -> ReportResult<ReleaseManifest> {
        ReleaseManifest::load(&self.manifest_path()).await
    }

    /// Make room for the snapshot of `metadata.version` and record it.
    ///
    /// Writes `release-info.json` into `staging_dir` so it travels with the
    /// rendered report; the version directory itself is left empty for the
    /// renderer. The manifest is loaded before anything is deleted, so a
    /// corrupt manifest aborts the step without touching the site.
    pub async fn prepare(
        &self,
        metadata: &ReleaseMetadata,
        staging_dir: &Path,
    ) -> ReportResult<PreparedRelease> {
        let version = metadata.version.as_str();
        validate_release_version(version)?;

        io::create_dir_all(&self.release_root).await?;
        let mut manifest = self.manifest().await?;

        let mut removed_draft = None;
        if !is_draft(version) {
            let draft = draft_of(version);
            let dir_removed = io::remove_dir_if_exists(&self.version_dir(&draft)).await?;
            let entry_removed = manifest.remove(&draft);
            if dir_removed || entry_removed {
                info!(version, draft = %draft, dir_removed, entry_removed, "removed superseded draft release");
                removed_draft = Some(draft);
            }
        }

        let version_dir = self.version_dir(version);
        io::reset_dir(&version_dir).await?;

        let json = serde_json::to_string_pretty(metadata)
            .map_err(|e| ReportError::manifest(format!("failed to serialize release metadata: {}", e)))?;
        io::write_atomic(&staging_dir.join(METADATA_FILE), &json).await?;

        manifest.upsert(ReleaseManifestEntry::new(version, &metadata.last_updated));
        manifest.save(&self.manifest_path()).await?;

        info!(
            version,
            status = ?metadata.status,
            releases = manifest.entries().len(),
            "release manifest updated"
        );
        Ok(PreparedRelease {
            version: version.to_string(),
            version_dir,
            removed_draft,
        })
    }
}
