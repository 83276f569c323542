//! `releases.json`: index of every published release snapshot.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::error::{ReportError, ReportResult};
use crate::io;

use super::version::newest_first;

/// File name of the manifest inside the release report root.
pub const MANIFEST_FILE: &str = "releases.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseManifestEntry {
    pub version: String,
    pub path: String,
    pub last_updated: String,
}

impl ReleaseManifestEntry {
    pub fn new(version: impl Into<String>, last_updated: impl Into<String>) -> Self {
        let version = version.into();
        Self {
            path: format!("./{}/index.html", version),
            version,
            last_updated: last_updated.into(),
        }
    }
}

/// In-memory manifest. Entries are unique by version string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReleaseManifest {
    entries: Vec<ReleaseManifestEntry>,
}

impl ReleaseManifest {
    pub fn from_entries(entries: Vec<ReleaseManifestEntry>) -> Self {
        let mut manifest = Self::default();
        for entry in entries {
            manifest.upsert(entry);
        }
        manifest
    }

    /// Read the manifest; a missing file is an empty manifest.
    pub async fn load(path: &Path) -> ReportResult<Self> {
        let raw = match fs::read_to_string(path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(ReportError::io(path, e)),
        };
        let entries: Vec<ReleaseManifestEntry> = serde_json::from_str(&raw).map_err(|e| {
            ReportError::manifest(format!("{} is not a release list: {}", path.display(), e))
        })?;
        Ok(Self::from_entries(entries))
    }

    pub async fn save(&self, path: &Path) -> ReportResult<()> {
        let json = serde_json::to_string_pretty(&self.entries)
            .map_err(|e| ReportError::manifest(format!("failed to serialize manifest: {}", e)))?;
        io::write_atomic(path, &json).await
    }

    /// Replace the entry with the same version, or append; keeps newest-first order.
    pub fn upsert(&mut self, entry: ReleaseManifestEntry) {
        match self.entries.iter_mut().find(|e| e.version == entry.version) {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
        self.sort();
    }

    /// Drop the entry for `version`; returns whether one existed.
    pub fn remove(&mut self, version: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.version != version);
        self.entries.len() != before
    }

    pub fn get(&self, version: &str) -> Option<&ReleaseManifestEntry> {
        self.entries.iter().find(|e| e.version == version)
    }

    pub fn entries(&self) -> &[ReleaseManifestEntry] {
        &self.entries
    }

    pub fn versions(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.version.as_str()).collect()
    }

    fn sort(&mut self) {
        self.entries
            .sort_by(|a, b| newest_first(&a.version, &b.version));
    }
}
