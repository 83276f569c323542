//! Filesystem helpers shared by the pipeline steps.

use std::path::{Path, PathBuf};

use tokio::fs;

use crate::error::{ReportError, ReportResult};

/// Write through a sibling temp file and rename into place.
pub(crate) async fn write_atomic(path: &Path, content: &str) -> ReportResult<()> {
    let temp_path = path.with_extension("tmp");

    fs::write(&temp_path, content)
        .await
        .map_err(|e| ReportError::io(&temp_path, e))?;

    fs::rename(&temp_path, path)
        .await
        .map_err(|e| ReportError::io(path, e))?;

    Ok(())
}

pub(crate) async fn create_dir_all(path: &Path) -> ReportResult<()> {
    fs::create_dir_all(path)
        .await
        .map_err(|e| ReportError::io(path, e))
}

/// Remove a directory tree; a missing directory is not an error.
/// Returns whether something was removed.
pub(crate) async fn remove_dir_if_exists(path: &Path) -> ReportResult<bool> {
    match fs::remove_dir_all(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(ReportError::io(path, e)),
    }
}

/// Empty `path`, creating it if needed.
pub(crate) async fn reset_dir(path: &Path) -> ReportResult<()> {
    remove_dir_if_exists(path).await?;
    create_dir_all(path).await
}

/// Copy everything below `src` into `dst` (like `cp -r src/* dst`).
/// Returns the number of files copied.
pub(crate) async fn copy_dir_contents(src: &Path, dst: &Path) -> ReportResult<usize> {
    let mut copied = 0;
    let mut pending: Vec<(PathBuf, PathBuf)> = vec![(src.to_path_buf(), dst.to_path_buf())];

    while let Some((from_dir, to_dir)) = pending.pop() {
        create_dir_all(&to_dir).await?;
        let mut entries = fs::read_dir(&from_dir)
            .await
            .map_err(|e| ReportError::io(&from_dir, e))?;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| ReportError::io(&from_dir, e))?
        {
            let from = entry.path();
            let to = to_dir.join(entry.file_name());
            let file_type = entry
                .file_type()
                .await
                .map_err(|e| ReportError::io(&from, e))?;
            if file_type.is_dir() {
                pending.push((from, to));
            } else {
                fs::copy(&from, &to)
                    .await
                    .map_err(|e| ReportError::io(&from, e))?;
                copied += 1;
            }
        }
    }

    Ok(copied)
}

/// Names of the immediate subdirectories of `dir`; a missing `dir` yields none.
pub(crate) async fn subdirectories(dir: &Path) -> ReportResult<Vec<String>> {
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(ReportError::io(dir, e)),
    };

    let mut names = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| ReportError::io(dir, e))?
    {
        let is_dir = entry
            .file_type()
            .await
            .map(|t| t.is_dir())
            .unwrap_or(false);
        if is_dir {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    Ok(names)
}
