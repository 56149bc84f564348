//! Filesystem browsing and editing for the file manager pane.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Files larger than this are refused by the read endpoint.
const MAX_READ_SIZE: u64 = 10 * 1024 * 1024;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    pub name: String,
    pub path: PathBuf,
    pub is_dir: bool,
    pub size: u64,
    pub mod_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DirectoryListing {
    pub path: PathBuf,
    pub files: Vec<FileEntry>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileContent {
    pub path: PathBuf,
    pub content: String,
    pub size: u64,
    pub mod_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResult {
    pub path: PathBuf,
    pub is_dir: bool,
}

#[derive(Debug, Error)]
pub enum FileError {
    #[error("not found: {0}")]
    NotFound(PathBuf),
    #[error("not a directory: {0}")]
    NotADirectory(PathBuf),
    #[error("is a directory: {0}")]
    IsADirectory(PathBuf),
    #[error("file is too large")]
    TooLarge,
    #[error("path must be absolute: {0}")]
    RelativePath(PathBuf),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Reject relative paths so callers cannot depend on the server's cwd.
fn require_absolute(path: &Path) -> Result<(), FileError> {
    if path.is_absolute() {
        Ok(())
    } else {
        Err(FileError::RelativePath(path.to_path_buf()))
    }
}

fn mod_time(metadata: &std::fs::Metadata) -> DateTime<Utc> {
    metadata
        .modified()
        .map(DateTime::<Utc>::from)
        .unwrap_or_default()
}

/// List a directory, skipping dotfiles.
pub async fn list_directory(path: &Path) -> Result<DirectoryListing, FileError> {
    require_absolute(path)?;

    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|_| FileError::NotFound(path.to_path_buf()))?;
    if !metadata.is_dir() {
        return Err(FileError::NotADirectory(path.to_path_buf()));
    }

    let mut files = Vec::new();
    let mut entries = tokio::fs::read_dir(path).await?;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }

        let metadata = entry.metadata().await?;
        files.push(FileEntry {
            path: path.join(&name),
            is_dir: metadata.is_dir(),
            size: metadata.len(),
            mod_time: mod_time(&metadata),
            name,
        });
    }

    files.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(DirectoryListing {
        path: path.to_path_buf(),
        files,
    })
}

/// Read a file's content, capped at 10MB.
pub async fn read_file(path: &Path) -> Result<FileContent, FileError> {
    require_absolute(path)?;

    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|_| FileError::NotFound(path.to_path_buf()))?;
    if metadata.is_dir() {
        return Err(FileError::IsADirectory(path.to_path_buf()));
    }
    if metadata.len() > MAX_READ_SIZE {
        return Err(FileError::TooLarge);
    }

    let content = tokio::fs::read_to_string(path)
        .await
        .context("reading file")?;

    Ok(FileContent {
        path: path.to_path_buf(),
        content,
        size: metadata.len(),
        mod_time: mod_time(&metadata),
    })
}

/// Write content to a file, creating it if needed.
pub async fn write_file(path: &Path, content: &str) -> Result<(), FileError> {
    require_absolute(path)?;
    tokio::fs::write(path, content).await?;
    Ok(())
}

/// Create `name` as a subdirectory of an existing `parent`.
pub async fn create_directory(parent: &Path, name: &str) -> Result<PathBuf, FileError> {
    require_absolute(parent)?;

    let metadata = tokio::fs::metadata(parent)
        .await
        .map_err(|_| FileError::NotFound(parent.to_path_buf()))?;
    if !metadata.is_dir() {
        return Err(FileError::NotADirectory(parent.to_path_buf()));
    }

    let new_dir = parent.join(name);
    tokio::fs::create_dir(&new_dir).await?;
    Ok(new_dir)
}

/// Delete a file or recursively delete a directory.
pub async fn delete(path: &Path) -> Result<DeleteResult, FileError> {
    require_absolute(path)?;

    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|_| FileError::NotFound(path.to_path_buf()))?;

    if metadata.is_dir() {
        tokio::fs::remove_dir_all(path).await?;
    } else {
        tokio::fs::remove_file(path).await?;
    }

    Ok(DeleteResult {
        path: path.to_path_buf(),
        is_dir: metadata.is_dir(),
    })
}
