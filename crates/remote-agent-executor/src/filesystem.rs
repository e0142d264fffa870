//! Local filesystem capability.

use std::{
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};

use async_trait::async_trait;
use bytes::Bytes;
use remote_agent_core::{
    CapabilityError, DirectoryEntry, DirectoryListing, capability::FileSystem,
};

/// Filesystem access through `tokio::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileSystem;

impl LocalFileSystem {
    fn resolve(path: &Path) -> PathBuf {
        if path.as_os_str().is_empty() {
            PathBuf::from(".")
        } else {
            path.to_path_buf()
        }
    }
}

#[async_trait]
impl FileSystem for LocalFileSystem {
    async fn explore(&self, path: &Path) -> Result<DirectoryListing, CapabilityError> {
        let path = Self::resolve(path);
        let mut dir = tokio::fs::read_dir(&path).await?;
        let mut files = Vec::new();
        while let Some(entry) = dir.next_entry().await? {
            // Entries can vanish between listing and stat.
            let Ok(metadata) = entry.metadata().await else {
                continue;
            };
            files.push(DirectoryEntry {
                filename: entry.file_name().to_string_lossy().into_owned(),
                is_dir: metadata.is_dir(),
                size: metadata.len(),
                mod_time: metadata.modified().map(unix_seconds).unwrap_or_default(),
            });
        }
        files.sort_by(|a, b| b.is_dir.cmp(&a.is_dir).then_with(|| a.filename.cmp(&b.filename)));

        let path = tokio::fs::canonicalize(&path).await.unwrap_or(path);
        Ok(DirectoryListing {
            path: path.display().to_string(),
            files,
        })
    }

    async fn read_file(&self, path: &Path) -> Result<Bytes, CapabilityError> {
        Ok(Bytes::from(tokio::fs::read(path).await?))
    }

    async fn write_file(&self, path: &Path, contents: Bytes) -> Result<(), CapabilityError> {
        tokio::fs::write(path, &contents).await?;
        tracing::debug!(path = %path.display(), len = contents.len(), "File written");
        Ok(())
    }

    async fn delete(&self, path: &Path) -> Result<(), CapabilityError> {
        let metadata = tokio::fs::symlink_metadata(path).await?;
        if metadata.is_dir() {
            tokio::fs::remove_dir_all(path).await?;
        } else {
            tokio::fs::remove_file(path).await?;
        }
        tracing::debug!(path = %path.display(), "Deleted");
        Ok(())
    }
}

fn unix_seconds(time: SystemTime) -> i64 {
    time.duration_since(UNIX_EPOCH)
        .ok()
        .and_then(|d| i64::try_from(d.as_secs()).ok())
        .unwrap_or_default()
}
