// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Local Filesystem Storage Provider
//!
//! Filesystem implementation of StorageProvider rooted at one node's
//! directory (`<home>/<name>`). Every storage node of a deployment, the
//! router included, uses one of these for its own class.
//!
//! **Limitations:**
//! - No locking between concurrent writers (last writer wins)
//! - Uploads write in place; a failed upload may leave a partial file
//! - No replication; a node's files exist only on its own disk

use crate::domain::storage::{FileSink, FileSource, StorageError, StorageProvider};
use crate::infrastructure::archive;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Local filesystem storage provider
pub struct LocalStorageProvider {
    /// Node root (e.g., "/home/alice/smain")
    base_path: PathBuf,
}

impl LocalStorageProvider {
    /// Create new local storage provider
    ///
    /// Creates the root if it does not exist and verifies it is writable.
    ///
    /// # Example
    /// ```rust
    /// # use splitstore_core::infrastructure::storage::LocalStorageProvider;
    /// let dir = tempfile::TempDir::new().unwrap();
    /// let provider = LocalStorageProvider::new(dir.path().join("smain")).unwrap();
    /// assert!(provider.base_path().ends_with("smain"));
    /// ```
    pub fn new(base_path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let base_path = base_path.into();

        std::fs::create_dir_all(&base_path).map_err(|e| {
            StorageError::Unavailable(format!(
                "Failed to create base directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        let test_file = base_path.join(".splitstore-storage-test");
        std::fs::write(&test_file, b"test").map_err(|e| {
            StorageError::Unavailable(format!(
                "Base directory {} is not writable: {}",
                base_path.display(),
                e
            ))
        })?;
        std::fs::remove_file(&test_file).map_err(|e| {
            StorageError::Unavailable(format!("Failed to cleanup test file: {}", e))
        })?;

        Ok(Self { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn ensure_within(&self, path: &Path) -> Result<(), StorageError> {
        if path.is_absolute() && path.starts_with(&self.base_path) {
            Ok(())
        } else {
            Err(StorageError::InvalidPath(format!(
                "{} is outside {}",
                path.display(),
                self.base_path.display()
            )))
        }
    }
}

#[async_trait]
impl StorageProvider for LocalStorageProvider {
    async fn create_directory(&self, path: &Path) -> Result<(), StorageError> {
        self.ensure_within(path)?;
        tokio::fs::create_dir_all(path)
            .await
            .map_err(|e| StorageError::io(path, e))?;
        tracing::debug!(path = %path.display(), "Directory ready");
        Ok(())
    }

    async fn create_file(&self, path: &Path) -> Result<FileSink, StorageError> {
        self.ensure_within(path)?;
        let file = tokio::fs::File::create(path)
            .await
            .map_err(|e| StorageError::io(path, e))?;
        Ok(Box::new(file))
    }

    async fn open_file(&self, path: &Path) -> Result<FileSource, StorageError> {
        self.ensure_within(path)?;
        let file = tokio::fs::File::open(path)
            .await
            .map_err(|e| StorageError::io(path, e))?;
        let metadata = file
            .metadata()
            .await
            .map_err(|e| StorageError::io(path, e))?;
        if !metadata.is_file() {
            return Err(StorageError::NotAFile(path.display().to_string()));
        }
        Ok(FileSource {
            reader: Box::new(file),
            len: metadata.len(),
        })
    }

    async fn delete_file(&self, path: &Path) -> Result<(), StorageError> {
        self.ensure_within(path)?;
        let metadata = tokio::fs::symlink_metadata(path)
            .await
            .map_err(|e| StorageError::io(path, e))?;
        if metadata.is_dir() {
            return Err(StorageError::NotAFile(path.display().to_string()));
        }
        tokio::fs::remove_file(path)
            .await
            .map_err(|e| StorageError::io(path, e))?;
        tracing::debug!(path = %path.display(), "File deleted");
        Ok(())
    }

    async fn file_len(&self, path: &Path) -> Result<u64, StorageError> {
        self.ensure_within(path)?;
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| StorageError::io(path, e))?;
        Ok(metadata.len())
    }

    async fn list_files(&self, path: &Path) -> Result<Vec<String>, StorageError> {
        self.ensure_within(path)?;
        let mut entries = tokio::fs::read_dir(path)
            .await
            .map_err(|e| StorageError::io(path, e))?;

        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StorageError::io(path, e))?
        {
            let file_type = entry
                .file_type()
                .await
                .map_err(|e| StorageError::io(&entry.path(), e))?;
            if !file_type.is_file() {
                continue;
            }
            if let Ok(name) = entry.file_name().into_string() {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    async fn build_archive(&self, root: &Path) -> Result<FileSource, StorageError> {
        self.ensure_within(root)?;
        archive::build_archive(root.to_path_buf()).await
    }

    async fn health_check(&self) -> Result<(), StorageError> {
        let metadata = tokio::fs::metadata(&self.base_path)
            .await
            .map_err(|e| StorageError::io(&self.base_path, e))?;
        if metadata.is_dir() {
            Ok(())
        } else {
            Err(StorageError::Unavailable(format!(
                "{} is not a directory",
                self.base_path.display()
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    fn provider() -> (TempDir, LocalStorageProvider) {
        let temp_dir = TempDir::new().unwrap();
        let provider = LocalStorageProvider::new(temp_dir.path().join("smain")).unwrap();
        (temp_dir, provider)
    }

    #[tokio::test]
    async fn test_write_then_read_file() {
        let (_temp, provider) = provider();
        let dir = provider.base_path().join("docs");
        let path = dir.join("a.c");

        provider.create_directory(&dir).await.unwrap();
        let mut sink = provider.create_file(&path).await.unwrap();
        sink.write_all(b"hello").await.unwrap();
        sink.flush().await.unwrap();
        drop(sink);

        assert_eq!(provider.file_len(&path).await.unwrap(), 5);

        let mut source = provider.open_file(&path).await.unwrap();
        assert_eq!(source.len, 5);
        let mut content = Vec::new();
        source.reader.read_to_end(&mut content).await.unwrap();
        assert_eq!(content, b"hello");
    }

    #[tokio::test]
    async fn test_create_directory_is_idempotent() {
        let (_temp, provider) = provider();
        let dir = provider.base_path().join("a/b");
        provider.create_directory(&dir).await.unwrap();
        provider.create_directory(&dir).await.unwrap();
        assert!(dir.is_dir());
    }

    #[tokio::test]
    async fn test_open_missing_file_reports_os_error() {
        let (_temp, provider) = provider();
        let path = provider.base_path().join("missing.c");
        let err = provider.open_file(&path).await.unwrap_err();
        assert!(err.is_not_found());
        assert!(err.to_string().starts_with(&path.display().to_string()));
    }

    #[tokio::test]
    async fn test_delete_file() {
        let (_temp, provider) = provider();
        let path = provider.base_path().join("x.c");
        std::fs::write(&path, b"x").unwrap();

        provider.delete_file(&path).await.unwrap();
        assert!(!path.exists());
        assert!(provider.delete_file(&path).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_delete_refuses_directories() {
        let (_temp, provider) = provider();
        let dir = provider.base_path().join("d.c");
        std::fs::create_dir_all(&dir).unwrap();
        assert!(matches!(
            provider.delete_file(&dir).await,
            Err(StorageError::NotAFile(_))
        ));
    }

    #[tokio::test]
    async fn test_list_files_sorted_regular_only() {
        let (_temp, provider) = provider();
        let base = provider.base_path();
        std::fs::write(base.join("b.c"), b"").unwrap();
        std::fs::write(base.join("a.c"), b"").unwrap();
        std::fs::write(base.join("notes.txt"), b"").unwrap();
        std::fs::create_dir_all(base.join("dir.c")).unwrap();

        let names = provider.list_files(base).await.unwrap();
        assert_eq!(names, vec!["a.c", "b.c", "notes.txt"]);
    }

    #[tokio::test]
    async fn test_rejects_paths_outside_root() {
        let (temp, provider) = provider();
        let outside = temp.path().join("spdf/x.pdf");
        assert!(matches!(
            provider.open_file(&outside).await,
            Err(StorageError::InvalidPath(_))
        ));
        assert!(matches!(
            provider.create_directory(Path::new("relative")).await,
            Err(StorageError::InvalidPath(_))
        ));
    }

    #[tokio::test]
    async fn test_health_check() {
        let (_temp, provider) = provider();
        provider.health_check().await.unwrap();
    }
}
