// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Storage Provider Trait - Anti-Corruption Layer for node storage
//!
//! Abstracts the filesystem operations a storage node performs on its own
//! root: creating directories, streaming files in and out, deleting,
//! listing and archiving. Paths passed in are already translated and
//! sanitized; providers still refuse anything outside their root.
//!
//! # Concurrency
//!
//! Providers take no locks. Two sessions writing the same path race and the
//! last writer wins; the create/write/close sequence is not atomic, so a
//! concurrent reader may observe a partially written file.

use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};

/// Writable stream for a newly created file
pub type FileSink = Box<dyn AsyncWrite + Send + Unpin>;

/// Readable stream plus its exact length
///
/// The length is captured when the source is opened and becomes the frame
/// length on the wire.
pub struct FileSource {
    pub reader: Box<dyn AsyncRead + Send + Unpin>,
    pub len: u64,
}

impl std::fmt::Debug for FileSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileSource").field("len", &self.len).finish()
    }
}

/// Storage provider trait abstracting one node's file operations
#[async_trait]
pub trait StorageProvider: Send + Sync {
    /// Create a directory and any missing parents
    ///
    /// Succeeds when the directory already exists.
    async fn create_directory(&self, path: &Path) -> Result<(), StorageError>;

    /// Create or truncate a file for writing
    async fn create_file(&self, path: &Path) -> Result<FileSink, StorageError>;

    /// Open an existing regular file for reading
    async fn open_file(&self, path: &Path) -> Result<FileSource, StorageError>;

    /// Delete a regular file
    async fn delete_file(&self, path: &Path) -> Result<(), StorageError>;

    /// Current length of a file in bytes
    async fn file_len(&self, path: &Path) -> Result<u64, StorageError>;

    /// Names of the regular files directly inside `path`, sorted
    async fn list_files(&self, path: &Path) -> Result<Vec<String>, StorageError>;

    /// Build a tar archive of everything under `root`
    ///
    /// The archive is materialized in a transient file that is removed when
    /// the returned source is dropped.
    async fn build_archive(&self, root: &Path) -> Result<FileSource, StorageError>;

    /// Check that the provider's root is usable
    async fn health_check(&self) -> Result<(), StorageError>;
}

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("{path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Not a regular file: {0}")]
    NotAFile(String),

    #[error("Archive error: {0}")]
    Archive(String),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

impl StorageError {
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        StorageError::Io {
            path: path.display().to_string(),
            source,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StorageError::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound
        )
    }
}
