// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Archive Encoder / Decoder
//!
//! In-process tar archives of a node root. Encoding runs on the blocking
//! pool and writes to an anonymous-named temp file; the file is deleted when
//! the returned [`TransientArchive`] is dropped, whether or not the transfer
//! completed.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure Layer
//! - **Purpose:** Implements internal responsibilities for archive

use crate::domain::storage::{FileSource, StorageError};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::{Context, Poll};
use tempfile::TempPath;
use tokio::io::{AsyncRead, ReadBuf};

/// A finished archive waiting to be streamed
pub struct TransientArchive {
    file: tokio::fs::File,
    _path: TempPath,
}

impl AsyncRead for TransientArchive {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.get_mut().file).poll_read(cx, buf)
    }
}

/// Archive everything under `root`
///
/// Entries are stored relative to `root`. A missing root yields an empty
/// archive. Symlinks are archived as links, not followed.
pub async fn build_archive(root: PathBuf) -> Result<FileSource, StorageError> {
    let (file, path, len) = tokio::task::spawn_blocking(move || encode(&root))
        .await
        .map_err(|e| StorageError::Archive(format!("archive task failed: {}", e)))??;

    tracing::debug!(bytes = len, "Archive built");

    Ok(FileSource {
        reader: Box::new(TransientArchive {
            file: tokio::fs::File::from_std(file),
            _path: path,
        }),
        len,
    })
}

fn encode(root: &Path) -> Result<(std::fs::File, TempPath, u64), StorageError> {
    let temp = tempfile::NamedTempFile::new()
        .map_err(|e| StorageError::Archive(format!("failed to create temp file: {}", e)))?;
    let (file, path) = temp.into_parts();

    let mut builder = tar::Builder::new(file);
    builder.follow_symlinks(false);
    if root.is_dir() {
        builder
            .append_dir_all(".", root)
            .map_err(|e| StorageError::io(root, e))?;
    }
    let mut file = builder
        .into_inner()
        .map_err(|e| StorageError::Archive(format!("failed to finish archive: {}", e)))?;

    file.flush()
        .map_err(|e| StorageError::Archive(e.to_string()))?;
    let len = file
        .seek(SeekFrom::End(0))
        .map_err(|e| StorageError::Archive(e.to_string()))?;
    file.seek(SeekFrom::Start(0))
        .map_err(|e| StorageError::Archive(e.to_string()))?;

    Ok((file, path, len))
}

/// Unpack a tar archive file into `dest`
///
/// Entries that would land outside `dest` are skipped by the tar crate.
pub async fn unpack_archive(archive: PathBuf, dest: PathBuf) -> Result<(), StorageError> {
    tokio::task::spawn_blocking(move || {
        std::fs::create_dir_all(&dest).map_err(|e| StorageError::io(&dest, e))?;
        let file = std::fs::File::open(&archive).map_err(|e| StorageError::io(&archive, e))?;
        tar::Archive::new(file)
            .unpack(&dest)
            .map_err(|e| StorageError::Archive(format!("failed to unpack archive: {}", e)))
    })
    .await
    .map_err(|e| StorageError::Archive(format!("unpack task failed: {}", e)))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn test_archive_round_trip() {
        let src = TempDir::new().unwrap();
        std::fs::create_dir_all(src.path().join("sub")).unwrap();
        std::fs::write(src.path().join("a.c"), b"int main() {}\n").unwrap();
        std::fs::write(src.path().join("sub/b.c"), b"EOF\n").unwrap();

        let mut source = build_archive(src.path().to_path_buf()).await.unwrap();
        let mut bytes = Vec::new();
        source.reader.read_to_end(&mut bytes).await.unwrap();
        assert_eq!(bytes.len() as u64, source.len);

        let work = TempDir::new().unwrap();
        let archive_path = work.path().join("cfiles.tar");
        std::fs::write(&archive_path, &bytes).unwrap();
        let out = work.path().join("out");
        unpack_archive(archive_path, out.clone()).await.unwrap();

        assert_eq!(std::fs::read(out.join("a.c")).unwrap(), b"int main() {}\n");
        assert_eq!(std::fs::read(out.join("sub/b.c")).unwrap(), b"EOF\n");
    }

    #[tokio::test]
    async fn test_missing_root_gives_empty_archive() {
        let dir = TempDir::new().unwrap();
        let mut source = build_archive(dir.path().join("absent")).await.unwrap();
        let mut bytes = Vec::new();
        source.reader.read_to_end(&mut bytes).await.unwrap();

        let entries = tar::Archive::new(bytes.as_slice()).entries().unwrap().count();
        assert_eq!(entries, 0);
    }

    #[tokio::test]
    async fn test_temp_file_removed_on_drop() {
        let src = TempDir::new().unwrap();
        std::fs::write(src.path().join("x.txt"), b"x").unwrap();

        let (file, path, _) = encode(src.path()).unwrap();
        let on_disk = path.to_path_buf();
        assert!(on_disk.exists());

        drop(TransientArchive {
            file: tokio::fs::File::from_std(file),
            _path: path,
        });
        assert!(!on_disk.exists());
    }
}
