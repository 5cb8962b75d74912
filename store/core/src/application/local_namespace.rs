// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Local Namespace Operations
//!
//! The operations a node performs on files of its own class: receive an
//! upload, send a file, remove, archive the root, list a directory. The
//! router uses one of these for its local class and every backend node
//! serves its whole command surface through one.
//!
//! Every operation first checks that the file belongs to this node's class
//! and translates the virtual path into the node's root.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Implements internal responsibilities for local namespace

use crate::application::dispatcher::{SessionError, SessionIo};
use crate::domain::extension::ExtensionSet;
use crate::domain::namespace::{NamespaceError, NamespaceTranslator};
use crate::domain::node::{StorageNode, StorageTopology};
use crate::domain::node_config::TransferConfig;
use crate::domain::storage::StorageProvider;
use crate::infrastructure::wire::{self, status, RelayError};
use std::path::PathBuf;
use std::sync::Arc;

/// Resolved destination of an accepted upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTarget {
    pub filename: String,
    pub directory: PathBuf,
    pub file: PathBuf,
}

pub struct LocalNamespace {
    node: StorageNode,
    extensions: ExtensionSet,
    translator: NamespaceTranslator,
    storage: Arc<dyn StorageProvider>,
    transfer: TransferConfig,
}

impl LocalNamespace {
    pub fn new(
        node: StorageNode,
        topology: Arc<StorageTopology>,
        storage: Arc<dyn StorageProvider>,
        transfer: TransferConfig,
    ) -> Self {
        Self {
            extensions: topology.extensions().clone(),
            translator: NamespaceTranslator::new(topology),
            node,
            storage,
            transfer,
        }
    }

    pub fn transfer(&self) -> &TransferConfig {
        &self.transfer
    }

    fn owns(&self, filename: &str) -> bool {
        self.extensions.matches(filename, self.node.class)
    }

    pub fn translate(&self, virtual_path: &str) -> Result<PathBuf, NamespaceError> {
        self.translator.translate(virtual_path, &self.node)
    }

    /// Check class and destination of an upload before any bytes move
    ///
    /// The error is the reply line for the client.
    pub fn upload_target(&self, filename: &str, destination: &str) -> Result<UploadTarget, String> {
        if !self.owns(filename) {
            return Err(status::INVALID_FILE_TYPE.to_string());
        }
        let (directory, file) = self
            .translator
            .translate_file(destination, filename, &self.node)
            .map_err(|e| e.to_string())?;
        Ok(UploadTarget {
            filename: filename.to_string(),
            directory,
            file,
        })
    }

    /// Store the `len`-byte frame body waiting on the session
    ///
    /// Returns the reply line. Storage failures drain the rest of the body
    /// and become `Failed to upload file` replies; only client socket
    /// failures are errors.
    pub async fn receive_upload(
        &self,
        target: &UploadTarget,
        len: u64,
        io: &mut SessionIo,
    ) -> Result<String, SessionError> {
        let buffer_size = self.transfer.buffer_size;

        if let Err(e) = self.storage.create_directory(&target.directory).await {
            io.drain(len, buffer_size).await?;
            return Ok(upload_failed(&e));
        }

        let mut sink = match self.storage.create_file(&target.file).await {
            Ok(sink) => sink,
            Err(e) => {
                io.drain(len, buffer_size).await?;
                return Ok(upload_failed(&e));
            }
        };

        let timeout = io.io_timeout();
        match wire::relay(&mut io.reader, &mut sink, len, buffer_size, timeout).await {
            Ok(_) => {}
            Err(RelayError::Source(e)) => return Err(SessionError::Client(e)),
            Err(RelayError::Sink { remaining, source }) => {
                drop(sink);
                io.drain(remaining, buffer_size).await?;
                tracing::warn!(path = %target.file.display(), error = %source, "Upload write failed");
                return Ok(upload_failed(&source));
            }
        }
        drop(sink);

        match self.storage.file_len(&target.file).await {
            Ok(stored) if stored == len => {
                tracing::info!(
                    node = %self.node.name,
                    path = %target.file.display(),
                    bytes = len,
                    "File stored"
                );
                Ok(format!("File {} uploaded successfully.", target.filename))
            }
            Ok(stored) => Ok(format!("Failed to upload file: wrote {} of {} bytes", stored, len)),
            Err(e) => Ok(upload_failed(&e)),
        }
    }

    /// Reply `Transfer ready` plus the file, or a failure line
    pub async fn send_file(&self, virtual_path: &str, io: &mut SessionIo) -> Result<(), SessionError> {
        if !self.owns(virtual_path) {
            return io.reply(status::INVALID_FILE_TYPE).await;
        }
        let path = match self.translate(virtual_path) {
            Ok(path) => path,
            Err(e) => return io.reply(&e.to_string()).await,
        };

        match self.storage.open_file(&path).await {
            Ok(source) => {
                let sent = io.send_ready_frame(source, self.transfer.buffer_size).await?;
                tracing::info!(node = %self.node.name, path = %path.display(), bytes = sent, "File sent");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Open failed");
                io.reply(&format!("Failed to open file: {}", e)).await
            }
        }
    }

    /// Remove a file; returns the reply line
    pub async fn remove(&self, virtual_path: &str) -> String {
        if !self.owns(virtual_path) {
            return status::INVALID_FILE_TYPE.to_string();
        }
        let path = match self.translate(virtual_path) {
            Ok(path) => path,
            Err(e) => return e.to_string(),
        };

        match self.storage.delete_file(&path).await {
            Ok(()) => {
                tracing::info!(node = %self.node.name, path = %path.display(), "File removed");
                format!("File {} removed", virtual_path)
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Remove failed");
                format!("Failed to remove file: {}", e)
            }
        }
    }

    /// Reply with a tar archive of this node's whole root
    pub async fn send_archive(&self, extension: &str, io: &mut SessionIo) -> Result<(), SessionError> {
        if extension != self.node.extension {
            return io.reply(status::INVALID_FILE_TYPE).await;
        }

        match self.storage.build_archive(&self.node.root).await {
            Ok(source) => {
                let sent = io.send_ready_frame(source, self.transfer.buffer_size).await?;
                tracing::info!(node = %self.node.name, bytes = sent, "Archive sent");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(node = %self.node.name, error = %e, "Archive failed");
                io.reply(&format!("Failed to create archive: {}", e)).await
            }
        }
    }

    /// Sorted names of this class's files in a directory
    ///
    /// A missing directory lists as empty. The error is the reply line.
    pub async fn list(&self, virtual_path: &str) -> Result<Vec<String>, String> {
        let dir = self.translate(virtual_path).map_err(|e| e.to_string())?;
        match self.storage.list_files(&dir).await {
            Ok(names) => Ok(names.into_iter().filter(|name| self.owns(name)).collect()),
            Err(e) if e.is_not_found() => Ok(Vec::new()),
            Err(e) => {
                tracing::warn!(path = %dir.display(), error = %e, "Listing failed");
                Err(format!("Failed to get {} files", self.node.extension))
            }
        }
    }
}

fn upload_failed(err: &dyn std::fmt::Display) -> String {
    format!("Failed to upload file: {}", err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::dispatcher::SessionIo;
    use crate::domain::extension::ExtensionClass;
    use crate::domain::node::fixtures::topology;
    use crate::domain::storage::{FileSink, FileSource, StorageError};
    use crate::infrastructure::storage::LocalStorageProvider;
    use std::path::Path;
    use tempfile::TempDir;
    use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt};

    fn namespace(home: &Path, class: ExtensionClass) -> LocalNamespace {
        let topo = Arc::new(topology(home));
        let node = topo.owner(class).clone();
        let storage = Arc::new(LocalStorageProvider::new(&node.root).unwrap());
        let transfer = TransferConfig {
            buffer_size: 4,
            ..TransferConfig::default()
        };
        LocalNamespace::new(node, topo, storage, transfer)
    }

    fn session() -> (SessionIo, tokio::io::DuplexStream) {
        let (server, client) = duplex(1 << 16);
        let (r, w) = tokio::io::split(server);
        (SessionIo::new(Box::new(r), Box::new(w), None), client)
    }

    #[tokio::test]
    async fn test_upload_target_checks_class_and_path() {
        let home = TempDir::new().unwrap();
        let ns = namespace(home.path(), ExtensionClass::Local);

        assert_eq!(ns.upload_target("a.pdf", "~/smain").unwrap_err(), "Invalid file type");
        assert!(ns.upload_target("a.c", "~/smain/../x").unwrap_err().starts_with("Invalid path"));

        let target = ns.upload_target("a.c", "~/smain/d").unwrap();
        assert_eq!(target.file, home.path().join("smain/d/a.c"));
    }

    #[tokio::test]
    async fn test_receive_upload_stores_exact_bytes() {
        let home = TempDir::new().unwrap();
        let ns = namespace(home.path(), ExtensionClass::Local);
        let (mut io, mut client) = session();

        client.write_all(b"0123456789next").await.unwrap();
        let target = ns.upload_target("a.c", "~/smain/d").unwrap();
        let reply = ns.receive_upload(&target, 10, &mut io).await.unwrap();

        assert_eq!(reply, "File a.c uploaded successfully.");
        assert_eq!(std::fs::read(&target.file).unwrap(), b"0123456789");

        let mut rest = [0u8; 4];
        io.reader.read_exact(&mut rest).await.unwrap();
        assert_eq!(&rest, b"next");
    }

    #[tokio::test]
    async fn test_receive_upload_failure_drains_body() {
        let home = TempDir::new().unwrap();
        let ns = namespace(home.path(), ExtensionClass::Local);
        std::fs::write(home.path().join("smain/blocker"), b"").unwrap();
        let (mut io, mut client) = session();

        client.write_all(b"abcdefNEXT").await.unwrap();
        let target = ns.upload_target("a.c", "~/smain/blocker/sub").unwrap();
        let reply = ns.receive_upload(&target, 6, &mut io).await.unwrap();

        assert!(reply.starts_with("Failed to upload file: "), "{}", reply);
        let mut rest = [0u8; 4];
        io.reader.read_exact(&mut rest).await.unwrap();
        assert_eq!(&rest, b"NEXT");
    }

    /// Local storage whose reported lengths come up short by one byte
    struct ShortLenStorage(LocalStorageProvider);

    #[async_trait::async_trait]
    impl StorageProvider for ShortLenStorage {
        async fn create_directory(&self, path: &Path) -> Result<(), StorageError> {
            self.0.create_directory(path).await
        }
        async fn create_file(&self, path: &Path) -> Result<FileSink, StorageError> {
            self.0.create_file(path).await
        }
        async fn open_file(&self, path: &Path) -> Result<FileSource, StorageError> {
            self.0.open_file(path).await
        }
        async fn delete_file(&self, path: &Path) -> Result<(), StorageError> {
            self.0.delete_file(path).await
        }
        async fn file_len(&self, path: &Path) -> Result<u64, StorageError> {
            Ok(self.0.file_len(path).await?.saturating_sub(1))
        }
        async fn list_files(&self, path: &Path) -> Result<Vec<String>, StorageError> {
            self.0.list_files(path).await
        }
        async fn build_archive(&self, root: &Path) -> Result<FileSource, StorageError> {
            self.0.build_archive(root).await
        }
        async fn health_check(&self) -> Result<(), StorageError> {
            self.0.health_check().await
        }
    }

    #[tokio::test]
    async fn test_receive_upload_reports_short_write() {
        let home = TempDir::new().unwrap();
        let topo = Arc::new(topology(home.path()));
        let node = topo.owner(ExtensionClass::Local).clone();
        let storage = Arc::new(ShortLenStorage(LocalStorageProvider::new(&node.root).unwrap()));
        let ns = LocalNamespace::new(node, topo, storage, TransferConfig::default());
        let (mut io, mut client) = session();

        client.write_all(b"0123456789").await.unwrap();
        let target = ns.upload_target("a.c", "~/smain/d").unwrap();
        let reply = ns.receive_upload(&target, 10, &mut io).await.unwrap();

        assert_eq!(reply, "Failed to upload file: wrote 9 of 10 bytes");
    }

    #[tokio::test]
    async fn test_send_missing_file() {
        let home = TempDir::new().unwrap();
        let ns = namespace(home.path(), ExtensionClass::Local);
        let (mut io, client) = session();

        ns.send_file("~/smain/none.c", &mut io).await.unwrap();
        drop(io);

        let mut out = String::new();
        let mut client = client;
        client.read_to_string(&mut out).await.unwrap();
        assert!(out.starts_with("Failed to open file: "), "{}", out);
        assert!(out.contains("none.c"));
    }

    #[tokio::test]
    async fn test_remove_and_list() {
        let home = TempDir::new().unwrap();
        let ns = namespace(home.path(), ExtensionClass::BackendB);
        let root = home.path().join("stext");
        std::fs::write(root.join("b.txt"), b"").unwrap();
        std::fs::write(root.join("a.txt"), b"").unwrap();
        std::fs::write(root.join("x.c"), b"").unwrap();

        assert_eq!(ns.list("~/smain").await.unwrap(), vec!["a.txt", "b.txt"]);
        assert_eq!(ns.remove("~/smain/a.txt").await, "File ~/smain/a.txt removed");
        assert_eq!(ns.list("~/stext").await.unwrap(), vec!["b.txt"]);
        assert!(ns.remove("~/smain/a.txt").await.starts_with("Failed to remove file: "));
        assert_eq!(ns.remove("~/smain/x.c").await, "Invalid file type");
        assert!(ns.list("~/smain/missing").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_archive_rejects_foreign_extension() {
        let home = TempDir::new().unwrap();
        let ns = namespace(home.path(), ExtensionClass::BackendA);
        let (mut io, client) = session();

        ns.send_archive(".txt", &mut io).await.unwrap();
        drop(io);

        let mut out = String::new();
        let mut client = client;
        client.read_to_string(&mut out).await.unwrap();
        assert_eq!(out, "Invalid file type\n");
    }
}
