// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Router Service
//!
//! The client-facing node. Files of the router's own class are handled by a
//! [`LocalNamespace`]; the other two classes are proxied to their backend
//! nodes over a fresh [`RemoteSession`] per command:
//!
//! - **ufile**: accept, then relay the client's frame to the owner
//! - **dfile / dtar**: relay the owner's `Transfer ready` frame back
//! - **rmfile**: forward the owner's single reply line
//! - **display**: merge the local listing with both backend listings
//!
//! Node failures become reply lines; the client session carries on. The one
//! exception is a node dying halfway through a frame the router has already
//! started forwarding, which ends the client session.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Implements internal responsibilities for router

use crate::application::dispatcher::{CommandHandler, SessionError, SessionIo};
use crate::application::local_namespace::LocalNamespace;
use crate::domain::command::Command;
use crate::domain::extension::ExtensionClass;
use crate::domain::namespace::NamespaceTranslator;
use crate::domain::node::{StorageNode, StorageTopology};
use crate::domain::node_config::TransferConfig;
use crate::domain::storage::StorageProvider;
use crate::infrastructure::remote_session::{RemoteError, RemoteSession};
use crate::infrastructure::wire::{self, status, RelayError, MAX_LISTING_LEN};
use async_trait::async_trait;
use std::sync::Arc;

pub struct RouterService {
    topology: Arc<StorageTopology>,
    translator: NamespaceTranslator,
    local: LocalNamespace,
    transfer: TransferConfig,
}

impl RouterService {
    pub fn new(
        topology: Arc<StorageTopology>,
        storage: Arc<dyn StorageProvider>,
        transfer: TransferConfig,
    ) -> Self {
        let local = LocalNamespace::new(
            topology.local().clone(),
            topology.clone(),
            storage,
            transfer.clone(),
        );
        Self {
            translator: NamespaceTranslator::new(topology.clone()),
            topology,
            local,
            transfer,
        }
    }

    async fn upload(&self, filename: String, destination: String, io: &mut SessionIo) -> Result<(), SessionError> {
        let Some(class) = self.topology.classify(&filename) else {
            return io.reply(status::INVALID_FILE_TYPE).await;
        };

        if class == ExtensionClass::Local {
            let target = match self.local.upload_target(&filename, &destination) {
                Ok(target) => target,
                Err(reply) => return io.reply(&reply).await,
            };
            io.reply(status::FILE_TYPE_ACCEPTED).await?;
            let len = io.read_frame_header().await?;
            let reply = self.local.receive_upload(&target, len, io).await?;
            return io.reply(&reply).await;
        }

        let owner = self.topology.owner(class);
        let directory = match self
            .translator
            .translate_file(&destination, &filename, owner)
            .and_then(|(directory, _)| self.translator.to_virtual(&directory))
        {
            Ok(directory) => directory,
            Err(e) => return io.reply(&e.to_string()).await,
        };
        io.reply(status::FILE_TYPE_ACCEPTED).await?;
        let len = io.read_frame_header().await?;

        let request = Command::Upload {
            filename,
            destination: directory,
        };
        let reply = match self.forward_upload(owner, &request, len, io).await? {
            Ok(line) => line,
            Err(e) => e.to_string(),
        };
        io.reply(&reply).await
    }

    /// Relay a `len`-byte upload body to `owner` and return its reply line
    ///
    /// The outer error is a client failure; the inner one a node failure,
    /// after which the client's body has been fully consumed.
    async fn forward_upload(
        &self,
        owner: &StorageNode,
        request: &Command,
        len: u64,
        io: &mut SessionIo,
    ) -> Result<Result<String, RemoteError>, SessionError> {
        let buffer_size = self.transfer.buffer_size;

        let mut session = match RemoteSession::open(owner, Some(request), &self.transfer).await {
            Ok(session) => session,
            Err(e) => {
                io.drain(len, buffer_size).await?;
                return Ok(Err(e));
            }
        };

        if let Err(e) = session.write_frame_header(len).await {
            io.drain(len, buffer_size).await?;
            return Ok(Err(e));
        }

        let timeout = io.io_timeout();
        match wire::relay(&mut io.reader, session.writer_mut(), len, buffer_size, timeout).await {
            Ok(sent) => {
                tracing::debug!(node = %owner.name, bytes = sent, "Upload relayed");
            }
            Err(RelayError::Source(e)) => return Err(SessionError::Client(e)),
            Err(RelayError::Sink { remaining, source }) => {
                io.drain(remaining, buffer_size).await?;
                return Ok(Err(RemoteError::from_wire(&owner.name, source)));
            }
        }

        if let Err(e) = session.finish_request().await {
            return Ok(Err(e));
        }
        Ok(session.read_line().await)
    }

    async fn download(&self, path: String, io: &mut SessionIo) -> Result<(), SessionError> {
        let Some(class) = self.topology.classify(&path) else {
            return io.reply(status::INVALID_FILE_TYPE).await;
        };
        if class == ExtensionClass::Local {
            return self.local.send_file(&path, io).await;
        }

        let owner = self.topology.owner(class);
        if let Err(e) = self.translator.translate(&path, owner) {
            return io.reply(&e.to_string()).await;
        }
        self.forward_transfer(owner, &Command::Download { path }, io).await
    }

    async fn remove(&self, path: String, io: &mut SessionIo) -> Result<(), SessionError> {
        let Some(class) = self.topology.classify(&path) else {
            return io.reply(status::INVALID_FILE_TYPE).await;
        };
        if class == ExtensionClass::Local {
            let reply = self.local.remove(&path).await;
            return io.reply(&reply).await;
        }

        let owner = self.topology.owner(class);
        if let Err(e) = self.translator.translate(&path, owner) {
            return io.reply(&e.to_string()).await;
        }
        let reply = match RemoteSession::exchange(owner, &Command::Remove { path }, &self.transfer).await {
            Ok((_, line)) => line,
            Err(e) => e.to_string(),
        };
        io.reply(&reply).await
    }

    async fn archive(&self, extension: String, io: &mut SessionIo) -> Result<(), SessionError> {
        let Some(class) = self.topology.extensions().class_of_suffix(&extension) else {
            return io.reply(status::INVALID_FILE_TYPE).await;
        };
        if class == ExtensionClass::Local {
            return self.local.send_archive(&extension, io).await;
        }

        let owner = self.topology.owner(class);
        self.forward_transfer(owner, &Command::Archive { extension }, io).await
    }

    /// Send `request` to `owner` and pass its reply, and frame if any, through
    async fn forward_transfer(&self, owner: &StorageNode, request: &Command, io: &mut SessionIo) -> Result<(), SessionError> {
        let (mut session, line) = match RemoteSession::exchange(owner, request, &self.transfer).await {
            Ok(exchanged) => exchanged,
            Err(e) => return io.reply(&e.to_string()).await,
        };

        if line != status::TRANSFER_READY {
            return io.reply(&line).await;
        }

        let len = match session.read_frame_header().await {
            Ok(len) => len,
            Err(e) => return io.reply(&e.to_string()).await,
        };

        io.reply(status::TRANSFER_READY).await?;
        io.write_frame_header(len).await?;

        let timeout = io.io_timeout();
        match wire::relay(session.reader_mut(), &mut io.writer, len, self.transfer.buffer_size, timeout).await {
            Ok(sent) => {
                tracing::info!(node = %owner.name, verb = %request.verb(), bytes = sent, "Transfer relayed");
                Ok(())
            }
            Err(RelayError::Source(e)) => {
                tracing::warn!(node = %owner.name, error = %e, "Node failed mid-transfer");
                Err(SessionError::Aborted(RemoteError::from_wire(&owner.name, e).to_string()))
            }
            Err(RelayError::Sink { source, .. }) => Err(SessionError::Client(source)),
        }
    }

    async fn display(&self, path: String, io: &mut SessionIo) -> Result<(), SessionError> {
        let local = match self.local.list(&path).await {
            Ok(names) => names,
            Err(reply) => return io.reply(&reply).await,
        };

        let mut lines = local;
        for node in self.topology.backends() {
            lines.extend(self.remote_listing(node, &path).await);
        }

        let body = if lines.is_empty() {
            format!("{}\n", status::NO_FILES_FOUND)
        } else {
            let mut body = lines.join("\n");
            body.push('\n');
            body
        };

        io.reply(status::TRANSFER_READY).await?;
        io.write_frame(body.as_bytes()).await
    }

    /// Listing lines contributed by one backend node
    async fn remote_listing(&self, node: &StorageNode, path: &str) -> Vec<String> {
        let request = Command::Display {
            path: path.to_string(),
        };
        let failed = || vec![format!("Failed to get {} files", node.extension)];

        let (mut session, line) = match RemoteSession::exchange(node, &request, &self.transfer).await {
            Ok(exchanged) => exchanged,
            Err(e) => {
                tracing::warn!(node = %node.name, error = %e, "Listing unavailable");
                return failed();
            }
        };

        if line != status::TRANSFER_READY {
            return vec![line];
        }

        match session.read_frame(MAX_LISTING_LEN).await {
            Ok(body) => String::from_utf8_lossy(&body)
                .lines()
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .collect(),
            Err(e) => {
                tracing::warn!(node = %node.name, error = %e, "Listing transfer failed");
                failed()
            }
        }
    }
}

#[async_trait]
impl CommandHandler for RouterService {
    async fn handle(&self, command: Command, io: &mut SessionIo) -> Result<(), SessionError> {
        match command {
            Command::Upload { filename, destination } => self.upload(filename, destination, io).await,
            Command::Download { path } => self.download(path, io).await,
            Command::Remove { path } => self.remove(path, io).await,
            Command::Archive { extension } => self.archive(extension, io).await,
            Command::Display { path } => self.display(path, io).await,
        }
    }
}
