// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Backend Node Service
//!
//! Serves the command surface for a single extension class out of the
//! node's own root. Both backend nodes are instances of this service.
//!
//! Differences from the router's protocol:
//! - `ufile` has no acceptance handshake: the frame follows the request
//!   line directly, and a rejected upload drains it before replying.
//! - `display` answers with `Transfer ready` and a frame holding only this
//!   node's names, one per line, possibly empty.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Implements internal responsibilities for node

use crate::application::dispatcher::{CommandHandler, SessionError, SessionIo};
use crate::application::local_namespace::LocalNamespace;
use crate::domain::command::Command;
use crate::domain::node::{StorageNode, StorageTopology};
use crate::domain::node_config::TransferConfig;
use crate::domain::storage::StorageProvider;
use crate::infrastructure::wire::status;
use async_trait::async_trait;
use std::sync::Arc;

pub struct NodeService {
    local: LocalNamespace,
}

impl NodeService {
    pub fn new(
        node: StorageNode,
        topology: Arc<StorageTopology>,
        storage: Arc<dyn StorageProvider>,
        transfer: TransferConfig,
    ) -> Self {
        Self {
            local: LocalNamespace::new(node, topology, storage, transfer),
        }
    }

    async fn upload(&self, filename: String, destination: String, io: &mut SessionIo) -> Result<(), SessionError> {
        let len = io.read_frame_header().await?;
        let reply = match self.local.upload_target(&filename, &destination) {
            Ok(target) => self.local.receive_upload(&target, len, io).await?,
            Err(reply) => {
                io.drain(len, self.local.transfer().buffer_size).await?;
                reply
            }
        };
        io.reply(&reply).await
    }

    async fn display(&self, path: String, io: &mut SessionIo) -> Result<(), SessionError> {
        match self.local.list(&path).await {
            Ok(names) => {
                let mut body = String::new();
                for name in names {
                    body.push_str(&name);
                    body.push('\n');
                }
                io.reply(status::TRANSFER_READY).await?;
                io.write_frame(body.as_bytes()).await
            }
            Err(reply) => io.reply(&reply).await,
        }
    }
}

#[async_trait]
impl CommandHandler for NodeService {
    async fn handle(&self, command: Command, io: &mut SessionIo) -> Result<(), SessionError> {
        match command {
            Command::Upload { filename, destination } => self.upload(filename, destination, io).await,
            Command::Download { path } => self.local.send_file(&path, io).await,
            Command::Remove { path } => {
                let reply = self.local.remove(&path).await;
                io.reply(&reply).await
            }
            Command::Archive { extension } => self.local.send_archive(&extension, io).await,
            Command::Display { path } => self.display(path, io).await,
        }
    }
}
