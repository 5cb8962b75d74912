// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Remote Session
//!
//! One short-lived TCP connection from the router to a backend node. A
//! session carries exactly one command and is dropped afterwards; sessions
//! are never pooled or shared between client sessions.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure Layer
//! - **Purpose:** Implements internal responsibilities for remote session

use crate::domain::command::Command;
use crate::domain::node::StorageNode;
use crate::domain::node_config::TransferConfig;
use crate::infrastructure::wire::{self, WireError};
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

/// Failures talking to a backend node
///
/// The display text of each variant is the reply line sent to the client.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Failed to reach node {node}: {reason}")]
    Unreachable { node: String, reason: String },

    #[error("Node {node} timed out")]
    Timeout { node: String },

    #[error("Node {node} closed the connection without replying")]
    NoResponse { node: String },

    #[error("Transfer with node {node} failed: {source}")]
    Transfer {
        node: String,
        #[source]
        source: WireError,
    },
}

impl RemoteError {
    pub fn from_wire(node: &str, err: WireError) -> Self {
        match err {
            WireError::Timeout(_) => RemoteError::Timeout {
                node: node.to_string(),
            },
            source => RemoteError::Transfer {
                node: node.to_string(),
                source,
            },
        }
    }
}

pub struct RemoteSession {
    node: String,
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    io_timeout: Duration,
}

impl RemoteSession {
    /// Connect to `node` and send `request`, if any
    pub async fn open(
        node: &StorageNode,
        request: Option<&Command>,
        transfer: &TransferConfig,
    ) -> Result<Self, RemoteError> {
        let addr = node.endpoint.to_string();
        let stream = match tokio::time::timeout(transfer.connect_timeout, TcpStream::connect(&addr)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                tracing::warn!(node = %node.name, endpoint = %addr, error = %e, "Node connect failed");
                return Err(RemoteError::Unreachable {
                    node: node.name.clone(),
                    reason: e.to_string(),
                });
            }
            Err(_) => {
                tracing::warn!(node = %node.name, endpoint = %addr, "Node connect timed out");
                return Err(RemoteError::Unreachable {
                    node: node.name.clone(),
                    reason: format!("connect timed out after {:?}", transfer.connect_timeout),
                });
            }
        };
        let _ = stream.set_nodelay(true);
        tracing::debug!(node = %node.name, endpoint = %addr, "Connected to node");

        let (read_half, write_half) = stream.into_split();
        let mut session = Self {
            node: node.name.clone(),
            reader: BufReader::new(read_half),
            writer: write_half,
            io_timeout: transfer.io_timeout,
        };

        if let Some(command) = request {
            session.send_line(&command.to_string()).await?;
        }
        Ok(session)
    }

    /// Open a session, send `request` and read the node's first reply line
    pub async fn exchange(
        node: &StorageNode,
        request: &Command,
        transfer: &TransferConfig,
    ) -> Result<(Self, String), RemoteError> {
        let mut session = Self::open(node, Some(request), transfer).await?;
        let line = session.read_line().await?;
        Ok((session, line))
    }

    pub async fn send_line(&mut self, line: &str) -> Result<(), RemoteError> {
        wire::write_line(&mut self.writer, line, Some(self.io_timeout))
            .await
            .map_err(|e| RemoteError::from_wire(&self.node, e))
    }

    /// Read one reply line; end of stream is [`RemoteError::NoResponse`]
    pub async fn read_line(&mut self) -> Result<String, RemoteError> {
        match wire::read_line(&mut self.reader, Some(self.io_timeout)).await {
            Ok(Some(line)) => Ok(line),
            Ok(None) => Err(RemoteError::NoResponse {
                node: self.node.clone(),
            }),
            Err(e) => Err(RemoteError::from_wire(&self.node, e)),
        }
    }

    pub async fn read_frame_header(&mut self) -> Result<u64, RemoteError> {
        wire::read_frame_header(&mut self.reader, Some(self.io_timeout))
            .await
            .map_err(|e| RemoteError::from_wire(&self.node, e))
    }

    pub async fn read_frame(&mut self, limit: u64) -> Result<Vec<u8>, RemoteError> {
        wire::read_frame(&mut self.reader, limit, Some(self.io_timeout))
            .await
            .map_err(|e| RemoteError::from_wire(&self.node, e))
    }

    pub async fn write_frame_header(&mut self, len: u64) -> Result<(), RemoteError> {
        wire::write_frame_header(&mut self.writer, len, Some(self.io_timeout))
            .await
            .map_err(|e| RemoteError::from_wire(&self.node, e))
    }

    /// Half-close the request direction once the request is complete
    pub async fn finish_request(&mut self) -> Result<(), RemoteError> {
        wire::bounded(Some(self.io_timeout), self.writer.shutdown())
            .await
            .map_err(|e| RemoteError::from_wire(&self.node, e))
    }

    pub fn reader_mut(&mut self) -> &mut BufReader<OwnedReadHalf> {
        &mut self.reader
    }

    pub fn writer_mut(&mut self) -> &mut OwnedWriteHalf {
        &mut self.writer
    }
}
