// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Command Dispatcher
//!
//! Drives one client session: read a line, parse it, hand the command to a
//! [`CommandHandler`], repeat. Parse failures are answered with
//! `Invalid command` and the session continues, including lines that are
//! not valid UTF-8. The session ends on end of stream, on a client socket
//! failure, or when the shutdown token is cancelled between commands.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Implements internal responsibilities for dispatcher

use crate::domain::command::Command;
use crate::domain::storage::FileSource;
use crate::infrastructure::wire::{self, status, RelayError, WireError};
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite, BufReader};
use tokio_util::sync::CancellationToken;

pub type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;
pub type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Errors that end a client session
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("client connection failed: {0}")]
    Client(#[from] WireError),

    #[error("transfer aborted mid-frame: {0}")]
    Aborted(String),
}

/// Both directions of a client connection
pub struct SessionIo {
    pub reader: BufReader<BoxedReader>,
    pub writer: BoxedWriter,
    io_timeout: Option<Duration>,
}

impl SessionIo {
    /// `io_timeout` bounds replies and frame bodies; waiting for the next
    /// command is never bounded.
    pub fn new(reader: BoxedReader, writer: BoxedWriter, io_timeout: Option<Duration>) -> Self {
        Self {
            reader: BufReader::new(reader),
            writer,
            io_timeout,
        }
    }

    pub fn io_timeout(&self) -> Option<Duration> {
        self.io_timeout
    }

    pub async fn read_command_line(&mut self) -> Result<Option<String>, SessionError> {
        Ok(wire::read_line(&mut self.reader, None).await?)
    }

    pub async fn reply(&mut self, line: &str) -> Result<(), SessionError> {
        Ok(wire::write_line(&mut self.writer, line, self.io_timeout).await?)
    }

    pub async fn read_frame_header(&mut self) -> Result<u64, SessionError> {
        Ok(wire::read_frame_header(&mut self.reader, self.io_timeout).await?)
    }

    pub async fn write_frame_header(&mut self, len: u64) -> Result<(), SessionError> {
        Ok(wire::write_frame_header(&mut self.writer, len, self.io_timeout).await?)
    }

    pub async fn write_frame(&mut self, body: &[u8]) -> Result<(), SessionError> {
        Ok(wire::write_frame(&mut self.writer, body, self.io_timeout).await?)
    }

    /// Discard the rest of an incoming frame so the next line parses
    pub async fn drain(&mut self, len: u64, buffer_size: usize) -> Result<(), SessionError> {
        Ok(wire::drain(&mut self.reader, len, buffer_size, self.io_timeout).await?)
    }

    /// `Transfer ready` followed by one frame streamed from `source`
    ///
    /// A source that fails mid-frame leaves the client unable to resync, so
    /// it ends the session.
    pub async fn send_ready_frame(&mut self, mut source: FileSource, buffer_size: usize) -> Result<u64, SessionError> {
        self.reply(status::TRANSFER_READY).await?;
        self.write_frame_header(source.len).await?;
        match wire::relay(&mut source.reader, &mut self.writer, source.len, buffer_size, self.io_timeout).await {
            Ok(sent) => Ok(sent),
            Err(RelayError::Source(e)) => Err(SessionError::Aborted(e.to_string())),
            Err(RelayError::Sink { source, .. }) => Err(SessionError::Client(source)),
        }
    }
}

/// Executes parsed commands for one kind of node
#[async_trait]
pub trait CommandHandler: Send + Sync + 'static {
    /// Execute `command`, writing its terminal reply to `io`
    ///
    /// Return an error only when the client connection can no longer be used.
    async fn handle(&self, command: Command, io: &mut SessionIo) -> Result<(), SessionError>;
}

/// Serve commands on one connection until it closes
pub async fn run_session<H>(handler: &H, io: &mut SessionIo, shutdown: &CancellationToken) -> Result<(), SessionError>
where
    H: CommandHandler + ?Sized,
{
    loop {
        let line = tokio::select! {
            _ = shutdown.cancelled() => {
                tracing::debug!("Session closing for shutdown");
                return Ok(());
            }
            line = io.read_command_line() => line,
        };

        // The whole line was consumed, so the stream is still in sync.
        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => return Ok(()),
            Err(SessionError::Client(WireError::InvalidUtf8)) => {
                tracing::debug!("Rejected command line that is not UTF-8");
                io.reply(status::INVALID_COMMAND).await?;
                continue;
            }
            Err(e) => return Err(e),
        };

        match Command::parse(&line) {
            Ok(command) => {
                tracing::info!(verb = %command.verb(), command = %command, "Dispatching command");
                handler.handle(command, io).await?;
            }
            Err(e) => {
                tracing::debug!(line = %line, error = %e, "Rejected command line");
                io.reply(status::INVALID_COMMAND).await?;
            }
        }
    }
}
