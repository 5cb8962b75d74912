// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Store Client
//!
//! Programmatic client for the router's line protocol. One `StoreClient`
//! wraps one connection and issues commands sequentially; any number of
//! commands may be sent over the same connection.
//!
//! Replies that signal failure are returned as [`ClientError::Rejected`]
//! carrying the router's line verbatim.
//!
//! # Architecture
//!
//! - **Layer:** Presentation Layer
//! - **Purpose:** Implements internal responsibilities for client

use crate::domain::command::Command;
use crate::domain::node_config::TransferConfig;
use crate::infrastructure::wire::{self, status, RelayError, WireError, MAX_LISTING_LEN};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpStream, ToSocketAddrs};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Protocol error: {0}")]
    Wire(#[from] WireError),

    #[error("Transfer failed: {0}")]
    Relay(#[from] RelayError),

    #[error("{0}")]
    Rejected(String),

    #[error("Server closed the connection")]
    Closed,

    #[error("Invalid local file: {0}")]
    InvalidLocalFile(String),
}

pub struct StoreClient {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    buffer_size: usize,
    io_timeout: Option<Duration>,
}

impl StoreClient {
    pub async fn connect(addr: impl ToSocketAddrs) -> Result<Self, ClientError> {
        Self::connect_with(addr, &TransferConfig::default()).await
    }

    pub async fn connect_with(addr: impl ToSocketAddrs, transfer: &TransferConfig) -> Result<Self, ClientError> {
        let stream = tokio::time::timeout(transfer.connect_timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| WireError::Timeout(transfer.connect_timeout))??;
        let _ = stream.set_nodelay(true);
        let (read_half, write_half) = stream.into_split();
        Ok(Self {
            reader: BufReader::new(read_half),
            writer: write_half,
            buffer_size: transfer.buffer_size,
            io_timeout: Some(transfer.io_timeout),
        })
    }

    /// Send one raw line and read one reply line
    pub async fn send_command(&mut self, line: &str) -> Result<String, ClientError> {
        wire::write_line(&mut self.writer, line, self.io_timeout).await?;
        self.read_reply().await
    }

    async fn request(&mut self, command: &Command) -> Result<String, ClientError> {
        self.send_command(&command.to_string()).await
    }

    async fn read_reply(&mut self) -> Result<String, ClientError> {
        wire::read_line(&mut self.reader, self.io_timeout)
            .await?
            .ok_or(ClientError::Closed)
    }

    /// Upload `len` bytes from `reader` as `filename` into `destination`
    pub async fn upload_from<R>(
        &mut self,
        filename: &str,
        destination: &str,
        reader: &mut R,
        len: u64,
    ) -> Result<String, ClientError>
    where
        R: AsyncRead + Unpin,
    {
        let command = Command::Upload {
            filename: filename.to_string(),
            destination: destination.to_string(),
        };
        let reply = self.request(&command).await?;
        if reply != status::FILE_TYPE_ACCEPTED {
            return Err(ClientError::Rejected(reply));
        }

        wire::write_frame_header(&mut self.writer, len, self.io_timeout).await?;
        wire::relay(reader, &mut self.writer, len, self.buffer_size, self.io_timeout).await?;

        let reply = self.read_reply().await?;
        if reply == format!("File {} uploaded successfully.", filename) {
            Ok(reply)
        } else {
            Err(ClientError::Rejected(reply))
        }
    }

    /// Upload a local file, keeping its file name
    pub async fn upload(&mut self, file: &Path, destination: &str) -> Result<String, ClientError> {
        let filename = file
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| ClientError::InvalidLocalFile(file.display().to_string()))?
            .to_string();
        let mut source = tokio::fs::File::open(file).await?;
        let len = source.metadata().await?.len();
        self.upload_from(&filename, destination, &mut source, len).await
    }

    /// Download a file into `writer`; returns the byte count
    pub async fn download_to<W>(&mut self, path: &str, writer: &mut W) -> Result<u64, ClientError>
    where
        W: AsyncWrite + Unpin,
    {
        let command = Command::Download {
            path: path.to_string(),
        };
        self.receive_transfer(&command, writer).await
    }

    /// Download a file to `output`, created only once the router is ready
    pub async fn download(&mut self, path: &str, output: &Path) -> Result<u64, ClientError> {
        let command = Command::Download {
            path: path.to_string(),
        };
        self.receive_transfer_to_file(&command, output).await
    }

    pub async fn remove(&mut self, path: &str) -> Result<String, ClientError> {
        let reply = self
            .request(&Command::Remove {
                path: path.to_string(),
            })
            .await?;
        if reply == format!("File {} removed", path) {
            Ok(reply)
        } else {
            Err(ClientError::Rejected(reply))
        }
    }

    /// Fetch the tar archive for one extension into `writer`
    pub async fn archive_to<W>(&mut self, extension: &str, writer: &mut W) -> Result<u64, ClientError>
    where
        W: AsyncWrite + Unpin,
    {
        let command = Command::Archive {
            extension: extension.to_string(),
        };
        self.receive_transfer(&command, writer).await
    }

    pub async fn archive(&mut self, extension: &str, output: &Path) -> Result<u64, ClientError> {
        let command = Command::Archive {
            extension: extension.to_string(),
        };
        self.receive_transfer_to_file(&command, output).await
    }

    /// Merged listing text, one entry per line
    pub async fn display(&mut self, path: &str) -> Result<String, ClientError> {
        let reply = self
            .request(&Command::Display {
                path: path.to_string(),
            })
            .await?;
        if reply != status::TRANSFER_READY {
            return Err(ClientError::Rejected(reply));
        }
        let body = wire::read_frame(&mut self.reader, 3 * MAX_LISTING_LEN + 4096, self.io_timeout).await?;
        Ok(String::from_utf8_lossy(&body).into_owned())
    }

    /// Send `command` and read up to the frame header of a ready transfer
    async fn begin_transfer(&mut self, command: &Command) -> Result<u64, ClientError> {
        let reply = self.request(command).await?;
        if reply != status::TRANSFER_READY {
            return Err(ClientError::Rejected(reply));
        }
        Ok(wire::read_frame_header(&mut self.reader, self.io_timeout).await?)
    }

    async fn receive_transfer<W>(&mut self, command: &Command, writer: &mut W) -> Result<u64, ClientError>
    where
        W: AsyncWrite + Unpin,
    {
        let len = self.begin_transfer(command).await?;
        Ok(wire::relay(&mut self.reader, writer, len, self.buffer_size, self.io_timeout).await?)
    }

    async fn receive_transfer_to_file(&mut self, command: &Command, output: &Path) -> Result<u64, ClientError> {
        let len = self.begin_transfer(command).await?;
        let mut file = match tokio::fs::File::create(output).await {
            Ok(file) => file,
            Err(e) => {
                wire::drain(&mut self.reader, len, self.buffer_size, self.io_timeout).await?;
                return Err(e.into());
            }
        };
        let received = wire::relay(&mut self.reader, &mut file, len, self.buffer_size, self.io_timeout).await?;
        file.flush().await?;
        Ok(received)
    }
}
