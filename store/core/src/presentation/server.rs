// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! TCP Server
//!
//! Accepts connections and runs one session task per connection against a
//! shared [`CommandHandler`]. Sessions share nothing but the handler.
//!
//! Cancelling the shutdown token stops the accept loop; sessions finish the
//! command in progress and close. [`Server::run`] returns once every session
//! task has ended.
//!
//! # Architecture
//!
//! - **Layer:** Presentation Layer
//! - **Purpose:** Implements internal responsibilities for server

use crate::application::dispatcher::{run_session, CommandHandler, SessionIo};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

pub struct Server<H: CommandHandler> {
    name: String,
    listener: TcpListener,
    handler: Arc<H>,
    io_timeout: Duration,
    shutdown: CancellationToken,
    tracker: TaskTracker,
}

impl<H: CommandHandler> Server<H> {
    pub async fn bind(
        name: impl Into<String>,
        addr: impl ToSocketAddrs,
        handler: H,
        io_timeout: Duration,
    ) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self::from_listener(name, listener, handler, io_timeout))
    }

    pub fn from_listener(name: impl Into<String>, listener: TcpListener, handler: H, io_timeout: Duration) -> Self {
        Self {
            name: name.into(),
            listener,
            handler: Arc::new(handler),
            io_timeout,
            shutdown: CancellationToken::new(),
            tracker: TaskTracker::new(),
        }
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Token that stops this server when cancelled
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub async fn run(self) -> std::io::Result<()> {
        let addr = self.listener.local_addr()?;
        tracing::info!(server = %self.name, addr = %addr, "Listening");

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    tracing::info!(server = %self.name, "Shutdown requested, no longer accepting");
                    break;
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => self.spawn_session(stream, peer),
                    Err(e) => {
                        tracing::warn!(server = %self.name, error = %e, "Accept failed");
                        tokio::time::sleep(Duration::from_millis(100)).await;
                    }
                },
            }
        }

        self.tracker.close();
        self.tracker.wait().await;
        tracing::info!(server = %self.name, "All sessions closed");
        Ok(())
    }

    fn spawn_session(&self, stream: TcpStream, peer: SocketAddr) {
        let _ = stream.set_nodelay(true);
        let handler = self.handler.clone();
        let shutdown = self.shutdown.clone();
        let io_timeout = self.io_timeout;
        let server = self.name.clone();

        self.tracker.spawn(async move {
            tracing::info!(server = %server, peer = %peer, "Client connected");
            let (read_half, write_half) = stream.into_split();
            let mut io = SessionIo::new(Box::new(read_half), Box::new(write_half), Some(io_timeout));

            match run_session(handler.as_ref(), &mut io, &shutdown).await {
                Ok(()) => tracing::info!(server = %server, peer = %peer, "Client disconnected"),
                Err(e) => tracing::warn!(server = %server, peer = %peer, error = %e, "Session ended with error"),
            }
        });
    }
}
