// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Application
//!
//! Session dispatch plus the router and backend node services.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Implements internal responsibilities for mod

pub mod dispatcher;
pub mod local_namespace;
pub mod node;
pub mod router;

pub use dispatcher::{CommandHandler, SessionError, SessionIo};
pub use node::NodeService;
pub use router::RouterService;
