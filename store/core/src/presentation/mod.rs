// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Presentation
//!
//! TCP server and client for the line protocol, plus the bootstrap that
//! wires a configured node into a server.
//!
//! # Architecture
//!
//! - **Layer:** Presentation Layer
//! - **Purpose:** Implements internal responsibilities for mod

pub mod client;
pub mod server;

pub use client::{ClientError, StoreClient};
pub use server::Server;

use crate::application::{NodeService, RouterService};
use crate::domain::extension::ExtensionClass;
use crate::domain::node_config::TransferConfig;
use crate::domain::node::StorageTopology;
use crate::infrastructure::storage::create_storage_provider;
use std::sync::Arc;

/// Bind the router on its configured endpoint
pub async fn bind_router(
    topology: Arc<StorageTopology>,
    transfer: &TransferConfig,
) -> anyhow::Result<Server<RouterService>> {
    let local = topology.local().clone();
    let storage = create_storage_provider(&local)?;
    storage
        .health_check()
        .await
        .map_err(|e| anyhow::anyhow!("Storage for {} is not usable: {}", local.name, e))?;
    let service = RouterService::new(topology, storage, transfer.clone());
    let server = Server::bind(
        local.name.clone(),
        (local.endpoint.host.as_str(), local.endpoint.port),
        service,
        transfer.io_timeout,
    )
    .await
    .map_err(|e| anyhow::anyhow!("Failed to bind router {} on {}: {}", local.name, local.endpoint, e))?;
    Ok(server)
}

/// Bind a backend node on its configured endpoint
pub async fn bind_node(
    topology: Arc<StorageTopology>,
    class: ExtensionClass,
    transfer: &TransferConfig,
) -> anyhow::Result<Server<NodeService>> {
    if !class.is_remote() {
        anyhow::bail!("The {} class is served by the router", class);
    }
    let node = topology.owner(class).clone();
    let storage = create_storage_provider(&node)?;
    storage
        .health_check()
        .await
        .map_err(|e| anyhow::anyhow!("Storage for {} is not usable: {}", node.name, e))?;
    let endpoint = node.endpoint.clone();
    let name = node.name.clone();
    let service = NodeService::new(node, topology, storage, transfer.clone());
    let server = Server::bind(
        name.clone(),
        (endpoint.host.as_str(), endpoint.port),
        service,
        transfer.io_timeout,
    )
    .await
    .map_err(|e| anyhow::anyhow!("Failed to bind node {} on {}: {}", name, endpoint, e))?;
    Ok(server)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::node::fixtures;
    use std::path::Path;

    fn loopback_topology(home: &Path) -> StorageTopology {
        StorageTopology::new(
            home.to_path_buf(),
            "~",
            fixtures::node(ExtensionClass::Local, "smain", ".c", 0, home),
            fixtures::node(ExtensionClass::BackendA, "spdf", ".pdf", 0, home),
            fixtures::node(ExtensionClass::BackendB, "stext", ".txt", 0, home),
        )
    }

    #[tokio::test]
    async fn test_bind_creates_checked_roots() {
        let home = tempfile::TempDir::new().unwrap();
        let topology = Arc::new(loopback_topology(home.path()));
        let transfer = TransferConfig::default();

        let router = bind_router(topology.clone(), &transfer).await.unwrap();
        let node = bind_node(topology.clone(), ExtensionClass::BackendB, &transfer).await.unwrap();
        assert_ne!(router.local_addr().unwrap().port(), 0);
        assert_ne!(node.local_addr().unwrap().port(), 0);
        assert!(home.path().join("smain").is_dir());
        assert!(home.path().join("stext").is_dir());
    }

    #[tokio::test]
    async fn test_bind_node_refuses_router_class() {
        let home = tempfile::TempDir::new().unwrap();
        let topology = Arc::new(loopback_topology(home.path()));
        let result = bind_node(topology, ExtensionClass::Local, &TransferConfig::default()).await;
        assert!(result.is_err());
    }
}
