// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Storage Node Topology
//!
//! The three storage nodes of a deployment: the router's own store and the
//! two backend stores. Built once from [`StoreConfig`](super::node_config::StoreConfig)
//! and shared read-only by every session.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Implements internal responsibilities for node topology

use crate::domain::extension::{ExtensionClass, ExtensionSet};
use std::fmt;
use std::path::{Path, PathBuf};

/// Network endpoint of a storage node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeEndpoint {
    pub host: String,
    pub port: u16,
}

impl fmt::Display for NodeEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// One storage node
///
/// `name` doubles as the node's namespace segment: the node stores everything
/// under `<home>/<name>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageNode {
    pub class: ExtensionClass,
    pub name: String,
    pub extension: String,
    pub endpoint: NodeEndpoint,
    pub root: PathBuf,
}

impl StorageNode {
    pub fn is_local(&self) -> bool {
        self.class == ExtensionClass::Local
    }
}

/// The fixed set of nodes plus the home directory they share
#[derive(Debug, Clone)]
pub struct StorageTopology {
    home: PathBuf,
    home_marker: String,
    local: StorageNode,
    backend_a: StorageNode,
    backend_b: StorageNode,
    extensions: ExtensionSet,
}

impl StorageTopology {
    pub fn new(
        home: PathBuf,
        home_marker: impl Into<String>,
        local: StorageNode,
        backend_a: StorageNode,
        backend_b: StorageNode,
    ) -> Self {
        let extensions = ExtensionSet::new(
            local.extension.clone(),
            backend_a.extension.clone(),
            backend_b.extension.clone(),
        );
        Self {
            home,
            home_marker: home_marker.into(),
            local,
            backend_a,
            backend_b,
            extensions,
        }
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    pub fn home_marker(&self) -> &str {
        &self.home_marker
    }

    pub fn extensions(&self) -> &ExtensionSet {
        &self.extensions
    }

    /// The node owning a class
    pub fn owner(&self, class: ExtensionClass) -> &StorageNode {
        match class {
            ExtensionClass::Local => &self.local,
            ExtensionClass::BackendA => &self.backend_a,
            ExtensionClass::BackendB => &self.backend_b,
        }
    }

    pub fn local(&self) -> &StorageNode {
        &self.local
    }

    /// Backend nodes in listing order (A, then B)
    pub fn backends(&self) -> [&StorageNode; 2] {
        [&self.backend_a, &self.backend_b]
    }

    fn nodes(&self) -> [&StorageNode; 3] {
        [&self.local, &self.backend_a, &self.backend_b]
    }

    /// Node whose namespace segment is `name`
    pub fn node_by_name(&self, name: &str) -> Option<&StorageNode> {
        self.nodes().into_iter().find(|node| node.name == name)
    }

    pub fn classify(&self, filename: &str) -> Option<ExtensionClass> {
        self.extensions.classify(filename)
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn node(class: ExtensionClass, name: &str, extension: &str, port: u16, home: &Path) -> StorageNode {
        StorageNode {
            class,
            name: name.to_string(),
            extension: extension.to_string(),
            endpoint: NodeEndpoint {
                host: "127.0.0.1".to_string(),
                port,
            },
            root: home.join(name),
        }
    }

    /// Default three-node layout under `home`
    pub fn topology(home: &Path) -> StorageTopology {
        StorageTopology::new(
            home.to_path_buf(),
            "~",
            node(ExtensionClass::Local, "smain", ".c", 3001, home),
            node(ExtensionClass::BackendA, "spdf", ".pdf", 3002, home),
            node(ExtensionClass::BackendB, "stext", ".txt", 3003, home),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::topology;
    use super::*;

    #[test]
    fn test_owner_per_class() {
        let topo = topology(Path::new("/home/alice"));
        assert_eq!(topo.owner(ExtensionClass::Local).name, "smain");
        assert_eq!(topo.owner(ExtensionClass::BackendA).name, "spdf");
        assert_eq!(topo.owner(ExtensionClass::BackendB).name, "stext");
        assert!(topo.local().is_local());
    }

    #[test]
    fn test_classify_through_topology() {
        let topo = topology(Path::new("/home/alice"));
        assert_eq!(topo.classify("x.pdf"), Some(ExtensionClass::BackendA));
        assert_eq!(topo.classify("x.png"), None);
    }

    #[test]
    fn test_node_by_name() {
        let topo = topology(Path::new("/home/alice"));
        assert_eq!(
            topo.node_by_name("stext").map(|n| n.root.clone()),
            Some(PathBuf::from("/home/alice/stext"))
        );
        assert!(topo.node_by_name("other").is_none());
    }

    #[test]
    fn test_endpoint_display() {
        let topo = topology(Path::new("/home/alice"));
        assert_eq!(topo.backends()[0].endpoint.to_string(), "127.0.0.1:3002");
    }
}
