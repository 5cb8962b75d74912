// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Storage Infrastructure Module
//!
//! Concrete implementations of the StorageProvider trait.

pub mod local;

pub use local::LocalStorageProvider;

use crate::domain::node::StorageNode;
use crate::domain::storage::{StorageError, StorageProvider};
use std::sync::Arc;

/// Create the storage provider for a node's own root
pub fn create_storage_provider(node: &StorageNode) -> Result<Arc<dyn StorageProvider>, StorageError> {
    let provider = LocalStorageProvider::new(&node.root)?;
    tracing::info!(node = %node.name, root = %node.root.display(), "Storage root ready");
    Ok(Arc::new(provider))
}
