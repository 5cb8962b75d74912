// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Namespace Translator
//!
//! Turns a client-visible virtual path such as `~/smain/docs` into a path
//! under a specific node's root, e.g. `/home/alice/spdf/docs`.
//!
//! Rewriting works on whole path segments: only the first segment below the
//! home directory is replaced, and only when it names a node. A directory
//! that merely contains the text `smain` elsewhere is left untouched.
//!
//! Translation is idempotent, so a node can re-translate a path the router
//! already translated for it and obtain the same result.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Implements internal responsibilities for namespace translation

use crate::domain::node::{StorageNode, StorageTopology};
use crate::domain::path_sanitizer::{PathSanitizer, PathSanitizerError};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NamespaceError {
    #[error("Invalid path: {0}")]
    Sanitizer(#[from] PathSanitizerError),

    #[error("Invalid path: {0} is not rooted at the home directory")]
    NotRooted(String),

    #[error("Invalid path: {path} is outside the {node} namespace")]
    OutsideNamespace { path: String, node: String },

    #[error("Invalid file name: {0}")]
    InvalidFileName(String),
}

/// Translates virtual paths into node-local paths
#[derive(Clone)]
pub struct NamespaceTranslator {
    topology: Arc<StorageTopology>,
}

impl NamespaceTranslator {
    pub fn new(topology: Arc<StorageTopology>) -> Self {
        Self { topology }
    }

    /// Replace a leading home marker with the home directory
    ///
    /// Absolute paths pass through; relative paths are rejected.
    pub fn expand_home(&self, virtual_path: &str) -> Result<PathBuf, NamespaceError> {
        PathSanitizer::new().validate(virtual_path)?;

        let marker = self.topology.home_marker();
        if let Some(rest) = virtual_path.strip_prefix(marker) {
            if rest.is_empty() {
                return Ok(self.topology.home().to_path_buf());
            }
            if let Some(rest) = rest.strip_prefix('/') {
                return Ok(self.topology.home().join(rest));
            }
        }

        let path = Path::new(virtual_path);
        if path.is_absolute() {
            Ok(path.to_path_buf())
        } else {
            Err(NamespaceError::NotRooted(virtual_path.to_string()))
        }
    }

    /// Translate `virtual_path` into `target`'s namespace
    ///
    /// The first segment below home must name the router or `target`; it is
    /// replaced with `target`'s segment. The result must stay under
    /// `target.root`.
    pub fn translate(
        &self,
        virtual_path: &str,
        target: &StorageNode,
    ) -> Result<PathBuf, NamespaceError> {
        let sanitizer = PathSanitizer::new();
        let expanded = self.expand_home(virtual_path)?;
        let normalized = sanitizer.canonicalize(&expanded, None)?;

        let relative = normalized
            .strip_prefix(self.topology.home())
            .map_err(|_| NamespaceError::NotRooted(virtual_path.to_string()))?;

        let mut components = relative.components();
        let segment = match components.next() {
            Some(Component::Normal(segment)) => segment.to_string_lossy().into_owned(),
            _ => return Err(NamespaceError::NotRooted(virtual_path.to_string())),
        };

        let router = self.topology.local();
        if segment != router.name && segment != target.name {
            return Err(NamespaceError::OutsideNamespace {
                path: virtual_path.to_string(),
                node: target.name.clone(),
            });
        }

        let translated = target.root.join(components.as_path());
        sanitizer
            .canonicalize(&translated, Some(&target.root))
            .map_err(NamespaceError::from)
    }

    /// Render a path under home in home-marker form, e.g. `~/spdf/docs`
    ///
    /// Used when a translated path goes back on the wire, where the home
    /// directory itself may contain whitespace.
    pub fn to_virtual(&self, path: &Path) -> Result<String, NamespaceError> {
        let relative = path
            .strip_prefix(self.topology.home())
            .map_err(|_| NamespaceError::NotRooted(path.display().to_string()))?;
        let marker = self.topology.home_marker();
        if relative.as_os_str().is_empty() {
            Ok(marker.to_string())
        } else {
            Ok(format!("{}/{}", marker, relative.display()))
        }
    }

    /// Translate a destination directory and append a bare file name to it
    pub fn translate_file(
        &self,
        directory: &str,
        filename: &str,
        target: &StorageNode,
    ) -> Result<(PathBuf, PathBuf), NamespaceError> {
        if !PathSanitizer::new().is_plain_file_name(filename) {
            return Err(NamespaceError::InvalidFileName(filename.to_string()));
        }
        let dir = self.translate(directory, target)?;
        let file = dir.join(filename);
        Ok((dir, file))
    }
}
