// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Path Sanitizer Domain Service
//!
//! Path normalization and traversal rejection for client-supplied paths.
//! Every virtual path goes through here before the namespace translator
//! rewrites it, so no `..` ever reaches a storage provider.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Implements internal responsibilities for path sanitizer

use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Path sanitization errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathSanitizerError {
    #[error("Path traversal attempt detected: {0}")]
    PathTraversal(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Path outside storage root: {0}")]
    OutsideBoundary(String),

    #[error("Path too long: {0}")]
    PathTooLong(String),
}

/// Path sanitizer domain service
///
/// # Security Guarantees
/// - Rejects paths containing `..` components
/// - Rejects NUL bytes and empty paths
/// - Drops redundant `.` components and separators
/// - Optionally enforces that the result stays under a root
pub struct PathSanitizer {
    /// Maximum allowed path length (default: 4096)
    max_path_len: usize,
}

impl PathSanitizer {
    pub fn new() -> Self {
        Self { max_path_len: 4096 }
    }

    pub fn with_max_length(max_path_len: usize) -> Self {
        Self { max_path_len }
    }

    /// Lightweight checks that need no path parsing
    pub fn validate(&self, path: &str) -> Result<(), PathSanitizerError> {
        if path.is_empty() {
            return Err(PathSanitizerError::InvalidPath("empty path".to_string()));
        }

        if path.len() > self.max_path_len {
            return Err(PathSanitizerError::PathTooLong(path.to_string()));
        }

        if path.contains('\0') {
            tracing::warn!(path = %path, "Path contains null byte");
            return Err(PathSanitizerError::InvalidPath(
                "Path contains null byte".to_string(),
            ));
        }

        Ok(())
    }

    /// Normalize a path and, if `root` is given, require it to stay under it
    ///
    /// # Examples
    /// ```
    /// use splitstore_core::domain::path_sanitizer::PathSanitizer;
    /// use std::path::{Path, PathBuf};
    ///
    /// let sanitizer = PathSanitizer::new();
    /// let safe = sanitizer
    ///     .canonicalize(Path::new("/home/a/smain/./x.c"), Some(Path::new("/home/a/smain")))
    ///     .unwrap();
    /// assert_eq!(safe, PathBuf::from("/home/a/smain/x.c"));
    ///
    /// let bad = sanitizer.canonicalize(Path::new("/home/a/smain/../etc"), None);
    /// assert!(bad.is_err());
    /// ```
    pub fn canonicalize(
        &self,
        path: &Path,
        root: Option<&Path>,
    ) -> Result<PathBuf, PathSanitizerError> {
        let shown = path.display().to_string();
        self.validate(&shown)?;

        let mut normalized = PathBuf::new();
        for component in path.components() {
            match component {
                Component::Prefix(_) | Component::RootDir => normalized.push(component),
                Component::CurDir => {}
                Component::Normal(part) => normalized.push(part),
                Component::ParentDir => {
                    tracing::warn!(
                        path = %shown,
                        "Path traversal attempt detected: contains '..' component"
                    );
                    return Err(PathSanitizerError::PathTraversal(shown));
                }
            }
        }

        if let Some(root) = root {
            if !normalized.starts_with(root) {
                tracing::warn!(
                    path = %shown,
                    root = %root.display(),
                    "Path outside storage root detected"
                );
                return Err(PathSanitizerError::OutsideBoundary(shown));
            }
        }

        Ok(normalized)
    }

    /// True when `name` is a single normal component (a bare file name)
    pub fn is_plain_file_name(&self, name: &str) -> bool {
        if self.validate(name).is_err() {
            return false;
        }
        let mut components = Path::new(name).components();
        matches!(
            (components.next(), components.next()),
            (Some(Component::Normal(_)), None)
        ) && !name.contains('/')
    }
}

impl Default for PathSanitizer {
    fn default() -> Self {
        Self::new()
    }
}
