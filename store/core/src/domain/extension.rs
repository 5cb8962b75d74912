// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Extension Classifier
//!
//! Maps a file name's suffix to the class of the node that owns it.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Implements internal responsibilities for extension classification

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Ownership class of a file, derived from its suffix.
///
/// Exactly one storage node owns each class. Unsupported suffixes have no
/// class at all; see [`ExtensionSet::classify`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtensionClass {
    /// Stored on the router itself
    Local,
    /// Delegated to the first backend node
    BackendA,
    /// Delegated to the second backend node
    BackendB,
}

impl ExtensionClass {
    pub const ALL: [ExtensionClass; 3] = [
        ExtensionClass::Local,
        ExtensionClass::BackendA,
        ExtensionClass::BackendB,
    ];

    pub fn is_remote(self) -> bool {
        !matches!(self, ExtensionClass::Local)
    }
}

impl fmt::Display for ExtensionClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtensionClass::Local => write!(f, "local"),
            ExtensionClass::BackendA => write!(f, "backend-a"),
            ExtensionClass::BackendB => write!(f, "backend-b"),
        }
    }
}

/// The three registered suffixes, one per class.
///
/// Suffixes include the leading dot (".c", ".pdf", ".txt").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionSet {
    local: String,
    backend_a: String,
    backend_b: String,
}

impl ExtensionSet {
    pub fn new(
        local: impl Into<String>,
        backend_a: impl Into<String>,
        backend_b: impl Into<String>,
    ) -> Self {
        Self {
            local: local.into(),
            backend_a: backend_a.into(),
            backend_b: backend_b.into(),
        }
    }

    /// Suffix registered for a class
    pub fn suffix(&self, class: ExtensionClass) -> &str {
        match class {
            ExtensionClass::Local => &self.local,
            ExtensionClass::BackendA => &self.backend_a,
            ExtensionClass::BackendB => &self.backend_b,
        }
    }

    /// Classify a file name (or a path whose last component is the file name)
    ///
    /// Only an exact match of the final extension counts: `report.ctxt` is not
    /// a `.c` file, and a dotfile named `.c` has no extension at all.
    pub fn classify(&self, filename: &str) -> Option<ExtensionClass> {
        let extension = Path::new(filename).extension()?.to_str()?;
        let suffix = format!(".{}", extension);
        self.class_of_suffix(&suffix)
    }

    /// Resolve an archive selector such as ".pdf" to its class
    pub fn class_of_suffix(&self, suffix: &str) -> Option<ExtensionClass> {
        ExtensionClass::ALL
            .into_iter()
            .find(|class| self.suffix(*class) == suffix)
    }

    /// True when `filename` ends with exactly the suffix of `class`
    pub fn matches(&self, filename: &str, class: ExtensionClass) -> bool {
        self.classify(filename) == Some(class)
    }
}

impl Default for ExtensionSet {
    fn default() -> Self {
        Self::new(".c", ".pdf", ".txt")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_registered_suffixes() {
        let set = ExtensionSet::default();
        assert_eq!(set.classify("main.c"), Some(ExtensionClass::Local));
        assert_eq!(set.classify("paper.pdf"), Some(ExtensionClass::BackendA));
        assert_eq!(set.classify("notes.txt"), Some(ExtensionClass::BackendB));
    }

    #[test]
    fn test_classify_uses_last_component() {
        let set = ExtensionSet::default();
        assert_eq!(set.classify("~/smain/dir.pdf/main.c"), Some(ExtensionClass::Local));
        assert_eq!(set.classify("~/smain/a.c/notes"), None);
    }

    #[test]
    fn test_classify_rejects_substring_matches() {
        let set = ExtensionSet::default();
        assert_eq!(set.classify("report.ctxt"), None);
        assert_eq!(set.classify("archive.c.bak"), None);
        assert_eq!(set.classify("image.png"), None);
    }

    #[test]
    fn test_classify_rejects_missing_extension() {
        let set = ExtensionSet::default();
        assert_eq!(set.classify("Makefile"), None);
        assert_eq!(set.classify(".c"), None);
        assert_eq!(set.classify(""), None);
    }

    #[test]
    fn test_class_of_suffix() {
        let set = ExtensionSet::default();
        assert_eq!(set.class_of_suffix(".txt"), Some(ExtensionClass::BackendB));
        assert_eq!(set.class_of_suffix("txt"), None);
        assert_eq!(set.class_of_suffix(".zip"), None);
    }

    #[test]
    fn test_matches() {
        let set = ExtensionSet::default();
        assert!(set.matches("a.c", ExtensionClass::Local));
        assert!(!set.matches("a.c", ExtensionClass::BackendA));
    }
}
