// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Path utilities for the on-disk storage layout.

use std::path::{Path, PathBuf};

/// Storage path utilities.
#[derive(Debug, Clone)]
pub struct StoragePaths {
    root: PathBuf,
}

impl StoragePaths {
    /// Create a new StoragePaths with a custom root (useful for testing).
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Root directory for all data.
    pub fn root(&self) -> &Path {
        &self.root
    }

    // ========== Identity Paths ==========

    /// Directory containing all identities.
    pub fn identities_dir(&self) -> PathBuf {
        self.root.join("identities")
    }

    /// Path to a specific identity file.
    pub fn identity(&self, identity_id: &str) -> PathBuf {
        self.identities_dir().join(format!("{identity_id}.json"))
    }

    // ========== Content Paths ==========

    /// Snapshot of projects, photos and contact messages.
    pub fn content(&self) -> PathBuf {
        self.root.join("content.json")
    }
}

/// Whether an id is safe to use as a file stem.
pub fn is_safe_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= 64
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_paths_are_correct() {
        let paths = StoragePaths::new("/tmp/test-data");
        assert_eq!(
            paths.identities_dir(),
            PathBuf::from("/tmp/test-data/identities")
        );
        assert_eq!(
            paths.identity("id-123"),
            PathBuf::from("/tmp/test-data/identities/id-123.json")
        );
        assert_eq!(paths.content(), PathBuf::from("/tmp/test-data/content.json"));
    }

    #[test]
    fn unsafe_ids_are_rejected() {
        assert!(is_safe_id("3f4d6542-b8ce-4226-93d3-80d6f14d6db2"));
        assert!(!is_safe_id(""));
        assert!(!is_safe_id("../etc/passwd"));
        assert!(!is_safe_id("a/b"));
        assert!(!is_safe_id(&"a".repeat(65)));
    }
}
