//! Artifact bundles and the parsing gate.
//!
//! An [`ArtifactBundle`] is the file-tree-plus-contents pair produced by the
//! generation collaborator for one task. [`ArtifactBundle::validate`] is the
//! parsing gate: a malformed bundle is rejected wholesale before any scoring.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Reasons the parsing gate rejects a bundle.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum BundleError {
    #[error("bundle tree is empty")]
    EmptyTree,

    #[error("bundle contains an empty path")]
    EmptyPath,

    #[error("absolute path not allowed: {0}")]
    AbsolutePath(String),

    #[error("parent-traversal segment not allowed: {0}")]
    ParentTraversal(String),

    #[error("duplicate path in tree: {0}")]
    DuplicatePath(String),

    #[error("tree declares {path} but no content was provided")]
    MissingContent { path: String },

    #[error("content provided for undeclared path: {path}")]
    UndeclaredContent { path: String },
}

/// A file-tree specification paired with a content map keyed by the same
/// relative paths.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactBundle {
    /// Ordered list of relative paths.
    pub tree: Vec<String>,

    /// Path to file content.
    pub files: BTreeMap<String, String>,
}

impl ArtifactBundle {
    /// Build a bundle from (path, content) pairs, preserving order.
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, S)>,
        S: Into<String>,
    {
        let mut tree = Vec::new();
        let mut files = BTreeMap::new();
        for (path, content) in pairs {
            let path = path.into();
            tree.push(path.clone());
            files.insert(path, content.into());
        }
        Self { tree, files }
    }

    /// The parsing gate. Accepts or rejects the bundle's shape before any
    /// scoring occurs.
    ///
    /// Rejects: empty trees, empty paths, absolute paths, parent-traversal
    /// segments, duplicate paths, and tree/content disagreement in either
    /// direction.
    pub fn validate(&self) -> Result<(), BundleError> {
        if self.tree.is_empty() {
            return Err(BundleError::EmptyTree);
        }

        let mut seen = std::collections::BTreeSet::new();
        for path in &self.tree {
            if path.is_empty() {
                return Err(BundleError::EmptyPath);
            }
            if path.starts_with('/') || path.starts_with('\\') || path.contains(':') {
                return Err(BundleError::AbsolutePath(path.clone()));
            }
            if path.split(['/', '\\']).any(|seg| seg == "..") {
                return Err(BundleError::ParentTraversal(path.clone()));
            }
            if !seen.insert(path.clone()) {
                return Err(BundleError::DuplicatePath(path.clone()));
            }
            if !self.files.contains_key(path) {
                return Err(BundleError::MissingContent { path: path.clone() });
            }
        }

        for path in self.files.keys() {
            if !seen.contains(path) {
                return Err(BundleError::UndeclaredContent { path: path.clone() });
            }
        }

        Ok(())
    }

    /// Content of a file, if present.
    pub fn content(&self, path: &str) -> Option<&str> {
        self.files.get(path).map(|s| s.as_str())
    }

    /// Whether the file is present with non-empty content.
    pub fn has_non_empty(&self, path: &str) -> bool {
        self.files.get(path).map(|c| !c.trim().is_empty()).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bundle(pairs: &[(&str, &str)]) -> ArtifactBundle {
        ArtifactBundle::from_pairs(pairs.iter().map(|(p, c)| (*p, *c)))
    }

    #[test]
    fn test_valid_bundle_passes_gate() {
        let b = bundle(&[("index.html", "<html></html>"), ("js/main.js", "let x = 1;")]);
        assert!(b.validate().is_ok());
    }

    #[test]
    fn test_empty_tree_rejected() {
        let b = ArtifactBundle::default();
        assert_eq!(b.validate(), Err(BundleError::EmptyTree));
    }

    #[test]
    fn test_absolute_path_rejected() {
        let b = bundle(&[("/etc/passwd", "x")]);
        assert!(matches!(b.validate(), Err(BundleError::AbsolutePath(_))));
    }

    #[test]
    fn test_windows_drive_path_rejected() {
        let b = bundle(&[("C:\\temp\\a.js", "x")]);
        assert!(matches!(b.validate(), Err(BundleError::AbsolutePath(_))));
    }

    #[test]
    fn test_parent_traversal_rejected() {
        let b = bundle(&[("a/../../escape.js", "x")]);
        assert!(matches!(b.validate(), Err(BundleError::ParentTraversal(_))));
    }

    #[test]
    fn test_empty_path_rejected() {
        let b = bundle(&[("", "x")]);
        assert_eq!(b.validate(), Err(BundleError::EmptyPath));
    }

    #[test]
    fn test_duplicate_path_rejected() {
        let mut b = bundle(&[("index.html", "x")]);
        b.tree.push("index.html".to_string());
        assert!(matches!(b.validate(), Err(BundleError::DuplicatePath(_))));
    }

    #[test]
    fn test_tree_content_disagreement_rejected() {
        let mut b = bundle(&[("index.html", "x")]);
        b.tree.push("missing.js".to_string());
        assert!(matches!(b.validate(), Err(BundleError::MissingContent { .. })));

        let mut b = bundle(&[("index.html", "x")]);
        b.files.insert("phantom.js".to_string(), "y".to_string());
        assert!(matches!(
            b.validate(),
            Err(BundleError::UndeclaredContent { .. })
        ));
    }

    #[test]
    fn test_has_non_empty() {
        let b = bundle(&[("a.js", "code"), ("b.js", "   ")]);
        assert!(b.has_non_empty("a.js"));
        assert!(!b.has_non_empty("b.js"));
        assert!(!b.has_non_empty("c.js"));
    }
}
