//! Sandbox manifest: the declared entry point, mounted-file list, and
//! content hashes captured just before runtime execution.
//!
//! Built once per task after the artifacts pass the parsing gate; compared
//! post-execution against the runtime's observed file accesses to detect an
//! artifact that "lies" about what it needs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

use crate::domain::ArtifactBundle;

/// Snapshot of what a task declared it would execute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SandboxManifest {
    /// Declared runtime entry path.
    pub entry: String,

    /// Relative paths mounted into the scratch directory, in tree order.
    pub mounted: Vec<String>,

    /// Path to SHA-256 content hash.
    pub hashes: BTreeMap<String, String>,

    /// When the manifest was captured.
    pub created_at: DateTime<Utc>,
}

impl SandboxManifest {
    /// Capture a manifest from a validated bundle.
    pub fn from_bundle(entry: impl Into<String>, bundle: &ArtifactBundle) -> Self {
        let mut hashes = BTreeMap::new();
        for (path, content) in &bundle.files {
            let mut hasher = Sha256::new();
            hasher.update(content.as_bytes());
            hashes.insert(path.clone(), hex::encode(hasher.finalize()));
        }
        Self {
            entry: entry.into(),
            mounted: bundle.tree.clone(),
            hashes,
            created_at: Utc::now(),
        }
    }

    /// Whether the declared entry is among the mounted files.
    pub fn contains_entry(&self) -> bool {
        self.mounted.iter().any(|p| p == &self.entry)
    }

    /// Resolve a `file:`-scheme access target back to a mounted path.
    ///
    /// Returns `true` when the target is traceable to a mounted file. The
    /// mounted path must sit on a path-segment boundary of the target, so
    /// a mounted `main.js` does not cover an access to `domain.js`.
    /// Non-`file:` targets are not this manifest's concern and resolve to
    /// `false`.
    pub fn covers_access(&self, target: &str) -> bool {
        let Some(path_part) = target.strip_prefix("file://") else {
            return false;
        };
        let path_part = path_part.trim_start_matches('/');
        self.mounted.iter().any(|mounted| {
            path_part == mounted.as_str()
                || path_part
                    .strip_suffix(mounted.as_str())
                    .map_or(false, |prefix| prefix.ends_with('/'))
        })
    }
}
