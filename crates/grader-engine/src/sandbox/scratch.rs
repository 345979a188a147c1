//! Scratch-directory materialization and cleanup.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tempfile::TempDir;
use tracing::debug;

use grader_core::{emit_sandbox_cleanup_failed, ArtifactBundle};

/// Delay before scratch deletion, letting OS-level file handles settle.
const CLEANUP_GRACE: Duration = Duration::from_millis(50);

/// A freshly created scratch directory with the bundle materialized into it.
#[derive(Debug)]
pub struct Scratch {
    dir: TempDir,
}

impl Scratch {
    /// Create a scratch directory and write every bundle file under it,
    /// recreating intermediate directories as needed.
    pub fn materialize(bundle: &ArtifactBundle) -> std::io::Result<Self> {
        let dir = tempfile::Builder::new().prefix("grader-sandbox-").tempdir()?;
        for path in &bundle.tree {
            let dest = dir.path().join(path);
            if let Some(parent) = dest.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&dest, bundle.content(path).unwrap_or_default())?;
        }
        debug!(path = %dir.path().display(), files = bundle.tree.len(), "scratch materialized");
        Ok(Self { dir })
    }

    /// Root of the scratch directory.
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Absolute path of a mounted file.
    pub fn resolve(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }

    /// Delete the scratch directory after a short grace delay.
    ///
    /// Failure to delete is logged, never propagated; the directory would
    /// fall back to `TempDir`'s drop-time removal anyway.
    pub async fn cleanup(self) {
        tokio::time::sleep(CLEANUP_GRACE).await;
        let path = self.dir.path().display().to_string();
        if let Err(err) = self.dir.close() {
            emit_sandbox_cleanup_failed(&path, &err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bundle() -> ArtifactBundle {
        ArtifactBundle::from_pairs([
            ("index.html", "<html></html>"),
            ("js/nested/app.js", "console.log(1);"),
        ])
    }

    #[test]
    fn test_materialize_recreates_directories() {
        let scratch = Scratch::materialize(&bundle()).unwrap();
        assert!(scratch.resolve("index.html").is_file());
        assert!(scratch.resolve("js/nested/app.js").is_file());
        let content = std::fs::read_to_string(scratch.resolve("js/nested/app.js")).unwrap();
        assert_eq!(content, "console.log(1);");
    }

    #[tokio::test]
    async fn test_cleanup_removes_directory() {
        let scratch = Scratch::materialize(&bundle()).unwrap();
        let root = scratch.root().to_path_buf();
        assert!(root.exists());
        scratch.cleanup().await;
        assert!(!root.exists());
    }
}
