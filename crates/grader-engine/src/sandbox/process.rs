//! Isolated child-process runtime strategy.
//!
//! Confinement is advisory, not a security boundary: the child runs with
//! its working directory pinned to the scratch root, a scrubbed
//! environment, and an entry path that must canonicalize inside the
//! scratch root. A bounded timeout keeps runaway entries from holding the
//! pipeline.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::debug;

use super::result::ProcessOutcome;
use super::SandboxError;

/// Child-process runtime configuration.
#[derive(Debug, Clone)]
pub struct ProcessRuntime {
    /// Interpreter the entry file is handed to.
    pub interpreter: String,

    /// Hard timeout for the child.
    pub timeout: Duration,
}

impl Default for ProcessRuntime {
    fn default() -> Self {
        Self {
            interpreter: "node".to_string(),
            timeout: Duration::from_secs(5),
        }
    }
}

impl ProcessRuntime {
    /// Run the entry under the scratch root.
    ///
    /// `Err` covers refusals and spawn failures; a completed-but-failing
    /// child is an `Ok` outcome with a non-zero exit code.
    pub async fn run(
        &self,
        scratch_root: &Path,
        entry: &str,
    ) -> Result<ProcessOutcome, SandboxError> {
        let root = scratch_root
            .canonicalize()
            .map_err(|e| SandboxError::EntryRefused(format!("scratch root unavailable: {e}")))?;
        let entry_path = root.join(entry);
        let entry_path = entry_path
            .canonicalize()
            .map_err(|e| SandboxError::EntryRefused(format!("entry {entry} unavailable: {e}")))?;
        if !entry_path.starts_with(&root) {
            return Err(SandboxError::EntryRefused(format!(
                "entry {entry} resolves outside the scratch root"
            )));
        }

        let path_var = std::env::var("PATH").unwrap_or_default();
        let mut child = Command::new(&self.interpreter)
            .arg(&entry_path)
            .current_dir(&root)
            .env_clear()
            .env("PATH", path_var)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| SandboxError::Spawn(format!("{}: {e}", self.interpreter)))?;

        match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => {
                let outcome = ProcessOutcome {
                    exit_code: output.status.code().unwrap_or(-1),
                    stdout: String::from_utf8_lossy(&output.stdout).to_string(),
                    stderr: String::from_utf8_lossy(&output.stderr).to_string(),
                    timed_out: false,
                };
                debug!(exit_code = outcome.exit_code, "process runtime finished");
                Ok(outcome)
            }
            Ok(Err(e)) => Err(SandboxError::Wait(e.to_string())),
            Err(_) => Ok(ProcessOutcome {
                exit_code: -1,
                stdout: String::new(),
                stderr: String::new(),
                timed_out: true,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grader_core::ArtifactBundle;

    use crate::sandbox::scratch::Scratch;

    fn shell_runtime(timeout_ms: u64) -> ProcessRuntime {
        ProcessRuntime {
            interpreter: "sh".to_string(),
            timeout: Duration::from_millis(timeout_ms),
        }
    }

    #[tokio::test]
    async fn test_successful_entry() {
        let bundle = ArtifactBundle::from_pairs([("run.sh", "echo done")]);
        let scratch = Scratch::materialize(&bundle).unwrap();

        let outcome = shell_runtime(2_000)
            .run(scratch.root(), "run.sh")
            .await
            .expect("run failed");
        assert!(outcome.passed());
        assert!(outcome.stdout.contains("done"));
        scratch.cleanup().await;
    }

    #[tokio::test]
    async fn test_failing_entry() {
        let bundle = ArtifactBundle::from_pairs([("run.sh", "exit 3")]);
        let scratch = Scratch::materialize(&bundle).unwrap();

        let outcome = shell_runtime(2_000)
            .run(scratch.root(), "run.sh")
            .await
            .expect("run failed");
        assert!(!outcome.passed());
        assert_eq!(outcome.exit_code, 3);
        scratch.cleanup().await;
    }

    #[tokio::test]
    async fn test_timeout_is_an_outcome_not_an_error() {
        let bundle = ArtifactBundle::from_pairs([("run.sh", "sleep 10")]);
        let scratch = Scratch::materialize(&bundle).unwrap();

        let outcome = shell_runtime(100)
            .run(scratch.root(), "run.sh")
            .await
            .expect("run failed");
        assert!(outcome.timed_out);
        assert!(!outcome.passed());
        scratch.cleanup().await;
    }

    #[tokio::test]
    async fn test_missing_entry_refused() {
        let bundle = ArtifactBundle::from_pairs([("other.sh", "echo hi")]);
        let scratch = Scratch::materialize(&bundle).unwrap();

        let err = shell_runtime(2_000)
            .run(scratch.root(), "run.sh")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("run.sh"));
        scratch.cleanup().await;
    }
}
