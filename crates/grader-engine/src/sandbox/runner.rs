//! The sandbox runner: materialize, build, execute, clean up.
//!
//! Contract: never errors. Every exit path — success, failure, or an
//! internal problem caught at the outer boundary — resolves to one
//! [`SandboxRunResult`], and scratch deletion is scheduled before the
//! call settles.

use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use tokio::process::Command;
use tracing::{info, warn};

use grader_core::{ArtifactBundle, RuntimeDescriptor, RuntimeKind};

use super::browser::BrowserSession;
use super::process::ProcessRuntime;
use super::result::{BrowserError, SandboxRunResult};
use super::scratch::Scratch;

/// Timeout for the declared build step.
const BUILD_TIMEOUT: Duration = Duration::from_secs(30);

/// Executes one artifact bundle under its runtime descriptor.
pub struct SandboxRunner {
    browser: Arc<dyn BrowserSession>,
    process: ProcessRuntime,
}

impl SandboxRunner {
    pub fn new(browser: Arc<dyn BrowserSession>) -> Self {
        Self {
            browser,
            process: ProcessRuntime::default(),
        }
    }

    /// Override the process runtime configuration (builder pattern).
    pub fn with_process_runtime(mut self, process: ProcessRuntime) -> Self {
        self.process = process;
        self
    }

    /// Run the bundle. Never errors; cleanup runs on every exit path.
    pub async fn run(
        &self,
        bundle: &ArtifactBundle,
        runtime: &RuntimeDescriptor,
    ) -> SandboxRunResult {
        let scratch = match Scratch::materialize(bundle) {
            Ok(scratch) => scratch,
            Err(err) => {
                warn!(error = %err, "failed to materialize sandbox scratch");
                return SandboxRunResult::failed(format!("scratch materialization failed: {err}"));
            }
        };

        let result = self.run_phases(&scratch, runtime).await;
        scratch.cleanup().await;
        result
    }

    async fn run_phases(
        &self,
        scratch: &Scratch,
        runtime: &RuntimeDescriptor,
    ) -> SandboxRunResult {
        let mut logs = vec![format!("sandbox root: {}", scratch.root().display())];

        if let Some(build) = &runtime.build_command {
            match run_build(scratch, build).await {
                Ok(log) => logs.push(log),
                Err(log) => {
                    logs.push(log);
                    return SandboxRunResult {
                        success: false,
                        logs,
                        build_failed: true,
                        ..Default::default()
                    };
                }
            }
        }

        match runtime.kind {
            RuntimeKind::None => {
                logs.push("static-only task, no runtime".to_string());
                SandboxRunResult {
                    success: true,
                    logs,
                    ..Default::default()
                }
            }
            RuntimeKind::Browser => self.run_browser(scratch, runtime, logs).await,
            RuntimeKind::Process => self.run_process(scratch, runtime, logs).await,
        }
    }

    async fn run_browser(
        &self,
        scratch: &Scratch,
        runtime: &RuntimeDescriptor,
        mut logs: Vec<String>,
    ) -> SandboxRunResult {
        let entry_path = scratch.resolve(&runtime.entry);
        if !entry_path.is_file() {
            logs.push(format!("browser entry {} not found", runtime.entry));
            return SandboxRunResult {
                success: false,
                logs,
                browser_errors: vec![BrowserError::request_failed(
                    "entry file missing from sandbox",
                    runtime.entry.clone(),
                )],
                ..Default::default()
            };
        }

        let entry_url = format!("file://{}", entry_path.display());
        match self.browser.load(&entry_url).await {
            Ok(evidence) => {
                logs.extend(evidence.logs);
                let success = evidence.errors.is_empty();
                info!(
                    entry = %runtime.entry,
                    errors = evidence.errors.len(),
                    success,
                    "browser runtime finished"
                );
                SandboxRunResult {
                    success,
                    logs,
                    build_failed: false,
                    browser_errors: evidence.errors,
                    external_accesses: evidence.accesses,
                    process: None,
                }
            }
            Err(err) => {
                logs.push(format!("browser session failed: {err}"));
                SandboxRunResult {
                    success: false,
                    logs,
                    ..Default::default()
                }
            }
        }
    }

    async fn run_process(
        &self,
        scratch: &Scratch,
        runtime: &RuntimeDescriptor,
        mut logs: Vec<String>,
    ) -> SandboxRunResult {
        match self.process.run(scratch.root(), &runtime.entry).await {
            Ok(outcome) => {
                let success = outcome.passed();
                logs.push(format!(
                    "process runtime exit={} timed_out={}",
                    outcome.exit_code, outcome.timed_out
                ));
                SandboxRunResult {
                    success,
                    logs,
                    build_failed: false,
                    browser_errors: Vec::new(),
                    external_accesses: Vec::new(),
                    process: Some(outcome),
                }
            }
            Err(err) => {
                logs.push(format!("process runtime failed: {err}"));
                SandboxRunResult {
                    success: false,
                    logs,
                    ..Default::default()
                }
            }
        }
    }
}

/// Run the declared build step with a bounded timeout.
///
/// `Err` carries the log line for a non-zero exit, a timeout, or a spawn
/// failure — all of which fail the sandbox immediately.
async fn run_build(scratch: &Scratch, command: &[String]) -> Result<String, String> {
    let Some((exe, args)) = command.split_first() else {
        return Err("build command is empty".to_string());
    };

    let child = Command::new(exe)
        .args(args)
        .current_dir(scratch.root())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| format!("build spawn failed: {e}"))?;

    let output = tokio::time::timeout(BUILD_TIMEOUT, child.wait_with_output())
        .await
        .map_err(|_| format!("build timed out after {}s", BUILD_TIMEOUT.as_secs()))?
        .map_err(|e| format!("build wait failed: {e}"))?;

    if output.status.success() {
        Ok(format!("build succeeded: {}", command.join(" ")))
    } else {
        Err(format!(
            "build failed (exit {}): {}",
            output.status.code().unwrap_or(-1),
            String::from_utf8_lossy(&output.stderr).trim()
        ))
    }
}
