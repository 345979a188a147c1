//! Sandbox: best-effort isolated execution of artifact bundles.
//!
//! Materializes an artifact bundle onto a scratch filesystem, optionally
//! builds it, then executes it under one of two runtime strategies
//! (headless-browser page load, or isolated child process). The runner
//! never errors: every exit path resolves to a [`SandboxRunResult`].
//! Scratch-directory deletion is scheduled on every exit path.
//!
//! This is a containment layer, not a security boundary: confinement of
//! the child process is advisory (pinned working directory, scrubbed
//! environment, entry-path canonicalization).
//!
//! # Modules
//!
//! - [`result`]  — `SandboxRunResult`, `BrowserError`, `ExternalAccess`
//! - [`scratch`] — scratch directory materialization and cleanup
//! - [`browser`] — `BrowserSession` trait + headless Chromium implementation
//! - [`process`] — isolated child-process runtime
//! - [`runner`]  — `SandboxRunner` orchestrating the above

pub mod browser;
pub mod process;
pub mod result;
pub mod runner;
pub mod scratch;

/// Failures of the sandbox's own machinery, as opposed to graded failures
/// of the artifact under test. The runner recovers every one of these into
/// a failure [`SandboxRunResult`](result::SandboxRunResult).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SandboxError {
    #[error("spawn failed: {0}")]
    Spawn(String),

    #[error("timed out after {0}ms")]
    Timeout(u64),

    #[error("wait failed: {0}")]
    Wait(String),

    #[error("entry refused: {0}")]
    EntryRefused(String),
}

pub use browser::{BrowserSession, HeadlessChromium, PageEvidence};
pub use process::ProcessRuntime;
pub use result::{
    BrowserError, BrowserErrorKind, ExternalAccess, ProcessOutcome, ResourceKind,
    SandboxRunResult,
};
pub use runner::SandboxRunner;
