//! Collaborator contracts: generation, task catalog, and lint.
//!
//! These are the engine's external seams. Each is a trait so the pipeline
//! can be driven by a real implementation in production and by in-memory
//! fakes in tests. The engine itself never constructs a concrete
//! collaborator.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use grader_core::{ArtifactBundle, DifficultyTier, Result, TaskSpec};

/// Which half of the two-call generation exchange is being made.
///
/// The files phase depends on the tree phase's output, so the two calls are
/// always awaited sequentially.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationPhase {
    /// Ask for the file tree the artifact will consist of.
    Tree,
    /// Ask for the contents of the agreed file list.
    Files,
}

impl std::fmt::Display for GenerationPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GenerationPhase::Tree => write!(f, "tree"),
            GenerationPhase::Files => write!(f, "files"),
        }
    }
}

/// One request to the generation collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Task identifier.
    pub task_id: String,

    /// Difficulty tier, for prompt shaping on the collaborator side.
    pub tier: DifficultyTier,

    /// Task description.
    pub description: String,

    /// Files the task expects; for the files phase this is the tree the
    /// tree phase returned.
    pub expected_files: Vec<String>,

    /// Which phase this request is for.
    pub phase: GenerationPhase,
}

/// What the generation collaborator returns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationResponse {
    /// Tree phase: the proposed file list. Files phase: the full bundle.
    pub tree: Vec<String>,

    /// Files phase payload; empty for the tree phase.
    pub bundle: Option<ArtifactBundle>,

    /// Collaborator-side log lines, folded into the task log.
    pub log_lines: Vec<String>,

    /// Token usage, when the collaborator tracks it.
    pub token_usage: Option<u64>,
}

/// The generation collaborator contract.
///
/// A returned error is treated by the orchestrator as a fatal phase failure
/// producing a zero-completeness terminal result; it is never allowed to
/// escape as an unhandled fault.
#[async_trait]
pub trait ArtifactGenerator: Send + Sync {
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse>;
}

/// The task catalog contract. Unknown identifiers are a fatal error.
pub trait TaskCatalog: Send + Sync {
    fn lookup(&self, task_id: &str) -> Result<TaskSpec>;
}

/// Runtime hint handed to the lint collaborator so it can assume the right
/// global environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeHint {
    Browser,
    Process,
}

/// One lint finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LintFinding {
    /// File the finding is about, relative to the artifact root.
    pub file: String,

    /// Human-readable message.
    pub message: String,
}

/// Three severity-tiered finding lists, as the lint collaborator reports
/// them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LintReport {
    pub errors: Vec<LintFinding>,
    pub warnings: Vec<LintFinding>,
    pub notes: Vec<LintFinding>,
}

impl LintReport {
    /// The "lint unavailable" report: zero findings everywhere.
    pub fn unavailable() -> Self {
        Self::default()
    }
}

/// The lint collaborator contract.
///
/// Callers must swallow any error from this collaborator and treat it as
/// "lint unavailable" — a lint infrastructure failure is never a task
/// failure.
#[async_trait]
pub trait LintChecker: Send + Sync {
    async fn check(
        &self,
        script_paths: &[std::path::PathBuf],
        hint: RuntimeHint,
    ) -> Result<LintReport>;
}
