//! Grader Engine - Task Evaluation & Sandboxed Grading
//!
//! Drives one artifact bundle per task invocation through:
//! generation -> parsing gate -> static evaluation -> sandbox + runtime
//! evaluation -> final score resolution, under per-phase time budgets.
//! Every failure mode degrades to a complete, well-typed result.

pub mod collab;
pub mod final_eval;
pub mod pipeline;
pub mod runtime_eval;
pub mod sandbox;
pub mod static_eval;

// Re-export key types
pub use collab::{
    ArtifactGenerator, GenerationPhase, GenerationRequest, GenerationResponse, LintChecker,
    LintFinding, LintReport, RuntimeHint, TaskCatalog,
};
pub use final_eval::{resolve_final, dominant_layer};
pub use pipeline::{PipelineConfig, TaskOutcome, TaskPipeline};
pub use runtime_eval::{evaluate_runtime, RuntimeEvaluation};
pub use sandbox::{
    BrowserError, BrowserErrorKind, BrowserSession, ExternalAccess, HeadlessChromium,
    PageEvidence, ProcessOutcome, ResourceKind, SandboxError, SandboxRunResult, SandboxRunner,
};
pub use static_eval::{StaticEvaluator, StaticReport};
