//! Grader Core Library
//!
//! Domain model for the artifact grading engine: task specifications,
//! artifact bundles and the parsing gate, the failure-rule registry,
//! the sandbox manifest, score types, and the benchmark accumulator.

pub mod aggregate;
pub mod domain;
pub mod manifest;
pub mod obs;
pub mod registry;
pub mod telemetry;

pub use domain::{
    ArtifactBundle, BundleError, DifficultyTier, FinalResult, GraderError, Result,
    RuntimeDescriptor, RuntimeDisclosure, RuntimeKind, ScoreBreakdown, TaskSpec,
};

pub use registry::{FailureAnnotation, FailureLayer, RuleCategory, RuleDef, RuleId, Severity};

pub use aggregate::{BenchmarkAccumulator, BenchmarkSnapshot};
pub use manifest::SandboxManifest;
pub use obs::{
    emit_generation_timed_out, emit_phase_completed, emit_sandbox_cleanup_failed,
    emit_task_finished, emit_task_started, TaskSpan,
};
pub use telemetry::init_tracing;

/// Grader version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
