//! Structured observability hooks for task grading lifecycle events.
//!
//! This module provides:
//! - Task-scoped tracing spans via the `TaskSpan` RAII guard
//! - Emission functions for key lifecycle events: start, phase completion,
//!   finish, sandbox cleanup problems, generation timeouts
//!
//! Events are emitted at `info!` level and respect `RUST_LOG` filtering.

use tracing::{info, warn};

/// RAII guard that enters a task-scoped tracing span for the duration of a
/// grading invocation.
pub struct TaskSpan {
    _span: tracing::span::EnteredSpan,
}

impl TaskSpan {
    /// Create and enter a span tagged with the task id and invocation id.
    pub fn enter(task_id: &str, invocation_id: &str) -> Self {
        let span = tracing::info_span!(
            "grader.task",
            task_id = %task_id,
            invocation_id = %invocation_id,
        );
        Self {
            _span: span.entered(),
        }
    }
}

/// Emit event: grading started for a task at a tier.
pub fn emit_task_started(task_id: &str, tier: &str) {
    info!(event = "task.started", task_id = %task_id, tier = %tier);
}

/// Emit event: one pipeline phase completed.
pub fn emit_phase_completed(task_id: &str, phase: &str, duration_ms: u64) {
    info!(
        event = "task.phase_completed",
        task_id = %task_id,
        phase = %phase,
        duration_ms = duration_ms,
    );
}

/// Emit event: grading finished with the final score and dominant layer.
pub fn emit_task_finished(task_id: &str, score: u32, dominant_layer: Option<&str>) {
    info!(
        event = "task.finished",
        task_id = %task_id,
        score = score,
        dominant_layer = dominant_layer.unwrap_or("none"),
    );
}

/// Emit event: a generation call lost its deadline race (warning level).
pub fn emit_generation_timed_out(task_id: &str, phase: &str, budget_ms: u64) {
    warn!(
        event = "generation.timed_out",
        task_id = %task_id,
        phase = %phase,
        budget_ms = budget_ms,
    );
}

/// Emit event: scratch-directory cleanup failed (warning level).
pub fn emit_sandbox_cleanup_failed(path: &str, error: &dyn std::fmt::Display) {
    warn!(event = "sandbox.cleanup_failed", path = %path, error = %error);
}
