//! Domain-level error taxonomy for the grading engine.
//!
//! Grading failures themselves (categories a-d of the error design) are
//! recovered into typed results and never surface here. These errors cover
//! the seams that are allowed to fail: catalog lookups, collaborator calls,
//! and I/O performed outside of a grading decision.

/// Grading engine domain errors.
#[derive(Debug, thiserror::Error)]
pub enum GraderError {
    #[error("unknown task id: {0}")]
    UnknownTask(String),

    #[error("generation collaborator failed: {0}")]
    Generation(String),

    #[error("artifact bundle rejected: {0}")]
    Bundle(#[from] crate::domain::artifact::BundleError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for grading engine operations.
pub type Result<T> = std::result::Result<T, GraderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_task_display() {
        let err = GraderError::UnknownTask("no-such-task".to_string());
        assert!(err.to_string().contains("no-such-task"));
    }

    #[test]
    fn test_bundle_error_converts() {
        let err: GraderError = crate::domain::artifact::BundleError::EmptyTree.into();
        assert!(err.to_string().contains("bundle tree is empty"));
    }
}
