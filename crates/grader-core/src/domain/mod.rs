//! Domain model: task specifications, artifact bundles, scores, and errors.

pub mod artifact;
pub mod error;
pub mod score;
pub mod task;

pub use artifact::{ArtifactBundle, BundleError};
pub use error::{GraderError, Result};
pub use score::{FinalResult, RuntimeDisclosure, ScoreBreakdown};
pub use task::{DifficultyTier, RuntimeDescriptor, RuntimeKind, TaskSpec};
