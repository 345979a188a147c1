//! Task specifications and difficulty tiers.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// The five ordered grading profiles, lightest to heaviest.
///
/// Each tier fixes a scoring weight, a total time budget, and which
/// connectivity sub-checks the static evaluator enables.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum DifficultyTier {
    Basic,
    Standard,
    Advanced,
    Complex,
    Expert,
}

impl DifficultyTier {
    /// All tiers in ascending order of difficulty.
    pub const ALL: [DifficultyTier; 5] = [
        DifficultyTier::Basic,
        DifficultyTier::Standard,
        DifficultyTier::Advanced,
        DifficultyTier::Complex,
        DifficultyTier::Expert,
    ];

    /// Fixed relative scoring weight applied to the base score.
    pub fn weight(&self) -> f64 {
        match self {
            DifficultyTier::Basic => 0.6,
            DifficultyTier::Standard => 0.8,
            DifficultyTier::Advanced => 1.0,
            DifficultyTier::Complex => 1.2,
            DifficultyTier::Expert => 1.4,
        }
    }

    /// Total wall-clock budget for one task at this tier.
    pub fn time_budget(&self) -> Duration {
        let secs = match self {
            DifficultyTier::Basic => 60,
            DifficultyTier::Standard => 90,
            DifficultyTier::Advanced => 120,
            DifficultyTier::Complex => 180,
            DifficultyTier::Expert => 300,
        };
        Duration::from_secs(secs)
    }

    /// Number of connectivity sub-checks enabled at this tier.
    ///
    /// Basic enables only the file-reference check; each subsequent tier
    /// adds one more check up to the full set of four at Complex.
    pub fn enabled_connectivity_checks(&self) -> usize {
        match self {
            DifficultyTier::Basic => 1,
            DifficultyTier::Standard => 2,
            DifficultyTier::Advanced => 3,
            DifficultyTier::Complex | DifficultyTier::Expert => 4,
        }
    }

    /// Whether generation calls at this tier are raced against a deadline
    /// timer. Only the heaviest tier races; all others simply await.
    pub fn races_deadline(&self) -> bool {
        matches!(self, DifficultyTier::Expert)
    }
}

impl std::fmt::Display for DifficultyTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DifficultyTier::Basic => "basic",
            DifficultyTier::Standard => "standard",
            DifficultyTier::Advanced => "advanced",
            DifficultyTier::Complex => "complex",
            DifficultyTier::Expert => "expert",
        };
        write!(f, "{name}")
    }
}

/// Which runtime strategy the sandbox uses for a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeKind {
    /// Static-only task; the sandbox succeeds trivially.
    None,
    /// Load the entry file in an isolated headless browser.
    Browser,
    /// Execute the entry as an isolated child process.
    Process,
}

/// Runtime execution descriptor for a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeDescriptor {
    /// Runtime strategy.
    pub kind: RuntimeKind,

    /// Entry point, relative to the artifact root.
    pub entry: String,

    /// Optional build command run before the entry (first element is the
    /// executable).
    pub build_command: Option<Vec<String>>,
}

impl RuntimeDescriptor {
    /// A static-only descriptor (no entry, no build).
    pub fn none() -> Self {
        Self {
            kind: RuntimeKind::None,
            entry: String::new(),
            build_command: None,
        }
    }

    /// Browser-load descriptor for the given entry file.
    pub fn browser(entry: impl Into<String>) -> Self {
        Self {
            kind: RuntimeKind::Browser,
            entry: entry.into(),
            build_command: None,
        }
    }

    /// Child-process descriptor for the given entry file.
    pub fn process(entry: impl Into<String>) -> Self {
        Self {
            kind: RuntimeKind::Process,
            entry: entry.into(),
            build_command: None,
        }
    }

    /// Attach a build command (builder pattern).
    pub fn with_build(mut self, command: Vec<String>) -> Self {
        self.build_command = Some(command);
        self
    }
}

/// Immutable description of one grading unit.
///
/// Created once per catalog lookup; never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSpec {
    /// Task identifier.
    pub id: String,

    /// Human-readable description handed to the generation collaborator.
    pub description: String,

    /// Difficulty tier.
    pub tier: DifficultyTier,

    /// Files the artifact bundle must contain.
    pub required_files: Vec<String>,

    /// Runtime descriptor; `RuntimeKind::None` for static-only tasks.
    pub runtime: RuntimeDescriptor,
}

impl TaskSpec {
    /// Create a static-only task specification.
    pub fn new(
        id: impl Into<String>,
        description: impl Into<String>,
        tier: DifficultyTier,
        required_files: Vec<String>,
    ) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            tier,
            required_files,
            runtime: RuntimeDescriptor::none(),
        }
    }

    /// Attach a runtime descriptor (builder pattern).
    pub fn with_runtime(mut self, runtime: RuntimeDescriptor) -> Self {
        self.runtime = runtime;
        self
    }

    /// Whether this task carries an executable runtime.
    pub fn has_runtime(&self) -> bool {
        self.runtime.kind != RuntimeKind::None
    }
}
