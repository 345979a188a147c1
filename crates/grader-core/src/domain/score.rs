//! Score breakdowns and final results.

use serde::{Deserialize, Serialize};

use crate::registry::{FailureAnnotation, FailureLayer, Severity};

/// The four static sub-scores, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    /// 1.0 when every required file is present and non-empty, else 0.5.
    pub completeness: f64,

    /// Fraction of files passing the per-extension sanity check.
    pub structure: f64,

    /// Coarse "would a human bother to run this" gate: 0 or 1.
    pub survivability: f64,

    /// Mean of the tier-enabled connectivity sub-checks.
    pub connectivity: f64,
}

impl ScoreBreakdown {
    /// A breakdown with every sub-score at zero (terminal degraded result).
    pub fn zeroed() -> Self {
        Self {
            completeness: 0.0,
            structure: 0.0,
            survivability: 0.0,
            connectivity: 0.0,
        }
    }
}

/// Error/warning counts plus up to two concrete examples, surfaced with the
/// final result so a reader can see what the runtime actually reported.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeDisclosure {
    /// Number of fatal-grade annotations (critical or error severity).
    pub error_count: usize,

    /// Number of warning-severity annotations.
    pub warning_count: usize,

    /// Up to two example messages, first-seen order.
    pub examples: Vec<String>,
}

impl RuntimeDisclosure {
    /// Maximum number of example messages carried.
    pub const MAX_EXAMPLES: usize = 2;

    /// Summarize an annotation list.
    pub fn from_annotations(annotations: &[FailureAnnotation]) -> Self {
        let error_count = annotations.iter().filter(|a| a.is_fatal_grade()).count();
        let warning_count = annotations
            .iter()
            .filter(|a| a.severity == Severity::Warning)
            .count();
        let examples = annotations
            .iter()
            .filter(|a| a.is_fatal_grade())
            .take(Self::MAX_EXAMPLES)
            .map(|a| a.message.clone())
            .collect();
        Self {
            error_count,
            warning_count,
            examples,
        }
    }
}

/// The single deterministic verdict for one task invocation.
///
/// Invariant: `score <= dominant_layer.map(|l| l.score_cap()).unwrap_or(100)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalResult {
    /// Total score, 0-100, within the dominant layer's cap.
    pub score: u32,

    /// Highest-layer fatal-grade annotation's layer, if any.
    pub dominant_layer: Option<FailureLayer>,

    /// Static sub-score breakdown.
    pub breakdown: ScoreBreakdown,

    /// Runtime sub-score; `None` when the task carried no runtime.
    pub runtime_score: Option<f64>,

    /// Error/warning counts and examples.
    pub disclosure: RuntimeDisclosure,

    /// Explanatory note for degraded terminal results.
    pub note: Option<String>,
}

impl FinalResult {
    /// A complete, well-typed zero result for a task that could not be
    /// graded at all.
    pub fn degraded(note: impl Into<String>, annotations: &[FailureAnnotation]) -> Self {
        let dominant_layer = annotations
            .iter()
            .filter(|a| a.is_fatal_grade())
            .map(|a| a.layer)
            .max();
        Self {
            score: 0,
            dominant_layer,
            breakdown: ScoreBreakdown::zeroed(),
            runtime_score: None,
            disclosure: RuntimeDisclosure::from_annotations(annotations),
            note: Some(note.into()),
        }
    }

    /// Whether the score respects the dominant layer's cap.
    pub fn within_cap(&self) -> bool {
        let cap = self.dominant_layer.map(|l| l.score_cap()).unwrap_or(100);
        self.score <= cap
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::RuleId;

    #[test]
    fn test_disclosure_counts_and_examples() {
        let annotations = vec![
            RuleId::ConsoleError.annotate("first error"),
            RuleId::ConsoleError.annotate("second error"),
            RuleId::ConsoleError.annotate("third error"),
            RuleId::ManifestMismatch.annotate("a warning"),
            RuleId::ExternalAccess.annotate("an info"),
        ];
        let d = RuntimeDisclosure::from_annotations(&annotations);
        assert_eq!(d.error_count, 3);
        assert_eq!(d.warning_count, 1);
        assert_eq!(d.examples, vec!["first error", "second error"]);
    }

    #[test]
    fn test_degraded_result_is_complete() {
        let annotations = vec![RuleId::GenerationFailed.annotate("model call threw")];
        let r = FinalResult::degraded("generation failed", &annotations);
        assert_eq!(r.score, 0);
        assert_eq!(r.dominant_layer, Some(FailureLayer::L4));
        assert!(r.within_cap());
        assert!(r.note.is_some());
    }

    #[test]
    fn test_degraded_without_annotations_has_no_layer() {
        let r = FinalResult::degraded("nothing to grade", &[]);
        assert_eq!(r.dominant_layer, None);
        assert!(r.within_cap());
    }
}
