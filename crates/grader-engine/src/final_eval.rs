//! Final evaluator: fold the static breakdown, the runtime score, and the
//! merged annotation list into one deterministic verdict.
//!
//! Two-stage design: a continuous penalty keeps scores comparable within a
//! failure class, then a discrete hard cap guarantees no amount of partial
//! credit lets a crashed task outscore a clean one.

use grader_core::{
    DifficultyTier, FailureAnnotation, FailureLayer, FinalResult, RuntimeDisclosure,
    ScoreBreakdown, Severity,
};

/// Highest layer among fatal-grade annotations, first-seen tiebreak.
pub fn dominant_layer(annotations: &[FailureAnnotation]) -> Option<FailureLayer> {
    annotations
        .iter()
        .filter(|a| a.is_fatal_grade())
        .map(|a| a.layer)
        .max()
}

fn penalty(annotations: &[FailureAnnotation]) -> f64 {
    annotations
        .iter()
        .map(|a| match (a.layer, a.severity) {
            // Warning-grade runtime evidence carries no penalty; it is
            // disclosed, not charged.
            (FailureLayer::L5, s) if s.is_fatal_grade() => 15.0,
            (FailureLayer::L4, s) if s.is_fatal_grade() => 20.0,
            (FailureLayer::L2, Severity::Error) => 5.0,
            (FailureLayer::L2, Severity::Warning) => 2.0,
            _ => 0.0,
        })
        .sum()
}

/// Resolve the final result for one task invocation.
///
/// Pure and stable: identical inputs, including annotation order, yield
/// bit-identical results.
pub fn resolve_final(
    tier: DifficultyTier,
    breakdown: ScoreBreakdown,
    runtime_score: Option<f64>,
    annotations: &[FailureAnnotation],
) -> FinalResult {
    let dominant = dominant_layer(annotations);

    let base = match runtime_score {
        None => {
            100.0
                * (0.6 * breakdown.completeness
                    + 0.3 * breakdown.structure
                    + 0.1 * breakdown.survivability)
        }
        Some(runtime) => {
            100.0
                * (0.4 * breakdown.completeness
                    + 0.2 * breakdown.structure
                    + 0.1 * breakdown.survivability
                    + 0.3 * runtime)
        }
    };

    let weighted = base * tier.weight();
    let cap = dominant.map(|l| l.score_cap()).unwrap_or(100) as f64;
    let score = (weighted - penalty(annotations)).clamp(0.0, cap).round() as u32;

    FinalResult {
        score,
        dominant_layer: dominant,
        breakdown,
        runtime_score,
        disclosure: RuntimeDisclosure::from_annotations(annotations),
        note: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grader_core::RuleId;

    fn perfect() -> ScoreBreakdown {
        ScoreBreakdown {
            completeness: 1.0,
            structure: 1.0,
            survivability: 1.0,
            connectivity: 1.0,
        }
    }

    #[test]
    fn test_perfect_static_only_basic_tier() {
        let result = resolve_final(DifficultyTier::Basic, perfect(), None, &[]);
        // 100 * 0.6 weight, no penalty, no cap.
        assert_eq!(result.score, 60);
        assert_eq!(result.dominant_layer, None);
        assert!(result.within_cap());
    }

    #[test]
    fn test_perfect_with_runtime_advanced_tier() {
        let result = resolve_final(DifficultyTier::Advanced, perfect(), Some(1.0), &[]);
        assert_eq!(result.score, 100);
    }

    #[test]
    fn test_runtime_weights_differ_from_static_weights() {
        let breakdown = ScoreBreakdown {
            completeness: 1.0,
            structure: 0.0,
            survivability: 0.0,
            connectivity: 0.0,
        };
        let without = resolve_final(DifficultyTier::Advanced, breakdown, None, &[]);
        let with = resolve_final(DifficultyTier::Advanced, breakdown, Some(1.0), &[]);
        assert_eq!(without.score, 60);
        assert_eq!(with.score, 70);
    }

    #[test]
    fn test_l5_crash_caps_at_30() {
        let annotations = vec![RuleId::PageCrash.annotate("Uncaught ReferenceError")];
        let result =
            resolve_final(DifficultyTier::Complex, perfect(), Some(0.0), &annotations);
        assert_eq!(result.dominant_layer, Some(FailureLayer::L5));
        assert!(result.score <= 30);
        assert!(result.within_cap());
    }

    #[test]
    fn test_l4_rejection_caps_at_50() {
        let annotations = vec![RuleId::BundleRejected.annotate("tree malformed")];
        let result = resolve_final(DifficultyTier::Advanced, perfect(), None, &annotations);
        assert_eq!(result.dominant_layer, Some(FailureLayer::L4));
        assert!(result.score <= 50);
    }

    #[test]
    fn test_dominant_layer_picks_highest() {
        let annotations = vec![
            RuleId::LintError.annotate("unused var"),
            RuleId::MissingRequiredFiles.annotate("main.js missing"),
            RuleId::ConsoleError.annotate("boom"),
        ];
        assert_eq!(dominant_layer(&annotations), Some(FailureLayer::L5));
    }

    #[test]
    fn test_warnings_do_not_set_a_layer() {
        let annotations = vec![
            RuleId::ManifestMismatch.annotate("entry drift"),
            RuleId::ExternalAccess.annotate("cdn fetch"),
        ];
        assert_eq!(dominant_layer(&annotations), None);
        let result = resolve_final(DifficultyTier::Basic, perfect(), Some(1.0), &annotations);
        assert_eq!(result.dominant_layer, None);
        assert!(result.within_cap());
    }

    #[test]
    fn test_penalties_per_annotation() {
        // Two L5 fatal annotations: 30 off before the cap.
        let annotations = vec![
            RuleId::ConsoleError.annotate("first"),
            RuleId::ConsoleError.annotate("second"),
        ];
        let result =
            resolve_final(DifficultyTier::Advanced, perfect(), Some(0.0), &annotations);
        // base 70, minus 30, then capped at 30.
        assert_eq!(result.score, 30);
    }

    #[test]
    fn test_l2_penalties_scaled_by_severity() {
        let annotations = vec![
            RuleId::LintError.annotate("err"),
            RuleId::LintWarning.annotate("warn"),
        ];
        let result = resolve_final(DifficultyTier::Advanced, perfect(), None, &annotations);
        // 100 - 5 - 2, capped at L2's 85.
        assert_eq!(result.dominant_layer, Some(FailureLayer::L2));
        assert_eq!(result.score, 85);
    }

    #[test]
    fn test_l3_annotations_carry_no_extra_penalty() {
        let annotations = vec![RuleId::FileReferenceMissing.annotate("no script tag")];
        let result = resolve_final(DifficultyTier::Advanced, perfect(), None, &annotations);
        // Cap applies but no per-annotation subtraction.
        assert_eq!(result.score, 70);
    }

    #[test]
    fn test_score_never_negative() {
        let annotations: Vec<_> = (0..10)
            .map(|i| RuleId::ConsoleError.annotate(format!("error {i}")))
            .collect();
        let result = resolve_final(
            DifficultyTier::Basic,
            ScoreBreakdown::zeroed(),
            Some(0.0),
            &annotations,
        );
        assert_eq!(result.score, 0);
    }

    #[test]
    fn test_resolution_is_bit_stable() {
        let annotations = vec![
            RuleId::ConsoleError.annotate("boom"),
            RuleId::LintWarning.annotate("style"),
        ];
        let a = resolve_final(DifficultyTier::Expert, perfect(), Some(0.0), &annotations);
        let b = resolve_final(DifficultyTier::Expert, perfect(), Some(0.0), &annotations);
        assert_eq!(a, b);
    }

    #[test]
    fn test_cap_monotone_across_layers() {
        let perfect = perfect();
        let crash = resolve_final(
            DifficultyTier::Expert,
            perfect,
            Some(0.0),
            &[RuleId::PageCrash.annotate("x")],
        );
        let parse = resolve_final(
            DifficultyTier::Expert,
            perfect,
            None,
            &[RuleId::BundleRejected.annotate("x")],
        );
        let quality = resolve_final(
            DifficultyTier::Expert,
            perfect,
            None,
            &[RuleId::LintError.annotate("x")],
        );
        assert!(crash.score <= parse.score);
        assert!(parse.score <= quality.score);
    }
}
