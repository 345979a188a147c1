//! Runtime evaluator: pure classification of sandbox evidence into a
//! pass/fail score and failure annotations.
//!
//! Classification is deliberately conservative about shapes it does not
//! recognize: an unknown error shape degrades to a non-fatal warning
//! instead of being rejected outright. That policy is a design choice and
//! must be preserved.

use grader_core::{FailureAnnotation, RuleId, SandboxManifest, Severity};

use crate::sandbox::{BrowserErrorKind, SandboxRunResult};

/// Result of classifying one sandbox run.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeEvaluation {
    /// 0.0 or 1.0.
    pub score: f64,

    /// Annotations in classification order.
    pub annotations: Vec<FailureAnnotation>,
}

/// Classify sandbox evidence against the declared manifest.
///
/// Pure: same inputs yield the same evaluation.
pub fn evaluate_runtime(
    result: &SandboxRunResult,
    manifest: &SandboxManifest,
) -> RuntimeEvaluation {
    let mut annotations = Vec::new();
    let mut fatal_count = 0usize;

    // Manifest drift is evidence, not a verdict: it never zeroes the score
    // by itself.
    if !manifest.contains_entry() {
        annotations.push(
            RuleId::ManifestMismatch
                .annotate(format!(
                    "declared entry {} is absent from the mounted files",
                    manifest.entry
                ))
                .with_file(manifest.entry.clone()),
        );
    }

    if result.build_failed {
        fatal_count += 1;
        annotations.push(RuleId::BuildFailed.annotate(
            result
                .logs
                .iter()
                .find(|l| l.contains("build"))
                .cloned()
                .unwrap_or_else(|| "build step failed".to_string()),
        ));
    }

    for error in &result.browser_errors {
        match &error.kind {
            BrowserErrorKind::PageError => {
                fatal_count += 1;
                let mut ann = RuleId::PageCrash.annotate(error.message.clone());
                if let Some(url) = &error.url {
                    ann = ann.with_evidence(url.clone());
                }
                annotations.push(ann);
            }
            BrowserErrorKind::ConsoleError => {
                fatal_count += 1;
                annotations.push(RuleId::ConsoleError.annotate(error.message.clone()));
            }
            BrowserErrorKind::RequestFailed { resource }
            | BrowserErrorKind::HttpFailure { resource, .. } => {
                if resource.is_code_or_markup() {
                    fatal_count += 1;
                    let mut ann = RuleId::NetworkFailure.annotate(error.message.clone());
                    if let Some(url) = &error.url {
                        ann = ann.with_evidence(url.clone());
                    }
                    annotations.push(ann);
                } else {
                    // Non-code resources are cosmetic: demote to a warning.
                    annotations.push(RuleId::NetworkFailure.annotate_downgraded(
                        Severity::Warning,
                        error.message.clone(),
                    ));
                }
            }
            BrowserErrorKind::Other => {
                // Conservative-unknown-type policy: degrade gracefully.
                annotations.push(
                    RuleId::UnrecognizedRuntimeSignal.annotate(error.message.clone()),
                );
            }
        }
    }

    if let Some(process) = &result.process {
        if !process.passed() {
            fatal_count += 1;
            let reason = if process.timed_out {
                "process runtime timed out".to_string()
            } else {
                format!("process exited with code {}", process.exit_code)
            };
            annotations.push(
                RuleId::ProcessFailed
                    .annotate(reason)
                    .with_evidence(process.stderr.trim().to_string()),
            );
        }
    }

    for access in &result.external_accesses {
        if access.target.starts_with("data:") {
            continue;
        }
        if access.target.starts_with("file:") {
            if !manifest.covers_access(&access.target) {
                annotations.push(
                    RuleId::ManifestMismatch
                        .annotate(format!(
                            "runtime accessed {} which is not traceable to a mounted file",
                            access.target
                        ))
                        .with_evidence(access.target.clone()),
                );
            }
        } else {
            // Never fatal: the audit trail is advisory.
            annotations.push(
                RuleId::ExternalAccess
                    .annotate(format!("runtime reached out to {}", access.target))
                    .with_evidence(access.target.clone()),
            );
        }
    }

    let score = if !result.success || fatal_count > 0 {
        0.0
    } else {
        1.0
    };

    RuntimeEvaluation { score, annotations }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grader_core::{ArtifactBundle, FailureLayer};

    use crate::sandbox::{BrowserError, ExternalAccess, ProcessOutcome};

    fn manifest() -> SandboxManifest {
        let bundle = ArtifactBundle::from_pairs([
            ("index.html", "<html></html>"),
            ("main.js", "let x = 1;"),
        ]);
        SandboxManifest::from_bundle("index.html", &bundle)
    }

    fn clean_result() -> SandboxRunResult {
        SandboxRunResult {
            success: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_clean_run_scores_one() {
        let eval = evaluate_runtime(&clean_result(), &manifest());
        assert_eq!(eval.score, 1.0);
        assert!(eval.annotations.is_empty());
    }

    #[test]
    fn test_page_error_is_fatal_and_critical() {
        let mut result = clean_result();
        result.success = false;
        result
            .browser_errors
            .push(BrowserError::page_error("Uncaught ReferenceError: boom"));

        let eval = evaluate_runtime(&result, &manifest());
        assert_eq!(eval.score, 0.0);
        let ann = &eval.annotations[0];
        assert_eq!(ann.rule, RuleId::PageCrash);
        assert_eq!(ann.severity, Severity::Critical);
        assert_eq!(ann.layer, FailureLayer::L5);
    }

    #[test]
    fn test_console_error_is_fatal() {
        let mut result = clean_result();
        result.success = false;
        result
            .browser_errors
            .push(BrowserError::console_error("TypeError: x is undefined"));

        let eval = evaluate_runtime(&result, &manifest());
        assert_eq!(eval.score, 0.0);
        assert_eq!(eval.annotations[0].rule, RuleId::ConsoleError);
    }

    #[test]
    fn test_network_failure_on_script_is_fatal() {
        let mut result = clean_result();
        result.success = false;
        result.browser_errors.push(BrowserError::request_failed(
            "net::ERR_FILE_NOT_FOUND",
            "file:///x/app.js",
        ));

        let eval = evaluate_runtime(&result, &manifest());
        assert_eq!(eval.score, 0.0);
        assert_eq!(eval.annotations[0].severity, Severity::Error);
    }

    #[test]
    fn test_network_failure_on_image_demoted_to_warning() {
        let mut result = clean_result();
        result.browser_errors.push(BrowserError::request_failed(
            "net::ERR_FILE_NOT_FOUND",
            "file:///x/logo.png",
        ));

        let eval = evaluate_runtime(&result, &manifest());
        // The sandbox still reported success; a cosmetic failure does not
        // zero the score.
        assert_eq!(eval.score, 1.0);
        assert_eq!(eval.annotations[0].severity, Severity::Warning);
    }

    #[test]
    fn test_unknown_shape_degrades_to_warning() {
        let mut result = clean_result();
        result.browser_errors.push(crate::sandbox::BrowserError {
            kind: BrowserErrorKind::Other,
            message: "something novel".to_string(),
            url: None,
        });

        let eval = evaluate_runtime(&result, &manifest());
        assert_eq!(eval.score, 1.0);
        assert_eq!(eval.annotations[0].rule, RuleId::UnrecognizedRuntimeSignal);
        assert!(!eval.annotations[0].is_fatal_grade());
    }

    #[test]
    fn test_manifest_entry_mismatch_is_evidence_not_verdict() {
        let bundle = ArtifactBundle::from_pairs([("index.html", "<html></html>")]);
        let manifest = SandboxManifest::from_bundle("index.js", &bundle);

        let eval = evaluate_runtime(&clean_result(), &manifest);
        // Annotation present, score untouched.
        assert_eq!(eval.score, 1.0);
        let ann = &eval.annotations[0];
        assert_eq!(ann.rule, RuleId::ManifestMismatch);
        assert_eq!(ann.layer, FailureLayer::L5);
    }

    #[test]
    fn test_untraceable_file_access_flagged() {
        let mut result = clean_result();
        result
            .external_accesses
            .push(ExternalAccess::new("file:///elsewhere/secret.js"));

        let eval = evaluate_runtime(&result, &manifest());
        assert!(eval
            .annotations
            .iter()
            .any(|a| a.rule == RuleId::ManifestMismatch));
    }

    #[test]
    fn test_external_access_advisory_never_fatal() {
        let mut result = clean_result();
        result
            .external_accesses
            .push(ExternalAccess::new("https://cdn.example.com/lib.js"));
        result.external_accesses.push(ExternalAccess::new(
            "data:text/plain;base64,aGVsbG8=",
        ));

        let eval = evaluate_runtime(&result, &manifest());
        assert_eq!(eval.score, 1.0);
        // data: URIs are not recorded; the https access is advisory.
        let advisories: Vec<_> = eval
            .annotations
            .iter()
            .filter(|a| a.rule == RuleId::ExternalAccess)
            .collect();
        assert_eq!(advisories.len(), 1);
        assert_eq!(advisories[0].severity, Severity::Info);
    }

    #[test]
    fn test_process_failure_annotated() {
        let mut result = clean_result();
        result.success = false;
        result.process = Some(ProcessOutcome {
            exit_code: 2,
            stdout: String::new(),
            stderr: "ReferenceError".to_string(),
            timed_out: false,
        });

        let eval = evaluate_runtime(&result, &manifest());
        assert_eq!(eval.score, 0.0);
        assert_eq!(eval.annotations[0].rule, RuleId::ProcessFailed);
    }

    #[test]
    fn test_evaluation_is_pure() {
        let mut result = clean_result();
        result.success = false;
        result
            .browser_errors
            .push(BrowserError::console_error("boom"));

        let a = evaluate_runtime(&result, &manifest());
        let b = evaluate_runtime(&result, &manifest());
        assert_eq!(a, b);
    }
}
