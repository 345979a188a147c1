//! Static evaluator: structural, completeness, and connectivity sub-scores
//! computed from the validated content map.
//!
//! Pure with one exception: required script files are written into an
//! ephemeral scratch directory and handed to the lint collaborator. The
//! scratch directory is owned by this evaluator and dropped on every exit
//! path; a lint collaborator failure is swallowed and treated as "lint
//! unavailable", never surfaced as a task failure.

use std::sync::Arc;

use regex::Regex;
use tracing::{debug, warn};

use grader_core::{
    ArtifactBundle, DifficultyTier, FailureAnnotation, RuleId, RuntimeKind, ScoreBreakdown,
    Severity, TaskSpec,
};

use crate::collab::{LintChecker, LintReport, RuntimeHint};

/// Outcome of one static evaluation: the sub-score breakdown plus the
/// failure annotations it accumulated.
#[derive(Debug, Clone)]
pub struct StaticReport {
    /// Sub-scores; `survivability` is derived from the other three.
    pub breakdown: ScoreBreakdown,

    /// Annotations emitted while scoring, in emission order.
    pub annotations: Vec<FailureAnnotation>,
}

/// Computes the static half of the evidence for one task.
#[derive(Default)]
pub struct StaticEvaluator {
    lint: Option<Arc<dyn LintChecker>>,
}

impl StaticEvaluator {
    /// Evaluator without a lint collaborator (lint sub-annotations skipped).
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluator that hands script files to the given lint collaborator.
    pub fn with_lint(lint: Arc<dyn LintChecker>) -> Self {
        Self { lint: Some(lint) }
    }

    /// Compute the full score breakdown for a validated bundle.
    pub async fn evaluate(&self, spec: &TaskSpec, bundle: &ArtifactBundle) -> StaticReport {
        let mut annotations = Vec::new();

        let completeness = completeness_score(spec, bundle, &mut annotations);
        let structure = structure_score(bundle, &mut annotations);
        let connectivity = connectivity_score(spec, bundle, &mut annotations);

        let survivability = if completeness >= 1.0 && structure >= 0.5 && connectivity >= 0.5 {
            1.0
        } else {
            0.0
        };

        self.run_lint(spec, bundle, &mut annotations).await;

        StaticReport {
            breakdown: ScoreBreakdown {
                completeness,
                structure,
                survivability,
                connectivity,
            },
            annotations,
        }
    }

    /// Hand script files to the lint collaborator through a scratch
    /// directory and fold its findings into L2/L1 annotations.
    async fn run_lint(
        &self,
        spec: &TaskSpec,
        bundle: &ArtifactBundle,
        annotations: &mut Vec<FailureAnnotation>,
    ) {
        let Some(lint) = &self.lint else {
            return;
        };

        let script_files: Vec<&String> =
            bundle.tree.iter().filter(|p| is_script(p)).collect();
        if script_files.is_empty() {
            return;
        }

        // Scratch dir is dropped (and deleted) on every exit path below.
        let scratch = match tempfile::tempdir() {
            Ok(dir) => dir,
            Err(err) => {
                warn!(error = %err, "lint scratch directory unavailable, skipping lint");
                return;
            }
        };

        let mut paths = Vec::new();
        for rel in &script_files {
            let dest = scratch.path().join(rel);
            if let Some(parent) = dest.parent() {
                if std::fs::create_dir_all(parent).is_err() {
                    continue;
                }
            }
            let content = bundle.content(rel).unwrap_or_default();
            if std::fs::write(&dest, content).is_ok() {
                paths.push(dest);
            }
        }

        let hint = match spec.runtime.kind {
            RuntimeKind::Browser => RuntimeHint::Browser,
            _ => RuntimeHint::Process,
        };

        // A lint collaborator failure is never a task failure.
        let report: LintReport = match lint.check(&paths, hint).await {
            Ok(report) => report,
            Err(err) => {
                warn!(error = %err, "lint collaborator failed, treating as unavailable");
                LintReport::unavailable()
            }
        };

        for finding in &report.errors {
            annotations.push(
                RuleId::LintError
                    .annotate(finding.message.clone())
                    .with_file(finding.file.clone()),
            );
        }
        for finding in &report.warnings {
            annotations.push(
                RuleId::LintWarning
                    .annotate(finding.message.clone())
                    .with_file(finding.file.clone()),
            );
        }
        for finding in &report.notes {
            annotations.push(
                RuleId::LintInfo
                    .annotate(finding.message.clone())
                    .with_file(finding.file.clone()),
            );
        }
    }
}

fn is_markup(path: &str) -> bool {
    let lower = path.to_ascii_lowercase();
    lower.ends_with(".html") || lower.ends_with(".htm")
}

fn is_script(path: &str) -> bool {
    path.to_ascii_lowercase().ends_with(".js")
}

fn is_json(path: &str) -> bool {
    path.to_ascii_lowercase().ends_with(".json")
}

fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// 1.0 when every required file is present and non-empty, else 0.5 with an
/// annotation naming the missing/empty set.
fn completeness_score(
    spec: &TaskSpec,
    bundle: &ArtifactBundle,
    annotations: &mut Vec<FailureAnnotation>,
) -> f64 {
    let missing: Vec<&String> = spec
        .required_files
        .iter()
        .filter(|path| !bundle.has_non_empty(path))
        .collect();

    if missing.is_empty() {
        return 1.0;
    }

    let listed = missing
        .iter()
        .map(|s| s.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    annotations.push(
        RuleId::MissingRequiredFiles
            .annotate(format!("missing or empty required files: {listed}"))
            .with_evidence(listed.clone()),
    );
    0.5
}

/// Fraction of files passing the per-extension sanity check.
fn structure_score(
    bundle: &ArtifactBundle,
    annotations: &mut Vec<FailureAnnotation>,
) -> f64 {
    if bundle.tree.is_empty() {
        return 0.0;
    }

    let mut failing = Vec::new();
    for path in &bundle.tree {
        let content = bundle.content(path).unwrap_or_default();
        let ok = if is_markup(path) {
            let lower = content.to_ascii_lowercase();
            lower.contains("<!doctype") || lower.contains("<html") || lower.contains("<body")
        } else if is_json(path) {
            serde_json::from_str::<serde_json::Value>(content).is_ok()
        } else {
            !content.trim().is_empty()
        };
        if !ok {
            failing.push(path.as_str());
        }
    }

    let passing = bundle.tree.len() - failing.len();
    let score = passing as f64 / bundle.tree.len() as f64;

    if score < 1.0 {
        annotations.push(
            RuleId::StructureCheckFailed
                .annotate(format!(
                    "{} of {} files failed the structure check",
                    failing.len(),
                    bundle.tree.len()
                ))
                .with_evidence(failing.join(", ")),
        );
    }
    score
}

/// Tier-gated composite of up to four sub-checks, each in {0, 0.5, 1}.
fn connectivity_score(
    spec: &TaskSpec,
    bundle: &ArtifactBundle,
    annotations: &mut Vec<FailureAnnotation>,
) -> f64 {
    let checks: [fn(&TaskSpec, &ArtifactBundle, &mut Vec<FailureAnnotation>) -> f64; 4] = [
        check_file_reference,
        check_script_binding,
        check_api_schema,
        check_routes,
    ];
    let enabled = spec.tier.enabled_connectivity_checks();

    let mut total = 0.0;
    for check in checks.iter().take(enabled) {
        total += check(spec, bundle, annotations);
    }
    let score = total / enabled as f64;
    debug!(tier = %spec.tier, enabled, score, "connectivity composite");
    score
}

/// Check 1: do markup files textually mention the paths of every other
/// required non-markup file?
fn check_file_reference(
    spec: &TaskSpec,
    bundle: &ArtifactBundle,
    annotations: &mut Vec<FailureAnnotation>,
) -> f64 {
    let targets: Vec<&String> = spec
        .required_files
        .iter()
        .filter(|p| !is_markup(p))
        .collect();
    if targets.is_empty() {
        // No non-markup requirements: vacuous pass.
        return 1.0;
    }

    let markup: String = bundle
        .tree
        .iter()
        .filter(|p| is_markup(p))
        .filter_map(|p| bundle.content(p))
        .collect::<Vec<_>>()
        .join("\n");

    let matched = targets
        .iter()
        .filter(|t| markup.contains(t.as_str()))
        .count();
    let unmatched: Vec<&str> = targets
        .iter()
        .filter(|t| !markup.contains(t.as_str()))
        .map(|t| t.as_str())
        .collect();

    if matched == targets.len() {
        return 1.0;
    }

    let has_generic_tag = markup.contains("<script") || markup.contains("<link");
    if matched > 0 && has_generic_tag {
        annotations.push(
            RuleId::FileReferenceMissing
                .annotate_downgraded(
                    Severity::Warning,
                    format!("markup references only some required files ({matched}/{})", targets.len()),
                )
                .with_evidence(unmatched.join(", ")),
        );
        0.5
    } else {
        annotations.push(
            RuleId::FileReferenceMissing
                .annotate("markup does not reference the required files".to_string())
                .with_evidence(unmatched.join(", ")),
        );
        0.0
    }
}

/// Check 2: do script-side DOM selector extractions intersect with
/// markup-side id/class declarations?
fn check_script_binding(
    _spec: &TaskSpec,
    bundle: &ArtifactBundle,
    annotations: &mut Vec<FailureAnnotation>,
) -> f64 {
    let id_lookup = Regex::new(r#"getElementById\(\s*['"]([\w-]+)['"]"#).unwrap();
    let class_lookup = Regex::new(r#"getElementsByClassName\(\s*['"]([\w-]+)['"]"#).unwrap();
    let query = Regex::new(r#"querySelector(?:All)?\(\s*['"]([#.])([\w-]+)['"]"#).unwrap();
    let id_decl = Regex::new(r#"id\s*=\s*['"]([\w-]+)['"]"#).unwrap();
    let class_decl = Regex::new(r#"class\s*=\s*['"]([^'"]+)['"]"#).unwrap();

    let mut selectors = std::collections::BTreeSet::new();
    for path in bundle.tree.iter().filter(|p| is_script(p)) {
        let content = bundle.content(path).unwrap_or_default();
        for cap in id_lookup.captures_iter(content) {
            selectors.insert(format!("#{}", &cap[1]));
        }
        for cap in class_lookup.captures_iter(content) {
            selectors.insert(format!(".{}", &cap[1]));
        }
        for cap in query.captures_iter(content) {
            selectors.insert(format!("{}{}", &cap[1], &cap[2]));
        }
    }

    let mut declarations = std::collections::BTreeSet::new();
    for path in bundle.tree.iter().filter(|p| is_markup(p)) {
        let content = bundle.content(path).unwrap_or_default();
        for cap in id_decl.captures_iter(content) {
            declarations.insert(format!("#{}", &cap[1]));
        }
        for cap in class_decl.captures_iter(content) {
            for class in cap[1].split_whitespace() {
                declarations.insert(format!(".{class}"));
            }
        }
    }

    if selectors.is_empty() || declarations.is_empty() {
        annotations.push(RuleId::ScriptBindingUnmatched.annotate(
            "no selector/declaration surface to bind (scripts or markup are inert)",
        ));
        return 0.0;
    }

    let unmatched: Vec<&String> = selectors
        .iter()
        .filter(|s| !declarations.contains(*s))
        .collect();
    if unmatched.is_empty() {
        1.0
    } else {
        annotations.push(
            RuleId::ScriptBindingUnmatched
                .annotate_downgraded(
                    Severity::Warning,
                    format!("{} selector(s) have no markup declaration", unmatched.len()),
                )
                .with_evidence(
                    unmatched
                        .iter()
                        .map(|s| s.as_str())
                        .collect::<Vec<_>>()
                        .join(", "),
                ),
        );
        0.5
    }
}

/// Check 3: if an API-schema file exists and has keys, do other files
/// reference those keys?
fn check_api_schema(
    _spec: &TaskSpec,
    bundle: &ArtifactBundle,
    annotations: &mut Vec<FailureAnnotation>,
) -> f64 {
    let schema_path = bundle.tree.iter().find(|p| {
        let name = file_name(p).to_ascii_lowercase();
        name.contains("api") && is_json(p)
    });
    let Some(schema_path) = schema_path else {
        // No schema file: vacuously connected.
        return 1.0;
    };

    let keys: Vec<String> = bundle
        .content(schema_path)
        .and_then(|c| serde_json::from_str::<serde_json::Value>(c).ok())
        .and_then(|v| {
            v.as_object()
                .map(|obj| obj.keys().cloned().collect::<Vec<_>>())
        })
        .unwrap_or_default();

    let others: Vec<&String> = bundle
        .tree
        .iter()
        .filter(|p| p.as_str() != schema_path.as_str())
        .collect();

    if keys.is_empty() || others.is_empty() {
        annotations.push(
            RuleId::ApiSchemaUnlinked
                .annotate("API schema has no keys or no files to scan")
                .with_file(schema_path.clone()),
        );
        return 0.0;
    }

    let scan: String = others
        .iter()
        .filter_map(|p| bundle.content(p))
        .collect::<Vec<_>>()
        .join("\n");
    let scan_lower = scan.to_ascii_lowercase();

    let verbatim = keys.iter().all(|k| scan.contains(k.as_str()));
    if verbatim {
        return 1.0;
    }

    let case_insensitive = keys
        .iter()
        .all(|k| scan_lower.contains(&k.to_ascii_lowercase()));
    if case_insensitive {
        annotations.push(
            RuleId::ApiSchemaUnlinked
                .annotate_downgraded(
                    Severity::Warning,
                    "API schema keys referenced only case-insensitively",
                )
                .with_file(schema_path.clone()),
        );
        0.5
    } else {
        let missing: Vec<&str> = keys
            .iter()
            .filter(|k| !scan_lower.contains(&k.to_ascii_lowercase()))
            .map(|k| k.as_str())
            .collect();
        annotations.push(
            RuleId::ApiSchemaUnlinked
                .annotate("API schema keys are not referenced by other files")
                .with_file(schema_path.clone())
                .with_evidence(missing.join(", ")),
        );
        0.0
    }
}

/// Check 4: if a routes file exists, are all route values non-empty and
/// unique? Absence is a failure at the tiers that enable this check.
fn check_routes(
    _spec: &TaskSpec,
    bundle: &ArtifactBundle,
    annotations: &mut Vec<FailureAnnotation>,
) -> f64 {
    let routes_path = bundle.tree.iter().find(|p| {
        let name = file_name(p).to_ascii_lowercase();
        name.contains("route") && is_json(p)
    });
    let Some(routes_path) = routes_path else {
        annotations.push(
            RuleId::RouteInconsistent.annotate("no routes file present at a tier that requires one"),
        );
        return 0.0;
    };

    let values: Vec<String> = bundle
        .content(routes_path)
        .and_then(|c| serde_json::from_str::<serde_json::Value>(c).ok())
        .map(|v| match v {
            serde_json::Value::Object(obj) => obj
                .values()
                .map(|v| v.as_str().unwrap_or_default().to_string())
                .collect(),
            serde_json::Value::Array(arr) => arr
                .iter()
                .map(|v| v.as_str().unwrap_or_default().to_string())
                .collect(),
            _ => Vec::new(),
        })
        .unwrap_or_default();

    if values.is_empty() {
        annotations.push(
            RuleId::RouteInconsistent
                .annotate_downgraded(Severity::Warning, "routes file is empty or unparseable")
                .with_file(routes_path.clone()),
        );
        return 0.5;
    }

    let has_empty = values.iter().any(|v| v.trim().is_empty());
    let unique: std::collections::BTreeSet<&String> = values.iter().collect();
    let has_duplicates = unique.len() != values.len();

    if !has_empty && !has_duplicates {
        1.0
    } else {
        let offense = if has_empty {
            "empty route value"
        } else {
            "duplicate route value"
        };
        annotations.push(
            RuleId::RouteInconsistent
                .annotate_downgraded(Severity::Warning, offense)
                .with_file(routes_path.clone()),
        );
        0.5
    }
}
