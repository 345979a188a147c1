//! Failure-rule registry: the frozen catalog mapping rule identifiers to
//! layer, category, severity, and message templates.
//!
//! Rule identifiers are a tagged enum, so call sites cannot reference a rule
//! the registry does not know about. The string-keyed [`lookup`] escape
//! hatch panics on an unknown key: that is registry misuse, a programming
//! fault that must abort loudly rather than silently degrade a score.

use serde::{Deserialize, Serialize};

/// Severity of a failure annotation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Error,
    Critical,
}

impl Severity {
    /// Whether this severity participates in dominant-layer resolution.
    pub fn is_fatal_grade(&self) -> bool {
        matches!(self, Severity::Critical | Severity::Error)
    }
}

/// The five failure layers, totally ordered for dominance: L5 > L4 > L3 > L2 > L1.
///
/// L5 = runtime/environment, L4 = parse/infrastructure, L3 = static contract,
/// L2 = code quality, L1 = advisory.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum FailureLayer {
    L1,
    L2,
    L3,
    L4,
    L5,
}

impl FailureLayer {
    /// Hard cap the dominant layer imposes on the final score.
    pub fn score_cap(&self) -> u32 {
        match self {
            FailureLayer::L5 => 30,
            FailureLayer::L4 => 50,
            FailureLayer::L3 => 70,
            FailureLayer::L2 => 85,
            FailureLayer::L1 => 100,
        }
    }
}

impl std::fmt::Display for FailureLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FailureLayer::L1 => "L1",
            FailureLayer::L2 => "L2",
            FailureLayer::L3 => "L3",
            FailureLayer::L4 => "L4",
            FailureLayer::L5 => "L5",
        };
        write!(f, "{name}")
    }
}

/// Broad classification of what a rule is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleCategory {
    Parse,
    Infrastructure,
    Static,
    Connectivity,
    Runtime,
    Quality,
    Advisory,
}

/// All known failure rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleId {
    /// Required files missing or empty.
    MissingRequiredFiles,
    /// Per-extension structure sanity check failed for one or more files.
    StructureCheckFailed,
    /// Markup does not reference required sibling files.
    FileReferenceMissing,
    /// Script DOM selectors do not bind to markup declarations.
    ScriptBindingUnmatched,
    /// API schema keys are not referenced by other files.
    ApiSchemaUnlinked,
    /// Route values empty or duplicated.
    RouteInconsistent,
    /// Parsing gate rejected the artifact bundle.
    BundleRejected,
    /// Generation call lost the deadline race.
    GenerationTimeout,
    /// Generation collaborator threw mid-pipeline.
    GenerationFailed,
    /// Declared build step exited non-zero.
    BuildFailed,
    /// Uncaught page error or page crash in the browser runtime.
    PageCrash,
    /// Console error captured during page load.
    ConsoleError,
    /// Resource request failed or returned >= 400.
    NetworkFailure,
    /// Child process exited non-zero or timed out.
    ProcessFailed,
    /// Declared manifest disagrees with observed runtime file usage.
    ManifestMismatch,
    /// Runtime evidence of a shape the classifier does not recognize.
    UnrecognizedRuntimeSignal,
    /// Non-file, non-data external access observed during runtime.
    ExternalAccess,
    /// Lint collaborator error finding.
    LintError,
    /// Lint collaborator warning finding.
    LintWarning,
    /// Lint collaborator informational finding.
    LintInfo,
}

/// Immutable definition of one rule.
#[derive(Debug, PartialEq, Eq)]
pub struct RuleDef {
    /// Stable string key (used in reports and logs).
    pub key: &'static str,
    /// Failure layer; immutable fact, never overridden at call sites.
    pub layer: FailureLayer,
    /// Category; immutable fact.
    pub category: RuleCategory,
    /// Severity the rule carries unless a call site downgrades it.
    pub default_severity: Severity,
    /// Message template; call sites append context.
    pub message: &'static str,
}

impl RuleId {
    /// The registry definition for this rule. Total: every variant has one.
    pub fn definition(&self) -> &'static RuleDef {
        match self {
            RuleId::MissingRequiredFiles => &RuleDef {
                key: "missing_required_files",
                layer: FailureLayer::L3,
                category: RuleCategory::Static,
                default_severity: Severity::Error,
                message: "required files are missing or empty",
            },
            RuleId::StructureCheckFailed => &RuleDef {
                key: "structure_check_failed",
                layer: FailureLayer::L3,
                category: RuleCategory::Static,
                default_severity: Severity::Error,
                message: "files failed the per-extension structure check",
            },
            RuleId::FileReferenceMissing => &RuleDef {
                key: "file_reference_missing",
                layer: FailureLayer::L3,
                category: RuleCategory::Connectivity,
                default_severity: Severity::Error,
                message: "markup does not reference required files",
            },
            RuleId::ScriptBindingUnmatched => &RuleDef {
                key: "script_binding_unmatched",
                layer: FailureLayer::L3,
                category: RuleCategory::Connectivity,
                default_severity: Severity::Error,
                message: "script selectors do not bind to markup declarations",
            },
            RuleId::ApiSchemaUnlinked => &RuleDef {
                key: "api_schema_unlinked",
                layer: FailureLayer::L3,
                category: RuleCategory::Connectivity,
                default_severity: Severity::Error,
                message: "API schema keys are not referenced elsewhere",
            },
            RuleId::RouteInconsistent => &RuleDef {
                key: "route_inconsistent",
                layer: FailureLayer::L3,
                category: RuleCategory::Connectivity,
                default_severity: Severity::Error,
                message: "route table is empty, missing, or inconsistent",
            },
            RuleId::BundleRejected => &RuleDef {
                key: "bundle_rejected",
                layer: FailureLayer::L4,
                category: RuleCategory::Parse,
                default_severity: Severity::Critical,
                message: "artifact bundle rejected by the parsing gate",
            },
            RuleId::GenerationTimeout => &RuleDef {
                key: "generation_timeout",
                layer: FailureLayer::L4,
                category: RuleCategory::Infrastructure,
                default_severity: Severity::Critical,
                message: "generation call lost its deadline race",
            },
            RuleId::GenerationFailed => &RuleDef {
                key: "generation_failed",
                layer: FailureLayer::L4,
                category: RuleCategory::Infrastructure,
                default_severity: Severity::Critical,
                message: "generation collaborator failed",
            },
            RuleId::BuildFailed => &RuleDef {
                key: "build_failed",
                layer: FailureLayer::L5,
                category: RuleCategory::Runtime,
                default_severity: Severity::Critical,
                message: "declared build step failed",
            },
            RuleId::PageCrash => &RuleDef {
                key: "page_crash",
                layer: FailureLayer::L5,
                category: RuleCategory::Runtime,
                default_severity: Severity::Critical,
                message: "uncaught page error during browser load",
            },
            RuleId::ConsoleError => &RuleDef {
                key: "console_error",
                layer: FailureLayer::L5,
                category: RuleCategory::Runtime,
                default_severity: Severity::Error,
                message: "console error captured during browser load",
            },
            RuleId::NetworkFailure => &RuleDef {
                key: "network_failure",
                layer: FailureLayer::L5,
                category: RuleCategory::Runtime,
                default_severity: Severity::Error,
                message: "resource request failed during browser load",
            },
            RuleId::ProcessFailed => &RuleDef {
                key: "process_failed",
                layer: FailureLayer::L5,
                category: RuleCategory::Runtime,
                default_severity: Severity::Critical,
                message: "child process exited abnormally",
            },
            RuleId::ManifestMismatch => &RuleDef {
                key: "manifest_mismatch",
                layer: FailureLayer::L5,
                category: RuleCategory::Runtime,
                default_severity: Severity::Warning,
                message: "declared manifest disagrees with observed file usage",
            },
            RuleId::UnrecognizedRuntimeSignal => &RuleDef {
                key: "unrecognized_runtime_signal",
                layer: FailureLayer::L5,
                category: RuleCategory::Runtime,
                default_severity: Severity::Warning,
                message: "runtime evidence of an unrecognized shape",
            },
            RuleId::ExternalAccess => &RuleDef {
                key: "external_access",
                layer: FailureLayer::L1,
                category: RuleCategory::Advisory,
                default_severity: Severity::Info,
                message: "external resource access observed during runtime",
            },
            RuleId::LintError => &RuleDef {
                key: "lint_error",
                layer: FailureLayer::L2,
                category: RuleCategory::Quality,
                default_severity: Severity::Error,
                message: "lint error",
            },
            RuleId::LintWarning => &RuleDef {
                key: "lint_warning",
                layer: FailureLayer::L2,
                category: RuleCategory::Quality,
                default_severity: Severity::Warning,
                message: "lint warning",
            },
            RuleId::LintInfo => &RuleDef {
                key: "lint_info",
                layer: FailureLayer::L1,
                category: RuleCategory::Advisory,
                default_severity: Severity::Info,
                message: "lint note",
            },
        }
    }

    /// Build an annotation for this rule with the registry's default
    /// severity.
    pub fn annotate(&self, message: impl Into<String>) -> FailureAnnotation {
        let def = self.definition();
        FailureAnnotation {
            rule: *self,
            layer: def.layer,
            category: def.category,
            severity: def.default_severity,
            message: message.into(),
            file: None,
            evidence: None,
        }
    }

    /// Build an annotation downgraded to `severity`.
    ///
    /// Downgrade only: an annotation can never be emitted above the
    /// registry's default severity.
    pub fn annotate_downgraded(
        &self,
        severity: Severity,
        message: impl Into<String>,
    ) -> FailureAnnotation {
        let def = self.definition();
        let effective = severity.min(def.default_severity);
        FailureAnnotation {
            rule: *self,
            layer: def.layer,
            category: def.category,
            severity: effective,
            message: message.into(),
            file: None,
            evidence: None,
        }
    }
}

/// Look up a rule definition by its string key.
///
/// # Panics
///
/// Panics on an unknown key. The registry and its call sites are compiled
/// together; an unknown key means they are out of sync, which must abort
/// loudly rather than degrade a task's score.
pub fn lookup(key: &str) -> &'static RuleDef {
    const ALL: [RuleId; 20] = [
        RuleId::MissingRequiredFiles,
        RuleId::StructureCheckFailed,
        RuleId::FileReferenceMissing,
        RuleId::ScriptBindingUnmatched,
        RuleId::ApiSchemaUnlinked,
        RuleId::RouteInconsistent,
        RuleId::BundleRejected,
        RuleId::GenerationTimeout,
        RuleId::GenerationFailed,
        RuleId::BuildFailed,
        RuleId::PageCrash,
        RuleId::ConsoleError,
        RuleId::NetworkFailure,
        RuleId::ProcessFailed,
        RuleId::ManifestMismatch,
        RuleId::UnrecognizedRuntimeSignal,
        RuleId::ExternalAccess,
        RuleId::LintError,
        RuleId::LintWarning,
        RuleId::LintInfo,
    ];
    ALL.iter()
        .map(|id| id.definition())
        .find(|def| def.key == key)
        .unwrap_or_else(|| panic!("unknown failure rule key: {key}"))
}

/// One recorded piece of failure evidence for a specific task run.
///
/// Layer, category, and rule are immutable facts from the registry; the
/// severity may have been downgraded at the emitting call site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureAnnotation {
    /// Registry rule this annotation instantiates.
    pub rule: RuleId,

    /// Failure layer (from the registry).
    pub layer: FailureLayer,

    /// Category (from the registry).
    pub category: RuleCategory,

    /// Effective severity; at most the registry default.
    pub severity: Severity,

    /// Concrete message for this occurrence.
    pub message: String,

    /// Offending file, when one is identifiable.
    pub file: Option<String>,

    /// Raw evidence (log line, URL, selector list).
    pub evidence: Option<String>,
}

impl FailureAnnotation {
    /// Attach an offending file (builder pattern).
    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    /// Attach raw evidence (builder pattern).
    pub fn with_evidence(mut self, evidence: impl Into<String>) -> Self {
        self.evidence = Some(evidence.into());
        self
    }

    /// Whether this annotation participates in dominant-layer resolution.
    pub fn is_fatal_grade(&self) -> bool {
        self.severity.is_fatal_grade()
    }
}
