//! Structured evidence returned by the sandbox runner.

use serde::{Deserialize, Serialize};

/// What kind of resource a browser request was for, inferred from the
/// request target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Document,
    Script,
    Stylesheet,
    Fetch,
    Xhr,
    Image,
    Font,
    Other,
}

impl ResourceKind {
    /// Infer the resource kind from a URL or path.
    pub fn from_target(target: &str) -> Self {
        let path = target.split(['?', '#']).next().unwrap_or(target);
        let lower = path.to_ascii_lowercase();
        if lower.ends_with(".js") || lower.ends_with(".mjs") {
            ResourceKind::Script
        } else if lower.ends_with(".html") || lower.ends_with(".htm") {
            ResourceKind::Document
        } else if lower.ends_with(".css") {
            ResourceKind::Stylesheet
        } else if lower.ends_with(".png")
            || lower.ends_with(".jpg")
            || lower.ends_with(".jpeg")
            || lower.ends_with(".gif")
            || lower.ends_with(".svg")
            || lower.ends_with(".ico")
        {
            ResourceKind::Image
        } else if lower.ends_with(".woff") || lower.ends_with(".woff2") || lower.ends_with(".ttf")
        {
            ResourceKind::Font
        } else if lower.contains("/api/") {
            ResourceKind::Fetch
        } else {
            ResourceKind::Other
        }
    }

    /// Whether a failed load of this resource is fatal to the page
    /// (code/markup) rather than cosmetic.
    pub fn is_code_or_markup(&self) -> bool {
        matches!(self, ResourceKind::Script | ResourceKind::Document)
    }
}

/// Shape of one captured browser error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BrowserErrorKind {
    /// Uncaught page error or renderer crash.
    PageError,
    /// `console.error` emitted by page script.
    ConsoleError,
    /// A resource request failed outright.
    RequestFailed { resource: ResourceKind },
    /// A resource request completed with HTTP status >= 400.
    HttpFailure { status: u16, resource: ResourceKind },
    /// Anything the capture layer could not classify.
    Other,
}

/// One captured browser error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowserError {
    pub kind: BrowserErrorKind,
    pub message: String,
    pub url: Option<String>,
}

impl BrowserError {
    pub fn page_error(message: impl Into<String>) -> Self {
        Self {
            kind: BrowserErrorKind::PageError,
            message: message.into(),
            url: None,
        }
    }

    pub fn console_error(message: impl Into<String>) -> Self {
        Self {
            kind: BrowserErrorKind::ConsoleError,
            message: message.into(),
            url: None,
        }
    }

    pub fn request_failed(message: impl Into<String>, url: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            kind: BrowserErrorKind::RequestFailed {
                resource: ResourceKind::from_target(&url),
            },
            message: message.into(),
            url: Some(url),
        }
    }
}

/// One entry of the external-access audit trail: a request the page made
/// for a script/fetch/xhr style resource, and where it went.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalAccess {
    /// Request target (URL or path).
    pub target: String,

    /// Inferred resource kind.
    pub resource: ResourceKind,
}

impl ExternalAccess {
    pub fn new(target: impl Into<String>) -> Self {
        let target = target.into();
        let resource = ResourceKind::from_target(&target);
        Self { target, resource }
    }
}

/// Outcome of the child-process runtime strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessOutcome {
    /// Exit code (-1 when unavailable or timed out).
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    /// Whether the bounded timeout fired before the process exited.
    pub timed_out: bool,
}

impl ProcessOutcome {
    pub fn passed(&self) -> bool {
        self.exit_code == 0 && !self.timed_out
    }
}

/// The single terminal result every sandbox run resolves to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SandboxRunResult {
    /// Overall success flag.
    pub success: bool,

    /// Log lines: runner progress, browser console logs, process output
    /// summaries.
    pub logs: Vec<String>,

    /// Whether the declared build step failed (non-zero exit or timeout).
    pub build_failed: bool,

    /// Browser errors captured during page load.
    pub browser_errors: Vec<BrowserError>,

    /// External-access audit trail.
    pub external_accesses: Vec<ExternalAccess>,

    /// Child-process outcome, when the process strategy ran.
    pub process: Option<ProcessOutcome>,
}

impl SandboxRunResult {
    /// A failure result carrying one explanatory log line.
    pub fn failed(log: impl Into<String>) -> Self {
        Self {
            success: false,
            logs: vec![log.into()],
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_kind_inference() {
        assert_eq!(ResourceKind::from_target("app.js"), ResourceKind::Script);
        assert_eq!(
            ResourceKind::from_target("file:///tmp/x/index.html"),
            ResourceKind::Document
        );
        assert_eq!(
            ResourceKind::from_target("https://cdn.example.com/style.css?v=2"),
            ResourceKind::Stylesheet
        );
        assert_eq!(
            ResourceKind::from_target("https://example.com/api/users"),
            ResourceKind::Fetch
        );
        assert_eq!(ResourceKind::from_target("logo.png"), ResourceKind::Image);
        assert_eq!(ResourceKind::from_target("unknown.bin"), ResourceKind::Other);
    }

    #[test]
    fn test_code_or_markup_classification() {
        assert!(ResourceKind::Script.is_code_or_markup());
        assert!(ResourceKind::Document.is_code_or_markup());
        assert!(!ResourceKind::Stylesheet.is_code_or_markup());
        assert!(!ResourceKind::Image.is_code_or_markup());
    }

    #[test]
    fn test_request_failed_infers_resource() {
        let err = BrowserError::request_failed("net::ERR_FILE_NOT_FOUND", "file:///x/app.js");
        assert_eq!(
            err.kind,
            BrowserErrorKind::RequestFailed {
                resource: ResourceKind::Script
            }
        );
    }

    #[test]
    fn test_process_outcome_passed() {
        let ok = ProcessOutcome {
            exit_code: 0,
            stdout: String::new(),
            stderr: String::new(),
            timed_out: false,
        };
        assert!(ok.passed());

        let timed_out = ProcessOutcome {
            exit_code: -1,
            stdout: String::new(),
            stderr: String::new(),
            timed_out: true,
        };
        assert!(!timed_out.passed());
    }

    #[test]
    fn test_result_serde_roundtrip() {
        let result = SandboxRunResult {
            success: false,
            logs: vec!["loaded".to_string()],
            build_failed: false,
            browser_errors: vec![BrowserError::console_error("boom")],
            external_accesses: vec![ExternalAccess::new("https://cdn.example.com/lib.js")],
            process: None,
        };
        let json = serde_json::to_string(&result).unwrap();
        let back: SandboxRunResult = serde_json::from_str(&json).unwrap();
        assert_eq!(result, back);
    }
}
