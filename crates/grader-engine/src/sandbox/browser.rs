//! Headless-browser runtime strategy.
//!
//! The engine talks to the browser through the [`BrowserSession`] trait so
//! tests can script page evidence without a real browser. The production
//! implementation, [`HeadlessChromium`], spawns a headless Chromium
//! subprocess against a `file://` entry URL with console logging routed to
//! stderr, and classifies the log stream into errors, logs, and an
//! external-access audit trail.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use tokio::process::Command;
use tracing::debug;

use super::result::{BrowserError, BrowserErrorKind, ExternalAccess, ResourceKind};
use super::SandboxError;

/// Everything a page load produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageEvidence {
    /// Browser errors: console errors, uncaught page errors, failed
    /// requests, HTTP responses >= 400.
    pub errors: Vec<BrowserError>,

    /// Console warning/info/log lines.
    pub logs: Vec<String>,

    /// Script/fetch/xhr request resolution trail.
    pub accesses: Vec<ExternalAccess>,
}

/// One isolated page-load session.
///
/// Listeners are conceptually attached before navigation: the
/// implementation must not lose errors raised during initial load.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    /// Load the entry URL and return captured evidence.
    ///
    /// `Err` means the browser itself could not run (spawn failure,
    /// navigation timeout); page-level problems belong in the evidence.
    async fn load(&self, entry_url: &str) -> Result<PageEvidence, SandboxError>;
}

/// Headless Chromium subprocess driver.
#[derive(Debug, Clone)]
pub struct HeadlessChromium {
    /// Browser binary.
    pub binary: PathBuf,

    /// Hard navigation timeout.
    pub navigation_timeout: Duration,

    /// Virtual time budget handed to the renderer, which also bounds how
    /// long the page gets to reach network idle.
    pub virtual_time_budget: Duration,

    /// Fixed settle delay after navigation completes.
    pub settle_delay: Duration,
}

impl Default for HeadlessChromium {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("chromium"),
            navigation_timeout: Duration::from_secs(10),
            virtual_time_budget: Duration::from_secs(5),
            settle_delay: Duration::from_millis(200),
        }
    }
}

#[async_trait]
impl BrowserSession for HeadlessChromium {
    async fn load(&self, entry_url: &str) -> Result<PageEvidence, SandboxError> {
        let child = Command::new(&self.binary)
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--no-first-run")
            .arg("--disable-extensions")
            .arg("--enable-logging=stderr")
            .arg("--v=1")
            .arg(format!(
                "--virtual-time-budget={}",
                self.virtual_time_budget.as_millis()
            ))
            .arg("--dump-dom")
            .arg(entry_url)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                SandboxError::Spawn(format!("browser {}: {e}", self.binary.display()))
            })?;

        let output = tokio::time::timeout(self.navigation_timeout, child.wait_with_output())
            .await
            .map_err(|_| SandboxError::Timeout(self.navigation_timeout.as_millis() as u64))?
            .map_err(|e| SandboxError::Wait(e.to_string()))?;

        tokio::time::sleep(self.settle_delay).await;

        let stderr = String::from_utf8_lossy(&output.stderr);
        let evidence = parse_chromium_log(stderr.lines());
        debug!(
            errors = evidence.errors.len(),
            logs = evidence.logs.len(),
            accesses = evidence.accesses.len(),
            "browser session settled"
        );
        Ok(evidence)
    }
}

/// Classify a Chromium stderr log stream into page evidence.
///
/// Recognized shapes:
/// - `:ERROR:CONSOLE(n)] "message", source: url` — console errors;
///   `Uncaught` messages are page errors
/// - `:WARNING:CONSOLE(` / `:INFO:CONSOLE(` — console logs
/// - `Failed to load resource` / `net::ERR_*` — failed requests
/// - `the server responded with a status of NNN` — HTTP failures
/// - any quoted URL — folded into the external-access audit trail
pub fn parse_chromium_log<'a>(lines: impl Iterator<Item = &'a str>) -> PageEvidence {
    let console_msg =
        Regex::new(r#"CONSOLE\(\d+\)\]\s*"([^"]*)"(?:,\s*source:\s*(\S+))?"#).unwrap();
    let url_pattern = Regex::new(r#"(?:https?|file|data|ws|wss)://[^\s"')\]]+"#).unwrap();
    let status_pattern = Regex::new(r"status of (\d{3})").unwrap();

    let mut evidence = PageEvidence::default();

    for line in lines {
        for url in url_pattern.find_iter(line) {
            let target = url.as_str().to_string();
            if !evidence.accesses.iter().any(|a| a.target == target) {
                evidence.accesses.push(ExternalAccess::new(target));
            }
        }

        let message = console_msg
            .captures(line)
            .map(|cap| cap[1].to_string())
            .unwrap_or_default();
        let source_url = console_msg
            .captures(line)
            .and_then(|cap| cap.get(2).map(|m| m.as_str().to_string()));

        if line.contains(":ERROR:CONSOLE(") {
            if message.contains("Failed to load resource") || message.contains("net::ERR_") {
                let target = source_url.clone().unwrap_or_default();
                if let Some(cap) = status_pattern.captures(&message) {
                    let status: u16 = cap[1].parse().unwrap_or(0);
                    evidence.errors.push(BrowserError {
                        kind: BrowserErrorKind::HttpFailure {
                            status,
                            resource: ResourceKind::from_target(&target),
                        },
                        message,
                        url: source_url,
                    });
                } else {
                    evidence.errors.push(BrowserError {
                        kind: BrowserErrorKind::RequestFailed {
                            resource: ResourceKind::from_target(&target),
                        },
                        message,
                        url: source_url,
                    });
                }
            } else if message.starts_with("Uncaught") {
                evidence.errors.push(BrowserError {
                    kind: BrowserErrorKind::PageError,
                    message,
                    url: source_url,
                });
            } else {
                evidence.errors.push(BrowserError {
                    kind: BrowserErrorKind::ConsoleError,
                    message,
                    url: source_url,
                });
            }
        } else if line.contains(":WARNING:CONSOLE(") || line.contains(":INFO:CONSOLE(") {
            evidence.logs.push(message);
        }
    }

    evidence
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_console_error() {
        let log = r#"[1:1:0101/000000.000000:ERROR:CONSOLE(12)] "TypeError: x is undefined", source: file:///tmp/s/main.js (12)"#;
        let evidence = parse_chromium_log(log.lines());
        assert_eq!(evidence.errors.len(), 1);
        assert_eq!(evidence.errors[0].kind, BrowserErrorKind::ConsoleError);
        assert!(evidence.errors[0].message.contains("TypeError"));
    }

    #[test]
    fn test_parse_uncaught_as_page_error() {
        let log = r#"[1:1:0101/000000.000000:ERROR:CONSOLE(3)] "Uncaught ReferenceError: boom is not defined", source: file:///tmp/s/index.html (3)"#;
        let evidence = parse_chromium_log(log.lines());
        assert_eq!(evidence.errors[0].kind, BrowserErrorKind::PageError);
    }

    #[test]
    fn test_parse_failed_resource_load() {
        let log = r#"[1:1:0101/000000.000000:ERROR:CONSOLE(0)] "Failed to load resource: net::ERR_FILE_NOT_FOUND", source: file:///tmp/s/app.js (0)"#;
        let evidence = parse_chromium_log(log.lines());
        assert_eq!(
            evidence.errors[0].kind,
            BrowserErrorKind::RequestFailed {
                resource: ResourceKind::Script
            }
        );
    }

    #[test]
    fn test_parse_http_failure_status() {
        let log = r#"[1:1:0101/000000.000000:ERROR:CONSOLE(0)] "Failed to load resource: the server responded with a status of 404 (Not Found)", source: https://cdn.example.com/lib.js (0)"#;
        let evidence = parse_chromium_log(log.lines());
        match &evidence.errors[0].kind {
            BrowserErrorKind::HttpFailure { status, resource } => {
                assert_eq!(*status, 404);
                assert_eq!(*resource, ResourceKind::Script);
            }
            other => panic!("expected HttpFailure, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_warnings_become_logs() {
        let log = r#"[1:1:0101/000000.000000:INFO:CONSOLE(5)] "app booted", source: file:///tmp/s/main.js (5)"#;
        let evidence = parse_chromium_log(log.lines());
        assert!(evidence.errors.is_empty());
        assert_eq!(evidence.logs, vec!["app booted"]);
    }

    #[test]
    fn test_parse_audit_trail_deduplicates() {
        let log = "\
[1:1:0101/000000.000000:INFO:CONSOLE(1)] \"a\", source: file:///tmp/s/main.js (1)
[1:1:0101/000000.000000:INFO:CONSOLE(2)] \"b\", source: file:///tmp/s/main.js (2)
[1:1:0101/000000.000000:VERBOSE1:network] fetch https://api.example.com/api/users";
        let evidence = parse_chromium_log(log.lines());
        let targets: Vec<&str> = evidence.accesses.iter().map(|a| a.target.as_str()).collect();
        assert_eq!(
            targets,
            vec![
                "file:///tmp/s/main.js",
                "https://api.example.com/api/users"
            ]
        );
        assert_eq!(evidence.accesses[1].resource, ResourceKind::Fetch);
    }

    #[test]
    fn test_clean_load_has_no_errors() {
        let log = "[1:1:0101/000000.000000:VERBOSE1:frame] committed file:///tmp/s/index.html";
        let evidence = parse_chromium_log(log.lines());
        assert!(evidence.errors.is_empty());
    }
}
