//! Preferred-then-fallback installation.

use crate::tool::InstallTool;
use atlas_doctor_core::ErrorKind;
use serde::Serialize;
use std::path::Path;
use tracing::{info, warn};

/// Which tool finished the job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolUsed {
    Preferred,
    Fallback,
}

/// Result of installing one package with the fallback tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallOutcome {
    pub package_name: String,
    pub succeeded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_text: Option<String>,
}

impl InstallOutcome {
    fn ok(package: &str) -> Self {
        Self {
            package_name: package.to_string(),
            succeeded: true,
            error_text: None,
        }
    }

    fn failed(package: &str, error: String) -> Self {
        Self {
            package_name: package.to_string(),
            succeeded: false,
            error_text: Some(error),
        }
    }
}

/// Result of a whole installation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallVerdict {
    pub tool_used: ToolUsed,

    /// Version string of the preferred tool, when it answered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_version: Option<String>,

    /// Why the preferred tool was not used, when it was not.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_error: Option<ErrorKind>,

    /// One entry per package, in order. Empty when the preferred tool synced.
    pub outcomes: Vec<InstallOutcome>,
}

impl InstallVerdict {
    /// Derived from the outcomes on every call.
    pub fn succeeded(&self) -> bool {
        self.outcomes.iter().all(|o| o.succeeded)
    }

    /// Packages that failed to install, in order.
    pub fn failed_packages(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|o| !o.succeeded)
            .map(|o| o.package_name.as_str())
            .collect()
    }
}

/// Receives progress during [`ensure_installed_with`].
pub trait InstallObserver: Send + Sync {
    fn on_preferred_available(&self, _tool: &str, _version: &str) {}

    /// The preferred tool was not usable; the fallback runs next.
    fn on_preferred_skipped(&self, _tool: &str, _error: &ErrorKind) {}

    fn on_package_start(&self, _package: &str) {}

    fn on_package_result(&self, _outcome: &InstallOutcome) {}
}

/// Observer that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopInstallObserver;

impl InstallObserver for NoopInstallObserver {}

/// Install with `preferred`, falling back to `fallback` per package.
pub async fn ensure_installed(
    preferred: &dyn InstallTool,
    fallback: &dyn InstallTool,
    packages: &[String],
) -> InstallVerdict {
    ensure_installed_with(preferred, fallback, packages, &NoopInstallObserver).await
}

/// [`ensure_installed`] reporting progress to `observer`.
///
/// The preferred tool is asked for its version and, if it answers, for one
/// bulk sync. If either step fails every package is handed to the fallback
/// tool exactly once, in order, regardless of earlier failures.
pub async fn ensure_installed_with(
    preferred: &dyn InstallTool,
    fallback: &dyn InstallTool,
    packages: &[String],
    observer: &dyn InstallObserver,
) -> InstallVerdict {
    let mut preferred_version = None;

    let preferred_error = match preferred.version().await {
        Ok(version) => {
            info!(tool = preferred.name(), version = %version, "Preferred installer available");
            observer.on_preferred_available(preferred.name(), &version);
            preferred_version = Some(version);

            match preferred.sync().await {
                Ok(()) => {
                    info!(tool = preferred.name(), "Dependencies synced");
                    return InstallVerdict {
                        tool_used: ToolUsed::Preferred,
                        preferred_version,
                        preferred_error: None,
                        outcomes: Vec::new(),
                    };
                }
                Err(e) => e.kind(),
            }
        }
        Err(e) => e.kind(),
    };

    warn!(
        tool = preferred.name(),
        fallback = fallback.name(),
        error = %preferred_error,
        "Preferred installer not usable, falling back"
    );
    observer.on_preferred_skipped(preferred.name(), &preferred_error);

    let mut outcomes = Vec::with_capacity(packages.len());
    for package in packages {
        observer.on_package_start(package);

        let outcome = match fallback.install(package).await {
            Ok(()) => {
                info!(package = %package, "Package installed");
                InstallOutcome::ok(package)
            }
            Err(e) => {
                warn!(package = %package, error = %e, "Package failed to install");
                InstallOutcome::failed(package, e.kind().to_string())
            }
        };

        observer.on_package_result(&outcome);
        outcomes.push(outcome);
    }

    InstallVerdict {
        tool_used: ToolUsed::Fallback,
        preferred_version,
        preferred_error: Some(preferred_error),
        outcomes,
    }
}

/// Whether the project manifest exists. Logs a warning when it does not.
pub fn manifest_present(path: &Path) -> bool {
    let present = path.is_file();
    if !present {
        warn!(manifest = %path.display(), "Project manifest not found");
    }
    present
}
