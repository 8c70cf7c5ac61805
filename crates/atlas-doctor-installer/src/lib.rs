//! Dependency installation for atlas-doctor.
//!
//! A preferred installer is asked for its version and then to sync the
//! project in one step. When it is missing or the sync fails, each required
//! package is installed separately with a fallback installer and every
//! per-package result is kept.

pub mod chain;
pub mod error;
pub mod fakes;
pub mod tool;

pub use chain::{
    ensure_installed, ensure_installed_with, manifest_present, InstallObserver, InstallOutcome,
    InstallVerdict, NoopInstallObserver, ToolUsed,
};
pub use error::InstallError;
pub use tool::{CommandTool, InstallTool, DEFAULT_PACKAGES, DEFAULT_PREFERRED, DEFAULT_PYTHON};

/// Result type for installer tools
pub type Result<T> = std::result::Result<T, InstallError>;
