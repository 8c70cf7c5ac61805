//! Error types for atlas-doctor-installer

use atlas_doctor_core::ErrorKind;
use thiserror::Error;

/// Errors raised by an [`InstallTool`](crate::tool::InstallTool).
#[derive(Error, Debug)]
pub enum InstallError {
    /// Tool executable is missing or its version query failed
    #[error("{tool} is not available: {reason}")]
    Unavailable { tool: String, reason: String },

    /// Tool ran and exited unsuccessfully
    #[error("{command} exited with {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },

    /// The tool does not support the requested operation
    #[error("{tool} does not support {operation}")]
    Unsupported {
        tool: String,
        operation: &'static str,
    },

    /// IO error while spawning or talking to the tool
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl InstallError {
    /// Map into the user-facing taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            InstallError::Unavailable { .. } => ErrorKind::InstallUnavailable(self.to_string()),
            _ => ErrorKind::InstallFailed(self.to_string()),
        }
    }
}
