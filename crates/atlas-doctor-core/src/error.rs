//! Error taxonomy for atlas-doctor.

use crate::settings::ServiceKind;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// User-facing failure categories. Every reported failure maps to one of
/// these.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum ErrorKind {
    /// A required component could not be loaded.
    #[error("load error: {0}")]
    Load(String),

    /// The service has a URL but no usable credentials.
    #[error("authentication not configured: {0}")]
    AuthNotConfigured(String),

    /// Network, transport or service-side failure.
    #[error("connectivity error: {0}")]
    Connectivity(String),

    /// The service answered but refused the credentials.
    #[error("authentication rejected: {0}")]
    AuthRejected(String),

    /// The preferred installer is not available.
    #[error("installer unavailable: {0}")]
    InstallUnavailable(String),

    /// A package failed to install under the fallback installer.
    #[error("install failed: {0}")]
    InstallFailed(String),
}

/// Errors raised by a [`ServiceClient`](crate::client::ServiceClient).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// The request never produced an HTTP response.
    #[error("HTTP request failed: {0}")]
    Transport(String),

    /// HTTP 401 or 403.
    #[error("{service} rejected the credentials (HTTP {status})")]
    Unauthorized { service: ServiceKind, status: u16 },

    /// Any other non-success status.
    #[error("{service} returned HTTP {status}: {body}")]
    Status {
        service: ServiceKind,
        status: u16,
        body: String,
    },

    /// The response body was not the expected shape.
    #[error("unexpected response payload: {0}")]
    Decode(String),

    /// The resolved configuration cannot produce a client.
    #[error("invalid client configuration: {0}")]
    InvalidConfig(String),

    /// The request itself is malformed, e.g. an unusable issue key.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The service has no such operation.
    #[error("{service} does not support {operation}")]
    Unsupported {
        service: ServiceKind,
        operation: &'static str,
    },
}

impl ClientError {
    /// Category reported to the user.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::Unauthorized { .. } => ErrorKind::AuthRejected(self.to_string()),
            _ => ErrorKind::Connectivity(self.to_string()),
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ClientError::Decode(err.to_string())
        } else {
            ClientError::Transport(err.to_string())
        }
    }
}

/// Misuse of the probe, distinct from a failed probe.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    #[error("{0} is not configured; probe requires a resolved authentication strategy")]
    NotConfigured(ServiceKind),
}

/// Errors raised while loading or listing the tool catalog.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("tool manifest is invalid: {0}")]
    Manifest(#[from] serde_json::Error),

    #[error("duplicate tool name in manifest: {0}")]
    DuplicateTool(String),

    #[error("tool catalog unavailable: {0}")]
    Unavailable(String),
}

impl CatalogError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Load(self.to_string())
    }
}
