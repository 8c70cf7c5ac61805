//! atlas-doctor core library
//!
//! Everything the checks need to know about the two services:
//! - `settings`: immutable snapshot of the `JIRA_*` / `CONFLUENCE_*` variables
//! - `auth`: strategy resolution with a fixed api_token > personal_token order
//! - `client` / `probe`: one read-only call per check against a service
//! - `tools`: the tool server's catalog
//! - `telemetry`: tracing setup for the binaries

pub mod auth;
pub mod client;
pub mod error;
pub mod fakes;
pub mod probe;
pub mod settings;
pub mod telemetry;
pub mod tools;

pub use auth::{resolve, AuthStrategy, Credentials, ResolvedAuth};
pub use client::{
    ClientFactory, EntityPage, EntitySummary, HttpClientFactory, ServiceClient, DEFAULT_PAGE_QUERY,
    DEFAULT_TIMEOUT,
};
pub use error::{CatalogError, ClientError, ErrorKind, ProbeError};
pub use probe::{ProbeResult, ServiceProbe, DEFAULT_PROBE_LIMIT, DEFAULT_SEARCH_LIMIT};
pub use settings::{ServiceKind, ServiceSettings, SettingsSnapshot};
pub use telemetry::init_tracing;
pub use tools::{BuiltinToolCatalog, ToolCatalog, ToolDescriptor};
