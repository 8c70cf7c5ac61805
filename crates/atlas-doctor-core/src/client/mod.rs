//! Service clients used by the probe.
//!
//! A [`ClientFactory`] builds a [`ServiceClient`] from a [`ResolvedAuth`].
//! The HTTP implementation talks to the Jira and Confluence REST APIs; tests
//! use the scripted fakes in [`crate::fakes`].

mod confluence;
mod http;
mod jira;

pub use confluence::{ConfluenceClient, DEFAULT_PAGE_QUERY};
pub use jira::JiraClient;

use crate::auth::ResolvedAuth;
use crate::error::ClientError;
use crate::settings::ServiceKind;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default request timeout for probe calls.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// A service entity: project, space, issue or page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySummary {
    /// Short identifier, e.g. a project key, issue key or page id.
    pub key: String,

    /// Display name, issue summary or page title.
    pub name: String,
}

impl EntitySummary {
    pub fn new(key: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
        }
    }
}

/// One listing call: how many entities the service reported, and the first
/// `limit` of them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityPage {
    pub total: usize,
    pub items: Vec<EntitySummary>,
}

impl EntityPage {
    /// Page built from a full listing, keeping at most `limit` items.
    pub fn truncated(all: Vec<EntitySummary>, limit: usize) -> Self {
        let total = all.len();
        let mut items = all;
        items.truncate(limit);
        Self { total, items }
    }
}

/// Read-only access to one service.
#[async_trait]
pub trait ServiceClient: Send + Sync {
    fn service(&self) -> ServiceKind;

    /// List top-level entities (projects, spaces), keeping at most `limit`.
    async fn list_top_level_entities(&self, limit: usize) -> Result<EntityPage, ClientError>;

    /// Fetch one issue by key. Only Jira supports this.
    async fn get_issue(&self, _key: &str) -> Result<EntitySummary, ClientError> {
        Err(ClientError::Unsupported {
            service: self.service(),
            operation: "issue lookup",
        })
    }

    /// Run a CQL content search. Only Confluence supports this.
    async fn search_content(
        &self,
        _cql: &str,
        _limit: usize,
    ) -> Result<Vec<EntitySummary>, ClientError> {
        Err(ClientError::Unsupported {
            service: self.service(),
            operation: "content search",
        })
    }
}

/// Builds clients from resolved configurations.
pub trait ClientFactory: Send + Sync {
    fn connect(&self, auth: &ResolvedAuth) -> Result<Box<dyn ServiceClient>, ClientError>;
}

/// Factory producing reqwest-backed clients that share one connection pool.
#[derive(Debug, Clone)]
pub struct HttpClientFactory {
    http: reqwest::Client,
}

impl HttpClientFactory {
    /// Build the shared HTTP stack.
    pub fn new(timeout: Duration) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("atlas-doctor/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::InvalidConfig(format!("HTTP client: {}", e)))?;

        Ok(Self { http })
    }
}

impl ClientFactory for HttpClientFactory {
    fn connect(&self, auth: &ResolvedAuth) -> Result<Box<dyn ServiceClient>, ClientError> {
        let endpoint = http::RestEndpoint::from_auth(self.http.clone(), auth)?;

        Ok(match auth.service() {
            ServiceKind::Jira => Box::new(JiraClient::new(endpoint)),
            ServiceKind::Confluence => Box::new(ConfluenceClient::new(endpoint)),
        })
    }
}
