//! In-memory fakes for the client and catalog traits (testing only)
//!
//! `ScriptedClientFactory` answers every probe from a per-service script and
//! records the listing calls it received; `StaticToolCatalog` returns a fixed
//! tool map or a fixed error.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;

use crate::auth::ResolvedAuth;
use crate::client::{ClientFactory, EntityPage, EntitySummary, ServiceClient};
use crate::error::{CatalogError, ClientError};
use crate::settings::ServiceKind;
use crate::tools::{ToolCatalog, ToolDescriptor};

type Script = Result<Vec<EntitySummary>, ClientError>;

// ---------------------------------------------------------------------------
// ScriptedClientFactory
// ---------------------------------------------------------------------------

/// Factory whose clients replay a scripted response per service.
///
/// A service with no script answers with an empty entity list. Jira clients
/// know the issues added with [`with_issue`](Self::with_issue); Confluence
/// clients answer every search with the pages from
/// [`with_pages`](Self::with_pages).
#[derive(Debug, Default)]
pub struct ScriptedClientFactory {
    scripts: HashMap<ServiceKind, Script>,
    issues: Vec<EntitySummary>,
    pages: Option<Script>,
    calls: Arc<Mutex<Vec<(ServiceKind, usize)>>>,
}

impl ScriptedClientFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entities(mut self, service: ServiceKind, entities: Vec<EntitySummary>) -> Self {
        self.scripts.insert(service, Ok(entities));
        self
    }

    pub fn with_error(mut self, service: ServiceKind, error: ClientError) -> Self {
        self.scripts.insert(service, Err(error));
        self
    }

    pub fn with_issue(mut self, issue: EntitySummary) -> Self {
        self.issues.push(issue);
        self
    }

    pub fn with_pages(mut self, pages: Result<Vec<EntitySummary>, ClientError>) -> Self {
        self.pages = Some(pages);
        self
    }

    /// Every `(service, limit)` listing call made so far, in order.
    pub fn calls(&self) -> Vec<(ServiceKind, usize)> {
        self.calls.lock().unwrap().clone()
    }
}

impl ClientFactory for ScriptedClientFactory {
    fn connect(&self, auth: &ResolvedAuth) -> Result<Box<dyn ServiceClient>, ClientError> {
        let service = auth.service();
        Ok(Box::new(ScriptedClient {
            service,
            script: self.scripts.get(&service).cloned().unwrap_or(Ok(Vec::new())),
            issues: self.issues.clone(),
            pages: self.pages.clone().unwrap_or(Ok(Vec::new())),
            calls: self.calls.clone(),
        }))
    }
}

struct ScriptedClient {
    service: ServiceKind,
    script: Script,
    issues: Vec<EntitySummary>,
    pages: Script,
    calls: Arc<Mutex<Vec<(ServiceKind, usize)>>>,
}

#[async_trait]
impl ServiceClient for ScriptedClient {
    fn service(&self) -> ServiceKind {
        self.service
    }

    async fn list_top_level_entities(&self, limit: usize) -> Result<EntityPage, ClientError> {
        self.calls.lock().unwrap().push((self.service, limit));
        self.script
            .clone()
            .map(|items| EntityPage::truncated(items, limit))
    }

    async fn get_issue(&self, key: &str) -> Result<EntitySummary, ClientError> {
        if self.service != ServiceKind::Jira {
            return Err(ClientError::Unsupported {
                service: self.service,
                operation: "issue lookup",
            });
        }
        self.issues
            .iter()
            .find(|issue| issue.key == key)
            .cloned()
            .ok_or_else(|| ClientError::Status {
                service: self.service,
                status: 404,
                body: format!("Issue {} does not exist", key),
            })
    }

    async fn search_content(
        &self,
        _cql: &str,
        limit: usize,
    ) -> Result<Vec<EntitySummary>, ClientError> {
        if self.service != ServiceKind::Confluence {
            return Err(ClientError::Unsupported {
                service: self.service,
                operation: "content search",
            });
        }
        self.pages
            .clone()
            .map(|pages| pages.into_iter().take(limit).collect())
    }
}

// ---------------------------------------------------------------------------
// StaticToolCatalog
// ---------------------------------------------------------------------------

/// Catalog returning a fixed set of tools, or failing with a fixed message.
#[derive(Debug, Default)]
pub struct StaticToolCatalog {
    tools: BTreeMap<String, ToolDescriptor>,
    failure: Option<String>,
}

impl StaticToolCatalog {
    /// Catalog containing the given tool names with empty schemas.
    pub fn with_names(names: &[&str]) -> Self {
        let tools = names
            .iter()
            .map(|name| {
                (
                    name.to_string(),
                    ToolDescriptor {
                        description: format!("{} tool", name),
                        input_schema: json!({"type": "object"}),
                    },
                )
            })
            .collect();
        Self {
            tools,
            failure: None,
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            tools: BTreeMap::new(),
            failure: Some(message.to_string()),
        }
    }
}

#[async_trait]
impl ToolCatalog for StaticToolCatalog {
    async fn list_tools(&self) -> Result<BTreeMap<String, ToolDescriptor>, CatalogError> {
        match &self.failure {
            Some(message) => Err(CatalogError::Unavailable(message.clone())),
            None => Ok(self.tools.clone()),
        }
    }
}
