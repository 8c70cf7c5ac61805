//! Service probe: one minimal read-only call per check.
//!
//! The probe is a diagnostic, not a resilient client. Each check sends
//! exactly one request, never retries, and folds every client failure into
//! a [`ProbeResult`] carrying an [`ErrorKind`].

use crate::auth::ResolvedAuth;
use crate::client::{ClientFactory, EntitySummary};
use crate::error::{ErrorKind, ProbeError};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

/// Number of entities requested by default.
pub const DEFAULT_PROBE_LIMIT: usize = 50;

/// Number of pages requested by a content search.
pub const DEFAULT_SEARCH_LIMIT: usize = 5;

/// Outcome of probing one service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeResult {
    pub reachable: bool,

    /// Entities the service reported, which may exceed what was returned.
    pub item_count: usize,
    pub sample: Option<EntitySummary>,
    pub error: Option<ErrorKind>,
}

impl ProbeResult {
    fn reached(item_count: usize, items: Vec<EntitySummary>) -> Self {
        Self {
            reachable: true,
            item_count,
            sample: items.into_iter().next(),
            error: None,
        }
    }

    fn failed(kind: ErrorKind) -> Self {
        Self {
            reachable: false,
            item_count: 0,
            sample: None,
            error: Some(kind),
        }
    }
}

enum Request<'a> {
    List(usize),
    Issue(&'a str),
    Search(&'a str, usize),
}

/// Probes services through clients built by a [`ClientFactory`].
#[derive(Clone)]
pub struct ServiceProbe {
    factory: Arc<dyn ClientFactory>,
    limit: usize,
}

impl ServiceProbe {
    pub fn new(factory: Arc<dyn ClientFactory>) -> Self {
        Self {
            factory,
            limit: DEFAULT_PROBE_LIMIT,
        }
    }

    /// Override the number of entities requested.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Probe one service by listing its top-level entities.
    ///
    /// Returns `Err` only when called for an unconfigured service; network
    /// and authentication failures come back as an unreachable
    /// [`ProbeResult`].
    pub async fn probe(&self, auth: &ResolvedAuth) -> Result<ProbeResult, ProbeError> {
        self.send(auth, Request::List(self.limit)).await
    }

    /// Fetch one issue. The sample is the issue itself.
    pub async fn lookup_issue(
        &self,
        auth: &ResolvedAuth,
        key: &str,
    ) -> Result<ProbeResult, ProbeError> {
        self.send(auth, Request::Issue(key)).await
    }

    /// Run one content search; the sample is the first hit.
    pub async fn search_pages(
        &self,
        auth: &ResolvedAuth,
        cql: &str,
    ) -> Result<ProbeResult, ProbeError> {
        self.send(auth, Request::Search(cql, DEFAULT_SEARCH_LIMIT))
            .await
    }

    async fn send(
        &self,
        auth: &ResolvedAuth,
        request: Request<'_>,
    ) -> Result<ProbeResult, ProbeError> {
        let service = auth.service();
        if !auth.is_configured() {
            return Err(ProbeError::NotConfigured(service));
        }

        let client = match self.factory.connect(auth) {
            Ok(client) => client,
            Err(e) => {
                warn!(service = %service, error = %e, "Could not build client");
                return Ok(ProbeResult::failed(e.kind()));
            }
        };

        let answer = match request {
            Request::List(limit) => {
                debug!(service = %service, limit, "Probing service");
                client
                    .list_top_level_entities(limit)
                    .await
                    .map(|page| (page.total, page.items))
            }
            Request::Issue(key) => {
                debug!(service = %service, key, "Looking up issue");
                client.get_issue(key).await.map(|issue| (1, vec![issue]))
            }
            Request::Search(cql, limit) => {
                debug!(service = %service, cql, limit, "Searching content");
                client
                    .search_content(cql, limit)
                    .await
                    .map(|pages| (pages.len(), pages))
            }
        };

        match answer {
            Ok((count, items)) => Ok(ProbeResult::reached(count, items)),
            Err(e) => {
                warn!(service = %service, error = %e, "Probe failed");
                Ok(ProbeResult::failed(e.kind()))
            }
        }
    }
}
