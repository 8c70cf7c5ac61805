//! Confluence REST client (space listing and CQL content search).

use super::http::{RawEntity, RestEndpoint};
use super::{EntityPage, EntitySummary, ServiceClient};
use crate::error::ClientError;
use crate::settings::ServiceKind;
use async_trait::async_trait;
use serde::Deserialize;

/// CQL used by the page search check.
pub const DEFAULT_PAGE_QUERY: &str = "type = page";

/// Lists spaces through `GET /rest/api/space?limit=N` and searches content
/// through `GET /rest/api/content/search?cql=...`.
#[derive(Debug, Clone)]
pub struct ConfluenceClient {
    endpoint: RestEndpoint,
}

impl ConfluenceClient {
    pub(crate) fn new(endpoint: RestEndpoint) -> Self {
        Self { endpoint }
    }
}

#[derive(Debug, Deserialize)]
struct ResultPage<T> {
    #[serde(default = "Vec::new")]
    results: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct RawContent {
    id: String,
    #[serde(default)]
    title: Option<String>,
}

#[async_trait]
impl ServiceClient for ConfluenceClient {
    fn service(&self) -> ServiceKind {
        self.endpoint.service()
    }

    async fn list_top_level_entities(&self, limit: usize) -> Result<EntityPage, ClientError> {
        let page: ResultPage<RawEntity> = self
            .endpoint
            .get_json("rest/api/space", &[("limit", limit.to_string())])
            .await?;

        Ok(EntityPage::truncated(
            page.results.into_iter().map(EntitySummary::from).collect(),
            limit,
        ))
    }

    async fn search_content(
        &self,
        cql: &str,
        limit: usize,
    ) -> Result<Vec<EntitySummary>, ClientError> {
        let page: ResultPage<RawContent> = self
            .endpoint
            .get_json(
                "rest/api/content/search",
                &[("cql", cql.to_string()), ("limit", limit.to_string())],
            )
            .await?;

        Ok(page
            .results
            .into_iter()
            .take(limit)
            .map(|content| EntitySummary {
                key: content.id,
                name: content.title.unwrap_or_default(),
            })
            .collect())
    }
}
