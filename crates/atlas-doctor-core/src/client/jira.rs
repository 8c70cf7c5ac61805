//! Jira REST client (project listing and single-issue lookup).

use super::http::{RawEntity, RestEndpoint};
use super::{EntityPage, EntitySummary, ServiceClient};
use crate::error::ClientError;
use crate::settings::ServiceKind;
use async_trait::async_trait;
use serde::Deserialize;

/// Lists projects through `GET /rest/api/2/project` and fetches issues
/// through `GET /rest/api/2/issue/{key}`.
#[derive(Debug, Clone)]
pub struct JiraClient {
    endpoint: RestEndpoint,
}

impl JiraClient {
    pub(crate) fn new(endpoint: RestEndpoint) -> Self {
        Self { endpoint }
    }
}

#[derive(Debug, Deserialize)]
struct RawIssue {
    key: String,
    #[serde(default)]
    fields: IssueFields,
}

#[derive(Debug, Default, Deserialize)]
struct IssueFields {
    #[serde(default)]
    summary: Option<String>,
}

/// Issue keys look like `OPS-1`; anything else would change the request path.
fn valid_issue_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[async_trait]
impl ServiceClient for JiraClient {
    fn service(&self) -> ServiceKind {
        self.endpoint.service()
    }

    async fn list_top_level_entities(&self, limit: usize) -> Result<EntityPage, ClientError> {
        // No paging parameters: the endpoint returns every visible project.
        let projects: Vec<RawEntity> = self.endpoint.get_json("rest/api/2/project", &[]).await?;

        Ok(EntityPage::truncated(
            projects.into_iter().map(EntitySummary::from).collect(),
            limit,
        ))
    }

    async fn get_issue(&self, key: &str) -> Result<EntitySummary, ClientError> {
        if !valid_issue_key(key) {
            return Err(ClientError::InvalidRequest(format!(
                "invalid issue key '{}'",
                key
            )));
        }

        let issue: RawIssue = self
            .endpoint
            .get_json(
                &format!("rest/api/2/issue/{}", key),
                &[("fields", "summary".to_string())],
            )
            .await?;

        Ok(EntitySummary {
            key: issue.key,
            name: issue.fields.summary.unwrap_or_default(),
        })
    }
}
