//! Shared REST plumbing for the service clients.

use crate::auth::{Credentials, ResolvedAuth};
use crate::client::EntitySummary;
use crate::error::ClientError;
use crate::settings::ServiceKind;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

/// Longest error body echoed back in a [`ClientError::Status`].
const MAX_ERROR_BODY: usize = 200;

/// An authenticated REST base URL for one service.
#[derive(Debug, Clone)]
pub(crate) struct RestEndpoint {
    http: reqwest::Client,
    service: ServiceKind,
    base_url: String,
    credentials: Credentials,
}

impl RestEndpoint {
    pub(crate) fn from_auth(http: reqwest::Client, auth: &ResolvedAuth) -> Result<Self, ClientError> {
        let service = auth.service();
        let base_url = auth
            .base_url()
            .ok_or_else(|| ClientError::InvalidConfig(format!("{} has no base URL", service)))?;
        let credentials = auth.credentials().cloned().ok_or_else(|| {
            ClientError::InvalidConfig(format!("{} has no resolved credentials", service))
        })?;

        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ClientError::InvalidConfig(format!(
                "{} URL must start with http:// or https://: {}",
                service, base_url
            )));
        }

        Ok(Self {
            http,
            service,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
        })
    }

    pub(crate) fn service(&self) -> ServiceKind {
        self.service
    }

    /// GET `{base_url}/{path}` and decode the JSON body as `T`.
    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ClientError> {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        debug!(service = %self.service, url = %url, "GET");

        let request = self.http.get(&url).query(query);
        let request = match &self.credentials {
            Credentials::Basic {
                username,
                api_token,
            } => request.basic_auth(username, Some(api_token)),
            Credentials::Bearer { token } => request.bearer_auth(token),
        };

        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(ClientError::Unauthorized {
                service: self.service,
                status: status.as_u16(),
            });
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Status {
                service: self.service,
                status: status.as_u16(),
                body: truncate(&body, MAX_ERROR_BODY),
            });
        }

        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| ClientError::Decode(e.to_string()))
    }
}

/// Loosely-typed entity as returned by either REST API.
#[derive(Debug, Deserialize)]
pub(crate) struct RawEntity {
    #[serde(default)]
    key: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

impl From<RawEntity> for EntitySummary {
    fn from(raw: RawEntity) -> Self {
        EntitySummary {
            key: raw.key.unwrap_or_else(|| "Unknown".to_string()),
            name: raw.name.unwrap_or_else(|| "Unknown".to_string()),
        }
    }
}

fn truncate(text: &str, max: usize) -> String {
    let text = text.trim();
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
