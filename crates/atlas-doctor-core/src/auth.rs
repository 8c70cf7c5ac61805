//! Credential resolution.
//!
//! [`resolve`] turns a [`ServiceSettings`] snapshot into a [`ResolvedAuth`]
//! by checking authentication strategies in a fixed priority order:
//!
//! 1. `api_token` - needs both a username and an API token
//! 2. `personal_token` - needs a personal access token
//!
//! When both are fully present the API token wins. A service without a base
//! URL is out of scope entirely and resolves to `none` whatever else is set.

use crate::settings::{ServiceKind, ServiceSettings};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Authentication strategy chosen for a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthStrategy {
    ApiToken,
    PersonalToken,
    None,
}

impl AuthStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthStrategy::ApiToken => "api_token",
            AuthStrategy::PersonalToken => "personal_token",
            AuthStrategy::None => "none",
        }
    }
}

impl fmt::Display for AuthStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Secret material for the chosen strategy.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// HTTP basic auth with a username and API token.
    Basic { username: String, api_token: String },

    /// Bearer personal access token.
    Bearer { token: String },
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("api_token", &"<redacted>")
                .finish(),
            Credentials::Bearer { .. } => f
                .debug_struct("Bearer")
                .field("token", &"<redacted>")
                .finish(),
        }
    }
}

/// Outcome of resolving one service's settings.
///
/// `strategy` is [`AuthStrategy::None`] exactly when no credentials were
/// resolved, so [`ResolvedAuth::is_configured`] can never disagree with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAuth {
    service: ServiceKind,
    strategy: AuthStrategy,
    base_url: Option<String>,
    credentials: Option<Credentials>,
}

impl ResolvedAuth {
    fn unconfigured(service: ServiceKind, base_url: Option<String>) -> Self {
        Self {
            service,
            strategy: AuthStrategy::None,
            base_url,
            credentials: None,
        }
    }

    pub fn service(&self) -> ServiceKind {
        self.service
    }

    pub fn strategy(&self) -> AuthStrategy {
        self.strategy
    }

    pub fn is_configured(&self) -> bool {
        self.strategy != AuthStrategy::None
    }

    /// Base URL, kept even when no strategy resolved so reports can show it.
    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    /// Whether the service is in scope at all (a base URL was supplied).
    pub fn has_base_url(&self) -> bool {
        self.base_url.is_some()
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }
}

impl fmt::Display for ResolvedAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.base_url, self.is_configured()) {
            (None, _) => write!(f, "{}: not configured (no URL)", self.service),
            (Some(url), false) => write!(f, "{}: {} (no authentication)", self.service, url),
            (Some(url), true) => write!(f, "{}: {} via {}", self.service, url, self.strategy),
        }
    }
}

/// Resolve the authentication strategy for one service.
///
/// Pure and total: any combination of present and absent fields yields a
/// value.
pub fn resolve(settings: &ServiceSettings) -> ResolvedAuth {
    let Some(base_url) = settings.base_url.clone() else {
        return ResolvedAuth::unconfigured(settings.service, None);
    };

    let (strategy, credentials) = match (
        &settings.identity,
        &settings.api_token,
        &settings.personal_token,
    ) {
        (Some(username), Some(api_token), _) => (
            AuthStrategy::ApiToken,
            Credentials::Basic {
                username: username.clone(),
                api_token: api_token.clone(),
            },
        ),
        (_, _, Some(token)) => (
            AuthStrategy::PersonalToken,
            Credentials::Bearer {
                token: token.clone(),
            },
        ),
        _ => return ResolvedAuth::unconfigured(settings.service, Some(base_url)),
    };

    ResolvedAuth {
        service: settings.service,
        strategy,
        base_url: Some(base_url),
        credentials: Some(credentials),
    }
}
