//! Service settings snapshot.
//!
//! Service variables are read exactly once into a [`SettingsSnapshot`]. Every
//! later step (resolution, probing, reporting) works on that snapshot and never
//! goes back to the process environment.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The two external services atlas-doctor knows how to check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceKind {
    /// Issue tracker.
    Jira,

    /// Wiki / content service.
    Confluence,
}

impl ServiceKind {
    /// Every service, in reporting order.
    pub const ALL: [ServiceKind; 2] = [ServiceKind::Jira, ServiceKind::Confluence];

    /// Lowercase identifier used in stage names and JSON output.
    pub fn name(&self) -> &'static str {
        match self {
            ServiceKind::Jira => "jira",
            ServiceKind::Confluence => "confluence",
        }
    }

    /// Human-facing name.
    pub fn display_name(&self) -> &'static str {
        match self {
            ServiceKind::Jira => "Jira",
            ServiceKind::Confluence => "Confluence",
        }
    }

    /// Prefix of the environment variables describing this service.
    pub fn env_prefix(&self) -> &'static str {
        match self {
            ServiceKind::Jira => "JIRA",
            ServiceKind::Confluence => "CONFLUENCE",
        }
    }

    /// Plural noun for the top-level entities listed by a probe.
    pub fn entity_noun(&self) -> &'static str {
        match self {
            ServiceKind::Jira => "projects",
            ServiceKind::Confluence => "spaces",
        }
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Raw settings for one service. Empty values are stored as `None`.
#[derive(Clone, PartialEq, Eq)]
pub struct ServiceSettings {
    pub service: ServiceKind,
    pub base_url: Option<String>,
    pub identity: Option<String>,
    pub api_token: Option<String>,
    pub personal_token: Option<String>,
}

impl ServiceSettings {
    /// Settings with every field absent.
    pub fn empty(service: ServiceKind) -> Self {
        Self {
            service,
            base_url: None,
            identity: None,
            api_token: None,
            personal_token: None,
        }
    }

    /// Read `{PREFIX}_URL`, `{PREFIX}_USERNAME`, `{PREFIX}_API_TOKEN` and
    /// `{PREFIX}_PERSONAL_TOKEN` through `lookup`.
    ///
    /// A missing key is the same as an empty value; this never fails.
    pub fn from_lookup<F>(service: ServiceKind, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let prefix = service.env_prefix();
        let read = |suffix: &str| non_empty(lookup(&format!("{}_{}", prefix, suffix)));

        Self {
            service,
            base_url: read("URL"),
            identity: read("USERNAME"),
            api_token: read("API_TOKEN"),
            personal_token: read("PERSONAL_TOKEN"),
        }
    }

    /// Read this service's variables from the process environment.
    pub fn from_env(service: ServiceKind) -> Self {
        Self::from_lookup(service, |key| std::env::var(key).ok())
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = non_empty(Some(url.to_string()));
        self
    }

    pub fn with_api_token(mut self, identity: &str, token: &str) -> Self {
        self.identity = non_empty(Some(identity.to_string()));
        self.api_token = non_empty(Some(token.to_string()));
        self
    }

    pub fn with_personal_token(mut self, token: &str) -> Self {
        self.personal_token = non_empty(Some(token.to_string()));
        self
    }
}

// Tokens never reach log output.
impl fmt::Debug for ServiceSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceSettings")
            .field("service", &self.service)
            .field("base_url", &self.base_url)
            .field("identity", &self.identity)
            .field("api_token", &self.api_token.as_ref().map(|_| "<redacted>"))
            .field(
                "personal_token",
                &self.personal_token.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

/// Immutable settings for both services, captured once per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsSnapshot {
    pub jira: ServiceSettings,
    pub confluence: ServiceSettings,
}

impl SettingsSnapshot {
    /// Capture both services from the process environment.
    pub fn capture() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Capture both services through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            jira: ServiceSettings::from_lookup(ServiceKind::Jira, &lookup),
            confluence: ServiceSettings::from_lookup(ServiceKind::Confluence, &lookup),
        }
    }

    pub fn get(&self, service: ServiceKind) -> &ServiceSettings {
        match service {
            ServiceKind::Jira => &self.jira,
            ServiceKind::Confluence => &self.confluence,
        }
    }

    /// Settings of both services in reporting order.
    pub fn services(&self) -> [&ServiceSettings; 2] {
        [&self.jira, &self.confluence]
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_from_lookup_reads_prefixed_keys() {
        let lookup = lookup_from(&[
            ("JIRA_URL", "https://example.atlassian.net"),
            ("JIRA_USERNAME", "me@example.com"),
            ("JIRA_API_TOKEN", "tok"),
            ("CONFLUENCE_PERSONAL_TOKEN", "pat"),
        ]);

        let snapshot = SettingsSnapshot::from_lookup(lookup);
        assert_eq!(
            snapshot.jira.base_url.as_deref(),
            Some("https://example.atlassian.net")
        );
        assert_eq!(snapshot.jira.identity.as_deref(), Some("me@example.com"));
        assert_eq!(snapshot.jira.api_token.as_deref(), Some("tok"));
        assert!(snapshot.jira.personal_token.is_none());
        assert!(snapshot.confluence.base_url.is_none());
        assert_eq!(snapshot.confluence.personal_token.as_deref(), Some("pat"));
    }

    #[test]
    fn test_blank_values_are_absent() {
        let lookup = lookup_from(&[("JIRA_URL", "   "), ("JIRA_API_TOKEN", "")]);
        let settings = ServiceSettings::from_lookup(ServiceKind::Jira, lookup);
        assert!(settings.base_url.is_none());
        assert!(settings.api_token.is_none());
    }

    #[test]
    fn test_debug_redacts_tokens() {
        let settings = ServiceSettings::empty(ServiceKind::Confluence)
            .with_base_url("https://wiki.example.com")
            .with_api_token("me", "super-secret")
            .with_personal_token("also-secret");
        let rendered = format!("{:?}", settings);
        assert!(!rendered.contains("super-secret"));
        assert!(!rendered.contains("also-secret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_service_names() {
        assert_eq!(ServiceKind::Jira.name(), "jira");
        assert_eq!(ServiceKind::Confluence.env_prefix(), "CONFLUENCE");
        assert_eq!(ServiceKind::Confluence.entity_noun(), "spaces");
        assert_eq!(ServiceKind::Jira.to_string(), "Jira");
    }
}
