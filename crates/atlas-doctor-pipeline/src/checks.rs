//! The canonical check stages.
//!
//! [`CheckPlan::stages`] declares, in order:
//!
//! 1. `load` (fatal)
//! 2. `configuration`
//! 3. `connectivity:<service>` for every service with a base URL, each
//!    followed by its optional deeper check (`issue:jira`, `search:confluence`)
//! 4. `capabilities`

use crate::stage::{BuiltinStage, Stage, StageAction, StageOutcome};
use async_trait::async_trait;
use atlas_doctor_core::{
    resolve, ErrorKind, ResolvedAuth, ServiceKind, ServiceProbe, SettingsSnapshot, ToolCatalog,
    DEFAULT_PAGE_QUERY,
};
use std::sync::Arc;
use std::time::Duration;

/// Number of tool names listed by the capability stage.
const SAMPLE_TOOLS: usize = 5;

/// A component later stages depend on, as it came out of construction.
#[derive(Debug, Clone)]
pub struct ComponentStatus {
    pub name: String,

    /// Short description on success, load error otherwise.
    pub status: Result<String, ErrorKind>,
}

impl ComponentStatus {
    pub fn loaded(name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: Ok(detail.into()),
        }
    }

    pub fn failed(name: impl Into<String>, error: ErrorKind) -> Self {
        Self {
            name: name.into(),
            status: Err(error),
        }
    }
}

/// Operator switches for a check run.
#[derive(Debug, Clone, Default)]
pub struct CheckOptions {
    /// Disable the connectivity stages.
    pub skip_api: bool,

    /// Disable the capability stage.
    pub skip_tools: bool,

    /// Fetch this Jira issue after the Jira connectivity stage.
    pub issue_key: Option<String>,

    /// Run a Confluence page search after the Confluence connectivity stage.
    pub page_search: bool,

    /// Upper bound per stage.
    pub stage_timeout: Option<Duration>,
}

/// Everything needed to declare the canonical stages.
pub struct CheckPlan {
    pub snapshot: SettingsSnapshot,
    pub components: Vec<ComponentStatus>,
    pub probe: Result<ServiceProbe, ErrorKind>,
    pub catalog: Result<Arc<dyn ToolCatalog>, ErrorKind>,
    pub options: CheckOptions,
}

impl CheckPlan {
    /// Declare the canonical stages for this plan.
    pub fn stages(self) -> Vec<Stage> {
        let auths: Vec<ResolvedAuth> = self.snapshot.services().into_iter().map(resolve).collect();
        let mut stages = Vec::new();

        stages.push(Stage::from_builtin(
            BuiltinStage::Load,
            LoadCheck {
                components: self.components,
            },
        ));

        stages.push(Stage::from_builtin(
            BuiltinStage::Configuration,
            ConfigurationCheck {
                auths: auths.clone(),
            },
        ));

        let api_enabled = !self.options.skip_api;
        for auth in auths.into_iter().filter(ResolvedAuth::has_base_url) {
            stages.push(
                Stage::from_builtin(
                    BuiltinStage::Connectivity(auth.service()),
                    ConnectivityCheck {
                        auth: auth.clone(),
                        probe: self.probe.clone(),
                    },
                )
                .enabled_if(api_enabled),
            );

            match auth.service() {
                ServiceKind::Jira => {
                    if let Some(key) = &self.options.issue_key {
                        stages.push(
                            Stage::from_builtin(
                                BuiltinStage::IssueLookup,
                                IssueLookupCheck {
                                    auth,
                                    probe: self.probe.clone(),
                                    key: key.clone(),
                                },
                            )
                            .enabled_if(api_enabled),
                        );
                    }
                }
                ServiceKind::Confluence => {
                    if self.options.page_search {
                        stages.push(
                            Stage::from_builtin(
                                BuiltinStage::PageSearch,
                                PageSearchCheck {
                                    auth,
                                    probe: self.probe.clone(),
                                    cql: DEFAULT_PAGE_QUERY.to_string(),
                                },
                            )
                            .enabled_if(api_enabled),
                        );
                    }
                }
            }
        }

        stages.push(
            Stage::from_builtin(
                BuiltinStage::Capabilities,
                CapabilityCheck {
                    catalog: self.catalog,
                },
            )
            .enabled_if(!self.options.skip_tools),
        );

        match self.options.stage_timeout {
            Some(timeout) => stages.into_iter().map(|s| s.with_timeout(timeout)).collect(),
            None => stages,
        }
    }
}

/// Fails when any component could not be constructed.
pub struct LoadCheck {
    pub components: Vec<ComponentStatus>,
}

#[async_trait]
impl StageAction for LoadCheck {
    async fn run(&self) -> anyhow::Result<StageOutcome> {
        let mut messages = Vec::new();
        let mut failures = Vec::new();

        for component in &self.components {
            match &component.status {
                Ok(detail) => messages.push(format!("{} loaded ({})", component.name, detail)),
                Err(e) => {
                    messages.push(format!("{} failed to load: {}", component.name, e));
                    failures.push(component.name.as_str());
                }
            }
        }

        if failures.is_empty() {
            Ok(StageOutcome::pass(format!("{} components loaded", self.components.len()))
                .with_messages(messages))
        } else {
            let error = ErrorKind::Load(format!("failed to load {}", failures.join(", ")));
            Ok(StageOutcome::from_error(error).with_messages(messages))
        }
    }
}

/// Reports URL and strategy per service.
pub struct ConfigurationCheck {
    pub auths: Vec<ResolvedAuth>,
}

#[async_trait]
impl StageAction for ConfigurationCheck {
    async fn run(&self) -> anyhow::Result<StageOutcome> {
        let in_scope: Vec<&ResolvedAuth> =
            self.auths.iter().filter(|a| a.has_base_url()).collect();

        if in_scope.is_empty() {
            return Ok(StageOutcome::fail("No services configured").with_messages([
                "Set JIRA_URL and/or CONFLUENCE_URL together with credentials",
            ]));
        }

        let mut messages = Vec::new();
        let mut unauthenticated = Vec::new();
        for auth in &in_scope {
            let url = auth.base_url().unwrap_or_default();
            messages.push(format!("{} URL configured: {}", auth.service(), url));
            if auth.is_configured() {
                messages.push(format!(
                    "{} authentication method: {}",
                    auth.service(),
                    auth.strategy()
                ));
            } else {
                messages.push(format!("{} authentication not configured", auth.service()));
                unauthenticated.push(auth.service().display_name());
            }
        }

        if unauthenticated.is_empty() {
            let names: Vec<_> = in_scope.iter().map(|a| a.service().display_name()).collect();
            Ok(StageOutcome::pass(format!("Configured: {}", names.join(", "))).with_messages(messages))
        } else {
            let error = ErrorKind::AuthNotConfigured(format!(
                "no credentials for {}",
                unauthenticated.join(", ")
            ));
            Ok(StageOutcome::from_error(error).with_messages(messages))
        }
    }
}

/// The probe to use for `auth`, or the failed outcome explaining why the
/// service cannot be probed.
fn ready_probe<'a>(
    auth: &ResolvedAuth,
    probe: &'a Result<ServiceProbe, ErrorKind>,
) -> Result<&'a ServiceProbe, StageOutcome> {
    if !auth.is_configured() {
        return Err(StageOutcome::from_error(ErrorKind::AuthNotConfigured(format!(
            "{} has a URL but no username/API token or personal token",
            auth.service()
        ))));
    }
    probe
        .as_ref()
        .map_err(|e| StageOutcome::from_error(e.clone()))
}

/// Probes one service.
pub struct ConnectivityCheck {
    pub auth: ResolvedAuth,
    pub probe: Result<ServiceProbe, ErrorKind>,
}

#[async_trait]
impl StageAction for ConnectivityCheck {
    async fn run(&self) -> anyhow::Result<StageOutcome> {
        let service = self.auth.service();
        let probe = match ready_probe(&self.auth, &self.probe) {
            Ok(probe) => probe,
            Err(outcome) => return Ok(outcome),
        };

        let result = probe.probe(&self.auth).await?;

        if let Some(error) = result.error {
            return Ok(StageOutcome::fail(format!("{} connection failed: {}", service, error))
                .with_error(error));
        }

        let mut outcome = StageOutcome::pass(format!(
            "{} connection successful - found {} {}",
            service,
            result.item_count,
            service.entity_noun()
        ));
        if let Some(sample) = result.sample {
            outcome = outcome.with_message(format!(
                "Sample {}: {} - {}",
                service.entity_noun().trim_end_matches('s'),
                sample.key,
                sample.name
            ));
        }
        Ok(outcome)
    }
}

/// Fetches one Jira issue.
pub struct IssueLookupCheck {
    pub auth: ResolvedAuth,
    pub probe: Result<ServiceProbe, ErrorKind>,
    pub key: String,
}

#[async_trait]
impl StageAction for IssueLookupCheck {
    async fn run(&self) -> anyhow::Result<StageOutcome> {
        let probe = match ready_probe(&self.auth, &self.probe) {
            Ok(probe) => probe,
            Err(outcome) => return Ok(outcome),
        };

        let result = probe.lookup_issue(&self.auth, &self.key).await?;
        if let Some(error) = result.error {
            return Ok(
                StageOutcome::fail(format!("Failed to get issue {}: {}", self.key, error))
                    .with_error(error),
            );
        }

        Ok(match result.sample {
            Some(issue) => StageOutcome::pass(format!("Retrieved issue: {} - {}", issue.key, issue.name)),
            None => StageOutcome::pass(format!("Retrieved issue: {}", self.key)),
        })
    }
}

/// Runs one Confluence content search.
pub struct PageSearchCheck {
    pub auth: ResolvedAuth,
    pub probe: Result<ServiceProbe, ErrorKind>,
    pub cql: String,
}

#[async_trait]
impl StageAction for PageSearchCheck {
    async fn run(&self) -> anyhow::Result<StageOutcome> {
        let probe = match ready_probe(&self.auth, &self.probe) {
            Ok(probe) => probe,
            Err(outcome) => return Ok(outcome),
        };

        let result = probe.search_pages(&self.auth, &self.cql).await?;
        if let Some(error) = result.error {
            return Ok(StageOutcome::fail(format!("Failed to search pages: {}", error))
                .with_error(error)
                .with_message(format!("Query: {}", self.cql)));
        }

        let mut outcome = StageOutcome::pass(format!("Found {} pages in search", result.item_count));
        if let Some(page) = result.sample {
            outcome = outcome.with_message(format!("Sample page: {} (ID: {})", page.name, page.key));
        }
        Ok(outcome)
    }
}

/// Lists the tool catalog once.
pub struct CapabilityCheck {
    pub catalog: Result<Arc<dyn ToolCatalog>, ErrorKind>,
}

#[async_trait]
impl StageAction for CapabilityCheck {
    async fn run(&self) -> anyhow::Result<StageOutcome> {
        let catalog = match &self.catalog {
            Ok(catalog) => catalog,
            Err(e) => return Ok(StageOutcome::from_error(e.clone())),
        };

        let tools = match catalog.list_tools().await {
            Ok(tools) => tools,
            Err(e) => return Ok(StageOutcome::from_error(e.kind())),
        };

        let outcome = StageOutcome::pass(format!("Found {} available tools", tools.len()));
        Ok(outcome.with_messages(tools.keys().take(SAMPLE_TOOLS).cloned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atlas_doctor_core::fakes::{ScriptedClientFactory, StaticToolCatalog};
    use atlas_doctor_core::{AuthStrategy, EntitySummary, ServiceKind, ServiceSettings};

    fn auth(settings: ServiceSettings) -> ResolvedAuth {
        resolve(&settings)
    }

    #[tokio::test]
    async fn test_load_check_lists_failing_components() {
        let check = LoadCheck {
            components: vec![
                ComponentStatus::loaded("http client", "rustls"),
                ComponentStatus::failed("tool catalog", ErrorKind::Load("bad json".to_string())),
            ],
        };

        let outcome = check.run().await.unwrap();
        assert!(!outcome.passed);
        assert_eq!(outcome.detail, "load error: failed to load tool catalog");
        assert_eq!(outcome.messages.len(), 2);
    }

    #[tokio::test]
    async fn test_configuration_check_without_services() {
        let check = ConfigurationCheck {
            auths: vec![
                auth(ServiceSettings::empty(ServiceKind::Jira).with_personal_token("p")),
                auth(ServiceSettings::empty(ServiceKind::Confluence)),
            ],
        };

        let outcome = check.run().await.unwrap();
        assert!(!outcome.passed);
        assert_eq!(outcome.detail, "No services configured");
    }

    #[tokio::test]
    async fn test_configuration_check_flags_missing_credentials() {
        let check = ConfigurationCheck {
            auths: vec![
                auth(
                    ServiceSettings::empty(ServiceKind::Jira)
                        .with_base_url("https://jira.example.com")
                        .with_api_token("u", "t"),
                ),
                auth(
                    ServiceSettings::empty(ServiceKind::Confluence)
                        .with_base_url("https://wiki.example.com"),
                ),
            ],
        };

        let outcome = check.run().await.unwrap();
        assert!(!outcome.passed);
        assert!(matches!(outcome.error, Some(ErrorKind::AuthNotConfigured(_))));
        assert!(outcome
            .messages
            .contains(&"Jira authentication method: api_token".to_string()));
        assert!(outcome
            .messages
            .contains(&"Confluence authentication not configured".to_string()));
    }

    #[tokio::test]
    async fn test_connectivity_check_reports_sample() {
        let factory = ScriptedClientFactory::new().with_entities(
            ServiceKind::Confluence,
            vec![EntitySummary::new("ENG", "Engineering")],
        );
        let resolved = auth(
            ServiceSettings::empty(ServiceKind::Confluence)
                .with_base_url("https://wiki.example.com")
                .with_personal_token("p"),
        );
        assert_eq!(resolved.strategy(), AuthStrategy::PersonalToken);

        let check = ConnectivityCheck {
            auth: resolved,
            probe: Ok(ServiceProbe::new(Arc::new(factory))),
        };

        let outcome = check.run().await.unwrap();
        assert!(outcome.passed);
        assert_eq!(
            outcome.detail,
            "Confluence connection successful - found 1 spaces"
        );
        assert_eq!(outcome.messages, vec!["Sample space: ENG - Engineering"]);
    }

    #[tokio::test]
    async fn test_connectivity_check_without_credentials_never_probes() {
        let factory = Arc::new(ScriptedClientFactory::new());
        let check = ConnectivityCheck {
            auth: auth(
                ServiceSettings::empty(ServiceKind::Jira).with_base_url("https://jira.example.com"),
            ),
            probe: Ok(ServiceProbe::new(factory.clone())),
        };

        let outcome = check.run().await.unwrap();
        assert!(!outcome.passed);
        assert!(matches!(outcome.error, Some(ErrorKind::AuthNotConfigured(_))));
        assert!(factory.calls().is_empty());
    }

    #[tokio::test]
    async fn test_capability_check_lists_first_five() {
        let catalog: Arc<dyn ToolCatalog> = Arc::new(StaticToolCatalog::with_names(&[
            "a", "b", "c", "d", "e", "f", "g",
        ]));
        let check = CapabilityCheck {
            catalog: Ok(catalog),
        };

        let outcome = check.run().await.unwrap();
        assert!(outcome.passed);
        assert_eq!(outcome.detail, "Found 7 available tools");
        assert_eq!(outcome.messages, vec!["a", "b", "c", "d", "e"]);
    }

    #[tokio::test]
    async fn test_capability_check_failure() {
        let catalog: Arc<dyn ToolCatalog> = Arc::new(StaticToolCatalog::failing("server down"));
        let check = CapabilityCheck {
            catalog: Ok(catalog),
        };

        let outcome = check.run().await.unwrap();
        assert!(!outcome.passed);
        assert!(outcome.detail.contains("server down"));
    }

    #[tokio::test]
    async fn test_issue_lookup_check() {
        let factory = Arc::new(
            ScriptedClientFactory::new().with_issue(EntitySummary::new("OPS-1", "Rotate keys")),
        );
        let jira = auth(
            ServiceSettings::empty(ServiceKind::Jira)
                .with_base_url("https://jira.example.com")
                .with_api_token("u", "t"),
        );
        let check = |key: &str| IssueLookupCheck {
            auth: jira.clone(),
            probe: Ok(ServiceProbe::new(factory.clone())),
            key: key.to_string(),
        };

        let found = check("OPS-1").run().await.unwrap();
        assert!(found.passed);
        assert_eq!(found.detail, "Retrieved issue: OPS-1 - Rotate keys");

        let missing = check("OPS-9").run().await.unwrap();
        assert!(!missing.passed);
        assert!(missing.detail.starts_with("Failed to get issue OPS-9: "));
        assert!(matches!(missing.error, Some(ErrorKind::Connectivity(_))));
    }

    #[tokio::test]
    async fn test_page_search_check_reports_sample() {
        let factory = ScriptedClientFactory::new().with_pages(Ok(vec![
            EntitySummary::new("65538", "Runbook"),
            EntitySummary::new("65539", "Onboarding"),
        ]));
        let check = PageSearchCheck {
            auth: auth(
                ServiceSettings::empty(ServiceKind::Confluence)
                    .with_base_url("https://wiki.example.com")
                    .with_personal_token("p"),
            ),
            probe: Ok(ServiceProbe::new(Arc::new(factory))),
            cql: DEFAULT_PAGE_QUERY.to_string(),
        };

        let outcome = check.run().await.unwrap();
        assert!(outcome.passed);
        assert_eq!(outcome.detail, "Found 2 pages in search");
        assert_eq!(outcome.messages, vec!["Sample page: Runbook (ID: 65538)"]);
    }

    #[tokio::test]
    async fn test_page_search_without_credentials_never_probes() {
        let check = PageSearchCheck {
            auth: auth(
                ServiceSettings::empty(ServiceKind::Confluence)
                    .with_base_url("https://wiki.example.com"),
            ),
            probe: Err(ErrorKind::Load("unused".to_string())),
            cql: DEFAULT_PAGE_QUERY.to_string(),
        };

        let outcome = check.run().await.unwrap();
        assert!(matches!(outcome.error, Some(ErrorKind::AuthNotConfigured(_))));
    }

    #[test]
    fn test_deeper_checks_follow_their_service() {
        let snapshot = SettingsSnapshot {
            jira: ServiceSettings::empty(ServiceKind::Jira)
                .with_base_url("https://jira.example.com")
                .with_api_token("u", "t"),
            confluence: ServiceSettings::empty(ServiceKind::Confluence)
                .with_base_url("https://wiki.example.com")
                .with_personal_token("p"),
        };
        let plan = CheckPlan {
            snapshot,
            components: Vec::new(),
            probe: Ok(ServiceProbe::new(Arc::new(ScriptedClientFactory::new()))),
            catalog: Ok(Arc::new(StaticToolCatalog::with_names(&["x"]))),
            options: CheckOptions {
                skip_api: true,
                issue_key: Some("OPS-1".to_string()),
                page_search: true,
                ..CheckOptions::default()
            },
        };

        let stages = plan.stages();
        let names: Vec<_> = stages.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "load",
                "configuration",
                "connectivity:jira",
                "issue:jira",
                "connectivity:confluence",
                "search:confluence",
                "capabilities"
            ]
        );
        assert!(stages[2..6].iter().all(|s| !s.enabled && !s.fatal));
    }

    #[test]
    fn test_plan_declares_canonical_order() {
        let snapshot = SettingsSnapshot {
            jira: ServiceSettings::empty(ServiceKind::Jira)
                .with_base_url("https://jira.example.com")
                .with_api_token("u", "t"),
            confluence: ServiceSettings::empty(ServiceKind::Confluence),
        };
        let plan = CheckPlan {
            snapshot,
            components: Vec::new(),
            probe: Ok(ServiceProbe::new(Arc::new(ScriptedClientFactory::new()))),
            catalog: Ok(Arc::new(StaticToolCatalog::with_names(&["x"]))),
            options: CheckOptions {
                skip_tools: true,
                ..CheckOptions::default()
            },
        };

        let stages = plan.stages();
        let names: Vec<_> = stages.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["load", "configuration", "connectivity:jira", "capabilities"]
        );
        assert!(stages[0].fatal);
        assert!(stages[1..].iter().all(|s| !s.fatal));
        assert!(stages[2].enabled);
        assert!(!stages[3].enabled);
    }
}
