//! Stage definitions and configuration.

use async_trait::async_trait;
use atlas_doctor_core::{ErrorKind, ServiceKind};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

/// Builtin check stages, in canonical order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BuiltinStage {
    /// Components every later stage depends on can be constructed.
    Load,

    /// At least one service is in scope and each has a strategy.
    Configuration,

    /// One read-only probe against a service.
    Connectivity(ServiceKind),

    /// Fetch one Jira issue by key.
    IssueLookup,

    /// One Confluence content search.
    PageSearch,

    /// The tool catalog can be listed.
    Capabilities,
}

impl BuiltinStage {
    /// Get the stage name as a string.
    pub fn name(&self) -> String {
        match self {
            BuiltinStage::Load => "load".to_string(),
            BuiltinStage::Configuration => "configuration".to_string(),
            BuiltinStage::Connectivity(service) => format!("connectivity:{}", service.name()),
            BuiltinStage::IssueLookup => format!("issue:{}", ServiceKind::Jira.name()),
            BuiltinStage::PageSearch => format!("search:{}", ServiceKind::Confluence.name()),
            BuiltinStage::Capabilities => "capabilities".to_string(),
        }
    }

    /// Whether a failure of this stage aborts the run. Only `Load` is fatal.
    pub fn is_fatal(&self) -> bool {
        matches!(self, BuiltinStage::Load)
    }
}

/// What a stage action reports back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageOutcome {
    pub passed: bool,

    /// One-line summary.
    pub detail: String,

    /// Supporting lines, printed under the summary.
    pub messages: Vec<String>,

    /// Failure category, when the action knows it.
    pub error: Option<ErrorKind>,
}

impl StageOutcome {
    pub fn pass(detail: impl Into<String>) -> Self {
        Self {
            passed: true,
            detail: detail.into(),
            messages: Vec::new(),
            error: None,
        }
    }

    pub fn fail(detail: impl Into<String>) -> Self {
        Self {
            passed: false,
            detail: detail.into(),
            messages: Vec::new(),
            error: None,
        }
    }

    /// Failure whose detail is the error's own message.
    pub fn from_error(error: ErrorKind) -> Self {
        Self {
            passed: false,
            detail: error.to_string(),
            messages: Vec::new(),
            error: Some(error),
        }
    }

    pub fn with_error(mut self, error: ErrorKind) -> Self {
        self.error = Some(error);
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.messages.push(message.into());
        self
    }

    pub fn with_messages<I, S>(mut self, messages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.messages.extend(messages.into_iter().map(Into::into));
        self
    }
}

/// The work a stage performs.
///
/// An `Err` return is treated exactly like a failed outcome whose detail is
/// the error chain.
#[async_trait]
pub trait StageAction: Send + Sync {
    async fn run(&self) -> anyhow::Result<StageOutcome>;
}

/// Adapter turning an async closure into a [`StageAction`].
pub struct FnAction<F>(pub F);

#[async_trait]
impl<F, Fut> StageAction for FnAction<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<StageOutcome>> + Send,
{
    async fn run(&self) -> anyhow::Result<StageOutcome> {
        (self.0)().await
    }
}

/// A declared pipeline stage.
pub struct Stage {
    /// Human-readable stage name.
    pub name: String,

    /// Whether a failure skips every later stage.
    pub fatal: bool,

    /// Disabled stages are recorded as skipped and never run.
    pub enabled: bool,

    /// Optional upper bound on the action's run time.
    pub timeout: Option<Duration>,

    action: Box<dyn StageAction>,
}

impl Stage {
    /// Create a stage from a builtin stage and its action.
    pub fn from_builtin(stage: BuiltinStage, action: impl StageAction + 'static) -> Self {
        Self {
            name: stage.name(),
            fatal: stage.is_fatal(),
            enabled: true,
            timeout: None,
            action: Box::new(action),
        }
    }

    /// Create a custom stage.
    pub fn custom(name: impl Into<String>, fatal: bool, action: impl StageAction + 'static) -> Self {
        Self {
            name: name.into(),
            fatal,
            enabled: true,
            timeout: None,
            action: Box::new(action),
        }
    }

    /// Create a custom stage from an async closure.
    pub fn from_fn<F, Fut>(name: impl Into<String>, fatal: bool, f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<StageOutcome>> + Send + 'static,
    {
        Self::custom(name, fatal, FnAction(f))
    }

    /// Disable this stage.
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn enabled_if(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub(crate) fn action(&self) -> &dyn StageAction {
        self.action.as_ref()
    }
}

impl std::fmt::Debug for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stage")
            .field("name", &self.name)
            .field("fatal", &self.fatal)
            .field("enabled", &self.enabled)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_stage_names() {
        assert_eq!(BuiltinStage::Load.name(), "load");
        assert_eq!(BuiltinStage::Configuration.name(), "configuration");
        assert_eq!(
            BuiltinStage::Connectivity(ServiceKind::Jira).name(),
            "connectivity:jira"
        );
        assert_eq!(
            BuiltinStage::Connectivity(ServiceKind::Confluence).name(),
            "connectivity:confluence"
        );
        assert_eq!(BuiltinStage::IssueLookup.name(), "issue:jira");
        assert_eq!(BuiltinStage::PageSearch.name(), "search:confluence");
        assert_eq!(BuiltinStage::Capabilities.name(), "capabilities");
    }

    #[test]
    fn test_only_load_is_fatal() {
        assert!(BuiltinStage::Load.is_fatal());
        assert!(!BuiltinStage::Configuration.is_fatal());
        assert!(!BuiltinStage::Connectivity(ServiceKind::Jira).is_fatal());
        assert!(!BuiltinStage::IssueLookup.is_fatal());
        assert!(!BuiltinStage::PageSearch.is_fatal());
        assert!(!BuiltinStage::Capabilities.is_fatal());
    }

    #[test]
    fn test_stage_from_builtin() {
        let stage = Stage::from_fn("x", false, || async { Ok(StageOutcome::pass("ok")) });
        assert!(stage.enabled);
        assert!(!stage.fatal);

        let stage = Stage::from_builtin(
            BuiltinStage::Load,
            FnAction(|| async { Ok(StageOutcome::pass("ok")) }),
        );
        assert_eq!(stage.name, "load");
        assert!(stage.fatal);
        assert!(stage.timeout.is_none());
    }

    #[test]
    fn test_stage_disabled() {
        let stage = Stage::from_fn("x", true, || async { Ok(StageOutcome::pass("ok")) }).disabled();
        assert!(!stage.enabled);
        let stage = stage.enabled_if(true).with_timeout(Duration::from_secs(5));
        assert!(stage.enabled);
        assert_eq!(stage.timeout, Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_outcome_builders() {
        let outcome = StageOutcome::fail("bad")
            .with_message("one")
            .with_messages(["two", "three"]);
        assert!(!outcome.passed);
        assert_eq!(outcome.messages, vec!["one", "two", "three"]);

        let outcome = StageOutcome::from_error(ErrorKind::Load("missing".to_string()));
        assert_eq!(outcome.detail, "load error: missing");
        assert!(outcome.error.is_some());
    }
}
