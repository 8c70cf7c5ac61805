//! Stage execution.

use crate::stage::{Stage, StageOutcome};
use atlas_doctor_core::ErrorKind;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::panic::AssertUnwindSafe;

/// Status of a recorded stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Passed,
    Failed,
    Skipped,
}

impl StageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageStatus::Passed => "passed",
            StageStatus::Failed => "failed",
            StageStatus::Skipped => "skipped",
        }
    }
}

/// Result of a stage. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageResult {
    /// Stage name.
    pub stage_name: String,

    pub status: StageStatus,

    /// One-line summary.
    pub detail: String,

    /// Supporting lines reported under the summary.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<String>,

    /// Failure category, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorKind>,

    /// Declared fatality of the stage. Always false for skipped stages.
    pub is_fatal: bool,
}

impl StageResult {
    /// Record a stage that never ran.
    pub fn skip(stage_name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            stage_name: stage_name.into(),
            status: StageStatus::Skipped,
            detail: detail.into(),
            messages: Vec::new(),
            error: None,
            is_fatal: false,
        }
    }

    fn from_outcome(stage: &Stage, outcome: StageOutcome) -> Self {
        Self {
            stage_name: stage.name.clone(),
            status: if outcome.passed {
                StageStatus::Passed
            } else {
                StageStatus::Failed
            },
            detail: outcome.detail,
            messages: outcome.messages,
            error: outcome.error,
            is_fatal: stage.fatal,
        }
    }

    fn failure(stage: &Stage, detail: String) -> Self {
        Self::from_outcome(stage, StageOutcome::fail(detail))
    }

    pub fn passed(&self) -> bool {
        self.status == StageStatus::Passed
    }

    pub fn failed(&self) -> bool {
        self.status == StageStatus::Failed
    }

    pub fn skipped(&self) -> bool {
        self.status == StageStatus::Skipped
    }
}

/// Runs a single stage.
pub struct StageRunner;

impl StageRunner {
    /// Execute a stage and record its result.
    ///
    /// Never fails: an error returned by the action, a panic inside it, or a
    /// timeout all become a `failed` result carrying the message.
    pub async fn execute_stage(stage: &Stage) -> StageResult {
        let action = AssertUnwindSafe(stage.action().run()).catch_unwind();

        let outcome = match stage.timeout {
            Some(timeout) => match tokio::time::timeout(timeout, action).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    return StageResult::failure(
                        stage,
                        format!(
                            "Stage {} timed out after {} seconds",
                            stage.name,
                            timeout.as_secs()
                        ),
                    )
                }
            },
            None => action.await,
        };

        match outcome {
            Ok(Ok(outcome)) => StageResult::from_outcome(stage, outcome),
            Ok(Err(e)) => StageResult::failure(stage, format!("{:#}", e)),
            Err(panic) => StageResult::failure(
                stage,
                format!("Stage {} panicked: {}", stage.name, panic_message(&*panic)),
            ),
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;
    use std::time::Duration;

    #[test]
    fn test_skipped_result_is_never_fatal() {
        let result = StageResult::skip("capabilities", "disabled");
        assert!(result.skipped());
        assert!(!result.is_fatal);
        assert!(!result.passed());
        assert!(!result.failed());
    }

    #[tokio::test]
    async fn test_execute_passing_stage() {
        let stage = Stage::from_fn("ok", true, || async {
            Ok(StageOutcome::pass("fine").with_message("detail line"))
        });

        let result = StageRunner::execute_stage(&stage).await;
        assert!(result.passed());
        assert!(result.is_fatal);
        assert_eq!(result.detail, "fine");
        assert_eq!(result.messages, vec!["detail line"]);
    }

    #[tokio::test]
    async fn test_action_error_becomes_failure() {
        let stage = Stage::from_fn("broken", false, || async {
            Err::<StageOutcome, _>(anyhow::anyhow!("socket closed")).context("listing tools")
        });

        let result = StageRunner::execute_stage(&stage).await;
        assert!(result.failed());
        assert_eq!(result.detail, "listing tools: socket closed");
    }

    #[tokio::test]
    async fn test_panic_becomes_failure() {
        let stage = Stage::from_fn("boom", false, || async {
            if true {
                panic!("catalog exploded");
            }
            Ok(StageOutcome::pass("unreachable"))
        });

        let result = StageRunner::execute_stage(&stage).await;
        assert!(result.failed());
        assert!(result.detail.contains("catalog exploded"), "{}", result.detail);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_becomes_failure() {
        let stage = Stage::from_fn("slow", false, || async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(StageOutcome::pass("late"))
        })
        .with_timeout(Duration::from_secs(5));

        let result = StageRunner::execute_stage(&stage).await;
        assert!(result.failed());
        assert_eq!(result.detail, "Stage slow timed out after 5 seconds");
    }
}
