//! Pipeline orchestration.

use crate::runner::{StageResult, StageRunner};
use crate::stage::Stage;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

/// Receives progress while the pipeline runs.
pub trait StageObserver: Send + Sync {
    /// A stage is about to execute. Not called for skipped stages.
    fn on_stage_start(&self, _stage_name: &str) {}

    /// A result was recorded, in declaration order.
    fn on_stage_result(&self, result: &StageResult);
}

/// Observer that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl StageObserver for NoopObserver {
    fn on_stage_result(&self, _result: &StageResult) {}
}

/// Result of a complete pipeline execution.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineVerdict {
    /// Identifier of this run, for log correlation.
    pub run_id: String,

    pub started_at: DateTime<Utc>,

    /// Whether no stage failed.
    pub all_passed: bool,

    /// Name of the fatal stage that stopped the run, if any.
    pub aborted_by: Option<String>,

    /// One result per declared stage, in declaration order.
    pub results: Vec<StageResult>,

    /// Total duration in milliseconds.
    pub duration_ms: u64,
}

impl PipelineVerdict {
    /// Number of stages that passed.
    pub fn passed_count(&self) -> usize {
        self.results.iter().filter(|r| r.passed()).count()
    }

    /// Number of stages that failed.
    pub fn failed_count(&self) -> usize {
        self.results.iter().filter(|r| r.failed()).count()
    }

    pub fn skipped_count(&self) -> usize {
        self.results.iter().filter(|r| r.skipped()).count()
    }

    /// Stages skipped because of a fatal failure, in order.
    pub fn skipped_by_abort(&self) -> Vec<&str> {
        let Some(fatal) = &self.aborted_by else {
            return Vec::new();
        };
        self.results
            .iter()
            .skip_while(|r| &r.stage_name != fatal)
            .skip(1)
            .filter(|r| r.skipped())
            .map(|r| r.stage_name.as_str())
            .collect()
    }
}

/// Sequential stage pipeline.
pub struct Pipeline;

impl Pipeline {
    /// Run every declared stage, strictly in order.
    ///
    /// - a failed fatal stage stops execution; every later stage is recorded
    ///   as skipped
    /// - a failed non-fatal stage is recorded and the run continues
    /// - disabled stages are recorded as skipped and do not affect the verdict
    ///
    /// The verdict always contains exactly one result per declared stage.
    pub async fn run(stages: Vec<Stage>, observer: &dyn StageObserver) -> PipelineVerdict {
        let start = Instant::now();
        let started_at = Utc::now();
        let run_id = Uuid::new_v4().to_string();

        info!(run_id = %run_id, stages = stages.len(), "Starting check pipeline");

        let mut results = Vec::with_capacity(stages.len());
        let mut aborted_by: Option<String> = None;

        for stage in &stages {
            let result = if let Some(fatal) = &aborted_by {
                StageResult::skip(
                    &stage.name,
                    format!("not run: fatal stage '{}' failed", fatal),
                )
            } else if !stage.enabled {
                info!(stage = %stage.name, "Skipping disabled stage");
                StageResult::skip(&stage.name, "disabled")
            } else {
                info!(stage = %stage.name, fatal = stage.fatal, "Executing stage");
                observer.on_stage_start(&stage.name);

                let result = StageRunner::execute_stage(stage).await;
                if result.failed() && stage.fatal {
                    warn!(stage = %stage.name, detail = %result.detail, "Fatal stage failed, aborting");
                    aborted_by = Some(stage.name.clone());
                } else if result.failed() {
                    warn!(stage = %stage.name, detail = %result.detail, "Stage failed");
                }
                result
            };

            observer.on_stage_result(&result);
            results.push(result);
        }

        let all_passed = !results.iter().any(StageResult::failed);
        let duration_ms = start.elapsed().as_millis() as u64;

        if all_passed {
            info!(run_id = %run_id, duration_ms, "Check pipeline passed");
        } else {
            info!(run_id = %run_id, duration_ms, "Check pipeline failed");
        }

        PipelineVerdict {
            run_id,
            started_at,
            all_passed,
            aborted_by,
            results,
            duration_ms,
        }
    }
}
