//! atlas-doctor pipeline - staged verification of a settings snapshot
//!
//! Provides a sequential stage pipeline that:
//! - Runs the load, configuration, connectivity and capability checks in order
//! - Stops at a failed fatal stage and records every later stage as skipped
//! - Turns action errors and panics into failed results

pub mod checks;
pub mod pipeline;
pub mod runner;
pub mod stage;

// Re-export key types
pub use checks::{CheckOptions, CheckPlan, ComponentStatus};
pub use pipeline::{NoopObserver, Pipeline, PipelineVerdict, StageObserver};
pub use runner::{StageResult, StageRunner, StageStatus};
pub use stage::{BuiltinStage, FnAction, Stage, StageAction, StageOutcome};
