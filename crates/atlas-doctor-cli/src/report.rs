//! Human-readable console output.
//!
//! Rendering is kept in pure functions returning lines so it can be tested;
//! [`ConsoleReporter`] only prints them.

use atlas_doctor_core::ErrorKind;
use atlas_doctor_installer::{InstallObserver, InstallOutcome, InstallVerdict, ToolUsed};
use atlas_doctor_pipeline::{PipelineVerdict, StageObserver, StageResult, StageStatus};

/// Prints progress of a check or install run to stdout as it happens.
pub struct ConsoleReporter;

impl StageObserver for ConsoleReporter {
    fn on_stage_start(&self, stage_name: &str) {
        println!();
        println!("=== {} ===", stage_title(stage_name));
    }

    fn on_stage_result(&self, result: &StageResult) {
        for line in stage_lines(result) {
            println!("{}", line);
        }
    }
}

impl InstallObserver for ConsoleReporter {
    fn on_preferred_available(&self, tool: &str, version: &str) {
        println!("✓ {} is available: {}", tool, version);
        println!("Installing dependencies with {}...", tool);
    }

    fn on_preferred_skipped(&self, tool: &str, error: &ErrorKind) {
        println!("✗ {} not used: {}", tool, error);
        println!();
        println!("Installing packages one at a time...");
    }

    fn on_package_start(&self, package: &str) {
        println!("Installing {}...", package);
    }

    fn on_package_result(&self, outcome: &InstallOutcome) {
        println!("{}", package_line(outcome));
    }
}

/// Section title for a stage name, e.g. `connectivity:jira` -> `Connectivity (jira)`.
pub fn stage_title(stage_name: &str) -> String {
    let (base, qualifier) = match stage_name.split_once(':') {
        Some((base, qualifier)) => (base, Some(qualifier)),
        None => (stage_name, None),
    };

    let mut chars = base.chars();
    let mut title: String = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    };
    if let Some(qualifier) = qualifier {
        title.push_str(&format!(" ({})", qualifier));
    }
    title
}

/// Lines for one recorded stage.
pub fn stage_lines(result: &StageResult) -> Vec<String> {
    let mut lines = Vec::with_capacity(result.messages.len() + 1);
    match result.status {
        StageStatus::Passed => lines.push(format!("✓ {}", result.detail)),
        StageStatus::Failed => lines.push(format!("✗ {}", result.detail)),
        StageStatus::Skipped => {
            lines.push(format!("- {} skipped ({})", result.stage_name, result.detail));
            return lines;
        }
    }
    lines.extend(result.messages.iter().map(|m| format!("  {}", m)));
    lines
}

/// Closing block of a check run.
pub fn summary_lines(verdict: &PipelineVerdict) -> Vec<String> {
    let mut lines = vec![String::new()];

    if let Some(fatal) = &verdict.aborted_by {
        lines.push(format!(
            "✗ Fatal stage '{}' failed; skipped: {}",
            fatal,
            verdict.skipped_by_abort().join(", ")
        ));
    }

    lines.push(format!("Run ID: {}", verdict.run_id));
    lines.push(format!(
        "Status: {}",
        if verdict.all_passed {
            "✓ PASSED"
        } else {
            "✗ FAILED"
        }
    ));
    lines.push(format!("Duration: {}ms", verdict.duration_ms));
    lines.push(format!(
        "Summary: {}/{} stages passed, {} failed, {} skipped",
        verdict.passed_count(),
        verdict.results.len(),
        verdict.failed_count(),
        verdict.skipped_count()
    ));
    lines
}

pub const RECOMMENDATIONS: &[&str] = &[
    "=== Recommendations ===",
    "1. Run the tool server directly:",
    "   - atlas-doctor serve-stdio",
    "   - atlas-doctor serve-http --port 8000",
    "",
    "2. For debugging specific issues:",
    "   - Enable verbose logging: --verbose or RUST_LOG=debug",
    "   - Hide write tools: export READ_ONLY_MODE=true",
    "   - Inspect one tool: atlas-doctor tool <name>",
    "   - Deeper API checks: atlas-doctor check --test-issue <KEY> --test-page",
    "   - Tool server missing: atlas-doctor install",
    "",
    "3. For production deployment:",
    "   - Prefer personal tokens for self-hosted instances",
    "   - Keep credentials out of the settings file in shared checkouts",
];

pub fn package_line(outcome: &InstallOutcome) -> String {
    if outcome.succeeded {
        format!("✓ {} installed successfully", outcome.package_name)
    } else {
        format!(
            "✗ Failed to install {}: {}",
            outcome.package_name,
            outcome.error_text.as_deref().unwrap_or("unknown error")
        )
    }
}

/// Closing block of an install run, including follow-up hints.
pub fn install_summary_lines(verdict: &InstallVerdict, preferred: &str) -> Vec<String> {
    let mut lines = vec![String::new()];

    match (verdict.tool_used, verdict.succeeded()) {
        (ToolUsed::Preferred, _) => {
            lines.push(format!("✓ Dependencies installed with {}", preferred));
            lines.push("You can now run: atlas-doctor check --verbose".to_string());
        }
        (ToolUsed::Fallback, true) => {
            lines.push(format!(
                "✓ All {} packages installed",
                verdict.outcomes.len()
            ));
            lines.push("You can now run: atlas-doctor check --verbose".to_string());
            lines.push(String::new());
            lines.push(format!(
                "Note: for full functionality, consider installing {}:",
                preferred
            ));
            lines.push("  curl -LsSf https://astral.sh/uv/install.sh | sh".to_string());
        }
        (ToolUsed::Fallback, false) => {
            lines.push(format!(
                "✗ Failed to install: {}",
                verdict.failed_packages().join(", ")
            ));
            lines.push(format!(
                "Install them manually or make {} available and retry.",
                preferred
            ));
        }
    }
    lines
}
