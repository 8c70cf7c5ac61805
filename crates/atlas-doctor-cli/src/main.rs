//! atlas-doctor - configuration and connectivity doctor for the Jira and
//! Confluence tool server.
//!
//! ## Commands
//!
//! - `check`: run the staged configuration and connectivity checks
//! - `serve-stdio` / `serve-http`: run the tool server
//! - `install`: install the tool server's dependencies
//! - `tool`: describe a single tool

mod components;
mod report;
mod server;

use anyhow::{Context, Result};
use atlas_doctor_core::{init_tracing, SettingsSnapshot, ToolCatalog};
use atlas_doctor_installer::{
    ensure_installed_with, manifest_present, CommandTool, InstallObserver, NoopInstallObserver,
    DEFAULT_PACKAGES, DEFAULT_PYTHON,
};
use atlas_doctor_pipeline::{CheckOptions, NoopObserver, Pipeline, StageObserver};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tracing::{info, warn, Level};

use crate::components::{check_plan, read_only_mode, tool_catalog, READ_ONLY_VAR};
use crate::report::ConsoleReporter;
use crate::server::{ServerLauncher, Transport, DEFAULT_SERVER_COMMAND};

/// Exit code reported when the operator interrupts a run.
const EXIT_INTERRUPTED: u8 = 130;

#[derive(Parser, Debug)]
#[command(name = "atlas-doctor")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Check, run and install the Jira/Confluence tool server", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines and reports
    #[arg(long, global = true)]
    json: bool,

    /// Settings file loaded into the environment before anything else
    #[arg(long, global = true, env = "ATLAS_DOCTOR_ENV_FILE", default_value = ".env")]
    env_file: PathBuf,

    /// Tool server executable, optionally with leading arguments
    #[arg(
        long,
        global = true,
        env = "ATLAS_DOCTOR_SERVER_COMMAND",
        default_value = DEFAULT_SERVER_COMMAND
    )]
    server_command: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the configuration and connectivity checks
    Check {
        /// Skip the API connectivity stages
        #[arg(long)]
        skip_api: bool,

        /// Skip the tool listing stage
        #[arg(long)]
        skip_tools: bool,

        /// Per-stage time limit in seconds (0 disables it)
        #[arg(long, default_value = "60")]
        stage_timeout: u64,

        /// Also fetch this Jira issue, e.g. OPS-1
        #[arg(long, value_name = "KEY")]
        test_issue: Option<String>,

        /// Also run a Confluence page search
        #[arg(long)]
        test_page: bool,
    },

    /// Run the tool server over stdio
    ServeStdio,

    /// Run the tool server over streamable HTTP
    ServeHttp {
        /// Port to listen on
        #[arg(short, long, default_value = "8000")]
        port: u16,
    },

    /// Install the tool server's dependencies
    Install {
        /// Project manifest the preferred installer syncs from
        #[arg(long, default_value = "pyproject.toml")]
        manifest: PathBuf,

        /// Interpreter used for the per-package fallback
        #[arg(long, default_value = DEFAULT_PYTHON)]
        python: String,

        /// Packages installed by the fallback (default: the tool server's minimum set)
        #[arg(long = "package")]
        packages: Vec<String>,
    },

    /// Describe a single tool
    Tool {
        /// Tool name, e.g. jira_get_issue
        name: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Loaded before tracing so RUST_LOG may come from the settings file.
    let env_loaded = dotenvy::from_path(&cli.env_file);

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    init_tracing(cli.json, level);

    match env_loaded {
        Ok(()) => info!(path = %cli.env_file.display(), "Loaded environment from settings file"),
        Err(e) => warn!(
            path = %cli.env_file.display(),
            error = %e,
            "Settings file not loaded, using process environment"
        ),
    }

    tokio::select! {
        result = run(cli) => match result {
            Ok(code) => code,
            Err(e) => {
                eprintln!("Error: {:#}", e);
                ExitCode::FAILURE
            }
        },
        _ = tokio::signal::ctrl_c() => {
            eprintln!();
            eprintln!("Interrupted by user");
            ExitCode::from(EXIT_INTERRUPTED)
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let snapshot = SettingsSnapshot::capture();
    let read_only = read_only_mode(std::env::var(READ_ONLY_VAR).ok().as_deref());
    let launcher = ServerLauncher::new(cli.server_command);

    match cli.command {
        Commands::Check {
            skip_api,
            skip_tools,
            stage_timeout,
            test_issue,
            test_page,
        } => {
            let options = CheckOptions {
                skip_api,
                skip_tools,
                issue_key: test_issue,
                page_search: test_page,
                stage_timeout: (stage_timeout > 0).then(|| Duration::from_secs(stage_timeout)),
            };
            cmd_check(snapshot, read_only, options, &launcher, cli.json).await
        }
        Commands::ServeStdio => cmd_serve(&launcher, Transport::Stdio).await,
        Commands::ServeHttp { port } => {
            cmd_serve(&launcher, Transport::StreamableHttp { port }).await
        }
        Commands::Install {
            manifest,
            python,
            packages,
        } => cmd_install(&manifest, &python, packages, cli.json).await,
        Commands::Tool { name } => cmd_tool(&snapshot, read_only, &name, cli.json).await,
    }
}

fn exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

async fn cmd_check(
    snapshot: SettingsSnapshot,
    read_only: bool,
    options: CheckOptions,
    launcher: &ServerLauncher,
    json: bool,
) -> Result<ExitCode> {
    for auth in snapshot.services().into_iter().map(atlas_doctor_core::resolve) {
        info!(%auth, "Resolved service");
    }

    let stages = check_plan(snapshot, read_only, options, launcher)
        .await
        .stages();

    if json {
        let verdict = Pipeline::run(stages, &NoopObserver).await;
        println!("{}", serde_json::to_string_pretty(&verdict)?);
        return Ok(exit_code(verdict.all_passed));
    }

    println!("=== atlas-doctor check ===");
    let observer: &dyn StageObserver = &ConsoleReporter;
    let verdict = Pipeline::run(stages, observer).await;

    for line in report::summary_lines(&verdict) {
        println!("{}", line);
    }
    println!();
    for line in report::RECOMMENDATIONS {
        println!("{}", line);
    }

    Ok(exit_code(verdict.all_passed))
}

async fn cmd_serve(launcher: &ServerLauncher, transport: Transport) -> Result<ExitCode> {
    // stdout belongs to the protocol in stdio mode
    match transport {
        Transport::Stdio => eprintln!("Starting tool server over stdio. Press Ctrl+C to stop."),
        Transport::StreamableHttp { port } => {
            eprintln!("Tool server will be available at: http://localhost:{}/mcp", port);
            eprintln!("Press Ctrl+C to stop.");
        }
    }

    let status = launcher.run(transport).await?;
    Ok(match status.code() {
        Some(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
        None => ExitCode::FAILURE,
    })
}

async fn cmd_install(
    manifest: &Path,
    python: &str,
    packages: Vec<String>,
    json: bool,
) -> Result<ExitCode> {
    if !manifest_present(manifest) && !json {
        println!(
            "Warning: {} not found. Make sure you're in the project root directory.",
            manifest.display()
        );
    }

    let mut preferred = CommandTool::uv();
    if let Some(dir) = manifest.parent().filter(|d| !d.as_os_str().is_empty()) {
        preferred = preferred.in_dir(dir);
    }
    let fallback = CommandTool::pip(python);

    let packages = if packages.is_empty() {
        DEFAULT_PACKAGES.iter().map(|p| p.to_string()).collect()
    } else {
        packages
    };

    let observer: &dyn InstallObserver = if json {
        &NoopInstallObserver
    } else {
        println!("=== atlas-doctor install ===");
        &ConsoleReporter
    };

    let verdict = ensure_installed_with(&preferred, &fallback, &packages, observer).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&verdict)?);
    } else {
        for line in report::install_summary_lines(&verdict, "uv") {
            println!("{}", line);
        }
    }

    Ok(exit_code(verdict.succeeded()))
}

async fn cmd_tool(
    snapshot: &SettingsSnapshot,
    read_only: bool,
    name: &str,
    json: bool,
) -> Result<ExitCode> {
    let catalog = tool_catalog(snapshot, read_only).context("Failed to load tool catalog")?;
    let tools = catalog
        .list_tools()
        .await
        .context("Failed to list tools")?;

    let Some(tool) = tools.get(name) else {
        let available: Vec<&str> = tools.keys().map(String::as_str).collect();
        if json {
            let report = serde_json::json!({ "found": false, "name": name, "available": available });
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            println!("Tool '{}' not found", name);
            if available.is_empty() {
                println!("No tools available: configure Jira and/or Confluence credentials first");
            } else {
                println!("Available tools: {}", available.join(", "));
            }
        }
        return Ok(ExitCode::FAILURE);
    };

    if json {
        let report = serde_json::json!({
            "found": true,
            "name": name,
            "description": tool.description,
            "input_schema": tool.input_schema,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Tool found: {}", name);
        println!("Description: {}", tool.description);
        println!(
            "Parameters: {}",
            serde_json::to_string_pretty(&tool.input_schema)?
        );
    }

    Ok(ExitCode::SUCCESS)
}
