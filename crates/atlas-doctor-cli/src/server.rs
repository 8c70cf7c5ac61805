//! Launching the external tool server.

use anyhow::{bail, Context, Result};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info};

/// Default tool server executable.
pub const DEFAULT_SERVER_COMMAND: &str = "mcp-atlassian";

/// Upper bound on `--version`; a `uv run` wrapper may sync first.
const VERSION_TIMEOUT: Duration = Duration::from_secs(30);

/// How the tool server talks to its client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Stdio,
    StreamableHttp { port: u16 },
}

impl Transport {
    /// Arguments selecting this transport on the server command line.
    pub fn args(&self) -> Vec<String> {
        match self {
            Transport::Stdio => vec!["--transport".to_string(), "stdio".to_string()],
            Transport::StreamableHttp { port } => vec![
                "--transport".to_string(),
                "streamable-http".to_string(),
                "--port".to_string(),
                port.to_string(),
            ],
        }
    }
}

/// Runs the tool server as a child process with inherited stdio.
#[derive(Debug, Clone)]
pub struct ServerLauncher {
    command: String,
}

impl ServerLauncher {
    /// `command` may carry leading arguments, e.g. `uv run mcp-atlassian`.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    fn split(&self) -> Result<(String, Vec<String>)> {
        let mut words = self.command.split_whitespace().map(str::to_string);
        let program = words.next().context("Tool server command is empty")?;
        Ok((program, words.collect()))
    }

    /// Program and full argument list for `transport`.
    pub fn command_line(&self, transport: Transport) -> Result<(String, Vec<String>)> {
        let (program, mut args) = self.split()?;
        args.extend(transport.args());
        Ok((program, args))
    }

    /// Run the server with `--version` and return the first line it prints.
    ///
    /// Fails when the program cannot be started, exits unsuccessfully or
    /// does not finish in time.
    pub async fn version(&self) -> Result<String> {
        let (program, mut args) = self.split()?;
        args.push("--version".to_string());
        debug!(program = %program, args = ?args, "Querying tool server version");

        let output = Command::new(&program)
            .args(&args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output();
        let output = tokio::time::timeout(VERSION_TIMEOUT, output)
            .await
            .with_context(|| {
                format!(
                    "'{}' did not answer --version within {}s",
                    program,
                    VERSION_TIMEOUT.as_secs()
                )
            })?
            .with_context(|| format!("Failed to start tool server '{}'", program))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() {
            bail!(
                "'{}' --version exited with {}: {}",
                program,
                output.status,
                stderr.trim()
            );
        }

        Ok(stdout
            .lines()
            .chain(stderr.lines())
            .map(str::trim)
            .find(|line| !line.is_empty())
            .unwrap_or("version unknown")
            .to_string())
    }

    /// Run until the server exits. Dropping the future kills the child.
    pub async fn run(&self, transport: Transport) -> Result<ExitStatus> {
        let (program, args) = self.command_line(transport)?;
        info!(program = %program, args = ?args, "Starting tool server");

        let status = Command::new(&program)
            .args(&args)
            .kill_on_drop(true)
            .status()
            .await
            .with_context(|| format!("Failed to start tool server '{}'", program))?;

        info!(status = %status, "Tool server exited");
        Ok(status)
    }
}
