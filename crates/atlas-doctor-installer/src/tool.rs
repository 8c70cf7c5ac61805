//! Installer tool abstraction and its process-backed implementation.

use crate::error::InstallError;
use crate::Result;
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::{Output, Stdio};
use tokio::process::Command;
use tracing::debug;

/// Default preferred installer executable.
pub const DEFAULT_PREFERRED: &str = "uv";

/// Default interpreter driving the fallback installer.
pub const DEFAULT_PYTHON: &str = "python3";

/// Packages installed one by one when the preferred tool cannot sync.
pub const DEFAULT_PACKAGES: &[&str] = &[
    "python-dotenv",
    "click",
    "requests",
    "pydantic",
    "atlassian-python-api",
    "mcp",
];

/// An installation mechanism.
#[async_trait]
pub trait InstallTool: Send + Sync {
    /// Tool name for reports.
    fn name(&self) -> &str;

    /// Identity query. `Err(Unavailable)` when the tool cannot be used.
    async fn version(&self) -> Result<String>;

    /// Install everything the project manifest declares, in one go.
    async fn sync(&self) -> Result<()>;

    /// Install a single package.
    async fn install(&self, package: &str) -> Result<()>;
}

/// An [`InstallTool`] that shells out to an executable.
///
/// Each operation is an argument list appended to `program` and `prefix`.
/// Operations without an argument list are reported as unsupported.
#[derive(Debug, Clone)]
pub struct CommandTool {
    name: String,
    program: PathBuf,
    prefix: Vec<String>,
    version_args: Option<Vec<String>>,
    sync_args: Option<Vec<String>>,
    install_args: Option<Vec<String>>,
    working_dir: Option<PathBuf>,
}

fn strings(args: &[&str]) -> Vec<String> {
    args.iter().map(|s| s.to_string()).collect()
}

impl CommandTool {
    /// A tool running `program` with no operations configured.
    pub fn new(name: impl Into<String>, program: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
            prefix: Vec::new(),
            version_args: None,
            sync_args: None,
            install_args: None,
            working_dir: None,
        }
    }

    /// `uv --version` / `uv sync` / `uv pip install <pkg>`.
    pub fn uv() -> Self {
        Self::new("uv", DEFAULT_PREFERRED)
            .with_version_args(&["--version"])
            .with_sync_args(&["sync"])
            .with_install_args(&["pip", "install"])
    }

    /// `python3 -m pip install <pkg>`, using the given interpreter.
    pub fn pip(python: impl Into<PathBuf>) -> Self {
        Self::new("pip", python)
            .with_prefix(&["-m", "pip"])
            .with_version_args(&["--version"])
            .with_install_args(&["install"])
    }

    pub fn with_prefix(mut self, prefix: &[&str]) -> Self {
        self.prefix = strings(prefix);
        self
    }

    pub fn with_version_args(mut self, args: &[&str]) -> Self {
        self.version_args = Some(strings(args));
        self
    }

    pub fn with_sync_args(mut self, args: &[&str]) -> Self {
        self.sync_args = Some(strings(args));
        self
    }

    /// Arguments placed before the package name.
    pub fn with_install_args(mut self, args: &[&str]) -> Self {
        self.install_args = Some(strings(args));
        self
    }

    /// Run every command from `dir`.
    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    fn describe(&self, args: &[String]) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.prefix.iter().cloned());
        parts.extend(args.iter().cloned());
        parts.join(" ")
    }

    async fn output(&self, args: &[String]) -> std::io::Result<Output> {
        debug!(command = %self.describe(args), "Running installer command");

        let mut command = Command::new(&self.program);
        command
            .args(&self.prefix)
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true);
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }
        command.output().await
    }

    async fn run(&self, args: &[String]) -> Result<Output> {
        let output = self.output(args).await?;
        if output.status.success() {
            Ok(output)
        } else {
            Err(InstallError::CommandFailed {
                command: self.describe(args),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }

    fn unsupported(&self, operation: &'static str) -> InstallError {
        InstallError::Unsupported {
            tool: self.name.clone(),
            operation,
        }
    }
}

#[async_trait]
impl InstallTool for CommandTool {
    fn name(&self) -> &str {
        &self.name
    }

    async fn version(&self) -> Result<String> {
        let args = self.version_args.as_ref().ok_or_else(|| InstallError::Unavailable {
            tool: self.name.clone(),
            reason: "no version query configured".to_string(),
        })?;

        let unavailable = |reason: String| InstallError::Unavailable {
            tool: self.name.clone(),
            reason,
        };

        let output = self.output(args).await.map_err(|e| unavailable(e.to_string()))?;
        if !output.status.success() {
            return Err(unavailable(format!("version query exited with {}", output.status)));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout.lines().next().unwrap_or_default().trim().to_string())
    }

    async fn sync(&self) -> Result<()> {
        let args = self.sync_args.as_ref().ok_or_else(|| self.unsupported("sync"))?;
        self.run(args).await.map(|_| ())
    }

    async fn install(&self, package: &str) -> Result<()> {
        let mut args = self
            .install_args
            .clone()
            .ok_or_else(|| self.unsupported("install"))?;
        args.push(package.to_string());
        self.run(&args).await.map(|_| ())
    }
}
