//! In-memory installer tool (testing only)

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::InstallError;
use crate::tool::InstallTool;
use crate::Result;

// ---------------------------------------------------------------------------
// FakeInstallTool
// ---------------------------------------------------------------------------

/// Tool with scripted availability, sync result and per-package failures.
///
/// Records every package it was asked to install, successful or not.
#[derive(Debug)]
pub struct FakeInstallTool {
    name: String,
    version: Option<String>,
    sync_error: Option<String>,
    failing: HashSet<String>,
    installed: Mutex<Vec<String>>,
}

impl FakeInstallTool {
    pub fn available(name: &str, version: &str) -> Self {
        Self {
            name: name.to_string(),
            version: Some(version.to_string()),
            sync_error: None,
            failing: HashSet::new(),
            installed: Mutex::new(Vec::new()),
        }
    }

    pub fn unavailable(name: &str) -> Self {
        Self {
            version: None,
            ..Self::available(name, "")
        }
    }

    pub fn failing_sync(mut self, stderr: &str) -> Self {
        self.sync_error = Some(stderr.to_string());
        self
    }

    pub fn failing_package(mut self, package: &str) -> Self {
        self.failing.insert(package.to_string());
        self
    }

    /// Packages passed to `install`, in call order.
    pub fn installed(&self) -> Vec<String> {
        self.installed.lock().unwrap().clone()
    }
}

#[async_trait]
impl InstallTool for FakeInstallTool {
    fn name(&self) -> &str {
        &self.name
    }

    async fn version(&self) -> Result<String> {
        self.version.clone().ok_or_else(|| InstallError::Unavailable {
            tool: self.name.clone(),
            reason: "not installed".to_string(),
        })
    }

    async fn sync(&self) -> Result<()> {
        match &self.sync_error {
            Some(stderr) => Err(InstallError::CommandFailed {
                command: format!("{} sync", self.name),
                status: "exit status: 1".to_string(),
                stderr: stderr.clone(),
            }),
            None => Ok(()),
        }
    }

    async fn install(&self, package: &str) -> Result<()> {
        self.installed.lock().unwrap().push(package.to_string());
        if self.failing.contains(package) {
            return Err(InstallError::CommandFailed {
                command: format!("{} install {}", self.name, package),
                status: "exit status: 1".to_string(),
                stderr: format!("could not find {}", package),
            });
        }
        Ok(())
    }
}
