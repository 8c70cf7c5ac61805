//! Construction of the components the check stages depend on.

use atlas_doctor_core::{
    resolve, BuiltinToolCatalog, ErrorKind, HttpClientFactory, ServiceKind, ServiceProbe,
    SettingsSnapshot, ToolCatalog, DEFAULT_TIMEOUT,
};
use atlas_doctor_pipeline::{CheckOptions, CheckPlan, ComponentStatus};
use std::sync::Arc;

use crate::server::ServerLauncher;

/// Variable enabling the tool server's read-only mode.
pub const READ_ONLY_VAR: &str = "READ_ONLY_MODE";

/// Whether a `READ_ONLY_MODE` value switches read-only mode on.
pub fn read_only_mode(value: Option<&str>) -> bool {
    matches!(
        value.map(|v| v.trim().to_ascii_lowercase()).as_deref(),
        Some("true" | "1" | "yes" | "on")
    )
}

/// Services with a URL and credentials, the ones the tool server exposes.
pub fn configured_services(snapshot: &SettingsSnapshot) -> Vec<ServiceKind> {
    snapshot
        .services()
        .into_iter()
        .map(resolve)
        .filter(|auth| auth.is_configured())
        .map(|auth| auth.service())
        .collect()
}

/// Tool catalog as the tool server would present it for this snapshot.
pub fn tool_catalog(
    snapshot: &SettingsSnapshot,
    read_only: bool,
) -> Result<BuiltinToolCatalog, ErrorKind> {
    BuiltinToolCatalog::load(&configured_services(snapshot), read_only).map_err(|e| e.kind())
}

/// Whether the tool server the serve commands launch can actually run.
pub async fn server_status(launcher: &ServerLauncher) -> ComponentStatus {
    match launcher.version().await {
        Ok(version) => ComponentStatus::loaded("tool server", version),
        Err(e) => ComponentStatus::failed("tool server", ErrorKind::Load(format!("{:#}", e))),
    }
}

/// Build every component and wrap them into a plan. Construction failures
/// are recorded for the load stage, never raised.
pub async fn check_plan(
    snapshot: SettingsSnapshot,
    read_only: bool,
    options: CheckOptions,
    launcher: &ServerLauncher,
) -> CheckPlan {
    let probe = HttpClientFactory::new(DEFAULT_TIMEOUT)
        .map(|factory| ServiceProbe::new(Arc::new(factory)))
        .map_err(|e| ErrorKind::Load(format!("HTTP client: {}", e)));

    let probe_status = match &probe {
        Ok(_) => ComponentStatus::loaded(
            "http client",
            format!("timeout {}s", DEFAULT_TIMEOUT.as_secs()),
        ),
        Err(e) => ComponentStatus::failed("http client", e.clone()),
    };

    let catalog = tool_catalog(&snapshot, read_only);
    let catalog_status = match &catalog {
        Ok(catalog) => ComponentStatus::loaded(
            "tool catalog",
            format!(
                "{} tools{}",
                catalog.len(),
                if read_only { ", read-only" } else { "" }
            ),
        ),
        Err(e) => ComponentStatus::failed("tool catalog", e.clone()),
    };

    CheckPlan {
        snapshot,
        components: vec![probe_status, catalog_status, server_status(launcher).await],
        probe,
        catalog: catalog.map(|c| Arc::new(c) as Arc<dyn ToolCatalog>),
        options,
    }
}
