//! Tool catalog exposed by the tool server.
//!
//! The server's own protocol is opaque to atlas-doctor; all we need is the
//! mapping of tool name to description and input schema. The shipped
//! [`BuiltinToolCatalog`] is loaded from an embedded manifest and filtered the
//! same way the server filters its tools: by configured service and, in
//! read-only mode, by dropping tools that write.

use crate::error::CatalogError;
use crate::settings::ServiceKind;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};

const MANIFEST: &str = include_str!("tools.json");

/// Description of one callable tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub description: String,
    pub input_schema: Value,
}

/// Source of the available tools.
#[async_trait]
pub trait ToolCatalog: Send + Sync {
    /// All tools, keyed (and therefore ordered) by name.
    async fn list_tools(&self) -> Result<BTreeMap<String, ToolDescriptor>, CatalogError>;
}

#[derive(Debug, Clone, Deserialize)]
struct ManifestEntry {
    name: String,
    service: ServiceKind,
    #[serde(default)]
    write: bool,
    description: String,
    input_schema: Value,
}

/// Catalog backed by the manifest compiled into the binary.
#[derive(Debug, Clone)]
pub struct BuiltinToolCatalog {
    tools: BTreeMap<String, ToolDescriptor>,
}

impl BuiltinToolCatalog {
    /// Load the embedded manifest, keeping tools of `services` only.
    pub fn load(services: &[ServiceKind], read_only: bool) -> Result<Self, CatalogError> {
        Self::from_manifest(MANIFEST, services, read_only)
    }

    fn from_manifest(
        manifest: &str,
        services: &[ServiceKind],
        read_only: bool,
    ) -> Result<Self, CatalogError> {
        let entries: Vec<ManifestEntry> = serde_json::from_str(manifest)?;

        let mut seen = HashSet::new();
        let mut tools = BTreeMap::new();
        for entry in entries {
            if !seen.insert(entry.name.clone()) {
                return Err(CatalogError::DuplicateTool(entry.name));
            }
            if !services.contains(&entry.service) || (read_only && entry.write) {
                continue;
            }
            tools.insert(
                entry.name,
                ToolDescriptor {
                    description: entry.description,
                    input_schema: entry.input_schema,
                },
            );
        }

        Ok(Self { tools })
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[async_trait]
impl ToolCatalog for BuiltinToolCatalog {
    async fn list_tools(&self) -> Result<BTreeMap<String, ToolDescriptor>, CatalogError> {
        Ok(self.tools.clone())
    }
}
