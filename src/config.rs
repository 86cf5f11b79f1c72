#![allow(clippy::self_named_module_files)]

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub mod reader;
pub mod writer;

/// Name of the top-level field holding the server registry.
pub const SERVERS_FIELD: &str = "mcpServers";

/// Server name to opaque server definition, in document order.
pub type ServerRegistry = Map<String, Value>;

/// A plugin-server configuration file.
///
/// Only `mcpServers` is interpreted. Every other top-level field is carried
/// through `other` so a rewrite never drops settings this tool does not know.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ServerDocument {
    #[serde(rename = "mcpServers", default, skip_serializing_if = "Option::is_none")]
    pub mcp_servers: Option<ServerRegistry>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl ServerDocument {
    #[must_use]
    pub fn from_registry(registry: ServerRegistry) -> Self {
        Self { mcp_servers: Some(registry), other: Map::new() }
    }

    /// Number of servers in the document, zero when the field is absent.
    #[must_use]
    pub fn server_count(&self) -> usize {
        self.mcp_servers.as_ref().map_or(0, Map::len)
    }

    /// Consume the document and return its registry (empty when absent).
    #[must_use]
    pub fn into_registry(self) -> ServerRegistry {
        self.mcp_servers.unwrap_or_default()
    }
}
