//! Tool catalogs
//!
//! A catalog says which tools of a server to calibrate and with which
//! parameters. Servers either list their tools in config (`StaticCatalog`) or
//! have them discovered over MCP and sampled from their schemas (`McpCatalog`).

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::calibrate::{CalibrationError, ToolProbeSpec, sample_parameters};
use crate::config::{Config, StaticTool};
use crate::llm::ToolDefinition;
use crate::tools::ToolInvoker;

/// Ordered list of tools to calibrate for a server
#[async_trait]
pub trait ToolCatalog: Send + Sync {
    async fn probe_specs(&self, server: &str) -> Result<Vec<ToolProbeSpec>, CalibrationError>;
}

/// Tool lists taken verbatim from configuration
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    servers: BTreeMap<String, Vec<StaticTool>>,
}

impl StaticCatalog {
    pub fn new(servers: BTreeMap<String, Vec<StaticTool>>) -> Self {
        Self { servers }
    }

    /// Servers that carry a `tools` list in config
    pub fn from_config(config: &Config) -> Self {
        let servers = config
            .servers
            .iter()
            .filter_map(|(name, server)| server.tools.clone().map(|tools| (name.clone(), tools)))
            .collect();
        Self::new(servers)
    }

    pub fn contains(&self, server: &str) -> bool {
        self.servers.contains_key(server)
    }
}

#[async_trait]
impl ToolCatalog for StaticCatalog {
    async fn probe_specs(&self, server: &str) -> Result<Vec<ToolProbeSpec>, CalibrationError> {
        debug!(%server, "StaticCatalog::probe_specs: called");
        let tools = self.servers.get(server).ok_or_else(|| CalibrationError::UnknownServer {
            server: server.to_string(),
            known: self.servers.keys().cloned().collect(),
        })?;

        Ok(tools
            .iter()
            .map(|tool| ToolProbeSpec::new(server, &tool.name, tool.params.clone()))
            .collect())
    }
}

/// Tools discovered from a live provider, parameters sampled from schemas
pub struct McpCatalog {
    invoker: Arc<dyn ToolInvoker>,
}

impl McpCatalog {
    pub fn new(invoker: Arc<dyn ToolInvoker>) -> Self {
        Self { invoker }
    }
}

#[async_trait]
impl ToolCatalog for McpCatalog {
    async fn probe_specs(&self, server: &str) -> Result<Vec<ToolProbeSpec>, CalibrationError> {
        debug!(%server, "McpCatalog::probe_specs: called");
        let tools = self
            .invoker
            .list_tools()
            .await
            .map_err(|source| CalibrationError::Discovery {
                server: server.to_string(),
                source,
            })?;
        Ok(specs_from_definitions(server, &tools))
    }
}

/// One probe spec per tool definition, in listing order
pub fn specs_from_definitions(server: &str, tools: &[ToolDefinition]) -> Vec<ToolProbeSpec> {
    tools
        .iter()
        .map(|tool| ToolProbeSpec::new(server, &tool.name, sample_parameters(&tool.input_schema)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use crate::tools::mock::MockToolInvoker;
    use serde_json::{Map, json};

    fn config() -> Config {
        let mut config = Config::default();
        let mut params = Map::new();
        params.insert("path".to_string(), json!("/srv/data"));
        config.servers.insert(
            "filesystem".to_string(),
            ServerConfig {
                command: "mcp-fs".to_string(),
                tools: Some(vec![
                    StaticTool {
                        name: "list_allowed_directories".to_string(),
                        params: Map::new(),
                    },
                    StaticTool {
                        name: "get_file_info".to_string(),
                        params,
                    },
                ]),
                ..Default::default()
            },
        );
        config.servers.insert(
            "github".to_string(),
            ServerConfig {
                command: "mcp-gh".to_string(),
                ..Default::default()
            },
        );
        config
    }

    #[tokio::test]
    async fn test_static_catalog_keeps_config_order() {
        let catalog = StaticCatalog::from_config(&config());
        assert!(catalog.contains("filesystem"));
        assert!(!catalog.contains("github"));

        let specs = catalog.probe_specs("filesystem").await.unwrap();
        let names: Vec<&str> = specs.iter().map(|s| s.tool_name.as_str()).collect();
        assert_eq!(names, vec!["list_allowed_directories", "get_file_info"]);
        assert_eq!(specs[1].parameters["path"], json!("/srv/data"));
        assert!(specs.iter().all(|s| s.server_name == "filesystem"));
    }

    #[tokio::test]
    async fn test_static_catalog_unknown_server() {
        let catalog = StaticCatalog::from_config(&config());
        match catalog.probe_specs("tavily").await.unwrap_err() {
            CalibrationError::UnknownServer { server, known } => {
                assert_eq!(server, "tavily");
                assert_eq!(known, vec!["filesystem"]);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn test_mcp_catalog_samples_schemas() {
        let invoker = Arc::new(MockToolInvoker::new(vec![
            ToolDefinition::new("list_allowed_directories", "", json!({ "type": "object", "properties": {} })),
            ToolDefinition::new(
                "search_files",
                "",
                json!({
                    "type": "object",
                    "properties": {
                        "path": { "type": "string" },
                        "pattern": { "type": "string" },
                        "excludePatterns": { "type": "array", "items": { "type": "string" } }
                    },
                    "required": ["path", "pattern"]
                }),
            ),
        ]));

        let specs = McpCatalog::new(invoker).probe_specs("filesystem").await.unwrap();

        assert_eq!(specs.len(), 2);
        assert!(specs[0].parameters.is_empty());
        assert_eq!(specs[1].tool_name, "search_files");
        assert_eq!(specs[1].parameters["path"], json!("/tmp"));
        assert_eq!(specs[1].parameters["pattern"], json!("test"));
        assert!(!specs[1].parameters.contains_key("excludePatterns"));
    }
}
