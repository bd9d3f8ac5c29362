//! End-to-end calibration of configured servers
//!
//! Owns the tool provider connection for each server: connect, build the
//! catalog, calibrate, persist. Servers are handled strictly one at a time.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use eyre::{Context, Result};
use tracing::{debug, info, warn};

use crate::agent::LlmAgentRuntime;
use crate::calibrate::{CalibrationError, ServerCalibrationReport, ServerCalibrator};
use crate::catalog::{McpCatalog, StaticCatalog, ToolCatalog};
use crate::config::{Config, ServerConfig};
use crate::llm::LlmClient;
use crate::mapping::MappingStore;
use crate::mcp::McpClient;
use crate::tools::{ToolError, ToolInvoker};

/// Opens a tool provider connection for a configured server
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, server: &str, config: &ServerConfig) -> Result<Arc<dyn ToolInvoker>, ToolError>;
}

/// Connects over MCP stdio
#[derive(Debug, Clone, Copy, Default)]
pub struct McpConnector;

#[async_trait]
impl Connector for McpConnector {
    async fn connect(&self, server: &str, config: &ServerConfig) -> Result<Arc<dyn ToolInvoker>, ToolError> {
        let client: Arc<dyn ToolInvoker> = Arc::new(McpClient::connect(server, config).await?);
        Ok(client)
    }
}

/// Per-invocation options
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Calibrate and report, but leave the mapping document alone
    pub dry_run: bool,
}

/// Calibrates configured servers and records the results
pub struct CalibrationRunner {
    config: Config,
    llm: Arc<dyn LlmClient>,
    connector: Arc<dyn Connector>,
    store: MappingStore,
}

impl CalibrationRunner {
    pub fn new(config: Config, llm: Arc<dyn LlmClient>) -> Self {
        Self::with_connector(config, llm, Arc::new(McpConnector))
    }

    pub fn with_connector(config: Config, llm: Arc<dyn LlmClient>, connector: Arc<dyn Connector>) -> Self {
        let store = MappingStore::new(config.storage.mapping_path.clone());
        Self {
            config,
            llm,
            connector,
            store,
        }
    }

    pub fn store(&self) -> &MappingStore {
        &self.store
    }

    /// Config for `server`, or an error naming every known server
    pub fn server_config(&self, server: &str) -> Result<&ServerConfig, CalibrationError> {
        self.config.server(server)
    }

    /// Connect, calibrate and persist one server
    pub async fn run_server(&self, server: &str, options: &RunOptions) -> Result<ServerCalibrationReport> {
        debug!(%server, dry_run = options.dry_run, "CalibrationRunner::run_server: called");
        let server_config = self.server_config(server)?;

        let invoker = self
            .connector
            .connect(server, server_config)
            .await
            .map_err(|source| CalibrationError::Connect {
                server: server.to_string(),
                source,
            })?;

        let catalog = self.catalog_for(server, &invoker);
        let specs = match catalog.probe_specs(server).await {
            Ok(specs) => specs,
            Err(e) => {
                if let Err(e) = invoker.shutdown().await {
                    warn!("Shutdown of {} after catalog failure: {}", server, e);
                }
                return Err(e.into());
            }
        };

        let runtime = match LlmAgentRuntime::discover(
            Arc::clone(&self.llm),
            Arc::clone(&invoker),
            self.config.llm.max_tokens,
        )
        .await
        {
            Ok(runtime) => runtime,
            Err(source) => {
                if let Err(e) = invoker.shutdown().await {
                    warn!("Shutdown of {} after failed discovery: {}", server, e);
                }
                return Err(CalibrationError::Agent {
                    server: server.to_string(),
                    source,
                }
                .into());
            }
        };

        let calibrator = ServerCalibrator::from_config(Arc::new(runtime), &self.config.calibration);
        let report = calibrator.calibrate_server(server, &specs).await;

        if options.dry_run {
            info!("Dry run: mapping for {} not saved", server);
        } else {
            self.store.persist(server, &report.mapping)?;
        }

        if let Some(dir) = &self.config.storage.reports_dir {
            let path = report_file_name(dir, &report);
            write_report(&path, &report)?;
        }

        Ok(report)
    }

    /// Calibrate every configured server in name order
    ///
    /// A server that fails to connect is logged and skipped; the others
    /// still run.
    pub async fn run_all(&self, options: &RunOptions) -> Result<Vec<ServerCalibrationReport>> {
        let names = self.config.server_names();
        debug!(server_count = names.len(), "CalibrationRunner::run_all: called");
        let pacing = self.config.calibration.pacing();

        let mut reports = Vec::with_capacity(names.len());
        for (i, server) in names.iter().enumerate() {
            if i > 0 {
                pacing.after_server().await;
            }
            match self.run_server(server, options).await {
                Ok(report) => reports.push(report),
                Err(e) => warn!("Skipping server {}: {:#}", server, e),
            }
        }
        Ok(reports)
    }

    /// Config-listed tools when the server has them, else tools discovered
    /// over the live connection
    fn catalog_for(&self, server: &str, invoker: &Arc<dyn ToolInvoker>) -> Box<dyn ToolCatalog> {
        let statics = StaticCatalog::from_config(&self.config);
        if statics.contains(server) {
            debug!(%server, "CalibrationRunner::catalog_for: using static catalog");
            return Box::new(statics);
        }
        debug!(%server, "CalibrationRunner::catalog_for: sampling discovered tools");
        Box::new(McpCatalog::new(Arc::clone(invoker)))
    }
}

/// `<dir>/<server>-<timestamp>.json`
pub fn report_file_name(dir: &Path, report: &ServerCalibrationReport) -> PathBuf {
    let stamp: String = report
        .timestamp
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();
    dir.join(format!("{}-{}.json", report.server_name, stamp))
}

/// Write a report as pretty JSON, creating parent directories
pub fn write_report<T: serde::Serialize + ?Sized>(path: &Path, report: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).context("Failed to create report directory")?;
    }
    let json = serde_json::to_string_pretty(report).context("Failed to encode report")?;
    std::fs::write(path, json).with_context(|| format!("Failed to write report to {}", path.display()))?;
    info!("Wrote report to {}", path.display());
    Ok(())
}
