//! Per-server calibration

use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use tracing::{debug, info, warn};

use super::pacing::Pacing;
use super::probe::ProbeExecutor;
use super::tool::ToolCalibrator;
use super::types::{ServerCalibrationReport, ToolCalibrationOutcome, ToolProbeSpec};
use crate::agent::AgentRuntime;
use crate::config::CalibrationConfig;

/// Calibrates every tool of one server and aggregates a report
pub struct ServerCalibrator {
    tools: ToolCalibrator,
    runtime: Arc<dyn AgentRuntime>,
    pacing: Pacing,
}

impl ServerCalibrator {
    pub fn new(runtime: Arc<dyn AgentRuntime>, pacing: Pacing) -> Self {
        let executor = ProbeExecutor::new(Arc::clone(&runtime));
        Self::with_executor(executor, pacing)
    }

    /// Calibrator using the probe limits and pauses from config
    pub fn from_config(runtime: Arc<dyn AgentRuntime>, config: &CalibrationConfig) -> Self {
        let executor = ProbeExecutor::new(Arc::clone(&runtime))
            .with_step_budget(config.step_budget)
            .with_max_error_chars(config.max_error_chars);
        Self::with_executor(executor, config.pacing())
    }

    pub fn with_executor(executor: ProbeExecutor, pacing: Pacing) -> Self {
        let runtime = Arc::clone(executor.runtime());
        Self {
            tools: ToolCalibrator::new(executor, pacing),
            runtime,
            pacing,
        }
    }

    /// Calibrate `catalog` in order, then tear the runtime down once
    pub async fn calibrate_server(&self, server: &str, catalog: &[ToolProbeSpec]) -> ServerCalibrationReport {
        debug!(%server, tool_count = catalog.len(), "ServerCalibrator::calibrate_server: called");
        info!("Calibrating {} tools on server {}", catalog.len(), server);

        let mut outcomes: Vec<ToolCalibrationOutcome> = Vec::with_capacity(catalog.len());
        for (i, spec) in catalog.iter().enumerate() {
            if i > 0 {
                self.pacing.after_tool().await;
            }
            outcomes.push(self.tools.calibrate_tool(spec).await);
        }

        if let Err(e) = self.runtime.teardown().await {
            warn!("Teardown after calibrating {} failed: {}", server, e);
        }

        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        let report = ServerCalibrationReport::from_outcomes(server, timestamp, outcomes);
        info!(
            "Server {} calibrated: {} of {} tools mapped",
            server,
            report.mapping.len(),
            report.tool_count
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::mock::{Scripted, ScriptedRuntime};
    use crate::strategy::{Parameters, Strategy};
    use serde_json::json;
    use std::time::Duration;

    fn catalog() -> Vec<ToolProbeSpec> {
        let mut path = Parameters::new();
        path.insert("path".to_string(), json!("/tmp"));
        vec![
            ToolProbeSpec::new("filesystem", "list_allowed_directories", Parameters::new()),
            ToolProbeSpec::new("filesystem", "get_file_info", path),
        ]
    }

    fn runtime() -> ScriptedRuntime {
        // Only list_allowed_directories ever succeeds
        ScriptedRuntime::new()
            .calling("list_allowed_directories")
            .on(
                "Follow these steps:\n1. Select the `list_allowed_directories`",
                Scripted::Succeed {
                    after: Duration::from_millis(5),
                },
            )
            .on(
                "Execute the `list_allowed_directories`",
                Scripted::Succeed {
                    after: Duration::from_millis(80),
                },
            )
    }

    #[tokio::test]
    async fn test_report_maps_successful_tools_only() {
        let runtime = Arc::new(runtime());
        let calibrator = ServerCalibrator::new(runtime.clone(), Pacing::none());

        let report = calibrator.calibrate_server("filesystem", &catalog()).await;

        assert_eq!(report.server_name, "filesystem");
        assert_eq!(report.tool_count, 2);
        assert_eq!(report.outcomes[0].tool_name, "list_allowed_directories");
        assert_eq!(report.outcomes[1].tool_name, "get_file_info");

        assert_eq!(report.mapping.len(), 1);
        assert_eq!(report.mapping["list_allowed_directories"], Strategy::StepByStep);
        assert!(report.outcomes[1].all_failed);
        assert_eq!(report.outcomes[1].best_strategy, Strategy::Imperative);
        assert_eq!(report.strategy_distribution[&Strategy::StepByStep], 1);
        assert_eq!(report.failed_tools(), vec!["get_file_info"]);
        assert_eq!(runtime.instructions().len(), 10);
    }

    #[tokio::test]
    async fn test_teardown_called_once() {
        let runtime = Arc::new(runtime());
        let calibrator = ServerCalibrator::new(runtime.clone(), Pacing::none());

        calibrator.calibrate_server("filesystem", &catalog()).await;
        assert_eq!(runtime.teardown_count(), 1);
    }

    #[tokio::test]
    async fn test_teardown_failure_does_not_abort() {
        let runtime = Arc::new(runtime().failing_teardown());
        let calibrator = ServerCalibrator::new(runtime.clone(), Pacing::none());

        let report = calibrator.calibrate_server("filesystem", &catalog()).await;
        assert_eq!(report.mapping.len(), 1);
        assert_eq!(runtime.teardown_count(), 1);
    }

    #[tokio::test]
    async fn test_empty_catalog() {
        let runtime = Arc::new(ScriptedRuntime::new());
        let calibrator = ServerCalibrator::new(runtime.clone(), Pacing::none());

        let report = calibrator.calibrate_server("empty", &[]).await;
        assert_eq!(report.tool_count, 0);
        assert!(report.mapping.is_empty());
        assert_eq!(runtime.teardown_count(), 1);
    }

    #[tokio::test]
    async fn test_from_config_uses_step_budget() {
        let runtime = Arc::new(ScriptedRuntime::new());
        let config = CalibrationConfig {
            step_budget: 1,
            probe_pause_ms: 0,
            tool_pause_ms: 0,
            server_pause_ms: 0,
            max_error_chars: 10,
        };
        let calibrator = ServerCalibrator::from_config(runtime.clone(), &config);

        let report = calibrator.calibrate_server("s", &catalog()[..1]).await;

        assert!(runtime.instructions().iter().all(|(_, budget)| *budget == 1));
        let summary = report.outcomes[0].results[0].error_summary.clone().unwrap();
        assert_eq!(summary.chars().count(), 10);
    }

    #[tokio::test]
    async fn test_timestamp_is_iso8601() {
        let calibrator = ServerCalibrator::new(Arc::new(ScriptedRuntime::new()), Pacing::none());
        let report = calibrator.calibrate_server("s", &[]).await;
        assert!(chrono::DateTime::parse_from_rfc3339(&report.timestamp).is_ok());
    }
}
