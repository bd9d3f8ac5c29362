//! Per-tool calibration

use tracing::{debug, info};

use super::pacing::Pacing;
use super::probe::ProbeExecutor;
use super::types::{ProbeResult, ToolCalibrationOutcome, ToolProbeSpec};
use crate::strategy::Strategy;

/// Probes every strategy against a tool and ranks the results
#[derive(Clone)]
pub struct ToolCalibrator {
    executor: ProbeExecutor,
    pacing: Pacing,
}

impl ToolCalibrator {
    pub fn new(executor: ProbeExecutor, pacing: Pacing) -> Self {
        Self { executor, pacing }
    }

    pub fn executor(&self) -> &ProbeExecutor {
        &self.executor
    }

    /// Run one probe per strategy, in registration order, one at a time
    pub async fn calibrate_tool(&self, spec: &ToolProbeSpec) -> ToolCalibrationOutcome {
        debug!(tool = %spec.tool_name, server = %spec.server_name, "ToolCalibrator::calibrate_tool: called");
        let mut results: Vec<ProbeResult> = Vec::with_capacity(Strategy::ALL.len());

        for (i, strategy) in Strategy::ALL.into_iter().enumerate() {
            if i > 0 {
                self.pacing.after_probe().await;
            }
            let result = self.executor.probe(strategy, &spec.tool_name, &spec.parameters).await;
            results.push(result);
        }

        let outcome = ToolCalibrationOutcome::from_results(&spec.tool_name, &spec.server_name, results);
        if outcome.all_failed {
            info!(
                "Tool {} on {}: every strategy failed, falling back to {}",
                outcome.tool_name, outcome.server_name, outcome.best_strategy
            );
        } else {
            info!(
                "Tool {} on {}: best strategy {} ({}% success)",
                outcome.tool_name, outcome.server_name, outcome.best_strategy, outcome.success_rate
            );
        }
        outcome
    }
}
