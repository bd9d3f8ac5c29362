//! Calibration records
//!
//! Every record here is produced once and never mutated afterwards.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::strategy::{Parameters, Strategy};

/// One tool to calibrate, with the parameters every probe uses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolProbeSpec {
    pub tool_name: String,
    pub parameters: Parameters,
    pub server_name: String,
}

impl ToolProbeSpec {
    pub fn new(server_name: impl Into<String>, tool_name: impl Into<String>, parameters: Parameters) -> Self {
        Self {
            tool_name: tool_name.into(),
            parameters,
            server_name: server_name.into(),
        }
    }
}

/// Outcome of a single strategy probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeResult {
    pub strategy: Strategy,
    pub success: bool,
    pub duration_millis: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_summary: Option<String>,
}

impl ProbeResult {
    pub fn succeeded(strategy: Strategy, duration_millis: u64) -> Self {
        Self {
            strategy,
            success: true,
            duration_millis,
            error_summary: None,
        }
    }

    pub fn failed(strategy: Strategy, duration_millis: u64, error_summary: impl Into<String>) -> Self {
        Self {
            strategy,
            success: false,
            duration_millis,
            error_summary: Some(error_summary.into()),
        }
    }
}

/// Ranked result of probing every strategy against one tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCalibrationOutcome {
    pub tool_name: String,
    pub server_name: String,
    pub best_strategy: Strategy,
    pub all_failed: bool,
    /// Successful probes as an integer percentage of all probes
    pub success_rate: u32,
    pub results: Vec<ProbeResult>,
}

impl ToolCalibrationOutcome {
    /// Rank probe results and pick the winner
    ///
    /// The fastest success wins; equal durations go to the strategy
    /// registered first. Without any success the fallback is recommended.
    pub fn from_results(tool_name: &str, server_name: &str, results: Vec<ProbeResult>) -> Self {
        debug!(%tool_name, %server_name, result_count = results.len(), "ToolCalibrationOutcome::from_results: called");
        let successes = results.iter().filter(|r| r.success).count();

        let winner = results
            .iter()
            .filter(|r| r.success)
            .min_by_key(|r| (r.duration_millis, r.strategy.registration_index()))
            .map(|r| r.strategy);

        let success_rate = if results.is_empty() {
            0
        } else {
            (successes as f64 * 100.0 / results.len() as f64).round() as u32
        };

        Self {
            tool_name: tool_name.to_string(),
            server_name: server_name.to_string(),
            best_strategy: winner.unwrap_or(Strategy::FALLBACK),
            all_failed: winner.is_none(),
            success_rate,
            results,
        }
    }
}

/// Aggregated calibration of every tool on one server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerCalibrationReport {
    pub server_name: String,
    /// ISO-8601 time the report was assembled
    pub timestamp: String,
    pub tool_count: usize,
    pub outcomes: Vec<ToolCalibrationOutcome>,
    /// Winning strategy per tool; tools where everything failed are left out
    pub mapping: BTreeMap<String, Strategy>,
    /// How many tools each winning strategy serves (diagnostic only)
    pub strategy_distribution: BTreeMap<Strategy, usize>,
}

impl ServerCalibrationReport {
    pub fn from_outcomes(server_name: &str, timestamp: String, outcomes: Vec<ToolCalibrationOutcome>) -> Self {
        debug!(%server_name, outcome_count = outcomes.len(), "ServerCalibrationReport::from_outcomes: called");
        let mapping: BTreeMap<String, Strategy> = outcomes
            .iter()
            .filter(|o| !o.all_failed)
            .map(|o| (o.tool_name.clone(), o.best_strategy))
            .collect();

        let mut strategy_distribution = BTreeMap::new();
        for strategy in mapping.values() {
            *strategy_distribution.entry(*strategy).or_insert(0) += 1;
        }

        Self {
            server_name: server_name.to_string(),
            timestamp,
            tool_count: outcomes.len(),
            outcomes,
            mapping,
            strategy_distribution,
        }
    }

    /// Tools where no strategy succeeded
    pub fn failed_tools(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|o| o.all_failed)
            .map(|o| o.tool_name.as_str())
            .collect()
    }
}
