//! Single-strategy probes

use std::sync::Arc;
use std::time::Instant;

use tracing::debug;

use super::types::ProbeResult;
use crate::agent::AgentRuntime;
use crate::strategy::{Parameters, Strategy};

/// Default model turns allowed per probe
pub const DEFAULT_STEP_BUDGET: u32 = 2;

/// Default cap on recorded error summaries, in characters
pub const DEFAULT_MAX_ERROR_CHARS: usize = 100;

/// Runs one strategy against one tool and times it
#[derive(Clone)]
pub struct ProbeExecutor {
    runtime: Arc<dyn AgentRuntime>,
    step_budget: u32,
    max_error_chars: usize,
}

impl ProbeExecutor {
    pub fn new(runtime: Arc<dyn AgentRuntime>) -> Self {
        Self {
            runtime,
            step_budget: DEFAULT_STEP_BUDGET,
            max_error_chars: DEFAULT_MAX_ERROR_CHARS,
        }
    }

    pub fn with_step_budget(mut self, step_budget: u32) -> Self {
        self.step_budget = step_budget;
        self
    }

    pub fn with_max_error_chars(mut self, max_error_chars: usize) -> Self {
        self.max_error_chars = max_error_chars;
        self
    }

    pub fn runtime(&self) -> &Arc<dyn AgentRuntime> {
        &self.runtime
    }

    /// Render the instruction and hand it to a fresh agent execution
    ///
    /// Never fails: a runtime error, or a run that never called `tool`,
    /// becomes an unsuccessful result.
    pub async fn probe(&self, strategy: Strategy, tool: &str, parameters: &Parameters) -> ProbeResult {
        let instruction = strategy.render(tool, parameters);
        debug!(%strategy, %tool, step_budget = self.step_budget, "ProbeExecutor::probe: called");

        let start = Instant::now();
        let outcome = self.runtime.execute(&instruction, self.step_budget).await;
        let duration_millis = start.elapsed().as_millis() as u64;

        match outcome {
            Ok(run) if run.tool_calls.iter().any(|called| called == tool) => {
                debug!(%strategy, %tool, duration_millis, turns = run.turns, "ProbeExecutor::probe: succeeded");
                ProbeResult::succeeded(strategy, duration_millis)
            }
            Ok(run) => {
                debug!(%strategy, %tool, calls = ?run.tool_calls, "ProbeExecutor::probe: target tool not called");
                let called = if run.tool_calls.is_empty() {
                    "no tool".to_string()
                } else {
                    run.tool_calls.join(", ")
                };
                ProbeResult::failed(
                    strategy,
                    duration_millis,
                    truncate_chars(
                        &format!("agent called {} instead of {}", called, tool),
                        self.max_error_chars,
                    ),
                )
            }
            Err(e) => {
                debug!(%strategy, %tool, duration_millis, error = %e, "ProbeExecutor::probe: failed");
                ProbeResult::failed(
                    strategy,
                    duration_millis,
                    truncate_chars(&e.to_string(), self.max_error_chars),
                )
            }
        }
    }
}

/// First `max` characters of `s`, never splitting a character
fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}
