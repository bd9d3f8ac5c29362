//! Agent runtime
//!
//! The calibration engine only needs "run this instruction, tell me whether
//! the agent managed to call a tool". `AgentRuntime` is that seam;
//! `LlmAgentRuntime` fills it with a model plus a tool provider.

mod llm;
mod runtime;

pub use llm::LlmAgentRuntime;
#[cfg(test)]
pub use runtime::mock;
pub use runtime::{AgentError, AgentRun, AgentRuntime};
