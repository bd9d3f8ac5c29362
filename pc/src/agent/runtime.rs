//! AgentRuntime trait and its error type

use async_trait::async_trait;
use thiserror::Error;

use crate::llm::LlmError;
use crate::tools::ToolError;

/// Summary of a successful agent execution
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentRun {
    /// Model turns used
    pub turns: u32,
    /// Tools called, in call order
    pub tool_calls: Vec<String>,
}

/// Why an agent execution did not succeed
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Tool transport error: {0}")]
    Tool(#[from] ToolError),

    #[error("Tool '{tool}' reported an error: {message}")]
    ToolFailed { tool: String, message: String },

    #[error("Agent finished without calling a tool")]
    NoToolCall,

    #[error("Step budget of {budget} exhausted")]
    BudgetExhausted { budget: u32 },

    #[error("{0}")]
    Other(String),
}

/// Executes one natural-language instruction with an agent
///
/// Every `execute` call must start from a fresh conversation; nothing said in
/// one probe may leak into the next.
#[async_trait]
pub trait AgentRuntime: Send + Sync {
    /// Run `instruction` with at most `step_budget` model turns
    async fn execute(&self, instruction: &str, step_budget: u32) -> Result<AgentRun, AgentError>;

    /// Release whatever the runtime holds for the current server
    async fn teardown(&self) -> Result<(), AgentError> {
        Ok(())
    }
}
