//! Agent runtime backed by an LLM and a tool invoker

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::{AgentError, AgentRun, AgentRuntime};
use crate::llm::{CompletionRequest, CompletionResponse, ContentBlock, LlmClient, Message, ToolDefinition};
use crate::tools::ToolInvoker;

const SYSTEM_PROMPT: &str = "You are an assistant that operates tools. \
When asked to use a tool, call it with the given arguments. \
After the tool returns, reply with a one-sentence summary of its result.";

/// Runs each instruction as a fresh tool-use conversation
pub struct LlmAgentRuntime {
    llm: Arc<dyn LlmClient>,
    invoker: Arc<dyn ToolInvoker>,
    tools: Vec<ToolDefinition>,
    max_tokens: u32,
}

impl LlmAgentRuntime {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        invoker: Arc<dyn ToolInvoker>,
        tools: Vec<ToolDefinition>,
        max_tokens: u32,
    ) -> Self {
        Self {
            llm,
            invoker,
            tools,
            max_tokens,
        }
    }

    /// Build a runtime offering every tool the invoker lists
    pub async fn discover(
        llm: Arc<dyn LlmClient>,
        invoker: Arc<dyn ToolInvoker>,
        max_tokens: u32,
    ) -> Result<Self, AgentError> {
        let tools = invoker.list_tools().await?;
        debug!(tool_count = tools.len(), "LlmAgentRuntime::discover: tools listed");
        Ok(Self::new(llm, invoker, tools, max_tokens))
    }

    pub fn tools(&self) -> &[ToolDefinition] {
        &self.tools
    }

    fn assistant_message(response: &CompletionResponse) -> Message {
        let mut blocks = Vec::new();
        if let Some(text) = &response.content {
            blocks.push(ContentBlock::text(text));
        }
        for call in &response.tool_calls {
            blocks.push(ContentBlock::ToolUse {
                id: call.id.clone(),
                name: call.name.clone(),
                input: call.input.clone(),
            });
        }
        Message::assistant_blocks(blocks)
    }
}

#[async_trait]
impl AgentRuntime for LlmAgentRuntime {
    async fn execute(&self, instruction: &str, step_budget: u32) -> Result<AgentRun, AgentError> {
        debug!(instruction_len = instruction.len(), step_budget, "LlmAgentRuntime::execute: called");
        let mut messages = vec![Message::user(instruction)];
        let mut called: Vec<String> = Vec::new();

        for turn in 1..=step_budget {
            let request = CompletionRequest {
                system_prompt: SYSTEM_PROMPT.to_string(),
                messages: messages.clone(),
                tools: self.tools.clone(),
                max_tokens: self.max_tokens,
            };

            let response = self.llm.complete(request).await?;
            debug!(turn, stop_reason = ?response.stop_reason, tool_calls = response.tool_calls.len(), "LlmAgentRuntime::execute: response received");

            if response.tool_calls.is_empty() {
                if called.is_empty() {
                    debug!(turn, "LlmAgentRuntime::execute: turn ended without a tool call");
                    return Err(AgentError::NoToolCall);
                }
                return Ok(AgentRun {
                    turns: turn,
                    tool_calls: called,
                });
            }

            messages.push(Self::assistant_message(&response));

            let mut results = Vec::with_capacity(response.tool_calls.len());
            for call in &response.tool_calls {
                debug!(turn, tool = %call.name, "LlmAgentRuntime::execute: calling tool");
                let result = self.invoker.call_tool(&call.name, call.input.clone()).await?;
                if result.is_error {
                    return Err(AgentError::ToolFailed {
                        tool: call.name.clone(),
                        message: result.content,
                    });
                }
                called.push(call.name.clone());
                results.push(ContentBlock::tool_result(&call.id, result.content, false));
            }

            // Calls that succeeded within the budget count; the closing turn is optional
            if turn == step_budget {
                debug!(turn, calls = called.len(), "LlmAgentRuntime::execute: budget used after successful calls");
                return Ok(AgentRun {
                    turns: turn,
                    tool_calls: called,
                });
            }
            messages.push(Message::user_blocks(results));
        }

        debug!(step_budget, "LlmAgentRuntime::execute: no turns allowed");
        Err(AgentError::BudgetExhausted { budget: step_budget })
    }

    async fn teardown(&self) -> Result<(), AgentError> {
        debug!("LlmAgentRuntime::teardown: called");
        if let Err(e) = self.invoker.shutdown().await {
            warn!("Tool provider shutdown failed: {}", e);
            return Err(e.into());
        }
        Ok(())
    }
}
