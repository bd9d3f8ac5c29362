//! ToolInvoker trait definition

use async_trait::async_trait;
use serde_json::Value;

use super::ToolError;
use crate::llm::ToolDefinition;

/// Something that can list and execute tools on behalf of an agent
///
/// Implemented by the MCP stdio client; tests script it directly.
#[async_trait]
pub trait ToolInvoker: Send + Sync {
    /// Tools currently exposed, in provider order
    async fn list_tools(&self) -> Result<Vec<ToolDefinition>, ToolError>;

    /// Execute one tool call
    ///
    /// Transport failures are `Err`; a tool that ran and reported a problem
    /// comes back as `Ok` with `is_error` set.
    async fn call_tool(&self, name: &str, arguments: Value) -> Result<ToolResult, ToolError>;

    /// Release the underlying connection
    async fn shutdown(&self) -> Result<(), ToolError> {
        Ok(())
    }
}

/// Result of a tool execution
#[derive(Debug, Clone, PartialEq)]
pub struct ToolResult {
    pub content: String,
    pub is_error: bool,
}

impl ToolResult {
    pub fn success(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: false,
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: true,
        }
    }
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Invoker with canned results per tool name
    ///
    /// Unknown tools produce an error result, the way a real server would.
    #[derive(Default)]
    pub struct MockToolInvoker {
        tools: Vec<ToolDefinition>,
        results: HashMap<String, ToolResult>,
        calls: Mutex<Vec<(String, Value)>>,
        shutdowns: AtomicUsize,
        fail_listing: bool,
    }

    impl MockToolInvoker {
        pub fn new(tools: Vec<ToolDefinition>) -> Self {
            Self {
                tools,
                ..Default::default()
            }
        }

        pub fn with_result(mut self, tool: &str, result: ToolResult) -> Self {
            self.results.insert(tool.to_string(), result);
            self
        }

        pub fn failing_listing(mut self) -> Self {
            self.fail_listing = true;
            self
        }

        pub fn calls(&self) -> Vec<(String, Value)> {
            self.calls.lock().unwrap().clone()
        }

        pub fn shutdown_count(&self) -> usize {
            self.shutdowns.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ToolInvoker for MockToolInvoker {
        async fn list_tools(&self) -> Result<Vec<ToolDefinition>, ToolError> {
            if self.fail_listing {
                return Err(ToolError::Disconnected);
            }
            Ok(self.tools.clone())
        }

        async fn call_tool(&self, name: &str, arguments: Value) -> Result<ToolResult, ToolError> {
            self.calls.lock().unwrap().push((name.to_string(), arguments));
            Ok(self
                .results
                .get(name)
                .cloned()
                .unwrap_or_else(|| ToolResult::error(format!("Unknown tool: {}", name))))
        }

        async fn shutdown(&self) -> Result<(), ToolError> {
            self.shutdowns.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }
}
