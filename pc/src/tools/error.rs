//! Tool error types

use std::time::Duration;
use thiserror::Error;

/// Errors raised while talking to a tool provider
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Failed to spawn tool server '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Tool server request '{method}' timed out after {timeout:?}")]
    Timeout { method: String, timeout: Duration },

    #[error("Tool server error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Tool server connection closed")]
    Disconnected,

    #[error("Invalid tool server response: {0}")]
    InvalidResponse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
