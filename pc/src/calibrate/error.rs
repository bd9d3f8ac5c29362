//! Calibration error types

use thiserror::Error;

use crate::agent::AgentError;
use crate::tools::ToolError;

/// Errors that stop calibration of a server
///
/// Individual probe failures never surface here; they are recorded in the
/// report instead.
#[derive(Debug, Error)]
pub enum CalibrationError {
    #[error("Unknown server '{server}'. Known servers: {}", known_list(.known))]
    UnknownServer { server: String, known: Vec<String> },

    #[error("Failed to connect to server '{server}': {source}")]
    Connect {
        server: String,
        #[source]
        source: ToolError,
    },

    #[error("Failed to discover tools on server '{server}': {source}")]
    Discovery {
        server: String,
        #[source]
        source: ToolError,
    },

    #[error("Failed to prepare agent for server '{server}': {source}")]
    Agent {
        server: String,
        #[source]
        source: AgentError,
    },
}

fn known_list(known: &[String]) -> String {
    if known.is_empty() {
        "(none)".to_string()
    } else {
        known.join(", ")
    }
}
