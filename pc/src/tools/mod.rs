//! Tool access for agents
//!
//! A `ToolInvoker` lists and executes the tools of one provider. The agent
//! runtime offers those tools to the model and routes its calls through here.

mod error;
mod traits;

pub use error::ToolError;
#[cfg(test)]
pub use traits::mock;
pub use traits::{ToolInvoker, ToolResult};
