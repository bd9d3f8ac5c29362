//! Model Context Protocol client
//!
//! Only the stdio transport is supported: servers are spawned from the
//! `servers` section of the configuration.

mod client;

pub use client::{DEFAULT_REQUEST_TIMEOUT, McpClient, PROTOCOL_VERSION};
