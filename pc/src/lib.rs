//! promptcal - prompt strategy calibration for tool-calling agents
//!
//! Agents respond differently to the same request depending on how it is
//! phrased. promptcal asks an agent to call each tool of a server once per
//! prompt strategy, records which phrasings actually produced a tool call and
//! how fast, and saves the winning strategy per tool so later prompts can be
//! rendered without re-running the model.
//!
//! # Core Concepts
//!
//! - **Closed strategy set**: five phrasings, fixed registration order
//! - **Fresh context per probe**: no probe sees another probe's conversation
//! - **Strictly sequential**: probes, tools and servers run one at a time
//! - **Partial updates**: saving one server never touches another's entry
//!
//! # Modules
//!
//! - [`strategy`] - Prompt strategies and instruction rendering
//! - [`calibrate`] - Sampler, probe executor, tool and server calibrators
//! - [`agent`] - Agent runtime seam and the LLM-backed runtime
//! - [`catalog`] - Static and discovered tool catalogs
//! - [`mapping`] - Persisted server/tool/strategy mapping
//! - [`runner`] - Connect, calibrate and save configured servers
//! - [`llm`] - LLM client trait with Anthropic and OpenAI implementations
//! - [`mcp`] - MCP stdio client
//! - [`tools`] - Tool invoker trait
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface
//!
//! # Example
//!
//! ```ignore
//! use promptcal::{MappingStore, ServerCalibrator, Pacing};
//!
//! let calibrator = ServerCalibrator::new(runtime, Pacing::none());
//! let report = calibrator.calibrate_server("filesystem", &catalog).await;
//! MappingStore::new("strategy_mapping.json").persist("filesystem", &report.mapping)?;
//! ```

pub mod agent;
pub mod calibrate;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod llm;
pub mod mapping;
pub mod mcp;
pub mod runner;
pub mod strategy;
pub mod tools;

pub use agent::{AgentError, AgentRun, AgentRuntime, LlmAgentRuntime};
pub use calibrate::{
    CalibrationError, Pacing, ProbeExecutor, ProbeResult, ServerCalibrationReport, ServerCalibrator,
    ToolCalibrationOutcome, ToolCalibrator, ToolProbeSpec, sample_parameters,
};
pub use catalog::{McpCatalog, StaticCatalog, ToolCatalog};
pub use config::Config;
pub use mapping::{MappingStore, ServerMapping};
pub use runner::{CalibrationRunner, RunOptions};
pub use strategy::{Parameters, Strategy};
