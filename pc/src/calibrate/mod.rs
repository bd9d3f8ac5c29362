//! Calibration engine
//!
//! Probes every strategy against every tool of a server, one at a time, and
//! ranks strategies per tool by whether the agent managed to call the tool
//! and how long it took.

mod error;
mod pacing;
mod probe;
mod sampler;
mod server;
mod tool;
mod types;

pub use error::CalibrationError;
pub use pacing::Pacing;
pub use probe::{DEFAULT_MAX_ERROR_CHARS, DEFAULT_STEP_BUDGET, ProbeExecutor};
pub use sampler::{sample_parameters, sample_required, sample_value};
pub use server::ServerCalibrator;
pub use tool::ToolCalibrator;
pub use types::{ProbeResult, ServerCalibrationReport, ToolCalibrationOutcome, ToolProbeSpec};
