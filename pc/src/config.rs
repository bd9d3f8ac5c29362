//! promptcal configuration types and loading

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::calibrate::{CalibrationError, DEFAULT_MAX_ERROR_CHARS, DEFAULT_STEP_BUDGET, Pacing};

/// Main promptcal configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[serde(rename = "log-level", skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,

    /// LLM provider configuration
    pub llm: LlmConfig,

    /// Calibration pacing and probe limits
    pub calibration: CalibrationConfig,

    /// Storage configuration
    pub storage: StorageConfig,

    /// Tool servers, keyed by server name
    pub servers: BTreeMap<String, ServerConfig>,
}

impl Config {
    /// Validate configuration before use
    ///
    /// Checks that the LLM API key environment variable is set.
    /// Call this before any command that talks to the model.
    pub fn validate(&self) -> Result<()> {
        if std::env::var(&self.llm.api_key_env).is_err() {
            return Err(eyre::eyre!(
                "LLM API key not found. Set the {} environment variable.",
                self.llm.api_key_env
            ));
        }
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Project-local config: .promptcal.yml
        let local_config = PathBuf::from(".promptcal.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // User config: ~/.config/promptcal/promptcal.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("promptcal").join("promptcal.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read only the log level, before logging is initialized
    ///
    /// Errors are swallowed: a broken config file is reported later by `load`.
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        let candidates = match config_path {
            Some(path) => vec![path.clone()],
            None => {
                let mut paths = vec![PathBuf::from(".promptcal.yml")];
                if let Some(config_dir) = dirs::config_dir() {
                    paths.push(config_dir.join("promptcal").join("promptcal.yml"));
                }
                paths
            }
        };

        candidates
            .into_iter()
            .find(|p| p.exists())
            .and_then(|p| Self::load_from_file(&p).ok())
            .and_then(|c| c.log_level)
    }

    /// Names of all configured servers, sorted
    pub fn server_names(&self) -> Vec<String> {
        self.servers.keys().cloned().collect()
    }

    /// Config for `name`, or an error listing every configured server
    pub fn server(&self, name: &str) -> std::result::Result<&ServerConfig, CalibrationError> {
        self.servers.get(name).ok_or_else(|| CalibrationError::UnknownServer {
            server: name.to_string(),
            known: self.server_names(),
        })
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider name ("anthropic" or "openai")
    pub provider: String,

    /// Model identifier
    pub model: String,

    /// Environment variable containing the API key
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    /// API base URL
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Maximum tokens per response
    #[serde(rename = "max-tokens")]
    pub max_tokens: u32,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl LlmConfig {
    /// Read the API key from the configured environment variable
    pub fn get_api_key(&self) -> Result<String> {
        std::env::var(&self.api_key_env).context(format!("Environment variable {} is not set", self.api_key_env))
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "anthropic".to_string(),
            model: "claude-sonnet-4-20250514".to_string(),
            api_key_env: "ANTHROPIC_API_KEY".to_string(),
            base_url: "https://api.anthropic.com".to_string(),
            max_tokens: 4096,
            timeout_ms: 120_000,
        }
    }
}

/// Calibration pacing and probe limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Maximum agent steps (model turns) per probe
    #[serde(rename = "step-budget")]
    pub step_budget: u32,

    /// Pause between strategies of one tool
    #[serde(rename = "probe-pause-ms")]
    pub probe_pause_ms: u64,

    /// Pause between tools of one server
    #[serde(rename = "tool-pause-ms")]
    pub tool_pause_ms: u64,

    /// Pause between servers when calibrating all of them
    #[serde(rename = "server-pause-ms")]
    pub server_pause_ms: u64,

    /// Maximum characters kept from a probe error message
    #[serde(rename = "max-error-chars")]
    pub max_error_chars: usize,
}

impl CalibrationConfig {
    /// Pauses derived from this configuration
    pub fn pacing(&self) -> Pacing {
        Pacing {
            between_probes: Duration::from_millis(self.probe_pause_ms),
            between_tools: Duration::from_millis(self.tool_pause_ms),
            between_servers: Duration::from_millis(self.server_pause_ms),
        }
    }
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            step_budget: DEFAULT_STEP_BUDGET,
            probe_pause_ms: 500,
            tool_pause_ms: 2_000,
            server_pause_ms: 5_000,
            max_error_chars: DEFAULT_MAX_ERROR_CHARS,
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path of the persisted server→tool→strategy mapping
    #[serde(rename = "mapping-path")]
    pub mapping_path: PathBuf,

    /// Directory for per-run calibration reports (none = don't write)
    #[serde(rename = "reports-dir", skip_serializing_if = "Option::is_none")]
    pub reports_dir: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        // XDG data directory (~/.local/share/promptcal on Linux)
        let mapping_path = dirs::data_dir()
            .map(|d| d.join("promptcal"))
            .unwrap_or_else(|| PathBuf::from(".promptcal"))
            .join("strategy_mapping.json");

        Self {
            mapping_path,
            reports_dir: None,
        }
    }
}

/// A tool server reachable over stdio
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Executable to spawn
    pub command: String,

    /// Arguments passed to the executable
    pub args: Vec<String>,

    /// Extra environment for the server process
    pub env: BTreeMap<String, String>,

    /// Static tool list; when absent, tools are discovered and sampled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<StaticTool>>,
}

/// A tool entry of a static catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaticTool {
    /// Tool name as exposed by the server
    pub name: String,

    /// Literal parameters to probe with
    #[serde(default)]
    pub params: Map<String, Value>,
}
