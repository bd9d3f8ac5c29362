//! Persisted strategy mapping
//!
//! A single JSON document maps server name to the winning strategy per tool:
//!
//! ```json
//! {
//!   "filesystem": {
//!     "last_calibrated": "2026-10-19T08:00:00Z",
//!     "tools": { "list_allowed_directories": "stepByStep" }
//!   }
//! }
//! ```
//!
//! Persisting one server replaces only that server's entry. Every other entry,
//! including ones this crate does not understand, is written back unchanged and
//! in its original position.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::strategy::Strategy;

/// Mapping entry for one server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerMapping {
    pub last_calibrated: String,
    /// Tool name to strategy name
    pub tools: BTreeMap<String, String>,
}

impl ServerMapping {
    /// Strategy for `tool`, if recorded under a registered name
    pub fn strategy(&self, tool: &str) -> Option<Strategy> {
        self.tools.get(tool).and_then(|name| name.parse().ok())
    }
}

/// JSON-file store for the server/tool/strategy mapping
#[derive(Debug, Clone)]
pub struct MappingStore {
    path: PathBuf,
}

impl MappingStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Typed view of the document
    ///
    /// Entries that do not have the expected shape are skipped.
    pub fn load(&self) -> BTreeMap<String, ServerMapping> {
        debug!(path = %self.path.display(), "MappingStore::load: called");
        self.read_document()
            .into_iter()
            .filter_map(|(server, entry)| match serde_json::from_value::<ServerMapping>(entry) {
                Ok(mapping) => Some((server, mapping)),
                Err(e) => {
                    debug!(%server, error = %e, "MappingStore::load: skipping foreign entry");
                    None
                }
            })
            .collect()
    }

    /// Calibrated strategy for a tool, or the fallback when unknown
    pub fn strategy_for(&self, server: &str, tool: &str) -> Strategy {
        self.load()
            .get(server)
            .and_then(|mapping| mapping.strategy(tool))
            .unwrap_or(Strategy::FALLBACK)
    }

    /// Replace `server`'s entry with `mapping`, stamped with the current time
    pub fn persist(&self, server: &str, mapping: &BTreeMap<String, Strategy>) -> Result<()> {
        self.persist_at(server, mapping, Utc::now())
    }

    /// Replace `server`'s entry with `mapping`, stamped with `at`
    pub fn persist_at(&self, server: &str, mapping: &BTreeMap<String, Strategy>, at: DateTime<Utc>) -> Result<()> {
        debug!(%server, tool_count = mapping.len(), path = %self.path.display(), "MappingStore::persist_at: called");
        let mut document = self.read_document();

        let entry = ServerMapping {
            last_calibrated: at.to_rfc3339_opts(SecondsFormat::Secs, true),
            tools: mapping
                .iter()
                .map(|(tool, strategy)| (tool.clone(), strategy.name().to_string()))
                .collect(),
        };
        let value = serde_json::to_value(&entry).context("Failed to encode mapping entry")?;

        // Overwriting keeps an existing key's position in the document
        document.insert(server.to_string(), value);

        let mut json = serde_json::to_string_pretty(&Value::Object(document)).context("Failed to encode mapping")?;
        json.push('\n');
        atomic_write(&self.path, json.as_bytes())
            .with_context(|| format!("Failed to write mapping to {}", self.path.display()))?;

        info!("Saved {} tool mappings for {} to {}", mapping.len(), server, self.path.display());
        Ok(())
    }

    /// Current document; absent or unreadable means empty
    fn read_document(&self) -> Map<String, Value> {
        let content = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "MappingStore::read_document: no document yet");
                return Map::new();
            }
            Err(e) => {
                warn!("Could not read mapping {}: {}; starting empty", self.path.display(), e);
                return Map::new();
            }
        };

        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(map)) => map,
            Ok(_) => {
                warn!("Mapping {} is not a JSON object; starting empty", self.path.display());
                Map::new()
            }
            Err(e) => {
                warn!("Mapping {} is not valid JSON ({}); starting empty", self.path.display(), e);
                Map::new()
            }
        }
    }
}

/// Write to a sibling temp file, then rename over `path`
fn atomic_write(path: &Path, data: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let temp_path = path.with_extension("json.tmp");
    let mut file = File::create(&temp_path)?;
    file.write_all(data)?;
    file.sync_all()?;

    fs::rename(&temp_path, path)
}
