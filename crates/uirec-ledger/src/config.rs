//! Workspace configuration stored in `.uirec/config.json`.

use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;
use std::time::Duration;

use uirec_core::DEFAULT_MAX_ENTRIES;

use crate::paths::UirecPaths;

/// Typed view of `.uirec/config.json`. Missing keys take their defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RecorderConfig {
    /// Address `uirec serve` binds to.
    pub bind: String,
    pub port: u16,
    /// When false every caller is trusted; when true callers must name a
    /// project member in the `x-uirec-user` header.
    pub auth_enabled: bool,
    /// Commits examined by status and range queries.
    pub max_entries: usize,
    pub settle_delay_ms: u64,
    /// Server used by client commands such as `uirec replay`.
    pub server_url: String,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 9001,
            auth_enabled: false,
            max_entries: DEFAULT_MAX_ENTRIES,
            settle_delay_ms: 200,
            server_url: "http://127.0.0.1:9001".to_string(),
        }
    }
}

impl RecorderConfig {
    /// Load from `.uirec/config.json`. A missing file yields the defaults.
    pub fn load(paths: &UirecPaths) -> anyhow::Result<Self> {
        let map = read_config_map(&paths.config_json)?;
        let config = serde_json::from_value(serde_json::Value::Object(map))
            .map_err(|e| anyhow::anyhow!("invalid {}: {e}", paths.config_json.display()))?;
        Ok(config)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

/// Read config as a raw JSON map. Returns an empty map if the file doesn't exist.
pub fn read_config_map(
    path: &Path,
) -> anyhow::Result<serde_json::Map<String, serde_json::Value>> {
    if !path.exists() {
        return Ok(serde_json::Map::new());
    }
    let content = std::fs::read_to_string(path)?;
    match serde_json::from_str::<serde_json::Value>(&content)? {
        serde_json::Value::Object(map) => Ok(map),
        _ => Ok(serde_json::Map::new()),
    }
}

/// Write the raw config map back to disk.
pub fn write_config_map(
    path: &Path,
    config: &serde_json::Map<String, serde_json::Value>,
) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(config)?;
    write_atomic(path, json.as_bytes())
}

/// Atomic write: write to temp file in same dir, then rename.
pub fn write_atomic(path: &Path, data: &[u8]) -> anyhow::Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| anyhow::anyhow!("no parent dir for {}", path.display()))?;
    std::fs::create_dir_all(parent)?;
    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    tmp.write_all(data)?;
    tmp.flush()?;
    tmp.persist(path)?;
    Ok(())
}
