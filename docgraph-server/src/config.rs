// Copyright 2025 Sushanth (https://github.com/sushanthpy)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.


use anyhow::{Context, Result};
use docgraph_core::ThresholdRegistry;
use docgraph_query::CacheConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Docgraph server configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DataConfig {
    /// Directory holding documents.json and the optional snapshot files
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// TOML file with threshold overrides
    #[serde(default)]
    pub thresholds_file: Option<PathBuf>,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            thresholds_file: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheSettings {
    /// Cache rendered resources
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,

    /// Entry lifetime in seconds
    #[serde(default = "default_cache_ttl")]
    pub ttl_secs: u64,

    /// Upper bound on cached entries (unbounded when unset)
    #[serde(default)]
    pub max_entries: Option<usize>,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
            ttl_secs: default_cache_ttl(),
            max_entries: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Emit JSON log lines instead of the human format
    #[serde(default)]
    pub json: bool,
}

// Default values
fn default_data_dir() -> PathBuf {
    PathBuf::from("./docs-data")
}

fn default_cache_enabled() -> bool {
    true
}

fn default_cache_ttl() -> u64 {
    300
}

impl ServerConfig {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Load configuration from environment variables
    ///
    /// Supported environment variables:
    /// - DOCGRAPH_DATA_DIR: Data directory path (default: ./docs-data)
    /// - DOCGRAPH_THRESHOLDS_FILE: Threshold overrides file
    /// - DOCGRAPH_CACHE_ENABLED: Enable the resource cache (default: true)
    /// - DOCGRAPH_CACHE_TTL_SECS: Cache entry lifetime (default: 300)
    /// - DOCGRAPH_CACHE_MAX_ENTRIES: Cache size bound (default: unbounded)
    /// - DOCGRAPH_LOG_JSON: JSON log output (default: false)
    pub fn from_env() -> Self {
        Self::default().merge_with(|key| std::env::var(key).ok())
    }

    /// Load configuration with priority: env > file > defaults
    pub fn load(config_file: Option<PathBuf>) -> Result<Self> {
        let config = match config_file {
            Some(path) if path.exists() => {
                tracing::info!("Loading configuration from file: {:?}", path);
                Self::from_file(&path)?
            }
            Some(path) => {
                tracing::warn!("Config file not found: {:?}, using defaults", path);
                Self::default()
            }
            None => Self::default(),
        };

        Ok(config.merge_with(|key| std::env::var(key).ok()))
    }

    /// Override fields whose variable `lookup` returns; unparsable values are ignored
    pub fn merge_with<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(data_dir) = lookup("DOCGRAPH_DATA_DIR") {
            self.data.data_dir = PathBuf::from(data_dir);
        }

        if let Some(path) = lookup("DOCGRAPH_THRESHOLDS_FILE") {
            self.data.thresholds_file = Some(PathBuf::from(path));
        }

        if let Some(enabled) = lookup("DOCGRAPH_CACHE_ENABLED") {
            if let Ok(val) = enabled.parse() {
                self.cache.enabled = val;
            }
        }

        if let Some(ttl) = lookup("DOCGRAPH_CACHE_TTL_SECS") {
            if let Ok(val) = ttl.parse() {
                self.cache.ttl_secs = val;
            }
        }

        if let Some(max) = lookup("DOCGRAPH_CACHE_MAX_ENTRIES") {
            if let Ok(val) = max.parse() {
                self.cache.max_entries = Some(val);
            }
        }

        if let Some(json) = lookup("DOCGRAPH_LOG_JSON") {
            if let Ok(val) = json.parse() {
                self.logging.json = val;
            }
        }

        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !self.data.data_dir.is_dir() {
            anyhow::bail!(
                "Data directory does not exist: {}",
                self.data.data_dir.display()
            );
        }

        if let Some(path) = &self.data.thresholds_file {
            if !path.is_file() {
                anyhow::bail!("Thresholds file does not exist: {}", path.display());
            }
        }

        if self.cache.max_entries == Some(0) {
            anyhow::bail!("cache.max_entries must be at least 1");
        }

        Ok(())
    }

    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            enabled: self.cache.enabled,
            ttl: Duration::from_secs(self.cache.ttl_secs),
            max_entries: self.cache.max_entries,
        }
    }

    /// Defaults, overlaid with the thresholds file when one is configured
    pub fn threshold_registry(&self) -> Result<ThresholdRegistry> {
        let Some(path) = &self.data.thresholds_file else {
            return Ok(ThresholdRegistry::default());
        };
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read thresholds file {}", path.display()))?;
        let registry = ThresholdRegistry::from_toml_str(&content)
            .with_context(|| format!("invalid thresholds file {}", path.display()))?;
        Ok(registry)
    }
}
