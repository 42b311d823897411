//! Configuration management for offimg

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::hash::HashAlgorithm;
use crate::node::{ParseContext, PlaceholderSpec};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub hash: HashConfig,
    pub placeholder: PlaceholderConfig,
    pub store: StoreConfig,
    pub ingest: IngestConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HashConfig {
    pub algorithm: HashAlgorithm,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaceholderConfig {
    pub label: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory for stored image bytes; the platform data dir when unset
    pub dir: Option<PathBuf>,
    /// Entries kept in the in-memory read cache
    pub cache_capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub enabled: bool,
    pub max_bytes: u64,
    /// Matched case-insensitively against each dropped file's declared type
    pub mime_pattern: String,
}

impl Default for PlaceholderConfig {
    fn default() -> Self {
        let spec = PlaceholderSpec::default();
        Self {
            label: spec.label,
            width: spec.width,
            height: spec.height,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            dir: None,
            cache_capacity: 64,
        }
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_bytes: 10 * 1024 * 1024,
            mime_pattern: "image".to_string(),
        }
    }
}

impl Config {
    /// Get the platform-specific config file path
    pub fn config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "offimg")
            .map(|proj_dirs| proj_dirs.config_dir().join("offimg.toml"))
    }

    /// Default store directory under the platform data dir
    pub fn default_store_dir() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "offimg")
            .map(|proj_dirs| proj_dirs.data_dir().join("store"))
    }

    /// Configured store directory, falling back to the platform default
    pub fn store_dir(&self) -> Option<PathBuf> {
        self.store.dir.clone().or_else(Self::default_store_dir)
    }

    /// Load configuration from file, falling back to defaults if missing
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        // Check config file permissions (Unix only)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let metadata = std::fs::metadata(path)?;
            let perms = metadata.permissions();
            if perms.mode() & 0o002 != 0 {
                anyhow::bail!(
                    "Config file {} is world-writable (insecure permissions)",
                    path.display()
                );
            }
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        regex::RegexBuilder::new(&config.ingest.mime_pattern)
            .build()
            .with_context(|| {
                format!("Invalid ingest.mime_pattern: {}", config.ingest.mime_pattern)
            })?;

        Ok(config)
    }

    pub fn placeholder_spec(&self) -> PlaceholderSpec {
        PlaceholderSpec {
            label: self.placeholder.label.clone(),
            width: self.placeholder.width,
            height: self.placeholder.height,
        }
    }

    pub fn parse_context(&self) -> ParseContext {
        ParseContext {
            algorithm: self.hash.algorithm,
            placeholder: self.placeholder_spec(),
        }
    }
}
