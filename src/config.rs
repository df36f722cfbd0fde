//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.teaminv.toml` files.

use crate::cli::{Args, OutputFormat};
use crate::models::MapDisplayMode;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the configuration file looked up in the current directory.
pub const CONFIG_FILE: &str = ".teaminv.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Display settings.
    #[serde(default)]
    pub display: DisplayConfig,

    /// Snapshot import settings.
    #[serde(default)]
    pub import: ImportConfig,

    /// Spreadsheet sharing settings.
    #[serde(default)]
    pub sheets: SheetsConfig,

    /// Map layer settings.
    #[serde(default)]
    pub layer: LayerConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Path of the team store.
    #[serde(default = "default_store")]
    pub store: PathBuf,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            store: default_store(),
            verbose: false,
        }
    }
}

fn default_store() -> PathBuf {
    PathBuf::from("teaminv.json")
}

/// Display settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Default report format.
    #[serde(default)]
    pub format: OutputFormat,

    /// Marker label style used when the store has none yet.
    #[serde(default)]
    pub map_display_mode: MapDisplayMode,
}

/// Snapshot import settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportConfig {
    /// File extensions picked up when importing a directory.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Maximum snapshot size in bytes.
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            extensions: default_extensions(),
            max_file_size: default_max_file_size(),
        }
    }
}

fn default_extensions() -> Vec<String> {
    vec!["json".to_string()]
}

fn default_max_file_size() -> u64 {
    10 * 1024 * 1024 // 10MB
}

/// Spreadsheet sharing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetsConfig {
    /// Tab holding the shared payload.
    #[serde(default = "default_tab")]
    pub tab: String,

    /// OAuth client id used by the sync front end.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    /// Target spreadsheet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spreadsheet_id: Option<String>,
}

impl Default for SheetsConfig {
    fn default() -> Self {
        Self {
            tab: default_tab(),
            client_id: None,
            spreadsheet_id: None,
        }
    }
}

fn default_tab() -> String {
    "KuKuTeamInventory".to_string()
}

/// Map layer settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LayerConfig {
    /// Portals another layer already marks; no key marker is produced for them.
    #[serde(default)]
    pub claimed_portals: Vec<String>,
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    pub fn merge_with_args(&mut self, args: &Args) {
        if let Some(ref store) = args.store {
            self.general.store = store.clone();
        }

        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Spreadsheet id and client id, when both are configured.
    pub fn sheets_credentials(&self) -> Option<(&str, &str)> {
        match (&self.sheets.client_id, &self.sheets.spreadsheet_id) {
            (Some(client), Some(sheet)) if !client.trim().is_empty() && !sheet.trim().is_empty() => {
                Some((client.as_str(), sheet.as_str()))
            }
            _ => None,
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
