//! Run configuration: sources, models, filter and transformation rules
//!
//! The configuration is supplied fully formed before any source processing
//! begins and is immutable for the duration of a run. TOML is the primary
//! format; JSON is accepted for compatibility with older deployments and is
//! selected by file extension.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

fn default_import_folder() -> PathBuf {
    PathBuf::from("./import")
}

fn default_export_folder() -> PathBuf {
    PathBuf::from("./export")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory fetched playlists and guides are written to before parsing
    #[serde(default = "default_import_folder")]
    pub import_folder: PathBuf,
    /// Directory filtered playlists and guides are exported to
    #[serde(default = "default_export_folder")]
    pub export_folder: PathBuf,
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
}

/// One upstream feed: a playlist URL, an optional guide URL, and the output
/// models derived from it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Used to derive import and export paths
    pub name: String,
    /// Playlist (M3U) location
    pub playlist: String,
    /// Optional XMLTV guide location
    pub guide: Option<String>,
    #[serde(default)]
    pub models: Vec<ModelConfig>,
}

/// One output variant of a source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Appended to the source name to derive the playlist output path
    pub name: String,
    /// Inclusion rules; an empty list retains every entry
    #[serde(default)]
    pub filters: Vec<FilterRule>,
    /// Field rewrites applied to retained entries, in declared order
    #[serde(default)]
    pub transforms: Vec<TransformRule>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterRule {
    pub field: String,
    pub pattern: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformRule {
    pub field: String,
    pub pattern: String,
    pub replacement: String,
}

impl Config {
    pub fn load_from_file(config_file: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(config_file)
            .with_context(|| format!("Failed to read config file: {config_file}"))?;

        let is_json = Path::new(config_file)
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        let config: Self = if is_json {
            serde_json::from_str(&contents)
                .with_context(|| format!("Invalid JSON config: {config_file}"))?
        } else {
            toml::from_str(&contents)
                .with_context(|| format!("Invalid TOML config: {config_file}"))?
        };

        Ok(config)
    }
}
