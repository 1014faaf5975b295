//! Application configuration for the VRAC pipeline.
//!
//! User config lives at `~/.vrac/vrac.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, VracError};
use crate::types::{Dialect, PharmacyId};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "vrac.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".vrac";

/// Top-N window of the rank-limited export.
pub const DEFAULT_RANK_WINDOW: u32 = 20;

// ---------------------------------------------------------------------------
// Config structs (matching vrac.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Parser tuning.
    #[serde(default)]
    pub parsing: ParsingConfig,

    /// Replacement source registry. Empty means "use the built-in table".
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<SourceEntry>,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Root directory of the export file tree.
    #[serde(default = "default_input_root")]
    pub input_root: String,

    /// Where the processed JSON artifact is written.
    #[serde(default = "default_output_path")]
    pub output_path: String,

    /// Run enrichment stages after deduplication.
    #[serde(default)]
    pub enrich: bool,

    /// Maximum number of source files parsed concurrently.
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            input_root: default_input_root(),
            output_path: default_output_path(),
            enrich: false,
            concurrency: default_concurrency(),
        }
    }
}

fn default_input_root() -> String {
    "VRAC".into()
}
fn default_output_path() -> String {
    "data/vrac/processed.json".into()
}
fn default_concurrency() -> u32 {
    4
}

/// `[parsing]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsingConfig {
    /// Ranks `1..=rank_window` are kept from rank-limited exports.
    #[serde(default = "default_rank_window")]
    pub rank_window: u32,

    /// How many leading lines are searched for a table header.
    #[serde(default = "default_header_scan_lines")]
    pub header_scan_lines: usize,

    /// How many leading lines are searched for pharmacy identity tokens.
    #[serde(default = "default_identity_scan_lines")]
    pub identity_scan_lines: usize,
}

impl Default for ParsingConfig {
    fn default() -> Self {
        Self {
            rank_window: default_rank_window(),
            header_scan_lines: default_header_scan_lines(),
            identity_scan_lines: default_identity_scan_lines(),
        }
    }
}

fn default_rank_window() -> u32 {
    DEFAULT_RANK_WINDOW
}
fn default_header_scan_lines() -> usize {
    40
}
fn default_identity_scan_lines() -> usize {
    5
}

/// `[[sources]]` entry: one file mapping in a custom registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceEntry {
    /// File name, e.g. `ETAT_2080QTE1.csv`.
    pub file: String,
    /// Preferred subdirectory under the input root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subdir: Option<String>,
    /// Export dialect of the file.
    pub dialect: Dialect,
    /// Pharmacy the file is expected to belong to.
    pub pharmacy_id: PharmacyId,
    /// Display label of the period, e.g. `Aug–Dec 2025`.
    pub period_label: String,
    /// Reporting year.
    pub year: i32,
}

// ---------------------------------------------------------------------------
// Parse options (runtime, merged from config)
// ---------------------------------------------------------------------------

/// Runtime parser options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    pub rank_window: u32,
    pub header_scan_lines: usize,
    pub identity_scan_lines: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self::from(&ParsingConfig::default())
    }
}

impl From<&ParsingConfig> for ParseOptions {
    fn from(config: &ParsingConfig) -> Self {
        Self {
            rank_window: config.rank_window,
            header_scan_lines: config.header_scan_lines,
            identity_scan_lines: config.identity_scan_lines,
        }
    }
}

impl From<&AppConfig> for ParseOptions {
    fn from(config: &AppConfig) -> Self {
        Self::from(&config.parsing)
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.vrac/`).
pub fn config_dir() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| VracError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.vrac/vrac.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| VracError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content)
        .map_err(|e| VracError::config(format!("failed to parse {}: {e}", path.display())))?;
    validate_config(&config)?;
    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| VracError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| VracError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| VracError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Reject values the pipeline cannot run with.
pub fn validate_config(config: &AppConfig) -> Result<()> {
    if config.defaults.concurrency == 0 {
        return Err(VracError::config("defaults.concurrency must be at least 1"));
    }
    if config.parsing.rank_window == 0 {
        return Err(VracError::config("parsing.rank_window must be at least 1"));
    }
    if config.parsing.identity_scan_lines == 0 || config.parsing.header_scan_lines == 0 {
        return Err(VracError::config("parsing scan windows must be at least 1 line"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("input_root"));
        assert!(toml_str.contains("rank_window = 20"));
        assert!(!toml_str.contains("[[sources]]"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.defaults.concurrency, 4);
        assert_eq!(parsed.defaults.output_path, "data/vrac/processed.json");
        assert!(!parsed.defaults.enrich);
    }

    #[test]
    fn config_with_sources() {
        let toml_str = r#"
[defaults]
input_root = "/data/VRAC"
enrich = true

[[sources]]
file = "ETAT_2080QTE9.csv"
subdir = "ATTOBROU/2080"
dialect = "rank-limited"
pharmacy_id = "attobrou"
period_label = "Aug–Dec 2025"
year = 2025
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert!(config.defaults.enrich);
        assert_eq!(config.sources.len(), 1);
        assert_eq!(config.sources[0].pharmacy_id, PharmacyId::Attobrou);
        assert_eq!(config.sources[0].dialect, Dialect::RankLimited);
        assert_eq!(config.parsing.rank_window, DEFAULT_RANK_WINDOW);
    }

    #[test]
    fn parse_options_from_app_config() {
        let mut app = AppConfig::default();
        app.parsing.rank_window = 10;
        let opts = ParseOptions::from(&app);
        assert_eq!(opts.rank_window, 10);
        assert_eq!(opts.identity_scan_lines, 5);
        assert_eq!(ParseOptions::default().rank_window, 20);
    }

    #[test]
    fn zero_concurrency_rejected() {
        let mut config = AppConfig::default();
        config.defaults.concurrency = 0;
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("concurrency"));
    }
}
