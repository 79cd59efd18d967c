//! Configuration loading
//!
//! All settings come from an optional TOML file. Every section and key has
//! a compiled default, so an empty file (or no file) is a valid config.
//!
//! Config file resolution:
//! 1. Command-line argument (highest priority)
//! 2. `VOCAB_CURATOR_CONFIG` environment variable
//! 3. `<platform config dir>/vocab-curator/config.toml`
//! 4. Compiled defaults

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::columns::ColumnMapper;
use crate::correction::{ArrayMatchMode, CorrectionEngine, DEFAULT_MAX_MATCHES};
use crate::policy::{CorrectionPolicy, PolicyThresholds};
use crate::similarity::SimilarityMetric;
use crate::{Error, Result};

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "VOCAB_CURATOR_CONFIG";

/// Default HTTP bind address
pub const DEFAULT_BIND: &str = "127.0.0.1:5740";

/// Complete service configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub logging: LoggingConfig,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub schema: SchemaConfig,
    pub engine: EngineConfig,
    pub policy: PolicyThresholds,
    pub columns: ColumnsConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to listen on
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite file holding curated tables, review queue and corrections log
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("curation.db"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaConfig {
    /// JSON-LD data model file
    pub path: PathBuf,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data-model.jsonld"),
        }
    }
}

/// Correction engine settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Candidates kept per suggestion (>= 1)
    pub max_matches: usize,
    pub array_mode: ArrayMatchMode,
    pub metric: SimilarityMetric,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_matches: DEFAULT_MAX_MATCHES,
            array_mode: ArrayMatchMode::default(),
            metric: SimilarityMetric::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnsConfig {
    /// Columns skipped in addition to the built-in system columns
    pub skip: Vec<String>,
}

impl TomlConfig {
    /// Check cross-field constraints
    pub fn validate(&self) -> Result<()> {
        if self.engine.max_matches == 0 {
            return Err(Error::Config(
                "engine.max_matches must be at least 1".to_string(),
            ));
        }
        self.policy
            .validate()
            .map_err(|e| Error::Config(e.to_string()))?;
        Ok(())
    }

    /// Correction engine built from `[engine]`
    pub fn engine(&self) -> Result<CorrectionEngine> {
        Ok(CorrectionEngine::new(self.engine.max_matches)?
            .with_array_mode(self.engine.array_mode)
            .with_metric(self.engine.metric))
    }

    /// Correction policy built from `[policy]`
    pub fn policy(&self) -> Result<CorrectionPolicy> {
        CorrectionPolicy::new(self.policy)
    }

    /// Column mapper honoring `[columns] skip`
    pub fn column_mapper(&self) -> ColumnMapper {
        ColumnMapper::new().with_skip_columns(&self.columns.skip)
    }
}

/// Default config file location for the platform
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("vocab-curator").join("config.toml"))
}

/// Pick the config file to load, if any
///
/// Explicit paths (CLI, environment) are returned even when the file does
/// not exist; the platform default only when it does.
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    default_config_path().filter(|path| path.exists())
}

/// Parse and validate config text
pub fn parse_toml_config(text: &str) -> Result<TomlConfig> {
    let config: TomlConfig =
        toml::from_str(text).map_err(|e| Error::Config(format!("invalid TOML: {}", e)))?;
    config.validate()?;
    Ok(config)
}

/// Load and validate a config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let text = std::fs::read_to_string(path)?;
    parse_toml_config(&text)
        .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
}

/// Resolve and load the config, falling back to defaults
///
/// A missing file logs a warning and yields defaults; an unreadable or
/// malformed file is an error.
pub fn load_config(cli_arg: Option<&Path>) -> Result<TomlConfig> {
    let path = match resolve_config_path(cli_arg) {
        Some(path) => path,
        None => {
            tracing::info!("No config file found, using defaults");
            return Ok(TomlConfig::default());
        }
    };

    if !path.exists() {
        tracing::warn!(path = %path.display(), "Config file not found, using defaults");
        return Ok(TomlConfig::default());
    }

    let config = load_toml_config(&path)?;
    tracing::info!(path = %path.display(), "Loaded config file");
    Ok(config)
}

/// Write a config file atomically (temp file + rename)
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    let text = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("cannot serialize config: {}", e)))?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let temp_path = path.with_extension("toml.tmp");
    std::fs::write(&temp_path, text)?;
    std::fs::rename(&temp_path, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_text_yields_defaults() {
        let config = parse_toml_config("").unwrap();
        assert_eq!(config, TomlConfig::default());
        assert_eq!(config.server.bind, DEFAULT_BIND);
        assert_eq!(config.engine.max_matches, 3);
        assert_eq!(config.policy.accept_threshold, 0.8);
    }

    #[test]
    fn test_partial_sections() {
        let config = parse_toml_config(
            r#"
            [engine]
            array_mode = "each_element"
            metric = "levenshtein"

            [columns]
            skip = ["notes"]
            "#,
        )
        .unwrap();
        assert_eq!(config.engine.array_mode, ArrayMatchMode::EachElement);
        assert_eq!(config.engine.metric, SimilarityMetric::Levenshtein);
        assert_eq!(config.engine.max_matches, 3);
        assert_eq!(config.columns.skip, vec!["notes"]);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(matches!(
            parse_toml_config("[engine]\nmax_matches = 0\n"),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            parse_toml_config("[policy]\naudit_threshold = 0.9\n"),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            parse_toml_config("[engine]\nmetric = \"cosine\"\n"),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_builders() {
        let config = TomlConfig::default();
        assert_eq!(config.engine().unwrap().max_matches(), 3);
        assert_eq!(config.policy().unwrap().thresholds().audit_threshold, 0.6);
    }
}
