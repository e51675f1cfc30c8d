//! CLI configuration
//!
//! `tinker.json` holds the playground configuration plus a `logging` section.
//! Every field is optional.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tinker_config::{Phase, TinkerConfig};
use tracing::Level;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse '{path}': {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Unknown log level '{0}' (expected error, warn, info, debug or trace)")]
    Level(String),
    #[error("Unknown log phase '{0}'")]
    Phase(String),
}

/// Contents of `tinker.json`
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    #[serde(flatten)]
    pub tinker: TinkerConfig,
    pub logging: LoggingSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Level for every phase without an override
    pub level: Option<String>,
    /// Per-phase overrides, keyed by phase name
    pub phases: HashMap<String, String>,
}

impl CliConfig {
    /// Read `path`; a missing file yields the defaults
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Log levels per pipeline phase
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub global: Level,
    overrides: HashMap<&'static str, Level>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            global: Level::WARN,
            overrides: HashMap::new(),
        }
    }
}

impl LogConfig {
    /// Build from the config file section; `cli_level` wins over the file
    pub fn from_section(section: &LoggingSection, cli_level: Option<&str>) -> Result<Self, ConfigError> {
        let mut config = LogConfig::default();
        if let Some(level) = cli_level.or(section.level.as_deref()) {
            config.global = parse_level(level)?;
        }
        for (name, level) in &section.phases {
            let phase = Phase::ALL
                .into_iter()
                .find(|p| p.as_str() == name.as_str())
                .ok_or_else(|| ConfigError::Phase(name.clone()))?;
            config.overrides.insert(phase.as_str(), parse_level(level)?);
        }
        Ok(config)
    }

    pub fn level_for(&self, phase: Phase) -> Level {
        self.overrides
            .get(phase.as_str())
            .copied()
            .unwrap_or(self.global)
    }
}

fn parse_level(name: &str) -> Result<Level, ConfigError> {
    Level::from_str(name).map_err(|_| ConfigError::Level(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tinker_config::Dialect;

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = CliConfig::load(&dir.path().join("tinker.json")).unwrap();
        assert_eq!(config.tinker, TinkerConfig::default());
    }

    #[test]
    fn test_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tinker.json");
        std::fs::write(
            &path,
            r#"{
                "defaultDialect": "javascript",
                "limits": { "maxCallDepth": 64 },
                "logging": { "level": "info", "phases": { "parser": "trace" } }
            }"#,
        )
        .unwrap();
        let config = CliConfig::load(&path).unwrap();
        assert_eq!(config.tinker.default_dialect, Dialect::Untyped);
        assert_eq!(config.tinker.limits.max_call_depth, 64);

        let log = LogConfig::from_section(&config.logging, None).unwrap();
        assert_eq!(log.global, Level::INFO);
        assert_eq!(log.level_for(Phase::Parser), Level::TRACE);
        assert_eq!(log.level_for(Phase::Runtime), Level::INFO);

        let log = LogConfig::from_section(&config.logging, Some("error")).unwrap();
        assert_eq!(log.level_for(Phase::Runtime), Level::ERROR);
    }

    #[test]
    fn test_bad_values_are_errors() {
        let section = LoggingSection {
            level: Some("loud".to_string()),
            phases: HashMap::new(),
        };
        assert!(matches!(LogConfig::from_section(&section, None), Err(ConfigError::Level(_))));
        let section = LoggingSection {
            level: None,
            phases: HashMap::from([("vm".to_string(), "info".to_string())]),
        };
        assert!(matches!(LogConfig::from_section(&section, None), Err(ConfigError::Phase(_))));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tinker.json");
        std::fs::write(&path, "{ nope").unwrap();
        assert!(matches!(CliConfig::load(&path), Err(ConfigError::Parse { .. })));
    }
}
