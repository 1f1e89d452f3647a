//! QRC Configuration Management
//!
//! Handles configuration from environment variables, config files,
//! and command-line arguments with defaults tuned for readable diagrams.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Concept map pipeline configuration
    pub concept_map: ConceptMapConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        EnvOverrides::from_env()?.apply(&mut config);
        config.concept_map.validate()?;
        Ok(config)
    }

    /// Load from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path,
            message: e.to_string(),
        })?;
        config.concept_map.validate()?;
        Ok(config)
    }

    /// Merge with environment variables (env takes precedence)
    pub fn with_env_override(self) -> Result<Self, ConfigError> {
        self.with_overrides(EnvOverrides::from_env()?)
    }

    /// Apply every override that is set, then re-validate
    pub fn with_overrides(mut self, overrides: EnvOverrides) -> Result<Self, ConfigError> {
        overrides.apply(&mut self);
        self.concept_map.validate()?;
        Ok(self)
    }
}

/// Settings taken from environment variables; `None` means the variable is unset
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvOverrides {
    pub max_nodes: Option<usize>,
    pub max_edges: Option<usize>,
    pub declare_isolated_nodes: Option<bool>,
    pub direction: Option<Direction>,
    pub lexicon_path: Option<PathBuf>,
    pub log_level: Option<String>,
    pub log_json: Option<bool>,
}

impl EnvOverrides {
    /// Read the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read overrides through `lookup`, which returns a variable's value if set
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            max_nodes: lookup("QRC_MAX_NODES")
                .map(|v| parse_env("QRC_MAX_NODES", v))
                .transpose()?,
            max_edges: lookup("QRC_MAX_EDGES")
                .map(|v| parse_env("QRC_MAX_EDGES", v))
                .transpose()?,
            declare_isolated_nodes: lookup("QRC_DECLARE_ISOLATED")
                .map(|v| parse_flag("QRC_DECLARE_ISOLATED", v))
                .transpose()?,
            direction: lookup("QRC_DIRECTION").map(|v| v.parse()).transpose()?,
            lexicon_path: lookup("QRC_LEXICON").map(PathBuf::from),
            log_level: lookup("LOG_LEVEL"),
            log_json: lookup("LOG_FORMAT").map(|v| v.trim().eq_ignore_ascii_case("json")),
        })
    }

    fn apply(self, config: &mut AppConfig) {
        let map = &mut config.concept_map;
        if let Some(max_nodes) = self.max_nodes {
            map.max_nodes = max_nodes;
        }
        if let Some(max_edges) = self.max_edges {
            map.max_edges = max_edges;
        }
        if let Some(declare) = self.declare_isolated_nodes {
            map.declare_isolated_nodes = declare;
        }
        if let Some(direction) = self.direction {
            map.direction = direction;
        }
        if let Some(path) = self.lexicon_path {
            map.lexicon_path = Some(path);
        }

        // Logging
        if let Some(level) = self.log_level {
            config.logging.level = level;
        }
        if let Some(json) = self.log_json {
            config.logging.json_format = json;
        }
    }
}

fn parse_env(key: &str, value: String) -> Result<usize, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value,
    })
}

fn parse_flag(key: &str, value: String) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value,
        }),
    }
}

/// Concept map pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConceptMapConfig {
    /// Maximum number of nodes kept after assembly
    pub max_nodes: usize,

    /// Maximum number of edges kept after node pruning
    pub max_edges: usize,

    /// Render entities that have no edges
    pub declare_isolated_nodes: bool,

    /// Longest capitalized phrase (in words) accepted as an entity
    pub max_phrase_words: usize,

    /// Display labels are cut to this many words
    pub max_label_words: usize,

    /// Diagram direction
    pub direction: Direction,

    /// Lexicon TOML file replacing the built-in quantum tables
    pub lexicon_path: Option<PathBuf>,
}

impl Default for ConceptMapConfig {
    fn default() -> Self {
        Self {
            max_nodes: 15,
            max_edges: 20,
            declare_isolated_nodes: false,
            max_phrase_words: 4,
            max_label_words: 4,
            direction: Direction::TopDown,
            lexicon_path: None,
        }
    }
}

impl ConceptMapConfig {
    /// Reject settings that would make every phrase or label unusable
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_phrase_words < 2 {
            return Err(ConfigError::InvalidValue {
                key: "max_phrase_words".to_string(),
                value: self.max_phrase_words.to_string(),
            });
        }
        if self.max_label_words == 0 {
            return Err(ConfigError::InvalidValue {
                key: "max_label_words".to_string(),
                value: self.max_label_words.to_string(),
            });
        }
        Ok(())
    }
}

/// Flow direction written in the diagram header
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    #[serde(rename = "TD")]
    TopDown,
    #[serde(rename = "LR")]
    LeftRight,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TopDown => "TD",
            Self::LeftRight => "LR",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Direction {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "td" | "tb" => Ok(Self::TopDown),
            "lr" => Ok(Self::LeftRight),
            _ => Err(ConfigError::InvalidValue {
                key: "QRC_DIRECTION".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// JSON format for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.concept_map.max_nodes, 15);
        assert_eq!(config.concept_map.max_edges, 20);
        assert!(!config.concept_map.declare_isolated_nodes);
        assert_eq!(config.concept_map.direction, Direction::TopDown);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_toml() {
        let config: AppConfig = toml::from_str(
            r#"
            [concept_map]
            max_nodes = 20
            max_edges = 30
            direction = "LR"
            "#,
        )
        .unwrap();

        assert_eq!(config.concept_map.max_nodes, 20);
        assert_eq!(config.concept_map.max_edges, 30);
        assert_eq!(config.concept_map.direction, Direction::LeftRight);
        // Unset fields fall back to defaults
        assert_eq!(config.concept_map.max_label_words, 4);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_direction_parse() {
        assert_eq!("td".parse::<Direction>().unwrap(), Direction::TopDown);
        assert_eq!("LR".parse::<Direction>().unwrap(), Direction::LeftRight);
        assert!("diagonal".parse::<Direction>().is_err());
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("K", "yes".to_string()).unwrap());
        assert!(!parse_flag("K", "0".to_string()).unwrap());
        assert!(parse_flag("K", "maybe".to_string()).is_err());
    }

    #[test]
    fn test_validate_rejects_degenerate_limits() {
        let config = ConceptMapConfig {
            max_phrase_words: 1,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ConceptMapConfig {
            max_label_words: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    fn lookup<'a>(vars: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |key| {
            vars.iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn test_env_overrides_file_values() {
        let path = std::env::temp_dir().join(format!("qrc-config-{}.toml", std::process::id()));
        std::fs::write(
            &path,
            "[concept_map]\nmax_nodes = 30\ndeclare_isolated_nodes = true\n\n[logging]\njson_format = true\n",
        )
        .unwrap();
        let file_config = AppConfig::from_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(file_config.concept_map.max_nodes, 30);

        // Env values equal to the defaults still win over the file
        let overrides = EnvOverrides::from_lookup(lookup(&[
            ("QRC_MAX_NODES", "15"),
            ("QRC_DECLARE_ISOLATED", "false"),
            ("LOG_FORMAT", "text"),
        ]))
        .unwrap();
        let config = file_config.with_overrides(overrides).unwrap();

        assert_eq!(config.concept_map.max_nodes, 15);
        assert!(!config.concept_map.declare_isolated_nodes);
        assert!(!config.logging.json_format);
        // Unset variables leave file values alone
        assert_eq!(config.concept_map.max_edges, 20);
    }

    #[test]
    fn test_unset_env_keeps_config() {
        let config = AppConfig {
            concept_map: ConceptMapConfig {
                max_edges: 7,
                direction: Direction::LeftRight,
                ..Default::default()
            },
            ..Default::default()
        };
        let overrides = EnvOverrides::from_lookup(|_| None).unwrap();
        assert_eq!(overrides, EnvOverrides::default());

        let merged = config.clone().with_overrides(overrides).unwrap();
        assert_eq!(merged.concept_map, config.concept_map);
    }

    #[test]
    fn test_invalid_env_value() {
        let err = EnvOverrides::from_lookup(lookup(&[("QRC_MAX_EDGES", "many")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "QRC_MAX_EDGES"));
    }

    #[test]
    fn test_missing_file() {
        let err = AppConfig::from_file("/nonexistent/qrc.toml").unwrap_err();
        assert!(matches!(err, ConfigError::FileReadError { .. }));
    }
}
