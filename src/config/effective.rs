//! Effective configuration with provenance
//!
//! The effective config captures the merged configuration plus the
//! sources that contributed to it.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use metagraph_formula::SimpleCompiler;

use super::defaults::Settings;
use super::merge::{deep_merge, merge_layers};
use crate::meta::MetaOptions;

/// Schema identifier
pub const SCHEMA_ID: &str = "metagraph/effective_config@1";

/// Project config file name, looked up in the tree root
pub const PROJECT_CONFIG_FILE: &str = ".metagraph.toml";

/// Upper bound for `eval.max_depth`
const MAX_DEPTH_LIMIT: u64 = 4096;

/// Origin of a configuration source
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ConfigOrigin {
    Builtin,
    User,
    Project,
    Cli,
}

/// A contributing config source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSource {
    pub origin: ConfigOrigin,

    /// File path (None for builtin/cli)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// Effective configuration with provenance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectiveConfig {
    pub schema_id: String,

    /// The merged configuration object
    pub config: Value,

    /// Contributing sources in precedence order
    pub sources: Vec<ConfigSource>,
}

impl EffectiveConfig {
    /// Build effective config from layers. Missing files are skipped.
    pub fn build(
        user_config_path: Option<&Path>,
        project_config_path: Option<&Path>,
        cli_overrides: Option<Value>,
    ) -> Result<Self, ConfigError> {
        let mut layers = vec![Settings::default().to_value()];
        let mut sources = vec![ConfigSource {
            origin: ConfigOrigin::Builtin,
            path: None,
        }];

        let files = [
            (ConfigOrigin::User, user_config_path),
            (ConfigOrigin::Project, project_config_path),
        ];
        for (origin, path) in files {
            let Some(path) = path.filter(|p| p.exists()) else {
                continue;
            };
            layers.push(Self::load_toml_file(path)?);
            sources.push(ConfigSource {
                origin,
                path: Some(path.to_string_lossy().to_string()),
            });
        }

        if let Some(cli) = cli_overrides {
            layers.push(cli);
            sources.push(ConfigSource {
                origin: ConfigOrigin::Cli,
                path: None,
            });
        }

        let merged = merge_layers(layers);
        Self::validate_config(&merged)?;
        tracing::debug!(sources = sources.len(), "built effective config");

        Ok(Self {
            schema_id: SCHEMA_ID.to_string(),
            config: merged,
            sources,
        })
    }

    /// Load and parse a TOML file
    fn load_toml_file(path: &Path) -> Result<Value, ConfigError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(format!("{}: {}", path.display(), e)))?;
        let toml_value: toml::Value = toml::from_str(&contents).map_err(|e| {
            ConfigError::ParseError(format!("{}: TOML parse error: {}", path.display(), e))
        })?;
        Ok(crate::files::loaders::toml_to_json(toml_value))
    }

    /// Turn `key.path=value` pairs into an override layer. Values that
    /// parse as JSON keep their type; anything else is a string.
    pub fn parse_overrides<S: AsRef<str>>(pairs: &[S]) -> Result<Value, ConfigError> {
        let mut layer = Value::Object(serde_json::Map::new());
        for pair in pairs {
            let pair = pair.as_ref();
            let (path, raw) = pair.split_once('=').ok_or_else(|| {
                ConfigError::ParseError(format!("override `{}` is not key=value", pair))
            })?;
            let path = path.trim();
            if path.is_empty() || path.split('.').any(str::is_empty) {
                return Err(ConfigError::ParseError(format!(
                    "override `{}` has an empty key",
                    pair
                )));
            }
            let value = serde_json::from_str(raw.trim())
                .unwrap_or_else(|_| Value::String(raw.trim().to_string()));
            let nested = path.rsplit('.').fold(value, |inner, key| {
                let mut map = serde_json::Map::new();
                map.insert(key.to_string(), inner);
                Value::Object(map)
            });
            layer = deep_merge(layer, nested);
        }
        Ok(layer)
    }

    /// Validate configuration values
    fn validate_config(config: &Value) -> Result<(), ConfigError> {
        let settings: Settings = serde_json::from_value(config.clone())
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?;

        let depth = settings.eval.max_depth;
        if depth == 0 || depth > MAX_DEPTH_LIMIT {
            return Err(ConfigError::ValidationError(format!(
                "eval.max_depth must be in (0, {}]",
                MAX_DEPTH_LIMIT
            )));
        }
        if settings.tree.addition_key.is_empty() {
            return Err(ConfigError::ValidationError(
                "tree.addition_key must not be empty".to_string(),
            ));
        }
        if settings.tree.peer_suffix.is_empty() {
            return Err(ConfigError::ValidationError(
                "tree.peer_suffix must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Typed settings
    pub fn settings(&self) -> Result<Settings, ConfigError> {
        serde_json::from_value(self.config.clone())
            .map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Options for meta trees built under this config
    pub fn meta_options(&self) -> Result<MetaOptions, ConfigError> {
        Ok(Self::options_from(&self.settings()?))
    }

    pub fn options_from(settings: &Settings) -> MetaOptions {
        MetaOptions {
            inherit_scope: settings.tree.inherit_scope,
            ghosts: settings.tree.ghosts,
            additions: settings.tree.additions,
            addition_key: settings.tree.addition_key.clone(),
            peer_suffix: settings.tree.peer_suffix.clone(),
            max_depth: settings.eval.max_depth as usize,
            compiler: Rc::new(SimpleCompiler),
        }
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Get a config value by path (dot-separated)
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut current = &self.config;
        for part in path.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }
}

/// `~/.config/metagraph/config.toml`, when a home directory is known
pub fn user_config_path() -> Option<PathBuf> {
    let home = std::env::var_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("metagraph")
            .join("config.toml"),
    )
}

/// `<root>/.metagraph.toml`
pub fn project_config_path(root: &Path) -> PathBuf {
    root.join(PROJECT_CONFIG_FILE)
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}
