//! Layered configuration
//!
//! 1. Built-in defaults
//! 2. User config (~/.config/metagraph/config.toml)
//! 3. Project config (<root>/.metagraph.toml)
//! 4. CLI overrides (--set key=value)

mod defaults;
mod effective;
mod merge;

pub use defaults::{EvalSettings, FileSettings, Settings, TreeSettings};
pub use effective::{
    project_config_path, user_config_path, ConfigError, ConfigOrigin, ConfigSource,
    EffectiveConfig, PROJECT_CONFIG_FILE,
};
pub use merge::{deep_merge, merge_layers};
