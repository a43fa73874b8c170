//! Built-in defaults (layer 1) and the typed settings they describe.

use serde::{Deserialize, Serialize};

/// Typed view of the merged configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub tree: TreeSettings,
    pub eval: EvalSettings,
    pub files: FileSettings,
}

/// `[tree]`: which overlays a meta tree applies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeSettings {
    /// Subtrees see their parents (default: true)
    pub inherit_scope: bool,

    /// Ghost trees are consulted (default: true)
    pub ghosts: bool,

    /// `+` and `<name>+` subtrees are merged (default: true)
    pub additions: bool,

    /// Key of a child addition (default: "+")
    pub addition_key: String,

    /// Suffix of peer additions and ghost keys (default: "+")
    pub peer_suffix: String,
}

impl Default for TreeSettings {
    fn default() -> Self {
        Self {
            inherit_scope: true,
            ghosts: true,
            additions: true,
            addition_key: "+".to_string(),
            peer_suffix: "+".to_string(),
        }
    }
}

/// `[eval]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalSettings {
    /// Maximum formula nesting (default: 64)
    pub max_depth: u64,
}

impl Default for EvalSettings {
    fn default() -> Self {
        Self { max_depth: 64 }
    }
}

/// `[files]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileSettings {
    /// Parse .json and .toml files (default: true)
    pub loaders: bool,

    /// Extra glob patterns hidden from file trees
    pub exclude: Vec<String>,
}

impl Default for FileSettings {
    fn default() -> Self {
        Self {
            loaders: true,
            exclude: Vec::new(),
        }
    }
}

impl Settings {
    /// Convert to JSON Value for merging
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::json!({
            "tree": {
                "inherit_scope": self.tree.inherit_scope,
                "ghosts": self.tree.ghosts,
                "additions": self.tree.additions,
                "addition_key": self.tree.addition_key,
                "peer_suffix": self.tree.peer_suffix
            },
            "eval": {
                "max_depth": self.eval.max_depth
            },
            "files": {
                "loaders": self.files.loaders,
                "exclude": self.files.exclude
            }
        })
    }
}
