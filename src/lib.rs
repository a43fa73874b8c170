//! metagraph - lazy async trees with formulas
//!
//! Wraps any [`Tree`] in a [`MetaTree`] that adds formula keys
//! (`[x].html = x.md`), scope inheritance, ghost trees and additions.
//! [`open_directory`] builds one over a directory using the layered
//! configuration in [`config`].

pub mod config;
pub mod files;
pub mod meta;

pub use metagraph_formula::{
    implied_keys, settle, Bindings, Compiler, EvalContext, Expression, Formula, FormulaKind,
    KeyPattern, Rule, SimpleCompiler,
};
pub use metagraph_tree::{
    plain, traverse, ChangeEvent, ObjectTree, Scope, Tree, TreeError, TreeRef, Value,
};

pub use config::{ConfigError, EffectiveConfig, Settings};
pub use files::{ExcludeError, FileTree};
pub use meta::{MetaBuilder, MetaOptions, MetaTree};

use std::path::Path;
use std::rc::Rc;

/// Errors from [`open_directory`]
#[derive(Debug, thiserror::Error)]
pub enum OpenError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Exclude(#[from] ExcludeError),
}

/// Expose the directory at `root` as a meta tree configured by `config`.
pub fn open_directory(root: &Path, config: &EffectiveConfig) -> Result<Rc<MetaTree>, OpenError> {
    let settings = config.settings()?;
    let files = FileTree::from_settings(root, &settings.files)?;
    tracing::debug!(root = %root.display(), "opening directory");
    Ok(MetaBuilder::new(Rc::new(files))
        .options(EffectiveConfig::options_from(&settings))
        .build())
}
