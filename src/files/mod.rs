//! Directories as trees.
//!
//! A [`FileTree`] exposes one directory: its keys are entry names, a
//! subdirectory is a subtree and a file is its loaded contents.

mod exclude;
pub mod loaders;

pub use exclude::{ExcludeError, ExcludeRules, IGNORE_FILE};

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use async_trait::async_trait;
use walkdir::WalkDir;

use metagraph_tree::{Tree, TreeError, Value};

use crate::config::FileSettings;

/// One directory below a root. Paths checked against [`ExcludeRules`] are
/// relative to that root.
#[derive(Debug, Clone)]
pub struct FileTree {
    root: PathBuf,
    relative: PathBuf,
    rules: Rc<ExcludeRules>,
    loaders: bool,
}

impl FileTree {
    pub fn new(root: impl Into<PathBuf>, rules: ExcludeRules) -> Self {
        Self {
            root: root.into(),
            relative: PathBuf::new(),
            rules: Rc::new(rules),
            loaders: true,
        }
    }

    /// Default exclusions plus configured patterns and the root's
    /// `.metagraphignore`.
    pub fn from_settings(root: &Path, settings: &FileSettings) -> Result<Self, ExcludeError> {
        let rules = ExcludeRules::new()?
            .with_patterns(&settings.exclude)?
            .with_ignore_file(&root.join(IGNORE_FILE))?;
        Ok(Self::new(root, rules).with_loaders(settings.loaders))
    }

    /// When disabled every file is returned as text.
    pub fn with_loaders(mut self, loaders: bool) -> Self {
        self.loaders = loaders;
        self
    }

    /// Absolute path of this directory.
    pub fn path(&self) -> PathBuf {
        self.root.join(&self.relative)
    }

    fn child(&self, relative: PathBuf) -> Self {
        Self {
            root: self.root.clone(),
            relative,
            rules: self.rules.clone(),
            loaders: self.loaders,
        }
    }
}

/// Single path component, no traversal.
fn is_entry_name(key: &str) -> bool {
    !key.is_empty() && key != "." && key != ".." && !key.contains(['/', '\\'])
}

#[async_trait(?Send)]
impl Tree for FileTree {
    async fn get(&self, key: &str) -> Result<Option<Value>, TreeError> {
        if !is_entry_name(key) {
            return Ok(None);
        }
        let relative = self.relative.join(key);
        if self.rules.is_excluded(&relative) {
            return Ok(None);
        }
        let path = self.root.join(&relative);
        let metadata = match fs::metadata(&path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if metadata.is_dir() {
            return Ok(Some(Value::tree(self.child(relative))));
        }
        let bytes = fs::read(&path)?;
        tracing::trace!(path = %path.display(), bytes = bytes.len(), "read file");
        if self.loaders {
            loaders::load(key, bytes).map(Some)
        } else {
            Ok(Some(loaders::text(bytes)))
        }
    }

    async fn keys(&self) -> Result<Vec<String>, TreeError> {
        let walker = WalkDir::new(self.path())
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name();
        let mut keys = Vec::new();
        for entry in walker {
            let entry = entry.map_err(io::Error::from)?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if self.rules.is_excluded(&self.relative.join(&name)) {
                continue;
            }
            keys.push(name);
        }
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn tree(dir: &TempDir) -> FileTree {
        FileTree::new(dir.path(), ExcludeRules::new().unwrap())
    }

    #[tokio::test]
    async fn test_keys_sorted_and_filtered() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("b.txt"), "b").unwrap();
        fs::write(dir.path().join("a.txt"), "a").unwrap();
        fs::create_dir(dir.path().join(".git")).unwrap();

        assert_eq!(tree(&dir).keys().await.unwrap(), vec!["a.txt", "b.txt"]);
    }

    #[tokio::test]
    async fn test_get_rejects_traversal() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub/a.txt"), "a").unwrap();
        let tree = tree(&dir);

        assert!(tree.get("..").await.unwrap().is_none());
        assert!(tree.get("sub/a.txt").await.unwrap().is_none());
        assert!(tree.get("").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_directory_is_subtree() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub/a.txt"), "hello").unwrap();

        let sub = tree(&dir).get("sub").await.unwrap().unwrap().into_tree().unwrap();
        assert_eq!(sub.get("a.txt").await.unwrap().unwrap().as_str(), Some("hello"));
    }

    #[tokio::test]
    async fn test_loaders_can_be_disabled() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("data.json"), "{\"a\": 1}").unwrap();

        let raw = tree(&dir).with_loaders(false);
        let value = raw.get("data.json").await.unwrap().unwrap();
        assert_eq!(value.as_str(), Some("{\"a\": 1}"));
    }
}
