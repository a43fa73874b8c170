//! Shared helpers for integration tests
//!
//! - In-memory trees built from JSON
//! - A small site directory on disk

#![allow(dead_code)]

use std::fs;
use std::path::Path;
use std::rc::Rc;

use serde_json::Value as Json;
use tempfile::TempDir;

use metagraph::{traverse, MetaTree, ObjectTree, Tree, TreeRef};

/// Plain in-memory tree
pub fn object(json: Json) -> TreeRef {
    Rc::new(ObjectTree::from_json(json))
}

/// Meta tree with default options over `json`
pub fn meta(json: Json) -> Rc<MetaTree> {
    MetaTree::new(object(json))
}

/// Text of the value at a slash-separated path
pub async fn text(tree: &TreeRef, path: &str) -> Option<String> {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    traverse(tree, &segments)
        .await
        .unwrap()
        .map(|value| value.to_text())
}

/// Data at a slash-separated path; panics on subtrees
pub async fn data(tree: &TreeRef, path: &str) -> Option<Json> {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    traverse(tree, &segments)
        .await
        .unwrap()
        .map(|value| value.as_data().cloned().expect("expected data, found a tree"))
}

/// Subtree at a slash-separated path
pub async fn subtree(tree: &TreeRef, path: &str) -> TreeRef {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    traverse(tree, &segments)
        .await
        .unwrap()
        .and_then(|value| value.into_tree())
        .expect("expected a subtree")
}

pub async fn keys(tree: &dyn Tree) -> Vec<String> {
    tree.keys().await.unwrap()
}

fn write(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, contents).unwrap();
}

/// A small site:
///
/// ```text
/// site/
///   .metagraph.toml
///   title.txt               "My Site"
///   [x].html = x.md         (formula file, empty)
///   about.md                "About"
///   settings.json           {"theme": "dark", "nav": ["home", "about"]}
///   posts/
///     hello.md              "Hello"
///     meta.toml             author = "ann"
///   posts+/
///     footer.txt            "Footer"
///   drafts/
///     secret.md             "wip"
///   .metagraphignore        "drafts"
/// ```
pub fn site_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write(root, ".metagraph.toml", "[eval]\nmax_depth = 32\n");
    write(root, "title.txt", "My Site");
    write(root, "[x].html = x.md", "");
    write(root, "about.md", "About");
    write(
        root,
        "settings.json",
        r#"{"theme": "dark", "nav": ["home", "about"]}"#,
    );
    write(root, "posts/hello.md", "Hello");
    write(root, "posts/meta.toml", "author = \"ann\"\n");
    write(root, "posts+/footer.txt", "Footer");
    write(root, "drafts/secret.md", "wip");
    write(root, ".metagraphignore", "drafts\n");
    dir
}
