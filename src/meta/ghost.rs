//! Ghost trees.
//!
//! A ghost is a tree laid behind another: the host answers first, then
//! each ghost in turn. Ghost keys join the host's keys and ghost formulas
//! join the host's formulas. When the host hands out a subtree at `key`,
//! the subtree's ghosts are:
//!
//! - the tree produced by a host formula for `key+` (e.g. `[x]+ = template`)
//! - each ghost's own subtree at `key`

use std::rc::Rc;

use metagraph_tree::{Tree, TreeError, Value};

use super::node::{Found, Origin};
use super::{Lookup, MetaBuilder, MetaTree};

impl MetaTree {
    pub(super) async fn find_in_ghosts(
        &self,
        key: &str,
        depth: usize,
    ) -> Result<Option<Found>, TreeError> {
        if !self.options.ghosts {
            return Ok(None);
        }
        for ghost in &self.ghosts {
            if let Some(found) = ghost.find(key, Lookup::Overlay, depth).await? {
                return Ok(Some(Found {
                    origin: Origin::Ghost,
                    ..found
                }));
            }
        }
        Ok(None)
    }

    /// Ghosts for the subtree this tree hands out at `key`.
    pub(super) async fn child_ghosts(
        &self,
        key: &str,
        mode: Lookup,
        depth: usize,
    ) -> Result<Vec<Rc<MetaTree>>, TreeError> {
        let mut ghosts = Vec::new();

        if mode != Lookup::Overlay {
            let ghost_key = format!("{}{}", key, self.options.peer_suffix);
            if let Some((Value::Tree(tree), bindings)) =
                self.evaluate_ghost_formulas(&ghost_key, mode, depth).await?
            {
                tracing::trace!(key = ghost_key.as_str(), "formula ghost attached");
                ghosts.push(
                    MetaBuilder::new(tree)
                        .shared_options(self.options.clone())
                        .shared_evaluations(self.evaluations.clone())
                        .bindings(bindings)
                        .detached()
                        .build(),
                );
            }
        }

        for ghost in &self.ghosts {
            let Some(found) = ghost.find(key, Lookup::Overlay, depth).await? else {
                continue;
            };
            if let Value::Tree(tree) = found.value {
                let wrapped = ghost
                    .wrap(key, tree, found.bindings, found.origin, Lookup::Overlay, depth)
                    .await?;
                ghosts.push(wrapped);
            }
        }
        Ok(ghosts)
    }

    pub(super) async fn ghost_keys(&self) -> Result<Vec<String>, TreeError> {
        let mut keys = Vec::new();
        if !self.options.ghosts {
            return Ok(keys);
        }
        for ghost in &self.ghosts {
            keys.extend(ghost.keys().await?);
        }
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::super::MetaOptions;
    use super::*;
    use metagraph_tree::{traverse, ObjectTree, TreeRef};
    use serde_json::json;

    fn object(json: serde_json::Value) -> TreeRef {
        Rc::new(ObjectTree::from_json(json))
    }

    #[tokio::test]
    async fn test_ghost_fills_missing_keys() {
        let tree = MetaBuilder::new(object(json!({ "a": "host" })))
            .ghost(object(json!({ "a": "ghost", "b": "ghost" })))
            .build();
        assert_eq!(tree.get("a").await.unwrap().unwrap().as_str(), Some("host"));
        assert_eq!(tree.get("b").await.unwrap().unwrap().as_str(), Some("ghost"));
        assert_eq!(tree.keys().await.unwrap(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_ghost_formulas_run_in_host() {
        let tree = MetaBuilder::new(object(json!({ "name": "host" })))
            .ghost(object(json!({ "greeting = name": null, "name": "ghost" })))
            .build();
        let value = tree.get("greeting").await.unwrap().unwrap();
        assert_eq!(value.as_str(), Some("host"));
    }

    #[tokio::test]
    async fn test_ghost_subtrees_merge() {
        let tree: TreeRef = MetaBuilder::new(object(json!({ "sub": { "a": 1 } })))
            .ghost(object(json!({ "sub": { "b": 2 } })))
            .build();
        let b = traverse(&tree, &["sub", "b"]).await.unwrap().unwrap();
        assert_eq!(b.as_data(), Some(&json!(2)));
        let sub = tree.get("sub").await.unwrap().unwrap().into_tree().unwrap();
        assert_eq!(sub.keys().await.unwrap(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_formula_ghost_applies_to_every_subtree() {
        let tree: TreeRef = MetaTree::new(object(json!({
            "[x]+ = {\"footer\": \"shared\"}": null,
            "one": { "a": 1 },
            "two": { "footer": "own" }
        })));
        let one = traverse(&tree, &["one", "footer"]).await.unwrap().unwrap();
        assert_eq!(one.as_str(), Some("shared"));
        let two = traverse(&tree, &["two", "footer"]).await.unwrap().unwrap();
        assert_eq!(two.as_str(), Some("own"));
    }

    #[tokio::test]
    async fn test_formula_ghost_carries_its_capture() {
        let tree: TreeRef = MetaTree::new(object(json!({
            "[x]+ = {\"title = 'Section {x}'\": null}": null,
            "posts": { "a": 1 }
        })));
        let x = traverse(&tree, &["posts", "x"]).await.unwrap().unwrap();
        assert_eq!(x.as_str(), Some("posts"));
        let title = traverse(&tree, &["posts", "title"]).await.unwrap().unwrap();
        assert_eq!(title.as_str(), Some("Section posts"));
    }

    #[tokio::test]
    async fn test_ghost_formula_reads_host_binding() {
        let tree = MetaBuilder::new(object(json!({})))
            .bindings([("page", "team")].into_iter().collect())
            .ghost(object(json!({ "heading = 'About {page}'": null })))
            .build();
        let value = tree.get("heading").await.unwrap().unwrap();
        assert_eq!(value.as_str(), Some("About team"));
    }

    #[tokio::test]
    async fn test_ghost_formula_reads_capture_of_formula_subtree() {
        let tree: TreeRef = MetaBuilder::new(object(json!({ "[section] = {}": null })))
            .ghost(object(json!({
                "about": { "heading = 'About {section}'": null }
            })))
            .build();
        let value = traverse(&tree, &["about", "heading"]).await.unwrap().unwrap();
        assert_eq!(value.as_str(), Some("About about"));
    }

    #[tokio::test]
    async fn test_ghosts_can_be_disabled() {
        let options = MetaOptions {
            ghosts: false,
            ..Default::default()
        };
        let tree = MetaBuilder::new(object(json!({ "a": 1 })))
            .options(options)
            .ghost(object(json!({ "b": 2 })))
            .build();
        assert!(tree.get("b").await.unwrap().is_none());
        assert_eq!(tree.keys().await.unwrap(), vec!["a"]);
    }
}
