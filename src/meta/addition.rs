//! Additions: subtrees whose contents are merged into another tree.
//!
//! A child addition is the base's `+` subtree; its entries appear as if
//! they were entries of the tree itself, behind the real ones. A peer
//! addition `<name>+` sits next to `<name>` in the parent and is merged
//! into the `<name>` subtree behind its formulas and ghosts.

use metagraph_tree::{TreeError, TreeRef, Value};

use super::MetaTree;

impl MetaTree {
    pub(super) async fn child_addition(&self) -> Result<Option<TreeRef>, TreeError> {
        if !self.options.additions {
            return Ok(None);
        }
        let cached = self.cache.borrow().addition.clone();
        if let Some(addition) = cached {
            return Ok(addition);
        }
        let addition = self
            .base
            .get(&self.options.addition_key)
            .await?
            .and_then(Value::into_tree);
        self.cache.borrow_mut().addition = Some(addition.clone());
        Ok(addition)
    }

    pub(super) async fn child_addition_value(&self, key: &str) -> Result<Option<Value>, TreeError> {
        match self.child_addition().await? {
            Some(addition) => addition.get(key).await,
            None => Ok(None),
        }
    }

    pub(super) async fn child_addition_keys(&self) -> Result<Vec<String>, TreeError> {
        let Some(addition) = self.child_addition().await? else {
            return Ok(Vec::new());
        };
        let keys = addition.keys().await?;
        Ok(keys.into_iter().filter(|k| self.is_visible_key(k)).collect())
    }

    /// The real `<key>+` subtree, if there is one.
    pub(super) async fn peer_addition_for(&self, key: &str) -> Result<Option<TreeRef>, TreeError> {
        if !self.options.additions {
            return Ok(None);
        }
        let peer_key = format!("{}{}", key, self.options.peer_suffix);
        Ok(self.base.get(&peer_key).await?.and_then(Value::into_tree))
    }

    pub(super) async fn peer_addition_value(&self, key: &str) -> Result<Option<Value>, TreeError> {
        match &self.peer_addition {
            Some(addition) if self.options.additions => addition.get(key).await,
            _ => Ok(None),
        }
    }

    pub(super) async fn peer_addition_keys(&self) -> Result<Vec<String>, TreeError> {
        match &self.peer_addition {
            Some(addition) if self.options.additions => addition.keys().await,
            _ => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::super::{MetaBuilder, MetaOptions};
    use super::*;
    use metagraph_tree::{traverse, ObjectTree, Tree};
    use serde_json::json;

    fn tree(json: serde_json::Value) -> TreeRef {
        MetaTree::new(Rc::new(ObjectTree::from_json(json)))
    }

    #[tokio::test]
    async fn test_child_addition_merges_entries() {
        let tree = tree(json!({ "a": 1, "+": { "a": 0, "b": 2 } }));
        assert_eq!(tree.get("a").await.unwrap().unwrap().as_data(), Some(&json!(1)));
        assert_eq!(tree.get("b").await.unwrap().unwrap().as_data(), Some(&json!(2)));
        assert_eq!(tree.keys().await.unwrap(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_peer_addition_merges_into_sibling() {
        let tree = tree(json!({
            "posts": { "a": "real" },
            "posts+": { "a": "added", "b": "added" }
        }));
        let a = traverse(&tree, &["posts", "a"]).await.unwrap().unwrap();
        assert_eq!(a.as_str(), Some("real"));
        let b = traverse(&tree, &["posts", "b"]).await.unwrap().unwrap();
        assert_eq!(b.as_str(), Some("added"));
        let posts = tree.get("posts").await.unwrap().unwrap().into_tree().unwrap();
        assert_eq!(posts.keys().await.unwrap(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_nested_child_additions() {
        let tree = tree(json!({
            "+": { "sub": { "+": { "deep": true } } }
        }));
        let deep = traverse(&tree, &["sub", "deep"]).await.unwrap().unwrap();
        assert_eq!(deep.as_data(), Some(&json!(true)));
    }

    #[tokio::test]
    async fn test_additions_can_be_disabled() {
        let options = MetaOptions {
            additions: false,
            ..Default::default()
        };
        let tree = MetaBuilder::new(Rc::new(ObjectTree::from_json(json!({
            "+": { "b": 2 }
        }))))
        .options(options)
        .build();
        assert!(tree.get("b").await.unwrap().is_none());
    }
}
