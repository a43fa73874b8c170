//! In-memory adapter for plain data.
//!
//! This is the single place where arbitrary data becomes a tree: JSON
//! objects and arrays turn into nested [`ObjectTree`]s, everything else
//! stays [`Value::Data`].

use async_trait::async_trait;
use indexmap::IndexMap;
use serde_json::Value as Json;

use crate::{Tree, TreeError, Value};

/// A tree over an ordered in-memory map.
#[derive(Default, Clone)]
pub struct ObjectTree {
    entries: IndexMap<String, Value>,
}

impl ObjectTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from JSON. Object keys keep their document order; array
    /// elements are keyed by index. A scalar yields an empty tree.
    pub fn from_json(json: Json) -> Self {
        let mut tree = Self::new();
        match json {
            Json::Object(map) => {
                for (key, value) in map {
                    tree.entries.insert(key, Self::convert(value));
                }
            }
            Json::Array(items) => {
                for (index, value) in items.into_iter().enumerate() {
                    tree.entries.insert(index.to_string(), Self::convert(value));
                }
            }
            _ => {}
        }
        tree
    }

    /// Convert a JSON value, turning objects and arrays into subtrees.
    pub fn convert(json: Json) -> Value {
        match json {
            Json::Object(_) | Json::Array(_) => Value::tree(Self::from_json(json)),
            other => Value::Data(other),
        }
    }

    /// Insert an entry, builder style.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait(?Send)]
impl Tree for ObjectTree {
    async fn get(&self, key: &str) -> Result<Option<Value>, TreeError> {
        Ok(self.entries.get(key).cloned())
    }

    async fn keys(&self) -> Result<Vec<String>, TreeError> {
        Ok(self.entries.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::rc::Rc;

    #[tokio::test]
    async fn test_keys_keep_document_order() {
        let tree = ObjectTree::from_json(json!({ "zeta": 1, "alpha": 2, "mid": 3 }));
        assert_eq!(tree.keys().await.unwrap(), vec!["zeta", "alpha", "mid"]);
    }

    #[tokio::test]
    async fn test_nested_objects_become_trees() {
        let tree = ObjectTree::from_json(json!({ "sub": { "a": 1 }, "list": [1, 2] }));
        let sub = tree.get("sub").await.unwrap().unwrap();
        let sub = sub.as_tree().unwrap();
        assert_eq!(sub.get("a").await.unwrap().unwrap().as_data(), Some(&json!(1)));

        let list = tree.get("list").await.unwrap().unwrap();
        let list = list.as_tree().unwrap();
        assert_eq!(list.keys().await.unwrap(), vec!["0", "1"]);
    }

    #[tokio::test]
    async fn test_subtree_identity_is_stable() {
        let tree = ObjectTree::from_json(json!({ "sub": {} }));
        let first = tree.get("sub").await.unwrap().unwrap().into_tree().unwrap();
        let second = tree.get("sub").await.unwrap().unwrap().into_tree().unwrap();
        assert!(Rc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_missing_and_null_differ() {
        let tree = ObjectTree::from_json(json!({ "a": null }));
        assert!(tree.get("a").await.unwrap().is_some());
        assert!(tree.get("b").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_builder_insert() {
        let tree = ObjectTree::new()
            .with("a", json!(1))
            .with("b", Value::tree(ObjectTree::new()));
        assert_eq!(tree.len(), 2);
        assert!(tree.get("b").await.unwrap().unwrap().is_tree());
    }
}
