//! Scope chains.
//!
//! A [`Scope`] is an ordered, de-duplicated list of trees consulted for a
//! free lookup. Building a scope from members that are themselves scopes
//! splices their members in place, so chains never nest.

use async_trait::async_trait;
use indexmap::IndexSet;

use crate::{Tree, TreeError, TreeRef, Value};

/// Flattened search list over several trees.
pub struct Scope {
    trees: Vec<TreeRef>,
}

impl Scope {
    pub fn new<I>(members: I) -> Self
    where
        I: IntoIterator<Item = TreeRef>,
    {
        let mut trees: Vec<TreeRef> = Vec::new();
        for member in members {
            match member.as_scope() {
                Some(scope) => {
                    for tree in &scope.trees {
                        push_unique(&mut trees, tree.clone());
                    }
                }
                None => push_unique(&mut trees, member),
            }
        }
        Self { trees }
    }

    /// Members in search order.
    pub fn trees(&self) -> &[TreeRef] {
        &self.trees
    }

    pub fn len(&self) -> usize {
        self.trees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }
}

fn push_unique(trees: &mut Vec<TreeRef>, tree: TreeRef) {
    let id = tree.identity();
    if !trees.iter().any(|existing| existing.identity() == id) {
        trees.push(tree);
    }
}

#[async_trait(?Send)]
impl Tree for Scope {
    async fn get(&self, key: &str) -> Result<Option<Value>, TreeError> {
        for tree in &self.trees {
            if let Some(value) = tree.get(key).await? {
                return Ok(Some(value));
            }
        }
        Ok(None)
    }

    async fn keys(&self) -> Result<Vec<String>, TreeError> {
        let mut keys = IndexSet::new();
        for tree in &self.trees {
            keys.extend(tree.keys().await?);
        }
        Ok(keys.into_iter().collect())
    }

    fn as_scope(&self) -> Option<&Scope> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ObjectTree;
    use serde_json::json;
    use std::rc::Rc;

    fn tree(json: serde_json::Value) -> TreeRef {
        Rc::new(ObjectTree::from_json(json))
    }

    #[tokio::test]
    async fn test_first_defined_wins() {
        let scope = Scope::new(vec![tree(json!({ "a": 1 })), tree(json!({ "a": 2, "b": 3 }))]);
        assert_eq!(scope.get("a").await.unwrap().unwrap().as_data(), Some(&json!(1)));
        assert_eq!(scope.get("b").await.unwrap().unwrap().as_data(), Some(&json!(3)));
        assert!(scope.get("c").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_keys_are_ordered_union() {
        let scope = Scope::new(vec![tree(json!({ "b": 1, "a": 1 })), tree(json!({ "a": 2, "c": 3 }))]);
        assert_eq!(scope.keys().await.unwrap(), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_nested_scopes_flatten() {
        let a = tree(json!({}));
        let b = tree(json!({}));
        let c = tree(json!({}));
        let inner: TreeRef = Rc::new(Scope::new(vec![b.clone(), c.clone()]));
        let outer = Scope::new(vec![a.clone(), inner]);
        assert_eq!(outer.len(), 3);
        assert!(outer.trees().iter().all(|t| t.as_scope().is_none()));
    }

    #[test]
    fn test_duplicates_removed_keeping_first() {
        let a = tree(json!({}));
        let b = tree(json!({}));
        let inner: TreeRef = Rc::new(Scope::new(vec![b.clone(), a.clone()]));
        let scope = Scope::new(vec![a.clone(), inner, b.clone()]);
        assert_eq!(scope.len(), 2);
        assert!(Rc::ptr_eq(&scope.trees()[0], &a));
        assert!(Rc::ptr_eq(&scope.trees()[1], &b));
    }

    #[test]
    fn test_empty_scope() {
        let scope = Scope::new(Vec::new());
        assert!(scope.is_empty());
    }
}
