//! Values returned by trees.

use std::fmt;
use std::rc::Rc;

use serde_json::Value as Json;

use crate::{Tree, TreeRef};

/// A tree value: plain data or a subtree.
#[derive(Clone)]
pub enum Value {
    /// Scalars, strings and data that is not exposed as a tree.
    Data(Json),
    /// A nested tree.
    Tree(TreeRef),
}

impl Value {
    /// Wrap a tree implementation.
    pub fn tree(tree: impl Tree + 'static) -> Self {
        Value::Tree(Rc::new(tree))
    }

    pub fn is_tree(&self) -> bool {
        matches!(self, Value::Tree(_))
    }

    pub fn as_tree(&self) -> Option<&TreeRef> {
        match self {
            Value::Tree(tree) => Some(tree),
            Value::Data(_) => None,
        }
    }

    pub fn into_tree(self) -> Option<TreeRef> {
        match self {
            Value::Tree(tree) => Some(tree),
            Value::Data(_) => None,
        }
    }

    pub fn as_data(&self) -> Option<&Json> {
        match self {
            Value::Data(data) => Some(data),
            Value::Tree(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_data().and_then(Json::as_str)
    }

    /// Text form used for template interpolation and key substitution.
    /// Strings render bare, `null` renders empty.
    pub fn to_text(&self) -> String {
        match self {
            Value::Data(Json::String(s)) => s.clone(),
            Value::Data(Json::Null) => String::new(),
            Value::Data(other) => other.to_string(),
            Value::Tree(_) => "[tree]".to_string(),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Data(data) => write!(f, "Data({})", data),
            Value::Tree(_) => write!(f, "Tree(..)"),
        }
    }
}

impl From<Json> for Value {
    fn from(data: Json) -> Self {
        Value::Data(data)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Data(Json::String(s.to_string()))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Data(Json::String(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ObjectTree;
    use serde_json::json;

    #[test]
    fn test_to_text() {
        assert_eq!(Value::from("abc").to_text(), "abc");
        assert_eq!(Value::from(json!(5)).to_text(), "5");
        assert_eq!(Value::from(json!(null)).to_text(), "");
        assert_eq!(Value::from(json!(true)).to_text(), "true");
    }

    #[test]
    fn test_tree_accessors() {
        let value = Value::tree(ObjectTree::new());
        assert!(value.is_tree());
        assert!(value.as_data().is_none());
        assert!(value.as_str().is_none());
        assert!(value.into_tree().is_some());
    }

    #[test]
    fn test_null_is_present_data() {
        let value = Value::from(json!(null));
        assert!(!value.is_tree());
        assert_eq!(value.as_data(), Some(&Json::Null));
    }
}
