//! Async tree contract shared by every metagraph layer.
//!
//! A tree answers `get(key)` with a value, a subtree or nothing, and lists
//! its keys in a meaningful order. Storage backends implement [`Tree`];
//! overlays wrap other trees and only intercept the calls they care about.

mod error;
mod object;
mod scope;
mod sort;
mod value;

pub use error::TreeError;
pub use object::ObjectTree;
pub use scope::Scope;
pub use sort::{natural_cmp, sort_natural};
pub use value::Value;

use async_trait::async_trait;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;

/// Shared handle to any tree.
pub type TreeRef = Rc<dyn Tree>;

/// Boxed, non-`Send` future used by recursive tree walks.
pub type LocalFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// Kind of change reported through [`Tree::on_change`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeEvent {
    Created,
    Modified,
    Removed,
}

/// The uniform key/value contract.
///
/// All operations run on a single thread; implementations may suspend at
/// any `.await` but must not hold interior borrows across one.
#[async_trait(?Send)]
pub trait Tree {
    /// Value at `key`. `Ok(None)` means absent, which is distinct from a
    /// present `null`.
    async fn get(&self, key: &str) -> Result<Option<Value>, TreeError>;

    /// Keys in iteration order.
    async fn keys(&self) -> Result<Vec<String>, TreeError>;

    /// Invalidation hook. Implementations holding memoized state must clear
    /// it before returning.
    fn on_change(&self, _event: ChangeEvent, _key: &str) {}

    /// Whether this tree takes its parent as scope when exposed as a subtree.
    fn inherits_scope(&self) -> bool {
        true
    }

    /// Downcast hook used by [`Scope`] to flatten nested chains.
    fn as_scope(&self) -> Option<&Scope> {
        None
    }

    /// Identity used when de-duplicating scope chains. Views over another
    /// tree report the identity of the tree they view.
    fn identity(&self) -> *const () {
        self as *const Self as *const ()
    }
}

/// Follow `path` from `tree`, one `get` per segment.
pub async fn traverse(tree: &TreeRef, path: &[&str]) -> Result<Option<Value>, TreeError> {
    let mut current = Value::Tree(tree.clone());
    for segment in path {
        let Some(next) = current.as_tree().cloned() else {
            return Ok(None);
        };
        match next.get(segment).await? {
            Some(value) => current = value,
            None => return Ok(None),
        }
    }
    Ok(Some(current))
}

/// Resolve a whole tree into plain JSON, walking `keys()` and `get()`.
pub fn plain(tree: &dyn Tree) -> LocalFuture<'_, Result<serde_json::Value, TreeError>> {
    Box::pin(async move {
        let mut map = serde_json::Map::new();
        for key in tree.keys().await? {
            let value = match tree.get(&key).await? {
                Some(Value::Tree(subtree)) => plain(subtree.as_ref()).await?,
                Some(Value::Data(data)) => data,
                None => continue,
            };
            map.insert(key, value);
        }
        Ok(serde_json::Value::Object(map))
    })
}
