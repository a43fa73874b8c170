//! Memoized per-node state.

use std::collections::HashMap;
use std::rc::{Rc, Weak};

use metagraph_formula::Formula;
use metagraph_tree::TreeRef;

use super::MetaTree;

/// Everything a meta tree memoizes. Cleared as a whole by
/// [`MetaCache::invalidate`] when the tree is told about a change.
#[derive(Default)]
pub(super) struct MetaCache {
    pub formulas: Option<Rc<Vec<Formula>>>,
    pub keys: Option<Rc<Vec<String>>>,
    pub addition: Option<Option<TreeRef>>,
    children: HashMap<String, CachedChild>,
}

/// Wrapper handed out for a real subtree. Held weakly: the child's scope
/// points back at this node.
struct CachedChild {
    base: TreeRef,
    node: Weak<MetaTree>,
}

impl MetaCache {
    pub fn invalidate(&mut self) {
        *self = Self::default();
    }

    /// The wrapper previously built for `key`, if it wraps the same base
    /// subtree and is still alive.
    pub fn child(&self, key: &str, base: &TreeRef) -> Option<Rc<MetaTree>> {
        let cached = self.children.get(key)?;
        if cached.base.identity() != base.identity() {
            return None;
        }
        cached.node.upgrade()
    }

    pub fn remember_child(&mut self, key: &str, base: &TreeRef, node: &Rc<MetaTree>) {
        self.children.insert(
            key.to_string(),
            CachedChild {
                base: base.clone(),
                node: Rc::downgrade(node),
            },
        );
    }

    pub fn forget_children(&mut self) {
        self.children.clear();
    }
}
