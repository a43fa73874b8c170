//! Scope inheritance.
//!
//! A subtree's scope is its parent followed by the parent's own scope. The
//! parent is seen through an [`InScopeView`], which answers with everything
//! the parent defines except wildcard formulas: `[x].html = ...` at the
//! root must not answer for every key looked up in every subtree.

use std::rc::Rc;

use async_trait::async_trait;

use metagraph_formula::Formula;
use metagraph_tree::{Scope, Tree, TreeError, TreeRef, Value};

use super::MetaTree;

/// How much of a meta tree takes part in a lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    /// Everything, then scope.
    Direct,
    /// Reached through a descendant's scope: wildcard formulas are skipped
    /// and scope is not chained (the scope list already holds it).
    Inherited,
    /// A host consulting its ghosts. The host has already run the ghost's
    /// formulas in its own context.
    Overlay,
}

impl Lookup {
    pub(super) fn allows(self, formula: &Formula) -> bool {
        match self {
            Lookup::Direct => true,
            Lookup::Inherited => !formula.is_wildcard(),
            Lookup::Overlay => false,
        }
    }
}

/// A meta tree as it appears in a descendant's scope.
pub(super) struct InScopeView {
    node: Rc<MetaTree>,
}

#[async_trait(?Send)]
impl Tree for InScopeView {
    async fn get(&self, key: &str) -> Result<Option<Value>, TreeError> {
        self.node.lookup(key, Lookup::Inherited, 0).await
    }

    async fn keys(&self) -> Result<Vec<String>, TreeError> {
        self.node.keys().await
    }

    fn identity(&self) -> *const () {
        Rc::as_ptr(&self.node) as *const ()
    }
}

impl MetaTree {
    pub fn scope(&self) -> Option<TreeRef> {
        self.scope.borrow().clone()
    }

    /// Replace the scope. Subtrees handed out earlier keep the old one.
    pub fn set_scope(&self, scope: Option<TreeRef>) {
        *self.scope.borrow_mut() = if self.detached { None } else { scope };
        self.cache.borrow_mut().forget_children();
    }

    /// Scope for a subtree of this tree: this tree, then this tree's scope.
    pub(super) fn child_scope(&self) -> Option<TreeRef> {
        if self.detached {
            return None;
        }
        let node = self.this.upgrade()?;
        let view: TreeRef = Rc::new(InScopeView { node });
        let mut members = vec![view];
        if let Some(scope) = self.scope() {
            members.push(scope);
        }
        Some(Rc::new(Scope::new(members)))
    }
}
