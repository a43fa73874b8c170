use std::cell::RefCell;
use std::rc::{Rc, Weak};

use async_trait::async_trait;

use metagraph_formula::{settle, Bindings, Formula, KeySet};
use metagraph_tree::{
    sort_natural, ChangeEvent, LocalFuture, Tree, TreeError, TreeRef, Value,
};

use super::cache::MetaCache;
use super::formulas::Evaluations;
use super::{Lookup, MetaBuilder, MetaOptions};

/// A tree with formulas, scope inheritance, ghosts and additions layered
/// over a base tree.
///
/// Built with [`MetaBuilder`]. Always lives in an `Rc`: subtrees and scope
/// views hold a handle back to their parent.
pub struct MetaTree {
    pub(super) base: TreeRef,
    pub(super) bindings: Bindings,
    pub(super) scope: RefCell<Option<TreeRef>>,
    pub(super) ghosts: Vec<Rc<MetaTree>>,
    pub(super) peer_addition: Option<TreeRef>,
    pub(super) inherited: Vec<Formula>,
    pub(super) detached: bool,
    pub(super) options: Rc<MetaOptions>,
    pub(super) evaluations: Evaluations,
    pub(super) cache: RefCell<MetaCache>,
    pub(super) this: Weak<MetaTree>,
}

/// Where a locally found value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Origin {
    Binding,
    Real,
    ChildAddition,
    Formula,
    Ghost,
    PeerAddition,
}

/// A value found without consulting scope, plus the bindings its subtree
/// should carry.
pub(super) struct Found {
    pub value: Value,
    pub bindings: Bindings,
    pub origin: Origin,
}

impl Found {
    fn new(value: Value, bindings: Bindings, origin: Origin) -> Self {
        Self {
            value,
            bindings,
            origin,
        }
    }
}

impl MetaTree {
    /// Wrap `base` with default options and no scope.
    pub fn new(base: TreeRef) -> Rc<Self> {
        MetaBuilder::new(base).build()
    }

    pub fn builder(base: TreeRef) -> MetaBuilder {
        MetaBuilder::new(base)
    }

    pub fn base(&self) -> &TreeRef {
        &self.base
    }

    pub fn bindings(&self) -> &Bindings {
        &self.bindings
    }

    pub fn options(&self) -> &MetaOptions {
        &self.options
    }

    /// Full resolution of `key`. Scope is consulted only for
    /// [`Lookup::Direct`].
    pub(super) async fn lookup(
        &self,
        key: &str,
        mode: Lookup,
        depth: usize,
    ) -> Result<Option<Value>, TreeError> {
        let depth = depth.max(self.evaluations.running());
        if depth > self.options.max_depth {
            return Err(TreeError::Recursion {
                key: key.to_string(),
                depth,
            });
        }
        if let Some(found) = self.find(key, mode, depth).await? {
            return self.adopt(key, found, mode, depth).await.map(Some);
        }
        if mode == Lookup::Direct {
            if let Some(scope) = self.scope() {
                return scope.get(key).await;
            }
        }
        Ok(None)
    }

    /// Local resolution, every stage except scope.
    pub(super) fn find<'a>(
        &'a self,
        key: &'a str,
        mode: Lookup,
        depth: usize,
    ) -> LocalFuture<'a, Result<Option<Found>, TreeError>> {
        Box::pin(async move {
            if let Some(bound) = self.bindings.get(key) {
                let value = Value::from(bound);
                return Ok(Some(Found::new(value, self.bindings.clone(), Origin::Binding)));
            }
            if let Some(value) = self.base.get(key).await? {
                return Ok(Some(Found::new(value, self.bindings.clone(), Origin::Real)));
            }
            if let Some(value) = self.child_addition_value(key).await? {
                return Ok(Some(Found::new(
                    value,
                    self.bindings.clone(),
                    Origin::ChildAddition,
                )));
            }
            if let Some((value, bindings)) = self.evaluate_formulas(key, mode, depth).await? {
                return Ok(Some(Found::new(value, bindings, Origin::Formula)));
            }
            if let Some(found) = self.find_in_ghosts(key, depth).await? {
                return Ok(Some(found));
            }
            if let Some(value) = self.peer_addition_value(key).await? {
                return Ok(Some(Found::new(
                    value,
                    self.bindings.clone(),
                    Origin::PeerAddition,
                )));
            }
            Ok(None)
        })
    }

    async fn adopt(
        &self,
        key: &str,
        found: Found,
        mode: Lookup,
        depth: usize,
    ) -> Result<Value, TreeError> {
        let Found {
            value,
            bindings,
            origin,
        } = found;
        match value {
            Value::Tree(tree) => {
                let child: TreeRef = self.wrap(key, tree, bindings, origin, mode, depth).await?;
                Ok(Value::Tree(child))
            }
            data => Ok(data),
        }
    }

    /// Turn a subtree found at `key` into a meta tree of its own.
    pub(super) fn wrap<'a>(
        &'a self,
        key: &'a str,
        tree: TreeRef,
        bindings: Bindings,
        origin: Origin,
        mode: Lookup,
        depth: usize,
    ) -> LocalFuture<'a, Result<Rc<MetaTree>, TreeError>> {
        Box::pin(async move {
            let reusable = origin == Origin::Real && mode == Lookup::Direct;
            if reusable {
                let cached = self.cache.borrow().child(key, &tree);
                if let Some(child) = cached {
                    return Ok(child);
                }
            }

            let mut builder = MetaBuilder::new(tree.clone())
                .shared_options(self.options.clone())
                .shared_evaluations(self.evaluations.clone())
                .bindings(bindings)
                .inherited(self.inheritable_formulas().await?);
            if self.detached {
                builder = builder.detached();
            } else if self.options.inherit_scope && tree.inherits_scope() {
                if let Some(scope) = self.child_scope() {
                    builder = builder.scope(scope);
                }
            }
            if self.options.ghosts {
                builder = builder.ghost_nodes(self.child_ghosts(key, mode, depth).await?);
            }
            if let Some(addition) = self.peer_addition_for(key).await? {
                builder = builder.peer_addition(addition);
            }
            let child = builder.build();

            if reusable {
                self.cache.borrow_mut().remember_child(key, &tree, &child);
            }
            tracing::trace!(key, ?origin, "wrapped subtree");
            Ok(child)
        })
    }

    /// Keys of the base that are data rather than formulas or overlays.
    pub(super) fn is_visible_key(&self, key: &str) -> bool {
        key != self.options.addition_key
            && !key.ends_with(&self.options.peer_suffix)
            && Formula::parse_with(key, self.options.compiler.as_ref()).is_none()
    }

    async fn visible_keys(&self) -> Result<Vec<String>, TreeError> {
        let cached = self.cache.borrow().keys.clone();
        if let Some(keys) = cached {
            return Ok(keys.as_ref().clone());
        }

        let formulas = self.local_formulas().await?;
        let mut keys = KeySet::new();
        for key in self.base.keys().await? {
            if self.is_visible_key(&key) {
                keys.insert(key);
            }
        }
        for key in self.child_addition_keys().await? {
            keys.insert(key);
        }
        let passes = settle(formulas.as_slice(), &mut keys);
        tracing::trace!(passes, keys = keys.len(), "implied keys settled");
        for key in self.ghost_keys().await? {
            keys.insert(key);
        }
        for key in self.peer_addition_keys().await? {
            keys.insert(key);
        }

        let mut keys: Vec<String> = keys
            .into_iter()
            .filter(|key| self.is_visible_key(key))
            .collect();
        sort_natural(&mut keys);
        self.cache.borrow_mut().keys = Some(Rc::new(keys.clone()));
        Ok(keys)
    }
}

#[async_trait(?Send)]
impl Tree for MetaTree {
    async fn get(&self, key: &str) -> Result<Option<Value>, TreeError> {
        self.lookup(key, Lookup::Direct, 0).await
    }

    async fn keys(&self) -> Result<Vec<String>, TreeError> {
        self.visible_keys().await
    }

    fn on_change(&self, event: ChangeEvent, key: &str) {
        tracing::debug!(?event, key, "invalidating meta tree");
        let addition = self.cache.borrow().addition.clone().flatten();
        self.cache.borrow_mut().invalidate();
        self.base.on_change(event, key);
        if let Some(addition) = addition {
            addition.on_change(event, key);
        }
        if let Some(addition) = &self.peer_addition {
            addition.on_change(event, key);
        }
        for ghost in &self.ghosts {
            ghost.on_change(event, key);
        }
    }

    fn inherits_scope(&self) -> bool {
        self.base.inherits_scope()
    }
}
