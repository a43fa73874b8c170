//! Meta trees: formulas, scope inheritance, ghosts and additions over any
//! base tree.
//!
//! A [`MetaTree`] wraps a base tree and resolves `get(key)` through these
//! stages, first defined value wins:
//!
//! 1. bindings captured by an enclosing formula match
//! 2. the base tree's real value
//! 3. the child addition (the base's `+` subtree)
//! 4. formulas, constants before wildcards
//! 5. ghost trees
//! 6. the peer addition (the parent's `<name>+` subtree)
//! 7. the inherited scope
//!
//! Every subtree leaving a meta tree is wrapped by [`MetaBuilder`] so the
//! stages apply at every level.

mod addition;
mod cache;
mod formulas;
mod ghost;
mod inherit;
mod node;

pub use inherit::Lookup;
pub use node::MetaTree;

use std::rc::Rc;

use metagraph_formula::{Bindings, Compiler, Formula, SimpleCompiler};
use metagraph_tree::TreeRef;

use cache::MetaCache;
use formulas::Evaluations;
use std::cell::RefCell;

/// Behavior switches shared by a meta tree and all of its descendants.
#[derive(Debug, Clone)]
pub struct MetaOptions {
    /// Subtrees take their parent as scope.
    pub inherit_scope: bool,
    /// Ghost trees are attached and consulted.
    pub ghosts: bool,
    /// `+` and `<name>+` subtrees are merged.
    pub additions: bool,
    /// Key of the child addition.
    pub addition_key: String,
    /// Suffix naming a peer addition or ghost key (`<name>+`).
    pub peer_suffix: String,
    /// Maximum nesting of formula evaluations.
    pub max_depth: usize,
    /// Compiles formula right-hand sides.
    pub compiler: Rc<dyn Compiler>,
}

impl Default for MetaOptions {
    fn default() -> Self {
        Self {
            inherit_scope: true,
            ghosts: true,
            additions: true,
            addition_key: "+".to_string(),
            peer_suffix: "+".to_string(),
            max_depth: 64,
            compiler: Rc::new(SimpleCompiler),
        }
    }
}

/// Builds a [`MetaTree`].
pub struct MetaBuilder {
    base: TreeRef,
    options: Rc<MetaOptions>,
    bindings: Bindings,
    scope: Option<TreeRef>,
    ghosts: Vec<Rc<MetaTree>>,
    raw_ghosts: Vec<TreeRef>,
    peer_addition: Option<TreeRef>,
    inherited: Vec<Formula>,
    evaluations: Evaluations,
    detached: bool,
}

impl MetaBuilder {
    pub fn new(base: TreeRef) -> Self {
        Self {
            base,
            options: Rc::new(MetaOptions::default()),
            bindings: Bindings::new(),
            scope: None,
            ghosts: Vec::new(),
            raw_ghosts: Vec::new(),
            peer_addition: None,
            inherited: Vec::new(),
            evaluations: Evaluations::default(),
            detached: false,
        }
    }

    pub fn options(mut self, options: MetaOptions) -> Self {
        self.options = Rc::new(options);
        self
    }

    pub(crate) fn shared_options(mut self, options: Rc<MetaOptions>) -> Self {
        self.options = options;
        self
    }

    /// Bindings visible to lookups and formulas in the new tree.
    pub fn bindings(mut self, bindings: Bindings) -> Self {
        self.bindings = bindings;
        self
    }

    /// Tree (or [`metagraph_tree::Scope`]) consulted when local resolution
    /// finds nothing.
    pub fn scope(mut self, scope: TreeRef) -> Self {
        self.scope = Some(scope);
        self
    }

    /// Seed the scope from `parent`: the parent first, then its own scope.
    pub fn parent(mut self, parent: &Rc<MetaTree>) -> Self {
        self.scope = parent.child_scope();
        self
    }

    /// Attach a ghost tree. Ghosts are consulted in the order added.
    pub fn ghost(mut self, ghost: TreeRef) -> Self {
        self.raw_ghosts.push(ghost);
        self
    }

    /// Subtree merged below formulas and ghosts.
    pub fn peer_addition(mut self, addition: TreeRef) -> Self {
        self.peer_addition = Some(addition);
        self
    }

    /// Count evaluations together with an existing family of trees.
    pub(crate) fn shared_evaluations(mut self, evaluations: Evaluations) -> Self {
        self.evaluations = evaluations;
        self
    }

    pub(crate) fn ghost_nodes(mut self, ghosts: Vec<Rc<MetaTree>>) -> Self {
        self.ghosts.extend(ghosts);
        self
    }

    pub(crate) fn inherited(mut self, formulas: Vec<Formula>) -> Self {
        self.inherited = formulas;
        self
    }

    /// Detached trees never take or hand out a scope; ghosts are built
    /// this way.
    pub(crate) fn detached(mut self) -> Self {
        self.detached = true;
        self.scope = None;
        self
    }

    pub fn build(self) -> Rc<MetaTree> {
        let options = self.options;
        let mut ghosts = self.ghosts;
        for raw in self.raw_ghosts {
            ghosts.push(
                MetaBuilder::new(raw)
                    .shared_options(options.clone())
                    .shared_evaluations(self.evaluations.clone())
                    .detached()
                    .build(),
            );
        }
        let scope = if self.detached { None } else { self.scope };
        Rc::new_cyclic(|this| MetaTree {
            base: self.base,
            bindings: self.bindings,
            scope: RefCell::new(scope),
            ghosts,
            peer_addition: self.peer_addition,
            inherited: self.inherited,
            detached: self.detached,
            options,
            evaluations: self.evaluations,
            cache: RefCell::new(MetaCache::default()),
            this: this.clone(),
        })
    }
}
