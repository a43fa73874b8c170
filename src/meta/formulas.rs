//! Formula resolution for meta trees.

use std::cell::Cell;
use std::rc::Rc;

use async_trait::async_trait;

use metagraph_formula::{sort_formulas, Bindings, EvalContext, Formula};
use metagraph_tree::{LocalFuture, TreeError, TreeRef, Value};

use super::{Lookup, MetaTree};

impl MetaTree {
    /// Formulas that apply to this tree: its own formula keys, those
    /// inherited from ancestors and those of its ghosts, constants first.
    pub(super) fn local_formulas(&self) -> LocalFuture<'_, Result<Rc<Vec<Formula>>, TreeError>> {
        Box::pin(async move {
            let cached = self.cache.borrow().formulas.clone();
            if let Some(formulas) = cached {
                return Ok(formulas);
            }

            let compiler = self.options.compiler.as_ref();
            let mut formulas = Vec::new();
            for key in self.base.keys().await? {
                if let Some(formula) = Formula::parse_with(&key, compiler) {
                    formulas.push(formula.with_closure(self.bindings.clone()));
                }
            }
            for formula in &self.inherited {
                push_unique(&mut formulas, formula);
            }
            if self.options.ghosts {
                for ghost in &self.ghosts {
                    for formula in ghost.local_formulas().await?.iter() {
                        push_unique(&mut formulas, formula);
                    }
                }
            }
            sort_formulas(&mut formulas);
            tracing::trace!(count = formulas.len(), "collected formulas");

            let formulas = Rc::new(formulas);
            self.cache.borrow_mut().formulas = Some(formulas.clone());
            Ok(formulas)
        })
    }

    /// The formulas handed down to subtrees.
    pub(super) async fn inheritable_formulas(&self) -> Result<Vec<Formula>, TreeError> {
        let formulas = self.local_formulas().await?;
        Ok(formulas
            .iter()
            .filter(|f| f.is_inheritable())
            .cloned()
            .collect())
    }

    /// All formulas, in resolution order. Inherited and ghost formulas are
    /// included.
    pub async fn formulas(&self) -> Result<Vec<Formula>, TreeError> {
        Ok(self.local_formulas().await?.as_ref().clone())
    }

    /// First formula matching `key` that produces a value, with the
    /// bindings it ran under.
    pub(super) async fn evaluate_formulas(
        &self,
        key: &str,
        mode: Lookup,
        depth: usize,
    ) -> Result<Option<(Value, Bindings)>, TreeError> {
        self.evaluate_matching(key, mode, depth, |_| true).await
    }

    /// Like [`evaluate_formulas`](Self::evaluate_formulas) but only for
    /// formulas whose pattern names a ghost key (`<name>+`).
    pub(super) async fn evaluate_ghost_formulas(
        &self,
        key: &str,
        mode: Lookup,
        depth: usize,
    ) -> Result<Option<(Value, Bindings)>, TreeError> {
        let suffix = self.options.peer_suffix.as_str();
        self.evaluate_matching(key, mode, depth, |formula| {
            formula.pattern().to_string().ends_with(suffix)
        })
        .await
    }

    async fn evaluate_matching<F>(
        &self,
        key: &str,
        mode: Lookup,
        depth: usize,
        filter: F,
    ) -> Result<Option<(Value, Bindings)>, TreeError>
    where
        F: Fn(&Formula) -> bool,
    {
        let formulas = self.local_formulas().await?;
        for formula in formulas.iter() {
            if !mode.allows(formula) || !filter(formula) {
                continue;
            }
            let Some(captured) = formula.unify(key) else {
                continue;
            };
            let bindings = formula.closure().merge(&self.bindings).merge(&captured);
            let ctx = DerivedContext::new(self, bindings, depth + 1);
            let _running = self.evaluations.enter();
            if let Some(value) = formula.evaluate(&ctx).await? {
                tracing::debug!(formula = formula.key(), key, "formula matched");
                return Ok(Some((value, ctx.bindings)));
            }
        }
        Ok(None)
    }
}

/// Formula evaluations in flight across one family of meta trees.
///
/// Shared by a tree, its subtrees and its ghosts. Re-entering a tree through
/// `Tree::get` starts a fresh depth count, so this is what bounds cycles like
/// `a = this/a`.
#[derive(Debug, Clone, Default)]
pub(crate) struct Evaluations(Rc<Cell<usize>>);

impl Evaluations {
    pub fn running(&self) -> usize {
        self.0.get()
    }

    fn enter(&self) -> Running {
        self.0.set(self.0.get() + 1);
        Running(self.0.clone())
    }
}

/// Marks one evaluation as running until dropped.
struct Running(Rc<Cell<usize>>);

impl Drop for Running {
    fn drop(&mut self) {
        self.0.set(self.0.get().saturating_sub(1));
    }
}

/// Inherited and ghost formulas can reach a tree along more than one path.
fn push_unique(formulas: &mut Vec<Formula>, formula: &Formula) {
    let seen = formulas
        .iter()
        .any(|f| f.key() == formula.key() && f.closure() == formula.closure());
    if !seen {
        formulas.push(formula.clone());
    }
}

/// Evaluation context for a formula running inside a meta tree.
pub(super) struct DerivedContext<'a> {
    node: &'a MetaTree,
    bindings: Bindings,
    depth: usize,
}

impl<'a> DerivedContext<'a> {
    pub fn new(node: &'a MetaTree, bindings: Bindings, depth: usize) -> Self {
        Self {
            node,
            bindings,
            depth,
        }
    }
}

#[async_trait(?Send)]
impl<'a> EvalContext for DerivedContext<'a> {
    fn bindings(&self) -> &Bindings {
        &self.bindings
    }

    fn tree(&self) -> Option<TreeRef> {
        let node: TreeRef = self.node.this.upgrade()?;
        Some(node)
    }

    fn scope(&self) -> Option<TreeRef> {
        self.node.scope()
    }

    async fn lookup(&self, key: &str) -> Result<Option<Value>, TreeError> {
        if let Some(bound) = self.bindings.get(key) {
            return Ok(Some(Value::from(bound)));
        }
        self.node.lookup(key, Lookup::Direct, self.depth).await
    }
}
