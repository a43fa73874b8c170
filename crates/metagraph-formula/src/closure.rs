//! Fixed-point expansion of key sets.
//!
//! Rules keep firing over the growing set until a full pass adds nothing.
//! The set only grows, so finite rule sets settle; pattern rules can keep
//! producing new keys (`[x].html = x` implies `a.html`, `a.html.html`, ...),
//! so passes are capped at [`MAX_PASSES`].

use indexmap::IndexSet;

use crate::Formula;

/// Insertion-ordered key set.
pub type KeySet = IndexSet<String>;

/// Upper bound on passes before the closure gives up on settling.
pub const MAX_PASSES: usize = 64;

/// Anything that can add implied keys to a set.
pub trait Implication {
    /// Add implied keys; returns whether the set grew.
    fn add_implied_keys(&self, keys: &mut KeySet) -> bool;
}

/// A plain forward-chaining rule: `consequent` holds once every
/// antecedent is present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub consequent: String,
    pub antecedents: Vec<String>,
}

impl Rule {
    pub fn new<I, S>(consequent: impl Into<String>, antecedents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            consequent: consequent.into(),
            antecedents: antecedents.into_iter().map(Into::into).collect(),
        }
    }
}

impl Implication for Rule {
    fn add_implied_keys(&self, keys: &mut KeySet) -> bool {
        if keys.contains(&self.consequent) {
            return false;
        }
        if !self.antecedents.iter().all(|a| keys.contains(a)) {
            return false;
        }
        keys.insert(self.consequent.clone())
    }
}

impl Implication for Formula {
    fn add_implied_keys(&self, keys: &mut KeySet) -> bool {
        Formula::add_implied_keys(self, keys)
    }
}

/// Apply `rules` to `keys` until a pass adds nothing. Returns the number
/// of passes run.
pub fn settle<R: Implication>(rules: &[R], keys: &mut KeySet) -> usize {
    let mut passes = 0;
    loop {
        passes += 1;
        let mut changed = false;
        for rule in rules {
            changed |= rule.add_implied_keys(keys);
        }
        if !changed {
            return passes;
        }
        if passes >= MAX_PASSES {
            tracing::warn!(keys = keys.len(), "implied keys did not settle after {} passes", passes);
            return passes;
        }
    }
}

/// Closure of `base` under `rules`.
pub fn implied_keys<R, I>(rules: &[R], base: I) -> KeySet
where
    R: Implication,
    I: IntoIterator<Item = String>,
{
    let mut keys: KeySet = base.into_iter().collect();
    settle(rules, &mut keys);
    keys
}
