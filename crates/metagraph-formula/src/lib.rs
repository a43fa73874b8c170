//! Formula keys for metagraph trees.
//!
//! A formula is a key such as `[name].html = name.md`: a pattern on the
//! left, an expression on the right. This crate parses formulas, unifies
//! them against requested keys, computes the keys they imply and evaluates
//! them against an [`EvalContext`].

mod bindings;
pub mod closure;
pub mod expr;
mod formula;
mod pattern;

pub use bindings::Bindings;
pub use closure::{implied_keys, settle, Implication, KeySet, Rule};
pub use expr::{Compiler, EvalContext, Expression, SimpleCompiler};
pub use formula::{sort_formulas, Formula, FormulaKind};
pub use pattern::{KeyPattern, Segment};

/// Parse `key` as a formula with the default compiler.
pub fn parse_formula(key: &str) -> Option<Formula> {
    Formula::parse(key)
}
