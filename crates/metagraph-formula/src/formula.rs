//! Formula keys.
//!
//! A key of the form `<pattern> = <expression>` is a rule rather than
//! data. Constant formulas (`a = b`) match one key; variable formulas
//! (`[x].html = x.txt`, or any pattern prefixed with `…`/`...`) match by
//! unification. Prefixed formulas are also inherited by subtrees.

use std::fmt;
use std::rc::Rc;
use std::sync::OnceLock;

use regex_lite::Regex;

use metagraph_tree::{TreeError, Value};

use crate::closure::KeySet;
use crate::expr::{Compiler, EvalContext, Expression, SimpleCompiler};
use crate::pattern::KeyPattern;
use crate::Bindings;

/// Splits a key at its first `=`, with an optional inheritance marker.
const FORMULA_KEY: &str = r"^\s*(…|\.\.\.)?([^=]*?)\s*=\s*(.*?)\s*$";

fn formula_key_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(FORMULA_KEY).expect("formula key pattern is valid"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormulaKind {
    Constant,
    Variable,
}

/// A parsed formula key.
#[derive(Debug, Clone)]
pub struct Formula {
    key: String,
    pattern: KeyPattern,
    /// Pattern of the key the expression reads, when it reads one key.
    source: Option<KeyPattern>,
    expression: Rc<dyn Expression>,
    inheritable: bool,
    closure: Bindings,
}

impl Formula {
    /// Parse with the default compiler.
    pub fn parse(key: &str) -> Option<Self> {
        Self::parse_with(key, &SimpleCompiler)
    }

    /// Parse `key` as a formula. Anything that is not a well-formed formula
    /// yields `None` so the key stays ordinary data.
    pub fn parse_with(key: &str, compiler: &dyn Compiler) -> Option<Self> {
        let captures = formula_key_regex().captures(key)?;
        let inheritable = captures.get(1).is_some();
        let pattern = KeyPattern::parse(captures.get(2)?.as_str().trim())?;
        let expression = compiler.compile(captures.get(3)?.as_str())?;
        let source = expression
            .source_key()
            .and_then(|text| source_pattern(&pattern, text));
        Some(Self {
            key: key.to_string(),
            pattern,
            source,
            expression,
            inheritable,
            closure: Bindings::new(),
        })
    }

    /// The full key text this formula was parsed from.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn pattern(&self) -> &KeyPattern {
        &self.pattern
    }

    pub fn kind(&self) -> FormulaKind {
        if self.pattern.is_constant() && !self.inheritable {
            FormulaKind::Constant
        } else {
            FormulaKind::Variable
        }
    }

    pub fn is_wildcard(&self) -> bool {
        self.kind() == FormulaKind::Variable
    }

    /// True for `…`-prefixed formulas, which subtrees inherit.
    pub fn is_inheritable(&self) -> bool {
        self.inheritable
    }

    /// Bindings in effect where the formula was defined.
    pub fn closure(&self) -> &Bindings {
        &self.closure
    }

    pub fn with_closure(mut self, closure: Bindings) -> Self {
        self.closure = closure;
        self
    }

    /// Match `key`, returning the captured bindings.
    pub fn unify(&self, key: &str) -> Option<Bindings> {
        self.pattern.unify(key)
    }

    /// Add the keys this formula implies given the keys already present.
    /// Returns whether anything was added.
    pub fn add_implied_keys(&self, keys: &mut KeySet) -> bool {
        let mut implied = Vec::new();
        if let Some(key) = self.pattern.instantiate(&self.closure) {
            implied.push(key);
        } else if let Some(source) = &self.source {
            for key in keys.iter() {
                if let Some(captured) = source.unify(key) {
                    if let Some(target) = self.pattern.instantiate(&self.closure.merge(&captured)) {
                        implied.push(target);
                    }
                }
            }
        }
        let mut added = false;
        for key in implied {
            added |= keys.insert(key);
        }
        added
    }

    /// Run the expression. Errors are returned unchanged.
    pub async fn evaluate(&self, ctx: &dyn EvalContext) -> Result<Option<Value>, TreeError> {
        self.expression.evaluate(ctx).await
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key)
    }
}

/// Rewrite the expression's source key into a pattern by turning tokens
/// that name one of the formula's captures into captures.
fn source_pattern(pattern: &KeyPattern, source: &str) -> Option<KeyPattern> {
    let names: Vec<&str> = pattern.capture_names().collect();
    if names.is_empty() {
        return None;
    }
    let text = source
        .split('.')
        .map(|token| {
            if names.contains(&token) {
                format!("[{}]", token)
            } else {
                token.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(".");
    KeyPattern::parse(&text).filter(|p| !p.is_constant())
}

/// Stable sort putting constant formulas ahead of variable ones.
pub fn sort_formulas(formulas: &mut [Formula]) {
    formulas.sort_by_key(Formula::is_wildcard);
}
