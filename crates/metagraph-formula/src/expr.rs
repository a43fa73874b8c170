//! Expression interface consumed by formulas, plus a minimal default
//! compiler.
//!
//! The engine only needs an [`Expression`] it can evaluate against an
//! [`EvalContext`]. [`SimpleCompiler`] understands:
//!
//! - JSON literals: `5`, `true`, `null`, `"text"`, `[1, 2]`, `{"a": 1}`.
//!   Objects and arrays evaluate to fresh subtrees.
//! - Templates: `'Hello {name}'`. A name is replaced by its binding, else
//!   by the text of the looked-up value, else by nothing.
//! - References: `b`, `x.txt`, `site/index.html`. Within each `/`
//!   segment, `.`-separated tokens that name a binding are substituted.
//!   The first segment is looked up in the context (`this` is the owning
//!   tree); later segments descend.

use std::fmt;
use std::rc::Rc;

use async_trait::async_trait;
use serde_json::Value as Json;

use metagraph_tree::{ObjectTree, TreeError, TreeRef, Value};

use crate::Bindings;

/// What a formula sees while it is evaluated.
#[async_trait(?Send)]
pub trait EvalContext {
    /// Captures in effect, already merged.
    fn bindings(&self) -> &Bindings;

    /// The tree the formula belongs to.
    fn tree(&self) -> Option<TreeRef>;

    /// The scope of that tree.
    fn scope(&self) -> Option<TreeRef>;

    /// Resolve a free name: bindings, then the owning tree, then its scope.
    async fn lookup(&self, key: &str) -> Result<Option<Value>, TreeError>;
}

/// A compiled right-hand side.
#[async_trait(?Send)]
pub trait Expression: fmt::Debug {
    async fn evaluate(&self, ctx: &dyn EvalContext) -> Result<Option<Value>, TreeError>;

    /// The key text this expression reads when it reads exactly one key of
    /// the owning tree. Used to derive implied keys.
    fn source_key(&self) -> Option<&str> {
        None
    }
}

/// Turns expression source into an [`Expression`].
pub trait Compiler: fmt::Debug {
    /// `None` when the source is not a valid expression.
    fn compile(&self, source: &str) -> Option<Rc<dyn Expression>>;
}

/// The default compiler.
#[derive(Debug, Default, Clone, Copy)]
pub struct SimpleCompiler;

impl Compiler for SimpleCompiler {
    fn compile(&self, source: &str) -> Option<Rc<dyn Expression>> {
        let source = source.trim();
        if source.is_empty() {
            return None;
        }
        if let Some(body) = source.strip_prefix('\'') {
            let body = body.strip_suffix('\'')?;
            return Some(Rc::new(SimpleExpression::Template(parse_template(body)?)));
        }
        if let Ok(json) = serde_json::from_str::<Json>(source) {
            return Some(Rc::new(SimpleExpression::Literal(json)));
        }
        parse_reference(source).map(|e| Rc::new(e) as Rc<dyn Expression>)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum TemplatePart {
    Text(String),
    Name(String),
}

#[derive(Debug, Clone, PartialEq)]
enum SimpleExpression {
    Literal(Json),
    Template(Vec<TemplatePart>),
    Reference { source: String, path: Vec<String> },
}

fn parse_template(body: &str) -> Option<Vec<TemplatePart>> {
    let mut parts = Vec::new();
    let mut text = String::new();
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        match c {
            '{' => {
                let mut name = String::new();
                let mut closed = false;
                for inner in chars.by_ref() {
                    if inner == '}' {
                        closed = true;
                        break;
                    }
                    name.push(inner);
                }
                let name = name.trim().to_string();
                if !closed || name.is_empty() {
                    return None;
                }
                if !text.is_empty() {
                    parts.push(TemplatePart::Text(std::mem::take(&mut text)));
                }
                parts.push(TemplatePart::Name(name));
            }
            '}' | '\'' => return None,
            other => text.push(other),
        }
    }
    if !text.is_empty() {
        parts.push(TemplatePart::Text(text));
    }
    Some(parts)
}

fn parse_reference(source: &str) -> Option<SimpleExpression> {
    let invalid = |c: char| c.is_whitespace() || "'\"{}[]()=,".contains(c);
    if source.chars().any(invalid) {
        return None;
    }
    let path: Vec<String> = source.split('/').map(str::to_string).collect();
    if path.iter().any(String::is_empty) {
        return None;
    }
    Some(SimpleExpression::Reference {
        source: source.to_string(),
        path,
    })
}

/// Replace `.`-separated tokens that name a binding.
fn substitute(segment: &str, bindings: &Bindings) -> String {
    segment
        .split('.')
        .map(|token| bindings.get(token).unwrap_or(token))
        .collect::<Vec<_>>()
        .join(".")
}

#[async_trait(?Send)]
impl Expression for SimpleExpression {
    async fn evaluate(&self, ctx: &dyn EvalContext) -> Result<Option<Value>, TreeError> {
        match self {
            SimpleExpression::Literal(json) => Ok(Some(ObjectTree::convert(json.clone()))),
            SimpleExpression::Template(parts) => {
                let mut text = String::new();
                for part in parts {
                    match part {
                        TemplatePart::Text(s) => text.push_str(s),
                        TemplatePart::Name(name) => match ctx.bindings().get(name) {
                            Some(bound) => text.push_str(bound),
                            None => {
                                if let Some(value) = ctx.lookup(name).await? {
                                    text.push_str(&value.to_text());
                                }
                            }
                        },
                    }
                }
                Ok(Some(Value::from(text)))
            }
            SimpleExpression::Reference { path, .. } => {
                let mut segments = path.iter().map(|s| substitute(s, ctx.bindings()));
                let Some(first) = segments.next() else {
                    return Ok(None);
                };
                let mut current = if first == "this" {
                    ctx.tree().map(Value::Tree)
                } else {
                    ctx.lookup(&first).await?
                };
                for segment in segments {
                    current = match current {
                        Some(Value::Tree(tree)) => tree.get(&segment).await?,
                        _ => return Ok(None),
                    };
                }
                Ok(current)
            }
        }
    }

    fn source_key(&self) -> Option<&str> {
        match self {
            SimpleExpression::Reference { source, path } if path.len() == 1 => Some(source),
            _ => None,
        }
    }
}
