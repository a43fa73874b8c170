//! Error types for tree operations.

use std::io;

/// Errors surfaced by `get`/`keys`.
///
/// Malformed formula keys and failed unifications are not errors; they are
/// reported as `None` by the formula layer.
#[derive(Debug, thiserror::Error)]
pub enum TreeError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to parse {path}: {message}")]
    Parse { path: String, message: String },

    #[error("Formula `{formula}` failed: {message}")]
    Evaluation { formula: String, message: String },

    #[error("Evaluating `{key}` exceeded depth {depth}")]
    Recursion { key: String, depth: usize },
}

impl TreeError {
    pub fn evaluation(formula: impl Into<String>, message: impl Into<String>) -> Self {
        TreeError::Evaluation {
            formula: formula.into(),
            message: message.into(),
        }
    }
}
