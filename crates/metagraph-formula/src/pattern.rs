//! Key patterns with bracketed captures.
//!
//! `[name].html` matches `index.html` binding `name = "index"`. A capture
//! absorbs at least one character unless written `[name?]`. A name used
//! twice must absorb the same text both times.

use std::fmt;
use std::sync::OnceLock;

use regex_lite::Regex;

use crate::Bindings;

const CAPTURE_NAME: &str = r"^[A-Za-z_][A-Za-z0-9_]*$";

fn capture_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(CAPTURE_NAME).expect("capture name pattern is valid"))
}

/// One piece of a pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Capture { name: String, optional: bool },
}

/// A parsed key pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPattern {
    segments: Vec<Segment>,
}

impl KeyPattern {
    /// Parse pattern text. Returns `None` for empty text, unbalanced
    /// brackets or invalid capture names.
    pub fn parse(text: &str) -> Option<Self> {
        if text.is_empty() {
            return None;
        }
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = text.chars();
        while let Some(c) = chars.next() {
            match c {
                '[' => {
                    let mut name = String::new();
                    let mut closed = false;
                    for inner in chars.by_ref() {
                        match inner {
                            ']' => {
                                closed = true;
                                break;
                            }
                            '[' => return None,
                            other => name.push(other),
                        }
                    }
                    if !closed {
                        return None;
                    }
                    let optional = name.ends_with('?');
                    if optional {
                        name.pop();
                    }
                    if !capture_name_regex().is_match(&name) {
                        return None;
                    }
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Capture { name, optional });
                }
                ']' => return None,
                other => literal.push(other),
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }
        Some(Self { segments })
    }

    /// A pattern that matches exactly `text`.
    pub fn literal(text: &str) -> Self {
        Self {
            segments: vec![Segment::Literal(text.to_string())],
        }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// True when the pattern has no captures.
    pub fn is_constant(&self) -> bool {
        self.segments
            .iter()
            .all(|s| matches!(s, Segment::Literal(_)))
    }

    pub fn capture_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Capture { name, .. } => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Match `key` against the pattern.
    pub fn unify(&self, key: &str) -> Option<Bindings> {
        let mut bindings = Bindings::new();
        if match_segments(&self.segments, key, &mut bindings) {
            Some(bindings)
        } else {
            None
        }
    }

    /// Substitute bindings into the pattern. Fails if a required capture
    /// is unbound; unbound optional captures render empty.
    pub fn instantiate(&self, bindings: &Bindings) -> Option<String> {
        let mut key = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => key.push_str(text),
                Segment::Capture { name, optional } => match bindings.get(name) {
                    Some(value) => key.push_str(value),
                    None if *optional => {}
                    None => return None,
                },
            }
        }
        Some(key)
    }
}

fn match_segments(segments: &[Segment], key: &str, bindings: &mut Bindings) -> bool {
    let Some((first, rest)) = segments.split_first() else {
        return key.is_empty();
    };
    match first {
        Segment::Literal(text) => match key.strip_prefix(text.as_str()) {
            Some(tail) => match_segments(rest, tail, bindings),
            None => false,
        },
        Segment::Capture { name, optional } => {
            if let Some(bound) = bindings.get(name).map(str::to_string) {
                return match key.strip_prefix(bound.as_str()) {
                    Some(tail) => match_segments(rest, tail, bindings),
                    None => false,
                };
            }
            let mut ends: Vec<usize> = key.char_indices().map(|(i, _)| i).filter(|&i| i > 0).collect();
            ends.push(key.len());
            if *optional {
                ends.insert(0, 0);
            }
            for end in ends {
                if end == 0 && !*optional {
                    continue;
                }
                bindings.insert(name.clone(), &key[..end]);
                if match_segments(rest, &key[end..], bindings) {
                    return true;
                }
                bindings.remove(name);
            }
            false
        }
    }
}

impl fmt::Display for KeyPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => write!(f, "{}", text)?,
                Segment::Capture { name, optional: false } => write!(f, "[{}]", name)?,
                Segment::Capture { name, optional: true } => write!(f, "[{}?]", name)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_literal() {
        let pattern = KeyPattern::parse("index.html").unwrap();
        assert!(pattern.is_constant());
        assert_eq!(pattern.to_string(), "index.html");
    }

    #[test]
    fn test_parse_captures() {
        let pattern = KeyPattern::parse("[name].[ext?]").unwrap();
        assert!(!pattern.is_constant());
        assert_eq!(pattern.capture_names().collect::<Vec<_>>(), vec!["name", "ext"]);
        assert_eq!(pattern.to_string(), "[name].[ext?]");
    }

    #[test]
    fn test_parse_malformed() {
        assert!(KeyPattern::parse("").is_none());
        assert!(KeyPattern::parse("[x").is_none());
        assert!(KeyPattern::parse("x]").is_none());
        assert!(KeyPattern::parse("[[x]]").is_none());
        assert!(KeyPattern::parse("[]").is_none());
        assert!(KeyPattern::parse("[1x]").is_none());
        assert!(KeyPattern::parse("[a b]").is_none());
    }

    #[test]
    fn test_unify_suffix() {
        let pattern = KeyPattern::parse("[x].html").unwrap();
        let bindings = pattern.unify("foo.html").unwrap();
        assert_eq!(bindings.get("x"), Some("foo"));
        assert!(pattern.unify("foo.txt").is_none());
        assert!(pattern.unify(".html").is_none());
    }

    #[test]
    fn test_unify_backtracks_over_dots() {
        let pattern = KeyPattern::parse("[x].html").unwrap();
        let bindings = pattern.unify("a.b.html").unwrap();
        assert_eq!(bindings.get("x"), Some("a.b"));
    }

    #[test]
    fn test_unify_multiple_captures() {
        let pattern = KeyPattern::parse("[year]-[slug].md").unwrap();
        let bindings = pattern.unify("2024-hello-world.md").unwrap();
        assert_eq!(bindings.get("year"), Some("2024"));
        assert_eq!(bindings.get("slug"), Some("hello-world"));
    }

    #[test]
    fn test_optional_capture_may_be_empty() {
        let pattern = KeyPattern::parse("page[n?]").unwrap();
        assert_eq!(pattern.unify("page").unwrap().get("n"), Some(""));
        assert_eq!(pattern.unify("page2").unwrap().get("n"), Some("2"));
    }

    #[test]
    fn test_repeated_capture_must_agree() {
        let pattern = KeyPattern::parse("[x]-[x]").unwrap();
        assert_eq!(pattern.unify("ab-ab").unwrap().get("x"), Some("ab"));
        assert!(pattern.unify("ab-cd").is_none());
    }

    #[test]
    fn test_unify_multibyte() {
        let pattern = KeyPattern::parse("[x]é").unwrap();
        assert_eq!(pattern.unify("caféé").unwrap().get("x"), Some("café"));
    }

    #[test]
    fn test_instantiate() {
        let pattern = KeyPattern::parse("[x].html").unwrap();
        let bindings: Bindings = [("x", "foo")].into_iter().collect();
        assert_eq!(pattern.instantiate(&bindings), Some("foo.html".to_string()));
        assert_eq!(pattern.instantiate(&Bindings::new()), None);
    }
}
