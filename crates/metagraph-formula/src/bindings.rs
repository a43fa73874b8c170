//! Capture bindings produced by unification.

use indexmap::IndexMap;

/// Insertion-ordered map from capture name to matched text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bindings(IndexMap<String, String>);

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.0.shift_remove(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Merge `other` over `self`. Conflicting names take `other`'s value
    /// and keep their original position.
    pub fn merge(&self, other: &Bindings) -> Bindings {
        let mut merged = self.clone();
        for (name, value) in &other.0 {
            merged.0.insert(name.clone(), value.clone());
        }
        merged
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Bindings {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut bindings = Bindings::new();
        for (name, value) in iter {
            bindings.insert(name, value);
        }
        bindings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_later_wins() {
        let parent: Bindings = [("x", "1"), ("y", "2")].into_iter().collect();
        let child: Bindings = [("y", "3"), ("z", "4")].into_iter().collect();
        let merged = parent.merge(&child);
        assert_eq!(merged.get("x"), Some("1"));
        assert_eq!(merged.get("y"), Some("3"));
        assert_eq!(merged.get("z"), Some("4"));
    }

    #[test]
    fn test_merge_preserves_insertion_order() {
        let parent: Bindings = [("x", "1"), ("y", "2")].into_iter().collect();
        let child: Bindings = [("z", "4"), ("x", "9")].into_iter().collect();
        let merged = parent.merge(&child);
        let names: Vec<&str> = merged.iter().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["x", "y", "z"]);
    }

    #[test]
    fn test_empty() {
        let bindings = Bindings::new();
        assert!(bindings.is_empty());
        assert!(bindings.get("x").is_none());
        assert!(bindings.merge(&Bindings::new()).is_empty());
    }
}
