//! Natural ordering for keys: digit runs compare by numeric value, text
//! compares case-insensitively first.

use std::cmp::Ordering;

/// Compare two keys in natural order ("file2" < "file10").
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = Chunks::new(a);
    let mut right = Chunks::new(b);
    loop {
        match (left.next(), right.next()) {
            (None, None) => break,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                let ordering = compare_chunks(x, y);
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
        }
    }
    // Equal under natural rules; fall back to byte order for a total order
    a.cmp(b)
}

/// Sort keys in place in natural order.
pub fn sort_natural(keys: &mut [String]) {
    keys.sort_by(|a, b| natural_cmp(a, b));
}

fn compare_chunks(x: &str, y: &str) -> Ordering {
    let x_digits = x.as_bytes()[0].is_ascii_digit();
    let y_digits = y.as_bytes()[0].is_ascii_digit();
    match (x_digits, y_digits) {
        (true, true) => {
            let x_trimmed = x.trim_start_matches('0');
            let y_trimmed = y.trim_start_matches('0');
            x_trimmed
                .len()
                .cmp(&y_trimmed.len())
                .then_with(|| x_trimmed.cmp(y_trimmed))
        }
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => x.to_lowercase().cmp(&y.to_lowercase()),
    }
}

/// Splits a string into alternating digit / non-digit runs.
struct Chunks<'a> {
    rest: &'a str,
}

impl<'a> Chunks<'a> {
    fn new(s: &'a str) -> Self {
        Self { rest: s }
    }
}

impl<'a> Iterator for Chunks<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        let first = self.rest.chars().next()?;
        let digits = first.is_ascii_digit();
        let end = self
            .rest
            .char_indices()
            .find(|(_, c)| c.is_ascii_digit() != digits)
            .map(|(i, _)| i)
            .unwrap_or(self.rest.len());
        let (chunk, rest) = self.rest.split_at(end);
        self.rest = rest;
        Some(chunk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sorted(keys: &[&str]) -> Vec<String> {
        let mut keys: Vec<String> = keys.iter().map(|s| s.to_string()).collect();
        sort_natural(&mut keys);
        keys
    }

    #[test]
    fn test_numbers_compare_numerically() {
        assert_eq!(
            sorted(&["file10", "file2", "file1"]),
            vec!["file1", "file2", "file10"]
        );
    }

    #[test]
    fn test_case_insensitive_text() {
        assert_eq!(sorted(&["b", "A", "c"]), vec!["A", "b", "c"]);
    }

    #[test]
    fn test_leading_zeros() {
        assert_eq!(natural_cmp("a007", "a7"), "a007".cmp("a7"));
        assert_eq!(natural_cmp("a008", "a7"), Ordering::Greater);
    }

    #[test]
    fn test_prefix_sorts_first() {
        assert_eq!(natural_cmp("foo", "foo.html"), Ordering::Less);
        assert_eq!(natural_cmp("", "a"), Ordering::Less);
    }

    #[test]
    fn test_total_order_on_case() {
        assert_ne!(natural_cmp("A", "a"), Ordering::Equal);
    }
}
