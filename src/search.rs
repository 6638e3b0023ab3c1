/// Pattern search used by `/`, `?`, `n` and `N`.
pub trait Searcher {
    /// Offset of the next match of `pattern` strictly after (or before, when
    /// `forward` is false) `from`.
    fn find(&self, text: &str, pattern: &str, from: usize, forward: bool, ignore_case: bool, wrap: bool) -> Option<usize>;
}

/// Plain substring search.
#[derive(Clone, Copy, Debug, Default)]
pub struct LiteralSearch;

impl Searcher for LiteralSearch {
    fn find(&self, text: &str, pattern: &str, from: usize, forward: bool, ignore_case: bool, wrap: bool) -> Option<usize> {
        if pattern.is_empty() {
            return None;
        }
        let (hay, needle) = if ignore_case {
            (text.to_lowercase(), pattern.to_lowercase())
        } else {
            (text.to_string(), pattern.to_string())
        };
        // Lowercasing can change byte lengths; fall back to exact search then.
        let (hay, needle) = if hay.len() == text.len() {
            (hay, needle)
        } else {
            (text.to_string(), pattern.to_string())
        };
        let hits: Vec<usize> = hay.match_indices(needle.as_str()).map(|(i, _)| i).collect();
        if forward {
            hits.iter()
                .copied()
                .find(|&i| i > from)
                .or_else(|| wrap.then(|| hits.first().copied()).flatten())
        } else {
            hits.iter()
                .rev()
                .copied()
                .find(|&i| i < from)
                .or_else(|| wrap.then(|| hits.last().copied()).flatten())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_and_wrap() {
        let s = LiteralSearch;
        let text = "foo bar foo";
        assert_eq!(s.find(text, "foo", 0, true, false, true), Some(8));
        assert_eq!(s.find(text, "foo", 8, true, false, true), Some(0));
        assert_eq!(s.find(text, "foo", 8, true, false, false), None);
    }

    #[test]
    fn test_backward_and_case() {
        let s = LiteralSearch;
        let text = "Foo bar foo";
        assert_eq!(s.find(text, "FOO", 8, false, true, false), Some(0));
        assert_eq!(s.find(text, "FOO", 8, false, false, false), None);
    }
}
