use crate::editor::TextLayout;
use crate::text::next_char_boundary;
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum SelectionType {
    CharacterWise,
    LineWise,
    BlockWise,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MotionType {
    Inclusive,
    Exclusive,
    LineWise,
    BlockWise,
}

impl MotionType {
    pub fn selection_type(self) -> SelectionType {
        match self {
            MotionType::Inclusive | MotionType::Exclusive => SelectionType::CharacterWise,
            MotionType::LineWise => SelectionType::LineWise,
            MotionType::BlockWise => SelectionType::BlockWise,
        }
    }
}

/// What a pair of offsets is resolved as.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RangeKind {
    Motion(MotionType),
    Selection(SelectionType),
}

impl From<MotionType> for RangeKind {
    fn from(t: MotionType) -> Self {
        RangeKind::Motion(t)
    }
}

impl From<SelectionType> for RangeKind {
    fn from(t: SelectionType) -> Self {
        RangeKind::Selection(t)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Linewise ranges stop before the last line's newline.
    pub skip_final_newline: bool,
    /// Blockwise ranges extend every line to its end (`$` in block mode).
    pub to_line_end: bool,
}

/// One or more `[start, end)` spans; several only for blockwise ranges.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TextRange {
    spans: Vec<(usize, usize)>,
    kind: SelectionType,
}

impl TextRange {
    pub fn new(start: usize, end: usize, kind: SelectionType) -> Self {
        Self {
            spans: vec![(start.min(end), start.max(end))],
            kind,
        }
    }

    pub fn block(mut spans: Vec<(usize, usize)>) -> Self {
        for span in &mut spans {
            if span.0 > span.1 {
                *span = (span.1, span.0);
            }
        }
        spans.sort_unstable();
        Self {
            spans,
            kind: SelectionType::BlockWise,
        }
    }

    pub fn spans(&self) -> &[(usize, usize)] {
        &self.spans
    }

    pub fn kind(&self) -> SelectionType {
        self.kind
    }

    pub fn is_linewise(&self) -> bool {
        self.kind == SelectionType::LineWise
    }

    pub fn start(&self) -> usize {
        self.spans.first().map(|s| s.0).unwrap_or(0)
    }

    pub fn end(&self) -> usize {
        self.spans.iter().map(|s| s.1).max().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.spans.iter().all(|(s, e)| s == e)
    }

    pub fn is_multiple(&self) -> bool {
        self.spans.len() > 1
    }
}

pub fn resolve<T: TextLayout + ?Sized>(
    text: &T,
    start: usize,
    end: usize,
    kind: impl Into<RangeKind>,
) -> TextRange {
    resolve_with(text, start, end, kind, ResolveOptions::default())
}

/// Normalizes a raw offset pair into a range of the requested kind.
pub fn resolve_with<T: TextLayout + ?Sized>(
    text: &T,
    start: usize,
    end: usize,
    kind: impl Into<RangeKind>,
    opts: ResolveOptions,
) -> TextRange {
    let len = text.len();
    let (lo, hi) = (start.min(end).min(len), start.max(end).min(len));
    match kind.into() {
        RangeKind::Motion(MotionType::Exclusive) => exclusive(text, lo, hi, opts),
        RangeKind::Motion(MotionType::Inclusive)
        | RangeKind::Selection(SelectionType::CharacterWise) => {
            TextRange::new(lo, next_char_boundary(text.text(), hi), SelectionType::CharacterWise)
        }
        RangeKind::Motion(MotionType::LineWise) | RangeKind::Selection(SelectionType::LineWise) => {
            let first = text.line_of(lo);
            // An end just past a newline is already an exclusive bound.
            let last = if hi > lo && text.text()[..hi].ends_with('\n') {
                text.line_of(hi - 1)
            } else {
                text.line_of(hi)
            };
            linewise(text, first, last.max(first), opts)
        }
        RangeKind::Motion(MotionType::BlockWise)
        | RangeKind::Selection(SelectionType::BlockWise) => blockwise(text, start.min(len), end.min(len), opts),
    }
}

/// Whole lines `first..=last`, for linewise motions and selections whose
/// endpoints are caret positions rather than range bounds.
pub fn resolve_lines<T: TextLayout + ?Sized>(text: &T, first: usize, last: usize, opts: ResolveOptions) -> TextRange {
    let (first, last) = (first.min(last), first.max(last));
    linewise(text, first, last, opts)
}

/// Exclusive motions, with the exclusive-linewise rule: an end in column 0
/// on a later line moves back to the end of the previous line, and the
/// whole range turns linewise when the start is at or before the first
/// non-blank of its line.
fn exclusive<T: TextLayout + ?Sized>(text: &T, lo: usize, hi: usize, opts: ResolveOptions) -> TextRange {
    let (lo_line, hi_line) = (text.line_of(lo), text.line_of(hi));
    if hi_line > lo_line && text.line_start(hi_line) == hi {
        let last = hi_line - 1;
        if lo <= text.first_non_blank(lo_line) {
            return linewise(text, lo_line, last, opts);
        }
        return TextRange::new(lo, text.line_end(last), SelectionType::CharacterWise);
    }
    TextRange::new(lo, hi, SelectionType::CharacterWise)
}

fn linewise<T: TextLayout + ?Sized>(text: &T, first: usize, last: usize, opts: ResolveOptions) -> TextRange {
    let start = text.line_start(first);
    let end = if opts.skip_final_newline {
        text.line_end(last)
    } else {
        (text.line_end(last) + 1).min(text.len())
    };
    TextRange::new(start, end, SelectionType::LineWise)
}

fn blockwise<T: TextLayout + ?Sized>(text: &T, a: usize, b: usize, opts: ResolveOptions) -> TextRange {
    let (la, lb) = (text.line_of(a), text.line_of(b));
    let (ca, cb) = (text.column_of(a), text.column_of(b));
    let (left, right) = (ca.min(cb), ca.max(cb));
    let spans = (la.min(lb)..=la.max(lb))
        .map(|line| {
            let s = text.offset_at(line, left);
            let e = if opts.to_line_end {
                text.line_end(line)
            } else {
                text.offset_at(line, right + 1)
            };
            (s, e.max(s))
        })
        .collect();
    TextRange::block(spans)
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exclusive_same_line() {
        let r = resolve("foo bar baz", 0, 4, MotionType::Exclusive);
        assert_eq!(r.spans(), &[(0, 4)]);
        assert_eq!(r.kind(), SelectionType::CharacterWise);
    }

    #[test]
    fn test_exclusive_backwards_is_normalized() {
        let r = resolve("foo bar baz", 8, 4, MotionType::Exclusive);
        assert_eq!(r.spans(), &[(4, 8)]);
    }

    #[test]
    fn test_inclusive_bumps_end_and_clamps() {
        assert_eq!(resolve("abcdef", 1, 3, MotionType::Inclusive).spans(), &[(1, 4)]);
        assert_eq!(resolve("abc", 0, 2, MotionType::Inclusive).spans(), &[(0, 3)]);
        assert_eq!(resolve("abc", 0, 3, MotionType::Inclusive).spans(), &[(0, 3)]);
    }

    #[test]
    fn test_exclusive_linewise_from_line_start() {
        // `d}` from the start of a paragraph keeps the blank line.
        let text = "a\nb\n\nc";
        let r = resolve(text, 0, 4, MotionType::Exclusive);
        assert_eq!(r.kind(), SelectionType::LineWise);
        assert_eq!(r.spans(), &[(0, 4)]);
    }

    #[test]
    fn test_exclusive_column_zero_mid_line_start() {
        let text = "ab cd\nef";
        let r = resolve(text, 3, 6, MotionType::Exclusive);
        assert_eq!(r.kind(), SelectionType::CharacterWise);
        assert_eq!(r.spans(), &[(3, 5)]);
    }

    #[test]
    fn test_linewise_includes_newline() {
        let text = "one\ntwo\nthree";
        let r = resolve(text, 5, 5, MotionType::LineWise);
        assert_eq!(r.spans(), &[(4, 8)]);
        let r = resolve(text, 9, 1, MotionType::LineWise);
        assert_eq!(r.spans(), &[(0, 13)]);
    }

    #[test]
    fn test_linewise_skip_final_newline() {
        let opts = ResolveOptions {
            skip_final_newline: true,
            ..Default::default()
        };
        let r = resolve_with("one\ntwo\n", 0, 0, SelectionType::LineWise, opts);
        assert_eq!(r.spans(), &[(0, 3)]);
    }

    #[test]
    fn test_linewise_is_idempotent() {
        let text = "one\ntwo\nthree\nfour";
        for (a, b) in [(0, 0), (5, 9), (2, 17), (17, 17), (4, 8)] {
            let once = resolve(text, a, b, MotionType::LineWise);
            let twice = resolve(text, once.start(), once.end(), MotionType::LineWise);
            assert_eq!(once, twice, "pair ({a}, {b})");
        }
    }

    #[test]
    fn test_resolve_lines_keeps_empty_last_line() {
        let text = "a\n\nb";
        let r = resolve_lines(text, 1, 0, ResolveOptions::default());
        assert_eq!(r.spans(), &[(0, 3)]);
    }

    #[test]
    fn test_blockwise_uses_column_extremes() {
        let text = "abcdef\nabcdef\nab";
        // Corners at (0, 4) and (2, 1): columns 1..=4.
        let r = resolve(text, 4, 15, MotionType::BlockWise);
        assert_eq!(r.spans(), &[(1, 5), (8, 12), (15, 16)]);
        assert!(r.is_multiple());
    }

    #[test]
    fn test_blockwise_to_line_end() {
        let text = "abc\nabcdef";
        let opts = ResolveOptions {
            to_line_end: true,
            ..Default::default()
        };
        let r = resolve_with(text, 1, 5, SelectionType::BlockWise, opts);
        assert_eq!(r.spans(), &[(1, 3), (5, 10)]);
    }

    #[test]
    fn test_block_spans_sorted() {
        let r = TextRange::block(vec![(9, 7), (1, 2)]);
        assert_eq!(r.spans(), &[(1, 2), (7, 9)]);
    }
}
