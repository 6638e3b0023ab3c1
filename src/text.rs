//! Byte-offset helpers over `&str` used by motions and text objects.

// ── Byte boundary helpers ───────────────────────────────────────────────────

pub fn prev_char_boundary(s: &str, pos: usize) -> usize {
    if pos == 0 {
        return 0;
    }
    let mut p = pos.min(s.len()) - 1;
    while p > 0 && !s.is_char_boundary(p) {
        p -= 1;
    }
    p
}

pub fn next_char_boundary(s: &str, pos: usize) -> usize {
    if pos >= s.len() {
        return s.len();
    }
    let mut p = pos + 1;
    while p < s.len() && !s.is_char_boundary(p) {
        p += 1;
    }
    p
}

pub fn advance_chars(buf: &str, pos: usize, n: usize) -> usize {
    let mut p = pos;
    for _ in 0..n {
        if p >= buf.len() {
            break;
        }
        p = next_char_boundary(buf, p);
    }
    p
}

pub fn char_at(buf: &str, pos: usize) -> Option<char> {
    buf.get(pos..).and_then(|s| s.chars().next())
}

/// Clamp a caret to a normal-mode position: on a char, never on the
/// newline of a non-empty line and never past the end.
pub fn clamp_normal(buf: &str, pos: usize) -> usize {
    if buf.is_empty() {
        return 0;
    }
    let pos = pos.min(buf.len());
    let sol = line_start(buf, pos);
    let eol = line_end(buf, pos);
    if pos >= eol && eol > sol {
        prev_char_boundary(buf, eol)
    } else {
        pos
    }
}

// ── Character classification ────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CharClass {
    /// vim "word" boundaries: alphanumeric+underscore vs punctuation vs whitespace.
    Word,
    /// vim "WORD" boundaries: non-whitespace vs whitespace.
    #[allow(clippy::upper_case_acronyms)]
    WORD,
}

pub fn char_class(c: char, mode: CharClass) -> u8 {
    match mode {
        CharClass::Word => {
            if c.is_alphanumeric() || c == '_' {
                1
            } else if c.is_whitespace() {
                0
            } else {
                2
            }
        }
        CharClass::WORD => {
            if c.is_whitespace() {
                0
            } else {
                1
            }
        }
    }
}

// ── Lines ───────────────────────────────────────────────────────────────────

pub fn line_start(buf: &str, pos: usize) -> usize {
    buf[..pos.min(buf.len())].rfind('\n').map(|i| i + 1).unwrap_or(0)
}

pub fn line_end(buf: &str, pos: usize) -> usize {
    let pos = pos.min(buf.len());
    pos + buf[pos..].find('\n').unwrap_or(buf.len() - pos)
}

/// End of line for normal mode (on last char, not past it).
pub fn line_end_normal(buf: &str, pos: usize) -> usize {
    let end = line_end(buf, pos);
    if end > line_start(buf, pos) {
        prev_char_boundary(buf, end)
    } else {
        end
    }
}

pub fn first_non_blank(buf: &str, pos: usize) -> usize {
    let from = line_start(buf, pos);
    let eol = line_end(buf, from);
    buf[from..eol]
        .char_indices()
        .find(|(_, c)| *c != ' ' && *c != '\t')
        .map(|(i, _)| from + i)
        .unwrap_or(eol)
}

pub fn is_blank_line(buf: &str, pos: usize) -> bool {
    let sol = line_start(buf, pos);
    buf[sol..line_end(buf, pos)].trim().is_empty()
}

pub fn goto_line(buf: &str, line_idx: usize) -> usize {
    let mut pos = 0;
    for _ in 0..line_idx {
        match buf[pos..].find('\n') {
            Some(i) => pos += i + 1,
            None => return pos,
        }
    }
    pos
}

fn column(buf: &str, pos: usize) -> usize {
    buf[line_start(buf, pos)..pos].chars().count()
}

fn at_column(buf: &str, sol: usize, col: usize) -> usize {
    let eol = line_end(buf, sol);
    buf[sol..eol]
        .char_indices()
        .nth(col)
        .map(|(i, _)| sol + i)
        .unwrap_or(eol)
}

/// Moves down one line keeping the char column. `None` on the last line.
pub fn move_down(buf: &str, pos: usize, col: Option<usize>) -> Option<usize> {
    let col = col.unwrap_or_else(|| column(buf, pos));
    let eol = line_end(buf, pos);
    if eol >= buf.len() {
        return None;
    }
    Some(at_column(buf, eol + 1, col))
}

/// Moves up one line keeping the char column. `None` on the first line.
pub fn move_up(buf: &str, pos: usize, col: Option<usize>) -> Option<usize> {
    let col = col.unwrap_or_else(|| column(buf, pos));
    let sol = line_start(buf, pos);
    if sol == 0 {
        return None;
    }
    Some(at_column(buf, line_start(buf, sol - 1), col))
}

// ── Words ───────────────────────────────────────────────────────────────────

pub fn word_forward_pos(buf: &str, pos: usize, mode: CharClass) -> usize {
    let chars: Vec<(usize, char)> = buf[pos..].char_indices().collect();
    if chars.is_empty() {
        return pos;
    }
    let mut i = 0;
    let start_class = char_class(chars[0].1, mode);
    // A newline ends the current word even next to other whitespace.
    if chars[0].1 != '\n' {
        while i < chars.len() && chars[i].1 != '\n' && char_class(chars[i].1, mode) == start_class {
            i += 1;
        }
    }
    // Skip whitespace, stopping on an empty line.
    while i < chars.len() && char_class(chars[i].1, mode) == 0 {
        if chars[i].1 == '\n' && i + 1 < chars.len() && chars[i + 1].1 == '\n' && i > 0 {
            return pos + chars[i + 1].0;
        }
        i += 1;
    }
    if i < chars.len() {
        pos + chars[i].0
    } else {
        buf.len()
    }
}

pub fn word_backward_pos(buf: &str, pos: usize, mode: CharClass) -> usize {
    if pos == 0 {
        return 0;
    }
    let chars: Vec<(usize, char)> = buf[..pos].char_indices().collect();
    if chars.is_empty() {
        return 0;
    }
    let mut i = chars.len() - 1;
    // Skip whitespace backward.
    while i > 0 && char_class(chars[i].1, mode) == 0 {
        i -= 1;
    }
    let target_class = char_class(chars[i].1, mode);
    // Skip same class backward.
    while i > 0 && char_class(chars[i - 1].1, mode) == target_class {
        i -= 1;
    }
    chars[i].0
}

pub fn word_end_pos(buf: &str, pos: usize, mode: CharClass) -> usize {
    let next = next_char_boundary(buf, pos);
    if next >= buf.len() {
        return pos;
    }
    let chars: Vec<(usize, char)> = buf[next..].char_indices().collect();
    let mut i = 0;
    // Skip whitespace.
    while i < chars.len() && char_class(chars[i].1, mode) == 0 {
        i += 1;
    }
    if i >= chars.len() {
        return prev_char_boundary(buf, buf.len());
    }
    let target_class = char_class(chars[i].1, mode);
    // Skip same class.
    while i + 1 < chars.len() && char_class(chars[i + 1].1, mode) == target_class {
        i += 1;
    }
    next + chars[i].0
}

/// `ge`: end of the previous word.
pub fn word_end_backward_pos(buf: &str, pos: usize, mode: CharClass) -> usize {
    let chars: Vec<(usize, char)> = buf[..pos.min(buf.len())].char_indices().collect();
    let Some(cur) = char_at(buf, pos) else {
        return chars.last().map(|(i, _)| *i).unwrap_or(0);
    };
    let mut i = chars.len();
    let cur_class = char_class(cur, mode);
    // Leave the current word.
    if cur_class != 0 {
        while i > 0 && char_class(chars[i - 1].1, mode) == cur_class {
            i -= 1;
        }
    }
    // Skip whitespace backward.
    while i > 0 && char_class(chars[i - 1].1, mode) == 0 {
        i -= 1;
    }
    if i == 0 {
        return 0;
    }
    chars[i - 1].0
}

// ── Paragraphs ──────────────────────────────────────────────────────────────

/// `}`: start of the next blank line after a run of non-blank lines.
pub fn paragraph_forward(buf: &str, pos: usize) -> usize {
    let mut p = line_start(buf, pos);
    let mut seen_text = !is_blank_line(buf, p);
    loop {
        let eol = line_end(buf, p);
        if eol >= buf.len() {
            return buf.len();
        }
        p = eol + 1;
        let blank = is_blank_line(buf, p);
        if blank && seen_text {
            return p;
        }
        seen_text |= !blank;
    }
}

/// `{`: start of the previous blank line before a run of non-blank lines.
pub fn paragraph_backward(buf: &str, pos: usize) -> usize {
    let mut p = line_start(buf, pos);
    let mut seen_text = !is_blank_line(buf, p);
    loop {
        if p == 0 {
            return 0;
        }
        p = line_start(buf, p - 1);
        let blank = is_blank_line(buf, p);
        if blank && seen_text {
            return p;
        }
        seen_text |= !blank;
    }
}

// ── Find char on line ───────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FindKind {
    Forward,
    ForwardTill,
    Backward,
    BackwardTill,
}

impl FindKind {
    pub fn reversed(self) -> Self {
        match self {
            FindKind::Forward => FindKind::Backward,
            FindKind::ForwardTill => FindKind::BackwardTill,
            FindKind::Backward => FindKind::Forward,
            FindKind::BackwardTill => FindKind::ForwardTill,
        }
    }

    pub fn is_forward(self) -> bool {
        matches!(self, FindKind::Forward | FindKind::ForwardTill)
    }

    pub fn is_till(self) -> bool {
        matches!(self, FindKind::ForwardTill | FindKind::BackwardTill)
    }
}

/// Finds `ch` on the caret's line. `skip_adjacent` makes a repeated `t`/`T`
/// step over a match right next to the caret, as `;` does.
pub fn find_char(buf: &str, pos: usize, kind: FindKind, ch: char, skip_adjacent: bool) -> Option<usize> {
    let sol = line_start(buf, pos);
    let eol = line_end(buf, pos);

    if kind.is_forward() {
        let mut start = next_char_boundary(buf, pos);
        if skip_adjacent && kind.is_till() && char_at(buf, start) == Some(ch) {
            start = next_char_boundary(buf, start);
        }
        let start = start.min(eol);
        let (i, _) = buf[start..eol].char_indices().find(|(_, c)| *c == ch)?;
        let found = start + i;
        Some(if kind.is_till() {
            prev_char_boundary(buf, found).max(pos)
        } else {
            found
        })
    } else {
        let mut end = pos;
        if skip_adjacent && kind.is_till() && end > sol && char_at(buf, prev_char_boundary(buf, end)) == Some(ch) {
            end = prev_char_boundary(buf, end);
        }
        let (i, _) = buf[sol..end].char_indices().rev().find(|(_, c)| *c == ch)?;
        let found = sol + i;
        Some(if kind.is_till() {
            next_char_boundary(buf, found).min(pos)
        } else {
            found
        })
    }
}

// ── Text objects ────────────────────────────────────────────────────────────

pub fn text_object_word(buf: &str, pos: usize, inner: bool, mode: CharClass) -> Option<(usize, usize)> {
    if buf.is_empty() || pos >= buf.len() {
        return None;
    }
    let chars: Vec<(usize, char)> = buf.char_indices().collect();
    let ci = chars.iter().position(|(i, _)| *i >= pos)?;
    let cur_class = char_class(chars[ci].1, mode);
    let same = |c: char| c != '\n' && char_class(c, mode) == cur_class;

    // Expand over the same class, never across a line break.
    let mut start = ci;
    while start > 0 && same(chars[start - 1].1) {
        start -= 1;
    }
    let mut end = ci;
    while end + 1 < chars.len() && same(chars[end + 1].1) {
        end += 1;
    }

    let byte_start = chars[start].0;
    let byte_end = chars.get(end + 1).map(|(i, _)| *i).unwrap_or(buf.len());

    if inner {
        return Some((byte_start, byte_end));
    }
    // "a word" includes trailing whitespace, or leading if no trailing.
    let mut a_end = byte_end;
    while a_end < buf.len() && buf[a_end..].starts_with([' ', '\t']) {
        a_end += 1;
    }
    if a_end > byte_end {
        return Some((byte_start, a_end));
    }
    let mut a_start = byte_start;
    while a_start > 0 && buf[..a_start].ends_with([' ', '\t']) {
        a_start -= 1;
    }
    Some((a_start, byte_end))
}

pub fn text_object_quote(buf: &str, pos: usize, inner: bool, quote: char) -> Option<(usize, usize)> {
    let line_s = line_start(buf, pos);
    let line_e = line_end(buf, pos);
    let line = &buf[line_s..line_e];
    let rel = pos - line_s;

    let positions: Vec<usize> = line
        .char_indices()
        .filter(|(_, c)| *c == quote)
        .map(|(i, _)| i)
        .collect();

    for pair in positions.chunks(2) {
        if pair.len() == 2 && pair[0] <= rel && rel <= pair[1] {
            let open = line_s + pair[0];
            let close = line_s + pair[1];
            return if inner {
                Some((open + quote.len_utf8(), close))
            } else {
                Some((open, close + quote.len_utf8()))
            };
        }
    }
    None
}

pub fn text_object_pair(buf: &str, pos: usize, inner: bool, open: char, close: char) -> Option<(usize, usize)> {
    if buf.is_empty() {
        return None;
    }
    let mut depth = 0i32;
    let mut open_pos = None;
    let upto = pos.min(buf.len() - 1);
    for (i, c) in buf[..=upto].char_indices().rev() {
        if c == close && i != pos {
            depth += 1;
        } else if c == open {
            if depth == 0 {
                open_pos = Some(i);
                break;
            }
            depth -= 1;
        }
    }
    let open_pos = open_pos?;

    depth = 0;
    let search_start = open_pos + open.len_utf8();
    for (i, c) in buf[search_start..].char_indices() {
        if c == open {
            depth += 1;
        } else if c == close {
            if depth == 0 {
                let close_pos = search_start + i;
                return if inner {
                    Some((open_pos + open.len_utf8(), close_pos))
                } else {
                    Some((open_pos, close_pos + close.len_utf8()))
                };
            }
            depth -= 1;
        }
    }
    None
}

/// `ip`/`ap`: the run of lines sharing the caret line's blankness, plus the
/// following blank lines for `ap`. Returns `(first line start, last line end)`.
pub fn text_object_paragraph(buf: &str, pos: usize, inner: bool) -> (usize, usize) {
    let blank = is_blank_line(buf, pos);
    let mut start = line_start(buf, pos);
    while start > 0 {
        let prev = line_start(buf, start - 1);
        if is_blank_line(buf, prev) != blank {
            break;
        }
        start = prev;
    }
    let mut end = line_end(buf, pos);
    let extend = |end: &mut usize, want_blank: bool| {
        while *end < buf.len() {
            let next = *end + 1;
            if is_blank_line(buf, next) != want_blank {
                break;
            }
            *end = line_end(buf, next);
        }
    };
    extend(&mut end, blank);
    if !inner {
        extend(&mut end, !blank);
    }
    (start, end)
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_forward() {
        assert_eq!(word_forward_pos("hello world foo", 0, CharClass::Word), 6);
        assert_eq!(word_forward_pos("foo.bar", 0, CharClass::Word), 3);
        assert_eq!(word_forward_pos("foo.bar baz", 0, CharClass::WORD), 8);
    }

    #[test]
    fn test_word_forward_stops_on_empty_line() {
        assert_eq!(word_forward_pos("foo\n\nbar", 0, CharClass::Word), 4);
    }

    #[test]
    fn test_word_end_and_back() {
        assert_eq!(word_end_pos("hello world", 0, CharClass::Word), 4);
        assert_eq!(word_backward_pos("hello world", 6, CharClass::Word), 0);
        assert_eq!(word_end_backward_pos("hello world", 8, CharClass::Word), 4);
    }

    #[test]
    fn test_find_char_kinds() {
        let buf = "a,b,c";
        assert_eq!(find_char(buf, 0, FindKind::Forward, ',', false), Some(1));
        assert_eq!(find_char(buf, 0, FindKind::ForwardTill, 'c', false), Some(3));
        assert_eq!(find_char(buf, 4, FindKind::Backward, ',', false), Some(3));
        assert_eq!(find_char(buf, 4, FindKind::BackwardTill, 'a', false), Some(1));
        assert_eq!(find_char(buf, 0, FindKind::Forward, 'z', false), None);
    }

    #[test]
    fn test_till_repeat_skips_adjacent() {
        let buf = "a,b,c";
        // Caret already sits just before the ','.
        assert_eq!(find_char(buf, 0, FindKind::ForwardTill, ',', false), Some(0));
        assert_eq!(find_char(buf, 0, FindKind::ForwardTill, ',', true), Some(2));
    }

    #[test]
    fn test_paragraph_motions() {
        let buf = "a\nb\n\nc\nd";
        assert_eq!(paragraph_forward(buf, 0), 4);
        assert_eq!(paragraph_forward(buf, 4), buf.len());
        assert_eq!(paragraph_backward(buf, 7), 4);
        assert_eq!(paragraph_backward(buf, 2), 0);
    }

    #[test]
    fn test_text_object_pair_nested() {
        let buf = "f(a, (b), c)";
        assert_eq!(text_object_pair(buf, 3, true, '(', ')'), Some((2, 11)));
        assert_eq!(text_object_pair(buf, 6, false, '(', ')'), Some((5, 8)));
    }

    #[test]
    fn test_text_object_quote() {
        let buf = "say \"hi there\" now";
        assert_eq!(text_object_quote(buf, 6, true, '"'), Some((5, 13)));
        assert_eq!(text_object_quote(buf, 6, false, '"'), Some((4, 14)));
    }

    #[test]
    fn test_text_object_paragraph() {
        let buf = "a\nb\n\n\nc";
        assert_eq!(text_object_paragraph(buf, 0, true), (0, 3));
        assert_eq!(text_object_paragraph(buf, 0, false), (0, 5));
    }

    #[test]
    fn test_clamp_normal() {
        assert_eq!(clamp_normal("abc", 3), 2);
        assert_eq!(clamp_normal("abc\n", 3), 2);
        assert_eq!(clamp_normal("abc\n\n", 4), 4);
        assert_eq!(clamp_normal("", 5), 0);
    }
}
