use crate::text::clamp_normal;

/// Line and offset geometry over a text. Offsets are byte offsets on char
/// boundaries; a line's end is the offset of its `'\n'` (or the text length).
pub trait TextLayout {
    fn text(&self) -> &str;

    fn len(&self) -> usize {
        self.text().len()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn line_count(&self) -> usize {
        self.text().matches('\n').count() + 1
    }

    fn line_of(&self, offset: usize) -> usize {
        let text = self.text();
        text[..offset.min(text.len())].matches('\n').count()
    }

    fn line_start(&self, line: usize) -> usize {
        let text = self.text();
        let mut pos = 0;
        for _ in 0..line {
            match text[pos..].find('\n') {
                Some(i) => pos += i + 1,
                None => return pos,
            }
        }
        pos
    }

    fn line_end(&self, line: usize) -> usize {
        let text = self.text();
        let start = self.line_start(line);
        start + text[start..].find('\n').unwrap_or(text.len() - start)
    }

    /// Offset of the first non-blank char on `line`, or its end if blank.
    fn first_non_blank(&self, line: usize) -> usize {
        let text = self.text();
        let start = self.line_start(line);
        let end = self.line_end(line);
        text[start..end]
            .char_indices()
            .find(|(_, c)| *c != ' ' && *c != '\t')
            .map(|(i, _)| start + i)
            .unwrap_or(end)
    }

    /// Column of `offset` in chars from its line start.
    fn column_of(&self, offset: usize) -> usize {
        let text = self.text();
        let offset = offset.min(text.len());
        let start = self.line_start(self.line_of(offset));
        text[start..offset].chars().count()
    }

    /// Offset of `column` on `line`, clipped to the line end.
    fn offset_at(&self, line: usize, column: usize) -> usize {
        let text = self.text();
        let start = self.line_start(line);
        let end = self.line_end(line);
        text[start..end]
            .char_indices()
            .nth(column)
            .map(|(i, _)| start + i)
            .unwrap_or(end)
    }
}

impl TextLayout for str {
    fn text(&self) -> &str {
        self
    }
}

impl TextLayout for String {
    fn text(&self) -> &str {
        self.as_str()
    }
}

/// The editing surface the session drives. Carets are indexed in document
/// order; each caret may carry a selection anchor while in visual or select
/// mode.
pub trait Editor: TextLayout {
    fn caret_count(&self) -> usize {
        1
    }

    fn caret(&self, idx: usize) -> usize;

    fn set_caret(&mut self, idx: usize, offset: usize);

    fn anchor(&self, idx: usize) -> Option<usize>;

    fn set_anchor(&mut self, idx: usize, anchor: Option<usize>);

    /// Removes `[start, end)` and returns the removed text.
    fn delete_range(&mut self, start: usize, end: usize) -> String;

    fn insert_text(&mut self, offset: usize, text: &str);

    fn replace_range(&mut self, start: usize, end: usize, text: &str) -> String {
        let removed = self.delete_range(start, end);
        self.insert_text(start, text);
        removed
    }

    fn is_writable(&self) -> bool {
        true
    }

    /// Marks the start of one undoable change.
    fn checkpoint(&mut self) {}

    fn undo(&mut self) -> bool {
        false
    }

    fn redo(&mut self) -> bool {
        false
    }

    /// Sorts carets into document order and merges duplicates.
    fn merge_carets(&mut self) {}
}

// ── String-backed editor ────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Caret {
    pub offset: usize,
    pub anchor: Option<usize>,
}

struct UndoEntry {
    text: String,
    carets: Vec<Caret>,
}

/// In-memory multi-caret buffer with snapshot undo.
pub struct TextBuffer {
    text: String,
    carets: Vec<Caret>,
    writable: bool,
    undo_stack: Vec<UndoEntry>,
    redo_stack: Vec<UndoEntry>,
}

impl TextBuffer {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            carets: vec![Caret {
                offset: 0,
                anchor: None,
            }],
            writable: true,
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
        }
    }

    pub fn with_caret(mut self, offset: usize) -> Self {
        self.carets[0].offset = offset.min(self.text.len());
        self
    }

    pub fn set_writable(&mut self, writable: bool) {
        self.writable = writable;
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn carets(&self) -> &[Caret] {
        &self.carets
    }

    pub fn add_caret(&mut self, offset: usize) {
        self.carets.push(Caret {
            offset: offset.min(self.text.len()),
            anchor: None,
        });
        self.merge_carets();
    }

    fn snapshot(&self) -> UndoEntry {
        UndoEntry {
            text: self.text.clone(),
            carets: self.carets.clone(),
        }
    }

    fn restore(&mut self, entry: UndoEntry) {
        self.text = entry.text;
        self.carets = entry.carets;
        for caret in &mut self.carets {
            caret.anchor = None;
            caret.offset = clamp_normal(&self.text, caret.offset);
        }
    }

    fn shift(pos: &mut usize, start: usize, removed: usize, inserted: usize) {
        if *pos >= start + removed {
            *pos = *pos - removed + inserted;
        } else if *pos > start {
            *pos = start;
        }
    }

    fn adjust(&mut self, start: usize, removed: usize, inserted: usize) {
        for caret in &mut self.carets {
            if inserted > 0 && removed == 0 && caret.offset == start {
                continue;
            }
            Self::shift(&mut caret.offset, start, removed, inserted);
            if let Some(anchor) = caret.anchor.as_mut() {
                Self::shift(anchor, start, removed, inserted);
            }
        }
    }
}

impl TextLayout for TextBuffer {
    fn text(&self) -> &str {
        &self.text
    }
}

impl Editor for TextBuffer {
    fn caret_count(&self) -> usize {
        self.carets.len()
    }

    fn caret(&self, idx: usize) -> usize {
        self.carets.get(idx).map(|c| c.offset).unwrap_or(0)
    }

    fn set_caret(&mut self, idx: usize, offset: usize) {
        let len = self.text.len();
        if let Some(caret) = self.carets.get_mut(idx) {
            caret.offset = offset.min(len);
        }
    }

    fn anchor(&self, idx: usize) -> Option<usize> {
        self.carets.get(idx).and_then(|c| c.anchor)
    }

    fn set_anchor(&mut self, idx: usize, anchor: Option<usize>) {
        let len = self.text.len();
        if let Some(caret) = self.carets.get_mut(idx) {
            caret.anchor = anchor.map(|a| a.min(len));
        }
    }

    fn delete_range(&mut self, start: usize, end: usize) -> String {
        let end = end.min(self.text.len());
        let start = start.min(end);
        let removed: String = self.text.drain(start..end).collect();
        self.adjust(start, end - start, 0);
        removed
    }

    fn insert_text(&mut self, offset: usize, text: &str) {
        let offset = offset.min(self.text.len());
        self.text.insert_str(offset, text);
        self.adjust(offset, 0, text.len());
    }

    fn is_writable(&self) -> bool {
        self.writable
    }

    fn checkpoint(&mut self) {
        self.redo_stack.clear();
        let entry = self.snapshot();
        self.undo_stack.push(entry);
    }

    fn undo(&mut self) -> bool {
        let Some(entry) = self.undo_stack.pop() else {
            return false;
        };
        let current = self.snapshot();
        self.redo_stack.push(current);
        self.restore(entry);
        true
    }

    fn redo(&mut self) -> bool {
        let Some(entry) = self.redo_stack.pop() else {
            return false;
        };
        let current = self.snapshot();
        self.undo_stack.push(current);
        self.restore(entry);
        true
    }

    fn merge_carets(&mut self) {
        self.carets.sort_by_key(|c| c.offset);
        self.carets.dedup_by_key(|c| c.offset);
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_geometry() {
        let text = "ab\n  cd\n\nef";
        assert_eq!(text.line_count(), 4);
        assert_eq!(text.line_of(4), 1);
        assert_eq!(text.line_start(1), 3);
        assert_eq!(text.line_end(1), 7);
        assert_eq!(text.first_non_blank(1), 5);
        assert_eq!(text.line_start(2), 8);
        assert_eq!(text.line_end(2), 8);
        assert_eq!(text.line_end(3), 11);
    }

    #[test]
    fn test_columns_are_chars() {
        let text = "héllo\nx";
        assert_eq!(text.column_of(3), 2);
        assert_eq!(text.offset_at(0, 2), 3);
        assert_eq!(text.offset_at(1, 9), text.len());
    }

    #[test]
    fn test_delete_shifts_other_carets() {
        let mut buf = TextBuffer::new("one two three");
        buf.add_caret(8);
        buf.delete_range(0, 4);
        assert_eq!(buf.as_str(), "two three");
        assert_eq!(buf.caret(0), 0);
        assert_eq!(buf.caret(1), 4);
    }

    #[test]
    fn test_insert_keeps_caret_at_insert_point() {
        let mut buf = TextBuffer::new("abc").with_caret(1);
        buf.add_caret(2);
        buf.insert_text(1, "XY");
        assert_eq!(buf.as_str(), "aXYbc");
        assert_eq!(buf.caret(0), 1);
        assert_eq!(buf.caret(1), 4);
    }

    #[test]
    fn test_undo_redo() {
        let mut buf = TextBuffer::new("hello");
        buf.checkpoint();
        buf.delete_range(0, 2);
        assert_eq!(buf.as_str(), "llo");
        assert!(buf.undo());
        assert_eq!(buf.as_str(), "hello");
        assert!(buf.redo());
        assert_eq!(buf.as_str(), "llo");
        assert!(!buf.redo());
    }
}
