use super::insert::enter_insert;
use super::{ActionContext, ActionHandler, Capability};
use crate::command::{ArgumentType, Command, CommandFlags, CommandType};
use crate::error::{Error, Result};
use crate::range::{SelectionType, TextRange};
use crate::text::{first_non_blank, line_start};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperatorKind {
    Delete,
    Change,
    Yank,
    ShiftRight,
    ShiftLeft,
    ToggleCase,
    Lower,
    Upper,
    /// `g@`, backed by the session's operator function.
    Function,
}

impl OperatorKind {
    pub fn command_type(self) -> CommandType {
        match self {
            OperatorKind::Delete => CommandType::Delete,
            OperatorKind::Change => CommandType::Change,
            OperatorKind::Yank => CommandType::Copy,
            _ => CommandType::Writable,
        }
    }
}

pub(crate) struct Operator {
    id: &'static str,
    kind: OperatorKind,
}

impl Operator {
    pub(crate) fn new(id: &'static str, kind: OperatorKind) -> Self {
        Self { id, kind }
    }
}

impl ActionHandler for Operator {
    fn id(&self) -> &'static str {
        self.id
    }

    fn command_type(&self) -> CommandType {
        self.kind.command_type()
    }

    fn capability(&self) -> Capability {
        Capability::Operator
    }

    fn argument_type(&self) -> Option<ArgumentType> {
        Some(ArgumentType::Motion)
    }

    fn flags(&self) -> CommandFlags {
        match self.kind {
            OperatorKind::ShiftRight | OperatorKind::ShiftLeft => CommandFlags::MOT_LINEWISE,
            _ => CommandFlags::empty(),
        }
    }

    fn operate(&self, cx: &mut ActionContext<'_>, caret: usize, range: &TextRange, _cmd: &Command) -> Result<()> {
        apply(self.kind, cx, caret, range, 1)
    }
}

/// Runs `kind` over `range`. `times` only matters for shifts.
pub(crate) fn apply(
    kind: OperatorKind,
    cx: &mut ActionContext<'_>,
    caret: usize,
    range: &TextRange,
    times: usize,
) -> Result<()> {
    match kind {
        OperatorKind::Delete => delete(cx, caret, range),
        OperatorKind::Change => change(cx, caret, range),
        OperatorKind::Yank => yank(cx, caret, range),
        OperatorKind::ShiftRight => shift(cx, caret, range, true, times),
        OperatorKind::ShiftLeft => shift(cx, caret, range, false, times),
        OperatorKind::ToggleCase | OperatorKind::Lower | OperatorKind::Upper => change_case(cx, caret, range, kind),
        OperatorKind::Function => {
            let func = cx
                .state
                .operator_function
                .clone()
                .ok_or(Error::NoOperatorFunction)?;
            func.apply(cx, range)
        }
    }
}

/// Text covered by `range`; block spans are joined with newlines.
pub(crate) fn range_text(buf: &str, range: &TextRange) -> String {
    range
        .spans()
        .iter()
        .map(|&(s, e)| &buf[s.min(buf.len())..e.min(buf.len())])
        .collect::<Vec<_>>()
        .join("\n")
}

fn remove_spans(cx: &mut ActionContext<'_>, range: &TextRange) {
    for &(s, e) in range.spans().iter().rev() {
        cx.editor.delete_range(s, e);
    }
}

pub(crate) fn delete(cx: &mut ActionContext<'_>, caret: usize, range: &TextRange) -> Result<()> {
    let text = range_text(cx.editor.text(), range);
    cx.registers.store_text(&text, range.kind(), true)?;
    match range.kind() {
        SelectionType::LineWise => {
            let (mut start, end) = (range.start(), range.end());
            // The last line has no newline of its own; take the one before it.
            if end >= cx.editor.len() && start > 0 && !cx.editor.text()[start..end].ends_with('\n') {
                start -= 1;
            }
            cx.editor.delete_range(start, end);
            let buf = cx.editor.text();
            let pos = first_non_blank(buf, line_start(buf, start.min(buf.len())));
            cx.editor.set_caret(caret, pos);
        }
        SelectionType::BlockWise | SelectionType::CharacterWise => {
            remove_spans(cx, range);
            cx.editor.set_caret(caret, range.start());
        }
    }
    Ok(())
}

fn change(cx: &mut ActionContext<'_>, caret: usize, range: &TextRange) -> Result<()> {
    let text = range_text(cx.editor.text(), range);
    cx.registers.store_text(&text, range.kind(), true)?;
    if range.is_linewise() {
        // Keep an empty line to type on.
        let (start, mut end) = (range.start(), range.end());
        if cx.editor.text()[start..end].ends_with('\n') {
            end -= 1;
        }
        cx.editor.delete_range(start, end);
    } else {
        remove_spans(cx, range);
    }
    cx.editor.set_caret(caret, range.start());
    enter_insert(cx.modes, false);
    Ok(())
}

fn yank(cx: &mut ActionContext<'_>, caret: usize, range: &TextRange) -> Result<()> {
    let text = range_text(cx.editor.text(), range);
    cx.registers.store_text(&text, range.kind(), false)?;
    let pos = cx.editor.caret(caret);
    let keep = range.is_linewise() && cx.editor.line_of(pos) == cx.editor.line_of(range.start());
    if !keep {
        cx.editor.set_caret(caret, range.start());
    }
    Ok(())
}

fn shift(cx: &mut ActionContext<'_>, caret: usize, range: &TextRange, right: bool, times: usize) -> Result<()> {
    let first = cx.editor.line_of(range.start());
    let last = if range.end() > range.start() {
        cx.editor.line_of(range.end() - 1)
    } else {
        first
    };
    let width = cx.options.shiftwidth() * times.max(1);
    for line in (first..=last).rev() {
        let start = cx.editor.line_start(line);
        let end = cx.editor.line_end(line);
        if right {
            if end > start {
                cx.editor.insert_text(start, &" ".repeat(width));
            }
            continue;
        }
        let mut removed = 0;
        let mut columns = 0;
        for c in cx.editor.text()[start..end].chars() {
            match c {
                ' ' if columns < width => columns += 1,
                '\t' if columns < width => columns = width,
                _ => break,
            }
            removed += 1;
        }
        if removed > 0 {
            cx.editor.delete_range(start, start + removed);
        }
    }
    let line_begin = cx.editor.line_start(first);
    let pos = first_non_blank(cx.editor.text(), line_begin);
    cx.editor.set_caret(caret, pos);
    Ok(())
}

fn change_case(cx: &mut ActionContext<'_>, caret: usize, range: &TextRange, kind: OperatorKind) -> Result<()> {
    for &(s, e) in range.spans().iter().rev() {
        let old = cx.editor.text()[s..e].to_string();
        let new: String = match kind {
            OperatorKind::Lower => old.to_lowercase(),
            OperatorKind::Upper => old.to_uppercase(),
            _ => old.chars().map(toggle_char_case).collect(),
        };
        if new != old {
            cx.editor.replace_range(s, e, &new);
        }
    }
    cx.editor.set_caret(caret, range.start());
    Ok(())
}

pub(crate) fn toggle_char_case(c: char) -> String {
    if c.is_uppercase() {
        c.to_lowercase().collect()
    } else {
        c.to_uppercase().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_text_joins_block_spans() {
        let buf = "abcd\nefgh";
        let r = TextRange::block(vec![(1, 3), (6, 8)]);
        assert_eq!(range_text(buf, &r), "bc\nfg");
    }

    #[test]
    fn test_toggle_char_case() {
        assert_eq!(toggle_char_case('a'), "A");
        assert_eq!(toggle_char_case('Q'), "q");
        assert_eq!(toggle_char_case('1'), "1");
    }

    #[test]
    fn test_command_types() {
        assert!(OperatorKind::Delete.command_type().is_write());
        assert!(!OperatorKind::Yank.command_type().is_write());
    }
}
