use super::operators::{apply, toggle_char_case, OperatorKind};
use super::{ActionContext, ActionHandler, DispatchStrategy, Effect};
use crate::command::{ArgumentType, Command, CommandFlags, CommandType};
use crate::editor::Editor;
use crate::error::{Error, Result};
use crate::mode::{Mode, SubMode};
use crate::range::{resolve_lines, ResolveOptions, SelectionType, TextRange};
use crate::state::{CmdLine, CmdLineKind};
use crate::text::{
    advance_chars, first_non_blank, line_end, line_start, move_down, next_char_boundary, prev_char_boundary,
};

// ── Operator shorthands ─────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Short {
    /// `x`, `s`: count chars right.
    CharsRight,
    /// `X`: count chars left.
    CharsLeft,
    /// `D`, `C`: to the end of the line.
    ToLineEnd,
    /// `S`, `Y`: count whole lines.
    Lines,
}

/// `x X s S D C Y`: an operator with a fixed motion.
pub(crate) struct Shorthand {
    id: &'static str,
    op: OperatorKind,
    short: Short,
}

impl Shorthand {
    pub(crate) fn new(id: &'static str, op: OperatorKind, short: Short) -> Self {
        Self { id, op, short }
    }
}

impl ActionHandler for Shorthand {
    fn id(&self) -> &'static str {
        self.id
    }

    fn command_type(&self) -> CommandType {
        self.op.command_type()
    }

    fn execute(&self, cx: &mut ActionContext<'_>, caret: Option<usize>, cmd: &Command) -> Result<()> {
        let idx = caret.unwrap_or(0);
        let n = cmd.count1();
        let pos = cx.editor.caret(idx);
        let buf = cx.editor.text();
        let range = match self.short {
            Short::CharsRight => {
                let end = advance_chars(buf, pos, n).min(line_end(buf, pos));
                if end == pos && self.op == OperatorKind::Delete {
                    return Ok(());
                }
                TextRange::new(pos, end, SelectionType::CharacterWise)
            }
            Short::CharsLeft => {
                let sol = line_start(buf, pos);
                let mut start = pos;
                for _ in 0..n {
                    if start <= sol {
                        break;
                    }
                    start = prev_char_boundary(buf, start);
                }
                if start == pos {
                    return Err(Error::MotionFailed);
                }
                TextRange::new(start, pos, SelectionType::CharacterWise)
            }
            Short::ToLineEnd => {
                let mut p = pos;
                for _ in 1..n {
                    match move_down(buf, p, Some(0)) {
                        Some(next) => p = next,
                        None => break,
                    }
                }
                TextRange::new(pos, line_end(buf, p), SelectionType::CharacterWise)
            }
            Short::Lines => {
                let first = cx.editor.line_of(pos);
                let last = (first + n - 1).min(cx.editor.line_count().saturating_sub(1));
                resolve_lines(&*cx.editor, first, last, ResolveOptions::default())
            }
        };
        apply(self.op, cx, idx, &range, 1)
    }
}

// ── Put ─────────────────────────────────────────────────────────────────────

/// `p` / `P`.
pub(crate) struct Put {
    id: &'static str,
    before: bool,
}

impl Put {
    pub(crate) fn new(id: &'static str, before: bool) -> Self {
        Self { id, before }
    }
}

impl ActionHandler for Put {
    fn id(&self) -> &'static str {
        self.id
    }

    fn command_type(&self) -> CommandType {
        CommandType::Paste
    }

    fn strategy(&self) -> DispatchStrategy {
        DispatchStrategy::ConditionalMulticaret
    }

    /// Blockwise text is put once, at the primary caret.
    fn run_for_each_caret(&self, cx: &ActionContext<'_>) -> bool {
        cx.registers
            .get(cx.registers.selected())
            .is_none_or(|r| r.kind != SelectionType::BlockWise)
    }

    fn execute(&self, cx: &mut ActionContext<'_>, caret: Option<usize>, cmd: &Command) -> Result<()> {
        let name = cx.registers.selected();
        let reg = cx.registers.get(name).cloned().ok_or(Error::EmptyRegister(name))?;
        let text = reg.text().repeat(cmd.count1());
        let idx = caret.unwrap_or(0);
        let pos = cx.editor.caret(idx);
        let buf = cx.editor.text();
        let len = buf.len();

        if reg.kind == SelectionType::LineWise {
            let first = if self.before {
                let sol = line_start(buf, pos);
                cx.editor.insert_text(sol, &text);
                sol
            } else {
                let eol = line_end(buf, pos);
                if eol >= len {
                    let body = text.strip_suffix('\n').unwrap_or(&text);
                    cx.editor.insert_text(len, &format!("\n{body}"));
                } else {
                    cx.editor.insert_text(eol + 1, &text);
                }
                eol + 1
            };
            let target = first_non_blank(cx.editor.text(), first);
            cx.editor.set_caret(idx, target);
            return Ok(());
        }

        let at = if !self.before && pos < line_end(buf, pos) {
            next_char_boundary(buf, pos)
        } else {
            pos
        };
        cx.editor.insert_text(at, &text);
        let target = if text.contains('\n') {
            at
        } else {
            prev_char_boundary(cx.editor.text(), at + text.len())
        };
        cx.editor.set_caret(idx, target);
        Ok(())
    }
}

// ── Single-line edits ───────────────────────────────────────────────────────

/// Joins `joins` following lines onto `line`. Returns the last join point.
pub(crate) fn join_lines(editor: &mut dyn Editor, line: usize, joins: usize) -> Option<usize> {
    let mut point = None;
    for _ in 0..joins {
        let sol = editor.line_start(line);
        let eol = editor.line_end(line);
        let buf = editor.text();
        if eol >= buf.len() {
            break;
        }
        let next = eol + 1;
        let indent = buf[next..]
            .find(|c: char| c != ' ' && c != '\t')
            .map(|i| next + i)
            .unwrap_or(buf.len());
        let bare = indent >= buf.len()
            || buf[indent..].starts_with(['\n', ')'])
            || eol == sol
            || buf[..eol].ends_with([' ', '\t']);
        let sep = if bare { "" } else { " " };
        editor.replace_range(eol, indent, sep);
        point = Some(eol);
    }
    point
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Edit {
    /// `J`
    Join,
    /// `r{char}`
    ReplaceChar,
    /// `~`
    ToggleCase,
}

pub(crate) struct LineEdit {
    id: &'static str,
    edit: Edit,
}

impl LineEdit {
    pub(crate) fn new(id: &'static str, edit: Edit) -> Self {
        Self { id, edit }
    }
}

impl ActionHandler for LineEdit {
    fn id(&self) -> &'static str {
        self.id
    }

    fn command_type(&self) -> CommandType {
        CommandType::Change
    }

    fn argument_type(&self) -> Option<ArgumentType> {
        (self.edit == Edit::ReplaceChar).then_some(ArgumentType::Character)
    }

    fn execute(&self, cx: &mut ActionContext<'_>, caret: Option<usize>, cmd: &Command) -> Result<()> {
        let idx = caret.unwrap_or(0);
        let n = cmd.count1();
        let pos = cx.editor.caret(idx);
        match self.edit {
            Edit::Join => {
                let line = cx.editor.line_of(pos);
                let point = join_lines(cx.editor, line, n.saturating_sub(1).max(1)).ok_or(Error::MotionFailed)?;
                cx.editor.set_caret(idx, point);
            }
            Edit::ReplaceChar => {
                let ch = cmd.character().ok_or_else(|| Error::build("character expected"))?;
                let buf = cx.editor.text();
                let eol = line_end(buf, pos);
                let end = advance_chars(buf, pos, n);
                if end > eol || buf[pos..end].chars().count() < n {
                    return Err(Error::MotionFailed);
                }
                let new = ch.to_string().repeat(n);
                cx.editor.replace_range(pos, end, &new);
                let last = prev_char_boundary(cx.editor.text(), pos + new.len());
                cx.editor.set_caret(idx, last);
            }
            Edit::ToggleCase => {
                let buf = cx.editor.text();
                let end = advance_chars(buf, pos, n).min(line_end(buf, pos));
                if end == pos {
                    return Ok(());
                }
                let new: String = buf[pos..end].chars().map(toggle_char_case).collect();
                cx.editor.replace_range(pos, end, &new);
                cx.editor.set_caret(idx, pos + new.len());
            }
        }
        Ok(())
    }
}

// ── Session commands ────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum SessionAction {
    Undo,
    Redo,
    /// `q{register}`, or `q` alone while recording.
    ToggleRecording,
    /// `@{register}`
    PlayMacro,
    /// `.`
    Repeat,
    /// `:`
    ExEntry,
}

pub(crate) struct SessionCommand {
    id: &'static str,
    action: SessionAction,
}

impl SessionCommand {
    pub(crate) fn new(id: &'static str, action: SessionAction) -> Self {
        Self { id, action }
    }
}

impl ActionHandler for SessionCommand {
    fn id(&self) -> &'static str {
        self.id
    }

    fn command_type(&self) -> CommandType {
        match self.action {
            SessionAction::Repeat => CommandType::Repeat,
            _ => CommandType::Readonly,
        }
    }

    fn argument_type(&self) -> Option<ArgumentType> {
        match self.action {
            SessionAction::ToggleRecording | SessionAction::PlayMacro => Some(ArgumentType::Character),
            _ => None,
        }
    }

    fn flags(&self) -> CommandFlags {
        CommandFlags::CLEAR_STROKES
    }

    fn strategy(&self) -> DispatchStrategy {
        DispatchStrategy::SingleExecution
    }

    fn execute(&self, cx: &mut ActionContext<'_>, _caret: Option<usize>, cmd: &Command) -> Result<()> {
        match self.action {
            SessionAction::Undo => {
                for _ in 0..cmd.count1() {
                    if !cx.editor.undo() {
                        break;
                    }
                }
            }
            SessionAction::Redo => {
                for _ in 0..cmd.count1() {
                    if !cx.editor.redo() {
                        break;
                    }
                }
            }
            SessionAction::ToggleRecording => {
                if cx.registers.is_recording() {
                    cx.registers.stop_recording();
                } else {
                    let name = cmd.character().ok_or_else(|| Error::build("register expected"))?;
                    cx.registers.start_recording(name)?;
                }
            }
            SessionAction::PlayMacro => {
                let register = cmd.character().ok_or_else(|| Error::build("register expected"))?;
                cx.state.emit(Effect::PlayMacro {
                    register,
                    count: cmd.count1(),
                });
            }
            SessionAction::Repeat => cx.state.emit(Effect::Repeat {
                raw_count: cmd.count0(),
            }),
            SessionAction::ExEntry => {
                cx.modes.push(Mode::CmdLine, SubMode::None);
                cx.state.cmdline = Some(CmdLine {
                    kind: CmdLineKind::Ex,
                    text: String::new(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::TextBuffer;

    #[test]
    fn test_join_lines_spacing() {
        let mut editor = TextBuffer::new("foo\n   bar\n)\nbaz");
        assert_eq!(join_lines(&mut editor, 0, 1), Some(3));
        assert_eq!(editor.as_str(), "foo bar\n)\nbaz");
        join_lines(&mut editor, 0, 1);
        assert_eq!(editor.as_str(), "foo bar)\nbaz");
    }

    #[test]
    fn test_join_on_last_line_fails() {
        let mut editor = TextBuffer::new("only");
        assert_eq!(join_lines(&mut editor, 0, 1), None);
    }
}
