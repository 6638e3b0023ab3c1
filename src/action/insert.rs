use super::{each_caret, ActionContext, ActionHandler, DispatchStrategy};
use crate::command::{ArgumentType, Command, CommandFlags, CommandType};
use crate::editor::Editor;
use crate::error::{Error, Result};
use crate::key::KeyStroke;
use crate::mode::{Mode, ModeStack, SubMode};
use crate::text::{
    char_at, first_non_blank, line_end, line_start, move_down, move_up, next_char_boundary, prev_char_boundary,
    word_backward_pos, CharClass,
};
use crossterm::event::KeyCode;

/// Enters insert (or replace) mode. Idempotent, so it is safe per caret.
pub(crate) fn enter_insert(modes: &mut ModeStack, replace: bool) {
    match modes.mode() {
        // `<C-o>` excursion: going back to insert ends it.
        Mode::InsertNormal => {
            modes.pop();
        }
        Mode::Insert | Mode::Replace | Mode::InsertVisual | Mode::InsertSelect => {}
        _ => modes.push(if replace { Mode::Replace } else { Mode::Insert }, SubMode::None),
    }
}

/// Types a key that no insert-mode command claims. Returns false when the
/// key has no meaning in insert mode.
pub fn type_key(editor: &mut dyn Editor, modes: &ModeStack, key: KeyStroke) -> bool {
    let text: Option<String> = match key.code {
        KeyCode::Char(_) => key.as_char().map(String::from),
        KeyCode::Enter if key.modifiers.is_empty() => Some("\n".into()),
        KeyCode::Tab if key.modifiers.is_empty() => Some("\t".into()),
        _ => None,
    };
    for idx in 0..editor.caret_count() {
        let pos = editor.caret(idx);
        if let Some(text) = &text {
            let overwrite = modes.in_replace()
                && text != "\n"
                && char_at(editor.text(), pos).is_some_and(|c| c != '\n');
            if overwrite {
                let end = next_char_boundary(editor.text(), pos);
                editor.replace_range(pos, end, text);
            } else {
                editor.insert_text(pos, text);
            }
            editor.set_caret(idx, pos + text.len());
            continue;
        }
        let buf = editor.text();
        match key.code {
            KeyCode::Backspace => {
                if pos > 0 {
                    let prev = prev_char_boundary(buf, pos);
                    editor.delete_range(prev, pos);
                }
            }
            KeyCode::Delete => {
                let next = next_char_boundary(buf, pos);
                editor.delete_range(pos, next);
            }
            KeyCode::Left => {
                if pos > line_start(buf, pos) {
                    let prev = prev_char_boundary(buf, pos);
                    editor.set_caret(idx, prev);
                }
            }
            KeyCode::Right => {
                if pos < line_end(buf, pos) {
                    let next = next_char_boundary(buf, pos);
                    editor.set_caret(idx, next);
                }
            }
            KeyCode::Up => {
                if let Some(p) = move_up(buf, pos, None) {
                    editor.set_caret(idx, p);
                }
            }
            KeyCode::Down => {
                if let Some(p) = move_down(buf, pos, None) {
                    editor.set_caret(idx, p);
                }
            }
            KeyCode::Home => {
                let sol = line_start(buf, pos);
                editor.set_caret(idx, sol);
            }
            KeyCode::End => {
                let eol = line_end(buf, pos);
                editor.set_caret(idx, eol);
            }
            _ => return false,
        }
    }
    true
}

// ── Entering insert ─────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum InsertAt {
    Before,
    After,
    FirstNonBlank,
    LineEnd,
    ColumnZero,
    LineAbove,
    LineBelow,
    LastInsert,
    Replace,
}

pub(crate) struct InsertCommand {
    id: &'static str,
    at: InsertAt,
}

impl InsertCommand {
    pub(crate) fn new(id: &'static str, at: InsertAt) -> Self {
        Self { id, at }
    }
}

impl ActionHandler for InsertCommand {
    fn id(&self) -> &'static str {
        self.id
    }

    fn command_type(&self) -> CommandType {
        CommandType::Insert
    }

    fn flags(&self) -> CommandFlags {
        CommandFlags::CLEAR_STROKES
    }

    fn execute(&self, cx: &mut ActionContext<'_>, caret: Option<usize>, _cmd: &Command) -> Result<()> {
        each_caret(cx, caret, |cx, idx| {
            let pos = cx.editor.caret(idx);
            let buf = cx.editor.text();
            let target = match self.at {
                InsertAt::Before | InsertAt::Replace => pos,
                InsertAt::After => {
                    if pos < line_end(buf, pos) {
                        next_char_boundary(buf, pos)
                    } else {
                        pos
                    }
                }
                InsertAt::FirstNonBlank => first_non_blank(buf, pos),
                InsertAt::LineEnd => line_end(buf, pos),
                InsertAt::ColumnZero => line_start(buf, pos),
                InsertAt::LastInsert => cx.state.last_insert.unwrap_or(pos).min(buf.len()),
                InsertAt::LineBelow => {
                    let eol = line_end(buf, pos);
                    cx.editor.insert_text(eol, "\n");
                    eol + 1
                }
                InsertAt::LineAbove => {
                    let sol = line_start(buf, pos);
                    cx.editor.insert_text(sol, "\n");
                    sol
                }
            };
            cx.editor.set_caret(idx, target);
            Ok(())
        })?;
        enter_insert(cx.modes, self.at == InsertAt::Replace);
        Ok(())
    }
}

// ── Insert-mode commands ────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum InsertAction {
    /// `<Esc>`: back to the mode insert was entered from.
    Exit,
    /// `<C-w>`
    DeleteWordBefore,
    /// `<C-u>`
    DeleteLineBefore,
    /// `<C-r>{register}`
    PutRegister,
    /// `<Insert>`
    ToggleReplace,
    /// `<C-o>`: one normal-mode command.
    SingleCommand,
}

pub(crate) struct InsertModeCommand {
    id: &'static str,
    action: InsertAction,
}

impl InsertModeCommand {
    pub(crate) fn new(id: &'static str, action: InsertAction) -> Self {
        Self { id, action }
    }
}

impl ActionHandler for InsertModeCommand {
    fn id(&self) -> &'static str {
        self.id
    }

    fn command_type(&self) -> CommandType {
        match self.action {
            InsertAction::DeleteWordBefore | InsertAction::DeleteLineBefore | InsertAction::PutRegister => {
                CommandType::Writable
            }
            _ => CommandType::Readonly,
        }
    }

    fn argument_type(&self) -> Option<ArgumentType> {
        (self.action == InsertAction::PutRegister).then_some(ArgumentType::Character)
    }

    fn strategy(&self) -> DispatchStrategy {
        match self.action {
            InsertAction::DeleteWordBefore | InsertAction::DeleteLineBefore | InsertAction::PutRegister => {
                DispatchStrategy::ForEachCaret
            }
            _ => DispatchStrategy::SingleExecution,
        }
    }

    fn execute(&self, cx: &mut ActionContext<'_>, caret: Option<usize>, cmd: &Command) -> Result<()> {
        match self.action {
            InsertAction::Exit => {
                cx.state.last_insert = Some(cx.editor.caret(0));
                if cx.modes.in_insert() {
                    cx.modes.pop();
                }
                each_caret(cx, caret, |cx, idx| {
                    let pos = cx.editor.caret(idx);
                    let buf = cx.editor.text();
                    if pos > line_start(buf, pos) {
                        let prev = prev_char_boundary(buf, pos);
                        cx.editor.set_caret(idx, prev);
                    }
                    Ok(())
                })
            }
            InsertAction::DeleteWordBefore => each_caret(cx, caret, |cx, idx| {
                let pos = cx.editor.caret(idx);
                let buf = cx.editor.text();
                let sol = line_start(buf, pos);
                let from = if pos == sol {
                    prev_char_boundary(buf, pos)
                } else {
                    word_backward_pos(buf, pos, CharClass::Word).max(sol)
                };
                cx.editor.delete_range(from, pos);
                Ok(())
            }),
            InsertAction::DeleteLineBefore => each_caret(cx, caret, |cx, idx| {
                let pos = cx.editor.caret(idx);
                let buf = cx.editor.text();
                let indent = first_non_blank(buf, pos);
                let from = if pos > indent { indent } else { line_start(buf, pos) };
                cx.editor.delete_range(from, pos);
                Ok(())
            }),
            InsertAction::PutRegister => {
                let name = cmd.character().ok_or_else(|| Error::build("register name expected"))?;
                let text = cx
                    .registers
                    .get(name)
                    .map(|r| r.text().to_string())
                    .ok_or(Error::EmptyRegister(name))?;
                each_caret(cx, caret, |cx, idx| {
                    let pos = cx.editor.caret(idx);
                    cx.editor.insert_text(pos, &text);
                    cx.editor.set_caret(idx, pos + text.len());
                    Ok(())
                })
            }
            InsertAction::ToggleReplace => {
                cx.modes.toggle_insert_replace();
                Ok(())
            }
            InsertAction::SingleCommand => {
                cx.modes.push(Mode::InsertNormal, SubMode::None);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::TextBuffer;

    #[test]
    fn test_type_key_inserts_and_moves() {
        let mut editor = TextBuffer::new("ac").with_caret(1);
        let mut modes = ModeStack::new();
        modes.push(Mode::Insert, SubMode::None);
        assert!(type_key(&mut editor, &modes, KeyStroke::char('b')));
        assert_eq!(editor.as_str(), "abc");
        assert_eq!(editor.caret(0), 2);
        assert!(type_key(&mut editor, &modes, KeyStroke::code(KeyCode::Backspace)));
        assert_eq!(editor.as_str(), "ac");
        assert_eq!(editor.caret(0), 1);
    }

    #[test]
    fn test_replace_mode_overwrites() {
        let mut editor = TextBuffer::new("abc").with_caret(0);
        let mut modes = ModeStack::new();
        modes.push(Mode::Replace, SubMode::None);
        type_key(&mut editor, &modes, KeyStroke::char('x'));
        type_key(&mut editor, &modes, KeyStroke::char('y'));
        assert_eq!(editor.as_str(), "xyc");
    }

    #[test]
    fn test_unknown_key_is_not_typed() {
        let mut editor = TextBuffer::new("abc");
        let modes = ModeStack::new();
        assert!(!type_key(&mut editor, &modes, KeyStroke::ctrl('z')));
        assert_eq!(editor.as_str(), "abc");
    }

    #[test]
    fn test_enter_insert_from_insert_normal_pops() {
        let mut modes = ModeStack::new();
        modes.push(Mode::Insert, SubMode::None);
        modes.push(Mode::InsertNormal, SubMode::None);
        enter_insert(&mut modes, false);
        assert_eq!(modes.mode(), Mode::Insert);
        enter_insert(&mut modes, false);
        assert_eq!(modes.depth(), 2);
    }
}
