use super::commands::join_lines;
use super::insert::{enter_insert, type_key};
use super::operators::{apply, OperatorKind};
use super::{ActionContext, ActionHandler, DispatchStrategy};
use crate::command::{ArgumentType, Command, CommandFlags, CommandType};
use crate::editor::Editor;
use crate::error::{Error, Result};
use crate::key::KeyStroke;
use crate::mode::{ModeStack, SubMode, VisualKind, VisualToggle};
use crate::options::Options;
use crate::range::{resolve, resolve_lines, resolve_with, ResolveOptions, SelectionType, TextRange};
use crate::state::{EditState, LastVisual};
use crate::text::advance_chars;

/// Range selected by caret `idx`, or `None` without an anchor.
pub(crate) fn selection_range(
    editor: &dyn Editor,
    idx: usize,
    sub_mode: SubMode,
    options: &Options,
    to_line_end: bool,
) -> Option<TextRange> {
    let head = editor.caret(idx);
    let anchor = editor.anchor(idx)?;
    Some(match sub_mode.selection_type() {
        SelectionType::CharacterWise if options.selection_exclusive() => {
            TextRange::new(anchor, head, SelectionType::CharacterWise)
        }
        SelectionType::CharacterWise => resolve(editor, anchor, head, SelectionType::CharacterWise),
        SelectionType::LineWise => resolve_lines(
            editor,
            editor.line_of(anchor),
            editor.line_of(head),
            ResolveOptions::default(),
        ),
        SelectionType::BlockWise => resolve_with(
            editor,
            anchor,
            head,
            SelectionType::BlockWise,
            ResolveOptions {
                to_line_end,
                ..Default::default()
            },
        ),
    })
}

/// Size of a selection a command consumed. `.` applies the command to a
/// range of the same size starting at the caret.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct VisualExtent {
    sub_mode: SubMode,
    /// Lines below the first selected line.
    lines: usize,
    /// Characters for a charwise selection, columns for a block.
    width: usize,
    to_line_end: bool,
}

impl VisualExtent {
    pub(crate) fn capture(editor: &dyn Editor, sub_mode: SubMode, range: &TextRange, to_line_end: bool) -> Self {
        let text = editor.text();
        let first = editor.line_of(range.start());
        let last = editor.line_of(range.end().saturating_sub(1).max(range.start()));
        let width = match sub_mode.selection_type() {
            SelectionType::CharacterWise => text[range.start()..range.end()].chars().count(),
            SelectionType::BlockWise => range
                .spans()
                .iter()
                .map(|&(s, e)| text[s..e].chars().count())
                .max()
                .unwrap_or(0),
            SelectionType::LineWise => 0,
        };
        Self {
            sub_mode,
            lines: last.saturating_sub(first),
            width,
            to_line_end,
        }
    }

    pub(crate) fn range_at(&self, editor: &dyn Editor, pos: usize) -> TextRange {
        let first = editor.line_of(pos);
        let last = (first + self.lines).min(editor.line_count().saturating_sub(1));
        match self.sub_mode.selection_type() {
            SelectionType::CharacterWise => {
                let end = advance_chars(editor.text(), pos, self.width);
                TextRange::new(pos, end, SelectionType::CharacterWise)
            }
            SelectionType::LineWise => resolve_lines(editor, first, last, ResolveOptions::default()),
            SelectionType::BlockWise => {
                let column = editor.column_of(pos) + self.width.saturating_sub(1);
                let head = editor.offset_at(last, column);
                resolve_with(
                    editor,
                    pos,
                    head,
                    SelectionType::BlockWise,
                    ResolveOptions {
                        to_line_end: self.to_line_end,
                        ..Default::default()
                    },
                )
            }
        }
    }
}

fn remember(editor: &dyn Editor, state: &mut EditState, sub_mode: SubMode) {
    let Some(anchor) = editor.anchor(0) else {
        return;
    };
    let head = editor.caret(0);
    state.last_visual = Some(LastVisual {
        anchor,
        head,
        sub_mode,
    });
    state.set_mark('<', anchor.min(head));
    state.set_mark('>', anchor.max(head));
}

fn clear_anchors(editor: &mut dyn Editor) {
    for idx in 0..editor.caret_count() {
        editor.set_anchor(idx, None);
    }
}

/// Leaves the topmost visual or select mode, remembering the selection
/// for `gv`.
pub(crate) fn leave_visual(editor: &mut dyn Editor, modes: &mut ModeStack, state: &mut EditState) {
    let sub_mode = modes
        .states()
        .iter()
        .rev()
        .find(|s| s.mode.is_visual_family())
        .map(|s| s.sub_mode);
    if let Some(sub_mode) = sub_mode {
        remember(editor, state, sub_mode);
    }
    modes.exit_visual();
    clear_anchors(editor);
    state.block_to_line_end = false;
}

/// A printable key typed in select mode replaces the selection.
pub(crate) fn type_over_selection(cx: &mut ActionContext<'_>, key: KeyStroke) -> Result<()> {
    let sub_mode = cx.modes.sub_mode();
    for idx in (0..cx.editor.caret_count()).rev() {
        let Some(range) = selection_range(&*cx.editor, idx, sub_mode, cx.options, cx.state.block_to_line_end) else {
            continue;
        };
        for &(s, e) in range.spans().iter().rev() {
            cx.editor.delete_range(s, e);
        }
        cx.editor.set_caret(idx, range.start());
    }
    leave_visual(cx.editor, cx.modes, cx.state);
    enter_insert(cx.modes, false);
    type_key(cx.editor, cx.modes, key);
    Ok(())
}

// ── Mode toggles ────────────────────────────────────────────────────────────

/// `v`, `V`, `<C-v>`, `gh`, `gH`, `g<C-h>`.
pub(crate) struct ToggleVisual {
    id: &'static str,
    kind: VisualKind,
    sub_mode: SubMode,
}

impl ToggleVisual {
    pub(crate) fn new(id: &'static str, kind: VisualKind, sub_mode: SubMode) -> Self {
        Self { id, kind, sub_mode }
    }
}

impl ActionHandler for ToggleVisual {
    fn id(&self) -> &'static str {
        self.id
    }

    fn command_type(&self) -> CommandType {
        CommandType::Readonly
    }

    fn strategy(&self) -> DispatchStrategy {
        DispatchStrategy::SingleExecution
    }

    fn execute(&self, cx: &mut ActionContext<'_>, _caret: Option<usize>, _cmd: &Command) -> Result<()> {
        let before = cx.modes.sub_mode();
        match cx.modes.toggle_visual(self.kind, self.sub_mode) {
            VisualToggle::Entered => {
                for idx in 0..cx.editor.caret_count() {
                    let pos = cx.editor.caret(idx);
                    cx.editor.set_anchor(idx, Some(pos));
                }
            }
            VisualToggle::Switched => {}
            VisualToggle::Exited => {
                remember(&*cx.editor, cx.state, before);
                clear_anchors(cx.editor);
            }
        }
        Ok(())
    }
}

/// `gv`: select the previous selection again.
pub(crate) struct Reselect;

impl ActionHandler for Reselect {
    fn id(&self) -> &'static str {
        "VisualSelectPrevious"
    }

    fn command_type(&self) -> CommandType {
        CommandType::Readonly
    }

    fn strategy(&self) -> DispatchStrategy {
        DispatchStrategy::SingleExecution
    }

    fn execute(&self, cx: &mut ActionContext<'_>, _caret: Option<usize>, _cmd: &Command) -> Result<()> {
        let last = cx.state.last_visual.ok_or(Error::MotionFailed)?;
        if cx.modes.mode().is_visual_family() {
            cx.modes.set_sub_mode(last.sub_mode);
        } else {
            cx.modes.toggle_visual(VisualKind::Visual, last.sub_mode);
        }
        let len = cx.editor.len();
        cx.editor.set_anchor(0, Some(last.anchor.min(len)));
        cx.editor.set_caret(0, last.head.min(len));
        Ok(())
    }
}

/// `<C-g>`: swap visual and select.
pub(crate) struct SwapVisualSelect;

impl ActionHandler for SwapVisualSelect {
    fn id(&self) -> &'static str {
        "VisualToggleSelect"
    }

    fn command_type(&self) -> CommandType {
        CommandType::Readonly
    }

    fn strategy(&self) -> DispatchStrategy {
        DispatchStrategy::SingleExecution
    }

    fn execute(&self, cx: &mut ActionContext<'_>, _caret: Option<usize>, _cmd: &Command) -> Result<()> {
        cx.modes.toggle_visual_select();
        Ok(())
    }
}

/// `o` / `O`: move the caret to the other end of the selection.
pub(crate) struct SwapEnds;

impl ActionHandler for SwapEnds {
    fn id(&self) -> &'static str {
        "VisualSwapEnds"
    }

    fn command_type(&self) -> CommandType {
        CommandType::Readonly
    }

    fn flags(&self) -> CommandFlags {
        CommandFlags::KEEP_VISUAL
    }

    fn execute(&self, cx: &mut ActionContext<'_>, caret: Option<usize>, _cmd: &Command) -> Result<()> {
        let idx = caret.unwrap_or(0);
        let head = cx.editor.caret(idx);
        let anchor = cx.editor.anchor(idx).ok_or(Error::MotionFailed)?;
        cx.editor.set_anchor(idx, Some(head));
        cx.editor.set_caret(idx, anchor);
        Ok(())
    }
}

// ── Commands on the selection ───────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum VisualAction {
    Operator(OperatorKind),
    /// `D`, `X`, `Y`, `C`, `S`, `R`: the operator on whole lines.
    LineOperator(OperatorKind),
    ReplaceChar,
    Join,
    Put,
}

pub(crate) struct VisualCommand {
    id: &'static str,
    action: VisualAction,
}

impl VisualCommand {
    pub(crate) fn new(id: &'static str, action: VisualAction) -> Self {
        Self { id, action }
    }
}

fn whole_lines(editor: &dyn Editor, range: &TextRange) -> TextRange {
    if range.is_linewise() {
        return range.clone();
    }
    let last = if range.end() > range.start() {
        range.end() - 1
    } else {
        range.start()
    };
    resolve_lines(
        editor,
        editor.line_of(range.start()),
        editor.line_of(last),
        ResolveOptions::default(),
    )
}

impl ActionHandler for VisualCommand {
    fn id(&self) -> &'static str {
        self.id
    }

    fn command_type(&self) -> CommandType {
        match self.action {
            VisualAction::Operator(kind) | VisualAction::LineOperator(kind) => kind.command_type(),
            VisualAction::Put => CommandType::Paste,
            VisualAction::ReplaceChar | VisualAction::Join => CommandType::Change,
        }
    }

    fn argument_type(&self) -> Option<ArgumentType> {
        (self.action == VisualAction::ReplaceChar).then_some(ArgumentType::Character)
    }

    fn flags(&self) -> CommandFlags {
        CommandFlags::EXIT_VISUAL | CommandFlags::CLEAR_STROKES
    }

    fn execute(&self, cx: &mut ActionContext<'_>, caret: Option<usize>, cmd: &Command) -> Result<()> {
        let idx = caret.unwrap_or(0);
        let range = cx.state.visual_range(idx).cloned().ok_or(Error::MotionFailed)?;
        match self.action {
            VisualAction::Operator(kind @ (OperatorKind::ShiftLeft | OperatorKind::ShiftRight))
            | VisualAction::LineOperator(kind) => {
                let lines = whole_lines(&*cx.editor, &range);
                apply(kind, cx, idx, &lines, cmd.count1())
            }
            VisualAction::Operator(kind) => apply(kind, cx, idx, &range, cmd.count1()),
            VisualAction::ReplaceChar => {
                let ch = cmd.character().ok_or_else(|| Error::build("character expected"))?;
                for &(s, e) in range.spans().iter().rev() {
                    let old = cx.editor.text()[s..e].to_string();
                    let new: String = old.chars().map(|c| if c == '\n' { c } else { ch }).collect();
                    cx.editor.replace_range(s, e, &new);
                }
                cx.editor.set_caret(idx, range.start());
                Ok(())
            }
            VisualAction::Join => {
                let first = cx.editor.line_of(range.start());
                let last = cx.editor.line_of(range.end().saturating_sub(1).max(range.start()));
                let joins = (last - first).max(1);
                let pos = join_lines(cx.editor, first, joins).ok_or(Error::MotionFailed)?;
                cx.editor.set_caret(idx, pos);
                Ok(())
            }
            VisualAction::Put => {
                let name = cx.registers.selected();
                let reg = cx.registers.get(name).cloned().ok_or(Error::EmptyRegister(name))?;
                apply(OperatorKind::Delete, cx, idx, &range, 1)?;
                let start = range.start().min(cx.editor.len());
                let text = match (reg.kind, range.is_linewise()) {
                    (SelectionType::LineWise, false) => format!("\n{}", reg.text()),
                    (SelectionType::LineWise, true) => reg.text().to_string(),
                    (_, true) => format!("{}\n", reg.text()),
                    _ => reg.text().to_string(),
                };
                let at = if range.is_linewise() {
                    cx.editor.line_start(cx.editor.line_of(start))
                } else {
                    start
                };
                cx.editor.insert_text(at, &text);
                cx.editor.set_caret(idx, at);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::TextBuffer;
    use crate::mode::Mode;

    #[test]
    fn test_selection_range_inclusive_and_exclusive() {
        let mut editor = TextBuffer::new("hello world").with_caret(4);
        editor.set_anchor(0, Some(0));
        let mut options = Options::new();
        let r = selection_range(&editor, 0, SubMode::VisualCharacter, &options, false).unwrap();
        assert_eq!(r.spans(), &[(0, 5)]);
        options
            .set("selection", crate::options::OptionValue::String("exclusive".into()))
            .unwrap();
        let r = selection_range(&editor, 0, SubMode::VisualCharacter, &options, false).unwrap();
        assert_eq!(r.spans(), &[(0, 4)]);
    }

    #[test]
    fn test_line_selection_ending_at_line_start() {
        let mut editor = TextBuffer::new("one\ntwo\nthree").with_caret(4);
        editor.set_anchor(0, Some(0));
        let r = selection_range(&editor, 0, SubMode::VisualLine, &Options::new(), false).unwrap();
        assert_eq!(r.spans(), &[(0, 8)]);
    }

    #[test]
    fn test_leave_visual_remembers_selection() {
        let mut editor = TextBuffer::new("hello").with_caret(3);
        editor.set_anchor(0, Some(1));
        let mut modes = ModeStack::new();
        modes.push(Mode::Visual, SubMode::VisualCharacter);
        let mut state = EditState::default();
        leave_visual(&mut editor, &mut modes, &mut state);
        assert_eq!(modes.mode(), Mode::Normal);
        assert_eq!(editor.anchor(0), None);
        assert_eq!(
            state.last_visual,
            Some(LastVisual {
                anchor: 1,
                head: 3,
                sub_mode: SubMode::VisualCharacter
            })
        );
        assert_eq!(state.mark('<'), Some(1));
    }

    #[test]
    fn test_extent_replays_same_size() {
        let editor = TextBuffer::new("abcdefgh\nijklmnop\nqrst");
        let chars = TextRange::new(0, 3, SelectionType::CharacterWise);
        let extent = VisualExtent::capture(&editor, SubMode::VisualCharacter, &chars, false);
        assert_eq!(extent.range_at(&editor, 4).spans(), &[(4, 7)]);
        assert_eq!(extent.range_at(&editor, 7).spans(), &[(7, 10)]);

        let lines = resolve_lines(&editor, 0, 1, ResolveOptions::default());
        let extent = VisualExtent::capture(&editor, SubMode::VisualLine, &lines, false);
        assert_eq!(extent.range_at(&editor, 10).spans(), &[(9, 22)]);
    }
}
