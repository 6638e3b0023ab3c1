//! The "operator awaits a motion" protocol.

use crate::action::{ActionContext, Capability};
use crate::command::{Argument, Command, CommandFlags, MAX_COUNT};
use crate::error::{Error, Result};
use crate::mode::{Mode, ModeStack};
use crate::range::{resolve, resolve_lines, resolve_with, MotionType, ResolveOptions, SelectionType, TextRange};
use crate::text::{char_at, prev_char_boundary};

struct PendingOperator {
    command: Command,
    /// Stack depth before OP_PENDING was pushed.
    depth_before: usize,
}

/// `Idle` when nothing is stored, `AwaitingArgument` otherwise.
#[derive(Default)]
pub struct OperatorComposer {
    pending: Option<PendingOperator>,
}

impl OperatorComposer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_awaiting(&self) -> bool {
        self.pending.is_some()
    }

    pub fn operator(&self) -> Option<&Command> {
        self.pending.as_ref().map(|p| &p.command)
    }

    pub fn begin(&mut self, operator: Command, modes: &mut ModeStack) {
        if let Some(prev) = self.pending.take() {
            modes.unwind_to(prev.depth_before);
        }
        let depth_before = modes.depth();
        modes.push(Mode::OpPending, modes.sub_mode());
        self.pending = Some(PendingOperator {
            command: operator,
            depth_before,
        });
    }

    /// Pops OP_PENDING and returns the operator with `motion` attached.
    pub fn complete(&mut self, motion: Command, modes: &mut ModeStack) -> Result<Command> {
        let pending = self
            .pending
            .take()
            .ok_or_else(|| Error::build("no operator pending"))?;
        modes.unwind_to(pending.depth_before);
        let mut command = pending.command;
        command.attach(Argument::Motion(Box::new(motion)))?;
        Ok(command)
    }

    pub fn cancel(&mut self, modes: &mut ModeStack) {
        if let Some(pending) = self.pending.take() {
            modes.unwind_to(pending.depth_before);
        }
    }

    /// Applies a completed operator command at `caret`. Returns false when
    /// the motion produced nothing, in which case the buffer is untouched.
    pub fn apply(cx: &mut ActionContext<'_>, caret: usize, cmd: &Command) -> Result<bool> {
        let motion = cmd
            .motion()
            .ok_or_else(|| Error::build(format!("{} has no motion", cmd.id())))?;
        let mut motion = motion.clone();
        motion.raw_count = if cmd.count0() == 0 && motion.count0() == 0 {
            0
        } else {
            cmd.count1().saturating_mul(motion.count1()).min(MAX_COUNT)
        };

        cx.state.pending_operator = Some(cmd.id());
        cx.state.block_to_line_end = false;
        let range = motion_range(cx, caret, cmd, &motion);
        cx.state.pending_operator = None;
        let Some(range) = range else {
            return Ok(false);
        };

        let buf = cx.editor.text();
        let last = if range.end() > range.start() {
            prev_char_boundary(buf, range.end())
        } else {
            range.start()
        };
        cx.state.set_mark('[', range.start());
        cx.state.set_mark(']', last);

        let saved = cx.state.repeat_handler;
        let result = cmd.action.operate(cx, caret, &range, cmd);
        cx.state.repeat_handler = saved;
        result.map(|()| true)
    }
}

fn forced_type(op: &Command, motion: &Command, natural: MotionType) -> MotionType {
    if op.flags.contains(CommandFlags::MOT_LINEWISE) || motion.flags.contains(CommandFlags::MOT_LINEWISE) {
        MotionType::LineWise
    } else if motion.flags.contains(CommandFlags::MOT_INCLUSIVE) {
        MotionType::Inclusive
    } else if motion.flags.contains(CommandFlags::MOT_EXCLUSIVE) {
        MotionType::Exclusive
    } else {
        natural
    }
}

fn motion_range(cx: &mut ActionContext<'_>, caret: usize, op: &Command, motion: &Command) -> Option<TextRange> {
    let start = cx.editor.caret(caret);
    match motion.action.capability() {
        Capability::TextObject => {
            let range = motion.action.text_object(cx, caret, motion)?;
            if forced_type(op, motion, MotionType::Exclusive) != MotionType::LineWise || range.is_linewise() {
                return Some(range);
            }
            let first = cx.editor.line_of(range.start());
            let last = cx.editor.line_of(range.end().saturating_sub(1).max(range.start()));
            Some(resolve_lines(&*cx.editor, first, last, ResolveOptions::default()))
        }
        Capability::Motion(natural) => {
            let end = motion.action.motion(cx, caret, motion)?;
            let natural = motion.action.dynamic_motion_type(cx.state).unwrap_or(natural);
            let editor = &*cx.editor;
            Some(match forced_type(op, motion, natural) {
                MotionType::LineWise => resolve_lines(
                    editor,
                    editor.line_of(start),
                    editor.line_of(end),
                    ResolveOptions::default(),
                ),
                MotionType::Inclusive => {
                    let (lo, hi) = (start.min(end), start.max(end));
                    // Landing on a line break does not take the break.
                    if char_at(editor.text(), hi).is_none_or(|c| c == '\n') {
                        TextRange::new(lo, hi, SelectionType::CharacterWise)
                    } else {
                        resolve(editor, lo, hi, MotionType::Inclusive)
                    }
                }
                MotionType::BlockWise => resolve_with(
                    editor,
                    start,
                    end,
                    MotionType::BlockWise,
                    ResolveOptions {
                        to_line_end: cx.state.block_to_line_end,
                        ..Default::default()
                    },
                ),
                MotionType::Exclusive => resolve(editor, start, end, MotionType::Exclusive),
            })
        }
        Capability::Operator | Capability::Plain => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::ActionRegistry;
    use crate::editor::{Editor, TextBuffer};
    use crate::key::parse_keys;
    use crate::mode::SubMode;
    use crate::options::Options;
    use crate::registers::Registers;
    use crate::state::EditState;

    struct Fixture {
        editor: TextBuffer,
        modes: ModeStack,
        registers: Registers,
        state: EditState,
        options: Options,
        registry: ActionRegistry,
    }

    fn setup(text: &str, caret: usize) -> Fixture {
        Fixture {
            editor: TextBuffer::new(text).with_caret(caret),
            modes: ModeStack::new(),
            registers: Registers::new(),
            state: EditState::default(),
            options: Options::new(),
            registry: ActionRegistry::vim(),
        }
    }

    impl Fixture {
        fn command(&self, id: &str, keys: &str) -> Command {
            let action = self.registry.by_id(id).unwrap();
            Command::new(action, parse_keys(keys).unwrap())
        }

        fn operator(&self, op: &str, motion: &str, op_count: usize, motion_count: usize) -> Command {
            let mut op = self.command(op, "d");
            op.raw_count = op_count;
            let mut motion = self.command(motion, "w");
            motion.raw_count = motion_count;
            op.attach(Argument::Motion(Box::new(motion))).unwrap();
            op
        }

        fn apply(&mut self, cmd: &Command) -> Result<bool> {
            let mut cx = ActionContext {
                editor: &mut self.editor,
                modes: &mut self.modes,
                registers: &mut self.registers,
                state: &mut self.state,
                options: &self.options,
            };
            OperatorComposer::apply(&mut cx, 0, cmd)
        }
    }

    #[test]
    fn test_begin_complete_restores_depth() {
        let f = setup("foo", 0);
        let mut modes = ModeStack::new();
        let mut composer = OperatorComposer::new();
        composer.begin(f.command("OperatorDelete", "d"), &mut modes);
        assert!(composer.is_awaiting());
        assert_eq!(modes.mode(), Mode::OpPending);
        let cmd = composer.complete(f.command("MotionWordRight", "w"), &mut modes).unwrap();
        assert_eq!(cmd.motion().map(|m| m.id()), Some("MotionWordRight"));
        assert_eq!(modes.depth(), 1);
        assert!(!composer.is_awaiting());
    }

    #[test]
    fn test_cancel_unwinds() {
        let f = setup("foo", 0);
        let mut modes = ModeStack::new();
        modes.push(Mode::Visual, SubMode::VisualCharacter);
        let mut composer = OperatorComposer::new();
        composer.begin(f.command("OperatorYank", "y"), &mut modes);
        composer.cancel(&mut modes);
        assert_eq!(modes.mode(), Mode::Visual);
        assert_eq!(modes.depth(), 2);
    }

    #[test]
    fn test_delete_word() {
        let mut f = setup("foo bar baz", 0);
        let cmd = f.operator("OperatorDelete", "MotionWordRight", 0, 0);
        assert!(f.apply(&cmd).unwrap());
        assert_eq!(f.editor.as_str(), "bar baz");
        assert_eq!(f.state.mark('['), Some(0));
    }

    #[test]
    fn test_counts_multiply() {
        let mut f = setup("a b c d e f g", 0);
        let cmd = f.operator("OperatorDelete", "MotionWordRight", 2, 2);
        f.apply(&cmd).unwrap();
        assert_eq!(f.editor.as_str(), "e f g");
    }

    #[test]
    fn test_linewise_flag_forces_whole_lines() {
        let mut f = setup("foo bar\nbaz", 0);
        let mut cmd = f.operator("OperatorYank", "MotionWordRight", 0, 0);
        cmd.flags |= CommandFlags::MOT_LINEWISE;
        f.apply(&cmd).unwrap();
        let reg = f.registers.get('0').unwrap();
        assert_eq!(reg.kind, SelectionType::LineWise);
        assert_eq!(reg.text(), "foo bar\n");
    }

    #[test]
    fn test_delete_to_line_end_keeps_newline() {
        let mut f = setup("abc\ndef", 1);
        let cmd = f.operator("OperatorDelete", "MotionLastColumn", 0, 0);
        f.apply(&cmd).unwrap();
        assert_eq!(f.editor.as_str(), "a\ndef");
    }

    #[test]
    fn test_failed_motion_changes_nothing() {
        let mut f = setup("abc", 0);
        let cmd = f.operator("OperatorDelete", "MotionLeft", 0, 0);
        assert!(!f.apply(&cmd).unwrap());
        assert_eq!(f.editor.as_str(), "abc");
        assert_eq!(f.state.pending_operator, None);
    }

    #[test]
    fn test_repeat_handler_restored() {
        let mut f = setup("abc", 0);
        f.state.repeat_handler = true;
        let cmd = f.operator("OperatorYank", "MotionWordRight", 0, 0);
        f.apply(&cmd).unwrap();
        assert!(f.state.repeat_handler);
        assert_eq!(f.editor.caret(0), 0);
    }
}
