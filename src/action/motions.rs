use super::{ActionContext, ActionHandler, Capability};
use crate::command::{ArgumentType, Command, CommandFlags, CommandType};
use crate::range::MotionType;
use crate::registers::LAST_SEARCH_REGISTER;
use crate::state::EditState;
use crate::text::{
    advance_chars, char_at, char_class, find_char, first_non_blank, goto_line, line_end, line_end_normal,
    line_start, move_down, move_up, next_char_boundary, paragraph_backward, paragraph_forward,
    prev_char_boundary, word_backward_pos, word_end_backward_pos, word_end_pos, word_forward_pos, CharClass,
    FindKind,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum MotionKind {
    Left,
    Right,
    Down,
    Up,
    WordForward(CharClass),
    WordBackward(CharClass),
    WordEnd(CharClass),
    WordEndBackward(CharClass),
    LineStart,
    FirstNonBlank,
    LineEnd,
    /// `_`: count-1 lines down, first non-blank.
    LineDown,
    FirstLine,
    LastLine,
    Find(FindKind),
    RepeatFind { reverse: bool },
    ParagraphForward,
    ParagraphBackward,
    Search { forward: bool },
    SearchNext { reverse: bool },
}

pub(crate) struct Motion {
    id: &'static str,
    kind: MotionKind,
    mtype: MotionType,
    flags: CommandFlags,
}

impl Motion {
    pub(crate) fn new(id: &'static str, kind: MotionKind, mtype: MotionType) -> Self {
        Self {
            id,
            kind,
            mtype,
            flags: CommandFlags::empty(),
        }
    }

    pub(crate) fn jump(mut self) -> Self {
        self.flags |= CommandFlags::SAVE_JUMP;
        self
    }
}

impl ActionHandler for Motion {
    fn id(&self) -> &'static str {
        self.id
    }

    fn command_type(&self) -> CommandType {
        CommandType::Motion
    }

    fn capability(&self) -> Capability {
        Capability::Motion(self.mtype)
    }

    fn argument_type(&self) -> Option<ArgumentType> {
        match self.kind {
            MotionKind::Find(_) => Some(ArgumentType::Character),
            MotionKind::Search { .. } => Some(ArgumentType::ExString),
            _ => None,
        }
    }

    fn flags(&self) -> CommandFlags {
        self.flags
    }

    fn dynamic_motion_type(&self, state: &EditState) -> Option<MotionType> {
        let MotionKind::RepeatFind { reverse } = self.kind else {
            return None;
        };
        let (kind, _) = state.last_find?;
        let kind = if reverse { kind.reversed() } else { kind };
        Some(if kind.is_forward() {
            MotionType::Inclusive
        } else {
            MotionType::Exclusive
        })
    }

    fn motion(&self, cx: &mut ActionContext<'_>, caret: usize, cmd: &Command) -> Option<usize> {
        let pos = cx.editor.caret(caret);
        let n = cmd.count1();
        let operator = cx.state.pending_operator;
        let buf = cx.editor.text();

        let target = match self.kind {
            MotionKind::Left => {
                let sol = line_start(buf, pos);
                if pos <= sol {
                    return None;
                }
                let mut p = pos;
                for _ in 0..n {
                    if p <= sol {
                        break;
                    }
                    p = prev_char_boundary(buf, p);
                }
                p
            }
            MotionKind::Right => {
                // An operator may reach the end of the line (`dl` on the last char).
                let limit = if operator.is_some() {
                    line_end(buf, pos)
                } else {
                    line_end_normal(buf, pos)
                };
                if pos >= limit {
                    return None;
                }
                advance_chars(buf, pos, n).min(limit)
            }
            MotionKind::Down | MotionKind::Up => {
                let col = cx.editor.column_of(pos);
                let mut p = pos;
                for i in 0..n {
                    let next = if self.kind == MotionKind::Down {
                        move_down(buf, p, Some(col))
                    } else {
                        move_up(buf, p, Some(col))
                    };
                    match next {
                        Some(next) => p = next,
                        None if i == 0 => return None,
                        None => break,
                    }
                }
                p
            }
            MotionKind::WordForward(class) => {
                if pos >= buf.len() {
                    return None;
                }
                if operator == Some("OperatorChange") && char_at(buf, pos).is_some_and(|c| !c.is_whitespace()) {
                    return Some(change_word_end(buf, pos, n, class));
                }
                let mut prev = pos;
                let mut p = pos;
                for _ in 0..n {
                    let next = word_forward_pos(buf, p, class);
                    if next == p {
                        break;
                    }
                    prev = p;
                    p = next;
                }
                // `dw` on the last word of a line stops at the line end.
                if operator.is_some() && line_start(buf, p) > line_start(buf, prev) {
                    let eol = line_end(buf, prev);
                    if buf[eol..p].chars().all(char::is_whitespace) {
                        p = eol.max(prev);
                    }
                }
                p
            }
            MotionKind::WordBackward(class) => {
                if pos == 0 {
                    return None;
                }
                step_n(pos, n, |p| word_backward_pos(buf, p, class))
            }
            MotionKind::WordEnd(class) => step_n(pos, n, |p| word_end_pos(buf, p, class)),
            MotionKind::WordEndBackward(class) => {
                if pos == 0 {
                    return None;
                }
                step_n(pos, n, |p| word_end_backward_pos(buf, p, class))
            }
            MotionKind::LineStart => line_start(buf, pos),
            MotionKind::FirstNonBlank => first_non_blank(buf, pos),
            MotionKind::LineEnd => {
                let mut p = pos;
                for _ in 1..n {
                    match move_down(buf, p, Some(0)) {
                        Some(next) => p = next,
                        None => break,
                    }
                }
                cx.state.block_to_line_end = true;
                if cx.modes.in_visual() {
                    line_end(buf, p)
                } else {
                    line_end_normal(buf, p)
                }
            }
            MotionKind::LineDown => {
                let mut p = line_start(buf, pos);
                for _ in 1..n {
                    let eol = line_end(buf, p);
                    if eol >= buf.len() {
                        break;
                    }
                    p = eol + 1;
                }
                first_non_blank(buf, p)
            }
            MotionKind::FirstLine => first_non_blank(buf, goto_line(buf, cmd.count0().saturating_sub(1))),
            MotionKind::LastLine => {
                let line = match cmd.count0() {
                    0 => cx.editor.line_count().saturating_sub(1),
                    c => c - 1,
                };
                first_non_blank(buf, goto_line(buf, line))
            }
            MotionKind::Find(kind) => {
                let ch = cmd.character()?;
                cx.state.last_find = Some((kind, ch));
                repeat_find(buf, pos, kind, ch, n, false)?
            }
            MotionKind::RepeatFind { reverse } => {
                let (kind, ch) = cx.state.last_find?;
                let kind = if reverse { kind.reversed() } else { kind };
                repeat_find(buf, pos, kind, ch, n, true)?
            }
            MotionKind::ParagraphForward => step_n(pos, n, |p| paragraph_forward(buf, p)),
            MotionKind::ParagraphBackward => step_n(pos, n, |p| paragraph_backward(buf, p)),
            MotionKind::Search { forward } => {
                let typed = cmd.ex_string().unwrap_or_default();
                let pattern = if typed.is_empty() {
                    cx.state.last_search.as_ref()?.0.clone()
                } else {
                    typed.to_string()
                };
                let found = search(cx, pos, &pattern, forward, n);
                cx.registers.set_readonly(LAST_SEARCH_REGISTER, &pattern);
                cx.state.last_search = Some((pattern, forward));
                found?
            }
            MotionKind::SearchNext { reverse } => {
                let (pattern, forward) = cx.state.last_search.clone()?;
                search(cx, pos, &pattern, forward != reverse, n)?
            }
        };

        if target == pos && !matches!(self.kind, MotionKind::LineStart | MotionKind::FirstNonBlank | MotionKind::LineEnd | MotionKind::LineDown | MotionKind::FirstLine | MotionKind::LastLine) {
            return None;
        }
        Some(target)
    }
}

/// Applies `step` up to `n` times, stopping once it no longer moves.
fn step_n(pos: usize, n: usize, step: impl Fn(usize) -> usize) -> usize {
    let mut p = pos;
    for _ in 0..n {
        let next = step(p);
        if next == p {
            break;
        }
        p = next;
    }
    p
}

fn repeat_find(buf: &str, pos: usize, kind: FindKind, ch: char, n: usize, skip_first: bool) -> Option<usize> {
    let mut p = pos;
    for i in 0..n {
        let next = find_char(buf, p, kind, ch, skip_first || i > 0)?;
        if next == p && i > 0 {
            break;
        }
        p = next;
    }
    Some(p)
}

/// Finds the `n`th match. With wrapscan the matches repeat, so a count
/// larger than one lap is reduced modulo the lap.
fn search(cx: &ActionContext<'_>, pos: usize, pattern: &str, forward: bool, n: usize) -> Option<usize> {
    let buf = cx.editor.text();
    let mut hits: Vec<usize> = Vec::new();
    let mut p = pos;
    while hits.len() < n {
        p = cx
            .state
            .searcher
            .find(buf, pattern, p, forward, cx.options.ignorecase(), cx.options.wrapscan())?;
        if hits.first() == Some(&p) {
            return Some(hits[(n - 1) % hits.len()]);
        }
        hits.push(p);
    }
    hits.last().copied()
}

/// `cw` on a word changes to the end of the word, not up to the next one.
fn change_word_end(buf: &str, pos: usize, n: usize, class: CharClass) -> usize {
    let cls = char_at(buf, pos).map(|c| char_class(c, class));
    let mut p = pos;
    loop {
        let next = next_char_boundary(buf, p);
        match char_at(buf, next) {
            Some(c) if c != '\n' && Some(char_class(c, class)) == cls => p = next,
            _ => break,
        }
    }
    p = step_n(p, n.saturating_sub(1), |p| word_end_pos(buf, p, class));
    next_char_boundary(buf, p)
}
