use super::{ActionContext, ActionHandler, Capability};
use crate::command::{Command, CommandType};
use crate::range::{SelectionType, TextRange};
use crate::text::{text_object_pair, text_object_paragraph, text_object_quote, text_object_word, CharClass};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ObjectKind {
    Word(CharClass),
    Quote(char),
    Pair(char, char),
    Paragraph,
}

pub(crate) struct TextObject {
    id: &'static str,
    kind: ObjectKind,
    inner: bool,
}

impl TextObject {
    pub(crate) fn new(id: &'static str, kind: ObjectKind, inner: bool) -> Self {
        Self { id, kind, inner }
    }
}

impl ActionHandler for TextObject {
    fn id(&self) -> &'static str {
        self.id
    }

    fn command_type(&self) -> CommandType {
        CommandType::Motion
    }

    fn capability(&self) -> Capability {
        Capability::TextObject
    }

    fn text_object(&self, cx: &mut ActionContext<'_>, caret: usize, cmd: &Command) -> Option<TextRange> {
        let buf = cx.editor.text();
        let pos = cx.editor.caret(caret);
        let n = cmd.count1();
        match self.kind {
            ObjectKind::Word(class) => {
                let (start, mut end) = text_object_word(buf, pos, self.inner, class)?;
                for _ in 1..n {
                    match text_object_word(buf, end, self.inner, class) {
                        Some((_, next)) if next > end => end = next,
                        _ => break,
                    }
                }
                Some(TextRange::new(start, end, SelectionType::CharacterWise))
            }
            ObjectKind::Quote(q) => {
                let (start, end) = text_object_quote(buf, pos, self.inner, q)?;
                Some(TextRange::new(start, end, SelectionType::CharacterWise))
            }
            ObjectKind::Pair(open, close) => {
                let (mut start, mut end) = text_object_pair(buf, pos, self.inner, open, close)?;
                // A count selects the n-th enclosing pair.
                for _ in 1..n {
                    let outer_from = if self.inner {
                        start.saturating_sub(open.len_utf8() + 1)
                    } else {
                        start.checked_sub(1)?
                    };
                    let (s, e) = text_object_pair(buf, outer_from, self.inner, open, close)?;
                    start = s;
                    end = e;
                }
                Some(TextRange::new(start, end, SelectionType::CharacterWise))
            }
            ObjectKind::Paragraph => {
                let (start, mut end) = text_object_paragraph(buf, pos, self.inner);
                for _ in 1..n {
                    if end >= buf.len() {
                        break;
                    }
                    end = text_object_paragraph(buf, end + 1, self.inner).1;
                }
                let end = (end + 1).min(buf.len());
                Some(TextRange::new(start, end, SelectionType::LineWise))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::TextBuffer;
    use crate::mode::ModeStack;
    use crate::options::Options;
    use crate::registers::Registers;
    use crate::state::EditState;
    use std::rc::Rc;

    fn object(kind: ObjectKind, inner: bool, text: &str, caret: usize, count: usize) -> Option<TextRange> {
        let mut editor = TextBuffer::new(text).with_caret(caret);
        let mut modes = ModeStack::new();
        let mut registers = Registers::new();
        let mut state = EditState::default();
        let options = Options::new();
        let mut cx = ActionContext {
            editor: &mut editor,
            modes: &mut modes,
            registers: &mut registers,
            state: &mut state,
            options: &options,
        };
        let handler = Rc::new(TextObject::new("test", kind, inner));
        let mut cmd = Command::new(handler.clone(), Vec::new());
        cmd.raw_count = count;
        handler.text_object(&mut cx, 0, &cmd)
    }

    #[test]
    fn test_inner_and_outer_word() {
        let r = object(ObjectKind::Word(CharClass::Word), true, "foo bar baz", 5, 0).unwrap();
        assert_eq!(r.spans(), &[(4, 7)]);
        let r = object(ObjectKind::Word(CharClass::Word), false, "foo bar baz", 5, 0).unwrap();
        assert_eq!(r.spans(), &[(4, 8)]);
    }

    #[test]
    fn test_pair_with_count_selects_outer() {
        let text = "(a (b) c)";
        let r = object(ObjectKind::Pair('(', ')'), false, text, 4, 0).unwrap();
        assert_eq!(r.spans(), &[(3, 6)]);
        let r = object(ObjectKind::Pair('(', ')'), false, text, 4, 2).unwrap();
        assert_eq!(r.spans(), &[(0, 9)]);
    }

    #[test]
    fn test_paragraph_is_linewise() {
        let r = object(ObjectKind::Paragraph, true, "a\nb\n\nc", 0, 0).unwrap();
        assert!(r.is_linewise());
        assert_eq!(r.spans(), &[(0, 4)]);
    }

    #[test]
    fn test_missing_quote_fails() {
        assert_eq!(object(ObjectKind::Quote('"'), true, "no quotes", 2, 0), None);
    }
}
