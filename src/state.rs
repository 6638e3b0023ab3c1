use crate::action::{Effect, OperatorFunction};
use crate::mode::SubMode;
use crate::range::TextRange;
use crate::search::{LiteralSearch, Searcher};
use crate::text::FindKind;
use std::collections::HashMap;
use std::rc::Rc;

const JUMP_LIST_LIMIT: usize = 100;

/// What the command line is collecting.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CmdLineKind {
    /// `:` ex command.
    Ex,
    /// `/` or `?` pattern for a pending search motion.
    Search { forward: bool },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CmdLine {
    pub kind: CmdLineKind,
    pub text: String,
}

impl CmdLine {
    pub fn prompt(&self) -> char {
        match self.kind {
            CmdLineKind::Ex => ':',
            CmdLineKind::Search { forward: true } => '/',
            CmdLineKind::Search { forward: false } => '?',
        }
    }
}

/// Last visual selection, for `gv`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LastVisual {
    pub anchor: usize,
    pub head: usize,
    pub sub_mode: SubMode,
}

/// Per-session state shared by action handlers besides the text and modes.
pub struct EditState {
    pub last_find: Option<(FindKind, char)>,
    pub last_search: Option<(String, bool)>,
    pub marks: HashMap<char, usize>,
    pub jumps: Vec<usize>,
    /// Selection of each caret, captured before a visual command runs.
    pub visual_ranges: Vec<Option<TextRange>>,
    pub last_visual: Option<LastVisual>,
    /// `$` was the last motion in blockwise visual.
    pub block_to_line_end: bool,
    /// Id of the operator whose motion is being evaluated.
    pub pending_operator: Option<&'static str>,
    /// Whether `.` repeats an extension handler rather than a command.
    pub repeat_handler: bool,
    /// Position where insert mode was last left, for `gi`.
    pub last_insert: Option<usize>,
    pub cmdline: Option<CmdLine>,
    pub searcher: Rc<dyn Searcher>,
    pub operator_function: Option<Rc<dyn OperatorFunction>>,
    pub effects: Vec<Effect>,
}

impl Default for EditState {
    fn default() -> Self {
        Self {
            last_find: None,
            last_search: None,
            marks: HashMap::new(),
            jumps: Vec::new(),
            visual_ranges: Vec::new(),
            last_visual: None,
            block_to_line_end: false,
            pending_operator: None,
            repeat_handler: false,
            last_insert: None,
            cmdline: None,
            searcher: Rc::new(LiteralSearch),
            operator_function: None,
            effects: Vec::new(),
        }
    }
}

impl EditState {
    pub fn set_mark(&mut self, name: char, offset: usize) {
        self.marks.insert(name, offset);
    }

    pub fn mark(&self, name: char) -> Option<usize> {
        self.marks.get(&name).copied()
    }

    pub fn push_jump(&mut self, offset: usize) {
        if self.jumps.last() == Some(&offset) {
            return;
        }
        self.jumps.push(offset);
        if self.jumps.len() > JUMP_LIST_LIMIT {
            self.jumps.remove(0);
        }
        self.marks.insert('\'', offset);
    }

    pub fn visual_range(&self, caret: usize) -> Option<&TextRange> {
        self.visual_ranges.get(caret).and_then(|r| r.as_ref())
    }

    pub fn emit(&mut self, effect: Effect) {
        self.effects.push(effect);
    }

    /// Clears what belongs to one editing run but keeps configured
    /// collaborators.
    pub fn reset(&mut self) {
        self.visual_ranges.clear();
        self.block_to_line_end = false;
        self.pending_operator = None;
        self.cmdline = None;
        self.effects.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jump_list_dedups_and_sets_mark() {
        let mut state = EditState::default();
        state.push_jump(3);
        state.push_jump(3);
        state.push_jump(9);
        assert_eq!(state.jumps, vec![3, 9]);
        assert_eq!(state.mark('\''), Some(9));
    }

    #[test]
    fn test_cmdline_prompt() {
        let line = CmdLine {
            kind: CmdLineKind::Search { forward: false },
            text: String::new(),
        };
        assert_eq!(line.prompt(), '?');
    }
}
