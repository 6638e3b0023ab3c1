use crate::error::{Error, Result};
use crate::range::SelectionType;
use bitflags::bitflags;
use serde::Serialize;

// ── Public types ────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Mode {
    Normal,
    Insert,
    Visual,
    Select,
    CmdLine,
    OpPending,
    Replace,
    /// `<C-o>` from insert: one normal command, then back to insert.
    InsertNormal,
    InsertVisual,
    InsertSelect,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum SubMode {
    None,
    VisualCharacter,
    VisualLine,
    VisualBlock,
}

impl SubMode {
    pub fn selection_type(self) -> SelectionType {
        match self {
            SubMode::VisualLine => SelectionType::LineWise,
            SubMode::VisualBlock => SelectionType::BlockWise,
            SubMode::None | SubMode::VisualCharacter => SelectionType::CharacterWise,
        }
    }
}

bitflags! {
    /// Mode buckets a mapping or action binding applies to.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MappingModes: u8 {
        const NORMAL = 0b0000_0001;
        const VISUAL = 0b0000_0010;
        const SELECT = 0b0000_0100;
        const OP_PENDING = 0b0000_1000;
        const INSERT = 0b0001_0000;
        const CMD_LINE = 0b0010_0000;

        const X = Self::VISUAL.bits();
        const V = Self::VISUAL.bits() | Self::SELECT.bits();
        const NV = Self::NORMAL.bits() | Self::V.bits();
        const NX = Self::NORMAL.bits() | Self::X.bits();
        const NVO = Self::NV.bits() | Self::OP_PENDING.bits();
        const NXO = Self::NX.bits() | Self::OP_PENDING.bits();
        const XO = Self::X.bits() | Self::OP_PENDING.bits();
        const IC = Self::INSERT.bits() | Self::CMD_LINE.bits();
        const ALL = Self::NVO.bits() | Self::IC.bits();
    }
}

impl MappingModes {
    /// Parses the mode letters of `:map` variants: `n v x s o i c`, `!` for
    /// insert+cmdline, and empty for `nvo`.
    pub fn from_letters(letters: &str) -> Result<Self> {
        if letters.is_empty() {
            return Ok(Self::NVO);
        }
        let mut modes = Self::empty();
        for c in letters.chars() {
            modes |= match c {
                'n' => Self::NORMAL,
                'v' => Self::V,
                'x' => Self::X,
                's' => Self::SELECT,
                'o' => Self::OP_PENDING,
                'i' => Self::INSERT,
                'c' => Self::CMD_LINE,
                '!' => Self::IC,
                other => return Err(Error::Config(format!("unknown mapping mode '{other}'"))),
            };
        }
        Ok(modes)
    }
}

impl Mode {
    /// The single mapping bucket consulted while this mode is active.
    pub fn mapping_mode(self) -> MappingModes {
        match self {
            Mode::Normal | Mode::InsertNormal => MappingModes::NORMAL,
            Mode::Visual | Mode::InsertVisual => MappingModes::VISUAL,
            Mode::Select | Mode::InsertSelect => MappingModes::SELECT,
            Mode::OpPending => MappingModes::OP_PENDING,
            Mode::Insert | Mode::Replace => MappingModes::INSERT,
            Mode::CmdLine => MappingModes::CMD_LINE,
        }
    }

    pub fn is_visual_family(self) -> bool {
        matches!(
            self,
            Mode::Visual | Mode::InsertVisual | Mode::Select | Mode::InsertSelect
        )
    }
}

/// Which kind of selection mode a toggle targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VisualKind {
    Visual,
    Select,
}

/// What a visual/select toggle did to the stack.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VisualToggle {
    Entered,
    Switched,
    Exited,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ModeState {
    pub mode: Mode,
    pub sub_mode: SubMode,
}

impl ModeState {
    fn new(mode: Mode, sub_mode: SubMode) -> Self {
        Self { mode, sub_mode }
    }
}

// ── Mode stack ──────────────────────────────────────────────────────────────

/// Nested mode tracker. The bottom entry is the base mode and is never popped.
#[derive(Clone, Debug)]
pub struct ModeStack {
    states: Vec<ModeState>,
}

impl Default for ModeStack {
    fn default() -> Self {
        Self::new()
    }
}

impl ModeStack {
    pub fn new() -> Self {
        Self {
            states: vec![ModeState::new(Mode::Normal, SubMode::None)],
        }
    }

    fn top(&self) -> ModeState {
        // The base entry is never removed.
        self.states[self.states.len() - 1]
    }

    fn top_mut(&mut self) -> &mut ModeState {
        let last = self.states.len() - 1;
        &mut self.states[last]
    }

    pub fn mode(&self) -> Mode {
        self.top().mode
    }

    pub fn sub_mode(&self) -> SubMode {
        self.top().sub_mode
    }

    pub fn depth(&self) -> usize {
        self.states.len()
    }

    pub fn states(&self) -> &[ModeState] {
        &self.states
    }

    pub fn push(&mut self, mode: Mode, sub_mode: SubMode) {
        self.states.push(ModeState::new(mode, sub_mode));
    }

    /// Pops the top entry. The base entry stays.
    pub fn pop(&mut self) -> Option<ModeState> {
        if self.states.len() > 1 {
            self.states.pop()
        } else {
            None
        }
    }

    /// Pops until the stack is `depth` entries deep.
    pub fn unwind_to(&mut self, depth: usize) {
        while self.states.len() > depth.max(1) {
            self.states.pop();
        }
    }

    pub fn set_sub_mode(&mut self, sub_mode: SubMode) {
        self.top_mut().sub_mode = sub_mode;
    }

    pub fn reset(&mut self) {
        self.states.truncate(1);
        self.states[0] = ModeState::new(Mode::Normal, SubMode::None);
    }

    /// `v`, `V`, `<C-v>`, `gh` and friends: enter, switch submode in place,
    /// or leave when the same submode is requested again.
    pub fn toggle_visual(&mut self, kind: VisualKind, sub_mode: SubMode) -> VisualToggle {
        let top = self.top();
        let (same, other) = match kind {
            VisualKind::Visual => (
                [Mode::Visual, Mode::InsertVisual],
                [Mode::Select, Mode::InsertSelect],
            ),
            VisualKind::Select => (
                [Mode::Select, Mode::InsertSelect],
                [Mode::Visual, Mode::InsertVisual],
            ),
        };
        if same.contains(&top.mode) {
            if top.sub_mode == sub_mode {
                self.exit_visual();
                return VisualToggle::Exited;
            }
            self.set_sub_mode(sub_mode);
            return VisualToggle::Switched;
        }
        if other.contains(&top.mode) {
            let insert = top.mode == other[1];
            *self.top_mut() = ModeState::new(Self::visual_mode(kind, insert), sub_mode);
            return VisualToggle::Switched;
        }
        match top.mode {
            Mode::InsertNormal => {
                *self.top_mut() = ModeState::new(Self::visual_mode(kind, true), sub_mode);
            }
            Mode::Insert | Mode::Replace => {
                self.push(Self::visual_mode(kind, true), sub_mode);
            }
            _ => self.push(Self::visual_mode(kind, false), sub_mode),
        }
        VisualToggle::Entered
    }

    fn visual_mode(kind: VisualKind, from_insert: bool) -> Mode {
        match (kind, from_insert) {
            (VisualKind::Visual, false) => Mode::Visual,
            (VisualKind::Visual, true) => Mode::InsertVisual,
            (VisualKind::Select, false) => Mode::Select,
            (VisualKind::Select, true) => Mode::InsertSelect,
        }
    }

    /// `<C-g>`: swap visual and select, keeping the submode.
    pub fn toggle_visual_select(&mut self) -> bool {
        let top = self.top_mut();
        top.mode = match top.mode {
            Mode::Visual => Mode::Select,
            Mode::Select => Mode::Visual,
            Mode::InsertVisual => Mode::InsertSelect,
            Mode::InsertSelect => Mode::InsertVisual,
            _ => return false,
        };
        true
    }

    /// Removes the topmost visual/select entry, even if an insert entry
    /// was pushed above it by the command that consumed the selection.
    pub fn exit_visual(&mut self) -> bool {
        let Some(idx) = self
            .states
            .iter()
            .rposition(|s| s.mode.is_visual_family())
        else {
            return false;
        };
        if idx == 0 {
            self.states[0] = ModeState::new(Mode::Normal, SubMode::None);
        } else {
            self.states.remove(idx);
        }
        true
    }

    /// `<Insert>` in insert or replace mode.
    pub fn toggle_insert_replace(&mut self) {
        let top = self.top_mut();
        top.mode = match top.mode {
            Mode::Insert => Mode::Replace,
            Mode::Replace => Mode::Insert,
            other => other,
        };
    }

    // ── Derived queries ─────────────────────────────────────────────────

    pub fn mapping_mode(&self) -> MappingModes {
        self.mode().mapping_mode()
    }

    pub fn in_normal(&self) -> bool {
        matches!(self.mode(), Mode::Normal | Mode::InsertNormal)
    }

    pub fn in_insert(&self) -> bool {
        matches!(self.mode(), Mode::Insert | Mode::Replace)
    }

    pub fn in_replace(&self) -> bool {
        self.mode() == Mode::Replace
    }

    pub fn in_visual(&self) -> bool {
        matches!(self.mode(), Mode::Visual | Mode::InsertVisual)
    }

    pub fn in_select(&self) -> bool {
        matches!(self.mode(), Mode::Select | Mode::InsertSelect)
    }

    pub fn in_op_pending(&self) -> bool {
        self.mode() == Mode::OpPending
    }

    pub fn in_cmd_line(&self) -> bool {
        self.mode() == Mode::CmdLine
    }

    pub fn in_single_command(&self) -> bool {
        self.mode() == Mode::InsertNormal
    }

    /// Whether the caret may rest on the end-of-line position.
    pub fn is_end_allowed(&self) -> bool {
        matches!(
            self.mode(),
            Mode::Insert
                | Mode::Replace
                | Mode::Visual
                | Mode::Select
                | Mode::InsertVisual
                | Mode::InsertSelect
                | Mode::CmdLine
        )
    }

    /// Mode indicator as shown by `showmode`.
    pub fn status_string(&self) -> String {
        let sub = match self.sub_mode() {
            SubMode::VisualLine => " LINE",
            SubMode::VisualBlock => " BLOCK",
            _ => "",
        };
        match self.mode() {
            Mode::Normal | Mode::OpPending | Mode::CmdLine => String::new(),
            Mode::Insert => "-- INSERT --".into(),
            Mode::Replace => "-- REPLACE --".into(),
            Mode::Visual => format!("-- VISUAL{sub} --"),
            Mode::Select => format!("-- SELECT{sub} --"),
            Mode::InsertNormal => "-- (insert) --".into(),
            Mode::InsertVisual => format!("-- (insert) VISUAL{sub} --"),
            Mode::InsertSelect => format!("-- (insert) SELECT{sub} --"),
        }
    }

    /// Short mode code as returned by Vim's `mode(1)`.
    pub fn vim_notation(&self) -> &'static str {
        match (self.mode(), self.sub_mode()) {
            (Mode::Normal, _) => "n",
            (Mode::OpPending, _) => "no",
            (Mode::InsertNormal, _) => "niI",
            (Mode::Insert, _) => "i",
            (Mode::Replace, _) => "R",
            (Mode::CmdLine, _) => "c",
            (Mode::Visual | Mode::InsertVisual, SubMode::VisualLine) => "V",
            (Mode::Visual | Mode::InsertVisual, SubMode::VisualBlock) => "\x16",
            (Mode::Visual | Mode::InsertVisual, _) => "v",
            (Mode::Select | Mode::InsertSelect, SubMode::VisualLine) => "S",
            (Mode::Select | Mode::InsertSelect, SubMode::VisualBlock) => "\x13",
            (Mode::Select | Mode::InsertSelect, _) => "s",
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_is_never_popped() {
        let mut stack = ModeStack::new();
        assert_eq!(stack.pop(), None);
        assert_eq!(stack.depth(), 1);
        assert_eq!(stack.mode(), Mode::Normal);
    }

    #[test]
    fn test_visual_toggle_same_submode_exits() {
        let mut stack = ModeStack::new();
        assert_eq!(
            stack.toggle_visual(VisualKind::Visual, SubMode::VisualCharacter),
            VisualToggle::Entered
        );
        assert_eq!(
            stack.toggle_visual(VisualKind::Visual, SubMode::VisualCharacter),
            VisualToggle::Exited
        );
        assert_eq!(stack.depth(), 1);
    }

    #[test]
    fn test_visual_switches_submode_in_place() {
        let mut stack = ModeStack::new();
        stack.toggle_visual(VisualKind::Visual, SubMode::VisualCharacter);
        let depth = stack.depth();
        assert_eq!(
            stack.toggle_visual(VisualKind::Visual, SubMode::VisualLine),
            VisualToggle::Switched
        );
        assert_eq!(stack.depth(), depth);
        assert_eq!(stack.status_string(), "-- VISUAL LINE --");
    }

    #[test]
    fn test_visual_from_insert_normal_replaces_entry() {
        let mut stack = ModeStack::new();
        stack.push(Mode::Insert, SubMode::None);
        stack.push(Mode::InsertNormal, SubMode::None);
        stack.toggle_visual(VisualKind::Visual, SubMode::VisualCharacter);
        assert_eq!(stack.mode(), Mode::InsertVisual);
        assert_eq!(stack.depth(), 3);
        assert!(stack.exit_visual());
        assert_eq!(stack.mode(), Mode::Insert);
    }

    #[test]
    fn test_exit_visual_below_insert() {
        let mut stack = ModeStack::new();
        stack.toggle_visual(VisualKind::Visual, SubMode::VisualCharacter);
        stack.push(Mode::Insert, SubMode::None);
        assert!(stack.exit_visual());
        assert_eq!(stack.mode(), Mode::Insert);
        assert_eq!(stack.depth(), 2);
    }

    #[test]
    fn test_ctrl_g_swaps_visual_and_select() {
        let mut stack = ModeStack::new();
        stack.toggle_visual(VisualKind::Visual, SubMode::VisualLine);
        assert!(stack.toggle_visual_select());
        assert_eq!(stack.mode(), Mode::Select);
        assert_eq!(stack.vim_notation(), "S");
        assert!(stack.toggle_visual_select());
        assert_eq!(stack.vim_notation(), "V");
    }

    #[test]
    fn test_stack_balance_through_mixed_sequence() {
        let mut stack = ModeStack::new();
        let before: Vec<ModeState> = stack.states().to_vec();

        stack.toggle_visual(VisualKind::Visual, SubMode::VisualCharacter);
        stack.toggle_visual(VisualKind::Select, SubMode::VisualBlock);
        stack.exit_visual();
        stack.push(Mode::Insert, SubMode::None);
        stack.push(Mode::InsertNormal, SubMode::None);
        stack.toggle_visual(VisualKind::Visual, SubMode::VisualLine);
        stack.toggle_visual(VisualKind::Visual, SubMode::VisualLine);
        assert_eq!(stack.mode(), Mode::Insert);
        stack.pop();

        assert_eq!(stack.states(), before.as_slice());
    }

    #[test]
    fn test_notation_history_snapshot() {
        let mut stack = ModeStack::new();
        let mut seen = vec![stack.vim_notation()];
        stack.push(Mode::Insert, SubMode::None);
        seen.push(stack.vim_notation());
        stack.toggle_insert_replace();
        seen.push(stack.vim_notation());
        stack.toggle_insert_replace();
        stack.push(Mode::InsertNormal, SubMode::None);
        seen.push(stack.vim_notation());
        stack.toggle_visual(VisualKind::Select, SubMode::VisualCharacter);
        seen.push(stack.vim_notation());
        stack.exit_visual();
        seen.push(stack.vim_notation());
        stack.push(Mode::OpPending, SubMode::None);
        seen.push(stack.vim_notation());

        insta::assert_json_snapshot!(seen, @r#"
        [
          "n",
          "i",
          "R",
          "niI",
          "s",
          "i",
          "no"
        ]
        "#);
    }

    #[test]
    fn test_mapping_mode_letters() {
        assert_eq!(MappingModes::from_letters("").unwrap(), MappingModes::NVO);
        assert_eq!(
            MappingModes::from_letters("nx").unwrap(),
            MappingModes::NORMAL | MappingModes::VISUAL
        );
        assert!(MappingModes::from_letters("q").is_err());
    }
}
