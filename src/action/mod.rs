//! Action handlers and the registry that binds them to key sequences.

mod commands;
mod defaults;
mod insert;
mod motions;
pub(crate) mod operators;
mod text_objects;
pub(crate) mod visual;

use crate::command::{ArgumentType, Command, CommandFlags, CommandType};
use crate::editor::Editor;
use crate::error::{Error, Result};
use crate::key::{parse_keys, KeyStroke};
use crate::keytrie::{buckets, KeyTrie, TrieMatch};
use crate::mode::{MappingModes, ModeStack};
use crate::options::Options;
use crate::range::{MotionType, TextRange};
use crate::registers::Registers;
use crate::state::EditState;
use std::collections::HashMap;
use std::rc::Rc;

pub use insert::type_key;
pub use operators::OperatorKind;

/// How a command is run when several carets exist.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatchStrategy {
    ForEachCaret,
    SingleExecution,
    /// Per caret when [`ActionHandler::run_for_each_caret`] says so.
    ConditionalMulticaret,
}

/// What an action produces when dispatched.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Capability {
    /// Moves the caret; as an operator argument yields an offset.
    Motion(MotionType),
    /// Yields a range around the caret.
    TextObject,
    /// Needs a motion argument and acts on the range it produces.
    Operator,
    Plain,
}

/// Work an action asks the session to do after it returns.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Effect {
    PlayMacro { register: char, count: usize },
    Repeat { raw_count: usize },
    FeedKeys { keys: Vec<KeyStroke>, remap: bool },
}

/// Everything a handler may touch while it runs.
pub struct ActionContext<'a> {
    pub editor: &'a mut dyn Editor,
    pub modes: &'a mut ModeStack,
    pub registers: &'a mut Registers,
    pub state: &'a mut EditState,
    pub options: &'a Options,
}

pub trait ActionHandler {
    fn id(&self) -> &'static str;

    fn command_type(&self) -> CommandType;

    fn capability(&self) -> Capability {
        Capability::Plain
    }

    fn argument_type(&self) -> Option<ArgumentType> {
        None
    }

    fn flags(&self) -> CommandFlags {
        CommandFlags::empty()
    }

    fn strategy(&self) -> DispatchStrategy {
        DispatchStrategy::ForEachCaret
    }

    fn run_for_each_caret(&self, _cx: &ActionContext<'_>) -> bool {
        true
    }

    /// Motion type decided at run time, e.g. `;` after `F`.
    fn dynamic_motion_type(&self, _state: &EditState) -> Option<MotionType> {
        None
    }

    /// Target offset of a motion from `caret`, or `None` when it fails.
    fn motion(&self, _cx: &mut ActionContext<'_>, _caret: usize, _cmd: &Command) -> Option<usize> {
        None
    }

    fn text_object(&self, _cx: &mut ActionContext<'_>, _caret: usize, _cmd: &Command) -> Option<TextRange> {
        None
    }

    /// Applies an operator to a resolved range.
    fn operate(&self, _cx: &mut ActionContext<'_>, _caret: usize, _range: &TextRange, _cmd: &Command) -> Result<()> {
        Err(Error::NotImplemented(self.id()))
    }

    /// Runs a plain command. `caret` is `None` for a single execution.
    fn execute(&self, _cx: &mut ActionContext<'_>, _caret: Option<usize>, _cmd: &Command) -> Result<()> {
        Err(Error::NotImplemented(self.id()))
    }
}

/// Handler bound to a mapping rather than to a built-in command.
pub trait ExtensionHandler {
    fn id(&self) -> &'static str;

    fn execute(&self, cx: &mut ActionContext<'_>) -> Result<()>;

    /// Whether `.` should call this handler again.
    fn is_repeatable(&self) -> bool {
        false
    }
}

/// Backs the `g@` operator.
pub trait OperatorFunction {
    fn apply(&self, cx: &mut ActionContext<'_>, range: &TextRange) -> Result<()>;
}

/// Executes a line entered after `:`.
pub trait ExHandler {
    fn execute(&self, cx: &mut ActionContext<'_>, line: &str) -> Result<()>;
}

// ── Registry ────────────────────────────────────────────────────────────────

/// Built-in commands per mode bucket.
#[derive(Default)]
pub struct ActionRegistry {
    tries: HashMap<MappingModes, KeyTrie<Rc<dyn ActionHandler>>>,
    by_id: HashMap<&'static str, Rc<dyn ActionHandler>>,
}

impl ActionRegistry {
    /// Motion used for a doubled operator (`dd`, `cc`, `>>`).
    pub const LINE_MOTION: &'static str = "MotionDownLess1FirstNonBlank";

    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the default Vim command set.
    pub fn vim() -> Self {
        let mut registry = Self::new();
        defaults::register_all(&mut registry);
        registry
    }

    pub fn register(&mut self, modes: MappingModes, keys: &str, handler: Rc<dyn ActionHandler>) {
        let keys = match parse_keys(keys) {
            Ok(keys) if !keys.is_empty() => keys,
            _ => {
                crate::log::entry(crate::log::Level::Warn, "action_bad_keys", &keys);
                return;
            }
        };
        for bucket in buckets(modes) {
            self.tries
                .entry(bucket)
                .or_default()
                .insert(&keys, Rc::clone(&handler));
        }
        self.by_id.entry(handler.id()).or_insert(handler);
    }

    pub fn by_id(&self, id: &str) -> Option<Rc<dyn ActionHandler>> {
        self.by_id.get(id).cloned()
    }

    pub fn lookup(&self, bucket: MappingModes, keys: &[KeyStroke]) -> TrieMatch<'_, Rc<dyn ActionHandler>> {
        match self.tries.get(&bucket) {
            Some(trie) => trie.lookup(keys),
            None => TrieMatch::NoMatch,
        }
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

/// Runs `f` once per caret, in document order.
pub(crate) fn each_caret(
    cx: &mut ActionContext<'_>,
    caret: Option<usize>,
    mut f: impl FnMut(&mut ActionContext<'_>, usize) -> Result<()>,
) -> Result<()> {
    match caret {
        Some(idx) => f(cx, idx),
        None => {
            for idx in 0..cx.editor.caret_count() {
                f(cx, idx)?;
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_bind_by_mode() {
        let registry = ActionRegistry::vim();
        let d = parse_keys("d").unwrap();
        let TrieMatch::Match(normal_d) = registry.lookup(MappingModes::NORMAL, &d) else {
            panic!("d not bound in normal mode");
        };
        assert_eq!(normal_d.capability(), Capability::Operator);
        let TrieMatch::Match(visual_d) = registry.lookup(MappingModes::VISUAL, &d) else {
            panic!("d not bound in visual mode");
        };
        assert_eq!(visual_d.capability(), Capability::Plain);
        assert!(visual_d.flags().contains(CommandFlags::EXIT_VISUAL));
        assert!(matches!(registry.lookup(MappingModes::OP_PENDING, &d), TrieMatch::NoMatch));
    }

    #[test]
    fn test_text_objects_only_in_visual_and_op_pending() {
        let registry = ActionRegistry::vim();
        let iw = parse_keys("iw").unwrap();
        assert!(matches!(registry.lookup(MappingModes::OP_PENDING, &iw), TrieMatch::Match(_)));
        assert!(matches!(registry.lookup(MappingModes::VISUAL, &iw), TrieMatch::Match(_)));
        assert!(matches!(registry.lookup(MappingModes::NORMAL, &iw), TrieMatch::NoMatch));
    }

    #[test]
    fn test_line_motion_registered() {
        let registry = ActionRegistry::vim();
        let line = registry.by_id(ActionRegistry::LINE_MOTION).unwrap();
        assert_eq!(line.capability(), Capability::Motion(MotionType::LineWise));
    }
}
