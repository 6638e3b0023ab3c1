use crate::action::{ActionHandler, ActionRegistry, Capability};
use crate::error::{Error, Result};
use crate::key::{to_notation, KeyStroke};
use crate::keytrie::TrieMatch;
use crate::mode::MappingModes;
use crate::registers::Registers;
use bitflags::bitflags;
use std::fmt;
use std::rc::Rc;

/// Largest count a command can carry.
pub const MAX_COUNT: usize = 99_999_999;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct CommandFlags: u16 {
        /// Operator always works on whole lines.
        const MOT_LINEWISE = 1 << 0;
        const MOT_INCLUSIVE = 1 << 1;
        const MOT_EXCLUSIVE = 1 << 2;
        /// Leave visual/select once the command is done.
        const EXIT_VISUAL = 1 << 3;
        const KEEP_VISUAL = 1 << 4;
        /// Clear the shown pending keys.
        const CLEAR_STROKES = 1 << 5;
        /// Record the caret position in the jump list first.
        const SAVE_JUMP = 1 << 6;
        /// Stay in the single-command mode after this command.
        const EXPECT_MORE = 1 << 7;
        /// Writable but never the target of `.`.
        const NO_REPEAT = 1 << 8;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandType {
    Motion,
    Insert,
    Change,
    Delete,
    Copy,
    Paste,
    Readonly,
    Writable,
    Repeat,
}

impl CommandType {
    pub fn is_write(self) -> bool {
        matches!(
            self,
            CommandType::Insert
                | CommandType::Change
                | CommandType::Delete
                | CommandType::Paste
                | CommandType::Writable
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArgumentType {
    Motion,
    Character,
    ExString,
}

#[derive(Clone, Debug)]
pub enum Argument {
    Motion(Box<Command>),
    Character(char),
    ExString(String),
}

impl Argument {
    pub fn kind(&self) -> ArgumentType {
        match self {
            Argument::Motion(_) => ArgumentType::Motion,
            Argument::Character(_) => ArgumentType::Character,
            Argument::ExString(_) => ArgumentType::ExString,
        }
    }
}

// ── Command ─────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct Command {
    /// Count as typed; 0 when omitted.
    pub raw_count: usize,
    pub register: Option<char>,
    pub action: Rc<dyn ActionHandler>,
    pub argument: Option<Argument>,
    pub flags: CommandFlags,
    pub keys: Vec<KeyStroke>,
}

impl Command {
    pub fn new(action: Rc<dyn ActionHandler>, keys: Vec<KeyStroke>) -> Self {
        Self {
            raw_count: 0,
            register: None,
            flags: action.flags(),
            action,
            argument: None,
            keys,
        }
    }

    pub fn id(&self) -> &'static str {
        self.action.id()
    }

    pub fn count0(&self) -> usize {
        self.raw_count
    }

    pub fn count1(&self) -> usize {
        self.raw_count.max(1)
    }

    pub fn command_type(&self) -> CommandType {
        self.action.command_type()
    }

    pub fn is_write(&self) -> bool {
        self.command_type().is_write()
    }

    pub fn is_operator(&self) -> bool {
        matches!(self.action.capability(), Capability::Operator)
    }

    pub fn motion(&self) -> Option<&Command> {
        match &self.argument {
            Some(Argument::Motion(cmd)) => Some(cmd),
            _ => None,
        }
    }

    pub fn character(&self) -> Option<char> {
        match self.argument {
            Some(Argument::Character(c)) => Some(c),
            _ => None,
        }
    }

    pub fn ex_string(&self) -> Option<&str> {
        match &self.argument {
            Some(Argument::ExString(s)) => Some(s),
            _ => None,
        }
    }

    /// Attaches an argument, rejecting one the action does not take.
    pub fn attach(&mut self, arg: Argument) -> Result<()> {
        match self.action.argument_type() {
            Some(expected) if expected == arg.kind() => {
                self.argument = Some(arg);
                Ok(())
            }
            Some(expected) => Err(Error::build(format!(
                "{} expects a {expected:?} argument, got {:?}",
                self.id(),
                arg.kind()
            ))),
            None => Err(Error::build(format!("{} takes no argument", self.id()))),
        }
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("action", &self.id())
            .field("raw_count", &self.raw_count)
            .field("register", &self.register)
            .field("keys", &to_notation(&self.keys))
            .field("argument", &self.argument)
            .field("flags", &self.flags)
            .finish()
    }
}

// ── Builder ─────────────────────────────────────────────────────────────────

/// What the builder needs after an action key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BuildStep {
    /// The keys so far are a prefix of a longer action.
    Pending,
    Ready,
    NeedsArgument(ArgumentType),
}

/// Accumulates count, register, action keys and argument of one command.
#[derive(Default)]
pub struct CommandBuilder {
    raw_count: usize,
    register: Option<char>,
    register_pending: bool,
    keys: Vec<KeyStroke>,
    action: Option<Rc<dyn ActionHandler>>,
    argument: Option<Argument>,
    expected: Option<ArgumentType>,
    typed: Vec<KeyStroke>,
}

impl CommandBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Nothing typed for the current command yet.
    pub fn is_empty(&self) -> bool {
        self.typed.is_empty()
    }

    /// Keys typed towards the current command, for a showcmd area.
    pub fn typed_keys(&self) -> &[KeyStroke] {
        &self.typed
    }

    pub fn has_count(&self) -> bool {
        self.raw_count > 0
    }

    pub fn count(&self) -> usize {
        self.raw_count
    }

    /// Adds a count digit. A leading `0` is not a count and is refused.
    pub fn push_digit(&mut self, digit: u32) -> bool {
        if digit == 0 && self.raw_count == 0 {
            return false;
        }
        self.raw_count = self
            .raw_count
            .saturating_mul(10)
            .saturating_add(digit as usize)
            .min(MAX_COUNT);
        self.typed.push(KeyStroke::char(char::from_digit(digit, 10).unwrap_or('0')));
        true
    }

    /// `"` was typed: the next key names a register.
    pub fn start_register(&mut self) {
        self.register_pending = true;
        self.typed.push(KeyStroke::char('"'));
    }

    pub fn is_register_pending(&self) -> bool {
        self.register_pending
    }

    pub fn push_register_char(&mut self, c: char) -> Result<()> {
        self.register_pending = false;
        if !Registers::is_valid(c) {
            return Err(Error::InvalidRegister(c));
        }
        self.register = Some(c);
        self.typed.push(KeyStroke::char(c));
        Ok(())
    }

    pub fn register(&self) -> Option<char> {
        self.register
    }

    /// Part-way through a multi-key action such as `g_`.
    pub fn is_building_action(&self) -> bool {
        !self.keys.is_empty() && self.action.is_none()
    }

    pub fn expected_argument(&self) -> Option<ArgumentType> {
        if self.argument.is_none() {
            self.expected
        } else {
            None
        }
    }

    pub fn action(&self) -> Option<&Rc<dyn ActionHandler>> {
        self.action.as_ref()
    }

    /// Resolves one more action key against the registry. `operator` is the
    /// operator awaiting this command as its motion, if any.
    pub fn push_action_key(
        &mut self,
        key: KeyStroke,
        registry: &ActionRegistry,
        bucket: MappingModes,
        operator: Option<&Command>,
    ) -> Result<BuildStep> {
        if self.action.is_some() {
            return Err(Error::build("command already complete"));
        }
        self.keys.push(key);
        self.typed.push(key);

        if let Some(op) = operator {
            if Self::is_duplicate_operator(&self.keys, &op.keys) {
                let line = registry
                    .by_id(ActionRegistry::LINE_MOTION)
                    .ok_or_else(|| Error::build("no linewise motion registered"))?;
                return self.resolved(line, bucket);
            }
        }

        let found = match registry.lookup(bucket, &self.keys) {
            TrieMatch::Match(action) | TrieMatch::AmbiguousPrefix(Some(action)) => Rc::clone(action),
            TrieMatch::AmbiguousPrefix(None) => return Ok(BuildStep::Pending),
            TrieMatch::NoMatch => {
                let keys = to_notation(&self.keys);
                self.keys.clear();
                return Err(Error::build(format!("no command for {keys}")));
            }
        };
        self.resolved(found, bucket)
    }

    /// `dd`, `cc`, `>>`, `g~~`, `guu`: the operator's key again.
    fn is_duplicate_operator(keys: &[KeyStroke], op_keys: &[KeyStroke]) -> bool {
        if keys == op_keys {
            return true;
        }
        op_keys.len() > 1 && keys.len() == 1 && op_keys.last() == keys.first()
    }

    fn resolved(&mut self, action: Rc<dyn ActionHandler>, bucket: MappingModes) -> Result<BuildStep> {
        // An operator's argument must be something that yields a range.
        if bucket == MappingModes::OP_PENDING
            && !matches!(action.capability(), Capability::Motion(_) | Capability::TextObject)
        {
            let id = action.id();
            self.keys.clear();
            return Err(Error::build(format!("{id} is not a motion")));
        }
        self.expected = action.argument_type();
        self.action = Some(action);
        Ok(match self.expected {
            Some(t) => BuildStep::NeedsArgument(t),
            None => BuildStep::Ready,
        })
    }

    /// Drops the argument requirement, e.g. `q` that stops a recording.
    pub fn waive_argument(&mut self) {
        self.expected = None;
    }

    pub fn attach_argument(&mut self, arg: Argument) -> Result<()> {
        match self.expected {
            Some(t) if t == arg.kind() => {
                if let Argument::Character(c) = arg {
                    self.typed.push(KeyStroke::char(c));
                }
                self.argument = Some(arg);
                Ok(())
            }
            _ => Err(Error::build(format!("unexpected {:?} argument", arg.kind()))),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.action.is_some() && self.expected_argument().is_none()
    }

    /// Takes the finished command and resets the builder.
    pub fn build(&mut self) -> Result<Command> {
        if !self.is_ready() {
            return Err(Error::build("incomplete command"));
        }
        self.take()
    }

    /// Takes an operator that still waits for its motion.
    pub fn take_operator(&mut self) -> Result<Command> {
        match self.expected_argument() {
            Some(ArgumentType::Motion) => self.take(),
            _ => Err(Error::build("no operator pending")),
        }
    }

    fn take(&mut self) -> Result<Command> {
        let action = self
            .action
            .take()
            .ok_or_else(|| Error::build("no action"))?;
        let mut cmd = Command::new(action, std::mem::take(&mut self.keys));
        cmd.raw_count = self.raw_count;
        cmd.register = self.register;
        cmd.argument = self.argument.take();
        self.reset();
        Ok(cmd)
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::parse_keys;

    fn push_all(builder: &mut CommandBuilder, registry: &ActionRegistry, bucket: MappingModes, keys: &str) -> BuildStep {
        let mut step = BuildStep::Pending;
        for key in parse_keys(keys).unwrap() {
            step = builder.push_action_key(key, registry, bucket, None).unwrap();
        }
        step
    }

    #[test]
    fn test_count_and_register() {
        let registry = ActionRegistry::vim();
        let mut builder = CommandBuilder::new();
        assert!(!builder.push_digit(0));
        assert!(builder.push_digit(1));
        assert!(builder.push_digit(2));
        builder.start_register();
        builder.push_register_char('a').unwrap();
        assert_eq!(push_all(&mut builder, &registry, MappingModes::NORMAL, "x"), BuildStep::Ready);
        let cmd = builder.build().unwrap();
        assert_eq!(cmd.count0(), 12);
        assert_eq!(cmd.count1(), 12);
        assert_eq!(cmd.register, Some('a'));
        assert_eq!(cmd.id(), "DeleteCharacter");
        assert!(builder.is_empty());
    }

    #[test]
    fn test_default_count_is_one() {
        let registry = ActionRegistry::vim();
        let mut builder = CommandBuilder::new();
        push_all(&mut builder, &registry, MappingModes::NORMAL, "x");
        let cmd = builder.build().unwrap();
        assert_eq!(cmd.count0(), 0);
        assert_eq!(cmd.count1(), 1);
    }

    #[test]
    fn test_multi_key_action_is_pending() {
        let registry = ActionRegistry::vim();
        let mut builder = CommandBuilder::new();
        let g = KeyStroke::char('g');
        assert_eq!(
            builder.push_action_key(g, &registry, MappingModes::NORMAL, None).unwrap(),
            BuildStep::Pending
        );
        assert!(builder.is_building_action());
        assert_eq!(
            builder.push_action_key(g, &registry, MappingModes::NORMAL, None).unwrap(),
            BuildStep::Ready
        );
    }

    #[test]
    fn test_operator_needs_motion() {
        let registry = ActionRegistry::vim();
        let mut builder = CommandBuilder::new();
        assert_eq!(
            push_all(&mut builder, &registry, MappingModes::NORMAL, "d"),
            BuildStep::NeedsArgument(ArgumentType::Motion)
        );
        assert!(!builder.is_ready());
        assert!(builder.build().is_err());
        let op = builder.take_operator().unwrap();
        assert!(op.is_operator());
    }

    #[test]
    fn test_duplicate_operator_is_line_motion() {
        let registry = ActionRegistry::vim();
        let mut builder = CommandBuilder::new();
        push_all(&mut builder, &registry, MappingModes::NORMAL, "d");
        let op = builder.take_operator().unwrap();
        let step = builder
            .push_action_key(KeyStroke::char('d'), &registry, MappingModes::OP_PENDING, Some(&op))
            .unwrap();
        assert_eq!(step, BuildStep::Ready);
        assert_eq!(builder.build().unwrap().id(), ActionRegistry::LINE_MOTION);
    }

    #[test]
    fn test_non_motion_rejected_in_op_pending() {
        let registry = ActionRegistry::vim();
        let mut builder = CommandBuilder::new();
        let err = builder
            .push_action_key(KeyStroke::char('x'), &registry, MappingModes::OP_PENDING, None)
            .unwrap_err();
        assert!(matches!(err, Error::CommandBuild(_)));
    }

    #[test]
    fn test_character_argument() {
        let registry = ActionRegistry::vim();
        let mut builder = CommandBuilder::new();
        assert_eq!(
            push_all(&mut builder, &registry, MappingModes::NORMAL, "f"),
            BuildStep::NeedsArgument(ArgumentType::Character)
        );
        assert!(builder.attach_argument(Argument::ExString("x".into())).is_err());
        builder.attach_argument(Argument::Character('x')).unwrap();
        assert!(builder.is_ready());
        assert_eq!(builder.build().unwrap().character(), Some('x'));
    }

    #[test]
    fn test_attach_checks_argument_type() {
        let registry = ActionRegistry::vim();
        let mut builder = CommandBuilder::new();
        push_all(&mut builder, &registry, MappingModes::NORMAL, "x");
        let mut cmd = builder.build().unwrap();
        assert!(cmd.attach(Argument::Character('a')).is_err());
    }
}
