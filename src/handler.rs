//! Per-surface key handling: mapping expansion, command building, dispatch.

use crate::action::visual::{leave_visual, selection_range, type_over_selection, VisualExtent};
use crate::action::{
    each_caret, type_key, ActionContext, ActionRegistry, Capability, DispatchStrategy, Effect, ExHandler,
    ExtensionHandler, OperatorFunction,
};
use crate::command::{Argument, ArgumentType, BuildStep, Command, CommandBuilder, CommandFlags};
use crate::editor::Editor;
use crate::error::{Error, Result};
use crate::key::{parse_keys, to_notation, KeyStroke};
use crate::keytrie::{KeyMappings, MappingEntry, MappingTarget, TrieMatch};
use crate::log::{self, Level};
use crate::mode::{MappingModes, Mode, ModeStack, SubMode};
use crate::operator::OperatorComposer;
use crate::options::Options;
use crate::registers::{Registers, LAST_COMMAND_REGISTER, LAST_INSERTED_REGISTER};
use crate::search::Searcher;
use crate::state::{CmdLine, CmdLineKind, EditState};
use crate::text::{clamp_normal, prev_char_boundary};
use crossterm::event::{KeyCode, KeyModifiers};
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

/// Nested macro playback deeper than this fails.
const MAX_MACRO_DEPTH: usize = 1000;

pub const USER_OWNER: &str = "user";

/// Ticket for a buffered ambiguous prefix. The host calls
/// [`InputSession::on_timeout`] with `generation` once `after` has passed;
/// a ticket whose generation is stale does nothing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MappingTimeout {
    pub generation: u64,
    pub after: Duration,
}

#[derive(Clone, Copy, Debug)]
struct PendingKey {
    key: KeyStroke,
    /// Whether mappings still apply to this key.
    remap: bool,
    map_depth: usize,
    macro_depth: usize,
}

impl PendingKey {
    fn typed(key: KeyStroke) -> Self {
        Self {
            key,
            remap: true,
            map_depth: 0,
            macro_depth: 0,
        }
    }
}

/// An entry of the pending-key queue.
#[derive(Clone, Debug)]
enum Queued {
    Key(PendingKey),
    /// Remaining laps of a counted macro, expanded one lap at a time.
    MacroLaps {
        keys: Rc<[KeyStroke]>,
        remaining: usize,
        depth: usize,
    },
}

impl Queued {
    fn map_depth(&self) -> usize {
        match self {
            Queued::Key(p) => p.map_depth,
            Queued::MacroLaps { .. } => 0,
        }
    }

    fn macro_depth(&self) -> usize {
        match self {
            Queued::Key(p) => p.macro_depth,
            Queued::MacroLaps { depth, .. } => *depth,
        }
    }
}

enum MappingLookup {
    Prefix,
    Complete(Rc<MappingEntry>),
    None,
}

#[derive(Default)]
struct DotRepeat {
    command: Option<Command>,
    /// Keys typed in the insert session the command opened.
    inserted: Vec<KeyStroke>,
    /// Set when the command consumed a visual selection.
    visual: Option<VisualExtent>,
    extension: Option<Rc<dyn ExtensionHandler>>,
}

/// What handlers get to touch, split out so a context can borrow it while
/// the session keeps its builder and queue.
struct Surface {
    modes: ModeStack,
    registers: Registers,
    state: EditState,
    options: Options,
}

impl Surface {
    fn context<'a>(&'a mut self, editor: &'a mut dyn Editor) -> ActionContext<'a> {
        ActionContext {
            editor,
            modes: &mut self.modes,
            registers: &mut self.registers,
            state: &mut self.state,
            options: &self.options,
        }
    }
}

/// Modal key interpreter for one editing surface.
pub struct InputSession {
    registry: Rc<ActionRegistry>,
    mappings: KeyMappings,
    surface: Surface,
    builder: CommandBuilder,
    composer: OperatorComposer,
    queue: VecDeque<Queued>,
    map_buffer: Vec<PendingKey>,
    generation: u64,
    dot: DotRepeat,
    insert_capture: Option<Vec<KeyStroke>>,
    repeating: bool,
    /// Selection size `.` applies the repeated command to.
    repeat_extent: Option<VisualExtent>,
    /// Mode stack depth when the current command began.
    command_start: usize,
    macro_depth: usize,
    strokes: Vec<KeyStroke>,
    ex_handler: Option<Rc<dyn ExHandler>>,
    last_error: Option<Error>,
}

impl Default for InputSession {
    fn default() -> Self {
        Self::new()
    }
}

impl InputSession {
    pub fn new() -> Self {
        Self::with_registry(Rc::new(ActionRegistry::vim()))
    }

    pub fn with_registry(registry: Rc<ActionRegistry>) -> Self {
        Self {
            registry,
            mappings: KeyMappings::new(),
            surface: Surface {
                modes: ModeStack::new(),
                registers: Registers::new(),
                state: EditState::default(),
                options: Options::new(),
            },
            builder: CommandBuilder::new(),
            composer: OperatorComposer::new(),
            queue: VecDeque::new(),
            map_buffer: Vec::new(),
            generation: 0,
            dot: DotRepeat::default(),
            insert_capture: None,
            repeating: false,
            repeat_extent: None,
            command_start: 1,
            macro_depth: 0,
            strokes: Vec::new(),
            ex_handler: None,
            last_error: None,
        }
    }

    // ── Input ───────────────────────────────────────────────────────────

    /// Processes one typed key. Returns a timeout ticket while an ambiguous
    /// mapping prefix is buffered.
    pub fn handle_key(&mut self, editor: &mut dyn Editor, key: KeyStroke) -> Option<MappingTimeout> {
        let recording = self.surface.registers.is_recording();
        self.queue.push_back(Queued::Key(PendingKey::typed(key)));
        self.drain(editor);
        // Keys that start or stop a recording are not part of it.
        if recording && self.surface.registers.is_recording() {
            self.surface.registers.record_key(key);
        }
        self.pending_timeout()
    }

    /// Types a whole key-notation string, e.g. `"d2w"` or `"ifoo<Esc>"`.
    pub fn feed_keys(&mut self, editor: &mut dyn Editor, notation: &str) -> Result<Option<MappingTimeout>> {
        let mut timeout = None;
        for key in parse_keys(notation)? {
            timeout = self.handle_key(editor, key);
        }
        Ok(timeout)
    }

    /// Resolves a buffered prefix after the mapping timeout.
    pub fn on_timeout(&mut self, editor: &mut dyn Editor, generation: u64) -> Option<MappingTimeout> {
        if generation != self.generation || self.map_buffer.is_empty() {
            return self.pending_timeout();
        }
        let buffered = std::mem::take(&mut self.map_buffer);
        self.generation += 1;
        let bucket = self.surface.modes.mapping_mode();
        let keys: Vec<KeyStroke> = buffered.iter().map(|p| p.key).collect();
        let longest = (1..=keys.len())
            .rev()
            .find_map(|n| self.mappings.get(bucket, &keys[..n]).map(|e| (n, Rc::clone(e))));
        match longest {
            Some((n, entry)) => {
                for pending in buffered[n..].iter().rev() {
                    self.queue.push_front(Queued::Key(*pending));
                }
                if let Err(err) = self.run_mapping(editor, &entry, buffered[0]) {
                    self.fail(editor, err);
                }
            }
            None => self.replay(editor, buffered),
        }
        self.drain(editor);
        self.pending_timeout()
    }

    fn pending_timeout(&self) -> Option<MappingTimeout> {
        if self.map_buffer.is_empty() || !self.surface.options.timeout() {
            return None;
        }
        Some(MappingTimeout {
            generation: self.generation,
            after: self.surface.options.timeoutlen(),
        })
    }

    fn drain(&mut self, editor: &mut dyn Editor) {
        while let Some(next) = self.queue.pop_front() {
            match next {
                Queued::Key(pending) => self.process(editor, pending),
                Queued::MacroLaps { keys, remaining, depth } => self.queue_macro_lap(keys, remaining, depth),
            }
        }
    }

    fn process(&mut self, editor: &mut dyn Editor, pending: PendingKey) {
        self.macro_depth = pending.macro_depth;
        if pending.key.is_escape() && !self.map_buffer.is_empty() {
            self.map_buffer.clear();
            self.generation += 1;
        }
        if pending.remap && self.accepts_mappings() {
            if let Err(err) = self.lookup_mapping(editor, pending) {
                self.fail(editor, err);
            }
            return;
        }
        self.feed_unmapped(editor, pending.key);
    }

    /// Character arguments and register names are never mapped.
    fn accepts_mappings(&self) -> bool {
        self.builder.expected_argument() != Some(ArgumentType::Character) && !self.builder.is_register_pending()
    }

    // ── Mappings ────────────────────────────────────────────────────────

    fn lookup_mapping(&mut self, editor: &mut dyn Editor, pending: PendingKey) -> Result<()> {
        let bucket = self.surface.modes.mapping_mode();
        if self.map_buffer.is_empty() && !self.mappings.has_mappings(bucket) {
            self.feed_unmapped(editor, pending.key);
            return Ok(());
        }
        let mut keys: Vec<KeyStroke> = self.map_buffer.iter().map(|p| p.key).collect();
        keys.push(pending.key);
        let found = match self.mappings.lookup(bucket, &keys) {
            TrieMatch::AmbiguousPrefix(_) => MappingLookup::Prefix,
            TrieMatch::Match(entry) => MappingLookup::Complete(Rc::clone(entry)),
            TrieMatch::NoMatch => MappingLookup::None,
        };
        match found {
            MappingLookup::Prefix => {
                self.map_buffer.push(pending);
                self.generation += 1;
                Ok(())
            }
            MappingLookup::Complete(entry) => {
                let origin = self.map_buffer.first().copied().unwrap_or(pending);
                self.map_buffer.clear();
                self.generation += 1;
                self.run_mapping(editor, &entry, origin)
            }
            MappingLookup::None if self.map_buffer.is_empty() => {
                self.feed_unmapped(editor, pending.key);
                Ok(())
            }
            MappingLookup::None => {
                let buffered = std::mem::take(&mut self.map_buffer);
                self.generation += 1;
                self.queue.push_front(Queued::Key(pending));
                let prefix: Vec<KeyStroke> = buffered.iter().map(|p| p.key).collect();
                if let Some(entry) = self.mappings.get(bucket, &prefix).cloned() {
                    return self.run_mapping(editor, &entry, buffered[0]);
                }
                self.replay(editor, buffered);
                Ok(())
            }
        }
    }

    /// The first buffered key is taken literally; the rest are looked up again.
    fn replay(&mut self, editor: &mut dyn Editor, buffered: Vec<PendingKey>) {
        let mut keys = buffered.into_iter();
        let Some(first) = keys.next() else {
            return;
        };
        for pending in keys.rev() {
            self.queue.push_front(Queued::Key(pending));
        }
        self.feed_unmapped(editor, first.key);
    }

    fn run_mapping(&mut self, editor: &mut dyn Editor, entry: &MappingEntry, origin: PendingKey) -> Result<()> {
        let depth = origin.map_depth + 1;
        if depth > self.surface.options.maxmapdepth() {
            self.queue.retain(|q| q.map_depth() == 0);
            return Err(Error::MappingRecursion { depth });
        }
        match &entry.target {
            MappingTarget::Keys(keys) => {
                // `map a ab`: the leading lhs is not expanded again.
                let literal = if entry.recursive && keys.starts_with(&entry.from) {
                    entry.from.len()
                } else {
                    0
                };
                for (i, &key) in keys.iter().enumerate().rev() {
                    self.queue.push_front(Queued::Key(PendingKey {
                        key,
                        remap: entry.recursive && i >= literal,
                        map_depth: depth,
                        macro_depth: origin.macro_depth,
                    }));
                }
                Ok(())
            }
            MappingTarget::Handler(handler) => {
                let handler = Rc::clone(handler);
                if editor.is_writable() && !self.repeating {
                    editor.checkpoint();
                }
                let mut cx = self.surface.context(editor);
                handler.execute(&mut cx)?;
                if handler.is_repeatable() {
                    self.dot.extension = Some(handler);
                    self.surface.state.repeat_handler = true;
                }
                Ok(())
            }
        }
    }

    // ── Command building ────────────────────────────────────────────────

    fn feed_unmapped(&mut self, editor: &mut dyn Editor, key: KeyStroke) {
        if self.builder.is_empty() && !self.composer.is_awaiting() {
            self.command_start = self.surface.modes.depth();
            self.strokes.clear();
        }
        if self.surface.modes.in_insert() {
            if let Some(capture) = self.insert_capture.as_mut() {
                capture.push(key);
            }
        } else {
            self.strokes.push(key);
        }
        if let Err(err) = self.feed(editor, key) {
            self.fail(editor, err);
        }
        self.finish_insert_capture();
    }

    fn feed(&mut self, editor: &mut dyn Editor, key: KeyStroke) -> Result<()> {
        if self.surface.modes.in_cmd_line() {
            return self.cmdline_key(editor, key);
        }
        let in_insert = self.surface.modes.in_insert();
        let in_select = self.surface.modes.in_select();
        if key.is_escape() && (!in_insert || !self.builder.is_empty()) {
            self.escape(editor);
            return Ok(());
        }

        if self.builder.expected_argument() == Some(ArgumentType::Character) {
            let c = key
                .as_char()
                .or_else(|| key.is_enter().then_some('\n'))
                .ok_or_else(|| Error::build(format!("{key} is not a character")))?;
            self.builder.attach_argument(Argument::Character(c))?;
            return self.dispatch_ready(editor);
        }
        if self.builder.is_register_pending() {
            let c = key
                .as_char()
                .ok_or_else(|| Error::build(format!("{key} is not a register name")))?;
            return self.builder.push_register_char(c);
        }
        if !in_insert && !in_select && !self.builder.is_building_action() {
            if let Some(digit) = key.digit() {
                if self.builder.push_digit(digit) {
                    return Ok(());
                }
            }
            if key.as_char() == Some('"') && !self.composer.is_awaiting() {
                self.builder.start_register();
                return Ok(());
            }
        }

        let fresh = self.builder.is_empty();
        let bucket = self.surface.modes.mapping_mode();
        let step = match self
            .builder
            .push_action_key(key, &self.registry, bucket, self.composer.operator())
        {
            Ok(step) => step,
            Err(_) if fresh && in_insert => {
                self.builder.reset();
                type_key(editor, &self.surface.modes, key);
                return Ok(());
            }
            Err(_) if fresh && in_select && key.as_char().is_some() => {
                self.builder.reset();
                let mut cx = self.surface.context(editor);
                return type_over_selection(&mut cx, key);
            }
            Err(err) => return Err(err),
        };

        match step {
            BuildStep::Pending => Ok(()),
            BuildStep::NeedsArgument(ArgumentType::Motion) => {
                let operator = self.builder.take_operator()?;
                self.composer.begin(operator, &mut self.surface.modes);
                Ok(())
            }
            BuildStep::NeedsArgument(ArgumentType::Character) => {
                let stops_recording = self.surface.registers.is_recording()
                    && self.builder.action().is_some_and(|a| a.id() == "ToggleRecording");
                if stops_recording {
                    self.builder.waive_argument();
                    return self.dispatch_ready(editor);
                }
                Ok(())
            }
            BuildStep::NeedsArgument(ArgumentType::ExString) => {
                let forward = key.as_char() != Some('?');
                self.surface.modes.push(Mode::CmdLine, SubMode::None);
                self.surface.state.cmdline = Some(CmdLine {
                    kind: CmdLineKind::Search { forward },
                    text: String::new(),
                });
                Ok(())
            }
            BuildStep::Ready => self.dispatch_ready(editor),
        }
    }

    fn dispatch_ready(&mut self, editor: &mut dyn Editor) -> Result<()> {
        let cmd = self.builder.build()?;
        let cmd = if self.composer.is_awaiting() {
            self.composer.complete(cmd, &mut self.surface.modes)?
        } else {
            cmd
        };
        self.execute(editor, cmd)
    }

    fn escape(&mut self, editor: &mut dyn Editor) {
        if !self.builder.is_empty() || self.composer.is_awaiting() {
            self.builder.reset();
            self.composer.cancel(&mut self.surface.modes);
            self.surface.registers.reset_selection();
            if self.surface.modes.mode() == Mode::InsertNormal {
                self.surface.modes.pop();
            }
            return;
        }
        let modes = &mut self.surface.modes;
        if modes.mode().is_visual_family() {
            leave_visual(editor, modes, &mut self.surface.state);
        } else if modes.mode() == Mode::InsertNormal {
            modes.pop();
        }
    }

    // ── Command line ────────────────────────────────────────────────────

    fn leave_cmdline(&mut self) {
        if self.surface.modes.in_cmd_line() {
            self.surface.modes.pop();
        }
        self.surface.state.cmdline = None;
    }

    fn cmdline_key(&mut self, editor: &mut dyn Editor, key: KeyStroke) -> Result<()> {
        let empty = self
            .surface
            .state
            .cmdline
            .as_ref()
            .is_none_or(|line| line.text.is_empty());
        if key.is_escape() || (key.code == KeyCode::Backspace && empty) {
            self.leave_cmdline();
            self.builder.reset();
            self.composer.cancel(&mut self.surface.modes);
            return Ok(());
        }
        if key.is_enter() {
            let line = self.surface.state.cmdline.take();
            self.leave_cmdline();
            let Some(CmdLine { kind, text }) = line else {
                return Ok(());
            };
            return match kind {
                CmdLineKind::Ex => self.run_ex(editor, &text),
                CmdLineKind::Search { .. } => {
                    self.builder.attach_argument(Argument::ExString(text))?;
                    self.dispatch_ready(editor)
                }
            };
        }
        let Some(line) = self.surface.state.cmdline.as_mut() else {
            self.leave_cmdline();
            return Ok(());
        };
        match key.code {
            KeyCode::Backspace => {
                line.text.pop();
            }
            KeyCode::Char('u') if key.modifiers == KeyModifiers::CONTROL => line.text.clear(),
            _ => {
                if let Some(c) = key.as_char() {
                    line.text.push(c);
                }
            }
        }
        Ok(())
    }

    fn run_ex(&mut self, editor: &mut dyn Editor, line: &str) -> Result<()> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(());
        }
        self.surface.registers.set_readonly(LAST_COMMAND_REGISTER, line);
        let handler = self
            .ex_handler
            .clone()
            .ok_or(Error::NotImplemented("ex commands"))?;
        let mut cx = self.surface.context(editor);
        handler.execute(&mut cx, line)
    }

    // ── Dispatch ────────────────────────────────────────────────────────

    fn execute(&mut self, editor: &mut dyn Editor, cmd: Command) -> Result<()> {
        log::entry(Level::Debug, "dispatch", &cmd.id());
        if cmd.is_write() && !editor.is_writable() {
            return Err(Error::ReadOnly);
        }
        let mode = self.surface.modes.mode();
        let from_insert = self.surface.modes.in_insert();
        let from_visual = mode.is_visual_family();
        let was_single = mode == Mode::InsertNormal;
        if cmd.is_write() && !self.repeating && !from_insert {
            editor.checkpoint();
        }
        if let Some(register) = cmd.register {
            self.surface.registers.select(register)?;
        }
        self.capture_selection(editor);
        let extent = if from_visual {
            let sub_mode = self.surface.modes.sub_mode();
            let to_line_end = self.surface.state.block_to_line_end;
            self.surface
                .state
                .visual_range(0)
                .map(|range| VisualExtent::capture(&*editor, sub_mode, range, to_line_end))
        } else {
            None
        };
        let jump_from = editor.caret(0);

        let result = self.dispatch(editor, &cmd);
        self.surface.registers.reset_selection();
        self.surface.state.visual_ranges.clear();
        result?;

        let flags = cmd.flags;
        if flags.contains(CommandFlags::EXIT_VISUAL) && !flags.contains(CommandFlags::KEEP_VISUAL) {
            leave_visual(editor, &mut self.surface.modes, &mut self.surface.state);
        }
        if flags.contains(CommandFlags::SAVE_JUMP) {
            self.surface.state.push_jump(jump_from);
        }
        if flags.contains(CommandFlags::CLEAR_STROKES) {
            self.strokes.clear();
        }
        if was_single
            && self.surface.modes.mode() == Mode::InsertNormal
            && !flags.contains(CommandFlags::EXPECT_MORE)
        {
            self.surface.modes.pop();
        }

        if cmd.is_write() && !self.repeating && !from_insert && !flags.contains(CommandFlags::NO_REPEAT) {
            self.dot.command = Some(cmd.clone());
            self.dot.visual = extent;
            self.dot.inserted.clear();
            self.surface.state.repeat_handler = false;
            self.insert_capture = self.surface.modes.in_insert().then(Vec::new);
        }

        if !self.surface.modes.is_end_allowed() {
            for idx in 0..editor.caret_count() {
                let pos = clamp_normal(editor.text(), editor.caret(idx));
                editor.set_caret(idx, pos);
            }
        }

        let effects = std::mem::take(&mut self.surface.state.effects);
        for effect in effects {
            self.run_effect(editor, effect)?;
        }
        editor.merge_carets();
        Ok(())
    }

    /// Selections are resolved before the handler runs; it may move carets.
    fn capture_selection(&mut self, editor: &dyn Editor) {
        let modes = &self.surface.modes;
        let ranges = if modes.mode().is_visual_family() {
            let sub_mode = modes.sub_mode();
            let to_line_end = self.surface.state.block_to_line_end;
            (0..editor.caret_count())
                .map(|idx| selection_range(editor, idx, sub_mode, &self.surface.options, to_line_end))
                .collect()
        } else if let Some(extent) = self.repeat_extent {
            (0..editor.caret_count())
                .map(|idx| Some(extent.range_at(editor, editor.caret(idx))))
                .collect()
        } else {
            Vec::new()
        };
        self.surface.state.visual_ranges = ranges;
    }

    fn dispatch(&mut self, editor: &mut dyn Editor, cmd: &Command) -> Result<()> {
        let mut cx = self.surface.context(editor);
        let per_caret = match cmd.action.strategy() {
            DispatchStrategy::ForEachCaret => true,
            DispatchStrategy::SingleExecution => false,
            DispatchStrategy::ConditionalMulticaret => cmd.action.run_for_each_caret(&cx),
        };
        if !per_caret {
            return run_one(&mut cx, None, cmd);
        }
        for idx in 0..cx.editor.caret_count() {
            run_one(&mut cx, Some(idx), cmd)?;
        }
        Ok(())
    }

    fn run_effect(&mut self, editor: &mut dyn Editor, effect: Effect) -> Result<()> {
        match effect {
            Effect::PlayMacro { register, count } => self.play_macro(register, count),
            Effect::Repeat { raw_count } => self.repeat(editor, raw_count),
            Effect::FeedKeys { keys, remap } => {
                for key in keys.into_iter().rev() {
                    self.queue.push_front(Queued::Key(PendingKey {
                        key,
                        remap,
                        map_depth: 0,
                        macro_depth: self.macro_depth,
                    }));
                }
                Ok(())
            }
        }
    }

    fn play_macro(&mut self, register: char, count: usize) -> Result<()> {
        let depth = self.macro_depth + 1;
        if depth > MAX_MACRO_DEPTH {
            self.drop_macro_keys();
            return Err(Error::MacroRecursion { depth });
        }
        let keys: Rc<[KeyStroke]> = self.surface.registers.playback_keys(register)?.into();
        self.queue_macro_lap(keys, count.max(1), depth);
        Ok(())
    }

    /// Queues one lap of the macro, followed by the laps still to come.
    fn queue_macro_lap(&mut self, keys: Rc<[KeyStroke]>, remaining: usize, depth: usize) {
        if remaining == 0 {
            return;
        }
        if remaining > 1 {
            self.queue.push_front(Queued::MacroLaps {
                keys: Rc::clone(&keys),
                remaining: remaining - 1,
                depth,
            });
        }
        for &key in keys.iter().rev() {
            self.queue.push_front(Queued::Key(PendingKey {
                key,
                remap: true,
                map_depth: 0,
                macro_depth: depth,
            }));
        }
    }

    fn drop_macro_keys(&mut self) {
        self.queue.retain(|q| q.macro_depth() == 0);
    }

    fn repeat(&mut self, editor: &mut dyn Editor, raw_count: usize) -> Result<()> {
        if self.surface.state.repeat_handler {
            if let Some(handler) = self.dot.extension.clone() {
                editor.checkpoint();
                let mut cx = self.surface.context(editor);
                return handler.execute(&mut cx);
            }
        }
        let Some(mut cmd) = self.dot.command.clone() else {
            return Ok(());
        };
        if raw_count > 0 {
            cmd.raw_count = raw_count;
            if let Some(Argument::Motion(motion)) = cmd.argument.as_mut() {
                motion.raw_count = 0;
            }
        }
        // `"1p...` walks through the numbered registers.
        if let Some(r) = cmd.register.filter(|r| ('1'..='8').contains(r)) {
            cmd.register = Some((r as u8 + 1) as char);
        }
        self.dot.command = Some(cmd.clone());

        let saved_find = self.surface.state.last_find;
        let inserted = self.dot.inserted.clone();
        self.repeating = true;
        self.repeat_extent = self.dot.visual;
        let mut result = self.execute(editor, cmd);
        self.repeat_extent = None;
        if result.is_ok() && self.surface.modes.in_insert() {
            for key in inserted {
                result = self.feed(editor, key);
                if result.is_err() {
                    break;
                }
            }
            if result.is_ok() && self.surface.modes.in_insert() {
                result = self.feed(editor, KeyStroke::esc());
            }
        }
        self.repeating = false;
        self.surface.state.last_find = saved_find;
        self.surface.registers.reset_selection();
        result
    }

    fn finish_insert_capture(&mut self) {
        let modes = &self.surface.modes;
        if self.repeating || modes.in_insert() || modes.in_single_command() {
            return;
        }
        let Some(mut keys) = self.insert_capture.take() else {
            return;
        };
        // The key that left insert mode.
        keys.pop();
        let text: String = keys.iter().filter_map(|k| k.as_char()).collect();
        self.surface.registers.set_readonly(LAST_INSERTED_REGISTER, &text);
        self.dot.inserted = keys;
    }

    // ── Errors and resets ───────────────────────────────────────────────

    fn fail(&mut self, editor: &mut dyn Editor, err: Error) {
        if self.macro_depth > 0 {
            self.drop_macro_keys();
        }
        let level = match err {
            Error::MappingRecursion { .. } | Error::MacroRecursion { .. } => Level::Warn,
            _ if err.is_soft() => Level::Info,
            _ => Level::Error,
        };
        log::entry(level, "command_failed", &err.to_string());
        if err.is_soft() {
            self.cancel_command();
        } else {
            self.full_reset(editor);
        }
        self.last_error = Some(err);
    }

    /// Drops the in-progress command and restores the mode it began in.
    /// A `<C-o>` command is used up even when it fails.
    fn cancel_command(&mut self) {
        self.reset();
        self.surface.modes.unwind_to(self.command_start);
        if self.surface.modes.mode() == Mode::InsertNormal {
            self.surface.modes.pop();
        }
    }

    /// Clears the command being built, any pending operator and the
    /// selected register. The mode stack is left alone apart from
    /// OP_PENDING and the command line.
    pub fn reset(&mut self) {
        self.builder.reset();
        self.composer.cancel(&mut self.surface.modes);
        self.leave_cmdline();
        self.surface.registers.reset_selection();
        self.surface.state.reset();
    }

    /// [`reset`](Self::reset), plus the mapping buffer, the pending queue
    /// and the mode stack, which goes back to NORMAL.
    pub fn full_reset(&mut self, editor: &mut dyn Editor) {
        self.reset();
        self.map_buffer.clear();
        self.queue.clear();
        self.generation += 1;
        self.insert_capture = None;
        self.surface.modes.reset();
        for idx in 0..editor.caret_count() {
            editor.set_anchor(idx, None);
        }
    }

    // ── Configuration ───────────────────────────────────────────────────

    pub fn add_mapping(&mut self, modes: MappingModes, from: &str, to: &str, recursive: bool) -> Result<()> {
        self.add_owned_mapping(USER_OWNER, modes, from, to, recursive)
    }

    pub fn add_owned_mapping(
        &mut self,
        owner: &str,
        modes: MappingModes,
        from: &str,
        to: &str,
        recursive: bool,
    ) -> Result<()> {
        let from = parse_keys(from)?;
        let to = parse_keys(to)?;
        self.mappings
            .add_mapping(modes, from, owner, MappingTarget::Keys(to), recursive);
        Ok(())
    }

    pub fn add_handler_mapping(
        &mut self,
        owner: &str,
        modes: MappingModes,
        from: &str,
        handler: Rc<dyn ExtensionHandler>,
    ) -> Result<()> {
        let from = parse_keys(from)?;
        self.mappings
            .add_mapping(modes, from, owner, MappingTarget::Handler(handler), false);
        Ok(())
    }

    pub fn remove_mapping(&mut self, modes: MappingModes, from: &str) -> Result<bool> {
        Ok(self.mappings.remove(modes, &parse_keys(from)?))
    }

    /// Removes every mapping added by `owner`.
    pub fn remove_mappings(&mut self, owner: &str) -> usize {
        self.mappings.remove_owner(owner)
    }

    pub fn mappings(&self) -> &KeyMappings {
        &self.mappings
    }

    pub fn set_ex_handler(&mut self, handler: Rc<dyn ExHandler>) {
        self.ex_handler = Some(handler);
    }

    pub fn set_operator_function(&mut self, func: Rc<dyn OperatorFunction>) {
        self.surface.state.operator_function = Some(func);
    }

    pub fn set_searcher(&mut self, searcher: Rc<dyn Searcher>) {
        self.surface.state.searcher = searcher;
    }

    pub fn options(&self) -> &Options {
        &self.surface.options
    }

    pub fn options_mut(&mut self) -> &mut Options {
        &mut self.surface.options
    }

    // ── Queries ─────────────────────────────────────────────────────────

    pub fn mode(&self) -> Mode {
        self.surface.modes.mode()
    }

    pub fn modes(&self) -> &ModeStack {
        &self.surface.modes
    }

    /// Mode indicator, with the recording register when recording.
    pub fn status(&self) -> String {
        let mut status = self.surface.modes.status_string();
        if let Some(register) = self.surface.registers.recording_register() {
            if !status.is_empty() {
                status.push(' ');
            }
            status.push_str(&format!("recording @{register}"));
        }
        status
    }

    /// Keys of the command being typed, for a showcmd area.
    pub fn pending_keys(&self) -> String {
        let mut keys = self.strokes.clone();
        keys.extend(self.map_buffer.iter().map(|p| p.key));
        to_notation(&keys)
    }

    /// The command line as displayed, prompt included.
    pub fn cmdline(&self) -> Option<String> {
        self.surface
            .state
            .cmdline
            .as_ref()
            .map(|line| format!("{}{}", line.prompt(), line.text))
    }

    pub fn last_error(&self) -> Option<&Error> {
        self.last_error.as_ref()
    }

    pub fn clear_error(&mut self) {
        self.last_error = None;
    }

    pub fn registers(&self) -> &Registers {
        &self.surface.registers
    }

    pub fn registers_mut(&mut self) -> &mut Registers {
        &mut self.surface.registers
    }

    pub fn state(&self) -> &EditState {
        &self.surface.state
    }
}

/// Runs `cmd` for one caret, or once when `caret` is `None`.
fn run_one(cx: &mut ActionContext<'_>, caret: Option<usize>, cmd: &Command) -> Result<()> {
    match cmd.action.capability() {
        Capability::Motion(_) => each_caret(cx, caret, |cx, idx| {
            cx.state.block_to_line_end = false;
            let target = cmd.action.motion(cx, idx, cmd).ok_or(Error::MotionFailed)?;
            cx.editor.set_caret(idx, target);
            Ok(())
        }),
        Capability::TextObject => each_caret(cx, caret, |cx, idx| extend_selection(cx, idx, cmd)),
        Capability::Operator => each_caret(cx, caret, |cx, idx| {
            if OperatorComposer::apply(cx, idx, cmd)? {
                Ok(())
            } else {
                Err(Error::MotionFailed)
            }
        }),
        Capability::Plain => cmd.action.execute(cx, caret, cmd),
    }
}

/// A text object outside an operator grows the visual selection.
fn extend_selection(cx: &mut ActionContext<'_>, idx: usize, cmd: &Command) -> Result<()> {
    let range = cmd.action.text_object(cx, idx, cmd).ok_or(Error::MotionFailed)?;
    if range.is_linewise() && cx.modes.sub_mode() == SubMode::VisualCharacter {
        cx.modes.set_sub_mode(SubMode::VisualLine);
    }
    let head = cx.editor.caret(idx);
    let last = prev_char_boundary(cx.editor.text(), range.end()).max(range.start());
    match cx.editor.anchor(idx) {
        Some(anchor) if anchor != head => {
            let target = if head > anchor {
                last.max(head)
            } else {
                range.start().min(head)
            };
            cx.editor.set_caret(idx, target);
        }
        _ => {
            cx.editor.set_anchor(idx, Some(range.start()));
            cx.editor.set_caret(idx, last);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::TextBuffer;
    use crate::range::SelectionType;
    use crate::registers::Register;
    use crate::text::FindKind;
    use std::cell::RefCell;

    fn setup(text: &str) -> (InputSession, TextBuffer) {
        (InputSession::new(), TextBuffer::new(text))
    }

    fn feed(session: &mut InputSession, editor: &mut TextBuffer, keys: &str) -> Option<MappingTimeout> {
        session.feed_keys(editor, keys).unwrap()
    }

    #[test]
    fn test_mode_stack_balances() {
        let (mut s, mut ed) = setup("one two\nthree");
        for keys in [
            "v<Esc>",
            "Vj<Esc>",
            "d<Esc>",
            "3<Esc>",
            "ifoo<Esc>",
            ":<Esc>",
            "/tw<Esc>",
            "d/x<Esc>",
            "cwbar<Esc>",
            "vd",
        ] {
            feed(&mut s, &mut ed, keys);
            assert_eq!(s.mode(), Mode::Normal, "after {keys}");
            assert_eq!(s.modes().depth(), 1, "after {keys}");
        }
    }

    #[test]
    fn test_mode_notation_history() {
        let (mut s, mut ed) = setup("abc");
        let mut history = Vec::new();
        for key in parse_keys("v<Esc>d<Esc>i<C-o><Esc><Esc>:<Esc>").unwrap() {
            s.handle_key(&mut ed, key);
            history.push(s.modes().vim_notation());
        }
        insta::assert_json_snapshot!(history, @r#"
        [
          "v",
          "n",
          "no",
          "n",
          "i",
          "niI",
          "i",
          "n",
          "c",
          "n"
        ]
        "#);
    }

    #[test]
    fn test_operator_linewise_flag() {
        let (mut s, mut ed) = setup("foo bar\nbaz");
        feed(&mut s, &mut ed, ">w");
        assert_eq!(ed.as_str(), "    foo bar\nbaz");
    }

    #[test]
    fn test_ambiguous_mapping_timeout() {
        let (mut s, mut ed) = setup("abc");
        s.add_mapping(MappingModes::NORMAL, "gg", "x", false).unwrap();
        s.add_mapping(MappingModes::NORMAL, "ggg", "$x", false).unwrap();

        assert!(s.handle_key(&mut ed, KeyStroke::char('g')).is_some());
        let ticket = s.handle_key(&mut ed, KeyStroke::char('g')).unwrap();
        assert_eq!(ticket.after, Duration::from_millis(1000));
        assert_eq!(ed.as_str(), "abc");
        assert_eq!(s.on_timeout(&mut ed, ticket.generation), None);
        assert_eq!(ed.as_str(), "bc");

        // A stale ticket does nothing.
        s.on_timeout(&mut ed, ticket.generation);
        assert_eq!(ed.as_str(), "bc");

        assert_eq!(feed(&mut s, &mut ed, "ggg"), None);
        assert_eq!(ed.as_str(), "b");
    }

    #[test]
    fn test_unmatched_prefix_replays_keys() {
        let (mut s, mut ed) = setup("abc def");
        s.add_mapping(MappingModes::NORMAL, "wx", "x", false).unwrap();
        feed(&mut s, &mut ed, "wl");
        assert_eq!(ed.caret(0), 5);
        assert_eq!(ed.as_str(), "abc def");
    }

    #[test]
    fn test_dot_repeat_with_count_keeps_find_and_register() {
        let (mut s, mut ed) = setup("a,b,c,d,e,f");
        feed(&mut s, &mut ed, "\"adf,");
        assert_eq!(ed.as_str(), "b,c,d,e,f");
        feed(&mut s, &mut ed, "fe0");
        feed(&mut s, &mut ed, "3.");
        assert_eq!(ed.as_str(), "e,f");
        assert_eq!(s.registers().get('a').unwrap().text(), "b,c,d,");
        assert_eq!(s.state().last_find, Some((FindKind::Forward, 'e')));
        assert_eq!(s.registers().selected(), '"');
    }

    #[test]
    fn test_escape_with_pending_prefix() {
        let (mut s, mut ed) = setup("abc");
        s.add_mapping(MappingModes::NORMAL, "gg", "x", false).unwrap();
        s.add_mapping(MappingModes::NORMAL, "ggg", "$x", false).unwrap();
        assert_eq!(feed(&mut s, &mut ed, "gg<Esc>"), None);
        assert_eq!(ed.as_str(), "abc");
        assert_eq!(s.mode(), Mode::Normal);
    }

    #[test]
    fn test_delete_word() {
        let (mut s, mut ed) = setup("foo bar baz");
        feed(&mut s, &mut ed, "dw");
        assert_eq!(ed.as_str(), "bar baz");
        assert_eq!(s.mode(), Mode::Normal);
        assert_eq!(ed.caret(0), 0);
    }

    #[test]
    fn test_counted_line_delete() {
        let (mut s, mut ed) = setup("l0\nl1\nl2\nl3\nl4");
        feed(&mut s, &mut ed, "3dd");
        assert_eq!(ed.as_str(), "l3\nl4");
        assert_eq!(ed.caret(0), 0);
        assert_eq!(s.registers().get('1').unwrap().text(), "l0\nl1\nl2\n");
    }

    #[test]
    fn test_failed_motion_cancels() {
        let (mut s, mut ed) = setup("abc");
        feed(&mut s, &mut ed, "dh");
        assert_eq!(ed.as_str(), "abc");
        assert_eq!(s.last_error(), Some(&Error::MotionFailed));
        assert_eq!(s.modes().depth(), 1);
    }

    #[test]
    fn test_unknown_key_is_build_error() {
        let (mut s, mut ed) = setup("abc");
        feed(&mut s, &mut ed, "d<C-z>");
        assert!(matches!(s.last_error(), Some(Error::CommandBuild(_))));
        assert_eq!(s.mode(), Mode::Normal);
        feed(&mut s, &mut ed, "x");
        assert_eq!(ed.as_str(), "bc");
    }

    #[test]
    fn test_change_word_and_repeat() {
        let (mut s, mut ed) = setup("foo bar");
        feed(&mut s, &mut ed, "cwbaz<Esc>");
        assert_eq!(ed.as_str(), "baz bar");
        assert_eq!(ed.caret(0), 2);
        feed(&mut s, &mut ed, "w.");
        assert_eq!(ed.as_str(), "baz baz");
        assert_eq!(s.mode(), Mode::Normal);
        assert_eq!(s.registers().get('.').unwrap().text(), "baz");
    }

    #[test]
    fn test_insert_and_exit_moves_left() {
        let (mut s, mut ed) = setup("");
        feed(&mut s, &mut ed, "ifoo");
        assert_eq!(s.status(), "-- INSERT --");
        feed(&mut s, &mut ed, "<Esc>");
        assert_eq!(ed.as_str(), "foo");
        assert_eq!(ed.caret(0), 2);
    }

    #[test]
    fn test_insert_single_command() {
        let (mut s, mut ed) = setup("");
        feed(&mut s, &mut ed, "iab<C-o>0x");
        assert_eq!(ed.as_str(), "xab");
        assert_eq!(s.mode(), Mode::Insert);
    }

    #[test]
    fn test_visual_delete() {
        let (mut s, mut ed) = setup("abcdef");
        feed(&mut s, &mut ed, "vll");
        assert_eq!(s.status(), "-- VISUAL --");
        feed(&mut s, &mut ed, "d");
        assert_eq!(ed.as_str(), "def");
        assert_eq!(s.mode(), Mode::Normal);
        assert_eq!(ed.anchor(0), None);
    }

    #[test]
    fn test_visual_line_delete() {
        let (mut s, mut ed) = setup("a\nb\nc");
        feed(&mut s, &mut ed, "Vjd");
        assert_eq!(ed.as_str(), "c");
    }

    #[test]
    fn test_visual_text_object() {
        let (mut s, mut ed) = setup("foo bar baz");
        ed.set_caret(0, 5);
        feed(&mut s, &mut ed, "viwy");
        assert_eq!(s.registers().get('0').unwrap().text(), "bar");
    }

    #[test]
    fn test_select_mode_typing_replaces() {
        let (mut s, mut ed) = setup("abc def");
        feed(&mut s, &mut ed, "vll<C-g>");
        assert_eq!(s.mode(), Mode::Select);
        feed(&mut s, &mut ed, "X");
        assert_eq!(ed.as_str(), "X def");
        assert_eq!(s.mode(), Mode::Insert);
    }

    #[test]
    fn test_macro_record_and_play() {
        let (mut s, mut ed) = setup("abcdef");
        feed(&mut s, &mut ed, "qa");
        assert_eq!(s.status(), "recording @a");
        feed(&mut s, &mut ed, "xq");
        assert_eq!(s.status(), "");
        assert_eq!(s.registers().get('a').unwrap().keys, vec![KeyStroke::char('x')]);
        feed(&mut s, &mut ed, "2@a");
        assert_eq!(ed.as_str(), "def");
        feed(&mut s, &mut ed, "@@");
        assert_eq!(ed.as_str(), "ef");
    }

    #[test]
    fn test_recursive_macro_is_stopped() {
        let (mut s, mut ed) = setup("abc");
        s.registers_mut()
            .set('a', Register::with_text('a', "@a", SelectionType::CharacterWise))
            .unwrap();
        feed(&mut s, &mut ed, "@a");
        assert!(matches!(s.last_error(), Some(Error::MacroRecursion { .. })));
        assert_eq!(s.mode(), Mode::Normal);
        assert_eq!(ed.as_str(), "abc");
    }

    #[test]
    fn test_recursive_mapping_is_stopped() {
        let (mut s, mut ed) = setup("abc");
        s.add_mapping(MappingModes::NORMAL, "a", "b", true).unwrap();
        s.add_mapping(MappingModes::NORMAL, "b", "a", true).unwrap();
        feed(&mut s, &mut ed, "a");
        assert!(matches!(s.last_error(), Some(Error::MappingRecursion { .. })));
        assert_eq!(s.mode(), Mode::Normal);
        assert_eq!(ed.as_str(), "abc");
    }

    #[test]
    fn test_mapping_with_lhs_prefix_is_not_reexpanded() {
        let (mut s, mut ed) = setup("abc");
        s.add_mapping(MappingModes::NORMAL, "x", "xl", true).unwrap();
        feed(&mut s, &mut ed, "x");
        assert_eq!(ed.as_str(), "bc");
        assert_eq!(ed.caret(0), 1);
        assert_eq!(s.remove_mappings(USER_OWNER), 1);
    }

    #[test]
    fn test_undo_restores_text() {
        let (mut s, mut ed) = setup("abc");
        feed(&mut s, &mut ed, "xx");
        assert_eq!(ed.as_str(), "c");
        feed(&mut s, &mut ed, "u");
        assert_eq!(ed.as_str(), "bc");
        feed(&mut s, &mut ed, "<C-r>");
        assert_eq!(ed.as_str(), "c");
    }

    #[test]
    fn test_read_only_buffer() {
        let (mut s, mut ed) = setup("abc");
        ed.set_writable(false);
        feed(&mut s, &mut ed, "x");
        assert_eq!(ed.as_str(), "abc");
        assert_eq!(s.last_error(), Some(&Error::ReadOnly));
        feed(&mut s, &mut ed, "l");
        assert_eq!(ed.caret(0), 1);
    }

    #[test]
    fn test_search_motion() {
        let (mut s, mut ed) = setup("foo bar foo");
        feed(&mut s, &mut ed, "/fo");
        assert_eq!(s.cmdline(), Some("/fo".to_string()));
        feed(&mut s, &mut ed, "<CR>");
        assert_eq!(ed.caret(0), 8);
        assert_eq!(s.cmdline(), None);
        feed(&mut s, &mut ed, "d?bar<CR>");
        assert_eq!(ed.as_str(), "foo foo");
    }

    struct RecordingEx {
        lines: RefCell<Vec<String>>,
    }

    impl ExHandler for RecordingEx {
        fn execute(&self, _cx: &mut ActionContext<'_>, line: &str) -> Result<()> {
            self.lines.borrow_mut().push(line.to_string());
            Ok(())
        }
    }

    #[test]
    fn test_ex_command_line() {
        let (mut s, mut ed) = setup("abc");
        feed(&mut s, &mut ed, ":w<CR>");
        assert_eq!(s.last_error(), Some(&Error::NotImplemented("ex commands")));
        assert_eq!(s.mode(), Mode::Normal);

        let ex = Rc::new(RecordingEx {
            lines: RefCell::new(Vec::new()),
        });
        s.set_ex_handler(ex.clone());
        feed(&mut s, &mut ed, ":wq<BS>!<CR>");
        assert_eq!(*ex.lines.borrow(), vec!["w!".to_string()]);
        assert_eq!(s.registers().get(':').unwrap().text(), "w!");
    }

    struct Bang;

    impl ExtensionHandler for Bang {
        fn id(&self) -> &'static str {
            "Bang"
        }

        fn execute(&self, cx: &mut ActionContext<'_>) -> Result<()> {
            let pos = cx.editor.caret(0);
            cx.editor.insert_text(pos, "!");
            Ok(())
        }

        fn is_repeatable(&self) -> bool {
            true
        }
    }

    #[test]
    fn test_extension_handler_repeats() {
        let (mut s, mut ed) = setup("ab");
        s.add_handler_mapping("test", MappingModes::NORMAL, "<F2>", Rc::new(Bang))
            .unwrap();
        feed(&mut s, &mut ed, "<F2>l.");
        assert_eq!(ed.as_str(), "!!ab");
        feed(&mut s, &mut ed, "x.");
        assert_eq!(ed.as_str(), "!b");
    }

    #[test]
    fn test_register_put() {
        let (mut s, mut ed) = setup("one\ntwo");
        feed(&mut s, &mut ed, "\"ayyj\"ap");
        assert_eq!(ed.as_str(), "one\ntwo\none");
        assert_eq!(ed.caret(0), 8);
    }

    #[test]
    fn test_visual_delete_repeats_same_size() {
        let (mut s, mut ed) = setup("abcdefgh");
        feed(&mut s, &mut ed, "vld");
        assert_eq!(ed.as_str(), "cdefgh");
        feed(&mut s, &mut ed, ".");
        assert_eq!(ed.as_str(), "efgh");
        assert_eq!(s.mode(), Mode::Normal);
    }

    #[test]
    fn test_visual_line_delete_repeats_line_count() {
        let (mut s, mut ed) = setup("a\nb\nc\nd\ne");
        feed(&mut s, &mut ed, "Vjd.");
        assert_eq!(ed.as_str(), "e");
    }

    #[test]
    fn test_failed_single_command_returns_to_insert() {
        let (mut s, mut ed) = setup("");
        feed(&mut s, &mut ed, "i<C-o>h");
        assert_eq!(s.last_error(), Some(&Error::MotionFailed));
        assert_eq!(s.mode(), Mode::Insert);
        feed(&mut s, &mut ed, "ab");
        assert_eq!(ed.as_str(), "ab");
        assert_eq!(s.mode(), Mode::Insert);

        feed(&mut s, &mut ed, "<C-o>d<Esc>");
        assert_eq!(s.mode(), Mode::Insert);
    }

    #[test]
    fn test_escape_from_visual_inside_single_command() {
        let (mut s, mut ed) = setup("abc");
        feed(&mut s, &mut ed, "i<C-o>v");
        assert_eq!(s.mode(), Mode::InsertVisual);
        feed(&mut s, &mut ed, "<Esc>");
        assert_eq!(s.mode(), Mode::Insert);
        feed(&mut s, &mut ed, "<Esc>");
        assert_eq!(s.mode(), Mode::Normal);
        assert_eq!(s.modes().depth(), 1);
    }

    #[test]
    fn test_huge_counts_finish() {
        let (mut s, mut ed) = setup("foo bar baz");
        feed(&mut s, &mut ed, "99999999d99999999w");
        assert_eq!(ed.as_str(), "");
        assert_eq!(s.mode(), Mode::Normal);
    }

    #[test]
    fn test_counted_macro_stops_on_failure() {
        let (mut s, mut ed) = setup("abc");
        s.registers_mut()
            .set('a', Register::with_text('a', "l", SelectionType::CharacterWise))
            .unwrap();
        feed(&mut s, &mut ed, "99999999@a");
        assert_eq!(ed.caret(0), 2);
        assert_eq!(s.last_error(), Some(&Error::MotionFailed));
        assert!(s.queue.is_empty());
    }

    #[test]
    fn test_macro_plays_yanked_text_literally() {
        let (mut s, mut ed) = setup("abc");
        s.registers_mut()
            .set('a', Register::with_text('a', "x<b>", SelectionType::CharacterWise))
            .unwrap();
        feed(&mut s, &mut ed, "@a");
        assert_eq!(ed.as_str(), "bc");
        assert!(!matches!(s.last_error(), Some(Error::KeyNotation(_))));
    }

    #[test]
    fn test_operator_runs_at_every_caret() {
        let (mut s, mut ed) = setup("foo bar\nbaz qux");
        ed.add_caret(8);
        feed(&mut s, &mut ed, "dw");
        assert_eq!(ed.as_str(), "bar\nqux");
        assert_eq!(ed.caret_count(), 2);
    }

    #[test]
    fn test_put_at_every_caret_unless_blockwise() {
        let (mut s, mut ed) = setup("ab\ncd");
        ed.add_caret(3);
        s.registers_mut()
            .store_text("X", SelectionType::CharacterWise, false)
            .unwrap();
        feed(&mut s, &mut ed, "p");
        assert_eq!(ed.as_str(), "aXb\ncXd");

        let (mut s, mut ed) = setup("ab\ncd");
        ed.add_caret(3);
        s.registers_mut()
            .store_text("X", SelectionType::BlockWise, false)
            .unwrap();
        feed(&mut s, &mut ed, "p");
        assert_eq!(ed.as_str(), "aXb\ncd");
    }
}
