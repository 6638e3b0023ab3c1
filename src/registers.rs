use crate::error::{Error, Result};
use crate::key::{to_notation, KeyStroke};
use crate::range::SelectionType;
use std::collections::BTreeMap;

pub const UNNAMED_REGISTER: char = '"';
pub const BLACK_HOLE_REGISTER: char = '_';
pub const LAST_INSERTED_REGISTER: char = '.';
pub const LAST_COMMAND_REGISTER: char = ':';
pub const LAST_SEARCH_REGISTER: char = '/';
pub const SMALL_DELETE_REGISTER: char = '-';

const READONLY: &str = ".:/";
const SPECIAL: &str = "\"-*+_.:/";

/// One register's content. Macros prefer `keys`; yank/put uses `text`.
#[derive(Clone, Debug, PartialEq)]
pub struct Register {
    pub name: char,
    pub kind: SelectionType,
    pub text: Option<String>,
    pub keys: Vec<KeyStroke>,
}

impl Register {
    pub fn with_text(name: char, text: impl Into<String>, kind: SelectionType) -> Self {
        Self {
            name,
            kind,
            text: Some(text.into()),
            keys: Vec::new(),
        }
    }

    pub fn with_keys(name: char, keys: Vec<KeyStroke>) -> Self {
        Self {
            name,
            kind: SelectionType::CharacterWise,
            text: Some(to_notation(&keys)),
            keys,
        }
    }

    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }

    fn append(&mut self, other: Register) {
        let old = self.text.take().unwrap_or_default();
        let new = other.text.unwrap_or_default();
        let joined = match (self.kind, other.kind) {
            (SelectionType::LineWise, _) => {
                let mut s = old + &new;
                if !s.ends_with('\n') {
                    s.push('\n');
                }
                s
            }
            (_, SelectionType::LineWise) => old + "\n" + &new,
            _ => old + &new,
        };
        if other.kind == SelectionType::LineWise {
            self.kind = SelectionType::LineWise;
        }
        self.text = Some(joined);
        self.keys.extend(other.keys);
    }
}

struct Recording {
    register: char,
    keys: Vec<KeyStroke>,
}

/// Register store plus the register selection of the command being built
/// and macro recording state.
#[derive(Default)]
pub struct Registers {
    store: BTreeMap<char, Register>,
    selected: Option<char>,
    recording: Option<Recording>,
    last_played: Option<char>,
}

impl Registers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_valid(c: char) -> bool {
        c.is_ascii_alphanumeric() || SPECIAL.contains(c)
    }

    pub fn is_writable(c: char) -> bool {
        Self::is_valid(c) && !READONLY.contains(c)
    }

    // ── Selection ───────────────────────────────────────────────────────

    pub fn select(&mut self, c: char) -> Result<()> {
        if !Self::is_valid(c) {
            return Err(Error::InvalidRegister(c));
        }
        self.selected = Some(c);
        Ok(())
    }

    pub fn selected(&self) -> char {
        self.selected.unwrap_or(UNNAMED_REGISTER)
    }

    /// Whether the current command named a register explicitly.
    pub fn is_explicit(&self) -> bool {
        self.selected.is_some_and(|c| c != UNNAMED_REGISTER)
    }

    pub fn reset_selection(&mut self) {
        self.selected = None;
    }

    // ── Contents ────────────────────────────────────────────────────────

    pub fn get(&self, name: char) -> Option<&Register> {
        if name == BLACK_HOLE_REGISTER {
            return None;
        }
        self.store.get(&name.to_ascii_lowercase())
    }

    /// Writes `reg` under `name`. Uppercase names append to the lowercase
    /// register.
    pub fn set(&mut self, name: char, mut reg: Register) -> Result<()> {
        if !Self::is_valid(name) {
            return Err(Error::InvalidRegister(name));
        }
        if name == BLACK_HOLE_REGISTER {
            return Ok(());
        }
        let lower = name.to_ascii_lowercase();
        reg.name = lower;
        match self.store.get_mut(&lower) {
            Some(existing) if name.is_ascii_uppercase() => existing.append(reg),
            _ => {
                self.store.insert(lower, reg);
            }
        }
        Ok(())
    }

    /// Sets one of the read-only registers (`.`, `:`, `/`).
    pub fn set_readonly(&mut self, name: char, text: &str) {
        self.store.insert(
            name,
            Register::with_text(name, text, SelectionType::CharacterWise),
        );
    }

    /// Stores yanked or deleted text in the selected register, following
    /// Vim's unnamed/numbered/small-delete rules.
    pub fn store_text(&mut self, text: &str, kind: SelectionType, is_delete: bool) -> Result<()> {
        let name = self.selected();
        if name == BLACK_HOLE_REGISTER {
            return Ok(());
        }
        if !Self::is_writable(name) {
            return Err(Error::ReadOnly);
        }
        let mut text = text.to_string();
        if kind == SelectionType::LineWise && !text.ends_with('\n') {
            text.push('\n');
        }
        let content = Register::with_text(name, text.as_str(), kind);

        if name != UNNAMED_REGISTER {
            self.set(name, content.clone())?;
        } else if !is_delete {
            self.set('0', content.clone())?;
        } else if kind == SelectionType::LineWise || text.contains('\n') {
            for n in (1..9u32).rev() {
                let from = char::from_digit(n, 10).unwrap_or('1');
                let to = char::from_digit(n + 1, 10).unwrap_or('9');
                if let Some(mut reg) = self.store.remove(&from) {
                    reg.name = to;
                    self.store.insert(to, reg);
                }
            }
            self.set('1', content.clone())?;
        } else {
            self.set(SMALL_DELETE_REGISTER, content.clone())?;
        }

        // The unnamed register always mirrors the latest write.
        let unnamed = match self.get(name) {
            Some(reg) if name.is_ascii_uppercase() => reg.clone(),
            _ => content,
        };
        self.store.insert(UNNAMED_REGISTER, Register {
            name: UNNAMED_REGISTER,
            ..unnamed
        });
        Ok(())
    }

    pub fn names(&self) -> impl Iterator<Item = char> + '_ {
        self.store.keys().copied()
    }

    // ── Recording ───────────────────────────────────────────────────────

    pub fn start_recording(&mut self, name: char) -> Result<()> {
        if !(name.is_ascii_alphanumeric() || name == UNNAMED_REGISTER) {
            return Err(Error::InvalidRegister(name));
        }
        self.recording = Some(Recording {
            register: name,
            keys: Vec::new(),
        });
        Ok(())
    }

    pub fn is_recording(&self) -> bool {
        self.recording.is_some()
    }

    pub fn recording_register(&self) -> Option<char> {
        self.recording.as_ref().map(|r| r.register)
    }

    pub fn record_key(&mut self, key: KeyStroke) {
        if let Some(rec) = self.recording.as_mut() {
            rec.keys.push(key);
        }
    }

    /// Ends the recording and stores the keys. Returns the register name.
    pub fn stop_recording(&mut self) -> Option<char> {
        let rec = self.recording.take()?;
        let reg = Register::with_keys(rec.register, rec.keys);
        if let Err(err) = self.set(rec.register, reg) {
            crate::log::entry(crate::log::Level::Warn, "record_store_failed", &err.to_string());
        }
        Some(rec.register)
    }

    // ── Playback ────────────────────────────────────────────────────────

    /// Keys to play for `@{name}`; `@@` repeats the last played register.
    pub fn playback_keys(&mut self, name: char) -> Result<Vec<KeyStroke>> {
        let name = if name == '@' {
            self.last_played.ok_or(Error::EmptyRegister('@'))?
        } else {
            name
        };
        if name == LAST_COMMAND_REGISTER {
            return Err(Error::NotImplemented("@:"));
        }
        if !Self::is_valid(name) {
            return Err(Error::InvalidRegister(name));
        }
        let reg = self.get(name).ok_or(Error::EmptyRegister(name))?;
        // Yanked text plays back as the characters it holds.
        let keys = if reg.keys.is_empty() {
            reg.text().chars().map(KeyStroke::literal).collect()
        } else {
            reg.keys.clone()
        };
        self.last_played = Some(name);
        Ok(keys)
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyCode;

    fn text_of(regs: &Registers, name: char) -> Option<String> {
        regs.get(name).map(|r| r.text().to_string())
    }

    #[test]
    fn test_yank_goes_to_zero_and_unnamed() {
        let mut regs = Registers::new();
        regs.store_text("foo", SelectionType::CharacterWise, false).unwrap();
        assert_eq!(text_of(&regs, '0').as_deref(), Some("foo"));
        assert_eq!(text_of(&regs, '"').as_deref(), Some("foo"));
        assert_eq!(text_of(&regs, '1'), None);
    }

    #[test]
    fn test_small_delete_and_numbered_shift() {
        let mut regs = Registers::new();
        regs.store_text("w", SelectionType::CharacterWise, true).unwrap();
        assert_eq!(text_of(&regs, '-').as_deref(), Some("w"));

        regs.store_text("one", SelectionType::LineWise, true).unwrap();
        regs.store_text("two", SelectionType::LineWise, true).unwrap();
        assert_eq!(text_of(&regs, '1').as_deref(), Some("two\n"));
        assert_eq!(text_of(&regs, '2').as_deref(), Some("one\n"));
        assert_eq!(text_of(&regs, '"').as_deref(), Some("two\n"));
    }

    #[test]
    fn test_uppercase_appends() {
        let mut regs = Registers::new();
        regs.select('a').unwrap();
        regs.store_text("foo", SelectionType::CharacterWise, false).unwrap();
        regs.select('A').unwrap();
        regs.store_text("bar", SelectionType::CharacterWise, false).unwrap();
        assert_eq!(text_of(&regs, 'a').as_deref(), Some("foobar"));
        assert_eq!(text_of(&regs, '"').as_deref(), Some("foobar"));
        assert_eq!(text_of(&regs, '0'), None);
    }

    #[test]
    fn test_black_hole_and_readonly() {
        let mut regs = Registers::new();
        regs.select('_').unwrap();
        regs.store_text("gone", SelectionType::CharacterWise, true).unwrap();
        assert_eq!(text_of(&regs, '"'), None);

        regs.select('.').unwrap();
        assert_eq!(
            regs.store_text("x", SelectionType::CharacterWise, false),
            Err(Error::ReadOnly)
        );
        assert_eq!(regs.select('%'), Err(Error::InvalidRegister('%')));
    }

    #[test]
    fn test_record_and_playback() {
        let mut regs = Registers::new();
        regs.start_recording('q').unwrap();
        regs.record_key(KeyStroke::char('x'));
        regs.record_key(KeyStroke::char('j'));
        assert_eq!(regs.stop_recording(), Some('q'));
        assert!(!regs.is_recording());

        let keys = regs.playback_keys('q').unwrap();
        assert_eq!(to_notation(&keys), "xj");
        assert_eq!(to_notation(&regs.playback_keys('@').unwrap()), "xj");
    }

    #[test]
    fn test_playback_types_yanked_text_literally() {
        let mut regs = Registers::new();
        regs.set('a', Register::with_text('a', "dd<Esc>\n", SelectionType::CharacterWise))
            .unwrap();
        let keys = regs.playback_keys('a').unwrap();
        assert_eq!(keys.len(), 8);
        assert_eq!(keys[2], KeyStroke::char('<'));
        assert_eq!(keys[7], KeyStroke::code(KeyCode::Enter));
        assert_eq!(regs.playback_keys('z'), Err(Error::EmptyRegister('z')));
        assert_eq!(regs.playback_keys(':'), Err(Error::NotImplemented("@:")));
    }

    #[test]
    fn test_register_dump_snapshot() {
        let mut regs = Registers::new();
        regs.store_text("alpha", SelectionType::LineWise, true).unwrap();
        regs.store_text("b", SelectionType::CharacterWise, true).unwrap();
        regs.select('k').unwrap();
        regs.store_text("kept", SelectionType::CharacterWise, false).unwrap();

        let dump: BTreeMap<String, String> = regs
            .names()
            .filter_map(|n| regs.get(n).map(|r| (n.to_string(), r.text().to_string())))
            .collect();
        insta::assert_json_snapshot!(dump, @r#"
        {
          "\"": "kept",
          "-": "b",
          "1": "alpha\n",
          "k": "kept"
        }
        "#);
    }
}
