use crate::error::{Error, Result};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::fmt;

/// A single key press, normalized so that equal keys compare equal
/// regardless of how the terminal reported shift.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct KeyStroke {
    pub code: KeyCode,
    pub modifiers: KeyModifiers,
}

impl KeyStroke {
    pub fn new(code: KeyCode, modifiers: KeyModifiers) -> Self {
        let mut modifiers = modifiers & (KeyModifiers::SHIFT | KeyModifiers::CONTROL | KeyModifiers::ALT);
        let code = match code {
            KeyCode::Char(c) => {
                // The char already carries its case.
                modifiers.remove(KeyModifiers::SHIFT);
                if modifiers.contains(KeyModifiers::CONTROL) && c.is_ascii_uppercase() {
                    KeyCode::Char(c.to_ascii_lowercase())
                } else {
                    KeyCode::Char(c)
                }
            }
            KeyCode::BackTab => {
                modifiers.insert(KeyModifiers::SHIFT);
                KeyCode::Tab
            }
            other => other,
        };
        Self { code, modifiers }
    }

    pub fn char(c: char) -> Self {
        Self::new(KeyCode::Char(c), KeyModifiers::NONE)
    }

    pub fn ctrl(c: char) -> Self {
        Self::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    pub fn code(code: KeyCode) -> Self {
        Self::new(code, KeyModifiers::NONE)
    }

    pub fn esc() -> Self {
        Self::code(KeyCode::Esc)
    }

    /// The key that types `c` literally: a newline is Enter, a tab is Tab.
    pub fn literal(c: char) -> Self {
        match c {
            '\n' => Self::code(KeyCode::Enter),
            '\t' => Self::code(KeyCode::Tab),
            c => Self::char(c),
        }
    }

    /// Converts a terminal event. Releases and repeats-as-release are dropped.
    pub fn from_event(ev: KeyEvent) -> Option<Self> {
        if ev.kind == KeyEventKind::Release {
            return None;
        }
        Some(Self::new(ev.code, ev.modifiers))
    }

    /// The plain character this key types, if any.
    pub fn as_char(&self) -> Option<char> {
        match self.code {
            KeyCode::Char(c) if self.modifiers.is_empty() => Some(c),
            _ => None,
        }
    }

    /// `<Esc>` and its `<C-[>` spelling.
    pub fn is_escape(&self) -> bool {
        match self.code {
            KeyCode::Esc => true,
            KeyCode::Char('[') => self.modifiers == KeyModifiers::CONTROL,
            _ => false,
        }
    }

    pub fn is_enter(&self) -> bool {
        (self.code == KeyCode::Enter && self.modifiers.is_empty())
            || (self.code == KeyCode::Char('m') && self.modifiers == KeyModifiers::CONTROL)
    }

    pub fn digit(&self) -> Option<u32> {
        self.as_char().and_then(|c| c.to_digit(10))
    }
}

impl From<KeyEvent> for KeyStroke {
    fn from(ev: KeyEvent) -> Self {
        Self::new(ev.code, ev.modifiers)
    }
}

impl From<char> for KeyStroke {
    fn from(c: char) -> Self {
        Self::char(c)
    }
}

// ── Notation ────────────────────────────────────────────────────────────────

fn special_name(code: KeyCode) -> Option<&'static str> {
    Some(match code {
        KeyCode::Esc => "Esc",
        KeyCode::Enter => "CR",
        KeyCode::Backspace => "BS",
        KeyCode::Tab => "Tab",
        KeyCode::Delete => "Del",
        KeyCode::Insert => "Insert",
        KeyCode::Up => "Up",
        KeyCode::Down => "Down",
        KeyCode::Left => "Left",
        KeyCode::Right => "Right",
        KeyCode::Home => "Home",
        KeyCode::End => "End",
        KeyCode::PageUp => "PageUp",
        KeyCode::PageDown => "PageDown",
        KeyCode::Char(' ') => "Space",
        KeyCode::Char('<') => "lt",
        KeyCode::Char('\\') => "Bslash",
        KeyCode::Char('|') => "Bar",
        _ => return None,
    })
}

fn named_code(name: &str) -> Option<KeyCode> {
    let lower = name.to_ascii_lowercase();
    Some(match lower.as_str() {
        "esc" => KeyCode::Esc,
        "cr" | "enter" | "return" => KeyCode::Enter,
        "bs" | "backspace" => KeyCode::Backspace,
        "tab" => KeyCode::Tab,
        "del" | "delete" => KeyCode::Delete,
        "insert" | "ins" => KeyCode::Insert,
        "up" => KeyCode::Up,
        "down" => KeyCode::Down,
        "left" => KeyCode::Left,
        "right" => KeyCode::Right,
        "home" => KeyCode::Home,
        "end" => KeyCode::End,
        "pageup" => KeyCode::PageUp,
        "pagedown" => KeyCode::PageDown,
        "space" => KeyCode::Char(' '),
        "lt" => KeyCode::Char('<'),
        "bslash" => KeyCode::Char('\\'),
        "bar" => KeyCode::Char('|'),
        "nl" => KeyCode::Enter,
        _ => {
            let n = lower.strip_prefix('f')?.parse::<u8>().ok()?;
            if (1..=12).contains(&n) {
                KeyCode::F(n)
            } else {
                return None;
            }
        }
    })
}

/// Parses the inside of a `<...>` group, e.g. `C-o`, `Esc`, `S-Tab`.
fn parse_bracketed(inner: &str) -> Option<KeyStroke> {
    let mut modifiers = KeyModifiers::NONE;
    let mut rest = inner;
    loop {
        let bytes = rest.as_bytes();
        if bytes.len() > 2 && bytes[1] == b'-' {
            match bytes[0].to_ascii_lowercase() {
                b'c' => modifiers |= KeyModifiers::CONTROL,
                b's' => modifiers |= KeyModifiers::SHIFT,
                b'a' | b'm' => modifiers |= KeyModifiers::ALT,
                _ => break,
            }
            rest = &rest[2..];
        } else {
            break;
        }
    }
    let mut chars = rest.chars();
    let code = match (chars.next(), chars.next()) {
        (Some(c), None) if !modifiers.is_empty() => KeyCode::Char(c),
        _ => named_code(rest)?,
    };
    Some(KeyStroke::new(code, modifiers))
}

/// Parses Vim key notation such as `d<C-o>gg<Esc>` into key strokes.
pub fn parse_keys(notation: &str) -> Result<Vec<KeyStroke>> {
    let mut keys = Vec::new();
    let mut rest = notation;
    while let Some(c) = rest.chars().next() {
        if c == '<' {
            if let Some(close) = rest.find('>') {
                if let Some(key) = parse_bracketed(&rest[1..close]) {
                    keys.push(key);
                    rest = &rest[close + 1..];
                    continue;
                }
                if close > 1 && !rest[1..close].contains('<') {
                    return Err(Error::KeyNotation(rest[..=close].to_string()));
                }
            }
        }
        keys.push(KeyStroke::char(c));
        rest = &rest[c.len_utf8()..];
    }
    Ok(keys)
}

/// Prints keys back in the notation `parse_keys` accepts.
pub fn to_notation(keys: &[KeyStroke]) -> String {
    keys.iter().map(|k| k.to_string()).collect()
}

impl fmt::Display for KeyStroke {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let (KeyCode::Char(c), true) = (self.code, self.modifiers.is_empty()) {
            if let Some(name) = special_name(self.code) {
                return write!(f, "<{name}>");
            }
            return write!(f, "{c}");
        }
        f.write_str("<")?;
        if self.modifiers.contains(KeyModifiers::CONTROL) {
            f.write_str("C-")?;
        }
        if self.modifiers.contains(KeyModifiers::ALT) {
            f.write_str("A-")?;
        }
        if self.modifiers.contains(KeyModifiers::SHIFT) {
            f.write_str("S-")?;
        }
        match (special_name(self.code), self.code) {
            (Some(name), _) => f.write_str(name)?,
            (None, KeyCode::Char(c)) => write!(f, "{c}")?,
            (None, KeyCode::F(n)) => write!(f, "F{n}")?,
            (None, other) => write!(f, "{other:?}")?,
        }
        f.write_str(">")
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
