use modekeys::{Editor, InputSession, KeyStroke, MappingTimeout, TextBuffer, TextLayout};

use crossterm::{
    cursor,
    event::{DisableBracketedPaste, EnableBracketedPaste, Event, EventStream, KeyCode, KeyEventKind, KeyModifiers},
    queue,
    style::Print,
    terminal::{self, ClearType},
    ExecutableCommand,
};
use futures_util::StreamExt;
use std::io::{self, Write};
use tokio::time::Instant;

// ── App ──────────────────────────────────────────────────────────────────────

/// Full-screen demo host: one buffer, one input session.
pub struct App {
    session: InputSession,
    editor: TextBuffer,
    /// Pending mapping timeout and when it fires.
    timeout: Option<(MappingTimeout, Instant)>,
}

impl App {
    pub fn new(session: InputSession, editor: TextBuffer) -> Self {
        Self {
            session,
            editor,
            timeout: None,
        }
    }

    pub async fn run(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        let _ = io::stdout().execute(EnableBracketedPaste);
        let _ = io::stdout().execute(terminal::EnterAlternateScreen);

        let result = self.event_loop().await;

        let _ = io::stdout().execute(terminal::LeaveAlternateScreen);
        let _ = io::stdout().execute(DisableBracketedPaste);
        terminal::disable_raw_mode().ok();
        result
    }

    async fn event_loop(&mut self) -> io::Result<()> {
        let mut term_events = EventStream::new();
        loop {
            self.render()?;
            let deadline = self.timeout.map(|(_, at)| at);

            tokio::select! {
                biased;

                ev = term_events.next() => match ev {
                    Some(Ok(ev)) => {
                        if self.dispatch_terminal_event(ev) {
                            return Ok(());
                        }
                    }
                    Some(Err(e)) => return Err(e),
                    None => return Ok(()),
                },

                _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    if let Some((ticket, _)) = self.timeout.take() {
                        let next = self.session.on_timeout(&mut self.editor, ticket.generation);
                        self.arm(next);
                    }
                }
            }
        }
    }

    /// Returns `true` if the app should quit.
    fn dispatch_terminal_event(&mut self, ev: Event) -> bool {
        match ev {
            Event::Key(key) if key.kind != KeyEventKind::Release => {
                if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                    return true;
                }
                if let Some(stroke) = KeyStroke::from_event(key) {
                    self.session.clear_error();
                    let next = self.session.handle_key(&mut self.editor, stroke);
                    self.arm(next);
                }
            }
            // Pasted text is typed, never run as commands.
            Event::Paste(text) => {
                let modes = self.session.modes();
                if !modes.in_insert() && !modes.in_cmd_line() {
                    return false;
                }
                for c in text.chars() {
                    let next = self.session.handle_key(&mut self.editor, KeyStroke::literal(c));
                    self.arm(next);
                }
            }
            _ => {}
        }
        false
    }

    fn arm(&mut self, ticket: Option<MappingTimeout>) {
        self.timeout = ticket.map(|t| (t, Instant::now() + t.after));
    }

    // ── Rendering ────────────────────────────────────────────────────────

    fn render(&self) -> io::Result<()> {
        let (width, height) = terminal::size().unwrap_or((80, 24));
        let rows = height.saturating_sub(1) as usize;
        let caret = self.editor.caret(0);
        let caret_line = self.editor.line_of(caret);
        let top = caret_line.saturating_sub(rows.saturating_sub(1));

        let mut out = io::stdout();
        queue!(out, cursor::Hide, cursor::MoveTo(0, 0), terminal::Clear(ClearType::All))?;
        for (row, line) in self.editor.text().split('\n').skip(top).take(rows).enumerate() {
            let shown: String = line.chars().take(width as usize).collect();
            queue!(out, cursor::MoveTo(0, row as u16), Print(shown))?;
        }
        queue!(out, cursor::MoveTo(0, height.saturating_sub(1)), Print(self.status_line(width)))?;

        let col = self.editor.column_of(caret).min(width.saturating_sub(1) as usize);
        match self.session.cmdline() {
            Some(line) => {
                let col = line.chars().count().min(width.saturating_sub(1) as usize);
                queue!(out, cursor::MoveTo(col as u16, height.saturating_sub(1)))?;
            }
            None => queue!(out, cursor::MoveTo(col as u16, (caret_line - top) as u16))?,
        }
        queue!(out, cursor::Show)?;
        out.flush()
    }

    fn status_line(&self, width: u16) -> String {
        if let Some(line) = self.session.cmdline() {
            return line;
        }
        let left = match self.session.last_error() {
            Some(err) => err.to_string(),
            None => self.session.status(),
        };
        let right = format!("{}  {}", self.session.pending_keys(), self.session.modes().vim_notation());
        let pad = (width as usize).saturating_sub(left.chars().count() + right.chars().count());
        format!("{left}{}{right}", " ".repeat(pad))
    }
}
