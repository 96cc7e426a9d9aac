//! A scripted editing session over an in-memory buffer.
//!
//! `Session` plays the part of an editor in insert mode: typed characters go
//! into the buffer (replacing the selection, if any), arrows move the
//! cursor, `<Tab>` expands, `<C-j>`/`<C-k>` jump and `<Esc>` leaves the
//! innermost snippet. When a trigger matches several snippets the session
//! waits for a number followed by `<CR>`; `<Esc>` cancels the choice.

use crate::engine::{Engine, ExpandOutcome};
use crate::error::ExpandError;
use crate::host::Host;
use anyhow::Result;
use core_config::Config;
use core_events::{Diagnostic, KeyToken, ModMask, NamedKey, Signal, parse_keys};
use core_registry::Registry;
use core_text::{Buffer, Position, TextEdit, advance, grapheme};
use tracing::{debug, warn};

/// A `Buffer` plus cursor and selection, implementing [`Host`].
pub struct BufferHost {
    pub buffer: Buffer,
    cursor: Position,
    selection: Option<(Position, Position)>,
    signals: Vec<Signal>,
}

impl BufferHost {
    pub fn new(buffer: Buffer) -> Self {
        let cursor = buffer.end_position();
        Self {
            buffer,
            cursor,
            selection: None,
            signals: Vec::new(),
        }
    }

    pub fn selection(&self) -> Option<(Position, Position)> {
        self.selection
    }

    pub fn signals(&self) -> &[Signal] {
        &self.signals
    }
}

impl Host for BufferHost {
    fn line_count(&self) -> usize {
        self.buffer.line_count()
    }

    fn line(&self, idx: usize) -> Option<String> {
        self.buffer.line_text(idx)
    }

    fn cursor(&self) -> Position {
        self.cursor
    }

    fn replace(&mut self, start: Position, end: Position, text: &str) -> Result<Position> {
        let after = self.buffer.replace(start, end, text)?;
        let edit = TextEdit::new(start, end, text);
        if self.cursor != start {
            self.cursor = edit.map(self.cursor);
        }
        self.selection = self.selection.map(|(s, e)| (edit.map(s), edit.map(e)));
        Ok(after)
    }

    fn place_cursor(&mut self, pos: Position) {
        self.selection = None;
        self.cursor = self.buffer.clamp(pos);
    }

    fn select(&mut self, start: Position, end: Position) {
        self.selection = Some((start, end));
        self.cursor = end;
    }

    fn signal(&mut self, signal: Signal) {
        self.signals.push(signal);
    }
}

pub struct Session {
    host: BufferHost,
    engine: Engine,
    registry: Registry,
    /// Digits typed while a candidate choice is pending.
    choosing: Option<String>,
}

impl Session {
    pub fn new(config: &Config, registry: Registry) -> Result<Self> {
        Self::with_text(config, registry, "")
    }

    /// Start with `text` in the buffer and the cursor at its end.
    pub fn with_text(config: &Config, registry: Registry, text: &str) -> Result<Self> {
        Ok(Self {
            host: BufferHost::new(Buffer::from_str("session", text)?),
            engine: Engine::new(config),
            registry,
            choosing: None,
        })
    }

    pub fn text(&self) -> String {
        self.host.buffer.text()
    }

    pub fn cursor(&self) -> Position {
        self.host.cursor
    }

    pub fn host(&self) -> &BufferHost {
        &self.host
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut Engine {
        &mut self.engine
    }

    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    pub fn is_choosing(&self) -> bool {
        self.choosing.is_some()
    }

    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        self.engine.take_diagnostics()
    }

    /// Feed keys written in `<Tab>`/`<C-j>` notation.
    pub fn feed(&mut self, keys: &str) -> Result<()> {
        for key in parse_keys(keys)? {
            self.key(&key)?;
        }
        Ok(())
    }

    pub fn key(&mut self, key: &KeyToken) -> Result<()> {
        if self.choosing.is_some() {
            return self.choice_key(key);
        }
        match key {
            KeyToken::Char(c) => self.type_text(c.encode_utf8(&mut [0; 4])),
            KeyToken::Named(named) => self.named_key(*named),
            KeyToken::Chord { base, mods } if *mods == ModMask::CTRL => match base.as_ref() {
                KeyToken::Char('j') => {
                    self.engine.jump_forward(&mut self.host);
                    Ok(())
                }
                KeyToken::Char('k') => {
                    self.engine.jump_backward(&mut self.host);
                    Ok(())
                }
                _ => {
                    debug!(target: "session", "unbound_chord");
                    Ok(())
                }
            },
            KeyToken::Chord { .. } => {
                debug!(target: "session", "unbound_chord");
                Ok(())
            }
        }
    }

    fn named_key(&mut self, key: NamedKey) -> Result<()> {
        match key {
            NamedKey::Enter => self.type_text("\n"),
            NamedKey::Tab => self.expand(),
            NamedKey::Esc => {
                self.engine.escape(&mut self.host);
                Ok(())
            }
            NamedKey::Backspace => self.delete(false),
            NamedKey::Delete => self.delete(true),
            NamedKey::Left
            | NamedKey::Right
            | NamedKey::Up
            | NamedKey::Down
            | NamedKey::Home
            | NamedKey::End => {
                self.move_cursor(key);
                Ok(())
            }
        }
    }

    fn choice_key(&mut self, key: &KeyToken) -> Result<()> {
        match key {
            KeyToken::Char(c) if c.is_ascii_digit() => {
                if let Some(digits) = self.choosing.as_mut() {
                    digits.push(*c);
                }
                Ok(())
            }
            KeyToken::Named(NamedKey::Enter) => {
                let choice = self
                    .choosing
                    .take()
                    .and_then(|d| d.parse().ok())
                    .unwrap_or(0);
                self.choose(choice).map(|_| ())
            }
            KeyToken::Named(NamedKey::Esc) => self.choose(0).map(|_| ()),
            _ => Ok(()),
        }
    }

    /// Answer a pending choice (1-based, 0 cancels).
    pub fn choose(&mut self, choice: usize) -> Result<ExpandOutcome> {
        self.choosing = None;
        self.settle_expand(|engine, host, _| engine.choose(host, choice))
    }

    /// List the snippets available for the word before the cursor and wait
    /// for a choice, as `<Tab>` does for ambiguous triggers.
    pub fn list_available(&mut self) -> Vec<String> {
        let outcome = self.engine.offer_available(&mut self.host, &self.registry);
        if let ExpandOutcome::Choose(_) = outcome {
            self.choosing = Some(String::new());
        }
        self.engine
            .pending()
            .iter()
            .map(|c| c.def.label().to_string())
            .collect()
    }

    fn expand(&mut self) -> Result<()> {
        match self.settle_expand(|engine, host, registry| engine.expand(host, registry))? {
            ExpandOutcome::NoMatch => self.type_text("\t"),
            ExpandOutcome::Choose(_) => {
                self.choosing = Some(String::new());
                Ok(())
            }
            ExpandOutcome::Expanded | ExpandOutcome::Cancelled => Ok(()),
        }
    }

    /// Run an expansion step, downgrading definition errors to a no-op: the
    /// trigger stays in the buffer and the diagnostic is kept by the engine.
    fn settle_expand<F>(&mut self, step: F) -> Result<ExpandOutcome>
    where
        F: FnOnce(&mut Engine, &mut BufferHost, &Registry) -> Result<ExpandOutcome, ExpandError>,
    {
        match step(&mut self.engine, &mut self.host, &self.registry) {
            Ok(outcome) => Ok(outcome),
            Err(ExpandError::Definition { trigger, source }) => {
                warn!(target: "session", trigger = %trigger, error = %source, "expansion_failed");
                Ok(ExpandOutcome::Cancelled)
            }
            Err(err) => Err(err.into()),
        }
    }

    fn type_text(&mut self, text: &str) -> Result<()> {
        let (start, end) = self
            .host
            .selection
            .take()
            .unwrap_or((self.host.cursor, self.host.cursor));
        self.edit(start, end, text)
    }

    fn delete(&mut self, forward: bool) -> Result<()> {
        if let Some((start, end)) = self.host.selection.take() {
            return self.edit(start, end, "");
        }
        let cursor = self.host.cursor;
        let line = self.host.line(cursor.line).unwrap_or_default();
        let (start, end) = if forward {
            if cursor.byte < line.len() {
                (cursor, Position::new(cursor.line, grapheme::next_boundary(&line, cursor.byte)))
            } else if cursor.line + 1 < self.host.line_count() {
                (cursor, Position::new(cursor.line + 1, 0))
            } else {
                return Ok(());
            }
        } else if cursor.byte > 0 {
            (Position::new(cursor.line, grapheme::prev_boundary(&line, cursor.byte)), cursor)
        } else if cursor.line > 0 {
            let prev = self.host.line(cursor.line - 1).unwrap_or_default();
            (Position::new(cursor.line - 1, prev.len()), cursor)
        } else {
            return Ok(());
        };
        self.edit(start, end, "")
    }

    fn edit(&mut self, start: Position, end: Position, text: &str) -> Result<()> {
        self.host.replace(start, end, text)?;
        self.host.cursor = advance(start, text);
        self.engine
            .text_changed(&mut self.host, TextEdit::new(start, end, text))?;
        Ok(())
    }

    fn move_cursor(&mut self, key: NamedKey) {
        let cursor = self.host.cursor;
        let selection = self.host.selection.take();
        let line = self.host.line(cursor.line).unwrap_or_default();
        let next = match (key, selection) {
            (NamedKey::Left, Some((start, _))) => start,
            (NamedKey::Right, Some((_, end))) => end,
            (NamedKey::Left, None) => Position::new(cursor.line, grapheme::prev_boundary(&line, cursor.byte)),
            (NamedKey::Right, None) => Position::new(cursor.line, grapheme::next_boundary(&line, cursor.byte)),
            (NamedKey::Up, _) if cursor.line > 0 => Position::new(cursor.line - 1, cursor.byte),
            (NamedKey::Down, _) if cursor.line + 1 < self.host.line_count() => {
                Position::new(cursor.line + 1, cursor.byte)
            }
            (NamedKey::Home, _) => Position::new(cursor.line, 0),
            (NamedKey::End, _) => Position::new(cursor.line, line.len()),
            _ => cursor,
        };
        self.host.place_cursor(next);
        self.engine.cursor_moved(&mut self.host);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_snippet::SnippetOptions;
    use pretty_assertions::assert_eq;

    fn session(snippets: &[(&str, &str)]) -> Session {
        let mut registry = Registry::new();
        for (trigger, body) in snippets {
            registry
                .add_snippet(trigger, body, "", SnippetOptions::empty())
                .unwrap();
        }
        Session::new(&Config::default(), registry).unwrap()
    }

    #[test]
    fn typing_and_backspace() {
        let mut s = session(&[]);
        s.feed("ab<CR>cd<BS>").unwrap();
        assert_eq!(s.text(), "ab\nc");
        assert_eq!(s.cursor(), Position::new(1, 1));
    }

    #[test]
    fn tab_without_match_inserts_tab() {
        let mut s = session(&[("hallo", "Hallo Welt!")]);
        s.feed("nothing<Tab>").unwrap();
        assert_eq!(s.text(), "nothing\t");
    }

    #[test]
    fn typing_replaces_selection() {
        let mut s = session(&[("test", "${1:Some} end")]);
        s.feed("test<Tab>").unwrap();
        assert_eq!(s.host().selection(), Some((Position::new(0, 0), Position::new(0, 4))));
        s.feed("x").unwrap();
        assert_eq!(s.text(), "x end");
        assert_eq!(s.host().selection(), None);
    }

    #[test]
    fn arrows_clamp_to_lines() {
        let mut s = session(&[]);
        s.feed("abc<Left><Left><Up><Home>z<End>y").unwrap();
        assert_eq!(s.text(), "zabcy");
    }
}
