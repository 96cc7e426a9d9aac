//! Event types exchanged between the snippet engine and its host.
//!
//! Three families live here so every crate can share them without cycles:
//! * `KeyToken` input tokens (plus the `<Tab>`/`<C-j>` notation parser used by
//!   the binary and the session tests),
//! * `Signal` notifications the engine emits towards the host,
//! * `Diagnostic` values for non-fatal problems (snippet file parse errors,
//!   failing code fragments).

use core_text::Position;
use std::fmt;

pub mod notation;

pub use notation::{NotationError, parse_keys};

// -------------------------------------------------------------------------------------------------
// Input tokens
// -------------------------------------------------------------------------------------------------

bitflags::bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct ModMask: u16 { const CTRL=1; const ALT=2; const SHIFT=4; }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamedKey {
    Enter,
    Esc,
    Backspace,
    Tab,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    Delete,
}

/// Logical key tokens fed into a session.
///
/// `KeyToken::Chord` wraps a base token plus modifier mask so combinations such
/// as `<C-j>` survive without ad-hoc encodings.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyToken {
    Char(char),
    Named(NamedKey),
    Chord { base: Box<KeyToken>, mods: ModMask },
}

impl KeyToken {
    pub fn ctrl(c: char) -> Self {
        KeyToken::Chord {
            base: Box::new(KeyToken::Char(c)),
            mods: ModMask::CTRL,
        }
    }
}

// -------------------------------------------------------------------------------------------------
// Signals (engine -> host)
// -------------------------------------------------------------------------------------------------

/// Notifications emitted while the engine drives the host buffer.
///
/// Payloads never carry buffer text: only positions, lengths and ids, so hosts
/// can log them freely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    /// The engine replaced `[start, end)` with `len` bytes of text.
    TextInserted {
        start: Position,
        end: Position,
        len: usize,
    },
    /// Cursor placed without selection.
    CursorPlaced(Position),
    /// A tabstop span was selected so the next keystroke replaces it.
    Selected { start: Position, end: Position },
    /// A trigger resolved to several candidates; the host must answer with a choice.
    CandidatesOffered { count: usize },
    /// The instance at `depth` (0 = outermost) left snippet mode.
    SnippetExited { depth: usize },
}

// -------------------------------------------------------------------------------------------------
// Diagnostics
// -------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

/// A non-fatal problem reported to the host. `source`/`line` locate snippet file
/// problems; runtime problems (code fragments) leave them empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub source: Option<String>,
    pub line: Option<usize>,
    pub message: String,
}

impl Diagnostic {
    /// Snippet-file diagnostic carrying its file + 1-based line.
    pub fn in_file(source: impl Into<String>, line: usize, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            source: Some(source.into()),
            line: Some(line),
            message: message.into(),
        }
    }

    pub fn runtime(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            source: None,
            line: None,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.source, self.line) {
            (Some(source), Some(line)) => write!(f, "{} in {}({})", self.message, source, line),
            _ => f.write_str(&self.message),
        }
    }
}
