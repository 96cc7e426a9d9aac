//! Vim-style key notation: `hallo<Tab>world<C-j><Esc>`.
//!
//! Plain characters map to `KeyToken::Char`; `<...>` groups name special keys
//! or chords. A literal `<` is written `<lt>`; a `<` that does not start a
//! recognised group is taken literally as well.

use crate::{KeyToken, ModMask, NamedKey};
use thiserror::Error;
use tracing::trace;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NotationError {
    #[error("unknown key name '<{0}>'")]
    UnknownKey(String),
}

fn named(name: &str) -> Option<KeyToken> {
    let key = match name.to_ascii_lowercase().as_str() {
        "cr" | "enter" | "return" => NamedKey::Enter,
        "esc" => NamedKey::Esc,
        "bs" | "backspace" => NamedKey::Backspace,
        "tab" => NamedKey::Tab,
        "up" => NamedKey::Up,
        "down" => NamedKey::Down,
        "left" => NamedKey::Left,
        "right" => NamedKey::Right,
        "home" => NamedKey::Home,
        "end" => NamedKey::End,
        "del" | "delete" => NamedKey::Delete,
        "lt" => return Some(KeyToken::Char('<')),
        "space" => return Some(KeyToken::Char(' ')),
        _ => return None,
    };
    Some(KeyToken::Named(key))
}

fn chord(body: &str) -> Result<KeyToken, NotationError> {
    let mut mods = ModMask::empty();
    let mut rest = body;
    while rest.len() > 2 && rest.as_bytes()[1] == b'-' {
        match rest.as_bytes()[0].to_ascii_uppercase() {
            b'C' => mods |= ModMask::CTRL,
            b'A' | b'M' => mods |= ModMask::ALT,
            b'S' => mods |= ModMask::SHIFT,
            _ => return Err(NotationError::UnknownKey(body.to_string())),
        }
        rest = &rest[2..];
    }
    let base = if rest.chars().count() == 1 {
        rest.chars()
            .next()
            .map(KeyToken::Char)
            .ok_or_else(|| NotationError::UnknownKey(body.to_string()))?
    } else {
        named(rest).ok_or_else(|| NotationError::UnknownKey(body.to_string()))?
    };
    if mods.is_empty() {
        return Ok(base);
    }
    Ok(KeyToken::Chord {
        base: Box::new(base),
        mods,
    })
}

/// Parse a notation string into key tokens.
pub fn parse_keys(input: &str) -> Result<Vec<KeyToken>, NotationError> {
    let mut out = Vec::new();
    let mut rest = input;
    while let Some(c) = rest.chars().next() {
        if c == '<'
            && let Some(close) = rest.find('>')
            && close > 1
            && !rest[1..close].contains('<')
        {
            let body = &rest[1..close];
            out.push(chord(body)?);
            rest = &rest[close + 1..];
            continue;
        }
        out.push(match c {
            '\n' => KeyToken::Named(NamedKey::Enter),
            '\t' => KeyToken::Named(NamedKey::Tab),
            other => KeyToken::Char(other),
        });
        rest = &rest[c.len_utf8()..];
    }
    trace!(target: "input.notation", tokens = out.len(), "parsed_keys");
    Ok(out)
}
