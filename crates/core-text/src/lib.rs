//! Rope-based text buffer and position arithmetic.
//!
//! The snippet engine never owns buffer storage; it talks to a host through
//! positions expressed as (line index, byte offset within that line). This
//! crate provides that coordinate type, the `TextEdit` arithmetic used to
//! keep tracked ranges in sync with edits, and a `ropey` backed `Buffer` the
//! session simulator and the binary use as their host buffer.

use anyhow::{Result, bail};
use ropey::Rope;

pub mod edit;
pub mod indent;

pub use edit::{TextEdit, advance};

/// A text buffer backed by a `ropey::Rope`.
#[derive(Clone)]
pub struct Buffer {
    rope: Rope,
    pub name: String,
}

/// A position inside a buffer expressed as (line index, byte offset within that line).
///
/// Ordering is lexicographic (line first), which is the document order the
/// engine relies on when comparing tracked ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Position {
    pub line: usize,
    pub byte: usize,
}

impl Position {
    pub fn new(line: usize, byte: usize) -> Self {
        Self { line, byte }
    }
    pub fn origin() -> Self {
        Self { line: 0, byte: 0 }
    }
    pub fn clamp_to<F>(&mut self, line_count: usize, mut line_len_fn: F)
    where
        F: FnMut(usize) -> usize,
    {
        if line_count == 0 {
            self.line = 0;
            self.byte = 0;
            return;
        }
        if self.line >= line_count {
            self.line = line_count - 1;
        }
        let max_len = line_len_fn(self.line);
        if self.byte > max_len {
            self.byte = max_len;
        }
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.byte)
    }
}

impl Buffer {
    /// Construct a buffer from an in-memory string slice.
    pub fn from_str(name: impl Into<String>, content: &str) -> Result<Self> {
        Ok(Self {
            rope: Rope::from_str(content),
            name: name.into(),
        })
    }

    /// Total number of lines in the buffer.
    pub fn line_count(&self) -> usize {
        self.rope.len_lines()
    }

    /// Return the requested line as an owned `String` (including trailing newline if present).
    pub fn line(&self, idx: usize) -> Option<String> {
        if idx < self.rope.len_lines() {
            Some(self.rope.line(idx).to_string())
        } else {
            None
        }
    }

    /// Line content without its trailing newline.
    pub fn line_text(&self, idx: usize) -> Option<String> {
        let mut s = self.line(idx)?;
        if s.ends_with('\n') {
            s.pop();
        }
        Some(s)
    }

    /// Byte length of a line (excluding any newline) for clamping purposes.
    pub fn line_byte_len(&self, idx: usize) -> usize {
        self.line_text(idx).map(|s| s.len()).unwrap_or(0)
    }

    /// Whole buffer contents.
    pub fn text(&self) -> String {
        self.rope.to_string()
    }

    /// Position just past the last character.
    pub fn end_position(&self) -> Position {
        let last = self.line_count().saturating_sub(1);
        Position::new(last, self.line_byte_len(last))
    }

    /// Clamp a position onto an existing line and within its byte length.
    pub fn clamp(&self, mut pos: Position) -> Position {
        pos.clamp_to(self.line_count(), |l| self.line_byte_len(l));
        pos
    }

    fn char_index(&self, pos: Position) -> Result<usize> {
        if pos.line >= self.rope.len_lines() {
            bail!("line {} out of range ({} lines)", pos.line, self.rope.len_lines());
        }
        let line = self.line_text(pos.line).unwrap_or_default();
        if pos.byte > line.len() || !line.is_char_boundary(pos.byte) {
            bail!("byte {} is not a boundary on line {}", pos.byte, pos.line);
        }
        let line_start_char = self.rope.line_to_char(pos.line);
        Ok(line_start_char + line[..pos.byte].chars().count())
    }

    /// Text in the half-open range `[start, end)`.
    pub fn slice(&self, start: Position, end: Position) -> Result<String> {
        if end <= start {
            return Ok(String::new());
        }
        let s = self.char_index(start)?;
        let e = self.char_index(end)?;
        Ok(self.rope.slice(s..e).to_string())
    }

    /// Replace `[start, end)` with `text`, returning the position just past the
    /// inserted text.
    pub fn replace(&mut self, start: Position, end: Position, text: &str) -> Result<Position> {
        let s = self.char_index(start)?;
        let e = self.char_index(end.max(start))?;
        if e > s {
            self.rope.remove(s..e);
        }
        if !text.is_empty() {
            self.rope.insert(s, text);
        }
        Ok(advance(start, text))
    }

    /// Delete the grapheme cluster before the position (like backspace). At the start
    /// of a line the newline separating it from the previous line is removed.
    /// Returns the removed range.
    pub fn delete_grapheme_before(&mut self, pos: Position) -> Result<Option<(Position, Position)>> {
        if pos.line == 0 && pos.byte == 0 {
            return Ok(None);
        }
        let start = if pos.byte == 0 {
            Position::new(pos.line - 1, self.line_byte_len(pos.line - 1))
        } else {
            let line = self.line_text(pos.line).unwrap_or_default();
            Position::new(pos.line, grapheme::prev_boundary(&line, pos.byte))
        };
        self.replace(start, pos, "")?;
        Ok(Some((start, pos)))
    }
}

/// Grapheme and width utilities. These are pure helpers operating on a single line.
pub mod grapheme {
    use unicode_segmentation::UnicodeSegmentation;
    use unicode_width::UnicodeWidthStr;

    /// Previous grapheme boundary (returns 0 if already at or below 1st boundary).
    pub fn prev_boundary(line: &str, byte: usize) -> usize {
        if byte == 0 || byte > line.len() {
            return 0;
        }
        let mut last = 0;
        for (idx, _) in line.grapheme_indices(true) {
            if idx >= byte {
                break;
            }
            last = idx;
        }
        last
    }

    /// Next grapheme boundary (returns line.len() if at or beyond end).
    pub fn next_boundary(line: &str, byte: usize) -> usize {
        if byte >= line.len() {
            return line.len();
        }
        for (idx, _) in line.grapheme_indices(true) {
            if idx > byte {
                return idx;
            }
        }
        line.len()
    }

    /// Visual column (terminal cells) up to (but not including) byte offset.
    pub fn visual_col(line: &str, byte: usize) -> usize {
        let mut col = 0;
        for (idx, g) in line.grapheme_indices(true) {
            if idx >= byte {
                break;
            }
            col += g.width();
        }
        col
    }

    /// Word character classification used by trigger matching: alphanumeric or underscore.
    pub fn is_word_char(c: char) -> bool {
        c == '_' || c.is_alphanumeric()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn replace_inside_line() {
        let mut b = Buffer::from_str("t", "hello world").unwrap();
        let end = b
            .replace(Position::new(0, 6), Position::new(0, 11), "there")
            .unwrap();
        assert_eq!(b.text(), "hello there");
        assert_eq!(end, Position::new(0, 11));
    }

    #[test]
    fn replace_with_multiline_text() {
        let mut b = Buffer::from_str("t", "ab").unwrap();
        let end = b
            .replace(Position::new(0, 1), Position::new(0, 1), "x\nyz\n")
            .unwrap();
        assert_eq!(b.text(), "ax\nyz\nb");
        assert_eq!(end, Position::new(2, 0));
    }

    #[test]
    fn replace_across_lines() {
        let mut b = Buffer::from_str("t", "one\ntwo\nthree").unwrap();
        b.replace(Position::new(0, 1), Position::new(2, 2), "-").unwrap();
        assert_eq!(b.text(), "o-ree");
    }

    #[test]
    fn slice_multibyte() {
        let b = Buffer::from_str("t", "aé😀b\nnext").unwrap();
        let s = b.slice(Position::new(0, 1), Position::new(1, 2)).unwrap();
        assert_eq!(s, "é😀b\nne");
    }

    #[test]
    fn rejects_non_boundary() {
        let b = Buffer::from_str("t", "é").unwrap();
        assert!(b.slice(Position::new(0, 0), Position::new(0, 1)).is_err());
    }

    #[test]
    fn delete_grapheme_before_joins_lines() {
        let mut b = Buffer::from_str("t", "ab\ncd").unwrap();
        let removed = b.delete_grapheme_before(Position::new(1, 0)).unwrap();
        assert_eq!(removed, Some((Position::new(0, 2), Position::new(1, 0))));
        assert_eq!(b.text(), "abcd");
    }

    #[test]
    fn delete_grapheme_before_emoji_cluster() {
        let mut b = Buffer::from_str("t", "a😀").unwrap();
        let end = b.line_byte_len(0);
        b.delete_grapheme_before(Position::new(0, end)).unwrap();
        assert_eq!(b.text(), "a");
    }

    #[test]
    fn end_position_tracks_last_line() {
        let b = Buffer::from_str("t", "x\nyz").unwrap();
        assert_eq!(b.end_position(), Position::new(1, 2));
        let empty = Buffer::from_str("t", "").unwrap();
        assert_eq!(empty.end_position(), Position::origin());
    }

    #[test]
    fn position_orders_by_line_then_byte() {
        assert!(Position::new(0, 9) < Position::new(1, 0));
        assert!(Position::new(2, 1) < Position::new(2, 3));
    }

    #[test]
    fn grapheme_combining_mark() {
        let s = "e\u{301}x";
        let nb = grapheme::next_boundary(s, 0);
        assert_eq!(nb, 3);
        assert_eq!(grapheme::prev_boundary(s, nb), 0);
    }

    #[test]
    fn visual_col_counts_wide_cells() {
        assert_eq!(grapheme::visual_col("漢x", 3), 2);
        assert_eq!(grapheme::visual_col("ab", 1), 1);
    }

    #[test]
    fn word_classification() {
        assert!(grapheme::is_word_char('ä'));
        assert!(grapheme::is_word_char('_'));
        assert!(!grapheme::is_word_char('-'));
    }
}
