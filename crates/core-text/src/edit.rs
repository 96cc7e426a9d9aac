//! Edit arithmetic for tracked positions.
//!
//! A `TextEdit` describes "replace `[start, end)` with some text". Once the
//! replacement is known, every other position in the buffer can be mapped to
//! its new location without looking at the buffer again: positions before the
//! edit stay put, positions at or after `end` move by the line delta (or, on
//! the edit's last line, by the byte delta).

use crate::Position;

/// Position just past `text` when it is inserted at `start`.
pub fn advance(start: Position, text: &str) -> Position {
    match text.rfind('\n') {
        None => Position::new(start.line, start.byte + text.len()),
        Some(idx) => {
            let lines = text.matches('\n').count();
            Position::new(start.line + lines, text.len() - idx - 1)
        }
    }
}

/// A single replacement of `[start, end)` whose new text ends at `inserted_end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextEdit {
    pub start: Position,
    pub end: Position,
    pub inserted_end: Position,
}

impl TextEdit {
    pub fn new(start: Position, end: Position, text: &str) -> Self {
        Self {
            start,
            end,
            inserted_end: advance(start, text),
        }
    }

    /// Pure insertion at `at`.
    pub fn insert(at: Position, text: &str) -> Self {
        Self::new(at, at, text)
    }

    /// Pure deletion of `[start, end)`.
    pub fn delete(start: Position, end: Position) -> Self {
        Self::new(start, end, "")
    }

    pub fn is_noop(&self) -> bool {
        self.start == self.end && self.start == self.inserted_end
    }

    /// Move a position located at or after `end` past the replacement.
    pub fn shift(&self, p: Position) -> Position {
        if p.line == self.end.line {
            Position::new(
                self.inserted_end.line,
                self.inserted_end.byte + p.byte.saturating_sub(self.end.byte),
            )
        } else {
            let line = p.line.saturating_sub(self.end.line) + self.inserted_end.line;
            Position::new(line, p.byte)
        }
    }

    /// Map any position. Positions at or after `end` shift, positions at or before
    /// `start` stay, positions inside the replaced span collapse onto `start`.
    pub fn map(&self, p: Position) -> Position {
        if p >= self.end {
            self.shift(p)
        } else if p <= self.start {
            p
        } else {
            self.start
        }
    }

    /// Does the closed span `[a, b]` touch the replaced region (boundaries included)?
    pub fn touches(&self, a: Position, b: Position) -> bool {
        b >= self.start && a <= self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_single_and_multi_line() {
        assert_eq!(advance(Position::new(2, 3), "abc"), Position::new(2, 6));
        assert_eq!(advance(Position::new(2, 3), "a\nbc"), Position::new(3, 2));
        assert_eq!(advance(Position::new(0, 0), "\n"), Position::new(1, 0));
    }

    #[test]
    fn shift_on_same_line() {
        let e = TextEdit::new(Position::new(0, 2), Position::new(0, 4), "xyz");
        assert_eq!(e.map(Position::new(0, 6)), Position::new(0, 7));
        assert_eq!(e.map(Position::new(1, 6)), Position::new(1, 6));
    }

    #[test]
    fn shift_with_inserted_newline() {
        let e = TextEdit::insert(Position::new(0, 2), "a\nb");
        assert_eq!(e.map(Position::new(0, 5)), Position::new(1, 4));
        assert_eq!(e.map(Position::new(3, 1)), Position::new(4, 1));
        assert_eq!(e.map(Position::new(0, 1)), Position::new(0, 1));
    }

    #[test]
    fn insertion_point_itself_shifts() {
        let e = TextEdit::insert(Position::new(0, 2), "ab");
        assert_eq!(e.map(Position::new(0, 2)), Position::new(0, 4));
    }

    #[test]
    fn deleted_span_collapses() {
        let e = TextEdit::delete(Position::new(0, 2), Position::new(1, 3));
        assert_eq!(e.map(Position::new(1, 0)), Position::new(0, 2));
        assert_eq!(e.map(Position::new(1, 5)), Position::new(0, 4));
        assert_eq!(e.map(Position::new(2, 5)), Position::new(1, 5));
        assert_eq!(e.map(Position::new(0, 2)), Position::new(0, 2));
    }

    #[test]
    fn touches_is_closed() {
        let e = TextEdit::insert(Position::new(0, 5), "x");
        assert!(e.touches(Position::new(0, 1), Position::new(0, 5)));
        assert!(e.touches(Position::new(0, 5), Position::new(0, 9)));
        assert!(!e.touches(Position::new(0, 6), Position::new(0, 9)));
    }
}
