//! The seam between the engine and whatever owns the text.

use anyhow::Result;
use core_events::Signal;
use core_text::Position;

/// A host buffer the engine reads from and edits.
///
/// Lines are addressed by index and returned without their trailing newline.
/// Every mutation goes through [`Host::replace`]; the engine keeps its own
/// tracked positions in sync from the edits it performs, while edits made by
/// the user are reported back through `Engine::text_changed`.
pub trait Host {
    fn line_count(&self) -> usize;

    fn line(&self, idx: usize) -> Option<String>;

    fn cursor(&self) -> Position;

    /// Replace `[start, end)` with `text`, returning the position just past it.
    fn replace(&mut self, start: Position, end: Position, text: &str) -> Result<Position>;

    fn place_cursor(&mut self, pos: Position);

    /// Select `[start, end)` so the next typed text overwrites it.
    fn select(&mut self, start: Position, end: Position);

    fn signal(&mut self, _signal: Signal) {}

    /// Text of `[start, end)` assembled from whole lines.
    fn slice(&self, start: Position, end: Position) -> String {
        if end <= start {
            return String::new();
        }
        let mut out = String::new();
        for idx in start.line..=end.line {
            let line = self.line(idx).unwrap_or_default();
            let from = if idx == start.line { floor_boundary(&line, start.byte) } else { 0 };
            let to = if idx == end.line { floor_boundary(&line, end.byte) } else { line.len() };
            if let Some(part) = line.get(from..to) {
                out.push_str(part);
            }
            if idx != end.line {
                out.push('\n');
            }
        }
        out
    }
}

/// Largest char boundary of `line` at or before `byte`.
fn floor_boundary(line: &str, byte: usize) -> usize {
    let mut byte = byte.min(line.len());
    while !line.is_char_boundary(byte) {
        byte -= 1;
    }
    byte
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Lines(Vec<String>);

    impl Host for Lines {
        fn line_count(&self) -> usize {
            self.0.len()
        }
        fn line(&self, idx: usize) -> Option<String> {
            self.0.get(idx).cloned()
        }
        fn cursor(&self) -> Position {
            Position::origin()
        }
        fn replace(&mut self, start: Position, _end: Position, _text: &str) -> Result<Position> {
            Ok(start)
        }
        fn place_cursor(&mut self, _pos: Position) {}
        fn select(&mut self, _start: Position, _end: Position) {}
    }

    #[test]
    fn slice_spans_lines() {
        let host = Lines(vec!["abc".into(), "def".into(), "ghi".into()]);
        assert_eq!(host.slice(Position::new(0, 1), Position::new(0, 3)), "bc");
        assert_eq!(host.slice(Position::new(0, 2), Position::new(2, 1)), "c\ndef\ng");
        assert_eq!(host.slice(Position::new(1, 0), Position::new(2, 0)), "def\n");
        assert_eq!(host.slice(Position::new(1, 2), Position::new(1, 2)), "");
    }

    #[test]
    fn slice_clamps_inside_multibyte_chars() {
        let host = Lines(vec!["aéb".into(), "ü".into()]);
        assert_eq!(host.slice(Position::new(0, 2), Position::new(0, 4)), "éb");
        assert_eq!(host.slice(Position::new(0, 0), Position::new(0, 2)), "a");
        assert_eq!(host.slice(Position::new(0, 2), Position::new(1, 1)), "éb\n");
        assert_eq!(host.slice(Position::new(0, 9), Position::new(0, 12)), "");
    }
}
