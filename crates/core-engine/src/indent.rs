//! Indentation of inserted template text.
//!
//! Template lines after the first inherit the indentation of the line the
//! trigger sits on. With `expandtab` the leading whitespace of every line is
//! re-rendered as spaces covering the same columns and tabs elsewhere become
//! `tabstop` spaces. Code fragment output bypasses all of this.

use core_config::IndentConfig;
use core_text::indent;

#[derive(Debug, Clone)]
pub struct IndentNormalizer {
    base: String,
    style: IndentConfig,
}

impl IndentNormalizer {
    pub fn new(base: &str, style: IndentConfig) -> Self {
        Self {
            base: base.to_string(),
            style,
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// Normalize a chunk of literal template text. `at_line_start` tells
    /// whether the chunk begins where only indentation precedes it.
    pub fn text(&self, chunk: &str, at_line_start: bool) -> String {
        let mut out = String::with_capacity(chunk.len());
        for (i, piece) in chunk.split('\n').enumerate() {
            if i == 0 {
                out.push_str(&self.line(piece, at_line_start));
            } else {
                out.push('\n');
                let mut full = self.base.clone();
                full.push_str(piece);
                out.push_str(&self.line(&full, true));
            }
        }
        out
    }

    fn line(&self, piece: &str, leading: bool) -> String {
        if !self.style.expandtab {
            return piece.to_string();
        }
        let ts = self.style.tabstop.max(1);
        let (lead, rest) = if leading {
            let lead = indent::leading(piece);
            (indent::width(lead, ts), &piece[lead.len()..])
        } else {
            (0, piece)
        };
        let mut out = " ".repeat(lead);
        out.push_str(&rest.replace('\t', &" ".repeat(ts)));
        out
    }
}

/// Move the continuation lines of `text` from one indentation to another:
/// a `from` prefix is stripped where present, then `to` is prepended.
pub fn reindent(text: &str, from: &str, to: &str) -> String {
    if from == to || !text.contains('\n') {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            out.push('\n');
            out.push_str(to);
            out.push_str(line.strip_prefix(from).unwrap_or(line));
        } else {
            out.push_str(line);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn style(tabstop: usize, expandtab: bool) -> IndentConfig {
        IndentConfig {
            tabstop,
            softtabstop: 0,
            shiftwidth: tabstop,
            expandtab,
        }
    }

    #[test]
    fn continuation_lines_get_base() {
        let n = IndentNormalizer::new("\t", style(8, false));
        assert_eq!(n.text("a\nb\n\tc", false), "a\n\tb\n\t\tc");
    }

    #[test]
    fn expandtab_converts_leading_and_interior() {
        let n = IndentNormalizer::new("", style(3, true));
        assert_eq!(n.text("\tBlaahblah \t\t  ", true), "   Blaahblah         ");
    }

    #[test]
    fn expandtab_counts_base_columns() {
        let n = IndentNormalizer::new("\t", style(4, true));
        assert_eq!(n.text("x\n\ty", false), "x\n        y");
        assert_eq!(n.text("  \tz", true), "    z");
    }

    #[test]
    fn reindent_moves_prefix() {
        assert_eq!(reindent("a\n\tb\nc", "\t", "  "), "a\n  b\n  c");
        assert_eq!(reindent("single", "\t", ""), "single");
    }
}
