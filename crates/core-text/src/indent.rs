//! Column arithmetic for leading whitespace.

/// The whitespace prefix of `line` (spaces and tabs only).
pub fn leading(line: &str) -> &str {
    let end = line
        .find(|c: char| c != ' ' && c != '\t')
        .unwrap_or(line.len());
    &line[..end]
}

/// Visual width of `ws`; a tab advances to the next multiple of `tabstop`.
pub fn width(ws: &str, tabstop: usize) -> usize {
    let ts = tabstop.max(1);
    ws.chars().fold(0, |col, c| match c {
        '\t' => (col / ts + 1) * ts,
        _ => col + 1,
    })
}

/// Whitespace covering `cols` columns: spaces under `expandtab`, otherwise as
/// many tabs as fit followed by spaces.
pub fn render(cols: usize, tabstop: usize, expandtab: bool) -> String {
    if expandtab || tabstop == 0 {
        return " ".repeat(cols);
    }
    let mut s = "\t".repeat(cols / tabstop);
    s.push_str(&" ".repeat(cols % tabstop));
    s
}
