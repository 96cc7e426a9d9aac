//! Snippet file parser.
//!
//! ```text
//! # comment
//! priority -1
//! extends c, cpp
//! clearsnippets [trigger...]
//! snippet trigger "description" options
//! body
//! endsnippet
//! ```
//!
//! Problems never abort the file: each one becomes a [`Diagnostic`] carrying
//! the file name and 1-based line, and parsing resumes with the next line.

use core_events::Diagnostic;
use core_snippet::{SnippetDef, SnippetOptions};

/// One directive read from a snippet file, in file order.
#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    Snippet { def: SnippetDef, line: usize },
    Extends(Vec<String>),
    Clear(Vec<String>),
}

#[derive(Debug, Default)]
pub struct ParsedFile {
    pub directives: Vec<Directive>,
    pub diagnostics: Vec<Diagnostic>,
}

struct Header {
    trigger: String,
    description: String,
    options: String,
}

/// Split a `snippet` header into trigger, description and options.
fn parse_header(rest: &str) -> Result<Header, String> {
    let mut remain = rest.trim().to_string();
    let mut options = String::new();
    let words: Vec<&str> = remain.split_whitespace().collect();
    if words.len() > 2 {
        let last = words[words.len() - 1];
        let second = words[words.len() - 2];
        if !last.contains('"') && second.ends_with('"') {
            options = last.to_string();
            let cut = remain.len() - last.len();
            remain = remain[..cut].trim_end().to_string();
        }
    }
    let mut description = String::new();
    if remain.split_whitespace().count() > 1
        && remain.ends_with('"')
        && let Some(left) = remain[..remain.len() - 1].rfind('"')
        && left != 0
    {
        description = remain[left + 1..remain.len() - 1].to_string();
        remain = remain[..left].trim_end().to_string();
    }
    let mut trigger = remain.trim().to_string();
    let multiword = trigger.split_whitespace().count() > 1;
    let mut chars = trigger.chars();
    let (first, last) = (chars.next(), chars.next_back());
    let quoted = matches!((first, last), (Some(a), Some(b)) if a == b && !a.is_alphanumeric());
    if multiword && !quoted {
        return Err(format!("Invalid multiword trigger: '{trigger}'"));
    }
    if quoted && (multiword || options.contains('r')) {
        let q = first.map(char::len_utf8).unwrap_or(0);
        trigger = trigger[q..trigger.len() - q].to_string();
    }
    Ok(Header {
        trigger,
        description,
        options,
    })
}

/// Parse `content` of a file called `filename` whose snippets belong to `filetype`.
pub fn parse(filetype: &str, filename: &str, content: &str) -> ParsedFile {
    let lines: Vec<&str> = content.split('\n').collect();
    let mut out = ParsedFile::default();
    let mut priority = 0i64;
    let mut idx = 0;
    while idx < lines.len() {
        let raw = lines[idx].trim_end_matches('\r');
        let line_no = idx + 1;
        idx += 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let (keyword, rest) = trimmed
            .split_once(char::is_whitespace)
            .unwrap_or((trimmed, ""));
        match keyword {
            "snippet" => {
                let header = parse_header(rest);
                let mut body = Vec::new();
                let mut closed = false;
                while idx < lines.len() {
                    let l = lines[idx].trim_end_matches('\r');
                    idx += 1;
                    if l.trim_end() == "endsnippet" {
                        closed = true;
                        break;
                    }
                    body.push(l);
                }
                let header = match header {
                    Ok(h) => h,
                    Err(msg) => {
                        out.diagnostics
                            .push(Diagnostic::in_file(filename, line_no, msg));
                        continue;
                    }
                };
                if !closed {
                    out.diagnostics.push(Diagnostic::in_file(
                        filename,
                        lines.len() + 1,
                        format!("Missing 'endsnippet' for '{}'", header.trigger),
                    ));
                    break;
                }
                let options = SnippetOptions::parse(&header.options);
                match SnippetDef::new(&header.trigger, &body.join("\n"), header.description, options)
                {
                    Ok(def) => out.directives.push(Directive::Snippet {
                        def: def.with_priority(priority).with_filetype(filetype),
                        line: line_no,
                    }),
                    Err(err) => out.diagnostics.push(Diagnostic::in_file(
                        filename,
                        line_no,
                        format!("Invalid snippet '{}': {err}", header.trigger),
                    )),
                }
            }
            "extends" => {
                let fts: Vec<String> = rest
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect();
                if fts.is_empty() {
                    out.diagnostics.push(Diagnostic::in_file(
                        filename,
                        line_no,
                        "'extends' without file types",
                    ));
                } else {
                    out.directives.push(Directive::Extends(fts));
                }
            }
            "clearsnippets" => {
                let triggers = rest.split_whitespace().map(String::from).collect();
                out.directives.push(Directive::Clear(triggers));
            }
            "priority" => match rest.trim().parse::<i64>() {
                Ok(p) => priority = p,
                Err(_) => out.diagnostics.push(Diagnostic::in_file(
                    filename,
                    line_no,
                    format!("Invalid line '{trimmed}'"),
                )),
            },
            _ => out.diagnostics.push(Diagnostic::in_file(
                filename,
                line_no,
                format!("Invalid line '{trimmed}'"),
            )),
        }
    }
    out
}
