//! Template parser.
//!
//! Grammar (recursive through tabstop defaults):
//!
//! ```text
//! template    := part*
//! part        := text | tabstop | transform | code
//! tabstop     := '$' digits | '${' digits '}' | '${' digits ':' template '}'
//! transform   := '${' digits '/' pattern '/' replacement '/' flags '}'
//! code        := '`' ['!p' | '!v'] source '`'
//! ```
//!
//! `\``, `\$`, `\{`, `\}` and `\\` escape the next character. A `$` that does
//! not start a placeholder is literal text. Inside a default, braces that are
//! not escaped must balance.
//!
//! After parsing, every tabstop id gets exactly one primary occurrence: the
//! first occurrence carrying a non-empty default in document order, or the
//! first occurrence of any form when none does. All other occurrences become
//! mirrors.

use crate::error::{Result, TemplateError};
use crate::transform::Transformation;
use smallvec::SmallVec;
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::trace;

/// Deepest nesting of tabstop defaults (and of replacement conditionals).
pub const MAX_NESTING: usize = 100;

/// Which backend evaluates a code fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodeLang {
    /// Untagged: a shell command (or a `#!` script).
    Shell,
    /// `!p`: the embedded script language.
    Script,
    /// `!v`: an editor expression.
    EditorExpr,
}

impl CodeLang {
    pub fn tag(self) -> &'static str {
        match self {
            CodeLang::Shell => "",
            CodeLang::Script => "!p",
            CodeLang::EditorExpr => "!v",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeFragment {
    pub lang: CodeLang,
    pub source: String,
    /// Tabstop ids whose changes re-run the fragment.
    pub deps: SmallVec<[u32; 4]>,
}

impl CodeFragment {
    pub fn new(lang: CodeLang, source: impl Into<String>) -> Self {
        let source = source.into();
        let deps = match lang {
            CodeLang::Script => script_deps(&source),
            _ => SmallVec::new(),
        };
        Self { lang, source, deps }
    }
}

/// Collect the literal ids of `t[N]` reads, sorted and deduplicated.
fn script_deps(source: &str) -> SmallVec<[u32; 4]> {
    let chars: Vec<char> = source.chars().collect();
    let mut ids = BTreeSet::new();
    for i in 0..chars.len() {
        if chars[i] != 't' || chars.get(i + 1) != Some(&'[') {
            continue;
        }
        if i > 0 && (chars[i - 1].is_alphanumeric() || chars[i - 1] == '_' || chars[i - 1] == '.')
        {
            continue;
        }
        let mut j = i + 2;
        let mut n: u32 = 0;
        while let Some(d) = chars.get(j).and_then(|c| c.to_digit(10)) {
            n = n.saturating_mul(10).saturating_add(d);
            j += 1;
        }
        if j > i + 2 && chars.get(j) == Some(&']') {
            ids.insert(n);
        }
    }
    ids.into_iter().collect()
}

/// A resolved template node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Text(String),
    /// The primary occurrence of a tabstop; `children` is its default.
    Tabstop { id: u32, children: Vec<Node> },
    Mirror { id: u32 },
    Transform { id: u32, transform: Transformation },
    Code(CodeFragment),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Template {
    pub nodes: Vec<Node>,
}

impl Template {
    pub fn parse(src: &str) -> Result<Self> {
        let mut parser = Parser::new(src);
        let raw = parser.parse_seq(None)?;
        let nodes = resolve(raw)?;
        trace!(target: "snippet.parse", chars = parser.chars.len(), nodes = nodes.len(), "template_parsed");
        Ok(Self { nodes })
    }

    /// Ids of all primary tabstops, ascending.
    pub fn tabstop_ids(&self) -> BTreeSet<u32> {
        fn walk(nodes: &[Node], out: &mut BTreeSet<u32>) {
            for node in nodes {
                if let Node::Tabstop { id, children } = node {
                    out.insert(*id);
                    walk(children, out);
                }
            }
        }
        let mut out = BTreeSet::new();
        walk(&self.nodes, &mut out);
        out
    }

    /// Text of the template with every tabstop at its default and every
    /// mirror, transformation and code fragment left empty.
    pub fn skeleton(&self) -> String {
        fn walk(nodes: &[Node], out: &mut String) {
            for node in nodes {
                match node {
                    Node::Text(t) => out.push_str(t),
                    Node::Tabstop { children, .. } => walk(children, out),
                    _ => {}
                }
            }
        }
        let mut out = String::new();
        walk(&self.nodes, &mut out);
        out
    }
}

#[derive(Debug)]
enum Raw {
    Text(String),
    Tabstop {
        serial: usize,
        id: u32,
        children: Vec<Raw>,
    },
    Transform {
        id: u32,
        transform: Transformation,
    },
    Code(CodeFragment),
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
    serial: usize,
    nesting: usize,
}

impl Parser {
    fn new(src: &str) -> Self {
        Self {
            chars: src.chars().collect(),
            pos: 0,
            serial: 0,
            nesting: 0,
        }
    }

    fn peek(&self, ahead: usize) -> Option<char> {
        self.chars.get(self.pos + ahead).copied()
    }

    fn read_number(&mut self) -> Option<u32> {
        let start = self.pos;
        let mut n: u32 = 0;
        while let Some(d) = self.peek(0).and_then(|c| c.to_digit(10)) {
            n = n.saturating_mul(10).saturating_add(d);
            self.pos += 1;
        }
        (self.pos > start).then_some(n)
    }

    fn next_serial(&mut self) -> usize {
        self.serial += 1;
        self.serial
    }

    /// Parse until end of input, or until the `}` closing the default opened at
    /// `open` when nested.
    fn parse_seq(&mut self, open: Option<usize>) -> Result<Vec<Raw>> {
        let mut out = Vec::new();
        let mut text = String::new();
        let mut depth = 0usize;
        loop {
            let Some(c) = self.peek(0) else {
                if let Some(offset) = open {
                    return Err(TemplateError::UnterminatedPlaceholder { offset });
                }
                break;
            };
            match c {
                '\\' => match self.peek(1) {
                    Some(e @ ('`' | '$' | '{' | '}' | '\\')) => {
                        text.push(e);
                        self.pos += 2;
                    }
                    _ => {
                        text.push('\\');
                        self.pos += 1;
                    }
                },
                '$' => {
                    let start = self.pos;
                    match self.placeholder()? {
                        Some(node) => {
                            flush(&mut text, &mut out);
                            out.push(node);
                        }
                        None => {
                            self.pos = start + 1;
                            text.push('$');
                        }
                    }
                }
                '`' => {
                    let node = self.code()?;
                    flush(&mut text, &mut out);
                    out.push(node);
                }
                '{' if open.is_some() => {
                    depth += 1;
                    text.push('{');
                    self.pos += 1;
                }
                '}' if open.is_some() => {
                    self.pos += 1;
                    if depth == 0 {
                        break;
                    }
                    depth -= 1;
                    text.push('}');
                }
                other => {
                    text.push(other);
                    self.pos += 1;
                }
            }
        }
        flush(&mut text, &mut out);
        Ok(out)
    }

    /// Positioned on a `$`. Returns `None` (without consuming) when the dollar
    /// does not introduce a placeholder.
    fn placeholder(&mut self) -> Result<Option<Raw>> {
        let open = self.pos;
        self.pos += 1;
        if self.peek(0).is_some_and(|c| c.is_ascii_digit()) {
            let Some(id) = self.read_number() else {
                return Ok(None);
            };
            let serial = self.next_serial();
            return Ok(Some(Raw::Tabstop {
                serial,
                id,
                children: Vec::new(),
            }));
        }
        if self.peek(0) != Some('{') {
            return Ok(None);
        }
        self.pos += 1;
        let Some(id) = self.read_number() else {
            return Ok(None);
        };
        match self.peek(0) {
            Some('}') => {
                self.pos += 1;
                let serial = self.next_serial();
                Ok(Some(Raw::Tabstop {
                    serial,
                    id,
                    children: Vec::new(),
                }))
            }
            Some(':') => {
                self.pos += 1;
                if self.nesting >= MAX_NESTING {
                    return Err(TemplateError::TooDeep { limit: MAX_NESTING });
                }
                let serial = self.next_serial();
                self.nesting += 1;
                let children = self.parse_seq(Some(open))?;
                self.nesting -= 1;
                Ok(Some(Raw::Tabstop {
                    serial,
                    id,
                    children,
                }))
            }
            Some('/') => {
                self.pos += 1;
                let pattern = self.delimited('/', open)?;
                let replacement = self.delimited('/', open)?;
                let flags = self.delimited('}', open)?;
                let transform = Transformation::parse(&pattern, &replacement, &flags)?;
                Ok(Some(Raw::Transform { id, transform }))
            }
            _ => Ok(None),
        }
    }

    /// Read up to an unescaped `stop`. `\/` becomes `/`; other escapes are kept
    /// for the regex and replacement parsers.
    fn delimited(&mut self, stop: char, open: usize) -> Result<String> {
        let mut out = String::new();
        loop {
            let Some(c) = self.peek(0) else {
                return Err(TemplateError::UnterminatedTransformation { offset: open });
            };
            self.pos += 1;
            if c == stop {
                return Ok(out);
            }
            if c == '\\'
                && let Some(n) = self.peek(0)
            {
                self.pos += 1;
                if n == '/' {
                    out.push('/');
                } else {
                    out.push('\\');
                    out.push(n);
                }
                continue;
            }
            out.push(c);
        }
    }

    fn code(&mut self) -> Result<Raw> {
        let open = self.pos;
        self.pos += 1;
        let mut body = String::new();
        loop {
            let Some(c) = self.peek(0) else {
                return Err(TemplateError::UnterminatedCode { offset: open });
            };
            self.pos += 1;
            match c {
                '`' => break,
                '\\' if self.peek(0) == Some('`') => {
                    body.push('`');
                    self.pos += 1;
                }
                other => body.push(other),
            }
        }
        let (lang, source) = if let Some(rest) = body.strip_prefix("!p") {
            (CodeLang::Script, strip_one_space(rest))
        } else if let Some(rest) = body.strip_prefix("!v") {
            (CodeLang::EditorExpr, strip_one_space(rest))
        } else {
            (CodeLang::Shell, body.as_str())
        };
        Ok(Raw::Code(CodeFragment::new(lang, source)))
    }
}

fn strip_one_space(s: &str) -> &str {
    s.strip_prefix([' ', '\n', '\t']).unwrap_or(s)
}

fn flush(text: &mut String, out: &mut Vec<Raw>) {
    if !text.is_empty() {
        out.push(Raw::Text(std::mem::take(text)));
    }
}

fn resolve(raw: Vec<Raw>) -> Result<Vec<Node>> {
    // Pass 1: first occurrence with a default per id, skipping demoted subtrees.
    fn with_default(nodes: &[Raw], primaries: &mut HashMap<u32, usize>) {
        for node in nodes {
            if let Raw::Tabstop {
                serial,
                id,
                children,
            } = node
                && !children.is_empty()
                && !primaries.contains_key(id)
            {
                primaries.insert(*id, *serial);
                with_default(children, primaries);
            }
        }
    }
    // Pass 2: ids without a default take their first occurrence of any form.
    fn first_seen(nodes: &[Raw], primaries: &mut HashMap<u32, usize>, defaulted: &HashSet<u32>) {
        for node in nodes {
            let Raw::Tabstop {
                serial,
                id,
                children,
            } = node
            else {
                continue;
            };
            if !children.is_empty() {
                if primaries.get(id) == Some(serial) {
                    first_seen(children, primaries, defaulted);
                }
            } else if !defaulted.contains(id) && !primaries.contains_key(id) {
                primaries.insert(*id, *serial);
            }
        }
    }
    fn convert(nodes: Vec<Raw>, primaries: &HashMap<u32, usize>) -> Result<Vec<Node>> {
        let mut out = Vec::with_capacity(nodes.len());
        for node in nodes {
            out.push(match node {
                Raw::Text(t) => Node::Text(t),
                Raw::Tabstop {
                    serial,
                    id,
                    children,
                    ..
                } => {
                    if primaries.get(&id) == Some(&serial) {
                        Node::Tabstop {
                            id,
                            children: convert(children, primaries)?,
                        }
                    } else {
                        Node::Mirror { id }
                    }
                }
                Raw::Transform { id, transform } => {
                    if !primaries.contains_key(&id) {
                        return Err(TemplateError::UnknownTabstop(id));
                    }
                    Node::Transform { id, transform }
                }
                Raw::Code(code) => Node::Code(code),
            });
        }
        Ok(out)
    }

    let mut primaries = HashMap::new();
    with_default(&raw, &mut primaries);
    let defaulted: HashSet<u32> = primaries.keys().copied().collect();
    first_seen(&raw, &mut primaries, &defaulted);
    convert(raw, &primaries)
}
