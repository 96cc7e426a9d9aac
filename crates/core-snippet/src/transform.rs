//! Regex transformations applied to mirrored tabstop text.
//!
//! `${1/pattern/replacement/flags}` parses into a [`Transformation`]. The
//! pattern is only compiled when a snippet is expanded
//! ([`Transformation::compile`]); the resulting [`CompiledTransform`] is what
//! mirrors run on every change of their tabstop.
//!
//! Replacement syntax:
//! * `$n` inserts capture group `n` (empty when it did not participate),
//! * `(?n:then:else)` picks a branch on whether group `n` participated; the
//!   branches nest and may use `\(`, `\)` and `\:` for literal characters,
//! * `\u` / `\l` change the case of the next produced character, `\U` / `\L`
//!   change every character until `\E`,
//! * `\n` and `\t` produce a newline and a tab.

use crate::error::{Result, TemplateError};
use crate::template::MAX_NESTING;
use regex::{Captures, Regex, RegexBuilder};

bitflags::bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct TransformFlags: u8 {
        const GLOBAL = 1;
        const IGNORE_CASE = 2;
        const MULTILINE = 4;
    }
}

impl TransformFlags {
    pub fn parse(flags: &str) -> Result<Self> {
        let mut out = TransformFlags::empty();
        for c in flags.chars() {
            out |= match c {
                'g' => TransformFlags::GLOBAL,
                'i' => TransformFlags::IGNORE_CASE,
                'm' => TransformFlags::MULTILINE,
                other => return Err(TemplateError::UnknownFlag(other)),
            };
        }
        Ok(out)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseDirective {
    UpperNext,
    LowerNext,
    UpperRange,
    LowerRange,
    EndRange,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplacePart {
    Text(String),
    Group(usize),
    Case(CaseDirective),
    Conditional {
        group: usize,
        then: Vec<ReplacePart>,
        otherwise: Vec<ReplacePart>,
    },
}

/// Parsed replacement template.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Replacement {
    pub parts: Vec<ReplacePart>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Branch {
    Top,
    Then,
    Else,
}

impl Replacement {
    pub fn parse(src: &str) -> Result<Self> {
        let chars: Vec<char> = src.chars().collect();
        let mut pos = 0;
        let (parts, _) = parse_parts(&chars, &mut pos, Branch::Top, 0, src)?;
        Ok(Self { parts })
    }

    /// Highest capture group referenced anywhere, including conditionals.
    pub fn max_group(&self) -> Option<usize> {
        fn walk(parts: &[ReplacePart], best: &mut Option<usize>) {
            for part in parts {
                match part {
                    ReplacePart::Group(n) => *best = (*best).max(Some(*n)),
                    ReplacePart::Conditional {
                        group,
                        then,
                        otherwise,
                    } => {
                        *best = (*best).max(Some(*group));
                        walk(then, best);
                        walk(otherwise, best);
                    }
                    _ => {}
                }
            }
        }
        let mut best = None;
        walk(&self.parts, &mut best);
        best
    }

    /// Render the replacement for one match.
    pub fn render(&self, caps: &Captures<'_>) -> String {
        let mut emitter = Emitter::default();
        emitter.emit(&self.parts, caps);
        emitter.out
    }
}

/// Returns the parts and the character that terminated the branch (`:` or `)`).
fn parse_parts(
    chars: &[char],
    pos: &mut usize,
    branch: Branch,
    depth: usize,
    src: &str,
) -> Result<(Vec<ReplacePart>, Option<char>)> {
    let mut parts = Vec::new();
    let mut text = String::new();
    let flush = |text: &mut String, parts: &mut Vec<ReplacePart>| {
        if !text.is_empty() {
            parts.push(ReplacePart::Text(std::mem::take(text)));
        }
    };

    while *pos < chars.len() {
        let c = chars[*pos];
        match c {
            '\\' if *pos + 1 < chars.len() => {
                let next = chars[*pos + 1];
                *pos += 2;
                let directive = match next {
                    'u' => Some(CaseDirective::UpperNext),
                    'l' => Some(CaseDirective::LowerNext),
                    'U' => Some(CaseDirective::UpperRange),
                    'L' => Some(CaseDirective::LowerRange),
                    'E' => Some(CaseDirective::EndRange),
                    _ => None,
                };
                if let Some(d) = directive {
                    flush(&mut text, &mut parts);
                    parts.push(ReplacePart::Case(d));
                    continue;
                }
                match next {
                    'n' => text.push('\n'),
                    't' => text.push('\t'),
                    '(' | ')' | ':' | '\\' | '$' | '/' => text.push(next),
                    other => {
                        text.push('\\');
                        text.push(other);
                    }
                }
            }
            '$' if chars.get(*pos + 1).is_some_and(|d| d.is_ascii_digit()) => {
                *pos += 1;
                let n = read_number(chars, pos);
                flush(&mut text, &mut parts);
                parts.push(ReplacePart::Group(n));
            }
            '(' if chars.get(*pos + 1) == Some(&'?') && conditional_ahead(chars, *pos + 2) => {
                if depth >= MAX_NESTING {
                    return Err(TemplateError::TooDeep { limit: MAX_NESTING });
                }
                *pos += 2;
                let group = read_number(chars, pos);
                *pos += 1; // ':'
                let (then, stop) = parse_parts(chars, pos, Branch::Then, depth + 1, src)?;
                let otherwise = match stop {
                    Some(':') => {
                        let (otherwise, stop) = parse_parts(chars, pos, Branch::Else, depth + 1, src)?;
                        if stop != Some(')') {
                            return Err(TemplateError::UnbalancedConditional(src.to_string()));
                        }
                        otherwise
                    }
                    Some(')') => Vec::new(),
                    _ => return Err(TemplateError::UnbalancedConditional(src.to_string())),
                };
                flush(&mut text, &mut parts);
                parts.push(ReplacePart::Conditional {
                    group,
                    then,
                    otherwise,
                });
            }
            ':' if branch == Branch::Then => {
                *pos += 1;
                flush(&mut text, &mut parts);
                return Ok((parts, Some(':')));
            }
            ')' if branch != Branch::Top => {
                *pos += 1;
                flush(&mut text, &mut parts);
                return Ok((parts, Some(')')));
            }
            _ => {
                text.push(c);
                *pos += 1;
            }
        }
    }
    if branch != Branch::Top {
        return Err(TemplateError::UnbalancedConditional(src.to_string()));
    }
    flush(&mut text, &mut parts);
    Ok((parts, None))
}

fn conditional_ahead(chars: &[char], mut at: usize) -> bool {
    let start = at;
    while chars.get(at).is_some_and(|c| c.is_ascii_digit()) {
        at += 1;
    }
    at > start && chars.get(at) == Some(&':')
}

fn read_number(chars: &[char], pos: &mut usize) -> usize {
    let mut n = 0usize;
    while let Some(d) = chars.get(*pos).and_then(|c| c.to_digit(10)) {
        n = n.saturating_mul(10).saturating_add(d as usize);
        *pos += 1;
    }
    n
}

#[derive(Clone, Copy)]
enum Case {
    Upper,
    Lower,
}

#[derive(Default)]
struct Emitter {
    out: String,
    next: Option<Case>,
    range: Option<Case>,
}

impl Emitter {
    fn emit(&mut self, parts: &[ReplacePart], caps: &Captures<'_>) {
        for part in parts {
            match part {
                ReplacePart::Text(t) => self.push(t),
                ReplacePart::Group(n) => {
                    let s = caps.get(*n).map(|m| m.as_str()).unwrap_or("");
                    self.push(s);
                }
                ReplacePart::Case(d) => match d {
                    CaseDirective::UpperNext => self.next = Some(Case::Upper),
                    CaseDirective::LowerNext => self.next = Some(Case::Lower),
                    CaseDirective::UpperRange => self.range = Some(Case::Upper),
                    CaseDirective::LowerRange => self.range = Some(Case::Lower),
                    CaseDirective::EndRange => self.range = None,
                },
                ReplacePart::Conditional {
                    group,
                    then,
                    otherwise,
                } => {
                    if caps.get(*group).is_some() {
                        self.emit(then, caps);
                    } else {
                        self.emit(otherwise, caps);
                    }
                }
            }
        }
    }

    fn push(&mut self, s: &str) {
        for c in s.chars() {
            match self.next.take().or(self.range) {
                Some(Case::Upper) => self.out.extend(c.to_uppercase()),
                Some(Case::Lower) => self.out.extend(c.to_lowercase()),
                None => self.out.push(c),
            }
        }
    }
}

/// Rewrite `{,n}` quantifiers to `{0,n}`, which the regex engine requires.
pub fn normalize_pattern(pattern: &str) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::with_capacity(pattern.len() + 2);
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == '\\' {
            out.push(c);
            if let Some(&n) = chars.get(i + 1) {
                out.push(n);
            }
            i += 2;
            continue;
        }
        out.push(c);
        if c == '{' && chars.get(i + 1) == Some(&',') {
            let mut j = i + 2;
            while chars.get(j).is_some_and(|d| d.is_ascii_digit()) {
                j += 1;
            }
            if j > i + 2 && chars.get(j) == Some(&'}') {
                out.push('0');
            }
        }
        i += 1;
    }
    out
}

/// A transformation as written in the template; not yet compiled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transformation {
    pub pattern: String,
    pub replacement: Replacement,
    pub flags: TransformFlags,
}

impl Transformation {
    pub fn parse(pattern: &str, replacement: &str, flags: &str) -> Result<Self> {
        Ok(Self {
            pattern: pattern.to_string(),
            replacement: Replacement::parse(replacement)?,
            flags: TransformFlags::parse(flags)?,
        })
    }

    /// Compile the pattern and check every referenced group exists.
    pub fn compile(&self) -> Result<CompiledTransform> {
        let source = normalize_pattern(&self.pattern);
        let regex = RegexBuilder::new(&source)
            .case_insensitive(self.flags.contains(TransformFlags::IGNORE_CASE))
            .multi_line(self.flags.contains(TransformFlags::MULTILINE))
            .build()
            .map_err(|e| TemplateError::InvalidPattern {
                pattern: self.pattern.clone(),
                reason: e.to_string(),
            })?;
        let available = regex.captures_len().saturating_sub(1);
        if let Some(group) = self.replacement.max_group()
            && group > available
        {
            return Err(TemplateError::MissingGroup { group, available });
        }
        Ok(CompiledTransform {
            regex,
            replacement: self.replacement.clone(),
            global: self.flags.contains(TransformFlags::GLOBAL),
        })
    }
}

#[derive(Debug, Clone)]
pub struct CompiledTransform {
    regex: Regex,
    replacement: Replacement,
    global: bool,
}

impl CompiledTransform {
    /// Substitute the first match (every non-overlapping match when global).
    /// Text without a match is returned unchanged.
    pub fn apply(&self, text: &str) -> String {
        let limit = if self.global { usize::MAX } else { 1 };
        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        let mut matched = false;
        for caps in self.regex.captures_iter(text).take(limit) {
            let Some(whole) = caps.get(0) else { continue };
            matched = true;
            out.push_str(&text[last..whole.start()]);
            out.push_str(&self.replacement.render(&caps));
            last = whole.end();
        }
        if !matched {
            return text.to_string();
        }
        out.push_str(&text[last..]);
        out
    }
}
