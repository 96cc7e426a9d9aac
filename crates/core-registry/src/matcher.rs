//! Trigger matching strategies.
//!
//! Every definition gets one [`Matcher`] when it is registered. Matching looks
//! only at the text of the current line before the cursor.

use core_snippet::{SnippetDef, SnippetOptions, TemplateError};
use core_text::grapheme::is_word_char;
use regex::Regex;

/// Result of a successful match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerMatch {
    /// Byte offset into the text before the cursor where the trigger starts.
    pub start: usize,
    /// Regex captures (index 0 is the whole trigger); empty for literal triggers.
    pub captures: Vec<Option<String>>,
}

#[derive(Debug, Clone)]
pub enum Strategy {
    /// The whitespace-delimited word(s) ending at the cursor equal the trigger.
    Word,
    /// The text ends with the trigger.
    InWord,
    /// The text ends with the trigger and the character before it is not a word character.
    WordBoundary,
    /// The pattern matches and ends exactly at the cursor.
    Regex(Regex),
}

#[derive(Debug, Clone)]
pub struct Matcher {
    pub strategy: Strategy,
    pub line_start_only: bool,
}

impl Matcher {
    pub fn for_def(def: &SnippetDef) -> Result<Self, TemplateError> {
        let o = def.options;
        let strategy = if o.contains(SnippetOptions::REGEX) {
            let anchored = format!("(?:{})$", def.trigger);
            let re = Regex::new(&anchored).map_err(|e| TemplateError::InvalidTrigger {
                pattern: def.trigger.clone(),
                reason: e.to_string(),
            })?;
            Strategy::Regex(re)
        } else if o.contains(SnippetOptions::IN_WORD) {
            Strategy::InWord
        } else if o.contains(SnippetOptions::WORD_BOUNDARY) {
            Strategy::WordBoundary
        } else {
            Strategy::Word
        };
        Ok(Self {
            strategy,
            line_start_only: o.contains(SnippetOptions::BEGINNING_OF_LINE),
        })
    }

    pub fn matches(&self, trigger: &str, before: &str) -> Option<TriggerMatch> {
        let found = match &self.strategy {
            Strategy::Word => {
                let start = words_start(before, trigger.split_whitespace().count().max(1));
                (&before[start..] == trigger).then(|| literal(start))
            }
            Strategy::InWord => before
                .strip_suffix(trigger)
                .map(|prefix| literal(prefix.len())),
            Strategy::WordBoundary => before.strip_suffix(trigger).and_then(|prefix| {
                let boundary = prefix.chars().next_back().is_none_or(|c| !is_word_char(c));
                boundary.then(|| literal(prefix.len()))
            }),
            Strategy::Regex(re) => re.captures(before).and_then(|caps| {
                let whole = caps.get(0)?;
                Some(TriggerMatch {
                    start: whole.start(),
                    captures: caps
                        .iter()
                        .map(|m| m.map(|m| m.as_str().to_string()))
                        .collect(),
                })
            }),
        }?;
        if self.line_start_only && !before[..found.start].chars().all(char::is_whitespace) {
            return None;
        }
        Some(found)
    }
}

fn literal(start: usize) -> TriggerMatch {
    TriggerMatch {
        start,
        captures: Vec::new(),
    }
}

/// Byte offset where the last `count` whitespace-separated words begin.
/// Trailing whitespace yields an empty word at the end.
pub fn words_start(before: &str, count: usize) -> usize {
    let mut idx = before.len();
    for n in 0..count {
        if n > 0 {
            idx = before[..idx].trim_end().len();
        }
        idx = before[..idx]
            .char_indices()
            .rev()
            .find(|(_, c)| c.is_whitespace())
            .map(|(i, c)| i + c.len_utf8())
            .unwrap_or(0);
    }
    idx
}
