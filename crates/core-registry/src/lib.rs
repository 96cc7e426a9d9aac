//! Snippet registry: definitions indexed by filetype, trigger matching and
//! candidate selection.
//!
//! Definitions live in per-filetype tables. A lookup walks the requested
//! filetypes, every filetype they extend (transitively, each visited once)
//! and finally `all`. Among the definitions whose trigger matches the text
//! before the cursor only those with the highest priority survive; they are
//! returned most recently added first.

pub mod file;
pub mod matcher;

pub use file::{Directive, ParsedFile};
pub use matcher::{Matcher, Strategy, TriggerMatch};

use anyhow::{Context, Result};
use core_events::Diagnostic;
use core_snippet::{SnippetDef, SnippetOptions, TemplateError};
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

pub const ALL_FILETYPES: &str = "all";

struct Entry {
    def: Arc<SnippetDef>,
    matcher: Matcher,
    serial: u64,
}

/// An expansion candidate for the text before the cursor.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub def: Arc<SnippetDef>,
    /// Byte offset within the text before the cursor where the trigger starts.
    pub trigger_start: usize,
    /// Regex trigger captures, index 0 being the whole trigger.
    pub captures: Vec<Option<String>>,
}

/// Resolve a 1-based menu choice: 0 cancels, values past the end pick the last entry.
pub fn pick(candidates: &[Candidate], choice: usize) -> Option<&Candidate> {
    if choice == 0 {
        return None;
    }
    candidates.get(choice.min(candidates.len()).checked_sub(1)?)
}

#[derive(Default)]
pub struct Registry {
    tables: HashMap<String, Vec<Entry>>,
    extends: HashMap<String, Vec<String>>,
    serial: u64,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a definition under its filetype. With the overwrite option,
    /// earlier definitions sharing trigger and description are dropped first.
    pub fn add(&mut self, def: SnippetDef) -> Result<(), TemplateError> {
        let matcher = Matcher::for_def(&def)?;
        let table = self.tables.entry(def.filetype.clone()).or_default();
        if def.options.contains(SnippetOptions::OVERWRITE) {
            let before = table.len();
            table.retain(|e| !(e.def.trigger == def.trigger && e.def.description == def.description));
            debug!(target: "registry", removed = before - table.len(), "overwrite_applied");
        }
        self.serial += 1;
        debug!(
            target: "registry",
            filetype = %def.filetype,
            priority = def.priority,
            serial = self.serial,
            "snippet_added"
        );
        table.push(Entry {
            def: Arc::new(def),
            matcher,
            serial: self.serial,
        });
        Ok(())
    }

    /// Parse `body` and register it for `all`.
    pub fn add_snippet(
        &mut self,
        trigger: &str,
        body: &str,
        description: &str,
        options: SnippetOptions,
    ) -> Result<(), TemplateError> {
        self.add(SnippetDef::new(trigger, body, description, options)?)
    }

    /// Declare that `filetype` also offers the snippets of `parents`.
    pub fn extend(&mut self, filetype: &str, parents: &[String]) {
        let list = self.extends.entry(filetype.to_string()).or_default();
        for p in parents {
            if !list.contains(p) {
                list.push(p.clone());
            }
        }
    }

    /// Without triggers, empty the filetype's table; otherwise remove those triggers.
    pub fn clear(&mut self, filetype: &str, triggers: &[String]) {
        let Some(table) = self.tables.get_mut(filetype) else {
            return;
        };
        if triggers.is_empty() {
            table.clear();
        } else {
            table.retain(|e| !triggers.contains(&e.def.trigger));
        }
        debug!(target: "registry", filetype, triggers = triggers.len(), "snippets_cleared");
    }

    /// Apply a snippet file's directives; returns its diagnostics.
    pub fn parse_file(&mut self, filetype: &str, filename: &str, content: &str) -> Vec<Diagnostic> {
        let parsed = file::parse(filetype, filename, content);
        let mut diagnostics = parsed.diagnostics;
        let mut added = 0usize;
        for directive in parsed.directives {
            match directive {
                Directive::Snippet { def, line } => {
                    let trigger = def.trigger.clone();
                    match self.add(def) {
                        Ok(()) => added += 1,
                        Err(err) => diagnostics.push(Diagnostic::in_file(
                            filename,
                            line,
                            format!("Invalid snippet '{trigger}': {err}"),
                        )),
                    }
                }
                Directive::Extends(parents) => self.extend(filetype, &parents),
                Directive::Clear(triggers) => self.clear(filetype, &triggers),
            }
        }
        info!(
            target: "registry.file",
            file = filename,
            filetype,
            added,
            diagnostics = diagnostics.len(),
            "snippet_file_parsed"
        );
        diagnostics
    }

    /// Read and parse a snippet file from disk.
    pub fn load_file(&mut self, filetype: &str, path: &Path) -> Result<Vec<Diagnostic>> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading snippet file {}", path.display()))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(self.parse_file(filetype, &name, &content))
    }

    /// Filetypes consulted for a lookup, most specific first, `all` last.
    pub fn lookup_order(&self, filetypes: &[String]) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut order = Vec::new();
        let mut queue: VecDeque<String> = filetypes.iter().cloned().collect();
        while let Some(ft) = queue.pop_front() {
            if !seen.insert(ft.clone()) {
                continue;
            }
            if let Some(parents) = self.extends.get(&ft) {
                queue.extend(parents.iter().cloned());
            }
            order.push(ft);
        }
        if !seen.contains(ALL_FILETYPES) {
            order.push(ALL_FILETYPES.to_string());
        }
        order
    }

    fn entries<'a>(&'a self, filetypes: &[String]) -> impl Iterator<Item = &'a Entry> + 'a {
        self.lookup_order(filetypes)
            .into_iter()
            .filter_map(|ft| self.tables.get(&ft))
            .flatten()
    }

    /// Candidates for `before` (the current line up to the cursor), most
    /// recent first, restricted to the highest matching priority.
    pub fn select(&self, before: &str, filetypes: &[String]) -> Vec<Candidate> {
        let mut hits: Vec<(&Entry, TriggerMatch)> = self
            .entries(filetypes)
            .filter_map(|e| e.matcher.matches(&e.def.trigger, before).map(|m| (e, m)))
            .collect();
        let Some(top) = hits.iter().map(|(e, _)| e.def.priority).max() else {
            return Vec::new();
        };
        hits.retain(|(e, _)| e.def.priority == top);
        hits.sort_by(|a, b| b.0.serial.cmp(&a.0.serial));
        debug!(target: "registry", candidates = hits.len(), priority = top, "candidates_selected");
        hits.into_iter()
            .map(|(e, m)| Candidate {
                def: e.def.clone(),
                trigger_start: m.start,
                captures: m.captures,
            })
            .collect()
    }

    /// Every literal-trigger definition whose trigger starts with the word
    /// before the cursor, in the order they were added.
    pub fn list_available(&self, before: &str, filetypes: &[String]) -> Vec<Candidate> {
        let start = matcher::words_start(before, 1);
        let prefix = &before[start..];
        let mut found: Vec<&Entry> = self
            .entries(filetypes)
            .filter(|e| !e.def.options.contains(SnippetOptions::REGEX))
            .filter(|e| e.def.trigger.starts_with(prefix))
            .collect();
        found.sort_by_key(|e| e.serial);
        found
            .into_iter()
            .map(|e| Candidate {
                def: e.def.clone(),
                trigger_start: start,
                captures: Vec::new(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tables.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
