//! Snippet mode: expansion, navigation and edit tracking.
//!
//! The engine keeps a stack of live instances. Expanding inside the active
//! tabstop of the top instance nests a child; expanding anywhere else leaves
//! snippet mode first. Jumps only ever drive the top instance. When it runs
//! out of tabstops it exits, and a parent whose host tabstop was not `$0`
//! moves on to its next tabstop.

use crate::error::ExpandError;
use crate::host::Host;
use crate::indent::IndentNormalizer;
use crate::instance::{Instance, Jump, RenderRequest};
use crate::interp::{EditorExprInterpreter, Interpreter, ScriptInterpreter, ShellInterpreter};
use core_config::{Config, IndentConfig};
use core_events::{Diagnostic, Signal};
use core_registry::{Candidate, Registry, pick};
use core_snippet::CodeLang;
use core_text::{Position, TextEdit, indent};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpandOutcome {
    Expanded,
    NoMatch,
    /// Several candidates matched; answer with [`Engine::choose`].
    Choose(usize),
    Cancelled,
}

pub struct Engine {
    pub(crate) stack: Vec<Instance>,
    pub(crate) interpreters: HashMap<CodeLang, Box<dyn Interpreter>>,
    pub(crate) style: IndentConfig,
    pub(crate) options: BTreeMap<String, String>,
    pub(crate) max_passes: usize,
    pub(crate) diagnostics: Vec<Diagnostic>,
    pub(crate) filetypes: Vec<String>,
    pub(crate) pending: Vec<Candidate>,
}

impl Engine {
    pub fn new(config: &Config) -> Self {
        let mut interpreters: HashMap<CodeLang, Box<dyn Interpreter>> = HashMap::new();
        interpreters.insert(
            CodeLang::Shell,
            Box::new(ShellInterpreter::new(config.file.shell.program.clone())),
        );
        interpreters.insert(CodeLang::Script, Box::new(ScriptInterpreter));
        interpreters.insert(CodeLang::EditorExpr, Box::new(EditorExprInterpreter));
        Self {
            stack: Vec::new(),
            interpreters,
            style: config.indent(),
            options: config.file.options.clone(),
            max_passes: config.file.engine.max_propagation_passes.max(1),
            diagnostics: Vec::new(),
            filetypes: config.file.engine.filetypes.clone(),
            pending: Vec::new(),
        }
    }

    pub fn set_interpreter(&mut self, lang: CodeLang, interpreter: Box<dyn Interpreter>) {
        self.interpreters.insert(lang, interpreter);
    }

    pub fn set_filetypes(&mut self, filetypes: Vec<String>) {
        self.filetypes = filetypes;
    }

    pub fn filetypes(&self) -> &[String] {
        &self.filetypes
    }

    /// Number of live instances (0 when not in snippet mode).
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn active_tabstop(&self) -> Option<u32> {
        self.stack.last().and_then(|i| i.active)
    }

    /// Candidates waiting for [`Engine::choose`].
    pub fn pending(&self) -> &[Candidate] {
        &self.pending
    }

    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    fn before_cursor(host: &dyn Host) -> String {
        let cursor = host.cursor();
        let mut line = host.line(cursor.line).unwrap_or_default();
        if line.is_char_boundary(cursor.byte.min(line.len())) {
            line.truncate(cursor.byte.min(line.len()));
        }
        line
    }

    /// Try to expand the trigger ending at the cursor.
    pub fn expand(
        &mut self,
        host: &mut dyn Host,
        registry: &Registry,
    ) -> Result<ExpandOutcome, ExpandError> {
        let before = Self::before_cursor(host);
        let mut candidates = registry.select(&before, &self.filetypes);
        match candidates.len() {
            0 => {
                debug!(target: "engine.expand", "no_match");
                Ok(ExpandOutcome::NoMatch)
            }
            1 => {
                let only = candidates.remove(0);
                self.expand_candidate(host, &only)
            }
            count => {
                debug!(target: "engine.expand", count, "candidates_offered");
                self.pending = candidates;
                host.signal(Signal::CandidatesOffered { count });
                Ok(ExpandOutcome::Choose(count))
            }
        }
    }

    /// Answer a pending choice. `choice` is 1-based; 0 cancels and leaves the
    /// trigger untouched, values past the end pick the last candidate.
    pub fn choose(
        &mut self,
        host: &mut dyn Host,
        choice: usize,
    ) -> Result<ExpandOutcome, ExpandError> {
        let pending = std::mem::take(&mut self.pending);
        match pick(&pending, choice) {
            Some(candidate) => self.expand_candidate(host, candidate),
            None => {
                debug!(target: "engine.expand", choice, "choice_cancelled");
                Ok(ExpandOutcome::Cancelled)
            }
        }
    }

    /// Every literal trigger starting with the word before the cursor.
    pub fn list_available(&self, host: &dyn Host, registry: &Registry) -> Vec<Candidate> {
        registry.list_available(&Self::before_cursor(host), &self.filetypes)
    }

    /// Offer the listed snippets as a pending choice.
    pub fn offer_available(&mut self, host: &mut dyn Host, registry: &Registry) -> ExpandOutcome {
        self.pending = self.list_available(host, registry);
        if self.pending.is_empty() {
            return ExpandOutcome::NoMatch;
        }
        let count = self.pending.len();
        host.signal(Signal::CandidatesOffered { count });
        ExpandOutcome::Choose(count)
    }

    /// Replace the trigger of `candidate` with its rendered template.
    pub fn expand_candidate(
        &mut self,
        host: &mut dyn Host,
        candidate: &Candidate,
    ) -> Result<ExpandOutcome, ExpandError> {
        let def = &candidate.def;
        let cursor = host.cursor();
        let start = Position::new(cursor.line, candidate.trigger_start.min(cursor.byte));
        let line = host.line(cursor.line).unwrap_or_default();
        let at_line_start = line
            .get(..start.byte)
            .is_some_and(|p| p.chars().all(|c| c == ' ' || c == '\t'));

        let hosted_by = self.stack.last().and_then(|top| {
            top.active.filter(|id| {
                top.span(*id)
                    .is_some_and(|(s, e)| s <= start && cursor <= e)
            })
        });
        if hosted_by.is_none() {
            while !self.stack.is_empty() {
                self.pop(host);
            }
        }

        let normalizer = IndentNormalizer::new(indent::leading(&line), self.style);
        let rendered = Instance::render(RenderRequest {
            trigger: &def.trigger,
            nodes: &def.template.nodes,
            start,
            at_line_start,
            normalizer: &normalizer,
            captures: candidate.captures.clone(),
            drop_zero: hosted_by.is_some_and(|id| id != 0),
        })
        .map_err(|source| {
            self.diagnostics.push(Diagnostic::runtime(format!(
                "snippet '{}' cannot expand: {source}",
                def.trigger
            )));
            ExpandError::Definition {
                trigger: def.trigger.clone(),
                source,
            }
        })?;

        let edit = TextEdit::new(start, cursor, &rendered.text);
        host.replace(start, cursor, &rendered.text)?;
        host.signal(Signal::TextInserted {
            start,
            end: cursor,
            len: rendered.text.len(),
        });
        for parent in &mut self.stack {
            let changed = parent.apply_edit(&edit, None);
            parent.mark_readers(&changed);
        }
        let mut instance = rendered.instance;
        instance.hosted_by = hosted_by;
        self.stack.push(instance);
        info!(
            target: "engine.expand",
            trigger = %def.trigger,
            depth = self.stack.len(),
            hosted_by = ?hosted_by,
            "snippet_expanded"
        );
        self.settle(host)?;

        let Some(top) = self.stack.last() else {
            return Ok(ExpandOutcome::Expanded);
        };
        match top.first() {
            Some(id) => self.enter(host, id),
            None => {
                let end = top.end();
                self.pop(host);
                host.place_cursor(end);
                host.signal(Signal::CursorPlaced(end));
            }
        }
        Ok(ExpandOutcome::Expanded)
    }

    fn enter(&mut self, host: &mut dyn Host, id: u32) {
        let Some(top) = self.stack.last_mut() else {
            return;
        };
        top.active = Some(id);
        let Some((start, end)) = top.span(id) else {
            return;
        };
        debug!(target: "engine.jump", trigger = %top.trigger, id, "tabstop_entered");
        if start < end {
            host.select(start, end);
            host.signal(Signal::Selected { start, end });
        } else {
            host.place_cursor(start);
            host.signal(Signal::CursorPlaced(start));
        }
    }

    fn pop(&mut self, host: &mut dyn Host) -> Option<Instance> {
        let instance = self.stack.pop()?;
        let depth = self.stack.len();
        info!(target: "engine.jump", trigger = %instance.trigger, depth, "snippet_exited");
        host.signal(Signal::SnippetExited { depth });
        Some(instance)
    }

    /// Move to the next tabstop. Returns false when no snippet is active.
    pub fn jump_forward(&mut self, host: &mut dyn Host) -> bool {
        if self.stack.is_empty() {
            return false;
        }
        while let Some(top) = self.stack.last() {
            match top.next_forward() {
                Jump::To(id) => {
                    self.enter(host, id);
                    break;
                }
                Jump::Stay => break,
                Jump::Exit { at_end } => {
                    let end = top.end();
                    let hosted_by = top.hosted_by;
                    self.pop(host);
                    if at_end {
                        host.place_cursor(end);
                        host.signal(Signal::CursorPlaced(end));
                    }
                    if hosted_by.is_none_or(|id| id == 0) {
                        break;
                    }
                }
            }
        }
        true
    }

    /// Move to the previous tabstop. Returns false when no snippet is active.
    pub fn jump_backward(&mut self, host: &mut dyn Host) -> bool {
        let Some(top) = self.stack.last() else {
            return false;
        };
        if let Jump::To(id) = top.next_backward() {
            self.enter(host, id);
        }
        true
    }

    /// Leave the innermost instance. Returns false when none was active.
    pub fn escape(&mut self, host: &mut dyn Host) -> bool {
        self.pending.clear();
        self.pop(host).is_some()
    }

    /// Report an edit the user made in the host buffer.
    pub fn text_changed(&mut self, host: &mut dyn Host, edit: TextEdit) -> Result<(), ExpandError> {
        if edit.is_noop() || self.stack.is_empty() {
            return Ok(());
        }
        trace!(
            target: "engine.edit",
            start = %edit.start,
            end = %edit.end,
            inserted_end = %edit.inserted_end,
            "user_edit"
        );
        for instance in &mut self.stack {
            let changed = instance.apply_edit(&edit, None);
            instance.mark_readers(&changed);
        }
        self.settle(host)?;
        self.cursor_moved(host);
        Ok(())
    }

    /// Leave every instance whose span no longer contains the cursor.
    pub fn cursor_moved(&mut self, host: &mut dyn Host) {
        let cursor = host.cursor();
        while let Some(top) = self.stack.last() {
            if top.contains(cursor) {
                break;
            }
            debug!(target: "engine.jump", cursor = %cursor, "cursor_left_snippet");
            self.pop(host);
        }
    }
}
