//! Recomputing mirrors, transformations and code fragments.
//!
//! Instances collect dirty nodes while edits are applied. A settle pass walks
//! the stack from the innermost instance outwards and rewrites every dirty
//! node whose text differs from what the buffer holds. Each rewrite is an
//! edit of its own, so it can dirty further nodes (a mirror inside a tabstop
//! read by a script, a parent mirror of the tabstop hosting a child). Passes
//! repeat until nothing is dirty or the configured limit is reached.

use crate::engine::Engine;
use crate::error::ExpandError;
use crate::host::Host;
use crate::indent::reindent;
use crate::instance::{Instance, Kind};
use crate::interp::{CodeEnv, EvalContext};
use core_events::{Diagnostic, Signal};
use core_snippet::CodeLang;
use core_text::{Position, TextEdit, indent};
use std::collections::BTreeMap;
use tracing::{trace, warn};

fn line_indent(host: &dyn Host, line: usize) -> String {
    indent::leading(&host.line(line).unwrap_or_default()).to_string()
}

/// Text of tabstop `id`, moved to the indentation of the line at `at`.
fn tabstop_text(host: &dyn Host, inst: &Instance, id: u32, at: Position) -> Option<String> {
    let (start, end) = inst.span(id)?;
    let text = host.slice(start, end);
    Some(reindent(
        &text,
        &line_indent(host, start.line),
        &line_indent(host, at.line),
    ))
}

impl Engine {
    pub(crate) fn settle(&mut self, host: &mut dyn Host) -> Result<(), ExpandError> {
        for pass in 0..self.max_passes {
            let mut touched = 0usize;
            for level in (0..self.stack.len()).rev() {
                let dirty = std::mem::take(&mut self.stack[level].dirty);
                for idx in dirty {
                    touched += 1;
                    self.refresh(host, level, idx)?;
                }
            }
            if touched == 0 {
                trace!(target: "engine.propagate", passes = pass, "settled");
                return Ok(());
            }
        }
        warn!(
            target: "engine.propagate",
            limit = self.max_passes,
            "propagation_limit_reached"
        );
        for instance in &mut self.stack {
            instance.dirty.clear();
        }
        Ok(())
    }

    fn refresh(&mut self, host: &mut dyn Host, level: usize, idx: usize) -> Result<(), ExpandError> {
        let computed = {
            let inst = &self.stack[level];
            let node = inst.node(idx);
            if !node.alive {
                return Ok(());
            }
            match &node.kind {
                Kind::Mirror(id) => Some(tabstop_text(host, inst, *id, node.start).unwrap_or_default()),
                Kind::Transform { id, transform } => Some(
                    inst.span(*id)
                        .map(|(s, e)| {
                            reindent(
                                &transform.apply(&host.slice(s, e)),
                                &line_indent(host, s.line),
                                &line_indent(host, node.start.line),
                            )
                        })
                        .unwrap_or_default(),
                ),
                Kind::Code(_) => None,
                Kind::Root | Kind::Tabstop(_) => return Ok(()),
            }
        };
        let desired = match computed {
            Some(text) => text,
            None => self.run_code(host, level, idx),
        };
        self.write(host, level, idx, &desired)
    }

    fn run_code(&mut self, host: &dyn Host, level: usize, idx: usize) -> String {
        let Engine {
            stack,
            interpreters,
            style,
            options,
            diagnostics,
            ..
        } = self;
        let inst = &mut stack[level];
        let (frag, at) = match &inst.node(idx).kind {
            Kind::Code(frag) => (frag.clone(), inst.node(idx).start),
            _ => return String::new(),
        };
        let tabstops: BTreeMap<u32, String> = inst
            .live_ids()
            .into_iter()
            .filter_map(|id| inst.span(id).map(|(s, e)| (id, host.slice(s, e))))
            .collect();
        let Some(interpreter) = interpreters.get(&frag.lang) else {
            diagnostics.push(Diagnostic::runtime(format!(
                "no interpreter for '{}' code in snippet '{}'",
                frag.lang.tag(),
                inst.trigger
            )));
            return String::new();
        };
        let mut ctx = EvalContext {
            env: CodeEnv {
                tabstops,
                captures: &inst.captures,
                options,
                style: *style,
                line: at.line,
                byte: at.byte,
                line_text: host.line(at.line).unwrap_or_default(),
            },
            locals: &mut inst.locals,
        };
        match interpreter.evaluate(&frag.source, &mut ctx) {
            Ok(text) => text,
            Err(err) => {
                let lang = match frag.lang {
                    CodeLang::Shell => "shell",
                    CodeLang::Script => "script",
                    CodeLang::EditorExpr => "editor expression",
                };
                match frag.lang {
                    CodeLang::Shell => {
                        warn!(target: "interp.shell", trigger = %inst.trigger, error = %err, "code_failed")
                    }
                    _ => warn!(
                        target: "interp.script",
                        lang,
                        trigger = %inst.trigger,
                        error = %err,
                        "code_failed"
                    ),
                }
                diagnostics.push(Diagnostic::runtime(format!(
                    "{lang} code in snippet '{}' failed: {err}",
                    inst.trigger
                )));
                String::new()
            }
        }
    }

    /// Make node `idx` of instance `level` hold `text`, keeping every
    /// instance's tracked spans in step with the edit.
    fn write(
        &mut self,
        host: &mut dyn Host,
        level: usize,
        idx: usize,
        text: &str,
    ) -> Result<(), ExpandError> {
        let node = self.stack[level].node(idx);
        let (start, end) = (node.start, node.end);
        if host.slice(start, end) == text {
            return Ok(());
        }
        host.replace(start, end, text)?;
        host.signal(Signal::TextInserted {
            start,
            end,
            len: text.len(),
        });
        let edit = TextEdit::new(start, end, text);
        for (i, instance) in self.stack.iter_mut().enumerate() {
            let owner = (i == level).then_some(idx);
            let changed = instance.apply_edit(&edit, owner);
            instance.mark_readers(&changed);
        }
        trace!(target: "engine.propagate", level, node = idx, len = text.len(), "node_rewritten");
        Ok(())
    }
}
