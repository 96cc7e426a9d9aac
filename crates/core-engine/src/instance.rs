//! A live, expanded snippet.
//!
//! Every tabstop, mirror, transformation and code fragment of the rendered
//! template becomes a tracked node holding its current `[start, end]` span in
//! the buffer. Nodes are stored in document (preorder) order, so a node's
//! ancestors always precede it and its descendants occupy the contiguous
//! index range right after it. Literal text is not tracked; it simply sits
//! between nodes.
//!
//! Edits are applied with an owner: the node the edit happened in. The owner
//! and its ancestors keep their start and stretch their end; descendants the
//! edit touches are destroyed; everything after the owner shifts.

use crate::indent::IndentNormalizer;
use core_script::Locals;
use core_snippet::{CodeFragment, CompiledTransform, Node, TemplateError};
use core_text::{Position, TextEdit, advance};
use std::collections::{BTreeMap, BTreeSet};
use tracing::trace;

#[derive(Debug, Clone)]
pub enum Kind {
    Root,
    Tabstop(u32),
    Mirror(u32),
    Transform { id: u32, transform: CompiledTransform },
    Code(CodeFragment),
}

#[derive(Debug, Clone)]
pub struct Tracked {
    pub kind: Kind,
    pub start: Position,
    pub end: Position,
    pub depth: usize,
    /// One past the index of the last descendant.
    pub subtree_end: usize,
    pub alive: bool,
}

impl Tracked {
    fn contains(&self, edit: &TextEdit) -> bool {
        self.start <= edit.start && edit.end <= self.end
    }

    /// Tabstop ids this node reads, if any.
    pub fn reads(&self, id: u32) -> bool {
        match &self.kind {
            Kind::Mirror(m) => *m == id,
            Kind::Transform { id: t, .. } => *t == id,
            Kind::Code(frag) => frag.deps.contains(&id),
            _ => false,
        }
    }
}

/// Where the next jump goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Jump {
    To(u32),
    /// Leave the instance; `at_end` moves the cursor past the snippet.
    Exit { at_end: bool },
    Stay,
}

#[derive(Debug)]
pub struct Instance {
    pub trigger: String,
    nodes: Vec<Tracked>,
    tabstops: BTreeMap<u32, usize>,
    pub active: Option<u32>,
    /// Id of the parent tabstop this instance was expanded inside.
    pub hosted_by: Option<u32>,
    pub captures: Vec<Option<String>>,
    pub locals: Locals,
    /// Nodes whose text must be recomputed.
    pub dirty: BTreeSet<usize>,
}

/// Rendered text plus the instance tracking it, before anything touches the buffer.
pub struct Rendered {
    pub text: String,
    pub instance: Instance,
}

pub struct RenderRequest<'a> {
    pub trigger: &'a str,
    pub nodes: &'a [Node],
    pub start: Position,
    pub at_line_start: bool,
    pub normalizer: &'a IndentNormalizer,
    pub captures: Vec<Option<String>>,
    /// Drop `$0` (and everything inside it) from the rendering.
    pub drop_zero: bool,
}

struct Builder<'a> {
    out: String,
    pos: Position,
    line_start: bool,
    normalizer: &'a IndentNormalizer,
    nodes: Vec<Tracked>,
    tabstops: BTreeMap<u32, usize>,
    drop_zero: bool,
}

impl Builder<'_> {
    fn open(&mut self, kind: Kind, depth: usize) -> usize {
        self.nodes.push(Tracked {
            kind,
            start: self.pos,
            end: self.pos,
            depth,
            subtree_end: self.nodes.len() + 1,
            alive: true,
        });
        self.nodes.len() - 1
    }

    fn close(&mut self, idx: usize) {
        let len = self.nodes.len();
        let node = &mut self.nodes[idx];
        node.end = self.pos;
        node.subtree_end = len;
    }

    fn emit(&mut self, s: &str) {
        if s.is_empty() {
            return;
        }
        self.out.push_str(s);
        self.pos = advance(self.pos, s);
        let tail = s.rsplit('\n').next().unwrap_or_default();
        self.line_start = (self.line_start || s.contains('\n'))
            && tail.chars().all(|c| c == ' ' || c == '\t');
    }

    fn walk(&mut self, nodes: &[Node], depth: usize) -> Result<(), TemplateError> {
        for node in nodes {
            match node {
                Node::Text(t) => {
                    let s = self.normalizer.text(t, self.line_start);
                    self.emit(&s);
                }
                Node::Tabstop { id: 0, .. } if self.drop_zero => {}
                Node::Tabstop { id, children } => {
                    let idx = self.open(Kind::Tabstop(*id), depth);
                    self.walk(children, depth + 1)?;
                    self.close(idx);
                    self.tabstops.insert(*id, idx);
                }
                Node::Mirror { id } => {
                    let idx = self.open(Kind::Mirror(*id), depth);
                    self.close(idx);
                }
                Node::Transform { id, transform } => {
                    let transform = transform.compile()?;
                    let idx = self.open(Kind::Transform { id: *id, transform }, depth);
                    self.close(idx);
                }
                Node::Code(frag) => {
                    let idx = self.open(Kind::Code(frag.clone()), depth);
                    self.close(idx);
                }
            }
        }
        Ok(())
    }
}

impl Instance {
    /// Render a template into text and tracked nodes positioned as if the
    /// text were inserted at `req.start`. Mirrors, transformations and code
    /// fragments start empty and are all marked dirty.
    pub fn render(req: RenderRequest<'_>) -> Result<Rendered, TemplateError> {
        let mut b = Builder {
            out: String::new(),
            pos: req.start,
            line_start: req.at_line_start,
            normalizer: req.normalizer,
            nodes: Vec::new(),
            tabstops: BTreeMap::new(),
            drop_zero: req.drop_zero,
        };
        let root = b.open(Kind::Root, 0);
        b.walk(req.nodes, 1)?;
        b.close(root);
        let dirty = b
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| matches!(n.kind, Kind::Mirror(_) | Kind::Transform { .. } | Kind::Code(_)))
            .map(|(i, _)| i)
            .collect();
        trace!(
            target: "engine.expand",
            trigger = req.trigger,
            nodes = b.nodes.len(),
            tabstops = b.tabstops.len(),
            bytes = b.out.len(),
            "template_rendered"
        );
        Ok(Rendered {
            text: b.out,
            instance: Instance {
                trigger: req.trigger.to_string(),
                nodes: b.nodes,
                tabstops: b.tabstops,
                active: None,
                hosted_by: None,
                captures: req.captures,
                locals: Locals::new(),
                dirty,
            },
        })
    }

    pub fn node(&self, idx: usize) -> &Tracked {
        &self.nodes[idx]
    }

    pub fn start(&self) -> Position {
        self.nodes[0].start
    }

    pub fn end(&self) -> Position {
        self.nodes[0].end
    }

    /// Closed containment: both boundaries count as inside.
    pub fn contains(&self, pos: Position) -> bool {
        self.start() <= pos && pos <= self.end()
    }

    /// Node index of a live tabstop.
    pub fn tabstop(&self, id: u32) -> Option<usize> {
        self.tabstops
            .get(&id)
            .copied()
            .filter(|idx| self.nodes[*idx].alive)
    }

    pub fn span(&self, id: u32) -> Option<(Position, Position)> {
        self.tabstop(id).map(|idx| (self.nodes[idx].start, self.nodes[idx].end))
    }

    /// Live ids in jump order: positive ids ascending, then 0.
    pub fn live_ids(&self) -> Vec<u32> {
        let mut ids: Vec<u32> = self
            .tabstops
            .keys()
            .copied()
            .filter(|id| *id != 0 && self.tabstop(*id).is_some())
            .collect();
        if self.tabstop(0).is_some() {
            ids.push(0);
        }
        ids
    }

    pub fn first(&self) -> Option<u32> {
        self.live_ids().first().copied()
    }

    pub fn next_forward(&self) -> Jump {
        match self.active {
            None => self.first().map_or(Jump::Exit { at_end: true }, Jump::To),
            Some(0) => Jump::Exit { at_end: false },
            Some(active) => {
                let ids = self.live_ids();
                if let Some(next) = ids.iter().find(|id| **id != 0 && **id > active) {
                    Jump::To(*next)
                } else if ids.contains(&0) {
                    Jump::To(0)
                } else {
                    Jump::Exit { at_end: true }
                }
            }
        }
    }

    pub fn next_backward(&self) -> Jump {
        let positives: Vec<u32> = self.live_ids().into_iter().filter(|id| *id != 0).collect();
        match self.active {
            None => Jump::Stay,
            Some(0) => positives.last().map_or(Jump::Stay, |id| Jump::To(*id)),
            Some(active) => positives
                .iter()
                .rev()
                .find(|id| **id < active)
                .or_else(|| positives.first())
                .map_or(Jump::Stay, |id| Jump::To(*id)),
        }
    }

    fn is_ancestor_or_self(&self, anc: usize, idx: usize) -> bool {
        anc <= idx && idx < self.nodes[anc].subtree_end
    }

    /// Node that owns an edit: the active tabstop when it contains the edit,
    /// else the deepest live tabstop containing it, else the root.
    pub fn owner_of(&self, edit: &TextEdit) -> Option<usize> {
        if let Some(idx) = self.active.and_then(|id| self.tabstop(id))
            && self.nodes[idx].contains(edit)
        {
            return Some(idx);
        }
        let deepest = self
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.alive && matches!(n.kind, Kind::Tabstop(_)) && n.contains(edit))
            .max_by_key(|(i, n)| (n.depth, *i))
            .map(|(i, _)| i);
        deepest.or_else(|| self.nodes[0].contains(edit).then_some(0))
    }

    /// Apply an edit that already happened in the buffer. Returns the ids of
    /// tabstops whose text changed, which includes destroyed ones.
    pub fn apply_edit(&mut self, edit: &TextEdit, owner: Option<usize>) -> BTreeSet<u32> {
        let mut changed = BTreeSet::new();
        let Some(owner) = owner.or_else(|| self.owner_of(edit)) else {
            for node in &mut self.nodes {
                node.start = edit.map(node.start);
                node.end = edit.map(node.end);
            }
            return changed;
        };
        let owner_end = self.nodes[owner].subtree_end;
        let mut idx = 0;
        while idx < self.nodes.len() {
            if self.is_ancestor_or_self(idx, owner) {
                let node = &mut self.nodes[idx];
                node.end = edit.shift(node.end);
                if let (Kind::Tabstop(id), true) = (&node.kind, node.alive) {
                    changed.insert(*id);
                }
                idx += 1;
            } else if idx < owner {
                idx += 1;
            } else if idx < owner_end {
                let (start, end, alive) = {
                    let n = &self.nodes[idx];
                    (n.start, n.end, n.alive)
                };
                if alive && edit.touches(start, end) {
                    let stop = self.nodes[idx].subtree_end;
                    for dead in idx..stop {
                        let node = &mut self.nodes[dead];
                        if let (Kind::Tabstop(id), true) = (&node.kind, node.alive) {
                            changed.insert(*id);
                        }
                        node.alive = false;
                        node.start = edit.map(node.start);
                        node.end = edit.map(node.end);
                    }
                    idx = stop;
                } else {
                    let node = &mut self.nodes[idx];
                    node.start = edit.map(node.start);
                    node.end = edit.map(node.end);
                    idx += 1;
                }
            } else {
                let node = &mut self.nodes[idx];
                node.start = edit.shift(node.start);
                node.end = edit.shift(node.end);
                idx += 1;
            }
        }
        trace!(
            target: "engine.edit",
            trigger = %self.trigger,
            owner,
            changed = changed.len(),
            "edit_applied"
        );
        changed
    }

    /// Mark every node reading one of `ids` as dirty.
    pub fn mark_readers(&mut self, ids: &BTreeSet<u32>) {
        for (idx, node) in self.nodes.iter().enumerate() {
            if node.alive && ids.iter().any(|id| node.reads(*id)) {
                self.dirty.insert(idx);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_config::IndentConfig;
    use core_snippet::Template;
    use pretty_assertions::assert_eq;

    fn render(src: &str) -> Rendered {
        let template = Template::parse(src).unwrap();
        let normalizer = IndentNormalizer::new("", IndentConfig::default());
        Instance::render(RenderRequest {
            trigger: "t",
            nodes: &template.nodes,
            start: Position::new(0, 0),
            at_line_start: true,
            normalizer: &normalizer,
            captures: Vec::new(),
            drop_zero: false,
        })
        .unwrap()
    }

    #[test]
    fn renders_defaults_with_empty_dynamic_nodes() {
        let r = render("hi ${1:this ${2:second}} $2");
        assert_eq!(r.text, "hi this second ");
        let inst = r.instance;
        assert_eq!(inst.span(1), Some((Position::new(0, 3), Position::new(0, 14))));
        assert_eq!(inst.span(2), Some((Position::new(0, 8), Position::new(0, 14))));
        assert_eq!(inst.dirty.len(), 1);
        assert_eq!(inst.end(), Position::new(0, 15));
    }

    #[test]
    fn jump_order_skips_dead_and_ends_with_zero() {
        let mut inst = render("$0 ${2:b} ${1:a} $3").instance;
        assert_eq!(inst.live_ids(), vec![1, 2, 3, 0]);
        inst.active = Some(1);
        assert_eq!(inst.next_forward(), Jump::To(2));
        inst.active = Some(3);
        assert_eq!(inst.next_forward(), Jump::To(0));
        inst.active = Some(0);
        assert_eq!(inst.next_forward(), Jump::Exit { at_end: false });
        assert_eq!(inst.next_backward(), Jump::To(3));
        inst.active = Some(1);
        assert_eq!(inst.next_backward(), Jump::To(1));
    }

    #[test]
    fn past_last_without_zero_exits_at_end() {
        let mut inst = render("${1:a} ${2:b}").instance;
        inst.active = Some(2);
        assert_eq!(inst.next_forward(), Jump::Exit { at_end: true });
    }

    #[test]
    fn typing_in_active_grows_it_and_shifts_followers() {
        let mut inst = render("${1:a}$2 end").instance;
        inst.active = Some(1);
        // Replace "a" with "xyz".
        let edit = TextEdit::new(Position::new(0, 0), Position::new(0, 1), "xyz");
        let changed = inst.apply_edit(&edit, None);
        assert_eq!(changed, BTreeSet::from([1]));
        assert_eq!(inst.span(1), Some((Position::new(0, 0), Position::new(0, 3))));
        assert_eq!(inst.span(2), Some((Position::new(0, 3), Position::new(0, 3))));
        assert_eq!(inst.end(), Position::new(0, 7));
    }

    #[test]
    fn overwriting_parent_destroys_children() {
        let mut inst = render("${1:this ${2:second ${3:third}}} $4").instance;
        inst.active = Some(1);
        let (s, e) = inst.span(1).unwrap();
        let edit = TextEdit::new(s, e, "Blah");
        let changed = inst.apply_edit(&edit, None);
        assert_eq!(changed, BTreeSet::from([1, 2, 3]));
        assert_eq!(inst.live_ids(), vec![1, 4]);
        assert_eq!(inst.span(4), Some((Position::new(0, 5), Position::new(0, 5))));
    }

    #[test]
    fn empty_neighbours_follow_document_order() {
        let mut inst = render("$2$1$3").instance;
        inst.active = Some(1);
        let edit = TextEdit::insert(Position::new(0, 0), "ab");
        inst.apply_edit(&edit, None);
        assert_eq!(inst.span(2), Some((Position::new(0, 0), Position::new(0, 0))));
        assert_eq!(inst.span(1), Some((Position::new(0, 0), Position::new(0, 2))));
        assert_eq!(inst.span(3), Some((Position::new(0, 2), Position::new(0, 2))));
    }

    #[test]
    fn edits_outside_only_move_the_instance() {
        let mut inst = render("${1:a}").instance;
        let edit = TextEdit::insert(Position::new(0, 0), "\n\n");
        // Same snippet, sitting on line 1.
        let mut moved = render("${1:a}").instance;
        for n in &mut moved.nodes {
            n.start = Position::new(1, 2);
            n.end = Position::new(1, 3);
        }
        assert!(moved.apply_edit(&edit, None).is_empty());
        assert_eq!(moved.start(), Position::new(3, 2));
        // The same edit at the start of a live instance is owned by it.
        assert!(!inst.apply_edit(&edit, None).is_empty());
    }

    #[test]
    fn readers_include_script_dependencies() {
        let mut inst = render("${1:a} $1 `!p snip.rv = t[1]` `echo hi`").instance;
        inst.dirty.clear();
        inst.mark_readers(&BTreeSet::from([1]));
        assert_eq!(inst.dirty.len(), 2);
    }
}
