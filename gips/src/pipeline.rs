//! Ordered chain of nodes executed in series.
//!
//! Stage numbers used by the show index: stage 0 is the unmodified input,
//! stage `k` is the output of node `k - 1`.

use crate::backend::{Backend, PassInvocation};
use crate::error::{LoadError, RenderError};
use crate::node::Node;

/// Ordered nodes, their last rendered outputs, and what to display.
pub struct Pipeline<B: Backend> {
    nodes: Vec<Node<B::Program>>,
    /// Output of each node after the last render; `None` where the node
    /// passed its input through.
    outputs: Vec<Option<B::Image>>,
    dirty: bool,
    show_index: usize,
}

impl<B: Backend> Default for Pipeline<B> {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            outputs: Vec::new(),
            dirty: true,
            show_index: 0,
        }
    }
}

impl<B: Backend> Pipeline<B> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[Node<B::Program>] {
        &self.nodes
    }

    pub fn node(&self, index: usize) -> Option<&Node<B::Program>> {
        self.nodes.get(index)
    }

    /// Mutable access to a node. Assumes the caller changes something that
    /// affects the output, so the pipeline becomes dirty.
    pub fn node_mut(&mut self, index: usize) -> Option<&mut Node<B::Program>> {
        let node = self.nodes.get_mut(index)?;
        self.dirty = true;
        Some(node)
    }

    // ── Topology ───────────────────────────────────────────────────────

    /// Insert `node` so that it ends up at `index`. Out-of-range indices are
    /// ignored and the node is handed back.
    pub fn insert(&mut self, index: usize, node: Node<B::Program>) -> Result<(), Node<B::Program>> {
        if index > self.nodes.len() {
            return Err(node);
        }
        self.nodes.insert(index, node);
        self.show_index = shift_for_insert(self.show_index, index);
        self.changed();
        Ok(())
    }

    /// Append `node` at the end and show its output.
    pub fn push(&mut self, node: Node<B::Program>) {
        self.nodes.push(node);
        self.show_index = self.nodes.len();
        self.changed();
    }

    /// Remove the node at `index`, releasing its programs.
    pub fn remove(&mut self, index: usize, backend: &mut B) -> bool {
        if index >= self.nodes.len() {
            return false;
        }
        let mut node = self.nodes.remove(index);
        node.release(backend);
        self.show_index = shift_for_remove(self.show_index, index);
        self.changed();
        true
    }

    /// Move the node at `from` so that it ends up at `to`.
    pub fn move_node(&mut self, from: usize, to: usize) -> bool {
        let len = self.nodes.len();
        if from >= len || to >= len {
            return false;
        }
        if from != to {
            let node = self.nodes.remove(from);
            self.nodes.insert(to, node);
            self.show_index = shift_for_move(self.show_index, from, to);
            self.changed();
        }
        true
    }

    /// Reload the node at `index`. `None` for an invalid index.
    pub fn reload(&mut self, index: usize, backend: &mut B) -> Option<Result<(), LoadError>> {
        let node = self.nodes.get_mut(index)?;
        let result = node.reload(backend);
        // a failed reload leaves the active programs untouched
        if result.is_ok() {
            self.dirty = true;
        }
        Some(result)
    }

    /// Reload every node whose backing file changed. Returns how many nodes
    /// were reloaded successfully.
    pub fn reload_changed(&mut self, backend: &mut B) -> usize {
        let mut reloaded = 0;
        for node in self.nodes.iter_mut().filter(|n| n.source_changed()) {
            if node.reload(backend).is_ok() {
                reloaded += 1;
            }
        }
        if reloaded > 0 {
            self.dirty = true;
        }
        reloaded
    }

    /// Release every node's programs and empty the pipeline.
    pub fn clear(&mut self, backend: &mut B) {
        for mut node in self.nodes.drain(..) {
            node.release(backend);
        }
        self.show_index = 0;
        self.changed();
    }

    // ── Editing ────────────────────────────────────────────────────────

    pub fn set_param_value(&mut self, node: usize, param: usize, values: &[f32]) -> bool {
        let changed = self
            .nodes
            .get_mut(node)
            .is_some_and(|n| n.set_param_value(param, values));
        self.dirty |= changed;
        changed
    }

    pub fn set_enabled(&mut self, node: usize, enabled: bool) -> bool {
        match self.nodes.get_mut(node) {
            Some(n) => {
                if n.enabled() != enabled {
                    n.set_enabled(enabled);
                    self.dirty = true;
                }
                true
            }
            None => false,
        }
    }

    pub fn show_index(&self) -> usize {
        self.show_index
    }

    /// Select the stage to display, clamped to `0..=len`.
    pub fn set_show_index(&mut self, index: usize) {
        let index = index.min(self.nodes.len());
        if index != self.show_index {
            self.show_index = index;
            self.dirty = true;
        }
    }

    /// Force the next render, e.g. after the input image changed.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn changed(&mut self) {
        self.show_index = self.show_index.min(self.nodes.len());
        self.dirty = true;
    }

    // ── Execution ──────────────────────────────────────────────────────

    /// Run every enabled, loaded node over `input` if anything changed since
    /// the last render. Returns whether a render happened.
    ///
    /// On error the pipeline stays dirty and the outputs of the failed
    /// render are discarded.
    pub fn render(
        &mut self,
        backend: &mut B,
        input: &B::Image,
        width: u32,
        height: u32,
    ) -> Result<bool, RenderError> {
        if !self.dirty {
            return Ok(false);
        }
        self.outputs.clear();
        let mut outputs: Vec<Option<B::Image>> = Vec::with_capacity(self.nodes.len());
        for node in &self.nodes {
            let mut image: Option<B::Image> = None;
            if node.enabled() {
                for pass in node.passes() {
                    let invocation = PassInvocation::new(pass, node.params(), width, height);
                    let out = {
                        let src = image
                            .as_ref()
                            .or_else(|| outputs.iter().rev().flatten().next())
                            .unwrap_or(input);
                        backend
                            .run_pass(&invocation, src)
                            .map_err(|e| e.at(node.name(), pass.index() + 1))?
                    };
                    image = Some(out);
                }
            }
            outputs.push(image);
        }
        log::debug!(
            "rendered {} node(s), showing stage {}",
            self.nodes.len(),
            self.show_index
        );
        self.outputs = outputs;
        self.dirty = false;
        Ok(true)
    }

    /// Image of stage `stage` from the last render. Stages whose node passed
    /// its input through resolve to the nearest earlier output.
    pub fn stage_output<'a>(&'a self, stage: usize, input: &'a B::Image) -> &'a B::Image {
        let end = stage.min(self.outputs.len());
        self.outputs[..end]
            .iter()
            .rev()
            .flatten()
            .next()
            .unwrap_or(input)
    }

    /// Image selected by the show index.
    pub fn shown<'a>(&'a self, input: &'a B::Image) -> &'a B::Image {
        self.stage_output(self.show_index, input)
    }
}

// ── Show-index renumbering ─────────────────────────────────────────────
//
// `show` is a stage number, `index`/`from`/`to` are node positions; node `p`
// is stage `p + 1`.

pub(crate) fn shift_for_insert(show: usize, index: usize) -> usize {
    if show > index {
        show + 1
    } else {
        show
    }
}

pub(crate) fn shift_for_remove(show: usize, index: usize) -> usize {
    if show > index {
        show - 1
    } else {
        show
    }
}

pub(crate) fn shift_for_move(show: usize, from: usize, to: usize) -> usize {
    let (a, b) = (from + 1, to + 1);
    if show == a {
        b
    } else if from < to && show > a && show <= b {
        show - 1
    } else if from > to && show >= b && show < a {
        show + 1
    } else {
        show
    }
}
