//! One filter unit: its source, compiled passes, parameters and diagnostics.

use crate::backend::Backend;
use crate::codegen::{self, Build};
use crate::error::{Diagnostic, Diagnostics, LoadError};
use crate::param::Parameter;
use crate::pass::{Pass, PassSlots, MAX_PASSES};
use crate::recognizer;
use crate::source::{Fingerprint, NodeSource};

/// A filter node.
///
/// A node owns the programs of its passes. They go back to the backend either
/// when a reload supersedes them or through [`Node::release`].
#[derive(Debug)]
pub struct Node<P> {
    source: NodeSource,
    name: String,
    passes: PassSlots<P>,
    params: Vec<Parameter>,
    diagnostics: Diagnostics,
    /// Generated sources of the last load attempt.
    generated: Vec<String>,
    enabled: bool,
    fingerprint: Option<Fingerprint>,
}

impl<P> Node<P> {
    /// An unloaded node. Call [`Node::reload`] to populate it.
    pub fn new(source: NodeSource) -> Self {
        let name = source.display_name();
        Self {
            source,
            name,
            passes: PassSlots::new(),
            params: Vec::new(),
            diagnostics: Diagnostics::new(),
            generated: Vec::new(),
            enabled: true,
            fingerprint: None,
        }
    }

    /// Create a node and load it right away. A failed load still yields a
    /// node; its diagnostics say what went wrong.
    pub fn load<B>(source: NodeSource, backend: &mut B) -> Self
    where
        B: Backend<Program = P>,
    {
        let mut node = Self::new(source);
        // the outcome is recorded in the node's diagnostics
        let _ = node.reload(backend);
        node
    }

    /// Read the source again and rebuild every pass.
    ///
    /// On success the previous programs are released and replaced. On failure
    /// the previous passes and parameters stay active; only the diagnostics
    /// change to describe the failed attempt. A node with no active passes
    /// takes the parameters of the failed attempt, unbound, for display.
    pub fn reload<B>(&mut self, backend: &mut B) -> Result<(), LoadError>
    where
        B: Backend<Program = P>,
    {
        let fingerprint = self.source.fingerprint();
        let code = match self.source.read() {
            Ok(code) => code,
            Err(e) => {
                let mut diagnostics = Diagnostics::new();
                diagnostics.push(Diagnostic::Source(e.to_string()));
                self.diagnostics = diagnostics;
                log::warn!("{}: {e}", self.name);
                return Err(e.into());
            }
        };
        self.fingerprint = fingerprint;
        self.load_str(backend, &code)
    }

    /// Rebuild the node from `code` instead of its source.
    pub fn load_str<B>(&mut self, backend: &mut B, code: &str) -> Result<(), LoadError>
    where
        B: Backend<Program = P>,
    {
        let Build {
            passes,
            mut params,
            diagnostics,
            sources,
            generated,
            error,
        } = codegen::build(backend, code, recognizer::scan(code));
        self.diagnostics = diagnostics;
        self.generated = sources;

        if let Some(e) = error {
            if self.passes.is_empty() {
                // nothing active to protect: show what the scan found
                for p in &mut params {
                    p.locations = [None; MAX_PASSES];
                }
                self.params = params;
                log::info!("{}: load failed: {e}", self.name);
            } else {
                log::warn!(
                    "{}: reload failed after {generated} pass(es), keeping previous {} pass(es): {e}",
                    self.name,
                    self.passes.len()
                );
            }
            return Err(e);
        }

        if self.is_loaded() {
            carry_values(&self.params, &mut params);
        }
        for program in self.passes.drain() {
            backend.release_program(program);
        }
        self.passes = passes;
        self.params = params;
        log::info!(
            "{}: loaded {} pass(es), {} parameter(s)",
            self.name,
            self.passes.len(),
            self.params.len()
        );
        Ok(())
    }

    /// Hand every program back to the backend. The node is left unloaded.
    pub fn release<B>(&mut self, backend: &mut B)
    where
        B: Backend<Program = P>,
    {
        for program in self.passes.drain() {
            backend.release_program(program);
        }
    }

    pub fn source(&self) -> &NodeSource {
        &self.source
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pass_count(&self) -> usize {
        self.passes.len()
    }

    pub fn is_loaded(&self) -> bool {
        !self.passes.is_empty()
    }

    pub fn passes(&self) -> impl Iterator<Item = &Pass<P>> {
        self.passes.iter()
    }

    pub fn params(&self) -> &[Parameter] {
        &self.params
    }

    pub fn param(&self, name: &str) -> Option<&Parameter> {
        self.params.iter().find(|p| p.name == name)
    }

    /// Set a parameter's value (clamped by its type). Returns `false` if
    /// there is no such parameter.
    pub fn set_param_value(&mut self, index: usize, values: &[f32]) -> bool {
        match self.params.get_mut(index) {
            Some(p) => {
                p.set_value(values);
                true
            }
            None => false,
        }
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Diagnostic lines joined by newlines; empty when there is nothing to say.
    pub fn diagnostic_text(&self) -> String {
        self.diagnostics.to_string()
    }

    /// Fragment sources generated by the last load attempt, one per pass.
    pub fn generated_sources(&self) -> &[String] {
        &self.generated
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn toggle(&mut self) {
        self.enabled = !self.enabled;
    }

    /// Has the backing file changed since it was last read?
    ///
    /// Always `false` for presets and for files that cannot be inspected.
    pub fn source_changed(&self) -> bool {
        match (self.source.fingerprint(), self.fingerprint) {
            (Some(now), Some(then)) => now != then,
            (Some(_), None) => true,
            (None, _) => false,
        }
    }
}

/// Keep the current values of parameters that survive a reload unchanged in
/// name and data type. Values are copied as they are, without clamping, so
/// reloading unchanged source changes nothing.
fn carry_values(old: &[Parameter], new: &mut [Parameter]) {
    for p in new.iter_mut() {
        if let Some(prev) = old
            .iter()
            .find(|o| o.name == p.name && o.data_type == p.data_type)
        {
            p.value = prev.value;
        }
    }
}
