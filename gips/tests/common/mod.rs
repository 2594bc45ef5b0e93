//! Scripted backend for integration tests.
#![allow(dead_code)]

use gips::backend::{linked_uniforms, Backend, Built, PassInvocation};
use gips::error::RenderError;
use gips::param::UniformLocation;

/// Which backend call should fail, counted from 1 across the backend's life.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Fail {
    Never,
    Compile(usize),
    Link(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub id: u32,
    pub uniforms: Vec<String>,
}

/// Image that remembers which programs ran on it, with their uniforms.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Trace {
    pub steps: Vec<(u32, usize)>,
}

#[derive(Debug)]
pub struct Scripted {
    pub fail: Fail,
    pub compiled: Vec<String>,
    pub compiles: usize,
    pub links: usize,
    next_id: u32,
    pub live: Vec<u32>,
    pub released: Vec<u32>,
    pub warning: Option<String>,
    pub fail_run: bool,
}

impl Scripted {
    pub fn new() -> Self {
        Self::failing(Fail::Never)
    }

    pub fn failing(fail: Fail) -> Self {
        Self {
            fail,
            compiled: Vec::new(),
            compiles: 0,
            links: 0,
            next_id: 0,
            live: Vec::new(),
            released: Vec::new(),
            warning: None,
            fail_run: false,
        }
    }
}

impl Backend for Scripted {
    type Shader = String;
    type Program = Program;
    type Image = Trace;

    fn compile_fragment(&mut self, source: &str) -> Result<Built<String>, String> {
        self.compiles += 1;
        self.compiled.push(source.to_string());
        if self.fail == Fail::Compile(self.compiles) {
            return Err(format!("0(1) : error C0000: scripted compile failure {}", self.compiles));
        }
        Ok(Built {
            value: source.to_string(),
            log: self.warning.clone().unwrap_or_default(),
        })
    }

    fn link_program(&mut self, fragment: String) -> Result<Built<Program>, String> {
        self.links += 1;
        if self.fail == Fail::Link(self.links) {
            return Err(format!("scripted link failure {}", self.links));
        }
        self.next_id += 1;
        self.live.push(self.next_id);
        Ok(Built::quiet(Program {
            id: self.next_id,
            uniforms: linked_uniforms(&fragment),
        }))
    }

    fn uniform_location(&self, program: &Program, name: &str) -> Option<UniformLocation> {
        program
            .uniforms
            .iter()
            .position(|u| u == name)
            .map(|i| UniformLocation(i as i32))
    }

    fn release_program(&mut self, program: Program) {
        assert!(
            self.live.contains(&program.id),
            "program {} released twice or never created",
            program.id
        );
        self.live.retain(|&id| id != program.id);
        self.released.push(program.id);
    }

    fn run_pass(
        &mut self,
        invocation: &PassInvocation<'_, Program>,
        input: &Trace,
    ) -> Result<Trace, RenderError> {
        if self.fail_run {
            return Err(RenderError::new("scripted render failure"));
        }
        let mut out = input.clone();
        out.steps.push((invocation.program.id, invocation.uniforms.len()));
        Ok(out)
    }
}
