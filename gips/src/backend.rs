//! The graphics collaborator the core drives, and a dry-run implementation.
//!
//! The core never talks to a GPU API itself. It hands generated fragment
//! sources to a [`Backend`] for compiling and linking (against the shared
//! vertex stage from [`crate::codegen::VERTEX_SHADER`]), asks it for uniform
//! binding points, and asks it to run a linked pass over an image.

use crate::codegen::VERTEX_SHADER;
use crate::error::RenderError;
use crate::lexer::Tokenizer;
use crate::param::{Parameter, UniformLocation, UniformType};
use crate::pass::{FixedLocations, Pass, TexFilter, Transforms};

/// A successfully built object plus whatever the compiler or linker had to
/// say about it (warnings). The log may be empty.
#[derive(Debug)]
pub struct Built<T> {
    pub value: T,
    pub log: String,
}

impl<T> Built<T> {
    pub fn quiet(value: T) -> Self {
        Self {
            value,
            log: String::new(),
        }
    }
}

/// Compile, link and execute shader-stage programs.
///
/// Failed operations return the compiler or linker log as the error. A
/// program handed out by [`Backend::link_program`] is owned by the caller
/// until it is given back through [`Backend::release_program`].
pub trait Backend {
    type Shader;
    type Program;
    type Image;

    fn compile_fragment(&mut self, source: &str) -> Result<Built<Self::Shader>, String>;

    /// Link a compiled fragment stage with the shared vertex stage. The
    /// fragment stage is consumed either way.
    fn link_program(&mut self, fragment: Self::Shader) -> Result<Built<Self::Program>, String>;

    fn uniform_location(&self, program: &Self::Program, name: &str) -> Option<UniformLocation>;

    fn release_program(&mut self, program: Self::Program);

    /// Run one pass over `input` and return the resulting image.
    fn run_pass(
        &mut self,
        invocation: &PassInvocation<'_, Self::Program>,
        input: &Self::Image,
    ) -> Result<Self::Image, RenderError>;
}

/// Value of one uniform, shaped by its declared type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformData {
    Float(f32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
}

impl UniformData {
    pub fn of(param: &Parameter) -> Self {
        let v = param.value;
        match param.data_type {
            UniformType::Float => UniformData::Float(v[0]),
            UniformType::Vec2 => UniformData::Vec2([v[0], v[1]]),
            UniformType::Vec3 => UniformData::Vec3([v[0], v[1], v[2]]),
            UniformType::Vec4 => UniformData::Vec4(v),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UniformValue {
    pub location: UniformLocation,
    pub data: UniformData,
}

/// Everything a backend needs to execute one pass.
///
/// The backend sets each bound location in `fixed` from the matching
/// `transforms` value, and every entry of `uniforms`, before drawing the
/// quad.
#[derive(Debug)]
pub struct PassInvocation<'a, P> {
    pub program: &'a P,
    pub pass: usize,
    pub filter: TexFilter,
    pub width: u32,
    pub height: u32,
    pub fixed: FixedLocations,
    pub transforms: Transforms,
    /// Parameter values for every parameter this pass uses.
    pub uniforms: Vec<UniformValue>,
}

impl<'a, P> PassInvocation<'a, P> {
    pub fn new(pass: &'a Pass<P>, params: &[Parameter], width: u32, height: u32) -> Self {
        let index = pass.index();
        let uniforms = params
            .iter()
            .filter_map(|p| {
                p.location(index).map(|location| UniformValue {
                    location,
                    data: UniformData::of(p),
                })
            })
            .collect();
        Self {
            program: &pass.program,
            pass: index,
            filter: pass.signature.filter,
            width,
            height,
            fixed: pass.fixed,
            transforms: pass.transforms(width, height),
            uniforms,
        }
    }
}

// ── Dry run ────────────────────────────────────────────────────────────

/// A program as seen by [`DryRun`]: the uniforms its source declares.
#[derive(Debug, Clone, PartialEq)]
pub struct DryProgram {
    pub id: u32,
    pub source: String,
    pub uniforms: Vec<String>,
}

/// An "image" produced by [`DryRun`]: which program ids ran, in order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DryImage {
    pub width: u32,
    pub height: u32,
    pub history: Vec<u32>,
}

impl DryImage {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            history: Vec::new(),
        }
    }
}

/// Backend that accepts every program without touching a GPU.
///
/// Binding points are assigned to every `uniform` declared in the fragment
/// source, in declaration order. Useful for inspecting parameters and
/// generated code offline.
#[derive(Debug, Default)]
pub struct DryRun {
    next_id: u32,
    pub live: Vec<u32>,
    pub released: Vec<u32>,
}

impl DryRun {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Names of all `uniform` variables declared at top level of `source`.
pub fn declared_uniforms(source: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut tok = Tokenizer::new(source);
    let mut state = 0u8;
    while tok.next() {
        if tok.take_comment().is_some() {
            continue;
        }
        state = match state {
            0 if tok.is("uniform") => 1,
            1 => 2,
            2 => {
                names.push(tok.text().to_string());
                0
            }
            _ => 0,
        };
    }
    names
}

/// Uniforms of a program linking `fragment` with the shared vertex stage:
/// fragment declarations first, then the vertex-only ones.
pub fn linked_uniforms(fragment: &str) -> Vec<String> {
    let mut names = declared_uniforms(fragment);
    for name in declared_uniforms(VERTEX_SHADER) {
        if !names.contains(&name) {
            names.push(name);
        }
    }
    names
}

impl Backend for DryRun {
    type Shader = String;
    type Program = DryProgram;
    type Image = DryImage;

    fn compile_fragment(&mut self, source: &str) -> Result<Built<String>, String> {
        Ok(Built::quiet(source.to_string()))
    }

    fn link_program(&mut self, fragment: String) -> Result<Built<DryProgram>, String> {
        self.next_id += 1;
        self.live.push(self.next_id);
        Ok(Built::quiet(DryProgram {
            id: self.next_id,
            uniforms: linked_uniforms(&fragment),
            source: fragment,
        }))
    }

    fn uniform_location(&self, program: &DryProgram, name: &str) -> Option<UniformLocation> {
        program
            .uniforms
            .iter()
            .position(|u| u == name)
            .map(|i| UniformLocation(i as i32))
    }

    fn release_program(&mut self, program: DryProgram) {
        self.live.retain(|&id| id != program.id);
        self.released.push(program.id);
    }

    fn run_pass(
        &mut self,
        invocation: &PassInvocation<'_, DryProgram>,
        input: &DryImage,
    ) -> Result<DryImage, RenderError> {
        let mut out = input.clone();
        out.width = invocation.width;
        out.height = invocation.height;
        out.history.push(invocation.program.id);
        Ok(out)
    }
}
