//! Declaration recognizer.
//!
//! Instead of parsing GLSL, the recognizer classifies each token into a tiny
//! vocabulary and keeps the last four classes in a window (most recent
//! first). Two fixed shapes are matched against that window:
//!
//! ```text
//! uniform declaration:  [2] uniform  [1] float|vec2|vec3|vec4  [0] <name>
//! pass signature:       [3] vec3|vec4  [2] run|run_passN  [1] (  [0] vec2|vec3|vec4
//! ```
//!
//! Comments are captured whole and handed to the annotation parser.

use crate::annotation::{self, AnnotationContext};
use crate::error::{Diagnostic, Diagnostics};
use crate::lexer::Tokenizer;
use crate::param::{Parameter, UniformType};
use crate::pass::{PassInput, PassOutput, PassSettings, PassSignature, MAX_PASSES};
use crate::token::Token;

const WINDOW: usize = 4;

/// Name of a pass function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunName {
    /// `run`: the node has exactly one pass.
    Single,
    /// `run_pass1` .. `run_pass4`, zero-based.
    Numbered(usize),
}

/// Token classes the window works with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Class {
    #[default]
    Other,
    Uniform,
    Type(UniformType),
    Run(RunName),
    OpenParen,
    CloseParen,
}

/// Classify a token. `None` means the token is elided from the window.
fn classify(text: &str) -> Option<Class> {
    let class = match text {
        "in" => return None,
        "uniform" => Class::Uniform,
        "run" => Class::Run(RunName::Single),
        "run_pass1" => Class::Run(RunName::Numbered(0)),
        "run_pass2" => Class::Run(RunName::Numbered(1)),
        "run_pass3" => Class::Run(RunName::Numbered(2)),
        "run_pass4" => Class::Run(RunName::Numbered(3)),
        "(" => Class::OpenParen,
        ")" | "){" => Class::CloseParen,
        other => UniformType::from_keyword(other)
            .map(Class::Type)
            .unwrap_or(Class::Other),
    };
    Some(class)
}

/// The last [`WINDOW`] classes, most recent at index 0.
#[derive(Debug, Default)]
struct Window([Class; WINDOW]);

impl Window {
    fn push(&mut self, class: Class) {
        self.0.rotate_right(1);
        self.0[0] = class;
    }

    /// `[uniform][type][name]` with the name just pushed.
    fn uniform(&self) -> Option<Option<UniformType>> {
        match self.0 {
            [_, Class::Type(ty), Class::Uniform, _] => Some(Some(ty)),
            [_, _, Class::Uniform, _] => Some(None),
            _ => None,
        }
    }

    /// `[vec3|vec4][run*][(][vec2|vec3|vec4]` with the argument type just pushed.
    fn pass(&self) -> Option<(RunName, PassInput, PassOutput)> {
        let [Class::Type(arg), Class::OpenParen, Class::Run(name), Class::Type(ret)] = self.0
        else {
            return None;
        };
        let input = match arg {
            UniformType::Vec2 => PassInput::Coordinate,
            UniformType::Vec3 => PassInput::Color3,
            UniformType::Vec4 => PassInput::Color4,
            UniformType::Float => return None,
        };
        let output = match ret {
            UniformType::Vec3 => PassOutput::Color3,
            UniformType::Vec4 => PassOutput::Color4,
            UniformType::Float | UniformType::Vec2 => return None,
        };
        Some((name, input, output))
    }
}

/// An open `uniform` statement, between its name and its `;`.
#[derive(Debug)]
struct Declaration {
    /// Index into the parameter list; `None` for unsupported types.
    param: Option<usize>,
    /// Next default-value component, once `=` has been seen.
    value_index: Option<usize>,
    negate: bool,
}

/// Everything the recognizer learned from one source text.
#[derive(Debug, Default)]
pub struct ScanOutput {
    pub params: Vec<Parameter>,
    /// Recognized pass signatures by index. May contain gaps.
    pub passes: [Option<PassSignature>; MAX_PASSES],
    /// `run` was used: entry points call the bare function name.
    pub single_pass: bool,
    pub diagnostics: Diagnostics,
}

impl ScanOutput {
    /// Number of passes usable without a gap, starting at index 0.
    pub fn contiguous_passes(&self) -> usize {
        self.passes.iter().take_while(|p| p.is_some()).count()
    }

    /// Are there recognized passes beyond the first gap?
    pub fn has_gap(&self) -> bool {
        let n = self.contiguous_passes();
        self.passes[n..].iter().any(Option::is_some)
    }
}

/// Value of a numeric literal, ignoring GLSL type suffixes (`1.5f`, `2.0lf`).
fn parse_number(text: &str) -> Option<f32> {
    text.trim_end_matches(['f', 'F', 'l', 'L'])
        .parse::<f32>()
        .ok()
        .filter(|v| v.is_finite())
}

/// Scan `source` for parameters and pass signatures.
pub fn scan(source: &str) -> ScanOutput {
    let mut out = ScanOutput::default();
    let mut tok = Tokenizer::new(source);
    let mut window = Window::default();
    let mut pending = PassSettings::default();
    // parameter the next comment describes
    let mut open_param: Option<usize> = None;
    let mut decl: Option<Declaration> = None;

    while tok.next() {
        if let Some(comment) = tok.take_comment() {
            let mut ctx = AnnotationContext {
                param: open_param.map(|i| &mut out.params[i]),
                pending: &mut pending,
                diagnostics: &mut out.diagnostics,
            };
            annotation::apply(&comment, &mut ctx);
            // a comment consumes the parameter it describes
            open_param = None;
            continue;
        }

        let Some(class) = classify(tok.text()) else {
            continue;
        };
        window.push(class);

        if let Some(ty) = window.uniform() {
            let name = tok.text();
            match ty {
                Some(ty) => {
                    log::trace!("uniform {} {name}", ty.keyword());
                    out.params.push(Parameter::new(name, ty));
                    let index = out.params.len() - 1;
                    open_param = Some(index);
                    decl = Some(Declaration {
                        param: Some(index),
                        value_index: None,
                        negate: false,
                    });
                }
                None => {
                    out.diagnostics
                        .push(Diagnostic::UnsupportedUniform(name.to_string()));
                    open_param = None;
                    decl = None;
                }
            }
            continue;
        }

        if let Some(d) = decl.as_mut() {
            if let Some(param) = d.param {
                match d.value_index {
                    None if tok.contains('=') => {
                        d.value_index = Some(0);
                        continue;
                    }
                    Some(i) if i < 4 => {
                        if tok.token() == Some(Token::Number) {
                            if let Some(v) = parse_number(tok.text()) {
                                out.params[param].value[i] = if d.negate { -v } else { v };
                                d.value_index = Some(i + 1);
                            }
                            d.negate = false;
                        } else {
                            d.negate = tok.is("-");
                        }
                    }
                    _ => {}
                }
            }
        }

        if tok.contains(';') {
            decl = None;
            continue;
        }

        if let Some((name, input, output)) = window.pass() {
            let index = match name {
                RunName::Single => {
                    out.single_pass = true;
                    0
                }
                RunName::Numbered(i) => {
                    if i == 0 {
                        out.single_pass = false;
                    }
                    i
                }
            };
            if index >= MAX_PASSES {
                continue;
            }
            let sig = PassSignature::new(index, input, output, pending);
            log::trace!("pass {} signature: {sig:?}", index + 1);
            out.passes[index] = Some(sig);
        }
    }

    for p in &mut out.params {
        p.finalize();
    }
    out
}
