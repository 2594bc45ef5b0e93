use crate::backend::Backend;
use crate::error::{Diagnostic, Diagnostics, LoadError};
use crate::param::Parameter;
use crate::pass::{FixedLocations, Pass, PassInput, PassSignature, PassSlots};
use crate::recognizer::ScanOutput;

use super::{generate_pass, glsl};

/// Result of turning one scan into compiled passes.
///
/// On failure `passes` is empty: everything this attempt created has already
/// been handed back to the backend.
#[derive(Debug)]
pub struct Build<P> {
    pub passes: PassSlots<P>,
    pub params: Vec<Parameter>,
    pub diagnostics: Diagnostics,
    /// Generated fragment sources, one per attempted pass.
    pub sources: Vec<String>,
    /// Number of passes that compiled and linked before a failure.
    pub generated: usize,
    pub error: Option<LoadError>,
}

impl<P> Build<P> {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Generate, compile and link every contiguous pass of `scan`.
///
/// `code` is the user source the scan was made from; it is embedded verbatim
/// in every pass. A compile or link failure aborts the remaining passes and
/// releases the ones already linked in this attempt.
pub fn build<B: Backend>(backend: &mut B, code: &str, scan: ScanOutput) -> Build<B::Program> {
    let ScanOutput {
        mut params,
        passes: signatures,
        single_pass,
        mut diagnostics,
    } = scan;
    let mut passes = PassSlots::new();
    let mut sources = Vec::new();

    if signatures[0].is_none() {
        diagnostics.push(Diagnostic::NoFirstPass);
        return Build {
            passes,
            params,
            diagnostics,
            sources,
            generated: 0,
            error: Some(LoadError::NoFirstPass),
        };
    }

    let mut error = None;
    for sig in signatures.iter().map_while(|s| s.as_ref()) {
        let source = generate_pass(code, sig, single_pass);
        log::debug!(
            "pass {}: {:?} -> {:?}, coords {:?}, filter {:?}",
            sig.index + 1,
            sig.input,
            sig.output,
            sig.coord_mode,
            sig.filter
        );
        let linked = link_pass(backend, &source, sig.index, &mut diagnostics);
        sources.push(source);
        match linked {
            Ok(program) => {
                let pass = resolve(backend, program, *sig, &mut params);
                passes.push(pass);
            }
            Err(e) => {
                error = Some(e);
                break;
            }
        }
    }

    let generated = passes.len();
    if error.is_some() {
        for program in passes.drain() {
            backend.release_program(program);
        }
    } else if generated < signatures.iter().flatten().count() {
        diagnostics.push(Diagnostic::MissingPasses);
    }

    Build {
        passes,
        params,
        diagnostics,
        sources,
        generated,
        error,
    }
}

fn link_pass<B: Backend>(
    backend: &mut B,
    source: &str,
    index: usize,
    diagnostics: &mut Diagnostics,
) -> Result<B::Program, LoadError> {
    let shader = match backend.compile_fragment(source) {
        Ok(built) => {
            diagnostics.push_log(&built.log);
            built.value
        }
        Err(log) => {
            diagnostics.push_log(&log);
            return Err(LoadError::Compile { pass: index + 1, log });
        }
    };
    match backend.link_program(shader) {
        Ok(built) => {
            diagnostics.push_log(&built.log);
            Ok(built.value)
        }
        Err(log) => {
            diagnostics.push_log(&log);
            Err(LoadError::Link { pass: index + 1, log })
        }
    }
}

/// Look up the fixed and per-parameter binding points of a linked pass.
fn resolve<B: Backend>(
    backend: &B,
    program: B::Program,
    sig: PassSignature,
    params: &mut [Parameter],
) -> Pass<B::Program> {
    let fixed = FixedLocations {
        image_size: backend.uniform_location(&program, glsl::IMAGE_SIZE),
        rel2map: backend.uniform_location(&program, glsl::REL2MAP),
        pos2ndc: backend.uniform_location(&program, glsl::POS2NDC),
        map2tex: if sig.input == PassInput::Coordinate {
            backend.uniform_location(&program, glsl::MAP2TEX)
        } else {
            None
        },
    };
    for p in params.iter_mut() {
        p.locations[sig.index] = backend.uniform_location(&program, &p.name);
    }
    log::debug!(
        "pass {}: {} of {} parameters bound",
        sig.index + 1,
        params.iter().filter(|p| p.locations[sig.index].is_some()).count(),
        params.len()
    );
    Pass {
        signature: sig,
        program,
        fixed,
    }
}
