pub mod annotation;
pub mod backend;
pub mod codegen;
pub mod error;
pub mod lexer;
pub mod node;
pub mod param;
pub mod pass;
pub mod pipeline;
pub mod recognizer;
pub mod source;
pub mod token;

use serde::Serialize;

use backend::Backend;
use codegen::Build;
use error::LoadError;
use node::Node;
use param::Parameter;
use pass::PassSignature;

pub use recognizer::scan;

/// Scan `code` and build every contiguous pass with `backend`.
pub fn compile<B: Backend>(backend: &mut B, code: &str) -> Build<B::Program> {
    codegen::build(backend, code, recognizer::scan(code))
}

/// Generate the fragment source of every contiguous pass without compiling.
pub fn generate(code: &str) -> Result<Vec<String>, LoadError> {
    let scan = recognizer::scan(code);
    if scan.passes[0].is_none() {
        return Err(LoadError::NoFirstPass);
    }
    Ok(scan
        .passes
        .iter()
        .map_while(|s| s.as_ref())
        .map(|sig| codegen::generate_pass(code, sig, scan.single_pass))
        .collect())
}

/// Serializable summary of a node, for hosts and the CLI.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub name: String,
    pub loaded: bool,
    pub enabled: bool,
    pub passes: Vec<PassSignature>,
    pub params: Vec<Parameter>,
    pub diagnostics: Vec<String>,
}

impl Report {
    pub fn of<P>(node: &Node<P>) -> Self {
        Self {
            name: node.name().to_string(),
            loaded: node.is_loaded(),
            enabled: node.enabled(),
            passes: node.passes().map(|p| p.signature).collect(),
            params: node.params().to_vec(),
            diagnostics: node.diagnostics().iter().map(|d| d.to_string()).collect(),
        }
    }
}

#[cfg(test)]
mod integration_tests {
    use super::*;
    use crate::backend::DryRun;
    use crate::error::Diagnostic;
    use crate::param::ParamType;
    use crate::pass::{CoordMode, PassInput, PassOutput, TexFilter};
    use crate::source::NodeSource;

    #[test]
    fn end_to_end_single_pass() {
        let code = r#"
            uniform float gain = 1.5;  // overall gain @min=0 @max=4
            vec3 run(vec3 c) { return c * gain; }
        "#;
        let out = compile(&mut DryRun::new(), code);
        assert!(out.is_ok());
        assert_eq!(out.passes.len(), 1);
        let gain = &out.params[0];
        assert_eq!(gain.ty, ParamType::Scalar);
        assert_eq!((gain.min, gain.max), (0.0, 4.0));
        assert_eq!(gain.values(), [1.5]);
        assert_eq!(gain.description, "overall gain");
        assert_eq!(gain.format, "%.2f");
        assert!(out.sources[0].contains("gips_frag = vec4(run(color.rgb), color.a);"));
    }

    #[test]
    fn end_to_end_two_passes_with_settings() {
        let code = r#"
            uniform float radius = 3.0;  // blur radius @min=0 @max=20 @unit=px
            // @coord=pixel @filter=nearest
            vec4 run_pass1(vec2 pos) { return pixel(pos + vec2(radius, 0.0)); }
            // @coord=relative
            vec4 run_pass2(vec2 pos) { return pixel(pos); }
        "#;
        let out = compile(&mut DryRun::new(), code);
        assert!(out.is_ok());
        assert_eq!(out.passes.len(), 2);

        let p1 = out.passes.get(0).unwrap().signature;
        assert_eq!(p1.input, PassInput::Coordinate);
        assert_eq!(p1.output, PassOutput::Color4);
        assert_eq!(p1.coord_mode, CoordMode::Pixel);
        assert_eq!(p1.filter, TexFilter::Nearest);

        // filter setting persists until overwritten
        let p2 = out.passes.get(1).unwrap().signature;
        assert_eq!(p2.coord_mode, CoordMode::Relative);
        assert_eq!(p2.filter, TexFilter::Nearest);

        assert_eq!(out.params[0].format, "%.1f px");
        assert!(out.sources[1].contains("gips_frag = run_pass2(gips_pos);"));
    }

    #[test]
    fn generate_without_backend() {
        let sources = generate("vec4 run(vec4 c) { return c; }").unwrap();
        assert_eq!(sources.len(), 1);
        assert!(sources[0].contains("gips_frag = run(color);"));
        assert!(matches!(
            generate("vec4 helper(vec4 c) { return c; }"),
            Err(LoadError::NoFirstPass)
        ));
    }

    #[test]
    fn report_lists_diagnostics() {
        let mut be = DryRun::new();
        let mut node = Node::new(NodeSource::Preset("ripple".into()));
        node.load_str(&mut be, "uniform float x; // @bogus\nvec4 run(vec4 c) { return c; }")
            .unwrap();
        let report = Report::of(&node);
        assert!(report.loaded);
        assert_eq!(report.passes.len(), 1);
        assert_eq!(
            report.diagnostics,
            [Diagnostic::UnrecognizedKey("bogus".into()).to_string()]
        );
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["params"][0]["name"], "x");
        assert_eq!(json["params"][0]["type"], "scalar");
        assert_eq!(json["passes"][0]["input"], "color4");
    }
}
