//! Fragment-stage generation.
//!
//! Every recognized pass becomes one complete program:
//! fixed header, the user's source verbatim, and a synthesized `main()` that
//! calls the pass function and converts its result to RGBA.

use crate::pass::{PassInput, PassOutput, PassSignature};

mod build;
pub mod glsl;


pub use self::build::{build, Build};
pub use self::glsl::{POS_TO_NDC, VERTEX_SHADER};

/// Line-oriented GLSL writer.
pub(crate) struct GlslGen {
    pub(crate) output: String,
    pub(crate) indent: usize,
}

impl GlslGen {
    pub(crate) fn new() -> Self {
        Self {
            output: String::new(),
            indent: 0,
        }
    }

    pub(crate) fn line(&mut self, s: &str) {
        for _ in 0..self.indent {
            self.output.push_str("  ");
        }
        self.output.push_str(s);
        self.output.push('\n');
    }

    /// Append text as-is, making sure it ends with a newline.
    pub(crate) fn raw(&mut self, s: &str) {
        self.output.push_str(s);
        if !s.ends_with('\n') {
            self.output.push('\n');
        }
    }

    // ── Sections ───────────────────────────────────────────────────────

    fn emit_header(&mut self, input: PassInput) {
        self.line(glsl::VERSION);
        self.line(&format!("#line {} 0", glsl::HEADER_LINE));
        self.line(&format!("in vec2 {};", glsl::POS));
        self.line(&format!("out vec4 {};", glsl::FRAG));
        self.line(&format!("uniform sampler2D {};", glsl::TEX));
        self.line(&format!("uniform vec2 {};", glsl::IMAGE_SIZE));
        if input == PassInput::Coordinate {
            self.line(&format!("uniform vec4 {};", glsl::MAP2TEX));
            for l in glsl::PIXEL_HELPER {
                self.line(l);
            }
        }
    }

    fn emit_user_code(&mut self, index: usize, code: &str) {
        // source string number = pass number, so logs point at the pass
        self.line(&format!("#line 1 {}", index + 1));
        self.raw(code);
    }

    fn emit_entry(&mut self, sig: &PassSignature, single_pass: bool) {
        self.line(&format!("#line {} 0", glsl::ENTRY_LINE));
        self.line("void main() {");
        self.indent += 1;

        if sig.input != PassInput::Coordinate {
            self.line(&format!("vec4 color = texture({}, {});", glsl::TEX, glsl::POS));
        }

        let arg = match sig.input {
            PassInput::Coordinate => glsl::POS,
            PassInput::Color3 => "color.rgb",
            PassInput::Color4 => "color",
        };
        let call = format!("{}({arg})", function_name(sig.index, single_pass));
        let value = match sig.output {
            PassOutput::Color4 => call,
            PassOutput::Color3 if sig.input == PassInput::Coordinate => {
                format!("vec4({call}, 1.0)")
            }
            PassOutput::Color3 => format!("vec4({call}, color.a)"),
        };
        self.line(&format!("{} = {value};", glsl::FRAG));

        self.indent -= 1;
        self.line("}");
    }
}

/// Name of the user function implementing pass `index`.
pub fn function_name(index: usize, single_pass: bool) -> String {
    if index == 0 && single_pass {
        "run".to_string()
    } else {
        format!("run_pass{}", index + 1)
    }
}

/// Generate the complete fragment-stage source for one pass.
pub fn generate_pass(code: &str, sig: &PassSignature, single_pass: bool) -> String {
    let mut gen = GlslGen::new();
    gen.emit_header(sig.input);
    gen.emit_user_code(sig.index, code);
    gen.emit_entry(sig, single_pass);
    gen.output
}
