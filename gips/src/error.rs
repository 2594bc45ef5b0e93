use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// One line of per-node diagnostic text.
///
/// Everything except compiler and linker logs is prefixed with `(GIPS)` so a
/// reader can tell core complaints apart from driver output.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Diagnostic {
    #[error("(GIPS) unrecognized token '@{0}'")]
    UnrecognizedKey(String),

    #[error("(GIPS) '@{0}' token is only valid inside a parameter comment")]
    NeedsParameter(String),

    #[error("(GIPS) '@{0}' token requires a value")]
    NeedsValue(String),

    #[error("(GIPS) '@{0}' token requires a numeric value")]
    NeedsNumber(String),

    #[error("(GIPS) '@{key}' format is incompatible with uniform data type of parameter '{param}'")]
    IncompatibleType { key: String, param: String },

    #[error("(GIPS) unrecognized coordinate mapping mode '{0}'")]
    UnknownCoordMode(String),

    #[error("(GIPS) unrecognized texture filtering mode '{0}'")]
    UnknownFilterMode(String),

    #[error("(GIPS) uniform variable '{0}' has unsupported data type")]
    UnsupportedUniform(String),

    #[error("(GIPS) no valid first-pass function ('run' or 'run_pass1') found")]
    NoFirstPass,

    #[error("(GIPS) intermediate passes are missing, truncating pipeline")]
    MissingPasses,

    #[error("(GIPS) cannot load source: {0}")]
    Source(String),

    /// Compiler or linker output, passed through verbatim.
    #[error("{0}")]
    Log(String),
}

/// Ordered collection of diagnostics for one load attempt.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diagnostics {
    lines: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        log::debug!("{diagnostic}");
        self.lines.push(diagnostic);
    }

    /// Append a compiler or linker log. Empty logs are dropped.
    pub fn push_log(&mut self, log: &str) {
        let log = log.trim_end();
        if !log.is_empty() {
            self.push(Diagnostic::Log(log.to_string()));
        }
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.lines.extend(other.lines);
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.lines.iter()
    }

    pub fn contains(&self, diagnostic: &Diagnostic) -> bool {
        self.lines.contains(diagnostic)
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, line) in self.lines.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{line}")?;
        }
        Ok(())
    }
}

/// Why a load attempt ended with zero usable passes.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("no valid first-pass function ('run' or 'run_pass1') found")]
    NoFirstPass,

    #[error("pass {pass} failed to compile")]
    Compile { pass: usize, log: String },

    #[error("pass {pass} failed to link")]
    Link { pass: usize, log: String },

    #[error(transparent)]
    Source(#[from] SourceError),
}

/// Failure to obtain node source text.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("cannot read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no built-in preset named '{0}'")]
    UnknownPreset(String),
}

/// A backend failed to execute a pass.
#[derive(Debug, Error)]
#[error("pass {pass} of node '{node}' failed: {message}")]
pub struct RenderError {
    pub node: String,
    pub pass: usize,
    pub message: String,
}

impl RenderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            node: String::new(),
            pass: 0,
            message: message.into(),
        }
    }

    /// Attach the node and pass the failure happened in.
    pub fn at(mut self, node: &str, pass: usize) -> Self {
        self.node = node.to_string();
        self.pass = pass;
        self
    }
}
