//! Where node source text comes from: shader files or built-in presets.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use serde::Serialize;

use crate::error::SourceError;

/// File extensions recognized as node sources (compared case-insensitively).
pub const SHADER_EXTENSIONS: &[&str] = &["glsl", "frag", "gips"];

/// Built-in presets, usable when no file is available.
pub const PRESETS: &[(&str, &str)] = &[
    (
        "saturation",
        "uniform float saturation = 1.0;  // @min=0 @max=5
uniform vec3 key = vec3(.299, .587, .114);  // grayscale downmix
uniform float invert;  // invert luminance @toggle
uniform float sign = 1.0;  // invert chrominance @toggle @off=1 @on=-1
vec3 run(vec3 c) {
  float luma = dot(c, key / (key.r + key.g + key.b));
  vec3 chroma = c - vec3(luma);
  if (invert > 0.5) { luma = 1.0 - luma; }
  return vec3(luma) + chroma * saturation * sign;
}
",
    ),
    (
        "ripple",
        "uniform float amplitude;  // @min=0 @max=0.2
uniform float frequency = 50.0;  // @min=0 @max=200
uniform float phase;  // @min=0 @max=6.28
uniform vec2 center;  // @min=-2 @max=2
// @coord=rel
vec4 run(vec2 pos) {
  vec2 tp = pos - center;
  float d = length(tp);
  vec2 n = tp / d;
  d += amplitude * sin(frequency * d + phase);
  return pixel(n * d + center);
}
",
    ),
];

/// Look up a built-in preset by name.
pub fn preset(name: &str) -> Option<&'static str> {
    PRESETS
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, code)| *code)
}

/// Does `path` carry one of the recognized shader extensions?
pub fn is_shader_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            SHADER_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(e))
        })
        .unwrap_or(false)
}

/// Identity of a node's source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "name", rename_all = "lowercase")]
pub enum NodeSource {
    File(PathBuf),
    Preset(String),
}

impl NodeSource {
    /// Interpret a user-supplied name: a path with a shader extension or an
    /// existing file is a file, anything else a preset name.
    pub fn resolve(name: &str) -> Self {
        let path = Path::new(name);
        if is_shader_file(path) || path.is_file() {
            NodeSource::File(path.to_path_buf())
        } else {
            NodeSource::Preset(name.to_string())
        }
    }

    /// Short name for display: the file stem, or the preset name.
    pub fn display_name(&self) -> String {
        match self {
            NodeSource::File(path) => path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("shader")
                .to_string(),
            NodeSource::Preset(name) => name.clone(),
        }
    }

    pub fn read(&self) -> Result<String, SourceError> {
        match self {
            NodeSource::File(path) => fs::read_to_string(path).map_err(|source| SourceError::Io {
                path: path.clone(),
                source,
            }),
            NodeSource::Preset(name) => preset(name)
                .map(str::to_string)
                .ok_or_else(|| SourceError::UnknownPreset(name.clone())),
        }
    }

    /// Current fingerprint of the backing file, if there is one.
    pub fn fingerprint(&self) -> Option<Fingerprint> {
        match self {
            NodeSource::File(path) => Fingerprint::of(path),
            NodeSource::Preset(_) => None,
        }
    }
}

/// Size and modification time of a file, used to notice edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fingerprint {
    pub size: u64,
    pub mtime: u64,
}

impl Fingerprint {
    pub fn of(path: &Path) -> Option<Self> {
        let meta = fs::metadata(path).ok()?;
        let mtime = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0);
        let fp = Self {
            size: meta.len(),
            mtime,
        };
        if fp.size == 0 && fp.mtime == 0 {
            None
        } else {
            Some(fp)
        }
    }
}

/// An entry of a shader directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShaderEntry {
    /// File or directory name without extension.
    pub name: String,
    pub path: PathBuf,
    /// Sub-directory contents; empty for files.
    pub children: Vec<ShaderEntry>,
    pub is_dir: bool,
}

/// List shader files under `dir`, recursively.
///
/// Directories come first, then files, each sorted by name. Hidden entries
/// and directories without any shader files are left out.
pub fn list_shaders(dir: &Path) -> std::io::Result<Vec<ShaderEntry>> {
    let mut dirs = Vec::new();
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let file_name = entry.file_name();
        let Some(file_name) = file_name.to_str() else {
            continue;
        };
        if file_name.starts_with('.') {
            continue;
        }
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(file_name)
            .to_string();
        if path.is_dir() {
            let children = list_shaders(&path)?;
            if !children.is_empty() {
                dirs.push(ShaderEntry {
                    name: file_name.to_string(),
                    path,
                    children,
                    is_dir: true,
                });
            }
        } else if is_shader_file(&path) {
            files.push(ShaderEntry {
                name,
                path,
                children: Vec::new(),
                is_dir: false,
            });
        }
    }
    dirs.sort_by(|a, b| a.name.cmp(&b.name));
    files.sort_by(|a, b| a.name.cmp(&b.name));
    dirs.extend(files);
    Ok(dirs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extensions_are_case_insensitive() {
        assert!(is_shader_file(Path::new("blur.glsl")));
        assert!(is_shader_file(Path::new("dir/Blur.FRAG")));
        assert!(is_shader_file(Path::new("x.gips")));
        assert!(!is_shader_file(Path::new("x.png")));
        assert!(!is_shader_file(Path::new("glsl")));
    }

    #[test]
    fn resolve_prefers_files_for_shader_names() {
        assert_eq!(
            NodeSource::resolve("filters/blur.glsl"),
            NodeSource::File(PathBuf::from("filters/blur.glsl"))
        );
        assert_eq!(
            NodeSource::resolve("ripple"),
            NodeSource::Preset("ripple".into())
        );
    }

    #[test]
    fn display_names() {
        assert_eq!(NodeSource::File("a/b/sharpen.frag".into()).display_name(), "sharpen");
        assert_eq!(NodeSource::Preset("ripple".into()).display_name(), "ripple");
    }

    #[test]
    fn presets_resolve() {
        assert!(NodeSource::Preset("saturation".into()).read().is_ok());
        assert!(matches!(
            NodeSource::Preset("nope".into()).read(),
            Err(SourceError::UnknownPreset(_))
        ));
        assert!(NodeSource::Preset("ripple".into()).fingerprint().is_none());
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let src = NodeSource::File("/definitely/not/here.glsl".into());
        assert!(matches!(src.read(), Err(SourceError::Io { .. })));
        assert!(src.fingerprint().is_none());
    }
}
