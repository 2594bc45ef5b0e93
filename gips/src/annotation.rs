//! The `@key[=value]` mini-language embedded in source comments.
//!
//! Directives configure the parameter declared just before the comment
//! (`@min`, `@max`, `@unit`, `@toggle`, `@color`) or the next pass signature
//! (`@coord`, `@filter`). They are removed from the comment; whatever text
//! remains becomes the parameter's description.

use crate::error::{Diagnostic, Diagnostics};
use crate::param::{ParamType, Parameter, UniformType};
use crate::pass::{CoordMode, PassSettings, TexFilter};

/// Mutable state a comment's directives act on.
pub struct AnnotationContext<'a> {
    /// The parameter whose declaration precedes this comment, if any.
    pub param: Option<&'a mut Parameter>,
    /// Pass settings applied to the next recognized pass signature.
    pub pending: &'a mut PassSettings,
    pub diagnostics: &'a mut Diagnostics,
}

/// A single `@key[=value]` occurrence, both parts lower-cased.
#[derive(Debug, Clone, PartialEq)]
pub struct Directive {
    pub key: String,
    pub value: Option<String>,
}

impl Directive {
    fn number(&self) -> Option<f32> {
        self.value
            .as_deref()
            .and_then(|v| v.parse::<f32>().ok())
            .filter(|v| v.is_finite())
    }
}

fn is_key_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn is_value_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '+' | '-')
}

/// Remove all directives from `comment` and return them in order of
/// appearance together with the remaining text.
///
/// An `@` directly preceded by a letter or digit (as in an e-mail address)
/// is not a directive, and neither is a bare `@` with no key after it.
pub fn extract(comment: &str) -> (Vec<Directive>, String) {
    let mut text = comment.to_string();
    let mut directives = Vec::new();
    let mut pos = 0;

    while let Some(found) = text[pos..].find('@') {
        let at = pos + found;
        let embedded = text[..at]
            .chars()
            .next_back()
            .is_some_and(char::is_alphanumeric);
        let key_start = at + 1;
        let key_end = key_start
            + text[key_start..]
                .find(|c: char| !is_key_char(c))
                .unwrap_or(text.len() - key_start);
        if embedded || key_end == key_start {
            pos = key_start;
            continue;
        }

        let key = text[key_start..key_end].to_ascii_lowercase();
        let mut end = key_end;
        let mut value = None;
        if text[key_end..].starts_with('=') {
            let value_start = key_end + 1;
            let value_end = value_start
                + text[value_start..]
                    .find(|c: char| !is_value_char(c))
                    .unwrap_or(text.len() - value_start);
            value = Some(text[value_start..value_end].to_ascii_lowercase());
            end = value_end;
        }

        directives.push(Directive { key, value });
        text.replace_range(at..end, "");
        pos = at;
    }

    (directives, text)
}

/// Apply every directive in `comment` to `ctx` and return the comment text
/// with the directives stripped.
///
/// Problems are recorded in the context's diagnostics and never stop the
/// scan. If a parameter is open and text remains, it becomes the
/// parameter's description.
pub fn apply(comment: &str, ctx: &mut AnnotationContext<'_>) -> String {
    let (directives, rest) = extract(comment);
    for directive in &directives {
        apply_one(directive, ctx);
    }

    let rest = rest.trim().to_string();
    if let Some(param) = ctx.param.as_deref_mut() {
        if !rest.is_empty() {
            param.description = rest.clone();
        }
    }
    rest
}

fn apply_one(d: &Directive, ctx: &mut AnnotationContext<'_>) {
    let key = d.key.as_str();
    match key {
        "min" | "off" | "max" | "on" => {
            let Some(param) = need_param(key, ctx) else { return };
            match d.number() {
                Some(v) if matches!(key, "min" | "off") => param.min = v,
                Some(v) => param.max = v,
                None => ctx.diagnostics.push(Diagnostic::NeedsNumber(key.to_string())),
            }
        }
        "unit" => {
            let Some(param) = need_param(key, ctx) else { return };
            match &d.value {
                Some(unit) => param.unit = Some(unit.clone()),
                None => ctx.diagnostics.push(Diagnostic::NeedsValue(key.to_string())),
            }
        }
        "toggle" | "switch" => {
            let Some(param) = need_param(key, ctx) else { return };
            if !param.set_type(ParamType::Toggle) {
                let name = param.name.clone();
                incompatible(key, name, ctx);
            }
        }
        "color" => {
            let Some(param) = need_param(key, ctx) else { return };
            let ty = match param.data_type {
                UniformType::Vec3 => Some(ParamType::Rgb),
                UniformType::Vec4 => Some(ParamType::Rgba),
                UniformType::Float | UniformType::Vec2 => None,
            };
            match ty {
                Some(ty) => {
                    param.set_type(ty);
                }
                None => {
                    let name = param.name.clone();
                    incompatible(key, name, ctx);
                }
            }
        }
        "coord" | "coords" | "map" => {
            let Some(value) = need_value(d, ctx) else { return };
            match value {
                "pixel" => ctx.pending.coord_mode = CoordMode::Pixel,
                "none" => ctx.pending.coord_mode = CoordMode::None,
                "relative" | "rel" => ctx.pending.coord_mode = CoordMode::Relative,
                other => ctx
                    .diagnostics
                    .push(Diagnostic::UnknownCoordMode(other.to_string())),
            }
        }
        "filter" | "filt" => {
            let Some(value) = need_value(d, ctx) else { return };
            match value {
                "1" | "on" | "linear" | "bilinear" => ctx.pending.filter = TexFilter::Linear,
                "0" | "off" | "nearest" | "point" => ctx.pending.filter = TexFilter::Nearest,
                other => ctx
                    .diagnostics
                    .push(Diagnostic::UnknownFilterMode(other.to_string())),
            }
        }
        _ => ctx
            .diagnostics
            .push(Diagnostic::UnrecognizedKey(key.to_string())),
    }
}

fn need_param<'c>(key: &str, ctx: &'c mut AnnotationContext<'_>) -> Option<&'c mut Parameter> {
    if ctx.param.is_none() {
        ctx.diagnostics
            .push(Diagnostic::NeedsParameter(key.to_string()));
    }
    ctx.param.as_deref_mut()
}

fn need_value<'d>(d: &'d Directive, ctx: &mut AnnotationContext<'_>) -> Option<&'d str> {
    let value = d.value.as_deref();
    if value.is_none() {
        ctx.diagnostics.push(Diagnostic::NeedsValue(d.key.clone()));
    }
    value
}

fn incompatible(key: &str, param: String, ctx: &mut AnnotationContext<'_>) {
    ctx.diagnostics.push(Diagnostic::IncompatibleType {
        key: key.to_string(),
        param,
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Harness {
        param: Option<Parameter>,
        pending: PassSettings,
        diagnostics: Diagnostics,
    }

    impl Harness {
        fn with_param(data: UniformType) -> Self {
            Self {
                param: Some(Parameter::new("p", data)),
                pending: PassSettings::default(),
                diagnostics: Diagnostics::new(),
            }
        }

        fn without_param() -> Self {
            Self {
                param: None,
                pending: PassSettings::default(),
                diagnostics: Diagnostics::new(),
            }
        }

        fn run(&mut self, comment: &str) -> String {
            let mut ctx = AnnotationContext {
                param: self.param.as_mut(),
                pending: &mut self.pending,
                diagnostics: &mut self.diagnostics,
            };
            apply(comment, &mut ctx)
        }
    }

    #[test]
    fn extract_strips_directives_in_place() {
        let (ds, rest) = extract(" gain @MIN=0 @Max=5 of the effect");
        assert_eq!(
            ds,
            vec![
                Directive { key: "min".into(), value: Some("0".into()) },
                Directive { key: "max".into(), value: Some("5".into()) },
            ]
        );
        assert_eq!(rest, " gain   of the effect");
    }

    #[test]
    fn extract_skips_embedded_and_bare_at() {
        let (ds, rest) = extract(" mail me@example.com @ home @toggle");
        assert_eq!(ds.len(), 1);
        assert_eq!(ds[0].key, "toggle");
        assert_eq!(ds[0].value, None);
        assert_eq!(rest, " mail me@example.com @ home ");
    }

    #[test]
    fn extract_reads_signed_and_fractional_values() {
        let (ds, _) = extract("@min=-2 @max=0.2 @unit=px");
        assert_eq!(ds[0].value.as_deref(), Some("-2"));
        assert_eq!(ds[1].value.as_deref(), Some("0.2"));
        assert_eq!(ds[2].value.as_deref(), Some("px"));
    }

    #[test]
    fn bounds_and_description() {
        let mut h = Harness::with_param(UniformType::Float);
        let rest = h.run("  @min=0 @max=5  strength ");
        let p = h.param.unwrap();
        assert_eq!(p.min, 0.0);
        assert_eq!(p.max, 5.0);
        assert_eq!(p.description, "strength");
        assert_eq!(rest, "strength");
        assert!(h.diagnostics.is_empty());
    }

    #[test]
    fn off_on_are_bound_aliases() {
        let mut h = Harness::with_param(UniformType::Float);
        h.run(" invert chrominance @toggle @off=1 @on=-1");
        let p = h.param.unwrap();
        assert_eq!(p.ty, ParamType::Toggle);
        assert_eq!(p.min, 1.0);
        assert_eq!(p.max, -1.0);
        assert_eq!(p.description, "invert chrominance");
    }

    #[test]
    fn toggle_on_vec3_is_rejected() {
        let mut h = Harness::with_param(UniformType::Vec3);
        h.run("@toggle");
        assert_eq!(h.param.as_ref().unwrap().ty, ParamType::Vec3);
        assert!(h.diagnostics.contains(&Diagnostic::IncompatibleType {
            key: "toggle".into(),
            param: "p".into(),
        }));
    }

    #[test]
    fn color_follows_width() {
        let mut h = Harness::with_param(UniformType::Vec4);
        h.run("@color");
        assert_eq!(h.param.unwrap().ty, ParamType::Rgba);

        let mut h = Harness::with_param(UniformType::Vec2);
        h.run("@color");
        assert_eq!(h.param.unwrap().ty, ParamType::Vec2);
        assert_eq!(h.diagnostics.len(), 1);
    }

    #[test]
    fn numeric_directives_need_numbers() {
        let mut h = Harness::with_param(UniformType::Float);
        h.run("@min=abc @max");
        assert!(h.diagnostics.contains(&Diagnostic::NeedsNumber("min".into())));
        assert!(h.diagnostics.contains(&Diagnostic::NeedsNumber("max".into())));
        let p = h.param.unwrap();
        assert_eq!((p.min, p.max), (0.0, 1.0));
    }

    #[test]
    fn non_finite_bounds_are_rejected() {
        let mut h = Harness::with_param(UniformType::Float);
        h.run("@min=-inf @max=nan");
        assert!(h.diagnostics.contains(&Diagnostic::NeedsNumber("min".into())));
        assert!(h.diagnostics.contains(&Diagnostic::NeedsNumber("max".into())));
        let p = h.param.unwrap();
        assert_eq!((p.min, p.max), (0.0, 1.0));
    }

    #[test]
    fn parameter_directives_need_a_parameter() {
        let mut h = Harness::without_param();
        h.run("@min=0 @unit=px @color some text");
        assert_eq!(h.diagnostics.len(), 3);
        assert!(h.diagnostics.contains(&Diagnostic::NeedsParameter("unit".into())));
    }

    #[test]
    fn pass_settings_accumulate() {
        let mut h = Harness::without_param();
        h.run("@coord=REL @filter=point");
        assert_eq!(h.pending.coord_mode, CoordMode::Relative);
        assert_eq!(h.pending.filter, TexFilter::Nearest);

        h.run("@map=none @filt=bilinear");
        assert_eq!(h.pending.coord_mode, CoordMode::None);
        assert_eq!(h.pending.filter, TexFilter::Linear);

        h.run("@coord=sideways @filter");
        assert_eq!(h.pending.coord_mode, CoordMode::None);
        assert!(h
            .diagnostics
            .contains(&Diagnostic::UnknownCoordMode("sideways".into())));
        assert!(h.diagnostics.contains(&Diagnostic::NeedsValue("filter".into())));
    }

    #[test]
    fn unknown_keys_do_not_stop_the_scan() {
        let mut h = Harness::with_param(UniformType::Float);
        h.run("@bogus @max=3");
        assert!(h.diagnostics.contains(&Diagnostic::UnrecognizedKey("bogus".into())));
        assert_eq!(h.param.unwrap().max, 3.0);
    }

    #[test]
    fn empty_remainder_keeps_description() {
        let mut h = Harness::with_param(UniformType::Float);
        h.param.as_mut().unwrap().description = "kept".into();
        h.run(" @max=2 ");
        assert_eq!(h.param.unwrap().description, "kept");
    }
}
