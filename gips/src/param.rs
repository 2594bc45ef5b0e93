//! User-tunable parameters discovered from `uniform` declarations.

use serde::Serialize;

use crate::pass::MAX_PASSES;

/// Declared GLSL data type of a parameter's uniform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UniformType {
    Float,
    Vec2,
    Vec3,
    Vec4,
}

impl UniformType {
    pub fn from_keyword(word: &str) -> Option<Self> {
        match word {
            "float" => Some(UniformType::Float),
            "vec2" => Some(UniformType::Vec2),
            "vec3" => Some(UniformType::Vec3),
            "vec4" => Some(UniformType::Vec4),
            _ => None,
        }
    }

    pub fn keyword(self) -> &'static str {
        match self {
            UniformType::Float => "float",
            UniformType::Vec2 => "vec2",
            UniformType::Vec3 => "vec3",
            UniformType::Vec4 => "vec4",
        }
    }
}

/// How a parameter is presented and edited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    Scalar,
    Vec2,
    Vec3,
    Vec4,
    Toggle,
    Rgb,
    Rgba,
}

impl ParamType {
    /// The type a freshly declared uniform gets before any directive.
    pub fn default_for(data: UniformType) -> Self {
        match data {
            UniformType::Float => ParamType::Scalar,
            UniformType::Vec2 => ParamType::Vec2,
            UniformType::Vec3 => ParamType::Vec3,
            UniformType::Vec4 => ParamType::Vec4,
        }
    }

    /// Can a uniform of type `data` be presented as `self`?
    pub fn fits(self, data: UniformType) -> bool {
        match self {
            ParamType::Scalar | ParamType::Toggle => data == UniformType::Float,
            ParamType::Vec2 => data == UniformType::Vec2,
            ParamType::Vec3 | ParamType::Rgb => data == UniformType::Vec3,
            ParamType::Vec4 | ParamType::Rgba => data == UniformType::Vec4,
        }
    }

    pub fn components(self) -> usize {
        match self {
            ParamType::Scalar | ParamType::Toggle => 1,
            ParamType::Vec2 => 2,
            ParamType::Vec3 | ParamType::Rgb => 3,
            ParamType::Vec4 | ParamType::Rgba => 4,
        }
    }
}

/// Opaque binding point of a uniform inside one linked program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct UniformLocation(pub i32);

/// A user-tunable value discovered from a uniform declaration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: ParamType,
    pub data_type: UniformType,
    pub value: [f32; 4],
    pub min: f32,
    pub max: f32,
    /// printf-style display format, e.g. `%.2f` or `%.1f px`.
    pub format: String,
    pub description: String,
    /// Unit suffix from `@unit`, folded into `format` on finalize.
    #[serde(skip)]
    pub unit: Option<String>,
    /// Binding point in each pass's program; `None` where the pass does not
    /// use the uniform.
    #[serde(skip)]
    pub locations: [Option<UniformLocation>; MAX_PASSES],
}

impl Parameter {
    pub fn new(name: impl Into<String>, data_type: UniformType) -> Self {
        Self {
            name: name.into(),
            ty: ParamType::default_for(data_type),
            data_type,
            value: [0.0; 4],
            min: 0.0,
            max: 1.0,
            format: String::new(),
            description: String::new(),
            unit: None,
            locations: [None; MAX_PASSES],
        }
    }

    /// Switch the presentation type. Fails without change if the declared
    /// uniform width cannot hold it.
    pub fn set_type(&mut self, ty: ParamType) -> bool {
        if ty.fits(self.data_type) {
            self.ty = ty;
            true
        } else {
            false
        }
    }

    /// Number of decimals used to display values of this parameter.
    pub fn precision(&self) -> usize {
        let abs_max = self.min.abs().max(self.max.abs()).max(1e-6);
        (2 - abs_max.log10().floor() as i32).max(0) as usize
    }

    /// Derive the display format from the bounds and the optional unit.
    pub fn finalize(&mut self) {
        let fmt = format!("%.{}f", self.precision());
        self.format = match &self.unit {
            Some(unit) => format!("{fmt} {unit}"),
            None => fmt,
        };
    }

    /// Render one value the way `format` describes it.
    pub fn format_value(&self, v: f32) -> String {
        let prec = self.precision();
        match &self.unit {
            Some(unit) => format!("{v:.prec$} {unit}"),
            None => format!("{v:.prec$}"),
        }
    }

    /// The components that are meaningful for this parameter.
    pub fn values(&self) -> &[f32] {
        &self.value[..self.ty.components()]
    }

    /// Store new component values, clamped according to the parameter type.
    /// Extra components are ignored; missing ones keep their value.
    pub fn set_value(&mut self, values: &[f32]) {
        let n = self.ty.components().min(values.len());
        let (lo, hi) = if self.min <= self.max {
            (self.min, self.max)
        } else {
            (self.max, self.min)
        };
        for (slot, &v) in self.value[..n].iter_mut().zip(values) {
            *slot = match self.ty {
                // max/min instead of clamp: a NaN bound must not panic
                ParamType::Scalar | ParamType::Vec2 | ParamType::Vec3 | ParamType::Vec4 => {
                    v.max(lo).min(hi)
                }
                ParamType::Rgb | ParamType::Rgba => v.max(0.0).min(1.0),
                ParamType::Toggle => {
                    if (v - self.max).abs() < (v - self.min).abs() {
                        self.max
                    } else {
                        self.min
                    }
                }
            };
        }
    }

    /// For toggles: is the value closer to the "on" (`max`) value?
    pub fn is_on(&self) -> bool {
        (self.value[0] - self.max).abs() < (self.value[0] - self.min).abs()
    }

    pub fn set_on(&mut self, on: bool) {
        self.value[0] = if on { self.max } else { self.min };
    }

    pub fn location(&self, pass: usize) -> Option<UniformLocation> {
        self.locations.get(pass).copied().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_types_follow_width() {
        assert_eq!(ParamType::default_for(UniformType::Float), ParamType::Scalar);
        assert_eq!(ParamType::default_for(UniformType::Vec3), ParamType::Vec3);
        assert!(ParamType::Rgb.fits(UniformType::Vec3));
        assert!(ParamType::Rgba.fits(UniformType::Vec4));
        assert!(!ParamType::Toggle.fits(UniformType::Vec3));
    }

    #[test]
    fn set_type_rejects_mismatch() {
        let mut p = Parameter::new("key", UniformType::Vec3);
        assert!(!p.set_type(ParamType::Toggle));
        assert_eq!(p.ty, ParamType::Vec3);
        assert!(p.set_type(ParamType::Rgb));
        assert_eq!(p.ty, ParamType::Rgb);
    }

    #[test]
    fn format_scales_with_bounds() {
        let mut p = Parameter::new("gain", UniformType::Float);
        p.finalize();
        assert_eq!(p.format, "%.2f");

        p.max = 200.0;
        p.finalize();
        assert_eq!(p.format, "%.0f");

        p.max = 0.2;
        p.finalize();
        assert_eq!(p.format, "%.3f");

        p.max = 50.0;
        p.unit = Some("px".into());
        p.finalize();
        assert_eq!(p.format, "%.1f px");
        assert_eq!(p.format_value(12.345), "12.3 px");
    }

    #[test]
    fn clamp_by_type() {
        let mut p = Parameter::new("v", UniformType::Vec2);
        p.min = -2.0;
        p.max = 2.0;
        p.set_value(&[5.0, -5.0, 9.0]);
        assert_eq!(p.values(), &[2.0, -2.0]);
        assert_eq!(p.value[2], 0.0);

        let mut c = Parameter::new("tint", UniformType::Vec3);
        c.set_type(ParamType::Rgb);
        c.min = 0.0;
        c.max = 10.0;
        c.set_value(&[1.5, 0.5, -1.0]);
        assert_eq!(c.values(), &[1.0, 0.5, 0.0]);
    }

    #[test]
    fn nan_bounds_do_not_panic() {
        let mut p = Parameter::new("g", UniformType::Float);
        p.max = f32::NAN;
        p.set_value(&[0.5]);
        assert!(p.value[0].is_finite());

        let mut c = Parameter::new("c", UniformType::Vec3);
        c.set_type(ParamType::Rgb);
        c.set_value(&[f32::NAN, 2.0, 0.25]);
        assert_eq!(&c.value[1..3], &[1.0, 0.25]);
    }

    #[test]
    fn toggle_snaps_to_nearest_state() {
        let mut t = Parameter::new("sign", UniformType::Float);
        t.set_type(ParamType::Toggle);
        t.min = 1.0;
        t.max = -1.0;
        t.set_value(&[0.2]);
        assert_eq!(t.value[0], 1.0);
        assert!(!t.is_on());
        t.set_value(&[-0.7]);
        assert_eq!(t.value[0], -1.0);
        assert!(t.is_on());
        t.set_on(false);
        assert_eq!(t.value[0], 1.0);
    }
}
