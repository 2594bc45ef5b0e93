//! Pass model: what a `run`/`run_passN` signature declares, and the compiled
//! stage built from it.

use serde::Serialize;

use crate::codegen::POS_TO_NDC;
use crate::param::UniformLocation;

/// Hard cap on passes per node (`run_pass1` .. `run_pass4`).
pub const MAX_PASSES: usize = 4;

/// What the user's pass function takes as its argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PassInput {
    /// `vec2` position; the function samples the image itself via `pixel()`.
    Coordinate,
    /// `vec3` color of the current pixel.
    Color3,
    /// `vec4` color of the current pixel.
    Color4,
}

/// What the user's pass function returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PassOutput {
    Color3,
    Color4,
}

/// How a Coordinate-input pass's position relates to the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CoordMode {
    /// Pixel units, pixel centers at integer positions.
    #[default]
    Pixel,
    /// Centered, aspect-corrected; the shorter image axis spans `[-1, 1]`.
    Relative,
    /// Raw texture coordinates in `[0, 1]`.
    None,
}

/// Texture filter used when the pass samples its input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TexFilter {
    Nearest,
    #[default]
    Linear,
}

/// Pass configuration accumulated from annotations. It applies to the next
/// recognized pass signature and persists until overwritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PassSettings {
    pub coord_mode: CoordMode,
    pub filter: TexFilter,
}

/// A pass as declared in source, before code generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PassSignature {
    pub index: usize,
    pub input: PassInput,
    pub output: PassOutput,
    pub coord_mode: CoordMode,
    pub filter: TexFilter,
}

impl PassSignature {
    pub fn new(index: usize, input: PassInput, output: PassOutput, settings: PassSettings) -> Self {
        // remapping has no meaning for color-to-color passes
        let coord_mode = if input == PassInput::Coordinate {
            settings.coord_mode
        } else {
            CoordMode::None
        };
        Self {
            index,
            input,
            output,
            coord_mode,
            filter: settings.filter,
        }
    }
}

/// Binding points of the fixed per-pass uniforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FixedLocations {
    pub image_size: Option<UniformLocation>,
    pub rel2map: Option<UniformLocation>,
    pub map2tex: Option<UniformLocation>,
    /// Vertex-stage quad placement, `gips_pos2ndc`.
    pub pos2ndc: Option<UniformLocation>,
}

/// One compiled stage of a node. Owns its program.
#[derive(Debug)]
pub struct Pass<P> {
    pub signature: PassSignature,
    pub program: P,
    pub fixed: FixedLocations,
}

impl<P> Pass<P> {
    pub fn index(&self) -> usize {
        self.signature.index
    }

    /// Values of the fixed uniforms for an image of `width` x `height`.
    pub fn transforms(&self, width: u32, height: u32) -> Transforms {
        Transforms::new(self.signature.coord_mode, width, height)
    }
}

/// Fixed uniform values for one pass and image size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transforms {
    pub image_size: [f32; 2],
    /// Relative `[0, 1]` position to map coordinates: `xy + rel * zw`.
    pub rel2map: [f32; 4],
    /// Map coordinates to texture coordinates: `xy + pos * zw`.
    pub map2tex: [f32; 4],
    /// Unit quad to normalized device coordinates, always the full viewport.
    pub pos2ndc: [f32; 4],
}

impl Transforms {
    pub fn new(mode: CoordMode, width: u32, height: u32) -> Self {
        let w = width.max(1) as f32;
        let h = height.max(1) as f32;
        let (rel2map, map2tex) = match mode {
            CoordMode::None => ([0.0, 0.0, 1.0, 1.0], [0.0, 0.0, 1.0, 1.0]),
            CoordMode::Pixel => (
                [-0.5, -0.5, w, h],
                [0.5 / w, 0.5 / h, 1.0 / w, 1.0 / h],
            ),
            CoordMode::Relative => {
                let s = w.min(h);
                (
                    [-w / s, -h / s, 2.0 * w / s, 2.0 * h / s],
                    [0.5, 0.5, s / (2.0 * w), s / (2.0 * h)],
                )
            }
        };
        Self {
            image_size: [w, h],
            rel2map,
            map2tex,
            pos2ndc: POS_TO_NDC,
        }
    }

    /// Where a relative position ends up in texture space.
    pub fn rel_to_tex(&self, rel: [f32; 2]) -> [f32; 2] {
        let m = [
            self.rel2map[0] + rel[0] * self.rel2map[2],
            self.rel2map[1] + rel[1] * self.rel2map[3],
        ];
        [
            self.map2tex[0] + m[0] * self.map2tex[2],
            self.map2tex[1] + m[1] * self.map2tex[3],
        ]
    }
}

/// Fixed-capacity arena of passes with an explicit active count.
///
/// Slots `0..count` are always filled; there are never gaps.
#[derive(Debug)]
pub struct PassSlots<P> {
    slots: [Option<Pass<P>>; MAX_PASSES],
    count: usize,
}

impl<P> Default for PassSlots<P> {
    fn default() -> Self {
        Self {
            slots: std::array::from_fn(|_| None),
            count: 0,
        }
    }
}

impl<P> PassSlots<P> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Append the next pass. Its index must equal the current count.
    pub fn push(&mut self, pass: Pass<P>) {
        debug_assert_eq!(pass.index(), self.count);
        debug_assert!(self.count < MAX_PASSES);
        if self.count < MAX_PASSES {
            self.slots[self.count] = Some(pass);
            self.count += 1;
        }
    }

    pub fn get(&self, index: usize) -> Option<&Pass<P>> {
        if index < self.count {
            self.slots[index].as_ref()
        } else {
            None
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Pass<P>> {
        self.slots[..self.count].iter().flatten()
    }

    /// Remove every pass, handing the programs back for release.
    pub fn drain(&mut self) -> Vec<P> {
        let count = std::mem::take(&mut self.count);
        self.slots[..count]
            .iter_mut()
            .filter_map(Option::take)
            .map(|pass| pass.program)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pass(index: usize) -> Pass<u32> {
        Pass {
            signature: PassSignature::new(
                index,
                PassInput::Color3,
                PassOutput::Color3,
                PassSettings::default(),
            ),
            program: index as u32 + 100,
            fixed: FixedLocations::default(),
        }
    }

    #[test]
    fn color_passes_never_remap() {
        let settings = PassSettings {
            coord_mode: CoordMode::Relative,
            filter: TexFilter::Nearest,
        };
        let sig = PassSignature::new(0, PassInput::Color4, PassOutput::Color4, settings);
        assert_eq!(sig.coord_mode, CoordMode::None);
        assert_eq!(sig.filter, TexFilter::Nearest);

        let sig = PassSignature::new(0, PassInput::Coordinate, PassOutput::Color4, settings);
        assert_eq!(sig.coord_mode, CoordMode::Relative);
    }

    #[test]
    fn slots_fill_in_order_and_drain() {
        let mut slots = PassSlots::new();
        slots.push(pass(0));
        slots.push(pass(1));
        assert_eq!(slots.len(), 2);
        assert_eq!(slots.get(1).map(|p| p.program), Some(101));
        assert!(slots.get(2).is_none());
        assert_eq!(slots.drain(), vec![100, 101]);
        assert!(slots.is_empty());
        assert!(slots.get(0).is_none());
    }

    #[test]
    fn transforms_map_image_corners_to_texture_corners() {
        for mode in [CoordMode::Pixel, CoordMode::Relative, CoordMode::None] {
            let t = Transforms::new(mode, 640, 480);
            assert_eq!(t.pos2ndc, POS_TO_NDC);
            for rel in [[0.0, 0.0], [1.0, 1.0], [0.25, 0.75]] {
                let tex = t.rel_to_tex(rel);
                assert!((tex[0] - rel[0]).abs() < 1e-5, "{mode:?} {rel:?} -> {tex:?}");
                assert!((tex[1] - rel[1]).abs() < 1e-5, "{mode:?} {rel:?} -> {tex:?}");
            }
        }
    }

    #[test]
    fn pixel_mode_puts_centers_on_integers() {
        let t = Transforms::new(CoordMode::Pixel, 4, 2);
        // center of pixel (1, 0) in relative coordinates
        let rel = [1.5 / 4.0, 0.5 / 2.0];
        let x = t.rel2map[0] + rel[0] * t.rel2map[2];
        let y = t.rel2map[1] + rel[1] * t.rel2map[3];
        assert!((x - 1.0).abs() < 1e-6);
        assert!(y.abs() < 1e-6);
    }

    #[test]
    fn relative_mode_spans_shorter_axis() {
        let t = Transforms::new(CoordMode::Relative, 200, 100);
        assert_eq!(t.rel2map, [-2.0, -1.0, 4.0, 2.0]);
        assert_eq!(t.image_size, [200.0, 100.0]);
    }
}
