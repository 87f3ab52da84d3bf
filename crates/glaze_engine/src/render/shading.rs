//! Procedural relief shading for the glazed ceramic label
//!
//! One grayscale relief texture serves as both height field and bump source.
//! The vertex stage pushes vertices along their normals by the red channel;
//! the fragment stage darkens grazing angles and relief valleys toward a
//! highlight color, adds a tight white specular and modulates by the relief to
//! give the glaze some grain. It is a look, not a physical model.
//!
//! The GPU runs [`VERTEX_SHADER`] and [`FRAGMENT_SHADER`]; the methods on
//! [`CeramicUniforms`] evaluate the same math on the CPU for previews and
//! tests.

use crate::foundation::math::{self, Vec2, Vec3};
use crate::foundation::Color;
use crate::render::texture::{sample_or_black, TextureRef};

/// GLSL vertex stage of the ceramic shader
pub const VERTEX_SHADER: &str = include_str!("../../shaders/ceramic.vert");

/// GLSL fragment stage of the ceramic shader
pub const FRAGMENT_SHADER: &str = include_str!("../../shaders/ceramic.frag");

/// Factor between the operator's bump scale and the `bumpScale` uniform
pub const BUMP_UNIFORM_FACTOR: f32 = 10.0;

/// Upper edge of the depth ramp
const DEPTH_RAMP_EDGE: f32 = 0.7;
/// Maximum blend toward the highlight color
const DEPTH_BLEND_LIMIT: f32 = 0.8;
const SPECULAR_EXPONENT: f32 = 64.0;
const SPECULAR_WEIGHT: f32 = 0.5;
const GRAIN_FLOOR: f32 = 0.8;
const GRAIN_GAIN: f32 = 0.3;

/// Uniform values of the ceramic shader
#[derive(Debug, Clone)]
pub struct CeramicUniforms {
    /// Glaze color
    pub base_color: Color,
    /// Color in the relief valleys and at grazing angles
    pub highlight_color: Color,
    /// Relief texture read as bump (red channel)
    pub bump_texture: Option<TextureRef>,
    /// Bump strength, already multiplied by [`BUMP_UNIFORM_FACTOR`]
    pub bump_scale: f32,
    /// Relief texture read as height (red channel)
    pub displacement_map: Option<TextureRef>,
    /// Height multiplier
    pub displacement_scale: f32,
    /// Height offset
    pub displacement_bias: f32,
    /// Tangent-space normal map
    pub normal_map: Option<TextureRef>,
    /// Normal map XY strength
    pub normal_scale: Vec2,
    /// Whether the normal map perturbs shading
    pub use_normal_map: bool,
}

impl Default for CeramicUniforms {
    fn default() -> Self {
        Self {
            base_color: Color::from_hex(0xd04c0f),
            highlight_color: Color::from_hex(0x3a0e02),
            bump_texture: None,
            bump_scale: 0.01,
            displacement_map: None,
            displacement_scale: 0.04,
            displacement_bias: -0.005,
            normal_map: None,
            normal_scale: Vec2::new(1.0, 1.0),
            use_normal_map: false,
        }
    }
}

/// An in-place update of one scalar or color uniform
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformPatch {
    /// Replace `highlightColor`
    HighlightColor(Color),
    /// Replace `bumpScale` (uniform units)
    BumpScale(f32),
    /// Replace `displacementScale`
    DisplacementScale(f32),
    /// Replace `displacementBias`
    DisplacementBias(f32),
}

impl CeramicUniforms {
    /// Apply a uniform patch
    pub fn apply(&mut self, patch: UniformPatch) {
        match patch {
            UniformPatch::HighlightColor(c) => self.highlight_color = c,
            UniformPatch::BumpScale(v) => self.bump_scale = v,
            UniformPatch::DisplacementScale(v) => self.displacement_scale = v,
            UniformPatch::DisplacementBias(v) => self.displacement_bias = v,
        }
    }

    /// Offset along the normal for a vertex at `uv`
    pub fn displacement_offset(&self, uv: &Vec2) -> f32 {
        let height = sample_or_black(self.displacement_map.as_ref(), uv).x;
        height * self.displacement_scale + self.displacement_bias
    }

    /// Vertex stage: displaced object-space position
    pub fn displace_vertex(&self, position: &Vec3, normal: &Vec3, uv: &Vec2) -> Vec3 {
        position + normal * self.displacement_offset(uv)
    }

    /// Shading normal, perturbed by the normal map when enabled
    pub fn shading_normal(&self, normal: &Vec3, uv: &Vec2) -> Vec3 {
        let n = math::normalize_or_zero(normal);
        if !self.use_normal_map {
            return n;
        }

        let texel = sample_or_black(self.normal_map.as_ref(), uv);
        let mut perturbation = Vec3::new(
            texel.x * 2.0 - 1.0,
            texel.y * 2.0 - 1.0,
            texel.z * 2.0 - 1.0,
        );
        perturbation.x *= self.normal_scale.x;
        perturbation.y *= self.normal_scale.y;
        let perturbation = math::normalize_or_zero(&perturbation);

        math::normalize_or_zero(&(n + perturbation))
    }

    /// Fragment stage: final color for a surface point
    ///
    /// `view_dir` points from the surface toward the eye. The result is not
    /// clamped; the render target does that.
    pub fn shade_fragment(&self, normal: &Vec3, view_dir: &Vec3, uv: &Vec2) -> Color {
        let n = self.shading_normal(normal, uv);
        let view = math::normalize_or_zero(view_dir);
        let bump_value = sample_or_black(self.bump_texture.as_ref(), uv).x;

        let facing = n.dot(&view);
        let depth = math::smoothstep(
            0.0,
            DEPTH_RAMP_EDGE,
            (1.0 - facing) + (1.0 - bump_value) * self.bump_scale * BUMP_UNIFORM_FACTOR,
        );

        let base = self.base_color.to_vec3();
        let highlight = self.highlight_color.to_vec3();
        let mut color = math::mix(&base, &highlight, depth * DEPTH_BLEND_LIMIT);

        let reflected = math::reflect(&(-view), &n);
        let specular = reflected.dot(&view).max(0.0).powf(SPECULAR_EXPONENT) * SPECULAR_WEIGHT;
        color += Vec3::repeat(specular);

        color *= GRAIN_FLOOR + bump_value * GRAIN_GAIN;
        Color::from_vec3(&color)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::ImageData;
    use crate::render::texture::{SamplerSettings, Texture};
    use approx::assert_relative_eq;
    use std::sync::Arc;

    fn gray(value: u8) -> TextureRef {
        let image = ImageData::solid_color(2, 2, [value, value, value, 255]);
        Arc::new(Texture::new(Arc::new(image), SamplerSettings::LABEL_UV))
    }

    fn flat_normal_map() -> TextureRef {
        // (128, 128, 255) encodes roughly +Z
        let image = ImageData::solid_color(2, 2, [128, 128, 255, 255]);
        Arc::new(Texture::new(Arc::new(image), SamplerSettings::LABEL_UV))
    }

    #[test]
    fn test_displacement_uses_red_scale_and_bias() {
        let uniforms = CeramicUniforms {
            displacement_map: Some(gray(255)),
            displacement_scale: 0.04,
            displacement_bias: -0.005,
            ..Default::default()
        };
        let uv = Vec2::new(0.5, 0.5);
        assert_relative_eq!(uniforms.displacement_offset(&uv), 0.035, epsilon = 1e-6);

        let moved = uniforms.displace_vertex(&Vec3::new(1.0, 2.0, 3.0), &Vec3::new(0.0, 1.0, 0.0), &uv);
        assert_relative_eq!(moved, Vec3::new(1.0, 2.035, 3.0), epsilon = 1e-6);
    }

    #[test]
    fn test_unbound_displacement_applies_only_bias() {
        let uniforms = CeramicUniforms::default();
        assert_relative_eq!(uniforms.displacement_offset(&Vec2::zeros()), -0.005);
    }

    #[test]
    fn test_head_on_view_on_peak() {
        // facing = 1, bump = 1: no depth shading, full specular, full grain
        let uniforms = CeramicUniforms {
            base_color: Color::new(0.5, 0.2, 0.1),
            bump_texture: Some(gray(255)),
            ..Default::default()
        };
        let n = Vec3::new(0.0, 0.0, 1.0);
        let color = uniforms.shade_fragment(&n, &n, &Vec2::new(0.5, 0.5));

        let expected = (Vec3::new(0.5, 0.2, 0.1) + Vec3::repeat(0.5)) * 1.1;
        assert_relative_eq!(color.to_vec3(), expected, epsilon = 1e-5);
    }

    #[test]
    fn test_grazing_view_saturates_toward_highlight() {
        let uniforms = CeramicUniforms {
            base_color: Color::WHITE,
            highlight_color: Color::BLACK,
            bump_texture: Some(gray(0)),
            ..Default::default()
        };
        let n = Vec3::new(0.0, 0.0, 1.0);
        let view = Vec3::new(1.0, 0.0, 0.0);
        let color = uniforms.shade_fragment(&n, &view, &Vec2::new(0.5, 0.5));

        // depth ramp saturates at 1, blend capped at 0.8, grain 0.8, no specular
        assert_relative_eq!(color.r, 0.2 * 0.8, epsilon = 1e-6);
    }

    #[test]
    fn test_valleys_are_darker_than_peaks() {
        let n = Vec3::new(0.0, 0.0, 1.0);
        let view = Vec3::new(0.0, 0.6, 0.8);
        let uv = Vec2::new(0.5, 0.5);
        let base = CeramicUniforms {
            base_color: Color::new(0.8, 0.3, 0.06),
            bump_scale: 0.006,
            ..Default::default()
        };

        let peak = CeramicUniforms { bump_texture: Some(gray(255)), ..base.clone() };
        let valley = CeramicUniforms { bump_texture: Some(gray(0)), ..base };

        let peak_color = peak.shade_fragment(&n, &view, &uv);
        let valley_color = valley.shade_fragment(&n, &view, &uv);
        assert!(valley_color.r < peak_color.r);
    }

    #[test]
    fn test_normal_map_disabled_keeps_geometric_normal() {
        let uniforms = CeramicUniforms {
            normal_map: Some(gray(0)),
            use_normal_map: false,
            ..Default::default()
        };
        let n = uniforms.shading_normal(&Vec3::new(0.0, 2.0, 0.0), &Vec2::zeros());
        assert_relative_eq!(n, Vec3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn test_flat_normal_map_keeps_facing_normal() {
        let uniforms = CeramicUniforms {
            normal_map: Some(flat_normal_map()),
            use_normal_map: true,
            ..Default::default()
        };
        let n = uniforms.shading_normal(&Vec3::new(0.0, 0.0, 1.0), &Vec2::new(0.5, 0.5));
        assert_relative_eq!(n, Vec3::new(0.0, 0.0, 1.0), epsilon = 1e-2);
        assert_relative_eq!(n.norm(), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_patches() {
        let mut uniforms = CeramicUniforms::default();
        uniforms.apply(UniformPatch::HighlightColor(Color::WHITE));
        uniforms.apply(UniformPatch::BumpScale(0.02));
        uniforms.apply(UniformPatch::DisplacementBias(0.01));
        assert_eq!(uniforms.highlight_color, Color::WHITE);
        assert_eq!(uniforms.bump_scale, 0.02);
        assert_eq!(uniforms.displacement_bias, 0.01);
    }

    #[test]
    fn test_shader_sources_declare_uniform_block() {
        assert!(VERTEX_SHADER.contains("CeramicUniforms"));
        assert!(FRAGMENT_SHADER.contains("CeramicUniforms"));
        assert!(FRAGMENT_SHADER.contains("smoothstep(0.0, 0.7"));
    }
}
