//! Material uniform blocks for GPU data transfer
//!
//! std140-compatible layouts uploaded for each material variant. The ceramic
//! block must match `CeramicUniforms` in `shaders/ceramic.vert` and
//! `shaders/ceramic.frag`.

use bytemuck::{Pod, Zeroable};

use super::material::StandardPhysicalMaterial;
use crate::render::shading::CeramicUniforms;

/// Uniform data for the procedural ceramic shader
///
/// Set 1, binding 0.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct CeramicUniformBlock {
    /// Base color - RGB + unused
    pub base_color: [f32; 4],
    /// Highlight color - RGB + unused
    pub highlight_color: [f32; 4],
    /// bumpScale, displacementScale, displacementBias, useNormalMap (0 or 1)
    pub relief: [f32; 4],
    /// Normal scale XY + padding
    pub normal_scale: [f32; 4],
}

impl CeramicUniformBlock {
    /// Pack shader uniforms
    pub fn from_uniforms(uniforms: &CeramicUniforms) -> Self {
        Self {
            base_color: uniforms.base_color.to_rgba_array(1.0),
            highlight_color: uniforms.highlight_color.to_rgba_array(1.0),
            relief: [
                uniforms.bump_scale,
                uniforms.displacement_scale,
                uniforms.displacement_bias,
                if uniforms.use_normal_map { 1.0 } else { 0.0 },
            ],
            normal_scale: [uniforms.normal_scale.x, uniforms.normal_scale.y, 0.0, 0.0],
        }
    }
}

/// Uniform data for the physically based material
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct StandardPhysicalUniformBlock {
    /// Base color - RGB + alpha
    pub base_color: [f32; 4],
    /// Roughness, metalness, clearcoat, clearcoat roughness
    pub surface: [f32; 4],
    /// Reflectivity, bump scale, displacement scale, displacement bias
    pub relief: [f32; 4],
    /// Normal scale XY + padding
    pub normal_scale: [f32; 4],
    /// Texture usage flags - bump, displacement, normal, env map response
    pub texture_flags: [u32; 4],
}

impl StandardPhysicalUniformBlock {
    /// Pack material parameters
    pub fn from_material(material: &StandardPhysicalMaterial) -> Self {
        Self {
            base_color: material.color.to_rgba_array(1.0),
            surface: [
                material.roughness,
                material.metalness,
                material.clearcoat,
                material.clearcoat_roughness,
            ],
            relief: [
                material.reflectivity,
                material.bump_scale,
                material.displacement_scale,
                material.displacement_bias,
            ],
            normal_scale: [material.normal_scale.x, material.normal_scale.y, 0.0, 0.0],
            texture_flags: [
                u32::from(material.bump_map.is_some()),
                u32::from(material.displacement_map.is_some()),
                u32::from(material.normal_map.is_some()),
                u32::from(material.env_map_response),
            ],
        }
    }
}

/// Uniform block for either material variant
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MaterialUniformBlock {
    /// Physically based material data
    StandardPhysical(StandardPhysicalUniformBlock),
    /// Ceramic shader data
    Ceramic(CeramicUniformBlock),
}

impl MaterialUniformBlock {
    /// Get the size of this block in bytes
    pub fn size(&self) -> usize {
        match self {
            Self::StandardPhysical(_) => std::mem::size_of::<StandardPhysicalUniformBlock>(),
            Self::Ceramic(_) => std::mem::size_of::<CeramicUniformBlock>(),
        }
    }

    /// Get a byte slice of this block for GPU upload
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::StandardPhysical(block) => bytemuck::bytes_of(block),
            Self::Ceramic(block) => bytemuck::bytes_of(block),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::Color;

    #[test]
    fn test_block_sizes() {
        assert_eq!(std::mem::size_of::<CeramicUniformBlock>(), 64);
        assert_eq!(std::mem::size_of::<StandardPhysicalUniformBlock>(), 80);
    }

    #[test]
    fn test_ceramic_packing() {
        let uniforms = CeramicUniforms {
            base_color: Color::new(0.5, 0.25, 0.125),
            bump_scale: 0.006,
            use_normal_map: true,
            ..Default::default()
        };
        let block = CeramicUniformBlock::from_uniforms(&uniforms);

        assert_eq!(block.base_color, [0.5, 0.25, 0.125, 1.0]);
        assert_eq!(block.relief, [0.006, 0.04, -0.005, 1.0]);

        let packed = MaterialUniformBlock::Ceramic(block);
        assert_eq!(packed.as_bytes().len(), packed.size());
    }

    /// `(type, name)` of each member of the GLSL `CeramicUniforms` block
    fn ceramic_block_members(source: &str) -> Vec<(String, String)> {
        let start = source.find("uniform CeramicUniforms {").unwrap();
        let body = &source[start..];
        let body = &body[body.find('{').unwrap() + 1..body.find('}').unwrap()];

        body.lines()
            .map(|line| line.split("//").next().unwrap().trim())
            .filter(|line| !line.is_empty())
            .map(|line| {
                let mut parts = line.trim_end_matches(';').split_whitespace();
                (parts.next().unwrap().to_string(), parts.next().unwrap().to_string())
            })
            .collect()
    }

    #[test]
    fn test_ceramic_block_matches_shader_layout() {
        use crate::render::shading::{FRAGMENT_SHADER, VERTEX_SHADER};

        let expected: Vec<(String, String)> = ["baseColor", "highlightColor", "relief", "normalScale"]
            .iter()
            .map(|name| ("vec4".to_string(), (*name).to_string()))
            .collect();

        assert_eq!(ceramic_block_members(VERTEX_SHADER), expected);
        assert_eq!(ceramic_block_members(FRAGMENT_SHADER), expected);
        assert_eq!(std::mem::size_of::<CeramicUniformBlock>(), expected.len() * 16);

        let block = CeramicUniformBlock {
            base_color: [1.0; 4],
            highlight_color: [2.0; 4],
            relief: [3.0; 4],
            normal_scale: [4.0; 4],
        };
        let floats: &[f32] = bytemuck::cast_slice(bytemuck::bytes_of(&block));
        for (i, member) in floats.chunks_exact(4).enumerate() {
            assert_eq!(member, [(i + 1) as f32; 4]);
        }
    }

    #[test]
    fn test_standard_flags() {
        let block = StandardPhysicalUniformBlock::from_material(&StandardPhysicalMaterial {
            env_map_response: true,
            ..StandardPhysicalMaterial::fallback()
        });
        assert_eq!(block.texture_flags, [0, 0, 0, 1]);
        assert_eq!(block.surface, [0.15, 0.0, 1.0, 0.05]);
    }
}
