//! Label material creation
//!
//! MaterialFactory turns a parameter snapshot and a derived texture set into a
//! self-contained material instance:
//! - Procedural ceramic shader when `eticUseCustomShader` is set
//! - Physically based material otherwise
//! - Texture-less fallback when the relief texture is unavailable

use crate::assets::DerivedTextureSet;
use crate::foundation::math::Vec2;
use crate::render::shading::{CeramicUniforms, UniformPatch, BUMP_UNIFORM_FACTOR};
use crate::scene::MeshTags;

use super::material::{MaterialInstance, ProceduralShaderMaterial, StandardPhysicalMaterial};
use super::material_params::{ParamChange, ParameterSet};

/// Factory for label materials
pub struct MaterialFactory;

impl MaterialFactory {
    /// Build the material selected by `params`
    ///
    /// Bump and displacement textures are picked from `textures` by the invert
    /// flags. Inverted variants are derived on first use. The normal map is
    /// wired only if enabled and already loaded.
    pub fn build(tags: MeshTags, params: &ParameterSet, textures: &DerivedTextureSet) -> MaterialInstance {
        let bump = textures.bump(params.invert_bump);
        let displacement = textures.displacement(params.invert_displacement);
        let normal_map = textures.normal_map().filter(|_| params.normal_map_enabled);

        if params.use_custom_shader {
            let mut uniforms = CeramicUniforms {
                base_color: params.color,
                highlight_color: params.highlight_color,
                bump_texture: Some(bump.clone()),
                bump_scale: params.bump_scale * BUMP_UNIFORM_FACTOR,
                displacement_map: Some(displacement.clone()),
                displacement_scale: params.displacement_scale,
                displacement_bias: params.displacement_bias,
                ..Default::default()
            };

            if let Some(map) = normal_map {
                uniforms.normal_map = Some(map.clone());
                uniforms.use_normal_map = true;
                uniforms.normal_scale = Vec2::new(params.normal_scale, params.normal_scale);
            }

            MaterialInstance::procedural(ProceduralShaderMaterial { uniforms }).with_name("label_ceramic")
        } else {
            let material = StandardPhysicalMaterial {
                color: params.color,
                roughness: params.roughness,
                metalness: params.metalness,
                clearcoat: params.clearcoat,
                clearcoat_roughness: params.clearcoat_roughness,
                reflectivity: params.reflectivity,
                bump_map: Some(bump.clone()),
                bump_scale: params.bump_scale,
                displacement_map: Some(displacement.clone()),
                displacement_scale: params.displacement_scale,
                displacement_bias: params.displacement_bias,
                normal_map: normal_map.cloned(),
                normal_scale: Vec2::new(params.normal_scale, params.normal_scale),
                env_map_response: tags.contains(MeshTags::ENV_MAP_RESPONSE),
            };

            MaterialInstance::standard_physical(material).with_name("label_physical")
        }
    }

    /// Texture-less material applied when the relief texture fails to load
    pub fn fallback(tags: MeshTags) -> MaterialInstance {
        let material = StandardPhysicalMaterial {
            env_map_response: tags.contains(MeshTags::ENV_MAP_RESPONSE),
            ..StandardPhysicalMaterial::fallback()
        };
        MaterialInstance::standard_physical(material).with_name("label_fallback")
    }

    /// In-place uniform update for a change, if it has one
    ///
    /// Bump scale is converted to uniform units here.
    pub fn uniform_patch_for(change: &ParamChange) -> Option<UniformPatch> {
        match *change {
            ParamChange::HighlightColor(c) => Some(UniformPatch::HighlightColor(c)),
            ParamChange::BumpScale(v) => Some(UniformPatch::BumpScale(v * BUMP_UNIFORM_FACTOR)),
            ParamChange::DisplacementScale(v) => Some(UniformPatch::DisplacementScale(v)),
            ParamChange::DisplacementBias(v) => Some(UniformPatch::DisplacementBias(v)),
            _ => None,
        }
    }
}
