//! Material instances attached to mesh nodes
//!
//! A node carries exactly one [`MaterialInstance`]: either a physically based
//! material or the procedural ceramic shader. Switching variants replaces the
//! instance; nothing migrates between them.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::foundation::math::Vec2;
use crate::foundation::Color;
use crate::render::shading::{CeramicUniforms, UniformPatch};
use crate::render::texture::{TextureId, TextureRef};

use super::material_ubo::{CeramicUniformBlock, MaterialUniformBlock, StandardPhysicalUniformBlock};

static NEXT_MATERIAL_ID: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for materials
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MaterialId(pub u64);

impl MaterialId {
    /// Mint a fresh identifier
    pub fn fresh() -> Self {
        Self(NEXT_MATERIAL_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Physically based material parameters
#[derive(Debug, Clone)]
pub struct StandardPhysicalMaterial {
    /// Base color
    pub color: Color,
    /// Roughness factor (0.0 = mirror, 1.0 = completely rough)
    pub roughness: f32,
    /// Metalness factor (0.0 = dielectric, 1.0 = metallic)
    pub metalness: f32,
    /// Clearcoat layer strength
    pub clearcoat: f32,
    /// Clearcoat layer roughness
    pub clearcoat_roughness: f32,
    /// Reflectivity for dielectrics
    pub reflectivity: f32,
    /// Bump texture
    pub bump_map: Option<TextureRef>,
    /// Bump strength
    pub bump_scale: f32,
    /// Displacement texture
    pub displacement_map: Option<TextureRef>,
    /// Displacement multiplier
    pub displacement_scale: f32,
    /// Displacement offset
    pub displacement_bias: f32,
    /// Tangent-space normal map
    pub normal_map: Option<TextureRef>,
    /// Normal map XY strength
    pub normal_scale: Vec2,
    /// Whether the material responds to the scene environment map
    pub env_map_response: bool,
}

impl Default for StandardPhysicalMaterial {
    fn default() -> Self {
        Self {
            color: Color::WHITE,
            roughness: 1.0,
            metalness: 0.0,
            clearcoat: 0.0,
            clearcoat_roughness: 0.0,
            reflectivity: 0.5,
            bump_map: None,
            bump_scale: 1.0,
            displacement_map: None,
            displacement_scale: 1.0,
            displacement_bias: 0.0,
            normal_map: None,
            normal_scale: Vec2::new(1.0, 1.0),
            env_map_response: false,
        }
    }
}

impl StandardPhysicalMaterial {
    /// Texture-less glaze used when the relief texture cannot be loaded
    pub fn fallback() -> Self {
        Self {
            color: Color::WHITE,
            roughness: 0.15,
            metalness: 0.0,
            clearcoat: 1.0,
            clearcoat_roughness: 0.05,
            reflectivity: 0.8,
            bump_scale: 0.05,
            displacement_scale: 0.08,
            displacement_bias: -0.05,
            ..Default::default()
        }
    }

    /// Whether any texture is bound
    pub fn has_textures(&self) -> bool {
        self.bump_map.is_some() || self.displacement_map.is_some() || self.normal_map.is_some()
    }
}

/// Procedural ceramic shader material
#[derive(Debug, Clone, Default)]
pub struct ProceduralShaderMaterial {
    /// Shader uniforms
    pub uniforms: CeramicUniforms,
}

/// Material variant and parameters
#[derive(Debug, Clone)]
pub enum MaterialKind {
    /// Physically based material
    StandardPhysical(StandardPhysicalMaterial),
    /// Procedural ceramic shader
    ProceduralShader(ProceduralShaderMaterial),
}

/// Variant tag without parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaterialVariant {
    /// [`MaterialKind::StandardPhysical`]
    StandardPhysical,
    /// [`MaterialKind::ProceduralShader`]
    ProceduralShader,
}

/// Inputs that move vertices; a change here invalidates cached normals
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplacementSignature {
    /// Bound displacement texture
    pub map: Option<TextureId>,
    /// Displacement multiplier
    pub scale: f32,
    /// Displacement offset
    pub bias: f32,
}

/// A material attached to a mesh node
#[derive(Debug, Clone)]
pub struct MaterialInstance {
    /// Material variant and parameters
    pub kind: MaterialKind,
    /// Unique identifier for this instance
    pub id: MaterialId,
    /// Optional name for debugging
    pub name: Option<String>,
}

impl MaterialInstance {
    /// Create a physically based material instance
    pub fn standard_physical(material: StandardPhysicalMaterial) -> Self {
        Self {
            kind: MaterialKind::StandardPhysical(material),
            id: MaterialId::fresh(),
            name: None,
        }
    }

    /// Create a procedural shader instance
    pub fn procedural(material: ProceduralShaderMaterial) -> Self {
        Self {
            kind: MaterialKind::ProceduralShader(material),
            id: MaterialId::fresh(),
            name: None,
        }
    }

    /// Set the material name for debugging
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Variant tag
    pub fn variant(&self) -> MaterialVariant {
        match self.kind {
            MaterialKind::StandardPhysical(_) => MaterialVariant::StandardPhysical,
            MaterialKind::ProceduralShader(_) => MaterialVariant::ProceduralShader,
        }
    }

    /// Physically based parameters, if this is that variant
    pub fn as_standard(&self) -> Option<&StandardPhysicalMaterial> {
        match &self.kind {
            MaterialKind::StandardPhysical(material) => Some(material),
            MaterialKind::ProceduralShader(_) => None,
        }
    }

    /// Shader uniforms, if this is the procedural variant
    pub fn uniforms(&self) -> Option<&CeramicUniforms> {
        match &self.kind {
            MaterialKind::ProceduralShader(material) => Some(&material.uniforms),
            MaterialKind::StandardPhysical(_) => None,
        }
    }

    /// Patch a uniform in place
    ///
    /// Returns `false` for the physically based variant, which has no uniform
    /// patch path and must be rebuilt instead.
    pub fn patch_uniform(&mut self, patch: UniformPatch) -> bool {
        match &mut self.kind {
            MaterialKind::ProceduralShader(material) => {
                material.uniforms.apply(patch);
                true
            }
            MaterialKind::StandardPhysical(_) => false,
        }
    }

    /// Displacement inputs of this material
    pub fn displacement_signature(&self) -> DisplacementSignature {
        match &self.kind {
            MaterialKind::StandardPhysical(m) => DisplacementSignature {
                map: m.displacement_map.as_ref().map(|t| t.id()),
                scale: m.displacement_scale,
                bias: m.displacement_bias,
            },
            MaterialKind::ProceduralShader(m) => DisplacementSignature {
                map: m.uniforms.displacement_map.as_ref().map(|t| t.id()),
                scale: m.uniforms.displacement_scale,
                bias: m.uniforms.displacement_bias,
            },
        }
    }

    /// Pack the scalar state for GPU upload
    pub fn uniform_block(&self) -> MaterialUniformBlock {
        match &self.kind {
            MaterialKind::StandardPhysical(m) => {
                MaterialUniformBlock::StandardPhysical(StandardPhysicalUniformBlock::from_material(m))
            }
            MaterialKind::ProceduralShader(m) => {
                MaterialUniformBlock::Ceramic(CeramicUniformBlock::from_uniforms(&m.uniforms))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique() {
        let a = MaterialInstance::standard_physical(StandardPhysicalMaterial::default());
        let b = MaterialInstance::standard_physical(StandardPhysicalMaterial::default());
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_fallback_is_texture_less() {
        let fallback = StandardPhysicalMaterial::fallback();
        assert!(!fallback.has_textures());
        assert_eq!(fallback.roughness, 0.15);
        assert_eq!(fallback.clearcoat, 1.0);
        assert_eq!(fallback.displacement_bias, -0.05);
    }

    #[test]
    fn test_patch_only_on_procedural() {
        let mut standard = MaterialInstance::standard_physical(StandardPhysicalMaterial::default());
        assert!(!standard.patch_uniform(UniformPatch::BumpScale(0.5)));

        let mut shader = MaterialInstance::procedural(ProceduralShaderMaterial::default());
        let id = shader.id;
        assert!(shader.patch_uniform(UniformPatch::BumpScale(0.5)));
        assert_eq!(shader.uniforms().unwrap().bump_scale, 0.5);
        assert_eq!(shader.id, id, "patching keeps the instance");
    }

    #[test]
    fn test_variant_tags() {
        let shader = MaterialInstance::procedural(ProceduralShaderMaterial::default()).with_name("label");
        assert_eq!(shader.variant(), MaterialVariant::ProceduralShader);
        assert!(shader.as_standard().is_none());
        assert_eq!(shader.name.as_deref(), Some("label"));
    }
}
