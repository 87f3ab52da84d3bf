//! # Rendering
//!
//! CPU-side rendering data for the label: sampled textures, material
//! instances with their GPU uniform blocks, and the procedural ceramic
//! shading model.

pub mod materials;
pub mod shading;
pub mod texture;

pub use materials::{MaterialFactory, MaterialInstance, MaterialVariant};
pub use shading::{CeramicUniforms, UniformPatch};
pub use texture::{SamplerSettings, Texture, TextureId, TextureRef, WrapMode};
