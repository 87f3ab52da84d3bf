//! Label materials
//!
//! Parameter sets, material instances for both label variants, the factory
//! that builds them and the uniform blocks they upload.

pub mod material;
pub mod material_factory;
pub mod material_params;
pub mod material_ubo;

pub use material::{
    DisplacementSignature, MaterialId, MaterialInstance, MaterialKind, MaterialVariant,
    ProceduralShaderMaterial, StandardPhysicalMaterial,
};
pub use material_factory::MaterialFactory;
pub use material_params::{
    ChangeClass, InvalidParameterError, ParamChange, ParamKey, ParamValue, ParameterSet,
};
pub use material_ubo::{CeramicUniformBlock, MaterialUniformBlock, StandardPhysicalUniformBlock};
