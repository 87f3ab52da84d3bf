//! Parameter and scene export
//!
//! Two forms:
//! - [`params_literal`]: a `params = { ... }` literal an operator pastes back
//!   into a host script, colors written as `'0xrrggbb'`
//! - [`SceneSnapshot`]: parameters (colors as `#rrggbb`) plus a summary of the
//!   materials attached in the scene, serialized as RON

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::render::materials::{MaterialInstance, MaterialKind, ParamValue, ParameterSet};
use crate::scene::SceneGraph;

/// Export errors
#[derive(Error, Debug)]
pub enum ExportError {
    /// RON serialization failed
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Writing the export failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Render the parameter set as a pasteable literal
pub fn params_literal(params: &ParameterSet) -> String {
    let mut out = String::from("params = {\n");
    let entries = params.entries();
    let last = entries.len().saturating_sub(1);

    for (i, (key, value)) in entries.into_iter().enumerate() {
        let rendered = match value {
            ParamValue::Color(c) => format!("'{}'", c.to_hex_literal()),
            ParamValue::Scalar(v) => v.to_string(),
            ParamValue::Flag(b) => b.to_string(),
        };
        let separator = if i == last { "" } else { "," };
        out.push_str(&format!("    {}: {}{}\n", key.name(), rendered, separator));
    }

    out.push('}');
    out
}

/// Descriptive header of a snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Model name
    pub name: String,
    /// Free-form description
    pub description: String,
}

impl Default for ModelInfo {
    fn default() -> Self {
        Self {
            name: "Wine bottle".to_string(),
            description: "Bottle with ceramic label".to_string(),
        }
    }
}

/// Resolved state of one attached material
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialSummary {
    /// Variant name
    pub kind: String,
    /// Material name
    pub name: String,
    /// Base color as `#rrggbb`
    pub color: String,
    /// Roughness, physical variant only
    pub roughness: Option<f32>,
    /// Metalness, physical variant only
    pub metalness: Option<f32>,
    /// Clearcoat, physical variant only
    pub clearcoat: Option<f32>,
    /// Clearcoat roughness, physical variant only
    pub clearcoat_roughness: Option<f32>,
    /// Reflectivity, physical variant only
    pub reflectivity: Option<f32>,
    /// Whether a normal map is bound
    pub normal_map: bool,
}

impl MaterialSummary {
    /// Summarize an attached material
    pub fn of(material: &MaterialInstance) -> Self {
        let name = material
            .name
            .clone()
            .unwrap_or_else(|| format!("Material_{}", material.id.0));

        match &material.kind {
            MaterialKind::StandardPhysical(m) => Self {
                kind: "StandardPhysical".to_string(),
                name,
                color: m.color.to_hex_string(),
                roughness: Some(m.roughness),
                metalness: Some(m.metalness),
                clearcoat: Some(m.clearcoat),
                clearcoat_roughness: Some(m.clearcoat_roughness),
                reflectivity: Some(m.reflectivity),
                normal_map: m.normal_map.is_some(),
            },
            MaterialKind::ProceduralShader(m) => Self {
                kind: "ProceduralShader".to_string(),
                name,
                color: m.uniforms.base_color.to_hex_string(),
                roughness: None,
                metalness: None,
                clearcoat: None,
                clearcoat_roughness: None,
                reflectivity: None,
                normal_map: m.uniforms.use_normal_map,
            },
        }
    }
}

/// Parameters plus the materials currently in the scene
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneSnapshot {
    /// Model header
    pub model: ModelInfo,
    /// Parameter set
    pub parameters: ParameterSet,
    /// Attached materials keyed by node name
    pub materials: BTreeMap<String, MaterialSummary>,
}

impl SceneSnapshot {
    /// Capture the parameters and every attached material
    pub fn capture(params: &ParameterSet, scene: &SceneGraph) -> Self {
        let materials = scene
            .iter()
            .filter_map(|(_, node)| {
                node.material
                    .as_ref()
                    .map(|material| (node.name.clone(), MaterialSummary::of(material)))
            })
            .collect();

        Self {
            model: ModelInfo::default(),
            parameters: params.clone(),
            materials,
        }
    }

    /// Pretty RON text
    pub fn to_ron(&self) -> Result<String, ExportError> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| ExportError::Serialize(e.to_string()))
    }

    /// Write pretty RON to `path`
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ExportError> {
        let text = self.to_ron()?;
        std::fs::write(path.as_ref(), text)?;
        log::info!("Exported scene snapshot to {:?}", path.as_ref());
        Ok(())
    }
}
