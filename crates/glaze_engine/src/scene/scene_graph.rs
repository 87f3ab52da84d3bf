//! Scene applier trait and the in-memory scene graph
//!
//! The material core never walks a scene. It is handed node ids and talks to
//! the scene through [`SceneApplier`]: read tags, swap or patch the attached
//! material, request a normal recomputation. [`SceneGraph`] is the plain
//! implementation used by hosts without their own scene and by tests.

use bitflags::bitflags;
use slotmap::{new_key_type, SlotMap};
use thiserror::Error;

use crate::foundation::math::{self, Vec2, Vec3};
use crate::render::materials::MaterialInstance;
use crate::render::shading::CeramicUniforms;

new_key_type! {
    /// Stable handle to a mesh node
    pub struct NodeId;
}

bitflags! {
    /// Capability tags assigned when a node is added to the scene
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MeshTags: u32 {
        /// Ceramic label driven by the label parameters
        const LABEL = 1 << 0;
        /// Transparent glass body
        const GLASS = 1 << 1;
        /// Material samples the scene environment map
        const ENV_MAP_RESPONSE = 1 << 2;
        /// Node casts shadows
        const CASTS_SHADOW = 1 << 3;
        /// Node receives shadows
        const RECEIVES_SHADOW = 1 << 4;
    }
}

/// Scene access errors
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneError {
    /// The node was removed or never existed
    #[error("Scene node {0:?} does not exist")]
    MissingNode(NodeId),
}

/// Triangle mesh data
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshGeometry {
    /// Vertex positions
    pub positions: Vec<Vec3>,
    /// Vertex normals, one per position
    pub normals: Vec<Vec3>,
    /// Texture coordinates, one per position
    pub uvs: Vec<Vec2>,
    /// Triangle list indices
    pub indices: Vec<u32>,
}

impl MeshGeometry {
    /// Create geometry with zeroed normals
    pub fn new(positions: Vec<Vec3>, uvs: Vec<Vec2>, indices: Vec<u32>) -> Self {
        let normals = vec![Vec3::zeros(); positions.len()];
        Self { positions, normals, uvs, indices }
    }

    /// Unit quad in the XY plane facing +Z, split into `segments` per side
    pub fn grid(segments: u32) -> Self {
        let segments = segments.max(1);
        let step = 1.0 / segments as f32;
        let row = segments + 1;

        let mut positions = Vec::with_capacity((row * row) as usize);
        let mut uvs = Vec::with_capacity((row * row) as usize);
        for y in 0..row {
            for x in 0..row {
                let (u, v) = (x as f32 * step, y as f32 * step);
                positions.push(Vec3::new(u - 0.5, v - 0.5, 0.0));
                uvs.push(Vec2::new(u, v));
            }
        }

        let mut indices = Vec::with_capacity((segments * segments * 6) as usize);
        for y in 0..segments {
            for x in 0..segments {
                let i = y * row + x;
                indices.extend_from_slice(&[i, i + 1, i + row, i + 1, i + row + 1, i + row]);
            }
        }

        let mut geometry = Self::new(positions, uvs, indices);
        geometry.compute_vertex_normals();
        geometry
    }

    /// Number of vertices
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Recompute smooth vertex normals from the triangles
    ///
    /// Face normals are accumulated unnormalized, so larger faces weigh more.
    /// Triangles with out-of-range indices are skipped.
    pub fn compute_vertex_normals(&mut self) {
        let mut accumulated = vec![Vec3::zeros(); self.positions.len()];

        for triangle in self.indices.chunks_exact(3) {
            let [a, b, c] = [triangle[0] as usize, triangle[1] as usize, triangle[2] as usize];
            let (Some(pa), Some(pb), Some(pc)) =
                (self.positions.get(a), self.positions.get(b), self.positions.get(c))
            else {
                continue;
            };

            let face = (pb - pa).cross(&(pc - pa));
            accumulated[a] += face;
            accumulated[b] += face;
            accumulated[c] += face;
        }

        self.normals = accumulated.iter().map(math::normalize_or_zero).collect();
    }

    /// Positions moved by the ceramic shader's vertex stage
    pub fn displaced_positions(&self, uniforms: &CeramicUniforms) -> Vec<Vec3> {
        self.positions
            .iter()
            .enumerate()
            .map(|(i, position)| {
                let normal = self.normals.get(i).copied().unwrap_or_else(Vec3::zeros);
                let uv = self.uvs.get(i).copied().unwrap_or_else(Vec2::zeros);
                uniforms.displace_vertex(position, &normal, &uv)
            })
            .collect()
    }
}

/// A mesh in the scene
#[derive(Debug, Clone)]
pub struct MeshNode {
    /// Display name
    pub name: String,
    /// Capability tags
    pub tags: MeshTags,
    /// Triangle data
    pub geometry: MeshGeometry,
    /// Attached material, if any
    pub material: Option<MaterialInstance>,
    /// How many normal recomputations were requested
    pub normal_recomputes: usize,
}

/// Scene operations the material core relies on
pub trait SceneApplier {
    /// Whether the node still exists
    fn contains(&self, node: NodeId) -> bool;

    /// Capability tags of a node
    fn tags(&self, node: NodeId) -> Option<MeshTags>;

    /// Currently attached material
    fn material(&self, node: NodeId) -> Option<&MaterialInstance>;

    /// Currently attached material, for in-place uniform patches
    fn material_mut(&mut self, node: NodeId) -> Option<&mut MaterialInstance>;

    /// Replace the node's material, returning the previous one
    fn attach_material(
        &mut self,
        node: NodeId,
        material: MaterialInstance,
    ) -> Result<Option<MaterialInstance>, SceneError>;

    /// Recompute the node's vertex normals
    fn request_normal_recompute(&mut self, node: NodeId) -> Result<(), SceneError>;
}

/// Slot-map backed scene
///
/// Linear queries; scenes here hold a handful of meshes.
#[derive(Debug, Default)]
pub struct SceneGraph {
    nodes: SlotMap<NodeId, MeshNode>,
}

impl SceneGraph {
    /// Create an empty scene
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a mesh node
    pub fn add_mesh(&mut self, name: impl Into<String>, tags: MeshTags, geometry: MeshGeometry) -> NodeId {
        let name = name.into();
        log::debug!("Adding mesh '{}' with tags {:?}", name, tags);
        self.nodes.insert(MeshNode {
            name,
            tags,
            geometry,
            material: None,
            normal_recomputes: 0,
        })
    }

    /// Remove a node, returning it
    pub fn remove(&mut self, node: NodeId) -> Option<MeshNode> {
        self.nodes.remove(node)
    }

    /// Look up a node
    pub fn node(&self, node: NodeId) -> Option<&MeshNode> {
        self.nodes.get(node)
    }

    /// Nodes carrying every tag in `tags`
    pub fn nodes_with_tags(&self, tags: MeshTags) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|(_, node)| node.tags.contains(tags))
            .map(|(id, _)| id)
            .collect()
    }

    /// Iterate over every node
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &MeshNode)> {
        self.nodes.iter()
    }

    /// Number of nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the scene is empty
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl SceneApplier for SceneGraph {
    fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains_key(node)
    }

    fn tags(&self, node: NodeId) -> Option<MeshTags> {
        self.nodes.get(node).map(|n| n.tags)
    }

    fn material(&self, node: NodeId) -> Option<&MaterialInstance> {
        self.nodes.get(node).and_then(|n| n.material.as_ref())
    }

    fn material_mut(&mut self, node: NodeId) -> Option<&mut MaterialInstance> {
        self.nodes.get_mut(node).and_then(|n| n.material.as_mut())
    }

    fn attach_material(
        &mut self,
        node: NodeId,
        material: MaterialInstance,
    ) -> Result<Option<MaterialInstance>, SceneError> {
        let entry = self.nodes.get_mut(node).ok_or(SceneError::MissingNode(node))?;
        Ok(entry.material.replace(material))
    }

    fn request_normal_recompute(&mut self, node: NodeId) -> Result<(), SceneError> {
        let entry = self.nodes.get_mut(node).ok_or(SceneError::MissingNode(node))?;
        entry.geometry.compute_vertex_normals();
        entry.normal_recomputes += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::materials::{MaterialVariant, ProceduralShaderMaterial, StandardPhysicalMaterial};
    use approx::assert_relative_eq;

    fn triangle() -> MeshGeometry {
        MeshGeometry::new(
            vec![Vec3::new(0.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 1.0, 0.0)],
            vec![Vec2::zeros(); 3],
            vec![0, 1, 2],
        )
    }

    #[test]
    fn test_vertex_normals_of_flat_grid() {
        let grid = MeshGeometry::grid(4);
        assert_eq!(grid.vertex_count(), 25);
        for normal in &grid.normals {
            assert_relative_eq!(*normal, Vec3::new(0.0, 0.0, 1.0), epsilon = 1e-6);
        }
    }

    #[test]
    fn test_normals_are_area_weighted() {
        // Shared vertex 0: a large face along +Z and a small face along +X
        let mut geometry = MeshGeometry::new(
            vec![
                Vec3::zeros(),
                Vec3::new(2.0, 0.0, 0.0),
                Vec3::new(0.0, 2.0, 0.0),
                Vec3::new(0.0, 0.5, 0.0),
                Vec3::new(0.0, 0.0, 0.5),
            ],
            vec![Vec2::zeros(); 5],
            vec![0, 1, 2, 0, 3, 4],
        );
        geometry.compute_vertex_normals();

        let n = geometry.normals[0];
        assert!(n.z > n.x, "larger face dominates: {:?}", n);
        assert_relative_eq!(n.norm(), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_out_of_range_indices_are_skipped() {
        let mut geometry = triangle();
        geometry.indices.extend_from_slice(&[0, 1, 9]);
        geometry.compute_vertex_normals();
        assert_relative_eq!(geometry.normals[2], Vec3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn test_displaced_positions_apply_bias() {
        let grid = MeshGeometry::grid(1);
        let uniforms = CeramicUniforms {
            displacement_bias: 0.1,
            displacement_scale: 0.0,
            ..Default::default()
        };
        for (moved, original) in grid.displaced_positions(&uniforms).iter().zip(&grid.positions) {
            assert_relative_eq!(moved.z - original.z, 0.1, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_attach_replaces_material() {
        let mut scene = SceneGraph::new();
        let label = scene.add_mesh("etichetta", MeshTags::LABEL, triangle());

        let first = MaterialInstance::standard_physical(StandardPhysicalMaterial::default());
        assert!(scene.attach_material(label, first).unwrap().is_none());

        let second = MaterialInstance::procedural(ProceduralShaderMaterial::default());
        let replaced = scene.attach_material(label, second).unwrap().unwrap();
        assert_eq!(replaced.variant(), MaterialVariant::StandardPhysical);
        assert_eq!(scene.material(label).unwrap().variant(), MaterialVariant::ProceduralShader);
    }

    #[test]
    fn test_missing_node() {
        let mut scene = SceneGraph::new();
        let node = scene.add_mesh("label", MeshTags::LABEL, triangle());
        scene.remove(node);

        assert!(!scene.contains(node));
        assert_eq!(scene.request_normal_recompute(node), Err(SceneError::MissingNode(node)));
        let material = MaterialInstance::standard_physical(StandardPhysicalMaterial::default());
        assert!(scene.attach_material(node, material).is_err());
    }

    #[test]
    fn test_nodes_with_tags() {
        let mut scene = SceneGraph::new();
        let label = scene.add_mesh("label", MeshTags::LABEL | MeshTags::CASTS_SHADOW, triangle());
        let bottle = scene.add_mesh("bottle", MeshTags::GLASS | MeshTags::CASTS_SHADOW, triangle());

        assert_eq!(scene.nodes_with_tags(MeshTags::LABEL), vec![label]);
        let shadowed = scene.nodes_with_tags(MeshTags::CASTS_SHADOW);
        assert!(shadowed.contains(&label) && shadowed.contains(&bottle));

        scene.request_normal_recompute(label).unwrap();
        assert_eq!(scene.node(label).unwrap().normal_recomputes, 1);
    }
}
