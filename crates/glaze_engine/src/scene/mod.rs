//! Scene access for the material core
//!
//! Meshes are identified by [`NodeId`] and classified by [`MeshTags`] when
//! they are added. The synchronizer only touches nodes it was handed.

mod scene_graph;

pub use scene_graph::{MeshGeometry, MeshNode, MeshTags, NodeId, SceneApplier, SceneError, SceneGraph};
