//! # Glaze Engine
//!
//! Parameter-driven materials for a ceramic bottle label.
//!
//! ## Features
//!
//! - **Texture derivation**: one relief image yields bump, displacement and
//!   inverted variants, each computed at most once per session
//! - **Procedural relief shading**: a ceramic look from a single height field,
//!   with GLSL sources and a CPU evaluation of the same math
//! - **Material synchronization**: debounced rebuilds, immediate structural
//!   rebuilds and in-place uniform patches, driven from the frame loop
//! - **Export**: pasteable parameter literals and RON scene snapshots
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use glaze_engine::prelude::*;
//! use std::time::Instant;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     glaze_engine::foundation::logging::init();
//!
//!     let mut scene = SceneGraph::new();
//!     let label = scene.add_mesh("label", MeshTags::LABEL, MeshGeometry::grid(32));
//!
//!     let mut sync = MaterialSynchronizer::with_file_source(SyncConfig::default(), ParameterSet::default());
//!     sync.attach(&mut scene, label)?;
//!
//!     // Once per frame
//!     sync.update(&mut scene, Instant::now());
//!
//!     // From the UI
//!     sync.set(&mut scene, ParamChange::Roughness(0.4), Instant::now());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod foundation;
pub mod config;
pub mod assets;
pub mod render;
pub mod scene;
pub mod sync;
pub mod export;

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        foundation::{
            math::{Vec2, Vec3, Vec4},
            Color,
        },
        config::{Config, ConfigError, NormalRecomputePolicy, SyncConfig},
        assets::{AssetError, FileTextureSource, MemoryTextureSource, TextureDerivationCache, TextureSource},
        render::materials::{
            MaterialFactory, MaterialInstance, MaterialVariant, ParamChange, ParamKey, ParamValue, ParameterSet,
        },
        render::shading::CeramicUniforms,
        scene::{MeshGeometry, MeshTags, NodeId, SceneApplier, SceneGraph},
        sync::{MaterialSynchronizer, SyncError, SyncOutcome},
        export::{params_literal, SceneSnapshot},
    };
}
