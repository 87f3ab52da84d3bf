//! Asset management system
//!
//! Image decoding, texture byte sources and the session texture cache that
//! derives relief variants from a single source image.

pub mod image_loader;
pub mod texture_source;
pub mod texture_cache;

pub use image_loader::ImageData;
pub use texture_source::{TextureSource, FileTextureSource, MemoryTextureSource};
pub use texture_cache::{
    TextureDerivationCache, DerivedTextureSet, TextureAsset, AssetId,
    LoadState, LoadCompletion, CacheStats,
};

use std::path::PathBuf;
use thiserror::Error;

/// Asset loading errors
///
/// Cloneable so that every request sharing a failed load can observe it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssetError {
    /// Asset not found
    #[error("Asset not found: {0:?}")]
    NotFound(PathBuf),

    /// IO error while fetching asset bytes
    #[error("IO error reading {path:?}: {reason}")]
    Io {
        /// Path being read
        path: PathBuf,
        /// Underlying error message
        reason: String,
    },

    /// Bytes were fetched but could not be decoded as an image
    #[error("Failed to decode {path:?}: {reason}")]
    Decode {
        /// Path being decoded
        path: PathBuf,
        /// Decoder error message
        reason: String,
    },

    /// Invalid asset data
    #[error("Invalid data: {0}")]
    InvalidData(String),
}
