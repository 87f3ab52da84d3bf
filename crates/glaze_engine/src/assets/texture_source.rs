//! Texture byte sources
//!
//! The derivation cache does not know where bytes come from. Hosts hand it a
//! [`TextureSource`]: files under a set of search paths, or an in-memory table
//! for embedded assets and tests.

use std::cell::Cell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::{AssetError, ImageData};

/// Fetches encoded image bytes for a path
pub trait TextureSource {
    /// Fetch the encoded bytes stored at `path`
    fn fetch(&self, path: &Path) -> Result<Vec<u8>, AssetError>;
}

/// Reads textures from disk, trying each search path in order
#[derive(Debug, Clone, Default)]
pub struct FileTextureSource {
    search_paths: Vec<PathBuf>,
}

impl FileTextureSource {
    /// Create a source with the given search paths
    pub fn new(search_paths: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        Self {
            search_paths: search_paths.into_iter().map(Into::into).collect(),
        }
    }

    /// Resolve `path` against the search paths, falling back to the path itself
    pub fn resolve(&self, path: &Path) -> Option<PathBuf> {
        self.search_paths
            .iter()
            .map(|base| base.join(path))
            .find(|candidate| candidate.exists())
            .or_else(|| path.exists().then(|| path.to_path_buf()))
    }
}

impl TextureSource for FileTextureSource {
    fn fetch(&self, path: &Path) -> Result<Vec<u8>, AssetError> {
        let file_path = self
            .resolve(path)
            .ok_or_else(|| AssetError::NotFound(path.to_path_buf()))?;

        std::fs::read(&file_path).map_err(|e| AssetError::Io {
            path: file_path,
            reason: e.to_string(),
        })
    }
}

/// In-memory texture table
///
/// Counts fetches so callers can observe that duplicate requests were
/// coalesced.
#[derive(Debug, Default)]
pub struct MemoryTextureSource {
    entries: HashMap<PathBuf, Vec<u8>>,
    fetches: Cell<usize>,
}

impl MemoryTextureSource {
    /// Create an empty source
    pub fn new() -> Self {
        Self::default()
    }

    /// Store encoded bytes under `path`
    pub fn insert_bytes(&mut self, path: impl Into<PathBuf>, bytes: Vec<u8>) {
        self.entries.insert(path.into(), bytes);
    }

    /// Encode `image` as PNG and store it under `path`
    pub fn insert_image(&mut self, path: impl Into<PathBuf>, image: &ImageData) -> Result<(), AssetError> {
        let bytes = image.to_png_bytes()?;
        self.insert_bytes(path, bytes);
        Ok(())
    }

    /// Builder form of [`Self::insert_image`]
    pub fn with_image(mut self, path: impl Into<PathBuf>, image: &ImageData) -> Result<Self, AssetError> {
        self.insert_image(path, image)?;
        Ok(self)
    }

    /// Builder form of [`Self::insert_bytes`]
    pub fn with_bytes(mut self, path: impl Into<PathBuf>, bytes: Vec<u8>) -> Self {
        self.insert_bytes(path, bytes);
        self
    }

    /// Number of fetches served so far
    pub fn fetch_count(&self) -> usize {
        self.fetches.get()
    }
}

impl TextureSource for MemoryTextureSource {
    fn fetch(&self, path: &Path) -> Result<Vec<u8>, AssetError> {
        self.fetches.set(self.fetches.get() + 1);
        self.entries
            .get(path)
            .cloned()
            .ok_or_else(|| AssetError::NotFound(path.to_path_buf()))
    }
}

impl<T: TextureSource + ?Sized> TextureSource for std::rc::Rc<T> {
    fn fetch(&self, path: &Path) -> Result<Vec<u8>, AssetError> {
        (**self).fetch(path)
    }
}
