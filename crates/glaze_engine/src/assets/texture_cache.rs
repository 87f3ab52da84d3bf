//! Texture derivation cache
//!
//! Owns the decoded source textures for a session and the variants derived
//! from them. Loads are cooperative: [`TextureDerivationCache::load`] registers
//! interest and returns immediately; the decode happens on the next
//! [`TextureDerivationCache::pump`], on the same thread, between frames.
//!
//! Every path is decoded at most once. Requests arriving while a decode is
//! outstanding join the in-flight entry and observe the same result.

use std::cell::{Cell, OnceCell};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;

use super::{AssetError, ImageData, TextureSource};
use crate::render::texture::{SamplerSettings, Texture, TextureRef};

/// Identity of a decoded texture asset within a cache session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssetId(pub u64);

/// A decoded source image. Immutable once loaded.
#[derive(Debug)]
pub struct TextureAsset {
    id: AssetId,
    path: PathBuf,
    image: Arc<ImageData>,
}

impl TextureAsset {
    /// Asset identity
    pub fn id(&self) -> AssetId {
        self.id
    }

    /// Path the asset was loaded from
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Decoded pixels
    pub fn image(&self) -> &Arc<ImageData> {
        &self.image
    }
}

/// Observable state of a load request
#[derive(Debug, Clone)]
pub enum LoadState {
    /// Decode has not run yet
    Pending,
    /// Decoded successfully
    Ready(Arc<TextureAsset>),
    /// Fetch or decode failed; not retried
    Failed(AssetError),
}

impl LoadState {
    /// Whether the load has finished, successfully or not
    pub fn is_settled(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// The asset, if ready
    pub fn ready(&self) -> Option<&Arc<TextureAsset>> {
        match self {
            Self::Ready(asset) => Some(asset),
            _ => None,
        }
    }
}

/// Result of one decode performed by [`TextureDerivationCache::pump`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadCompletion {
    /// Path that was decoded
    pub path: PathBuf,
    /// Whether the decode succeeded
    pub succeeded: bool,
    /// How many requests shared this decode
    pub requests: usize,
}

/// Counters for cache activity
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Fetch + decode operations performed
    pub decodes: usize,
    /// Requests satisfied by joining an in-flight load
    pub joined_requests: usize,
    /// Derived texture sets created
    pub derivations: usize,
}

#[derive(Debug)]
enum LoadEntry {
    InFlight { requests: usize },
    Ready(Arc<TextureAsset>),
    Failed(AssetError),
}

struct InvertedVariants {
    image: Arc<ImageData>,
    bump: TextureRef,
    displacement: TextureRef,
}

/// Texture variants derived from one relief source
///
/// `bump_normal` and `displacement_normal` share pixels with the original.
/// The inverted pair shares a single complemented buffer, computed on first
/// use and never again for this set.
pub struct DerivedTextureSet {
    asset: AssetId,
    original: TextureRef,
    bump_normal: TextureRef,
    displacement_normal: TextureRef,
    inverted: OnceCell<InvertedVariants>,
    normal_map: OnceCell<TextureRef>,
    inversions: Cell<usize>,
}

impl DerivedTextureSet {
    fn new(asset: &TextureAsset) -> Self {
        let original = Texture::new(Arc::clone(asset.image()), SamplerSettings::LABEL_UV)
            .with_name(asset.path().display().to_string());
        let bump_normal = Arc::new(original.share(SamplerSettings::LABEL_UV));
        let displacement_normal = Arc::new(original.share(SamplerSettings::LABEL_UV));

        Self {
            asset: asset.id(),
            original: Arc::new(original),
            bump_normal,
            displacement_normal,
            inverted: OnceCell::new(),
            normal_map: OnceCell::new(),
            inversions: Cell::new(0),
        }
    }

    /// Identity of the source asset
    pub fn asset(&self) -> AssetId {
        self.asset
    }

    /// The source texture
    pub fn original(&self) -> &TextureRef {
        &self.original
    }

    /// Bump texture, non-inverted
    pub fn bump_normal(&self) -> &TextureRef {
        &self.bump_normal
    }

    /// Displacement texture, non-inverted
    pub fn displacement_normal(&self) -> &TextureRef {
        &self.displacement_normal
    }

    /// Bump texture, inverted (derived on first call)
    pub fn bump_inverted(&self) -> &TextureRef {
        &self.inverted_variants().bump
    }

    /// Displacement texture, inverted (derived on first call)
    pub fn displacement_inverted(&self) -> &TextureRef {
        &self.inverted_variants().displacement
    }

    /// Bump texture selected by the invert flag
    pub fn bump(&self, inverted: bool) -> &TextureRef {
        if inverted { self.bump_inverted() } else { &self.bump_normal }
    }

    /// Displacement texture selected by the invert flag
    pub fn displacement(&self, inverted: bool) -> &TextureRef {
        if inverted { self.displacement_inverted() } else { &self.displacement_normal }
    }

    /// The complemented pixel buffer, created on first call
    pub fn inverted_image(&self) -> &Arc<ImageData> {
        &self.inverted_variants().image
    }

    /// Whether the inverted variants exist yet
    pub fn has_inverted(&self) -> bool {
        self.inverted.get().is_some()
    }

    /// How many times the per-pixel inversion has run for this set
    pub fn inversion_count(&self) -> usize {
        self.inversions.get()
    }

    /// Tangent-space normal map, once attached
    pub fn normal_map(&self) -> Option<&TextureRef> {
        self.normal_map.get()
    }

    /// Attach the normal map; the first attachment wins
    pub fn attach_normal_map(&self, asset: &TextureAsset) -> &TextureRef {
        self.normal_map.get_or_init(|| {
            Arc::new(
                Texture::new(Arc::clone(asset.image()), SamplerSettings::LABEL_UV)
                    .with_name(asset.path().display().to_string()),
            )
        })
    }

    fn inverted_variants(&self) -> &InvertedVariants {
        self.inverted.get_or_init(|| {
            let image = Arc::new(self.original.image().inverted());
            self.inversions.set(self.inversions.get() + 1);
            log::debug!(
                "Inverted relief texture for {:?} ({}x{})",
                self.asset,
                image.width,
                image.height
            );
            // Derived textures must line up with the source under the same UVs
            let bump = Arc::new(Texture::new(Arc::clone(&image), SamplerSettings::LABEL_UV));
            let displacement = Arc::new(bump.share(SamplerSettings::LABEL_UV));
            InvertedVariants { image, bump, displacement }
        })
    }
}

impl fmt::Debug for DerivedTextureSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DerivedTextureSet")
            .field("asset", &self.asset)
            .field("original", &self.original.id())
            .field("inverted", &self.has_inverted())
            .field("normal_map", &self.normal_map.get().map(|t| t.id()))
            .finish()
    }
}

/// Session-scoped texture cache
///
/// Created when a session starts and cleared only by [`Self::reset`].
pub struct TextureDerivationCache {
    source: Box<dyn TextureSource>,
    loads: HashMap<PathBuf, LoadEntry>,
    queue: VecDeque<PathBuf>,
    derived: HashMap<AssetId, Rc<DerivedTextureSet>>,
    next_asset_id: u64,
    stats: CacheStats,
}

impl TextureDerivationCache {
    /// Create an empty cache over a byte source
    pub fn new(source: impl TextureSource + 'static) -> Self {
        Self {
            source: Box::new(source),
            loads: HashMap::new(),
            queue: VecDeque::new(),
            derived: HashMap::new(),
            next_asset_id: 1,
            stats: CacheStats::default(),
        }
    }

    /// Request a texture load
    ///
    /// The first request for a path queues a decode. Later requests join the
    /// in-flight entry or read the settled result.
    pub fn load(&mut self, path: impl AsRef<Path>) -> LoadState {
        let path = path.as_ref();
        match self.loads.get_mut(path) {
            None => {
                log::debug!("Queued texture load: {:?}", path);
                self.loads.insert(path.to_path_buf(), LoadEntry::InFlight { requests: 1 });
                self.queue.push_back(path.to_path_buf());
                LoadState::Pending
            }
            Some(LoadEntry::InFlight { requests }) => {
                *requests += 1;
                self.stats.joined_requests += 1;
                LoadState::Pending
            }
            Some(LoadEntry::Ready(asset)) => LoadState::Ready(Arc::clone(asset)),
            Some(LoadEntry::Failed(err)) => LoadState::Failed(err.clone()),
        }
    }

    /// Current state for `path`, without registering a request
    pub fn state(&self, path: impl AsRef<Path>) -> Option<LoadState> {
        self.loads.get(path.as_ref()).map(|entry| match entry {
            LoadEntry::InFlight { .. } => LoadState::Pending,
            LoadEntry::Ready(asset) => LoadState::Ready(Arc::clone(asset)),
            LoadEntry::Failed(err) => LoadState::Failed(err.clone()),
        })
    }

    /// Whether any decode is still queued
    pub fn has_pending(&self) -> bool {
        !self.queue.is_empty()
    }

    /// Run every queued decode, settling the in-flight entries
    pub fn pump(&mut self) -> Vec<LoadCompletion> {
        let mut completions = Vec::with_capacity(self.queue.len());

        while let Some(path) = self.queue.pop_front() {
            let requests = match self.loads.get(&path) {
                Some(LoadEntry::InFlight { requests }) => *requests,
                // Reset between request and pump
                _ => continue,
            };

            self.stats.decodes += 1;
            let entry = match self.fetch_and_decode(&path) {
                Ok(image) => {
                    let id = AssetId(self.next_asset_id);
                    self.next_asset_id += 1;
                    log::info!(
                        "Loaded texture {:?} as {:?} ({}x{})",
                        path,
                        id,
                        image.width,
                        image.height
                    );
                    LoadEntry::Ready(Arc::new(TextureAsset {
                        id,
                        path: path.clone(),
                        image: Arc::new(image),
                    }))
                }
                Err(err) => {
                    log::error!("Texture load failed: {}", err);
                    LoadEntry::Failed(err)
                }
            };

            completions.push(LoadCompletion {
                path: path.clone(),
                succeeded: matches!(entry, LoadEntry::Ready(_)),
                requests,
            });
            self.loads.insert(path, entry);
        }

        completions
    }

    /// Derived variants for `asset`, created on first call
    pub fn derive(&mut self, asset: &TextureAsset) -> Rc<DerivedTextureSet> {
        if let Some(set) = self.derived.get(&asset.id()) {
            return Rc::clone(set);
        }

        log::debug!("Deriving texture set for {:?} from {:?}", asset.id(), asset.path());
        self.stats.derivations += 1;
        let set = Rc::new(DerivedTextureSet::new(asset));
        self.derived.insert(asset.id(), Rc::clone(&set));
        set
    }

    /// The inverted image for `asset`, derived at most once
    pub fn inverted_or_create(&mut self, asset: &TextureAsset) -> Arc<ImageData> {
        Arc::clone(self.derive(asset).inverted_image())
    }

    /// Previously derived variants, if any
    pub fn derived(&self, id: AssetId) -> Option<Rc<DerivedTextureSet>> {
        self.derived.get(&id).cloned()
    }

    /// Drop every load and derived set
    pub fn reset(&mut self) {
        log::info!(
            "Resetting texture cache ({} loads, {} derived sets)",
            self.loads.len(),
            self.derived.len()
        );
        self.loads.clear();
        self.queue.clear();
        self.derived.clear();
    }

    /// Activity counters
    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    fn fetch_and_decode(&self, path: &Path) -> Result<ImageData, AssetError> {
        let bytes = self.source.fetch(path)?;
        ImageData::from_bytes(&bytes, path)
    }
}

impl fmt::Debug for TextureDerivationCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextureDerivationCache")
            .field("loads", &self.loads.len())
            .field("queued", &self.queue.len())
            .field("derived", &self.derived.len())
            .field("stats", &self.stats)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{FileTextureSource, MemoryTextureSource};

    fn relief_image() -> ImageData {
        let data = (0..16u32)
            .flat_map(|i| [(i * 16) as u8, (255 - i * 16) as u8, 7, 200])
            .collect();
        ImageData::from_rgba(4, 4, data).unwrap()
    }

    fn loaded_cache() -> (TextureDerivationCache, Arc<TextureAsset>) {
        let source = MemoryTextureSource::new()
            .with_image("relief.png", &relief_image())
            .unwrap();
        let mut cache = TextureDerivationCache::new(source);
        cache.load("relief.png");
        cache.pump();
        let asset = cache.state("relief.png").unwrap().ready().cloned().unwrap();
        (cache, asset)
    }

    #[test]
    fn test_load_is_deferred_until_pump() {
        let source = MemoryTextureSource::new()
            .with_image("relief.png", &relief_image())
            .unwrap();
        let mut cache = TextureDerivationCache::new(source);

        assert!(matches!(cache.load("relief.png"), LoadState::Pending));
        assert!(cache.has_pending());

        let completions = cache.pump();
        assert_eq!(completions.len(), 1);
        assert!(completions[0].succeeded);
        assert!(matches!(cache.load("relief.png"), LoadState::Ready(_)));
    }

    #[test]
    fn test_concurrent_requests_share_one_decode() {
        let source = Rc::new(
            MemoryTextureSource::new()
                .with_image("relief.png", &relief_image())
                .unwrap(),
        );
        let mut cache = TextureDerivationCache::new(Rc::clone(&source));

        cache.load("relief.png");
        cache.load("relief.png");
        cache.load("relief.png");
        let completions = cache.pump();

        assert_eq!(completions.len(), 1);
        assert_eq!(completions[0].requests, 3);
        assert_eq!(source.fetch_count(), 1);
        assert_eq!(cache.stats().decodes, 1);
        assert_eq!(cache.stats().joined_requests, 2);

        let first = cache.load("relief.png").ready().cloned().unwrap();
        let second = cache.load("relief.png").ready().cloned().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_file_source_decodes_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let textures = dir.path().join("textures");
        std::fs::create_dir(&textures).unwrap();
        std::fs::write(textures.join("relief.png"), relief_image().to_png_bytes().unwrap()).unwrap();

        let mut cache = TextureDerivationCache::new(FileTextureSource::new([dir.path()]));
        cache.load("textures/relief.png");
        cache.load("textures/missing.png");
        cache.pump();

        let asset = cache.state("textures/relief.png").unwrap().ready().cloned().unwrap();
        assert_eq!(**asset.image(), relief_image());
        assert!(matches!(
            cache.state("textures/missing.png"),
            Some(LoadState::Failed(AssetError::NotFound(_)))
        ));
    }

    #[test]
    fn test_decode_failure_is_settled_and_not_retried() {
        let source = Rc::new(MemoryTextureSource::new().with_bytes("relief.jpg", b"garbage".to_vec()));
        let mut cache = TextureDerivationCache::new(Rc::clone(&source));

        cache.load("relief.jpg");
        let completions = cache.pump();
        assert!(!completions[0].succeeded);

        assert!(matches!(cache.load("relief.jpg"), LoadState::Failed(AssetError::Decode { .. })));
        assert!(cache.pump().is_empty());
        assert_eq!(source.fetch_count(), 1);
    }

    #[test]
    fn test_derive_is_memoized() {
        let (mut cache, asset) = loaded_cache();

        let first = cache.derive(&asset);
        let second = cache.derive(&asset);
        assert!(Rc::ptr_eq(&first, &second));
        assert!(Arc::ptr_eq(first.bump_inverted(), second.bump_inverted()));
        assert!(Arc::ptr_eq(first.displacement_normal(), second.displacement_normal()));
        assert_eq!(cache.stats().derivations, 1);
    }

    #[test]
    fn test_inversion_runs_once_per_asset() {
        let (mut cache, asset) = loaded_cache();
        let set = cache.derive(&asset);
        assert!(!set.has_inverted());

        let _ = set.bump_inverted();
        let _ = set.displacement_inverted();
        let _ = cache.inverted_or_create(&asset);
        let _ = cache.derive(&asset).bump(true);

        assert_eq!(set.inversion_count(), 1);
        assert!(set.bump_inverted().shares_pixels_with(set.displacement_inverted()));
        assert!(!Arc::ptr_eq(set.bump_inverted(), set.displacement_inverted()));
    }

    #[test]
    fn test_normal_variants_share_source_pixels() {
        let (mut cache, asset) = loaded_cache();
        let set = cache.derive(&asset);

        assert!(set.bump_normal().shares_pixels_with(set.original()));
        assert!(set.displacement_normal().shares_pixels_with(set.original()));
        assert_ne!(set.bump_normal().id(), set.displacement_normal().id());
    }

    #[test]
    fn test_derived_samplers_follow_label_convention() {
        let (mut cache, asset) = loaded_cache();
        let set = cache.derive(&asset);

        for texture in [set.original(), set.bump(false), set.bump(true), set.displacement(true)] {
            assert_eq!(texture.sampler(), SamplerSettings::LABEL_UV);
        }
    }

    #[test]
    fn test_inverted_image_complements_source() {
        let (mut cache, asset) = loaded_cache();
        let inverted = cache.inverted_or_create(&asset);

        assert_eq!(inverted.pixel(1, 0), [255 - 16, 16, 248, 200]);
        assert_eq!(inverted.inverted(), **asset.image());
    }

    #[test]
    fn test_normal_map_first_attachment_wins() {
        let (mut cache, asset) = loaded_cache();
        let set = cache.derive(&asset);

        let first = Arc::clone(set.attach_normal_map(&asset));
        let second = Arc::clone(set.attach_normal_map(&asset));
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.sampler(), SamplerSettings::LABEL_UV);
    }

    #[test]
    fn test_reset_clears_everything() {
        let (mut cache, asset) = loaded_cache();
        cache.derive(&asset);

        cache.reset();
        assert!(cache.state("relief.png").is_none());
        assert!(cache.derived(asset.id()).is_none());

        // A fresh load after reset mints a new identity
        cache.load("relief.png");
        cache.pump();
        let reloaded = cache.state("relief.png").unwrap().ready().cloned().unwrap();
        assert_ne!(reloaded.id(), asset.id());
    }
}
