//! Texture handles and CPU-side sampling
//!
//! A [`Texture`] pairs shared pixel data with sampler state. A copy of a
//! texture (new handle, same pixels) is made with [`Texture::share`], which
//! mints a new identity but keeps the `Arc` to the image.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::assets::ImageData;
use crate::foundation::math::{Vec2, Vec4};

/// Shared texture reference
pub type TextureRef = Arc<Texture>;

static NEXT_TEXTURE_ID: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a texture handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub u64);

impl TextureId {
    /// Mint a fresh identifier
    pub fn fresh() -> Self {
        Self(NEXT_TEXTURE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Texture wrapping modes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WrapMode {
    /// Repeat the texture
    Repeat,
    /// Mirror the texture
    MirroredRepeat,
    /// Clamp to edge
    ClampToEdge,
}

impl WrapMode {
    /// Map an arbitrary coordinate into [0, 1]
    fn apply(self, t: f32) -> f32 {
        match self {
            Self::Repeat => t - t.floor(),
            Self::MirroredRepeat => {
                let period = t.rem_euclid(2.0);
                if period > 1.0 { 2.0 - period } else { period }
            }
            Self::ClampToEdge => t.clamp(0.0, 1.0),
        }
    }
}

/// Sampler state attached to a texture handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplerSettings {
    /// Horizontal wrapping
    pub wrap_s: WrapMode,
    /// Vertical wrapping
    pub wrap_t: WrapMode,
    /// Flip rows on upload so v = 0 addresses the last row
    pub flip_y: bool,
}

impl SamplerSettings {
    /// The label mesh UV convention: repeat on both axes, no Y flip.
    ///
    /// Source and derived textures must all use this so they line up when
    /// sampled with the same coordinates.
    pub const LABEL_UV: Self = Self {
        wrap_s: WrapMode::Repeat,
        wrap_t: WrapMode::Repeat,
        flip_y: false,
    };
}

impl Default for SamplerSettings {
    /// Image-loader defaults (clamped, flipped), as decoded files arrive
    fn default() -> Self {
        Self {
            wrap_s: WrapMode::ClampToEdge,
            wrap_t: WrapMode::ClampToEdge,
            flip_y: true,
        }
    }
}

/// A texture handle: shared pixels plus sampler state
#[derive(Debug)]
pub struct Texture {
    id: TextureId,
    image: Arc<ImageData>,
    sampler: SamplerSettings,
    name: Option<String>,
}

impl Texture {
    /// Wrap image data in a new texture handle
    pub fn new(image: Arc<ImageData>, sampler: SamplerSettings) -> Self {
        Self {
            id: TextureId::fresh(),
            image,
            sampler,
            name: None,
        }
    }

    /// Set the debug name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// New handle over the same pixels with the given sampler
    pub fn share(&self, sampler: SamplerSettings) -> Self {
        Self {
            id: TextureId::fresh(),
            image: Arc::clone(&self.image),
            sampler,
            name: self.name.clone(),
        }
    }

    /// Handle identity
    pub fn id(&self) -> TextureId {
        self.id
    }

    /// Pixel data
    pub fn image(&self) -> &Arc<ImageData> {
        &self.image
    }

    /// Sampler state
    pub fn sampler(&self) -> SamplerSettings {
        self.sampler
    }

    /// Debug name, if any
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Whether two handles read the same pixel buffer
    pub fn shares_pixels_with(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.image, &other.image)
    }

    /// Nearest-neighbour sample at `uv`, normalized to [0, 1] per channel
    pub fn sample(&self, uv: &Vec2) -> Vec4 {
        let width = self.image.width;
        let height = self.image.height;
        if width == 0 || height == 0 {
            return Vec4::new(0.0, 0.0, 0.0, 1.0);
        }

        let u = self.sampler.wrap_s.apply(uv.x);
        let mut v = self.sampler.wrap_t.apply(uv.y);
        if self.sampler.flip_y {
            v = 1.0 - v;
        }

        let x = ((u * width as f32) as u32).min(width - 1);
        let y = ((v * height as f32) as u32).min(height - 1);
        let [r, g, b, a] = self.image.pixel(x, y);
        Vec4::new(
            f32::from(r) / 255.0,
            f32::from(g) / 255.0,
            f32::from(b) / 255.0,
            f32::from(a) / 255.0,
        )
    }
}

/// Sample an optional texture the way an unbound GPU sampler reads: opaque black
pub fn sample_or_black(texture: Option<&TextureRef>, uv: &Vec2) -> Vec4 {
    texture.map_or_else(|| Vec4::new(0.0, 0.0, 0.0, 1.0), |t| t.sample(uv))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn gradient_2x2() -> Arc<ImageData> {
        // row 0: (0, 64), row 1: (128, 255) in the red channel
        let data = vec![
            0, 0, 0, 255, 64, 0, 0, 255,
            128, 0, 0, 255, 255, 0, 0, 255,
        ];
        Arc::new(ImageData::from_rgba(2, 2, data).unwrap())
    }

    #[test]
    fn test_ids_are_unique() {
        let image = gradient_2x2();
        let a = Texture::new(Arc::clone(&image), SamplerSettings::LABEL_UV);
        let b = a.share(SamplerSettings::LABEL_UV);
        assert_ne!(a.id(), b.id());
        assert!(a.shares_pixels_with(&b));
    }

    #[test]
    fn test_sample_without_flip() {
        let texture = Texture::new(gradient_2x2(), SamplerSettings::LABEL_UV);
        assert_relative_eq!(texture.sample(&Vec2::new(0.25, 0.25)).x, 0.0);
        assert_relative_eq!(texture.sample(&Vec2::new(0.75, 0.75)).x, 1.0);
    }

    #[test]
    fn test_sample_with_flip() {
        let texture = Texture::new(gradient_2x2(), SamplerSettings::default());
        // v is flipped, so the top-left sample reads row 1
        assert_relative_eq!(texture.sample(&Vec2::new(0.25, 0.25)).x, 128.0 / 255.0);
    }

    #[test]
    fn test_repeat_wrap() {
        let texture = Texture::new(gradient_2x2(), SamplerSettings::LABEL_UV);
        let inside = texture.sample(&Vec2::new(0.75, 0.25));
        let wrapped = texture.sample(&Vec2::new(1.75, -0.75));
        assert_relative_eq!(inside, wrapped);
    }

    #[test]
    fn test_mirrored_wrap() {
        assert_relative_eq!(WrapMode::MirroredRepeat.apply(1.25), 0.75);
        assert_relative_eq!(WrapMode::MirroredRepeat.apply(0.25), 0.25);
        assert_relative_eq!(WrapMode::ClampToEdge.apply(3.0), 1.0);
    }

    #[test]
    fn test_unbound_sampler_reads_black() {
        let sample = sample_or_black(None, &Vec2::new(0.5, 0.5));
        assert_eq!(sample, Vec4::new(0.0, 0.0, 0.0, 1.0));
    }
}
