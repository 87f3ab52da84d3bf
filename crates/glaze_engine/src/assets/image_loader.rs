//! Image loading utilities for texture data
//!
//! Provides PNG and JPEG decoding into RGBA8 buffers, plus the per-pixel
//! complement used to derive inverted relief maps.

use std::path::Path;
use crate::assets::AssetError;

/// Decoded RGBA8 image data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    /// Raw RGBA pixel data
    pub data: Vec<u8>,
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
    /// Number of color channels (always 4 for RGBA)
    pub channels: u8,
}

impl ImageData {
    /// Decode an image from encoded bytes (PNG, JPEG)
    pub fn from_bytes(bytes: &[u8], origin: &Path) -> Result<Self, AssetError> {
        let img = image::load_from_memory(bytes).map_err(|e| AssetError::Decode {
            path: origin.to_path_buf(),
            reason: e.to_string(),
        })?;

        let rgba_img = img.to_rgba8();
        let (width, height) = rgba_img.dimensions();

        log::debug!("Decoded image {}x{} from {:?}", width, height, origin);

        Ok(Self {
            data: rgba_img.into_raw(),
            width,
            height,
            channels: 4,
        })
    }

    /// Wrap an existing RGBA8 buffer, checking its length
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Result<Self, AssetError> {
        let expected = width as usize * height as usize * 4;
        if data.len() != expected {
            return Err(AssetError::InvalidData(format!(
                "{}x{} RGBA image needs {} bytes, got {}",
                width,
                height,
                expected,
                data.len()
            )));
        }
        Ok(Self { data, width, height, channels: 4 })
    }

    /// Create a solid color image (useful for testing and defaults)
    pub fn solid_color(width: u32, height: u32, color: [u8; 4]) -> Self {
        let pixel_count = (width * height) as usize;
        let mut data = Vec::with_capacity(pixel_count * 4);

        for _ in 0..pixel_count {
            data.extend_from_slice(&color);
        }

        Self {
            data,
            width,
            height,
            channels: 4,
        }
    }

    /// Read the RGBA sample at `(x, y)`, row 0 being the first row in memory
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let offset = (y as usize * self.width as usize + x as usize) * 4;
        [
            self.data[offset],
            self.data[offset + 1],
            self.data[offset + 2],
            self.data[offset + 3],
        ]
    }

    /// Channel-wise complement: `255 - c` for R, G, B; alpha is copied
    ///
    /// Applying this twice returns the original samples exactly.
    pub fn inverted(&self) -> Self {
        let mut data = self.data.clone();
        for px in data.chunks_exact_mut(4) {
            px[0] = 255 - px[0];
            px[1] = 255 - px[1];
            px[2] = 255 - px[2];
        }
        Self {
            data,
            width: self.width,
            height: self.height,
            channels: 4,
        }
    }

    /// Encode as PNG, used for embedding generated textures
    pub fn to_png_bytes(&self) -> Result<Vec<u8>, AssetError> {
        let buffer = image::RgbaImage::from_raw(self.width, self.height, self.data.clone())
            .ok_or_else(|| AssetError::InvalidData("pixel buffer does not match dimensions".to_string()))?;
        let mut bytes = std::io::Cursor::new(Vec::new());
        buffer
            .write_to(&mut bytes, image::ImageFormat::Png)
            .map_err(|e| AssetError::InvalidData(format!("PNG encode failed: {}", e)))?;
        Ok(bytes.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noisy(width: u32, height: u32) -> ImageData {
        let data = (0..width * height * 4)
            .map(|i| (i.wrapping_mul(37) % 256) as u8)
            .collect();
        ImageData::from_rgba(width, height, data).unwrap()
    }

    #[test]
    fn test_solid_color_image() {
        let img = ImageData::solid_color(4, 4, [255, 0, 0, 255]);
        assert_eq!(img.width, 4);
        assert_eq!(img.height, 4);
        assert_eq!(img.channels, 4);
        assert_eq!(img.data.len(), 4 * 4 * 4);
        assert_eq!(&img.data[0..4], &[255, 0, 0, 255]);
    }

    #[test]
    fn test_inversion_complements_rgb_only() {
        let img = ImageData::from_rgba(1, 1, vec![10, 200, 255, 77]).unwrap();
        let inv = img.inverted();
        assert_eq!(inv.pixel(0, 0), [245, 55, 0, 77]);
    }

    #[test]
    fn test_inversion_idempotent() {
        let img = noisy(7, 5);
        let twice = img.inverted().inverted();
        assert_eq!(twice, img);
    }

    #[test]
    fn test_from_rgba_rejects_bad_length() {
        let result = ImageData::from_rgba(2, 2, vec![0; 15]);
        assert!(matches!(result, Err(AssetError::InvalidData(_))));
    }

    #[test]
    fn test_png_round_trip() {
        let img = noisy(3, 2);
        let bytes = img.to_png_bytes().unwrap();
        let decoded = ImageData::from_bytes(&bytes, Path::new("memory.png")).unwrap();
        assert_eq!(decoded, img);
    }

    #[test]
    fn test_garbage_bytes_fail_to_decode() {
        let result = ImageData::from_bytes(b"not an image", Path::new("broken.jpg"));
        assert!(matches!(result, Err(AssetError::Decode { .. })));
    }
}
