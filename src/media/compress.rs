//! JPEG re-encoding

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::GenericImageView;

use crate::error::{Error, Result};

/// Target size and quality for one kind of upload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageProfile {
    pub max_width: u32,
    /// JPEG quality, 1..=100
    pub quality: u8,
}

impl ImageProfile {
    /// Speakers, gallery, partners and team portraits
    pub const STANDARD: ImageProfile = ImageProfile {
        max_width: 800,
        quality: 70,
    };

    /// Banners and publisher logos
    pub const WIDE: ImageProfile = ImageProfile {
        max_width: 1200,
        quality: 80,
    };
}

/// Synchronous image transform. Called from a blocking task.
pub trait ImageProcessor: Send + Sync + 'static {
    fn process(&self, input: &[u8], profile: ImageProfile) -> Result<Vec<u8>>;
}

/// Decode any supported format, shrink to the profile width, encode JPEG
#[derive(Debug, Clone, Copy, Default)]
pub struct JpegCompressor;

impl ImageProcessor for JpegCompressor {
    fn process(&self, input: &[u8], profile: ImageProfile) -> Result<Vec<u8>> {
        let img = image::load_from_memory(input)
            .map_err(|e| Error::Media(format!("Cannot decode image: {}", e)))?;

        let (width, height) = img.dimensions();
        let img = if width > profile.max_width {
            let scaled = (height as u64 * profile.max_width as u64 / width as u64).max(1) as u32;
            img.resize_exact(profile.max_width, scaled, FilterType::Triangle)
        } else {
            img
        };

        let rgb = img.to_rgb8();
        let mut out = Vec::new();
        JpegEncoder::new_with_quality(&mut out, profile.quality)
            .encode_image(&rgb)
            .map_err(|e| Error::Media(format!("Cannot encode JPEG: {}", e)))?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, RgbImage};
    use std::io::Cursor;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::new(width, height));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_wide_image_is_scaled_to_max_width() -> Result<()> {
        let out = JpegCompressor.process(&png(1600, 400), ImageProfile::STANDARD)?;
        let decoded = image::load_from_memory(&out).unwrap();
        assert_eq!(decoded.dimensions(), (800, 200));
        assert_eq!(image::guess_format(&out).unwrap(), ImageFormat::Jpeg);
        Ok(())
    }

    #[test]
    fn test_small_image_is_not_upscaled() -> Result<()> {
        let out = JpegCompressor.process(&png(300, 100), ImageProfile::WIDE)?;
        let decoded = image::load_from_memory(&out).unwrap();
        assert_eq!(decoded.dimensions(), (300, 100));
        Ok(())
    }

    #[test]
    fn test_garbage_is_a_media_error() {
        let err = JpegCompressor
            .process(b"not an image", ImageProfile::STANDARD)
            .unwrap_err();
        assert!(matches!(err, Error::Media(_)));
    }
}
