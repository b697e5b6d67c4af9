//! Decoded bitmaps and their orientation.

use image::RgbaImage;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Coarsest decimation level; also what callers without a size preference ask for.
pub const MAX_LEVEL: u8 = 10;

/// How a stored image relates to the depth axis.
///
/// Scans are stored tall. Scans captured lying down are flagged
/// `Horizontal` and rotated a quarter turn when decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum ImageOrientation {
    #[default]
    Vertical,
    Horizontal,
}

impl ImageOrientation {
    pub fn is_vertical(self) -> bool {
        self == ImageOrientation::Vertical
    }

    /// Natural `(width, height)` as displayed, given stored dimensions.
    pub fn display_size(self, width: u32, height: u32) -> (u32, u32) {
        match self {
            ImageOrientation::Vertical => (width, height),
            ImageOrientation::Horizontal => (height, width),
        }
    }
}

/// A decoded, display-oriented RGBA bitmap.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedImage {
    pixels: RgbaImage,
    level: u8,
    orientation: ImageOrientation,
}

impl DecodedImage {
    /// Wraps pixels that are already in display orientation.
    pub fn new(pixels: RgbaImage, level: u8, orientation: ImageOrientation) -> Self {
        Self {
            pixels,
            level: level.min(MAX_LEVEL),
            orientation,
        }
    }

    /// Wraps pixels in storage orientation, rotating non-vertical images.
    pub fn from_storage(pixels: RgbaImage, level: u8, orientation: ImageOrientation) -> Self {
        let pixels = match orientation {
            ImageOrientation::Vertical => pixels,
            ImageOrientation::Horizontal => image::imageops::rotate90(&pixels),
        };
        Self::new(pixels, level, orientation)
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn size(&self) -> (f64, f64) {
        (self.width() as f64, self.height() as f64)
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn level(&self) -> u8 {
        self.level
    }

    pub fn orientation(&self) -> ImageOrientation {
        self.orientation
    }

    /// Resident size of the pixel buffer.
    pub fn byte_size(&self) -> usize {
        self.pixels.as_raw().len()
    }

    /// Encodes the bitmap as PNG bytes.
    pub fn to_png(&self) -> Result<Vec<u8>, image::ImageError> {
        let mut out = std::io::Cursor::new(Vec::new());
        self.pixels.write_to(&mut out, image::ImageFormat::Png)?;
        Ok(out.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn horizontal_images_are_rotated_on_wrap() {
        let wide = RgbaImage::new(40, 10);
        let image = DecodedImage::from_storage(wide.clone(), 0, ImageOrientation::Horizontal);
        assert_eq!((image.width(), image.height()), (10, 40));

        let image = DecodedImage::from_storage(wide, 0, ImageOrientation::Vertical);
        assert_eq!((image.width(), image.height()), (40, 10));
    }

    #[test]
    fn level_is_clamped() {
        let image = DecodedImage::new(RgbaImage::new(1, 1), 42, ImageOrientation::Vertical);
        assert_eq!(image.level(), MAX_LEVEL);
    }
}
