//! Decoding image files at a decimation level.

use super::image::{DecodedImage, ImageOrientation, MAX_LEVEL};
use super::types::CacheError;
use image::imageops::FilterType;
use image::{ImageReader, RgbaImage};
use std::path::Path;

/// Picks the decimation level for drawing an image of `natural` display size
/// into `target` pixels.
///
/// The smaller of the two ratios wins so neither axis is rendered coarser
/// than it needs to be. Non-positive targets ask for [`MAX_LEVEL`].
pub fn level_for(natural: (u32, u32), target: (f64, f64)) -> u8 {
    let (tw, th) = target;
    if !(tw > 0.0 && th > 0.0) {
        return MAX_LEVEL;
    }
    let ratio = (natural.0 as f64 / tw).min(natural.1 as f64 / th);
    ratio.floor().clamp(0.0, MAX_LEVEL as f64) as u8
}

/// Stored pixel dimensions, read from the header only.
pub fn stored_size(path: &Path) -> Result<(u32, u32), CacheError> {
    let size = ImageReader::open(path)?
        .with_guessed_format()?
        .into_dimensions()?;
    Ok(size)
}

/// Decodes `path`, subsamples by `max(1, level)` and orients the result.
pub fn decode_file(
    path: &Path,
    level: u8,
    orientation: ImageOrientation,
) -> Result<DecodedImage, CacheError> {
    let pixels = ImageReader::open(path)?
        .with_guessed_format()?
        .decode()?
        .into_rgba8();
    log::debug!(
        "Decoded {} ({}x{}) at level {}",
        path.display(),
        pixels.width(),
        pixels.height(),
        level
    );
    Ok(DecodedImage::from_storage(
        subsample(pixels, level),
        level,
        orientation,
    ))
}

/// Shrinks `pixels` by the level's factor, never below one pixel.
pub fn subsample(pixels: RgbaImage, level: u8) -> RgbaImage {
    let factor = u32::from(level.max(1));
    if factor == 1 {
        return pixels;
    }
    let width = pixels.width().div_ceil(factor).max(1);
    let height = pixels.height().div_ceil(factor).max(1);
    image::imageops::resize(&pixels, width, height, FilterType::Triangle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn level_uses_the_smaller_ratio() {
        assert_eq!(level_for((4000, 4000), (500.0, 500.0)), 8);
        assert_eq!(level_for((4000, 4000), (100.0, 100.0)), 10);
        assert_eq!(level_for((4000, 1000), (500.0, 500.0)), 2);
        assert_eq!(level_for((300, 300), (500.0, 500.0)), 0);
    }

    #[test]
    fn non_positive_targets_ask_for_the_coarsest_level() {
        assert_eq!(level_for((4000, 4000), (0.0, 100.0)), MAX_LEVEL);
        assert_eq!(level_for((4000, 4000), (-1.0, -1.0)), MAX_LEVEL);
        assert_eq!(level_for((4000, 4000), (f64::NAN, 10.0)), MAX_LEVEL);
    }

    #[test]
    fn larger_targets_never_get_coarser_levels() {
        let natural = (3000, 1200);
        let mut previous = MAX_LEVEL;
        for size in (10..2000).step_by(37) {
            let level = level_for(natural, (size as f64, size as f64));
            assert!(level <= previous, "size {size}: {level} > {previous}");
            previous = level;
        }
    }

    #[test]
    fn subsampling_divides_dimensions() {
        let pixels = RgbaImage::from_pixel(100, 40, Rgba([1, 2, 3, 255]));
        let out = subsample(pixels.clone(), 4);
        assert_eq!((out.width(), out.height()), (25, 10));
        let out = subsample(pixels.clone(), 0);
        assert_eq!((out.width(), out.height()), (100, 40));
        let out = subsample(RgbaImage::new(3, 3), 10);
        assert_eq!((out.width(), out.height()), (1, 1));
    }

    #[test]
    fn decode_rotates_horizontal_images() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wide.png");
        RgbaImage::from_pixel(60, 20, Rgba([9, 9, 9, 255]))
            .save(&path)
            .unwrap();
        assert_eq!(stored_size(&path).unwrap(), (60, 20));
        let image = decode_file(&path, 2, ImageOrientation::Horizontal).unwrap();
        assert_eq!((image.width(), image.height()), (10, 30));
        assert_eq!(image.level(), 2);
    }

    #[test]
    fn garbage_fails_to_decode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"not an image").unwrap();
        assert!(decode_file(&path, 0, ImageOrientation::Vertical).is_err());
    }
}
