//! Before/after comparison image: the original on the left fading
//! linearly into the stylized output on the right.

use std::path::Path;

use image::imageops::FilterType;
use image::{Rgba, RgbaImage};

/// Blend `original` into `stylized` along the horizontal axis.
///
/// Column 0 is pure `original`, the last column is pure `stylized`.
/// Both images must have the same dimensions.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn blend_horizontal(original: &RgbaImage, stylized: &RgbaImage) -> RgbaImage {
    debug_assert_eq!(original.dimensions(), stylized.dimensions());
    let (width, height) = stylized.dimensions();
    let span = f64::from(width.saturating_sub(1).max(1));

    RgbaImage::from_fn(width, height, |x, y| {
        let t = (f64::from(x) / span).clamp(0.0, 1.0);
        let o = original.get_pixel(x, y);
        let s = stylized.get_pixel(x, y);
        let mix = |a: u8, b: u8| -> u8 {
            f64::from(a)
                .mul_add(1.0 - t, f64::from(b) * t)
                .round()
                .clamp(0.0, 255.0) as u8
        };
        Rgba([mix(o[0], s[0]), mix(o[1], s[1]), mix(o[2], s[2]), mix(o[3], s[3])])
    })
}

/// Scale the full-resolution original down to the output size, blend,
/// and save. The file format follows the extension of `path`.
pub fn write_comparison(
    original: &RgbaImage,
    stylized: &RgbaImage,
    path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let (width, height) = stylized.dimensions();
    let scaled = if original.dimensions() == (width, height) {
        original.clone()
    } else {
        image::imageops::resize(original, width, height, FilterType::Triangle)
    };

    tracing::debug!(width, height, path = %path.display(), "writing comparison image");
    blend_horizontal(&scaled, stylized).save(path)?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn edges_are_pure_and_middle_is_mixed() {
        let black = RgbaImage::from_pixel(5, 2, Rgba([0, 0, 0, 255]));
        let white = RgbaImage::from_pixel(5, 2, Rgba([255, 255, 255, 255]));
        let out = blend_horizontal(&black, &white);

        assert_eq!(out.get_pixel(0, 1).0, [0, 0, 0, 255]);
        assert_eq!(out.get_pixel(4, 0).0, [255, 255, 255, 255]);
        // t = 0.5 at the centre column: 127.5 rounds up.
        assert_eq!(out.get_pixel(2, 0).0, [128, 128, 128, 255]);

        let row: Vec<u8> = (0..5).map(|x| out.get_pixel(x, 0)[0]).collect();
        assert!(row.windows(2).all(|w| w[0] <= w[1]), "{row:?}");
    }

    #[test]
    fn single_column_shows_original() {
        let a = RgbaImage::from_pixel(1, 3, Rgba([10, 20, 30, 40]));
        let b = RgbaImage::from_pixel(1, 3, Rgba([200, 200, 200, 200]));
        assert_eq!(blend_horizontal(&a, &b), a);
    }

    #[test]
    fn writes_scaled_comparison() {
        let dir = std::env::temp_dir().join(format!("toonify-compare-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("compare.png");

        let original = RgbaImage::from_pixel(40, 20, Rgba([90, 90, 90, 255]));
        let stylized = RgbaImage::from_pixel(10, 5, Rgba([90, 90, 90, 255]));
        write_comparison(&original, &stylized, &path).unwrap();

        let saved = image::open(&path).unwrap().into_rgba8();
        assert_eq!(saved.dimensions(), (10, 5));
        assert!(saved.pixels().all(|p| p.0 == [90, 90, 90, 255]));
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
