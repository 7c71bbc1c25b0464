//! Colour quantization (posterization).
//!
//! Snaps each colour channel onto `levels` evenly spaced bands,
//! producing the flat colour regions of cartoon shading:
//!
//! ```text
//! step  = floor(256 / levels)
//! value = floor(value / step) * step
//! ```
//!
//! Alpha is never modified. Every pixel is processed independently, so
//! the pass is order-independent.

use crate::types::RgbaImage;

/// Band width for a given level count: `floor(256 / levels)`.
///
/// A level count of zero is treated as one (step 256); option
/// validation rejects it before the pipeline ever gets here.
#[must_use]
pub fn quantize_step(levels: u32) -> u16 {
    u16::try_from(256 / levels.max(1)).unwrap_or(256)
}

/// Snap one channel value down onto the band grid.
#[must_use]
pub fn quantize(value: u8, step: u16) -> u8 {
    let step = step.max(1);
    let snapped = u16::from(value) / step * step;
    // `snapped <= value`, so this never saturates.
    u8::try_from(snapped).unwrap_or(u8::MAX)
}

/// Posterize the R, G and B channels of `image` in place.
///
/// With `levels == 1` the step is 256 and every colour channel becomes
/// 0; with `levels == 256` the step is 1 and the image is unchanged.
pub fn posterize(image: &mut RgbaImage, levels: u32) {
    let step = quantize_step(levels);
    tracing::trace!(levels, step, "posterizing");
    for pixel in image.pixels_mut() {
        for channel in &mut pixel.0[..3] {
            *channel = quantize(*channel, step);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Deterministic pseudo-random noise image.
    fn noise_image(w: u32, h: u32) -> RgbaImage {
        let mut state: u32 = 0x1234_5678;
        RgbaImage::from_fn(w, h, |_, _| {
            let mut channel = || {
                state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
                (state >> 24).to_le_bytes()[0]
            };
            image::Rgba([channel(), channel(), channel(), channel()])
        })
    }

    #[test]
    fn step_for_common_level_counts() {
        assert_eq!(quantize_step(1), 256);
        assert_eq!(quantize_step(2), 128);
        assert_eq!(quantize_step(3), 85);
        assert_eq!(quantize_step(8), 32);
        assert_eq!(quantize_step(256), 1);
        assert_eq!(quantize_step(0), 256);
    }

    #[test]
    fn quantize_snaps_down() {
        assert_eq!(quantize(0, 32), 0);
        assert_eq!(quantize(31, 32), 0);
        assert_eq!(quantize(32, 32), 32);
        assert_eq!(quantize(255, 32), 224);
        assert_eq!(quantize(255, 85), 255);
        assert_eq!(quantize(169, 85), 85);
        assert_eq!(quantize(200, 1), 200);
    }

    #[test]
    fn every_channel_is_a_multiple_of_step() {
        for levels in [2, 3, 5, 8, 16, 100] {
            let mut img = noise_image(32, 32);
            posterize(&mut img, levels);
            let step = quantize_step(levels);
            for pixel in img.pixels() {
                for &channel in &pixel.0[..3] {
                    assert_eq!(
                        u16::from(channel) % step,
                        0,
                        "levels={levels}: {channel} is not a multiple of {step}",
                    );
                }
            }
        }
    }

    #[test]
    fn alpha_is_untouched() {
        let original = noise_image(16, 16);
        let mut img = original.clone();
        posterize(&mut img, 4);
        for (after, before) in img.pixels().zip(original.pixels()) {
            assert_eq!(after.0[3], before.0[3]);
        }
    }

    #[test]
    fn single_level_zeroes_colour() {
        let mut img = RgbaImage::from_fn(4, 4, |x, y| {
            let v = u8::try_from(x * 60 + y * 5).unwrap_or(u8::MAX);
            image::Rgba([v, 255, 254, 200])
        });
        posterize(&mut img, 1);
        for pixel in img.pixels() {
            assert_eq!(pixel.0, [0, 0, 0, 200]);
        }
    }

    #[test]
    fn max_levels_is_identity() {
        let original = noise_image(16, 16);
        let mut img = original.clone();
        posterize(&mut img, 256);
        assert_eq!(img, original);
    }

    #[test]
    fn posterize_is_idempotent() {
        let mut once = noise_image(16, 16);
        posterize(&mut once, 6);
        let mut twice = once.clone();
        posterize(&mut twice, 6);
        assert_eq!(once, twice);
    }
}
