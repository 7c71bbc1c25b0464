//! Contrast and saturation enhancement.
//!
//! Applied in place after posterization, per pixel, in a fixed order:
//!
//! 1. Contrast around mid-gray on R, G, B:
//!    `v' = clamp(round((v - 128) * contrast + 128))`
//! 2. Saturation around the mean of the *contrast-adjusted* channels:
//!    `avg = (R' + G' + B') / 3`,
//!    `v'' = clamp(round(avg + (v' - avg) * saturation))`
//!
//! The order matters: computing the mean before contrast gives a
//! visibly different tone.
//!
//! Rounding is half away from zero ([`f32::round`]) and happens after
//! each step, before clamping to `[0, 255]`, so the intermediate
//! contrast result is a real 8-bit value exactly as if it had been
//! written back to the buffer. Alpha is never modified.

use crate::types::RgbaImage;

/// Mid-gray pivot for the contrast curve.
const PIVOT: f32 = 128.0;

/// Round half away from zero and clamp into the 8-bit channel range.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn clamp_channel(value: f32) -> u8 {
    // In [0, 255] after the clamp; NaN saturates to 0.
    value.round().clamp(0.0, 255.0) as u8
}

/// Apply the contrast curve to one channel value.
#[must_use]
#[allow(clippy::suboptimal_flops)] // `mul_add` is a libm call on wasm
pub fn contrast_channel(value: u8, factor: f32) -> u8 {
    clamp_channel((f32::from(value) - PIVOT) * factor + PIVOT)
}

/// Push one channel value away from (or toward) the pixel mean.
#[must_use]
#[allow(clippy::suboptimal_flops)]
pub fn saturate_channel(value: u8, mean: f32, factor: f32) -> u8 {
    clamp_channel(mean + (f32::from(value) - mean) * factor)
}

/// Enhance one RGB triple: contrast first, then saturation computed
/// from the contrast-adjusted mean.
#[must_use]
pub fn enhance_rgb(rgb: [u8; 3], contrast: f32, saturation: f32) -> [u8; 3] {
    let contrasted = rgb.map(|v| contrast_channel(v, contrast));
    let mean = (f32::from(contrasted[0]) + f32::from(contrasted[1]) + f32::from(contrasted[2]))
        / 3.0;
    contrasted.map(|v| saturate_channel(v, mean, saturation))
}

/// Apply contrast and saturation enhancement to `image` in place.
pub fn enhance(image: &mut RgbaImage, contrast: f32, saturation: f32) {
    tracing::trace!(contrast, saturation, "enhancing contrast and saturation");
    for pixel in image.pixels_mut() {
        let [r, g, b, _] = pixel.0;
        let [r, g, b] = enhance_rgb([r, g, b], contrast, saturation);
        pixel.0[0] = r;
        pixel.0[1] = g;
        pixel.0[2] = b;
    }
}
