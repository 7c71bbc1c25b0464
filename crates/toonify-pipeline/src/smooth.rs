//! Optional Gaussian pre-smoothing before colour quantization.
//!
//! Wraps [`imageproc::filter::gaussian_blur_f32`] to soften fine
//! texture (skin pores, JPEG noise, fabric) that would otherwise
//! survive posterization as speckled single-pixel bands and trigger
//! spurious Sobel edges.
//!
//! Disabled by default: with `sigma == 0.0` the stage is an exact
//! pass-through.

use image::GrayImage;

use crate::types::RgbaImage;

/// Blur the colour channels of an RGBA image independently, leaving
/// alpha untouched.
///
/// `imageproc::filter::gaussian_blur_f32` only accepts single-channel
/// images, so R, G and B are split out, blurred and reassembled.
/// Non-positive sigma values return the image unchanged, since
/// `imageproc`'s underlying function panics on `sigma <= 0.0`.
#[must_use = "returns the smoothed RGBA image"]
pub fn smooth(image: &RgbaImage, sigma: f32) -> RgbaImage {
    if sigma <= 0.0 || image.width() == 0 || image.height() == 0 {
        return image.clone();
    }

    tracing::debug!(sigma, "smoothing colour channels");
    let (w, h) = (image.width(), image.height());

    let blurred: [GrayImage; 3] = std::array::from_fn(|c| {
        let channel = GrayImage::from_fn(w, h, |x, y| image::Luma([image.get_pixel(x, y).0[c]]));
        imageproc::filter::gaussian_blur_f32(&channel, sigma)
    });

    RgbaImage::from_fn(w, h, |x, y| {
        image::Rgba([
            blurred[0].get_pixel(x, y).0[0],
            blurred[1].get_pixel(x, y).0[0],
            blurred[2].get_pixel(x, y).0[0],
            image.get_pixel(x, y).0[3],
        ])
    })
}
