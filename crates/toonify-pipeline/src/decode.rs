//! Image decoding.
//!
//! Accepts raw image bytes (PNG, JPEG, GIF, BMP, WebP) and produces an
//! 8-bit RGBA [`SourceImage`] for the stylization pipeline.
//!
//! This is the only step that can reject the input as unreadable; it
//! runs before any resizing.

use crate::types::{DecodeError, SourceImage};

/// Decode raw image bytes into an RGBA source image.
///
/// Supports whatever formats the `image` crate was built with (PNG,
/// JPEG, GIF, BMP, WebP). Animated GIFs yield their first frame.
/// Grayscale, RGB, paletted and 16-bit inputs are converted to 8-bit
/// RGBA.
///
/// # Errors
///
/// Returns [`DecodeError::EmptyInput`] if `bytes` is empty.
/// Returns [`DecodeError::Image`] if the format is unrecognized or the
/// data is corrupt, and [`DecodeError::ZeroDimension`] if the decoded
/// image has no pixels.
pub fn decode(bytes: &[u8]) -> Result<SourceImage, DecodeError> {
    if bytes.is_empty() {
        return Err(DecodeError::EmptyInput);
    }

    let img = image::load_from_memory(bytes)?;
    tracing::debug!(
        width = img.width(),
        height = img.height(),
        color = ?img.color(),
        input_bytes = bytes.len(),
        "decoded source image"
    );
    SourceImage::new(img.into_rgba8())
}
