//! Sobel edge detection and edge-darkening composite.
//!
//! Edges are found with the standard 3x3 Sobel kernels applied to the
//! **red channel** of the enhanced working buffer. Red stands in for
//! luminance; this is a known simplification kept so output matches
//! the avatar converter pixel for pixel. Swapping in weighted
//! luminance would move edges on saturated colours.
//!
//! The pass is split in two so reads and writes never alias:
//!
//! 1. [`edge_mask`] reads only the working buffer and marks every
//!    interior pixel whose gradient magnitude exceeds the threshold.
//! 2. [`composite`] copies the working buffer into a fresh edge buffer
//!    and darkens the marked pixels there.
//!
//! Border pixels (first/last row and column) are never tested and
//! pass through unchanged.

use image::{GrayImage, Luma};

use crate::types::RgbaImage;

/// Mask value marking an edge pixel.
pub const EDGE: u8 = 255;

/// Horizontal Sobel kernel, indexed `[row][column]`.
pub const SOBEL_X: [[i32; 3]; 3] = [[-1, 0, 1], [-2, 0, 2], [-1, 0, 1]];

/// Vertical Sobel kernel, indexed `[row][column]`.
pub const SOBEL_Y: [[i32; 3]; 3] = [[-1, -2, -1], [0, 0, 0], [1, 2, 1]];

/// Sobel gradients `(gx, gy)` of the red channel at an interior pixel.
///
/// The caller must ensure `1 <= x < width - 1` and `1 <= y < height - 1`.
#[must_use]
pub fn sobel_at(image: &RgbaImage, x: u32, y: u32) -> (i32, i32) {
    let mut gx = 0;
    let mut gy = 0;
    for ((row_x, row_y), ny) in SOBEL_X.iter().zip(&SOBEL_Y).zip(y - 1..=y + 1) {
        for ((kx, ky), nx) in row_x.iter().zip(row_y).zip(x - 1..=x + 1) {
            let red = i32::from(image.get_pixel(nx, ny).0[0]);
            gx += kx * red;
            gy += ky * red;
        }
    }
    (gx, gy)
}

/// Euclidean gradient magnitude `sqrt(gx^2 + gy^2)`.
#[must_use]
pub fn gradient_magnitude(gx: i32, gy: i32) -> f64 {
    f64::from(gx).hypot(f64::from(gy))
}

/// Build the binary edge mask of `working`.
///
/// Returns a grayscale image of the same dimensions: [`EDGE`] where an
/// interior pixel's Sobel magnitude is strictly greater than
/// `threshold`, 0 everywhere else (including the whole border). Images
/// narrower or shorter than 3 pixels have no interior and produce an
/// empty mask.
#[must_use = "returns the edge mask"]
pub fn edge_mask(working: &RgbaImage, threshold: f32) -> GrayImage {
    let (w, h) = working.dimensions();
    let mut mask = GrayImage::new(w, h);
    if w < 3 || h < 3 {
        return mask;
    }

    let threshold = f64::from(threshold);
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let (gx, gy) = sobel_at(working, x, y);
            if gradient_magnitude(gx, gy) > threshold {
                mask.put_pixel(x, y, Luma([EDGE]));
            }
        }
    }
    mask
}

/// Produce the edge buffer: a copy of `working` with R, G and B of
/// every masked pixel reduced by `darkening` (saturating at 0).
///
/// Alpha and unmasked pixels are copied unchanged. The mask is read by
/// coordinate: pixels of `working` it does not cover count as unmarked,
/// and mask pixels outside `working` are ignored.
#[must_use = "returns the composited edge buffer"]
pub fn composite(working: &RgbaImage, mask: &GrayImage, darkening: u8) -> RgbaImage {
    if working.dimensions() != mask.dimensions() {
        tracing::warn!(
            working = ?working.dimensions(),
            mask = ?mask.dimensions(),
            "edge mask size differs from working buffer"
        );
    }

    let mut edge_buffer = working.clone();
    for (x, y, pixel) in edge_buffer.enumerate_pixels_mut() {
        if mask.get_pixel_checked(x, y).is_some_and(|m| m.0[0] == EDGE) {
            for channel in &mut pixel.0[..3] {
                *channel = channel.saturating_sub(darkening);
            }
        }
    }
    edge_buffer
}

/// Detect edges in `working` and darken them into a new buffer.
///
/// Returns `(edge_buffer, mask)`. `working` is only read.
#[must_use]
pub fn detect_and_darken(
    working: &RgbaImage,
    threshold: f32,
    darkening: u8,
) -> (RgbaImage, GrayImage) {
    let mask = edge_mask(working, threshold);
    let edge_buffer = composite(working, &mask, darkening);
    tracing::debug!(
        threshold,
        darkening,
        edge_pixels = count_edge_pixels(&mask),
        "darkened edges"
    );
    (edge_buffer, mask)
}

/// Count edge pixels (value == [`EDGE`]) in a mask.
#[must_use]
pub fn count_edge_pixels(mask: &GrayImage) -> u64 {
    mask.pixels().map(|p| u64::from(p.0[0] == EDGE)).sum()
}
