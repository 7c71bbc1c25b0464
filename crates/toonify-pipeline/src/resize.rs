//! Proportional downscaling to the working resolution.
//!
//! Reduces the source image so its longer side equals the configured
//! `max_dimension`, scaling both sides by the same ratio. This is the
//! first processing step after decode and bounds the cost of every
//! later pass.
//!
//! Images already within the bound are returned unchanged; the stage
//! never upscales.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::RgbaImage;

/// Resampling filter used when downscaling.
///
/// Only continuous filters are offered: nearest-neighbour sampling
/// aliases badly, and the aliasing survives posterization as jagged
/// colour bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ResizeFilter {
    /// Bilinear interpolation: fast, decent quality.
    #[default]
    Triangle,
    /// Bicubic (Catmull-Rom): moderate speed, good quality.
    CatmullRom,
    /// Gaussian: moderate speed, smooth output.
    Gaussian,
    /// Lanczos with 3 lobes: slowest, sharpest.
    Lanczos3,
}

impl ResizeFilter {
    /// Convert to the `image` crate's `FilterType`.
    const fn to_image_filter(self) -> image::imageops::FilterType {
        match self {
            Self::Triangle => image::imageops::FilterType::Triangle,
            Self::CatmullRom => image::imageops::FilterType::CatmullRom,
            Self::Gaussian => image::imageops::FilterType::Gaussian,
            Self::Lanczos3 => image::imageops::FilterType::Lanczos3,
        }
    }
}

impl fmt::Display for ResizeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Triangle => f.write_str("Triangle"),
            Self::CatmullRom => f.write_str("CatmullRom"),
            Self::Gaussian => f.write_str("Gaussian"),
            Self::Lanczos3 => f.write_str("Lanczos3"),
        }
    }
}

/// Compute the working dimensions for an image of `width` x `height`.
///
/// If the longer side is already at most `max_dimension` (this includes
/// degenerate 0x0 and 1x1 inputs) the dimensions are returned as-is.
/// Otherwise the longer side becomes `max_dimension` and the shorter
/// side is scaled by the same ratio, rounded to the nearest integer
/// (halves round up) and never below 1.
#[must_use]
pub fn scaled_dimensions(width: u32, height: u32, max_dimension: u32) -> (u32, u32) {
    let max_dimension = max_dimension.max(1);
    let long = width.max(height);
    if long <= max_dimension {
        return (width, height);
    }

    // round(side * max / long) == floor((2 * side * max + long) / (2 * long))
    // u128: 2 * u32::MAX * u32::MAX does not fit in u64.
    let scale = |side: u32| -> u32 {
        let numerator = 2 * u128::from(side) * u128::from(max_dimension) + u128::from(long);
        let scaled = numerator / (2 * u128::from(long));
        u32::try_from(scaled).unwrap_or(max_dimension).max(1)
    };

    if width >= height {
        (max_dimension, scale(height))
    } else {
        (scale(width), max_dimension)
    }
}

/// Downscale `image` so the longer side is at most `max_dimension`
/// pixels, using the given resampling filter.
///
/// Returns the working buffer and whether resampling was actually
/// applied. The returned buffer is always a fresh allocation owned by
/// the caller.
#[must_use]
pub fn resize(image: &RgbaImage, max_dimension: u32, filter: ResizeFilter) -> (RgbaImage, bool) {
    let (w, h) = image.dimensions();
    let (scaled_w, scaled_h) = scaled_dimensions(w, h, max_dimension);

    if (scaled_w, scaled_h) == (w, h) {
        return (image.clone(), false);
    }

    tracing::debug!(
        from_width = w,
        from_height = h,
        to_width = scaled_w,
        to_height = scaled_h,
        %filter,
        "resizing to working resolution"
    );
    let resized = image::imageops::resize(image, scaled_w, scaled_h, filter.to_image_filter());
    (resized, true)
}
