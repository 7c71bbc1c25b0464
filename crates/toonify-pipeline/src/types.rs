//! Shared types for the toonify stylization pipeline.

use serde::{Deserialize, Serialize};

use crate::encode::OutputFormat;
use crate::resize::ResizeFilter;

/// Re-export `GrayImage` so downstream crates can reference the edge
/// mask without depending on `image` directly.
pub use image::GrayImage;

/// Re-export `RgbaImage` so downstream crates can reference working
/// buffers without depending on `image` directly.
pub use image::RgbaImage;

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// The longer of the two sides.
    #[must_use]
    pub const fn long_side(self) -> u32 {
        if self.width >= self.height {
            self.width
        } else {
            self.height
        }
    }

    /// Total pixel count (`width * height`).
    #[must_use]
    pub fn pixel_count(self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

/// A decoded raster image: the immutable input to the pipeline.
///
/// Always 8-bit RGBA with non-zero width and height. The pipeline only
/// ever reads from it; every stage allocates its own buffers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceImage(RgbaImage);

impl SourceImage {
    /// Wrap an already-decoded RGBA image.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::ZeroDimension`] if either side is zero.
    pub fn new(image: RgbaImage) -> Result<Self, DecodeError> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(DecodeError::ZeroDimension { width, height });
        }
        Ok(Self(image))
    }

    /// Build a source image from raw RGBA samples in row-major order.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::ZeroDimension`] if either side is zero and
    /// [`DecodeError::BufferSize`] if `pixels` is not exactly
    /// `width * height * 4` bytes long.
    pub fn from_raw(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, DecodeError> {
        if width == 0 || height == 0 {
            return Err(DecodeError::ZeroDimension { width, height });
        }
        let expected = u64::from(width) * u64::from(height) * 4;
        let actual = pixels.len();
        let size_error = DecodeError::BufferSize {
            width,
            height,
            expected,
            actual,
        };
        // `from_raw` accepts oversized buffers, so check for an exact match.
        if u64::try_from(actual).ok() != Some(expected) {
            return Err(size_error);
        }
        RgbaImage::from_raw(width, height, pixels)
            .map(Self)
            .ok_or(size_error)
    }

    /// Width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.0.width()
    }

    /// Height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.0.height()
    }

    /// Source dimensions.
    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.0.width(),
            height: self.0.height(),
        }
    }

    /// Borrow the underlying RGBA image.
    #[must_use]
    pub const fn as_rgba(&self) -> &RgbaImage {
        &self.0
    }

    /// Consume and return the underlying RGBA image.
    #[must_use]
    pub fn into_rgba(self) -> RgbaImage {
        self.0
    }
}

/// Configuration for the stylization pipeline.
///
/// Every field has a default matching the reference cartoon look, and
/// the struct deserializes with missing fields filled from
/// [`Default`], so partial JSON such as `{"levels": 4}` is accepted.
///
/// Call [`validate`](Self::validate) (the pipeline does this before any
/// pixel work) to reject out-of-range values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StylizeOptions {
    /// Upper bound on the longer side of the working buffer. Larger
    /// images are downscaled; smaller ones are never upscaled.
    pub max_dimension: u32,

    /// Number of posterization bands per colour channel (1..=256).
    pub levels: u32,

    /// Contrast multiplier applied around mid-gray (128).
    pub contrast_factor: f32,

    /// Saturation multiplier applied around each pixel's channel mean.
    pub saturation_factor: f32,

    /// Sobel magnitude above which a pixel counts as an edge.
    pub edge_threshold: f32,

    /// Amount subtracted from R, G and B of edge pixels.
    pub edge_darkening: u8,

    /// Resampling filter used when downscaling.
    pub resize_filter: ResizeFilter,

    /// Gaussian pre-smoothing sigma applied before posterization.
    /// `0.0` disables smoothing.
    pub smoothing_sigma: f32,
}

impl StylizeOptions {
    /// Default working resolution bound.
    pub const DEFAULT_MAX_DIMENSION: u32 = 512;
    /// Default posterization level count.
    pub const DEFAULT_LEVELS: u32 = 8;
    /// Default contrast multiplier.
    pub const DEFAULT_CONTRAST_FACTOR: f32 = 1.3;
    /// Default saturation multiplier.
    pub const DEFAULT_SATURATION_FACTOR: f32 = 1.4;
    /// Default Sobel edge threshold.
    pub const DEFAULT_EDGE_THRESHOLD: f32 = 30.0;
    /// Default edge darkening amount.
    pub const DEFAULT_EDGE_DARKENING: u8 = 100;
    /// Default resampling filter.
    pub const DEFAULT_RESIZE_FILTER: ResizeFilter = ResizeFilter::Triangle;
    /// Default smoothing sigma (disabled).
    pub const DEFAULT_SMOOTHING_SIGMA: f32 = 0.0;

    /// Largest accepted level count. Above this `256 / levels` is zero.
    pub const MAX_LEVELS: u32 = 256;

    /// Check every field against its accepted range.
    ///
    /// # Errors
    ///
    /// Returns [`StylizeError::InvalidOptions`] naming the first
    /// offending field.
    pub fn validate(&self) -> Result<(), StylizeError> {
        if self.max_dimension == 0 {
            return Err(StylizeError::InvalidOptions(
                "max_dimension must be at least 1".to_string(),
            ));
        }
        if self.levels == 0 || self.levels > Self::MAX_LEVELS {
            return Err(StylizeError::InvalidOptions(format!(
                "levels must be between 1 and {}, got {}",
                Self::MAX_LEVELS,
                self.levels,
            )));
        }
        non_negative_finite("contrast_factor", self.contrast_factor)?;
        non_negative_finite("saturation_factor", self.saturation_factor)?;
        non_negative_finite("edge_threshold", self.edge_threshold)?;
        non_negative_finite("smoothing_sigma", self.smoothing_sigma)?;
        Ok(())
    }
}

fn non_negative_finite(name: &str, value: f32) -> Result<(), StylizeError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(StylizeError::InvalidOptions(format!(
            "{name} must be finite and non-negative, got {value}"
        )))
    }
}

impl Default for StylizeOptions {
    fn default() -> Self {
        Self {
            max_dimension: Self::DEFAULT_MAX_DIMENSION,
            levels: Self::DEFAULT_LEVELS,
            contrast_factor: Self::DEFAULT_CONTRAST_FACTOR,
            saturation_factor: Self::DEFAULT_SATURATION_FACTOR,
            edge_threshold: Self::DEFAULT_EDGE_THRESHOLD,
            edge_darkening: Self::DEFAULT_EDGE_DARKENING,
            resize_filter: Self::DEFAULT_RESIZE_FILTER,
            smoothing_sigma: Self::DEFAULT_SMOOTHING_SIGMA,
        }
    }
}

/// The pipeline's output: the final edge buffer plus its encoded form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StylizedImage {
    /// Final RGBA pixels at the working resolution.
    pub image: RgbaImage,
    /// `image` serialized in `format`.
    pub encoded: Vec<u8>,
    /// Format of `encoded`.
    pub format: OutputFormat,
}

impl StylizedImage {
    /// Output dimensions.
    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.image.width(),
            height: self.image.height(),
        }
    }

    /// The encoded bytes as a `data:` URL, ready to use as an `<img>`
    /// source.
    #[must_use]
    pub fn data_url(&self) -> String {
        crate::encode::to_data_url(&self.encoded, self.format)
    }
}

/// Result of running the pipeline with every intermediate raster kept.
///
/// Each field captures the output of one stage so a UI or the CLI can
/// show the effect of each pass in isolation.
#[derive(Debug, Clone)]
pub struct StagedResult {
    /// The decoded input.
    pub original: RgbaImage,
    /// Working buffer after proportional downscaling.
    pub resized: RgbaImage,
    /// After optional Gaussian pre-smoothing (identical to `resized`
    /// when smoothing is disabled).
    pub smoothed: RgbaImage,
    /// After colour quantization.
    pub posterized: RgbaImage,
    /// After contrast and saturation enhancement.
    pub enhanced: RgbaImage,
    /// Binary edge mask: 255 where the pixel was darkened.
    pub edges: GrayImage,
    /// Final stylized image and its encoding.
    pub output: StylizedImage,
}

impl StagedResult {
    /// Dimensions of the working (and output) buffers.
    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        self.output.dimensions()
    }
}

/// The input could not be interpreted as a raster image.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The input image bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// The image has no pixels.
    #[error("image has zero width or height ({width}x{height})")]
    ZeroDimension {
        /// Declared width.
        width: u32,
        /// Declared height.
        height: u32,
    },

    /// A raw pixel buffer does not match its declared dimensions.
    #[error("pixel buffer holds {actual} bytes, expected {expected} for {width}x{height} RGBA")]
    BufferSize {
        /// Declared width.
        width: u32,
        /// Declared height.
        height: u32,
        /// `width * height * 4`.
        expected: u64,
        /// Actual buffer length.
        actual: usize,
    },

    /// The `image` crate rejected the bytes (unknown format or corrupt data).
    #[error(transparent)]
    Image(#[from] image::ImageError),
}

/// The stylized image could not be serialized.
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    /// The requested output format is not available.
    #[error("unsupported output format: {0}")]
    UnsupportedFormat(String),

    /// The encoder failed.
    #[error(transparent)]
    Image(#[from] image::ImageError),
}

/// Errors that can occur during stylization.
///
/// Uses custom `Serialize`/`Deserialize` because `image::ImageError`
/// does not implement serde traits. Wrapped image errors are serialized
/// as their `Display` string.
#[derive(Debug, thiserror::Error)]
pub enum StylizeError {
    /// The input could not be decoded. Raised before any processing.
    #[error("failed to decode image: {0}")]
    Decode(#[from] DecodeError),

    /// The output could not be encoded. Raised after edge detection.
    #[error("failed to encode image: {0}")]
    Encode(#[from] EncodeError),

    /// Out-of-range configuration. Raised before any processing.
    #[error("invalid stylize options: {0}")]
    InvalidOptions(String),
}

/// Serde-compatible proxy for [`StylizeError`].
///
/// Image codec errors cannot be reconstructed, so they carry only their
/// message and deserialize into a generic codec error of the same
/// direction (decode or encode).
#[derive(Serialize, Deserialize)]
enum StylizeErrorProxy {
    EmptyInput,
    ZeroDimension {
        width: u32,
        height: u32,
    },
    BufferSize {
        width: u32,
        height: u32,
        expected: u64,
        actual: usize,
    },
    DecodeImage(String),
    UnsupportedFormat(String),
    EncodeImage(String),
    InvalidOptions(String),
}

impl Serialize for StylizeError {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let proxy = match self {
            Self::Decode(DecodeError::EmptyInput) => StylizeErrorProxy::EmptyInput,
            Self::Decode(DecodeError::ZeroDimension { width, height }) => {
                StylizeErrorProxy::ZeroDimension {
                    width: *width,
                    height: *height,
                }
            }
            Self::Decode(DecodeError::BufferSize {
                width,
                height,
                expected,
                actual,
            }) => StylizeErrorProxy::BufferSize {
                width: *width,
                height: *height,
                expected: *expected,
                actual: *actual,
            },
            Self::Decode(DecodeError::Image(e)) => StylizeErrorProxy::DecodeImage(e.to_string()),
            Self::Encode(EncodeError::UnsupportedFormat(s)) => {
                StylizeErrorProxy::UnsupportedFormat(s.clone())
            }
            Self::Encode(EncodeError::Image(e)) => StylizeErrorProxy::EncodeImage(e.to_string()),
            Self::InvalidOptions(s) => StylizeErrorProxy::InvalidOptions(s.clone()),
        };
        proxy.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for StylizeError {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use image::error::{DecodingError, EncodingError, ImageFormatHint};

        let proxy = StylizeErrorProxy::deserialize(deserializer)?;
        Ok(match proxy {
            StylizeErrorProxy::EmptyInput => Self::Decode(DecodeError::EmptyInput),
            StylizeErrorProxy::ZeroDimension { width, height } => {
                Self::Decode(DecodeError::ZeroDimension { width, height })
            }
            StylizeErrorProxy::BufferSize {
                width,
                height,
                expected,
                actual,
            } => Self::Decode(DecodeError::BufferSize {
                width,
                height,
                expected,
                actual,
            }),
            StylizeErrorProxy::DecodeImage(msg) => Self::Decode(DecodeError::Image(
                image::ImageError::Decoding(DecodingError::new(ImageFormatHint::Unknown, msg)),
            )),
            StylizeErrorProxy::UnsupportedFormat(s) => {
                Self::Encode(EncodeError::UnsupportedFormat(s))
            }
            StylizeErrorProxy::EncodeImage(msg) => Self::Encode(EncodeError::Image(
                image::ImageError::Encoding(EncodingError::new(ImageFormatHint::Unknown, msg)),
            )),
            StylizeErrorProxy::InvalidOptions(s) => Self::InvalidOptions(s),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    // --- Dimensions tests ---

    #[test]
    fn dimensions_long_side() {
        let landscape = Dimensions {
            width: 600,
            height: 300,
        };
        let portrait = Dimensions {
            width: 20,
            height: 90,
        };
        assert_eq!(landscape.long_side(), 600);
        assert_eq!(portrait.long_side(), 90);
        assert_eq!(landscape.pixel_count(), 180_000);
    }

    // --- SourceImage tests ---

    #[test]
    fn source_from_raw_accepts_matching_buffer() {
        let source = SourceImage::from_raw(3, 2, vec![7; 3 * 2 * 4]).unwrap();
        assert_eq!(source.width(), 3);
        assert_eq!(source.height(), 2);
        assert_eq!(source.as_rgba().get_pixel(2, 1).0, [7, 7, 7, 7]);
    }

    #[test]
    fn source_from_raw_rejects_short_buffer() {
        let result = SourceImage::from_raw(4, 4, vec![0; 10]);
        assert!(matches!(
            result,
            Err(DecodeError::BufferSize {
                width: 4,
                height: 4,
                expected: 64,
                actual: 10,
            })
        ));
    }

    #[test]
    fn source_from_raw_rejects_long_buffer() {
        let result = SourceImage::from_raw(1, 1, vec![0; 5]);
        assert!(matches!(result, Err(DecodeError::BufferSize { .. })));
    }

    #[test]
    fn source_rejects_zero_dimension() {
        assert!(matches!(
            SourceImage::from_raw(0, 0, vec![]),
            Err(DecodeError::ZeroDimension {
                width: 0,
                height: 0
            })
        ));
        assert!(matches!(
            SourceImage::new(RgbaImage::new(5, 0)),
            Err(DecodeError::ZeroDimension { .. })
        ));
    }

    // --- StylizeOptions tests ---

    #[test]
    fn options_defaults() {
        let options = StylizeOptions::default();
        assert_eq!(options.max_dimension, 512);
        assert_eq!(options.levels, 8);
        assert!((options.contrast_factor - 1.3).abs() < f32::EPSILON);
        assert!((options.saturation_factor - 1.4).abs() < f32::EPSILON);
        assert!((options.edge_threshold - 30.0).abs() < f32::EPSILON);
        assert_eq!(options.edge_darkening, 100);
        assert_eq!(options.resize_filter, ResizeFilter::Triangle);
        assert!(options.smoothing_sigma.abs() < f32::EPSILON);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_max_dimension() {
        let options = StylizeOptions {
            max_dimension: 0,
            ..StylizeOptions::default()
        };
        assert!(matches!(
            options.validate(),
            Err(StylizeError::InvalidOptions(ref s)) if s.contains("max_dimension")
        ));
    }

    #[test]
    fn validate_level_bounds() {
        for (levels, ok) in [(0, false), (1, true), (256, true), (257, false)] {
            let options = StylizeOptions {
                levels,
                ..StylizeOptions::default()
            };
            assert_eq!(options.validate().is_ok(), ok, "levels={levels}");
        }
    }

    #[test]
    fn validate_rejects_bad_factors() {
        let cases = [
            StylizeOptions {
                contrast_factor: f32::NAN,
                ..StylizeOptions::default()
            },
            StylizeOptions {
                saturation_factor: -0.5,
                ..StylizeOptions::default()
            },
            StylizeOptions {
                edge_threshold: f32::INFINITY,
                ..StylizeOptions::default()
            },
            StylizeOptions {
                smoothing_sigma: -1.0,
                ..StylizeOptions::default()
            },
        ];
        for options in cases {
            assert!(
                matches!(options.validate(), Err(StylizeError::InvalidOptions(_))),
                "expected rejection for {options:?}",
            );
        }
    }

    #[test]
    fn options_deserialize_fills_missing_fields() {
        let options: StylizeOptions = serde_json::from_str(r#"{"levels": 4}"#).unwrap();
        assert_eq!(options.levels, 4);
        assert_eq!(options.max_dimension, StylizeOptions::DEFAULT_MAX_DIMENSION);
        assert_eq!(options.resize_filter, ResizeFilter::Triangle);
    }

    #[test]
    fn options_serde_round_trip() {
        let options = StylizeOptions {
            max_dimension: 256,
            levels: 4,
            contrast_factor: 1.1,
            saturation_factor: 2.0,
            edge_threshold: 45.0,
            edge_darkening: 60,
            resize_filter: ResizeFilter::Lanczos3,
            smoothing_sigma: 1.5,
        };
        let json = serde_json::to_string(&options).unwrap();
        let deserialized: StylizeOptions = serde_json::from_str(&json).unwrap();
        assert_eq!(options, deserialized);
    }

    // --- StylizeError tests ---

    #[test]
    fn error_display() {
        let err = StylizeError::from(DecodeError::EmptyInput);
        assert_eq!(
            err.to_string(),
            "failed to decode image: input image data is empty"
        );
        let err = StylizeError::from(EncodeError::UnsupportedFormat("gif".to_string()));
        assert_eq!(
            err.to_string(),
            "failed to encode image: unsupported output format: gif"
        );
        let err = StylizeError::InvalidOptions("levels must be between 1 and 256, got 0".into());
        assert_eq!(
            err.to_string(),
            "invalid stylize options: levels must be between 1 and 256, got 0"
        );
    }

    #[test]
    fn error_serde_round_trip_structured_variants() {
        let err = StylizeError::from(DecodeError::BufferSize {
            width: 2,
            height: 2,
            expected: 16,
            actual: 3,
        });
        let json = serde_json::to_string(&err).unwrap();
        let deserialized: StylizeError = serde_json::from_str(&json).unwrap();
        assert!(matches!(
            deserialized,
            StylizeError::Decode(DecodeError::BufferSize { actual: 3, .. })
        ));

        let err = StylizeError::InvalidOptions("bad value".to_string());
        let json = serde_json::to_string(&err).unwrap();
        let deserialized: StylizeError = serde_json::from_str(&json).unwrap();
        assert!(matches!(deserialized, StylizeError::InvalidOptions(ref s) if s == "bad value"));
    }

    #[test]
    fn error_serde_keeps_codec_direction() {
        let decode_err = crate::decode::decode(&[0xFF, 0x00]).unwrap_err();
        let err = StylizeError::from(decode_err);
        let json = serde_json::to_string(&err).unwrap();
        let deserialized: StylizeError = serde_json::from_str(&json).unwrap();
        assert!(matches!(
            deserialized,
            StylizeError::Decode(DecodeError::Image(_))
        ));

        let err = StylizeError::from(EncodeError::UnsupportedFormat("tiff".into()));
        let json = serde_json::to_string(&err).unwrap();
        let deserialized: StylizeError = serde_json::from_str(&json).unwrap();
        assert!(matches!(
            deserialized,
            StylizeError::Encode(EncodeError::UnsupportedFormat(ref s)) if s == "tiff"
        ));
    }
}
