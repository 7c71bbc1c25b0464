//! Output encoding and `data:` URL construction.
//!
//! Every supported format is lossless for 8-bit RGBA, so decoding the
//! encoded bytes yields the stylized buffer exactly.

use std::fmt;
use std::str::FromStr;

use base64::Engine as _;
use image::ImageEncoder;
use serde::{Deserialize, Serialize};

use crate::types::{EncodeError, RgbaImage};

/// Container format for the stylized image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Portable Network Graphics.
    #[default]
    Png,
    /// Windows bitmap (uncompressed, with alpha).
    Bmp,
    /// Lossless WebP.
    WebP,
}

impl OutputFormat {
    /// All supported formats.
    pub const ALL: [Self; 3] = [Self::Png, Self::Bmp, Self::WebP];

    /// MIME type, as used in `data:` URLs and `Blob`s.
    #[must_use]
    pub const fn mime(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Bmp => "image/bmp",
            Self::WebP => "image/webp",
        }
    }

    /// Conventional file extension (without the dot).
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Bmp => "bmp",
            Self::WebP => "webp",
        }
    }

    /// Look up a format by file extension, case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError::UnsupportedFormat`] for anything other
    /// than `png`, `bmp` or `webp`.
    pub fn from_extension(extension: &str) -> Result<Self, EncodeError> {
        let trimmed = extension.trim_start_matches('.');
        Self::ALL
            .into_iter()
            .find(|f| f.extension().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| EncodeError::UnsupportedFormat(extension.to_string()))
    }

    /// Look up a format by MIME type, case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError::UnsupportedFormat`] for unknown MIME types.
    pub fn from_mime(mime: &str) -> Result<Self, EncodeError> {
        Self::ALL
            .into_iter()
            .find(|f| f.mime().eq_ignore_ascii_case(mime.trim()))
            .ok_or_else(|| EncodeError::UnsupportedFormat(mime.to_string()))
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Accepts either an extension (`"png"`) or a MIME type (`"image/png"`).
impl FromStr for OutputFormat {
    type Err = EncodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.contains('/') {
            Self::from_mime(s)
        } else {
            Self::from_extension(s)
        }
    }
}

/// Serialize `image` in the given format.
///
/// # Errors
///
/// Returns [`EncodeError::Image`] if the encoder rejects the buffer.
pub fn encode(image: &RgbaImage, format: OutputFormat) -> Result<Vec<u8>, EncodeError> {
    let mut bytes = Vec::new();
    let (width, height) = image.dimensions();
    let color = image::ExtendedColorType::Rgba8;

    match format {
        OutputFormat::Png => image::codecs::png::PngEncoder::new(&mut bytes).write_image(
            image.as_raw(),
            width,
            height,
            color,
        )?,
        OutputFormat::Bmp => image::codecs::bmp::BmpEncoder::new(&mut bytes).write_image(
            image.as_raw(),
            width,
            height,
            color,
        )?,
        OutputFormat::WebP => image::codecs::webp::WebPEncoder::new_lossless(&mut bytes)
            .write_image(image.as_raw(), width, height, color)?,
    }

    tracing::debug!(%format, width, height, bytes = bytes.len(), "encoded output");
    Ok(bytes)
}

/// Wrap encoded bytes in a `data:<mime>;base64,<payload>` URL.
///
/// Uses the standard base64 alphabet with padding, the same form a
/// canvas produces from `toDataURL`.
#[must_use]
pub fn to_data_url(bytes: &[u8], format: OutputFormat) -> String {
    let payload = base64::engine::general_purpose::STANDARD.encode(bytes);
    format!("data:{};base64,{payload}", format.mime())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn gradient(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_fn(w, h, |x, y| {
            let r = u8::try_from(x * 255 / w.max(1)).unwrap();
            let g = u8::try_from(y * 255 / h.max(1)).unwrap();
            image::Rgba([r, g, r ^ g, 255 - r / 2])
        })
    }

    #[test]
    fn png_round_trip_is_exact() {
        let img = gradient(17, 9);
        let bytes = encode(&img, OutputFormat::Png).unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
        let decoded = image::load_from_memory(&bytes).unwrap().into_rgba8();
        assert_eq!(decoded, img);
    }

    #[test]
    fn webp_is_lossless() {
        let img = gradient(12, 12);
        let bytes = encode(&img, OutputFormat::WebP).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap().into_rgba8();
        assert_eq!(decoded, img);
    }

    #[test]
    fn bmp_has_magic_and_dimensions() {
        let img = gradient(5, 3);
        let bytes = encode(&img, OutputFormat::Bmp).unwrap();
        assert_eq!(&bytes[..2], b"BM");
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (5, 3));
    }

    #[test]
    fn data_url_prefix_and_payload() {
        let url = to_data_url(b"hello", OutputFormat::Png);
        assert_eq!(url, "data:image/png;base64,aGVsbG8=");
        let url = to_data_url(&[], OutputFormat::WebP);
        assert_eq!(url, "data:image/webp;base64,");
    }

    #[test]
    fn format_from_extension_and_mime() {
        assert_eq!(OutputFormat::from_extension("PNG").unwrap(), OutputFormat::Png);
        assert_eq!(OutputFormat::from_extension(".webp").unwrap(), OutputFormat::WebP);
        assert_eq!(OutputFormat::from_mime("image/bmp").unwrap(), OutputFormat::Bmp);
        assert_eq!("image/png".parse::<OutputFormat>().unwrap(), OutputFormat::Png);
        assert_eq!("bmp".parse::<OutputFormat>().unwrap(), OutputFormat::Bmp);
    }

    #[test]
    fn unsupported_format_is_rejected() {
        for name in ["gif", "image/jpeg", "", "tiff"] {
            assert!(
                matches!(
                    name.parse::<OutputFormat>(),
                    Err(EncodeError::UnsupportedFormat(ref s)) if s == name
                ),
                "{name:?} should be unsupported",
            );
        }
    }

    #[test]
    fn display_matches_extension() {
        for format in OutputFormat::ALL {
            assert_eq!(format.to_string(), format.extension());
            assert_eq!(OutputFormat::from_extension(&format.to_string()).unwrap(), format);
        }
    }
}
