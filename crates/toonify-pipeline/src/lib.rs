//! toonify-pipeline: Pure cartoon stylization pipeline (sans-IO).
//!
//! Turns a photo into a flat-shaded, outlined "cartoon" avatar through:
//! decode -> resize -> optional smoothing -> posterize -> enhance ->
//! edge darkening -> encode.
//!
//! This crate has **no I/O dependencies**: it operates on in-memory
//! byte slices and pixel buffers and returns structured data. The
//! command-line host lives in `toonify-cli` and the browser host in
//! `toonify-worker`.
//!
//! Every call owns its buffers and touches no global state, so the
//! same options and input always produce byte-identical output and
//! independent calls may run on different threads.

pub mod decode;
pub mod diagnostics;
pub mod edge;
pub mod encode;
pub mod enhance;
pub mod pipeline;
pub mod posterize;
pub mod resize;
pub mod smooth;
pub mod types;

pub use decode::decode;
pub use encode::{OutputFormat, to_data_url};
pub use pipeline::Pipeline;
pub use resize::ResizeFilter;
use pipeline::PipelineStage as _;
pub use types::{
    DecodeError, Dimensions, EncodeError, GrayImage, RgbaImage, SourceImage, StagedResult,
    StylizeError, StylizeOptions, StylizedImage,
};

/// Stylize a decoded image and encode the result as PNG.
///
/// # Pipeline steps
///
/// 1. Validate options
/// 2. Proportional downscale to `max_dimension`
/// 3. Optional Gaussian smoothing
/// 4. Posterize to `levels` bands per channel
/// 5. Contrast then saturation enhancement
/// 6. Sobel edge detection (red channel) and edge darkening
/// 7. Encode
///
/// # Errors
///
/// Returns [`StylizeError::InvalidOptions`] for out-of-range options
/// (before any pixel work) and [`StylizeError::Encode`] if encoding
/// fails.
pub fn stylize(
    source: &SourceImage,
    options: &StylizeOptions,
) -> Result<StylizedImage, StylizeError> {
    stylize_with_format(source, options, OutputFormat::Png)
}

/// Like [`stylize`], encoding to the given container format.
///
/// # Errors
///
/// See [`stylize`].
pub fn stylize_with_format(
    source: &SourceImage,
    options: &StylizeOptions,
    format: OutputFormat,
) -> Result<StylizedImage, StylizeError> {
    options.validate()?;
    render(source.as_rgba(), options, format)
}

/// Decode compressed image bytes (PNG, JPEG, GIF, BMP, WebP) and stylize
/// them.
///
/// # Errors
///
/// Returns [`StylizeError::InvalidOptions`] for out-of-range options,
/// [`StylizeError::Decode`] for empty, unrecognized or corrupt input,
/// and [`StylizeError::Encode`] if encoding fails. Options are checked
/// before the bytes are decoded.
pub fn stylize_bytes(
    image_bytes: &[u8],
    options: &StylizeOptions,
    format: OutputFormat,
) -> Result<StylizedImage, StylizeError> {
    options.validate()?;
    let source = decode::decode(image_bytes)?;
    render(source.as_rgba(), options, format)
}

/// Run the full pipeline and keep every intermediate raster.
///
/// Produces the same final image as [`stylize_bytes`], plus the
/// resized, smoothed, posterized and enhanced buffers and the edge
/// mask.
///
/// # Errors
///
/// See [`stylize_bytes`].
pub fn stylize_staged(
    image_bytes: &[u8],
    options: &StylizeOptions,
    format: OutputFormat,
) -> Result<StagedResult, StylizeError> {
    Pipeline::new(image_bytes.to_vec(), options.clone())
        .with_format(format)
        .complete()
}

/// Steps 2-7 on a validated configuration, reusing one working buffer.
fn render(
    source: &RgbaImage,
    options: &StylizeOptions,
    format: OutputFormat,
) -> Result<StylizedImage, StylizeError> {
    // 2. Downscale.
    let (working, _) = resize::resize(source, options.max_dimension, options.resize_filter);

    // 3. Optional smoothing.
    let mut working = if options.smoothing_sigma > 0.0 {
        smooth::smooth(&working, options.smoothing_sigma)
    } else {
        working
    };

    // 4. Posterize in place.
    posterize::posterize(&mut working, options.levels);

    // 5. Enhance in place.
    enhance::enhance(
        &mut working,
        options.contrast_factor,
        options.saturation_factor,
    );

    // 6. Edges: Sobel reads `working`, darkening goes to a new buffer.
    let (image, _mask) =
        edge::detect_and_darken(&working, options.edge_threshold, options.edge_darkening);

    // 7. Encode.
    let encoded = encode::encode(&image, format)?;

    tracing::debug!(
        width = image.width(),
        height = image.height(),
        %format,
        bytes = encoded.len(),
        "stylized image"
    );
    Ok(StylizedImage {
        image,
        encoded,
        format,
    })
}
