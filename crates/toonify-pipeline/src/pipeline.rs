//! Incremental pipeline: advance stage-by-stage, inspecting each
//! intermediate result before continuing.
//!
//! Unlike [`crate::stylize_staged`] which runs the entire pipeline in one
//! call, [`Pipeline`] lets the caller drive execution one step at a time:
//!
//! ```rust
//! # use toonify_pipeline::{Pipeline, StylizeOptions, StylizeError};
//! # fn run(png: Vec<u8>) -> Result<(), StylizeError> {
//! let options = StylizeOptions::default();
//! let pipeline = Pipeline::new(png, options)
//!     .decode()?
//!     .resize()
//!     .smooth()
//!     .posterize()
//!     .enhance()
//!     .detect_edges()
//!     .encode()?;
//!
//! let staged = pipeline.into_result();
//! # Ok(())
//! # }
//! ```
//!
//! Each stage method consumes `self` and returns the next pipeline state
//! (or `Result` for fallible stages), carrying all previously computed
//! intermediates. Only two transitions can fail: [`Pending::decode`]
//! (option validation and decoding, before any pixel work) and
//! [`EdgesDetected::encode`] (after all pixel work).
//!
//! # Memory
//!
//! Every stage keeps its own copy of the raster it produced, so by
//! [`Encoded`] six RGBA buffers at working resolution (plus the source
//! and the edge mask) are alive. At the default 512 px bound that is
//! about 6 MB. Callers that only need the final image should prefer
//! [`crate::stylize`], which reuses a single working buffer.

use std::collections::HashSet;

use crate::diagnostics::StageMetrics;
use crate::encode::OutputFormat;
use crate::types::{
    Dimensions, GrayImage, RgbaImage, SourceImage, StagedResult, StylizeError, StylizeOptions,
    StylizedImage,
};

/// Options and output format carried through every stage.
#[derive(Debug, Clone)]
struct Settings {
    options: StylizeOptions,
    format: OutputFormat,
}

/// What the pipeline was started from.
enum Input {
    Bytes(Vec<u8>),
    Image(SourceImage),
}

fn dimensions_of(image: &RgbaImage) -> Dimensions {
    Dimensions {
        width: image.width(),
        height: image.height(),
    }
}

// ───────────────────────── Stage 0: Pending ──────────────────────────

/// Pipeline state before any processing has occurred.
///
/// The input and options are stored but not yet touched.
/// Call [`decode`](Self::decode) to advance to the next stage.
#[must_use = "pipeline stages are consumed by advancing; call .decode() to continue"]
pub struct Pending {
    settings: Settings,
    input: Input,
}

impl Pending {
    /// The raw source image bytes, or `None` when the pipeline was
    /// started from an already-decoded [`SourceImage`].
    #[must_use]
    pub fn source(&self) -> Option<&[u8]> {
        match &self.input {
            Input::Bytes(bytes) => Some(bytes),
            Input::Image(_) => None,
        }
    }

    /// The options this run will use.
    #[must_use]
    pub const fn options(&self) -> &StylizeOptions {
        &self.settings.options
    }

    /// Select the output container format (PNG unless changed).
    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.settings.format = format;
        self
    }

    /// Validate the options, decode the source and advance to the
    /// [`Decoded`] stage.
    ///
    /// # Errors
    ///
    /// Returns [`StylizeError::InvalidOptions`] if any option is out of
    /// range (checked first, so nothing is decoded for a bad request).
    /// Returns [`StylizeError::Decode`] if the bytes are empty, in an
    /// unrecognized format, or corrupt.
    pub fn decode(self) -> Result<Decoded, StylizeError> {
        self.settings.options.validate()?;
        let (original, source_len) = match self.input {
            Input::Bytes(bytes) => (crate::decode::decode(&bytes)?, Some(bytes.len())),
            Input::Image(image) => (image, None),
        };
        Ok(Decoded {
            settings: self.settings,
            original,
            source_len,
        })
    }
}

// ───────────────────────── Stage 1: Decoded ──────────────────────────

/// Pipeline state after decoding the source image.
///
/// Call [`resize`](Self::resize) to advance to the next stage.
#[must_use = "pipeline stages are consumed by advancing; call .resize() to continue"]
pub struct Decoded {
    settings: Settings,
    original: SourceImage,
    source_len: Option<usize>,
}

impl Decoded {
    /// The decoded source image.
    #[must_use]
    pub const fn original(&self) -> &RgbaImage {
        self.original.as_rgba()
    }

    /// Advance to the resize stage.
    pub fn resize(self) -> Resized {
        let options = &self.settings.options;
        let (resized, applied) = crate::resize::resize(
            self.original.as_rgba(),
            options.max_dimension,
            options.resize_filter,
        );
        Resized {
            settings: self.settings,
            original: self.original,
            resized,
            applied,
        }
    }

    pub(crate) fn stage_metrics(&self) -> StageMetrics {
        let dimensions = self.original.dimensions();
        StageMetrics::Decode {
            input_bytes: self.source_len,
            width: dimensions.width,
            height: dimensions.height,
            pixel_count: dimensions.pixel_count(),
        }
    }
}

// ───────────────────────── Stage 2: Resized ──────────────────────────

/// Pipeline state after downscaling to working resolution.
///
/// Call [`smooth`](Self::smooth) to advance to the next stage.
#[must_use = "pipeline stages are consumed by advancing; call .smooth() to continue"]
pub struct Resized {
    settings: Settings,
    original: SourceImage,
    resized: RgbaImage,
    applied: bool,
}

impl Resized {
    /// The working buffer at its final resolution.
    #[must_use]
    pub const fn resized(&self) -> &RgbaImage {
        &self.resized
    }

    /// Whether resampling was actually applied (the source was larger
    /// than `max_dimension`).
    #[must_use]
    pub const fn applied(&self) -> bool {
        self.applied
    }

    /// Working dimensions, shared by every later stage.
    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        dimensions_of(&self.resized)
    }

    /// Advance to the smoothing stage. A pass-through when
    /// `smoothing_sigma` is 0.
    pub fn smooth(self) -> Smoothed {
        let smoothed = crate::smooth::smooth(&self.resized, self.settings.options.smoothing_sigma);
        Smoothed {
            settings: self.settings,
            original: self.original,
            resized: self.resized,
            smoothed,
        }
    }

    pub(crate) fn stage_metrics(&self) -> StageMetrics {
        StageMetrics::Resize {
            original_width: self.original.width(),
            original_height: self.original.height(),
            width: self.resized.width(),
            height: self.resized.height(),
            max_dimension: self.settings.options.max_dimension,
            filter: self.settings.options.resize_filter.to_string(),
            applied: self.applied,
        }
    }
}

// ───────────────────────── Stage 3: Smoothed ─────────────────────────

/// Pipeline state after optional Gaussian pre-smoothing.
///
/// Call [`posterize`](Self::posterize) to advance to the next stage.
#[must_use = "pipeline stages are consumed by advancing; call .posterize() to continue"]
pub struct Smoothed {
    settings: Settings,
    original: SourceImage,
    resized: RgbaImage,
    smoothed: RgbaImage,
}

impl Smoothed {
    /// The smoothed working buffer.
    #[must_use]
    pub const fn smoothed(&self) -> &RgbaImage {
        &self.smoothed
    }

    /// Advance to the posterization stage.
    pub fn posterize(self) -> Posterized {
        let mut posterized = self.smoothed.clone();
        crate::posterize::posterize(&mut posterized, self.settings.options.levels);
        Posterized {
            settings: self.settings,
            original: self.original,
            resized: self.resized,
            smoothed: self.smoothed,
            posterized,
        }
    }

    pub(crate) fn stage_metrics(&self) -> StageMetrics {
        let sigma = self.settings.options.smoothing_sigma;
        StageMetrics::Smooth {
            sigma,
            applied: sigma > 0.0,
        }
    }
}

// ───────────────────────── Stage 4: Posterized ───────────────────────

/// Pipeline state after colour quantization.
///
/// Call [`enhance`](Self::enhance) to advance to the next stage.
#[must_use = "pipeline stages are consumed by advancing; call .enhance() to continue"]
pub struct Posterized {
    settings: Settings,
    original: SourceImage,
    resized: RgbaImage,
    smoothed: RgbaImage,
    posterized: RgbaImage,
}

impl Posterized {
    /// The posterized working buffer.
    #[must_use]
    pub const fn posterized(&self) -> &RgbaImage {
        &self.posterized
    }

    /// Advance to the enhancement stage.
    pub fn enhance(self) -> Enhanced {
        let options = &self.settings.options;
        let mut enhanced = self.posterized.clone();
        crate::enhance::enhance(
            &mut enhanced,
            options.contrast_factor,
            options.saturation_factor,
        );
        Enhanced {
            settings: self.settings,
            original: self.original,
            resized: self.resized,
            smoothed: self.smoothed,
            posterized: self.posterized,
            enhanced,
        }
    }

    pub(crate) fn stage_metrics(&self) -> StageMetrics {
        let levels = self.settings.options.levels;
        let palette: HashSet<[u8; 3]> = self
            .posterized
            .pixels()
            .map(|p| [p.0[0], p.0[1], p.0[2]])
            .collect();
        StageMetrics::Posterize {
            levels,
            step: crate::posterize::quantize_step(levels),
            distinct_colors: palette.len(),
        }
    }
}

// ───────────────────────── Stage 5: Enhanced ─────────────────────────

/// Pipeline state after contrast and saturation enhancement.
///
/// Call [`detect_edges`](Self::detect_edges) to advance to the next
/// stage.
#[must_use = "pipeline stages are consumed by advancing; call .detect_edges() to continue"]
pub struct Enhanced {
    settings: Settings,
    original: SourceImage,
    resized: RgbaImage,
    smoothed: RgbaImage,
    posterized: RgbaImage,
    enhanced: RgbaImage,
}

impl Enhanced {
    /// The enhanced working buffer.
    #[must_use]
    pub const fn enhanced(&self) -> &RgbaImage {
        &self.enhanced
    }

    /// Advance to the edge detection stage.
    ///
    /// Sobel reads only the enhanced buffer; darkened pixels are
    /// written into a separate edge buffer.
    pub fn detect_edges(self) -> EdgesDetected {
        let options = &self.settings.options;
        let (stylized, edges) = crate::edge::detect_and_darken(
            &self.enhanced,
            options.edge_threshold,
            options.edge_darkening,
        );
        EdgesDetected {
            settings: self.settings,
            original: self.original,
            resized: self.resized,
            smoothed: self.smoothed,
            posterized: self.posterized,
            enhanced: self.enhanced,
            edges,
            stylized,
        }
    }

    pub(crate) fn stage_metrics(&self) -> StageMetrics {
        StageMetrics::Enhance {
            contrast_factor: self.settings.options.contrast_factor,
            saturation_factor: self.settings.options.saturation_factor,
        }
    }
}

// ───────────────────────── Stage 6: EdgesDetected ────────────────────

/// Pipeline state after edge detection and darkening.
///
/// Call [`encode`](Self::encode) to advance to the final stage. This
/// is a fallible step.
#[must_use = "pipeline stages are consumed by advancing; call .encode() to continue"]
pub struct EdgesDetected {
    settings: Settings,
    original: SourceImage,
    resized: RgbaImage,
    smoothed: RgbaImage,
    posterized: RgbaImage,
    enhanced: RgbaImage,
    edges: GrayImage,
    stylized: RgbaImage,
}

impl EdgesDetected {
    /// The binary edge mask.
    #[must_use]
    pub const fn edges(&self) -> &GrayImage {
        &self.edges
    }

    /// The final stylized pixels (the edge buffer).
    #[must_use]
    pub const fn stylized(&self) -> &RgbaImage {
        &self.stylized
    }

    /// Encode the stylized image and advance to the [`Encoded`] stage.
    ///
    /// # Errors
    ///
    /// Returns [`StylizeError::Encode`] if the encoder fails.
    pub fn encode(self) -> Result<Encoded, StylizeError> {
        let format = self.settings.format;
        let encoded = crate::encode::encode(&self.stylized, format)?;
        Ok(Encoded {
            original: self.original,
            resized: self.resized,
            smoothed: self.smoothed,
            posterized: self.posterized,
            enhanced: self.enhanced,
            edges: self.edges,
            output: StylizedImage {
                image: self.stylized,
                encoded,
                format,
            },
        })
    }

    pub(crate) fn stage_metrics(&self) -> StageMetrics {
        StageMetrics::EdgeDetection {
            threshold: self.settings.options.edge_threshold,
            darkening: self.settings.options.edge_darkening,
            edge_pixel_count: crate::edge::count_edge_pixels(&self.edges),
            total_pixel_count: dimensions_of(&self.stylized).pixel_count(),
        }
    }
}

// ───────────────────────── Stage 7: Encoded ──────────────────────────

/// Pipeline state after encoding: the final stage.
///
/// Call [`into_result`](Self::into_result) to extract the
/// [`StagedResult`] containing all intermediates.
#[must_use = "call .into_result() to extract the StagedResult"]
pub struct Encoded {
    original: SourceImage,
    resized: RgbaImage,
    smoothed: RgbaImage,
    posterized: RgbaImage,
    enhanced: RgbaImage,
    edges: GrayImage,
    output: StylizedImage,
}

impl Encoded {
    /// The stylized image and its encoding.
    #[must_use]
    pub const fn stylized(&self) -> &StylizedImage {
        &self.output
    }

    /// Output dimensions.
    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        self.output.dimensions()
    }

    /// Consume the pipeline and return the full [`StagedResult`].
    #[must_use]
    pub fn into_result(self) -> StagedResult {
        StagedResult {
            original: self.original.into_rgba(),
            resized: self.resized,
            smoothed: self.smoothed,
            posterized: self.posterized,
            enhanced: self.enhanced,
            edges: self.edges,
            output: self.output,
        }
    }

    /// Consume the pipeline and keep only the final image.
    #[must_use]
    pub fn into_output(self) -> StylizedImage {
        self.output
    }

    pub(crate) fn stage_metrics(&self) -> StageMetrics {
        StageMetrics::Encode {
            format: self.output.format.to_string(),
            output_bytes: self.output.encoded.len(),
        }
    }
}

// ──────────────────── PipelineStage trait + Stage enum ────────────────

/// Total number of stages in the pipeline.
pub const STAGE_COUNT: usize = 8;

/// The output produced by a single pipeline stage.
///
/// Each variant borrows the data that the corresponding stage computed.
#[must_use]
pub enum StageOutput<'a> {
    /// Source bytes (not yet decoded), or `None` for a pipeline started
    /// from a decoded image.
    Source {
        /// The raw image bytes.
        bytes: Option<&'a [u8]>,
    },
    /// Decoded RGBA image.
    Decoded {
        /// The original image.
        original: &'a RgbaImage,
    },
    /// Working buffer at working resolution.
    Resized {
        /// The resized image.
        resized: &'a RgbaImage,
    },
    /// Smoothing result.
    Smoothed {
        /// The smoothed image.
        smoothed: &'a RgbaImage,
    },
    /// Posterization result.
    Posterized {
        /// The posterized image.
        posterized: &'a RgbaImage,
    },
    /// Enhancement result.
    Enhanced {
        /// The enhanced image.
        enhanced: &'a RgbaImage,
    },
    /// Edge detection result.
    EdgesDetected {
        /// The binary edge mask.
        edges: &'a GrayImage,
        /// The darkened edge buffer.
        stylized: &'a RgbaImage,
    },
    /// Encoding result.
    Encoded {
        /// The final image and its bytes.
        output: &'a StylizedImage,
    },
}

/// Trait implemented by every pipeline stage, enabling uniform iteration.
///
/// Each stage struct implements it, and [`Stage`] delegates to whichever
/// variant it holds.
///
/// # Loop pattern
///
/// ```rust
/// # use toonify_pipeline::{Pipeline, StylizeOptions, StylizeError};
/// # use toonify_pipeline::pipeline::{Stage, PipelineStage, Advance};
/// # fn run(png: Vec<u8>) -> Result<(), StylizeError> {
/// let mut stage: Stage = Pipeline::new(png, StylizeOptions::default()).into();
/// loop {
///     match stage.advance()? {
///         Advance::Next(next) => stage = next,
///         Advance::Complete(done) => { stage = done; break; }
///     }
/// }
/// let result = stage.complete()?;
/// # Ok(())
/// # }
/// ```
pub trait PipelineStage: Sized {
    /// Human-readable name of this stage (e.g. `"source"`, `"posterize"`).
    const NAME: &str;

    /// Zero-based index of this stage (`0` for Pending through `7` for
    /// Encoded).
    const INDEX: usize;

    /// The output this stage produced.
    fn output(&self) -> StageOutput<'_>;

    /// Stage-specific metrics for diagnostics.
    ///
    /// Returns `None` for the initial [`Pending`] stage which has not
    /// yet performed any processing.
    fn metrics(&self) -> Option<StageMetrics>;

    /// Advance to the next stage.
    ///
    /// Returns `Ok(Some(stage))` on success, `Ok(None)` if already at
    /// the final stage, or `Err` if the stage transition fails.
    ///
    /// # Errors
    ///
    /// Returns [`StylizeError::InvalidOptions`] or
    /// [`StylizeError::Decode`] when leaving [`Pending`], and
    /// [`StylizeError::Encode`] when leaving [`EdgesDetected`].
    fn next(self) -> Result<Option<Stage>, StylizeError>;

    /// Run all remaining stages to completion and return the final
    /// [`StagedResult`].
    ///
    /// # Errors
    ///
    /// Returns [`StylizeError`] if any remaining fallible stage fails.
    fn complete(self) -> Result<StagedResult, StylizeError>;
}

impl PipelineStage for Pending {
    const NAME: &str = "source";
    const INDEX: usize = 0;

    fn output(&self) -> StageOutput<'_> {
        StageOutput::Source {
            bytes: self.source(),
        }
    }

    fn metrics(&self) -> Option<StageMetrics> {
        None
    }

    fn next(self) -> Result<Option<Stage>, StylizeError> {
        Ok(Some(Stage::Decoded(self.decode()?)))
    }

    fn complete(self) -> Result<StagedResult, StylizeError> {
        self.decode()?.complete()
    }
}

impl PipelineStage for Decoded {
    const NAME: &str = "decode";
    const INDEX: usize = 1;

    fn output(&self) -> StageOutput<'_> {
        StageOutput::Decoded {
            original: self.original.as_rgba(),
        }
    }

    fn metrics(&self) -> Option<StageMetrics> {
        Some(self.stage_metrics())
    }

    fn next(self) -> Result<Option<Stage>, StylizeError> {
        Ok(Some(Stage::Resized(self.resize())))
    }

    fn complete(self) -> Result<StagedResult, StylizeError> {
        self.resize().complete()
    }
}

impl PipelineStage for Resized {
    const NAME: &str = "resize";
    const INDEX: usize = 2;

    fn output(&self) -> StageOutput<'_> {
        StageOutput::Resized {
            resized: &self.resized,
        }
    }

    fn metrics(&self) -> Option<StageMetrics> {
        Some(self.stage_metrics())
    }

    fn next(self) -> Result<Option<Stage>, StylizeError> {
        Ok(Some(Stage::Smoothed(self.smooth())))
    }

    fn complete(self) -> Result<StagedResult, StylizeError> {
        self.smooth().complete()
    }
}

impl PipelineStage for Smoothed {
    const NAME: &str = "smooth";
    const INDEX: usize = 3;

    fn output(&self) -> StageOutput<'_> {
        StageOutput::Smoothed {
            smoothed: &self.smoothed,
        }
    }

    fn metrics(&self) -> Option<StageMetrics> {
        Some(self.stage_metrics())
    }

    fn next(self) -> Result<Option<Stage>, StylizeError> {
        Ok(Some(Stage::Posterized(self.posterize())))
    }

    fn complete(self) -> Result<StagedResult, StylizeError> {
        self.posterize().complete()
    }
}

impl PipelineStage for Posterized {
    const NAME: &str = "posterize";
    const INDEX: usize = 4;

    fn output(&self) -> StageOutput<'_> {
        StageOutput::Posterized {
            posterized: &self.posterized,
        }
    }

    fn metrics(&self) -> Option<StageMetrics> {
        Some(self.stage_metrics())
    }

    fn next(self) -> Result<Option<Stage>, StylizeError> {
        Ok(Some(Stage::Enhanced(self.enhance())))
    }

    fn complete(self) -> Result<StagedResult, StylizeError> {
        self.enhance().complete()
    }
}

impl PipelineStage for Enhanced {
    const NAME: &str = "enhance";
    const INDEX: usize = 5;

    fn output(&self) -> StageOutput<'_> {
        StageOutput::Enhanced {
            enhanced: &self.enhanced,
        }
    }

    fn metrics(&self) -> Option<StageMetrics> {
        Some(self.stage_metrics())
    }

    fn next(self) -> Result<Option<Stage>, StylizeError> {
        Ok(Some(Stage::EdgesDetected(self.detect_edges())))
    }

    fn complete(self) -> Result<StagedResult, StylizeError> {
        self.detect_edges().complete()
    }
}

impl PipelineStage for EdgesDetected {
    const NAME: &str = "edges";
    const INDEX: usize = 6;

    fn output(&self) -> StageOutput<'_> {
        StageOutput::EdgesDetected {
            edges: &self.edges,
            stylized: &self.stylized,
        }
    }

    fn metrics(&self) -> Option<StageMetrics> {
        Some(self.stage_metrics())
    }

    fn next(self) -> Result<Option<Stage>, StylizeError> {
        Ok(Some(Stage::Encoded(self.encode()?)))
    }

    fn complete(self) -> Result<StagedResult, StylizeError> {
        Ok(self.encode()?.into_result())
    }
}

impl PipelineStage for Encoded {
    const NAME: &str = "encode";
    const INDEX: usize = 7;

    fn output(&self) -> StageOutput<'_> {
        StageOutput::Encoded {
            output: &self.output,
        }
    }

    fn metrics(&self) -> Option<StageMetrics> {
        Some(self.stage_metrics())
    }

    fn next(self) -> Result<Option<Stage>, StylizeError> {
        Ok(None)
    }

    fn complete(self) -> Result<StagedResult, StylizeError> {
        Ok(self.into_result())
    }
}

/// Enum wrapping all pipeline stages for uniform, loopable access.
///
/// Use [`From`] conversions to enter the dynamic API from any typed
/// stage, then call [`advance`](Self::advance) in a loop.
#[must_use]
pub enum Stage {
    /// See [`Pending`].
    Pending(Pending),
    /// See [`Decoded`].
    Decoded(Decoded),
    /// See [`Resized`].
    Resized(Resized),
    /// See [`Smoothed`].
    Smoothed(Smoothed),
    /// See [`Posterized`].
    Posterized(Posterized),
    /// See [`Enhanced`].
    Enhanced(Enhanced),
    /// See [`EdgesDetected`].
    EdgesDetected(EdgesDetected),
    /// See [`Encoded`].
    Encoded(Encoded),
}

/// Compile-time guard: adding a [`Stage`] variant makes this match
/// non-exhaustive, so [`STAGE_COUNT`] gets revisited.
#[allow(dead_code, clippy::match_same_arms)]
const fn _stage_count_guard(s: &Stage) {
    match s {
        Stage::Pending(_)
        | Stage::Decoded(_)
        | Stage::Resized(_)
        | Stage::Smoothed(_)
        | Stage::Posterized(_)
        | Stage::Enhanced(_)
        | Stage::EdgesDetected(_)
        | Stage::Encoded(_) => {}
    }
}

/// Result of [`Stage::advance`]: either the next stage or the
/// completed final stage returned unchanged.
#[must_use]
pub enum Advance {
    /// The pipeline advanced to this next stage.
    Next(Stage),
    /// The pipeline was already at the final stage.
    Complete(Stage),
}

/// Delegate a method call to whichever `Stage` variant is active.
macro_rules! delegate {
    ($self:ident, $method:ident $(, $arg:expr)*) => {
        match $self {
            Self::Pending(s) => s.$method($($arg),*),
            Self::Decoded(s) => s.$method($($arg),*),
            Self::Resized(s) => s.$method($($arg),*),
            Self::Smoothed(s) => s.$method($($arg),*),
            Self::Posterized(s) => s.$method($($arg),*),
            Self::Enhanced(s) => s.$method($($arg),*),
            Self::EdgesDetected(s) => s.$method($($arg),*),
            Self::Encoded(s) => s.$method($($arg),*),
        }
    };
}

impl Stage {
    /// Human-readable name of the current stage.
    #[must_use]
    pub fn name(&self) -> &'static str {
        delegate!(self, name)
    }

    /// Zero-based index of the current stage.
    #[must_use]
    pub fn index(&self) -> usize {
        delegate!(self, index)
    }

    /// The output this stage produced.
    pub fn output(&self) -> StageOutput<'_> {
        delegate!(self, output)
    }

    /// Stage-specific metrics for diagnostics. `None` for `Pending`.
    #[must_use]
    pub fn metrics(&self) -> Option<StageMetrics> {
        delegate!(self, metrics)
    }

    /// Whether the pipeline is at the final stage.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        matches!(self, Self::Encoded(_))
    }

    /// Advance to the next stage.
    ///
    /// Returns `Ok(Some(next_stage))` on success, `Ok(None)` if
    /// already complete (the `Encoded` value is consumed), or `Err` if
    /// the transition fails.
    ///
    /// # Errors
    ///
    /// Returns [`StylizeError`] if a fallible stage transition fails.
    pub fn next(self) -> Result<Option<Self>, StylizeError> {
        delegate!(self, next)
    }

    /// Advance to the next stage, returning `self` unchanged if
    /// already complete.
    ///
    /// This is the loop-friendly version of [`next`](Self::next): the
    /// final stage comes back as [`Advance::Complete`] so
    /// [`complete`](Self::complete) can still be called on it.
    ///
    /// # Errors
    ///
    /// Returns [`StylizeError`] if a fallible stage transition fails.
    pub fn advance(self) -> Result<Advance, StylizeError> {
        if self.is_complete() {
            return Ok(Advance::Complete(self));
        }
        // Non-complete stages always return Ok(Some(_)) from next().
        #[allow(clippy::unreachable)]
        let next = self
            .next()?
            .unwrap_or_else(|| unreachable!("non-complete stage returned None from next()"));
        Ok(Advance::Next(next))
    }

    /// Run all remaining stages to completion.
    ///
    /// # Errors
    ///
    /// Returns [`StylizeError`] if any remaining fallible stage fails.
    pub fn complete(self) -> Result<StagedResult, StylizeError> {
        delegate!(self, complete)
    }
}

// Lets the macro call `.name()` and `.index()` on `&self`; associated
// constants aren't reachable as `self.NAME`.
trait StageMetadata {
    fn name(&self) -> &'static str;
    fn index(&self) -> usize;
}

impl<T: PipelineStage> StageMetadata for T {
    fn name(&self) -> &'static str {
        T::NAME
    }

    fn index(&self) -> usize {
        T::INDEX
    }
}

impl From<Pending> for Stage {
    fn from(s: Pending) -> Self {
        Self::Pending(s)
    }
}

impl From<Decoded> for Stage {
    fn from(s: Decoded) -> Self {
        Self::Decoded(s)
    }
}

impl From<Resized> for Stage {
    fn from(s: Resized) -> Self {
        Self::Resized(s)
    }
}

impl From<Smoothed> for Stage {
    fn from(s: Smoothed) -> Self {
        Self::Smoothed(s)
    }
}

impl From<Posterized> for Stage {
    fn from(s: Posterized) -> Self {
        Self::Posterized(s)
    }
}

impl From<Enhanced> for Stage {
    fn from(s: Enhanced) -> Self {
        Self::Enhanced(s)
    }
}

impl From<EdgesDetected> for Stage {
    fn from(s: EdgesDetected) -> Self {
        Self::EdgesDetected(s)
    }
}

impl From<Encoded> for Stage {
    fn from(s: Encoded) -> Self {
        Self::Encoded(s)
    }
}

// ───────────────────── Pipeline entry point ──────────────────────────

/// Incremental stylization pipeline.
///
/// Created via [`Pipeline::new`] (compressed bytes) or
/// [`Pipeline::from_source`] (already-decoded pixels), which store the
/// input and options without doing any processing:
///
/// ```rust
/// # use toonify_pipeline::{Pipeline, StylizeOptions, StylizeError};
/// # fn run(png: Vec<u8>) -> Result<(), StylizeError> {
/// let result = Pipeline::new(png, StylizeOptions::default())
///     .decode()?
///     .resize()
///     .smooth()
///     .posterize()
///     .enhance()
///     .detect_edges()
///     .encode()?
///     .into_result();
/// # Ok(())
/// # }
/// ```
///
/// Each stage method consumes the current state and returns the next,
/// making it a compile-time error to skip stages or call them out of
/// order.
pub struct Pipeline;

impl Pipeline {
    /// Create a new pipeline from compressed image bytes.
    ///
    /// No processing is performed. The output format defaults to PNG;
    /// see [`Pending::with_format`].
    #[allow(clippy::new_ret_no_self)]
    pub fn new(image_bytes: Vec<u8>, options: StylizeOptions) -> Pending {
        Pending {
            settings: Settings {
                options,
                format: OutputFormat::default(),
            },
            input: Input::Bytes(image_bytes),
        }
    }

    /// Create a new pipeline from an already-decoded image.
    ///
    /// The decode stage then only validates the options.
    pub fn from_source(image: SourceImage, options: StylizeOptions) -> Pending {
        Pending {
            settings: Settings {
                options,
                format: OutputFormat::default(),
            },
            input: Input::Image(image),
        }
    }
}
