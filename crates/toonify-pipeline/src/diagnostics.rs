//! Pipeline diagnostics: timing, counts, and other metrics for each stage.
//!
//! These diagnostics are permanent instrumentation for tuning the
//! stylization parameters. [`stylize_with_diagnostics`] runs the
//! incremental [`Pipeline`] and records each stage's wall-clock time
//! and [`StageMetrics`] alongside the full [`StagedResult`].
//!
//! Timestamps come from the `web-time` crate, which uses
//! `performance.now()` on WASM and `std::time::Instant` on native, so
//! the same code runs inside the browser worker.
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use web_time::Instant;

use crate::encode::OutputFormat;
use crate::pipeline::Pipeline;
use crate::types::{StagedResult, StylizeError, StylizeOptions};

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a `Duration` as fractional seconds (`f64`).
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    /// Deserialize a `Duration` from fractional seconds (`f64`).
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Diagnostics collected from a single pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineDiagnostics {
    /// Stage 1: option validation and image decoding.
    pub decode: StageDiagnostics,
    /// Stage 2: proportional downscale.
    pub resize: StageDiagnostics,
    /// Stage 3: Gaussian pre-smoothing (a pass-through when disabled).
    pub smooth: StageDiagnostics,
    /// Stage 4: colour quantization.
    pub posterize: StageDiagnostics,
    /// Stage 5: contrast and saturation.
    pub enhance: StageDiagnostics,
    /// Stage 6: Sobel edge detection and darkening.
    pub edge_detection: StageDiagnostics,
    /// Stage 7: output encoding.
    pub encode: StageDiagnostics,
    /// Total wall-clock duration of the entire pipeline (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Summary counts across all stages.
    pub summary: PipelineSummary,
}

/// Diagnostics for a single pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Wall-clock duration of this stage (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Stage-specific metrics.
    pub metrics: StageMetrics,
}

/// Stage-specific metrics that vary by pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StageMetrics {
    /// Image decoding metrics.
    Decode {
        /// Size of the compressed input, or `None` when the pipeline was
        /// started from decoded pixels.
        input_bytes: Option<usize>,
        /// Decoded image width in pixels.
        width: u32,
        /// Decoded image height in pixels.
        height: u32,
        /// Total pixel count (`width * height`).
        pixel_count: u64,
    },
    /// Resize metrics.
    Resize {
        /// Source width.
        original_width: u32,
        /// Source height.
        original_height: u32,
        /// Working width.
        width: u32,
        /// Working height.
        height: u32,
        /// Configured bound on the longer side.
        max_dimension: u32,
        /// Resampling filter name.
        filter: String,
        /// Whether resampling actually happened.
        applied: bool,
    },
    /// Smoothing metrics.
    Smooth {
        /// Gaussian sigma.
        sigma: f32,
        /// Whether a blur was actually applied.
        applied: bool,
    },
    /// Posterization metrics.
    Posterize {
        /// Configured level count.
        levels: u32,
        /// Band width derived from `levels`.
        step: u16,
        /// Number of distinct RGB colours after quantization.
        distinct_colors: usize,
    },
    /// Enhancement metrics.
    Enhance {
        /// Contrast multiplier.
        contrast_factor: f32,
        /// Saturation multiplier.
        saturation_factor: f32,
    },
    /// Edge detection metrics.
    EdgeDetection {
        /// Sobel magnitude threshold.
        threshold: f32,
        /// Amount subtracted from edge pixels.
        darkening: u8,
        /// Number of darkened pixels.
        edge_pixel_count: u64,
        /// Total pixel count for computing edge density.
        total_pixel_count: u64,
    },
    /// Encoding metrics.
    Encode {
        /// Output container format.
        format: String,
        /// Encoded size in bytes.
        output_bytes: usize,
    },
}

/// High-level summary counts for the entire pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSummary {
    /// Source image width in pixels.
    pub source_width: u32,
    /// Source image height in pixels.
    pub source_height: u32,
    /// Output width in pixels.
    pub output_width: u32,
    /// Output height in pixels.
    pub output_height: u32,
    /// Darkened edge pixels in the output.
    pub edge_pixel_count: u64,
    /// Encoded output size in bytes.
    pub output_bytes: usize,
}

/// Run the full pipeline on compressed image bytes, timing every stage.
///
/// # Errors
///
/// Returns the same errors as [`crate::stylize_bytes`].
pub fn stylize_with_diagnostics(
    image_bytes: &[u8],
    options: &StylizeOptions,
    format: OutputFormat,
) -> Result<(StagedResult, PipelineDiagnostics), StylizeError> {
    let pipeline_start = Instant::now();
    let pending = Pipeline::new(image_bytes.to_vec(), options.clone()).with_format(format);

    let start = Instant::now();
    let decoded = pending.decode()?;
    let decode = measured(start, || decoded.stage_metrics());

    let start = Instant::now();
    let resized = decoded.resize();
    let resize = measured(start, || resized.stage_metrics());

    let start = Instant::now();
    let smoothed = resized.smooth();
    let smooth = measured(start, || smoothed.stage_metrics());

    let start = Instant::now();
    let posterized = smoothed.posterize();
    let posterize = measured(start, || posterized.stage_metrics());

    let start = Instant::now();
    let enhanced = posterized.enhance();
    let enhance = measured(start, || enhanced.stage_metrics());

    let start = Instant::now();
    let edges = enhanced.detect_edges();
    let edge_detection = measured(start, || edges.stage_metrics());

    let start = Instant::now();
    let encoded = edges.encode()?;
    let encode = measured(start, || encoded.stage_metrics());

    let total_duration = pipeline_start.elapsed();
    let staged = encoded.into_result();

    let output = staged.dimensions();
    let summary = PipelineSummary {
        source_width: staged.original.width(),
        source_height: staged.original.height(),
        output_width: output.width,
        output_height: output.height,
        edge_pixel_count: crate::edge::count_edge_pixels(&staged.edges),
        output_bytes: staged.output.encoded.len(),
    };

    tracing::debug!(
        total_ms = duration_ms(total_duration),
        edge_pixels = summary.edge_pixel_count,
        "pipeline finished"
    );

    let diagnostics = PipelineDiagnostics {
        decode,
        resize,
        smooth,
        posterize,
        enhance,
        edge_detection,
        encode,
        total_duration,
        summary,
    };
    Ok((staged, diagnostics))
}

/// Stop the clock started at `start`, then collect the stage metrics.
///
/// Metric computation (e.g. counting distinct colours) is not billed to
/// the stage.
fn measured(start: Instant, metrics: impl FnOnce() -> StageMetrics) -> StageDiagnostics {
    let duration = start.elapsed();
    StageDiagnostics {
        duration,
        metrics: metrics(),
    }
}

impl PipelineDiagnostics {
    /// Stages in pipeline order with display names.
    #[must_use]
    pub fn stages(&self) -> [(&'static str, &StageDiagnostics); 7] {
        [
            ("Decode", &self.decode),
            ("Resize", &self.resize),
            ("Smooth", &self.smooth),
            ("Posterize", &self.posterize),
            ("Enhance", &self.enhance),
            ("Edge Detection", &self.edge_detection),
            ("Encode", &self.encode),
        ]
    }

    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Pipeline Diagnostics Report\n{}", "=".repeat(60)));
        lines.push(format!(
            "Source: {}x{}  ->  Output: {}x{}",
            self.summary.source_width,
            self.summary.source_height,
            self.summary.output_width,
            self.summary.output_height,
        ));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<24} {:>10} {:>10}  {}",
            "Stage", "Duration", "% Total", "Details"
        ));
        lines.push("-".repeat(80));

        let total_ms = duration_ms(self.total_duration);

        for (name, diag) in self.stages() {
            let ms = duration_ms(diag.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            let details = format_metrics(&diag.metrics);
            lines.push(format!("{name:<24} {ms:>8.3}ms {pct:>9.1}%  {details}"));
        }

        lines.push(String::new());
        lines.push(format!(
            "Edge pixels: {}  |  Output bytes: {}",
            self.summary.edge_pixel_count, self.summary.output_bytes,
        ));

        lines.join("\n")
    }
}

/// Convert a `Duration` to milliseconds as `f64`.
#[must_use]
pub fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Format stage metrics into a compact detail string.
fn format_metrics(metrics: &StageMetrics) -> String {
    match metrics {
        StageMetrics::Decode {
            input_bytes,
            width,
            height,
            ..
        } => match input_bytes {
            Some(bytes) => format!("{bytes} bytes -> {width}x{height}"),
            None => format!("raw {width}x{height}"),
        },
        StageMetrics::Resize {
            original_width,
            original_height,
            width,
            height,
            max_dimension,
            filter,
            applied,
        } => {
            if *applied {
                format!(
                    "{original_width}x{original_height} -> {width}x{height} (max={max_dimension}, {filter})"
                )
            } else {
                format!("{width}x{height} (within max={max_dimension}, skipped)")
            }
        }
        StageMetrics::Smooth { sigma, applied } => {
            if *applied {
                format!("sigma={sigma:.2}")
            } else {
                "disabled".to_string()
            }
        }
        StageMetrics::Posterize {
            levels,
            step,
            distinct_colors,
        } => format!("levels={levels} step={step} colors={distinct_colors}"),
        StageMetrics::Enhance {
            contrast_factor,
            saturation_factor,
        } => format!("contrast={contrast_factor:.2} saturation={saturation_factor:.2}"),
        StageMetrics::EdgeDetection {
            threshold,
            darkening,
            edge_pixel_count,
            total_pixel_count,
        } => {
            #[allow(clippy::cast_precision_loss)]
            let density = if *total_pixel_count > 0 {
                *edge_pixel_count as f64 / *total_pixel_count as f64 * 100.0
            } else {
                0.0
            };
            format!(
                "threshold={threshold:.1} darken={darkening} edges={edge_pixel_count} ({density:.1}%)",
            )
        }
        StageMetrics::Encode {
            format,
            output_bytes,
        } => format!("{format} {output_bytes} bytes"),
    }
}
