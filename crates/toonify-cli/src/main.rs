//! toonify: turn a photo into a flat-shaded cartoon avatar.
//!
//! Runs the stylization pipeline on an image file, writes the result,
//! and prints per-stage diagnostics. Useful for:
//!
//! - Producing avatars from the command line
//! - Tuning levels, enhancement factors and the edge threshold
//! - Measuring per-stage durations across repeated runs
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin toonify -- [OPTIONS] <INPUT> -o <OUTPUT>
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

mod compare;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use toonify_pipeline::diagnostics::{PipelineDiagnostics, duration_ms};
use toonify_pipeline::{EncodeError, OutputFormat, ResizeFilter, StylizeOptions};
use tracing_subscriber::EnvFilter;

/// Turn a photo into a cartoon avatar.
///
/// Downscales, posterizes, boosts contrast and saturation, and darkens
/// detected edges. Prints a per-stage timing report.
#[derive(Parser)]
#[command(name = "toonify", version)]
struct Cli {
    /// Path to the input image (PNG, JPEG, GIF, BMP, WebP).
    input: PathBuf,

    /// Where to write the stylized image.
    ///
    /// The format follows the extension unless `--format` is given.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Longest side of the working image in pixels.
    #[arg(long, default_value_t = StylizeOptions::DEFAULT_MAX_DIMENSION, value_parser = clap::builder::RangedU64ValueParser::<u32>::new().range(1..))]
    max_dimension: u32,

    /// Colour levels per channel (1-256).
    #[arg(long, default_value_t = StylizeOptions::DEFAULT_LEVELS, value_parser = clap::builder::RangedU64ValueParser::<u32>::new().range(1..=256))]
    levels: u32,

    /// Contrast factor around mid-gray.
    #[arg(long, default_value_t = StylizeOptions::DEFAULT_CONTRAST_FACTOR)]
    contrast: f32,

    /// Saturation factor around the image mean.
    #[arg(long, default_value_t = StylizeOptions::DEFAULT_SATURATION_FACTOR)]
    saturation: f32,

    /// Sobel gradient magnitude above which a pixel is an edge.
    #[arg(long, default_value_t = StylizeOptions::DEFAULT_EDGE_THRESHOLD)]
    edge_threshold: f32,

    /// Amount subtracted from each colour channel of edge pixels.
    #[arg(long, default_value_t = StylizeOptions::DEFAULT_EDGE_DARKENING)]
    edge_darkening: u8,

    /// Gaussian smoothing sigma applied before posterizing (0 disables).
    #[arg(long, default_value_t = StylizeOptions::DEFAULT_SMOOTHING_SIGMA)]
    smoothing_sigma: f32,

    /// Resampling filter for the downscale.
    #[arg(long, value_enum, default_value_t = CLI_DEFAULT_FILTER)]
    resize_filter: Filter,

    /// Output container format. Defaults from the output extension, else PNG.
    #[arg(long, value_enum)]
    format: Option<Format>,

    /// Full stylize options as a JSON string.
    ///
    /// When provided, all other option flags are ignored. Missing fields
    /// take their defaults.
    #[arg(long)]
    options_json: Option<String>,

    /// Write a before/after comparison image to this path.
    #[arg(long, value_name = "PATH")]
    compare: Option<PathBuf>,

    /// Print the result as a `data:` URL on stdout.
    #[arg(long)]
    data_url: bool,

    /// Output diagnostics as JSON instead of a human-readable report.
    #[arg(long)]
    json: bool,

    /// Number of runs for averaging.
    #[arg(long, default_value_t = 1, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    runs: usize,

    /// Log pipeline stages at debug level (overrides `RUST_LOG`).
    #[arg(short, long)]
    verbose: bool,
}

/// Resampling filter selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Filter {
    /// Bilinear interpolation (fast, decent quality).
    Triangle,
    /// Bicubic Catmull-Rom (moderate, good quality).
    CatmullRom,
    /// Gaussian (moderate, smooth).
    Gaussian,
    /// Lanczos with 3 lobes (slowest, sharpest).
    Lanczos3,
}

/// Maps a [`ResizeFilter`] to the local CLI [`Filter`] enum.
const fn filter_from_pipeline(f: ResizeFilter) -> Filter {
    match f {
        ResizeFilter::Triangle => Filter::Triangle,
        ResizeFilter::CatmullRom => Filter::CatmullRom,
        ResizeFilter::Gaussian => Filter::Gaussian,
        ResizeFilter::Lanczos3 => Filter::Lanczos3,
    }
}

/// The CLI default filter, derived from
/// [`StylizeOptions::DEFAULT_RESIZE_FILTER`] so the two cannot diverge.
const CLI_DEFAULT_FILTER: Filter = filter_from_pipeline(StylizeOptions::DEFAULT_RESIZE_FILTER);

/// Output format selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Png,
    Bmp,
    Webp,
}

impl From<Format> for OutputFormat {
    fn from(f: Format) -> Self {
        match f {
            Format::Png => Self::Png,
            Format::Bmp => Self::Bmp,
            Format::Webp => Self::WebP,
        }
    }
}

/// Build [`StylizeOptions`] from CLI arguments.
///
/// If `--options-json` is provided it is parsed directly and the
/// individual option flags are ignored.
fn options_from_cli(cli: &Cli) -> Result<StylizeOptions, String> {
    if let Some(ref json) = cli.options_json {
        return serde_json::from_str(json).map_err(|e| format!("Error parsing --options-json: {e}"));
    }

    Ok(StylizeOptions {
        max_dimension: cli.max_dimension,
        levels: cli.levels,
        contrast_factor: cli.contrast,
        saturation_factor: cli.saturation,
        edge_threshold: cli.edge_threshold,
        edge_darkening: cli.edge_darkening,
        smoothing_sigma: cli.smoothing_sigma,
        resize_filter: match cli.resize_filter {
            Filter::Triangle => ResizeFilter::Triangle,
            Filter::CatmullRom => ResizeFilter::CatmullRom,
            Filter::Gaussian => ResizeFilter::Gaussian,
            Filter::Lanczos3 => ResizeFilter::Lanczos3,
        },
    })
}

/// Pick the output format: explicit flag, then output extension, then
/// PNG when the output has no extension (or there is no output).
///
/// An extension that names no supported format is an error rather than
/// a silent fallback, so `-o avatar.gif` never writes PNG bytes.
fn resolve_format(
    explicit: Option<Format>,
    output: Option<&Path>,
) -> Result<OutputFormat, EncodeError> {
    if let Some(f) = explicit {
        return Ok(f.into());
    }
    match output.and_then(Path::extension) {
        None => Ok(OutputFormat::default()),
        Some(ext) => OutputFormat::from_extension(&ext.to_string_lossy()),
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let options = match options_from_cli(&cli) {
        Ok(o) => o,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };
    let format = match resolve_format(cli.format, cli.output.as_deref()) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Error choosing output format: {e} (use --format png|bmp|webp)");
            return ExitCode::FAILURE;
        }
    };

    let image_bytes = match std::fs::read(&cli.input) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Error reading {}: {e}", cli.input.display());
            return ExitCode::FAILURE;
        }
    };

    eprintln!(
        "Image: {} ({} bytes)",
        cli.input.display(),
        image_bytes.len(),
    );
    eprintln!("Options: {options:#?}");
    eprintln!("Format: {format}");
    eprintln!("Runs: {}", cli.runs);
    eprintln!();

    let mut all_diagnostics = Vec::with_capacity(cli.runs);

    for run in 0..cli.runs {
        if cli.runs > 1 {
            eprintln!("--- Run {}/{} ---", run + 1, cli.runs);
        }

        let (staged, diagnostics) = match toonify_pipeline::diagnostics::stylize_with_diagnostics(
            &image_bytes,
            &options,
            format,
        ) {
            Ok(result) => result,
            Err(e) => {
                eprintln!("Pipeline error: {e}");
                return ExitCode::FAILURE;
            }
        };

        if cli.json {
            match serde_json::to_string_pretty(&diagnostics) {
                Ok(json) => println!("{json}"),
                Err(e) => {
                    eprintln!("Error serializing diagnostics: {e}");
                    return ExitCode::FAILURE;
                }
            }
        } else {
            println!("{}", diagnostics.report());
        }

        // Outputs are written on the first run only.
        if run == 0 {
            if let Some(ref path) = cli.output {
                if let Err(e) = std::fs::write(path, &staged.output.encoded) {
                    eprintln!("Error writing {}: {e}", path.display());
                    return ExitCode::FAILURE;
                }
                eprintln!(
                    "Output written to {} ({} bytes)",
                    path.display(),
                    staged.output.encoded.len(),
                );
            }

            if let Some(ref path) = cli.compare {
                if let Err(e) =
                    compare::write_comparison(&staged.original, &staged.output.image, path)
                {
                    eprintln!("Error writing comparison to {}: {e}", path.display());
                    return ExitCode::FAILURE;
                }
                eprintln!("Comparison written to {}", path.display());
            }

            if cli.data_url {
                println!("{}", staged.output.data_url());
            }
        }

        all_diagnostics.push(diagnostics);

        if cli.runs > 1 {
            eprintln!();
        }
    }

    if cli.runs > 1 {
        print_multi_run_summary(&all_diagnostics);
    }

    ExitCode::SUCCESS
}

/// Print aggregated statistics across multiple runs.
#[allow(clippy::cast_precision_loss)]
fn print_multi_run_summary(all_diagnostics: &[PipelineDiagnostics]) {
    println!();
    println!(
        "Summary ({} runs)\n{}",
        all_diagnostics.len(),
        "=".repeat(60),
    );

    let Some(first) = all_diagnostics.first() else {
        println!("Warning: no diagnostics to summarize");
        return;
    };

    let durations: Vec<f64> = all_diagnostics
        .iter()
        .map(|d| duration_ms(d.total_duration))
        .collect();
    let (min, mean, max) = min_mean_max(&durations);
    println!("Total duration: min={min:.3}ms  mean={mean:.3}ms  max={max:.3}ms");

    println!();
    println!("{:<24} {:>12}", "Stage", "Mean (ms)");
    println!("{}", "-".repeat(40));

    for (index, (name, _)) in first.stages().into_iter().enumerate() {
        let stage_durations: Vec<f64> = all_diagnostics
            .iter()
            .map(|d| duration_ms(d.stages()[index].1.duration))
            .collect();
        let (_, stage_mean, _) = min_mean_max(&stage_durations);
        println!("{name:<24} {stage_mean:>10.3}ms");
    }
}

#[allow(clippy::cast_precision_loss)]
fn min_mean_max(values: &[f64]) -> (f64, f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0, 0.0);
    }
    let min = values.iter().copied().reduce(f64::min).unwrap_or(0.0);
    let max = values.iter().copied().reduce(f64::max).unwrap_or(0.0);
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    (min, mean, max)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("toonify").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn command_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn defaults_match_library_defaults() {
        let cli = parse(&["in.jpg"]);
        assert_eq!(options_from_cli(&cli).unwrap(), StylizeOptions::default());
        assert_eq!(cli.resize_filter, CLI_DEFAULT_FILTER);
        assert_eq!(cli.runs, 1);
    }

    #[test]
    fn flags_override_defaults() {
        let cli = parse(&[
            "in.jpg",
            "-o",
            "out.webp",
            "--levels",
            "4",
            "--contrast",
            "1.0",
            "--edge-darkening",
            "255",
            "--resize-filter",
            "lanczos3",
        ]);
        let options = options_from_cli(&cli).unwrap();
        assert_eq!(options.levels, 4);
        assert!((options.contrast_factor - 1.0).abs() < f32::EPSILON);
        assert_eq!(options.edge_darkening, 255);
        assert_eq!(options.resize_filter, ResizeFilter::Lanczos3);
    }

    #[test]
    fn out_of_range_levels_rejected_by_parser() {
        let args = ["toonify", "in.jpg", "--levels", "0"];
        assert!(Cli::try_parse_from(args).is_err());
        let args = ["toonify", "in.jpg", "--levels", "257"];
        assert!(Cli::try_parse_from(args).is_err());
    }

    #[test]
    fn options_json_wins_over_flags() {
        let cli = parse(&["in.jpg", "--levels", "3", "--options-json", r#"{"levels": 6}"#]);
        let options = options_from_cli(&cli).unwrap();
        assert_eq!(options.levels, 6);
        assert_eq!(options.max_dimension, StylizeOptions::DEFAULT_MAX_DIMENSION);
    }

    #[test]
    fn bad_options_json_is_reported() {
        let cli = parse(&["in.jpg", "--options-json", "{not json"]);
        let err = options_from_cli(&cli).unwrap_err();
        assert!(err.starts_with("Error parsing --options-json"), "{err}");
    }

    #[test]
    fn format_resolution_order() {
        let webp = Path::new("avatar.WEBP");
        assert_eq!(resolve_format(None, Some(webp)).unwrap(), OutputFormat::WebP);
        assert_eq!(
            resolve_format(Some(Format::Bmp), Some(webp)).unwrap(),
            OutputFormat::Bmp
        );
        assert_eq!(
            resolve_format(None, Some(Path::new("avatar"))).unwrap(),
            OutputFormat::Png
        );
        assert_eq!(resolve_format(None, None).unwrap(), OutputFormat::Png);
    }

    #[test]
    fn unsupported_output_extension_is_an_error() {
        let gif = Path::new("avatar.gif");
        assert!(matches!(
            resolve_format(None, Some(gif)),
            Err(EncodeError::UnsupportedFormat(ref ext)) if ext == "gif"
        ));
        // An explicit format still wins over the extension.
        assert_eq!(
            resolve_format(Some(Format::Png), Some(gif)).unwrap(),
            OutputFormat::Png
        );
    }

    #[test]
    fn min_mean_max_handles_empty_and_values() {
        assert_eq!(min_mean_max(&[]), (0.0, 0.0, 0.0));
        let (min, mean, max) = min_mean_max(&[3.0, 1.0, 2.0]);
        assert!((min - 1.0).abs() < f64::EPSILON);
        assert!((mean - 2.0).abs() < f64::EPSILON);
        assert!((max - 3.0).abs() < f64::EPSILON);
    }
}
