//! Integration test: run a synthetic portrait through every public entry
//! point and check they agree.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use base64::Engine as _;
use toonify_pipeline::pipeline::{Advance, Stage};
use toonify_pipeline::{
    OutputFormat, Pipeline, RgbaImage, SourceImage, StylizeError, StylizeOptions,
};

/// A 1200x800 "portrait": warm gradient background with a cool disc in
/// the middle, so there is both smooth shading and a hard outline.
fn portrait() -> RgbaImage {
    RgbaImage::from_fn(1200, 800, |x, y| {
        let dx = f64::from(x) - 600.0;
        let dy = f64::from(y) - 400.0;
        if dx.hypot(dy) < 250.0 {
            image::Rgba([40, 120, 210, 255])
        } else {
            let r = u8::try_from(150 + x * 100 / 1200).unwrap();
            let g = u8::try_from(60 + y * 120 / 800).unwrap();
            image::Rgba([r, g, 50, 255])
        }
    })
}

fn png_bytes(image: &RgbaImage) -> Vec<u8> {
    toonify_pipeline::encode::encode(image, OutputFormat::Png).unwrap()
}

#[test]
fn portrait_through_every_entry_point() {
    let image = portrait();
    let bytes = png_bytes(&image);
    let options = StylizeOptions::default();

    let from_bytes = toonify_pipeline::stylize_bytes(&bytes, &options, OutputFormat::Png)
        .expect("stylize_bytes should succeed");
    // 800 * 512 / 1200 = 341.33
    assert_eq!(from_bytes.image.dimensions(), (512, 341));

    let source = SourceImage::new(image).unwrap();
    let from_source = toonify_pipeline::stylize(&source, &options).unwrap();
    assert_eq!(from_bytes, from_source);

    let staged = toonify_pipeline::stylize_staged(&bytes, &options, OutputFormat::Png).unwrap();
    assert_eq!(staged.output, from_bytes);
    assert_eq!(staged.original.dimensions(), (1200, 800));

    let (diag_staged, diagnostics) =
        toonify_pipeline::diagnostics::stylize_with_diagnostics(&bytes, &options, OutputFormat::Png)
            .unwrap();
    assert_eq!(diag_staged.output, from_bytes);
    assert_eq!(diagnostics.summary.output_width, 512);
    assert!(diagnostics.summary.edge_pixel_count > 0, "disc outline should be detected");
    eprintln!("{}", diagnostics.report());

    let mut stage: Stage = Pipeline::new(bytes, options).into();
    loop {
        match stage.advance().unwrap() {
            Advance::Next(next) => stage = next,
            Advance::Complete(done) => {
                stage = done;
                break;
            }
        }
    }
    assert_eq!(stage.complete().unwrap().output, from_bytes);
}

#[test]
fn output_decodes_back_exactly_and_data_url_round_trips() {
    let bytes = png_bytes(&portrait());
    let out =
        toonify_pipeline::stylize_bytes(&bytes, &StylizeOptions::default(), OutputFormat::Png)
            .unwrap();

    let decoded = image::load_from_memory(&out.encoded).unwrap().into_rgba8();
    assert_eq!(decoded, out.image);

    let url = out.data_url();
    let payload = url
        .strip_prefix("data:image/png;base64,")
        .expect("data URL should carry the PNG MIME type");
    let raw = base64::engine::general_purpose::STANDARD
        .decode(payload)
        .unwrap();
    assert_eq!(raw, out.encoded);
}

#[test]
fn jpeg_input_is_accepted() {
    let image = image::DynamicImage::ImageRgba8(portrait()).into_rgb8();
    let mut jpeg = Vec::new();
    image::codecs::jpeg::JpegEncoder::new_with_quality(&mut jpeg, 85)
        .encode_image(&image)
        .unwrap();

    let out =
        toonify_pipeline::stylize_bytes(&jpeg, &StylizeOptions::default(), OutputFormat::Png)
            .unwrap();
    assert_eq!(out.image.dimensions(), (512, 341));
    assert!(out.image.pixels().all(|p| p.0[3] == 255));
}

#[test]
fn partial_options_json_and_error_json() {
    let options: StylizeOptions =
        serde_json::from_str(r#"{"levels": 4, "edge_threshold": 60.0}"#).unwrap();
    assert_eq!(options.levels, 4);
    assert_eq!(options.max_dimension, 512);

    let bad = StylizeOptions {
        levels: 300,
        ..options
    };
    let err = toonify_pipeline::stylize_bytes(&[1, 2, 3], &bad, OutputFormat::Png).unwrap_err();
    let json = serde_json::to_string(&err).unwrap();
    let back: StylizeError = serde_json::from_str(&json).unwrap();
    assert_eq!(back.to_string(), err.to_string());
}

#[test]
fn higher_threshold_darkens_fewer_pixels() {
    let bytes = png_bytes(&portrait());
    let count = |threshold: f32| {
        let options = StylizeOptions {
            edge_threshold: threshold,
            ..StylizeOptions::default()
        };
        let staged =
            toonify_pipeline::stylize_staged(&bytes, &options, OutputFormat::Png).unwrap();
        toonify_pipeline::edge::count_edge_pixels(&staged.edges)
    };
    let counts = [count(0.0), count(30.0), count(120.0), count(600.0)];
    for pair in counts.windows(2) {
        assert!(pair[1] <= pair[0], "edge counts not monotone: {counts:?}");
    }
}
