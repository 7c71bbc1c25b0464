//! Web worker entry point for toonify stylization.
//!
//! This crate compiles to a standalone WASM module that runs inside a
//! `Worker`. It receives image bytes and `StylizeOptions` JSON via
//! `postMessage`, calls `toonify_pipeline::stylize_bytes`, and posts
//! the encoded result back.
//!
//! The encoded image travels as a raw `Uint8Array` together with its
//! MIME type, so the main thread can wrap it in a `Blob` or build a
//! `data:` URL without touching pixels. Running the pipeline in a worker
//! keeps the browser's main thread free while a large photo is processed.

use toonify_pipeline::{OutputFormat, StylizeError, StylizeOptions, StylizedImage};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;

/// Message protocol: the main thread sends a JS object with:
/// - `imageBytes`: `Uint8Array` containing the compressed image file
/// - `optionsJson`: `String` containing JSON-serialized `StylizeOptions`
///   (missing fields take their defaults)
/// - `format`: optional `String`, an extension (`"webp"`) or MIME type
///   (`"image/webp"`); PNG when absent
/// - `generation`: `f64` counter, echoed so stale responses can be dropped
///
/// On success the worker responds with:
/// - `generation`, `ok: true`
/// - `width`, `height`: `f64` output dimensions
/// - `mime`: `String`
/// - `bytes`: `Uint8Array` with the encoded image
///
/// On error the worker responds with:
/// - `generation`, `ok: false`
/// - `errorJson`: `String`, a JSON-serialized `StylizeError`
///
/// # Worker entry point
///
/// Called automatically when the WASM module is instantiated in the
/// worker context.
#[wasm_bindgen(start)]
pub fn worker_main() {
    console_error_panic_hook::set_once();

    let global: web_sys::DedicatedWorkerGlobalScope = js_sys::global()
        .dyn_into()
        .expect_throw("not running in a DedicatedWorkerGlobalScope");

    let onmessage =
        Closure::<dyn FnMut(web_sys::MessageEvent)>::new(move |event: web_sys::MessageEvent| {
            handle_message(&event);
        });
    global.set_onmessage(Some(onmessage.as_ref().unchecked_ref()));
    onmessage.forget(); // lives for the worker lifetime
}

/// Run one request: parse the options and format, then stylize.
///
/// # Errors
///
/// Unparseable options JSON becomes [`StylizeError::InvalidOptions`];
/// an unknown format becomes [`StylizeError::Encode`]. Pipeline errors
/// pass through unchanged.
pub fn process_request(
    image_bytes: &[u8],
    options_json: &str,
    format: Option<&str>,
) -> Result<StylizedImage, StylizeError> {
    let options: StylizeOptions = serde_json::from_str(options_json)
        .map_err(|e| StylizeError::InvalidOptions(format!("failed to parse options: {e}")))?;
    let format = match format {
        Some(name) => name.parse::<OutputFormat>()?,
        None => OutputFormat::default(),
    };
    toonify_pipeline::stylize_bytes(image_bytes, &options, format)
}

/// Serialize an error for the `errorJson` response field.
#[must_use]
pub fn error_json(error: &StylizeError) -> String {
    serde_json::to_string(error)
        .unwrap_or_else(|ser_err| format!("\"serialization error: {ser_err}\""))
}

/// Handle an incoming message from the main thread.
fn handle_message(event: &web_sys::MessageEvent) {
    let data = event.data();
    let field = |name: &str| {
        js_sys::Reflect::get(&data, &JsValue::from_str(name)).expect_throw("message is not an object")
    };

    let generation = field("generation")
        .as_f64()
        .expect_throw("generation is not a number");
    let image_bytes = field("imageBytes")
        .dyn_into::<js_sys::Uint8Array>()
        .expect_throw("imageBytes is not a Uint8Array")
        .to_vec();
    let options_json = field("optionsJson")
        .as_string()
        .expect_throw("optionsJson is not a string");
    // Absent, null and undefined all mean "default format".
    let format = field("format").as_string();

    // Synchronous: blocks this worker thread only.
    match process_request(&image_bytes, &options_json, format.as_deref()) {
        Ok(output) => post_success_response(generation, &output),
        Err(e) => post_error_json(generation, &error_json(&e)),
    }
}

/// Post the encoded image back to the main thread.
fn post_success_response(generation: f64, output: &StylizedImage) {
    let response = js_sys::Object::new();
    let set = |key: &str, val: &JsValue| {
        js_sys::Reflect::set(&response, &JsValue::from_str(key), val)
            .expect_throw("failed to set response field");
    };

    let dims = output.dimensions();
    set("generation", &JsValue::from_f64(generation));
    set("ok", &JsValue::from_bool(true));
    set("width", &JsValue::from_f64(f64::from(dims.width)));
    set("height", &JsValue::from_f64(f64::from(dims.height)));
    set("mime", &JsValue::from_str(output.format.mime()));
    set("bytes", &js_sys::Uint8Array::from(output.encoded.as_slice()));

    let global: web_sys::DedicatedWorkerGlobalScope = js_sys::global()
        .dyn_into()
        .expect_throw("not in worker scope");
    global
        .post_message(&response)
        .expect_throw("failed to postMessage");
}

/// Post a pre-serialized error JSON back to the main thread.
fn post_error_json(generation: f64, error_json: &str) {
    let response = js_sys::Object::new();
    let _ = js_sys::Reflect::set(
        &response,
        &JsValue::from_str("generation"),
        &JsValue::from_f64(generation),
    );
    let _ = js_sys::Reflect::set(
        &response,
        &JsValue::from_str("ok"),
        &JsValue::from_bool(false),
    );
    let _ = js_sys::Reflect::set(
        &response,
        &JsValue::from_str("errorJson"),
        &JsValue::from_str(error_json),
    );

    if let Ok(global) = js_sys::global().dyn_into::<web_sys::DedicatedWorkerGlobalScope>() {
        let _ = global.post_message(&response);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use toonify_pipeline::types::DecodeError;
    use toonify_pipeline::SourceImage;

    use super::*;

    /// Left half warm, right half cool.
    fn png(width: u32, height: u32) -> Vec<u8> {
        let mut raw = Vec::new();
        for _ in 0..height {
            for x in 0..width {
                let px = if x < width / 2 { [200, 80, 40, 255] } else { [30, 90, 180, 255] };
                raw.extend_from_slice(&px);
            }
        }
        let image = SourceImage::from_raw(width, height, raw).unwrap().into_rgba();
        toonify_pipeline::encode::encode(&image, OutputFormat::Png).unwrap()
    }

    #[test]
    fn empty_options_use_defaults_and_png() {
        let out = process_request(&png(30, 20), "{}", None).unwrap();
        assert_eq!(out.format, OutputFormat::Png);
        assert_eq!(out.image.dimensions(), (30, 20));
        assert_eq!(&out.encoded[..4], b"\x89PNG");
    }

    #[test]
    fn format_accepts_extension_or_mime() {
        let bytes = png(16, 16);
        let by_ext = process_request(&bytes, "{}", Some("webp")).unwrap();
        let by_mime = process_request(&bytes, "{}", Some("image/webp")).unwrap();
        assert_eq!(by_ext.format, OutputFormat::WebP);
        assert_eq!(by_ext, by_mime);
    }

    #[test]
    fn options_json_is_applied() {
        let out = process_request(&png(40, 20), r#"{"max_dimension": 10}"#, None).unwrap();
        assert_eq!(out.image.dimensions(), (10, 5));
    }

    #[test]
    fn malformed_options_json_is_invalid_options() {
        let err = process_request(&png(4, 4), "{levels", None).unwrap_err();
        assert!(matches!(err, StylizeError::InvalidOptions(_)), "{err:?}");
    }

    #[test]
    fn unknown_format_is_an_encode_error() {
        let err = process_request(&png(4, 4), "{}", Some("gif")).unwrap_err();
        assert!(matches!(err, StylizeError::Encode(_)), "{err:?}");
    }

    #[test]
    fn decode_failure_round_trips_through_error_json() {
        let err = process_request(&[], "{}", None).unwrap_err();
        assert!(matches!(err, StylizeError::Decode(DecodeError::EmptyInput)));

        let json = error_json(&err);
        let back: StylizeError = serde_json::from_str(&json).unwrap();
        assert_eq!(back.to_string(), err.to_string());
    }
}
