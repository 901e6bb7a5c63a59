//! WASM bindings for in-browser conversion.
//!
//! This module exposes the router to JavaScript via wasm-bindgen.

use wasm_bindgen::prelude::*;

use crate::convert::{self, ExportOptions, TargetFormat};
use crate::raster::{self, RasterFormat};

/// Initialize panic hook for better error messages in the browser console.
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

fn js_error(e: crate::Error) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// Convert a document to `target` (`pdf`, `txt`, `epub`, `html`, `md`,
/// `rtf` or `docx`).
///
/// The source format is taken from `filename`'s extension. Returns the
/// encoded bytes; use [`mime_type`] for the matching content type.
#[wasm_bindgen]
pub fn convert(data: &[u8], filename: &str, target: &str) -> Result<Vec<u8>, JsValue> {
    let target = TargetFormat::from_token(target).map_err(js_error)?;
    let output =
        convert::convert(data, filename, target, &ExportOptions::default()).map_err(js_error)?;
    Ok(output.bytes)
}

/// MIME type for a target token.
#[wasm_bindgen]
pub fn mime_type(target: &str) -> Result<String, JsValue> {
    let target = TargetFormat::from_token(target).map_err(js_error)?;
    Ok(target.mime_type().to_string())
}

/// Detect what kind of input `filename` names: a document source kind
/// (`epub`, `pdf`, ...), `image` for a decodable raster file, or an error.
#[wasm_bindgen]
pub fn sniff(filename: &str) -> Result<String, JsValue> {
    if RasterFormat::from_filename(filename).is_some() {
        return Ok("image".to_string());
    }
    let kind = convert::sniff_source(filename).map_err(js_error)?;
    Ok(kind.to_string())
}

/// Decode a PSD, ICO/CUR or Netpbm image and return PNG bytes.
#[wasm_bindgen]
pub fn image_to_png(data: &[u8], filename: &str) -> Result<Vec<u8>, JsValue> {
    let (png, _) = raster::convert_to_png(data, filename).map_err(js_error)?;
    Ok(png)
}
