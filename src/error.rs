//! Error types for vellum operations.

use thiserror::Error;

/// Errors that can occur while parsing or exporting documents.
///
/// Every variant is fatal for the conversion that raised it. Per-asset
/// problems (a missing image, an image that cannot be embedded) never
/// surface here; they are logged and the asset is dropped.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Invalid container: {0}")]
    InvalidContainer(String),

    #[error("Missing package document: {0}")]
    MissingPackage(String),

    #[error("EPUB has an empty spine")]
    EmptySpine,

    #[error("Archive contains no images")]
    EmptyArchive,

    #[error("Archive contains no .txt entry")]
    NoTextFound,

    #[error("Archive contains no HTML entry")]
    NoHtmlFound,

    #[error("Unsupported input: {0}")]
    UnsupportedInput(String),

    #[error("Unsupported target format: {0}")]
    UnsupportedTarget(String),

    #[error("Invalid export options: {0}")]
    InvalidOptions(String),

    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("Rendering failed: {0}")]
    Render(String),

    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("Image codec error: {0}")]
    Image(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, Error>;
