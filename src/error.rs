//! Error types for the word2pdf library.

use std::io;
use thiserror::Error;

/// Result type alias for word2pdf operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while converting submissions.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The uploaded file cannot be opened as a ZIP container.
    #[error("Corrupt archive: {0}")]
    CorruptArchive(String),

    /// No transform passes were supplied when building the engine.
    #[error("XML transform capability unavailable: {0}; inject at least one pass or use TransformEngine::new()")]
    MissingToolchain(String),

    /// A required transform pass is not registered.
    #[error("Transform pass missing: {0}")]
    MissingStylesheet(String),

    /// A transform pass failed for one of the submitted files.
    #[error("Transformation of '{filename}' failed: {detail}")]
    Transform { filename: String, detail: String },

    /// The isolated working area for a job could not be created.
    #[error("Cannot create temporary working area: {0}")]
    TempFolder(String),

    /// A PDF supplied to the combine step is not usable.
    #[error("Incompatible PDF input: {0}")]
    IncompatiblePdf(String),

    /// The PDF version is above the supported ceiling.
    #[error("Unsupported PDF version: {0}")]
    UnsupportedVersion(String),

    /// Error parsing or rewriting XML content.
    #[error("XML error: {0}")]
    Xml(String),

    /// Error while paginating or serializing PDF output.
    #[error("Rendering error: {0}")]
    Render(String),

    /// A storage collaborator reported a failure.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<zip::result::ZipError> for Error {
    fn from(err: zip::result::ZipError) -> Self {
        match err {
            zip::result::ZipError::Io(e) => Error::Io(e),
            _ => Error::CorruptArchive(err.to_string()),
        }
    }
}

impl From<roxmltree::Error> for Error {
    fn from(err: roxmltree::Error) -> Self {
        Error::Xml(err.to_string())
    }
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Error::Xml(err.to_string())
    }
}

impl From<lopdf::Error> for Error {
    fn from(err: lopdf::Error) -> Self {
        match err {
            lopdf::Error::IO(e) => Error::Io(e),
            _ => Error::Render(err.to_string()),
        }
    }
}
