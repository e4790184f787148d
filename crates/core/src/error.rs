//! Error types for office document translation.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while translating a document.
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to open, read or write a file.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// The file extension is not one we know how to translate.
    #[error("Unsupported or unrecognized file format: {0}")]
    UnsupportedFormat(String),

    /// A command-line value was rejected before any document was touched.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// ZIP archive error (OOXML package container).
    #[error("ZIP error: {0}")]
    ZipError(String),

    /// XML parsing or writing error inside a package part.
    #[error("XML error: {0}")]
    XmlError(String),

    /// A part the document format requires is absent from the package.
    #[error("Missing package part: {0}")]
    MissingPart(String),

    /// Invalid or corrupted file.
    #[error("Invalid or corrupted file: {0}")]
    CorruptedFile(String),

    /// The translation service failed or returned something unusable.
    #[error("Translation error: {0}")]
    TranslationError(String),

    /// The document was used after it had been closed.
    #[error("Document is closed")]
    Closed,
}
