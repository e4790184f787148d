//! Minimal Open Packaging Conventions support for OOXML documents.
//!
//! Reads `.xlsx`/`.pptx` packages (ZIP archives of XML parts), resolves
//! relationships, and writes edited copies.

pub mod package;
pub mod relationships;
pub mod xml;

pub use package::Package;
pub use relationships::Relationship;
