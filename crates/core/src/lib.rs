//! Core types, fragment filtering and the translation pipeline for
//! translating spreadsheets and slide decks.

pub mod error;
pub mod filter;
pub mod pipeline;
pub mod session;
pub mod translate;
pub mod types;

pub use error::{Error, Result};
pub use filter::{Decision, FontMetadataPolicy, FragmentFilter, MonospacePolicy, SkipReason};
pub use pipeline::{RunReport, TranslationJob};
pub use session::{Document, EditorSession};
pub use translate::{DryRunTranslator, Translator};
pub use types::{
    output_path, DocumentFormat, FontInfo, Fragment, FragmentLocation, DEFAULT_SOURCE_LANGUAGE,
};
