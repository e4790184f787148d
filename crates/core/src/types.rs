//! Domain types for documents and the text fragments extracted from them.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Source language used when none is given.
pub const DEFAULT_SOURCE_LANGUAGE: &str = "en";

/// The kind of document being translated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentFormat {
    /// Excel workbook (`.xlsx`).
    Spreadsheet,
    /// PowerPoint presentation (`.pptx`).
    SlideDeck,
}

impl DocumentFormat {
    /// Detect format from a file extension, ignoring case.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "xlsx" => Some(Self::Spreadsheet),
            "pptx" => Some(Self::SlideDeck),
            _ => None,
        }
    }

    /// Detect format from a path, failing for anything we cannot translate.
    pub fn from_path(path: &Path) -> Result<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
            .ok_or_else(|| Error::UnsupportedFormat(path.display().to_string()))
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Spreadsheet => write!(f, "spreadsheet"),
            Self::SlideDeck => write!(f, "slide deck"),
        }
    }
}

/// Derive the output path `<stem>.<language>.<ext>` next to the input.
///
/// The language code and the original extension are embedded verbatim.
pub fn output_path(input: &Path, language: &str) -> Result<PathBuf> {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| Error::InvalidArgument(format!("no file name in {}", input.display())))?;

    let filename = match input.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{}.{}.{}", stem, language, ext),
        None => format!("{}.{}", stem, language),
    };

    Ok(match input.parent() {
        Some(parent) => parent.join(filename),
        None => PathBuf::from(filename),
    })
}

/// Font characteristics of a shape's text, as declared in the document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FontInfo {
    /// Typeface name, with theme references already resolved.
    pub typeface: Option<String>,

    /// Size in points.
    pub size: Option<f32>,

    /// OOXML `pitchFamily` byte. Low two bits hold the pitch (1 = fixed).
    pub pitch_family: Option<u8>,
}

impl FontInfo {
    /// Font info with only a typeface.
    pub fn named(typeface: impl Into<String>) -> Self {
        Self {
            typeface: Some(typeface.into()),
            ..Self::default()
        }
    }
}

/// Where a fragment lives inside its document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FragmentLocation {
    /// A worksheet cell, e.g. `Slide1!B4`.
    Cell { sheet: String, reference: String },

    /// A shape on a slide (1-based slide number).
    Shape {
        slide: usize,
        shape_id: u32,
        name: String,
    },
}

impl fmt::Display for FragmentLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cell { sheet, reference } => write!(f, "{}!{}", sheet, reference),
            Self::Shape {
                slide,
                shape_id,
                name,
            } => write!(f, "slide {} shape {} ({})", slide, shape_id, name),
        }
    }
}

/// One unit of translatable text extracted from a cell or a shape.
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    pub location: FragmentLocation,

    /// The text as stored in the document.
    pub text: String,

    /// Font of the shape's text. Cells carry none.
    pub font: Option<FontInfo>,

    /// Alternative text of the shape, if any.
    pub alt_text: Option<String>,

    /// Replacement text set by the pipeline; written back by the document.
    pub replacement: Option<String>,
}

impl Fragment {
    /// A fragment read from a worksheet cell.
    pub fn cell(
        sheet: impl Into<String>,
        reference: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            location: FragmentLocation::Cell {
                sheet: sheet.into(),
                reference: reference.into(),
            },
            text: text.into(),
            font: None,
            alt_text: None,
            replacement: None,
        }
    }

    /// A fragment read from a slide shape.
    pub fn shape(
        slide: usize,
        shape_id: u32,
        name: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            location: FragmentLocation::Shape {
                slide,
                shape_id,
                name: name.into(),
            },
            text: text.into(),
            font: None,
            alt_text: None,
            replacement: None,
        }
    }

    pub fn with_font(mut self, font: FontInfo) -> Self {
        self.font = Some(font);
        self
    }

    pub fn with_alt_text(mut self, alt_text: impl Into<String>) -> Self {
        self.alt_text = Some(alt_text.into());
        self
    }

    /// Whether this fragment came from a worksheet cell.
    pub fn is_cell(&self) -> bool {
        matches!(self.location, FragmentLocation::Cell { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(DocumentFormat::from_extension("xlsx"), Some(DocumentFormat::Spreadsheet));
        assert_eq!(DocumentFormat::from_extension("XLSX"), Some(DocumentFormat::Spreadsheet));
        assert_eq!(DocumentFormat::from_extension("PpTx"), Some(DocumentFormat::SlideDeck));
        assert_eq!(DocumentFormat::from_extension("ppt"), None);
        assert_eq!(DocumentFormat::from_extension("docx"), None);
    }

    #[test]
    fn test_format_from_path_rejects_unknown() {
        assert!(DocumentFormat::from_path(Path::new("deck.pptx")).is_ok());
        assert!(matches!(
            DocumentFormat::from_path(Path::new("notes.txt")),
            Err(Error::UnsupportedFormat(_))
        ));
        assert!(DocumentFormat::from_path(Path::new("no_extension")).is_err());
    }

    #[test]
    fn test_output_path() {
        let out = output_path(Path::new("/tmp/talk.pptx"), "de").unwrap();
        assert_eq!(out, PathBuf::from("/tmp/talk.de.pptx"));
    }

    #[test]
    fn test_output_path_keeps_language_and_extension_verbatim() {
        let out = output_path(Path::new("/data/Budget.XLSX"), "zh-TW").unwrap();
        assert_eq!(out, PathBuf::from("/data/Budget.zh-TW.XLSX"));

        let out = output_path(Path::new("/data/a.b.pptx"), "FR").unwrap();
        assert_eq!(out, PathBuf::from("/data/a.b.FR.pptx"));
    }

    #[test]
    fn test_location_display() {
        let cell = Fragment::cell("Slide1", "B4", "Hello");
        assert_eq!(cell.location.to_string(), "Slide1!B4");
        assert!(cell.is_cell());

        let shape = Fragment::shape(3, 7, "Title 1", "Hello");
        assert_eq!(shape.location.to_string(), "slide 3 shape 7 (Title 1)");
        assert!(!shape.is_cell());
    }
}
