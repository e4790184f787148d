//! Spreadsheet documents.

use crate::shared_strings::parse_shared_strings;
use crate::sheet::{rewrite_cells, scan_column, ScanRange};
use pptrans_core::{Document, DocumentFormat, Error, Fragment, Result};
use pptrans_opc::relationships::types;
use pptrans_opc::xml::{attribute, local_name};
use pptrans_opc::Package;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::HashMap;
use std::path::Path;

/// Worksheets whose name starts with this prefix (any case) are translated.
pub const SHEET_PREFIX: &str = "Slide";

/// Column holding the translatable text (`B`).
pub const TEXT_COLUMN: u32 = 2;

/// First data row; row 1 is the header.
pub const FIRST_ROW: u32 = 2;

const DEFAULT_WORKBOOK_PART: &str = "xl/workbook.xml";

/// A worksheet listed in the workbook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetEntry {
    pub name: String,
    pub part: String,
}

/// An open `.xlsx` workbook. The source file is only read.
pub struct Workbook {
    package: Option<Package>,
    sheets: Vec<SheetEntry>,
    shared_strings: Vec<String>,
}

impl Workbook {
    /// Open a workbook from disk.
    pub fn open(path: &Path) -> Result<Self> {
        log::debug!("opening workbook {}", path.display());
        Self::from_package(Package::open(path)?)
    }

    /// Open a workbook from an already loaded package.
    pub fn from_package(mut package: Package) -> Result<Self> {
        let workbook_part = package
            .relationships("")?
            .into_iter()
            .find(|r| r.is(types::OFFICE_DOCUMENT))
            .map(|r| r.target)
            .unwrap_or_else(|| DEFAULT_WORKBOOK_PART.to_string());

        let relationships = package.relationships(&workbook_part)?;
        let workbook_xml = package.read_part(&workbook_part)?;

        let sheets = parse_sheets(&workbook_xml)?
            .into_iter()
            .filter_map(|(name, rid)| match relationships.iter().find(|r| r.id == rid) {
                Some(rel) if rel.is(types::WORKSHEET) => Some(SheetEntry {
                    name,
                    part: rel.target.clone(),
                }),
                Some(rel) => {
                    log::debug!("skipping sheet '{}' of type {}", name, rel.rel_type);
                    None
                }
                None => {
                    log::warn!("worksheet '{}' has no relationship {}", name, rid);
                    None
                }
            })
            .collect::<Vec<_>>();

        let shared_strings = match relationships.iter().find(|r| r.is(types::SHARED_STRINGS)) {
            Some(rel) => match package.read_optional_part(&rel.target)? {
                Some(xml) => parse_shared_strings(&xml)?,
                None => Vec::new(),
            },
            None => Vec::new(),
        };

        log::debug!(
            "found {} worksheets, {} shared strings",
            sheets.len(),
            shared_strings.len()
        );

        Ok(Self {
            package: Some(package),
            sheets,
            shared_strings,
        })
    }

    /// All worksheets in workbook order.
    pub fn sheets(&self) -> &[SheetEntry] {
        &self.sheets
    }

    /// Worksheets that hold translatable text.
    pub fn slide_sheets(&self) -> impl Iterator<Item = &SheetEntry> {
        self.sheets.iter().filter(|s| is_slide_sheet(&s.name))
    }

    fn package_mut(&mut self) -> Result<&mut Package> {
        self.package.as_mut().ok_or(Error::Closed)
    }
}

impl Document for Workbook {
    fn format(&self) -> DocumentFormat {
        DocumentFormat::Spreadsheet
    }

    fn for_each_fragment(
        &mut self,
        visitor: &mut dyn FnMut(&mut Fragment) -> Result<()>,
    ) -> Result<()> {
        let range = ScanRange {
            column: TEXT_COLUMN,
            first_row: FIRST_ROW,
        };
        let sheets: Vec<SheetEntry> = self.slide_sheets().cloned().collect();

        for sheet in sheets {
            let xml = self.package_mut()?.read_part(&sheet.part)?;
            let cells = scan_column(&xml, &self.shared_strings, range)?;
            log::debug!("worksheet '{}': {} text cells", sheet.name, cells.len());

            let mut edits = HashMap::new();
            for cell in cells {
                let mut fragment =
                    Fragment::cell(sheet.name.clone(), cell.reference.clone(), cell.text);
                visitor(&mut fragment)?;
                if let Some(replacement) = fragment.replacement {
                    edits.insert(cell.reference, replacement);
                }
            }

            if !edits.is_empty() {
                let rewritten = rewrite_cells(&xml, &edits)?;
                self.package_mut()?.replace_part(&sheet.part, rewritten);
            }
        }

        Ok(())
    }

    fn save_as(&mut self, path: &Path) -> Result<()> {
        self.package_mut()?.save_as(path)
    }

    fn close(&mut self) -> Result<()> {
        self.package.take();
        Ok(())
    }
}

/// Whether a worksheet name carries the slide prefix (case-insensitive).
pub fn is_slide_sheet(name: &str) -> bool {
    name.get(..SHEET_PREFIX.len())
        .map(|head| head.eq_ignore_ascii_case(SHEET_PREFIX))
        .unwrap_or(false)
}

/// `(name, relationship id)` of every `sheet` in `workbook.xml`.
fn parse_sheets(xml: &str) -> Result<Vec<(String, String)>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut sheets = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                if local_name(e.name().as_ref()) == b"sheet" =>
            {
                let name = attribute(e, b"name")?.unwrap_or_default();
                match attribute(e, b"id")? {
                    Some(rid) => sheets.push((name, rid)),
                    None => log::warn!("worksheet '{}' has no relationship id", name),
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::XmlError(format!("Error parsing workbook: {}", e))),
            _ => {}
        }
    }

    Ok(sheets)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_slide_sheet() {
        assert!(is_slide_sheet("Slide1"));
        assert!(is_slide_sheet("SLIDES"));
        assert!(is_slide_sheet("slide"));
        assert!(!is_slide_sheet("Sheet1"));
        assert!(!is_slide_sheet("Sli"));
        assert!(!is_slide_sheet("Übersicht"));
        assert!(!is_slide_sheet("My Slide"));
    }

    #[test]
    fn test_parse_sheets() {
        let xml = r#"<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="Intro" sheetId="1" r:id="rId1"/><sheet name="Slide &amp; 2" sheetId="2" r:id="rId2"/></sheets></workbook>"#;
        assert_eq!(
            parse_sheets(xml).unwrap(),
            vec![
                ("Intro".to_string(), "rId1".to_string()),
                ("Slide & 2".to_string(), "rId2".to_string()),
            ]
        );
    }
}
