//! Worksheet scanning and cell rewriting.

use pptrans_core::{Error, Result};
use pptrans_opc::xml::{attribute, local_name, prefix, XmlOutput};
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Reader;
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Regex for an A1-style cell reference, absolute markers allowed.
static CELL_REFERENCE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\$?([A-Za-z]{1,3})\$?([0-9]+)$").unwrap());

/// A cell position, 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRef {
    pub column: u32,
    pub row: u32,
}

impl CellRef {
    /// Parse `B12`, `$B$12`, ...
    pub fn parse(reference: &str) -> Option<Self> {
        let caps = CELL_REFERENCE_REGEX.captures(reference)?;
        let column = column_index(&caps[1])?;
        let row = caps[2].parse().ok()?;
        (row > 0).then_some(Self { column, row })
    }

    pub fn to_a1(self) -> String {
        format!("{}{}", column_letters(self.column), self.row)
    }
}

/// Column letters to 1-based index (`A` → 1, `AA` → 27).
pub fn column_index(letters: &str) -> Option<u32> {
    letters.chars().try_fold(0u32, |acc, c| {
        let c = c.to_ascii_uppercase();
        c.is_ascii_uppercase()
            .then(|| acc * 26 + (c as u32 - 'A' as u32 + 1))
    })
}

/// 1-based column index to letters.
pub fn column_letters(mut index: u32) -> String {
    let mut letters = Vec::new();
    while index > 0 {
        let rem = (index - 1) % 26;
        letters.push((b'A' + rem as u8) as char);
        index = (index - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// Which cells of a sheet are scanned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanRange {
    pub column: u32,
    pub first_row: u32,
}

/// A text cell found by the scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextCell {
    pub reference: String,
    pub text: String,
}

/// Tracks the position of `c` elements, including ones without an `r`
/// attribute whose position follows the previous cell.
#[derive(Debug, Default)]
struct CellCursor {
    row: u32,
    column: u32,
}

impl CellCursor {
    fn enter_row(&mut self, element: &BytesStart<'_>) -> Result<()> {
        self.row = match attribute(element, b"r")? {
            Some(r) => r
                .parse()
                .map_err(|_| Error::CorruptedFile(format!("bad row number '{}'", r)))?,
            None => self.row + 1,
        };
        self.column = 0;
        Ok(())
    }

    fn enter_cell(&mut self, element: &BytesStart<'_>) -> Result<CellRef> {
        let position = match attribute(element, b"r")? {
            Some(r) => CellRef::parse(&r)
                .ok_or_else(|| Error::CorruptedFile(format!("bad cell reference '{}'", r)))?,
            None => CellRef {
                column: self.column + 1,
                row: self.row,
            },
        };
        self.row = position.row;
        self.column = position.column;
        Ok(position)
    }
}

/// How a cell stores its value (`t` attribute).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellKind {
    Shared,
    Inline,
    String,
    Other,
}

impl CellKind {
    fn from_attribute(t: Option<&str>) -> Self {
        match t {
            Some("s") => Self::Shared,
            Some("inlineStr") => Self::Inline,
            Some("str") => Self::String,
            _ => Self::Other,
        }
    }
}

/// Collect the text cells of `range.column` from `range.first_row` down to
/// the last row present in the sheet.
///
/// Empty cells are skipped, not treated as the end of the data. The
/// declared `<dimension>` is not used as a bound. Only text cells are
/// returned: numbers, booleans, errors and formulas are left alone.
pub fn scan_column(
    xml: &str,
    shared_strings: &[String],
    range: ScanRange,
) -> Result<Vec<TextCell>> {
    let mut reader = Reader::from_str(xml);
    let mut cursor = CellCursor::default();
    let mut cells = Vec::new();

    // State of the cell being read, if it is in the scanned column.
    let mut current: Option<(CellRef, CellKind)> = None;
    let mut has_formula = false;
    let mut value = String::new();
    let mut in_value = false;
    let mut in_inline_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => match local_name(e.name().as_ref()) {
                b"row" => cursor.enter_row(e)?,
                b"c" => {
                    let position = cursor.enter_cell(e)?;
                    if position.column == range.column && position.row >= range.first_row {
                        let kind = CellKind::from_attribute(attribute(e, b"t")?.as_deref());
                        current = Some((position, kind));
                        has_formula = false;
                        value.clear();
                    }
                }
                b"f" if current.is_some() => has_formula = true,
                b"v" if current.is_some() => in_value = true,
                b"t" if current.is_some() => in_inline_text = true,
                _ => {}
            },
            Ok(Event::Empty(ref e)) => match local_name(e.name().as_ref()) {
                b"row" => cursor.enter_row(e)?,
                b"c" => {
                    cursor.enter_cell(e)?;
                }
                b"f" if current.is_some() => has_formula = true,
                _ => {}
            },
            Ok(Event::Text(ref e)) if in_value || in_inline_text => {
                let text = e
                    .unescape()
                    .map_err(|err| Error::XmlError(format!("cell value: {}", err)))?;
                value.push_str(&text);
            }
            Ok(Event::End(ref e)) => match local_name(e.name().as_ref()) {
                b"v" => in_value = false,
                b"t" => in_inline_text = false,
                b"c" => {
                    if let Some((position, kind)) = current.take() {
                        match cell_text(kind, has_formula, &value, shared_strings)? {
                            Some(text) if !text.trim().is_empty() => cells.push(TextCell {
                                reference: position.to_a1(),
                                text,
                            }),
                            _ => {}
                        }
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::XmlError(format!("Error parsing worksheet: {}", e))),
            _ => {}
        }
    }

    Ok(cells)
}

fn cell_text(
    kind: CellKind,
    has_formula: bool,
    value: &str,
    shared_strings: &[String],
) -> Result<Option<String>> {
    if has_formula {
        return Ok(None);
    }

    match kind {
        CellKind::Shared => {
            let index: usize = value
                .trim()
                .parse()
                .map_err(|_| Error::CorruptedFile(format!("bad shared string index '{}'", value)))?;
            shared_strings
                .get(index)
                .cloned()
                .map(Some)
                .ok_or_else(|| {
                    Error::CorruptedFile(format!("shared string {} out of range", index))
                })
        }
        CellKind::Inline | CellKind::String => Ok(Some(value.to_string())),
        CellKind::Other => Ok(None),
    }
}

/// Rewrite the sheet, replacing the value of each cell in `edits` (keyed by
/// A1 reference) with an inline string. Cell styles are kept.
pub fn rewrite_cells(xml: &str, edits: &HashMap<String, String>) -> Result<Vec<u8>> {
    let mut reader = Reader::from_str(xml);
    let mut out = XmlOutput::new();
    let mut cursor = CellCursor::default();
    let mut skip_depth = 0usize;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| Error::XmlError(format!("Error parsing worksheet: {}", e)))?;

        if skip_depth > 0 {
            match event {
                Event::Start(_) => skip_depth += 1,
                Event::End(_) => skip_depth -= 1,
                Event::Eof => return Err(Error::CorruptedFile("unterminated cell".to_string())),
                _ => {}
            }
            continue;
        }

        match &event {
            Event::Start(e) | Event::Empty(e) if local_name(e.name().as_ref()) == b"row" => {
                cursor.enter_row(e)?;
            }
            Event::Start(e) | Event::Empty(e) if local_name(e.name().as_ref()) == b"c" => {
                let position = cursor.enter_cell(e)?;
                if let Some(text) = edits.get(&position.to_a1()) {
                    write_inline_cell(e, position, text, &mut out)?;
                    if matches!(event, Event::Start(_)) {
                        skip_depth = 1;
                    }
                    continue;
                }
            }
            Event::Eof => break,
            _ => {}
        }

        out.write(event)?;
    }

    Ok(out.into_bytes())
}

fn write_inline_cell(
    original: &BytesStart<'_>,
    position: CellRef,
    text: &str,
    out: &mut XmlOutput,
) -> Result<()> {
    let element_name = String::from_utf8_lossy(original.name().as_ref()).into_owned();
    let name = |local: &str| match prefix(original.name().as_ref()) {
        Some(p) => format!("{}:{}", String::from_utf8_lossy(p), local),
        None => local.to_string(),
    };

    let mut cell = BytesStart::new(element_name.as_str());
    cell.push_attribute(("r", position.to_a1().as_str()));
    for attr in original.attributes().flatten() {
        if matches!(attr.key.as_ref(), b"r" | b"t") {
            continue;
        }
        cell.push_attribute(attr);
    }
    cell.push_attribute(("t", "inlineStr"));

    let is_name = name("is");
    let t_name = name("t");
    let mut t = BytesStart::new(t_name.as_str());
    t.push_attribute(("xml:space", "preserve"));

    out.write(Event::Start(cell))?;
    out.write(Event::Start(BytesStart::new(is_name.as_str())))?;
    out.write(Event::Start(t))?;
    out.write(Event::Text(BytesText::new(text)))?;
    out.write(Event::End(BytesEnd::new(t_name.as_str())))?;
    out.write(Event::End(BytesEnd::new(is_name.as_str())))?;
    out.write(Event::End(BytesEnd::new(element_name.as_str())))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const COLUMN_B: ScanRange = ScanRange {
        column: 2,
        first_row: 2,
    };

    const SHEET: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><dimension ref="A1:C7"/><sheetData>
<row r="1"><c r="A1" t="s"><v>0</v></c><c r="B1" t="s"><v>0</v></c></row>
<row r="2"><c r="A2"><v>1</v></c><c r="B2" t="s" s="4"><v>1</v></c></row>
<row r="3"><c r="B3" t="s"><v>2</v></c></row>
<row r="5"><c r="B5" t="inlineStr"><is><t>Inline &amp; text</t></is></c></row>
<row r="6"><c r="B6"><v>42</v></c><c r="C6" t="s"><v>1</v></c></row>
<row r="7"><c r="B7" t="str"><f>A1&amp;"x"</f><v>Titlex</v></c></row>
</sheetData></worksheet>"#;

    fn shared() -> Vec<String> {
        vec!["Title".to_string(), "Hello".to_string(), "#next".to_string()]
    }

    #[test]
    fn test_cell_ref() {
        assert_eq!(CellRef::parse("B2"), Some(CellRef { column: 2, row: 2 }));
        assert_eq!(CellRef::parse("$AA$10"), Some(CellRef { column: 27, row: 10 }));
        assert_eq!(CellRef::parse("B0"), None);
        assert_eq!(CellRef::parse("2B"), None);
        assert_eq!(CellRef { column: 28, row: 3 }.to_a1(), "AB3");
        assert_eq!(column_letters(702), "ZZ");
        assert_eq!(column_index("zz"), Some(702));
    }

    #[test]
    fn test_scan_column_b_from_row_two() {
        let cells = scan_column(SHEET, &shared(), COLUMN_B).unwrap();
        assert_eq!(
            cells,
            vec![
                TextCell { reference: "B2".to_string(), text: "Hello".to_string() },
                TextCell { reference: "B3".to_string(), text: "#next".to_string() },
                TextCell { reference: "B5".to_string(), text: "Inline & text".to_string() },
            ]
        );
    }

    #[test]
    fn test_scan_continues_past_gaps() {
        let xml = r#"<worksheet><dimension ref="A1:B9"/><sheetData><row r="2"><c r="B2" t="inlineStr"><is><t>one</t></is></c></row><row r="3"><c r="B3" t="inlineStr"><is><t>  </t></is></c></row><row r="4"><c r="B4" t="inlineStr"><is><t>two</t></is></c></row><row r="9"><c r="B9" t="inlineStr"><is><t>three</t></is></c></row></sheetData></worksheet>"#;
        let cells = scan_column(xml, &[], COLUMN_B).unwrap();
        let refs: Vec<&str> = cells.iter().map(|c| c.reference.as_str()).collect();
        assert_eq!(refs, vec!["B2", "B4", "B9"]);
    }

    #[test]
    fn test_scan_ignores_stale_dimension() {
        let xml = r#"<worksheet><dimension ref="A1"/><sheetData><row r="2"><c r="B2" t="inlineStr"><is><t>first</t></is></c></row><row r="3"><c r="B3" t="inlineStr"><is><t>second</t></is></c></row></sheetData></worksheet>"#;
        let cells = scan_column(xml, &[], COLUMN_B).unwrap();
        assert_eq!(
            cells,
            vec![
                TextCell { reference: "B2".to_string(), text: "first".to_string() },
                TextCell { reference: "B3".to_string(), text: "second".to_string() },
            ]
        );
    }

    #[test]
    fn test_scan_without_references_or_dimension() {
        let xml = r#"<worksheet><sheetData><row><c t="inlineStr"><is><t>A1</t></is></c></row><row><c t="inlineStr"><is><t>A2</t></is></c><c t="inlineStr"><is><t>B2</t></is></c></row></sheetData></worksheet>"#;
        let cells = scan_column(xml, &[], COLUMN_B).unwrap();
        assert_eq!(cells, vec![TextCell { reference: "B2".to_string(), text: "B2".to_string() }]);
    }

    #[test]
    fn test_scan_rejects_bad_shared_index() {
        let xml = r#"<worksheet><sheetData><row r="2"><c r="B2" t="s"><v>7</v></c></row></sheetData></worksheet>"#;
        assert!(matches!(scan_column(xml, &shared(), COLUMN_B), Err(Error::CorruptedFile(_))));
    }

    #[test]
    fn test_rewrite_cells() {
        let mut edits = HashMap::new();
        edits.insert("B2".to_string(), "Hallo <Welt>".to_string());
        edits.insert("B5".to_string(), "Eingebettet".to_string());

        let rewritten = String::from_utf8(rewrite_cells(SHEET, &edits).unwrap()).unwrap();

        assert!(rewritten.contains(
            r#"<c r="B2" s="4" t="inlineStr"><is><t xml:space="preserve">Hallo &lt;Welt&gt;</t></is></c>"#
        ), "{}", rewritten);
        assert!(rewritten.contains(
            r#"<c r="B5" t="inlineStr"><is><t xml:space="preserve">Eingebettet</t></is></c>"#
        ));
        // Untouched cells are byte-identical.
        assert!(rewritten.contains(r#"<c r="B3" t="s"><v>2</v></c>"#));
        assert!(rewritten.contains(r#"<c r="B1" t="s"><v>0</v></c>"#));
        assert!(rewritten
            .starts_with(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#));

        let shared = shared();
        let cells = scan_column(&rewritten, &shared, COLUMN_B).unwrap();
        assert_eq!(cells[0].text, "Hallo <Welt>");
        assert_eq!(cells[2].text, "Eingebettet");
    }
}
