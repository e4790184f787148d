//! Shared string table (`xl/sharedStrings.xml`).

use pptrans_core::{Error, Result};
use pptrans_opc::xml::local_name;
use quick_xml::events::Event;
use quick_xml::Reader;

/// Parse the shared string table into plain strings.
///
/// Rich-text runs are concatenated; phonetic hints (`rPh`) are dropped.
pub fn parse_shared_strings(xml: &str) -> Result<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    let mut strings = Vec::new();

    let mut current: Option<String> = None;
    let mut in_text = false;
    let mut phonetic_depth = 0usize;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => match local_name(e.name().as_ref()) {
                b"si" => current = Some(String::new()),
                b"rPh" => phonetic_depth += 1,
                b"t" => in_text = phonetic_depth == 0,
                _ => {}
            },
            Ok(Event::Empty(ref e)) if local_name(e.name().as_ref()) == b"si" => {
                strings.push(String::new());
            }
            Ok(Event::Text(ref e)) if in_text => {
                if let Some(s) = current.as_mut() {
                    let text = e
                        .unescape()
                        .map_err(|err| Error::XmlError(format!("shared string: {}", err)))?;
                    s.push_str(&text);
                }
            }
            Ok(Event::End(ref e)) => match local_name(e.name().as_ref()) {
                b"si" => strings.extend(current.take()),
                b"rPh" => phonetic_depth = phonetic_depth.saturating_sub(1),
                b"t" => in_text = false,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::XmlError(format!("Error parsing shared strings: {}", e))),
            _ => {}
        }
    }

    Ok(strings)
}
