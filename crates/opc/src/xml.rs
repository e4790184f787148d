//! Small helpers shared by the XML part readers and writers.

use pptrans_core::{Error, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Writer;
use std::io::Cursor;

/// Extract the local name from a potentially namespaced XML element name.
pub fn local_name(name: &[u8]) -> &[u8] {
    if let Some(pos) = name.iter().position(|&b| b == b':') {
        &name[pos + 1..]
    } else {
        name
    }
}

/// Namespace prefix of an element name (`a:p` → `a`), if any.
pub fn prefix(name: &[u8]) -> Option<&[u8]> {
    name.iter().position(|&b| b == b':').map(|pos| &name[..pos])
}

/// Unescaped value of the attribute whose (local) name is `key`.
pub fn attribute(element: &BytesStart<'_>, key: &[u8]) -> Result<Option<String>> {
    for attr in element.attributes().flatten() {
        if attr.key.as_ref() == key || local_name(attr.key.as_ref()) == key {
            let value = attr
                .unescape_value()
                .map_err(|e| Error::XmlError(format!("bad attribute value: {}", e)))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

/// Buffers rewritten XML events.
pub struct XmlOutput {
    writer: Writer<Cursor<Vec<u8>>>,
}

impl XmlOutput {
    pub fn new() -> Self {
        Self {
            writer: Writer::new(Cursor::new(Vec::new())),
        }
    }

    pub fn write(&mut self, event: Event<'_>) -> Result<()> {
        self.writer
            .write_event(event)
            .map_err(|e| Error::XmlError(format!("failed to write XML: {}", e)))
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.writer.into_inner().into_inner()
    }
}

impl Default for XmlOutput {
    fn default() -> Self {
        Self::new()
    }
}
