//! Relationship (`.rels`) parts.

use crate::xml::{attribute, local_name};
use pptrans_core::{Error, Result};
use quick_xml::events::Event;
use quick_xml::Reader;

/// Relationship type suffixes used by the backends.
pub mod types {
    pub const SLIDE: &str = "/slide";
    pub const SLIDE_LAYOUT: &str = "/slideLayout";
    pub const SLIDE_MASTER: &str = "/slideMaster";
    pub const THEME: &str = "/theme";
    pub const WORKSHEET: &str = "/worksheet";
    pub const SHARED_STRINGS: &str = "/sharedStrings";
    pub const OFFICE_DOCUMENT: &str = "/officeDocument";
}

/// One relationship of a source part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub id: String,
    pub rel_type: String,
    /// Target resolved to a package part name (no leading slash).
    pub target: String,
    pub external: bool,
}

impl Relationship {
    /// Whether the relationship type ends with `suffix` (e.g. `/slide`).
    pub fn is(&self, suffix: &str) -> bool {
        self.rel_type.ends_with(suffix)
    }
}

/// Parse a relationships part belonging to `source_part`.
pub fn parse_relationships(xml: &str, source_part: &str) -> Result<Vec<Relationship>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut relationships = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                if local_name(e.name().as_ref()) == b"Relationship" =>
            {
                let id = attribute(e, b"Id")?.unwrap_or_default();
                let rel_type = attribute(e, b"Type")?.unwrap_or_default();
                let raw_target = attribute(e, b"Target")?.unwrap_or_default();
                let external = attribute(e, b"TargetMode")?.as_deref() == Some("External");

                let target = if external {
                    raw_target
                } else {
                    resolve_target(source_part, &raw_target)
                };

                relationships.push(Relationship {
                    id,
                    rel_type,
                    target,
                    external,
                });
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::XmlError(format!(
                    "Error parsing relationships of '{}': {}",
                    source_part, e
                )));
            }
            _ => {}
        }
    }

    Ok(relationships)
}

/// Resolve a relationship target against the directory of its source part.
pub fn resolve_target(source_part: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }

    let mut segments: Vec<&str> = match source_part.rsplit_once('/') {
        Some((dir, _)) => dir.split('/').collect(),
        None => Vec::new(),
    };

    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }

    segments.join("/")
}
