//! Theme font scheme, used to resolve `+mj-lt`/`+mn-lt` typeface references.

use pptrans_core::{Error, Result};
use pptrans_opc::xml::{attribute, local_name};
use quick_xml::events::Event;
use quick_xml::Reader;

/// Latin heading and body fonts of a theme.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThemeFonts {
    /// Heading font (`+mj-*`).
    pub major: Option<String>,
    /// Body font (`+mn-*`).
    pub minor: Option<String>,
}

impl ThemeFonts {
    /// Parse the `a:fontScheme` of a theme part.
    pub fn parse(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        reader.trim_text(true);

        let mut fonts = ThemeFonts::default();
        let mut in_major = false;
        let mut in_minor = false;

        loop {
            match reader.read_event() {
                Ok(Event::Start(ref e)) => match local_name(e.name().as_ref()) {
                    b"majorFont" => in_major = true,
                    b"minorFont" => in_minor = true,
                    _ => {}
                },
                Ok(Event::Empty(ref e)) if local_name(e.name().as_ref()) == b"latin" => {
                    let typeface = attribute(e, b"typeface")?.filter(|t| !t.is_empty());
                    if in_major && fonts.major.is_none() {
                        fonts.major = typeface;
                    } else if in_minor && fonts.minor.is_none() {
                        fonts.minor = typeface;
                    }
                }
                Ok(Event::End(ref e)) => match local_name(e.name().as_ref()) {
                    b"majorFont" => in_major = false,
                    b"minorFont" => in_minor = false,
                    _ => {}
                },
                Ok(Event::Eof) => break,
                Err(e) => return Err(Error::XmlError(format!("Error parsing theme: {}", e))),
                _ => {}
            }
        }

        Ok(fonts)
    }

    /// Resolve a typeface that may be a theme reference.
    ///
    /// `+mj-lt`, `+mj-ea` and `+mj-cs` map to the heading font, the `+mn-*`
    /// forms to the body font. Unresolvable references are returned as is.
    pub fn resolve(&self, typeface: &str) -> String {
        let resolved = if typeface.starts_with("+mj-") {
            self.major.as_ref()
        } else if typeface.starts_with("+mn-") {
            self.minor.as_ref()
        } else {
            None
        };

        resolved.cloned().unwrap_or_else(|| typeface.to_string())
    }
}
