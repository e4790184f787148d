//! Slide deck documents.

use crate::shape::ShapeText;
use crate::styles::{parse_default_text_style, ListStyle, MasterStyles, StyleContext};
use crate::theme::ThemeFonts;
use pptrans_core::{Document, DocumentFormat, Error, Fragment, Result};
use pptrans_opc::relationships::types;
use pptrans_opc::xml::{local_name, XmlOutput};
use pptrans_opc::{Package, Relationship};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::HashMap;
use std::path::Path;

const PRESENTATION_PART: &str = "ppt/presentation.xml";

/// A slide part and the master it inherits text styles from.
#[derive(Debug, Clone)]
struct Slide {
    part: String,
    master: Option<String>,
}

/// An open `.pptx` slide deck.
pub struct SlideDeck {
    package: Option<Package>,
    slides: Vec<Slide>,
    theme: ThemeFonts,
    masters: HashMap<String, MasterStyles>,
    default_text: ListStyle,
}

impl SlideDeck {
    /// Open a slide deck from disk.
    pub fn open(path: &Path) -> Result<Self> {
        log::debug!("opening slide deck {}", path.display());
        Self::from_package(Package::open(path)?)
    }

    /// Open a slide deck from an already loaded package.
    pub fn from_package(mut package: Package) -> Result<Self> {
        let relationships = package.relationships(PRESENTATION_PART)?;
        let presentation = package.read_part(PRESENTATION_PART)?;
        let slide_parts = slide_order(&presentation, &relationships)?;
        let default_text = parse_default_text_style(&presentation)?;

        let theme = match relationships.iter().find(|r| r.is(types::THEME)) {
            Some(rel) => match package.read_optional_part(&rel.target)? {
                Some(xml) => ThemeFonts::parse(&xml)?,
                None => ThemeFonts::default(),
            },
            None => ThemeFonts::default(),
        };

        let mut slides = Vec::with_capacity(slide_parts.len());
        let mut masters = HashMap::new();
        for part in slide_parts {
            let master = master_part(&mut package, &part)?;
            if let Some(name) = master.as_ref().filter(|m| !masters.contains_key(*m)) {
                let styles = match package.read_optional_part(name)? {
                    Some(xml) => MasterStyles::parse(&xml)?,
                    None => {
                        log::warn!("slide master {} not found", name);
                        MasterStyles::default()
                    }
                };
                masters.insert(name.clone(), styles);
            }
            slides.push(Slide { part, master });
        }

        log::debug!("found {} slides using {} masters", slides.len(), masters.len());

        Ok(Self {
            package: Some(package),
            slides,
            theme,
            masters,
            default_text,
        })
    }

    /// Slide part names in presentation order.
    pub fn slide_parts(&self) -> Vec<&str> {
        self.slides.iter().map(|s| s.part.as_str()).collect()
    }

    fn package_mut(&mut self) -> Result<&mut Package> {
        self.package.as_mut().ok_or(Error::Closed)
    }
}

impl Document for SlideDeck {
    fn format(&self) -> DocumentFormat {
        DocumentFormat::SlideDeck
    }

    fn for_each_fragment(
        &mut self,
        visitor: &mut dyn FnMut(&mut Fragment) -> Result<()>,
    ) -> Result<()> {
        let slides = self.slides.clone();

        for (idx, slide) in slides.iter().enumerate() {
            let xml = self.package_mut()?.read_part(&slide.part)?;
            let styles = StyleContext {
                theme: &self.theme,
                master: slide.master.as_ref().and_then(|m| self.masters.get(m)),
                defaults: Some(&self.default_text),
            };
            if let Some(rewritten) = rewrite_slide(&xml, idx + 1, &styles, visitor)? {
                self.package_mut()?.replace_part(&slide.part, rewritten);
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

/// Walk one slide, handing each text shape to `visitor`.
///
/// Returns the rewritten slide XML when any shape received a replacement.
fn rewrite_slide(
    xml: &str,
    slide_number: usize,
    styles: &StyleContext<'_>,
    visitor: &mut dyn FnMut(&mut Fragment) -> Result<()>,
) -> Result<Option<Vec<u8>>> {
    let mut reader = Reader::from_str(xml);
    let mut out = XmlOutput::new();
    let mut changed = false;

    let mut shape: Vec<Event<'static>> = Vec::new();
    let mut depth = 0usize;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| Error::XmlError(format!("slide {}: {}", slide_number, e)))?;

        if depth > 0 {
            match &event {
                Event::Start(_) => depth += 1,
                Event::End(_) => depth -= 1,
                Event::Eof => {
                    return Err(Error::CorruptedFile(format!(
                        "slide {}: unterminated shape",
                        slide_number
                    )))
                }
                _ => {}
            }
            shape.push(event.into_owned());

            if depth == 0 {
                changed |= visit_shape(&shape, slide_number, styles, visitor, &mut out)?;
                shape.clear();
            }
            continue;
        }

        let starts_shape =
            matches!(&event, Event::Start(e) if local_name(e.name().as_ref()) == b"sp");
        if starts_shape {
            depth = 1;
            shape.push(event.into_owned());
            continue;
        }

        match event {
            Event::Eof => break,
            other => out.write(other)?,
        }
    }

    Ok(changed.then(|| out.into_bytes()))
}

/// Read one buffered shape, let the visitor translate it and write it out.
fn visit_shape(
    events: &[Event<'static>],
    slide_number: usize,
    styles: &StyleContext<'_>,
    visitor: &mut dyn FnMut(&mut Fragment) -> Result<()>,
    out: &mut XmlOutput,
) -> Result<bool> {
    let text = ShapeText::read(events, styles)?;

    if text.has_text_body {
        let mut fragment = text.to_fragment(slide_number);
        visitor(&mut fragment)?;

        if let Some(replacement) = fragment.replacement {
            text.rewrite(events, &replacement, out)?;
            return Ok(true);
        }
    }

    for event in events {
        out.write(event.clone())?;
    }
    Ok(false)
}

/// The slide master behind a slide, found through its layout.
fn master_part(package: &mut Package, slide_part: &str) -> Result<Option<String>> {
    let layout = match package
        .relationships(slide_part)?
        .into_iter()
        .find(|r| r.is(types::SLIDE_LAYOUT))
    {
        Some(rel) => rel.target,
        None => return Ok(None),
    };

    Ok(package
        .relationships(&layout)?
        .into_iter()
        .find(|r| r.is(types::SLIDE_MASTER))
        .map(|rel| rel.target))
}

/// Slide parts in presentation order.
///
/// The order comes from `p:sldIdLst`; decks without one fall back to the
/// numbers in the relationship ids and targets.
fn slide_order(presentation_xml: &str, relationships: &[Relationship]) -> Result<Vec<String>> {
    let mut reader = Reader::from_str(presentation_xml);
    reader.trim_text(true);

    let mut ordered = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                if local_name(e.name().as_ref()) == b"sldId" =>
            {
                if let Some(rid) = rel_id(e) {
                    match relationships.iter().find(|r| r.id == rid) {
                        Some(rel) => ordered.push(rel.target.clone()),
                        None => log::warn!("slide relationship {} not found", rid),
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::XmlError(format!("Error parsing presentation: {}", e)));
            }
            _ => {}
        }
    }

    if !ordered.is_empty() {
        return Ok(ordered);
    }

    let mut slides: Vec<(String, Option<usize>)> = relationships
        .iter()
        .filter(|r| r.is(types::SLIDE))
        .map(|r| {
            let order_num =
                extract_slide_number(&r.target).or_else(|| extract_slide_number(&r.id));
            (r.target.clone(), order_num)
        })
        .collect();

    slides.sort_by(|a, b| match (a.1, b.1) {
        (Some(na), Some(nb)) => na.cmp(&nb),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.0.cmp(&b.0),
    });

    Ok(slides.into_iter().map(|(path, _)| path).collect())
}

/// The `r:id` of a `p:sldId` element (the plain `id` is the slide id).
fn rel_id(element: &quick_xml::events::BytesStart<'_>) -> Option<String> {
    element.attributes().flatten().find_map(|attr| {
        let key = attr.key.as_ref();
        (key != b"id" && local_name(key) == b"id")
            .then(|| String::from_utf8_lossy(&attr.value).into_owned())
    })
}

/// Extract a slide number from a string like "rId2" or "slide3.xml".
fn extract_slide_number(s: &str) -> Option<usize> {
    let s = s.trim_end_matches(".xml").trim_end_matches(".rels");

    let digits: String = s.chars().rev().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    let digits: String = digits.chars().rev().collect();
    digits.parse().ok()
}
