//! Inherited text formatting: list styles, master text styles and the
//! presentation's default text style.
//!
//! A run without its own typeface takes the one declared for its paragraph
//! level by the shape's `a:lstStyle`, then by the slide master (for
//! placeholders) or the presentation default (for other shapes), and
//! finally the theme font.

use crate::theme::ThemeFonts;
use pptrans_core::{Error, FontInfo, Result};
use pptrans_opc::xml::{attribute, local_name};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::BTreeMap;

/// Which master text style a placeholder draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderKind {
    Title,
    Body,
    Other,
}

impl PlaceholderKind {
    /// Map the `type` of a `p:ph` element. A placeholder without a type is
    /// a content (body) placeholder.
    pub fn from_type(ph_type: Option<&str>) -> Self {
        match ph_type {
            Some("title") | Some("ctrTitle") => Self::Title,
            None | Some("body") | Some("subTitle") | Some("obj") => Self::Body,
            Some(_) => Self::Other,
        }
    }
}

/// Default run properties per paragraph level (1-9). Level 0 holds the
/// `a:defPPr` defaults that apply to every level.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListStyle {
    levels: BTreeMap<u8, FontInfo>,
}

impl ListStyle {
    /// Font declared for `level`, completed from the style-wide defaults.
    pub fn get(&self, level: u8) -> Option<FontInfo> {
        let mut font = self.levels.get(&level).cloned();
        if let Some(defaults) = self.levels.get(&0) {
            let font = font.get_or_insert_with(FontInfo::default);
            inherit(font, Some(defaults));
        }
        font
    }
}

/// Builds a [`ListStyle`] from the events inside a list style element
/// (`a:lstStyle`, `p:titleStyle`, `p:defaultTextStyle`, ...).
#[derive(Debug, Default)]
pub struct ListStyleReader {
    style: ListStyle,
    level: Option<u8>,
    current: Option<FontInfo>,
}

impl ListStyleReader {
    pub fn feed(&mut self, event: &Event<'_>) -> Result<()> {
        match event {
            Event::Start(e) | Event::Empty(e) => {
                let is_empty = matches!(event, Event::Empty(_));
                let name = e.name();
                let local = local_name(name.as_ref());

                if let Some(level) = paragraph_level(local) {
                    self.level = (!is_empty).then_some(level);
                } else if local == b"defRPr" && self.level.is_some() {
                    let font = font_from_props(e)?;
                    if is_empty {
                        self.store(font);
                    } else {
                        self.current = Some(font);
                    }
                } else if local == b"latin" {
                    if let Some(font) = self.current.as_mut() {
                        apply_latin(font, e)?;
                    }
                }
            }
            Event::End(e) => {
                let name = e.name();
                let local = local_name(name.as_ref());
                if local == b"defRPr" {
                    if let Some(font) = self.current.take() {
                        self.store(font);
                    }
                } else if paragraph_level(local).is_some() {
                    self.level = None;
                }
            }
            _ => {}
        }
        Ok(())
    }

    pub fn finish(self) -> ListStyle {
        self.style
    }

    fn store(&mut self, font: FontInfo) {
        if let Some(level) = self.level {
            self.style.levels.insert(level, font);
        }
    }
}

/// `lvl3pPr` → 3, `defPPr` → 0.
fn paragraph_level(local: &[u8]) -> Option<u8> {
    if local == b"defPPr" {
        return Some(0);
    }
    match local {
        [b'l', b'v', b'l', digit @ b'1'..=b'9', b'p', b'P', b'r'] => Some(digit - b'0'),
        _ => None,
    }
}

/// Text styles of a slide master (`p:txStyles`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MasterStyles {
    pub title: ListStyle,
    pub body: ListStyle,
    pub other: ListStyle,
}

impl MasterStyles {
    pub fn parse(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        let mut styles = MasterStyles::default();
        let mut active: Option<(PlaceholderKind, ListStyleReader)> = None;

        loop {
            let event = reader
                .read_event()
                .map_err(|e| Error::XmlError(format!("Error parsing slide master: {}", e)))?;

            match &event {
                Event::Start(e) if active.is_none() => {
                    active = match local_name(e.name().as_ref()) {
                        b"titleStyle" => Some((PlaceholderKind::Title, ListStyleReader::default())),
                        b"bodyStyle" => Some((PlaceholderKind::Body, ListStyleReader::default())),
                        b"otherStyle" => Some((PlaceholderKind::Other, ListStyleReader::default())),
                        _ => None,
                    };
                }
                Event::End(e)
                    if matches!(
                        local_name(e.name().as_ref()),
                        b"titleStyle" | b"bodyStyle" | b"otherStyle"
                    ) =>
                {
                    if let Some((kind, style)) = active.take() {
                        *styles.style_mut(kind) = style.finish();
                    }
                }
                Event::Eof => break,
                _ => {
                    if let Some((_, style)) = active.as_mut() {
                        style.feed(&event)?;
                    }
                }
            }
        }

        Ok(styles)
    }

    pub fn style(&self, kind: PlaceholderKind) -> &ListStyle {
        match kind {
            PlaceholderKind::Title => &self.title,
            PlaceholderKind::Body => &self.body,
            PlaceholderKind::Other => &self.other,
        }
    }

    fn style_mut(&mut self, kind: PlaceholderKind) -> &mut ListStyle {
        match kind {
            PlaceholderKind::Title => &mut self.title,
            PlaceholderKind::Body => &mut self.body,
            PlaceholderKind::Other => &mut self.other,
        }
    }
}

/// The presentation's `p:defaultTextStyle`, used by shapes that are not
/// placeholders.
pub fn parse_default_text_style(presentation_xml: &str) -> Result<ListStyle> {
    let mut reader = Reader::from_str(presentation_xml);
    let mut style: Option<ListStyleReader> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| Error::XmlError(format!("Error parsing presentation: {}", e)))?;

        match &event {
            Event::Start(e) if local_name(e.name().as_ref()) == b"defaultTextStyle" => {
                style = Some(ListStyleReader::default());
            }
            Event::End(e) if local_name(e.name().as_ref()) == b"defaultTextStyle" => break,
            Event::Eof => break,
            _ => {
                if let Some(style) = style.as_mut() {
                    style.feed(&event)?;
                }
            }
        }
    }

    Ok(style.map(ListStyleReader::finish).unwrap_or_default())
}

/// Everything a shape on one slide inherits its font from.
#[derive(Debug, Clone, Copy)]
pub struct StyleContext<'a> {
    pub theme: &'a ThemeFonts,
    pub master: Option<&'a MasterStyles>,
    pub defaults: Option<&'a ListStyle>,
}

impl<'a> StyleContext<'a> {
    /// A context with only theme fonts.
    pub fn new(theme: &'a ThemeFonts) -> Self {
        Self {
            theme,
            master: None,
            defaults: None,
        }
    }

    /// Font a shape inherits for `level`, theme references not yet resolved.
    pub fn inherited(&self, placeholder: Option<PlaceholderKind>, level: u8) -> Option<FontInfo> {
        match placeholder {
            Some(kind) => self.master.and_then(|m| m.style(kind).get(level)),
            None => self.defaults.and_then(|d| d.get(level)),
        }
    }

    /// Theme font used when nothing else declares a typeface.
    pub fn theme_font(&self, placeholder: Option<PlaceholderKind>) -> Option<String> {
        match placeholder {
            Some(PlaceholderKind::Title) => self.theme.major.clone(),
            _ => self.theme.minor.clone(),
        }
    }
}

/// Fill what `font` lacks from `from`. Typeface and pitch travel together.
pub fn inherit(font: &mut FontInfo, from: Option<&FontInfo>) {
    let Some(from) = from else {
        return;
    };
    if font.typeface.is_none() {
        font.typeface = from.typeface.clone();
        font.pitch_family = from.pitch_family;
    }
    if font.size.is_none() {
        font.size = from.size;
    }
}

/// Size declared on an `a:rPr`, `a:endParaRPr` or `a:defRPr` element.
pub fn font_from_props(element: &BytesStart<'_>) -> Result<FontInfo> {
    Ok(FontInfo {
        typeface: None,
        size: attribute(element, b"sz")?
            .and_then(|v| v.parse::<f32>().ok())
            .map(|hundredths| hundredths / 100.0),
        pitch_family: None,
    })
}

/// Copy typeface and pitch family from an `a:latin` element.
pub fn apply_latin(font: &mut FontInfo, latin: &BytesStart<'_>) -> Result<()> {
    font.typeface = attribute(latin, b"typeface")?.filter(|t| !t.is_empty());
    font.pitch_family = attribute(latin, b"pitchFamily")?
        .and_then(|v| v.parse::<i16>().ok())
        .map(|v| v as u8);
    Ok(())
}
