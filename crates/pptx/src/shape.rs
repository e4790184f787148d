//! Reading and rewriting the text of a single `p:sp` shape.
//!
//! A shape is buffered as a flat list of XML events. Reading walks the list
//! to recover the shape's identity, alt text, font and plain text.
//! Rewriting replays the list, swapping the paragraphs of the text body for
//! the translated text and forcing shrink-on-overflow auto-fit.

use crate::styles::{
    apply_latin, font_from_props, inherit, ListStyleReader, PlaceholderKind, StyleContext,
};
use pptrans_core::{Error, FontInfo, Fragment, Result};
use pptrans_opc::xml::{attribute, local_name, prefix, XmlOutput};
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};

/// Auto-fit elements that may appear inside `a:bodyPr`.
const AUTOFIT_ELEMENTS: &[&[u8]] = &[b"noAutofit", b"normAutofit", b"spAutoFit"];

/// `a:bodyPr` children that must come after the auto-fit element.
const AFTER_AUTOFIT: &[&[u8]] = &[b"scene3d", b"sp3d", b"flatTx", b"extLst"];

/// What the text body of a shape declares.
#[derive(Debug, Default)]
pub struct ShapeText {
    pub id: u32,
    pub name: String,
    pub alt_text: Option<String>,
    pub has_text_body: bool,
    pub text: String,
    pub font: FontInfo,
    /// Placeholder kind from `p:ph`, if the shape is a placeholder.
    pub placeholder: Option<PlaceholderKind>,
    /// DrawingML prefix used inside the text body (usually `a`).
    drawing_prefix: Option<String>,
    /// Paragraph properties of the first paragraph, kept on rewrite.
    first_paragraph_props: Vec<Event<'static>>,
}

impl ShapeText {
    /// Recover the text and properties of a buffered shape.
    ///
    /// The font is the one in effect for the first run of the first
    /// paragraph, following inheritance through `styles`.
    pub fn read(events: &[Event<'static>], styles: &StyleContext<'_>) -> Result<Self> {
        let mut shape = ShapeText::default();
        let mut stack: Vec<Vec<u8>> = Vec::new();

        let mut paragraphs = 0usize;
        let mut level = 1u8;
        let mut in_text = false;
        let mut capturing_props = 0usize;
        let mut list_depth = 0usize;
        let mut list_style = ListStyleReader::default();
        let mut run_font: Option<FontInfo> = None;
        let mut end_para_font: Option<FontInfo> = None;
        let mut current_props: Option<FontInfo> = None;

        for event in events {
            if list_depth > 0 {
                match event {
                    Event::Start(_) => list_depth += 1,
                    Event::End(_) => list_depth -= 1,
                    _ => {}
                }
                if list_depth > 0 {
                    list_style.feed(event)?;
                }
                continue;
            }

            match event {
                Event::Start(e) | Event::Empty(e) => {
                    let is_empty = matches!(event, Event::Empty(_));
                    let local = local_name(e.name().as_ref()).to_vec();
                    let parent = stack.last().map(|p| p.as_slice());

                    if capturing_props > 0 {
                        shape.first_paragraph_props.push(event.clone());
                        if !is_empty {
                            capturing_props += 1;
                        }
                        continue;
                    }

                    match (local.as_slice(), parent) {
                        (b"cNvPr", Some(b"nvSpPr")) => {
                            shape.id =
                                attribute(e, b"id")?.and_then(|v| v.parse().ok()).unwrap_or(0);
                            shape.name = attribute(e, b"name")?.unwrap_or_default();
                            shape.alt_text = attribute(e, b"descr")?;
                        }
                        (b"ph", Some(b"nvPr")) => {
                            let ph_type = attribute(e, b"type")?;
                            shape.placeholder =
                                Some(PlaceholderKind::from_type(ph_type.as_deref()));
                        }
                        (b"txBody", _) => {
                            shape.has_text_body = true;
                        }
                        (b"lstStyle", Some(b"txBody")) if !is_empty => {
                            list_depth = 1;
                            continue;
                        }
                        (b"bodyPr", Some(b"txBody")) => {
                            shape.drawing_prefix = prefix(e.name().as_ref())
                                .map(|p| String::from_utf8_lossy(p).into_owned());
                        }
                        (b"p", Some(b"txBody")) => {
                            if paragraphs > 0 {
                                shape.text.push('\n');
                            }
                            paragraphs += 1;
                        }
                        (b"pPr", Some(b"p")) if paragraphs == 1 => {
                            level = attribute(e, b"lvl")?
                                .and_then(|v| v.parse::<u8>().ok())
                                .map_or(1, |lvl| lvl.saturating_add(1));
                            shape.first_paragraph_props.push(event.clone());
                            if !is_empty {
                                capturing_props = 1;
                                continue;
                            }
                        }
                        (b"br", Some(b"p")) => {
                            shape.text.push('\n');
                        }
                        (b"t", _) => {
                            in_text = !is_empty;
                        }
                        (b"rPr", Some(b"r")) if run_font.is_none() => {
                            current_props = Some(font_from_props(e)?);
                            if is_empty {
                                run_font = current_props.take();
                            }
                        }
                        (b"endParaRPr", _) if end_para_font.is_none() => {
                            current_props = Some(font_from_props(e)?);
                            if is_empty {
                                end_para_font = current_props.take();
                            }
                        }
                        (b"latin", Some(b"rPr")) | (b"latin", Some(b"endParaRPr")) => {
                            if let Some(props) = current_props.as_mut() {
                                apply_latin(props, e)?;
                            }
                        }
                        _ => {}
                    }

                    if !is_empty {
                        stack.push(local);
                    }
                }
                Event::End(e) => {
                    if capturing_props > 0 {
                        shape.first_paragraph_props.push(event.clone());
                        capturing_props -= 1;
                        continue;
                    }

                    match local_name(e.name().as_ref()) {
                        b"t" => in_text = false,
                        b"rPr" if run_font.is_none() => run_font = current_props.take(),
                        b"endParaRPr" if end_para_font.is_none() => {
                            end_para_font = current_props.take()
                        }
                        _ => {}
                    }
                    stack.pop();
                }
                Event::Text(t) if in_text => {
                    let text = t
                        .unescape()
                        .map_err(|err| Error::XmlError(format!("shape text: {}", err)))?;
                    shape.text.push_str(&text);
                }
                Event::CData(t) if in_text => {
                    shape.text.push_str(&String::from_utf8_lossy(t));
                }
                _ => {}
            }
        }

        let list_style = list_style.finish();
        shape.font = resolve_font(
            [run_font, end_para_font, list_style.get(level)],
            styles,
            shape.placeholder,
            level,
        );
        Ok(shape)
    }

    /// Build the fragment handed to the translation pipeline.
    pub fn to_fragment(&self, slide: usize) -> Fragment {
        let mut fragment = Fragment::shape(slide, self.id, self.name.clone(), self.text.clone())
            .with_font(self.font.clone());
        if let Some(alt_text) = &self.alt_text {
            fragment = fragment.with_alt_text(alt_text.clone());
        }
        fragment
    }

    /// Replay the shape with its paragraphs replaced by `text`.
    ///
    /// Run-level formatting is dropped; each line of `text` becomes one
    /// paragraph carrying the first paragraph's properties. The body is
    /// switched to shrink-on-overflow auto-fit.
    pub fn rewrite(
        &self,
        events: &[Event<'static>],
        text: &str,
        out: &mut XmlOutput,
    ) -> Result<()> {
        let autofit_name = self.element_name("normAutofit");
        let mut stack: Vec<Vec<u8>> = Vec::new();
        let mut skip_depth = 0usize;
        let mut autofit_written = false;
        let mut paragraphs_written = false;

        for event in events {
            match event {
                Event::Start(e) | Event::Empty(e) => {
                    let is_empty = matches!(event, Event::Empty(_));
                    if skip_depth > 0 {
                        if !is_empty {
                            skip_depth += 1;
                        }
                        continue;
                    }

                    let local = local_name(e.name().as_ref()).to_vec();
                    let parent = stack.last().map(|p| p.as_slice());

                    match (local.as_slice(), parent) {
                        (name, Some(b"bodyPr")) if AUTOFIT_ELEMENTS.contains(&name) => {
                            if !is_empty {
                                skip_depth = 1;
                            }
                            continue;
                        }
                        (name, Some(b"bodyPr"))
                            if AFTER_AUTOFIT.contains(&name) && !autofit_written =>
                        {
                            out.write(Event::Empty(BytesStart::new(autofit_name.as_str())))?;
                            autofit_written = true;
                        }
                        (b"bodyPr", Some(b"txBody")) if is_empty => {
                            let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                            out.write(Event::Start(e.clone()))?;
                            out.write(Event::Empty(BytesStart::new(autofit_name.as_str())))?;
                            out.write(Event::End(BytesEnd::new(name)))?;
                            autofit_written = true;
                            continue;
                        }
                        (b"p", Some(b"txBody")) => {
                            if !paragraphs_written {
                                self.write_paragraphs(text, out)?;
                                paragraphs_written = true;
                            }
                            if !is_empty {
                                skip_depth = 1;
                            }
                            continue;
                        }
                        _ => {}
                    }

                    out.write(event.clone())?;
                    if !is_empty {
                        stack.push(local);
                    }
                }
                Event::End(e) => {
                    if skip_depth > 0 {
                        skip_depth -= 1;
                        continue;
                    }

                    match local_name(e.name().as_ref()) {
                        b"bodyPr" if !autofit_written => {
                            out.write(Event::Empty(BytesStart::new(autofit_name.as_str())))?;
                            autofit_written = true;
                        }
                        b"txBody" if !paragraphs_written => {
                            self.write_paragraphs(text, out)?;
                            paragraphs_written = true;
                        }
                        _ => {}
                    }

                    stack.pop();
                    out.write(event.clone())?;
                }
                _ if skip_depth > 0 => {}
                _ => out.write(event.clone())?,
            }
        }

        Ok(())
    }

    fn write_paragraphs(&self, text: &str, out: &mut XmlOutput) -> Result<()> {
        let p = self.element_name("p");
        let r = self.element_name("r");
        let t = self.element_name("t");

        for line in text.split(['\n', '\u{000B}']) {
            let line = line.trim_end_matches('\r');

            out.write(Event::Start(BytesStart::new(p.as_str())))?;
            for event in &self.first_paragraph_props {
                out.write(event.clone())?;
            }
            if !line.is_empty() {
                out.write(Event::Start(BytesStart::new(r.as_str())))?;
                out.write(Event::Start(BytesStart::new(t.as_str())))?;
                out.write(Event::Text(BytesText::new(line)))?;
                out.write(Event::End(BytesEnd::new(t.as_str())))?;
                out.write(Event::End(BytesEnd::new(r.as_str())))?;
            }
            out.write(Event::End(BytesEnd::new(p.as_str())))?;
        }

        Ok(())
    }

    fn element_name(&self, local: &str) -> String {
        match self.drawing_prefix.as_deref() {
            Some(prefix) if !prefix.is_empty() => format!("{}:{}", prefix, local),
            _ => local.to_string(),
        }
    }
}

/// Pick the effective font from `declared` (first run, end-of-paragraph
/// properties, the shape's list style) in order, then what the slide
/// inherits, then the theme font. Theme references are resolved last.
fn resolve_font(
    declared: [Option<FontInfo>; 3],
    styles: &StyleContext<'_>,
    placeholder: Option<PlaceholderKind>,
    level: u8,
) -> FontInfo {
    let mut font = FontInfo::default();
    for source in declared.iter() {
        inherit(&mut font, source.as_ref());
    }
    inherit(&mut font, styles.inherited(placeholder, level).as_ref());

    font.typeface = match font.typeface {
        Some(typeface) => Some(styles.theme.resolve(&typeface)),
        None => styles.theme_font(placeholder),
    };
    font
}
