//! Rules deciding which fragments are sent for translation.
//!
//! Cells starting with a control marker are directives, not prose. Shapes
//! set in a monospaced font are treated as source code, shapes set in a
//! math font as equations, and shapes whose alt text is the opt-out
//! sentinel are left alone on request.

use crate::types::{FontInfo, Fragment};
use serde::{Deserialize, Serialize};

/// Leading characters that mark a cell as a directive.
pub const CONTROL_MARKERS: &[char] = &['#', '@', '~'];

/// Alt text that opts a shape out of translation.
pub const OPT_OUT_ALT_TEXT: &str = "@";

/// Typeface substring identifying equation fonts (e.g. "Cambria Math").
pub const EQUATION_FONT_MARKER: &str = "math";

/// Families commonly installed as monospaced fonts.
const KNOWN_MONOSPACED_FAMILIES: &[&str] = &[
    "consolas",
    "courier",
    "courier new",
    "lucida console",
    "lucida sans typewriter",
    "menlo",
    "monaco",
    "andale mono",
    "cascadia code",
    "cascadia mono",
    "dejavu sans mono",
    "liberation mono",
    "source code pro",
    "fira code",
    "fira mono",
    "jetbrains mono",
    "roboto mono",
    "ubuntu mono",
    "inconsolata",
    "sf mono",
    "ibm plex mono",
    "ocr a extended",
];

/// Why a fragment was not translated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SkipReason {
    /// Nothing but whitespace.
    Empty,
    /// Cell value starts with a control marker.
    ControlMarker,
    /// Shape font is monospaced (source code).
    Monospaced,
    /// Shape font is an equation font.
    EquationFont,
    /// Shape alt text equals the opt-out sentinel.
    OptOut,
}

/// Outcome of filtering one fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Send this text to the translator.
    Translate(String),
    /// Leave the fragment untouched.
    Skip(SkipReason),
}

/// Decides whether a font is monospaced.
pub trait MonospacePolicy {
    fn is_monospaced(&self, font: &FontInfo) -> bool;
}

/// Uses what the document declares about the font: the fixed-pitch bits of
/// the OOXML pitch family, otherwise a list of well-known code fonts.
#[derive(Debug, Clone, Copy, Default)]
pub struct FontMetadataPolicy;

impl MonospacePolicy for FontMetadataPolicy {
    fn is_monospaced(&self, font: &FontInfo) -> bool {
        if let Some(pitch_family) = font.pitch_family {
            match pitch_family & 0x03 {
                1 => return true,
                2 => return false,
                _ => {}
            }
        }

        let Some(typeface) = font.typeface.as_deref() else {
            return false;
        };
        let typeface = typeface.trim().to_lowercase();

        KNOWN_MONOSPACED_FAMILIES.contains(&typeface.as_str())
            || typeface.ends_with(" mono")
            || typeface.contains(" mono ")
    }
}

/// Filters fragments before translation.
pub struct FragmentFilter {
    monospace: Box<dyn MonospacePolicy>,
}

impl Default for FragmentFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl FragmentFilter {
    /// Create a filter using the document's font metadata for monospace detection.
    pub fn new() -> Self {
        Self {
            monospace: Box::new(FontMetadataPolicy),
        }
    }

    /// Replace the monospace detection policy.
    pub fn with_monospace_policy(mut self, policy: impl MonospacePolicy + 'static) -> Self {
        self.monospace = Box::new(policy);
        self
    }

    /// Decide what to do with a fragment.
    ///
    /// Cell text is sent as stored; shape text is trimmed first.
    pub fn decide(&self, fragment: &Fragment) -> Decision {
        if fragment.is_cell() {
            return self.decide_cell(&fragment.text);
        }

        if fragment.alt_text.as_deref() == Some(OPT_OUT_ALT_TEXT) {
            return Decision::Skip(SkipReason::OptOut);
        }

        if let Some(font) = &fragment.font {
            if is_equation_font(font) {
                return Decision::Skip(SkipReason::EquationFont);
            }
            if self.monospace.is_monospaced(font) {
                return Decision::Skip(SkipReason::Monospaced);
            }
        }

        let text = fragment.text.trim();
        if text.is_empty() {
            Decision::Skip(SkipReason::Empty)
        } else {
            Decision::Translate(text.to_string())
        }
    }

    fn decide_cell(&self, text: &str) -> Decision {
        if text.trim().is_empty() {
            return Decision::Skip(SkipReason::Empty);
        }
        if is_control_cell(text) {
            return Decision::Skip(SkipReason::ControlMarker);
        }
        Decision::Translate(text.to_string())
    }
}

/// Whether a cell value is a directive (starts with a control marker).
pub fn is_control_cell(text: &str) -> bool {
    text.chars()
        .next()
        .map(|c| CONTROL_MARKERS.contains(&c))
        .unwrap_or(false)
}

/// Whether the typeface looks like an equation font.
pub fn is_equation_font(font: &FontInfo) -> bool {
    font.typeface
        .as_deref()
        .map(|name| name.to_lowercase().contains(EQUATION_FONT_MARKER))
        .unwrap_or(false)
}

#[cfg(feature = "glyph-metrics")]
pub use glyph::GlyphWidthPolicy;

#[cfg(feature = "glyph-metrics")]
mod glyph {
    use super::{FontMetadataPolicy, MonospacePolicy};
    use crate::types::FontInfo;
    use font_kit::family_name::FamilyName;
    use font_kit::properties::Properties;
    use font_kit::source::SystemSource;

    /// Point size assumed when the document declares none.
    const DEFAULT_SIZE_PT: f32 = 18.0;

    /// Compares the rendered widths of a narrow and a wide glyph in the
    /// installed font at the fragment's size, in whole pixels at 96 dpi.
    /// Equal widths mean monospaced. Falls back to the document metadata
    /// when the font is not installed.
    pub struct GlyphWidthPolicy {
        source: SystemSource,
        fallback: FontMetadataPolicy,
    }

    impl GlyphWidthPolicy {
        pub fn new() -> Self {
            Self {
                source: SystemSource::new(),
                fallback: FontMetadataPolicy,
            }
        }

        fn measure(&self, family: &str, size_pt: f32) -> Option<bool> {
            let handle = self
                .source
                .select_best_match(&[FamilyName::Title(family.to_string())], &Properties::new())
                .ok()?;
            let font = handle.load().ok()?;

            let units_per_em = font.metrics().units_per_em as f32;
            if units_per_em <= 0.0 {
                return None;
            }
            let pixels_per_unit = size_pt * 96.0 / 72.0 / units_per_em;

            let narrow = font.advance(font.glyph_for_char('i')?).ok()?.x() * pixels_per_unit;
            let wide = font.advance(font.glyph_for_char('W')?).ok()?.x() * pixels_per_unit;
            Some(narrow.round() == wide.round())
        }
    }

    impl Default for GlyphWidthPolicy {
        fn default() -> Self {
            Self::new()
        }
    }

    impl MonospacePolicy for GlyphWidthPolicy {
        fn is_monospaced(&self, font: &FontInfo) -> bool {
            let size = font.size.filter(|s| *s > 0.0).unwrap_or(DEFAULT_SIZE_PT);
            match font.typeface.as_deref().and_then(|name| self.measure(name, size)) {
                Some(monospaced) => monospaced,
                None => {
                    log::debug!("font {:?} not measurable, using metadata", font.typeface);
                    self.fallback.is_monospaced(font)
                }
            }
        }
    }
}

#[cfg(all(test, feature = "glyph-metrics"))]
mod glyph_tests {
    use super::*;

    fn font(typeface: &str, pitch_family: Option<u8>) -> FontInfo {
        FontInfo {
            typeface: Some(typeface.to_string()),
            size: Some(24.0),
            pitch_family,
        }
    }

    #[test]
    fn test_missing_font_uses_metadata() {
        let policy = GlyphWidthPolicy::new();
        assert!(policy.is_monospaced(&font("NoSuchFont Mono", None)));
        assert!(policy.is_monospaced(&font("NoSuchFont", Some(49))));
        assert!(!policy.is_monospaced(&font("NoSuchFont", None)));
    }

    #[test]
    fn test_proportional_font_is_not_monospaced() {
        let policy = GlyphWidthPolicy::new();
        assert!(!policy.is_monospaced(&font("Calibri", None)));
        assert!(!policy.is_monospaced(&FontInfo {
            size: None,
            ..font("Calibri", Some(34))
        }));
    }

    #[test]
    fn test_filter_skips_by_glyph_width() {
        let filter = FragmentFilter::new().with_monospace_policy(GlyphWidthPolicy::new());
        let fragment =
            Fragment::shape(1, 2, "Code", "let x = 1;").with_font(font("NoSuchFont Mono", None));
        assert_eq!(filter.decide(&fragment), Decision::Skip(SkipReason::Monospaced));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shape(text: &str) -> Fragment {
        Fragment::shape(1, 2, "TextBox 1", text)
    }

    #[test]
    fn test_control_markers() {
        assert!(is_control_cell("#goto 3"));
        assert!(is_control_cell("@pause"));
        assert!(is_control_cell("~wait"));
        assert!(!is_control_cell("Hello #1"));
        assert!(!is_control_cell(""));
    }

    #[test]
    fn test_cell_decisions() {
        let filter = FragmentFilter::new();
        assert_eq!(
            filter.decide(&Fragment::cell("Slide1", "B2", "#skip")),
            Decision::Skip(SkipReason::ControlMarker)
        );
        assert_eq!(
            filter.decide(&Fragment::cell("Slide1", "B3", "   ")),
            Decision::Skip(SkipReason::Empty)
        );
        assert_eq!(
            filter.decide(&Fragment::cell("Slide1", "B4", " Hello ")),
            Decision::Translate(" Hello ".to_string())
        );
    }

    #[test]
    fn test_cells_ignore_font_rules() {
        let filter = FragmentFilter::new();
        let cell = Fragment::cell("Slide1", "B2", "Hello").with_font(FontInfo::named("Consolas"));
        assert_eq!(filter.decide(&cell), Decision::Translate("Hello".to_string()));
    }

    #[test]
    fn test_shape_text_is_trimmed() {
        let filter = FragmentFilter::new();
        assert_eq!(
            filter.decide(&shape("  Welcome\n")),
            Decision::Translate("Welcome".to_string())
        );
        assert_eq!(filter.decide(&shape(" \n\t")), Decision::Skip(SkipReason::Empty));
    }

    #[test]
    fn test_opt_out_sentinel() {
        let filter = FragmentFilter::new();
        assert_eq!(
            filter.decide(&shape("Keep me").with_alt_text("@")),
            Decision::Skip(SkipReason::OptOut)
        );
        assert_eq!(
            filter.decide(&shape("Translate me").with_alt_text("@ logo")),
            Decision::Translate("Translate me".to_string())
        );
    }

    #[test]
    fn test_equation_font() {
        let filter = FragmentFilter::new();
        assert_eq!(
            filter.decide(&shape("x = y").with_font(FontInfo::named("Cambria Math"))),
            Decision::Skip(SkipReason::EquationFont)
        );
        assert_eq!(
            filter.decide(&shape("x = y").with_font(FontInfo::named("STIX Two MATH"))),
            Decision::Skip(SkipReason::EquationFont)
        );
    }

    #[test]
    fn test_monospaced_by_name() {
        let policy = FontMetadataPolicy;
        assert!(policy.is_monospaced(&FontInfo::named("Consolas")));
        assert!(policy.is_monospaced(&FontInfo::named("Courier New")));
        assert!(policy.is_monospaced(&FontInfo::named("Noto Sans Mono")));
        assert!(!policy.is_monospaced(&FontInfo::named("Calibri")));
        assert!(!policy.is_monospaced(&FontInfo::named("Monotype Corsiva")));
        assert!(!policy.is_monospaced(&FontInfo::default()));
    }

    #[test]
    fn test_monospaced_by_pitch_family() {
        let policy = FontMetadataPolicy;
        let fixed = FontInfo {
            typeface: Some("Corporate Code".to_string()),
            size: Some(18.0),
            pitch_family: Some(49),
        };
        assert!(policy.is_monospaced(&fixed));

        // Variable pitch wins over a misleading name.
        let variable = FontInfo {
            typeface: Some("Courier New".to_string()),
            size: None,
            pitch_family: Some(34),
        };
        assert!(!policy.is_monospaced(&variable));
    }

    #[test]
    fn test_custom_policy() {
        struct Everything;
        impl MonospacePolicy for Everything {
            fn is_monospaced(&self, _: &FontInfo) -> bool {
                true
            }
        }

        let filter = FragmentFilter::new().with_monospace_policy(Everything);
        assert_eq!(
            filter.decide(&shape("Hello").with_font(FontInfo::named("Calibri"))),
            Decision::Skip(SkipReason::Monospaced)
        );
        // No font information means no monospace check.
        assert_eq!(filter.decide(&shape("Hello")), Decision::Translate("Hello".to_string()));
    }
}
