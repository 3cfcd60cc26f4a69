//! # Font Measurement
//!
//! The layout engine measures text through one narrow seam, [`TextMeasurer`]:
//! "how many of these characters fit in this width, and how big are they".
//!
//! [`FontContext`] is the built-in implementation. It knows the standard PDF
//! families (Helvetica, Times, Courier) from their AFM widths and measures
//! custom TrueType/OpenType fonts through ttf-parser.

mod standard;

pub use standard::StandardFont;

use std::collections::HashMap;

use crate::error::QuireError;
use crate::geometry::Size;
use crate::model::FontEntry;
use crate::style::{FontSpec, TextOptions};

/// Result of fitting a string into an available width.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeasuredFit {
    /// Leading characters that fit.
    pub chars: usize,
    /// Width of those characters and the line height.
    pub size: Size,
}

/// Vertical font metrics in points, both positive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontMetrics {
    pub ascent: f64,
    pub descent: f64,
}

pub trait TextMeasurer {
    /// Fit the longest prefix of `text` into `available_width`.
    ///
    /// Word and character spacing from `options` are included in the width.
    /// Pass `f64::INFINITY` to measure the whole string.
    fn measure(&self, text: &str, options: &TextOptions, available_width: f64) -> MeasuredFit;

    fn metrics(&self, font: &FontSpec) -> FontMetrics;
}

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct FontKey {
    pub family: String,
    pub weight: u32,
    pub italic: bool,
}

#[derive(Debug, Clone)]
pub enum FontData {
    Standard(StandardFont),
    Custom(CustomFontMetrics),
}

impl FontData {
    fn char_width(&self, ch: char, size: f64) -> f64 {
        match self {
            FontData::Standard(f) => f.char_width(ch, size),
            FontData::Custom(m) => m.char_width(ch, size),
        }
    }

    fn metrics(&self, size: f64) -> FontMetrics {
        match self {
            FontData::Standard(f) => f.metrics(size),
            FontData::Custom(m) => FontMetrics {
                ascent: m.ascender as f64 / m.units_per_em as f64 * size,
                descent: -(m.descender as f64) / m.units_per_em as f64 * size,
            },
        }
    }
}

/// Parsed metrics from a TrueType/OpenType font via ttf-parser.
#[derive(Debug, Clone)]
pub struct CustomFontMetrics {
    pub units_per_em: u16,
    pub advance_widths: HashMap<char, u16>,
    pub default_advance: u16,
    pub ascender: i16,
    pub descender: i16,
}

impl CustomFontMetrics {
    /// Get the advance width of a character in points.
    pub fn char_width(&self, ch: char, font_size: f64) -> f64 {
        let w = self
            .advance_widths
            .get(&ch)
            .copied()
            .unwrap_or(self.default_advance);
        (w as f64 / self.units_per_em as f64) * font_size
    }

    /// Parse metrics from font data using ttf-parser.
    pub fn from_font_data(data: &[u8]) -> Option<Self> {
        let face = ttf_parser::Face::parse(data, 0).ok()?;
        let units_per_em = face.units_per_em();

        let mut advance_widths = HashMap::new();
        let mut default_advance = 0u16;
        for code in 32u32..=0xFFFF {
            if let Some(ch) = char::from_u32(code) {
                if let Some(glyph_id) = face.glyph_index(ch) {
                    let advance = face.glyph_hor_advance(glyph_id).unwrap_or(0);
                    advance_widths.insert(ch, advance);
                    if ch == ' ' {
                        default_advance = advance;
                    }
                }
            }
        }
        if default_advance == 0 {
            default_advance = units_per_em / 2;
        }

        Some(CustomFontMetrics {
            units_per_em,
            advance_widths,
            default_advance,
            ascender: face.ascender(),
            descender: face.descender(),
        })
    }
}

static FALLBACK: FontData = FontData::Standard(StandardFont::Helvetica);

/// Maps family + weight + style to font data.
pub struct FontRegistry {
    fonts: HashMap<FontKey, FontData>,
}

impl Default for FontRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FontRegistry {
    pub fn new() -> Self {
        let mut fonts = HashMap::new();
        let standard_mappings = [
            ("Helvetica", 400, StandardFont::Helvetica),
            ("Helvetica", 700, StandardFont::HelveticaBold),
            ("Times", 400, StandardFont::TimesRoman),
            ("Times", 700, StandardFont::TimesRoman),
            ("Courier", 400, StandardFont::Courier),
            ("Courier", 700, StandardFont::Courier),
        ];
        for (family, weight, font) in standard_mappings {
            for italic in [false, true] {
                fonts.insert(
                    FontKey {
                        family: family.to_string(),
                        weight,
                        italic,
                    },
                    FontData::Standard(font),
                );
            }
        }
        Self { fonts }
    }

    /// Look up a font, snapping the weight and falling back to Helvetica.
    pub fn resolve(&self, family: &str, weight: u32, italic: bool) -> &FontData {
        let snapped = if weight >= 600 { 700 } else { 400 };
        let candidates = [
            (family, weight, italic),
            (family, snapped, italic),
            (family, snapped, false),
            ("Helvetica", snapped, false),
        ];
        for (family, weight, italic) in candidates {
            let key = FontKey {
                family: family.to_string(),
                weight,
                italic,
            };
            if let Some(font) = self.fonts.get(&key) {
                return font;
            }
        }
        &FALLBACK
    }

    pub fn register(&mut self, family: &str, weight: u32, italic: bool, metrics: CustomFontMetrics) {
        self.fonts.insert(
            FontKey {
                family: family.to_string(),
                weight,
                italic,
            },
            FontData::Custom(metrics),
        );
    }
}

/// Text measurement with real glyph metrics.
#[derive(Default)]
pub struct FontContext {
    registry: FontRegistry,
}

impl FontContext {
    pub fn new() -> Self {
        Self {
            registry: FontRegistry::new(),
        }
    }

    /// Register the custom fonts a document declares.
    pub fn register_entries(&mut self, entries: &[FontEntry]) -> Result<(), QuireError> {
        for entry in entries {
            let data = decode_font_source(&entry.src)?;
            let metrics = CustomFontMetrics::from_font_data(&data).ok_or_else(|| {
                QuireError::Font(format!("'{}' is not a parsable font", entry.family))
            })?;
            log::debug!(
                "registered font '{}' weight {} italic {}",
                entry.family,
                entry.weight,
                entry.italic
            );
            self.registry
                .register(&entry.family, entry.weight, entry.italic, metrics);
        }
        Ok(())
    }

    /// Get the advance width of a single character in points.
    pub fn char_width(&self, ch: char, font: &FontSpec) -> f64 {
        self.registry
            .resolve(&font.family, font.weight, font.italic)
            .char_width(ch, font.size)
    }

    pub fn registry_mut(&mut self) -> &mut FontRegistry {
        &mut self.registry
    }
}

impl TextMeasurer for FontContext {
    fn measure(&self, text: &str, options: &TextOptions, available_width: f64) -> MeasuredFit {
        let font = self
            .registry
            .resolve(&options.font.family, options.font.weight, options.font.italic);
        let char_spacing = options.char_spacing.unwrap_or(0.0);
        let word_spacing = options.word_spacing.unwrap_or(0.0);

        let mut width = 0.0;
        let mut chars = 0;
        for ch in text.chars() {
            let mut w = font.char_width(ch, options.font.size) + char_spacing;
            if ch == ' ' {
                w += word_spacing;
            }
            if width + w > available_width {
                break;
            }
            width += w;
            chars += 1;
        }
        MeasuredFit {
            chars,
            size: Size::new(width, options.line_height()),
        }
    }

    fn metrics(&self, font: &FontSpec) -> FontMetrics {
        self.registry
            .resolve(&font.family, font.weight, font.italic)
            .metrics(font.size)
    }
}

fn decode_font_source(src: &str) -> Result<Vec<u8>, QuireError> {
    use base64::Engine;
    let payload = match src.find(",") {
        Some(comma) if src.starts_with("data:") => &src[comma + 1..],
        _ => src,
    };
    base64::engine::general_purpose::STANDARD
        .decode(payload)
        .map_err(|e| QuireError::Font(format!("base64 decode error: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn courier(size: f64) -> TextOptions {
        TextOptions {
            font: FontSpec {
                family: "Courier".to_string(),
                size,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn helvetica_space_width() {
        let ctx = FontContext::new();
        let w = ctx.char_width(' ', &FontSpec::default());
        assert!((w - 3.336).abs() < 0.001);
    }

    #[test]
    fn bold_is_wider() {
        let ctx = FontContext::new();
        let regular = FontSpec::default();
        let bold = FontSpec {
            weight: 700,
            ..FontSpec::default()
        };
        assert!(ctx.char_width('b', &bold) > ctx.char_width('b', &regular));
    }

    #[test]
    fn unknown_family_falls_back_to_helvetica() {
        let ctx = FontContext::new();
        let unknown = FontSpec {
            family: "NoSuchFont".to_string(),
            ..FontSpec::default()
        };
        assert_eq!(
            ctx.char_width('A', &unknown),
            ctx.char_width('A', &FontSpec::default())
        );
    }

    #[test]
    fn courier_fit_is_exact() {
        let ctx = FontContext::new();
        let fit = ctx.measure("abcdefghij", &courier(10.0), 30.0);
        assert_eq!(fit.chars, 5);
        assert!((fit.size.width - 30.0).abs() < 1e-9);
        assert!((fit.size.height - 12.0).abs() < 1e-9);
    }

    #[test]
    fn spacing_counts_toward_width() {
        let ctx = FontContext::new();
        let mut opts = courier(10.0);
        opts.word_spacing = Some(4.0);
        opts.char_spacing = Some(1.0);
        let fit = ctx.measure("a b", &opts, f64::INFINITY);
        assert!((fit.size.width - (3.0 * 7.0 + 4.0)).abs() < 1e-9);
    }

    #[test]
    fn invalid_font_source_is_a_font_error() {
        let mut ctx = FontContext::new();
        let err = ctx
            .register_entries(&[FontEntry {
                family: "Broken".to_string(),
                src: "data:font/ttf;base64,AAAA".to_string(),
                weight: 400,
                italic: false,
            }])
            .unwrap_err();
        assert!(matches!(err, QuireError::Font(_)));
    }
}
