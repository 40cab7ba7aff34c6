use std::path::Path;
use std::sync::Arc;

use ttf_parser::{Face, name_id};
use usvg::fontdb;

use crate::error::OverlayError;

/// Parsed font data plus the handful of metrics the engine needs: horizontal
/// advances for width measurement and the ascent for baseline centering.
#[derive(Clone)]
pub struct FontMetrics {
    data: Arc<Vec<u8>>,
    units_per_em: u16,
    space_advance: u16,
    ascent: i16,
    family: Option<String>,
    face_index: u32,
}

impl FontMetrics {
    pub fn family(&self) -> Option<&str> {
        self.family.as_deref()
    }

    pub fn data(&self) -> &[u8] {
        self.data.as_ref()
    }

    /// Ascent as a fraction of the em square.
    pub fn ascent_ratio(&self) -> f32 {
        self.ascent as f32 / self.units_per_em.max(1) as f32
    }
}

/// Font metrics paired with the family name to use in rendered output.
pub struct ResolvedFont {
    pub metrics: FontMetrics,
    pub family: String,
}

pub fn load_font(path: &Path) -> Result<FontMetrics, OverlayError> {
    let data = std::fs::read(path).map_err(|err| {
        OverlayError::FontUnavailable(format!("{}: {}", path.display(), err))
    })?;
    parse_font_data(&data, None)
        .ok_or_else(|| OverlayError::FontUnavailable(format!("{}: unparsable font", path.display())))
}

/// Resolve the overlay font from the system font database: the requested
/// family first, then each fallback candidate in order.
pub fn resolve_font(
    family: Option<&str>,
    fallback: &[&str],
) -> Result<ResolvedFont, OverlayError> {
    let mut db = fontdb::Database::new();
    db.load_system_fonts();

    if let Some(family) = family {
        if let Some(resolved) = query_family(&db, family) {
            return Ok(resolved);
        }
    }
    for candidate in fallback {
        if let Some(resolved) = query_family(&db, candidate) {
            return Ok(resolved);
        }
    }
    Err(OverlayError::FontUnavailable(
        family.unwrap_or("sans-serif").to_string(),
    ))
}

/// Pixel width of `text` at `font_size`. Uses glyph advances when font data
/// is present, otherwise a character-class estimator so splitting and layout
/// stay computable without any font file.
pub(crate) fn measure_text_width_px(
    text: &str,
    font_size: f32,
    font: Option<&FontMetrics>,
) -> f32 {
    if let Some(font) = font {
        if let Ok(face) = Face::parse(&font.data, font.face_index) {
            let mut advance = 0u32;
            for ch in text.chars() {
                if ch == '\n' {
                    continue;
                }
                let glyph_advance = face
                    .glyph_index(ch)
                    .and_then(|glyph| face.glyph_hor_advance(glyph))
                    .unwrap_or(font.space_advance);
                advance = advance.saturating_add(glyph_advance as u32);
            }
            let units = font.units_per_em.max(1) as f32;
            return advance as f32 * (font_size / units);
        }
    }
    estimate_text_width_units(text) * font_size
}

fn estimate_char_width_units(ch: char) -> f32 {
    if ch.is_whitespace() {
        0.25
    } else if ch.is_ascii_alphanumeric() {
        0.55
    } else if ch.is_ascii() {
        0.35
    } else if matches!(
        ch as u32,
        0x4E00..=0x9FFF | 0x3040..=0x30FF | 0x31F0..=0x31FF
    ) {
        1.0
    } else {
        0.9
    }
}

fn estimate_text_width_units(text: &str) -> f32 {
    text.chars().map(estimate_char_width_units).sum()
}

fn parse_font_data(data: &[u8], preferred_family: Option<&str>) -> Option<FontMetrics> {
    let mut fallback = None;
    let count = ttf_parser::fonts_in_collection(data).unwrap_or(1);
    for index in 0..count {
        let Ok(face) = Face::parse(data, index) else {
            continue;
        };
        let family = extract_family_name(&face);
        let units_per_em = face.units_per_em().max(1);
        let space_advance = face
            .glyph_index(' ')
            .and_then(|id| face.glyph_hor_advance(id))
            .unwrap_or(units_per_em / 2);
        let metrics = FontMetrics {
            data: Arc::new(data.to_vec()),
            units_per_em,
            space_advance,
            ascent: face.ascender(),
            family: family.clone(),
            face_index: index,
        };
        if let (Some(preferred), Some(found)) = (preferred_family, &family) {
            if found.eq_ignore_ascii_case(preferred) {
                return Some(metrics);
            }
        }
        if fallback.is_none() {
            fallback = Some(metrics);
        }
    }
    fallback
}

fn query_family(db: &fontdb::Database, family: &str) -> Option<ResolvedFont> {
    let families = if family.eq_ignore_ascii_case("sans-serif") {
        vec![fontdb::Family::SansSerif]
    } else {
        vec![fontdb::Family::Name(family)]
    };
    let query = fontdb::Query {
        families: &families,
        ..Default::default()
    };
    let id = db.query(&query)?;
    let data = db.with_face_data(id, |data, _index| data.to_vec())?;
    let metrics = parse_font_data(&data, None)?;
    let resolved_family = metrics
        .family()
        .map(|name| name.to_string())
        .unwrap_or_else(|| family.to_string());
    Some(ResolvedFont {
        metrics,
        family: resolved_family,
    })
}

fn extract_family_name(face: &Face<'_>) -> Option<String> {
    let mut fallback = None;
    for name in face.names() {
        if name.name_id == name_id::TYPOGRAPHIC_FAMILY {
            if let Some(value) = name.to_string() {
                return Some(value);
            }
        } else if name.name_id == name_id::FAMILY && fallback.is_none() {
            fallback = name.to_string();
        }
    }
    fallback
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estimator_scales_with_font_size() {
        let narrow = measure_text_width_px("Hello", 10.0, None);
        let wide = measure_text_width_px("Hello", 20.0, None);
        assert!((wide - narrow * 2.0).abs() < 1e-3);
    }

    #[test]
    fn estimator_counts_character_classes() {
        // 5 alphanumerics + 1 space + 5 alphanumerics
        let width = measure_text_width_px("Hello world", 100.0, None);
        assert!((width - (10.0 * 0.55 + 0.25) * 100.0).abs() < 1e-2);
    }

    #[test]
    fn cjk_measures_wider_than_ascii() {
        let ascii = measure_text_width_px("a", 48.0, None);
        let cjk = measure_text_width_px("本", 48.0, None);
        assert!(cjk > ascii);
    }
}
