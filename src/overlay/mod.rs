pub mod balance;
pub mod font;
pub mod layout;
pub mod render;
pub mod service;
pub mod split;

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::OverlayError;

/// Width of the right-edge UI rail, as a fraction of canvas width.
pub const RIGHT_ZONE_WIDTH_FRACTION: f32 = 0.20;
/// Height of the bottom UI band, as a fraction of canvas height.
pub const BOTTOM_ZONE_HEIGHT_FRACTION: f32 = 0.15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerticalPosition {
    Top,
    Center,
    Bottom,
}

impl FromStr for VerticalPosition {
    type Err = OverlayError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "top" => Ok(Self::Top),
            "center" => Ok(Self::Center),
            "bottom" => Ok(Self::Bottom),
            other => Err(OverlayError::InvalidConfig(format!(
                "unknown position '{}' (expected top, center or bottom)",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShadowStyle {
    pub enabled: bool,
    pub blur: f32,
    pub offset_y: f32,
    pub color: String,
    pub opacity: f32,
}

impl Default for ShadowStyle {
    fn default() -> Self {
        Self {
            enabled: true,
            blur: 4.0,
            offset_y: 2.0,
            color: "#000000".to_string(),
            opacity: 0.25,
        }
    }
}

/// Immutable-per-request style for one overlay computation. Validated once
/// before any layout work; renders snapshot the whole value, never single
/// fields.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleConfig {
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub font_family: String,
    pub font_size: f32,
    pub font_weight: u16,
    pub text_color: String,
    pub bubble_color: String,
    pub bubble_opacity: f32,
    /// Vertical padding between the text line and the bubble edge.
    pub bubble_padding: f32,
    pub horizontal_padding: f32,
    pub bubble_radius: f32,
    /// Line spacing as a multiplier of font size.
    pub line_height: f32,
    pub position: VerticalPosition,
    /// Auto-wrap text width bound; superseded by the safe-zone-derived bound
    /// while auto-wrap is active.
    pub max_width: f32,
    /// Extra vertical padding applied to the first bubble only.
    pub first_line_extra_padding: f32,
    /// Uniform shift applied to the whole stack after positioning.
    pub vertical_offset: f32,
    pub shadow: ShadowStyle,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            canvas_width: 1024,
            canvas_height: 1536,
            font_family: "Helvetica".to_string(),
            font_size: 48.0,
            font_weight: 700,
            text_color: "#000000".to_string(),
            bubble_color: "#ffffff".to_string(),
            bubble_opacity: 1.0,
            bubble_padding: 16.0,
            horizontal_padding: 24.0,
            bubble_radius: 18.0,
            line_height: 1.2,
            position: VerticalPosition::Center,
            max_width: 560.0,
            first_line_extra_padding: 0.0,
            vertical_offset: 0.0,
            shadow: ShadowStyle::default(),
        }
    }
}

impl StyleConfig {
    pub fn validate(&self) -> Result<(), OverlayError> {
        if self.canvas_width == 0 || self.canvas_height == 0 {
            return Err(OverlayError::InvalidConfig(format!(
                "canvas dimensions must be positive (got {}x{})",
                self.canvas_width, self.canvas_height
            )));
        }
        if !(self.font_size > 0.0) {
            return Err(OverlayError::InvalidConfig(format!(
                "font size must be positive (got {})",
                self.font_size
            )));
        }
        if !(0.0..=1.0).contains(&self.bubble_opacity) {
            return Err(OverlayError::InvalidConfig(format!(
                "bubble opacity must be within [0, 1] (got {})",
                self.bubble_opacity
            )));
        }
        if self.bubble_padding < 0.0
            || self.horizontal_padding < 0.0
            || self.first_line_extra_padding < 0.0
        {
            return Err(OverlayError::InvalidConfig(
                "paddings must not be negative".to_string(),
            ));
        }
        if self.bubble_radius < 0.0 {
            return Err(OverlayError::InvalidConfig(
                "bubble radius must not be negative".to_string(),
            ));
        }
        if !(self.line_height > 0.0) {
            return Err(OverlayError::InvalidConfig(format!(
                "line height multiplier must be positive (got {})",
                self.line_height
            )));
        }
        Ok(())
    }
}

/// Rectangular exclusion region in canvas pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SafeZone {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// UI exclusion zones, derived from canvas dimensions so the engine stays
/// resolution independent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SafeZones {
    pub right: SafeZone,
    pub bottom: SafeZone,
}

impl SafeZones {
    pub fn for_canvas(width: u32, height: u32) -> Self {
        let width = width as f32;
        let height = height as f32;
        let rail_width = width * RIGHT_ZONE_WIDTH_FRACTION;
        let band_height = height * BOTTOM_ZONE_HEIGHT_FRACTION;
        Self {
            right: SafeZone {
                x: width - rail_width,
                y: 0.0,
                width: rail_width,
                height,
            },
            bottom: SafeZone {
                x: 0.0,
                y: height - band_height,
                width,
                height: band_height,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitPolicy {
    ExplicitBreaks,
    AutoWrap,
    Balanced,
}

/// A caption line together with its measured pixel width.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    pub text: String,
    pub width: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BubbleRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub radius: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLine {
    pub line: TextLine,
    pub rect: BubbleRect,
}

/// Ordered per-line bubble geometry for one caption. Bubbles are centered on
/// the canvas midline and stacked top to bottom in line order.
#[derive(Debug, Clone, PartialEq)]
pub struct LineLayout {
    pub placements: Vec<PlacedLine>,
    pub policy: SplitPolicy,
}

/// Diagnostic view of a split line, exposed by the preview entry point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreviewLine {
    pub text: String,
    pub word_count: usize,
    pub character_count: usize,
}

impl PreviewLine {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            word_count: text.split_whitespace().count(),
            character_count: text.chars().count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        StyleConfig::default().validate().unwrap();
    }

    #[test]
    fn rejects_zero_canvas() {
        let config = StyleConfig {
            canvas_width: 0,
            ..StyleConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(OverlayError::InvalidConfig(_))
        ));
    }

    #[test]
    fn rejects_out_of_range_opacity() {
        let config = StyleConfig {
            bubble_opacity: 1.5,
            ..StyleConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_negative_padding() {
        let config = StyleConfig {
            bubble_padding: -1.0,
            ..StyleConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn safe_zones_scale_with_canvas() {
        let zones = SafeZones::for_canvas(1000, 2000);
        assert_eq!(zones.right.x, 800.0);
        assert_eq!(zones.right.width, 200.0);
        assert_eq!(zones.bottom.y, 1700.0);
        assert_eq!(zones.bottom.height, 300.0);

        let half = SafeZones::for_canvas(500, 1000);
        assert_eq!(half.right.x, 400.0);
        assert_eq!(half.bottom.y, 850.0);
    }

    #[test]
    fn position_parses_case_insensitive() {
        assert_eq!(
            "Bottom".parse::<VerticalPosition>().unwrap(),
            VerticalPosition::Bottom
        );
        assert!("middle".parse::<VerticalPosition>().is_err());
    }

    #[test]
    fn preview_line_counts_chars_not_bytes() {
        let line = PreviewLine::new("héllo wörld");
        assert_eq!(line.word_count, 2);
        assert_eq!(line.character_count, 11);
    }
}
