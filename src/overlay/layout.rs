use crate::error::OverlayError;
use crate::overlay::font::{FontMetrics, measure_text_width_px};
use crate::overlay::{
    BubbleRect, LineLayout, PlacedLine, SafeZones, SplitPolicy, StyleConfig, TextLine,
    VerticalPosition,
};

/// Consecutive bubbles overlap by this much so the stack reads as one fused
/// shape.
pub const BUBBLE_OVERLAP_PX: f32 = 10.0;

const TOP_ANCHOR_FRACTION: f32 = 0.15;
const BOTTOM_ANCHOR_FRACTION: f32 = 0.85;

/// Compute per-line bubble geometry for already-split lines. Pure: touches no
/// image codec and works with estimator metrics when `metrics` is `None`.
pub fn compute_layout(
    lines: &[String],
    policy: SplitPolicy,
    config: &StyleConfig,
    metrics: Option<&FontMetrics>,
) -> Result<LineLayout, OverlayError> {
    config.validate()?;
    let canvas_width = config.canvas_width as f32;
    let canvas_height = config.canvas_height as f32;
    let line_height = config.font_size * config.line_height;

    let measured: Vec<TextLine> = lines
        .iter()
        .map(|text| TextLine {
            width: measure_text_width_px(text, config.font_size, metrics),
            text: text.clone(),
        })
        .collect();

    let heights: Vec<f32> = (0..measured.len())
        .map(|index| {
            let extra = if index == 0 {
                config.first_line_extra_padding
            } else {
                0.0
            };
            line_height + config.bubble_padding * 2.0 + extra
        })
        .collect();
    let stack_height = heights.iter().sum::<f32>()
        - BUBBLE_OVERLAP_PX * heights.len().saturating_sub(1) as f32;

    let mut start_y = match config.position {
        VerticalPosition::Top => canvas_height * TOP_ANCHOR_FRACTION,
        VerticalPosition::Bottom => canvas_height * BOTTOM_ANCHOR_FRACTION - stack_height,
        VerticalPosition::Center => (canvas_height - stack_height) / 2.0,
    };
    start_y += config.vertical_offset;

    if policy == SplitPolicy::AutoWrap {
        let zones = SafeZones::for_canvas(config.canvas_width, config.canvas_height);
        let overflow = start_y + stack_height - zones.bottom.y;
        if overflow > 0.0 {
            // Shift up by exactly the overflow. The top edge may go negative
            // when the stack is taller than the allowed region; the bottom
            // clamp wins that conflict.
            start_y -= overflow;
        }
    }

    let mut placements = Vec::with_capacity(measured.len());
    let mut y = start_y;
    for (index, line) in measured.into_iter().enumerate() {
        let height = heights[index];
        let width = (line.width + config.horizontal_padding * 2.0).min(canvas_width);
        let x = (canvas_width - width) / 2.0;
        let radius = config.bubble_radius.min(width.min(height) / 2.0);
        placements.push(PlacedLine {
            line,
            rect: BubbleRect {
                x,
                y,
                width,
                height,
                radius,
            },
        });
        y += height - BUBBLE_OVERLAP_PX;
    }

    Ok(LineLayout { placements, policy })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::split::max_text_width;

    fn lines(texts: &[&str]) -> Vec<String> {
        texts.iter().map(|text| text.to_string()).collect()
    }

    fn bubble_height(config: &StyleConfig) -> f32 {
        config.font_size * config.line_height + config.bubble_padding * 2.0
    }

    #[test]
    fn single_line_bubble_width_is_text_plus_padding() {
        let config = StyleConfig::default();
        let layout = compute_layout(
            &lines(&["Hello world"]),
            SplitPolicy::AutoWrap,
            &config,
            None,
        )
        .unwrap();
        assert_eq!(layout.placements.len(), 1);
        let placed = &layout.placements[0];
        let expected = placed.line.width + config.horizontal_padding * 2.0;
        assert!((placed.rect.width - expected).abs() < 1e-3);
    }

    #[test]
    fn bubbles_never_invert_vertical_order() {
        let config = StyleConfig::default();
        let layout = compute_layout(
            &lines(&["one", "two", "three", "four"]),
            SplitPolicy::ExplicitBreaks,
            &config,
            None,
        )
        .unwrap();
        for pair in layout.placements.windows(2) {
            assert!(pair[1].rect.y > pair[0].rect.y);
        }
    }

    #[test]
    fn explicit_three_line_stack_height() {
        let config = StyleConfig::default();
        let layout = compute_layout(
            &lines(&["Line one", "Line two", "Line three"]),
            SplitPolicy::ExplicitBreaks,
            &config,
            None,
        )
        .unwrap();
        let top = layout.placements[0].rect.y;
        let last = &layout.placements[2].rect;
        let stack = last.y + last.height - top;
        let expected = 3.0 * bubble_height(&config) - 2.0 * BUBBLE_OVERLAP_PX;
        assert!((stack - expected).abs() < 1e-3);
    }

    #[test]
    fn center_position_centers_the_stack() {
        let config = StyleConfig {
            position: VerticalPosition::Center,
            vertical_offset: 0.0,
            ..StyleConfig::default()
        };
        let layout = compute_layout(
            &lines(&["a", "b"]),
            SplitPolicy::ExplicitBreaks,
            &config,
            None,
        )
        .unwrap();
        let top = layout.placements[0].rect.y;
        let last = &layout.placements[1].rect;
        let midpoint = (top + last.y + last.height) / 2.0;
        assert!((midpoint - config.canvas_height as f32 / 2.0).abs() < 1e-2);
    }

    #[test]
    fn top_position_starts_at_fifteen_percent() {
        let config = StyleConfig {
            position: VerticalPosition::Top,
            ..StyleConfig::default()
        };
        let layout =
            compute_layout(&lines(&["a"]), SplitPolicy::ExplicitBreaks, &config, None).unwrap();
        let expected = config.canvas_height as f32 * 0.15;
        assert!((layout.placements[0].rect.y - expected).abs() < 1e-3);
    }

    #[test]
    fn vertical_offset_shifts_uniformly() {
        let base = StyleConfig::default();
        let shifted = StyleConfig {
            vertical_offset: -40.0,
            ..StyleConfig::default()
        };
        let texts = lines(&["a", "b"]);
        let plain =
            compute_layout(&texts, SplitPolicy::ExplicitBreaks, &base, None).unwrap();
        let moved =
            compute_layout(&texts, SplitPolicy::ExplicitBreaks, &shifted, None).unwrap();
        for (before, after) in plain.placements.iter().zip(&moved.placements) {
            assert!((after.rect.y - (before.rect.y - 40.0)).abs() < 1e-3);
        }
    }

    #[test]
    fn auto_wrap_stack_is_clamped_out_of_the_bottom_zone() {
        let config = StyleConfig {
            position: VerticalPosition::Center,
            vertical_offset: 600.0,
            ..StyleConfig::default()
        };
        let layout = compute_layout(
            &lines(&["a", "b", "c"]),
            SplitPolicy::AutoWrap,
            &config,
            None,
        )
        .unwrap();
        let zones = SafeZones::for_canvas(config.canvas_width, config.canvas_height);
        let last = layout.placements.last().unwrap();
        assert!(last.rect.y + last.rect.height <= zones.bottom.y + 1e-3);
    }

    #[test]
    fn explicit_policy_ignores_the_bottom_zone() {
        let config = StyleConfig {
            position: VerticalPosition::Center,
            vertical_offset: 600.0,
            ..StyleConfig::default()
        };
        let layout = compute_layout(
            &lines(&["a", "b", "c"]),
            SplitPolicy::ExplicitBreaks,
            &config,
            None,
        )
        .unwrap();
        let zones = SafeZones::for_canvas(config.canvas_width, config.canvas_height);
        let last = layout.placements.last().unwrap();
        assert!(last.rect.y + last.rect.height > zones.bottom.y);
    }

    #[test]
    fn oversized_stack_keeps_the_bottom_clamp() {
        // 20 bubbles are taller than the region above the bottom zone; the
        // clamp pushes the top above y = 0 and stays there.
        let config = StyleConfig::default();
        let many: Vec<String> = (0..20).map(|index| format!("line {}", index)).collect();
        let layout = compute_layout(&many, SplitPolicy::AutoWrap, &config, None).unwrap();
        let zones = SafeZones::for_canvas(config.canvas_width, config.canvas_height);
        let first = &layout.placements[0].rect;
        let last = layout.placements.last().unwrap();
        assert!(first.y < 0.0);
        assert!((last.rect.y + last.rect.height - zones.bottom.y).abs() < 1e-2);
    }

    #[test]
    fn radius_is_clamped_to_half_the_smaller_side() {
        let config = StyleConfig {
            bubble_radius: 500.0,
            ..StyleConfig::default()
        };
        let layout = compute_layout(
            &lines(&["Hello world"]),
            SplitPolicy::AutoWrap,
            &config,
            None,
        )
        .unwrap();
        for placed in &layout.placements {
            let rect = &placed.rect;
            assert!(rect.radius <= rect.width.min(rect.height) / 2.0 + 1e-3);
        }
    }

    #[test]
    fn overflowing_word_is_capped_at_canvas_width() {
        let config = StyleConfig::default();
        let word = "a".repeat(120);
        let layout =
            compute_layout(&lines(&[word.as_str()]), SplitPolicy::AutoWrap, &config, None)
                .unwrap();
        let rect = &layout.placements[0].rect;
        assert!(rect.width > max_text_width(&config));
        assert!(rect.width <= config.canvas_width as f32);
        assert!(rect.x >= 0.0);
    }

    #[test]
    fn first_line_extra_padding_applies_once() {
        let config = StyleConfig {
            first_line_extra_padding: 12.0,
            ..StyleConfig::default()
        };
        let layout = compute_layout(
            &lines(&["a", "b"]),
            SplitPolicy::ExplicitBreaks,
            &config,
            None,
        )
        .unwrap();
        let first = &layout.placements[0].rect;
        let second = &layout.placements[1].rect;
        assert!((first.height - (bubble_height(&config) + 12.0)).abs() < 1e-3);
        assert!((second.height - bubble_height(&config)).abs() < 1e-3);
    }

    #[test]
    fn invalid_config_is_a_precondition_violation() {
        let config = StyleConfig {
            canvas_width: 0,
            ..StyleConfig::default()
        };
        assert!(matches!(
            compute_layout(&lines(&["a"]), SplitPolicy::AutoWrap, &config, None),
            Err(OverlayError::InvalidConfig(_))
        ));
    }
}
