use crate::error::OverlayError;
use crate::overlay::font::{FontMetrics, measure_text_width_px};
use crate::overlay::{PreviewLine, SafeZones, SplitPolicy, StyleConfig};

/// Literal two-character break token accepted in captions alongside real
/// newlines.
const ESCAPED_BREAK: &str = "\\n";

#[derive(Debug, Clone, PartialEq)]
pub struct SplitCaption {
    pub lines: Vec<String>,
    pub policy: SplitPolicy,
}

/// Split a caption into lines, selecting the explicit-break policy when the
/// caption carries break markers and greedy auto-wrap otherwise.
pub fn split_caption(
    caption: &str,
    config: &StyleConfig,
    metrics: Option<&FontMetrics>,
) -> Result<SplitCaption, OverlayError> {
    config.validate()?;
    if caption.trim().is_empty() {
        return Err(OverlayError::EmptyCaption);
    }
    if has_break_markers(caption) {
        Ok(SplitCaption {
            lines: split_explicit(caption),
            policy: SplitPolicy::ExplicitBreaks,
        })
    } else {
        let bound = max_text_width(config);
        let collapsed = collapse_whitespace(caption);
        Ok(SplitCaption {
            lines: wrap_words(&collapsed, bound, config.font_size, metrics),
            policy: SplitPolicy::AutoWrap,
        })
    }
}

/// Diagnostic entry point: the line split `render` would use, without
/// touching any image.
pub fn preview_lines(
    caption: &str,
    config: &StyleConfig,
    metrics: Option<&FontMetrics>,
) -> Result<Vec<PreviewLine>, OverlayError> {
    let split = split_caption(caption, config, metrics)?;
    Ok(split.lines.iter().map(|line| PreviewLine::new(line)).collect())
}

pub(crate) fn has_break_markers(caption: &str) -> bool {
    caption.contains('\n') || caption.contains(ESCAPED_BREAK)
}

/// Explicit-break policy: normalize escaped break tokens, split on newlines,
/// drop segments that trim to empty. Kept segments are returned untouched.
pub(crate) fn split_explicit(caption: &str) -> Vec<String> {
    caption
        .replace(ESCAPED_BREAK, "\n")
        .split('\n')
        .filter(|segment| !segment.trim().is_empty())
        .map(|segment| segment.to_string())
        .collect()
}

pub(crate) fn collapse_whitespace(caption: &str) -> String {
    caption.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Largest symmetric text width whose bubble stays left of the right safe
/// zone and right of x = 0. Falls back to the configured `max_width` when the
/// derived bound degenerates.
pub(crate) fn max_text_width(config: &StyleConfig) -> f32 {
    let zones = SafeZones::for_canvas(config.canvas_width, config.canvas_height);
    let mid = config.canvas_width as f32 / 2.0;
    let half_bubble = mid.min(zones.right.x - mid);
    let derived = half_bubble * 2.0 - config.horizontal_padding * 2.0;
    if derived > 0.0 { derived } else { config.max_width }
}

/// Greedy word wrap against a measured pixel bound. A single word wider than
/// the bound is emitted alone and allowed to overflow; words are never split.
pub(crate) fn wrap_words(
    text: &str,
    max_width: f32,
    font_size: f32,
    metrics: Option<&FontMetrics>,
) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if current.is_empty() {
            current.push_str(word);
            continue;
        }
        let candidate = format!("{} {}", current, word);
        if measure_text_width_px(&candidate, font_size, metrics) <= max_width {
            current = candidate;
        } else {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}
