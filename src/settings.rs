use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;

use crate::overlay::{StyleConfig, VerticalPosition};

/// Style settings file. Every field is optional; present values override the
/// built-in defaults, and later files override earlier ones.
#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    canvas: Option<CanvasSettings>,
    font: Option<FontSettings>,
    bubble: Option<BubbleSettings>,
    text: Option<TextSettings>,
    shadow: Option<ShadowSettings>,
}

#[derive(Debug, Default, Deserialize)]
struct CanvasSettings {
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct FontSettings {
    family: Option<String>,
    size: Option<f32>,
    weight: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
struct BubbleSettings {
    color: Option<String>,
    opacity: Option<f32>,
    padding: Option<f32>,
    horizontal_padding: Option<f32>,
    radius: Option<f32>,
    first_line_extra_padding: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
struct TextSettings {
    color: Option<String>,
    line_height: Option<f32>,
    position: Option<VerticalPosition>,
    max_width: Option<f32>,
    vertical_offset: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
struct ShadowSettings {
    enabled: Option<bool>,
    blur: Option<f32>,
    offset_y: Option<f32>,
    color: Option<String>,
    opacity: Option<f32>,
}

/// Build a [`StyleConfig`] from defaults plus layered settings files:
/// `settings.toml`, then `settings.local.toml`, then an explicit extra path.
pub fn load_style(extra_path: Option<&Path>) -> Result<StyleConfig> {
    let mut style = StyleConfig::default();

    let mut ordered_paths = vec![
        PathBuf::from("settings.toml"),
        PathBuf::from("settings.local.toml"),
    ];
    if let Some(extra) = extra_path {
        if !extra.exists() {
            return Err(anyhow!("settings file not found: {}", extra.display()));
        }
        ordered_paths.push(extra.to_path_buf());
    }

    for path in ordered_paths {
        if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("failed to read settings: {}", path.display()))?;
            let parsed: SettingsFile = toml::from_str(&content)
                .with_context(|| format!("failed to parse settings: {}", path.display()))?;
            apply(&mut style, parsed);
        }
    }

    Ok(style)
}

fn apply(style: &mut StyleConfig, file: SettingsFile) {
    if let Some(canvas) = file.canvas {
        if let Some(width) = canvas.width {
            style.canvas_width = width;
        }
        if let Some(height) = canvas.height {
            style.canvas_height = height;
        }
    }
    if let Some(font) = file.font {
        if let Some(family) = font.family {
            style.font_family = family;
        }
        if let Some(size) = font.size {
            style.font_size = size;
        }
        if let Some(weight) = font.weight {
            style.font_weight = weight;
        }
    }
    if let Some(bubble) = file.bubble {
        if let Some(color) = bubble.color {
            style.bubble_color = color;
        }
        if let Some(opacity) = bubble.opacity {
            style.bubble_opacity = opacity;
        }
        if let Some(padding) = bubble.padding {
            style.bubble_padding = padding;
        }
        if let Some(padding) = bubble.horizontal_padding {
            style.horizontal_padding = padding;
        }
        if let Some(radius) = bubble.radius {
            style.bubble_radius = radius;
        }
        if let Some(extra) = bubble.first_line_extra_padding {
            style.first_line_extra_padding = extra;
        }
    }
    if let Some(text) = file.text {
        if let Some(color) = text.color {
            style.text_color = color;
        }
        if let Some(line_height) = text.line_height {
            style.line_height = line_height;
        }
        if let Some(position) = text.position {
            style.position = position;
        }
        if let Some(max_width) = text.max_width {
            style.max_width = max_width;
        }
        if let Some(offset) = text.vertical_offset {
            style.vertical_offset = offset;
        }
    }
    if let Some(shadow) = file.shadow {
        if let Some(enabled) = shadow.enabled {
            style.shadow.enabled = enabled;
        }
        if let Some(blur) = shadow.blur {
            style.shadow.blur = blur;
        }
        if let Some(offset_y) = shadow.offset_y {
            style.shadow.offset_y = offset_y;
        }
        if let Some(color) = shadow.color {
            style.shadow.color = color;
        }
        if let Some(opacity) = shadow.opacity {
            style.shadow.opacity = opacity;
        }
    }
}
