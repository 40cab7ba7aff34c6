use std::io::Cursor;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use resvg::render as rasterize;
use tiny_skia::Pixmap;
use usvg::{Options, Tree, fontdb};

use crate::error::OverlayError;
use crate::overlay::font::ResolvedFont;
use crate::overlay::{LineLayout, StyleConfig};

const SHADOW_FILTER_ID: &str = "bubble-shadow";

/// Draw the background stretched to the canvas, then every bubble and its
/// text, and encode the result as PNG. The only entry point touching image
/// codecs.
pub fn render(
    image_bytes: &[u8],
    layout: &LineLayout,
    config: &StyleConfig,
    font: Option<&ResolvedFont>,
) -> Result<Vec<u8>, OverlayError> {
    config.validate()?;
    if image_bytes.is_empty() {
        return Err(OverlayError::EmptyImage);
    }

    let svg = build_svg(image_bytes, layout, config, font)?;
    rasterize_svg(&svg, font.map(|font| font.metrics.data()))
}

/// [`render`] with the PNG bytes base64-encoded for API transport.
pub fn render_base64(
    image_bytes: &[u8],
    layout: &LineLayout,
    config: &StyleConfig,
    font: Option<&ResolvedFont>,
) -> Result<String, OverlayError> {
    Ok(BASE64.encode(render(image_bytes, layout, config, font)?))
}

fn build_svg(
    image_bytes: &[u8],
    layout: &LineLayout,
    config: &StyleConfig,
    font: Option<&ResolvedFont>,
) -> Result<String, OverlayError> {
    let width = config.canvas_width;
    let height = config.canvas_height;
    let (embed_bytes, embed_mime) = background_embed(image_bytes)?;
    let data_uri = format!("data:{};base64,{}", embed_mime, BASE64.encode(&embed_bytes));

    let mut svg = String::new();
    svg.push_str(&format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
        w = width,
        h = height
    ));
    // Aspect-fill by stretching: the background always covers the exact
    // canvas, letterboxing never happens.
    svg.push_str(&format!(
        r#"<image href="{uri}" xlink:href="{uri}" x="0" y="0" width="{w}" height="{h}" preserveAspectRatio="none"/>"#,
        uri = data_uri,
        w = width,
        h = height
    ));

    let shadow = &config.shadow;
    if shadow.enabled {
        svg.push_str(&format!(
            r#"<defs><filter id="{id}" x="-20%" y="-20%" width="140%" height="140%"><feDropShadow dx="0" dy="{dy}" stdDeviation="{blur}" flood-color="{color}" flood-opacity="{opacity}"/></filter></defs>"#,
            id = SHADOW_FILTER_ID,
            dy = shadow.offset_y,
            blur = shadow.blur,
            color = escape_xml(&shadow.color),
            opacity = shadow.opacity
        ));
    }

    let family = font.map(|font| font.family.as_str()).unwrap_or("sans-serif");
    let ascent_ratio = font
        .map(|font| font.metrics.ascent_ratio())
        .unwrap_or(0.7)
        .clamp(0.5, 1.0);

    for placed in &layout.placements {
        let rect = &placed.rect;
        let filter = if shadow.enabled {
            format!(r#" filter="url(#{})""#, SHADOW_FILTER_ID)
        } else {
            String::new()
        };
        svg.push_str(&format!(
            r#"<rect x="{x}" y="{y}" width="{w}" height="{h}" rx="{rx}" fill="{fill}" fill-opacity="{opacity}"{filter}/>"#,
            x = rect.x,
            y = rect.y,
            w = rect.width,
            h = rect.height,
            rx = rect.radius,
            fill = escape_xml(&config.bubble_color),
            opacity = config.bubble_opacity,
            filter = filter
        ));

        // Center the baseline so the glyph box sits in the middle of the
        // padded bubble.
        let center_x = rect.x + rect.width / 2.0;
        let baseline_y = rect.y + rect.height / 2.0 + config.font_size * ascent_ratio / 2.0;
        svg.push_str(&format!(
            r#"<text x="{x}" y="{y}" text-anchor="middle" font-family="{family}" font-size="{size}" font-weight="{weight}" fill="{color}">{text}</text>"#,
            x = center_x,
            y = baseline_y,
            family = escape_xml(family),
            size = config.font_size,
            weight = config.font_weight,
            color = escape_xml(&config.text_color),
            text = escape_xml(&placed.line.text)
        ));
    }

    svg.push_str("</svg>");
    Ok(svg)
}

/// Pick the bytes to embed in the SVG. Formats the SVG rasterizer can read
/// directly are embedded verbatim; anything else is decoded and re-encoded as
/// PNG. Decoding always runs so corrupt input fails here, not mid-render.
fn background_embed(image_bytes: &[u8]) -> Result<(Vec<u8>, &'static str), OverlayError> {
    let sniffed = infer::get(image_bytes)
        .map(|kind| kind.mime_type())
        .unwrap_or("application/octet-stream");
    let decoded = image::load_from_memory(image_bytes).map_err(|source| OverlayError::Decode {
        mime: sniffed.to_string(),
        source,
    })?;
    match sniffed {
        "image/png" => Ok((image_bytes.to_vec(), "image/png")),
        "image/jpeg" => Ok((image_bytes.to_vec(), "image/jpeg")),
        "image/gif" => Ok((image_bytes.to_vec(), "image/gif")),
        _ => {
            let mut bytes = Vec::new();
            decoded
                .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
                .map_err(OverlayError::Encode)?;
            Ok((bytes, "image/png"))
        }
    }
}

fn rasterize_svg(svg: &str, font_data: Option<&[u8]>) -> Result<Vec<u8>, OverlayError> {
    let mut db = fontdb::Database::new();
    db.load_system_fonts();
    if let Some(data) = font_data {
        db.load_font_data(data.to_vec());
    }
    let options = Options {
        fontdb: Arc::new(db),
        ..Options::default()
    };
    let tree = Tree::from_str(svg, &options).map_err(|err| OverlayError::Svg(err.to_string()))?;
    let size = tree.size().to_int_size();
    let mut pixmap = Pixmap::new(size.width(), size.height())
        .ok_or_else(|| OverlayError::Svg("empty canvas".to_string()))?;
    rasterize(&tree, tiny_skia::Transform::identity(), &mut pixmap.as_mut());

    let buffer = image::RgbaImage::from_raw(size.width(), size.height(), pixmap.data().to_vec())
        .ok_or_else(|| OverlayError::Svg("pixmap size mismatch".to_string()))?;
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgba8(buffer)
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .map_err(OverlayError::Encode)?;
    Ok(bytes)
}

fn escape_xml(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
