use std::sync::{Arc, RwLock};

use crate::error::OverlayError;
use crate::overlay::balance::{BalanceOptions, balance_lines};
use crate::overlay::font::{FontMetrics, ResolvedFont, resolve_font};
use crate::overlay::layout::compute_layout;
use crate::overlay::render::render;
use crate::overlay::split::{preview_lines, split_caption};
use crate::overlay::{LineLayout, PreviewLine, SplitPolicy, StyleConfig};

#[cfg(target_os = "macos")]
fn fallback_fonts() -> &'static [&'static str] {
    &["Helvetica Neue", "Hiragino Sans", "sans-serif"]
}

#[cfg(target_os = "windows")]
fn fallback_fonts() -> &'static [&'static str] {
    &["Arial", "Segoe UI", "sans-serif"]
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn fallback_fonts() -> &'static [&'static str] {
    &["DejaVu Sans", "Noto Sans", "sans-serif"]
}

/// Long-lived orchestrator: split → layout → render for one request at a
/// time, against a snapshot of the current default style. Config updates
/// replace the whole value; in-flight renders keep the snapshot they took.
pub struct OverlayService {
    config: RwLock<Arc<StyleConfig>>,
    font: Option<ResolvedFont>,
}

impl OverlayService {
    /// Validates the config and resolves the overlay font once. A missing
    /// font family is not fatal: the service falls back to estimator metrics
    /// and a generic family, and logs the degradation.
    pub fn new(config: StyleConfig) -> Result<Self, OverlayError> {
        config.validate()?;
        let font = match resolve_font(Some(config.font_family.as_str()), fallback_fonts()) {
            Ok(resolved) => Some(resolved),
            Err(err) => {
                tracing::warn!(
                    "font resolution failed ({}); continuing with estimated metrics",
                    err
                );
                None
            }
        };
        Ok(Self {
            config: RwLock::new(Arc::new(config)),
            font,
        })
    }

    /// Service with a pre-resolved font (or none, for estimator metrics),
    /// bypassing the system font lookup.
    pub fn with_font(
        config: StyleConfig,
        font: Option<ResolvedFont>,
    ) -> Result<Self, OverlayError> {
        config.validate()?;
        Ok(Self {
            config: RwLock::new(Arc::new(config)),
            font,
        })
    }

    /// Snapshot of the current default style.
    pub fn config(&self) -> Arc<StyleConfig> {
        self.config
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Replace the default style wholesale. Never mutates fields in place, so
    /// a concurrently running render keeps a consistent snapshot.
    pub fn update_config(&self, config: StyleConfig) -> Result<(), OverlayError> {
        config.validate()?;
        let mut guard = self
            .config
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = Arc::new(config);
        Ok(())
    }

    pub fn metrics(&self) -> Option<&FontMetrics> {
        self.font.as_ref().map(|font| &font.metrics)
    }

    /// Full pipeline for one request: policy selection, layout, draw.
    pub fn render_caption(
        &self,
        image_bytes: &[u8],
        caption: &str,
    ) -> Result<Vec<u8>, OverlayError> {
        if image_bytes.is_empty() {
            return Err(OverlayError::EmptyImage);
        }
        let config = self.config();
        let split = split_caption(caption, &config, self.metrics())?;
        let layout = compute_layout(&split.lines, split.policy, &config, self.metrics())?;
        tracing::debug!(
            lines = layout.placements.len(),
            policy = ?layout.policy,
            "layout computed"
        );
        render(image_bytes, &layout, &config, self.font.as_ref())
    }

    /// Like [`Self::render_caption`] but packs lines with the balanced
    /// search instead of the marker-driven policies.
    pub fn render_caption_balanced(
        &self,
        image_bytes: &[u8],
        caption: &str,
        options: &BalanceOptions,
    ) -> Result<Vec<u8>, OverlayError> {
        if image_bytes.is_empty() {
            return Err(OverlayError::EmptyImage);
        }
        let config = self.config();
        let lines = balance_lines(caption, options)?;
        let layout = compute_layout(&lines, SplitPolicy::Balanced, &config, self.metrics())?;
        render(image_bytes, &layout, &config, self.font.as_ref())
    }

    /// Line split as `render_caption` would produce it, without rendering.
    pub fn preview(&self, caption: &str) -> Result<Vec<PreviewLine>, OverlayError> {
        let config = self.config();
        preview_lines(caption, &config, self.metrics())
    }

    /// Geometry as `render_caption` would produce it, without rendering.
    pub fn layout(&self, caption: &str) -> Result<LineLayout, OverlayError> {
        let config = self.config();
        let split = split_caption(caption, &config, self.metrics())?;
        compute_layout(&split.lines, split.policy, &config, self.metrics())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> OverlayService {
        // Estimator metrics keep these tests independent of system fonts.
        OverlayService::with_font(StyleConfig::default(), None).unwrap()
    }

    #[test]
    fn preview_matches_render_policy_selection() {
        let service = service();
        let preview = service.preview("Line one\nLine two\nLine three").unwrap();
        let layout = service.layout("Line one\nLine two\nLine three").unwrap();
        assert_eq!(layout.policy, SplitPolicy::ExplicitBreaks);
        assert_eq!(preview.len(), layout.placements.len());
        for (line, placed) in preview.iter().zip(&layout.placements) {
            assert_eq!(line.text, placed.line.text);
        }
    }

    #[test]
    fn preview_reports_word_and_character_counts() {
        let service = service();
        let preview = service.preview("Line one\nLine three").unwrap();
        assert_eq!(preview[0].word_count, 2);
        assert_eq!(preview[0].character_count, 8);
        assert_eq!(preview[1].character_count, 10);
    }

    #[test]
    fn empty_caption_is_an_input_error() {
        let service = service();
        assert!(matches!(
            service.preview("  "),
            Err(OverlayError::EmptyCaption)
        ));
        assert!(matches!(
            service.render_caption(b"not used", ""),
            Err(OverlayError::EmptyCaption)
        ));
    }

    #[test]
    fn empty_image_is_an_input_error() {
        let service = service();
        assert!(matches!(
            service.render_caption(&[], "hello"),
            Err(OverlayError::EmptyImage)
        ));
    }

    #[test]
    fn update_replaces_config_wholesale() {
        let service = service();
        let before = service.config();
        let next = StyleConfig {
            font_size: 64.0,
            ..StyleConfig::default()
        };
        service.update_config(next).unwrap();
        let after = service.config();
        assert_eq!(before.font_size, 48.0);
        assert_eq!(after.font_size, 64.0);
        assert!(!Arc::ptr_eq(&before, &after));
    }

    #[test]
    fn invalid_update_keeps_the_old_config() {
        let service = service();
        let bad = StyleConfig {
            bubble_opacity: 2.0,
            ..StyleConfig::default()
        };
        assert!(service.update_config(bad).is_err());
        assert_eq!(service.config().bubble_opacity, 1.0);
    }

    #[test]
    fn snapshot_survives_an_update() {
        let service = service();
        let snapshot = service.config();
        service
            .update_config(StyleConfig {
                font_size: 30.0,
                ..StyleConfig::default()
            })
            .unwrap();
        // The earlier snapshot is untouched by the replacement.
        assert_eq!(snapshot.font_size, 48.0);
    }

    #[test]
    fn rejects_invalid_initial_config() {
        let config = StyleConfig {
            canvas_height: 0,
            ..StyleConfig::default()
        };
        assert!(OverlayService::new(config).is_err());
    }
}
