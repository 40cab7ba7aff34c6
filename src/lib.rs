mod error;
pub mod logging;
pub mod overlay;
pub mod settings;

pub use error::OverlayError;
pub use overlay::balance::{BalanceOptions, MAX_EXHAUSTIVE_WORDS, balance_lines};
pub use overlay::font::{FontMetrics, ResolvedFont, load_font, resolve_font};
pub use overlay::layout::{BUBBLE_OVERLAP_PX, compute_layout};
pub use overlay::render::{render, render_base64};
pub use overlay::service::OverlayService;
pub use overlay::split::{SplitCaption, preview_lines, split_caption};
pub use overlay::{
    BubbleRect, LineLayout, PlacedLine, PreviewLine, SafeZone, SafeZones, ShadowStyle,
    SplitPolicy, StyleConfig, TextLine, VerticalPosition,
};
