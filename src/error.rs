use thiserror::Error;

/// Errors surfaced by the overlay engine. Input and config problems are
/// rejected before any layout work; codec problems carry the underlying
/// error verbatim and are never retried.
#[derive(Debug, Error)]
pub enum OverlayError {
    #[error("caption is empty")]
    EmptyCaption,

    #[error("background image is empty")]
    EmptyImage,

    #[error("invalid style config: {0}")]
    InvalidConfig(String),

    #[error("failed to decode background image ({mime}): {source}")]
    Decode {
        mime: String,
        source: image::ImageError,
    },

    #[error("failed to encode output image: {0}")]
    Encode(#[source] image::ImageError),

    #[error("failed to build overlay svg: {0}")]
    Svg(String),

    #[error("font family not available: {0}")]
    FontUnavailable(String),
}
