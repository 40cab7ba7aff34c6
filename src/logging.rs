use tracing_subscriber::{EnvFilter, fmt};

/// Opt-in logging for the CLI. `RUST_LOG` overrides the verbose default.
pub fn init(verbose: bool) {
    if !verbose {
        return;
    }
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("caption_overlay_rust=debug"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true)
        .try_init();
}
