use std::fs;
use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use clap::Parser;

use caption_overlay_rust::{
    BalanceOptions, OverlayService, PreviewLine, ResolvedFont, balance_lines, load_font, logging,
    settings,
};

#[derive(Parser, Debug)]
#[command(
    name = "caption-overlay-rust",
    version,
    about = "Render white-bubble captions onto a vertical image"
)]
struct Cli {
    /// Background image (png/jpeg/gif/webp/bmp)
    #[arg(short = 'i', long = "input")]
    input: PathBuf,

    /// Caption text; use \n for explicit line breaks. Read from stdin when
    /// omitted.
    #[arg(short = 'c', long = "caption")]
    caption: Option<String>,

    /// Output PNG path
    #[arg(short = 'o', long = "output", default_value = "caption.png")]
    output: PathBuf,

    /// Vertical position (top, center, bottom)
    #[arg(short = 'p', long = "position")]
    position: Option<String>,

    /// Font size in pixels
    #[arg(long = "font-size")]
    font_size: Option<f32>,

    /// Font family for the caption text
    #[arg(long = "font-family")]
    font_family: Option<String>,

    /// Load the caption font from a file instead of the system database
    #[arg(long = "font-path")]
    font_path: Option<PathBuf>,

    /// Pack lines by the balancing search instead of greedy wrapping
    #[arg(long = "balanced")]
    balanced: bool,

    /// Print the line split as JSON and exit without rendering
    #[arg(long = "preview")]
    preview: bool,

    /// Disable the bubble drop shadow
    #[arg(long = "no-shadow")]
    no_shadow: bool,

    /// Read extra style settings from a TOML file
    #[arg(short = 'r', long = "read-settings")]
    read_settings: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(long = "verbose")]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let mut config = settings::load_style(cli.read_settings.as_deref())?;
    if let Some(position) = cli.position.as_deref() {
        config.position = position.parse()?;
    }
    if let Some(size) = cli.font_size {
        config.font_size = size;
    }
    if let Some(family) = cli.family_override() {
        config.font_family = family;
    }
    if cli.no_shadow {
        config.shadow.enabled = false;
    }

    let caption = match cli.caption.clone() {
        Some(caption) => caption,
        None => read_caption_from_stdin()?,
    };

    let service = match cli.font_path.as_deref() {
        Some(path) => {
            let metrics = load_font(path)?;
            let family = metrics.family().unwrap_or("sans-serif").to_string();
            OverlayService::with_font(config, Some(ResolvedFont { metrics, family }))?
        }
        None => OverlayService::new(config)?,
    };

    if cli.preview {
        let lines: Vec<PreviewLine> = if cli.balanced {
            balance_lines(&caption, &BalanceOptions::default())?
                .iter()
                .map(|line| PreviewLine::new(line))
                .collect()
        } else {
            service.preview(&caption)?
        };
        println!("{}", serde_json::to_string_pretty(&lines)?);
        return Ok(());
    }

    let image_bytes = fs::read(&cli.input)
        .with_context(|| format!("failed to read image: {}", cli.input.display()))?;
    let rendered = if cli.balanced {
        service.render_caption_balanced(&image_bytes, &caption, &BalanceOptions::default())?
    } else {
        service.render_caption(&image_bytes, &caption)?
    };
    fs::write(&cli.output, rendered)
        .with_context(|| format!("failed to write output: {}", cli.output.display()))?;
    println!("wrote {}", cli.output.display());
    Ok(())
}

impl Cli {
    fn family_override(&self) -> Option<String> {
        self.font_family
            .as_deref()
            .map(str::trim)
            .filter(|family| !family.is_empty())
            .map(str::to_string)
    }
}

fn read_caption_from_stdin() -> Result<String> {
    let mut stdin = io::stdin();
    if stdin.is_terminal() {
        return Err(anyhow!(
            "caption is required (pass --caption or pipe text on stdin)"
        ));
    }
    let mut buffer = String::new();
    stdin.read_to_string(&mut buffer)?;
    // Piped input carries a trailing newline; stripping it keeps one-line
    // captions on the auto-wrap policy.
    Ok(buffer.trim_end_matches(['\r', '\n']).to_string())
}
