// src/main.rs
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use fontweave::constants::{DEFAULT_DPI, DEFAULT_POINT_SIZE, RENDER_PADDING};
use fontweave::{drawing, render_line, system_environment, EnvironmentConfig, MeasureFlags, SubFontRef};

#[derive(Parser)]
#[command(name = "fontweave", about = "Resolve, measure and render text with font fallback")]
struct Cli {
    /// Screen resolution for point sizes.
    #[arg(long, global = true, default_value_t = DEFAULT_DPI)]
    dpi: f64,

    /// Point size for descriptions that give none.
    #[arg(long, global = true, default_value_t = DEFAULT_POINT_SIZE)]
    size: i32,

    /// Directory to search for fonts instead of the system ones. Repeatable.
    #[arg(long = "font-dir", global = true)]
    font_dirs: Vec<PathBuf>,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// List installed font families.
    Families,
    /// Show which face renders each character of TEXT.
    Resolve { font: String, text: String },
    /// Measure how much of TEXT fits in a width.
    Measure {
        font: String,
        text: String,
        /// Maximum width in pixels.
        #[arg(long)]
        max: Option<i32>,
        #[arg(long)]
        whole_words: bool,
        #[arg(long)]
        at_least_one: bool,
        #[arg(long)]
        partial: bool,
    },
    /// Render TEXT to a PNG file.
    Render {
        font: String,
        text: String,
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = EnvironmentConfig::new().with_dpi(cli.dpi);
    let default_pixels = config.pixels_for_size(cli.size);
    let config = config.with_default_pixel_size(default_pixels);
    let mut env = system_environment(&cli.font_dirs, config).context("loading fonts")?;

    match cli.command {
        Cmd::Families => {
            for family in env.families() {
                println!("{}", family);
            }
        }
        Cmd::Resolve { font, text } => {
            let id = env.get_font(&font)?;
            info!("{} resolved to {}", font, env.actual(id)?);
            for ch in text.chars() {
                let face = match env.resolve_char(id, ch)? {
                    SubFontRef::Index(i) => env.subfont_faces(id)?.get(i).cloned().unwrap_or_default(),
                    SubFontRef::Control => "(control)".to_string(),
                };
                println!("U+{:04X} {:?}\t{}", ch as u32, ch, face);
            }
            let stats = env.stats();
            info!(
                "{} subfonts, {} scans, {} characters given up",
                env.subfont_count(id)?,
                stats.scans,
                stats.gave_up
            );
            env.release(id)?;
        }
        Cmd::Measure {
            font,
            text,
            max,
            whole_words,
            at_least_one,
            partial,
        } => {
            let mut flags = MeasureFlags::empty();
            flags.set(MeasureFlags::WHOLE_WORDS, whole_words);
            flags.set(MeasureFlags::AT_LEAST_ONE, at_least_one);
            flags.set(MeasureFlags::PARTIAL_OK, partial);

            let id = env.get_font(&font)?;
            let (bytes, width) = env.measure(id, &text, max, flags)?;
            println!("{} bytes, {} pixels: {:?}", bytes, width, text.get(..bytes).unwrap_or_default());
            env.release(id)?;
        }
        Cmd::Render { font, text, output } => {
            let id = env.get_font(&font)?;
            let canvas = render_line(&mut env, id, &text, RENDER_PADDING)?;
            drawing::write_png(&canvas, &output)
                .with_context(|| format!("rendering {:?}", text))?;
            println!("{}x{} -> {}", canvas.width(), canvas.height(), output.display());
            env.release(id)?;
        }
    }
    Ok(())
}
