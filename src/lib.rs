//! Font fallback and rendering-font cache over the installed system fonts.
//!
//! The resolution logic lives in `weave-core`; `weave-system` supplies the
//! backend. This crate ties them together and writes rendered text to PNG.

pub mod constants;
pub mod drawing;
pub mod error;

use std::path::PathBuf;

pub use weave_core;
pub use weave_system;

pub use error::{AppError, AppResult};
pub use weave_core::{EnvironmentConfig, FontEnvironment, FontId, MeasureFlags, SubFontRef};
pub use weave_system::{Canvas, SystemBackend};

pub type SystemEnvironment = FontEnvironment<SystemBackend>;

/// Builds an environment over the fonts found in `font_dirs`, or in the
/// platform's usual font directories when none are given.
pub fn system_environment(
    font_dirs: &[PathBuf],
    config: EnvironmentConfig,
) -> AppResult<SystemEnvironment> {
    let dirs = if font_dirs.is_empty() {
        weave_system::default_font_dirs()
    } else {
        font_dirs.to_vec()
    };
    let backend = SystemBackend::discover(&dirs)?;
    Ok(FontEnvironment::new(backend, config))
}

/// Renders one line of `text` onto a canvas sized to fit it.
pub fn render_line(
    env: &mut SystemEnvironment,
    font: FontId,
    text: &str,
    padding: i32,
) -> AppResult<Canvas> {
    let width = env.text_width(font, text)?;
    if width <= 0 {
        return Err(AppError::EmptyText(text.to_string()));
    }
    let metrics = env.metrics(font)?;
    let mut canvas = Canvas::new(
        (width + 2 * padding) as u32,
        (metrics.linespace() + 2 * padding) as u32,
    );
    env.draw(font, &mut canvas, text, padding, padding + metrics.ascent)?;
    Ok(canvas)
}
