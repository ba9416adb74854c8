//! Weave System - a font backend over the fonts installed on this machine
//!
//! Faces come from fontconfig (with the `font-discovery` feature on Linux)
//! or from scanning font directories. Coverage is read from each face's own
//! cmap table; measurement and rasterization use fontdue.

pub mod backend;
pub mod canvas;
pub mod discovery;
pub mod error;
pub mod sfnt;

pub use backend::{SystemBackend, SystemFace, SystemFont, SYSTEM_CHARSET};
pub use canvas::Canvas;
pub use discovery::{default_font_dirs, discover_fonts, FontSource};
pub use error::{SystemError, SystemResult};
