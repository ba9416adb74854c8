// src/constants.rs

/// Point size used when the command line gives none.
pub const DEFAULT_POINT_SIZE: i32 = 12;
pub const DEFAULT_DPI: f64 = 96.0;

/// Blank border around rendered text, in pixels.
pub const RENDER_PADDING: i32 = 8;

// Colors of rendered PNGs
pub const BACKGROUND: (f64, f64, f64) = (1.0, 1.0, 1.0);
pub const INK: (f64, f64, f64) = (0.0, 0.0, 0.0);
