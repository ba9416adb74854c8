// src/config.rs
use crate::constants::{
    DEFAULT_CHARSET, DEFAULT_DPI, DEFAULT_FAMILY, DEFAULT_PIXEL_SIZE, FALLBACK_CLASSES,
    FONT_ALIASES, GLOBAL_FALLBACKS,
};

/// An ordered list of face names considered mutually substitutable.
#[derive(Clone, Debug, PartialEq)]
pub struct FallbackClass {
    pub name: String,
    pub members: Vec<String>,
}

impl FallbackClass {
    pub fn new(name: &str, members: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            members: members.iter().map(|m| m.to_string()).collect(),
        }
    }

    pub fn contains(&self, face: &str) -> bool {
        self.members.iter().any(|m| m.eq_ignore_ascii_case(face))
    }
}

/// Alias groups, curated fallback classes and the global last-resort class.
#[derive(Clone, Debug, PartialEq)]
pub struct FallbackTable {
    pub aliases: Vec<Vec<String>>,
    pub classes: Vec<FallbackClass>,
    pub global: Vec<String>,
}

impl Default for FallbackTable {
    fn default() -> Self {
        Self {
            aliases: FONT_ALIASES
                .iter()
                .map(|group| group.iter().map(|s| s.to_string()).collect())
                .collect(),
            classes: FALLBACK_CLASSES
                .iter()
                .map(|(name, members)| FallbackClass::new(name, members))
                .collect(),
            global: GLOBAL_FALLBACKS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl FallbackTable {
    /// An empty table: no aliases, no classes, no global fallbacks.
    pub fn empty() -> Self {
        Self {
            aliases: Vec::new(),
            classes: Vec::new(),
            global: Vec::new(),
        }
    }

    /// The alias group containing `face`, including `face` itself.
    pub fn aliases_of(&self, face: &str) -> &[String] {
        self.aliases
            .iter()
            .find(|group| group.iter().any(|a| a.eq_ignore_ascii_case(face)))
            .map(|group| group.as_slice())
            .unwrap_or(&[])
    }

    pub fn with_alias_group(mut self, group: &[&str]) -> Self {
        self.aliases
            .push(group.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn with_class(mut self, name: &str, members: &[&str]) -> Self {
        self.classes.push(FallbackClass::new(name, members));
        self
    }

    pub fn with_global(mut self, faces: &[&str]) -> Self {
        self.global = faces.iter().map(|s| s.to_string()).collect();
        self
    }
}

#[derive(Clone, Debug)]
pub struct EnvironmentConfig {
    /// Screen resolution used to convert points to pixels.
    pub dpi: f64,
    /// Pixel size used when a font asks for size 0.
    pub default_pixel_size: u32,
    /// Family used when a description names none.
    pub default_family: String,
    /// Charset wanted for base fonts unless the description names one.
    pub preferred_charset: String,
    pub fallbacks: FallbackTable,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            dpi: DEFAULT_DPI,
            default_pixel_size: DEFAULT_PIXEL_SIZE,
            default_family: DEFAULT_FAMILY.to_string(),
            preferred_charset: DEFAULT_CHARSET.to_string(),
            fallbacks: FallbackTable::default(),
        }
    }
}

impl EnvironmentConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dpi(mut self, dpi: f64) -> Self {
        if dpi.is_finite() && dpi > 0.0 {
            self.dpi = dpi;
        }
        self
    }

    pub fn with_default_pixel_size(mut self, pixels: u32) -> Self {
        self.default_pixel_size = pixels.max(1);
        self
    }

    pub fn with_default_family(mut self, family: &str) -> Self {
        self.default_family = family.to_string();
        self
    }

    pub fn with_preferred_charset(mut self, charset: &str) -> Self {
        self.preferred_charset = charset.to_ascii_lowercase();
        self
    }

    pub fn with_fallbacks(mut self, fallbacks: FallbackTable) -> Self {
        self.fallbacks = fallbacks;
        self
    }

    /// Converts a font size to pixels: positive sizes are points, negative
    /// sizes are pixels, zero is the default size.
    pub fn pixels_for_size(&self, size: i32) -> u32 {
        match size {
            0 => self.default_pixel_size,
            s if s < 0 => s.unsigned_abs(),
            s => ((s as f64 * self.dpi / 72.0).round() as u32).max(1),
        }
    }

    /// Converts a pixel size back to whole points.
    pub fn points_for_pixels(&self, pixels: u32) -> i32 {
        ((pixels as f64 * 72.0 / self.dpi).round() as i32).max(1)
    }
}
