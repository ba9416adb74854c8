use crate::attributes::{Slant, Weight};
use crate::encoding::Encoding;
use crate::error::{FontError, FontResult};
use crate::xlfd::{SetWidth, Xlfd};

/// Render backend capability surface
///
/// The core never talks to a font server, GDI or a rasterizer directly.
/// Everything platform-specific goes through this trait. Text handed to
/// `measure_native` and `draw_native` is already converted to the family's
/// native encoding.
pub trait FontBackend {
    /// A loaded, exclusively owned rendering resource.
    type Resource;
    /// Whatever the backend draws onto.
    type Surface;

    /// Concrete fonts whose face matches `pattern` case-insensitively. `"*"`
    /// lists every installed font.
    fn enumerate_families(&self, pattern: &str) -> Vec<FontDescriptor>;

    /// Instantiates `descriptor` at `pixel_size`. `None` when the font cannot
    /// be loaded at that size.
    fn load_concrete_font(&self, descriptor: &FontDescriptor, pixel_size: u32)
        -> Option<Self::Resource>;

    fn native_metrics(&self, resource: &Self::Resource) -> NativeMetrics;

    /// Per-glyph existence data for fonts with no readable tables.
    fn native_char_table(&self, _resource: &Self::Resource) -> Option<NativeCharTable> {
        None
    }

    /// Whether `read_font_table` can serve sfnt tables for this resource.
    fn supports_font_tables(&self, _resource: &Self::Resource) -> bool {
        false
    }

    /// Reads `length` bytes at `offset` of the sfnt table `tag`. Reads past
    /// the end of the table return the bytes that exist.
    fn read_font_table(
        &self,
        _resource: &Self::Resource,
        _tag: [u8; 4],
        _offset: usize,
        _length: usize,
    ) -> Option<Vec<u8>> {
        None
    }

    /// Width of `text` in pixels. Widths must be additive: the width of a
    /// concatenation is the sum of the widths of its parts, so no kerning
    /// or shaping across the bytes handed in.
    fn measure_native(&self, resource: &Self::Resource, encoding: Encoding, text: &[u8]) -> i32;

    fn draw_native(
        &self,
        surface: &mut Self::Surface,
        resource: &Self::Resource,
        encoding: Encoding,
        text: &[u8],
        x: i32,
        y: i32,
    );

    fn fill_rect(&self, surface: &mut Self::Surface, x: i32, y: i32, width: i32, height: i32);

    /// Platform font names that bypass description parsing, such as `fixed`.
    fn native_font(&self, _name: &str) -> Option<FontDescriptor> {
        None
    }

    /// The absolute last-resort font. `None` only when no fonts exist at all.
    fn default_font(&self) -> Option<FontDescriptor>;
}

// Data structures

/// One concrete font the backend can load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontDescriptor {
    pub face: String,
    pub foundry: Option<String>,
    pub weight: Weight,
    /// Three-way slant as the platform reports it.
    pub slant: Slant,
    pub set_width: SetWidth,
    /// `None` for scalable fonts.
    pub pixel_size: Option<u32>,
    pub charset: String,
    /// Name the backend uses to load the font.
    pub native_name: String,
}

impl FontDescriptor {
    /// A scalable, normal-width descriptor.
    pub fn scalable(face: &str, charset: &str) -> Self {
        Self {
            face: face.to_string(),
            foundry: None,
            weight: Weight::Normal,
            slant: Slant::Roman,
            set_width: SetWidth::Normal,
            pixel_size: None,
            charset: charset.to_ascii_lowercase(),
            native_name: face.to_string(),
        }
    }

    /// Builds a descriptor from an X font name. A pixel field of 0 marks a
    /// scalable font.
    pub fn from_xlfd(name: &str) -> FontResult<Self> {
        let xlfd = Xlfd::parse(name)?;
        let face = xlfd.family.ok_or_else(|| FontError::MalformedXlfd {
            name: name.to_string(),
        })?;
        Ok(Self {
            face,
            foundry: xlfd.foundry,
            weight: xlfd.weight,
            slant: xlfd.slant,
            set_width: xlfd.set_width,
            pixel_size: xlfd.pixel_size.filter(|px| *px > 0),
            charset: xlfd.charset.unwrap_or_else(|| "iso8859-1".to_string()),
            native_name: name.to_string(),
        })
    }

    pub fn with_foundry(mut self, foundry: &str) -> Self {
        self.foundry = Some(foundry.to_ascii_lowercase());
        self
    }

    pub fn with_weight(mut self, weight: Weight) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_slant(mut self, slant: Slant) -> Self {
        self.slant = slant;
        self
    }

    pub fn with_set_width(mut self, set_width: SetWidth) -> Self {
        self.set_width = set_width;
        self
    }

    pub fn with_pixel_size(mut self, pixels: u32) -> Self {
        self.pixel_size = Some(pixels);
        self
    }

    pub fn with_native_name(mut self, name: &str) -> Self {
        self.native_name = name.to_string();
        self
    }

    pub fn is_scalable(&self) -> bool {
        self.pixel_size.is_none()
    }
}

/// Metrics of a loaded resource, in pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeMetrics {
    pub face: String,
    pub foundry: Option<String>,
    pub charset: String,
    pub ascent: i32,
    pub descent: i32,
    pub max_width: i32,
    pub fixed_pitch: bool,
    pub weight: Weight,
    pub slant: Slant,
    pub pixel_size: u32,
    pub underline_position: Option<i32>,
    pub underline_thickness: Option<i32>,
}

/// Row/column glyph range of a font with per-character widths, as an X
/// server reports it. Single-byte fonts use row 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeCharTable {
    pub min_byte1: u8,
    pub max_byte1: u8,
    pub min_byte2: u8,
    pub max_byte2: u8,
    /// Row-major widths of every cell in the range. `None` means every cell
    /// in the range has a glyph.
    pub widths: Option<Vec<i16>>,
}

impl NativeCharTable {
    /// Whether the cell at `(row, col)` has a glyph of nonzero width.
    pub fn has_glyph(&self, row: u8, col: u8, two_byte: bool) -> bool {
        // Single-byte fonts never draw anything useful below the space.
        let min_col = if two_byte {
            self.min_byte2
        } else {
            self.min_byte2.max(32)
        };
        if row < self.min_byte1 || row > self.max_byte1 || col < min_col || col > self.max_byte2 {
            return false;
        }
        let Some(widths) = &self.widths else {
            return true;
        };
        let row_len = (self.max_byte2 as usize) - (self.min_byte2 as usize) + 1;
        let index = (row - self.min_byte1) as usize * row_len + (col - self.min_byte2) as usize;
        widths.get(index).is_some_and(|w| *w != 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_from_xlfd() {
        let d = FontDescriptor::from_xlfd("-misc-fixed-bold-r-semicondensed--13-120-75-75-c-60-iso10646-1")
            .unwrap();
        assert_eq!(d.face, "fixed");
        assert_eq!(d.foundry.as_deref(), Some("misc"));
        assert_eq!(d.weight, Weight::Bold);
        assert_eq!(d.set_width, SetWidth::Condensed);
        assert_eq!(d.pixel_size, Some(13));
        assert_eq!(d.charset, "iso10646-1");

        let scalable = FontDescriptor::from_xlfd("-adobe-times-medium-i-normal--0-0-0-0-p-0-iso8859-1")
            .unwrap();
        assert!(scalable.is_scalable());
        assert_eq!(scalable.slant, Slant::Italic);
    }

    #[test]
    fn test_char_table_single_byte() {
        let table = NativeCharTable {
            min_byte1: 0,
            max_byte1: 0,
            min_byte2: 0,
            max_byte2: 255,
            widths: None,
        };
        assert!(!table.has_glyph(0, 0x1F, false));
        assert!(table.has_glyph(0, 0x41, false));
        assert!(!table.has_glyph(1, 0x41, false));
    }

    #[test]
    fn test_char_table_widths() {
        let table = NativeCharTable {
            min_byte1: 0x30,
            max_byte1: 0x31,
            min_byte2: 0x20,
            max_byte2: 0x21,
            widths: Some(vec![8, 0, 8, 8]),
        };
        assert!(table.has_glyph(0x30, 0x20, true));
        assert!(!table.has_glyph(0x30, 0x21, true));
        assert!(table.has_glyph(0x31, 0x21, true));
        assert!(!table.has_glyph(0x32, 0x20, true));
    }
}
