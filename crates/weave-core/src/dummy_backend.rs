//! Dummy backend for exercising the font core without a real font system

use std::cell::Cell;

use crate::attributes::{Slant, Weight};
use crate::encoding::Encoding;
use crate::font::cmap::{build_cmap_table, TableSource};
use crate::traits::{FontBackend, FontDescriptor, NativeCharTable, NativeMetrics};

/// One installed font of the dummy system.
#[derive(Debug, Clone)]
pub struct DummyFace {
    pub descriptor: FontDescriptor,
    /// Fixed advance of every glyph, in pixels.
    pub advance: i32,
    /// Raw `cmap` table served through `read_font_table`.
    pub cmap: Option<Vec<u8>>,
    pub char_table: Option<NativeCharTable>,
    pub fail_load: bool,
    pub underline: Option<(i32, i32)>,
    /// Charset the loaded font reports, when it differs from the listing.
    pub reported_charset: Option<String>,
}

impl DummyFace {
    /// A scalable Latin-1 font whose coverage is its declared encoding.
    pub fn latin(face: &str, advance: i32) -> Self {
        Self::with_charset(face, "iso8859-1", advance)
    }

    pub fn with_charset(face: &str, charset: &str, advance: i32) -> Self {
        Self {
            descriptor: FontDescriptor::scalable(face, charset),
            advance,
            cmap: None,
            char_table: None,
            fail_load: false,
            underline: None,
            reported_charset: None,
        }
    }

    /// A scalable Unicode font covering exactly `ranges` through its cmap.
    pub fn unicode(face: &str, advance: i32, ranges: &[(u16, u16)]) -> Self {
        Self {
            cmap: Some(build_cmap_table(ranges, false)),
            ..Self::with_charset(face, "unicode", advance)
        }
    }

    /// A symbol font: its cmap uses the (3,0) subtable in the F0xx range.
    pub fn symbol(face: &str, advance: i32) -> Self {
        Self {
            cmap: Some(build_cmap_table(&[(0xF020, 0xF07E)], true)),
            ..Self::with_charset(face, "symbol", advance)
        }
    }

    pub fn with_foundry(mut self, foundry: &str) -> Self {
        self.descriptor = self.descriptor.with_foundry(foundry);
        self
    }

    pub fn with_weight(mut self, weight: Weight) -> Self {
        self.descriptor = self.descriptor.with_weight(weight);
        self
    }

    pub fn with_slant(mut self, slant: Slant) -> Self {
        self.descriptor = self.descriptor.with_slant(slant);
        self
    }

    pub fn with_pixel_size(mut self, pixels: u32) -> Self {
        self.descriptor = self.descriptor.with_pixel_size(pixels);
        self
    }

    pub fn with_native_name(mut self, name: &str) -> Self {
        self.descriptor = self.descriptor.with_native_name(name);
        self
    }

    pub fn with_char_table(mut self, table: NativeCharTable) -> Self {
        self.char_table = Some(table);
        self
    }

    pub fn with_underline(mut self, position: i32, thickness: i32) -> Self {
        self.underline = Some((position, thickness));
        self
    }

    pub fn reporting_charset(mut self, charset: &str) -> Self {
        self.reported_charset = Some(charset.to_ascii_lowercase());
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail_load = true;
        self
    }
}

/// A loaded dummy font.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DummyFont {
    pub face: usize,
    pub pixel_size: u32,
}

/// Recorded drawing operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrawOp {
    Text {
        face: String,
        text: String,
        x: i32,
        y: i32,
    },
    Rect {
        x: i32,
        y: i32,
        width: i32,
        height: i32,
    },
}

/// Surface that records operations for testing
#[derive(Debug, Default)]
pub struct DummySurface {
    pub ops: Vec<DrawOp>,
}

impl DummySurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Text runs drawn, in order.
    pub fn texts(&self) -> Vec<(&str, &str)> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Text { face, text, .. } => Some((face.as_str(), text.as_str())),
                DrawOp::Rect { .. } => None,
            })
            .collect()
    }

    pub fn rects(&self) -> Vec<(i32, i32, i32, i32)> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Rect {
                    x,
                    y,
                    width,
                    height,
                } => Some((*x, *y, *width, *height)),
                DrawOp::Text { .. } => None,
            })
            .collect()
    }

    pub fn clear(&mut self) {
        self.ops.clear();
    }
}

/// Dummy backend with a configurable set of installed fonts. Counts the
/// calls tests care about.
#[derive(Debug, Default)]
pub struct DummyBackend {
    faces: Vec<DummyFace>,
    natives: Vec<(String, usize)>,
    default_face: Option<usize>,
    enumerations: Cell<usize>,
    loads: Cell<usize>,
    failed_loads: Cell<usize>,
}

impl DummyBackend {
    /// A system with no fonts at all.
    pub fn new() -> Self {
        Self::default()
    }

    /// A small system: Latin-1 core faces, two Unicode sans faces with
    /// Greek and Cyrillic, a symbol font and the native `fixed` font, which
    /// is also the default.
    pub fn standard() -> Self {
        Self::new()
            .with_face(DummyFace::latin("Helvetica", 7).with_foundry("adobe"))
            .with_face(
                DummyFace::latin("Helvetica", 8)
                    .with_foundry("adobe")
                    .with_weight(Weight::Bold),
            )
            .with_face(DummyFace::latin("Times", 7).with_foundry("adobe"))
            .with_face(DummyFace::latin("Courier", 6).with_foundry("adobe"))
            .with_face(DummyFace::unicode(
                "DejaVu Sans",
                9,
                &[(0x20, 0x7E), (0xA0, 0x17F), (0x370, 0x3FF)],
            ))
            .with_face(DummyFace::unicode(
                "Noto Sans",
                10,
                &[(0x20, 0x7E), (0xA0, 0xFF), (0x400, 0x4FF)],
            ))
            .with_face(DummyFace::symbol("Symbol", 9))
            .with_default(
                DummyFace::latin("fixed", 6)
                    .with_foundry("misc")
                    .with_pixel_size(13)
                    .with_native_name("-misc-fixed-medium-r-semicondensed--13-120-75-75-c-60-iso8859-1"),
            )
            .with_native_alias("fixed", "fixed")
    }

    pub fn with_face(mut self, face: DummyFace) -> Self {
        self.faces.push(face);
        self
    }

    /// Adds `face` and makes it the last-resort default.
    pub fn with_default(mut self, face: DummyFace) -> Self {
        self.faces.push(face);
        self.default_face = Some(self.faces.len() - 1);
        self
    }

    /// Makes `name` a native font name for the installed face `face`.
    pub fn with_native_alias(mut self, name: &str, face: &str) -> Self {
        if let Some(index) = self.find_face(face) {
            self.natives.push((name.to_string(), index));
        }
        self
    }

    fn find_face(&self, face: &str) -> Option<usize> {
        self.faces
            .iter()
            .position(|f| f.descriptor.face.eq_ignore_ascii_case(face))
    }

    fn face_for(&self, descriptor: &FontDescriptor) -> Option<usize> {
        self.faces.iter().position(|f| f.descriptor == *descriptor)
    }

    /// Number of `enumerate_families` calls so far.
    pub fn enumerations(&self) -> usize {
        self.enumerations.get()
    }

    pub fn loads(&self) -> usize {
        self.loads.get()
    }

    pub fn failed_loads(&self) -> usize {
        self.failed_loads.get()
    }

    pub fn faces(&self) -> &[DummyFace] {
        &self.faces
    }
}

impl FontBackend for DummyBackend {
    type Resource = DummyFont;
    type Surface = DummySurface;

    fn enumerate_families(&self, pattern: &str) -> Vec<FontDescriptor> {
        self.enumerations.set(self.enumerations.get() + 1);
        self.faces
            .iter()
            .filter(|f| pattern == "*" || f.descriptor.face.eq_ignore_ascii_case(pattern))
            .map(|f| f.descriptor.clone())
            .collect()
    }

    fn load_concrete_font(&self, descriptor: &FontDescriptor, pixel_size: u32) -> Option<DummyFont> {
        let Some(face) = self.face_for(descriptor) else {
            self.failed_loads.set(self.failed_loads.get() + 1);
            return None;
        };
        if self.faces[face].fail_load || pixel_size == 0 {
            self.failed_loads.set(self.failed_loads.get() + 1);
            return None;
        }
        self.loads.set(self.loads.get() + 1);
        Some(DummyFont { face, pixel_size })
    }

    fn native_metrics(&self, resource: &DummyFont) -> NativeMetrics {
        let face = &self.faces[resource.face];
        let px = resource.pixel_size as i32;
        NativeMetrics {
            face: face.descriptor.face.clone(),
            foundry: face.descriptor.foundry.clone(),
            charset: face
                .reported_charset
                .clone()
                .unwrap_or_else(|| face.descriptor.charset.clone()),
            ascent: (px * 3 / 4).max(1),
            descent: (px / 4).max(1),
            max_width: face.advance,
            fixed_pitch: true,
            weight: face.descriptor.weight,
            slant: face.descriptor.slant,
            pixel_size: resource.pixel_size,
            underline_position: face.underline.map(|(pos, _)| pos),
            underline_thickness: face.underline.map(|(_, h)| h),
        }
    }

    fn native_char_table(&self, resource: &DummyFont) -> Option<NativeCharTable> {
        self.faces[resource.face].char_table.clone()
    }

    fn supports_font_tables(&self, resource: &DummyFont) -> bool {
        self.faces[resource.face].cmap.is_some()
    }

    fn read_font_table(
        &self,
        resource: &DummyFont,
        tag: [u8; 4],
        offset: usize,
        length: usize,
    ) -> Option<Vec<u8>> {
        self.faces[resource.face]
            .cmap
            .as_deref()?
            .read_table(tag, offset, length)
    }

    fn measure_native(&self, resource: &DummyFont, encoding: Encoding, text: &[u8]) -> i32 {
        let glyphs = if encoding.is_two_byte() {
            text.len() / 2
        } else {
            text.len()
        };
        glyphs as i32 * self.faces[resource.face].advance
    }

    fn draw_native(
        &self,
        surface: &mut DummySurface,
        resource: &DummyFont,
        encoding: Encoding,
        text: &[u8],
        x: i32,
        y: i32,
    ) {
        surface.ops.push(DrawOp::Text {
            face: self.faces[resource.face].descriptor.face.clone(),
            text: encoding.decode(text),
            x,
            y,
        });
    }

    fn fill_rect(&self, surface: &mut DummySurface, x: i32, y: i32, width: i32, height: i32) {
        surface.ops.push(DrawOp::Rect {
            x,
            y,
            width,
            height,
        });
    }

    fn native_font(&self, name: &str) -> Option<FontDescriptor> {
        self.natives
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, index)| self.faces[*index].descriptor.clone())
    }

    fn default_font(&self) -> Option<FontDescriptor> {
        self.default_face
            .map(|index| self.faces[index].descriptor.clone())
    }
}
