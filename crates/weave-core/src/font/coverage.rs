//! Character existence index
//!
//! A sparse bitmap over `0..FONTMAP_NUM_CHARS`, one 1024-bit page at a time.
//! Pages are computed whole on first use and never recomputed.

use crate::constants::{
    FONTMAP_NUM_CHARS, FONTMAP_PAGES, FONTMAP_PAGE_BYTES, FONTMAP_PAGE_CHARS, FONTMAP_SHIFT,
};
use crate::encoding::Encoding;
use crate::font::cmap::CmapSegment;
use crate::traits::NativeCharTable;

pub type Page = [u8; FONTMAP_PAGE_BYTES];

/// How a family's pages are computed. Chosen once when the family is created.
#[derive(Debug, Clone, PartialEq)]
pub enum CoverageStrategy {
    /// Segments read from the font's cmap table.
    Cmap(Vec<CmapSegment>),
    /// Anything the declared encoding can represent, other than control
    /// characters, is assumed present.
    DeclaredEncoding(Encoding),
    /// Per-glyph existence reported by the font server.
    ServerProbe {
        encoding: Encoding,
        table: NativeCharTable,
    },
    /// Nothing is computed; only explicitly marked code points exist.
    Control,
}

impl CoverageStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            CoverageStrategy::Cmap(_) => "cmap",
            CoverageStrategy::DeclaredEncoding(_) => "declared-encoding",
            CoverageStrategy::ServerProbe { .. } => "server-probe",
            CoverageStrategy::Control => "control",
        }
    }

    /// Sets the bits of `page` for every code point the family can render.
    pub fn fill_page(&self, page: usize, bits: &mut Page) {
        let base = (page as u32) << FONTMAP_SHIFT;
        let limit = base + FONTMAP_PAGE_CHARS;
        match self {
            CoverageStrategy::Cmap(segments) => {
                for segment in segments {
                    let start = segment.start.max(base);
                    let end = segment.end.min(limit - 1);
                    for cp in start..=end {
                        set_bit(bits, cp - base);
                    }
                }
            }
            CoverageStrategy::DeclaredEncoding(encoding) => {
                for cp in base..limit {
                    if char::from_u32(cp).is_some_and(|ch| !ch.is_control() && encoding.can_encode(ch)) {
                        set_bit(bits, cp - base);
                    }
                }
            }
            CoverageStrategy::ServerProbe { encoding, table } => {
                let two_byte = encoding.is_two_byte();
                let mut native = Vec::with_capacity(4);
                for cp in base..limit {
                    let Some(ch) = char::from_u32(cp) else {
                        continue;
                    };
                    native.clear();
                    if !encoding.encode_char(ch, &mut native) {
                        continue;
                    }
                    let cell = match (two_byte, native.as_slice()) {
                        (true, [row, col]) => Some((*row, *col)),
                        (false, [col]) => Some((0, *col)),
                        _ => None,
                    };
                    if let Some((row, col)) = cell {
                        if table.has_glyph(row, col, two_byte) {
                            set_bit(bits, cp - base);
                        }
                    }
                }
            }
            CoverageStrategy::Control => {}
        }
    }
}

fn set_bit(bits: &mut Page, offset: u32) {
    bits[(offset >> 3) as usize] |= 1 << (offset & 7);
}

fn page_of(cp: u32) -> Option<usize> {
    (cp < FONTMAP_NUM_CHARS).then_some((cp >> FONTMAP_SHIFT) as usize)
}

/// Lazily populated bitmap of the code points a family can display.
#[derive(Debug, Clone)]
pub struct CharacterExistenceIndex {
    pages: Vec<Option<Box<Page>>>,
}

impl Default for CharacterExistenceIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl CharacterExistenceIndex {
    pub fn new() -> Self {
        Self {
            pages: vec![None; FONTMAP_PAGES],
        }
    }

    /// The bit for `cp`, or `None` if its page has not been computed yet or
    /// `cp` is out of range.
    pub fn get(&self, cp: u32) -> Option<bool> {
        let page = self.pages.get(page_of(cp)?)?.as_ref()?;
        let offset = cp & (FONTMAP_PAGE_CHARS - 1);
        Some(page[(offset >> 3) as usize] & (1 << (offset & 7)) != 0)
    }

    /// Forces the bit for `cp` on, allocating an empty page if needed.
    /// Out-of-range code points are ignored.
    pub fn set(&mut self, cp: u32) {
        let Some(page) = page_of(cp) else {
            return;
        };
        let bits = self.pages[page].get_or_insert_with(|| Box::new([0; FONTMAP_PAGE_BYTES]));
        set_bit(bits, cp & (FONTMAP_PAGE_CHARS - 1));
    }

    pub fn is_page_loaded(&self, page: usize) -> bool {
        self.pages.get(page).is_some_and(|p| p.is_some())
    }

    /// Computes `page` with `fill` unless it is already loaded. Returns
    /// whether a computation happened.
    pub fn load_page_with<F>(&mut self, page: usize, fill: F) -> bool
    where
        F: FnOnce(&mut Page),
    {
        let Some(slot) = self.pages.get_mut(page) else {
            return false;
        };
        if slot.is_some() {
            return false;
        }
        let mut bits = Box::new([0; FONTMAP_PAGE_BYTES]);
        fill(&mut bits);
        *slot = Some(bits);
        true
    }

    pub fn loaded_pages(&self) -> usize {
        self.pages.iter().filter(|p| p.is_some()).count()
    }

    /// Index of the page holding `cp`.
    pub fn page_for(cp: u32) -> Option<usize> {
        page_of(cp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(strategy: &CoverageStrategy, cp: u32) -> bool {
        let mut index = CharacterExistenceIndex::new();
        let page = CharacterExistenceIndex::page_for(cp).unwrap();
        index.load_page_with(page, |bits| strategy.fill_page(page, bits));
        index.get(cp).unwrap()
    }

    #[test]
    fn test_unloaded_and_out_of_range() {
        let mut index = CharacterExistenceIndex::new();
        assert_eq!(index.get(0x41), None);
        assert_eq!(index.get(FONTMAP_NUM_CHARS), None);
        index.set(FONTMAP_NUM_CHARS + 5);
        assert_eq!(index.loaded_pages(), 0);
    }

    #[test]
    fn test_page_is_computed_once() {
        let mut index = CharacterExistenceIndex::new();
        assert!(index.load_page_with(0, |bits| bits[8] = 0xFF));
        assert!(!index.load_page_with(0, |bits| bits[8] = 0));
        assert_eq!(index.get(0x40), Some(true));
        assert!(index.is_page_loaded(0));
        assert!(!index.is_page_loaded(1));
    }

    #[test]
    fn test_set_allocates_page() {
        let mut index = CharacterExistenceIndex::new();
        index.set(0x2FFFF);
        assert_eq!(index.get(0x2FFFF), Some(true));
        assert_eq!(index.get(0x2FFFE), Some(false));
    }

    #[test]
    fn test_cmap_strategy_clips_to_page() {
        let strategy = CoverageStrategy::Cmap(vec![CmapSegment::new(0x3F0, 0x410)]);
        assert!(filled(&strategy, 0x3FF));
        assert!(filled(&strategy, 0x400));
        assert!(filled(&strategy, 0x410));
        assert!(!filled(&strategy, 0x411));
        assert!(!filled(&strategy, 0x3EF));
    }

    #[test]
    fn test_declared_encoding_strategy() {
        let strategy = CoverageStrategy::DeclaredEncoding(Encoding::Koi8R);
        assert!(filled(&strategy, 'Ж' as u32));
        assert!(!filled(&strategy, 'Ā' as u32));
        assert!(!filled(&strategy, 0xD800));

        let latin = CoverageStrategy::DeclaredEncoding(Encoding::Latin1);
        assert!(filled(&latin, 0xE9));
        assert!(!filled(&latin, '\n' as u32));
        assert!(!filled(&latin, 0x85));
    }

    #[test]
    fn test_server_probe_strategy() {
        let strategy = CoverageStrategy::ServerProbe {
            encoding: Encoding::Latin1,
            table: NativeCharTable {
                min_byte1: 0,
                max_byte1: 0,
                min_byte2: 0,
                max_byte2: 0x7F,
                widths: None,
            },
        };
        assert!(filled(&strategy, 'A' as u32));
        assert!(!filled(&strategy, 0x7));
        assert!(!filled(&strategy, 0xE9));
    }

    #[test]
    fn test_control_strategy_is_empty() {
        assert!(!filled(&CoverageStrategy::Control, 0x20));
    }
}
