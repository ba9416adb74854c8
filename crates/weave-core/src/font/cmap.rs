//! TrueType `cmap` reading for character coverage
//!
//! Only the segment boundaries are needed, not the glyph ids, so a subtable
//! is read piecewise: the header, the end codes, then the start codes.

use thiserror::Error;
use tracing::debug;

const HEADER_LEN: usize = 4;
const RECORD_LEN: usize = 8;
const FORMAT4_HEADER_LEN: usize = 14;
const FORMAT12_HEADER_LEN: usize = 16;
const FORMAT12_GROUP_LEN: usize = 12;

pub const CMAP_TAG: [u8; 4] = *b"cmap";

const PLATFORM_MICROSOFT: u16 = 3;
const ENCODING_SYMBOL: u16 = 0;
const ENCODING_UNICODE_BMP: u16 = 1;
const ENCODING_UNICODE_FULL: u16 = 10;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CmapError {
    #[error("cmap data ends at {available} bytes, needed {needed} at offset {offset}")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },
}

/// Inclusive code point range mapped by the font.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CmapSegment {
    pub start: u32,
    pub end: u32,
}

impl CmapSegment {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, cp: u32) -> bool {
        cp >= self.start && cp <= self.end
    }
}

/// Segments from a font's Microsoft cmap subtable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CmapCoverage {
    pub segments: Vec<CmapSegment>,
    /// The subtable was the symbol encoding (3, 0).
    pub is_symbol: bool,
}

impl CmapCoverage {
    /// Fallback for fonts without a usable subtable.
    pub fn basic_latin() -> Self {
        Self {
            segments: vec![CmapSegment::new(0x0000, 0x007F)],
            is_symbol: false,
        }
    }
}

/// Random access into a font's sfnt tables.
pub trait TableSource {
    /// Up to `length` bytes at `offset` within table `tag`. `None` when the
    /// font has no such table.
    fn read_table(&self, tag: [u8; 4], offset: usize, length: usize) -> Option<Vec<u8>>;
}

/// A bare `cmap` table in memory.
impl TableSource for [u8] {
    fn read_table(&self, tag: [u8; 4], offset: usize, length: usize) -> Option<Vec<u8>> {
        if tag != CMAP_TAG {
            return None;
        }
        let start = offset.min(self.len());
        let end = offset.saturating_add(length).min(self.len());
        Some(self[start..end].to_vec())
    }
}

fn read_exact<S: TableSource + ?Sized>(
    source: &S,
    offset: usize,
    length: usize,
) -> Result<Vec<u8>, CmapError> {
    let bytes = source.read_table(CMAP_TAG, offset, length).unwrap_or_default();
    if bytes.len() < length {
        return Err(CmapError::Truncated {
            offset,
            needed: length,
            available: bytes.len(),
        });
    }
    Ok(bytes)
}

fn be16(bytes: &[u8], at: usize) -> u16 {
    u16::from_be_bytes([bytes[at], bytes[at + 1]])
}

fn be32(bytes: &[u8], at: usize) -> u32 {
    u32::from_be_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

#[derive(Debug, Clone, Copy)]
struct EncodingRecord {
    encoding: u16,
    offset: usize,
}

/// Reads the coverage of `source`'s cmap.
///
/// Returns `Ok(None)` when the font has no cmap table or no Microsoft
/// subtable in a supported format; callers then assume Basic Latin.
pub fn load_cmap<S: TableSource + ?Sized>(source: &S) -> Result<Option<CmapCoverage>, CmapError> {
    let header = match source.read_table(CMAP_TAG, 0, HEADER_LEN) {
        Some(h) if h.len() == HEADER_LEN => h,
        Some(h) => {
            return Err(CmapError::Truncated {
                offset: 0,
                needed: HEADER_LEN,
                available: h.len(),
            })
        }
        None => return Ok(None),
    };
    let num_tables = be16(&header, 2) as usize;

    let mut records = Vec::new();
    for i in 0..num_tables {
        let record = read_exact(source, HEADER_LEN + i * RECORD_LEN, RECORD_LEN)?;
        if be16(&record, 0) != PLATFORM_MICROSOFT {
            continue;
        }
        records.push(EncodingRecord {
            encoding: be16(&record, 2),
            offset: be32(&record, 4) as usize,
        });
    }

    // Full-repertoire Unicode first, then BMP Unicode, then symbol.
    for wanted in [ENCODING_UNICODE_FULL, ENCODING_UNICODE_BMP, ENCODING_SYMBOL] {
        for record in records.iter().filter(|r| r.encoding == wanted) {
            let format = be16(&read_exact(source, record.offset, 2)?, 0);
            let segments = match format {
                4 => read_format4(source, record.offset)?,
                12 => read_format12(source, record.offset)?,
                other => {
                    debug!("Skipping cmap subtable format {}", other);
                    continue;
                }
            };
            let is_symbol = wanted == ENCODING_SYMBOL;
            return Ok(Some(CmapCoverage {
                segments: if is_symbol {
                    fix_symbol_ranges(segments)
                } else {
                    segments
                },
                is_symbol,
            }));
        }
    }
    Ok(None)
}

fn read_format4<S: TableSource + ?Sized>(
    source: &S,
    offset: usize,
) -> Result<Vec<CmapSegment>, CmapError> {
    let header = read_exact(source, offset, FORMAT4_HEADER_LEN)?;
    let seg_count = (be16(&header, 6) / 2) as usize;
    let array_len = seg_count * 2;

    let ends_at = offset + FORMAT4_HEADER_LEN;
    let end_codes = read_exact(source, ends_at, array_len)?;
    // A reserved pad word separates the two arrays.
    let start_codes = read_exact(source, ends_at + array_len + 2, array_len)?;

    Ok((0..seg_count)
        .map(|i| CmapSegment::new(be16(&start_codes, i * 2) as u32, be16(&end_codes, i * 2) as u32))
        .filter(|s| s.start <= s.end)
        .collect())
}

fn read_format12<S: TableSource + ?Sized>(
    source: &S,
    offset: usize,
) -> Result<Vec<CmapSegment>, CmapError> {
    let header = read_exact(source, offset, FORMAT12_HEADER_LEN)?;
    let groups = be32(&header, 12) as usize;
    let length = groups
        .checked_mul(FORMAT12_GROUP_LEN)
        .ok_or(CmapError::Truncated {
            offset,
            needed: usize::MAX,
            available: 0,
        })?;
    let data = read_exact(source, offset + FORMAT12_HEADER_LEN, length)?;

    Ok(data
        .chunks_exact(FORMAT12_GROUP_LEN)
        .map(|g| CmapSegment::new(be32(g, 0), be32(g, 4)))
        .filter(|s| s.start <= s.end)
        .collect())
}

/// Symbol fonts report their 0x20..0xFF repertoire at 0xF020..0xF0FF.
fn fix_symbol_ranges(segments: Vec<CmapSegment>) -> Vec<CmapSegment> {
    segments
        .into_iter()
        .map(|s| {
            if (s.start & 0xFF00) == 0xF000 && (s.end & 0xFF00) == 0xF000 {
                CmapSegment::new(s.start & 0xFF, s.end & 0xFF)
            } else {
                s
            }
        })
        .collect()
}

/// Builds a minimal `cmap` table with one format 4 subtable covering
/// `ranges`. Glyph ids are not meaningful.
pub fn build_cmap_table(ranges: &[(u16, u16)], symbol: bool) -> Vec<u8> {
    let mut segments: Vec<(u16, u16)> = ranges.to_vec();
    segments.push((0xFFFF, 0xFFFF));
    let seg_count = segments.len() as u16;

    let mut cmap = Vec::new();
    cmap.extend(&0u16.to_be_bytes()); // version
    cmap.extend(&1u16.to_be_bytes()); // numTables
    cmap.extend(&PLATFORM_MICROSOFT.to_be_bytes());
    let encoding = if symbol {
        ENCODING_SYMBOL
    } else {
        ENCODING_UNICODE_BMP
    };
    cmap.extend(&encoding.to_be_bytes());
    cmap.extend(&((HEADER_LEN + RECORD_LEN) as u32).to_be_bytes());

    let fmt_start = cmap.len();
    cmap.extend(&4u16.to_be_bytes()); // format
    cmap.extend(&0u16.to_be_bytes()); // length, patched below
    cmap.extend(&0u16.to_be_bytes()); // language
    cmap.extend(&(seg_count * 2).to_be_bytes());
    cmap.extend(&[0u8; 6]); // searchRange, entrySelector, rangeShift
    for (_, end) in &segments {
        cmap.extend(&end.to_be_bytes());
    }
    cmap.extend(&0u16.to_be_bytes()); // reservedPad
    for (start, _) in &segments {
        cmap.extend(&start.to_be_bytes());
    }
    for _ in &segments {
        cmap.extend(&1u16.to_be_bytes()); // idDelta
    }
    for _ in &segments {
        cmap.extend(&0u16.to_be_bytes()); // idRangeOffset
    }
    let len = (cmap.len() - fmt_start) as u16;
    cmap[fmt_start + 2..fmt_start + 4].copy_from_slice(&len.to_be_bytes());
    cmap
}
