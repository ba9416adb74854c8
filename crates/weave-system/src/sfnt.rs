//! Minimal sfnt (TrueType/OpenType) container reader
//!
//! Only what the backend needs: the table directory, collection headers,
//! family names, weight and slant bits, fixed pitch and underline metrics.

use crate::error::{SystemError, SystemResult};

const TTC_TAG: [u8; 4] = *b"ttcf";
const NAME_TAG: [u8; 4] = *b"name";
const OS2_TAG: [u8; 4] = *b"OS/2";
const POST_TAG: [u8; 4] = *b"post";
const HEAD_TAG: [u8; 4] = *b"head";

const NAME_FAMILY: u16 = 1;
const NAME_SUBFAMILY: u16 = 2;
const NAME_TYPOGRAPHIC_FAMILY: u16 = 16;

const LANGUAGE_EN_US: u16 = 0x0409;

// fsSelection bits
const FS_ITALIC: u16 = 1 << 0;
const FS_BOLD: u16 = 1 << 5;
const FS_OBLIQUE: u16 = 1 << 9;

fn read_u16(data: &[u8], offset: usize) -> SystemResult<u16> {
    data.get(offset..offset + 2)
        .map(|b| u16::from_be_bytes([b[0], b[1]]))
        .ok_or_else(|| SystemError::Malformed(format!("short read at {}", offset)))
}

fn read_i16(data: &[u8], offset: usize) -> SystemResult<i16> {
    read_u16(data, offset).map(|v| v as i16)
}

fn read_u32(data: &[u8], offset: usize) -> SystemResult<u32> {
    data.get(offset..offset + 4)
        .map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or_else(|| SystemError::Malformed(format!("short read at {}", offset)))
}

/// Number of faces in a font file: the collection size for `.ttc` files,
/// one otherwise.
pub fn face_count(data: &[u8]) -> SystemResult<u32> {
    if data.get(0..4) == Some(&TTC_TAG[..]) {
        read_u32(data, 8)
    } else {
        read_u32(data, 0).map(|_| 1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableRecord {
    pub tag: [u8; 4],
    pub offset: usize,
    pub length: usize,
}

/// The table directory of one face, plus the style information read from
/// it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SfntFace {
    pub tables: Vec<TableRecord>,
    pub family: Option<String>,
    pub subfamily: Option<String>,
    pub weight_class: u16,
    pub italic: bool,
    pub oblique: bool,
    pub bold: bool,
    pub fixed_pitch: bool,
    pub units_per_em: u16,
    /// Underline offset from the baseline, in font units (negative is below).
    pub underline_position: i16,
    pub underline_thickness: i16,
}

impl SfntFace {
    /// Parses face `index` of `data`.
    pub fn parse(data: &[u8], index: u32) -> SystemResult<Self> {
        let directory = if data.get(0..4) == Some(&TTC_TAG[..]) {
            let count = read_u32(data, 8)?;
            if index >= count {
                return Err(SystemError::Malformed(format!(
                    "face {} of a {}-face collection",
                    index, count
                )));
            }
            read_u32(data, 12 + 4 * index as usize)? as usize
        } else {
            0
        };

        let num_tables = read_u16(data, directory + 4)? as usize;
        let mut tables = Vec::with_capacity(num_tables);
        for i in 0..num_tables {
            let record = directory + 12 + i * 16;
            let tag = data
                .get(record..record + 4)
                .ok_or_else(|| SystemError::Malformed("truncated table directory".into()))?;
            let table = TableRecord {
                tag: [tag[0], tag[1], tag[2], tag[3]],
                offset: read_u32(data, record + 8)? as usize,
                length: read_u32(data, record + 12)? as usize,
            };
            if table.offset.saturating_add(table.length) > data.len() {
                return Err(SystemError::Malformed(format!(
                    "table {} extends past the end of the file",
                    String::from_utf8_lossy(&table.tag)
                )));
            }
            tables.push(table);
        }

        let mut face = SfntFace {
            tables,
            family: None,
            subfamily: None,
            weight_class: 400,
            italic: false,
            oblique: false,
            bold: false,
            fixed_pitch: false,
            units_per_em: 1000,
            underline_position: -100,
            underline_thickness: 50,
        };

        if let Some(name) = face.table(data, NAME_TAG) {
            face.family = best_name(name, NAME_TYPOGRAPHIC_FAMILY)
                .or_else(|| best_name(name, NAME_FAMILY));
            face.subfamily = best_name(name, NAME_SUBFAMILY);
        }
        if let Some(os2) = face.table(data, OS2_TAG) {
            face.weight_class = read_u16(os2, 4).unwrap_or(400);
            let selection = read_u16(os2, 62).unwrap_or(0);
            face.italic = selection & FS_ITALIC != 0;
            face.oblique = selection & FS_OBLIQUE != 0;
            face.bold = selection & FS_BOLD != 0;
        }
        if let Some(post) = face.table(data, POST_TAG) {
            face.underline_position = read_i16(post, 8).unwrap_or(-100);
            face.underline_thickness = read_i16(post, 10).unwrap_or(50);
            face.fixed_pitch = read_u32(post, 12).unwrap_or(0) != 0;
        }
        if let Some(head) = face.table(data, HEAD_TAG) {
            face.units_per_em = read_u16(head, 18).unwrap_or(1000).max(1);
        }
        Ok(face)
    }

    pub fn record(&self, tag: [u8; 4]) -> Option<TableRecord> {
        self.tables.iter().copied().find(|t| t.tag == tag)
    }

    /// The bytes of table `tag`.
    pub fn table<'d>(&self, data: &'d [u8], tag: [u8; 4]) -> Option<&'d [u8]> {
        let record = self.record(tag)?;
        data.get(record.offset..record.offset + record.length)
    }

    /// `length` bytes at `offset` inside table `tag`, clipped to the table.
    pub fn read_table(&self, data: &[u8], tag: [u8; 4], offset: usize, length: usize) -> Option<Vec<u8>> {
        let table = self.table(data, tag)?;
        let start = offset.min(table.len());
        let end = offset.saturating_add(length).min(table.len());
        Some(table[start..end].to_vec())
    }

    pub fn is_bold(&self) -> bool {
        self.bold || self.weight_class >= 600
    }
}

/// Picks the best string for `name_id`: Windows Unicode US English first,
/// then any Windows Unicode name, then a Macintosh Roman one.
fn best_name(table: &[u8], name_id: u16) -> Option<String> {
    let count = read_u16(table, 2).ok()? as usize;
    let storage = read_u16(table, 4).ok()? as usize;

    let mut best: Option<(u8, String)> = None;
    for i in 0..count {
        let record = 6 + i * 12;
        let (Ok(platform), Ok(encoding), Ok(language), Ok(id), Ok(length), Ok(offset)) = (
            read_u16(table, record),
            read_u16(table, record + 2),
            read_u16(table, record + 4),
            read_u16(table, record + 6),
            read_u16(table, record + 8),
            read_u16(table, record + 10),
        ) else {
            break;
        };
        if id != name_id {
            continue;
        }
        let start = storage + offset as usize;
        let Some(bytes) = table.get(start..start + length as usize) else {
            continue;
        };
        let (rank, text) = match (platform, encoding) {
            (3, 1) | (3, 10) | (0, _) => {
                let rank = if platform == 3 && language == LANGUAGE_EN_US { 0 } else { 1 };
                (rank, decode_utf16be(bytes))
            }
            (1, 0) => (2, bytes.iter().map(|&b| b as char).collect()),
            _ => continue,
        };
        if text.is_empty() {
            continue;
        }
        if best.as_ref().map_or(true, |(r, _)| rank < *r) {
            best = Some((rank, text));
        }
    }
    best.map(|(_, text)| text)
}

fn decode_utf16be(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect();
    char::decode_utf16(units)
        .map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect()
}
