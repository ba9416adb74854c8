//! Native character encodings of font families
//!
//! A family renders text in the encoding its charset declares. Characters are
//! converted to that encoding before they are measured or drawn, and the
//! declared-encoding coverage strategy treats "convertible" as "present".

use tracing::trace;

/// Charset name aliases, matched as globs against the reported charset.
/// The left column is the canonical name.
pub const CHARSET_ALIASES: &[(&str, &str)] = &[
    ("gb2312-raw", "gb2312*"),
    ("big5", "big5*"),
    ("cns11643-1", "cns11643*-1"),
    ("cns11643-2", "cns11643*-2"),
    ("jis0201", "jisx0201*"),
    ("jis0208", "jisx0208*"),
    ("jis0212", "jisx0212*"),
    ("ksc5601", "ksc5601*"),
    ("ucs-2be", "iso10646-1"),
    ("ucs-2be", "unicode"),
];

// ISO 8859-7 bytes 0xA0..=0xB3. Zero marks an unassigned byte.
const GREEK_LOW: [u16; 20] = [
    0x00A0, 0x2018, 0x2019, 0x00A3, 0x20AC, 0x20AF, 0x00A6, 0x00A7, 0x00A8, 0x00A9, 0x037A,
    0x00AB, 0x00AC, 0x00AD, 0x0000, 0x2015, 0x00B0, 0x00B1, 0x00B2, 0x00B3,
];

// KOI8-R bytes 0x80..=0xBF.
const KOI8R_HIGH: [u16; 64] = [
    0x2500, 0x2502, 0x250C, 0x2510, 0x2514, 0x2518, 0x251C, 0x2524, 0x252C, 0x2534, 0x253C,
    0x2580, 0x2584, 0x2588, 0x258C, 0x2590, 0x2591, 0x2592, 0x2593, 0x2320, 0x25A0, 0x2219,
    0x221A, 0x2248, 0x2264, 0x2265, 0x00A0, 0x2321, 0x00B0, 0x00B2, 0x00B7, 0x00F7, 0x2550,
    0x2551, 0x2552, 0x0451, 0x2553, 0x2554, 0x2555, 0x2556, 0x2557, 0x2558, 0x2559, 0x255A,
    0x255B, 0x255C, 0x255D, 0x255E, 0x255F, 0x2560, 0x2561, 0x0401, 0x2562, 0x2563, 0x2564,
    0x2565, 0x2566, 0x2567, 0x2568, 0x2569, 0x256A, 0x256B, 0x256C, 0x00A9,
];

// KOI8-R bytes 0xC0..=0xDF; 0xE0..=0xFF are the same letters in upper case.
const KOI8R_LETTERS: &str = "юабцдефгхийклмнопярстужвьызшэщчъ";

// Adobe Symbol bytes 0x20..=0x7E.
const SYMBOL_TABLE: [u16; 95] = [
    0x0020, 0x0021, 0x2200, 0x0023, 0x2203, 0x0025, 0x0026, 0x220B, 0x0028, 0x0029, 0x2217,
    0x002B, 0x002C, 0x2212, 0x002E, 0x002F, 0x0030, 0x0031, 0x0032, 0x0033, 0x0034, 0x0035,
    0x0036, 0x0037, 0x0038, 0x0039, 0x003A, 0x003B, 0x003C, 0x003D, 0x003E, 0x003F, 0x2245,
    0x0391, 0x0392, 0x03A7, 0x0394, 0x0395, 0x03A6, 0x0393, 0x0397, 0x0399, 0x03D1, 0x039A,
    0x039B, 0x039C, 0x039D, 0x039F, 0x03A0, 0x0398, 0x03A1, 0x03A3, 0x03A4, 0x03A5, 0x03C2,
    0x03A9, 0x039E, 0x03A8, 0x0396, 0x005B, 0x2234, 0x005D, 0x22A5, 0x005F, 0x203E, 0x03B1,
    0x03B2, 0x03C7, 0x03B4, 0x03B5, 0x03C6, 0x03B3, 0x03B7, 0x03B9, 0x03D5, 0x03BA, 0x03BB,
    0x03BC, 0x03BD, 0x03BF, 0x03C0, 0x03B8, 0x03C1, 0x03C3, 0x03C4, 0x03C5, 0x03D6, 0x03C9,
    0x03BE, 0x03C8, 0x03B6, 0x007B, 0x007C, 0x007D, 0x223C,
];

/// Encodings a family can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Encoding {
    Ascii,
    Latin1,
    /// ISO 8859-7
    Greek,
    Koi8R,
    /// Adobe Symbol
    Symbol,
    /// Big-endian UCS-2, the `iso10646-1` charset.
    Ucs2,
    /// Big-endian UTF-16 with surrogate pairs.
    Utf16,
    /// Expands every character to a printable backslash escape.
    Control,
}

/// Returns the canonical name for `charset` from [`CHARSET_ALIASES`], or
/// `charset` itself when no alias pattern matches.
pub fn charset_alias(charset: &str) -> &str {
    CHARSET_ALIASES
        .iter()
        .find(|(_, pattern)| glob_match(pattern, charset))
        .map(|(name, _)| *name)
        .unwrap_or(charset)
}

/// Case-insensitive glob match supporting `*` and `?`.
pub fn glob_match(pattern: &str, text: &str) -> bool {
    fn matches(p: &[u8], t: &[u8]) -> bool {
        match (p.first(), t.first()) {
            (None, None) => true,
            (Some(b'*'), _) => matches(&p[1..], t) || (!t.is_empty() && matches(p, &t[1..])),
            (Some(b'?'), Some(_)) => matches(&p[1..], &t[1..]),
            (Some(a), Some(b)) if a.eq_ignore_ascii_case(b) => matches(&p[1..], &t[1..]),
            _ => false,
        }
    }
    matches(pattern.as_bytes(), text.as_bytes())
}

/// The backslash escape the control family renders for `ch`.
pub fn control_escape(ch: char) -> String {
    match ch {
        '\u{7}' => "\\a".to_string(),
        '\u{8}' => "\\b".to_string(),
        '\t' => "\\t".to_string(),
        '\n' => "\\n".to_string(),
        '\u{b}' => "\\v".to_string(),
        '\u{c}' => "\\f".to_string(),
        '\r' => "\\r".to_string(),
        c if (c as u32) < 0x100 => format!("\\x{:02x}", c as u32),
        c if (c as u32) < 0x10000 => format!("\\u{:04x}", c as u32),
        c => format!("\\U{:08x}", c as u32),
    }
}

fn koi8r_letter(index: usize) -> Option<char> {
    KOI8R_LETTERS.chars().nth(index)
}

impl Encoding {
    /// Maps a charset name (`iso8859-1`, `koi8-r`, ...) to an encoding.
    /// Unknown charsets are treated as Latin-1.
    pub fn for_charset(charset: &str) -> Self {
        let lowered = charset.to_ascii_lowercase();
        match lowered.as_str() {
            "iso8859-1" | "iso-8859-1" | "latin1" => Encoding::Latin1,
            "ascii" | "us-ascii" | "iso646.1991-irv" => Encoding::Ascii,
            "iso8859-7" | "iso-8859-7" | "greek" => Encoding::Greek,
            "koi8-r" => Encoding::Koi8R,
            "symbol" | "adobe-fontspecific" => Encoding::Symbol,
            "ucs-2be" | "iso10646-1" => Encoding::Ucs2,
            "unicode" | "utf-16be" => Encoding::Utf16,
            "control" => Encoding::Control,
            other => {
                trace!("Unknown charset {:?}, assuming iso8859-1", other);
                Encoding::Latin1
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Encoding::Ascii => "ascii",
            Encoding::Latin1 => "iso8859-1",
            Encoding::Greek => "iso8859-7",
            Encoding::Koi8R => "koi8-r",
            Encoding::Symbol => "symbol",
            Encoding::Ucs2 => "ucs-2be",
            Encoding::Utf16 => "unicode",
            Encoding::Control => "control",
        }
    }

    pub fn is_two_byte(&self) -> bool {
        matches!(self, Encoding::Ucs2 | Encoding::Utf16)
    }

    pub fn is_symbol(&self) -> bool {
        matches!(self, Encoding::Symbol)
    }

    /// Appends the native form of `ch` to `out`. Returns false, leaving `out`
    /// untouched, when `ch` has no representation.
    pub fn encode_char(&self, ch: char, out: &mut Vec<u8>) -> bool {
        let cp = ch as u32;
        match self {
            Encoding::Ascii if cp < 0x80 => out.push(cp as u8),
            Encoding::Latin1 if cp < 0x100 => out.push(cp as u8),
            Encoding::Greek => match greek_byte(cp) {
                Some(b) => out.push(b),
                None => return false,
            },
            Encoding::Koi8R => match koi8r_byte(ch) {
                Some(b) => out.push(b),
                None => return false,
            },
            Encoding::Symbol => match symbol_byte(cp) {
                Some(b) => out.push(b),
                None => return false,
            },
            Encoding::Ucs2 if cp < 0x10000 => out.extend_from_slice(&(cp as u16).to_be_bytes()),
            Encoding::Utf16 => {
                let mut units = [0u16; 2];
                for unit in ch.encode_utf16(&mut units) {
                    out.extend_from_slice(&unit.to_be_bytes());
                }
            }
            Encoding::Control => out.extend_from_slice(control_escape(ch).as_bytes()),
            _ => return false,
        }
        true
    }

    pub fn can_encode(&self, ch: char) -> bool {
        let mut scratch = Vec::with_capacity(4);
        self.encode_char(ch, &mut scratch)
    }

    /// Converts `text` to native bytes, substituting `?` for characters the
    /// encoding cannot represent.
    pub fn encode(&self, text: &str) -> Vec<u8> {
        let mut out = Vec::with_capacity(text.len() * if self.is_two_byte() { 2 } else { 1 });
        for ch in text.chars() {
            if !self.encode_char(ch, &mut out) {
                self.encode_char('?', &mut out);
            }
        }
        out
    }

    /// Converts native bytes back to text. Unassigned bytes decode to U+FFFD.
    pub fn decode(&self, bytes: &[u8]) -> String {
        match self {
            Encoding::Ucs2 => bytes
                .chunks(2)
                .map(|pair| {
                    let unit = u16::from_be_bytes([pair[0], *pair.get(1).unwrap_or(&0)]);
                    char::from_u32(unit as u32).unwrap_or(char::REPLACEMENT_CHARACTER)
                })
                .collect(),
            Encoding::Utf16 => {
                let units: Vec<u16> = bytes
                    .chunks(2)
                    .map(|pair| u16::from_be_bytes([pair[0], *pair.get(1).unwrap_or(&0)]))
                    .collect();
                char::decode_utf16(units)
                    .map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER))
                    .collect()
            }
            Encoding::Control => String::from_utf8_lossy(bytes).into_owned(),
            _ => bytes
                .iter()
                .map(|&b| self.decode_byte(b).unwrap_or(char::REPLACEMENT_CHARACTER))
                .collect(),
        }
    }

    fn decode_byte(&self, b: u8) -> Option<char> {
        let cp = match self {
            Encoding::Ascii if b < 0x80 => b as u32,
            Encoding::Latin1 => b as u32,
            Encoding::Greek => match b {
                0x00..=0x9F => b as u32,
                0xA0..=0xB3 => match GREEK_LOW[(b - 0xA0) as usize] {
                    0 => return None,
                    cp => cp as u32,
                },
                0xB7 | 0xBB | 0xBD => b as u32,
                0xD2 | 0xFF => return None,
                _ => b as u32 + 0x2D0,
            },
            Encoding::Koi8R => match b {
                0x00..=0x7F => b as u32,
                0x80..=0xBF => KOI8R_HIGH[(b - 0x80) as usize] as u32,
                0xC0..=0xDF => return koi8r_letter((b - 0xC0) as usize),
                _ => return koi8r_letter((b - 0xE0) as usize).and_then(upper_cyrillic),
            },
            Encoding::Symbol => match b {
                0x20..=0x7E => SYMBOL_TABLE[(b - 0x20) as usize] as u32,
                _ => return None,
            },
            _ => return None,
        };
        char::from_u32(cp)
    }
}

fn upper_cyrillic(ch: char) -> Option<char> {
    char::from_u32(ch as u32 - 0x20)
}

fn greek_byte(cp: u32) -> Option<u8> {
    match cp {
        0x00..=0x9F => Some(cp as u8),
        0xB7 | 0xBB | 0xBD => Some(cp as u8),
        0x0387 | 0x038B | 0x038D | 0x03A2 => None,
        0x0384..=0x03CE => Some((cp - 0x2D0) as u8),
        _ => GREEK_LOW
            .iter()
            .position(|&u| u != 0 && u as u32 == cp)
            .map(|i| 0xA0 + i as u8),
    }
}

fn koi8r_byte(ch: char) -> Option<u8> {
    let cp = ch as u32;
    if cp < 0x80 {
        return Some(cp as u8);
    }
    if let Some(i) = KOI8R_HIGH.iter().position(|&u| u as u32 == cp) {
        return Some(0x80 + i as u8);
    }
    if let Some(i) = KOI8R_LETTERS.chars().position(|c| c == ch) {
        return Some(0xC0 + i as u8);
    }
    if (0x0410..=0x042F).contains(&cp) {
        let lower = char::from_u32(cp + 0x20)?;
        return KOI8R_LETTERS
            .chars()
            .position(|c| c == lower)
            .map(|i| 0xE0 + i as u8);
    }
    None
}

fn symbol_byte(cp: u32) -> Option<u8> {
    SYMBOL_TABLE
        .iter()
        .position(|&u| u as u32 == cp)
        .map(|i| 0x20 + i as u8)
}
