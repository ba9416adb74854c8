// src/constants.rs

// Sizing defaults
pub const DEFAULT_DPI: f64 = 96.0;
pub const DEFAULT_PIXEL_SIZE: u32 = 16;
pub const DEFAULT_FAMILY: &str = "Helvetica";
pub const DEFAULT_CHARSET: &str = "iso8859-1";

// Character-existence index geometry
pub const FONTMAP_SHIFT: u32 = 10;
pub const FONTMAP_PAGE_CHARS: u32 = 1 << FONTMAP_SHIFT;
pub const FONTMAP_PAGE_BYTES: usize = (FONTMAP_PAGE_CHARS / 8) as usize;
pub const FONTMAP_NUM_CHARS: u32 = 0x30000;
pub const FONTMAP_PAGES: usize = (FONTMAP_NUM_CHARS >> FONTMAP_SHIFT) as usize;

/// Extra reference a family carries from creation so a release by its only
/// subfont keeps it cached.
pub const FAMILY_KEEP_ALIVE: usize = 1;

/// Number of digit widths that make up one tab stop.
pub const TAB_DIGITS: i32 = 8;

/// Charsets that get a reduced penalty when they are not the wanted one.
pub const PREFERRED_CHARSETS: &[&str] = &["iso8859-1", "jis0208", "jis0212"];

// Equivalent face names. Every member of a group is an alias of the others.
pub const FONT_ALIASES: &[&[&str]] = &[
    &["Times", "Times New Roman", "New York"],
    &["Helvetica", "Arial", "Geneva"],
    &["Courier", "Courier New", "Monaco"],
    &["mincho", "MS Mincho", "\u{660e}\u{671d}"],
    &["gothic", "MS Gothic", "\u{30b4}\u{30b7}\u{30c3}\u{30af}"],
    &["dingbats", "zapfdingbats", "itc zapfdingbats", "monotype sorts"],
];

// Curated fallback classes, searched in order.
pub const FALLBACK_CLASSES: &[(&str, &[&str])] = &[
    (
        "system",
        &["system", "Tahoma", "Segoe UI", "Cantarell", "DejaVu Sans"],
    ),
    (
        "serif",
        &[
            "Times",
            "palatino",
            "DejaVu Serif",
            "Liberation Serif",
            "Noto Serif",
            "mincho",
            "song ti",
        ],
    ),
    (
        "sans",
        &[
            "Helvetica",
            "Arial",
            "lucida",
            "DejaVu Sans",
            "Liberation Sans",
            "Noto Sans",
            "gothic",
            "song ti",
        ],
    ),
    (
        "monospace",
        &[
            "Courier",
            "DejaVu Sans Mono",
            "Liberation Mono",
            "Noto Sans Mono",
            "mincho",
        ],
    ),
    ("symbol", &["symbol", "dingbats", "Noto Sans Symbols"]),
];

// Last-resort faces tried when no curated class matched.
pub const GLOBAL_FALLBACKS: &[&str] = &[
    "symbol",
    "Lucida Sans Unicode",
    "Arial Unicode MS",
    "Noto Sans Symbols",
    "Noto Sans Symbols2",
    "DejaVu Sans",
];
