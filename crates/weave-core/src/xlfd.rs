//! X Logical Font Description parsing
//!
//! `-foundry-family-weight-slant-setwidth-addstyle-pixels-points-resx-resy-spacing-avgwidth-registry-encoding`
//!
//! Fields may be `*` or `?` (unspecified) and trailing fields may be omitted.
//! The registry and encoding stay joined as a single charset such as `iso8859-1`.

use crate::attributes::{FontAttributes, Slant, Weight};
use crate::error::{FontError, FontResult};

const FOUNDRY: usize = 0;
const FAMILY: usize = 1;
const WEIGHT: usize = 2;
const SLANT: usize = 3;
const SETWIDTH: usize = 4;
const ADD_STYLE: usize = 5;
const PIXEL_SIZE: usize = 6;
const POINT_SIZE: usize = 7;
const CHARSET: usize = 12;
const NUM_FIELDS: usize = 13;

/// Proportionate width class of a face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SetWidth {
    #[default]
    Normal,
    Condensed,
    Expanded,
    Unknown,
}

/// Attributes only an XLFD (or an X-style backend) can express.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct XlfdAttributes {
    pub foundry: Option<String>,
    /// Three-way slant; `FontAttributes::slant` folds oblique into italic.
    pub slant: Slant,
    pub set_width: SetWidth,
    pub charset: Option<String>,
}

/// A parsed XLFD, before it is split into font and X attributes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Xlfd {
    pub foundry: Option<String>,
    pub family: Option<String>,
    pub weight: Weight,
    pub slant: Slant,
    pub set_width: SetWidth,
    pub pixel_size: Option<u32>,
    pub point_tenths: Option<u32>,
    pub charset: Option<String>,
}

fn specified(field: Option<&str>) -> Option<&str> {
    field.filter(|f| !f.is_empty() && *f != "*" && *f != "?")
}

fn parse_weight(word: &str) -> Weight {
    match word {
        "bold" | "demi" | "demibold" | "heavy" | "black" => Weight::Bold,
        _ => Weight::Normal,
    }
}

fn parse_slant(word: &str) -> Slant {
    match word {
        "i" => Slant::Italic,
        "o" => Slant::Oblique,
        _ => Slant::Roman,
    }
}

fn parse_set_width(word: &str) -> SetWidth {
    match word {
        "normal" => SetWidth::Normal,
        "narrow" | "semicondensed" | "condensed" => SetWidth::Condensed,
        "expanded" | "semiexpanded" | "wide" => SetWidth::Expanded,
        _ => SetWidth::Unknown,
    }
}

impl Xlfd {
    pub fn parse(name: &str) -> FontResult<Self> {
        let malformed = || FontError::MalformedXlfd {
            name: name.to_string(),
        };

        let lowered = name.to_ascii_lowercase();
        let body = lowered.strip_prefix('-').unwrap_or(&lowered);
        let mut fields: Vec<Option<&str>> = body.splitn(NUM_FIELDS, '-').map(Some).collect();

        // "-adobe-times-medium-r-*-12-*-*" elides both setwidth and addstyle
        // with one star; a numeric addstyle means the fields are shifted.
        if fields.len() > ADD_STYLE {
            if let Some(add_style) = specified(fields[ADD_STYLE]) {
                if add_style.parse::<u32>().map(|n| n != 0).unwrap_or(false) {
                    fields.insert(ADD_STYLE, None);
                }
            }
        }

        if fields.len() <= FAMILY {
            return Err(malformed());
        }
        if fields[FOUNDRY].is_some_and(|f| f.contains(char::is_whitespace)) {
            return Err(malformed());
        }
        let field = |i: usize| specified(fields.get(i).copied().flatten());

        let mut xlfd = Xlfd {
            foundry: field(FOUNDRY).map(str::to_string),
            family: field(FAMILY).map(str::to_string),
            ..Default::default()
        };
        if let Some(weight) = field(WEIGHT) {
            xlfd.weight = parse_weight(weight);
        }
        if let Some(slant) = field(SLANT) {
            xlfd.slant = parse_slant(slant);
        }
        if let Some(width) = field(SETWIDTH) {
            xlfd.set_width = parse_set_width(width);
        }
        if let Some(points) = field(POINT_SIZE) {
            if !points.starts_with('[') {
                xlfd.point_tenths = Some(points.parse().map_err(|_| malformed())?);
            }
        }
        if let Some(pixels) = field(PIXEL_SIZE) {
            if !pixels.starts_with('[') {
                xlfd.pixel_size = Some(pixels.parse().map_err(|_| malformed())?);
            }
        }
        xlfd.charset = field(CHARSET).map(str::to_string);
        Ok(xlfd)
    }

    /// Splits the XLFD into generic font attributes and X-only attributes.
    pub fn into_attributes(self) -> (FontAttributes, XlfdAttributes) {
        let size = match (self.pixel_size, self.point_tenths) {
            (Some(px), _) if px > 0 => -(px as i32),
            (_, Some(tenths)) if tenths >= 10 => (tenths / 10) as i32,
            _ => 0,
        };
        let attributes = FontAttributes {
            family: self.family,
            size,
            weight: self.weight,
            slant: self.slant.folded(),
            underline: false,
            overstrike: false,
        };
        let extra = XlfdAttributes {
            foundry: self.foundry,
            slant: self.slant,
            set_width: self.set_width,
            charset: self.charset,
        };
        (attributes, extra)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_xlfd() {
        let xlfd = Xlfd::parse("-Adobe-Helvetica-Bold-O-Normal--14-140-75-75-P-82-ISO8859-1").unwrap();
        assert_eq!(xlfd.foundry.as_deref(), Some("adobe"));
        assert_eq!(xlfd.family.as_deref(), Some("helvetica"));
        assert_eq!(xlfd.weight, Weight::Bold);
        assert_eq!(xlfd.slant, Slant::Oblique);
        assert_eq!(xlfd.set_width, SetWidth::Normal);
        assert_eq!(xlfd.pixel_size, Some(14));
        assert_eq!(xlfd.charset.as_deref(), Some("iso8859-1"));

        let (fa, xa) = xlfd.into_attributes();
        assert_eq!(fa.size, -14);
        assert_eq!(fa.slant, Slant::Italic);
        assert_eq!(xa.slant, Slant::Oblique);
    }

    #[test]
    fn test_wildcards_and_short_forms() {
        let xlfd = Xlfd::parse("-*-courier-*-*-*-*-*-*").unwrap();
        assert_eq!(xlfd.foundry, None);
        assert_eq!(xlfd.family.as_deref(), Some("courier"));
        assert_eq!(xlfd.weight, Weight::Normal);
        assert_eq!(xlfd.charset, None);
        assert_eq!(xlfd.clone().into_attributes().0.size, 0);
    }

    #[test]
    fn test_elided_addstyle_shifts_fields() {
        let xlfd = Xlfd::parse("-adobe-times-medium-r-*-12-*-*").unwrap();
        assert_eq!(xlfd.pixel_size, Some(12));
    }

    #[test]
    fn test_point_size_used_without_pixels() {
        let xlfd = Xlfd::parse("-misc-fixed-medium-r-normal--*-120-*-*-c-*-iso10646-1").unwrap();
        assert_eq!(xlfd.pixel_size, None);
        let (fa, xa) = xlfd.into_attributes();
        assert_eq!(fa.size, 12);
        assert_eq!(xa.charset.as_deref(), Some("iso10646-1"));
    }

    #[test]
    fn test_malformed() {
        assert!(Xlfd::parse("-").is_err());
        assert!(Xlfd::parse("-family Noto-Sans").is_err());
        assert!(Xlfd::parse("-adobe-times-medium-r-normal--abc-*").is_err());
    }

    #[test]
    fn test_set_width_words() {
        assert_eq!(parse_set_width("semicondensed"), SetWidth::Condensed);
        assert_eq!(parse_set_width("wide"), SetWidth::Expanded);
        assert_eq!(parse_set_width("odd"), SetWidth::Unknown);
    }
}
