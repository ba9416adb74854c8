//! Font attributes and font description parsing
//!
//! Three textual forms describe a font:
//!
//! - option form: `-family Courier -size 12 -weight bold`
//! - list form: `Courier 12 {bold italic}` or `{Times New Roman} -16 underline`
//! - XLFD: `-adobe-courier-bold-r-normal--12-*-*-*-*-*-iso8859-1`

use crate::error::{FontError, FontResult};
use crate::xlfd::{Xlfd, XlfdAttributes};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Weight {
    #[default]
    Normal,
    Bold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Slant {
    #[default]
    Roman,
    Italic,
    /// Only XLFD names and X-style descriptors distinguish oblique from italic.
    Oblique,
}

impl Weight {
    pub fn as_str(&self) -> &'static str {
        match self {
            Weight::Normal => "normal",
            Weight::Bold => "bold",
        }
    }

    fn from_word(word: &str) -> Option<Self> {
        match word {
            "normal" => Some(Weight::Normal),
            "bold" => Some(Weight::Bold),
            _ => None,
        }
    }
}

impl Slant {
    pub fn as_str(&self) -> &'static str {
        match self {
            Slant::Roman => "roman",
            Slant::Italic | Slant::Oblique => "italic",
        }
    }

    /// Collapses the three-way slant to roman or italic.
    pub fn folded(self) -> Self {
        match self {
            Slant::Oblique => Slant::Italic,
            other => other,
        }
    }

    pub fn is_italic(&self) -> bool {
        !matches!(self, Slant::Roman)
    }

    fn from_word(word: &str) -> Option<Self> {
        match word {
            "roman" => Some(Slant::Roman),
            "italic" => Some(Slant::Italic),
            _ => None,
        }
    }
}

/// The attributes a caller asks for.
///
/// `size` is in points when positive, in pixels when negative, and means the
/// default size when zero.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct FontAttributes {
    pub family: Option<String>,
    pub size: i32,
    pub weight: Weight,
    pub slant: Slant,
    pub underline: bool,
    pub overstrike: bool,
}

const OPTION_NAMES: [&str; 6] = [
    "-family",
    "-size",
    "-weight",
    "-slant",
    "-underline",
    "-overstrike",
];

impl FontAttributes {
    pub fn new(family: &str, size: i32) -> Self {
        Self {
            family: Some(family.to_string()),
            size,
            ..Default::default()
        }
    }

    pub fn with_weight(mut self, weight: Weight) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_slant(mut self, slant: Slant) -> Self {
        self.slant = slant.folded();
        self
    }

    pub fn with_underline(mut self, underline: bool) -> Self {
        self.underline = underline;
        self
    }

    pub fn with_overstrike(mut self, overstrike: bool) -> Self {
        self.overstrike = overstrike;
        self
    }

    /// Applies `-option value` pairs on top of the current attributes.
    /// Option names may be abbreviated to any unique prefix.
    pub fn apply_options<S: AsRef<str>>(&mut self, options: &[S]) -> FontResult<()> {
        for pair in options.chunks(2) {
            let option = resolve_option(pair[0].as_ref())?;
            let value = match pair.get(1) {
                Some(v) => v.as_ref(),
                None => {
                    return Err(FontError::MissingOptionValue {
                        option: option.to_string(),
                    })
                }
            };
            match option {
                "-family" => self.family = Some(value.to_string()),
                "-size" => self.size = parse_size(value)?,
                "-weight" => {
                    self.weight =
                        Weight::from_word(value).ok_or_else(|| FontError::BadOptionValue {
                            option: "weight",
                            value: value.to_string(),
                            expected: "normal or bold",
                        })?
                }
                "-slant" => {
                    self.slant =
                        Slant::from_word(value).ok_or_else(|| FontError::BadOptionValue {
                            option: "slant",
                            value: value.to_string(),
                            expected: "roman or italic",
                        })?
                }
                "-underline" => self.underline = parse_boolean("underline", value)?,
                _ => self.overstrike = parse_boolean("overstrike", value)?,
            }
        }
        Ok(())
    }

    /// The attributes in option form, as `font actual` reports them.
    pub fn to_options(&self) -> Vec<(&'static str, String)> {
        vec![
            ("-family", self.family.clone().unwrap_or_default()),
            ("-size", self.size.to_string()),
            ("-weight", self.weight.as_str().to_string()),
            ("-slant", self.slant.as_str().to_string()),
            ("-underline", (self.underline as u8).to_string()),
            ("-overstrike", (self.overstrike as u8).to_string()),
        ]
    }
}

impl fmt::Display for FontAttributes {
    /// Writes the attributes in list form.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let family = self.family.as_deref().unwrap_or("");
        if family.is_empty() || family.contains(char::is_whitespace) {
            write!(f, "{{{}}}", family)?;
        } else {
            write!(f, "{}", family)?;
        }
        write!(f, " {}", self.size)?;
        if self.weight == Weight::Bold {
            write!(f, " bold")?;
        }
        if self.slant.is_italic() {
            write!(f, " italic")?;
        }
        if self.underline {
            write!(f, " underline")?;
        }
        if self.overstrike {
            write!(f, " overstrike")?;
        }
        Ok(())
    }
}

fn resolve_option(name: &str) -> FontResult<&'static str> {
    let unknown = || FontError::UnknownOption {
        option: name.to_string(),
    };
    if name.len() < 2 {
        return Err(unknown());
    }
    if let Some(exact) = OPTION_NAMES.iter().copied().find(|o| *o == name) {
        return Ok(exact);
    }
    let mut matches = OPTION_NAMES.iter().copied().filter(|o| o.starts_with(name));
    match (matches.next(), matches.next()) {
        (Some(only), None) => Ok(only),
        _ => Err(unknown()),
    }
}

fn parse_size(value: &str) -> FontResult<i32> {
    value.trim().parse().map_err(|_| FontError::BadSize {
        value: value.to_string(),
    })
}

fn parse_boolean(option: &'static str, value: &str) -> FontResult<bool> {
    let lowered = value.to_ascii_lowercase();
    let word = lowered.as_str();
    let prefix_of = |full: &str| !word.is_empty() && full.starts_with(word);
    if word == "1" || prefix_of("true") || prefix_of("yes") || word == "on" {
        return Ok(true);
    }
    if word == "0" || prefix_of("false") || prefix_of("no") || word == "off" || word == "of" {
        return Ok(false);
    }
    Err(FontError::BadOptionValue {
        option,
        value: value.to_string(),
        expected: "a boolean",
    })
}

/// Splits a whitespace-separated list with `{}` and `"` grouping.
pub fn split_list(text: &str) -> FontResult<Vec<String>> {
    let unbalanced = || FontError::UnbalancedList {
        description: text.to_string(),
    };
    let mut items = Vec::new();
    let mut chars = text.chars().peekable();

    loop {
        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }
        let first = match chars.next() {
            Some(c) => c,
            None => break,
        };
        let mut item = String::new();
        match first {
            '{' => {
                let mut depth = 1;
                loop {
                    match chars.next() {
                        Some('{') => {
                            depth += 1;
                            item.push('{');
                        }
                        Some('}') => {
                            depth -= 1;
                            if depth == 0 {
                                break;
                            }
                            item.push('}');
                        }
                        Some('\\') => {
                            item.push('\\');
                            if let Some(next) = chars.next() {
                                item.push(next);
                            }
                        }
                        Some(c) => item.push(c),
                        None => return Err(unbalanced()),
                    }
                }
            }
            '"' => loop {
                match chars.next() {
                    Some('"') => break,
                    Some('\\') => {
                        if let Some(next) = chars.next() {
                            item.push(next);
                        }
                    }
                    Some(c) => item.push(c),
                    None => return Err(unbalanced()),
                }
            },
            c => {
                let mut current = Some(c);
                while let Some(c) = current {
                    if c == '\\' {
                        if let Some(next) = chars.next() {
                            item.push(next);
                        }
                    } else {
                        item.push(c);
                    }
                    current = match chars.peek() {
                        Some(n) if !n.is_whitespace() => chars.next(),
                        _ => None,
                    };
                }
            }
        }
        if !chars.peek().map_or(true, |c| c.is_whitespace()) {
            return Err(unbalanced());
        }
        items.push(item);
    }
    Ok(items)
}

fn parse_list_form(description: &str) -> FontResult<FontAttributes> {
    let items = split_list(description)?;
    let (family, rest) = items.split_first().ok_or_else(|| FontError::BadDescription {
        description: description.to_string(),
    })?;

    let mut attributes = FontAttributes {
        family: Some(family.clone()),
        ..Default::default()
    };
    let mut styles: Vec<String> = Vec::new();
    if let Some(size) = rest.first() {
        attributes.size = parse_size(size)?;
        match &rest[1..] {
            [single] => styles = split_list(single)?,
            many => styles.extend(many.iter().cloned()),
        }
    }

    for style in &styles {
        if let Some(weight) = Weight::from_word(style) {
            attributes.weight = weight;
        } else if let Some(slant) = Slant::from_word(style) {
            attributes.slant = slant;
        } else if style == "underline" {
            attributes.underline = true;
        } else if style == "overstrike" {
            attributes.overstrike = true;
        } else {
            return Err(FontError::UnknownStyle {
                style: style.clone(),
            });
        }
    }
    Ok(attributes)
}

fn parse_option_form(description: &str) -> FontResult<FontAttributes> {
    let items = split_list(description)?;
    let mut attributes = FontAttributes::default();
    attributes.apply_options(&items)?;
    Ok(attributes)
}

fn looks_like_xlfd(description: &str) -> bool {
    let rest = &description[1..];
    if rest.starts_with('*') {
        return true;
    }
    match rest.find('-') {
        Some(0) => true,
        Some(i) => !rest[..i].ends_with(char::is_whitespace),
        None => false,
    }
}

/// Parses any of the three description forms.
pub fn parse_font_description(description: &str) -> FontResult<(FontAttributes, XlfdAttributes)> {
    let trimmed = description.trim_start();
    if trimmed.starts_with('-') {
        if looks_like_xlfd(trimmed) {
            if let Ok(xlfd) = Xlfd::parse(trimmed) {
                return Ok(xlfd.into_attributes());
            }
        }
        return Ok((parse_option_form(trimmed)?, XlfdAttributes::default()));
    }
    if trimmed.starts_with('*') {
        if let Ok(xlfd) = Xlfd::parse(trimmed) {
            return Ok(xlfd.into_attributes());
        }
    }
    Ok((parse_list_form(description)?, XlfdAttributes::default()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_form() {
        let (fa, _) = parse_font_description("Courier 12 bold italic").unwrap();
        assert_eq!(fa.family.as_deref(), Some("Courier"));
        assert_eq!(fa.size, 12);
        assert_eq!(fa.weight, Weight::Bold);
        assert_eq!(fa.slant, Slant::Italic);

        let (fa, _) = parse_font_description("{Times New Roman} -16 {underline overstrike}").unwrap();
        assert_eq!(fa.family.as_deref(), Some("Times New Roman"));
        assert_eq!(fa.size, -16);
        assert!(fa.underline && fa.overstrike);

        let (fa, _) = parse_font_description("Helvetica").unwrap();
        assert_eq!(fa.size, 0);
        assert_eq!(fa.weight, Weight::Normal);
    }

    #[test]
    fn test_list_form_errors() {
        assert_eq!(
            parse_font_description("Courier big"),
            Err(FontError::BadSize {
                value: "big".to_string()
            })
        );
        assert_eq!(
            parse_font_description("Courier 12 bold wobbly"),
            Err(FontError::UnknownStyle {
                style: "wobbly".to_string()
            })
        );
        assert!(matches!(
            parse_font_description("{Courier 12"),
            Err(FontError::UnbalancedList { .. })
        ));
        assert!(matches!(
            parse_font_description("   "),
            Err(FontError::BadDescription { .. })
        ));
    }

    #[test]
    fn test_option_form() {
        let (fa, _) =
            parse_font_description("-family Courier -size 10 -weight bold -und yes").unwrap();
        assert_eq!(fa.family.as_deref(), Some("Courier"));
        assert_eq!(fa.size, 10);
        assert_eq!(fa.weight, Weight::Bold);
        assert!(fa.underline);
    }

    #[test]
    fn test_option_form_errors() {
        assert_eq!(
            parse_font_description("-family Courier -size"),
            Err(FontError::MissingOptionValue {
                option: "-size".to_string()
            })
        );
        assert!(matches!(
            parse_font_description("-colour red"),
            Err(FontError::UnknownOption { .. })
        ));
        assert!(matches!(
            parse_font_description("-weight heavy"),
            Err(FontError::BadOptionValue { option: "weight", .. })
        ));
        assert!(matches!(
            parse_font_description("-underline maybe"),
            Err(FontError::BadOptionValue { option: "underline", .. })
        ));
    }

    #[test]
    fn test_xlfd_dispatch() {
        let (fa, xa) =
            parse_font_description("-adobe-courier-bold-r-normal--12-*-*-*-*-*-iso8859-1").unwrap();
        assert_eq!(fa.family.as_deref(), Some("courier"));
        assert_eq!(fa.size, -12);
        assert_eq!(xa.foundry.as_deref(), Some("adobe"));

        let (fa, _) = parse_font_description("*-helvetica-medium-r-*").unwrap();
        assert_eq!(fa.family.as_deref(), Some("helvetica"));
    }

    #[test]
    fn test_hyphenated_option_value_falls_back_from_xlfd() {
        let (fa, _) = parse_font_description("-family Noto-Sans").unwrap();
        assert_eq!(fa.family.as_deref(), Some("Noto-Sans"));

        // Looks like an XLFD but has a bad pixel field, so it is retried as options.
        assert!(matches!(
            parse_font_description("-a-b-c-d-e-f-notanumber"),
            Err(FontError::UnknownOption { .. })
        ));
    }

    #[test]
    fn test_split_list_quotes_and_escapes() {
        assert_eq!(
            split_list(r#"a "b c" {d {e}} f\ g"#).unwrap(),
            vec!["a", "b c", "d {e}", "f g"]
        );
        assert!(split_list("{a}b").is_err());
    }

    #[test]
    fn test_display_round_trips_through_list_form() {
        let fa = FontAttributes::new("Times New Roman", 14)
            .with_weight(Weight::Bold)
            .with_underline(true);
        let text = fa.to_string();
        assert_eq!(text, "{Times New Roman} 14 bold underline");
        assert_eq!(parse_font_description(&text).unwrap().0, fa);
    }
}
