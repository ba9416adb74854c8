// src/error.rs
use thiserror::Error;

/// Errors surfaced to callers of the font layer.
///
/// Per-candidate failures inside matching and fallback never reach this type;
/// only configuration mistakes and total font exhaustion do.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FontError {
    // Named font errors
    #[error("named font \"{name}\" doesn't exist")]
    UnknownNamedFont { name: String },

    #[error("named font \"{name}\" already exists")]
    NamedFontExists { name: String },

    // Description and option parsing errors
    #[error("bad {option} value \"{value}\": must be {expected}")]
    BadOptionValue {
        option: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("bad option \"{option}\": must be -family, -size, -weight, -slant, -underline, or -overstrike")]
    UnknownOption { option: String },

    #[error("value for \"{option}\" option missing")]
    MissingOptionValue { option: String },

    #[error("unknown font style \"{style}\"")]
    UnknownStyle { style: String },

    #[error("expected integer but got \"{value}\"")]
    BadSize { value: String },

    #[error("font \"{description}\" doesn't exist")]
    BadDescription { description: String },

    #[error("unmatched open brace or quote in \"{description}\"")]
    UnbalancedList { description: String },

    #[error("malformed XLFD \"{name}\"")]
    MalformedXlfd { name: String },

    // Handles
    #[error("font handle is no longer valid")]
    StaleFont,

    // Resource exhaustion
    #[error("can't find any fonts: the backend reports no usable font at all")]
    NoFontsAvailable,
}

pub type FontResult<T> = Result<T, FontError>;
