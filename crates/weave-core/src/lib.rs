//! Weave Core - backend-agnostic font fallback and font caching
//!
//! This crate resolves font descriptions to composite font objects, finds a
//! subfont for every character drawn, and caches family coverage so the
//! search happens once per character. Platform font access goes through the
//! [`FontBackend`] trait.

pub mod attributes;
pub mod config;
pub mod constants;
pub mod dummy_backend;
pub mod encoding;
pub mod environment;
pub mod error;
pub mod font;
pub mod traits;
pub mod xlfd;

// Re-export main types
pub use attributes::{parse_font_description, FontAttributes, Slant, Weight};
pub use config::{EnvironmentConfig, FallbackClass, FallbackTable};
pub use encoding::Encoding;
pub use environment::{FontEnvironment, FontId};
pub use error::{FontError, FontResult};
pub use font::{
    CmapError, FamilyCache, FamilyId, FamilyIdentity, FontMetrics, MeasureFlags, ResolverStats,
    SubFontRef,
};
pub use xlfd::{SetWidth, Xlfd, XlfdAttributes};

// Re-export traits and types
pub use traits::*;
