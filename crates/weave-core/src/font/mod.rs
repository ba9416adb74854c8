//! Font fallback resolution and the rendering-font caches
//!
//! A font object is an ordered list of subfonts. Each subfont pairs a loaded
//! resource with a shared, reference-counted family whose character
//! existence index answers "can this family draw U+XXXX". When no subfont
//! can, the fallback resolver appends one.

pub mod cmap;
pub mod coverage;
pub mod fallback;
pub mod family;
pub mod matcher;
pub mod named;
pub mod object;

pub use cmap::{load_cmap, CmapCoverage, CmapError, CmapSegment, TableSource};
pub use coverage::{CharacterExistenceIndex, CoverageStrategy};
pub use fallback::{find_subfont_for_char, ResolverStats, SubFontRef};
pub use family::{FamilyCache, FamilyId, FamilyIdentity, FamilyTraits, FontFamily};
pub use matcher::{materialize, rank, select_best, BestCandidates, MatchAttributes};
pub use named::{NamedFont, NamedFontRegistry};
pub use object::{FontMetrics, FontObject, MeasureFlags, SubFont};
