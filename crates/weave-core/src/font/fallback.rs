//! Per-character fallback resolution
//!
//! When none of a font object's subfonts can display a character, the
//! resolver searches, in order:
//!
//! 1. subfonts already loaded, then the shared control family
//! 2. other fonts with the base font's face name
//! 3. every curated fallback class naming the base face or one of its aliases
//! 4. the global fallback class
//! 5. every face the backend knows
//!
//! If that finds nothing the character is marked on the control family and
//! rendered as a backslash escape from then on.

use std::collections::HashSet;

use tracing::{debug, trace, warn};

use crate::config::FallbackTable;
use crate::constants::FONTMAP_NUM_CHARS;
use crate::encoding::Encoding;
use crate::font::family::{introspect, FamilyCache, FamilyId, FamilyIdentity};
use crate::font::matcher::{materialize, select_best, MatchAttributes};
use crate::font::object::{FontObject, SubFont};
use crate::traits::{FontBackend, FontDescriptor};

/// Which subfont renders a character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubFontRef {
    Index(usize),
    /// Rendered as an escape sequence with the base subfont.
    Control,
}

/// Counters the resolver keeps across queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolverStats {
    /// Exhaustive scans of every installed face.
    pub scans: usize,
    /// Subfonts added by fallback.
    pub subfonts_added: usize,
    /// Characters marked on the control family.
    pub gave_up: usize,
}

/// Everything a font object needs from its environment to resolve,
/// measure and draw characters.
pub struct ResolveContext<'a, B: FontBackend> {
    pub backend: &'a B,
    pub families: &'a mut FamilyCache,
    pub fallbacks: &'a FallbackTable,
    pub control: FamilyId,
    pub stats: &'a mut ResolverStats,
}

/// Lists the fonts for `face`, or for the first of its aliases that has any.
pub fn list_font_or_alias<B: FontBackend>(
    backend: &B,
    fallbacks: &FallbackTable,
    face: &str,
) -> Vec<FontDescriptor> {
    let found = backend.enumerate_families(face);
    if !found.is_empty() {
        return found;
    }
    for alias in fallbacks.aliases_of(face) {
        if alias.eq_ignore_ascii_case(face) {
            continue;
        }
        let found = backend.enumerate_families(alias);
        if !found.is_empty() {
            return found;
        }
    }
    Vec::new()
}

/// Finds the subfont of `font` that renders `ch`, loading a new one if
/// needed. Always succeeds; the worst case is [`SubFontRef::Control`].
pub fn find_subfont_for_char<B: FontBackend>(
    cx: &mut ResolveContext<'_, B>,
    font: &mut FontObject<B::Resource>,
    ch: char,
) -> SubFontRef {
    let cp = ch as u32;
    if cp >= FONTMAP_NUM_CHARS {
        return SubFontRef::Control;
    }

    for (i, sub) in font.subfonts.iter().enumerate() {
        if cx.families.supports(sub.family, cp) {
            return SubFontRef::Index(i);
        }
    }
    if cx.families.supports(cx.control, cp) {
        return SubFontRef::Control;
    }

    let Some(base_face) = font.subfonts.first().map(|s| s.descriptor.face.clone()) else {
        return SubFontRef::Control;
    };
    let mut seen = HashSet::new();

    if seen.insert(base_face.to_lowercase()) {
        if let Some(i) = can_use_fallback(cx, font, &base_face, ch) {
            debug!("U+{:04X}: same-face font {:?}", cp, font.subfonts[i].descriptor.native_name);
            return SubFontRef::Index(i);
        }
    }

    let fallbacks = cx.fallbacks;
    let aliases = fallbacks.aliases_of(&base_face);
    for class in &fallbacks.classes {
        let related = class.contains(&base_face) || aliases.iter().any(|a| class.contains(a));
        if !related {
            continue;
        }
        for member in &class.members {
            if let Some(i) = can_use_fallback_with_aliases(cx, font, member, ch, &mut seen) {
                debug!("U+{:04X}: {:?} from class {:?}", cp, member, class.name);
                return SubFontRef::Index(i);
            }
        }
    }

    for member in &fallbacks.global {
        if let Some(i) = can_use_fallback_with_aliases(cx, font, member, ch, &mut seen) {
            debug!("U+{:04X}: {:?} from the global class", cp, member);
            return SubFontRef::Index(i);
        }
    }

    cx.stats.scans += 1;
    for descriptor in cx.backend.enumerate_families("*") {
        if !seen.insert(descriptor.face.to_lowercase()) {
            continue;
        }
        if let Some(i) = can_use_fallback(cx, font, &descriptor.face, ch) {
            debug!("U+{:04X}: {:?} from the system scan", cp, descriptor.face);
            return SubFontRef::Index(i);
        }
    }

    warn!("No font can display U+{:04X}; rendering it as an escape", cp);
    cx.families.mark_supported(cx.control, cp);
    cx.stats.gave_up += 1;
    SubFontRef::Control
}

fn can_use_fallback_with_aliases<B: FontBackend>(
    cx: &mut ResolveContext<'_, B>,
    font: &mut FontObject<B::Resource>,
    face: &str,
    ch: char,
    seen: &mut HashSet<String>,
) -> Option<usize> {
    if seen.insert(face.to_lowercase()) {
        if let Some(i) = can_use_fallback(cx, font, face, ch) {
            return Some(i);
        }
    }
    let fallbacks = cx.fallbacks;
    for alias in fallbacks.aliases_of(face) {
        if seen.insert(alias.to_lowercase()) {
            if let Some(i) = can_use_fallback(cx, font, alias, ch) {
                return Some(i);
            }
        }
    }
    None
}

fn descriptor_identity(descriptor: &FontDescriptor) -> FamilyIdentity {
    FamilyIdentity::new(&descriptor.face, descriptor.foundry.as_deref(), &descriptor.charset)
}

/// Tries to add a subfont with face `face` that displays `ch`. Returns its
/// index on success.
///
/// Candidates whose identity is already a subfont, or whose charset cannot
/// encode `ch`, are skipped. When the best remaining candidate turns out not
/// to have the glyph after all, its (foundry, charset) pair is excluded and
/// the next best is tried.
pub fn can_use_fallback<B: FontBackend>(
    cx: &mut ResolveContext<'_, B>,
    font: &mut FontObject<B::Resource>,
    face: &str,
    ch: char,
) -> Option<usize> {
    let cp = ch as u32;
    let loaded: Vec<FamilyIdentity> = font.subfonts.iter().map(|s| s.identity.clone()).collect();

    let mut candidates: Vec<FontDescriptor> = list_font_or_alias(cx.backend, cx.fallbacks, face)
        .into_iter()
        .filter(|d| !loaded.contains(&descriptor_identity(d)))
        .filter(|d| Encoding::for_charset(&d.charset).can_encode(ch))
        .collect();

    let want = MatchAttributes {
        family: face.to_string(),
        ..font.want.clone()
    };

    while !candidates.is_empty() {
        let best = select_best(&candidates, &want);
        let rejected_pairs: Vec<(Option<String>, String)> = [best.fixed, best.scalable]
            .iter()
            .flatten()
            .map(|s| {
                let d = &candidates[s.index];
                (d.foundry.clone(), d.charset.clone())
            })
            .collect();

        let Some((resource, descriptor)) =
            materialize(cx.backend, &candidates, best, font.pixel_size)
        else {
            hate(&mut candidates, &rejected_pairs);
            continue;
        };
        let descriptor = descriptor.clone();
        let pair = vec![(descriptor.foundry.clone(), descriptor.charset.clone())];

        let metrics = cx.backend.native_metrics(&resource);
        let identity = FamilyIdentity::from_metrics(&metrics);
        if loaded.contains(&identity) {
            trace!("{:?} resolved to an already loaded family", descriptor.native_name);
            hate(&mut candidates, &pair);
            continue;
        }

        let backend = cx.backend;
        let family = cx.families.acquire(identity.clone(), || {
            introspect(backend, &resource, &metrics)
        });
        let (is_symbol, encoding) = match cx.families.get(family) {
            Some(f) => (f.is_symbol, f.encoding),
            None => (false, Encoding::for_charset(&metrics.charset)),
        };

        // Symbol fonts are never a substitute for Latin-1 text.
        if is_symbol && cp < 256 {
            cx.families.release(family);
            return None;
        }
        if !cx.families.supports(family, cp) {
            trace!("{:?} lacks U+{:04X} despite its charset", descriptor.native_name, cp);
            cx.families.release(family);
            hate(&mut candidates, &pair);
            continue;
        }

        font.subfonts.push(SubFont {
            resource,
            family,
            identity,
            descriptor,
            encoding,
        });
        cx.stats.subfonts_added += 1;
        return Some(font.subfonts.len() - 1);
    }
    None
}

/// Removes every candidate with one of the given (foundry, charset) pairs.
fn hate(candidates: &mut Vec<FontDescriptor>, pairs: &[(Option<String>, String)]) {
    candidates.retain(|d| {
        !pairs
            .iter()
            .any(|(foundry, charset)| d.foundry == *foundry && d.charset == *charset)
    });
}
