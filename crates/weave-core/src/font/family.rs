//! Reference-counted font family cache
//!
//! Families are shared by every subfont that renders through the same
//! identity. A family is created with one extra keep-alive reference, so a
//! family whose last subfont goes away stays cached until `trim` drops it.

use std::collections::HashMap;

use tracing::{debug, trace, warn};

use crate::constants::{FAMILY_KEEP_ALIVE, FONTMAP_NUM_CHARS};
use crate::encoding::Encoding;
use crate::font::cmap::{load_cmap, CmapCoverage, CmapSegment, TableSource};
use crate::font::coverage::{CharacterExistenceIndex, CoverageStrategy};
use crate::traits::{FontBackend, NativeMetrics};

/// What makes two loaded resources the same family.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FamilyIdentity {
    /// Lower-cased face name.
    pub face: String,
    pub foundry: Option<String>,
    pub charset: String,
}

impl FamilyIdentity {
    pub fn new(face: &str, foundry: Option<&str>, charset: &str) -> Self {
        Self {
            face: face.to_lowercase(),
            foundry: foundry.map(str::to_ascii_lowercase),
            charset: charset.to_ascii_lowercase(),
        }
    }

    pub fn from_metrics(metrics: &NativeMetrics) -> Self {
        Self::new(&metrics.face, metrics.foundry.as_deref(), &metrics.charset)
    }
}

/// Handle to a cached family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FamilyId(usize);

/// Encoding and coverage source of a family, found by introspecting the
/// first resource loaded under its identity.
#[derive(Debug, Clone)]
pub struct FamilyTraits {
    pub encoding: Encoding,
    pub strategy: CoverageStrategy,
    pub is_symbol: bool,
}

impl FamilyTraits {
    /// The shared control family: escapes only, nothing computed.
    pub fn control() -> Self {
        Self {
            encoding: Encoding::Control,
            strategy: CoverageStrategy::Control,
            is_symbol: false,
        }
    }
}

#[derive(Debug)]
pub struct FontFamily {
    pub identity: FamilyIdentity,
    pub encoding: Encoding,
    pub is_two_byte: bool,
    pub is_symbol: bool,
    strategy: CoverageStrategy,
    index: CharacterExistenceIndex,
    ref_count: usize,
    page_loads: usize,
}

impl FontFamily {
    pub fn strategy(&self) -> &CoverageStrategy {
        &self.strategy
    }

    pub fn ref_count(&self) -> usize {
        self.ref_count
    }
}

/// Adapts a backend resource to the cmap reader.
struct ResourceTables<'a, B: FontBackend> {
    backend: &'a B,
    resource: &'a B::Resource,
}

impl<B: FontBackend> TableSource for ResourceTables<'_, B> {
    fn read_table(&self, tag: [u8; 4], offset: usize, length: usize) -> Option<Vec<u8>> {
        self.backend.read_font_table(self.resource, tag, offset, length)
    }
}

/// Picks the coverage strategy for a freshly loaded resource: cmap data when
/// the backend serves font tables, server glyph data when it has some, and
/// the declared encoding otherwise.
pub fn introspect<B: FontBackend>(
    backend: &B,
    resource: &B::Resource,
    metrics: &NativeMetrics,
) -> FamilyTraits {
    let encoding = Encoding::for_charset(&metrics.charset);

    if backend.supports_font_tables(resource) {
        let tables = ResourceTables { backend, resource };
        let coverage = match load_cmap(&tables) {
            Ok(Some(coverage)) => coverage,
            Ok(None) => {
                debug!("{}: no usable cmap subtable, assuming Basic Latin", metrics.face);
                CmapCoverage::basic_latin()
            }
            Err(e) => {
                warn!("{}: unreadable cmap ({}), assuming Basic Latin", metrics.face, e);
                CmapCoverage::basic_latin()
            }
        };
        let segments = match (coverage.is_symbol, encoding.is_symbol()) {
            (true, true) => symbol_segments(&coverage.segments),
            // Reached through Unicode text, a symbol cmap only answers in
            // the private use area.
            (true, false) => private_use_segments(coverage.segments),
            _ => coverage.segments,
        };
        return FamilyTraits {
            encoding,
            is_symbol: coverage.is_symbol || encoding.is_symbol(),
            strategy: CoverageStrategy::Cmap(segments),
        };
    }

    if let Some(table) = backend.native_char_table(resource) {
        return FamilyTraits {
            encoding,
            is_symbol: encoding.is_symbol(),
            strategy: CoverageStrategy::ServerProbe { encoding, table },
        };
    }

    FamilyTraits {
        encoding,
        is_symbol: encoding.is_symbol(),
        strategy: CoverageStrategy::DeclaredEncoding(encoding),
    }
}

/// Symbol cmaps cover native bytes. Translates them to the code points the
/// symbol encoding maps onto those bytes.
fn symbol_segments(native: &[CmapSegment]) -> Vec<CmapSegment> {
    (0x20u8..=0x7E)
        .filter(|byte| native.iter().any(|s| s.contains(*byte as u32)))
        .filter_map(|byte| Encoding::Symbol.decode(&[byte]).chars().next())
        .filter(|ch| *ch != char::REPLACEMENT_CHARACTER)
        .map(|ch| CmapSegment::new(ch as u32, ch as u32))
        .collect()
}

/// Moves folded single-byte symbol ranges back to U+F020..U+F0FF.
fn private_use_segments(folded: Vec<CmapSegment>) -> Vec<CmapSegment> {
    folded
        .into_iter()
        .map(|s| {
            if s.end <= 0xFF {
                CmapSegment::new(0xF000 | s.start, 0xF000 | s.end)
            } else {
                s
            }
        })
        .collect()
}

/// Registry of live families, keyed by identity.
#[derive(Debug, Default)]
pub struct FamilyCache {
    slots: Vec<Option<FontFamily>>,
    free: Vec<usize>,
    by_identity: HashMap<FamilyIdentity, FamilyId>,
}

impl FamilyCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the family for `identity`, adding a reference. A new family
    /// is built from `traits` and starts with the keep-alive reference.
    pub fn acquire<F>(&mut self, identity: FamilyIdentity, traits: F) -> FamilyId
    where
        F: FnOnce() -> FamilyTraits,
    {
        if let Some(&id) = self.by_identity.get(&identity) {
            if let Some(family) = self.family_mut(id) {
                family.ref_count += 1;
                trace!("Family {:?} reused, refcount {}", identity.face, family.ref_count);
                return id;
            }
        }

        let traits = traits();
        debug!(
            "New family {:?} ({}, {})",
            identity.face,
            traits.encoding.name(),
            traits.strategy.name()
        );
        let family = FontFamily {
            identity: identity.clone(),
            encoding: traits.encoding,
            is_two_byte: traits.encoding.is_two_byte(),
            is_symbol: traits.is_symbol,
            strategy: traits.strategy,
            index: CharacterExistenceIndex::new(),
            ref_count: 1 + FAMILY_KEEP_ALIVE,
            page_loads: 0,
        };
        let id = match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = Some(family);
                FamilyId(slot)
            }
            None => {
                self.slots.push(Some(family));
                FamilyId(self.slots.len() - 1)
            }
        };
        self.by_identity.insert(identity, id);
        id
    }

    /// Drops one reference. Returns true when this destroyed the family.
    pub fn release(&mut self, id: FamilyId) -> bool {
        let Some(family) = self.family_mut(id) else {
            return false;
        };
        family.ref_count = family.ref_count.saturating_sub(1);
        if family.ref_count > 0 {
            return false;
        }
        if let Some(family) = self.slots[id.0].take() {
            trace!("Family {:?} destroyed", family.identity.face);
            self.by_identity.remove(&family.identity);
            self.free.push(id.0);
        }
        true
    }

    /// Whether the family can display `cp`, computing its page on first use.
    pub fn supports(&mut self, id: FamilyId, cp: u32) -> bool {
        if cp >= FONTMAP_NUM_CHARS {
            return false;
        }
        let Some(family) = self.family_mut(id) else {
            return false;
        };
        Self::ensure_page(family, cp);
        family.index.get(cp).unwrap_or(false)
    }

    /// Records `cp` as displayable regardless of what the family's strategy
    /// says. Used to stop repeated searches for characters nothing renders.
    pub fn mark_supported(&mut self, id: FamilyId, cp: u32) {
        if let Some(family) = self.family_mut(id) {
            Self::ensure_page(family, cp);
            family.index.set(cp);
        }
    }

    fn ensure_page(family: &mut FontFamily, cp: u32) {
        let Some(page) = CharacterExistenceIndex::page_for(cp) else {
            return;
        };
        let strategy = &family.strategy;
        if family.index.load_page_with(page, |bits| strategy.fill_page(page, bits)) {
            family.page_loads += 1;
            debug!(
                "Computed page {} of {:?} via {}",
                page,
                family.identity.face,
                strategy.name()
            );
        }
    }

    pub fn contains(&self, identity: &FamilyIdentity) -> bool {
        self.by_identity.contains_key(identity)
    }

    pub fn lookup(&self, identity: &FamilyIdentity) -> Option<FamilyId> {
        self.by_identity.get(identity).copied()
    }

    pub fn ref_count(&self, identity: &FamilyIdentity) -> Option<usize> {
        self.lookup(identity)
            .and_then(|id| self.get(id))
            .map(|f| f.ref_count)
    }

    /// Number of page computations the family has performed.
    pub fn page_loads(&self, id: FamilyId) -> usize {
        self.get(id).map_or(0, |f| f.page_loads)
    }

    pub fn get(&self, id: FamilyId) -> Option<&FontFamily> {
        self.slots.get(id.0).and_then(|s| s.as_ref())
    }

    fn family_mut(&mut self, id: FamilyId) -> Option<&mut FontFamily> {
        self.slots.get_mut(id.0).and_then(|s| s.as_mut())
    }

    pub fn len(&self) -> usize {
        self.by_identity.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_identity.is_empty()
    }

    /// Drops the keep-alive reference of every family nothing else uses.
    /// Returns how many families were destroyed.
    pub fn trim(&mut self) -> usize {
        let idle: Vec<FamilyId> = self
            .by_identity
            .values()
            .copied()
            .filter(|id| self.get(*id).is_some_and(|f| f.ref_count <= FAMILY_KEEP_ALIVE))
            .collect();
        idle.into_iter().filter(|id| self.release(*id)).count()
    }
}
