//! The font environment: one per application, owning every cache

use std::collections::HashMap;

use tracing::{debug, trace, warn};

use crate::attributes::{parse_font_description, FontAttributes};
use crate::config::EnvironmentConfig;
use crate::error::{FontError, FontResult};
use crate::font::fallback::{find_subfont_for_char, ResolveContext, ResolverStats, SubFontRef};
use crate::font::family::{FamilyCache, FamilyId, FamilyIdentity, FamilyTraits};
use crate::font::named::{Created, NamedFontRegistry};
use crate::font::object::{
    construct, draw_chars, measure_chars, release_subfonts, FontMetrics, FontObject, MeasureFlags,
};
use crate::traits::{FontBackend, FontDescriptor};
use crate::xlfd::XlfdAttributes;

/// Handle to a font object owned by a [`FontEnvironment`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FontId {
    index: usize,
    generation: u32,
}

struct FontEntry<R> {
    object: FontObject<R>,
    ref_count: usize,
    cache_key: String,
    /// Named font this object was built from.
    named: Option<String>,
}

struct FontSlot<R> {
    generation: u32,
    entry: Option<FontEntry<R>>,
}

/// Owns the backend, the family cache, every font object and the named
/// font table. Nothing here is shared between environments.
pub struct FontEnvironment<B: FontBackend> {
    backend: B,
    config: EnvironmentConfig,
    families: FamilyCache,
    control: FamilyId,
    stats: ResolverStats,
    fonts: Vec<FontSlot<B::Resource>>,
    free: Vec<usize>,
    by_description: HashMap<String, FontId>,
    named: NamedFontRegistry,
    world_changed_pending: bool,
    listeners: Vec<Box<dyn FnMut()>>,
}

fn object_mut<R>(fonts: &mut [FontSlot<R>], id: FontId) -> FontResult<&mut FontObject<R>> {
    fonts
        .get_mut(id.index)
        .filter(|slot| slot.generation == id.generation)
        .and_then(|slot| slot.entry.as_mut())
        .map(|entry| &mut entry.object)
        .ok_or(FontError::StaleFont)
}

impl<B: FontBackend> FontEnvironment<B> {
    pub fn new(backend: B, config: EnvironmentConfig) -> Self {
        let mut families = FamilyCache::new();
        let control = families.acquire(
            FamilyIdentity::new("control", None, "control"),
            FamilyTraits::control,
        );
        // C0 and C1 controls always render as escapes.
        for cp in (0x00..0x20).chain(0x80..0xA0) {
            families.mark_supported(control, cp);
        }
        Self {
            backend,
            config,
            families,
            control,
            stats: ResolverStats::default(),
            fonts: Vec::new(),
            free: Vec::new(),
            by_description: HashMap::new(),
            named: NamedFontRegistry::new(),
            world_changed_pending: false,
            listeners: Vec::new(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn config(&self) -> &EnvironmentConfig {
        &self.config
    }

    pub fn family_cache(&self) -> &FamilyCache {
        &self.families
    }

    pub fn control_family(&self) -> FamilyId {
        self.control
    }

    pub fn stats(&self) -> ResolverStats {
        self.stats
    }

    /// How many times the resolver has scanned every installed face.
    pub fn scan_count(&self) -> usize {
        self.stats.scans
    }

    /// Resolves a font description: a named font, a native font name, or
    /// any of the textual description forms. Asking for the same string
    /// again returns the same handle with one more reference.
    pub fn get_font(&mut self, description: &str) -> FontResult<FontId> {
        if let Some(id) = self.cached(description) {
            return Ok(id);
        }

        if let Some(attributes) = self.named.lookup(description).cloned() {
            let object = self.build(&attributes, &XlfdAttributes::default(), None)?;
            self.named.retain(description);
            return Ok(self.insert(object, description, Some(description.to_string())));
        }

        if let Some(descriptor) = self.backend.native_font(description) {
            debug!("{:?} is a native font name", description);
            let (attributes, xlfd) = native_request(&descriptor);
            let object = self.build(&attributes, &xlfd, Some(vec![descriptor]))?;
            return Ok(self.insert(object, description, None));
        }

        let (attributes, xlfd) = parse_font_description(description)?;
        let object = self.build(&attributes, &xlfd, None)?;
        Ok(self.insert(object, description, None))
    }

    /// Like [`get_font`](Self::get_font) for an attribute set.
    pub fn font_from_attributes(&mut self, attributes: &FontAttributes) -> FontResult<FontId> {
        let key = attributes.to_string();
        if let Some(id) = self.cached(&key) {
            return Ok(id);
        }
        let object = self.build(attributes, &XlfdAttributes::default(), None)?;
        Ok(self.insert(object, &key, None))
    }

    fn cached(&mut self, key: &str) -> Option<FontId> {
        let id = *self.by_description.get(key)?;
        let slot = self.fonts.get_mut(id.index)?;
        let entry = slot.entry.as_mut()?;
        entry.ref_count += 1;
        trace!("Font {:?} reused, refcount {}", key, entry.ref_count);
        Some(id)
    }

    fn build(
        &mut self,
        attributes: &FontAttributes,
        xlfd: &XlfdAttributes,
        seeded: Option<Vec<FontDescriptor>>,
    ) -> FontResult<FontObject<B::Resource>> {
        construct(
            &self.backend,
            &mut self.families,
            &self.config,
            attributes,
            xlfd,
            seeded,
        )
    }

    fn insert(
        &mut self,
        object: FontObject<B::Resource>,
        key: &str,
        named: Option<String>,
    ) -> FontId {
        let entry = FontEntry {
            object,
            ref_count: 1,
            cache_key: key.to_string(),
            named,
        };
        let id = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.fonts[index];
                slot.entry = Some(entry);
                FontId {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                self.fonts.push(FontSlot {
                    generation: 0,
                    entry: Some(entry),
                });
                FontId {
                    index: self.fonts.len() - 1,
                    generation: 0,
                }
            }
        };
        self.by_description.insert(key.to_string(), id);
        id
    }

    /// Drops one reference. The last release destroys the object and gives
    /// back its family references.
    pub fn release(&mut self, id: FontId) -> FontResult<()> {
        let slot = self
            .fonts
            .get_mut(id.index)
            .filter(|slot| slot.generation == id.generation)
            .ok_or(FontError::StaleFont)?;
        let entry = slot.entry.as_mut().ok_or(FontError::StaleFont)?;
        entry.ref_count -= 1;
        if entry.ref_count > 0 {
            return Ok(());
        }

        let Some(entry) = slot.entry.take() else {
            return Ok(());
        };
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        if self.by_description.get(&entry.cache_key) == Some(&id) {
            self.by_description.remove(&entry.cache_key);
        }
        if let Some(name) = &entry.named {
            if self.named.release(name) {
                debug!("Named font {:?} purged", name);
            }
        }
        trace!("Font {:?} destroyed", entry.cache_key);
        release_subfonts(&mut self.families, entry.object);
        Ok(())
    }

    /// Live font objects.
    pub fn font_count(&self) -> usize {
        self.fonts.iter().filter(|s| s.entry.is_some()).count()
    }

    pub fn font_ref_count(&self, id: FontId) -> Option<usize> {
        self.entry(id).map(|e| e.ref_count)
    }

    fn entry(&self, id: FontId) -> Option<&FontEntry<B::Resource>> {
        self.fonts
            .get(id.index)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.entry.as_ref())
    }

    fn object(&self, id: FontId) -> FontResult<&FontObject<B::Resource>> {
        self.entry(id).map(|e| &e.object).ok_or(FontError::StaleFont)
    }

    /// Bytes of `text` that fit in `max` pixels and their width. `None`
    /// measures everything.
    pub fn measure(
        &mut self,
        id: FontId,
        text: &str,
        max: Option<i32>,
        flags: MeasureFlags,
    ) -> FontResult<(usize, i32)> {
        let font = object_mut(&mut self.fonts, id)?;
        let mut cx = ResolveContext {
            backend: &self.backend,
            families: &mut self.families,
            fallbacks: &self.config.fallbacks,
            control: self.control,
            stats: &mut self.stats,
        };
        Ok(measure_chars(&mut cx, font, text, max, flags))
    }

    /// Width of the whole of `text`.
    pub fn text_width(&mut self, id: FontId, text: &str) -> FontResult<i32> {
        self.measure(id, text, None, MeasureFlags::empty())
            .map(|(_, width)| width)
    }

    /// Draws `text` with its baseline at `y`. Returns the drawn width.
    pub fn draw(
        &mut self,
        id: FontId,
        surface: &mut B::Surface,
        text: &str,
        x: i32,
        y: i32,
    ) -> FontResult<i32> {
        let font = object_mut(&mut self.fonts, id)?;
        let mut cx = ResolveContext {
            backend: &self.backend,
            families: &mut self.families,
            fallbacks: &self.config.fallbacks,
            control: self.control,
            stats: &mut self.stats,
        };
        Ok(draw_chars(&mut cx, font, surface, text, x, y))
    }

    /// Which subfont renders `ch`, growing the font if needed.
    pub fn resolve_char(&mut self, id: FontId, ch: char) -> FontResult<SubFontRef> {
        let font = object_mut(&mut self.fonts, id)?;
        let mut cx = ResolveContext {
            backend: &self.backend,
            families: &mut self.families,
            fallbacks: &self.config.fallbacks,
            control: self.control,
            stats: &mut self.stats,
        };
        Ok(find_subfont_for_char(&mut cx, font, ch))
    }

    pub fn metrics(&self, id: FontId) -> FontResult<FontMetrics> {
        self.object(id).map(|f| f.metrics)
    }

    /// Attributes of the font that was actually loaded.
    pub fn actual(&self, id: FontId) -> FontResult<FontAttributes> {
        self.object(id).map(|f| f.actual.clone())
    }

    /// Face names of every subfont, base font first.
    pub fn subfont_faces(&self, id: FontId) -> FontResult<Vec<String>> {
        self.object(id)
            .map(|f| f.subfonts.iter().map(|s| s.descriptor.face.clone()).collect())
    }

    pub fn subfont_families(&self, id: FontId) -> FontResult<Vec<FamilyId>> {
        self.object(id)
            .map(|f| f.subfonts.iter().map(|s| s.family).collect())
    }

    pub fn subfont_count(&self, id: FontId) -> FontResult<usize> {
        self.object(id).map(|f| f.subfonts.len())
    }

    // Named fonts

    pub fn create_named(&mut self, name: &str, attributes: FontAttributes) -> FontResult<()> {
        if self.named.create(name, attributes)? == Created::Revived {
            self.propagate(name);
        }
        Ok(())
    }

    pub fn delete_named(&mut self, name: &str) -> FontResult<()> {
        self.named.delete(name)
    }

    /// Applies `-option value` pairs to a named font and rebuilds its
    /// dependents.
    pub fn configure_named<S: AsRef<str>>(&mut self, name: &str, options: &[S]) -> FontResult<()> {
        self.named.configure(name, options)?;
        self.propagate(name);
        Ok(())
    }

    pub fn list_named(&self) -> Vec<String> {
        self.named.list()
    }

    pub fn named_attributes(&self, name: &str) -> FontResult<FontAttributes> {
        self.named
            .lookup(name)
            .cloned()
            .ok_or_else(|| FontError::UnknownNamedFont {
                name: name.to_string(),
            })
    }

    /// Rebuilds every object derived from `name` in place and schedules one
    /// world-changed notification.
    fn propagate(&mut self, name: &str) {
        let Some(entry) = self.named.get(name) else {
            return;
        };
        if entry.ref_count == 0 {
            return;
        }
        let attributes = entry.attributes.clone();
        let dependents: Vec<usize> = self
            .fonts
            .iter()
            .enumerate()
            .filter(|(_, slot)| {
                slot.entry
                    .as_ref()
                    .is_some_and(|e| e.named.as_deref() == Some(name))
            })
            .map(|(index, _)| index)
            .collect();

        for index in dependents {
            match self.build(&attributes, &XlfdAttributes::default(), None) {
                Ok(object) => {
                    if let Some(entry) = self.fonts[index].entry.as_mut() {
                        let old = std::mem::replace(&mut entry.object, object);
                        release_subfonts(&mut self.families, old);
                    }
                }
                Err(e) => warn!("Could not rebuild a {:?} font: {}", name, e),
            }
        }
        self.world_changed_pending = true;
    }

    /// Registers a callback run by
    /// [`flush_pending_notifications`](Self::flush_pending_notifications).
    pub fn on_world_changed(&mut self, listener: Box<dyn FnMut()>) {
        self.listeners.push(listener);
    }

    pub fn world_changed_pending(&self) -> bool {
        self.world_changed_pending
    }

    /// Runs the world-changed listeners once if any named font changed since
    /// the last flush. Returns whether they ran.
    pub fn flush_pending_notifications(&mut self) -> bool {
        if !self.world_changed_pending {
            return false;
        }
        self.world_changed_pending = false;
        for listener in &mut self.listeners {
            listener();
        }
        true
    }

    /// Every face the backend knows, once each, sorted without regard to
    /// case.
    pub fn families(&self) -> Vec<String> {
        let mut faces: Vec<String> = self
            .backend
            .enumerate_families("*")
            .into_iter()
            .map(|d| d.face)
            .collect();
        faces.sort_by_key(|f| f.to_lowercase());
        faces.dedup_by(|a, b| a.eq_ignore_ascii_case(b));
        faces
    }

    /// Destroys every family no subfont uses any more.
    pub fn trim_family_cache(&mut self) -> usize {
        self.families.trim()
    }
}

/// Request attributes for a font picked by native name.
fn native_request(descriptor: &FontDescriptor) -> (FontAttributes, XlfdAttributes) {
    let attributes = FontAttributes {
        family: Some(descriptor.face.clone()),
        size: descriptor.pixel_size.map_or(0, |px| -(px as i32)),
        weight: descriptor.weight,
        slant: descriptor.slant.folded(),
        underline: false,
        overstrike: false,
    };
    let xlfd = XlfdAttributes {
        foundry: descriptor.foundry.clone(),
        slant: descriptor.slant,
        set_width: descriptor.set_width,
        charset: Some(descriptor.charset.clone()),
    };
    (attributes, xlfd)
}
