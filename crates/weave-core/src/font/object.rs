//! Composite font objects: construction, measurement and drawing

use std::ops::Range;

use bitflags::bitflags;
use tracing::{info, warn};

use crate::attributes::FontAttributes;
use crate::config::EnvironmentConfig;
use crate::constants::TAB_DIGITS;
use crate::encoding::{control_escape, Encoding};
use crate::error::{FontError, FontResult};
use crate::font::fallback::{find_subfont_for_char, list_font_or_alias, ResolveContext, SubFontRef};
use crate::font::family::{introspect, FamilyCache, FamilyId, FamilyIdentity};
use crate::font::matcher::{materialize, select_best, MatchAttributes};
use crate::traits::{FontBackend, FontDescriptor, NativeMetrics};
use crate::xlfd::XlfdAttributes;

bitflags! {
    /// How `measure` treats the character that crosses the width limit.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MeasureFlags: u8 {
        /// Stop at the last word boundary that fits.
        const WHOLE_WORDS = 0x01;
        /// Consume at least one word (or character) even if it overflows.
        const AT_LEAST_ONE = 0x02;
        /// Include the character that straddles the limit.
        const PARTIAL_OK = 0x04;
    }
}

/// One loaded resource inside a font object.
#[derive(Debug)]
pub struct SubFont<R> {
    pub resource: R,
    pub family: FamilyId,
    pub identity: FamilyIdentity,
    pub descriptor: FontDescriptor,
    pub encoding: Encoding,
}

/// Derived metrics of a font object, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FontMetrics {
    pub ascent: i32,
    pub descent: i32,
    pub max_width: i32,
    pub fixed: bool,
    pub tab_width: i32,
    /// Offset of the underline below the baseline.
    pub underline_position: i32,
    /// Thickness of underline and overstrike bars.
    pub underline_height: i32,
}

impl FontMetrics {
    pub fn linespace(&self) -> i32 {
        self.ascent + self.descent
    }
}

/// A requested attribute set bound to an ordered list of subfonts. Subfont
/// 0 is the base font; fallback only ever appends.
#[derive(Debug)]
pub struct FontObject<R> {
    pub requested: FontAttributes,
    pub xlfd: XlfdAttributes,
    pub subfonts: Vec<SubFont<R>>,
    pub metrics: FontMetrics,
    /// Attributes of the loaded base font, used as the wanted side when
    /// ranking fallback candidates.
    pub want: MatchAttributes,
    pub pixel_size: u32,
    pub actual: FontAttributes,
}

/// Loads the base font for `requested`.
///
/// The family is looked up directly, then through its aliases, then
/// through the fallback classes that contain it. When nothing matches the
/// backend's default font is used.
pub fn construct<B: FontBackend>(
    backend: &B,
    families: &mut FamilyCache,
    config: &EnvironmentConfig,
    requested: &FontAttributes,
    xlfd: &XlfdAttributes,
    seeded: Option<Vec<FontDescriptor>>,
) -> FontResult<FontObject<B::Resource>> {
    let pixel_size = config.pixels_for_size(requested.size);
    let family = requested
        .family
        .clone()
        .filter(|f| !f.is_empty())
        .unwrap_or_else(|| config.default_family.clone());
    let want = MatchAttributes {
        family: family.clone(),
        foundry: xlfd.foundry.clone(),
        weight: requested.weight,
        slant: if xlfd.slant.is_italic() {
            xlfd.slant
        } else {
            requested.slant
        },
        set_width: xlfd.set_width,
        pixel_size: Some(pixel_size),
        charset: xlfd
            .charset
            .clone()
            .unwrap_or_else(|| config.preferred_charset.clone()),
    };

    let mut candidates = seeded.unwrap_or_else(|| base_candidates(backend, config, &family));
    if candidates.is_empty() {
        warn!("No fonts for family {:?}; using the default font", family);
        candidates.extend(backend.default_font());
    }

    let best = select_best(&candidates, &want);
    let loaded = match materialize(backend, &candidates, best, pixel_size) {
        Some((resource, descriptor)) => Some((resource, descriptor.clone())),
        None => {
            warn!("Could not load any {:?} font; using the default font", family);
            backend.default_font().and_then(|d| {
                let size = d.pixel_size.unwrap_or(pixel_size);
                backend.load_concrete_font(&d, size).map(|r| (r, d))
            })
        }
    };
    let (resource, descriptor) = loaded.ok_or(FontError::NoFontsAvailable)?;

    let native = backend.native_metrics(&resource);
    let identity = FamilyIdentity::from_metrics(&native);
    let family_id = families.acquire(identity.clone(), || introspect(backend, &resource, &native));
    let encoding = families
        .get(family_id)
        .map_or(Encoding::for_charset(&native.charset), |f| f.encoding);

    let metrics = derive_metrics(backend, &resource, encoding, &native);
    let actual = FontAttributes {
        family: Some(native.face.clone()),
        size: config.points_for_pixels(native.pixel_size),
        weight: native.weight,
        slant: native.slant.folded(),
        underline: requested.underline,
        overstrike: requested.overstrike,
    };
    let fallback_want = MatchAttributes {
        family: native.face.clone(),
        foundry: native.foundry.clone(),
        weight: native.weight,
        slant: native.slant,
        set_width: descriptor.set_width,
        pixel_size: Some(native.pixel_size),
        charset: native.charset.clone(),
    };

    info!(
        "Font {} resolved to {:?} at {}px",
        requested, descriptor.native_name, native.pixel_size
    );
    Ok(FontObject {
        requested: requested.clone(),
        xlfd: xlfd.clone(),
        subfonts: vec![SubFont {
            resource,
            family: family_id,
            identity,
            descriptor,
            encoding,
        }],
        metrics,
        want: fallback_want,
        pixel_size: native.pixel_size,
        actual,
    })
}

fn base_candidates<B: FontBackend>(
    backend: &B,
    config: &EnvironmentConfig,
    family: &str,
) -> Vec<FontDescriptor> {
    let found = list_font_or_alias(backend, &config.fallbacks, family);
    if !found.is_empty() {
        return found;
    }
    for class in config.fallbacks.classes.iter().filter(|c| c.contains(family)) {
        for member in &class.members {
            let found = list_font_or_alias(backend, &config.fallbacks, member);
            if !found.is_empty() {
                return found;
            }
        }
    }
    Vec::new()
}

fn derive_metrics<B: FontBackend>(
    backend: &B,
    resource: &B::Resource,
    encoding: Encoding,
    native: &NativeMetrics,
) -> FontMetrics {
    let width_of = |text: &str| backend.measure_native(resource, encoding, &encoding.encode(text));

    let mut tab_width = width_of("0");
    if tab_width == 0 {
        tab_width = native.max_width;
    }
    tab_width = (tab_width * TAB_DIGITS).max(1);

    let descent = native.descent;
    let mut position = native.underline_position.unwrap_or(descent / 2);
    let mut height = native
        .underline_thickness
        .unwrap_or(0)
        .max(width_of("I") / 3)
        .max(1);
    if position + height > descent {
        height = descent - position;
        if height <= 0 {
            position = descent - 1;
            height = 1;
        }
    }

    FontMetrics {
        ascent: native.ascent,
        descent,
        max_width: native.max_width,
        fixed: native.fixed_pitch,
        tab_width,
        underline_position: position,
        underline_height: height,
    }
}

/// Gives back every family reference the object holds.
pub fn release_subfonts<R>(families: &mut FamilyCache, font: FontObject<R>) {
    for sub in font.subfonts {
        families.release(sub.family);
    }
}

/// Splits `text` into maximal byte ranges rendered by the same subfont.
pub fn split_runs<B: FontBackend>(
    cx: &mut ResolveContext<'_, B>,
    font: &mut FontObject<B::Resource>,
    text: &str,
) -> Vec<(SubFontRef, Range<usize>)> {
    let mut runs: Vec<(SubFontRef, Range<usize>)> = Vec::new();
    for (offset, ch) in text.char_indices() {
        let which = find_subfont_for_char(cx, font, ch);
        let end = offset + ch.len_utf8();
        match runs.last_mut() {
            Some((last, range)) if *last == which => range.end = end,
            _ => runs.push((which, offset..end)),
        }
    }
    runs
}

/// Native bytes, encoding and subfont index for one run.
fn native_run<R>(font: &FontObject<R>, which: SubFontRef, text: &str) -> (usize, Encoding, Vec<u8>) {
    match which {
        SubFontRef::Index(i) => {
            let encoding = font.subfonts[i].encoding;
            (i, encoding, encoding.encode(text))
        }
        SubFontRef::Control => {
            // Escapes are plain ASCII whatever the base font's encoding.
            let escaped: String = text.chars().map(control_escape).collect();
            (0, Encoding::Ascii, Encoding::Ascii.encode(&escaped))
        }
    }
}

fn run_width<B: FontBackend>(
    backend: &B,
    font: &FontObject<B::Resource>,
    which: SubFontRef,
    text: &str,
) -> i32 {
    let (index, encoding, bytes) = native_run(font, which, text);
    backend.measure_native(&font.subfonts[index].resource, encoding, &bytes)
}

fn is_breaking_space(ch: char) -> bool {
    (ch as u32) < 256 && ch.is_ascii_whitespace()
}

/// How many bytes of `text` fit in `max` pixels, and their width.
/// `None` measures the whole string.
///
/// With a limit, widths are summed one character at a time. That agrees
/// with the unlimited width because backend widths are additive.
pub fn measure_chars<B: FontBackend>(
    cx: &mut ResolveContext<'_, B>,
    font: &mut FontObject<B::Resource>,
    text: &str,
    max: Option<i32>,
    flags: MeasureFlags,
) -> (usize, i32) {
    if text.is_empty() || font.subfonts.is_empty() {
        return (0, 0);
    }

    let Some(max) = max else {
        let runs = split_runs(cx, font, text);
        let width = runs
            .into_iter()
            .map(|(which, range)| run_width(cx.backend, font, which, &text[range]))
            .sum();
        return (text.len(), width);
    };

    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let byte_end = |i: usize| chars.get(i).map_or(text.len(), |(offset, _)| *offset);

    let mut cur_x = 0;
    let mut new_x = 0;
    // Index of the first character after the last word that fits.
    let mut term = 0;
    let mut term_x = 0;
    let mut saw_non_space = !is_breaking_space(chars[0].1);
    let mut p = 0;

    loop {
        let (offset, ch) = chars[p];
        let which = find_subfont_for_char(cx, font, ch);
        new_x += run_width(cx.backend, font, which, &text[offset..offset + ch.len_utf8()]);
        if new_x > max {
            break;
        }
        cur_x = new_x;
        p += 1;
        if p >= chars.len() {
            term = p;
            term_x = cur_x;
            break;
        }
        if is_breaking_space(chars[p].1) {
            if saw_non_space {
                term = p;
                term_x = cur_x;
                saw_non_space = false;
            }
        } else {
            saw_non_space = true;
        }
    }

    let at_end = p >= chars.len();
    if flags.contains(MeasureFlags::PARTIAL_OK) && !at_end && cur_x < max {
        cur_x = new_x;
        p += 1;
    }
    let at_end = p >= chars.len();
    if flags.contains(MeasureFlags::AT_LEAST_ONE) && term == 0 && !at_end {
        term = p;
        term_x = cur_x;
        if term == 0 {
            term = 1;
            term_x = new_x;
        }
    } else if at_end || !flags.contains(MeasureFlags::WHOLE_WORDS) {
        term = p;
        term_x = cur_x;
    }

    (byte_end(term), term_x)
}

/// Draws `text` with its baseline at `y`, then the underline and overstrike
/// bars across the drawn width. Returns the width drawn.
pub fn draw_chars<B: FontBackend>(
    cx: &mut ResolveContext<'_, B>,
    font: &mut FontObject<B::Resource>,
    surface: &mut B::Surface,
    text: &str,
    x: i32,
    y: i32,
) -> i32 {
    if font.subfonts.is_empty() {
        return 0;
    }
    let mut pen = x;
    for (which, range) in split_runs(cx, font, text) {
        let (index, encoding, bytes) = native_run(font, which, &text[range]);
        let resource = &font.subfonts[index].resource;
        cx.backend.draw_native(surface, resource, encoding, &bytes, pen, y);
        pen += cx.backend.measure_native(resource, encoding, &bytes);
    }

    let width = pen - x;
    let metrics = font.metrics;
    if width > 0 && font.requested.underline {
        cx.backend.fill_rect(
            surface,
            x,
            y + metrics.underline_position,
            width,
            metrics.underline_height,
        );
    }
    if width > 0 && font.requested.overstrike {
        let bar_y = y - (metrics.descent + metrics.ascent / 10);
        cx.backend
            .fill_rect(surface, x, bar_y, width, metrics.underline_height);
    }
    width
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dummy_backend::{DummyBackend, DummyFace, DummyFont, DummySurface};
    use crate::font::fallback::ResolverStats;
    use crate::font::family::FamilyTraits;

    struct Fixture {
        backend: DummyBackend,
        families: FamilyCache,
        config: EnvironmentConfig,
        control: FamilyId,
        stats: ResolverStats,
    }

    impl Fixture {
        fn new(backend: DummyBackend) -> Self {
            let mut families = FamilyCache::new();
            let control = families.acquire(
                FamilyIdentity::new("control", None, "control"),
                FamilyTraits::control,
            );
            families.mark_supported(control, '\n' as u32);
            Self {
                backend,
                families,
                config: EnvironmentConfig::default(),
                control,
                stats: ResolverStats::default(),
            }
        }

        fn font(&mut self, attributes: &FontAttributes) -> FontResult<FontObject<DummyFont>> {
            construct(
                &self.backend,
                &mut self.families,
                &self.config,
                attributes,
                &XlfdAttributes::default(),
                None,
            )
        }

        fn cx(&mut self) -> ResolveContext<'_, DummyBackend> {
            ResolveContext {
                backend: &self.backend,
                families: &mut self.families,
                fallbacks: &self.config.fallbacks,
                control: self.control,
                stats: &mut self.stats,
            }
        }
    }

    #[test]
    fn test_metrics_from_base_font() {
        let mut fx = Fixture::new(DummyBackend::standard());
        let font = fx.font(&FontAttributes::new("Helvetica", 12)).unwrap();

        assert_eq!(font.pixel_size, 16);
        assert_eq!(font.metrics.ascent, 12);
        assert_eq!(font.metrics.descent, 4);
        assert_eq!(font.metrics.tab_width, 7 * TAB_DIGITS);
        assert_eq!(
            (font.metrics.underline_position, font.metrics.underline_height),
            (2, 2)
        );
        assert_eq!(font.actual.size, 12);
        assert_eq!(font.actual.family.as_deref(), Some("Helvetica"));
    }

    #[test]
    fn test_underline_is_clipped_to_descent() {
        let backend = DummyBackend::new().with_face(DummyFace::latin("Thick", 6).with_underline(3, 3));
        let mut fx = Fixture::new(backend);
        let font = fx.font(&FontAttributes::new("Thick", 12)).unwrap();
        assert_eq!(
            (font.metrics.underline_position, font.metrics.underline_height),
            (3, 1)
        );
    }

    #[test]
    fn test_failed_load_falls_back_to_default() {
        let backend = DummyBackend::new()
            .with_face(DummyFace::latin("Broken", 6).failing())
            .with_default(DummyFace::latin("fixed", 6).with_pixel_size(13));
        let mut fx = Fixture::new(backend);
        let font = fx.font(&FontAttributes::new("Broken", 12)).unwrap();
        assert_eq!(font.subfonts[0].descriptor.face, "fixed");
        assert_eq!(font.actual.family.as_deref(), Some("fixed"));

        let backend = DummyBackend::new().with_face(DummyFace::latin("Broken", 6).failing());
        let mut fx = Fixture::new(backend);
        assert_eq!(
            fx.font(&FontAttributes::new("Broken", 12)).err(),
            Some(FontError::NoFontsAvailable)
        );
    }

    #[test]
    fn test_runs_split_by_subfont() {
        let mut fx = Fixture::new(DummyBackend::standard());
        let mut font = fx.font(&FontAttributes::new("Helvetica", 12)).unwrap();

        let runs = split_runs(&mut fx.cx(), &mut font, "ab\u{3b1}c\n");
        assert_eq!(
            runs,
            vec![
                (SubFontRef::Index(0), 0..2),
                (SubFontRef::Index(1), 2..4),
                (SubFontRef::Index(0), 4..5),
                (SubFontRef::Control, 5..6),
            ]
        );
    }

    #[test]
    fn test_measure_limits() {
        let mut fx = Fixture::new(DummyBackend::standard());
        let mut font = fx.font(&FontAttributes::new("Helvetica", 12)).unwrap();
        let mut measure = |text: &str, max: Option<i32>, flags: MeasureFlags| {
            measure_chars(&mut fx.cx(), &mut font, text, max, flags)
        };

        assert_eq!(measure("", Some(10), MeasureFlags::empty()), (0, 0));
        assert_eq!(measure("hello world", None, MeasureFlags::empty()), (11, 77));
        assert_eq!(measure("hello world", Some(40), MeasureFlags::empty()), (5, 35));
        assert_eq!(measure("hello world", Some(40), MeasureFlags::WHOLE_WORDS), (5, 35));
        assert_eq!(measure("hello world", Some(40), MeasureFlags::PARTIAL_OK), (6, 42));
        assert_eq!(measure("hello world", Some(77), MeasureFlags::WHOLE_WORDS), (11, 77));
    }

    #[test]
    fn test_measure_at_least_one() {
        let mut fx = Fixture::new(DummyBackend::standard());
        let mut font = fx.font(&FontAttributes::new("Helvetica", 12)).unwrap();
        let mut measure = |max: i32, flags: MeasureFlags| {
            measure_chars(&mut fx.cx(), &mut font, "helloworld", Some(max), flags)
        };

        assert_eq!(measure(3, MeasureFlags::WHOLE_WORDS), (0, 0));
        assert_eq!(
            measure(3, MeasureFlags::WHOLE_WORDS | MeasureFlags::AT_LEAST_ONE),
            (1, 7)
        );
        assert_eq!(
            measure(20, MeasureFlags::WHOLE_WORDS | MeasureFlags::AT_LEAST_ONE),
            (2, 14)
        );
    }

    #[test]
    fn test_limited_and_unlimited_widths_agree() {
        let mut fx = Fixture::new(DummyBackend::standard());
        let mut font = fx.font(&FontAttributes::new("Helvetica", 12)).unwrap();
        let text = "ab\u{3b1}c\n";

        let whole = measure_chars(&mut fx.cx(), &mut font, text, None, MeasureFlags::empty());
        assert_eq!(whole, (text.len(), 7 * 3 + 9 + 7 * 2));
        let limited =
            measure_chars(&mut fx.cx(), &mut font, text, Some(whole.1), MeasureFlags::empty());
        assert_eq!(limited, whole);
    }

    #[test]
    fn test_escapes_stay_ascii_on_symbol_fonts() {
        let mut fx = Fixture::new(DummyBackend::standard());
        let mut font = fx.font(&FontAttributes::new("Symbol", 12)).unwrap();
        assert!(font.subfonts[0].encoding.is_symbol());
        let mut surface = DummySurface::new();

        let width = draw_chars(&mut fx.cx(), &mut font, &mut surface, "\u{e01}", 0, 20);
        assert_eq!(surface.texts(), vec![("Symbol", "\\u0e01")]);
        assert_eq!(width, 6 * 9);
        assert_eq!(
            measure_chars(&mut fx.cx(), &mut font, "\u{e01}", None, MeasureFlags::empty()),
            (3, 54)
        );
    }

    #[test]
    fn test_draw_with_decorations() {
        let mut fx = Fixture::new(DummyBackend::standard());
        let attributes = FontAttributes {
            overstrike: true,
            ..FontAttributes::new("Helvetica", 12).with_underline(true)
        };
        let mut font = fx.font(&attributes).unwrap();
        let mut surface = DummySurface::new();

        let width = draw_chars(&mut fx.cx(), &mut font, &mut surface, "ab\u{3b1}", 5, 20);
        assert_eq!(width, 7 * 2 + 9);
        assert_eq!(surface.texts(), vec![("Helvetica", "ab"), ("DejaVu Sans", "\u{3b1}")]);
        // Underline below the baseline, overstrike through the x-height.
        assert_eq!(surface.rects(), vec![(5, 22, 23, 2), (5, 15, 23, 2)]);
    }

    #[test]
    fn test_release_gives_back_every_family() {
        let mut fx = Fixture::new(DummyBackend::standard());
        let mut font = fx.font(&FontAttributes::new("Helvetica", 12)).unwrap();
        find_subfont_for_char(&mut fx.cx(), &mut font, '\u{3b1}');
        let ids: Vec<FamilyId> = font.subfonts.iter().map(|s| s.family).collect();
        assert_eq!(ids.len(), 2);

        release_subfonts(&mut fx.families, font);
        for id in ids {
            assert_eq!(fx.families.get(id).map(|f| f.ref_count()), Some(1));
        }
    }
}
