//! Render backend over installed TrueType/OpenType files

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::{Rc, Weak};

use fontdue::{Font, FontSettings};
use tracing::{debug, info, trace, warn};
use weave_core::{Encoding, FontBackend, FontDescriptor, NativeMetrics, Slant, Weight};

use crate::canvas::Canvas;
use crate::discovery::{discover_fonts, FontSource};
use crate::error::{SystemError, SystemResult};
use crate::sfnt::{face_count, SfntFace};

/// Charset every system face declares. Text reaches fontdue as UTF-16.
pub const SYSTEM_CHARSET: &str = "unicode";

/// Faces preferred as the last-resort default, in order.
const DEFAULT_FACES: &[&str] = &[
    "DejaVu Sans",
    "Liberation Sans",
    "Noto Sans",
    "Arial",
    "Helvetica",
    "Cantarell",
];

/// One face of an installed font file.
#[derive(Debug, Clone)]
pub struct SystemFace {
    pub descriptor: FontDescriptor,
    pub path: PathBuf,
    pub index: u32,
    pub info: SfntFace,
}

struct LoadedFace {
    data: Vec<u8>,
    font: Font,
}

/// A face instantiated at a pixel size.
#[derive(Clone)]
pub struct SystemFont {
    face: usize,
    pixel_size: u32,
    loaded: Rc<LoadedFace>,
}

impl std::fmt::Debug for SystemFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemFont")
            .field("face", &self.face)
            .field("pixel_size", &self.pixel_size)
            .finish()
    }
}

impl SystemFont {
    pub fn pixel_size(&self) -> u32 {
        self.pixel_size
    }
}

/// Font backend over the fonts installed on this machine.
///
/// File contents are read on a face's first load and shared by every size
/// loaded from it. They are freed with the last font using them.
#[derive(Default)]
pub struct SystemBackend {
    faces: Vec<SystemFace>,
    loaded: FaceCache<LoadedFace>,
}

/// Parsed faces by face index, held weakly.
struct FaceCache<T> {
    entries: RefCell<HashMap<usize, Weak<T>>>,
}

impl<T> Default for FaceCache<T> {
    fn default() -> Self {
        Self {
            entries: RefCell::new(HashMap::new()),
        }
    }
}

impl<T> FaceCache<T> {
    /// The live value for `index`, or a fresh one from `load`.
    fn get_or_load<F>(&self, index: usize, load: F) -> Option<Rc<T>>
    where
        F: FnOnce() -> Option<T>,
    {
        if let Some(live) = self.get(index) {
            return Some(live);
        }
        let value = Rc::new(load()?);
        let mut entries = self.entries.borrow_mut();
        entries.retain(|_, weak| weak.strong_count() > 0);
        entries.insert(index, Rc::downgrade(&value));
        Some(value)
    }

    fn get(&self, index: usize) -> Option<Rc<T>> {
        self.entries.borrow().get(&index).and_then(Weak::upgrade)
    }

    /// Entries in the map, dead or alive.
    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries.borrow().len()
    }
}

impl SystemBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Discovers the installed fonts under `search_paths` (or through
    /// fontconfig when enabled).
    pub fn discover(search_paths: &[PathBuf]) -> SystemResult<Self> {
        let mut backend = Self::new();
        for source in discover_fonts(search_paths) {
            if let Err(e) = backend.add_source(&source) {
                debug!("Skipping {}: {}", source.path.display(), e);
            }
        }
        if backend.faces.is_empty() {
            return Err(SystemError::NoFonts {
                searched: search_paths.len(),
            });
        }
        info!("Found {} font faces", backend.faces.len());
        Ok(backend)
    }

    /// Adds every face of the font file at `path`.
    pub fn add_file(&mut self, path: &Path) -> SystemResult<usize> {
        self.add_source(&FontSource {
            path: path.to_path_buf(),
            index: None,
        })
    }

    fn add_source(&mut self, source: &FontSource) -> SystemResult<usize> {
        let data = std::fs::read(&source.path).map_err(|e| SystemError::Io {
            path: source.path.clone(),
            source: e,
        })?;
        let indices: Vec<u32> = match source.index {
            Some(index) => vec![index],
            None => (0..face_count(&data)?).collect(),
        };

        let mut added = 0;
        for index in indices {
            let info = match SfntFace::parse(&data, index) {
                Ok(info) => info,
                Err(e) => {
                    return Err(SystemError::Unreadable {
                        path: source.path.clone(),
                        reason: e.to_string(),
                    })
                }
            };
            let family = info.family.clone().unwrap_or_else(|| {
                source
                    .path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default()
            });
            if family.is_empty() {
                continue;
            }
            let descriptor = face_descriptor(&family, &info, &source.path, index);
            trace!("Face {:?} from {}", descriptor.native_name, source.path.display());
            self.faces.push(SystemFace {
                descriptor,
                path: source.path.clone(),
                index,
                info,
            });
            added += 1;
        }
        Ok(added)
    }

    pub fn faces(&self) -> &[SystemFace] {
        &self.faces
    }

    fn face_for(&self, descriptor: &FontDescriptor) -> Option<usize> {
        self.faces
            .iter()
            .position(|f| f.descriptor.native_name == descriptor.native_name)
    }

    fn load_face(&self, index: usize) -> Option<Rc<LoadedFace>> {
        let face = &self.faces[index];
        self.loaded.get_or_load(index, || {
            let data = match std::fs::read(&face.path) {
                Ok(data) => data,
                Err(e) => {
                    warn!("Could not read {}: {}", face.path.display(), e);
                    return None;
                }
            };
            let settings = FontSettings {
                collection_index: face.index,
                ..FontSettings::default()
            };
            let font = match Font::from_bytes(data.as_slice(), settings) {
                Ok(font) => font,
                Err(e) => {
                    warn!("fontdue rejected {}: {}", face.path.display(), e);
                    return None;
                }
            };
            trace!("Parsed {}", face.path.display());
            Some(LoadedFace { data, font })
        })
    }
}

fn face_descriptor(family: &str, info: &SfntFace, path: &Path, index: u32) -> FontDescriptor {
    let slant = if info.italic {
        Slant::Italic
    } else if info.oblique {
        Slant::Oblique
    } else {
        Slant::Roman
    };
    let weight = if info.is_bold() {
        Weight::Bold
    } else {
        Weight::Normal
    };
    FontDescriptor::scalable(family, SYSTEM_CHARSET)
        .with_weight(weight)
        .with_slant(slant)
        .with_native_name(&format!("{}#{}", path.display(), index))
}

impl FontBackend for SystemBackend {
    type Resource = SystemFont;
    type Surface = Canvas;

    fn enumerate_families(&self, pattern: &str) -> Vec<FontDescriptor> {
        self.faces
            .iter()
            .filter(|f| pattern == "*" || f.descriptor.face.eq_ignore_ascii_case(pattern))
            .map(|f| f.descriptor.clone())
            .collect()
    }

    fn load_concrete_font(&self, descriptor: &FontDescriptor, pixel_size: u32) -> Option<SystemFont> {
        if pixel_size == 0 {
            return None;
        }
        let face = self.face_for(descriptor)?;
        let loaded = self.load_face(face)?;
        Some(SystemFont {
            face,
            pixel_size,
            loaded,
        })
    }

    fn native_metrics(&self, resource: &SystemFont) -> NativeMetrics {
        let face = &self.faces[resource.face];
        let px = resource.pixel_size as f32;
        let font = &resource.loaded.font;

        let (ascent, descent) = match font.horizontal_line_metrics(px) {
            Some(lm) => (lm.ascent.ceil() as i32, (-lm.descent).ceil() as i32),
            None => ((px * 0.8).ceil() as i32, (px * 0.2).ceil() as i32),
        };
        let max_width = ['W', 'M', '@', '0']
            .iter()
            .map(|&ch| font.metrics(ch, px).advance_width.ceil() as i32)
            .max()
            .unwrap_or(0);
        let scale = px / face.info.units_per_em as f32;

        NativeMetrics {
            face: face.descriptor.face.clone(),
            foundry: None,
            charset: SYSTEM_CHARSET.to_string(),
            ascent: ascent.max(1),
            descent: descent.max(0),
            max_width,
            fixed_pitch: face.info.fixed_pitch,
            weight: face.descriptor.weight,
            slant: face.descriptor.slant,
            pixel_size: resource.pixel_size,
            underline_position: Some((-(face.info.underline_position as f32) * scale).round() as i32),
            underline_thickness: Some(((face.info.underline_thickness as f32) * scale).round() as i32),
        }
    }

    fn supports_font_tables(&self, _resource: &SystemFont) -> bool {
        true
    }

    fn read_font_table(
        &self,
        resource: &SystemFont,
        tag: [u8; 4],
        offset: usize,
        length: usize,
    ) -> Option<Vec<u8>> {
        self.faces[resource.face]
            .info
            .read_table(&resource.loaded.data, tag, offset, length)
    }

    fn measure_native(&self, resource: &SystemFont, encoding: Encoding, text: &[u8]) -> i32 {
        let px = resource.pixel_size as f32;
        encoding
            .decode(text)
            .chars()
            .map(|ch| pixel_advance(resource.loaded.font.metrics(ch, px).advance_width))
            .sum()
    }

    fn draw_native(
        &self,
        surface: &mut Canvas,
        resource: &SystemFont,
        encoding: Encoding,
        text: &[u8],
        x: i32,
        y: i32,
    ) {
        let px = resource.pixel_size as f32;
        let mut pen = x;
        for ch in encoding.decode(text).chars() {
            let (metrics, bitmap) = resource.loaded.font.rasterize(ch, px);
            let gy = y - metrics.height as i32 - metrics.ymin;
            surface.blit(pen + metrics.xmin, gy, metrics.width, &bitmap);
            pen += pixel_advance(metrics.advance_width);
        }
    }

    fn fill_rect(&self, surface: &mut Canvas, x: i32, y: i32, width: i32, height: i32) {
        surface.fill_rect(x, y, width, height);
    }

    fn default_font(&self) -> Option<FontDescriptor> {
        let upright = |f: &&SystemFace| {
            f.descriptor.weight == Weight::Normal && f.descriptor.slant == Slant::Roman
        };
        DEFAULT_FACES
            .iter()
            .find_map(|name| {
                self.faces
                    .iter()
                    .filter(upright)
                    .find(|f| f.descriptor.face.eq_ignore_ascii_case(name))
            })
            .or_else(|| self.faces.iter().find(upright))
            .or_else(|| self.faces.first())
            .map(|f| f.descriptor.clone())
    }
}

/// Glyph advances are rounded one by one, so a string is exactly as wide
/// as its characters added up.
fn pixel_advance(advance: f32) -> i32 {
    advance.round() as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sfnt::tests::{build_sfnt, name_table};

    fn temp_font(name: &str, family: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("weave-backend-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        std::fs::write(&path, build_sfnt(&[(*b"name", name_table(family))])).unwrap();
        path
    }

    #[test]
    fn test_add_file_reads_family() {
        let path = temp_font("a.ttf", "Fake Sans");
        let mut backend = SystemBackend::new();
        assert_eq!(backend.add_file(&path).unwrap(), 1);

        let found = backend.enumerate_families("fake sans");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].charset, SYSTEM_CHARSET);
        assert!(found[0].is_scalable());
        assert_eq!(backend.default_font().map(|d| d.face), Some("Fake Sans".to_string()));
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_unparseable_font_does_not_load() {
        let path = temp_font("b.ttf", "Hollow");
        let mut backend = SystemBackend::new();
        backend.add_file(&path).unwrap();
        let descriptor = backend.enumerate_families("Hollow").remove(0);
        // The file has no glyph tables, so fontdue refuses it.
        assert!(backend.load_concrete_font(&descriptor, 12).is_none());
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_face_cache_frees_unused_faces() {
        let cache: FaceCache<Vec<u8>> = FaceCache::default();
        let mut loads = 0;
        let first = cache
            .get_or_load(3, || {
                loads += 1;
                Some(vec![1, 2, 3])
            })
            .unwrap();
        let again = cache.get_or_load(3, || unreachable!()).unwrap();
        assert!(Rc::ptr_eq(&first, &again));
        assert_eq!(loads, 1);

        drop(first);
        drop(again);
        assert!(cache.get(3).is_none());

        // A later load replaces the dead entry instead of adding one.
        let reloaded = cache.get_or_load(3, || Some(vec![4])).unwrap();
        assert_eq!(*reloaded, vec![4]);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_face_cache_drops_dead_entries_on_insert() {
        let cache: FaceCache<u32> = FaceCache::default();
        for index in 0..4 {
            cache.get_or_load(index, || Some(index as u32));
        }
        let kept = cache.get_or_load(9, || Some(9)).unwrap();
        assert_eq!(cache.len(), 1);
        assert_eq!(*kept, 9);
        assert!(cache.get_or_load(7, || None).is_none());
    }

    #[test]
    fn test_widths_add_up_per_glyph() {
        let advances = [6.4, 6.4, 6.4];
        let whole: i32 = advances.iter().copied().map(pixel_advance).sum();
        let parts: i32 = advances[..1].iter().copied().map(pixel_advance).sum::<i32>()
            + advances[1..].iter().copied().map(pixel_advance).sum::<i32>();
        assert_eq!(whole, 18);
        assert_eq!(whole, parts);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let mut backend = SystemBackend::new();
        let err = backend.add_file(Path::new("/no/such/font.ttf")).unwrap_err();
        assert!(matches!(err, SystemError::Io { .. }));
    }

    #[test]
    fn test_discover_empty_directory() {
        let dir = std::env::temp_dir().join(format!("weave-empty-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let result = SystemBackend::discover(&[dir.clone()]);
        // With fontconfig enabled the system fonts may still be found.
        if cfg!(not(all(target_os = "linux", feature = "font-discovery"))) {
            assert!(matches!(result, Err(SystemError::NoFonts { searched: 1 })));
        }
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
