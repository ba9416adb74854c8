//! System font discovery for different platforms

use std::path::{Path, PathBuf};

use tracing::{debug, trace};

/// One font file found on the system, with the face index inside it when
/// discovery already knows it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontSource {
    pub path: PathBuf,
    pub index: Option<u32>,
}

/// Default font directories for the current platform.
pub fn default_font_dirs() -> Vec<PathBuf> {
    let mut dirs = Vec::new();

    #[cfg(target_os = "macos")]
    {
        dirs.push(PathBuf::from("/System/Library/Fonts"));
        dirs.push(PathBuf::from("/Library/Fonts"));
        if let Some(home) = std::env::var_os("HOME").map(PathBuf::from) {
            dirs.push(home.join("Library/Fonts"));
        }
    }

    #[cfg(target_os = "windows")]
    {
        let windir = std::env::var_os("WINDIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("C:\\Windows"));
        dirs.push(windir.join("Fonts"));
    }

    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        dirs.push(PathBuf::from("/usr/share/fonts"));
        dirs.push(PathBuf::from("/usr/local/share/fonts"));
        if let Some(home) = std::env::var_os("HOME").map(PathBuf::from) {
            dirs.push(home.join(".fonts"));
            dirs.push(home.join(".local/share/fonts"));
        }
    }

    dirs
}

/// Discover available system fonts
///
/// Uses fontconfig when the `font-discovery` feature is enabled on Linux and
/// it returns anything, otherwise scans `search_paths` recursively.
pub fn discover_fonts(search_paths: &[PathBuf]) -> Vec<FontSource> {
    #[cfg(all(target_os = "linux", feature = "font-discovery"))]
    {
        let found = discover_fonts_fontconfig();
        if !found.is_empty() {
            debug!("fontconfig listed {} fonts", found.len());
            return found;
        }
    }

    let mut found = Vec::new();
    for path in search_paths {
        scan_dir(path, &mut found, 0);
    }
    found.sort_by(|a, b| a.path.cmp(&b.path));
    debug!(
        "Scanned {} directories, found {} font files",
        search_paths.len(),
        found.len()
    );
    found
}

/// Discover fonts using the fontconfig library
#[cfg(all(target_os = "linux", feature = "font-discovery"))]
fn discover_fonts_fontconfig() -> Vec<FontSource> {
    let Some(fc) = fontconfig::Fontconfig::new() else {
        tracing::warn!("fontconfig could not be initialized");
        return Vec::new();
    };
    let pattern = fontconfig::Pattern::new(&fc);
    let fonts = fontconfig::list_fonts(&pattern, None);
    let mut found: Vec<FontSource> = fonts
        .iter()
        .filter_map(|p| {
            let path = PathBuf::from(p.filename()?);
            let index = p.face_index().and_then(|i| u32::try_from(i).ok());
            is_font_file(&path).then_some(FontSource { path, index })
        })
        .collect();
    found.sort_by(|a, b| (&a.path, a.index).cmp(&(&b.path, b.index)));
    found.dedup();
    found
}

const MAX_DEPTH: usize = 8;

fn scan_dir(dir: &Path, found: &mut Vec<FontSource>, depth: usize) {
    if depth > MAX_DEPTH {
        return;
    }
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            trace!("Skipping {}: {}", dir.display(), e);
            return;
        }
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            scan_dir(&path, found, depth + 1);
        } else if is_font_file(&path) {
            found.push(FontSource { path, index: None });
        }
    }
}

/// Check if a file is likely a font file
pub fn is_font_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .is_some_and(|e| matches!(e.as_str(), "ttf" | "otf" | "ttc"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_font_file() {
        assert!(is_font_file(Path::new("/x/DejaVuSans.ttf")));
        assert!(is_font_file(Path::new("/x/Noto.TTC")));
        assert!(is_font_file(Path::new("a.otf")));
        assert!(!is_font_file(Path::new("a.woff2")));
        assert!(!is_font_file(Path::new("fonts.dir")));
    }

    #[test]
    fn test_scan_recurses() {
        let root = std::env::temp_dir().join(format!("weave-scan-{}", std::process::id()));
        let nested = root.join("truetype/dejavu");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(nested.join("a.ttf"), b"").unwrap();
        std::fs::write(root.join("b.otf"), b"").unwrap();
        std::fs::write(root.join("readme.txt"), b"").unwrap();

        let mut found = Vec::new();
        scan_dir(&root, &mut found, 0);
        found.sort_by(|a, b| a.path.cmp(&b.path));
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|s| s.index.is_none()));

        std::fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn test_missing_directory_is_empty() {
        let mut found = Vec::new();
        scan_dir(Path::new("/definitely/not/a/font/dir"), &mut found, 0);
        assert!(found.is_empty());
    }
}
