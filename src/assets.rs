//! Asset lookup on disk.
//!
//! Asset names from the catalog are matched against file names anywhere under
//! a root directory, ignoring case. A name without an extension tries `.png`
//! first, then `.svg`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use image::RgbaImage;
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::catalog::BitmapSource;
use crate::svg::rasterize_svg;

const EXTENSIONS: [&str; 2] = ["png", "svg"];

/// Index of asset files under a root directory, keyed by lowercase file name.
#[derive(Debug, Clone, Default)]
pub struct AssetDirectory {
    root: PathBuf,
    files: HashMap<String, PathBuf>,
    /// Target size for SVG rasterization.
    canvas_size: u32,
}

impl AssetDirectory {
    /// Walks `root` recursively and indexes every file.
    ///
    /// Entries are visited in file-name order, so when two files share a
    /// name the first one found wins deterministically. An unreadable root
    /// yields an empty index.
    pub fn scan(root: impl Into<PathBuf>, canvas_size: u32) -> Self {
        let root = root.into();
        let mut files = HashMap::new();

        let walker = WalkDir::new(&root)
            .follow_links(true)
            .sort_by_file_name();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable asset path");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let key = entry.file_name().to_string_lossy().to_lowercase();
            files.entry(key).or_insert_with(|| entry.into_path());
        }

        info!(root = %root.display(), files = files.len(), "Indexed asset directory");
        Self {
            root,
            files,
            canvas_size,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Finds the file for an asset name.
    pub fn resolve(&self, name: &str) -> Option<&Path> {
        let key = name.to_lowercase();
        if let Some(path) = self.files.get(&key) {
            return Some(path);
        }
        EXTENSIONS
            .iter()
            .find_map(|ext| self.files.get(&format!("{key}.{ext}")))
            .map(PathBuf::as_path)
    }

    fn decode(&self, path: &Path) -> Option<RgbaImage> {
        let is_svg = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("svg"));

        if is_svg {
            let data = match std::fs::read(path) {
                Ok(data) => data,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to read SVG asset");
                    return None;
                }
            };
            let image = rasterize_svg(&data, self.canvas_size);
            if image.is_none() {
                warn!(path = %path.display(), "Failed to rasterize SVG asset");
            }
            return image;
        }

        match image::open(path) {
            Ok(image) => Some(image.to_rgba8()),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to decode asset");
                None
            }
        }
    }
}

impl BitmapSource for AssetDirectory {
    fn load(&self, name: &str) -> Option<RgbaImage> {
        let path = self.resolve(name)?;
        self.decode(path)
    }
}
