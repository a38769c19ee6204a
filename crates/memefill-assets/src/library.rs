//! Folder-per-category asset library.
//!
//! Layout on disk:
//!
//! ```text
//! memes/
//!   reactions/  a.png  b.gif
//!   cats/       c.jpg  d.mp4
//! ```
//!
//! Each immediate subdirectory of the root is a category. Files are matched
//! by extension only; nothing is decoded at load time.

use memefill_core::{MemeFillError, Result};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Lowercase file extensions picked up by [`AssetLibrary::load`].
pub const SUPPORTED_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "gif", "mp4"];

/// How an asset file is turned into an overlay image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    /// Still image (jpg, jpeg, png).
    Image,
    /// Animated GIF; only the first frame is used.
    Gif,
    /// Video clip; only the first decoded frame is used.
    Video,
}

impl AssetKind {
    /// Classify a path by its extension, case-insensitively.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "jpg" | "jpeg" | "png" => Some(Self::Image),
            "gif" => Some(Self::Gif),
            "mp4" => Some(Self::Video),
            _ => None,
        }
    }
}

/// Mapping from category name to the asset paths it contains.
///
/// Categories are kept sorted by name and never empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetLibrary {
    categories: BTreeMap<String, Vec<PathBuf>>,
}

impl AssetLibrary {
    /// Scan `root` for category folders.
    ///
    /// A missing root is created and yields an empty library. Unreadable
    /// category folders are skipped with a warning.
    pub fn load<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref();
        if !root.exists() {
            std::fs::create_dir_all(root)?;
            info!(root = %root.display(), "Created empty asset folder");
            return Ok(Self::default());
        }

        let mut categories = BTreeMap::new();
        for entry in std::fs::read_dir(root)?.flatten() {
            let dir = entry.path();
            if !dir.is_dir() {
                continue;
            }
            let Some(name) = dir.file_name().and_then(|n| n.to_str()) else {
                warn!(path = %dir.display(), "Skipping category with non UTF-8 name");
                continue;
            };

            let files = match scan_category(&dir) {
                Ok(files) => files,
                Err(e) => {
                    warn!(category = name, error = %e, "Failed to read category folder");
                    continue;
                }
            };
            if files.is_empty() {
                debug!(category = name, "Skipping category with no assets");
                continue;
            }
            categories.insert(name.to_string(), files);
        }

        let library = Self { categories };
        info!(
            root = %root.display(),
            categories = library.categories.len(),
            assets = library.asset_count(),
            "Loaded asset library"
        );
        Ok(library)
    }

    /// Build a library from an explicit mapping.
    ///
    /// Rejects blank category names and categories without assets.
    pub fn from_entries<I, S>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, Vec<PathBuf>)>,
        S: Into<String>,
    {
        let mut categories = BTreeMap::new();
        for (name, files) in entries {
            let name = name.into();
            if name.trim().is_empty() {
                return Err(MemeFillError::InvalidParameter(
                    "Asset category name is empty".into(),
                ));
            }
            if files.is_empty() {
                return Err(MemeFillError::InvalidParameter(format!(
                    "Asset category '{}' has no assets",
                    name
                )));
            }
            categories.entry(name).or_insert_with(Vec::new).extend(files);
        }
        Ok(Self { categories })
    }

    /// Category names in sorted order.
    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.categories.keys().map(String::as_str)
    }

    /// Assets of one category.
    pub fn assets(&self, category: &str) -> Option<&[PathBuf]> {
        self.categories.get(category).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Total number of assets across all categories.
    pub fn asset_count(&self) -> usize {
        self.categories.values().map(Vec::len).sum()
    }

    /// All distinct assets of the selected categories. Unknown names are ignored.
    pub fn pool<S: AsRef<str>>(&self, selected: &[S]) -> Vec<PathBuf> {
        let wanted: BTreeSet<&str> = selected.iter().map(AsRef::as_ref).collect();
        let mut seen = BTreeSet::new();
        wanted
            .into_iter()
            .filter_map(|name| self.categories.get(name))
            .flatten()
            .filter(|path| seen.insert(path.as_path()))
            .cloned()
            .collect()
    }

    /// Draw `min(count, pool size)` distinct assets from the selected categories.
    ///
    /// Returns an empty list when the pool is empty.
    pub fn sample<S, R>(&self, selected: &[S], count: usize, rng: &mut R) -> Vec<PathBuf>
    where
        S: AsRef<str>,
        R: Rng + ?Sized,
    {
        let pool = self.pool(selected);
        if pool.is_empty() {
            debug!("No assets in selected categories");
            return Vec::new();
        }
        pool.choose_multiple(rng, count.min(pool.len()))
            .cloned()
            .collect()
    }
}

/// Supported files directly inside one category folder, sorted by path.
fn scan_category(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && AssetKind::from_path(path).is_some())
        .collect();
    files.sort();
    Ok(files)
}
