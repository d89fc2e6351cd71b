//! Directory scanning for images eligible to be shown.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

/// The only recognized extensions (lowercase, without dot).
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "png"];

/// One image file discovered by a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageEntry {
    /// Filename, unique within the scanned directory.
    pub name: String,
    pub path: PathBuf,
    /// Whether the name was in the exclusion snapshot at scan time.
    pub excluded: bool,
}

/// Lists the images of a single directory.
///
/// Nothing is cached: each query walks the directory again so that new files,
/// deleted files and fresh exclusions take effect on the next call.
#[derive(Debug, Clone)]
pub struct ImageCatalog {
    dir: PathBuf,
}

/// Return `true` if `path` ends in one of [`IMAGE_EXTENSIONS`], ignoring case.
#[must_use]
pub fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .is_some_and(|ext| {
            let ext = ext.to_ascii_lowercase();
            IMAGE_EXTENSIONS.iter().any(|e| *e == ext)
        })
}

impl ImageCatalog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Images not present in `excluded`, in directory-scan order.
    ///
    /// An unreadable or missing directory yields an empty list.
    #[must_use]
    pub fn list_eligible(&self, excluded: &HashSet<String>) -> Vec<ImageEntry> {
        self.scan(excluded)
            .into_iter()
            .filter(|entry| !entry.excluded)
            .collect()
    }

    /// Every recognized image, with `excluded` set from the snapshot.
    #[must_use]
    pub fn list_all(&self, excluded: &HashSet<String>) -> Vec<ImageEntry> {
        self.scan(excluded)
    }

    fn scan(&self, excluded: &HashSet<String>) -> Vec<ImageEntry> {
        let mut out = Vec::new();
        for entry in WalkDir::new(&self.dir)
            .follow_links(true)
            .min_depth(1)
            .max_depth(1)
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(dir = %self.dir.display(), "catalog scan failed: {err}");
                    continue;
                }
            };
            if !entry.file_type().is_file() || !is_supported_image(entry.path()) {
                continue;
            }
            let Some(name) = entry.file_name().to_str() else {
                debug!(path = %entry.path().display(), "skipping non-utf8 filename");
                continue;
            };
            out.push(ImageEntry {
                name: name.to_owned(),
                path: entry.path().to_path_buf(),
                excluded: excluded.contains(name),
            });
        }
        out
    }
}
