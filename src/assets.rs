//! Static-asset existence checks.
//!
//! The `headerimage` directive names a file under the site's static root
//! (`www/` by default). Ingestion refuses documents whose header image is
//! missing, so broken headers fail the build instead of the browser.

use std::collections::HashSet;
use std::path::PathBuf;

/// Existence check for site-relative paths like `/images/cover.png`.
pub trait AssetStore: Sync {
    fn exists(&self, site_path: &str) -> bool;
}

/// Static assets on disk under a root directory.
#[derive(Debug, Clone)]
pub struct StaticDir {
    root: PathBuf,
}

impl StaticDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl AssetStore for StaticDir {
    fn exists(&self, site_path: &str) -> bool {
        self.root.join(site_path.trim_start_matches('/')).is_file()
    }
}

/// Fixed set of known paths.
impl AssetStore for HashSet<String> {
    fn exists(&self, site_path: &str) -> bool {
        self.contains(site_path)
    }
}
