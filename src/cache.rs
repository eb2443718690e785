//! On-disk media cache.
//!
//! [`DiskCache`] is the stock [`MediaFetcher`]: it maps every media link to a
//! file inside the cache directory and serves it from there. Downloading
//! remote links is left to whatever populated the cache (the export job that
//! produced the page trees); this crate never touches the network.
//!
//! # Cache keys
//!
//! The cache is **link-addressed**: a link's file name is the SHA-256 of the
//! link text plus the link's own extension, e.g.
//!
//! ```text
//! https://example.com/photos/dawn.PNG?w=800  →  9f86d08...0f00a08.png
//! ```
//!
//! Hashing the full link (query string included) keeps differently sized
//! variants of one image apart. The extension survives so the public
//! `/img/...` URL still tells browsers what they are getting.
//!
//! # Lookup
//!
//! 1. Cache file exists → served from cache.
//! 2. Link is a local file (`file://...` or an absolute path that exists) →
//!    copied into the cache, not from cache.
//! 3. Otherwise → [`FetchError::NotCached`].

use crate::block::BlockId;
use crate::media::{FetchError, FetchResponse, MediaFetcher};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};

/// Longest extension carried over from a link.
const MAX_EXTENSION_LEN: usize = 5;

/// Cache file name for a link: SHA-256 hex of the link plus its extension.
pub fn cache_file_name(link: &str) -> String {
    let digest = Sha256::digest(link.as_bytes());
    match link_extension(link) {
        Some(ext) => format!("{:x}.{}", digest, ext),
        None => format!("{:x}", digest),
    }
}

/// Lower-cased extension of the last path segment, ignoring query and fragment.
fn link_extension(link: &str) -> Option<String> {
    let path = link.split(['?', '#']).next().unwrap_or(link);
    let segment = path.rsplit('/').next()?;
    let ext = Path::new(segment).extension()?.to_str()?;
    if ext.is_empty() || ext.len() > MAX_EXTENSION_LEN || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Local file a link refers to, if any.
fn local_source(link: &str) -> Option<PathBuf> {
    if let Some(rest) = link.strip_prefix("file://") {
        return Some(PathBuf::from(rest));
    }
    let path = Path::new(link);
    (path.is_absolute() && path.is_file()).then(|| path.to_path_buf())
}

pub struct DiskCache {
    dir: PathBuf,
    hits: AtomicU32,
    stored: AtomicU32,
    misses: AtomicU32,
}

impl DiskCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            hits: AtomicU32::new(0),
            stored: AtomicU32::new(0),
            misses: AtomicU32::new(0),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Where `link` lives (or would live) in the cache.
    pub fn path_for(&self, link: &str) -> PathBuf {
        self.dir.join(cache_file_name(link))
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            stored: self.stored.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

impl MediaFetcher for DiskCache {
    fn fetch(&self, link: &str, _owner: &BlockId) -> Result<FetchResponse, FetchError> {
        let cache_path = self.path_for(link);
        if cache_path.is_file() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(FetchResponse {
                cache_path,
                from_cache: true,
            });
        }

        let Some(source) = local_source(link) else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            return Err(FetchError::NotCached(link.to_string()));
        };
        if !source.is_file() {
            self.misses.fetch_add(1, Ordering::Relaxed);
            return Err(FetchError::Failed {
                link: link.to_string(),
                reason: format!("local file {} does not exist", source.display()),
            });
        }

        std::fs::create_dir_all(&self.dir)?;
        std::fs::copy(&source, &cache_path)?;
        self.stored.fetch_add(1, Ordering::Relaxed);
        Ok(FetchResponse {
            cache_path,
            from_cache: false,
        })
    }
}

/// Summary of cache activity for a run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u32,
    pub stored: u32,
    pub misses: u32,
}

impl CacheStats {
    pub fn total(&self) -> u32 {
        self.hits + self.stored + self.misses
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.misses > 0 {
            write!(
                f,
                "{} cached, {} stored, {} missing ({} total)",
                self.hits,
                self.stored,
                self.misses,
                self.total()
            )
        } else if self.stored > 0 {
            write!(
                f,
                "{} cached, {} stored ({} total)",
                self.hits,
                self.stored,
                self.total()
            )
        } else {
            write!(f, "{} cached", self.hits)
        }
    }
}
