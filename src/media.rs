//! Media references and their locally cached copies.
//!
//! Image blocks point at remote links. Ingestion hands each link to a
//! [`MediaFetcher`] (the fetch-with-cache collaborator), which returns the
//! path of a local copy. The document then records a [`MediaAsset`] whose
//! public URL is `/img/<file name of the cached copy>`.
//!
//! Retries, timeouts and backoff are the fetcher's business. A failed fetch
//! is fatal for the document that needed it.

use crate::block::BlockId;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// URL prefix under which cached media is served.
pub const IMAGE_URL_PREFIX: &str = "/img/";

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("'{0}' is not in the media cache")]
    NotCached(String),
    #[error("Fetching '{link}' failed: {reason}")]
    Failed { link: String, reason: String },
}

/// Result of a successful fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub cache_path: PathBuf,
    pub from_cache: bool,
}

/// Fetch-with-cache collaborator.
///
/// `owner` is the block that references the link; implementations may use it
/// to scope signed URLs or for diagnostics.
pub trait MediaFetcher: Sync {
    fn fetch(&self, link: &str, owner: &BlockId) -> Result<FetchResponse, FetchError>;
}

/// A cached copy of a remote image plus its public relative URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaAsset {
    pub link: String,
    pub cache_path: PathBuf,
    pub relative_url: String,
}

/// `/img/` + the cached file's base name.
pub fn relative_url(cache_path: &Path) -> String {
    let name = cache_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    format!("{IMAGE_URL_PREFIX}{name}")
}

/// Resolves media links of one document and collects the resulting assets.
pub struct MediaResolver<'a> {
    fetcher: &'a dyn MediaFetcher,
    assets: Vec<MediaAsset>,
}

impl<'a> MediaResolver<'a> {
    pub fn new(fetcher: &'a dyn MediaFetcher) -> Self {
        Self {
            fetcher,
            assets: Vec::new(),
        }
    }

    /// Fetch `link` and record its asset.
    ///
    /// A link already resolved for this document returns the existing asset,
    /// so every link maps to exactly one asset.
    pub fn resolve(&mut self, link: &str, owner: &BlockId) -> Result<&MediaAsset, FetchError> {
        if let Some(pos) = self.assets.iter().position(|a| a.link == link) {
            return Ok(&self.assets[pos]);
        }
        let response = self.fetcher.fetch(link, owner)?;
        if response.from_cache {
            debug!(%link, block = %owner, "media served from cache");
        } else {
            info!(%link, block = %owner, path = %response.cache_path.display(), "media fetched");
        }
        let relative_url = relative_url(&response.cache_path);
        self.assets.push(MediaAsset {
            link: link.to_string(),
            cache_path: response.cache_path,
            relative_url,
        });
        Ok(&self.assets[self.assets.len() - 1])
    }

    pub fn assets(&self) -> &[MediaAsset] {
        &self.assets
    }

    pub fn into_assets(self) -> Vec<MediaAsset> {
        self.assets
    }
}

/// Look up the asset for a link. A miss is logged with the known assets and
/// returns `None`; callers degrade instead of failing.
pub fn find_asset<'a>(assets: &'a [MediaAsset], link: &str) -> Option<&'a MediaAsset> {
    let found = assets.iter().find(|a| a.link == link);
    if found.is_none() {
        let known: Vec<&str> = assets.iter().map(|a| a.link.as_str()).collect();
        warn!(%link, ?known, "no media asset for link");
    }
    found
}
