//! Shared test utilities for the blockpress test suite.
//!
//! Block builders keep page fixtures short enough to read as a page:
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let p = page(vec![
//!     text("m", "tags: go"),
//!     text("g", "#gallery"),
//!     image("i1", "https://example.com/1.png"),
//!     image("i2", "https://example.com/2.png"),
//! ]);
//! ```
//!
//! [`MockFetcher`] stands in for the media cache and records every fetch.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Mutex;

use chrono::{DateTime, TimeZone, Utc};

use crate::block::{Block, BlockId, BlockKind, PageTree, TextSpan};
use crate::cache;
use crate::media::{FetchError, FetchResponse, MediaFetcher};
use crate::types::{Document, Status};

// =========================================================================
// Block builders
// =========================================================================

fn block(id: &str, kind: BlockKind) -> Block {
    Block {
        id: BlockId::new(id),
        kind,
        spans: Vec::new(),
        children: Vec::new(),
        source: None,
    }
}

/// Text block with a single plain span.
pub fn text(id: &str, content: &str) -> Block {
    Block {
        spans: vec![TextSpan::plain(content)],
        ..block(id, BlockKind::Text)
    }
}

/// Text block with no spans (a blank line).
pub fn empty_text(id: &str) -> Block {
    block(id, BlockKind::Text)
}

/// Text block whose single span is bold.
pub fn styled_text(id: &str, content: &str) -> Block {
    Block {
        spans: vec![TextSpan {
            text: content.to_string(),
            attrs: vec!["b".to_string()],
        }],
        ..block(id, BlockKind::Text)
    }
}

pub fn image(id: &str, source: &str) -> Block {
    Block {
        source: Some(source.to_string()),
        ..block(id, BlockKind::Image)
    }
}

/// Container block (toggle, column, ...) holding `children`.
pub fn other(id: &str, children: Vec<Block>) -> Block {
    Block {
        children,
        ..block(id, BlockKind::Other)
    }
}

// =========================================================================
// Pages and documents
// =========================================================================

pub fn fixed_date() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 2, 10, 0, 0).unwrap()
}

/// Page with fixed identity and timestamps.
pub fn page(blocks: Vec<Block>) -> PageTree {
    PageTree {
        id: "0c8a51b3-5d17-4f0a-9e6b-1a2b3c4d5e6f".to_string(),
        title: "Hello World".to_string(),
        created_on: fixed_date(),
        last_edited_on: Utc.with_ymd_and_hms(2024, 1, 3, 10, 0, 0).unwrap(),
        cover: None,
        blocks,
        headings: Vec::new(),
    }
}

pub fn empty_document(title: &str) -> Document {
    Document {
        id: "doc".to_string(),
        title: title.to_string(),
        published_on: fixed_date(),
        updated_on: fixed_date(),
        tags: Vec::new(),
        status: Status::default(),
        summary: String::new(),
        description: String::new(),
        header_image: None,
        collection: None,
        url_override: None,
        paths: Vec::new(),
        directives: Vec::new(),
        images: Vec::new(),
        in_blog: false,
        body: Vec::new(),
        toc: Vec::new(),
    }
}

/// Document with tags and status, for index tests.
pub fn tagged_document(id: &str, tags: &[&str], status: Status) -> Document {
    Document {
        id: id.to_string(),
        tags: tags.iter().map(|t| t.to_string()).collect(),
        status,
        ..empty_document(id)
    }
}

/// An asset store that knows no files.
pub fn no_assets() -> HashSet<String> {
    HashSet::new()
}

// =========================================================================
// Mock media fetcher
// =========================================================================

/// Fetcher that records calls and answers from a fake `/cache` directory.
/// Uses Mutex so it is Sync and can be shared across rayon workers.
#[derive(Default)]
pub struct MockFetcher {
    failing: HashSet<String>,
    calls: Mutex<Vec<(String, BlockId)>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetcher that fails for the given links and succeeds for all others.
    pub fn failing_on(links: &[&str]) -> Self {
        Self {
            failing: links.iter().map(|l| l.to_string()).collect(),
            ..Self::default()
        }
    }

    /// File name the mock stores `link` under.
    pub fn file_name_for(link: &str) -> String {
        cache::cache_file_name(link)
    }

    /// `(link, owner)` of every fetch, in call order.
    pub fn calls(&self) -> Vec<(String, BlockId)> {
        self.calls.lock().unwrap().clone()
    }
}

impl MediaFetcher for MockFetcher {
    fn fetch(&self, link: &str, owner: &BlockId) -> Result<FetchResponse, FetchError> {
        self.calls
            .lock()
            .unwrap()
            .push((link.to_string(), owner.clone()));

        if self.failing.contains(link) {
            return Err(FetchError::Failed {
                link: link.to_string(),
                reason: "mock failure".to_string(),
            });
        }
        Ok(FetchResponse {
            cache_path: PathBuf::from("/cache").join(Self::file_name_for(link)),
            from_cache: true,
        })
    }
}
