//! The content tree as exported by the document source.
//!
//! A page export is a JSON file holding the page identity, its timestamps and
//! the ordered top-level blocks. Blocks nest: a toggle or a column holds its
//! own ordered children. This crate only ever reads the tree; everything it
//! learns about a block (skip flags, image hrefs, galleries) goes into an
//! [`AnnotationStore`](crate::annotations::AnnotationStore) keyed by
//! [`BlockId`].
//!
//! ```json
//! {
//!   "id": "0c8a51b3-5d17-4f0a-9e6b-1a2b3c4d5e6f",
//!   "title": "Hello",
//!   "created_on": "2024-01-02T10:00:00Z",
//!   "last_edited_on": "2024-01-03T10:00:00Z",
//!   "blocks": [
//!     { "id": "b1", "kind": "text", "spans": [{ "text": "tags: go" }] },
//!     { "id": "b2", "kind": "image", "source": "https://example.com/a.png" }
//!   ]
//! }
//! ```

use crate::toc::HeadingEvent;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PageLoadError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid page export {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Identity of a block, as assigned by the document source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(String);

impl BlockId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Block type tag. Anything that is neither text nor an image is `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    Text,
    Image,
    #[serde(other)]
    Other,
}

/// A run of inline text. Spans with any attribute (bold, link, code, ...)
/// are not plain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextSpan {
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attrs: Vec<String>,
}

impl TextSpan {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            attrs: Vec::new(),
        }
    }

    pub fn is_plain(&self) -> bool {
        self.attrs.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub id: BlockId,
    pub kind: BlockKind,
    #[serde(default)]
    pub spans: Vec<TextSpan>,
    #[serde(default)]
    pub children: Vec<Block>,
    /// Media reference; only meaningful for image blocks.
    #[serde(default)]
    pub source: Option<String>,
}

impl Block {
    /// Concatenated text of all inline spans.
    pub fn text(&self) -> String {
        self.spans.iter().map(|s| s.text.as_str()).collect()
    }

    pub fn is_image(&self) -> bool {
        self.kind == BlockKind::Image
    }

    /// A text block with no inline spans at all, i.e. a blank line.
    pub fn is_empty_text(&self) -> bool {
        self.kind == BlockKind::Text && self.spans.is_empty()
    }
}

/// One exported page: identity, timestamps and the top-level block sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageTree {
    pub id: String,
    pub title: String,
    pub created_on: DateTime<Utc>,
    pub last_edited_on: DateTime<Utc>,
    /// Page cover link, used as header image when no directive sets one.
    #[serde(default)]
    pub cover: Option<String>,
    #[serde(default)]
    pub blocks: Vec<Block>,
    /// Heading events produced by the source's own AST layer.
    #[serde(default)]
    pub headings: Vec<HeadingEvent>,
}

impl PageTree {
    pub fn load(path: &Path) -> Result<Self, PageLoadError> {
        let content = std::fs::read_to_string(path).map_err(|source| PageLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| PageLoadError::Json {
            path: path.to_path_buf(),
            source,
        })
    }
}
