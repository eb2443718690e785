//! Out-of-band per-block state.
//!
//! The content tree belongs to the document source and is never mutated.
//! Whatever ingestion decides about a block lives here instead, keyed by
//! [`BlockId`]. Entries are created lazily on first write; reads of a block
//! with no entry return the defaults (not skipped, no href, no gallery).

use crate::block::BlockId;
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BlockAnnotation {
    /// Excluded from the rendered body.
    pub skip: bool,
    /// For `#url` triggers: the image is wrapped in a link to this href.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_href: Option<String>,
    /// For `#gallery` triggers: source links of the gallery images, in order.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gallery: Option<Vec<String>>,
}

#[derive(Debug, Default)]
pub struct AnnotationStore {
    entries: HashMap<BlockId, BlockAnnotation>,
}

impl AnnotationStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&mut self, id: &BlockId) -> &mut BlockAnnotation {
        self.entries.entry(id.clone()).or_default()
    }

    pub fn get(&self, id: &BlockId) -> Option<&BlockAnnotation> {
        self.entries.get(id)
    }

    pub fn mark_skip(&mut self, id: &BlockId) {
        self.entry(id).skip = true;
    }

    pub fn should_skip(&self, id: &BlockId) -> bool {
        self.get(id).is_some_and(|a| a.skip)
    }

    pub fn set_image_href(&mut self, id: &BlockId, href: impl Into<String>) {
        self.entry(id).image_href = Some(href.into());
    }

    pub fn image_href(&self, id: &BlockId) -> Option<&str> {
        self.get(id).and_then(|a| a.image_href.as_deref())
    }

    pub fn set_gallery(&mut self, id: &BlockId, links: Vec<String>) {
        self.entry(id).gallery = Some(links);
    }

    pub fn gallery(&self, id: &BlockId) -> Option<&[String]> {
        self.get(id).and_then(|a| a.gallery.as_deref())
    }

    /// Number of blocks carrying an annotation.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
