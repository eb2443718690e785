//! The ingested article set and the indexes derived from it.
//!
//! The tag index is computed on first use and kept until the article set
//! changes. Every mutating method drops it, so a stale index is never
//! observable.

use crate::types::Document;
use serde::Serialize;
use std::cell::OnceCell;
use std::collections::BTreeMap;

/// URL of the archive that lists every published article.
pub const ARCHIVE_URL: &str = "/archives.html";

/// One entry of the tag index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagInfo {
    pub url: String,
    pub name: String,
    pub count: usize,
}

#[derive(Debug, Default)]
pub struct DocumentStore {
    documents: Vec<Document>,
    tags: OnceCell<Vec<TagInfo>>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, document: Document) {
        self.documents.push(document);
        self.invalidate();
    }

    pub fn extend(&mut self, documents: impl IntoIterator<Item = Document>) {
        self.documents.extend(documents);
        self.invalidate();
    }

    pub fn retain(&mut self, keep: impl FnMut(&Document) -> bool) {
        self.documents.retain(keep);
        self.invalidate();
    }

    fn invalidate(&mut self) {
        self.tags.take();
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn by_id(&self, id: &str) -> Option<&Document> {
        self.documents.iter().find(|d| d.id == id)
    }

    /// Articles shown in the blog: not hidden, in the feed, newest first.
    pub fn published(&self) -> Vec<&Document> {
        let mut docs: Vec<&Document> = self
            .documents
            .iter()
            .filter(|d| !d.is_hidden() && d.is_blog())
            .collect();
        docs.sort_by(|a, b| b.published_on.cmp(&a.published_on));
        docs
    }

    /// Published articles carrying `tag`, newest first.
    pub fn with_tag(&self, tag: &str) -> Vec<&Document> {
        self.published()
            .into_iter()
            .filter(|d| d.tags.iter().any(|t| t == tag))
            .collect()
    }

    /// Tag index over published articles: an `all` entry first, then every
    /// tag in lexical order with the number of articles carrying it.
    pub fn tags(&self) -> &[TagInfo] {
        self.tags.get_or_init(|| build_tag_index(&self.published()))
    }
}

fn build_tag_index(documents: &[&Document]) -> Vec<TagInfo> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for doc in documents {
        for tag in &doc.tags {
            *counts.entry(tag.as_str()).or_default() += 1;
        }
    }

    let mut index = Vec::with_capacity(counts.len() + 1);
    index.push(TagInfo {
        url: ARCHIVE_URL.to_string(),
        name: "all".to_string(),
        count: documents.len(),
    });
    index.extend(counts.into_iter().map(|(tag, count)| TagInfo {
        url: format!("/tag/{tag}"),
        name: tag.to_string(),
        count,
    }));
    index
}
