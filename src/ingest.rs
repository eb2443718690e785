//! Page tree → [`Document`].
//!
//! Ingesting one page runs these steps in order:
//!
//! 1. **Metadata phase** over the leading top-level blocks ([`metadata`]).
//! 2. **Body walk**, pre-order and depth-first, over every remaining block,
//!    applying three rules to each sibling sequence:
//!    - `#gallery` text followed by at least two image blocks: the trigger
//!      and the images are marked skip and the trigger records the image
//!      links as its gallery. With fewer than two images the rule does not
//!      apply; a warning is logged and the trigger stays in the body.
//!    - `#url <href>` text directly followed by an image block: the trigger
//!      is marked skip and the image gets `<href>` as its link. A bare
//!      `#url` is ordinary text.
//!    - image blocks: the source link is fetched through the media cache and
//!      recorded as a [`MediaAsset`](crate::media::MediaAsset). Gallery
//!      images are fetched too, so their gallery can be rendered.
//!
//!    Any other block with children is walked recursively.
//! 3. **Cover fallback**: without a `headerimage` directive, the page cover
//!    (if any) is fetched and becomes the header image.
//! 4. **Trailing trim**: trailing blank text blocks at the top level are
//!    marked skip.
//! 5. **Assembly**: directive fields are merged over the page's own
//!    identity and timestamps, the body plan is built, and the provider's
//!    heading events become the table of contents.
//!
//! Ingestion never mutates the page tree. Every failure is fatal for the
//! page and reported as an [`IngestError`] naming the page.

use crate::annotations::AnnotationStore;
use crate::assets::AssetStore;
use crate::block::{Block, BlockId, BlockKind, PageTree};
use crate::body;
use crate::media::{FetchError, MediaFetcher, MediaResolver};
use crate::metadata::{self, MetadataError};
use crate::parsing;
use crate::toc::TocError;
use crate::types::Document;
use thiserror::Error;
use tracing::{debug, warn};

const GALLERY_TRIGGER: &str = "#gallery";
const IMAGE_URL_TRIGGER: &str = "#url";
const MIN_GALLERY_IMAGES: usize = 2;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("document {doc_id}: {source} (in '{line}')")]
    Metadata {
        doc_id: String,
        line: String,
        source: MetadataError,
    },
    #[error("document {doc_id}: media '{link}' of block {block}: {source}")]
    Fetch {
        doc_id: String,
        link: String,
        block: BlockId,
        source: FetchError,
    },
    #[error("document {doc_id}: {source}")]
    Toc { doc_id: String, source: TocError },
}

impl IngestError {
    pub fn doc_id(&self) -> &str {
        match self {
            IngestError::Metadata { doc_id, .. }
            | IngestError::Fetch { doc_id, .. }
            | IngestError::Toc { doc_id, .. } => doc_id,
        }
    }
}

/// The external collaborators ingestion talks to.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    pub fetcher: &'a dyn MediaFetcher,
    pub assets: &'a dyn AssetStore,
}

/// A finished document plus the annotations that shaped its body.
#[derive(Debug)]
pub struct Ingestion {
    pub document: Document,
    pub annotations: AnnotationStore,
}

/// Ingest one page.
pub fn ingest(page: &PageTree, collaborators: Collaborators<'_>) -> Result<Ingestion, IngestError> {
    DocumentAssembler::new(page, collaborators).run()
}

struct DocumentAssembler<'a> {
    page: &'a PageTree,
    assets: &'a dyn AssetStore,
    annotations: AnnotationStore,
    media: MediaResolver<'a>,
}

impl<'a> DocumentAssembler<'a> {
    fn new(page: &'a PageTree, collaborators: Collaborators<'a>) -> Self {
        Self {
            page,
            assets: collaborators.assets,
            annotations: AnnotationStore::new(),
            media: MediaResolver::new(collaborators.fetcher),
        }
    }

    fn run(mut self) -> Result<Ingestion, IngestError> {
        let page = self.page;
        let blocks = &page.blocks;

        let extraction = metadata::extract(blocks, &mut self.annotations, self.assets).map_err(
            |e| IngestError::Metadata {
                doc_id: page.id.clone(),
                line: e.line,
                source: e.source,
            },
        )?;
        let meta = extraction.metadata;
        debug!(doc = %page.id, consumed = extraction.consumed, "metadata phase done");

        self.walk(blocks, extraction.consumed)?;

        let header_image = match (&meta.header_image, &page.cover) {
            (Some(path), _) => Some(path.clone()),
            (None, Some(cover)) => {
                let owner = BlockId::new(page.id.clone());
                let asset = self.media.resolve(cover, &owner).map_err(|source| IngestError::Fetch {
                    doc_id: page.id.clone(),
                    link: cover.clone(),
                    block: owner.clone(),
                    source,
                })?;
                Some(asset.relative_url.clone())
            }
            (None, None) => None,
        };

        self.trim_trailing_empty(blocks);

        let images = self.media.into_assets();
        let body = body::build_body(blocks, &self.annotations, &images);
        let id = meta
            .id
            .clone()
            .unwrap_or_else(|| parsing::normalize_id(&page.id));

        let mut document = Document {
            id,
            title: page.title.clone(),
            published_on: meta.effective_published_on().unwrap_or(page.created_on),
            updated_on: meta.updated_on.unwrap_or(page.last_edited_on),
            tags: meta.tags.unwrap_or_default(),
            status: meta.status,
            summary: meta.summary,
            description: meta.description,
            header_image,
            paths: meta.collection.iter().cloned().collect(),
            collection: meta.collection,
            url_override: meta.url_override,
            directives: meta.directives,
            images,
            in_blog: meta.in_blog,
            body,
            toc: Vec::new(),
        };

        if !page.headings.is_empty() {
            document
                .attach_toc(&page.headings)
                .map_err(|source| IngestError::Toc {
                    doc_id: page.id.clone(),
                    source,
                })?;
        }

        Ok(Ingestion {
            document,
            annotations: self.annotations,
        })
    }

    /// Walk `blocks[start..]`, applying the body rules in each sibling run.
    fn walk(&mut self, blocks: &'a [Block], start: usize) -> Result<(), IngestError> {
        for idx in start..blocks.len() {
            let block = &blocks[idx];
            if self.parse_image_url(blocks, idx) || self.parse_gallery(blocks, idx) {
                continue;
            }
            if block.kind == BlockKind::Image {
                self.resolve_image(block)?;
                continue;
            }
            if !block.children.is_empty() {
                self.walk(&block.children, 0)?;
            }
        }
        Ok(())
    }

    /// `#url <href>` followed by an image block.
    fn parse_image_url(&mut self, blocks: &[Block], idx: usize) -> bool {
        let block = &blocks[idx];
        if block.kind != BlockKind::Text {
            return false;
        }
        let text = block.text();
        let Some(href) = text.trim().strip_prefix(IMAGE_URL_TRIGGER).map(str::trim) else {
            return false;
        };
        if href.is_empty() {
            return false;
        }
        let Some(next) = blocks.get(idx + 1).filter(|b| b.is_image()) else {
            return false;
        };
        self.annotations.mark_skip(&block.id);
        self.annotations.set_image_href(&next.id, href);
        true
    }

    /// `#gallery` followed by a run of image blocks.
    fn parse_gallery(&mut self, blocks: &[Block], idx: usize) -> bool {
        let block = &blocks[idx];
        if block.kind != BlockKind::Text || !block.text().trim().starts_with(GALLERY_TRIGGER) {
            return false;
        }
        let run: Vec<&Block> = blocks[idx + 1..]
            .iter()
            .take_while(|b| b.is_image())
            .collect();
        if run.len() < MIN_GALLERY_IMAGES {
            warn!(
                doc = %self.page.id,
                block = %block.id,
                images = run.len(),
                "#gallery needs at least {MIN_GALLERY_IMAGES} following image blocks"
            );
            return false;
        }

        self.annotations.mark_skip(&block.id);
        let mut links = Vec::with_capacity(run.len());
        for image in run {
            self.annotations.mark_skip(&image.id);
            links.push(image.source.clone().unwrap_or_default());
        }
        self.annotations.set_gallery(&block.id, links);
        true
    }

    fn resolve_image(&mut self, block: &Block) -> Result<(), IngestError> {
        let link = block.source.as_deref().unwrap_or_default();
        self.media
            .resolve(link, &block.id)
            .map_err(|source| IngestError::Fetch {
                doc_id: self.page.id.clone(),
                link: link.to_string(),
                block: block.id.clone(),
                source,
            })?;
        Ok(())
    }

    /// Mark trailing blank text blocks skip, stopping at the first other block.
    fn trim_trailing_empty(&mut self, blocks: &[Block]) {
        for block in blocks.iter().rev() {
            if !block.is_empty_text() {
                break;
            }
            self.annotations.mark_skip(&block.id);
        }
    }
}
