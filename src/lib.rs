//! # Blockpress
//!
//! Turns the block trees exported from a document-authoring tool into
//! publishable documents: metadata pulled from leading directive lines, media
//! resolved through a local cache, a body plan with galleries and linked
//! images, and a nested table of contents.
//!
//! # Pipeline
//!
//! ```text
//! content/*.json  →  PageTree  →  ingest  →  Document  →  documents.json
//!                                   │
//!                   metadata ── body walk ── trailing trim ── toc
//! ```
//!
//! Pages are independent: [`batch`] ingests them in parallel and aggregates
//! the results in input order. Within one page, ingestion is a single-pass
//! sequential walk that never mutates the exported tree; what it learns about
//! blocks lives in an [`annotations::AnnotationStore`].
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`block`] | Exported content tree: `PageTree`, `Block`, `BlockId` |
//! | [`annotations`] | Per-block skip flags, image hrefs, galleries |
//! | [`metadata`] | Leading directive lines → `Metadata` via a key → handler table |
//! | [`parsing`] | Dates, tags, status, id encoding, URL slugs |
//! | [`collections`] | Known collection registry for breadcrumbs |
//! | [`media`] | Fetcher seam, `MediaAsset`, per-document link resolution |
//! | [`cache`] | Link-addressed on-disk media cache |
//! | [`assets`] | Static asset existence checks for `headerimage` |
//! | [`ingest`] | Page → `Document`: the body walk and assembly |
//! | [`body`] | Body plan handed to rendering |
//! | [`toc`] | Heading events and the heading hierarchy |
//! | [`types`] | `Document` and friends |
//! | [`store`] | Article set with a cached tag index |
//! | [`batch`] | Directory discovery and parallel ingestion |
//! | [`config`] | `config.toml` loading, merging and validation |
//! | [`output`] | CLI report formatting |
//!
//! # Design Decisions
//!
//! ## Annotations Live Beside the Tree
//!
//! The content tree is owned by the document source and may be shared. Skip
//! flags and the rest are kept in a map keyed by block id, so the same tree
//! can be ingested twice with identical results.
//!
//! ## Fatal Per Page, Not Per Batch
//!
//! Bad directive values, failed media fetches and duplicate heading ids fail
//! the page with an [`ingest::IngestError`] naming it. Whether that stops the
//! batch is a config choice ([`batch::ErrorPolicy`]).
//!
//! ## Link-Addressed Media
//!
//! Cached images are named by the SHA-256 of their link, so the public
//! `/img/...` URL of an image is stable across runs and machines.

pub mod annotations;
pub mod assets;
pub mod batch;
pub mod block;
pub mod body;
pub mod cache;
pub mod collections;
pub mod config;
pub mod ingest;
pub mod media;
pub mod metadata;
pub mod output;
pub mod parsing;
pub mod store;
pub mod toc;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
