//! Leading metadata directives.
//!
//! Articles carry their metadata as the first few text blocks of the page:
//!
//! ```text
//! id: 1234
//! tags: go, web
//! date: 2020-05-17
//! @series: concurrency
//!
//! First real paragraph...
//! ```
//!
//! Each leading block is classified as either metadata (consumed and marked
//! skip) or the start of the body. The first block that is not metadata ends
//! the phase for good: nothing after it is ever read as a directive.
//!
//! ## Classification, in order
//!
//! | Block | Result |
//! |-------|--------|
//! | not a text block | stop |
//! | no inline spans (blank line) | continue |
//! | first span has formatting | stop |
//! | first span blank after trimming | continue |
//! | `@key: value` / `@key value` | generic [`Directive`], continue |
//! | no `:` | stop |
//! | `key: value` with a known key | run its handler, continue |
//! | `key: value` with an unknown key | stop |
//!
//! An unknown key ends the phase quietly instead of failing, so a body that
//! happens to open with `Note: ...` is still a body. The flip side is that a
//! misspelled directive silently becomes body text.
//!
//! Known keys are dispatched through [`DIRECTIVES`], a `key → handler` table.
//! Handler failures (bad dates, unknown status or collection, missing header
//! image) are fatal for the document.

use crate::annotations::AnnotationStore;
use crate::assets::AssetStore;
use crate::block::{Block, BlockKind};
use crate::collections::{self, CollectionLookup};
use crate::parsing::{self, DateParseError, StatusParseError};
use crate::types::{Directive, Status, UrlPath};
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MetadataError {
    #[error("invalid {key} date: {source}")]
    InvalidDate {
        key: String,
        source: DateParseError,
    },
    #[error(transparent)]
    InvalidStatus(#[from] StatusParseError),
    #[error("'{0}' is not a known collection")]
    UnknownCollection(String),
    #[error("header image '{0}' doesn't exist")]
    MissingHeaderImage(String),
}

/// A handler failure together with the directive line that caused it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{source} (in '{line}')")]
pub struct DirectiveError {
    pub line: String,
    pub source: MetadataError,
}

/// Outcome of classifying one leading block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetaStep {
    /// Block is metadata (or blank); keep scanning.
    Continue,
    /// Block belongs to the body; the metadata phase is over.
    Stop,
}

/// Fields collected from directives. `None`/empty means "not set".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    pub id: Option<String>,
    pub tags: Option<Vec<String>>,
    pub published_on: Option<DateTime<Utc>>,
    /// `publishedon` wins over `date`/`createdat` once the phase ends.
    pub published_override: Option<DateTime<Utc>>,
    pub updated_on: Option<DateTime<Utc>>,
    pub status: Status,
    pub description: String,
    pub summary: String,
    pub header_image: Option<String>,
    pub collection: Option<UrlPath>,
    pub url_override: Option<String>,
    pub in_blog: bool,
    pub directives: Vec<Directive>,
}

impl Metadata {
    /// Effective publish date after override resolution.
    pub fn effective_published_on(&self) -> Option<DateTime<Utc>> {
        self.published_override.or(self.published_on)
    }
}

pub type Handler = fn(&mut Metadata, &str, &dyn AssetStore) -> Result<(), MetadataError>;

/// Directive keys (lower-case) and their handlers.
pub const DIRECTIVES: &[(&str, Handler)] = &[
    ("tags", set_tags),
    ("id", set_id),
    ("publishedon", set_published_override),
    ("date", set_published),
    ("createdat", set_published),
    ("updatedat", set_updated),
    ("status", set_status),
    ("description", set_description),
    ("summary", set_summary),
    ("headerimage", set_header_image),
    ("collection", set_collection),
    ("url", set_url),
];

pub fn handler_for(key: &str) -> Option<Handler> {
    DIRECTIVES
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, h)| *h)
}

fn date(key: &str, value: &str) -> Result<DateTime<Utc>, MetadataError> {
    parsing::parse_date(value).map_err(|source| MetadataError::InvalidDate {
        key: key.to_string(),
        source,
    })
}

fn set_tags(meta: &mut Metadata, value: &str, _: &dyn AssetStore) -> Result<(), MetadataError> {
    meta.tags = Some(parsing::parse_tags(value));
    Ok(())
}

/// Integer ids are replaced by their short encoding; anything else is kept.
fn set_id(meta: &mut Metadata, value: &str, _: &dyn AssetStore) -> Result<(), MetadataError> {
    let id = value.trim();
    meta.id = Some(match id.parse::<u64>() {
        Ok(n) => parsing::encode_id(n),
        Err(_) => id.to_string(),
    });
    Ok(())
}

fn set_published_override(
    meta: &mut Metadata,
    value: &str,
    _: &dyn AssetStore,
) -> Result<(), MetadataError> {
    meta.published_override = Some(date("publishedon", value)?);
    meta.in_blog = true;
    Ok(())
}

fn set_published(meta: &mut Metadata, value: &str, _: &dyn AssetStore) -> Result<(), MetadataError> {
    meta.published_on = Some(date("date", value)?);
    meta.in_blog = true;
    Ok(())
}

fn set_updated(meta: &mut Metadata, value: &str, _: &dyn AssetStore) -> Result<(), MetadataError> {
    meta.updated_on = Some(date("updatedat", value)?);
    Ok(())
}

fn set_status(meta: &mut Metadata, value: &str, _: &dyn AssetStore) -> Result<(), MetadataError> {
    meta.status = parsing::parse_status(value)?;
    Ok(())
}

fn set_description(meta: &mut Metadata, value: &str, _: &dyn AssetStore) -> Result<(), MetadataError> {
    meta.description = value.to_string();
    Ok(())
}

fn set_summary(meta: &mut Metadata, value: &str, _: &dyn AssetStore) -> Result<(), MetadataError> {
    meta.summary = value.to_string();
    Ok(())
}

fn set_header_image(
    meta: &mut Metadata,
    value: &str,
    assets: &dyn AssetStore,
) -> Result<(), MetadataError> {
    let path = if value.starts_with('/') {
        value.to_string()
    } else {
        format!("/{value}")
    };
    if value.is_empty() || !assets.exists(&path) {
        return Err(MetadataError::MissingHeaderImage(path));
    }
    meta.header_image = Some(path);
    Ok(())
}

fn set_collection(meta: &mut Metadata, value: &str, _: &dyn AssetStore) -> Result<(), MetadataError> {
    match collections::lookup(value) {
        Some(CollectionLookup::Known(c)) => {
            meta.collection = Some(UrlPath {
                name: c.name.to_string(),
                url: c.url.to_string(),
            });
            Ok(())
        }
        Some(CollectionLookup::Ignored) => Ok(()),
        None => Err(MetadataError::UnknownCollection(value.to_string())),
    }
}

fn set_url(meta: &mut Metadata, value: &str, _: &dyn AssetStore) -> Result<(), MetadataError> {
    meta.url_override = Some(value.to_string());
    Ok(())
}

/// Split `@key: value` / `@key value` (the `@` already removed).
fn split_generic(s: &str) -> Directive {
    let (key, value) = match s.find(':').or_else(|| s.find(' ')) {
        Some(idx) => (&s[..idx], &s[idx + 1..]),
        None => (s, ""),
    };
    Directive {
        key: key.trim().to_string(),
        value: value.trim().to_string(),
    }
}

/// Classify one leading block, applying its directive to `meta`.
pub fn classify(
    block: &Block,
    meta: &mut Metadata,
    assets: &dyn AssetStore,
) -> Result<MetaStep, DirectiveError> {
    if block.kind != BlockKind::Text {
        return Ok(MetaStep::Stop);
    }
    let Some(first) = block.spans.first() else {
        return Ok(MetaStep::Continue);
    };
    if !first.is_plain() {
        return Ok(MetaStep::Stop);
    }
    let line = first.text.trim();
    if line.is_empty() {
        return Ok(MetaStep::Continue);
    }

    if let Some(rest) = line.strip_prefix('@') {
        meta.directives.push(split_generic(rest));
        return Ok(MetaStep::Continue);
    }

    let Some((key, value)) = line.split_once(':') else {
        return Ok(MetaStep::Stop);
    };
    let key = key.trim().to_lowercase();
    let Some(handler) = handler_for(&key) else {
        debug!(block = %block.id, %key, "unknown directive key, metadata ends");
        return Ok(MetaStep::Stop);
    };
    handler(meta, value.trim(), assets).map_err(|source| DirectiveError {
        line: line.to_string(),
        source,
    })?;
    Ok(MetaStep::Continue)
}

/// Result of the metadata phase.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub metadata: Metadata,
    /// Number of leading blocks consumed as metadata.
    pub consumed: usize,
}

/// Run the metadata phase over the leading blocks of a page.
///
/// Consumed blocks are marked skip; the first body block is left untouched.
pub fn extract(
    blocks: &[Block],
    annotations: &mut AnnotationStore,
    assets: &dyn AssetStore,
) -> Result<Extraction, DirectiveError> {
    let mut metadata = Metadata::default();
    let mut consumed = 0;
    for block in blocks {
        match classify(block, &mut metadata, assets)? {
            MetaStep::Continue => {
                annotations.mark_skip(&block.id);
                consumed += 1;
            }
            MetaStep::Stop => break,
        }
    }
    Ok(Extraction { metadata, consumed })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{empty_text, image, no_assets, styled_text, text};
    use rstest::rstest;
    use std::collections::HashSet;

    fn run(lines: &[&str]) -> Result<Metadata, DirectiveError> {
        let blocks: Vec<Block> = lines
            .iter()
            .enumerate()
            .map(|(i, l)| text(&format!("m{i}"), l))
            .collect();
        let mut annotations = AnnotationStore::new();
        extract(&blocks, &mut annotations, &no_assets()).map(|e| e.metadata)
    }

    fn classify_line(line: &str) -> (MetaStep, Metadata) {
        let mut meta = Metadata::default();
        let step = classify(&text("b", line), &mut meta, &no_assets()).unwrap();
        (step, meta)
    }

    // =========================================================================
    // Block classification
    // =========================================================================

    #[test]
    fn non_text_block_stops() {
        let mut meta = Metadata::default();
        let step = classify(&image("i", "https://x/a.png"), &mut meta, &no_assets()).unwrap();
        assert_eq!(step, MetaStep::Stop);
    }

    #[test]
    fn blank_block_continues() {
        let mut meta = Metadata::default();
        assert_eq!(
            classify(&empty_text("e"), &mut meta, &no_assets()).unwrap(),
            MetaStep::Continue
        );
        assert_eq!(classify_line("   ").0, MetaStep::Continue);
    }

    #[test]
    fn formatted_first_span_stops() {
        let mut meta = Metadata::default();
        let step = classify(&styled_text("s", "tags: go"), &mut meta, &no_assets()).unwrap();
        assert_eq!(step, MetaStep::Stop);
        assert_eq!(meta.tags, None);
    }

    #[test]
    fn line_without_colon_stops() {
        assert_eq!(classify_line("Just a sentence").0, MetaStep::Stop);
    }

    #[test]
    fn unknown_key_stops_without_error() {
        let (step, meta) = classify_line("Note: this is body text");
        assert_eq!(step, MetaStep::Stop);
        assert_eq!(meta, Metadata::default());
    }

    // =========================================================================
    // Generic directives
    // =========================================================================

    #[rstest]
    #[case("@series: concurrency", "series", "concurrency")]
    #[case("@series concurrency part 2", "series", "concurrency part 2")]
    #[case("@draft-notes", "draft-notes", "")]
    #[case("@a:b c", "a", "b c")]
    fn generic_directive_split(#[case] line: &str, #[case] key: &str, #[case] value: &str) {
        let (step, meta) = classify_line(line);
        assert_eq!(step, MetaStep::Continue);
        assert_eq!(
            meta.directives,
            vec![Directive {
                key: key.into(),
                value: value.into()
            }]
        );
    }

    #[test]
    fn generic_directives_keep_discovery_order() {
        let meta = run(&["@b: 2", "@a: 1", "@b: 3"]).unwrap();
        let keys: Vec<&str> = meta.directives.iter().map(|d| d.key.as_str()).collect();
        assert_eq!(keys, vec!["b", "a", "b"]);
    }

    // =========================================================================
    // Keyed directives: one case per table entry
    // =========================================================================

    #[rstest]
    #[case("tags: Go, WEB , for-blog, Draft")]
    #[case("Tags : go,web")]
    fn tags_directive(#[case] line: &str) {
        let (_, meta) = classify_line(line);
        assert_eq!(meta.tags, Some(vec!["go".to_string(), "web".to_string()]));
    }

    #[rstest]
    #[case("id: 1234", "JI")]
    #[case("id:  0 ", "0")]
    #[case("id: go-intro", "go-intro")]
    #[case("id: -5", "-5")]
    fn id_directive(#[case] line: &str, #[case] expected: &str) {
        assert_eq!(classify_line(line).1.id.as_deref(), Some(expected));
    }

    #[rstest]
    #[case("date: 2020-05-17")]
    #[case("createdat: 2020-05-17T00:00:00Z")]
    fn date_directives_set_published(#[case] line: &str) {
        let meta = classify_line(line).1;
        assert_eq!(
            meta.published_on.map(|d| d.to_rfc3339()),
            Some("2020-05-17T00:00:00+00:00".to_string())
        );
        assert!(meta.in_blog);
    }

    #[test]
    fn publishedon_overrides_date_regardless_of_order() {
        let meta = run(&["publishedon: 2021-01-01", "date: 2020-05-17"]).unwrap();
        assert_eq!(
            meta.effective_published_on().map(|d| d.to_rfc3339()),
            Some("2021-01-01T00:00:00+00:00".to_string())
        );
        assert!(meta.in_blog);
    }

    #[test]
    fn updatedat_does_not_mark_blog() {
        let meta = classify_line("updatedat: 2022-02-02").1;
        assert!(meta.updated_on.is_some());
        assert!(!meta.in_blog);
    }

    #[rstest]
    #[case("date: May 17 2020", "date")]
    #[case("createdat: 17/05/2020", "date")]
    #[case("publishedon: tomorrow", "publishedon")]
    #[case("updatedat: 2020-13-01", "updatedat")]
    fn bad_dates_are_fatal(#[case] line: &str, #[case] key: &str) {
        let err = run(&[line]).unwrap_err();
        assert_eq!(err.line, line);
        assert!(matches!(err.source, MetadataError::InvalidDate { key: ref k, .. } if k == key));
    }

    #[rstest]
    #[case("status: ", Status::Published)]
    #[case("status: Idea", Status::Idea)]
    #[case("status: draft", Status::Draft)]
    #[case("status: REVISE", Status::Revise)]
    fn status_directive(#[case] line: &str, #[case] expected: Status) {
        assert_eq!(classify_line(line).1.status, expected);
    }

    #[test]
    fn unknown_status_is_fatal() {
        let err = run(&["status: archived"]).unwrap_err();
        assert_eq!(
            err.source,
            MetadataError::InvalidStatus(StatusParseError("archived".into()))
        );
    }

    #[test]
    fn description_and_summary_literal() {
        let meta = run(&["description: A: B", "summary:  short one "]).unwrap();
        assert_eq!(meta.description, "A: B");
        assert_eq!(meta.summary, "short one");
    }

    #[test]
    fn url_directive_sets_override() {
        assert_eq!(
            classify_line("url: /go/intro.html").1.url_override.as_deref(),
            Some("/go/intro.html")
        );
    }

    #[test]
    fn headerimage_normalized_and_checked() {
        let assets: HashSet<String> = ["/img/cover.png".to_string()].into_iter().collect();
        let mut meta = Metadata::default();
        let step = classify(&text("h", "headerimage: img/cover.png"), &mut meta, &assets).unwrap();
        assert_eq!(step, MetaStep::Continue);
        assert_eq!(meta.header_image.as_deref(), Some("/img/cover.png"));
    }

    #[test]
    fn missing_headerimage_is_fatal() {
        let err = run(&["headerimage: /img/nope.png"]).unwrap_err();
        assert_eq!(
            err.source,
            MetadataError::MissingHeaderImage("/img/nope.png".into())
        );
    }

    #[test]
    fn empty_headerimage_is_fatal() {
        assert!(matches!(
            run(&["headerimage:"]).unwrap_err().source,
            MetadataError::MissingHeaderImage(_)
        ));
    }

    #[test]
    fn known_collection() {
        let meta = classify_line("collection: go-cookbook").1;
        assert_eq!(
            meta.collection,
            Some(UrlPath {
                name: "Go Cookbook".into(),
                url: "/book/go-cookbook.html".into()
            })
        );
    }

    #[test]
    fn ignored_collection_is_noop() {
        let (step, meta) = classify_line("collection: go-windows");
        assert_eq!(step, MetaStep::Continue);
        assert_eq!(meta.collection, None);
    }

    #[test]
    fn unknown_collection_is_fatal() {
        assert_eq!(
            run(&["collection: rust-book"]).unwrap_err().source,
            MetadataError::UnknownCollection("rust-book".into())
        );
    }

    #[test]
    fn every_table_key_is_lowercase_and_unique() {
        let mut seen = HashSet::new();
        for (key, _) in DIRECTIVES {
            assert_eq!(*key, key.to_lowercase());
            assert!(seen.insert(*key), "duplicate key {key}");
        }
    }

    // =========================================================================
    // Phase boundaries
    // =========================================================================

    #[test]
    fn phase_is_prefix_closed() {
        let blocks = vec![
            text("a", "tags: go"),
            empty_text("b"),
            text("c", "Hello there."),
            text("d", "status: draft"),
            text("e", "@series x"),
        ];
        let mut annotations = AnnotationStore::new();
        let extraction = extract(&blocks, &mut annotations, &no_assets()).unwrap();

        assert_eq!(extraction.consumed, 2);
        assert!(annotations.should_skip(&blocks[0].id));
        assert!(annotations.should_skip(&blocks[1].id));
        for b in &blocks[2..] {
            assert!(!annotations.should_skip(&b.id), "{}", b.id);
        }
        assert_eq!(extraction.metadata.status, Status::Published);
        assert!(extraction.metadata.directives.is_empty());
    }

    #[test]
    fn whole_page_of_directives_is_consumed() {
        let blocks = vec![text("a", "id: 7"), text("b", "@x y")];
        let mut annotations = AnnotationStore::new();
        let extraction = extract(&blocks, &mut annotations, &no_assets()).unwrap();
        assert_eq!(extraction.consumed, 2);
    }

    #[test]
    fn directive_after_unknown_key_is_ignored() {
        let meta = run(&["Warning: body", "tags: go"]).unwrap();
        assert_eq!(meta.tags, None);
    }
}
