//! The document record produced by ingestion.
//!
//! A [`Document`] is what the rendering layer consumes: metadata gathered from
//! leading directives, the media assets the body refers to, the body plan of
//! blocks that survived annotation, and an optional table of contents. It is
//! serialized as-is into the ingest manifest.

use crate::body::BodyNode;
use crate::media::{self, MediaAsset};
use crate::parsing;
use crate::toc::{self, HeadingEvent, HeadingNode, TocError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Publication state of an article. Anything but `Published` is hidden from
/// indexes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Published,
    Idea,
    Draft,
    Revise,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Status::Published => "published",
            Status::Idea => "idea",
            Status::Draft => "draft",
            Status::Revise => "revise",
        };
        f.write_str(s)
    }
}

/// One breadcrumb entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlPath {
    pub name: String,
    pub url: String,
}

/// Generic `@key value` directive, kept in discovery order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Directive {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    pub id: String,
    pub title: String,
    pub published_on: DateTime<Utc>,
    pub updated_on: DateTime<Utc>,
    pub tags: Vec<String>,
    pub status: Status,
    pub summary: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection: Option<UrlPath>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url_override: Option<String>,
    /// Breadcrumb trail below "Home".
    pub paths: Vec<UrlPath>,
    pub directives: Vec<Directive>,
    pub images: Vec<MediaAsset>,
    /// Feed membership: set by any publish-date directive.
    pub in_blog: bool,
    pub body: Vec<BodyNode>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub toc: Vec<HeadingNode>,
}

impl Document {
    /// Permalink: the `url` directive verbatim, else derived from the title.
    pub fn url(&self) -> String {
        match &self.url_override {
            Some(url) => url.clone(),
            None => format!("/articles/{}.html", parsing::urlify(&self.title)),
        }
    }

    /// Breadcrumb as text, e.g. `Home / Go Cookbook`.
    pub fn path_as_text(&self) -> String {
        std::iter::once("Home")
            .chain(self.paths.iter().map(|p| p.name.as_str()))
            .collect::<Vec<_>>()
            .join(" / ")
    }

    pub fn is_hidden(&self) -> bool {
        self.status != Status::Published
    }

    pub fn is_blog(&self) -> bool {
        self.in_blog
    }

    /// Short publish date like `Jan 2 2006`.
    pub fn published_on_short(&self) -> String {
        self.published_on.format("%b %-d %Y").to_string()
    }

    /// Whole days between the last update and `now`.
    pub fn updated_age_days(&self, now: DateTime<Utc>) -> i64 {
        (now - self.updated_on).num_days()
    }

    /// Asset for a media link; a miss is logged and yields `None`.
    pub fn asset_for(&self, link: &str) -> Option<&MediaAsset> {
        media::find_asset(&self.images, link)
    }

    /// Build and attach the table of contents from heading events.
    pub fn attach_toc(&mut self, headings: &[HeadingEvent]) -> Result<(), TocError> {
        self.toc = toc::build_hierarchy(headings)?;
        Ok(())
    }
}
