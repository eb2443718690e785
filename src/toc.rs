//! Table-of-contents construction.
//!
//! Input is the flat, ordered list of headings a document contains; output
//! is a forest that nests each heading under the nearest preceding heading
//! of a smaller level.
//!
//! ## Algorithm
//!
//! A single pass with an explicit stack of `(node, level)` entries. The stack
//! holds the current path from a top-level heading down to the most recent
//! one. For each new heading `N` of level `L` against the top `T` (level `Lt`):
//!
//! - `L > Lt`: `N` is a child of `T` and is pushed.
//! - `L == Lt`: `N` replaces `T`; it becomes a child of the entry below `T`,
//!   or a new top-level heading when there is none.
//! - `L < Lt`: entries deeper than `L` are popped. An entry at exactly `L` is
//!   replaced as in the equal case. Otherwise `N` becomes a new top-level
//!   heading and the stack restarts from it, even when a shallower entry
//!   remains (`h1 h3 h2` gives two top-level headings).
//!
//! Skipped levels are not filled in: an `h3` directly after an `h1` is a
//! child of the `h1`.
//!
//! ```text
//! h1 a            a
//! h2 b            ├── b
//! h2 c            └── c
//! h3 d                └── d
//! h1 e            e
//! h2 f            └── f
//! ```
//!
//! Nodes live in an index arena during construction and are moved into an
//! owned tree at the end, so the result has no back references.
//!
//! Heading ids must be unique within a document; a duplicate is rejected
//! before any tree is built.

use crate::parsing;
use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TocError {
    #[error("duplicate heading id '{0}'")]
    DuplicateId(String),
    #[error("heading '{id}' has level {level}, expected 1-6")]
    InvalidLevel { id: String, level: u8 },
}

/// One heading as reported by a parser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadingEvent {
    pub level: u8,
    pub id: String,
    pub content: String,
    /// Number of content nodes between this heading and the next one.
    #[serde(default)]
    pub siblings_count: usize,
}

impl HeadingEvent {
    pub fn new(level: u8, id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            level,
            id: id.into(),
            content: content.into(),
            siblings_count: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeadingNode {
    pub level: u8,
    pub id: String,
    pub content: String,
    pub siblings_count: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<HeadingNode>,
}

/// Reject duplicate ids and out-of-range levels.
fn validate(events: &[HeadingEvent]) -> Result<(), TocError> {
    let mut seen = HashSet::new();
    for ev in events {
        if !(1..=6).contains(&ev.level) {
            return Err(TocError::InvalidLevel {
                id: ev.id.clone(),
                level: ev.level,
            });
        }
        if !seen.insert(ev.id.as_str()) {
            return Err(TocError::DuplicateId(ev.id.clone()));
        }
    }
    Ok(())
}

/// Build the heading forest for an ordered list of heading events.
pub fn build_hierarchy(events: &[HeadingEvent]) -> Result<Vec<HeadingNode>, TocError> {
    validate(events)?;

    // children[i] lists the arena indices of event i's children.
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); events.len()];
    let mut roots: Vec<usize> = Vec::new();
    let mut stack: Vec<(usize, u8)> = Vec::new();

    for (node, ev) in events.iter().enumerate() {
        let level = ev.level;
        let parent = match stack.last() {
            None => None,
            Some(&(top, top_level)) if level > top_level => Some(top),
            Some(_) => {
                while stack.last().is_some_and(|&(_, l)| l > level) {
                    stack.pop();
                }
                if stack.last().is_some_and(|&(_, l)| l == level) {
                    stack.pop();
                    stack.last().map(|&(p, _)| p)
                } else {
                    // No entry at this level: start a new top-level path.
                    stack.clear();
                    None
                }
            }
        };
        match parent {
            Some(parent) => children[parent].push(node),
            None => roots.push(node),
        }
        stack.push((node, level));
    }

    Ok(roots
        .into_iter()
        .map(|i| materialize(i, events, &mut children))
        .collect())
}

/// Move arena node `i` and its subtree into an owned [`HeadingNode`].
///
/// Depth is bounded by the six heading levels.
fn materialize(i: usize, events: &[HeadingEvent], children: &mut [Vec<usize>]) -> HeadingNode {
    let kids = std::mem::take(&mut children[i]);
    let ev = &events[i];
    HeadingNode {
        level: ev.level,
        id: ev.id.clone(),
        content: ev.content.clone(),
        siblings_count: ev.siblings_count,
        children: kids
            .into_iter()
            .map(|k| materialize(k, events, children))
            .collect(),
    }
}

/// Extract heading events from markdown.
///
/// Explicit ids (`# Title {#my-id}`) are used verbatim; other headings get an
/// id derived from their text. `siblings_count` counts the blocks and text
/// runs that follow a heading until the next one.
pub fn heading_events(markdown: &str) -> Vec<HeadingEvent> {
    let parser = Parser::new_ext(markdown, Options::ENABLE_HEADING_ATTRIBUTES);

    let mut events: Vec<HeadingEvent> = Vec::new();
    // (level, explicit id, text so far) of the heading being read
    let mut current: Option<(u8, Option<String>, String)> = None;

    for event in parser {
        match event {
            Event::Start(Tag::Heading { level, id, .. }) => {
                current = Some((level as u8, id.map(|s| s.to_string()), String::new()));
            }
            Event::End(TagEnd::Heading(_)) => {
                if let Some((level, id, content)) = current.take() {
                    let content = content.trim().to_string();
                    let id = id.unwrap_or_else(|| parsing::urlify(&content));
                    events.push(HeadingEvent::new(level, id, content));
                }
            }
            Event::Text(text) | Event::Code(text) => match current.as_mut() {
                Some((_, _, content)) => content.push_str(&text),
                None => bump_siblings(&mut events),
            },
            Event::Start(_) if current.is_none() => bump_siblings(&mut events),
            _ => {}
        }
    }
    events
}

fn bump_siblings(events: &mut [HeadingEvent]) {
    if let Some(last) = events.last_mut() {
        last.siblings_count += 1;
    }
}
