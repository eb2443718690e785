//! Body plan: the blocks that survive annotation, with media resolved.
//!
//! The template layer renders from this tree rather than from the raw
//! content tree, so it never needs to consult annotations itself:
//!
//! - skip-marked blocks (and their subtrees) are gone
//! - image blocks carry their public `/img/...` URL and optional link href
//! - a `#gallery` trigger is replaced by a [`BodyNode::Gallery`] holding the
//!   resolved URLs of its images
//!
//! Relative order of surviving blocks is the order of the content tree.

use crate::annotations::AnnotationStore;
use crate::block::{Block, BlockId, BlockKind, TextSpan};
use crate::media::{self, MediaAsset};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BodyNode {
    Text {
        block: BlockId,
        spans: Vec<TextSpan>,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        children: Vec<BodyNode>,
    },
    Image {
        block: BlockId,
        /// Cached copy's public URL, or the original link when no asset exists.
        src: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        href: Option<String>,
    },
    Gallery {
        block: BlockId,
        images: Vec<String>,
    },
    Other {
        block: BlockId,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        children: Vec<BodyNode>,
    },
}

impl BodyNode {
    pub fn block(&self) -> &BlockId {
        match self {
            BodyNode::Text { block, .. }
            | BodyNode::Image { block, .. }
            | BodyNode::Gallery { block, .. }
            | BodyNode::Other { block, .. } => block,
        }
    }

    pub fn children(&self) -> &[BodyNode] {
        match self {
            BodyNode::Text { children, .. } | BodyNode::Other { children, .. } => children,
            BodyNode::Image { .. } | BodyNode::Gallery { .. } => &[],
        }
    }
}

/// Build the body plan for a block sequence.
pub fn build_body(
    blocks: &[Block],
    annotations: &AnnotationStore,
    assets: &[MediaAsset],
) -> Vec<BodyNode> {
    blocks
        .iter()
        .filter_map(|block| body_node(block, annotations, assets))
        .collect()
}

fn body_node(block: &Block, annotations: &AnnotationStore, assets: &[MediaAsset]) -> Option<BodyNode> {
    if annotations.should_skip(&block.id) {
        let links = annotations.gallery(&block.id)?;
        let images = links
            .iter()
            .filter_map(|link| media::find_asset(assets, link))
            .map(|a| a.relative_url.clone())
            .collect();
        return Some(BodyNode::Gallery {
            block: block.id.clone(),
            images,
        });
    }

    let node = match block.kind {
        BlockKind::Image => {
            let link = block.source.as_deref().unwrap_or_default();
            let src = media::find_asset(assets, link)
                .map(|a| a.relative_url.clone())
                .unwrap_or_else(|| link.to_string());
            BodyNode::Image {
                block: block.id.clone(),
                src,
                href: annotations.image_href(&block.id).map(str::to_string),
            }
        }
        BlockKind::Text => BodyNode::Text {
            block: block.id.clone(),
            spans: block.spans.clone(),
            children: build_body(&block.children, annotations, assets),
        },
        BlockKind::Other => BodyNode::Other {
            block: block.id.clone(),
            children: build_body(&block.children, annotations, assets),
        },
    };
    Some(node)
}

/// Pre-order block ids of a body plan.
pub fn flatten_ids(nodes: &[BodyNode]) -> Vec<&BlockId> {
    let mut out = Vec::new();
    let mut stack: Vec<&BodyNode> = nodes.iter().rev().collect();
    while let Some(node) = stack.pop() {
        out.push(node.block());
        stack.extend(node.children().iter().rev());
    }
    out
}
