//! Known article collections.
//!
//! A `collection: <slug>` directive attaches an article to a collection and
//! adds a breadcrumb. The registry is fixed at build time; adding a
//! collection means redeploying.

/// Display name and landing page of a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Collection {
    pub name: &'static str,
    pub url: &'static str,
}

/// Outcome of looking up a collection slug.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionLookup {
    Known(Collection),
    /// Recognized slug that deliberately has no collection page.
    Ignored,
}

const KNOWN_COLLECTIONS: &[(&str, CollectionLookup)] = &[
    (
        "go-cookbook",
        CollectionLookup::Known(Collection {
            name: "Go Cookbook",
            url: "/book/go-cookbook.html",
        }),
    ),
    ("go-windows", CollectionLookup::Ignored),
];

/// `None` for slugs that are not registered.
pub fn lookup(slug: &str) -> Option<CollectionLookup> {
    KNOWN_COLLECTIONS
        .iter()
        .find(|(s, _)| *s == slug)
        .map(|(_, c)| *c)
}
