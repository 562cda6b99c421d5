//! The content unit shared by the parser, the loader and the grid.
//!
//! `PostItem` represents a single post fragment cut out of a fetched page.
//! Every field is derived once, when the fragment is parsed, and the item is
//! never mutated afterwards: the grid owns it after append and the loader only
//! ever clones it into the per-page cache.
//!
//! ## For contributors
//!
//! If you need another piece of the fragment in the UI (an author, a date),
//! add a field here and fill it in [`crate::source::page::parse_page`].  Do
//! not derive anything lazily; classification must be settled before the item
//! reaches the grid.

/// A single post, normalised from the server-rendered markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostItem {
    /// Outer HTML of the `.post` element, kept verbatim.
    pub markup: String,

    /// Headline shown in the list.
    pub title: String,

    /// Absolute permalink, when the fragment carried one.
    pub link: Option<String>,

    /// First paragraph of the fragment, whitespace-collapsed.
    pub excerpt: Option<String>,

    /// Text of the `.primary-tag` element, as the server rendered it.
    pub primary_tag: Option<String>,

    tag_class: Option<String>,
}

impl PostItem {
    /// Build an item and classify it by its primary tag.
    pub fn new(
        markup: impl Into<String>,
        title: impl Into<String>,
        link: Option<String>,
        excerpt: Option<String>,
        primary_tag: Option<String>,
    ) -> Self {
        let tag_class = primary_tag
            .as_deref()
            .map(normalize_tag)
            .filter(|class| !class.is_empty());

        Self {
            markup: markup.into(),
            title: title.into(),
            link,
            excerpt,
            primary_tag,
            tag_class,
        }
    }

    /// Normalised category identifier, e.g. `"notes"` for a `Notes` label.
    ///
    /// `None` when the fragment had no primary tag (or an empty one); such
    /// items are only visible under the "all" filter.
    pub fn tag_class(&self) -> Option<&str> {
        self.tag_class.as_deref()
    }
}

/// Turn a category label into a tag class.
///
/// Trims, lowercases, and replaces every character outside `[a-z0-9-]` with a
/// hyphen.  `"Link Blog"` becomes `"link-blog"`.
pub fn normalize_tag(label: &str) -> String {
    label
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'a'..='z' | '0'..='9' | '-' => c,
            _ => '-',
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
