//! The post grid and the layout contract the loader drives.
//!
//! [`LayoutEngine`] is the narrow interface the filter selector and the
//! content loader need: re-filter by tag, register appended posts, recompute
//! the arrangement.  [`Grid`] is the implementation the terminal UI renders;
//! it keeps every appended post in arrival order and exposes the subset that
//! passes the current predicate.

use std::fmt;

use tracing::debug;

use crate::source::PostItem;

/// Which posts a layout should show.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FilterPredicate {
    /// Everything (`*`).
    #[default]
    Any,
    /// Posts whose tag class equals the given one.
    Tag(String),
}

impl FilterPredicate {
    pub fn matches(&self, item: &PostItem) -> bool {
        match self {
            Self::Any => true,
            Self::Tag(tag) => item.tag_class() == Some(tag.as_str()),
        }
    }
}

impl fmt::Display for FilterPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("*"),
            Self::Tag(tag) => write!(f, ".{tag}"),
        }
    }
}

/// Arrangement capability consumed by the filter selector and the loader.
///
/// Every method must tolerate being called with nothing to do.
pub trait LayoutEngine {
    /// Re-filter the collection by `predicate`.
    fn arrange(&mut self, predicate: FilterPredicate);

    /// Take ownership of newly added posts.
    fn appended(&mut self, items: Vec<PostItem>);

    /// Recompute the arrangement.
    fn layout(&mut self);
}

#[derive(Debug, Default)]
pub struct Grid {
    items: Vec<PostItem>,
    predicate: FilterPredicate,
    visible: Vec<usize>,
    passes: u64,
}

impl Grid {
    pub fn new() -> Self {
        Self::default()
    }

    /// All posts, hidden ones included, in arrival order.
    pub fn items(&self) -> &[PostItem] {
        &self.items
    }

    pub fn predicate(&self) -> &FilterPredicate {
        &self.predicate
    }

    /// Posts that pass the predicate, as of the last layout pass.
    pub fn visible(&self) -> impl Iterator<Item = &PostItem> + '_ {
        self.visible.iter().map(|&i| &self.items[i])
    }

    pub fn visible_len(&self) -> usize {
        self.visible.len()
    }

    pub fn visible_at(&self, index: usize) -> Option<&PostItem> {
        self.visible.get(index).map(|&i| &self.items[i])
    }

    /// Number of layout passes so far.
    pub fn passes(&self) -> u64 {
        self.passes
    }
}

impl LayoutEngine for Grid {
    fn arrange(&mut self, predicate: FilterPredicate) {
        debug!(filter = %predicate, "arrange");
        self.predicate = predicate;
        self.layout();
    }

    fn appended(&mut self, items: Vec<PostItem>) {
        debug!(count = items.len(), "appended");
        self.items.extend(items);
    }

    fn layout(&mut self) {
        self.visible = self
            .items
            .iter()
            .enumerate()
            .filter(|(_, item)| self.predicate.matches(item))
            .map(|(i, _)| i)
            .collect();
        self.passes += 1;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
