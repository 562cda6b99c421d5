//! Post-type filtering.
//!
//! The feed is split into a fixed set of post types.  [`FilterSelector`]
//! tracks which one is on screen, re-arranges the grid when it changes, and
//! remembers the choice in a [`KeyValueStore`] so the next run opens on the
//! same view.

use std::fmt;

use tracing::{debug, info, warn};

use crate::announce::Announcement;
use crate::layout::{FilterPredicate, LayoutEngine};
use crate::source::PostItem;
use crate::store::KeyValueStore;

/// Storage key under which the active post type is remembered.
pub const SELECTED_POST_TYPE_KEY: &str = "selectedPostType";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PostType {
    #[default]
    All,
    Article,
    Bookmarks,
    Notes,
    Quotes,
}

impl PostType {
    /// Every type, in menu order.
    pub const ALL: [PostType; 5] = [
        PostType::All,
        PostType::Article,
        PostType::Bookmarks,
        PostType::Notes,
        PostType::Quotes,
    ];

    /// Identifier used for storage and matched against tag classes.
    pub fn id(self) -> &'static str {
        match self {
            PostType::All => "all",
            PostType::Article => "article",
            PostType::Bookmarks => "bookmarks",
            PostType::Notes => "notes",
            PostType::Quotes => "quotes",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PostType::All => "All Posts",
            PostType::Article => "Articles",
            PostType::Bookmarks => "Bookmarks",
            PostType::Notes => "Notes",
            PostType::Quotes => "Quotes",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.id() == id)
    }

    pub fn is_all(self) -> bool {
        self == PostType::All
    }

    pub fn predicate(self) -> FilterPredicate {
        match self {
            PostType::All => FilterPredicate::Any,
            other => FilterPredicate::Tag(other.id().to_string()),
        }
    }

    pub fn matches(self, item: &PostItem) -> bool {
        self.is_all() || item.tag_class() == Some(self.id())
    }

    /// The type after this one in menu order, wrapping around.
    pub fn next(self) -> Self {
        let index = Self::ALL.iter().position(|&t| t == self).unwrap_or(0);
        Self::ALL[(index + 1) % Self::ALL.len()]
    }
}

impl fmt::Display for PostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Outcome of a selection, for the subscribers that are not the layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterChange {
    pub selected: PostType,
    pub announcement: Announcement,
}

pub struct FilterSelector {
    active: PostType,
    store: Box<dyn KeyValueStore>,
}

impl FilterSelector {
    /// Start on the remembered type, replaying its selection against
    /// `layout`, or on "all" when nothing valid is remembered.
    pub fn restore(
        store: Box<dyn KeyValueStore>,
        layout: &mut dyn LayoutEngine,
    ) -> (Self, Option<FilterChange>) {
        let mut selector = Self {
            active: PostType::All,
            store,
        };

        let change = match selector.store.get(SELECTED_POST_TYPE_KEY) {
            Some(saved) => {
                debug!(%saved, "restoring filter");
                selector.select(&saved, layout)
            }
            None => None,
        };

        (selector, change)
    }

    pub fn active(&self) -> PostType {
        self.active
    }

    /// Make `type_id` the active filter.
    ///
    /// Unknown identifiers are ignored and yield `None`.
    pub fn select(
        &mut self,
        type_id: &str,
        layout: &mut dyn LayoutEngine,
    ) -> Option<FilterChange> {
        let Some(selected) = PostType::from_id(type_id) else {
            debug!(%type_id, "ignoring unknown filter");
            return None;
        };
        Some(self.apply(selected, layout))
    }

    /// Select the next type in menu order.
    pub fn cycle(&mut self, layout: &mut dyn LayoutEngine) -> FilterChange {
        self.apply(self.active.next(), layout)
    }

    fn apply(&mut self, selected: PostType, layout: &mut dyn LayoutEngine) -> FilterChange {
        info!(filter = %selected, "filter selected");
        self.active = selected;

        if let Err(err) = self.store.set(SELECTED_POST_TYPE_KEY, selected.id()) {
            warn!(%err, "could not persist filter choice");
        }

        layout.arrange(selected.predicate());

        FilterChange {
            selected,
            announcement: Announcement::polite(format!("Showing {}", selected.label())),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
