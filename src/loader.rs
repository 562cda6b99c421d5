//! The "load more" state machine.
//!
//! ```text
//!  state        event                          next
//!  ──────────   ────────────────────────────   ──────────────────────
//!  Idle         LoadRequested                  Loading
//!  ErrorIdle    LoadRequested                  Loading
//!  ErrorIdle    RetryTimerElapsed (dev only)   Loading (auto retry)
//!  Loading      FetchSucceeded                 Idle
//!  Loading      FetchSucceeded, filter starved Exhausted(Filter)
//!  Loading      NoMorePages                    Exhausted(Feed)
//!  Loading      FetchFailed                    ErrorIdle
//!  Exhausted    FilterChanged                  Idle   (Filter only)
//! ```
//!
//! [`transition`] is a pure function of state, event and context; it returns
//! the next state and the [`Effect`]s the caller must carry out, in order.
//! [`ContentLoader`] wraps it with the little bookkeeping that outlives a
//! single transition (the per-page cache).
//!
//! The re-entrancy guard is the state itself: `LoadRequested` while
//! `Loading` produces no effects, so at most one fetch is ever in flight.

use std::collections::BTreeMap;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::announce::Announcement;
use crate::fetcher::FetchedBatch;
use crate::filter::PostType;
use crate::source::PostItem;

/// Visible state of the load-more control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Affordance {
    Ready,
    Busy,
    Exhausted,
}

impl Affordance {
    pub fn text(self) -> &'static str {
        match self {
            Affordance::Ready => "Load More",
            Affordance::Busy => "Loading...",
            Affordance::Exhausted => "No more posts",
        }
    }

    /// Accessible name of the control in this state.
    pub fn label(self) -> &'static str {
        match self {
            Affordance::Ready => "Load more posts",
            Affordance::Busy => "Loading more posts, please wait",
            Affordance::Exhausted => "No more posts available",
        }
    }

    pub fn is_disabled(self) -> bool {
        self == Affordance::Exhausted
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exhaustion {
    /// The feed has no further pages.
    Feed,
    /// The last page had nothing for this filter although the feed goes on.
    Filter(PostType),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoaderState {
    Idle,
    /// `auto_retry` marks the one automatic cycle development mode allows.
    Loading { auto_retry: bool },
    Exhausted(Exhaustion),
    /// Last cycle failed; the control is usable again.
    ErrorIdle { retry_scheduled: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoaderEvent {
    /// The user activated the load-more control.
    LoadRequested,
    /// The development-mode retry delay elapsed.
    RetryTimerElapsed,
    FetchSucceeded(FetchedBatch),
    NoMorePages,
    /// Every attempt failed; carries the final error message.
    FetchFailed(String),
    FilterChanged(PostType),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    SetAffordance(Affordance),
    /// Ask the fetcher for the next page.
    StartFetch,
    /// Add posts to the grid and hand them to the layout.
    Append { page: u32, items: Vec<PostItem> },
    Layout,
    Arrange(PostType),
    /// Let the post navigation pick up the new posts.
    RefreshNavigation,
    Announce(Announcement),
    /// Deliver [`LoaderEvent::RetryTimerElapsed`] after this long.
    ScheduleRetry(Duration),
}

/// Everything a transition depends on that is not loader state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoaderContext {
    pub filter: PostType,
    /// Recognised local-development feed (see `config::is_local_development`).
    pub dev_mode: bool,
    pub retry_delay: Duration,
}

pub fn transition(
    state: &LoaderState,
    event: LoaderEvent,
    ctx: &LoaderContext,
) -> (LoaderState, Vec<Effect>) {
    use LoaderState::*;

    match (*state, event) {
        (Idle | ErrorIdle { .. }, LoaderEvent::LoadRequested) => start_cycle(false),

        (ErrorIdle { retry_scheduled: true }, LoaderEvent::RetryTimerElapsed) => {
            info!("retrying in development mode");
            start_cycle(true)
        }

        (Loading { .. }, LoaderEvent::NoMorePages) => (
            Exhausted(Exhaustion::Feed),
            vec![
                Effect::SetAffordance(Affordance::Exhausted),
                Effect::Announce(Announcement::polite("No more posts available")),
            ],
        ),

        (Loading { .. }, LoaderEvent::FetchSucceeded(batch)) if batch.items.is_empty() => (
            Exhausted(Exhaustion::Feed),
            vec![
                Effect::SetAffordance(Affordance::Exhausted),
                Effect::Announce(Announcement::polite("No more posts available")),
            ],
        ),

        (Loading { .. }, LoaderEvent::FetchSucceeded(batch)) if starves_filter(&batch, ctx) => {
            info!(filter = %ctx.filter, page = batch.page, "no posts for filter, dropping batch");
            (
                Exhausted(Exhaustion::Filter(ctx.filter)),
                vec![
                    Effect::SetAffordance(Affordance::Exhausted),
                    Effect::Announce(Announcement::polite(format!(
                        "No more {} available",
                        ctx.filter.label()
                    ))),
                ],
            )
        }

        (Loading { .. }, LoaderEvent::FetchSucceeded(batch)) => {
            let count = batch.items.len();
            (
                Idle,
                vec![
                    Effect::Append {
                        page: batch.page,
                        items: batch.items,
                    },
                    Effect::Layout,
                    Effect::Arrange(ctx.filter),
                    Effect::RefreshNavigation,
                    Effect::Announce(Announcement::polite(format!("{count} new posts loaded"))),
                    Effect::SetAffordance(Affordance::Ready),
                ],
            )
        }

        (Loading { auto_retry }, LoaderEvent::FetchFailed(reason)) => {
            warn!(%reason, "error loading more posts");
            let schedule = ctx.dev_mode && !auto_retry;
            let mut effects = vec![Effect::SetAffordance(Affordance::Ready)];
            if schedule {
                effects.push(Effect::Announce(Announcement::alert(
                    "Error loading more posts. Retrying...",
                )));
                effects.push(Effect::ScheduleRetry(ctx.retry_delay));
            } else {
                effects.push(Effect::Announce(Announcement::alert(
                    "Error loading more posts. Please try again.",
                )));
            }
            (
                ErrorIdle {
                    retry_scheduled: schedule,
                },
                effects,
            )
        }

        (Exhausted(Exhaustion::Filter(starved)), LoaderEvent::FilterChanged(selected))
            if selected != starved =>
        {
            debug!(from = %starved, to = %selected, "filter changed, clearing filter exhaustion");
            (Idle, vec![Effect::SetAffordance(Affordance::Ready)])
        }

        (current, event) => {
            debug!(state = ?current, event = ?EventKind::from(&event), "event ignored");
            (current, Vec::new())
        }
    }
}

fn start_cycle(auto_retry: bool) -> (LoaderState, Vec<Effect>) {
    (
        LoaderState::Loading { auto_retry },
        vec![Effect::SetAffordance(Affordance::Busy), Effect::StartFetch],
    )
}

/// A non-"all" filter found nothing in a page that is not the last one.
///
/// The first page is exempt: it is the opening screen and is always shown.
fn starves_filter(batch: &FetchedBatch, ctx: &LoaderContext) -> bool {
    !ctx.filter.is_all()
        && batch.page > 1
        && batch.has_next
        && !batch.items.iter().any(|item| ctx.filter.matches(item))
}

/// Event name without its payload, for log lines.
#[derive(Debug)]
enum EventKind {
    LoadRequested,
    RetryTimerElapsed,
    FetchSucceeded,
    NoMorePages,
    FetchFailed,
    FilterChanged,
}

impl From<&LoaderEvent> for EventKind {
    fn from(event: &LoaderEvent) -> Self {
        match event {
            LoaderEvent::LoadRequested => EventKind::LoadRequested,
            LoaderEvent::RetryTimerElapsed => EventKind::RetryTimerElapsed,
            LoaderEvent::FetchSucceeded(_) => EventKind::FetchSucceeded,
            LoaderEvent::NoMorePages => EventKind::NoMorePages,
            LoaderEvent::FetchFailed(_) => EventKind::FetchFailed,
            LoaderEvent::FilterChanged(_) => EventKind::FilterChanged,
        }
    }
}

/// State machine plus the per-page cache of appended posts.
#[derive(Debug)]
pub struct ContentLoader {
    state: LoaderState,
    cache: BTreeMap<u32, Vec<PostItem>>,
}

impl Default for ContentLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentLoader {
    pub fn new() -> Self {
        Self {
            state: LoaderState::Idle,
            cache: BTreeMap::new(),
        }
    }

    pub fn state(&self) -> LoaderState {
        self.state
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.state, LoaderState::Loading { .. })
    }

    pub fn is_feed_exhausted(&self) -> bool {
        self.state == LoaderState::Exhausted(Exhaustion::Feed)
    }

    pub fn is_filter_exhausted(&self) -> bool {
        matches!(self.state, LoaderState::Exhausted(Exhaustion::Filter(_)))
    }

    pub fn cached_pages(&self) -> usize {
        self.cache.len()
    }

    /// Feed one event through the machine and return the effects to apply.
    pub fn handle(&mut self, event: LoaderEvent, ctx: &LoaderContext) -> Vec<Effect> {
        let (next, effects) = transition(&self.state, event, ctx);
        if next != self.state {
            debug!(from = ?self.state, to = ?next, "loader transition");
        }
        self.state = next;

        for effect in &effects {
            if let Effect::Append { page, items } = effect {
                self.cache.insert(*page, items.clone());
            }
        }
        effects
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
