use std::sync::mpsc;
use std::time::{Duration, Instant};

use ratatui::widgets::ListState;
use tracing::{debug, warn};

use crate::announce::{Announcement, Announcer};
use crate::filter::{FilterChange, FilterSelector, PostType};
use crate::layout::{Grid, LayoutEngine};
use crate::loader::{Affordance, ContentLoader, Effect, LoaderContext, LoaderEvent, LoaderState};
use crate::source::PostItem;
use crate::store::KeyValueStore;
use crate::worker::{FetchRequest, WorkerMsg};

/// Knobs the app takes from configuration.
#[derive(Debug, Clone, Copy)]
pub struct AppOptions {
    pub dev_mode: bool,
    pub retry_delay: Duration,
}

pub struct App {
    /// Every appended post and the currently visible subset.
    pub grid: Grid,
    filter: FilterSelector,
    loader: ContentLoader,
    affordance: Affordance,
    announcer: Announcer,
    /// Post navigation: selection within the visible posts.
    pub list_state: ListState,
    fetches: mpsc::Sender<FetchRequest>,
    retry_at: Option<Instant>,
    options: AppOptions,
    /// Whether the user has requested to quit.
    pub quit: bool,
}

impl App {
    pub fn new(
        store: Box<dyn KeyValueStore>,
        fetches: mpsc::Sender<FetchRequest>,
        options: AppOptions,
        now: Instant,
    ) -> Self {
        let mut grid = Grid::new();
        let (filter, restored) = FilterSelector::restore(store, &mut grid);

        let mut app = Self {
            grid,
            filter,
            loader: ContentLoader::new(),
            affordance: Affordance::Ready,
            announcer: Announcer::default(),
            list_state: ListState::default(),
            fetches,
            retry_at: None,
            options,
            quit: false,
        };
        if let Some(change) = restored {
            app.announcer.post(change.announcement, now);
        }
        app
    }

    // -- accessors -----------------------------------------------------------

    pub fn active_filter(&self) -> PostType {
        self.filter.active()
    }

    pub fn affordance(&self) -> Affordance {
        self.affordance
    }

    pub fn loader_state(&self) -> LoaderState {
        self.loader.state()
    }

    pub fn loader(&self) -> &ContentLoader {
        &self.loader
    }

    pub fn announcement(&self) -> Option<&Announcement> {
        self.announcer.current()
    }

    pub fn selected_post(&self) -> Option<&PostItem> {
        self.list_state
            .selected()
            .and_then(|i| self.grid.visible_at(i))
    }

    fn context(&self) -> LoaderContext {
        LoaderContext {
            filter: self.filter.active(),
            dev_mode: self.options.dev_mode,
            retry_delay: self.options.retry_delay,
        }
    }

    // -- events --------------------------------------------------------------

    /// The user activated the load-more control.
    pub fn load_more(&mut self, now: Instant) {
        if self.loader.is_loading() {
            debug!("load more ignored, a page is in flight");
        }
        self.dispatch(LoaderEvent::LoadRequested, now);
    }

    /// A result arrived from the fetch worker.
    pub fn handle_worker_msg(&mut self, msg: WorkerMsg, now: Instant) {
        self.dispatch(msg.into_event(), now);
    }

    pub fn select_filter(&mut self, type_id: &str, now: Instant) {
        if let Some(change) = self.filter.select(type_id, &mut self.grid) {
            self.filter_changed(change, now);
        }
    }

    pub fn cycle_filter(&mut self, now: Instant) {
        let change = self.filter.cycle(&mut self.grid);
        self.filter_changed(change, now);
    }

    /// Expire announcements and fire a due development retry.
    pub fn tick(&mut self, now: Instant) {
        self.announcer.prune(now);
        if self.retry_at.is_some_and(|at| now >= at) {
            self.retry_at = None;
            self.dispatch(LoaderEvent::RetryTimerElapsed, now);
        }
    }

    fn filter_changed(&mut self, change: FilterChange, now: Instant) {
        self.announcer.post(change.announcement, now);
        self.refresh_navigation();
        self.dispatch(LoaderEvent::FilterChanged(change.selected), now);
    }

    fn dispatch(&mut self, event: LoaderEvent, now: Instant) {
        let ctx = self.context();
        for effect in self.loader.handle(event, &ctx) {
            self.apply(effect, now);
        }
    }

    fn apply(&mut self, effect: Effect, now: Instant) {
        match effect {
            Effect::SetAffordance(affordance) => self.affordance = affordance,
            Effect::StartFetch => {
                if self.fetches.send(FetchRequest).is_err() {
                    warn!("fetch worker is gone");
                    self.dispatch(LoaderEvent::FetchFailed("fetch worker stopped".into()), now);
                }
            }
            Effect::Append { page, items } => {
                debug!(page, count = items.len(), "appending posts");
                self.grid.appended(items);
            }
            Effect::Layout => {
                self.grid.layout();
                debug!(passes = self.grid.passes(), visible = self.grid.visible_len(), "layout");
            }
            Effect::Arrange(filter) => self.grid.arrange(filter.predicate()),
            Effect::RefreshNavigation => self.refresh_navigation(),
            Effect::Announce(announcement) => self.announcer.post(announcement, now),
            Effect::ScheduleRetry(delay) => self.retry_at = Some(now + delay),
        }
    }

    /// Keep the selection pointing at a visible post.
    fn refresh_navigation(&mut self) {
        let len = self.grid.visible_len();
        match self.list_state.selected() {
            _ if len == 0 => self.list_state.select(None),
            Some(i) if i >= len => self.list_state.select(Some(len - 1)),
            _ => {}
        }
    }

    // -- navigation ----------------------------------------------------------

    pub fn select_next(&mut self) {
        let len = self.grid.visible_len();
        if len == 0 {
            return;
        }
        let i = match self.list_state.selected() {
            Some(i) => (i + 1).min(len - 1),
            None => 0,
        };
        self.list_state.select(Some(i));
    }

    pub fn select_previous(&mut self) {
        if self.grid.visible_len() == 0 {
            return;
        }
        let i = match self.list_state.selected() {
            Some(i) => i.saturating_sub(1),
            None => 0,
        };
        self.list_state.select(Some(i));
    }

    pub fn select_first(&mut self) {
        if self.grid.visible_len() > 0 {
            self.list_state.select(Some(0));
        }
    }

    pub fn select_last(&mut self) {
        let len = self.grid.visible_len();
        if len > 0 {
            self.list_state.select(Some(len - 1));
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::announce::Politeness;
    use crate::fetcher::tests::{page_html, ScriptedTransport};
    use crate::fetcher::{Fetched, FetchedBatch, PageFetcher};
    use crate::filter::SELECTED_POST_TYPE_KEY;
    use crate::layout::tests::post;
    use crate::loader::Exhaustion;
    use crate::retry::RetryPolicy;
    use crate::source::TransportError;
    use crate::store::MemoryStore;
    use crate::worker;
    use url::Url;

    pub fn options() -> AppOptions {
        AppOptions {
            dev_mode: false,
            retry_delay: Duration::from_secs(1),
        }
    }

    pub fn app_with(saved: Option<&str>, options: AppOptions) -> (App, mpsc::Receiver<FetchRequest>) {
        let mut store = MemoryStore::default();
        if let Some(saved) = saved {
            store.set(SELECTED_POST_TYPE_KEY, saved).unwrap();
        }
        let (tx, rx) = mpsc::channel();
        (App::new(Box::new(store), tx, options, Instant::now()), rx)
    }

    fn batch(page: u32, tags: &[&str], has_next: bool) -> WorkerMsg {
        WorkerMsg::Fetched(Fetched::Batch(FetchedBatch {
            page,
            items: tags
                .iter()
                .enumerate()
                .map(|(i, tag)| post(&format!("{tag} {page}.{i}"), Some(tag)))
                .collect(),
            has_next,
        }))
    }

    fn pending(rx: &mpsc::Receiver<FetchRequest>) -> usize {
        rx.try_iter().count()
    }

    // -- construction --------------------------------------------------------

    #[test]
    fn new_app_starts_empty_and_ready() {
        let (app, rx) = app_with(None, options());
        assert_eq!(app.grid.visible_len(), 0);
        assert_eq!(app.affordance(), Affordance::Ready);
        assert_eq!(app.active_filter(), PostType::All);
        assert!(app.list_state.selected().is_none());
        assert!(!app.quit);
        assert_eq!(pending(&rx), 0);
    }

    #[test]
    fn saved_filter_is_restored_and_announced() {
        let (app, _rx) = app_with(Some("quotes"), options());
        assert_eq!(app.active_filter(), PostType::Quotes);
        assert_eq!(app.announcement().map(|a| a.text.as_str()), Some("Showing Quotes"));
    }

    // -- load more -----------------------------------------------------------

    #[test]
    fn rapid_activations_send_a_single_request() {
        let (mut app, rx) = app_with(None, options());
        let now = Instant::now();
        for _ in 0..10 {
            app.load_more(now);
        }
        assert_eq!(pending(&rx), 1);
        assert_eq!(app.affordance(), Affordance::Busy);
    }

    #[test]
    fn two_page_feed_scenario() {
        let (mut app, rx) = app_with(None, options());
        let now = Instant::now();

        app.load_more(now);
        app.handle_worker_msg(
            batch(1, &["Article", "Article", "Article", "Notes", "Notes"], true),
            now,
        );
        assert_eq!(app.grid.visible_len(), 5);
        assert_eq!(app.loader_state(), LoaderState::Idle);
        assert_eq!(app.affordance().text(), "Load More");
        assert_eq!(app.announcement().map(|a| a.text.as_str()), Some("5 new posts loaded"));
        assert_eq!(app.loader().cached_pages(), 1);

        app.load_more(now);
        app.handle_worker_msg(WorkerMsg::Fetched(Fetched::NoMorePages), now);
        assert_eq!(app.loader_state(), LoaderState::Exhausted(Exhaustion::Feed));
        assert_eq!(app.affordance().text(), "No more posts");
        assert!(app.affordance().is_disabled());
        assert_eq!(app.grid.items().len(), 5);

        app.load_more(now);
        assert_eq!(pending(&rx), 2, "no request once exhausted");
    }

    #[test]
    fn bookmarks_filter_starvation_drops_batch() {
        let (mut app, _rx) = app_with(Some("bookmarks"), options());
        let now = Instant::now();

        app.load_more(now);
        app.handle_worker_msg(batch(1, &["Bookmarks", "Notes"], true), now);
        assert_eq!(app.grid.visible_len(), 1);

        app.load_more(now);
        app.handle_worker_msg(batch(2, &["Article", "Notes", "Quotes", "Notes"], true), now);
        assert!(app.loader().is_filter_exhausted());
        assert_eq!(app.grid.items().len(), 2, "nothing from the starved batch");
        assert!(app.affordance().is_disabled());

        app.select_filter("all", now);
        assert_eq!(app.loader_state(), LoaderState::Idle);
        assert_eq!(app.affordance(), Affordance::Ready);
        assert_eq!(app.grid.visible_len(), 2, "dropped posts stay unreachable");
    }

    #[test]
    fn filter_reapplied_after_append() {
        let (mut app, _rx) = app_with(Some("notes"), options());
        let now = Instant::now();
        app.load_more(now);
        app.handle_worker_msg(batch(1, &["Article", "Notes", "Notes"], true), now);

        let visible: Vec<_> = app.grid.visible().map(|p| p.tag_class()).collect();
        assert_eq!(visible, vec![Some("notes"), Some("notes")]);
    }

    #[test]
    fn result_is_judged_by_filter_active_on_arrival() {
        let (mut app, _rx) = app_with(None, options());
        let now = Instant::now();
        app.load_more(now);
        app.handle_worker_msg(batch(1, &["Article", "Notes"], true), now);

        app.load_more(now);
        app.select_filter("quotes", now);
        app.handle_worker_msg(batch(2, &["Article", "Notes"], true), now);

        assert_eq!(
            app.loader_state(),
            LoaderState::Exhausted(Exhaustion::Filter(PostType::Quotes))
        );
        assert_eq!(app.grid.items().len(), 2, "batch dropped under the new filter");
    }

    #[test]
    fn switching_to_all_mid_flight_keeps_the_batch() {
        let (mut app, _rx) = app_with(Some("quotes"), options());
        let now = Instant::now();
        app.load_more(now);
        app.handle_worker_msg(batch(1, &["Quotes"], true), now);

        app.load_more(now);
        app.select_filter("all", now);
        app.handle_worker_msg(batch(2, &["Article", "Notes"], true), now);

        assert_eq!(app.loader_state(), LoaderState::Idle);
        assert_eq!(app.grid.visible_len(), 3);
    }

    #[test]
    fn failure_re_enables_and_manual_retry_starts_fresh() {
        let (mut app, rx) = app_with(None, options());
        let now = Instant::now();

        app.load_more(now);
        app.handle_worker_msg(WorkerMsg::Failed("gave up after 4 attempts".into()), now);
        assert_eq!(
            app.loader_state(),
            LoaderState::ErrorIdle {
                retry_scheduled: false
            }
        );
        assert_eq!(app.affordance(), Affordance::Ready);
        assert_eq!(
            app.announcement().map(|a| a.politeness),
            Some(Politeness::Assertive)
        );

        app.tick(now + Duration::from_secs(5));
        assert_eq!(pending(&rx), 1, "no automatic retry outside development");

        app.load_more(now);
        assert_eq!(pending(&rx), 1);
        assert!(app.loader().is_loading());
    }

    #[test]
    fn dev_mode_retries_once_after_delay() {
        let (mut app, rx) = app_with(
            None,
            AppOptions {
                dev_mode: true,
                ..options()
            },
        );
        let now = Instant::now();

        app.load_more(now);
        app.handle_worker_msg(WorkerMsg::Failed("boom".into()), now);
        assert_eq!(pending(&rx), 1);

        app.tick(now + Duration::from_millis(500));
        assert_eq!(pending(&rx), 0, "not due yet");

        app.tick(now + Duration::from_secs(1));
        assert_eq!(pending(&rx), 1, "automatic retry issued");

        app.handle_worker_msg(WorkerMsg::Failed("boom".into()), now);
        app.tick(now + Duration::from_secs(10));
        assert_eq!(pending(&rx), 0, "only one automatic retry");
    }

    #[test]
    fn dead_worker_resolves_to_error_idle() {
        let (mut app, rx) = app_with(None, options());
        drop(rx);
        app.load_more(Instant::now());
        assert_eq!(
            app.loader_state(),
            LoaderState::ErrorIdle {
                retry_scheduled: false
            }
        );
        assert_eq!(app.affordance(), Affordance::Ready);
    }

    #[test]
    fn announcements_expire_on_tick() {
        let (mut app, _rx) = app_with(None, options());
        let now = Instant::now();
        app.select_filter("notes", now);
        assert!(app.announcement().is_some());
        app.tick(now + Duration::from_secs(2));
        assert!(app.announcement().is_none());
    }

    #[test]
    fn unknown_filter_is_ignored() {
        let (mut app, _rx) = app_with(None, options());
        app.select_filter("videos", Instant::now());
        assert_eq!(app.active_filter(), PostType::All);
        assert!(app.announcement().is_none());
    }

    #[test]
    fn end_to_end_with_worker() {
        let transport = ScriptedTransport::new(vec![
            Err(TransportError::Status(502)),
            Ok(page_html(&["Article", "Quotes"], Some("/page/2/"))),
            Ok(page_html(&["Notes"], None)),
        ]);
        let start = Url::parse("https://blog.example.com/").unwrap();
        let fetcher =
            PageFetcher::new(transport, start, RetryPolicy::default()).with_pause(|_| {});
        let worker = worker::spawn(fetcher);

        let store = Box::new(MemoryStore::default());
        let mut app = App::new(store, worker.requests.clone(), options(), Instant::now());
        let recv = |worker: &worker::FetchWorker| {
            worker
                .results
                .recv_timeout(Duration::from_secs(5))
                .unwrap()
        };

        let now = Instant::now();
        app.load_more(now);
        app.handle_worker_msg(recv(&worker), now);
        app.load_more(now);
        app.handle_worker_msg(recv(&worker), now);
        assert_eq!(app.grid.visible_len(), 3);
        assert_eq!(app.loader().cached_pages(), 2);

        app.load_more(now);
        app.handle_worker_msg(recv(&worker), now);
        assert!(app.loader().is_feed_exhausted());
    }

    // -- navigation ----------------------------------------------------------

    fn loaded_app(tags: &[&str]) -> App {
        let (mut app, _rx) = app_with(None, options());
        let now = Instant::now();
        app.load_more(now);
        app.handle_worker_msg(batch(1, tags, false), now);
        app
    }

    #[test]
    fn navigation_on_empty_is_noop() {
        let (mut app, _rx) = app_with(None, options());
        app.select_next();
        app.select_previous();
        app.select_first();
        app.select_last();
        assert!(app.list_state.selected().is_none());
        assert!(app.selected_post().is_none());
    }

    #[test]
    fn select_next_starts_at_zero_then_clamps() {
        let mut app = loaded_app(&["Notes", "Notes", "Notes"]);
        app.select_next();
        assert_eq!(app.list_state.selected(), Some(0));
        app.select_next();
        app.select_next();
        app.select_next();
        assert_eq!(app.list_state.selected(), Some(2));
    }

    #[test]
    fn select_previous_clamps_at_zero() {
        let mut app = loaded_app(&["Notes", "Notes"]);
        app.select_last();
        app.select_previous();
        app.select_previous();
        assert_eq!(app.list_state.selected(), Some(0));
    }

    #[test]
    fn narrowing_filter_keeps_selection_in_range() {
        let mut app = loaded_app(&["Article", "Article", "Notes", "Article"]);
        app.select_last();
        assert_eq!(app.list_state.selected(), Some(3));

        app.select_filter("notes", Instant::now());
        assert_eq!(app.list_state.selected(), Some(0));
        assert_eq!(app.selected_post().and_then(|p| p.tag_class()), Some("notes"));

        app.select_filter("bookmarks", Instant::now());
        assert!(app.list_state.selected().is_none());
    }
}
