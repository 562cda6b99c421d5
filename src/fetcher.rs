//! Fetching the next page of the feed.
//!
//! [`PageFetcher`] owns the page cursor and the loaded-page counter.  Each
//! call to [`fetch_next`](PageFetcher::fetch_next) issues at most
//! [`RetryPolicy::max_attempts`] requests for the cursor's target, parses the
//! winner, and advances the cursor.  Calls must be serialised by the caller;
//! the loader guarantees that by never requesting a fetch while one is in
//! flight.

use std::thread;
use std::time::Duration;

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use crate::retry::RetryPolicy;
use crate::source::page::parse_page;
use crate::source::{PostItem, Transport, TransportError};

/// One page worth of newly parsed posts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedBatch {
    /// Value of the loaded-page counter after this fetch (first page is 1).
    pub page: u32,
    /// Posts in document order; never empty.
    pub items: Vec<PostItem>,
    /// Whether the cursor still points somewhere after this fetch.
    pub has_next: bool,
}

/// Result of a fetch that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fetched {
    Batch(FetchedBatch),
    /// The cursor is gone, or the last page held no posts.  This is the
    /// normal end of the feed, not an error.
    NoMorePages,
}

#[derive(Debug, Error)]
pub enum FetchError {
    /// Every attempt failed; `last` is the final failure.
    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted {
        attempts: u32,
        #[source]
        last: TransportError,
    },
}

/// Sleep used between retries; injectable so tests need not wait.
pub type Pause = Box<dyn FnMut(Duration) + Send>;

pub struct PageFetcher<T> {
    transport: T,
    cursor: Option<Url>,
    loaded_pages: u32,
    policy: RetryPolicy,
    cache_bust: bool,
    pause: Pause,
}

impl<T: Transport> PageFetcher<T> {
    /// A fetcher whose first [`fetch_next`](Self::fetch_next) loads `start`.
    pub fn new(transport: T, start: Url, policy: RetryPolicy) -> Self {
        Self {
            transport,
            cursor: Some(start),
            loaded_pages: 0,
            policy,
            cache_bust: false,
            pause: Box::new(thread::sleep),
        }
    }

    /// Append a `t=<unix millis>` query parameter to every request.
    pub fn with_cache_busting(mut self, enabled: bool) -> Self {
        self.cache_bust = enabled;
        self
    }

    #[cfg(test)]
    pub fn with_pause(mut self, pause: impl FnMut(Duration) + Send + 'static) -> Self {
        self.pause = Box::new(pause);
        self
    }

    pub fn cursor(&self) -> Option<&Url> {
        self.cursor.as_ref()
    }

    pub fn loaded_pages(&self) -> u32 {
        self.loaded_pages
    }

    /// Retrieve and parse the page the cursor points at.
    ///
    /// The cursor and counter change only when a page with posts arrives.  A
    /// page without posts ends the feed: the cursor is cleared so every later
    /// call answers [`Fetched::NoMorePages`] without touching the network.
    pub fn fetch_next(&mut self) -> Result<Fetched, FetchError> {
        let Some(url) = self.cursor.clone() else {
            debug!("no cursor left, feed exhausted");
            return Ok(Fetched::NoMorePages);
        };

        let body = self.get_with_retry(&url)?;
        let page = parse_page(&body, &url);

        if page.items.is_empty() {
            info!(url = %url, "page has no posts, treating feed as exhausted");
            self.cursor = None;
            return Ok(Fetched::NoMorePages);
        }

        self.cursor = page.next;
        self.loaded_pages += 1;

        info!(
            page = self.loaded_pages,
            posts = page.items.len(),
            next = ?self.cursor.as_ref().map(Url::as_str),
            "loaded page"
        );

        Ok(Fetched::Batch(FetchedBatch {
            page: self.loaded_pages,
            items: page.items,
            has_next: self.cursor.is_some(),
        }))
    }

    fn get_with_retry(&mut self, url: &Url) -> Result<String, FetchError> {
        let mut attempt = 1;
        loop {
            let target = self.request_url(url);
            debug!(source = self.transport.name(), url = %target, attempt, "requesting page");

            match self.transport.get(&target) {
                Ok(body) => return Ok(body),
                Err(err) if attempt <= self.policy.max_retries => {
                    let delay = self.policy.delay_before(attempt);
                    warn!(
                        %err,
                        "retrying... attempt {attempt} of {}, waiting {delay:?}",
                        self.policy.max_attempts()
                    );
                    (self.pause)(delay);
                    attempt += 1;
                }
                Err(err) => {
                    warn!(%err, attempts = attempt, "giving up on page");
                    return Err(FetchError::Exhausted {
                        attempts: attempt,
                        last: err,
                    });
                }
            }
        }
    }

    fn request_url(&self, url: &Url) -> Url {
        if !self.cache_bust {
            return url.clone();
        }
        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(key, _)| key != "t")
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();
        let mut busted = url.clone();
        busted
            .query_pairs_mut()
            .clear()
            .extend_pairs(kept)
            .append_pair("t", &Utc::now().timestamp_millis().to_string());
        busted
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
