//! Background page fetching.
//!
//! Runs the [`PageFetcher`] on a dedicated thread so retries and their
//! back-off sleeps never block the UI.  The event loop sends one
//! [`FetchRequest`] per load-more cycle and receives exactly one
//! [`WorkerMsg`] back for it.
//!
//! ## For contributors
//!
//! The worker is deliberately dumb: it processes requests strictly in order
//! and keeps no state besides the fetcher.  Serialising requests is the
//! loader's job; the worker only guarantees that cursor advancement happens
//! in request order.

use std::sync::mpsc;
use std::thread;

use tracing::debug;

use crate::fetcher::{Fetched, PageFetcher};
use crate::loader::LoaderEvent;
use crate::source::Transport;

/// Ask the worker for the next page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchRequest;

/// Messages sent from the worker thread to the event loop.
#[derive(Debug)]
pub enum WorkerMsg {
    /// A page arrived, or the feed is over.
    Fetched(Fetched),
    /// Every attempt failed; carries the error description.
    Failed(String),
}

impl WorkerMsg {
    pub fn into_event(self) -> LoaderEvent {
        match self {
            WorkerMsg::Fetched(Fetched::Batch(batch)) => LoaderEvent::FetchSucceeded(batch),
            WorkerMsg::Fetched(Fetched::NoMorePages) => LoaderEvent::NoMorePages,
            WorkerMsg::Failed(reason) => LoaderEvent::FetchFailed(reason),
        }
    }
}

/// Handles held by the event loop.
pub struct FetchWorker {
    pub requests: mpsc::Sender<FetchRequest>,
    pub results: mpsc::Receiver<WorkerMsg>,
}

/// Spawn the worker thread.
///
/// The thread exits when the request sender is dropped, or when the result
/// receiver is gone.
pub fn spawn<T: Transport + 'static>(mut fetcher: PageFetcher<T>) -> FetchWorker {
    let (request_tx, request_rx) = mpsc::channel::<FetchRequest>();
    let (result_tx, result_rx) = mpsc::channel();

    thread::spawn(move || {
        for FetchRequest in request_rx {
            let msg = match fetcher.fetch_next() {
                Ok(fetched) => WorkerMsg::Fetched(fetched),
                Err(err) => WorkerMsg::Failed(err.to_string()),
            };
            debug!(
                pages = fetcher.loaded_pages(),
                next = ?fetcher.cursor().map(|u| u.as_str()),
                "fetch finished"
            );
            // If the receiver is gone the main thread has exited;
            // silently stop fetching.
            if result_tx.send(msg).is_err() {
                return;
            }
        }
        debug!("fetch worker shutting down");
    });

    FetchWorker {
        requests: request_tx,
        results: result_rx,
    }
}
