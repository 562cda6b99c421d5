//! Transport abstraction and page parsing.
//!
//! This module defines the [`Transport`] trait and the common [`PostItem`]
//! type.  The real HTTP implementation lives in [`http`]; markup parsing lives
//! in [`page`].
//!
//! ## For contributors: adding a new transport
//!
//! 1. Create a new file in this directory (e.g. `file.rs` for reading saved
//!    pages from disk).
//! 2. Define a struct and implement [`Transport`] for it.
//! 3. Add `mod file;` below and re-export your struct in the `pub use` block.
//! 4. Construct it in `main.rs` and hand it to [`crate::fetcher::PageFetcher`].
//!
//! The fetcher, retry policy and loader do not care where the bytes come from.

mod http;
pub mod page;
mod post_item;

pub use http::HttpTransport;
pub use post_item::PostItem;

use thiserror::Error;
use url::Url;

/// Why a single request did not yield a usable body.
///
/// Every variant is retryable; the fetcher decides how many times.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection, TLS, timeout or protocol failure.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("HTTP error! status: {0}")]
    Status(u16),

    /// The body could not be read or decoded.
    #[error("unreadable response body: {0}")]
    Body(String),
}

/// Trait that every page transport must implement.
///
/// [`get()`](Transport::get) runs on the fetch worker thread, so
/// implementations must be [`Send`].
///
/// ## Implementing a new transport
///
/// ```ignore
/// pub struct MyTransport { /* config fields */ }
///
/// impl Transport for MyTransport {
///     fn name(&self) -> &str { "my-transport" }
///
///     fn get(&self, url: &Url) -> Result<String, TransportError> {
///         // Perform the I/O and return the raw markup.
///         todo!()
///     }
/// }
/// ```
pub trait Transport: Send {
    /// Human-readable label used in log lines.
    fn name(&self) -> &str;

    /// Fetch one document and return its body as text.
    fn get(&self, url: &Url) -> Result<String, TransportError>;
}
