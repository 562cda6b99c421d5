//! HTTP transport built on the blocking [`reqwest`] client.
//!
//! Requests identify themselves as background page loads
//! (`X-Requested-With: XMLHttpRequest`) so themes that render a slimmer
//! fragment for in-page loading can do so.  In development mode every
//! request also asks intermediaries not to cache (`Cache-Control: no-store`);
//! the cache-busting query parameter is added by the fetcher, which owns the
//! URL.

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, CACHE_CONTROL};
use url::Url;

use super::{Transport, TransportError};

/// Fetches pages over HTTP(S).
pub struct HttpTransport {
    client: Client,
    label: String,
}

impl HttpTransport {
    /// Create a transport.
    ///
    /// # Arguments
    ///
    /// * `label`: short name used in log lines (usually the feed host).
    /// * `dev_mode`: send `Cache-Control: no-store` with every request.
    pub fn new(label: impl Into<String>, dev_mode: bool) -> Result<Self, TransportError> {
        let mut headers = HeaderMap::new();
        headers.insert("X-Requested-With", HeaderValue::from_static("XMLHttpRequest"));
        if dev_mode {
            headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
        }

        let client = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            label: label.into(),
        })
    }
}

impl Transport for HttpTransport {
    fn name(&self) -> &str {
        &self.label
    }

    fn get(&self, url: &Url) -> Result<String, TransportError> {
        let response = self.client.get(url.clone()).send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }

        response
            .text()
            .map_err(|err| TransportError::Body(err.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::thread;

    /// Serve one canned response on loopback; returns the transport's result
    /// and the lowercased request head the server saw.
    fn exchange(
        dev_mode: bool,
        response: &'static str,
    ) -> (Result<String, TransportError>, String) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut head = String::new();
            loop {
                let mut line = String::new();
                if reader.read_line(&mut line).unwrap() == 0 || line == "\r\n" {
                    break;
                }
                head.push_str(&line);
            }
            stream.write_all(response.as_bytes()).unwrap();
            head.to_ascii_lowercase()
        });

        let transport = HttpTransport::new("loopback", dev_mode).unwrap();
        let url = Url::parse(&format!("http://{addr}/page/2/")).unwrap();
        let result = transport.get(&url);
        (result, server.join().unwrap())
    }

    const OK: &str = "HTTP/1.1 200 OK\r\nContent-Length: 2\r\nConnection: close\r\n\r\nok";

    #[test]
    fn requests_identify_as_background_loads() {
        let (body, head) = exchange(false, OK);
        assert_eq!(body.unwrap(), "ok");
        assert!(head.starts_with("get /page/2/ "), "head was: {head}");
        assert!(head.contains("x-requested-with: xmlhttprequest"), "head was: {head}");
        assert!(!head.contains("cache-control"), "head was: {head}");
    }

    #[test]
    fn dev_mode_requests_forbid_caching() {
        let (body, head) = exchange(true, OK);
        assert_eq!(body.unwrap(), "ok");
        assert!(head.contains("x-requested-with: xmlhttprequest"), "head was: {head}");
        assert!(head.contains("cache-control: no-store"), "head was: {head}");
    }

    #[test]
    fn non_success_status_is_an_error() {
        let (result, _) = exchange(
            false,
            "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        );
        assert!(matches!(result, Err(TransportError::Status(404))));
    }

    #[test]
    fn name_returns_label() {
        let transport = HttpTransport::new("blog.example.com", false).unwrap();
        assert_eq!(transport.name(), "blog.example.com");
    }

    #[test]
    fn builds_in_dev_mode() {
        assert!(HttpTransport::new("localhost", true).is_ok());
    }

    #[test]
    fn status_error_reads_like_http_failure() {
        assert_eq!(TransportError::Status(503).to_string(), "HTTP error! status: 503");
    }
}
