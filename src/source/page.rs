//! Markup parsing for fetched feed pages.
//!
//! A page is any HTML document in which posts are rendered as `.post`
//! elements, each with a `.primary-tag` descendant naming its category, and
//! where the following page is announced by `<link rel="next" href="…">` (an
//! `<a rel="next">` is accepted as a fallback).  No `next` link means the
//! feed ends with this page.

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};
use url::Url;

use super::PostItem;

static POST: Lazy<Selector> = Lazy::new(|| selector(".post"));
static PRIMARY_TAG: Lazy<Selector> = Lazy::new(|| selector(".primary-tag"));
static NEXT_LINK: Lazy<Selector> = Lazy::new(|| selector(r#"link[rel="next"][href]"#));
static NEXT_ANCHOR: Lazy<Selector> = Lazy::new(|| selector(r#"a[rel="next"][href]"#));
static TITLE: Lazy<[Selector; 2]> =
    Lazy::new(|| [selector(".post-title"), selector("h1, h2, h3")]);
static EXCERPT: Lazy<[Selector; 2]> = Lazy::new(|| [selector(".post-excerpt"), selector("p")]);
static PERMALINK: Lazy<[Selector; 2]> = Lazy::new(|| {
    [
        selector(".post-title a[href], h1 a[href], h2 a[href], h3 a[href]"),
        selector("a[href]"),
    ]
});

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector is valid CSS")
}

/// Everything the fetcher needs from one page.
#[derive(Debug, Default)]
pub struct ParsedPage {
    /// Posts in document order.
    pub items: Vec<PostItem>,
    /// Absolute URL of the following page, if the document links one.
    pub next: Option<Url>,
}

/// Parse a fetched document.
///
/// `base` is the URL the document was fetched from; relative post links and
/// the `next` link are resolved against it.  This is a pure function so the
/// fetcher's tests can feed it canned markup.
pub fn parse_page(body: &str, base: &Url) -> ParsedPage {
    let document = Html::parse_document(body);

    let items: Vec<PostItem> = document
        .select(&POST)
        .map(|post| parse_post(post, base))
        .collect();

    let next = document
        .select(&NEXT_LINK)
        .chain(document.select(&NEXT_ANCHOR))
        .find_map(|el| el.value().attr("href"))
        .and_then(|href| match base.join(href.trim()) {
            Ok(url) => Some(url),
            Err(err) => {
                warn!(%href, %err, "ignoring unparseable next link");
                None
            }
        });

    debug!(posts = items.len(), next = ?next.as_ref().map(Url::as_str), "parsed page");
    ParsedPage { items, next }
}

fn parse_post(post: ElementRef<'_>, base: &Url) -> PostItem {
    // Raw text: classification maps every stray character, whitespace
    // included, to its own hyphen.
    let primary_tag = post
        .select(&PRIMARY_TAG)
        .next()
        .map(|el| el.text().collect::<String>());

    let title = first_text(post, &*TITLE).unwrap_or_else(|| "(untitled)".into());
    let excerpt = first_text(post, &*EXCERPT);

    let link = PERMALINK
        .iter()
        .find_map(|sel| post.select(sel).find_map(|a| a.value().attr("href")))
        .and_then(|href| base.join(href.trim()).ok())
        .map(String::from);

    PostItem::new(post.html(), title, link, excerpt, primary_tag)
}

/// Text of the first element matched by the earliest selector that matches
/// anything non-empty.
fn first_text(post: ElementRef<'_>, selectors: &[Selector]) -> Option<String> {
    selectors.iter().find_map(|sel| {
        post.select(sel)
            .map(text_of)
            .find(|text| !text.is_empty())
    })
}

/// Concatenated descendant text with whitespace runs collapsed.
fn text_of(el: ElementRef<'_>) -> String {
    el.text()
        .flat_map(|chunk| chunk.split_whitespace())
        .collect::<Vec<_>>()
        .join(" ")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
