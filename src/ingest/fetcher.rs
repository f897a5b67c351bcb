//! Content fetching and source-aware text extraction.
//!
//! Fetches a URL's HTML with a browser-like user agent and extracts
//! title/body text. Two strategies:
//!
//! - **wechat**: title from `#activity-name` (falling back to `<title>`),
//!   body from `#js_content` (falling back to `<body>`), stripping
//!   `script`/`style`
//! - **generic**: title from `<title>`, body from the first of
//!   `<article>` / `<main>` / `div#content` / `<body>`, additionally
//!   stripping `nav`/`footer`/`header`
//!
//! Transport errors are soft failures: the function returns `None` and the
//! caller marks the queue record failed.

use crate::models::{FetchedContent, UrlSource};
use crate::utils::collapse_blank_lines;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Node, Selector};
use std::time::Duration;
use tracing::{debug, error, info, instrument};

const BROWSER_UA: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0 Safari/537.36";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

static HTTP: Lazy<reqwest::Client> = Lazy::new(|| {
    reqwest::Client::builder()
        .user_agent(BROWSER_UA)
        .timeout(REQUEST_TIMEOUT)
        .build()
        .expect("HTTP client construction cannot fail with static options")
});

/// Shared scraping client (browser UA, 15s timeout).
pub fn http_client() -> &'static reqwest::Client {
    &HTTP
}

/// Trait for fetching a URL and extracting its content.
///
/// The abstraction exists so the queue pipeline can be driven by test
/// doubles the same way [`AskAsync`](crate::api::AskAsync) stands in for
/// the model endpoint. The live implementation is [`HttpFetcher`].
pub trait FetchContent {
    /// Fetch the URL and extract title and body text; `None` on failure.
    async fn fetch(&self, url: &str, source: UrlSource) -> Option<FetchedContent>;
}

/// Live fetcher backed by the shared scraping client.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpFetcher;

impl FetchContent for HttpFetcher {
    async fn fetch(&self, url: &str, source: UrlSource) -> Option<FetchedContent> {
        fetch_and_extract(url, source).await
    }
}

/// Fetch a URL and extract its title and visible body text.
///
/// Returns `None` on any transport error; extraction itself never fails
/// (empty selections degrade to empty strings).
#[instrument(level = "info", skip_all, fields(%url, ?source))]
pub async fn fetch_and_extract(url: &str, source: UrlSource) -> Option<FetchedContent> {
    let html = match fetch_html(url).await {
        Ok(html) => html,
        Err(e) => {
            error!(%url, error = %e, "Fetch failed");
            return None;
        }
    };

    let (title, text) = match source {
        UrlSource::Wechat => extract_wechat(&html),
        UrlSource::Web => extract_generic(&html),
    };

    info!(title_chars = title.chars().count(), text_chars = text.chars().count(), "Extracted content");
    Some(FetchedContent {
        url: url.to_string(),
        source,
        title,
        html,
        text,
    })
}

async fn fetch_html(url: &str) -> Result<String, reqwest::Error> {
    let resp = HTTP.get(url).send().await?.error_for_status()?;
    resp.text().await
}

fn selector(css: &str) -> Selector {
    // only called with compile-time-known selectors
    Selector::parse(css).expect("static selector must parse")
}

/// Extract title + body from a WeChat article page.
pub fn extract_wechat(html: &str) -> (String, String) {
    let document = Html::parse_document(html);

    let title = first_text(&document, "#activity-name")
        .or_else(|| first_text(&document, "title"))
        .unwrap_or_default();

    let container = document
        .select(&selector("#js_content"))
        .next()
        .or_else(|| document.select(&selector("body")).next());

    let text = match container {
        Some(el) => container_text(el, &["script", "style"]),
        None => String::new(),
    };

    debug!(title_chars = title.chars().count(), "Extracted WeChat content");
    (title, text)
}

/// Extract title + body from a generic web page.
pub fn extract_generic(html: &str) -> (String, String) {
    let document = Html::parse_document(html);

    let title = first_text(&document, "title").unwrap_or_default();

    let container = ["article", "main", "div#content", "body"]
        .iter()
        .find_map(|css| document.select(&selector(css)).next());

    let text = match container {
        Some(el) => container_text(el, &["script", "style", "nav", "footer", "header"]),
        None => String::new(),
    };

    debug!(title_chars = title.chars().count(), "Extracted generic content");
    (title, text)
}

fn first_text(document: &Html, css: &str) -> Option<String> {
    document
        .select(&selector(css))
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Visible text of a container: text nodes joined line-wise, each trimmed,
/// with subtrees of the `skip` tags excluded and blank-line runs collapsed.
fn container_text(container: ElementRef<'_>, skip: &[&str]) -> String {
    let mut chunks = Vec::new();
    for child in container.children() {
        collect_text(child, skip, &mut chunks);
    }
    collapse_blank_lines(chunks.join("\n").trim())
}

fn collect_text(node: ego_tree::NodeRef<'_, Node>, skip: &[&str], out: &mut Vec<String>) {
    match node.value() {
        Node::Text(text) => {
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                out.push(trimmed.to_string());
            }
        }
        Node::Element(el) => {
            if skip.contains(&el.name()) {
                return;
            }
            for child in node.children() {
                collect_text(child, skip, out);
            }
        }
        _ => {}
    }
}
