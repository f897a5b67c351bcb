//! Config-driven commodity price scraping.
//!
//! Each configured source names a URL plus CSS selectors for its quote
//! rows. Selectors come from YAML, so a bad selector is a config problem:
//! it is logged and the source yields nothing rather than failing the run.

use crate::config::PriceSource;
use crate::ingest::fetcher::http_client;
use crate::models::PriceQuote;
use futures::stream::{self, StreamExt};
use scraper::{ElementRef, Html, Selector};
use tracing::{error, info, instrument, warn};

/// Fetch price quotes from every configured source, in order.
#[instrument(level = "info", skip_all, fields(sources = sources.len()))]
pub async fn fetch_all_prices(sources: &[PriceSource]) -> Vec<PriceQuote> {
    let quotes: Vec<PriceQuote> = stream::iter(sources)
        .then(|source| async move { fetch_source(source).await })
        .collect::<Vec<_>>()
        .await
        .into_iter()
        .flatten()
        .collect();

    info!(count = quotes.len(), "Fetched price quotes");
    quotes
}

async fn fetch_source(source: &PriceSource) -> Vec<PriceQuote> {
    let resp = match http_client().get(&source.url).send().await {
        Ok(resp) => resp,
        Err(e) => {
            error!(source = %source.name, error = %e, "Price fetch failed");
            return Vec::new();
        }
    };
    let html = match resp.error_for_status().map(|r| r.text()) {
        Ok(text) => match text.await {
            Ok(html) => html,
            Err(e) => {
                error!(source = %source.name, error = %e, "Price body read failed");
                return Vec::new();
            }
        },
        Err(e) => {
            error!(source = %source.name, error = %e, "Price fetch returned error status");
            return Vec::new();
        }
    };

    parse_rows(&html, source)
}

/// Parse quote rows out of a fetched document. Rows that are missing a
/// name or price cell are skipped with a warning.
pub fn parse_rows(html: &str, source: &PriceSource) -> Vec<PriceQuote> {
    let selectors = &source.selectors;

    let (Ok(row_sel), Ok(name_sel), Ok(price_sel)) = (
        Selector::parse(&selectors.item),
        Selector::parse(&selectors.name),
        Selector::parse(&selectors.price),
    ) else {
        warn!(source = %source.name, "Invalid price selectors in config");
        return Vec::new();
    };
    let change_sel = selectors
        .change
        .as_deref()
        .and_then(|css| Selector::parse(css).ok());

    let document = Html::parse_document(html);
    let mut quotes = Vec::new();

    for row in document.select(&row_sel) {
        let name = cell_text(row, &name_sel);
        let price = cell_text(row, &price_sel);

        let (Some(name), Some(price)) = (name, price) else {
            warn!(source = %source.name, "Skipping price row with missing cells");
            continue;
        };

        let change = change_sel
            .as_ref()
            .and_then(|sel| cell_text(row, sel))
            .unwrap_or_default();

        quotes.push(PriceQuote {
            item: name,
            price,
            change,
            source: source.name.clone(),
        });
    }

    quotes
}

fn cell_text(row: ElementRef<'_>, selector: &Selector) -> Option<String> {
    row.select(selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}
