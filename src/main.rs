//! # Energy Briefing
//!
//! A daily energy-industry intelligence pipeline that ingests article links,
//! fetches and extracts their content, runs them through an LLM for
//! summarization, region classification, and bilingual enrichment, scrapes
//! commodity price quotes, and publishes a per-date JSON report for a static
//! site.
//!
//! ## Usage
//!
//! ```sh
//! APP_ENV=prod LLM_API_KEY=sk-... energy_briefing --config-dir ./config
//! ```
//!
//! ## Architecture
//!
//! The application follows a pipeline architecture:
//! 1. **Ingestion**: Read new links into the durable URL queue
//! 2. **Fetching**: Download and extract pending articles (WeChat-aware)
//! 3. **Processing**: Summarize, classify by region, and enrich via the LLM,
//!    with per-URL memoization in JSON-lines caches
//! 4. **Prices**: Scrape configured commodity price sources
//! 5. **Output**: Render HTML fragments and export the dated report plus
//!    its date index
//!
//! Every expensive stage is cached per day, so re-running after a partial
//! failure resumes instead of repeating work.

use chrono::{Local, NaiveDate};
use clap::Parser;
use itertools::Itertools;
use std::error::Error;
use std::path::Path;
use std::time::Duration as StdDuration;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod cache;
mod classify;
mod cli;
mod config;
mod ingest;
mod insights;
mod models;
mod outputs;
mod prompts;
mod scrapers;
mod utils;

use api::{ChatClient, RetryAsk};
use cache::{DailyCache, JsonlCache, RegionEntry, SummaryEntry};
use cli::Cli;
use ingest::UrlQueue;
use ingest::fetcher::HttpFetcher;
use ingest::links::ingest_links;
use ingest::pipeline::process_pending_urls;
use insights::{RegionGroups, analyze_price_impact, generate_daily_insight, group_by_region};
use models::{AiArticle, NewsItem, PriceQuote};
use outputs::html;
use outputs::report::{DailyReport, save_report};
use scrapers::prices::fetch_all_prices;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("energy_briefing starting up");

    // Parse CLI
    let args = Cli::parse();
    debug!(?args.config_dir, ?args.as_of_date, "Parsed CLI arguments");

    let config = config::load_config(Path::new(&args.config_dir));

    let day = match args.as_of_date.as_deref() {
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|e| {
            error!(as_of_date = %raw, error = %e, "Invalid --as-of-date, expected YYYY-MM-DD");
            e
        })?,
        None => Local::now().date_naive(),
    };

    let daily = DailyCache::for_date(&config.paths.cache_dir, day)?;
    if config.cache.enabled {
        daily.clean_old_cache(config.cache.keep_days);
    }
    info!(date = %daily.day(), cache_enabled = config.cache.enabled, "Daily cache ready");

    // --- Ingest new links into the queue ---
    let queue = UrlQueue::new(config.paths.queue_file());
    let links_path = args
        .links_file
        .as_ref()
        .map(Path::new)
        .unwrap_or(config.paths.links_file.as_path());
    let added = ingest_links(&queue, links_path);
    info!(added, links_file = %links_path.display(), "Link ingestion complete");

    // --- LLM client ---
    let chat = ChatClient::from_config(&config.llm)?;
    let max_retries = chat.max_retries();
    let client = RetryAsk::new(chat, max_retries, StdDuration::from_secs(1));

    // --- Commodity prices ---
    let prices: Vec<PriceQuote> = if config.cache.enabled && daily.exists("prices") {
        let cached = daily.load("prices")?;
        info!("Loaded prices from daily cache");
        cached
    } else {
        let fetched = fetch_all_prices(&config.prices.sources).await;
        if config.cache.enabled {
            if let Err(e) = daily.save("prices", &fetched) {
                warn!(error = %e, "Failed to cache prices");
            }
        }
        fetched
    };

    // --- Fetch, summarize, and classify pending articles ---
    let summaries = JsonlCache::<SummaryEntry>::new(config.paths.summary_cache_file());
    let regions = JsonlCache::<RegionEntry>::new(config.paths.region_cache_file());

    let cached_news: Vec<NewsItem> = if config.cache.enabled && daily.exists("news_raw") {
        daily.load("news_raw")?
    } else {
        Vec::new()
    };
    let new_items =
        process_pending_urls(&queue, &summaries, &regions, &HttpFetcher, &client, day).await;

    let news: Vec<NewsItem> = cached_news
        .into_iter()
        .chain(new_items)
        .unique_by(|item| item.link.clone())
        .collect();
    if config.cache.enabled {
        if let Err(e) = daily.save("news_raw", &news) {
            warn!(error = %e, "Failed to cache raw news");
        }
    }
    info!(count = news.len(), "News items ready for enrichment");

    // --- AI enrichment ---
    let articles: Vec<AiArticle> = if config.cache.enabled && daily.exists("news_ai") {
        let cached = daily.load("news_ai")?;
        info!("Loaded enriched articles from daily cache");
        cached
    } else {
        let mut enriched = Vec::with_capacity(news.len());
        for item in &news {
            enriched.push(insights::enrich_article(&client, item).await);
        }
        if config.cache.enabled {
            if let Err(e) = daily.save("news_ai", &enriched) {
                warn!(error = %e, "Failed to cache enriched articles");
            }
        }
        enriched
    };

    let groups = if config.cache.enabled
        && daily.exists("china")
        && daily.exists("nigeria")
        && daily.exists("global")
    {
        RegionGroups {
            china: daily.load("china")?,
            nigeria: daily.load("nigeria")?,
            global: daily.load("global")?,
        }
    } else {
        let groups = group_by_region(articles.clone());
        if config.cache.enabled {
            for (name, group) in [
                ("china", &groups.china),
                ("nigeria", &groups.nigeria),
                ("global", &groups.global),
            ] {
                if let Err(e) = daily.save(name, group) {
                    warn!(name, error = %e, "Failed to cache region group");
                }
            }
        }
        groups
    };
    info!(
        china = groups.china.len(),
        nigeria = groups.nigeria.len(),
        global = groups.global.len(),
        "Articles grouped by region"
    );

    // --- Daily insights ---
    let price_insight = if config.cache.enabled && daily.exists("price_insight") {
        daily.load("price_insight")?
    } else {
        let insight = analyze_price_impact(&client, &prices).await;
        if config.cache.enabled {
            if let Err(e) = daily.save("price_insight", &insight) {
                warn!(error = %e, "Failed to cache price insight");
            }
        }
        insight
    };

    let daily_insight = if config.cache.enabled && daily.exists("daily_insight") {
        daily.load("daily_insight")?
    } else {
        let insight = generate_daily_insight(&client).await;
        if config.cache.enabled {
            if let Err(e) = daily.save("daily_insight", &insight) {
                warn!(error = %e, "Failed to cache daily insight");
            }
        }
        insight
    };

    // --- Render and export ---
    let report = DailyReport {
        date: day.format("%Y-%m-%d").to_string(),
        news_html: html::render_news_section(&articles),
        news_china_html: html::render_news_section(&groups.china),
        news_nigeria_html: html::render_news_section(&groups.nigeria),
        news_global_html: html::render_news_section(&groups.global),
        price_html: html::render_price_table(&prices),
        price_insight_html: html::render_price_insight(&price_insight),
        daily_insight_html: html::render_daily_insight(&daily_insight),
    };

    let docs_dir = config.paths.docs_dir.to_string_lossy();
    if let Err(e) = save_report(&docs_dir, &report).await {
        error!(error = %e, "Failed to export daily report");
        return Err(e);
    }

    // --- Queue maintenance ---
    match queue.cleanup(&config.queue) {
        Ok(cleanup) => {
            info!(kept = cleanup.kept, removed = cleanup.removed, "Queue cleanup complete")
        }
        Err(e) => warn!(error = %e, "Queue cleanup failed"),
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        articles = articles.len(),
        prices = prices.len(),
        date = %report.date,
        "Execution complete"
    );

    Ok(())
}
