//! Data models for queued URLs, fetched pages, and processed news items.
//!
//! This module defines the core data structures used throughout the pipeline:
//! - [`QueueRecord`]: a URL in the persistent work-queue with its lifecycle status
//! - [`FetchedContent`]: transient title/body extraction result for one URL
//! - [`NewsItem`]: the raw news unit that flows into AI enrichment
//! - [`AiArticle`]: LLM-enriched article with bilingual summaries and insights
//! - [`RegionVerdict`]: region classification result with a reason string
//! - [`PriceQuote`]: one scraped commodity price row
//!
//! Wire formats (JSON-lines queue and cache files, per-day report documents)
//! serialize these types directly, so field names here are load-bearing.

use serde::{Deserialize, Serialize};
use url::Url;

/// Where a queued URL came from, which selects the extraction strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UrlSource {
    /// WeChat public-account article (`mp.weixin.qq.com`).
    Wechat,
    /// Any other web page.
    Web,
}

impl UrlSource {
    /// Infer the source type from the URL's host.
    ///
    /// `mp.weixin.qq.com` maps to [`UrlSource::Wechat`]; everything else,
    /// including unparseable URLs, maps to [`UrlSource::Web`].
    pub fn infer(url: &str) -> Self {
        match Url::parse(url) {
            Ok(parsed) => match parsed.host_str() {
                Some(host) if host.to_ascii_lowercase().contains("mp.weixin.qq.com") => {
                    UrlSource::Wechat
                }
                _ => UrlSource::Web,
            },
            Err(_) => UrlSource::Web,
        }
    }

    /// Human-readable source label used on rendered news items.
    pub fn display_name(&self) -> &'static str {
        match self {
            UrlSource::Wechat => "WeChat",
            UrlSource::Web => "External",
        }
    }
}

/// Lifecycle status of a [`QueueRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueStatus {
    /// Enqueued, not yet processed.
    Pending,
    /// Successfully fetched and summarized.
    Fetched,
    /// Fetch or summarization failed; not retried automatically.
    Failed,
    /// Returned by `enqueue` when the URL already exists; never persisted.
    Duplicate,
}

/// One line of the URL queue log (`incoming_urls.jsonl`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueRecord {
    pub url: String,
    pub source: UrlSource,
    /// UTC enqueue timestamp (`YYYY-MM-DDTHH:MM:SSZ`); `None` on duplicate
    /// records, which are never written to the log.
    pub added_at: Option<String>,
    pub status: QueueStatus,
}

/// Transient result of fetching and extracting one URL.
///
/// Produced by the content fetcher, consumed once by the summarizer;
/// never persisted as-is.
#[derive(Debug, Clone)]
pub struct FetchedContent {
    pub url: String,
    pub source: UrlSource,
    pub title: String,
    pub html: String,
    pub text: String,
}

/// Geographic region a news item is classified into.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    China,
    Nigeria,
    #[default]
    Global,
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Region::China => "china",
            Region::Nigeria => "nigeria",
            Region::Global => "global",
        };
        f.write_str(name)
    }
}

/// Region classification result: the region plus a short reason string.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionVerdict {
    pub region: Region,
    pub reason: String,
}

/// A raw news item produced by the queue pipeline, before AI enrichment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsItem {
    pub title: String,
    pub summary: String,
    /// Display label for the origin ("WeChat" or "External").
    pub source: String,
    pub link: String,
    /// `YYYY-MM-DD`; queue items always carry the run date.
    pub pub_date: String,
    pub region: Region,
}

/// A fully enriched news article as returned by the LLM.
///
/// Every field defaults so that a partially conforming model response still
/// deserializes; the pipeline overwrites `region` with the classifier's
/// verdict after parsing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AiArticle {
    pub title: String,
    pub source: String,
    pub link: String,
    pub pub_date: String,
    pub region: Region,
    pub cn_summary: String,
    pub en_summary: String,
    pub cn_insights: Vec<String>,
    pub en_insights: Vec<String>,
    pub supply_chain: String,
    pub nigeria_impact: String,
    pub recommendation: String,
}

impl AiArticle {
    /// Fallback document used when the model response cannot be parsed:
    /// carries the raw item fields through so nothing is silently dropped.
    pub fn fallback(item: &NewsItem) -> Self {
        AiArticle {
            title: item.title.clone(),
            source: item.source.clone(),
            link: item.link.clone(),
            pub_date: item.pub_date.clone(),
            region: item.region,
            cn_summary: item.summary.clone(),
            en_summary: item.summary.clone(),
            ..AiArticle::default()
        }
    }
}

/// One scraped commodity price row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceQuote {
    pub item: String,
    pub price: String,
    #[serde(default)]
    pub change: String,
    pub source: String,
}

/// Daily industry insight as returned by the LLM.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DailyInsight {
    pub title: String,
    pub points: Vec<String>,
}

impl DailyInsight {
    /// Safe default used when the model response cannot be parsed.
    pub fn parse_failure() -> Self {
        DailyInsight {
            title: "Daily Insight".to_string(),
            points: vec!["AI output could not be parsed.".to_string()],
        }
    }
}

/// Price impact analysis as returned by the LLM.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PriceInsight {
    pub title: String,
    pub sections: Vec<InsightSection>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InsightSection {
    pub subtitle: String,
    pub content: String,
}

impl PriceInsight {
    /// Safe default used when the model response cannot be parsed.
    pub fn parse_failure() -> Self {
        PriceInsight {
            title: "Price Impact Analysis".to_string(),
            sections: vec![InsightSection {
                subtitle: "Error".to_string(),
                content: "AI output could not be parsed.".to_string(),
            }],
        }
    }
}
