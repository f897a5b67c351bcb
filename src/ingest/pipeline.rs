//! The queue-to-news pipeline.
//!
//! Turns pending queue records into deduplicated, classified, cached
//! [`NewsItem`]s: fetch → summary-cache check → AI summary → region-cache
//! check → AI region classification. A failure on one URL marks that record
//! failed and the batch proceeds; nothing here aborts the run.

use crate::api::AskAsync;
use crate::cache::{JsonlCache, RegionEntry, SummaryEntry};
use crate::classify::classify_region_ai;
use crate::ingest::fetcher::FetchContent;
use crate::ingest::queue::UrlQueue;
use crate::insights::summarize_industry;
use crate::models::{NewsItem, QueueStatus, RegionVerdict};
use chrono::NaiveDate;
use tracing::{debug, info, instrument, warn};

fn mark(queue: &UrlQueue, url: &str, status: QueueStatus) {
    if let Err(e) = queue.update_status(url, status) {
        warn!(%url, ?status, error = %e, "Failed to update queue status");
    }
}

/// Process every pending URL into a raw news item.
///
/// Summaries and region verdicts are memoized per URL in the JSON-lines
/// caches, so re-running after a partial failure only pays for the work
/// not already done.
#[instrument(level = "info", skip_all)]
pub async fn process_pending_urls<F: FetchContent, C: AskAsync>(
    queue: &UrlQueue,
    summaries: &JsonlCache<SummaryEntry>,
    regions: &JsonlCache<RegionEntry>,
    fetcher: &F,
    client: &C,
    today: NaiveDate,
) -> Vec<NewsItem> {
    let pending = queue.load_pending();
    if pending.is_empty() {
        info!("No pending URLs; skipping");
        return Vec::new();
    }

    let today_str = today.format("%Y-%m-%d").to_string();
    let mut results = Vec::new();

    for record in pending {
        let url = record.url;
        let source = record.source;
        info!(%url, ?source, "Processing queued URL");

        let Some(fetched) = fetcher.fetch(&url, source).await else {
            mark(queue, &url, QueueStatus::Failed);
            continue;
        };
        if fetched.text.trim().is_empty() {
            warn!(%url, "Fetch produced no text");
            mark(queue, &url, QueueStatus::Failed);
            continue;
        }

        let summary = match summaries.load(&url) {
            Some(entry) => {
                debug!(%url, "Summary cache hit");
                entry.summary
            }
            None => match summarize_industry(client, &fetched.text).await {
                Ok(summary) => {
                    if let Err(e) = summaries.save(&SummaryEntry::new(&url, &summary)) {
                        warn!(%url, error = %e, "Failed to write summary cache");
                    }
                    summary
                }
                Err(e) => {
                    warn!(%url, error = %e, "Summarization failed");
                    mark(queue, &url, QueueStatus::Failed);
                    continue;
                }
            },
        };

        let verdict = match regions.load(&url) {
            Some(entry) => {
                debug!(%url, region = %entry.region, "Region cache hit");
                RegionVerdict {
                    region: entry.region,
                    reason: entry.reason,
                }
            }
            None => {
                let verdict =
                    classify_region_ai(client, &fetched.title, &summary, &url, &fetched.text)
                        .await;
                if let Err(e) =
                    regions.save(&RegionEntry::new(&url, verdict.region, &verdict.reason))
                {
                    warn!(%url, error = %e, "Failed to write region cache");
                }
                verdict
            }
        };

        results.push(NewsItem {
            title: if fetched.title.is_empty() {
                url.clone()
            } else {
                fetched.title.clone()
            },
            summary,
            source: source.display_name().to_string(),
            link: url.clone(),
            pub_date: today_str.clone(),
            region: verdict.region,
        });

        mark(queue, &url, QueueStatus::Fetched);
    }

    info!(count = results.len(), "Queue pipeline produced news items");
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FetchedContent, Region, UrlSource};
    use std::collections::HashMap;
    use std::error::Error;

    struct PanicAsk;

    impl AskAsync for PanicAsk {
        async fn ask(&self, _prompt: &str) -> Result<String, Box<dyn Error>> {
            panic!("model must not be called");
        }
    }

    /// Answers every prompt with a document both the summarizer and the
    /// region classifier can parse.
    struct CannedAsk;

    impl AskAsync for CannedAsk {
        async fn ask(&self, _prompt: &str) -> Result<String, Box<dyn Error>> {
            Ok(r#"{"summary": "Canned summary.", "region": "china", "reason": "canned"}"#
                .to_string())
        }
    }

    /// Serves pages from a map; URLs not in the map fail to fetch.
    struct MapFetch {
        pages: HashMap<String, (String, String)>,
    }

    impl MapFetch {
        fn new(pages: &[(&str, &str, &str)]) -> Self {
            MapFetch {
                pages: pages
                    .iter()
                    .map(|(url, title, text)| {
                        (url.to_string(), (title.to_string(), text.to_string()))
                    })
                    .collect(),
            }
        }
    }

    impl FetchContent for MapFetch {
        async fn fetch(&self, url: &str, source: UrlSource) -> Option<FetchedContent> {
            self.pages.get(url).map(|(title, text)| FetchedContent {
                url: url.to_string(),
                source,
                title: title.clone(),
                html: String::new(),
                text: text.clone(),
            })
        }
    }

    fn stores(dir: &tempfile::TempDir) -> (UrlQueue, JsonlCache<SummaryEntry>, JsonlCache<RegionEntry>) {
        (
            UrlQueue::new(dir.path().join("incoming_urls.jsonl")),
            JsonlCache::new(dir.path().join("summary_cache.jsonl")),
            JsonlCache::new(dir.path().join("region_cache.jsonl")),
        )
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 5, 6).unwrap()
    }

    #[tokio::test]
    async fn test_empty_queue_short_circuits() {
        let dir = tempfile::tempdir().unwrap();
        let (queue, summaries, regions) = stores(&dir);

        let items = process_pending_urls(
            &queue,
            &summaries,
            &regions,
            &MapFetch::new(&[]),
            &PanicAsk,
            day(),
        )
        .await;

        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn test_failed_fetch_marks_record_and_batch_proceeds() {
        let dir = tempfile::tempdir().unwrap();
        let (queue, summaries, regions) = stores(&dir);
        queue.enqueue("https://example.com/down", None).unwrap();
        queue.enqueue("https://example.com/up", None).unwrap();

        let fetcher = MapFetch::new(&[("https://example.com/up", "Up", "Body text.")]);
        let items =
            process_pending_urls(&queue, &summaries, &regions, &fetcher, &CannedAsk, day()).await;

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].link, "https://example.com/up");
        assert_eq!(items[0].summary, "Canned summary.");

        let by_url: HashMap<String, QueueStatus> = queue
            .load_all()
            .into_iter()
            .map(|r| (r.url, r.status))
            .collect();
        assert_eq!(by_url["https://example.com/down"], QueueStatus::Failed);
        assert_eq!(by_url["https://example.com/up"], QueueStatus::Fetched);
    }

    #[tokio::test]
    async fn test_empty_extracted_text_marks_record_failed() {
        let dir = tempfile::tempdir().unwrap();
        let (queue, summaries, regions) = stores(&dir);
        queue.enqueue("https://example.com/hollow", None).unwrap();

        let fetcher = MapFetch::new(&[("https://example.com/hollow", "Hollow", "  \n ")]);
        let items =
            process_pending_urls(&queue, &summaries, &regions, &fetcher, &PanicAsk, day()).await;

        assert!(items.is_empty());
        assert_eq!(queue.load_all()[0].status, QueueStatus::Failed);
    }

    #[tokio::test]
    async fn test_cache_hits_skip_the_model() {
        let dir = tempfile::tempdir().unwrap();
        let (queue, summaries, regions) = stores(&dir);
        let url = "https://example.com/seen";
        queue.enqueue(url, None).unwrap();
        summaries.save(&SummaryEntry::new(url, "Cached summary.")).unwrap();
        regions
            .save(&RegionEntry::new(url, Region::Nigeria, "cached"))
            .unwrap();

        let fetcher = MapFetch::new(&[(url, "Seen", "Body text.")]);
        // PanicAsk proves neither the summarizer nor the classifier runs
        let items =
            process_pending_urls(&queue, &summaries, &regions, &fetcher, &PanicAsk, day()).await;

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].summary, "Cached summary.");
        assert_eq!(items[0].region, Region::Nigeria);
        assert_eq!(queue.load_all()[0].status, QueueStatus::Fetched);
    }
}
