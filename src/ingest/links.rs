//! Link file ingestion.
//!
//! Reads WeChat article URLs from a newline-separated text file and
//! enqueues them. Deduplication happens in the queue itself; this module
//! only filters obviously invalid lines.

use crate::ingest::queue::UrlQueue;
use crate::models::{QueueStatus, UrlSource};
use std::path::Path;
use tracing::{info, instrument, warn};

const WECHAT_PREFIX: &str = "https://mp.weixin.qq.com";

/// Read WeChat article URLs from `path`.
///
/// Blank lines are skipped; non-WeChat URLs are logged and skipped. A
/// missing or unreadable file yields an empty list with a warning.
pub fn read_links_from_file(path: &Path) -> Vec<String> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Link file not readable");
            return Vec::new();
        }
    };

    let mut links = Vec::new();
    for line in raw.lines() {
        let url = line.trim();
        if url.is_empty() {
            continue;
        }
        if !url.starts_with(WECHAT_PREFIX) {
            info!(%url, "Skipped non-WeChat URL");
            continue;
        }
        links.push(url.to_string());
    }

    info!(count = links.len(), path = %path.display(), "Loaded WeChat URLs from link file");
    links
}

/// Enqueue every URL from the link file. Returns the number of newly added
/// (non-duplicate) records.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub fn ingest_links(queue: &UrlQueue, path: &Path) -> usize {
    let links = read_links_from_file(path);
    if links.is_empty() {
        info!("No valid WeChat article URLs found");
        return 0;
    }

    let mut added = 0usize;
    for url in &links {
        match queue.enqueue(url, Some(UrlSource::Wechat)) {
            Ok(record) if record.status == QueueStatus::Duplicate => {
                info!(%url, "Duplicate (skipped)");
            }
            Ok(_) => {
                info!(%url, "Added to queue");
                added += 1;
            }
            Err(e) => warn!(%url, error = %e, "Enqueue failed"),
        }
    }

    info!(added, total = links.len(), "Link ingestion complete");
    added
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_links_filters_non_wechat() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("links.txt");
        std::fs::write(
            &path,
            "https://mp.weixin.qq.com/s/a\n\nhttps://example.com/b\n  https://mp.weixin.qq.com/s/c  \n",
        )
        .unwrap();

        let links = read_links_from_file(&path);
        assert_eq!(
            links,
            vec![
                "https://mp.weixin.qq.com/s/a".to_string(),
                "https://mp.weixin.qq.com/s/c".to_string(),
            ]
        );
    }

    #[test]
    fn test_read_links_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_links_from_file(&dir.path().join("nope.txt")).is_empty());
    }

    #[test]
    fn test_ingest_links_counts_new_records_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("links.txt");
        std::fs::write(
            &path,
            "https://mp.weixin.qq.com/s/a\nhttps://mp.weixin.qq.com/s/b\nhttps://mp.weixin.qq.com/s/a\n",
        )
        .unwrap();

        let queue = UrlQueue::new(dir.path().join("incoming_urls.jsonl"));
        let added = ingest_links(&queue, &path);
        assert_eq!(added, 2);
        assert_eq!(queue.load_pending().len(), 2);
    }
}
