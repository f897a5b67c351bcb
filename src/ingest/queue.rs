//! Persistent, deduplicated URL work-queue.
//!
//! The queue is a JSON-lines log: append-only for enqueue, full rewrite for
//! status updates and retention cleanup. No file locking — the pipeline is a
//! single-process batch job and each file has exactly one writing module.

use crate::config::QueueConfig;
use crate::models::{QueueRecord, QueueStatus, UrlSource};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashSet;
use std::error::Error;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

/// Handle to the queue log file.
#[derive(Debug, Clone)]
pub struct UrlQueue {
    path: PathBuf,
}

/// Counts reported by [`UrlQueue::cleanup`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CleanupReport {
    pub kept: usize,
    pub removed: usize,
}

impl UrlQueue {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        UrlQueue { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Add a URL to the queue, deduplicated against every prior record.
    ///
    /// The source is inferred from the domain when not given. Returns a
    /// `duplicate` record (no side effect) if the URL already exists
    /// anywhere in the log regardless of its status; otherwise appends a
    /// `pending` record stamped with the current UTC time.
    ///
    /// # Errors
    ///
    /// Fails on an empty URL (a contract violation, not a runtime
    /// condition) and on I/O errors writing the log.
    pub fn enqueue(
        &self,
        url: &str,
        source: Option<UrlSource>,
    ) -> Result<QueueRecord, Box<dyn Error>> {
        let url = url.trim();
        if url.is_empty() {
            return Err("URL cannot be empty".into());
        }

        let source = source.unwrap_or_else(|| UrlSource::infer(url));

        let existing: HashSet<String> = self.load_all().into_iter().map(|r| r.url).collect();
        if existing.contains(url) {
            return Ok(QueueRecord {
                url: url.to_string(),
                source,
                added_at: None,
                status: QueueStatus::Duplicate,
            });
        }

        let record = QueueRecord {
            url: url.to_string(),
            source,
            added_at: Some(Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()),
            status: QueueStatus::Pending,
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut line = serde_json::to_string(&record)?;
        line.push('\n');
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;

        Ok(record)
    }

    /// All parseable records in file order. Malformed lines are skipped.
    pub fn load_all(&self) -> Vec<QueueRecord> {
        let Ok(raw) = fs::read_to_string(&self.path) else {
            return Vec::new();
        };

        raw.lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| match serde_json::from_str::<QueueRecord>(line) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(path = %self.path.display(), error = %e, "Skipping malformed queue line");
                    None
                }
            })
            .collect()
    }

    /// Records whose status is exactly `pending`, in insertion order.
    pub fn load_pending(&self) -> Vec<QueueRecord> {
        self.load_all()
            .into_iter()
            .filter(|r| r.status == QueueStatus::Pending)
            .collect()
    }

    /// Set `status` on every record matching `url`, rewriting the log.
    pub fn update_status(&self, url: &str, status: QueueStatus) -> Result<(), Box<dyn Error>> {
        if !self.path.exists() {
            return Ok(());
        }

        let mut rows = self.load_all();
        for record in rows.iter_mut() {
            if record.url == url {
                record.status = status;
            }
        }
        self.rewrite(&rows)
    }

    /// Prune old records per the retention policy.
    ///
    /// A record is kept if `keep_pending` is set and it is pending, if its
    /// timestamp is missing or unparseable (fail open — ambiguous data is
    /// never silently lost), or if its timestamp falls within the retention
    /// window. Everything else is removed.
    #[instrument(level = "info", skip_all)]
    pub fn cleanup(&self, policy: &QueueConfig) -> Result<CleanupReport, Box<dyn Error>> {
        self.cleanup_at(policy, Utc::now())
    }

    fn cleanup_at(
        &self,
        policy: &QueueConfig,
        now: DateTime<Utc>,
    ) -> Result<CleanupReport, Box<dyn Error>> {
        if !self.path.exists() {
            info!("Queue file does not exist; skipping cleanup");
            return Ok(CleanupReport { kept: 0, removed: 0 });
        }

        let cutoff = now - Duration::days(policy.retention_days);

        let mut kept = Vec::new();
        let mut removed = 0usize;

        for record in self.load_all() {
            if policy.keep_pending && record.status == QueueStatus::Pending {
                kept.push(record);
                continue;
            }

            let parsed = record
                .added_at
                .as_deref()
                .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok());

            match parsed {
                // fail open on missing/unparseable timestamps
                None => kept.push(record),
                Some(ts) if ts.with_timezone(&Utc) >= cutoff => kept.push(record),
                Some(_) => removed += 1,
            }
        }

        if policy.backup {
            let backup = self.backup_path();
            if let Err(e) = fs::copy(&self.path, &backup) {
                warn!(path = %backup.display(), error = %e, "Queue backup failed; continuing");
            }
        }

        self.rewrite(&kept)?;

        let report = CleanupReport {
            kept: kept.len(),
            removed,
        };
        info!(kept = report.kept, removed = report.removed, "Queue cleanup complete");
        Ok(report)
    }

    fn backup_path(&self) -> PathBuf {
        let stem = self
            .path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("queue");
        self.path.with_file_name(format!("{stem}_backup.jsonl"))
    }

    fn rewrite(&self, records: &[QueueRecord]) -> Result<(), Box<dyn Error>> {
        let mut out = String::new();
        for record in records {
            out.push_str(&serde_json::to_string(record)?);
            out.push('\n');
        }
        fs::write(&self.path, out)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queue(dir: &tempfile::TempDir) -> UrlQueue {
        UrlQueue::new(dir.path().join("incoming_urls.jsonl"))
    }

    #[test]
    fn test_enqueue_infers_source() {
        let dir = tempfile::tempdir().unwrap();
        let q = queue(&dir);

        let wechat = q.enqueue("https://mp.weixin.qq.com/a", None).unwrap();
        assert_eq!(wechat.source, UrlSource::Wechat);

        let web = q.enqueue("https://example.com/b", None).unwrap();
        assert_eq!(web.source, UrlSource::Web);
    }

    #[test]
    fn test_enqueue_trims_whitespace() {
        let dir = tempfile::tempdir().unwrap();
        let q = queue(&dir);
        let record = q.enqueue("  https://example.com/a \n", None).unwrap();
        assert_eq!(record.url, "https://example.com/a");
    }

    #[test]
    fn test_enqueue_empty_url_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let q = queue(&dir);
        assert!(q.enqueue("   ", None).is_err());
    }

    #[test]
    fn test_enqueue_duplicate_has_no_side_effect() {
        let dir = tempfile::tempdir().unwrap();
        let q = queue(&dir);

        let first = q.enqueue("https://example.com/a", None).unwrap();
        assert_eq!(first.status, QueueStatus::Pending);
        assert!(first.added_at.is_some());

        let second = q.enqueue("https://example.com/a", None).unwrap();
        assert_eq!(second.status, QueueStatus::Duplicate);
        assert!(second.added_at.is_none());

        let raw = fs::read_to_string(q.path()).unwrap();
        assert_eq!(raw.lines().count(), 1);
    }

    #[test]
    fn test_duplicate_check_ignores_status() {
        let dir = tempfile::tempdir().unwrap();
        let q = queue(&dir);

        q.enqueue("https://example.com/a", None).unwrap();
        q.update_status("https://example.com/a", QueueStatus::Fetched)
            .unwrap();

        let again = q.enqueue("https://example.com/a", None).unwrap();
        assert_eq!(again.status, QueueStatus::Duplicate);
    }

    #[test]
    fn test_load_pending_filters_status() {
        let dir = tempfile::tempdir().unwrap();
        let q = queue(&dir);

        q.enqueue("https://example.com/a", None).unwrap();
        q.enqueue("https://example.com/b", None).unwrap();
        q.update_status("https://example.com/a", QueueStatus::Fetched)
            .unwrap();

        let pending = q.load_pending();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].url, "https://example.com/b");
    }

    #[test]
    fn test_load_pending_preserves_insertion_order() {
        let dir = tempfile::tempdir().unwrap();
        let q = queue(&dir);

        for i in 0..5 {
            q.enqueue(&format!("https://example.com/{i}"), None).unwrap();
        }

        let urls: Vec<String> = q.load_pending().into_iter().map(|r| r.url).collect();
        assert_eq!(
            urls,
            (0..5)
                .map(|i| format!("https://example.com/{i}"))
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_update_status_marks_failed() {
        let dir = tempfile::tempdir().unwrap();
        let q = queue(&dir);

        q.enqueue("https://example.com/a", None).unwrap();
        q.update_status("https://example.com/a", QueueStatus::Failed)
            .unwrap();

        assert!(q.load_pending().is_empty());
        assert_eq!(q.load_all()[0].status, QueueStatus::Failed);
    }

    #[test]
    fn test_load_all_skips_malformed_lines() {
        let dir = tempfile::tempdir().unwrap();
        let q = queue(&dir);
        q.enqueue("https://example.com/a", None).unwrap();

        let mut file = OpenOptions::new().append(true).open(q.path()).unwrap();
        file.write_all(b"{broken\n").unwrap();

        assert_eq!(q.load_all().len(), 1);
    }

    fn old_record(url: &str, status: QueueStatus, days_ago: i64) -> String {
        let ts = (Utc::now() - Duration::days(days_ago))
            .format("%Y-%m-%dT%H:%M:%SZ")
            .to_string();
        format!(
            r#"{{"url":"{url}","source":"web","added_at":"{ts}","status":"{}"}}"#,
            match status {
                QueueStatus::Pending => "pending",
                QueueStatus::Fetched => "fetched",
                QueueStatus::Failed => "failed",
                QueueStatus::Duplicate => "duplicate",
            }
        )
    }

    #[test]
    fn test_cleanup_keeps_pending_regardless_of_age() {
        let dir = tempfile::tempdir().unwrap();
        let q = queue(&dir);
        fs::write(
            q.path(),
            format!(
                "{}\n{}\n",
                old_record("https://example.com/old-pending", QueueStatus::Pending, 100),
                old_record("https://example.com/old-fetched", QueueStatus::Fetched, 100),
            ),
        )
        .unwrap();

        let policy = QueueConfig {
            retention_days: 7,
            keep_pending: true,
            backup: false,
        };
        let report = q.cleanup(&policy).unwrap();

        assert_eq!(report, CleanupReport { kept: 1, removed: 1 });
        let remaining = q.load_all();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].status, QueueStatus::Pending);
    }

    #[test]
    fn test_cleanup_zero_retention_removes_all_dated_non_pending() {
        let dir = tempfile::tempdir().unwrap();
        let q = queue(&dir);
        fs::write(
            q.path(),
            format!(
                "{}\n{}\n",
                old_record("https://example.com/a", QueueStatus::Fetched, 1),
                old_record("https://example.com/b", QueueStatus::Failed, 2),
            ),
        )
        .unwrap();

        let policy = QueueConfig {
            retention_days: 0,
            keep_pending: true,
            backup: false,
        };
        let report = q.cleanup(&policy).unwrap();
        assert_eq!(report, CleanupReport { kept: 0, removed: 2 });
    }

    #[test]
    fn test_cleanup_fails_open_on_bad_timestamp() {
        let dir = tempfile::tempdir().unwrap();
        let q = queue(&dir);
        fs::write(
            q.path(),
            concat!(
                r#"{"url":"https://example.com/a","source":"web","added_at":null,"status":"fetched"}"#,
                "\n",
                r#"{"url":"https://example.com/b","source":"web","added_at":"not-a-date","status":"fetched"}"#,
                "\n",
            ),
        )
        .unwrap();

        let policy = QueueConfig {
            retention_days: 0,
            keep_pending: true,
            backup: false,
        };
        let report = q.cleanup(&policy).unwrap();
        assert_eq!(report, CleanupReport { kept: 2, removed: 0 });
    }

    #[test]
    fn test_cleanup_recent_records_survive() {
        let dir = tempfile::tempdir().unwrap();
        let q = queue(&dir);
        fs::write(
            q.path(),
            format!(
                "{}\n{}\n",
                old_record("https://example.com/recent", QueueStatus::Fetched, 2),
                old_record("https://example.com/stale", QueueStatus::Fetched, 10),
            ),
        )
        .unwrap();

        let policy = QueueConfig::default();
        let report = q.cleanup(&policy).unwrap();
        assert_eq!(report, CleanupReport { kept: 1, removed: 1 });
        assert_eq!(q.load_all()[0].url, "https://example.com/recent");
    }

    #[test]
    fn test_cleanup_writes_backup_when_enabled() {
        let dir = tempfile::tempdir().unwrap();
        let q = queue(&dir);
        q.enqueue("https://example.com/a", None).unwrap();

        let policy = QueueConfig {
            retention_days: 7,
            keep_pending: true,
            backup: true,
        };
        q.cleanup(&policy).unwrap();

        assert!(dir.path().join("incoming_urls_backup.jsonl").exists());
    }

    #[test]
    fn test_cleanup_missing_file_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let q = queue(&dir);
        let report = q.cleanup(&QueueConfig::default()).unwrap();
        assert_eq!(report, CleanupReport { kept: 0, removed: 0 });
    }
}
