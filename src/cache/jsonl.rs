//! Append-only JSON-lines caches keyed by URL.
//!
//! Each cache is a log file with one JSON entry per line. `save` only ever
//! appends; `load` scans the whole file and returns the **last** entry whose
//! URL matches, so repeated saves for the same URL behave as last-write-wins.
//! Malformed lines are skipped with a warning, never fatal — the caches are
//! advisory and callers always carry a fallback computation path.
//!
//! There is no compaction: under daily-batch volume the logs stay small, and
//! the queue retention job bounds how long URLs keep getting re-saved.

use crate::models::Region;
use chrono::Local;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::error::Error;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tracing::warn;

/// An entry that can live in a [`JsonlCache`], keyed by URL.
pub trait Keyed {
    fn url(&self) -> &str;
}

/// A JSON-lines append log of `T` entries with URL lookup.
#[derive(Debug)]
pub struct JsonlCache<T> {
    path: PathBuf,
    _entry: PhantomData<T>,
}

impl<T> JsonlCache<T>
where
    T: Serialize + DeserializeOwned + Keyed,
{
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonlCache {
            path: path.into(),
            _entry: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Return the most recent entry for `url`, or `None` when the file is
    /// missing or holds no match. Malformed lines are skipped.
    pub fn load(&self, url: &str) -> Option<T> {
        let raw = fs::read_to_string(&self.path).ok()?;

        let mut found = None;
        for line in raw.lines() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<T>(line) {
                Ok(entry) => {
                    if entry.url() == url {
                        found = Some(entry);
                    }
                }
                Err(e) => {
                    warn!(path = %self.path.display(), error = %e, "Skipping malformed cache line");
                }
            }
        }
        found
    }

    /// Append an entry to the log, creating parent directories on first use.
    pub fn save(&self, entry: &T) -> Result<(), Box<dyn Error>> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut line = serde_json::to_string(entry)?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;
        Ok(())
    }
}

fn now_stamp() -> String {
    Local::now().format("%Y-%m-%dT%H:%M:%S").to_string()
}

/// One memoized summarization result.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SummaryEntry {
    pub url: String,
    pub summary: String,
    pub timestamp: String,
}

impl SummaryEntry {
    pub fn new(url: impl Into<String>, summary: impl Into<String>) -> Self {
        SummaryEntry {
            url: url.into(),
            summary: summary.into(),
            timestamp: now_stamp(),
        }
    }
}

impl Keyed for SummaryEntry {
    fn url(&self) -> &str {
        &self.url
    }
}

/// One memoized region-classification result.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RegionEntry {
    pub url: String,
    pub region: Region,
    pub reason: String,
    pub timestamp: String,
}

impl RegionEntry {
    pub fn new(url: impl Into<String>, region: Region, reason: impl Into<String>) -> Self {
        RegionEntry {
            url: url.into(),
            region,
            reason: reason.into(),
            timestamp: now_stamp(),
        }
    }
}

impl Keyed for RegionEntry {
    fn url(&self) -> &str {
        &self.url
    }
}
