//! Per-calendar-day stage cache.
//!
//! Each pipeline stage stores its output as one JSON document under
//! `base/YYYY-MM-DD/{name}.json`, making repeated runs within a day
//! idempotent. The as-of date is injected at construction, so backfill runs
//! and tests can bind a namespace to any date.

use chrono::{Duration, NaiveDate};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::error::Error;
use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};

const DAY_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug)]
pub struct DailyCache {
    base: PathBuf,
    day: NaiveDate,
    day_dir: PathBuf,
}

impl DailyCache {
    /// Open the cache namespace for an explicit as-of date.
    pub fn for_date(base: impl Into<PathBuf>, day: NaiveDate) -> Result<Self, Box<dyn Error>> {
        let base = base.into();
        let day_dir = base.join(day.format(DAY_FORMAT).to_string());
        fs::create_dir_all(&day_dir)?;
        Ok(DailyCache { base, day, day_dir })
    }

    /// The as-of date this namespace is bound to.
    pub fn day(&self) -> NaiveDate {
        self.day
    }

    fn file(&self, name: &str) -> PathBuf {
        self.day_dir.join(format!("{name}.json"))
    }

    /// Whether a value for `name` exists for this day.
    pub fn exists(&self, name: &str) -> bool {
        self.file(name).exists()
    }

    /// Load the stage value stored under `name`.
    pub fn load<T: DeserializeOwned>(&self, name: &str) -> Result<T, Box<dyn Error>> {
        let raw = fs::read_to_string(self.file(name))?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Store a stage value under `name`. Dates inside `value` serialize to
    /// ISO-8601 strings via serde, so the stored JSON has no native types
    /// the reader side can't handle.
    pub fn save<T: Serialize>(&self, name: &str, value: &T) -> Result<(), Box<dyn Error>> {
        let json = serde_json::to_string_pretty(value)?;
        fs::write(self.file(name), json)?;
        Ok(())
    }

    /// Remove day directories older than `keep_days`, relative to this
    /// cache's as-of date. Directory names that don't parse as `YYYY-MM-DD`
    /// are skipped, never deleted.
    pub fn clean_old_cache(&self, keep_days: i64) {
        let cutoff = self.day - Duration::days(keep_days);

        let entries = match fs::read_dir(&self.base) {
            Ok(entries) => entries,
            Err(_) => return,
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let Ok(day) = NaiveDate::parse_from_str(name, DAY_FORMAT) else {
                continue;
            };
            if day < cutoff {
                match fs::remove_dir_all(&path) {
                    Ok(()) => info!(folder = name, "Removed old cache folder"),
                    Err(e) => warn!(folder = name, error = %e, "Failed to remove old cache folder"),
                }
            }
        }
    }
}
