//! File-backed caches.
//!
//! - [`jsonl`]: append-only JSON-lines caches keyed by URL, memoizing the
//!   expensive per-URL AI summarization and region-classification results
//! - [`daily`]: per-calendar-day stage cache making repeated runs idempotent
//!   within a day

pub mod daily;
pub mod jsonl;

pub use daily::DailyCache;
pub use jsonl::{JsonlCache, RegionEntry, SummaryEntry};
