//! URL ingestion: the work-queue, link file reader, content fetcher, and the
//! pipeline that turns pending URLs into classified news items.
//!
//! # Flow
//!
//! 1. [`links`] reads article URLs from a text file and enqueues them
//! 2. [`queue`] persists the deduplicated, status-tracked URL log
//! 3. [`fetcher`] downloads each pending URL and extracts title/body text
//! 4. [`pipeline`] summarizes and region-classifies each page (memoized in
//!    the JSON-lines caches) and emits [`crate::models::NewsItem`]s

pub mod fetcher;
pub mod links;
pub mod pipeline;
pub mod queue;

pub use queue::UrlQueue;
