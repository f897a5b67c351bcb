//! Scrapers for non-queue data sources.
//!
//! Currently just [`prices`], the config-driven commodity price fetcher.
//! Scrapers share the pattern of the content fetcher: transport failures
//! are logged and yield empty results instead of aborting the run.

pub mod prices;
