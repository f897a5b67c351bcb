//! Daily report assembly and export.
//!
//! The static site reads one JSON document per day from `docs/data/` plus an
//! `index.json` listing the available dates. Re-running the pipeline for a
//! date overwrites that date's document; the index keeps one entry per date,
//! newest first.

use serde::{Deserialize, Serialize};
use std::error::Error;
use tokio::fs;
use tracing::{info, instrument};

/// One day's fully rendered briefing, as consumed by the site frontend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyReport {
    pub date: String,
    pub news_html: String,
    pub news_china_html: String,
    pub news_nigeria_html: String,
    pub news_global_html: String,
    pub price_html: String,
    pub price_insight_html: String,
    pub daily_insight_html: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct DateIndex {
    dates: Vec<String>,
}

/// Write the report to `{docs_dir}/data/{date}.json` and refresh the index.
#[instrument(level = "info", skip_all, fields(docs_dir = %docs_dir, date = %report.date))]
pub async fn save_report(docs_dir: &str, report: &DailyReport) -> Result<(), Box<dyn Error>> {
    let data_dir = format!("{}/data", docs_dir);
    fs::create_dir_all(&data_dir).await?;

    let report_path = format!("{}/{}.json", data_dir, report.date);
    fs::write(&report_path, serde_json::to_string_pretty(report)?).await?;
    info!(path = %report_path, "Wrote daily report");

    update_index(&data_dir, &report.date).await?;
    Ok(())
}

/// Add a date to `index.json`, deduplicating and sorting newest first.
async fn update_index(data_dir: &str, date: &str) -> Result<(), Box<dyn Error>> {
    let index_path = format!("{}/index.json", data_dir);

    let mut index: DateIndex = match fs::read_to_string(&index_path).await {
        Ok(raw) => serde_json::from_str(&raw).unwrap_or_default(),
        Err(_) => DateIndex::default(),
    };

    if !index.dates.iter().any(|d| d == date) {
        index.dates.push(date.to_string());
    }
    index.dates.sort_by(|a, b| b.cmp(a));

    fs::write(&index_path, serde_json::to_string_pretty(&index)?).await?;
    info!(path = %index_path, count = index.dates.len(), "Updated date index");
    Ok(())
}
