//! AI enrichment stages: summaries, article enrichment, and insights.
//!
//! Every function here is tolerant by design: transport failures and
//! non-conforming model output degrade to safe defaults rather than
//! propagating, so a bad response for one item never aborts the batch.
//! The one exception is [`summarize_industry`], whose transport errors
//! surface to the caller so the queue record can be marked failed.

use crate::api::{AskAsync, parse_structured, strip_code_fence};
use crate::models::{AiArticle, DailyInsight, NewsItem, PriceInsight, PriceQuote, Region};
use crate::prompts;
use crate::utils::{looks_truncated, truncate_for_log};
use serde::Deserialize;
use std::error::Error;
use tracing::{instrument, warn};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SummaryDoc {
    summary: String,
}

/// Industry-aware summary of raw page text.
///
/// The model is asked for `{"summary": "..."}`; if the response is not
/// valid JSON the raw text of the response is used as the summary instead
/// of losing the content.
///
/// # Errors
///
/// Propagates transport errors (after retries) so the caller can mark the
/// source record failed.
#[instrument(level = "info", skip_all)]
pub async fn summarize_industry(
    client: &impl AskAsync,
    text: &str,
) -> Result<String, Box<dyn Error>> {
    let raw = client.ask(&prompts::industry_summary_prompt(text)).await?;

    match parse_structured::<SummaryDoc>(&raw) {
        Ok(doc) if !doc.summary.trim().is_empty() => Ok(doc.summary),
        _ => {
            warn!(
                response_preview = %truncate_for_log(&raw, 200),
                "Summary response was not the expected JSON; using raw text"
            );
            Ok(strip_code_fence(&raw).to_string())
        }
    }
}

/// Enrich one news item into a structured bilingual article.
///
/// If the first response fails to parse because it was truncated, the model
/// is re-asked once. Any remaining failure yields [`AiArticle::fallback`].
/// The classifier's region always wins over whatever the model returned.
#[instrument(level = "info", skip_all, fields(link = %item.link))]
pub async fn enrich_article(client: &impl AskAsync, item: &NewsItem) -> AiArticle {
    let prompt = prompts::enrich_prompt(item);

    let raw = match client.ask(&prompt).await {
        Ok(raw) => raw,
        Err(e) => {
            warn!(error = %e, "Enrichment call failed; using fallback article");
            return AiArticle::fallback(item);
        }
    };

    let mut parsed = parse_structured::<AiArticle>(&raw);

    if let Err(ref e) = parsed {
        if looks_truncated(e) {
            warn!(error = %e, "EOF while parsing enrichment; re-asking once");
            if let Ok(raw2) = client.ask(&prompt).await {
                parsed = parse_structured::<AiArticle>(&raw2);
            }
        }
    }

    match parsed {
        Ok(mut article) => {
            // the classifier, not the model, decides the region
            article.region = item.region;
            if article.title.is_empty() {
                article.title = item.title.clone();
            }
            if article.link.is_empty() {
                article.link = item.link.clone();
            }
            if article.source.is_empty() {
                article.source = item.source.clone();
            }
            if article.pub_date.is_empty() {
                article.pub_date = item.pub_date.clone();
            }
            article
        }
        Err(e) => {
            warn!(
                error = %e,
                response_preview = %truncate_for_log(&raw, 200),
                "Model returned non-conforming JSON; using fallback article"
            );
            AiArticle::fallback(item)
        }
    }
}

/// Articles partitioned by market region for the site's tabbed sections.
#[derive(Debug, Default, Clone)]
pub struct RegionGroups {
    pub china: Vec<AiArticle>,
    pub nigeria: Vec<AiArticle>,
    pub global: Vec<AiArticle>,
}

/// Partition enriched articles into per-region groups, preserving order.
pub fn group_by_region(articles: Vec<AiArticle>) -> RegionGroups {
    let mut groups = RegionGroups::default();
    for article in articles {
        match article.region {
            Region::China => groups.china.push(article),
            Region::Nigeria => groups.nigeria.push(article),
            Region::Global => groups.global.push(article),
        }
    }
    groups
}

/// Analyze scraped commodity prices; parse failure yields the safe default.
#[instrument(level = "info", skip_all)]
pub async fn analyze_price_impact(
    client: &impl AskAsync,
    prices: &[PriceQuote],
) -> PriceInsight {
    let raw = match client.ask(&prompts::price_impact_prompt(prices)).await {
        Ok(raw) => raw,
        Err(e) => {
            warn!(error = %e, "Price impact call failed");
            return PriceInsight::parse_failure();
        }
    };

    parse_structured(&raw).unwrap_or_else(|e| {
        warn!(error = %e, "Price impact response was not valid JSON");
        PriceInsight::parse_failure()
    })
}

/// Generate the daily industry insight; parse failure yields the safe
/// default.
#[instrument(level = "info", skip_all)]
pub async fn generate_daily_insight(client: &impl AskAsync) -> DailyInsight {
    let raw = match client.ask(prompts::DAILY_INSIGHT).await {
        Ok(raw) => raw,
        Err(e) => {
            warn!(error = %e, "Daily insight call failed");
            return DailyInsight::parse_failure();
        }
    };

    parse_structured(&raw).unwrap_or_else(|e| {
        warn!(error = %e, "Daily insight response was not valid JSON");
        DailyInsight::parse_failure()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CannedAsk(&'static str);

    impl AskAsync for CannedAsk {
        async fn ask(&self, _prompt: &str) -> Result<String, Box<dyn Error>> {
            Ok(self.0.to_string())
        }
    }

    struct FailingAsk;

    impl AskAsync for FailingAsk {
        async fn ask(&self, _prompt: &str) -> Result<String, Box<dyn Error>> {
            Err("api down".into())
        }
    }

    fn item() -> NewsItem {
        NewsItem {
            title: "Polysilicon update".to_string(),
            summary: "Prices fell".to_string(),
            source: "WeChat".to_string(),
            link: "https://mp.weixin.qq.com/s/x".to_string(),
            pub_date: "2025-05-06".to_string(),
            region: Region::China,
        }
    }

    #[tokio::test]
    async fn test_summarize_parses_json_summary() {
        let canned = CannedAsk(r#"{"summary": "Polysilicon fell 3% this week."}"#);
        let summary = summarize_industry(&canned, "正文").await.unwrap();
        assert_eq!(summary, "Polysilicon fell 3% this week.");
    }

    #[tokio::test]
    async fn test_summarize_falls_back_to_raw_text() {
        let canned = CannedAsk("Polysilicon fell 3% this week.");
        let summary = summarize_industry(&canned, "正文").await.unwrap();
        assert_eq!(summary, "Polysilicon fell 3% this week.");
    }

    #[tokio::test]
    async fn test_summarize_propagates_transport_errors() {
        assert!(summarize_industry(&FailingAsk, "正文").await.is_err());
    }

    #[tokio::test]
    async fn test_enrich_overrides_model_region() {
        let canned =
            CannedAsk(r#"{"title": "Enriched", "region": "global", "en_summary": "Short."}"#);
        let article = enrich_article(&canned, &item()).await;
        assert_eq!(article.title, "Enriched");
        // classifier said china; the model does not get to overrule it
        assert_eq!(article.region, Region::China);
        assert_eq!(article.link, "https://mp.weixin.qq.com/s/x");
    }

    #[tokio::test]
    async fn test_enrich_falls_back_on_garbage() {
        let canned = CannedAsk("not json at all");
        let article = enrich_article(&canned, &item()).await;
        assert_eq!(article.title, "Polysilicon update");
        assert_eq!(article.en_summary, "Prices fell");
        assert_eq!(article.region, Region::China);
    }

    #[tokio::test]
    async fn test_enrich_falls_back_on_transport_error() {
        let article = enrich_article(&FailingAsk, &item()).await;
        assert_eq!(article.title, "Polysilicon update");
    }

    #[tokio::test]
    async fn test_price_impact_defaults_on_failure() {
        let insight = analyze_price_impact(&FailingAsk, &[]).await;
        assert_eq!(insight.sections[0].subtitle, "Error");
    }

    #[tokio::test]
    async fn test_daily_insight_parses() {
        let canned = CannedAsk(r#"{"title": "Daily Insight", "points": ["a", "b"]}"#);
        let insight = generate_daily_insight(&canned).await;
        assert_eq!(insight.points.len(), 2);
    }

    #[tokio::test]
    async fn test_daily_insight_defaults_on_garbage() {
        let canned = CannedAsk("no structure here");
        let insight = generate_daily_insight(&canned).await;
        assert_eq!(insight.points, vec!["AI output could not be parsed.".to_string()]);
    }

    #[test]
    fn test_group_by_region_partitions_in_order() {
        let mk = |title: &str, region| AiArticle {
            title: title.to_string(),
            region,
            ..Default::default()
        };
        let groups = group_by_region(vec![
            mk("a", Region::China),
            mk("b", Region::Global),
            mk("c", Region::China),
            mk("d", Region::Nigeria),
        ]);

        assert_eq!(groups.china.len(), 2);
        assert_eq!(groups.china[0].title, "a");
        assert_eq!(groups.china[1].title, "c");
        assert_eq!(groups.nigeria.len(), 1);
        assert_eq!(groups.global.len(), 1);
    }
}
