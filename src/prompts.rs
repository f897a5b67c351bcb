//! Prompt templates and builders for the LLM calls.
//!
//! Templates use `{placeholder}` interpolation. Raw page text is cleaned of
//! HTML and Markdown residue, then truncated before interpolation to bound
//! request size: 2000 chars for region classification, 4000 chars for
//! summaries.

use crate::models::{NewsItem, PriceQuote};
use crate::utils::{clean_html, truncate_chars};

/// Character budget for raw text in the region-classification prompt.
pub const REGION_TEXT_BUDGET: usize = 2000;
/// Character budget for raw text in summary prompts.
pub const SUMMARY_TEXT_BUDGET: usize = 4000;

const INDUSTRY_SUMMARY: &str = "\
You are an analyst covering the energy industry. Write a concise, factual \
summary (3-5 sentences) of the article below, keeping concrete numbers, \
company names, and policy details. Respond with a JSON object of the form \
{\"summary\": \"...\"} and nothing else.";

const REGION_CLASSIFIER: &str = "\
Classify the market region of the news article below as exactly one of \
\"china\", \"nigeria\", or \"global\". China covers the Chinese PV and \
storage supply chain; Nigeria covers the Nigerian power sector. Respond \
with a JSON object of the form {\"region\": \"...\", \"reason\": \"...\"} \
and nothing else.";

const ENRICH_ARTICLE: &str = "\
You are preparing a bilingual daily energy-industry briefing. Given the \
news item below, respond with a JSON object containing: title, source, \
link, pub_date, region (china|nigeria|global), cn_summary, en_summary, \
cn_insights (array), en_insights (array), supply_chain, nigeria_impact, \
recommendation. Respond with the JSON object and nothing else.\n\n\
Summary: {summary}\nSource: {source}\nLink: {link}\nDate: {pub_date}";

const PRICE_IMPACT: &str = "\
Analyze the solar and storage commodity price quotes below. Explain likely \
drivers (policy, supply chain, FX) and their impact on module and battery \
costs. Respond with a JSON object of the form {\"title\": \"...\", \
\"sections\": [{\"subtitle\": \"...\", \"content\": \"...\"}]} and nothing \
else.\n\nPrice quotes: {price_list}";

pub const DAILY_INSIGHT: &str = "\
Summarize today's most important developments in the global solar, energy \
storage, and power markets as 3-5 short bullet points for an executive \
briefing. Respond with a JSON object of the form {\"title\": \"...\", \
\"points\": [\"...\"]} and nothing else.";

/// Heuristically detect the industry category from keywords in the text.
pub fn detect_industry(text: &str) -> &'static str {
    let t = text.to_lowercase();
    let any = |keywords: &[&str]| keywords.iter().any(|k| t.contains(k));

    if any(&["硅料", "硅片", "组件", "光伏", "n型", "p型", "电池片"]) {
        "pv"
    } else if any(&["储能", "bess", "电池", "并网", "系统集成"]) {
        "bess"
    } else if any(&["逆变器", "inverter", "mppt", "效率"]) {
        "inverter"
    } else if any(&["电价", "tariff", "nerc", "ferc", "电力市场"]) {
        "power"
    } else if any(&["europe", "germany", "海外", "出口"]) {
        "overseas"
    } else {
        "general"
    }
}

/// Industry-aware summary prompt for raw page text.
pub fn industry_summary_prompt(text: &str) -> String {
    let industry = detect_industry(text);
    let cleaned = clean_html(text);
    format!(
        "{INDUSTRY_SUMMARY}\n\nIndustry type: {industry}\n\nMain content (truncated):\n{}",
        truncate_chars(&cleaned, SUMMARY_TEXT_BUDGET)
    )
}

/// Region-classification prompt from title, summary, link, and raw text.
pub fn region_prompt(title: &str, summary: &str, link: &str, raw_text: &str) -> String {
    let cleaned = clean_html(raw_text);
    format!(
        "{REGION_CLASSIFIER}\n\nTitle: {title}\nSummary: {summary}\nLink: {link}\nBody (truncated): {}",
        truncate_chars(&cleaned, REGION_TEXT_BUDGET)
    )
}

/// Article-enrichment prompt for one news item.
pub fn enrich_prompt(item: &NewsItem) -> String {
    ENRICH_ARTICLE
        .replace("{summary}", &item.summary)
        .replace("{source}", &item.source)
        .replace("{link}", &item.link)
        .replace("{pub_date}", &item.pub_date)
}

/// Price impact analysis prompt over a list of scraped quotes.
pub fn price_impact_prompt(prices: &[PriceQuote]) -> String {
    let list = serde_json::to_string(prices).unwrap_or_else(|_| "[]".to_string());
    PRICE_IMPACT.replace("{price_list}", &list)
}
