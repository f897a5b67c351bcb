//! Region classification for news items.
//!
//! Two paths exist:
//!
//! - [`classify_region_ai`]: the primary path. Delegates to the LLM with a
//!   specialized prompt and parses `{region, reason}` from the response.
//!   Never fails: any transport or parse error degrades to
//!   [`Region::Global`] with an empty reason.
//! - [`classify_region`]: a keyword/domain lookup heuristic, superseded by
//!   the AI path but kept as the documented intent. Priority order: known
//!   domain membership, keyword occurrence in title+summary, presence of
//!   CJK characters (defaults to china), otherwise global.

use crate::api::{AskAsync, parse_structured};
use crate::models::{Region, RegionVerdict};
use crate::prompts::region_prompt;
use crate::utils::truncate_for_log;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, instrument, warn};

const CHINA_KEYWORDS: &[&str] = &[
    "中国", "大陆", "内地", "光伏", "硅料", "硅片", "组件", "逆变器", "宁德时代", "隆基", "通威",
    "晶澳", "天合", "阳光电源", "上海", "北京", "深圳", "广州", "江苏", "浙江",
];

const NIGERIA_KEYWORDS: &[&str] = &[
    "尼日利亚", "nigeria", "lagos", "abuja", "kaduna", "kano", "nerc", "tcn", "disco", "genco",
];

const CHINA_DOMAINS: &[&str] = &[
    "mp.weixin.qq.com",
    "finance.sina.com.cn",
    "cailianpress.com",
    "36kr.com",
    "jiemian.com",
    "caixin.com",
];

const NIGERIA_DOMAINS: &[&str] = &[
    "nairametrics.com",
    "businessday.ng",
    "guardian.ng",
    "punchng.com",
];

static CJK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\u{4e00}-\u{9fff}]").unwrap());

/// Heuristic region classifier over title, summary, and link domain.
pub fn classify_region(title: &str, summary: &str, link: &str) -> Region {
    let link = link.to_lowercase();
    let text = format!("{} {}", title, summary).to_lowercase();

    // Domain membership is the strongest signal.
    if CHINA_DOMAINS.iter().any(|d| link.contains(d)) {
        return Region::China;
    }
    if NIGERIA_DOMAINS.iter().any(|d| link.contains(d)) {
        return Region::Nigeria;
    }

    if CHINA_KEYWORDS.iter().any(|k| text.contains(k)) {
        return Region::China;
    }
    if NIGERIA_KEYWORDS.iter().any(|k| text.contains(k)) {
        return Region::Nigeria;
    }

    if CJK_RE.is_match(&text) {
        return Region::China;
    }

    Region::Global
}

/// Classify a news item's region via the LLM.
///
/// Any failure (transport, exhausted retries, non-conforming JSON) yields
/// a [`Region::Global`] verdict with an empty reason instead of an error.
#[instrument(level = "info", skip_all, fields(%link))]
pub async fn classify_region_ai(
    client: &impl AskAsync,
    title: &str,
    summary: &str,
    link: &str,
    raw_text: &str,
) -> RegionVerdict {
    let prompt = region_prompt(title, summary, link, raw_text);

    let raw = match client.ask(&prompt).await {
        Ok(raw) => raw,
        Err(e) => {
            warn!(error = %e, "Region classification call failed; defaulting to global");
            return RegionVerdict::default();
        }
    };

    match parse_structured::<RegionVerdict>(&raw) {
        Ok(verdict) => {
            debug!(region = %verdict.region, "Region classified");
            verdict
        }
        Err(e) => {
            warn!(
                error = %e,
                response_preview = %truncate_for_log(&raw, 200),
                "Region response was not valid JSON; defaulting to global"
            );
            RegionVerdict::default()
        }
    }
}
