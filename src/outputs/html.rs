//! HTML fragment rendering for the daily briefing.
//!
//! Everything here is pure string building: the fragments are embedded in
//! the report JSON and rendered client-side, so each function takes already
//! processed data and returns a fragment. All user-visible text passes
//! through [`escape_html`] since article titles and summaries come from
//! scraped pages and model output.

use crate::models::{AiArticle, DailyInsight, PriceInsight, PriceQuote};
use crate::utils::escape_html;
use std::fmt::Write;

/// Render a list of enriched articles as a sequence of article cards.
pub fn render_news_section(articles: &[AiArticle]) -> String {
    if articles.is_empty() {
        return "<p class=\"empty\">No articles today.</p>".to_string();
    }

    let mut out = String::new();
    for article in articles {
        writeln!(out, "<article class=\"news-card\" data-region=\"{}\">", article.region).unwrap();
        writeln!(
            out,
            "  <h3><a href=\"{}\" target=\"_blank\" rel=\"noopener\">{}</a></h3>",
            escape_html(&article.link),
            escape_html(&article.title)
        )
        .unwrap();
        writeln!(
            out,
            "  <p class=\"meta\">{} · {}</p>",
            escape_html(&article.source),
            escape_html(&article.pub_date)
        )
        .unwrap();

        paragraph(&mut out, "summary zh", &article.cn_summary);
        paragraph(&mut out, "summary en", &article.en_summary);
        bullet_list(&mut out, "insights zh", &article.cn_insights);
        bullet_list(&mut out, "insights en", &article.en_insights);
        labeled(&mut out, "Supply chain", &article.supply_chain);
        labeled(&mut out, "Nigeria impact", &article.nigeria_impact);
        labeled(&mut out, "Recommendation", &article.recommendation);

        writeln!(out, "</article>").unwrap();
    }
    out
}

fn paragraph(out: &mut String, class: &str, text: &str) {
    if !text.is_empty() {
        writeln!(out, "  <p class=\"{}\">{}</p>", class, escape_html(text)).unwrap();
    }
}

fn bullet_list(out: &mut String, class: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    writeln!(out, "  <ul class=\"{}\">", class).unwrap();
    for item in items {
        writeln!(out, "    <li>{}</li>", escape_html(item)).unwrap();
    }
    writeln!(out, "  </ul>").unwrap();
}

fn labeled(out: &mut String, label: &str, text: &str) {
    if !text.is_empty() {
        writeln!(
            out,
            "  <p class=\"aspect\"><strong>{}:</strong> {}</p>",
            label,
            escape_html(text)
        )
        .unwrap();
    }
}

/// Render fetched price quotes as a table.
pub fn render_price_table(quotes: &[PriceQuote]) -> String {
    if quotes.is_empty() {
        return "<p class=\"empty\">No price data today.</p>".to_string();
    }

    let mut out = String::new();
    writeln!(out, "<table class=\"price-table\">").unwrap();
    writeln!(
        out,
        "  <thead><tr><th>Item</th><th>Price</th><th>Change</th><th>Source</th></tr></thead>"
    )
    .unwrap();
    writeln!(out, "  <tbody>").unwrap();
    for quote in quotes {
        writeln!(
            out,
            "    <tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            escape_html(&quote.item),
            escape_html(&quote.price),
            escape_html(&quote.change),
            escape_html(&quote.source)
        )
        .unwrap();
    }
    writeln!(out, "  </tbody>").unwrap();
    writeln!(out, "</table>").unwrap();
    out
}

/// Render the daily takeaways as a titled bullet list.
pub fn render_daily_insight(insight: &DailyInsight) -> String {
    let mut out = String::new();
    writeln!(out, "<div class=\"daily-insight\">").unwrap();
    writeln!(out, "  <h3>{}</h3>", escape_html(&insight.title)).unwrap();
    writeln!(out, "  <ul>").unwrap();
    for point in &insight.points {
        writeln!(out, "    <li>{}</li>", escape_html(point)).unwrap();
    }
    writeln!(out, "  </ul>").unwrap();
    writeln!(out, "</div>").unwrap();
    out
}

/// Render the price impact analysis as titled subsections.
pub fn render_price_insight(insight: &PriceInsight) -> String {
    let mut out = String::new();
    writeln!(out, "<div class=\"price-insight\">").unwrap();
    writeln!(out, "  <h3>{}</h3>", escape_html(&insight.title)).unwrap();
    for section in &insight.sections {
        writeln!(out, "  <h4>{}</h4>", escape_html(&section.subtitle)).unwrap();
        writeln!(out, "  <p>{}</p>", escape_html(&section.content)).unwrap();
    }
    writeln!(out, "</div>").unwrap();
    out
}
