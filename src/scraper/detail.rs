//! Per-company detail page parser: issue metadata, schedule table,
//! about narrative, strengths/risks bullets.

use scraper::{ElementRef, Html};
use tracing::{debug, warn};

use super::{cleaner, sel, ScrapeError};
use crate::models::{AboutText, IpoDetail, ScheduleEvent};

pub fn parse_detail_page(html: &str) -> Result<IpoDetail, ScrapeError> {
    let doc = Html::parse_document(html);

    let meta = doc
        .select(&sel("div.ipo-meta"))
        .next()
        .ok_or(ScrapeError::Structure("div.ipo-meta"))?;

    // The meta block is positional: columns are identified by width class.
    let listing_date = nth_value(meta, "div.four.columns", 1)
        .filter(|v| v != "-")
        .and_then(|v| cleaner::parse_listing_date(&v));
    let price_range = nth_value(meta, "div.three.columns", 0)
        .map(|v| cleaner::parse_price_range(&v));
    debug!("detail meta: listing {:?}, price band {:?}", listing_date, price_range);

    let issue_size = nth_value(meta, "div.two.columns", 0).filter(|v| v != "–");

    let (size_per_lot, min_investment) = match meta
        .select(&sel("div.three.columns div.text-12"))
        .next()
    {
        Some(fragment) => {
            cleaner::parse_lot_size(cleaner::clean_text(&fragment.text().collect::<String>()).as_str())
        }
        // Lot size simply not published yet; not an error.
        None => (None, None),
    };

    let schedule = parse_schedule(&doc);
    let about = parse_about(&doc);

    Ok(IpoDetail {
        issue_size,
        size_per_lot,
        min_investment,
        schedule,
        about,
        strengths: section_bullets(&doc, "Strengths"),
        risks: section_bullets(&doc, "Risks"),
    })
}

/// Trimmed text of the `.value` inside the n-th column of the given class.
fn nth_value(meta: ElementRef, column: &'static str, n: usize) -> Option<String> {
    let text = meta
        .select(&sel(column))
        .nth(n)?
        .select(&sel("div.value"))
        .next()?
        .text()
        .collect::<String>();
    Some(text.trim().to_string())
}

/// Schedule rows in document order; upstream does not sort them.
fn parse_schedule(doc: &Html) -> Vec<ScheduleEvent> {
    let Some(table) = doc.select(&sel("table.ipo-schedule")).next() else {
        return Vec::new();
    };

    let mut schedule = Vec::new();
    for row in table.select(&sel("tr")) {
        let label = row
            .select(&sel("td.ipo-schedule-label"))
            .next()
            .map(|td| td.text().collect::<String>().trim().to_string());
        let date_text = row
            .select(&sel("td.ipo-schedule-date"))
            .next()
            .map(|td| td.text().collect::<String>().trim().to_string());

        match (label, date_text) {
            (Some(label), Some(date_text)) => schedule.push(ScheduleEvent {
                event: cleaner::to_slug(&label),
                date: cleaner::parse_schedule_date(&date_text),
                event_title: label,
            }),
            _ => warn!("Skipping malformed schedule row"),
        }
    }
    schedule
}

/// Prefer the single designated paragraph in the last six-column block of the
/// last row; fall back to every paragraph under the generic container.
fn parse_about(doc: &Html) -> AboutText {
    let Some(section) = doc.select(&sel("section#ipo")).next() else {
        warn!("section#ipo missing; about text unavailable");
        return AboutText::default();
    };

    let designated = section
        .select(&sel("div.row"))
        .last()
        .and_then(|row| row.select(&sel("div.six.columns")).last())
        .and_then(|col| col.select(&sel("p")).next());

    if let Some(p) = designated {
        let text = p.text().collect::<String>().trim().to_string();
        return AboutText(vec![text]);
    }

    let mut paragraphs = Vec::new();
    if let Some(container) = section.select(&sel("div.mini-container")).next() {
        for p in container.select(&sel("p")) {
            let text = p.text().collect::<String>().trim().to_string();
            if !text.is_empty() {
                paragraphs.push(text);
            }
        }
    }
    AboutText(paragraphs)
}

/// Bullets of the list that immediately follows a `Strengths`/`Risks`
/// heading (either heading level). Absent heading yields an empty list so
/// callers can iterate without null checks.
fn section_bullets(doc: &Html, heading: &str) -> Vec<String> {
    let mut after_heading = false;

    for el in doc.select(&sel("h2, h3, ul")) {
        if el.value().name() == "ul" {
            if after_heading {
                return el
                    .select(&sel("li"))
                    .map(|li| li.text().collect::<String>().trim().to_string())
                    .collect();
            }
        } else if el.text().collect::<String>().trim() == heading {
            after_heading = true;
        }
    }
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><body>
        <div class="ipo-meta">
            <div class="four columns"><div class="value">25–27 Sep 2024</div></div>
            <div class="four columns"><div class="value">4 Oct 2024</div></div>
            <div class="three columns">
                <div class="value">₹100 – ₹120</div>
                <div class="text-12">Lot size 125 — ₹15000</div>
            </div>
            <div class="two columns"><div class="value">₹500 Cr</div></div>
        </div>
        <table class="ipo-schedule">
            <tr>
                <td class="ipo-schedule-label">Issue open date</td>
                <td class="ipo-schedule-date">25 Sep 2024</td>
            </tr>
            <tr>
                <td class="ipo-schedule-label">Issue close date</td>
                <td class="ipo-schedule-date">27 Sep 2024 (5 PM)</td>
            </tr>
        </table>
        <section id="ipo">
            <div class="row"><div class="six columns"><p>ignored</p></div></div>
            <div class="row">
                <div class="six columns"><p>ignored too</p></div>
                <div class="six columns"><p>Acme makes widgets.</p></div>
            </div>
        </section>
        <h3>Strengths</h3>
        <ul><li>Large order book</li><li>Low debt</li></ul>
        <h2>Risks</h2>
        <ul><li>Customer concentration</li></ul>
    </body></html>"#;

    #[test]
    fn parses_full_detail_page() {
        let d = parse_detail_page(PAGE).unwrap();

        assert_eq!(d.issue_size.as_deref(), Some("₹500 Cr"));
        assert_eq!(d.size_per_lot, Some(125));
        assert_eq!(d.min_investment, Some(15000));
        assert_eq!(d.about.render(), "Acme makes widgets.");
        assert_eq!(d.strengths, vec!["Large order book", "Low debt"]);
        assert_eq!(d.risks, vec!["Customer concentration"]);

        assert_eq!(d.schedule.len(), 2);
        assert_eq!(d.schedule[0].event, "issue-open-date");
        assert_eq!(d.schedule[0].event_title, "Issue open date");
        assert_eq!(
            d.schedule[1].date.unwrap().to_rfc3339(),
            "2024-09-27T17:00:00+05:30"
        );
    }

    #[test]
    fn about_falls_back_to_joined_paragraphs() {
        let html = r#"<html><body>
            <div class="ipo-meta">
                <div class="two columns"><div class="value">–</div></div>
            </div>
            <section id="ipo">
                <div class="row"><div class="six columns"><span>no paragraph</span></div></div>
                <div class="mini-container"><p>First.</p><p>Second.</p></div>
            </section>
        </body></html>"#;

        let d = parse_detail_page(html).unwrap();
        assert_eq!(d.about.render(), "First. /n Second.");
        // en-dash issue size means "not announced"
        assert_eq!(d.issue_size, None);
        assert_eq!(d.size_per_lot, None);
        assert_eq!(d.min_investment, None);
        assert!(d.schedule.is_empty());
        assert!(d.strengths.is_empty());
        assert!(d.risks.is_empty());
    }

    #[test]
    fn missing_meta_block_is_structural() {
        assert_eq!(
            parse_detail_page("<html><body></body></html>").unwrap_err(),
            ScrapeError::Structure("div.ipo-meta")
        );
    }
}
