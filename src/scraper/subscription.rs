//! Subscription-aggregate page parser: one `div.watermark` block per IPO,
//! each carrying a header table (name, dates, price band, last-updated line)
//! and a category/offered/applied/times figures table.

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, Utc};
use scraper::{ElementRef, Html};
use tracing::warn;

use super::{cleaner, sel};
use crate::models::{
    CategoryFigures, PriceRange, SubscriptionData, SubscriptionRecord,
};

/// `source_offset` is the UTC offset the source's "Last updated on" wall
/// clock is assumed to tick in; `today` supplies the default year for
/// year-less close dates.
pub fn parse_subscription_page(
    html: &str,
    source_offset: FixedOffset,
    today: NaiveDate,
) -> Vec<SubscriptionRecord> {
    let doc = Html::parse_document(html);

    let mut records = Vec::new();
    for (idx, block) in doc.select(&sel("div.watermark")).enumerate() {
        match parse_block(block, source_offset, today) {
            Some(record) => records.push(record),
            None => warn!("Skipping malformed subscription block {}", idx),
        }
    }
    records
}

fn parse_block(
    block: ElementRef,
    source_offset: FixedOffset,
    today: NaiveDate,
) -> Option<SubscriptionRecord> {
    let main_table = block.select(&sel("table")).next()?;
    let rows: Vec<ElementRef> = main_table.select(&sel("tr")).collect();

    let name_line = cleaner::clean_text(&rows.first()?.text().collect::<String>());
    let (name, ipo_type) = split_name_type(&name_line);

    let cells: Vec<String> = rows
        .get(1)?
        .select(&sel("td"))
        .map(|td| cleaner::clean_text(&td.text().collect::<String>()))
        .collect();
    let (open_date, close_date) = parse_date_window(cells.first()?, today);
    let price = parse_price_band(cells.last()?);

    let last_updated = block
        .select(&sel("p.text-center"))
        .next()
        .and_then(|p| {
            let text = cleaner::clean_text(&p.text().collect::<String>());
            parse_last_updated(&text, source_offset)
        });

    Some(SubscriptionRecord {
        name,
        ipo_type,
        open_date,
        close_date,
        price,
        last_updated,
        subscription_data: parse_figures(block),
    })
}

/// "Acme Corp (SME)" → ("Acme Corp", Some("SME")); no parenthetical → None.
fn split_name_type(line: &str) -> (String, Option<String>) {
    if line.contains('(') && line.contains(')') {
        let name = line.split('(').next().unwrap_or("").trim().to_string();
        let kind = line
            .rsplit('(')
            .next()
            .unwrap_or("")
            .replace(')', "")
            .trim()
            .to_string();
        (name, Some(kind))
    } else {
        (line.to_string(), None)
    }
}

/// `"Date: 1st to 4th Jul 2025"`: only the close fragment carries the year
/// (defaulted to the current one when missing); the open fragment inherits
/// month/year from the close. 10:00 / 17:00 IST.
fn parse_date_window(
    text: &str,
    today: NaiveDate,
) -> (Option<DateTime<FixedOffset>>, Option<DateTime<FixedOffset>>) {
    let window = text.replace("Date:", "");
    let Some((open_raw, close_raw)) = window.split_once(" to ") else {
        return (None, None);
    };

    let close_txt = cleaner::strip_ordinals(close_raw.trim());
    let close_txt = if close_txt.split_whitespace().count() == 2 {
        format!("{} {}", close_txt, today.year())
    } else {
        close_txt
    };

    let close = cleaner::complete_date_fragment(&close_txt, None);
    let open = cleaner::complete_date_fragment(open_raw, close);

    (
        open.and_then(|d| cleaner::at_ist(d, 10, 0)),
        close.and_then(|d| cleaner::at_ist(d, 17, 0)),
    )
}

/// `"₹95 to ₹100"` / `"₹95-100"`; sides independently nullable.
fn parse_price_band(text: &str) -> PriceRange {
    let band = text.replace('₹', "").replace("to", "-");
    let parts: Vec<&str> = band.split('-').collect();

    let digits = |s: &&str| -> Option<i64> {
        let s = s.trim();
        if !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()) {
            s.parse().ok()
        } else {
            None
        }
    };

    PriceRange {
        min: parts.first().and_then(digits),
        max: parts.get(1).and_then(digits),
    }
}

/// `"Last updated on 04-Jul-2025 17:32:10"`, read in the configured source
/// offset and re-expressed as UTC.
fn parse_last_updated(text: &str, source_offset: FixedOffset) -> Option<DateTime<Utc>> {
    let raw = text.strip_prefix("Last updated on ")?;
    match NaiveDateTime::parse_from_str(raw.trim(), "%d-%b-%Y %H:%M:%S") {
        Ok(naive) => naive
            .and_local_timezone(source_offset)
            .single()
            .map(|dt| dt.with_timezone(&Utc)),
        Err(_) => {
            warn!("unparsable last-updated stamp: {:?}", raw);
            None
        }
    }
}

fn parse_figures(block: ElementRef) -> SubscriptionData {
    let mut data = SubscriptionData::default();

    // The figures table is recognized by its header vocabulary, not position.
    let table = block.select(&sel("table")).find(|t| {
        let header_has_category = t
            .select(&sel("th"))
            .next()
            .map(|th| th.text().collect::<String>().contains("Category"))
            .unwrap_or(false);
        let text: String = t.text().collect();
        header_has_category && text.contains("Applied") && text.contains("Times")
    });
    let Some(table) = table else { return data };

    for row in table.select(&sel("tr")).skip(1) {
        let cols: Vec<String> = row
            .select(&sel("td"))
            .map(|td| cleaner::clean_text(&td.text().collect::<String>()))
            .collect();
        if cols.len() != 4 {
            continue;
        }

        let category = cols[0].clone();
        let record = CategoryFigures {
            offered: cols[1].clone(),
            applied: cols[2].clone(),
            times: cols[3].clone(),
        };

        match category.to_lowercase().as_str() {
            "qibs" => data.qibs = Some(record),
            "hnis" => data.hnis.summary = Some(record),
            "retail" => data.retail = Some(record),
            "employees" => data.employees = Some(record),
            "shareholders" => data.shareholders = Some(record),
            "total" => data.total = Some(record),
            lower if lower.starts_with("hnis ") => {
                // Sub-bucket rows keep their verbatim upstream label.
                data.hnis.breakdown.insert(category, record);
            }
            // Unrecognized categories are dropped, matching upstream.
            _ => {}
        }
    }

    data
}
