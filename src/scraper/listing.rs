//! Home-page listing parser.
//!
//! The aggregator renders the same data twice: desktop tables (mainboard and
//! SME side by side) and mobile cards. Rows from both presentations are
//! unioned without de-duplication, matching upstream; the `dedup` flag keeps
//! only the first row per detail URL for callers that want one record per IPO.

use scraper::{ElementRef, Html};
use std::collections::HashSet;
use tracing::warn;
use url::Url;

use super::{cleaner, sel, ScrapeError};
use crate::models::ListingRecord;

pub fn parse_home_page(
    html: &str,
    base_url: &Url,
    dedup: bool,
) -> Result<Vec<ListingRecord>, ScrapeError> {
    let doc = Html::parse_document(html);

    let containers: Vec<ElementRef> = doc.select(&sel("div.table-container")).collect();
    let mobile = doc.select(&sel("div.show-on-mobile")).next();

    if containers.is_empty() && mobile.is_none() {
        return Err(ScrapeError::Structure("listing containers"));
    }

    let mut rows: Vec<ElementRef> = Vec::new();
    for container in &containers {
        rows.extend(container.select(&sel("table tbody tr")));
    }
    if let Some(mobile) = mobile {
        rows.extend(mobile.select(&sel("div.card")));
    }

    let mut records = Vec::new();
    for (idx, row) in rows.iter().enumerate() {
        match extract_row(*row, base_url) {
            Some(record) => records.push(record),
            // One malformed row must not sink the whole page.
            None => warn!("Skipping malformed listing row {}", idx),
        }
    }

    if dedup {
        let mut seen = HashSet::new();
        records.retain(|r| seen.insert(r.detail_url.clone()));
    }

    Ok(records)
}

fn extract_row(row: ElementRef, base_url: &Url) -> Option<ListingRecord> {
    let logo_url = row
        .select(&sel("img"))
        .next()
        .and_then(|img| img.value().attr("src"))
        .map(str::to_string);

    let symbol = row
        .select(&sel("span.ipo-symbol"))
        .next()
        .map(|el| el.text().collect::<String>())
        .and_then(|t| cleaner::parse_symbol(&t));

    let href = row.select(&sel("td.name a")).next()?.value().attr("href")?;
    let detail_url = base_url.join(href.trim()).ok()?.to_string();

    let name = row
        .select(&sel("span.ipo-name"))
        .next()
        .map(|el| cleaner::clean_text(&el.text().collect::<String>()))?;

    let date_cells: Vec<ElementRef> = row.select(&sel("td.date")).collect();

    // The open/close range is the third text line of the first date cell;
    // the lines above it carry a label and the issue's status badge.
    let range_text = date_cells
        .first()?
        .text()
        .collect::<String>()
        .split('\n')
        .nth(2)?
        .trim()
        .to_string();
    let (open_date, close_date) = cleaner::parse_ipo_date_range(&range_text);

    let listing_text = date_cells.get(1)?.text().collect::<String>();
    let listing_date = cleaner::parse_listing_date(listing_text.trim());

    let price_text = row
        .select(&sel("td.text-right"))
        .next()?
        .text()
        .collect::<String>();
    let price_range = cleaner::parse_price_range(price_text.trim());

    Some(ListingRecord {
        logo_url,
        detail_url,
        symbol,
        slug: cleaner::to_slug(&name),
        name,
        open_date,
        close_date,
        listing_date,
        price_range,
        gmp_url: None,
    })
}
