//! Upcoming-IPO calendar parser for the GMP source: every table row whose
//! first cell links to a detail page yields one `{name, url}` candidate.

use scraper::Html;

use super::{cleaner, sel};
use crate::models::UpcomingIpo;

pub fn parse_upcoming_page(html: &str) -> Vec<UpcomingIpo> {
    let doc = Html::parse_document(html);

    let mut candidates = Vec::new();
    for table in doc.select(&sel("table")) {
        for row in table.select(&sel("tr")).skip(1) {
            let Some(first_td) = row.select(&sel("td")).next() else {
                continue;
            };
            let Some(href) = first_td
                .select(&sel("a"))
                .next()
                .and_then(|a| a.value().attr("href"))
            else {
                continue;
            };

            let name = cleaner::clean_text(&first_td.text().collect::<String>());
            if name.is_empty() {
                continue;
            }

            candidates.push(UpcomingIpo {
                name,
                url: href.trim().to_string(),
            });
        }
    }
    candidates
}
