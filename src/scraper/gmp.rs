//! GMP detail-page parser: premium history table plus the optional second
//! table of issue facts (quotas, face value, prospectus links).

use chrono::NaiveDate;
use regex::Regex;
use scraper::{ElementRef, Html};
use std::sync::OnceLock;
use tracing::warn;

use super::{cleaner, sel, ScrapeError};
use crate::models::{GmpPageData, GmpTimelinePoint, IpoDetailFields};

pub fn parse_gmp_page(html: &str, today: NaiveDate) -> Result<GmpPageData, ScrapeError> {
    let doc = Html::parse_document(html);

    // The source serves soft 404s: a normal page whose headline reads "404".
    if let Some(h1) = doc.select(&sel("h1.elementor-heading-title")).next() {
        if h1.text().collect::<String>().trim() == "404" {
            return Err(ScrapeError::NotFound);
        }
    }

    let figure_sel = sel("figure.wp-block-table");
    let mut figures = doc.select(&figure_sel);
    let first = figures
        .next()
        .ok_or(ScrapeError::Structure("figure.wp-block-table"))?;
    let tbody = first
        .select(&sel("tbody"))
        .next()
        .ok_or(ScrapeError::Structure("gmp table body"))?;

    let mut timeline = Vec::new();
    for row in tbody.select(&sel("tr")).skip(1) {
        let cells: Vec<String> = row
            .select(&sel("td"))
            .map(|td| td.text().collect::<String>().trim().to_string())
            .collect();

        if cells.len() < 2 {
            warn!("Skipping short GMP row ({} cells)", cells.len());
            continue;
        }

        timeline.push(GmpTimelinePoint {
            date: cleaner::parse_gmp_date(&cells[0], today),
            price: parse_gmp_price(&cells[1]),
        });
    }

    let ipo_details = figures.next().map(parse_detail_fields).unwrap_or_default();

    Ok(GmpPageData { gmp_timeline: timeline, ipo_details })
}

/// `"₹150"` → 150; the rupee-placeholder and dash forms mean "no data yet"
/// and map to None rather than zero.
fn parse_gmp_price(s: &str) -> Option<i64> {
    if s == "₹-" || s == "-" || s == "–" {
        return None;
    }
    let cleaned = s.replace('₹', "").replace(',', "").trim().to_string();
    match cleaned.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!("unparsable GMP price: {:?}", s);
            None
        }
    }
}

fn parse_detail_fields(figure: ElementRef) -> IpoDetailFields {
    let mut out = IpoDetailFields::default();

    for row in figure.select(&sel("tr")) {
        let cells: Vec<ElementRef> = row.select(&sel("td")).collect();
        let [label_cell, value_cell, ..] = cells.as_slice() else {
            continue;
        };
        let label = label_cell.text().collect::<String>().to_lowercase();

        // "drhp" and "anchor" must be tested before the bare "rhp" substring.
        if label.contains("offer for sale") {
            out.offer_for_sale = cell_number(*value_cell);
        } else if label.contains("face value") {
            out.face_value = cell_number(*value_cell);
        } else if label.contains("retail") {
            out.retail_quota = cell_number(*value_cell);
        } else if label.contains("qib") {
            out.qib_quota = cell_number(*value_cell);
        } else if label.contains("nii") {
            out.nii_quota = cell_number(*value_cell);
        } else if label.contains("drhp") {
            out.drhp_link = cell_link(*value_cell);
        } else if label.contains("anchor") {
            out.anchor_investors_link = cell_link(*value_cell);
        } else if label.contains("rhp") {
            out.rhp_link = cell_link(*value_cell);
        } else if label.contains("listing") {
            out.ipo_listing = cell_number(*value_cell);
        }
    }

    out
}

/// First digit run of the cell text, thousands separators ignored.
fn cell_number(cell: ElementRef) -> Option<i64> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"\d+").expect("static regex"));

    let text = cell.text().collect::<String>().replace(',', "");
    re.find(&text).and_then(|m| m.as_str().parse().ok())
}

/// Anchor href; the literal placeholder "#" counts as absent.
fn cell_link(cell: ElementRef) -> Option<String> {
    let href = cell.select(&sel("a")).next()?.value().attr("href")?.trim();
    if href.is_empty() || href == "#" {
        return None;
    }
    Some(href.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn gmp_table(rows: &str) -> String {
        format!(
            r#"<html><body>
                <h1 class="elementor-heading-title">Acme IPO GMP</h1>
                <figure class="wp-block-table"><table><tbody>
                    <tr><td>Date</td><td>GMP</td></tr>
                    {rows}
                </tbody></table></figure>
            </body></html>"#
        )
    }

    #[test]
    fn parses_timeline_rows() {
        let html = gmp_table(
            "<tr><td>25 September</td><td>₹150</td></tr>\
             <tr><td>26 September</td><td>₹1,025</td></tr>\
             <tr><td>Today</td><td>₹-</td></tr>",
        );
        let page = parse_gmp_page(&html, date(2024, 9, 27)).unwrap();

        assert_eq!(page.gmp_timeline.len(), 3);
        assert_eq!(page.gmp_timeline[0].price, Some(150));
        assert_eq!(
            page.gmp_timeline[0].date.unwrap().to_rfc3339(),
            "2024-09-25T00:00:00+05:30"
        );
        assert_eq!(page.gmp_timeline[1].price, Some(1025));

        let today = &page.gmp_timeline[2];
        assert_eq!(today.price, None);
        assert_eq!(today.date.unwrap().to_rfc3339(), "2024-09-27T00:00:00+05:30");
        assert!(page.ipo_details.is_empty());
    }

    #[test]
    fn soft_404_page_is_not_found() {
        let html = r#"<html><body>
            <h1 class="elementor-heading-title">404</h1>
        </body></html>"#;
        assert_eq!(
            parse_gmp_page(html, date(2024, 9, 27)).unwrap_err(),
            ScrapeError::NotFound
        );
    }

    #[test]
    fn missing_table_is_structural() {
        let html = r#"<html><body><h1 class="elementor-heading-title">Acme</h1></body></html>"#;
        assert_eq!(
            parse_gmp_page(html, date(2024, 9, 27)).unwrap_err(),
            ScrapeError::Structure("figure.wp-block-table")
        );
    }

    #[test]
    fn second_table_feeds_detail_fields() {
        let html = r##"<html><body>
                <figure class="wp-block-table"><table><tbody>
                    <tr><td>Date</td><td>GMP</td></tr>
                    <tr><td>Today</td><td>₹5</td></tr>
                </tbody></table></figure>
                <figure class="wp-block-table"><table><tbody>
                    <tr><td>Offer for Sale</td><td>1,00,00,000 shares</td></tr>
                    <tr><td>Face Value</td><td>₹10</td></tr>
                    <tr><td>Retail Quota</td><td>35%</td></tr>
                    <tr><td>QIB Quota</td><td>50%</td></tr>
                    <tr><td>NII Quota</td><td>15%</td></tr>
                    <tr><td>DRHP Draft</td><td><a href="https://docs.example.com/drhp.pdf">link</a></td></tr>
                    <tr><td>RHP Draft</td><td><a href="#">link</a></td></tr>
                </tbody></table></figure>
            </body></html>"##;
        let page = parse_gmp_page(html, date(2024, 9, 27)).unwrap();

        let f = &page.ipo_details;
        assert_eq!(f.offer_for_sale, Some(10000000));
        assert_eq!(f.face_value, Some(10));
        assert_eq!(f.retail_quota, Some(35));
        assert_eq!(f.qib_quota, Some(50));
        assert_eq!(f.nii_quota, Some(15));
        assert_eq!(f.drhp_link.as_deref(), Some("https://docs.example.com/drhp.pdf"));
        // placeholder href means the RHP is not published yet
        assert_eq!(f.rhp_link, None);
        assert_eq!(f.anchor_investors_link, None);
        assert_eq!(f.ipo_listing, None);

        let json = serde_json::to_value(f).unwrap();
        assert!(json.get("rhpLink").is_none());
        assert!(json.get("anchorInvestorsLink").is_none());
    }
}
