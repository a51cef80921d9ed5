use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveTime};
use regex::Regex;
use std::sync::OnceLock;
use tracing::warn;

use crate::models::PriceRange;

// All listing/GMP timestamps are expressed in IST, a fixed +05:30 offset.
pub const IST_OFFSET_SECS: i32 = 5 * 3600 + 30 * 60;

pub fn ist() -> FixedOffset {
    FixedOffset::east_opt(IST_OFFSET_SECS).expect("IST offset in range")
}

fn regex(cell: &'static OnceLock<Regex>, pattern: &'static str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("static regex"))
}

/// Normalize scraped text: de-entity nbsp, fold newlines, collapse runs.
pub fn clean_text(s: &str) -> String {
    s.replace('\u{a0}', " ")
        .replace('\n', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

pub(crate) fn at_ist(date: NaiveDate, hour: u32, min: u32) -> Option<DateTime<FixedOffset>> {
    date.and_hms_opt(hour, min, 0)?.and_local_timezone(ist()).single()
}

// ── Lot size ──────────────────────────────────────────────────────────────────

/// `"Lot size 35 — ₹14980"` → (Some(35), Some(14980)).
/// Amount absent → 0; leading pattern absent → (None, None), logged.
pub fn parse_lot_size(s: &str) -> (Option<i64>, Option<i64>) {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = regex(&RE, r"Lot size\s*(\d+)(?:\s*[—–]\s*₹\s*([\d,]+))?");

    match re.captures(s) {
        Some(caps) => {
            let lot = caps.get(1).and_then(|m| m.as_str().parse::<i64>().ok());
            let amount = caps
                .get(2)
                .and_then(|m| m.as_str().replace(',', "").parse::<i64>().ok())
                .unwrap_or(0);
            (lot, Some(amount))
        }
        None => {
            warn!("lot size text did not match expected format: {:?}", s);
            (None, None)
        }
    }
}

// ── Dates ─────────────────────────────────────────────────────────────────────

/// Schedule-table date: `"25 Sep 2024"` or `"27 Sep 2024 (5 PM)"`.
/// Missing time defaults to midnight IST.
pub fn parse_schedule_date(s: &str) -> Option<DateTime<FixedOffset>> {
    let s = s.trim();

    let (date_part, time) = match s.split_once('(') {
        Some((date, rest)) => {
            let time_raw = rest.trim_end_matches(')').trim();
            let time = NaiveTime::parse_from_str(time_raw, "%I %p").ok().or_else(|| {
                warn!("unparsable schedule time: {:?}", time_raw);
                None
            })?;
            (date.trim(), time)
        }
        None => (s, NaiveTime::MIN),
    };

    match NaiveDate::parse_from_str(date_part, "%d %b %Y") {
        Ok(date) => date.and_time(time).and_local_timezone(ist()).single(),
        Err(_) => {
            warn!("unparsable schedule date: {:?}", s);
            None
        }
    }
}

/// Listing-date cell: `"4 Oct 2024"` → 09:00 IST. A bare dash means
/// "not yet listed" and is a valid null, not a parse failure.
pub fn parse_listing_date(s: &str) -> Option<DateTime<FixedOffset>> {
    let s = s.trim();
    if s == "-" || s == "–" {
        return None;
    }
    match NaiveDate::parse_from_str(s, "%d %b %Y") {
        Ok(date) => at_ist(date, 9, 0),
        Err(_) => {
            warn!("unparsable listing date: {:?}", s);
            None
        }
    }
}

/// Strip English ordinal suffixes: "21st" → "21".
pub fn strip_ordinals(s: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"(\d+)(?:st|nd|rd|th)\b").replace_all(s, "$1").into_owned()
}

/// Resolve one fragment of a date range against an optional reference date.
///
/// The fragment may be day-only ("25") or day+month ("25 Sep"), inheriting
/// the missing parts from the reference. When resolution lands after the
/// reference across a December/January boundary the year is shifted to
/// restore ordering. "To be announced" is a valid null.
pub fn complete_date_fragment(s: &str, reference: Option<NaiveDate>) -> Option<NaiveDate> {
    let s = strip_ordinals(s.trim());
    if s == "To be announced" {
        return None;
    }

    let mut parts: Vec<String> = s.split_whitespace().map(str::to_string).collect();
    if let Some(r) = reference {
        if parts.len() == 1 {
            parts.push(r.format("%b").to_string());
            parts.push(r.year().to_string());
        } else if parts.len() == 2 {
            parts.push(r.year().to_string());
        }
    }

    let assembled = parts.join(" ");
    let mut date = match NaiveDate::parse_from_str(&assembled, "%d %b %Y") {
        Ok(d) => d,
        Err(_) => {
            warn!("unparsable date fragment: {:?}", assembled);
            return None;
        }
    };

    if let Some(r) = reference {
        if date > r {
            let shifted = if date.month() == 12 && r.month() == 1 {
                date.with_year(r.year() - 1)
            } else if date.month() == 1 && r.month() == 12 {
                date.with_year(r.year() + 1)
            } else {
                None
            };
            if let Some(adjusted) = shifted {
                date = adjusted;
            }
        }
    }

    Some(date)
}

/// Open/close range: `"25–27 Sep 2024"` or `"30 Dec – 2 Jan 2025"`.
/// The close fragment is resolved first and serves as the reference for the
/// possibly-abbreviated open fragment. Open 10:00, close 17:00 IST.
pub fn parse_ipo_date_range(
    s: &str,
) -> (Option<DateTime<FixedOffset>>, Option<DateTime<FixedOffset>>) {
    let fragments: Vec<&str> = s.split('–').collect();

    let close = complete_date_fragment(fragments.last().copied().unwrap_or(s), None);
    let open = complete_date_fragment(fragments.first().copied().unwrap_or(s), close);

    (
        open.and_then(|d| at_ist(d, 10, 0)),
        close.and_then(|d| at_ist(d, 17, 0)),
    )
}

/// GMP-table date: the literal "today" or `"<day> <full month>"` with the
/// year inferred from `today`. Around new year the inference rolls over:
/// January reading a December row looks back a year, December reading an
/// already-past date looks ahead one.
pub fn parse_gmp_date(s: &str, today: NaiveDate) -> Option<DateTime<FixedOffset>> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("today") {
        return at_ist(today, 0, 0);
    }

    let assembled = format!("{} {}", s, today.year());
    let mut date = match NaiveDate::parse_from_str(&assembled, "%d %B %Y") {
        Ok(d) => d,
        Err(_) => {
            warn!("unparsable GMP date: {:?}", s);
            return None;
        }
    };

    if today.month() == 1 && date.month() == 12 {
        date = date.with_year(today.year() - 1)?;
    } else if today.month() == 12 && date < today {
        date = date.with_year(today.year() + 1)?;
    }

    at_ist(date, 0, 0)
}

// ── Price range ───────────────────────────────────────────────────────────────

/// `"₹100"` → (100, 100); `"₹100 – ₹200"` → (100, 200); dash → (None, None).
pub fn parse_price_range(s: &str) -> PriceRange {
    let s = s.trim();
    if s == "-" || s == "–" {
        return PriceRange::default();
    }

    static RE: OnceLock<Regex> = OnceLock::new();
    let re = regex(&RE, r"₹\s*([\d,]+)");

    let values: Vec<i64> = re
        .captures_iter(s)
        .filter_map(|c| c.get(1))
        .filter_map(|m| m.as_str().replace(',', "").parse().ok())
        .collect();

    match values.as_slice() {
        [] => {
            warn!("no price tokens in: {:?}", s);
            PriceRange::default()
        }
        [single] => PriceRange { min: Some(*single), max: Some(*single) },
        [first, .., last] => PriceRange { min: Some(*first), max: Some(*last) },
    }
}

// ── Names ─────────────────────────────────────────────────────────────────────

/// First maximal run of uppercase ASCII letters, word-bounded.
pub fn parse_symbol(s: &str) -> Option<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"\b[A-Z]+\b")
        .find(s)
        .map(|m| m.as_str().to_string())
}

/// Lowercase, spaces to hyphens, one trailing "-ltd" stripped. Any other
/// punctuation passes through untouched.
pub fn to_slug(name: &str) -> String {
    let slug = name.to_lowercase().replace(' ', "-");
    slug.strip_suffix("-ltd").map(str::to_string).unwrap_or(slug)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
