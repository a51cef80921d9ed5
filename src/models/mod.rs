use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ── Listing ───────────────────────────────────────────────────────────────────

/// One IPO row from the aggregator home page.
///
/// `detail_url` is the only reliable identifier; symbols are not unique
/// upstream. `gmp_url` is attached by the reconciler after the fact.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ListingRecord {
    pub logo_url: Option<String>,
    pub detail_url: String,
    pub symbol: Option<String>,
    pub name: String,
    pub open_date: Option<DateTime<FixedOffset>>,
    pub close_date: Option<DateTime<FixedOffset>>,
    pub listing_date: Option<DateTime<FixedOffset>>,
    pub price_range: PriceRange,
    pub slug: String,
    pub gmp_url: Option<String>,
}

/// Price band in rupees. Sides are independently nullable: a single-price
/// issue carries the same value on both, an unannounced band carries neither.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PriceRange {
    pub min: Option<i64>,
    pub max: Option<i64>,
}

// ── Per-company detail page ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IpoDetail {
    pub issue_size: Option<String>,
    pub size_per_lot: Option<i64>,
    pub min_investment: Option<i64>,
    /// Document order, not chronological order.
    pub schedule: Vec<ScheduleEvent>,
    pub about: AboutText,
    pub strengths: Vec<String>,
    pub risks: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleEvent {
    pub event: String,
    pub event_title: String,
    pub date: Option<DateTime<FixedOffset>>,
}

/// Company narrative, kept as ordered paragraphs internally and only joined
/// (with the upstream-compatible literal `" /n "`) when rendered to JSON.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AboutText(pub Vec<String>);

impl AboutText {
    pub fn render(&self) -> String {
        self.0.join(" /n ")
    }
}

impl Serialize for AboutText {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.render())
    }
}

impl<'de> Deserialize<'de> for AboutText {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let joined = String::deserialize(deserializer)?;
        Ok(AboutText(
            joined.split(" /n ").map(|p| p.to_string()).collect(),
        ))
    }
}

// ── GMP page ──────────────────────────────────────────────────────────────────

/// One row of the grey-market-premium history table. A `₹-` placeholder in
/// the source becomes a null price, never zero.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GmpTimelinePoint {
    pub date: Option<DateTime<FixedOffset>>,
    pub price: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GmpPageData {
    pub gmp_timeline: Vec<GmpTimelinePoint>,
    pub ipo_details: IpoDetailFields,
}

/// Fixed key set scraped from the second table of a GMP page. Keys absent
/// from the source are omitted from the JSON, never serialized as null.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IpoDetailFields {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offer_for_sale: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ipo_listing: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub face_value: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retail_quota: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qib_quota: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nii_quota: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drhp_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rhp_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anchor_investors_link: Option<String>,
}

impl IpoDetailFields {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

// ── Subscription page ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubscriptionRecord {
    pub name: String,
    #[serde(rename = "type")]
    pub ipo_type: Option<String>,
    pub open_date: Option<DateTime<FixedOffset>>,
    pub close_date: Option<DateTime<FixedOffset>>,
    pub price: PriceRange,
    pub last_updated: Option<DateTime<Utc>>,
    pub subscription_data: SubscriptionData,
}

/// Demand multiples per investor category. Figures stay as raw trimmed
/// strings; upstream formats them inconsistently ("1.2x" vs "1.20").
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SubscriptionData {
    #[serde(rename = "QIBs")]
    pub qibs: Option<CategoryFigures>,
    #[serde(rename = "Retail")]
    pub retail: Option<CategoryFigures>,
    #[serde(rename = "HNIs")]
    pub hnis: HniFigures,
    #[serde(rename = "Employees")]
    pub employees: Option<CategoryFigures>,
    #[serde(rename = "Shareholders")]
    pub shareholders: Option<CategoryFigures>,
    #[serde(rename = "Total")]
    pub total: Option<CategoryFigures>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HniFigures {
    pub summary: Option<CategoryFigures>,
    /// Keyed by the verbatim upstream label, e.g. "HNIs (Above ₹10L)".
    pub breakdown: BTreeMap<String, CategoryFigures>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CategoryFigures {
    pub offered: String,
    pub applied: String,
    pub times: String,
}

// ── Secondary-source calendar candidate ───────────────────────────────────────

/// `{name, url}` pair scraped from the upcoming-IPO calendar pages of the
/// GMP source; input to the reconciler.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UpcomingIpo {
    pub name: String,
    pub url: String,
}
