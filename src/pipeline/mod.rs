//! Pipeline orchestrator: ties the scraper, reconciler and output surfaces
//! together.
//!
//! ## Operations
//!
//! `calendar()`: listing parse + GMP reconciliation, the `/calendar` payload.
//! `details()`: optional detail-page and GMP-page fetches, the `/details`
//!   payload. Absent URLs skip the corresponding fetch entirely.
//! `subscriptions()`: the `/subscription` payload.
//! `export()`: offline batch tool, every calendar entry enriched with its
//!   details and GMP data, written to one JSON file in a single shot.
//!
//! Fetches are strictly sequential; politeness toward the scraped hosts
//! lives in the HTTP client's per-request delay.

use crate::config::AppConfig;
use crate::models::{
    GmpTimelinePoint, IpoDetail, IpoDetailFields, ListingRecord, SubscriptionRecord,
};
use crate::reconcile::{MatchStrategy, SubstringMatcher};
use crate::scraper::{IpoScraper, IpoSource};
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct Pipeline {
    source: Arc<dyn IpoSource>,
    matcher: Box<dyn MatchStrategy>,
}

/// The `/details` payload. Both halves are optional and independently
/// degradable; two omitted query URLs produce `{}`.
#[derive(Debug, Default, Serialize)]
pub struct DetailsResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<IpoDetail>,
    #[serde(rename = "gmpTimeline", skip_serializing_if = "Option::is_none")]
    pub gmp_timeline: Option<Vec<GmpTimelinePoint>>,
}

#[derive(Serialize)]
struct EnrichedListing {
    #[serde(flatten)]
    listing: ListingRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<IpoDetail>,
    #[serde(rename = "gmpTimeline", skip_serializing_if = "Option::is_none")]
    gmp_timeline: Option<Vec<GmpTimelinePoint>>,
    #[serde(rename = "ipoDetails", skip_serializing_if = "Option::is_none")]
    ipo_details: Option<IpoDetailFields>,
}

#[derive(Debug)]
pub struct ExportStats {
    pub listings: usize,
    pub errors: usize,
}

impl Pipeline {
    pub fn new(config: &AppConfig) -> Result<Self> {
        Ok(Self::with_parts(
            Arc::new(IpoScraper::new(config).context("Failed to build scraper")?),
            Box::new(SubstringMatcher::new()),
        ))
    }

    /// Seam for tests and for swapping in a stricter matching strategy.
    pub fn with_parts(source: Arc<dyn IpoSource>, matcher: Box<dyn MatchStrategy>) -> Self {
        Self { source, matcher }
    }

    /// Listing records with reconciled GMP URLs, in page order.
    pub async fn calendar(&self) -> Result<Vec<ListingRecord>> {
        let mut listings = self.source.fetch_listings().await
            .context("Listing fetch failed")?;

        if listings.is_empty() {
            info!("No open or upcoming IPOs found");
            return Ok(listings);
        }

        // A dead secondary source degrades the calendar (no GMP links)
        // rather than failing it.
        let candidates = match self.source.fetch_gmp_candidates().await {
            Ok(c) => c,
            Err(e) => {
                warn!("GMP candidate fetch failed, calendar continues without links: {:#}", e);
                Vec::new()
            }
        };

        let mut matched = 0usize;
        for listing in &mut listings {
            listing.gmp_url = self.matcher.find_url(&listing.name, &candidates);
            match &listing.gmp_url {
                Some(url) => {
                    matched += 1;
                    debug!("{} → {}", listing.name, url);
                }
                None => debug!("{}: no GMP page matched", listing.name),
            }
        }

        info!("{} listings, {} with GMP link", listings.len(), matched);
        Ok(listings)
    }

    /// Detail and GMP sub-fetches, each optional and each allowed to fail
    /// without taking the other down.
    pub async fn details(
        &self,
        details_url: Option<&str>,
        gmp_url: Option<&str>,
    ) -> Result<DetailsResponse> {
        let mut response = DetailsResponse::default();

        if let Some(url) = details_url {
            match self.source.fetch_detail(url).await {
                Ok(details) => response.details = details,
                Err(e) => warn!("Detail fetch failed, returning partial response: {:#}", e),
            }
        }

        if let Some(url) = gmp_url {
            match self.source.fetch_gmp_page(url).await {
                Ok(page) => response.gmp_timeline = page.map(|p| p.gmp_timeline),
                Err(e) => warn!("GMP fetch failed, returning partial response: {:#}", e),
            }
        }

        Ok(response)
    }

    pub async fn subscriptions(&self) -> Result<Vec<SubscriptionRecord>> {
        self.source.fetch_subscriptions().await
            .context("Subscription scrape failed")
    }

    /// Fetch everything and write one JSON snapshot. Writes happen in one
    /// shot at the end; a partial fetch still produces a complete file with
    /// the failed entries carrying null enrichments.
    pub async fn export(&self, path: &Path) -> Result<ExportStats> {
        let listings = self.calendar().await?;

        let mut enriched = Vec::with_capacity(listings.len());
        let mut errors = 0usize;

        for listing in listings {
            let details = match self.source.fetch_detail(&listing.detail_url).await {
                Ok(d) => d,
                Err(e) => {
                    warn!("{}: detail fetch failed: {:#}", listing.name, e);
                    errors += 1;
                    None
                }
            };

            let gmp = match &listing.gmp_url {
                Some(url) => match self.source.fetch_gmp_page(url).await {
                    Ok(page) => page,
                    Err(e) => {
                        warn!("{}: GMP fetch failed: {:#}", listing.name, e);
                        errors += 1;
                        None
                    }
                },
                None => None,
            };

            let (gmp_timeline, ipo_details) = match gmp {
                Some(page) => (
                    Some(page.gmp_timeline),
                    (!page.ipo_details.is_empty()).then_some(page.ipo_details),
                ),
                None => (None, None),
            };

            enriched.push(EnrichedListing { listing, details, gmp_timeline, ipo_details });
        }

        let json = serde_json::to_string_pretty(&enriched)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write snapshot {:?}", path))?;

        Ok(ExportStats { listings: enriched.len(), errors })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AboutText, GmpPageData, PriceRange, UpcomingIpo};
    use anyhow::anyhow;
    use async_trait::async_trait;

    struct StubSource {
        listings: Vec<ListingRecord>,
        candidates: Result<Vec<UpcomingIpo>, String>,
        detail: Option<IpoDetail>,
        gmp: Option<GmpPageData>,
    }

    impl Default for StubSource {
        fn default() -> Self {
            Self {
                listings: Vec::new(),
                candidates: Ok(Vec::new()),
                detail: None,
                gmp: None,
            }
        }
    }

    #[async_trait]
    impl IpoSource for StubSource {
        async fn fetch_listings(&self) -> Result<Vec<ListingRecord>> {
            Ok(self.listings.clone())
        }

        async fn fetch_gmp_candidates(&self) -> Result<Vec<UpcomingIpo>> {
            self.candidates.clone().map_err(|e| anyhow!(e))
        }

        async fn fetch_detail(&self, _url: &str) -> Result<Option<IpoDetail>> {
            Ok(self.detail.clone())
        }

        async fn fetch_gmp_page(&self, _url: &str) -> Result<Option<GmpPageData>> {
            Ok(self.gmp.clone())
        }

        async fn fetch_subscriptions(&self) -> Result<Vec<SubscriptionRecord>> {
            Ok(Vec::new())
        }
    }

    fn listing(name: &str) -> ListingRecord {
        ListingRecord {
            logo_url: None,
            detail_url: format!("https://ipo.example.com/ipo/{}", name.to_lowercase()),
            symbol: None,
            name: name.to_string(),
            open_date: None,
            close_date: None,
            listing_date: None,
            price_range: PriceRange::default(),
            slug: name.to_lowercase(),
            gmp_url: None,
        }
    }

    fn pipeline(source: StubSource) -> Pipeline {
        Pipeline::with_parts(Arc::new(source), Box::new(SubstringMatcher::new()))
    }

    #[tokio::test]
    async fn empty_listing_page_yields_empty_calendar() {
        let calendar = pipeline(StubSource::default()).calendar().await.unwrap();
        assert!(calendar.is_empty());
    }

    #[tokio::test]
    async fn calendar_attaches_gmp_urls() {
        let source = StubSource {
            listings: vec![listing("Acme"), listing("Unmatched")],
            candidates: Ok(vec![UpcomingIpo {
                name: "acme ipo".into(),
                url: "https://g.example.com/acme-ipo".into(),
            }]),
            ..Default::default()
        };

        let calendar = pipeline(source).calendar().await.unwrap();
        assert_eq!(
            calendar[0].gmp_url.as_deref(),
            Some("https://g.example.com/acme-ipo")
        );
        assert_eq!(calendar[1].gmp_url, None);
    }

    #[tokio::test]
    async fn dead_candidate_source_degrades_calendar() {
        let source = StubSource {
            listings: vec![listing("Acme")],
            candidates: Err("connection refused".into()),
            ..Default::default()
        };

        let calendar = pipeline(source).calendar().await.unwrap();
        assert_eq!(calendar.len(), 1);
        assert_eq!(calendar[0].gmp_url, None);
    }

    #[tokio::test]
    async fn details_with_no_urls_is_empty_object() {
        let response = pipeline(StubSource::default())
            .details(None, None)
            .await
            .unwrap();
        assert_eq!(serde_json::to_string(&response).unwrap(), "{}");
    }

    #[tokio::test]
    async fn details_projects_gmp_timeline() {
        let source = StubSource {
            detail: Some(IpoDetail {
                issue_size: Some("₹500 Cr".into()),
                size_per_lot: Some(125),
                min_investment: Some(15000),
                schedule: Vec::new(),
                about: AboutText(vec!["Widgets.".into()]),
                strengths: Vec::new(),
                risks: Vec::new(),
            }),
            gmp: Some(GmpPageData {
                gmp_timeline: vec![GmpTimelinePoint { date: None, price: Some(40) }],
                ipo_details: IpoDetailFields::default(),
            }),
            ..Default::default()
        };

        let response = pipeline(source)
            .details(Some("https://a"), Some("https://b"))
            .await
            .unwrap();

        assert_eq!(response.details.unwrap().size_per_lot, Some(125));
        assert_eq!(response.gmp_timeline.unwrap()[0].price, Some(40));
    }

    #[tokio::test]
    async fn export_writes_one_json_array() {
        let dir = std::env::temp_dir().join("ipo_radar_export_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("stocks.json");

        let source = StubSource {
            listings: vec![listing("Acme")],
            candidates: Ok(vec![UpcomingIpo {
                name: "acme ipo".into(),
                url: "https://g.example.com/acme-ipo".into(),
            }]),
            gmp: Some(GmpPageData {
                gmp_timeline: vec![GmpTimelinePoint { date: None, price: None }],
                ipo_details: IpoDetailFields::default(),
            }),
            ..Default::default()
        };

        let stats = pipeline(source).export(&path).await.unwrap();
        assert_eq!(stats.listings, 1);
        assert_eq!(stats.errors, 0);

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        let entry = &written.as_array().unwrap()[0];
        assert_eq!(entry["name"], "Acme");
        assert_eq!(entry["gmpUrl"], "https://g.example.com/acme-ipo");
        assert_eq!(entry["gmpTimeline"][0]["price"], serde_json::Value::Null);
        // empty detail-field table is omitted entirely
        assert!(entry.get("ipoDetails").is_none());

        std::fs::remove_file(&path).ok();
    }
}
