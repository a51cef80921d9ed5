pub mod cleaner;
pub mod detail;
pub mod gmp;
pub mod http_client;
pub mod listing;
pub mod subscription;
pub mod upcoming;

use crate::config::AppConfig;
use crate::models::{GmpPageData, IpoDetail, ListingRecord, SubscriptionRecord, UpcomingIpo};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{FixedOffset, Utc};
use scraper::Selector;
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use self::http_client::HttpClient;

/// Structural failures of a fetched page, as opposed to single-field parse
/// failures (those degrade to null in place) and transport failures (those
/// surface as `anyhow` errors from the client).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScrapeError {
    #[error("expected page landmark missing: {0}")]
    Structure(&'static str),
    #[error("source page reports not found")]
    NotFound,
}

/// Parse a selector known to be valid at compile time.
pub(crate) fn sel(raw: &'static str) -> Selector {
    Selector::parse(raw).expect("static selector")
}

// ── Source trait ──────────────────────────────────────────────────────────────

/// Swappable upstream abstraction, one method per scraped page kind.
#[async_trait]
pub trait IpoSource: Send + Sync {
    async fn fetch_listings(&self) -> Result<Vec<ListingRecord>>;
    async fn fetch_gmp_candidates(&self) -> Result<Vec<UpcomingIpo>>;
    async fn fetch_detail(&self, url: &str) -> Result<Option<IpoDetail>>;
    async fn fetch_gmp_page(&self, url: &str) -> Result<Option<GmpPageData>>;
    async fn fetch_subscriptions(&self) -> Result<Vec<SubscriptionRecord>>;
}

// ── Live scraper ──────────────────────────────────────────────────────────────

pub struct IpoScraper {
    client: HttpClient,
    base_url: Url,
    home_page: String,
    upcoming_urls: Vec<String>,
    subscription_url: String,
    subscription_offset: FixedOffset,
    dedup_listings: bool,
}

impl IpoScraper {
    pub fn new(config: &AppConfig) -> Result<Self> {
        let base_url = Url::parse(&config.sources.base_url)
            .with_context(|| format!("Invalid base URL {:?}", config.sources.base_url))?;

        let subscription_offset =
            FixedOffset::east_opt(config.sources.subscription_utc_offset_minutes * 60)
                .context("subscription_utc_offset_minutes out of range")?;

        Ok(Self {
            client: HttpClient::new(&config.scraper)?,
            base_url,
            home_page: config.sources.home_page.clone(),
            upcoming_urls: vec![
                config.sources.upcoming_ipo_url.clone(),
                config.sources.upcoming_sme_ipo_url.clone(),
            ],
            subscription_url: config.sources.subscription_url.clone(),
            subscription_offset,
            dedup_listings: config.scraper.dedup_listings,
        })
    }

    fn today_ist() -> chrono::NaiveDate {
        Utc::now().with_timezone(&cleaner::ist()).date_naive()
    }
}

#[async_trait]
impl IpoSource for IpoScraper {
    async fn fetch_listings(&self) -> Result<Vec<ListingRecord>> {
        let url = self.base_url.join(&self.home_page).context("Bad home page path")?;
        info!("Fetching IPO home page ({})", url);

        let html = self.client.get_text(url.as_str()).await
            .context("Failed to fetch home page")?;

        match listing::parse_home_page(&html, &self.base_url, self.dedup_listings) {
            Ok(records) => {
                info!("{} listings parsed", records.len());
                Ok(records)
            }
            Err(e) => {
                // Site redesign or empty shell page: soft "no data", not a crash.
                warn!("Home page structure mismatch ({}), returning no listings", e);
                Ok(Vec::new())
            }
        }
    }

    async fn fetch_gmp_candidates(&self) -> Result<Vec<UpcomingIpo>> {
        let mut all = Vec::new();

        for url in &self.upcoming_urls {
            debug!("Fetching upcoming-IPO calendar: {}", url);

            let html = self.client.get_text(url).await
                .with_context(|| format!("Failed to fetch calendar page {}", url))?;

            let found = upcoming::parse_upcoming_page(&html);
            debug!("  {} candidates on {}", found.len(), url);
            all.extend(found);
        }

        info!("{} GMP candidates discovered", all.len());
        Ok(all)
    }

    async fn fetch_detail(&self, url: &str) -> Result<Option<IpoDetail>> {
        debug!("Fetching detail page: {}", url);

        let html = self.client.get_text(url).await
            .with_context(|| format!("Failed to fetch detail page {}", url))?;

        match detail::parse_detail_page(&html) {
            Ok(d) => Ok(Some(d)),
            Err(e) => {
                warn!("{}: {}", url, e);
                Ok(None)
            }
        }
    }

    async fn fetch_gmp_page(&self, url: &str) -> Result<Option<GmpPageData>> {
        debug!("Fetching GMP page: {}", url);

        let html = self.client.get_text(url).await
            .with_context(|| format!("Failed to fetch GMP page {}", url))?;

        match gmp::parse_gmp_page(&html, Self::today_ist()) {
            Ok(page) => Ok(Some(page)),
            Err(e) => {
                warn!("{}: {}", url, e);
                Ok(None)
            }
        }
    }

    async fn fetch_subscriptions(&self) -> Result<Vec<SubscriptionRecord>> {
        info!("Fetching subscription page ({})", self.subscription_url);

        let html = self.client.get_text(&self.subscription_url).await
            .context("Failed to fetch subscription page")?;

        let records = subscription::parse_subscription_page(
            &html,
            self.subscription_offset,
            Self::today_ist(),
        );
        info!("{} subscription records parsed", records.len());
        Ok(records)
    }
}
