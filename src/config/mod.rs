use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Top-level application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub scraper: ScraperConfig,
    #[serde(default)]
    pub sources: SourcesConfig,
}

/// HTTP client behaviour towards the scraped hosts
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScraperConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,

    #[serde(default = "default_jitter_ms")]
    pub jitter_ms: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Collapse desktop/mobile duplicates by detail URL. Off by default to
    /// match the upstream union-without-dedup contract.
    #[serde(default)]
    pub dedup_listings: bool,
}

/// Upstream page locations
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SourcesConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_home_page")]
    pub home_page: String,

    #[serde(default = "default_upcoming_ipo_url")]
    pub upcoming_ipo_url: String,

    #[serde(default = "default_upcoming_sme_ipo_url")]
    pub upcoming_sme_ipo_url: String,

    #[serde(default = "default_subscription_url")]
    pub subscription_url: String,

    /// UTC offset (minutes) of the subscription page's "Last updated on"
    /// wall clock. The source does not state a zone; +05:30 is assumed.
    #[serde(default = "default_subscription_utc_offset_minutes")]
    pub subscription_utc_offset_minutes: i32,
}

// ── Defaults ─────────────────────────────────────────────────────────────────

fn default_timeout_secs() -> u64 {
    30
}
fn default_request_delay_ms() -> u64 {
    1000
}
fn default_jitter_ms() -> u64 {
    500
}
fn default_max_retries() -> u32 {
    3
}
fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/114.1.0.000 Safari/537.36".to_string()
}
fn default_base_url() -> String {
    "https://ipoji.com".to_string()
}
fn default_home_page() -> String {
    "/ipo".to_string()
}
fn default_upcoming_ipo_url() -> String {
    "https://ipowatch.in/upcoming-ipo-calendar-ipo-list/".to_string()
}
fn default_upcoming_sme_ipo_url() -> String {
    "https://ipowatch.in/upcoming-sme-ipo-calendar-list/".to_string()
}
fn default_subscription_url() -> String {
    "https://ipopremium.in/view/subscription".to_string()
}
fn default_subscription_utc_offset_minutes() -> i32 {
    330
}

// ── Loader ───────────────────────────────────────────────────────────────────

impl AppConfig {
    /// Load configuration from file + environment overrides
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        let cfg = config::Config::builder()
            .add_source(
                config::File::with_name("config/default")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(
                config::File::with_name("config/local")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(config::Environment::with_prefix("IPO").separator("__"))
            .build()?;

        let app_cfg: AppConfig = cfg.try_deserialize().unwrap_or_else(|_| AppConfig::default());
        Ok(app_cfg)
    }
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            request_delay_ms: default_request_delay_ms(),
            jitter_ms: default_jitter_ms(),
            max_retries: default_max_retries(),
            user_agent: default_user_agent(),
            dedup_listings: false,
        }
    }
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            home_page: default_home_page(),
            upcoming_ipo_url: default_upcoming_ipo_url(),
            upcoming_sme_ipo_url: default_upcoming_sme_ipo_url(),
            subscription_url: default_subscription_url(),
            subscription_utc_offset_minutes: default_subscription_utc_offset_minutes(),
        }
    }
}
