//! USGS earthquake feed client.
//!
//! One async GET against a summary GeoJSON feed.
//! Uses reqwest with rustls for TLS.

use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use tracing::{debug, instrument};

use crate::errors::QuakeMapError;
use crate::models::{EventRecord, FeatureCollection};

/// Request timeout in seconds. A hung fetch fails instead of loading forever.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// User agent string for API requests.
const USER_AGENT: &str = concat!("quakemap/", env!("CARGO_PKG_VERSION"));

/// USGS base URL for earthquake feeds.
pub const USGS_BASE_URL: &str = "https://earthquake.usgs.gov";

/// Where the feed store gets its records from.
pub trait FeedSource {
    /// Fetch and parse the full list of event records.
    fn fetch(&self) -> impl Future<Output = Result<Vec<EventRecord>, QuakeMapError>> + Send;
}

/// Time window of the all-magnitude summary feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FeedWindow {
    Hour,
    #[default]
    Day,
    Week,
    Month,
}

impl FeedWindow {
    /// Get the URL path segment for this feed window.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hour => "all_hour",
            Self::Day => "all_day",
            Self::Week => "all_week",
            Self::Month => "all_month",
        }
    }
}

impl std::str::FromStr for FeedWindow {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hour" | "all_hour" => Ok(Self::Hour),
            "day" | "all_day" => Ok(Self::Day),
            "week" | "all_week" => Ok(Self::Week),
            "month" | "all_month" => Ok(Self::Month),
            _ => Err(format!(
                "unknown feed window: {s} (expected: hour, day, week, month)"
            )),
        }
    }
}

/// Client for the USGS summary feeds.
#[derive(Debug, Clone)]
pub struct UsgsClient {
    client: Client,
    base_url: String,
    window: FeedWindow,
}

impl UsgsClient {
    /// Create a new USGS client for the given feed window.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialized.
    pub fn new(window: FeedWindow) -> Result<Self, QuakeMapError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            base_url: USGS_BASE_URL.to_string(),
            window,
        })
    }

    /// Point the client at a mirror of the USGS feed tree.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Full URL of the configured feed.
    #[must_use]
    pub fn feed_url(&self) -> String {
        format!(
            "{}/earthquakes/feed/v1.0/summary/{}.geojson",
            self.base_url,
            self.window.as_str()
        )
    }

    /// Fetch the summary GeoJSON feed.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or response cannot be parsed.
    #[instrument(skip(self), fields(feed = self.window.as_str()))]
    pub async fn fetch_feed(&self) -> Result<FeatureCollection, QuakeMapError> {
        let url = self.feed_url();
        debug!("fetching feed from {}", url);

        let response = self.client.get(&url).send().await?;

        // Check status before parsing
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(QuakeMapError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = response.bytes().await?;
        let feed: FeatureCollection = serde_json::from_slice(&body)?;
        feed.validate()?;

        debug!("fetched {} events", feed.features.len());
        Ok(feed)
    }
}

impl FeedSource for UsgsClient {
    async fn fetch(&self) -> Result<Vec<EventRecord>, QuakeMapError> {
        self.fetch_feed().await?.into_records()
    }
}
