// File: src/rates.rs
use crate::clock::{format_local_short, Clock};
use crate::core::catalog::RatesWriter;
use crate::error::{Error, Result};
use crate::persistence::{Store, RATES_KEY};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

pub const DEFAULT_RATES_URL: &str = "https://api.exchangerate-api.com/v4/latest/USD";
pub const CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Last successfully fetched rates, keyed by upper-case ISO code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedRates {
    pub rates: HashMap<String, f64>,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
}

impl CachedRates {
    pub fn age_ms(&self, now_ms: i64) -> i64 {
        now_ms - self.timestamp
    }

    pub fn is_fresh(&self, now_ms: i64) -> bool {
        self.age_ms(now_ms) < CACHE_TTL.as_millis() as i64
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.timestamp).unwrap_or_default()
    }
}

/// Where live rates come from. Rates are units per one US dollar, keyed by
/// upper-case ISO code.
pub trait RateSource: Send + Sync {
    fn fetch(&self) -> impl Future<Output = Result<HashMap<String, f64>>> + Send;
}

#[derive(Deserialize)]
struct LatestRates {
    rates: HashMap<String, f64>,
}

pub struct HttpRateSource {
    client: reqwest::Client,
    url: String,
}

impl HttpRateSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

impl RateSource for HttpRateSource {
    async fn fetch(&self) -> Result<HashMap<String, f64>> {
        let response = self.client.get(&self.url).send().await?;
        if !response.status().is_success() {
            return Err(Error::HttpStatus(response.status().as_u16()));
        }
        let body: LatestRates = response.json().await?;
        Ok(body.rates)
    }
}

/// Outcome of a refresh, for the rate indicator.
#[derive(Debug, Clone, PartialEq)]
pub enum RateStatus {
    Cached { updated_at: DateTime<Utc> },
    Live { updated_at: DateTime<Utc> },
    Offline,
}

impl RateStatus {
    pub fn indicator(&self) -> String {
        match self {
            RateStatus::Cached { updated_at } | RateStatus::Live { updated_at } => {
                format!("Rates updated: {}", format_local_short(*updated_at))
            }
            RateStatus::Offline => "Using offline rates".to_string(),
        }
    }
}

/// Refreshes the catalog's currency rates. Holds the catalog's only write
/// handle.
pub struct RateUpdater {
    writer: RatesWriter,
    store: Store,
    clock: Arc<dyn Clock>,
}

impl RateUpdater {
    pub fn new(writer: RatesWriter, store: Store, clock: Arc<dyn Clock>) -> Self {
        Self { writer, store, clock }
    }

    /// Adopts the cached rates if they are younger than [`CACHE_TTL`].
    /// Stale, missing and unreadable caches all return `None`.
    pub fn load_cached(&self) -> Option<RateStatus> {
        let cached = match self.store.get::<CachedRates>(RATES_KEY) {
            Ok(Some(cached)) => cached,
            Ok(None) => {
                log::info!("No cached currency rates");
                return None;
            }
            Err(e) => {
                log::warn!("Discarding unreadable rate cache: {}", e);
                return None;
            }
        };

        let now_ms = self.clock.now_millis();
        if !cached.is_fresh(now_ms) {
            log::info!(
                "Cached currency rates are stale ({} min old)",
                cached.age_ms(now_ms) / 60_000
            );
            return None;
        }

        self.writer.merge(&cached.rates);
        log::info!("Using cached currency rates from {}", cached.updated_at());
        Some(RateStatus::Cached {
            updated_at: cached.updated_at(),
        })
    }

    /// Cache first, then the network. Failures leave the loaded rates alone
    /// and report [`RateStatus::Offline`]; nothing is retried.
    pub async fn refresh<S: RateSource>(&self, source: &S) -> RateStatus {
        if let Some(status) = self.load_cached() {
            return status;
        }

        let live = match source.fetch().await {
            Ok(live) => live,
            Err(e) => {
                log::error!("Failed to fetch currency rates: {}", e);
                return RateStatus::Offline;
            }
        };

        let updated_at = self.clock.now();
        let merged = self.writer.merge(&live);
        let record = CachedRates {
            rates: merged.into_iter().collect(),
            timestamp: updated_at.timestamp_millis(),
        };
        if let Err(e) = self.store.set(RATES_KEY, &record) {
            log::warn!("Could not cache currency rates: {}", e);
        }
        log::info!("Fetched live currency rates at {}", updated_at);
        RateStatus::Live { updated_at }
    }

    /// Runs [`refresh`](Self::refresh) in the background.
    pub fn spawn<S: RateSource + 'static>(self, source: S) -> JoinHandle<RateStatus> {
        tokio::spawn(async move { self.refresh(&source).await })
    }
}
