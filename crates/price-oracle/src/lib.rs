#![deny(warnings)]

//! Market price lookups by product category.
//!
//! A lookup submits a search job to a price service, polls it until it
//! finishes or is cancelled, downloads the listings and averages them. The
//! [`CachedPriceOracle`] wraps that flow with a bounded per-category cache
//! shared for the process lifetime and degrades every failure to "no data".

mod cache;
mod job;
mod table;

pub use cache::PriceCache;
pub use job::{fetch_listings, JobState};
pub use table::ListingTable;

use async_trait::async_trait;
use launch_core::PriceOracle;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Mutex;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Identifier assigned to a submitted search job.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub String);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Remote status of a search job.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Still running; poll again later.
    Working,
    Finished,
    Cancelled,
}

/// One search result: the observed price range of a listing.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub min_price: f64,
    pub max_price: f64,
}

impl Listing {
    pub fn midpoint(&self) -> f64 {
        (self.min_price + self.max_price) / 2.0
    }
}

/// Transport to a price-search job service.
#[async_trait]
pub trait PriceJobClient: Send + Sync {
    /// Submit a search for `category` and return the new job's id.
    async fn submit(&self, category: &str) -> Result<JobId, OracleError>;
    /// Current status of a submitted job.
    async fn status(&self, job: &JobId) -> Result<JobStatus, OracleError>;
    /// Listings of a finished job.
    async fn download(&self, job: &JobId) -> Result<Vec<Listing>, OracleError>;
}

/// Errors produced while looking up a market price.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum OracleError {
    /// The service could not be reached or answered garbage.
    #[error("price service transport error: {0}")]
    Transport(String),
    /// The service cancelled the job.
    #[error("price job {0} was cancelled")]
    Cancelled(JobId),
    /// The job did not finish within the poll budget.
    #[error("price job {job} still running after {polls} polls")]
    PollLimit { job: JobId, polls: u32 },
    /// The job finished without any listings.
    #[error("no listings found for category {0}")]
    NoListings(String),
}

/// Poll and cache settings for the oracle.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    /// Delay between two status checks.
    pub poll_interval_ms: u64,
    /// Status checks before a running job is abandoned.
    pub max_polls: u32,
    /// Maximum number of cached categories.
    pub cache_capacity: usize,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1_000,
            max_polls: 60,
            cache_capacity: 200,
        }
    }
}

impl OracleConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Longest a lookup can spend polling before it gives up.
    pub fn poll_budget(&self) -> Duration {
        self.poll_interval().saturating_mul(self.max_polls)
    }
}

/// Mean listing midpoint, or `None` without listings.
pub fn average_listing_price(listings: &[Listing]) -> Option<f64> {
    if listings.is_empty() {
        return None;
    }
    let total: f64 = listings.iter().map(Listing::midpoint).sum();
    Some(total / listings.len() as f64)
}

/// Read-through cached oracle over a job client.
pub struct CachedPriceOracle<C> {
    client: C,
    config: OracleConfig,
    cache: Mutex<PriceCache>,
}

impl<C: PriceJobClient> CachedPriceOracle<C> {
    pub fn new(client: C, config: OracleConfig) -> Self {
        let cache = Mutex::new(PriceCache::new(config.cache_capacity));
        Self {
            client,
            config,
            cache,
        }
    }

    /// Uncached lookup surfacing the failure reason.
    pub async fn lookup(&self, category: &str) -> Result<f64, OracleError> {
        let listings = fetch_listings(&self.client, category, &self.config).await?;
        average_listing_price(&listings)
            .ok_or_else(|| OracleError::NoListings(category.to_string()))
    }

    /// Number of cached categories.
    pub fn cached_len(&self) -> usize {
        self.cache.lock().map(|c| c.len()).unwrap_or(0)
    }

    fn cached(&self, category: &str) -> Option<f64> {
        self.cache.lock().ok().and_then(|mut c| c.get(category))
    }

    fn remember(&self, category: &str, price: f64) {
        if let Ok(mut c) = self.cache.lock() {
            c.insert(category.to_string(), price);
        }
    }
}

#[async_trait]
impl<C: PriceJobClient> PriceOracle for CachedPriceOracle<C> {
    async fn average_price(&self, category: &str) -> Option<f64> {
        if let Some(price) = self.cached(category) {
            debug!(category, price, "price cache hit");
            return Some(price);
        }
        match self.lookup(category).await {
            Ok(price) => {
                self.remember(category, price);
                Some(price)
            }
            Err(err) => {
                warn!(category, error = %err, "failed to fetch market price");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn fast() -> OracleConfig {
        OracleConfig {
            poll_interval_ms: 1,
            max_polls: 5,
            cache_capacity: 2,
        }
    }

    fn table() -> ListingTable {
        let mut listings = BTreeMap::new();
        listings.insert(
            "Toothpaste".to_string(),
            vec![
                Listing {
                    min_price: 4.0,
                    max_price: 6.0,
                },
                Listing {
                    min_price: 9.0,
                    max_price: 11.0,
                },
            ],
        );
        listings.insert("Floss".to_string(), vec![]);
        ListingTable::new(listings)
    }

    #[test]
    fn averages_midpoints() {
        let l = [
            Listing {
                min_price: 1.0,
                max_price: 3.0,
            },
            Listing {
                min_price: 5.0,
                max_price: 5.0,
            },
        ];
        assert_eq!(average_listing_price(&l), Some(3.5));
        assert_eq!(average_listing_price(&[]), None);
    }

    #[test]
    fn config_defaults_fill_missing_fields() {
        let cfg: OracleConfig = serde_yaml::from_str("max_polls: 3").unwrap();
        assert_eq!(cfg.max_polls, 3);
        assert_eq!(cfg.poll_interval_ms, 1_000);
        assert_eq!(cfg.cache_capacity, 200);
        assert_eq!(cfg.poll_budget(), Duration::from_secs(3));
    }

    #[tokio::test]
    async fn average_price_is_cached() {
        let oracle = CachedPriceOracle::new(table(), fast());
        assert_eq!(oracle.average_price("Toothpaste").await, Some(7.5));
        assert_eq!(oracle.cached_len(), 1);
        assert_eq!(oracle.average_price("Toothpaste").await, Some(7.5));
        assert_eq!(oracle.client.submitted(), 1);
    }

    #[tokio::test]
    async fn no_data_degrades_to_none_and_is_not_cached() {
        let oracle = CachedPriceOracle::new(table(), fast());
        assert_eq!(oracle.average_price("Floss").await, None);
        assert_eq!(oracle.average_price("Mouthwash").await, None);
        assert_eq!(oracle.cached_len(), 0);
        assert_eq!(
            oracle.lookup("Floss").await,
            Err(OracleError::NoListings("Floss".to_string()))
        );
    }

    #[tokio::test]
    async fn slow_jobs_are_polled_to_completion() {
        let oracle = CachedPriceOracle::new(table().with_latency(3), fast());
        assert_eq!(oracle.average_price("Toothpaste").await, Some(7.5));
    }

    #[tokio::test]
    async fn poll_budget_exhaustion_is_no_data() {
        let oracle = CachedPriceOracle::new(table().with_latency(50), fast());
        assert!(matches!(
            oracle.lookup("Toothpaste").await,
            Err(OracleError::PollLimit { polls: 5, .. })
        ));
        assert_eq!(oracle.average_price("Toothpaste").await, None);
    }

    #[tokio::test]
    async fn cancelled_jobs_are_no_data() {
        let oracle = CachedPriceOracle::new(table().cancelling("Toothpaste"), fast());
        assert!(matches!(
            oracle.lookup("Toothpaste").await,
            Err(OracleError::Cancelled(_))
        ));
        assert_eq!(oracle.average_price("Toothpaste").await, None);
    }
}
