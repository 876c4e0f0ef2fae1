//! Capability traits — the external collaborators the core dispatches to.
//!
//! Implementations live in `dealwatch-market`. The core treats every one of
//! them as slow and possibly failing; errors are absorbed by the dispatcher.

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::CapabilityError;
use crate::listing::Listing;

/// Raw listing records as returned by a source (`{name, description, price, url}`),
/// not yet validated.
pub type RawRecords = Vec<serde_json::Value>;

/// Fetches listings from the marketplace.
#[async_trait]
pub trait ListingSource: Send + Sync {
    /// Past (completed) sales for `item_name`, across all regions.
    async fn search_historical(&self, item_name: &str) -> Result<RawRecords, CapabilityError>;

    /// Listings currently for sale, optionally filtered by region.
    /// Must be safe to call every poll interval.
    async fn search_current(
        &self,
        item_name: &str,
        region: Option<&str>,
    ) -> Result<RawRecords, CapabilityError>;
}

/// Infers a fair reference price. Returns 0 when it cannot.
#[async_trait]
pub trait PriceEstimator: Send + Sync {
    async fn infer_price(
        &self,
        item_name: &str,
        historical: &[Listing],
    ) -> Result<f64, CapabilityError>;
}

/// Picks at most one listing from the current candidates.
///
/// The returned record's price must be one of the candidates' prices.
#[async_trait]
pub trait DealSelector: Send + Sync {
    async fn select_deal(
        &self,
        item_name: &str,
        candidates: &[Listing],
        reference_price: f64,
    ) -> Result<Option<serde_json::Value>, CapabilityError>;
}

/// Drafts a human-readable inquiry. An empty string signals failure.
#[async_trait]
pub trait MessageComposer: Send + Sync {
    async fn compose_message(
        &self,
        name: &str,
        description: &str,
        price: f64,
    ) -> Result<String, CapabilityError>;
}

/// The full set of collaborators one session dispatches to.
#[derive(Clone)]
pub struct Capabilities {
    pub listings: Arc<dyn ListingSource>,
    pub estimator: Arc<dyn PriceEstimator>,
    pub selector: Arc<dyn DealSelector>,
    pub composer: Arc<dyn MessageComposer>,
}

impl Capabilities {
    pub fn new(
        listings: Arc<dyn ListingSource>,
        estimator: Arc<dyn PriceEstimator>,
        selector: Arc<dyn DealSelector>,
        composer: Arc<dyn MessageComposer>,
    ) -> Self {
        Self {
            listings,
            estimator,
            selector,
            composer,
        }
    }
}
