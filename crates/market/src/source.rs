//! Listing source backed by the `search-list` collector image.
//!
//! The image reads `MODE` (`ALL` for past sales, `CURRENT` for live listings),
//! `ITEM_NAME` and an optional `REGION` from its environment and prints the
//! matching records as JSON.

use async_trait::async_trait;
use dealwatch_core::capability::{ListingSource, RawRecords};
use dealwatch_core::error::CapabilityError;
use serde_json::Value;
use tracing::{debug, info};

use crate::container::ContainerRunner;

/// Fetches listings by running the collector image once per search.
pub struct ContainerListingSource {
    runner: ContainerRunner,
    image: String,
}

impl ContainerListingSource {
    pub fn new(runner: ContainerRunner, image: impl Into<String>) -> Self {
        Self {
            runner,
            image: image.into(),
        }
    }

    async fn fetch(&self, env: &[(&str, &str)]) -> Result<RawRecords, CapabilityError> {
        let output = self.runner.run(&self.image, env).await?;
        let records = into_records(output);
        debug!(image = %self.image, count = records.len(), "Collector returned records");
        Ok(records)
    }
}

/// An array is taken as-is, a lone object becomes a single record.
fn into_records(output: Value) -> RawRecords {
    match output {
        Value::Array(items) => items,
        Value::Object(_) => vec![output],
        _ => Vec::new(),
    }
}

#[async_trait]
impl ListingSource for ContainerListingSource {
    async fn search_historical(&self, item_name: &str) -> Result<RawRecords, CapabilityError> {
        info!(item = item_name, "Searching past sales");
        self.fetch(&[("MODE", "ALL"), ("ITEM_NAME", item_name)]).await
    }

    async fn search_current(
        &self,
        item_name: &str,
        region: Option<&str>,
    ) -> Result<RawRecords, CapabilityError> {
        info!(item = item_name, region = region.unwrap_or("-"), "Searching current listings");
        let mut env = vec![("MODE", "CURRENT"), ("ITEM_NAME", item_name)];
        if let Some(region) = region {
            env.push(("REGION", region));
        }
        self.fetch(&env).await
    }
}
