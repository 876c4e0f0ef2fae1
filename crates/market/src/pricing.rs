//! Reference price estimation from past sales.

use async_trait::async_trait;
use dealwatch_core::capability::PriceEstimator;
use dealwatch_core::error::CapabilityError;
use dealwatch_core::listing::Listing;
use dealwatch_core::provider::{Provider, ProviderRequest};
use std::sync::Arc;
use tracing::{info, warn};

const SYSTEM_PROMPT: &str = "You are a second-hand market pricing analyst. \
Given a list of past sales, produce a single reasonable price as a whole number \
in the listings' currency. Do not convert units. Reply with the number only, e.g. 1250000.";

/// Asks a language model for a fair price given past sales.
pub struct LlmPriceEstimator {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
}

impl LlmPriceEstimator {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>, temperature: f32) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature,
        }
    }

    fn user_prompt(item_name: &str, historical: &[Listing]) -> String {
        let records: Vec<_> = historical.iter().map(Listing::to_record).collect();
        format!(
            "Past sales for '{item_name}':\n{}\n\n\
             Requirements:\n\
             - whole number in the listings' currency\n\
             - weigh both the overall average and recent trends\n\
             - output the number only",
            serde_json::Value::Array(records)
        )
    }
}

/// Parse a bare numeric reply, tolerating thousands separators.
fn parse_reply(reply: &str) -> Option<f64> {
    let cleaned: String = reply.trim().chars().filter(|c| *c != ',').collect();
    cleaned.parse::<f64>().ok().filter(|p| p.is_finite())
}

#[async_trait]
impl PriceEstimator for LlmPriceEstimator {
    async fn infer_price(
        &self,
        item_name: &str,
        historical: &[Listing],
    ) -> Result<f64, CapabilityError> {
        if historical.is_empty() {
            warn!(item = item_name, "No past sales to price against");
            return Ok(0.0);
        }

        let request = ProviderRequest::prompt(
            &self.model,
            Some(SYSTEM_PROMPT),
            Self::user_prompt(item_name, historical),
            self.temperature,
        );
        let response = self.provider.complete(request).await?;

        match parse_reply(&response.message.content) {
            Some(price) => {
                info!(item = item_name, price, "Reference price inferred");
                Ok(price)
            }
            None => {
                warn!(reply = %response.message.content, "Price reply was not a number");
                Ok(0.0)
            }
        }
    }
}
