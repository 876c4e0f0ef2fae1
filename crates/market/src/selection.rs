//! Deal selection among freshly polled candidates.
//!
//! The model picks one candidate in JSON mode. Its pick is matched back to
//! the candidate list by price so that a hallucinated or re-priced record can
//! never leave this module.

use async_trait::async_trait;
use dealwatch_core::capability::DealSelector;
use dealwatch_core::error::CapabilityError;
use dealwatch_core::listing::{Listing, parse_price};
use dealwatch_core::provider::{Provider, ProviderRequest, ResponseFormat};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{info, warn};

const SYSTEM_PROMPT: &str = "You are a second-hand listing analyst. \
From the listings given, return the single most suitable one exactly as provided, \
as a JSON object with the keys name, description, price and url. \
Use the price exactly as given; never recompute or change it. \
If none is worth buying, return {}. Return JSON only.";

/// Asks a language model to pick the best current listing.
pub struct LlmDealSelector {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
}

impl LlmDealSelector {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>, temperature: f32) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature,
        }
    }
}

/// Find the candidate the model meant. Name and price together win over price alone.
fn match_candidate<'a>(pick: &Value, candidates: &'a [Listing]) -> Option<&'a Listing> {
    let price = pick.get("price").and_then(parse_price)?;
    let name = pick.get("name").and_then(Value::as_str).map(str::trim);

    let same_price = |c: &&Listing| (c.price - price).abs() < f64::EPSILON;
    candidates
        .iter()
        .filter(same_price)
        .find(|c| Some(c.name.trim()) == name)
        .or_else(|| candidates.iter().find(same_price))
}

#[async_trait]
impl DealSelector for LlmDealSelector {
    async fn select_deal(
        &self,
        item_name: &str,
        candidates: &[Listing],
        reference_price: f64,
    ) -> Result<Option<Value>, CapabilityError> {
        if candidates.is_empty() {
            return Ok(None);
        }

        let records: Vec<_> = candidates.iter().map(Listing::to_record).collect();
        let user = json!({
            "item": item_name,
            "reference_price": reference_price,
            "listings": records,
        });
        let request = ProviderRequest::prompt(
            &self.model,
            Some(SYSTEM_PROMPT),
            user.to_string(),
            self.temperature,
        )
        .with_response_format(ResponseFormat::JsonObject);

        let response = self.provider.complete(request).await?;
        let pick: Value = match serde_json::from_str(response.message.content.trim()) {
            Ok(value) => value,
            Err(e) => {
                return Err(CapabilityError::InvalidOutput {
                    capability: "select_deal".into(),
                    reason: e.to_string(),
                });
            }
        };

        if pick.as_object().is_none_or(|o| o.is_empty()) {
            info!(item = item_name, "Model picked no listing");
            return Ok(None);
        }

        match match_candidate(&pick, candidates) {
            Some(listing) => {
                info!(name = %listing.name, price = listing.price, "Model picked a listing");
                Ok(Some(listing.to_record()))
            }
            None => {
                warn!(%pick, "Model pick matches no candidate price");
                Ok(None)
            }
        }
    }
}
