//! Seller inquiry drafting.

use async_trait::async_trait;
use dealwatch_core::capability::MessageComposer;
use dealwatch_core::error::CapabilityError;
use dealwatch_core::provider::{Provider, ProviderRequest};
use std::sync::Arc;
use tracing::info;

/// Drafts a short, polite message to the seller of a chosen listing.
pub struct LlmMessageComposer {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
}

impl LlmMessageComposer {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>, temperature: f32) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature,
        }
    }

    fn prompt(name: &str, description: &str, price: f64) -> String {
        format!(
            "You are a buyer on a second-hand marketplace writing to a seller.\n\
             Write an inquiry about this listing.\n\n\
             [Listing]\n\
             - Title: {name}\n\
             - Description: {description}\n\
             - Price: {price:.0}\n\n\
             [Rules]\n\
             1. Polite, formal register\n\
             2. Two to three sentences\n\
             3. State the intent to buy and ask whether it is still available\n\
             4. Do not haggle over the price\n\
             5. No preamble\n\n\
             Output the message only, without quotes."
        )
    }
}

#[async_trait]
impl MessageComposer for LlmMessageComposer {
    async fn compose_message(
        &self,
        name: &str,
        description: &str,
        price: f64,
    ) -> Result<String, CapabilityError> {
        let request = ProviderRequest::prompt(
            &self.model,
            None,
            Self::prompt(name, description, price),
            self.temperature,
        );
        let response = self.provider.complete(request).await?;
        let text = response.message.content.trim().to_string();
        info!(listing = name, chars = text.len(), "Inquiry drafted");
        Ok(text)
    }
}
