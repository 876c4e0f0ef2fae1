//! Market capabilities for dealwatch.
//!
//! Concrete implementations of the capability traits in `dealwatch-core`:
//! a container-backed listing source and three language-model helpers
//! (price estimation, deal selection, inquiry drafting).

pub mod composer;
pub mod container;
pub mod pricing;
pub mod selection;
pub mod source;

#[cfg(test)]
mod test_helpers;

pub use composer::LlmMessageComposer;
pub use container::ContainerRunner;
pub use pricing::LlmPriceEstimator;
pub use selection::LlmDealSelector;
pub use source::ContainerListingSource;

use dealwatch_config::AppConfig;
use dealwatch_core::capability::Capabilities;
use dealwatch_core::error::{Error, ProviderError};
use dealwatch_providers::ProviderRouter;
use std::sync::Arc;
use std::time::Duration;

/// Wire every capability from configuration.
///
/// Price estimation and deal selection run on the `reasoning` model,
/// inquiry drafting on the `composer` model.
pub fn build_capabilities(config: &AppConfig, router: &ProviderRouter) -> Result<Capabilities, Error> {
    let reasoning = router.for_role(&config.reasoning).ok_or_else(|| {
        ProviderError::NotConfigured(format!("provider '{}'", config.reasoning.provider))
    })?;
    let composer = router.for_role(&config.composer).ok_or_else(|| {
        ProviderError::NotConfigured(format!("provider '{}'", config.composer.provider))
    })?;

    let runner = ContainerRunner::new(
        &config.market.docker_bin,
        Duration::from_secs(config.market.timeout_secs),
    )
    .with_extra_args(config.market.extra_args.clone());

    Ok(Capabilities::new(
        Arc::new(ContainerListingSource::new(runner, &config.market.image)),
        Arc::new(LlmPriceEstimator::new(
            reasoning.clone(),
            &config.reasoning.model,
            config.reasoning.temperature,
        )),
        Arc::new(LlmDealSelector::new(
            reasoning,
            &config.reasoning.model,
            config.reasoning.temperature,
        )),
        Arc::new(LlmMessageComposer::new(
            composer,
            &config.composer.model,
            config.composer.temperature,
        )),
    ))
}
