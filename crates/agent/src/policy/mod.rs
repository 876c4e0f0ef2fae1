//! Action-selection policies.
//!
//! - `rules`: fixed pipeline over state and history (default)
//! - `llm`: a tool-calling language model picks the next action

pub mod llm;
pub mod rules;

pub use llm::LlmPolicy;
pub use rules::RulePolicy;

use dealwatch_config::AppConfig;
use dealwatch_core::error::{Error, ProviderError};
use dealwatch_core::policy::Policy;
use dealwatch_providers::ProviderRouter;
use std::sync::Arc;

/// Build the policy named by `policy.kind`.
pub fn build_policy(config: &AppConfig, router: &ProviderRouter) -> Result<Arc<dyn Policy>, Error> {
    match config.policy.kind.as_str() {
        "rules" => Ok(Arc::new(RulePolicy::new())),
        "llm" => {
            let provider = router.for_role(&config.reasoning).ok_or_else(|| {
                ProviderError::NotConfigured(format!("provider '{}'", config.reasoning.provider))
            })?;
            Ok(Arc::new(LlmPolicy::new(
                provider,
                &config.reasoning.model,
                config.reasoning.temperature,
            )))
        }
        other => Err(Error::Config {
            message: format!("unknown policy kind '{other}' (expected 'rules' or 'llm')"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dealwatch_providers::build_from_config;

    #[test]
    fn builds_each_kind() {
        let mut config = AppConfig::default();
        let router = build_from_config(&config);
        assert_eq!(build_policy(&config, &router).unwrap().name(), "rules");

        config.policy.kind = "llm".into();
        assert_eq!(build_policy(&config, &router).unwrap().name(), "llm");
    }

    #[test]
    fn unknown_kind_is_a_config_error() {
        let mut config = AppConfig::default();
        config.policy.kind = "oracle".into();
        let router = ProviderRouter::new();
        assert!(matches!(build_policy(&config, &router), Err(Error::Config { .. })));
    }

    #[test]
    fn llm_policy_needs_a_provider() {
        let mut config = AppConfig::default();
        config.policy.kind = "llm".into();
        let router = ProviderRouter::new();
        assert!(matches!(build_policy(&config, &router), Err(Error::Provider(_))));
    }
}
