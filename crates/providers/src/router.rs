//! Provider router — selects the correct LLM provider based on config.
//!
//! Handles provider creation and lookup by name. Each model role
//! (`reasoning`, `composer`) names the provider it runs on.

use std::collections::HashMap;
use std::sync::Arc;
use dealwatch_config::{AppConfig, ModelConfig};
use dealwatch_core::provider::Provider;
use crate::openai_compat::OpenAiCompatProvider;

/// Routes LLM requests to the correct provider.
pub struct ProviderRouter {
    providers: HashMap<String, Arc<dyn Provider>>,
}

impl ProviderRouter {
    pub fn new() -> Self {
        Self {
            providers: HashMap::new(),
        }
    }

    /// Register a provider.
    pub fn register(&mut self, name: impl Into<String>, provider: Arc<dyn Provider>) {
        self.providers.insert(name.into(), provider);
    }

    /// Get a specific provider by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Provider>> {
        self.providers.get(name).cloned()
    }

    /// The provider a model role runs on.
    pub fn for_role(&self, role: &ModelConfig) -> Option<Arc<dyn Provider>> {
        self.get(&role.provider)
    }

    /// List all registered provider names.
    pub fn list(&self) -> Vec<&str> {
        self.providers.keys().map(|s| s.as_str()).collect()
    }
}

impl Default for ProviderRouter {
    fn default() -> Self {
        Self::new()
    }
}

/// Build providers from configuration.
///
/// Every `[providers.<name>]` table is registered, plus the providers named by
/// the `reasoning` and `composer` roles even when they have no table.
pub fn build_from_config(config: &AppConfig) -> ProviderRouter {
    let mut router = ProviderRouter::new();

    for (name, provider_config) in &config.providers {
        let api_key = provider_config
            .api_key
            .clone()
            .or_else(|| config.api_key.clone())
            .unwrap_or_default();

        let base_url = provider_config
            .api_url
            .clone()
            .unwrap_or_else(|| default_base_url(name));

        router.register(
            name.clone(),
            Arc::new(OpenAiCompatProvider::new(name, &base_url, &api_key)),
        );
    }

    for role in [&config.reasoning, &config.composer] {
        if router.get(&role.provider).is_some() {
            continue;
        }
        let api_key = if role.provider == "ollama" {
            "ollama".to_string()
        } else {
            config.api_key.clone().unwrap_or_default()
        };
        let base_url = default_base_url(&role.provider);
        router.register(
            role.provider.clone(),
            Arc::new(OpenAiCompatProvider::new(&role.provider, &base_url, &api_key)),
        );
    }

    router
}

/// Get the default base URL for well-known providers.
fn default_base_url(provider_name: &str) -> String {
    match provider_name {
        "openai" => "https://api.openai.com/v1".into(),
        "openrouter" => "https://openrouter.ai/api/v1".into(),
        "ollama" => "http://localhost:11434/v1".into(),
        "groq" => "https://api.groq.com/openai/v1".into(),
        "together" => "https://api.together.xyz/v1".into(),
        "vllm" => "http://localhost:8000/v1".into(),
        "llamacpp" | "llama.cpp" => "http://localhost:8080/v1".into(),
        _ => format!("https://{provider_name}.api.example.com/v1"),
    }
}
