//! Configuration loading, validation, and management for dealwatch.
//!
//! Loads configuration from `~/.dealwatch/config.toml` with environment
//! variable overrides. Validates all settings at startup. CLI flags are
//! applied on top by the binary.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.dealwatch/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key (can be overridden per-provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Session defaults (poll interval, budget, region)
    #[serde(default)]
    pub session: SessionConfig,

    /// Action-selection policy
    #[serde(default)]
    pub policy: PolicyConfig,

    /// Listing source
    #[serde(default)]
    pub market: MarketConfig,

    /// Model used for price inference, deal selection and the LLM policy
    #[serde(default)]
    pub reasoning: ModelConfig,

    /// Model used to draft inquiry messages
    #[serde(default = "default_composer", deserialize_with = "composer_table")]
    pub composer: ModelConfig,

    /// Provider-specific configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("session", &self.session)
            .field("policy", &self.policy)
            .field("market", &self.market)
            .field("reasoning", &self.reasoning)
            .field("composer", &self.composer)
            .field("providers", &self.providers)
            .finish()
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("default_model", &self.default_model)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Seconds to wait after a poll that found nothing new
    #[serde(default = "default_poll_seconds")]
    pub poll_seconds: u64,

    /// Maximum completed searches (0 = unbounded)
    #[serde(default = "default_max_polls")]
    pub max_polls: u32,

    /// Region filter for current-market searches
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    /// Upper bound on decision rounds per session
    #[serde(default = "default_max_steps")]
    pub max_steps: u32,

    /// Consecutive skipped dispatches before the loop backs off to waiting
    #[serde(default = "default_max_consecutive_skips")]
    pub max_consecutive_skips: u32,

    /// Wall-clock limit for the whole session
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

fn default_poll_seconds() -> u64 {
    10
}
fn default_max_polls() -> u32 {
    120
}
fn default_max_steps() -> u32 {
    1000
}
fn default_max_consecutive_skips() -> u32 {
    3
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            poll_seconds: default_poll_seconds(),
            max_polls: default_max_polls(),
            region: None,
            max_steps: default_max_steps(),
            max_consecutive_skips: default_max_consecutive_skips(),
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// "rules" (deterministic rule table) or "llm" (tool-calling model)
    #[serde(default = "default_policy_kind")]
    pub kind: String,

    /// Reject selected deals priced above the reference price
    #[serde(default = "default_true")]
    pub enforce_price_ceiling: bool,
}

fn default_policy_kind() -> String {
    "rules".into()
}
fn default_true() -> bool {
    true
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            kind: default_policy_kind(),
            enforce_price_ceiling: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketConfig {
    /// Container runtime binary
    #[serde(default = "default_docker_bin")]
    pub docker_bin: String,

    /// Image that prints listing records as JSON on stdout
    #[serde(default = "default_market_image")]
    pub image: String,

    /// Per-search timeout
    #[serde(default = "default_market_timeout")]
    pub timeout_secs: u64,

    /// Extra arguments inserted after `run` (e.g. `--rm`, `--network=host`)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra_args: Vec<String>,
}

fn default_docker_bin() -> String {
    "docker".into()
}
fn default_market_image() -> String {
    "search-list".into()
}
fn default_market_timeout() -> u64 {
    60
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            docker_bin: default_docker_bin(),
            image: default_market_image(),
            timeout_secs: default_market_timeout(),
            extra_args: vec![],
        }
    }
}

/// Which provider and model a role uses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_reasoning_provider")]
    pub provider: String,

    #[serde(default = "default_reasoning_model")]
    pub model: String,

    #[serde(default)]
    pub temperature: f32,
}

fn default_reasoning_provider() -> String {
    "openai".into()
}
fn default_reasoning_model() -> String {
    "gpt-4o-mini".into()
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: default_reasoning_provider(),
            model: default_reasoning_model(),
            temperature: 0.0,
        }
    }
}

fn default_composer() -> ModelConfig {
    ModelConfig {
        provider: "ollama".into(),
        model: "gpt-oss:20b".into(),
        temperature: 0.3,
    }
}

/// A role table where every key is optional.
#[derive(Deserialize)]
struct PartialModelConfig {
    provider: Option<String>,
    model: Option<String>,
    temperature: Option<f32>,
}

impl PartialModelConfig {
    fn over(self, base: ModelConfig) -> ModelConfig {
        ModelConfig {
            provider: self.provider.unwrap_or(base.provider),
            model: self.model.unwrap_or(base.model),
            temperature: self.temperature.unwrap_or(base.temperature),
        }
    }
}

/// Keys missing from `[composer]` fall back to the composer defaults.
fn composer_table<'de, D>(deserializer: D) -> Result<ModelConfig, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(PartialModelConfig::deserialize(deserializer)?.over(default_composer()))
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
}

impl AppConfig {
    /// Load configuration from the default path (~/.dealwatch/config.toml).
    ///
    /// Also checks environment variables for API keys:
    /// - `DEALWATCH_API_KEY` (highest priority)
    /// - `OPENAI_API_KEY`
    /// - `OPENROUTER_API_KEY`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();
        let mut config = Self::load_from(&config_path)?;
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    fn apply_env(&mut self) {
        if self.api_key.is_none() {
            self.api_key = std::env::var("DEALWATCH_API_KEY")
                .ok()
                .or_else(|| std::env::var("OPENAI_API_KEY").ok())
                .or_else(|| std::env::var("OPENROUTER_API_KEY").ok());
        }

        if let Ok(provider) = std::env::var("DEALWATCH_PROVIDER") {
            self.reasoning.provider = provider;
        }

        if let Ok(model) = std::env::var("DEALWATCH_MODEL") {
            self.reasoning.model = model;
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".dealwatch")
    }

    /// Get the default configuration file path.
    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (role, model) in [("reasoning", &self.reasoning), ("composer", &self.composer)] {
            if !(0.0..=2.0).contains(&model.temperature) {
                return Err(ConfigError::ValidationError(format!(
                    "{role}.temperature must be between 0.0 and 2.0"
                )));
            }
            if model.model.trim().is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "{role}.model must not be empty"
                )));
            }
        }

        if !matches!(self.policy.kind.as_str(), "rules" | "llm") {
            return Err(ConfigError::ValidationError(format!(
                "policy.kind must be \"rules\" or \"llm\", got \"{}\"",
                self.policy.kind
            )));
        }

        if self.session.max_steps == 0 {
            return Err(ConfigError::ValidationError(
                "session.max_steps must be > 0".into(),
            ));
        }

        if self.market.image.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "market.image must not be empty".into(),
            ));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Model roles whose provider needs a key but has none configured.
    ///
    /// Ollama runs locally and never needs one.
    pub fn roles_missing_key(&self) -> Vec<(&'static str, &str)> {
        [("reasoning", &self.reasoning), ("composer", &self.composer)]
            .into_iter()
            .filter(|(_, role)| role.provider != "ollama")
            .filter(|(_, role)| {
                let per_provider = self
                    .providers
                    .get(&role.provider)
                    .is_some_and(|p| p.api_key.is_some());
                !per_provider && !self.has_api_key()
            })
            .map(|(name, role)| (name, role.provider.as_str()))
            .collect()
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            session: SessionConfig::default(),
            policy: PolicyConfig::default(),
            market: MarketConfig::default(),
            reasoning: ModelConfig::default(),
            composer: default_composer(),
            providers: HashMap::new(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.session.poll_seconds, 10);
        assert_eq!(config.session.max_polls, 120);
        assert_eq!(config.policy.kind, "rules");
        assert!(config.policy.enforce_price_ceiling);
        assert_eq!(config.composer.provider, "ollama");
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.reasoning.model, config.reasoning.model);
        assert_eq!(parsed.composer.model, config.composer.model);
        assert_eq!(parsed.market.image, config.market.image);
    }

    #[test]
    fn invalid_temperature_rejected() {
        let mut config = AppConfig::default();
        config.composer.temperature = 5.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn unknown_policy_rejected() {
        let mut config = AppConfig::default();
        config.policy.kind = "random".into();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("policy.kind"));
    }

    #[test]
    fn zero_max_steps_rejected() {
        let mut config = AppConfig::default();
        config.session.max_steps = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let result = AppConfig::load_from(Path::new("/nonexistent/config.toml"));
        let config = result.unwrap();
        assert_eq!(config.reasoning.provider, "openai");
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[session]
poll_seconds = 30
region = "Munjeong-dong-6184"

[policy]
enforce_price_ceiling = false

[providers.openai]
api_key = "sk-test"
"#,
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.session.poll_seconds, 30);
        assert_eq!(config.session.max_polls, 120);
        assert_eq!(config.session.region.as_deref(), Some("Munjeong-dong-6184"));
        assert!(!config.policy.enforce_price_ceiling);
        assert_eq!(config.policy.kind, "rules");
        assert_eq!(config.composer.model, "gpt-oss:20b");
        assert!(config.providers.contains_key("openai"));
    }

    #[test]
    fn partial_composer_table_keeps_composer_defaults() {
        let config: AppConfig = toml::from_str("[composer]\nmodel = \"llama3\"").unwrap();
        assert_eq!(config.composer.model, "llama3");
        assert_eq!(config.composer.provider, "ollama");
        assert_eq!(config.composer.temperature, 0.3);
        assert_eq!(config.reasoning.provider, "openai");
    }

    #[test]
    fn partial_reasoning_table_keeps_reasoning_defaults() {
        let config: AppConfig = toml::from_str("[reasoning]\ntemperature = 0.5").unwrap();
        assert_eq!(config.reasoning.provider, "openai");
        assert_eq!(config.reasoning.model, "gpt-4o-mini");
        assert_eq!(config.composer.provider, "ollama");
    }

    #[test]
    fn keyless_roles_are_reported() {
        let mut config = AppConfig::default();
        assert_eq!(config.roles_missing_key(), vec![("reasoning", "openai")]);

        config.composer.provider = "openrouter".into();
        assert_eq!(
            config.roles_missing_key(),
            vec![("reasoning", "openai"), ("composer", "openrouter")]
        );

        config.providers.insert(
            "openrouter".into(),
            ProviderConfig {
                api_key: Some("or-key".into()),
                api_url: None,
                default_model: None,
            },
        );
        assert_eq!(config.roles_missing_key(), vec![("reasoning", "openai")]);

        config.api_key = Some("sk-test".into());
        assert!(config.roles_missing_key().is_empty());
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "session = [not toml").unwrap();
        let err = AppConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn debug_redacts_api_keys() {
        let config = AppConfig {
            api_key: Some("sk-secret".into()),
            ..AppConfig::default()
        };
        let dbg = format!("{config:?}");
        assert!(!dbg.contains("sk-secret"));
        assert!(dbg.contains("[REDACTED]"));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("gpt-4o-mini"));
        assert!(toml_str.contains("search-list"));
    }
}
