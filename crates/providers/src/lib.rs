//! LLM Provider implementations for dealwatch.
//!
//! All providers implement the `dealwatch_core::Provider` trait.
//! The router selects the correct provider for each model role.

pub mod openai_compat;
pub mod router;

pub use openai_compat::OpenAiCompatProvider;
pub use router::{ProviderRouter, build_from_config};
