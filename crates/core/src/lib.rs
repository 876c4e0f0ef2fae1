//! # dealwatch core
//!
//! Domain types, traits, and error definitions for the dealwatch marketplace
//! monitor. This crate has **no framework dependencies**: it defines the
//! domain model that every other crate implements against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator (listing source, price estimator, deal
//! selector, message composer, LLM provider, action-selection policy) is a
//! trait here. Implementations live in their own crates, so the orchestration
//! core can be driven by scripted stand-ins in tests.

pub mod action;
pub mod capability;
pub mod error;
pub mod event;
pub mod fingerprint;
pub mod listing;
pub mod message;
pub mod policy;
pub mod provider;
pub mod state;

// Re-export key types at crate root for ergonomics
pub use action::{ActionKind, ActionProposal};
pub use capability::{Capabilities, DealSelector, ListingSource, MessageComposer, PriceEstimator, RawRecords};
pub use error::{CapabilityError, DispatchError, Error, PolicyError, ProviderError, Result};
pub use event::{DomainEvent, EventBus};
pub use fingerprint::Fingerprint;
pub use listing::Listing;
pub use message::{Message, MessageToolCall, Role};
pub use policy::Policy;
pub use provider::{Provider, ProviderRequest, ProviderResponse, ResponseFormat, ToolDefinition, Usage};
pub use state::{ActionOutcome, HistoryEntry, SessionId, SessionParams, SessionState};
