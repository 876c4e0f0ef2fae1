//! Error types for the dealwatch domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant. Only the variants wrapped
//! by the top-level [`Error`] ever escape the control loop; capability and
//! policy failures are absorbed where they happen.

use thiserror::Error;

/// The top-level error type for all dealwatch operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Dispatch errors (contract violations between policy and dispatcher) ---
    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    // --- Policy errors ---
    #[error("Policy error: {0}")]
    Policy(#[from] PolicyError),

    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError {
        status_code: u16,
        message: String,
    },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

/// Raised by the action dispatcher. Unlike a skip, these are fatal.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DispatchError {
    #[error("Unrecognized action: {0}")]
    UnknownAction(String),

    #[error("Action arguments must be a JSON object, got: {0}")]
    MalformedArguments(String),
}

/// Failures of an external collaborator (listing source, estimator, selector, composer).
#[derive(Debug, Clone, Error)]
pub enum CapabilityError {
    #[error("{capability} timed out after {timeout_secs}s")]
    Timeout {
        capability: String,
        timeout_secs: u64,
    },

    #[error("{capability} failed: {reason}")]
    ExecutionFailed { capability: String, reason: String },

    #[error("{capability} returned unusable output: {reason}")]
    InvalidOutput { capability: String, reason: String },

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

#[derive(Debug, Clone, Error)]
pub enum PolicyError {
    #[error("Policy provider call failed: {0}")]
    Provider(#[from] ProviderError),

    #[error("Invalid action proposal: {0}")]
    InvalidProposal(String),
}
