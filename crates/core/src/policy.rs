//! Action-selection policy trait.
//!
//! A policy looks at the session and its history and proposes the next action,
//! or nothing. The core makes no assumption about how it decides (rule table,
//! learned model, remote LLM); only the output shape matters.

use async_trait::async_trait;

use crate::action::ActionProposal;
use crate::error::PolicyError;
use crate::state::{HistoryEntry, SessionState};

#[async_trait]
pub trait Policy: Send + Sync {
    /// A human-readable name for this policy (e.g., "rules", "llm").
    fn name(&self) -> &str;

    /// Propose the next action. `Ok(None)` means "nothing useful to do yet".
    async fn decide(
        &self,
        state: &SessionState,
        history: &[HistoryEntry],
    ) -> Result<Option<ActionProposal>, PolicyError>;
}
