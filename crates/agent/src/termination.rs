//! Termination evaluator.

use dealwatch_core::state::SessionState;
use serde::{Deserialize, Serialize};

/// Why a session stopped on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// A deal is selected and an inquiry is drafted.
    Success,
    /// The poll budget is used up.
    Exhausted,
}

/// Decide whether `state` is terminal. Success wins over exhaustion.
pub fn evaluate(state: &SessionState) -> Option<Termination> {
    let drafted = state.inquiry().is_some_and(|text| !text.is_empty());
    if state.deal_found() && drafted {
        return Some(Termination::Success);
    }

    let budget = state.max_polls();
    if budget > 0 && state.polls_completed() >= budget {
        return Some(Termination::Exhausted);
    }

    None
}

pub fn is_terminal(state: &SessionState) -> bool {
    evaluate(state).is_some()
}
