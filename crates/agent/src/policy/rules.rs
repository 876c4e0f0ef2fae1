//! Rule-table policy.
//!
//! Walks the fixed pipeline: past sales, reference price, current listings,
//! selection, inquiry. Each rule reads only the state and its history.

use async_trait::async_trait;
use dealwatch_core::action::{ActionKind, ActionProposal};
use dealwatch_core::error::PolicyError;
use dealwatch_core::policy::Policy;
use dealwatch_core::state::{HistoryEntry, SessionState};
use std::sync::Mutex;
use tracing::debug;

/// Price inference attempts per historical set before fetching it again.
const MAX_PRICE_ATTEMPTS: usize = 2;

/// Deterministic policy used by default.
#[derive(Debug, Default)]
pub struct RulePolicy {
    /// History length at which the policy last deferred, so a deferral is
    /// followed by a retry after the wait instead of another deferral.
    deferred_at: Mutex<Option<usize>>,
}

impl RulePolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` the first time it is asked at a given history length.
    fn defer_once(&self, history_len: usize) -> bool {
        let mut deferred = self
            .deferred_at
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if *deferred == Some(history_len) {
            false
        } else {
            *deferred = Some(history_len);
            true
        }
    }
}

/// Failed inference attempts since the most recent historical search.
fn price_attempts(history: &[HistoryEntry]) -> usize {
    history
        .iter()
        .rev()
        .take_while(|h| h.action != ActionKind::SearchHistorical)
        .filter(|h| h.action == ActionKind::InferPrice)
        .count()
}

fn last_failed(history: &[HistoryEntry], action: ActionKind) -> bool {
    history
        .last()
        .is_some_and(|h| h.action == action && !h.outcome.is_applied())
}

#[async_trait]
impl Policy for RulePolicy {
    fn name(&self) -> &str {
        "rules"
    }

    async fn decide(
        &self,
        state: &SessionState,
        history: &[HistoryEntry],
    ) -> Result<Option<ActionProposal>, PolicyError> {
        let next = if state.historical().is_empty() {
            if last_failed(history, ActionKind::SearchHistorical) && self.defer_once(history.len()) {
                None
            } else {
                Some(ActionKind::SearchHistorical)
            }
        } else if state.reference_price().is_none() {
            if price_attempts(history) < MAX_PRICE_ATTEMPTS {
                Some(ActionKind::InferPrice)
            } else {
                Some(ActionKind::SearchHistorical)
            }
        } else if state.deal_found() {
            if state.inquiry().is_some() {
                None
            } else if last_failed(history, ActionKind::ComposeMessage) && self.defer_once(history.len()) {
                None
            } else {
                Some(ActionKind::ComposeMessage)
            }
        } else if !state.current_poll().is_empty() && !last_failed(history, ActionKind::SelectDeal) {
            Some(ActionKind::SelectDeal)
        } else {
            Some(ActionKind::SearchCurrent)
        };

        debug!(next = ?next, "Rule policy decided");
        Ok(next.map(ActionProposal::bare))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dealwatch_core::listing::Listing;
    use dealwatch_core::state::{ActionOutcome, SessionParams};

    fn state() -> SessionState {
        SessionState::new(SessionParams::new("X"))
    }

    async fn next(policy: &RulePolicy, s: &SessionState) -> Option<ActionKind> {
        policy
            .decide(s, s.history())
            .await
            .unwrap()
            .map(|p| p.name.parse().unwrap())
    }

    fn with_history(s: &mut SessionState) {
        s.set_historical(vec![Listing::new("X", "", 100000.0, "")]);
        s.record(ActionKind::SearchHistorical, ActionOutcome::applied("1"));
    }

    #[tokio::test]
    async fn starts_with_past_sales() {
        assert_eq!(next(&RulePolicy::new(), &state()).await, Some(ActionKind::SearchHistorical));
    }

    #[tokio::test]
    async fn empty_past_sales_defers_once_then_retries() {
        let policy = RulePolicy::new();
        let mut s = state();
        s.record(ActionKind::SearchHistorical, ActionOutcome::no_change("none"));
        assert_eq!(next(&policy, &s).await, None);
        assert_eq!(next(&policy, &s).await, Some(ActionKind::SearchHistorical));
    }

    #[tokio::test]
    async fn infers_price_twice_then_refetches() {
        let policy = RulePolicy::new();
        let mut s = state();
        with_history(&mut s);
        assert_eq!(next(&policy, &s).await, Some(ActionKind::InferPrice));

        s.record(ActionKind::InferPrice, ActionOutcome::no_change("0"));
        assert_eq!(next(&policy, &s).await, Some(ActionKind::InferPrice));

        s.record(ActionKind::InferPrice, ActionOutcome::no_change("0"));
        assert_eq!(next(&policy, &s).await, Some(ActionKind::SearchHistorical));
    }

    #[tokio::test]
    async fn polls_then_selects_new_candidates() {
        let policy = RulePolicy::new();
        let mut s = state();
        with_history(&mut s);
        s.set_reference_price(110000.0);
        assert_eq!(next(&policy, &s).await, Some(ActionKind::SearchCurrent));

        s.set_current_poll(vec![Listing::new("X", "", 95000.0, "")]);
        s.record(ActionKind::SearchCurrent, ActionOutcome::applied("1 new"));
        assert_eq!(next(&policy, &s).await, Some(ActionKind::SelectDeal));

        s.record(ActionKind::SelectDeal, ActionOutcome::no_change("none"));
        assert_eq!(next(&policy, &s).await, Some(ActionKind::SearchCurrent));
    }

    #[tokio::test]
    async fn composes_for_a_deal_and_then_stops() {
        let policy = RulePolicy::new();
        let mut s = state();
        with_history(&mut s);
        s.set_reference_price(110000.0);
        s.select_deal(Listing::new("X", "", 95000.0, ""));
        assert_eq!(next(&policy, &s).await, Some(ActionKind::ComposeMessage));

        s.record(ActionKind::ComposeMessage, ActionOutcome::no_change("empty"));
        assert_eq!(next(&policy, &s).await, None);
        assert_eq!(next(&policy, &s).await, Some(ActionKind::ComposeMessage));

        s.set_inquiry("hello");
        assert_eq!(next(&policy, &s).await, None);
    }
}
