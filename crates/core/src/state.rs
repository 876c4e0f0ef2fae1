//! Session state — the single record threaded through every loop step.
//!
//! Fields are private; the mutators below are the only way to change them and
//! each one preserves an invariant of the session:
//! - `polls_completed` and the seen-fingerprint set only grow
//! - the selected deal and the deal-found flag change together, once
//! - a non-empty inquiry is never overwritten
//! - history is append-only

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;
use uuid::Uuid;

use crate::action::ActionKind;
use crate::fingerprint::Fingerprint;
use crate::listing::Listing;

/// Unique identifier for one monitoring session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Session-constant parameters, taken from the CLI / config at start-up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionParams {
    /// Product to monitor.
    pub item_name: String,

    /// Delay between polls that found nothing new.
    pub poll_seconds: u64,

    /// Maximum completed searches (0 = unbounded).
    pub max_polls: u32,

    /// Region filter for current-market searches.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

impl SessionParams {
    pub fn new(item_name: impl Into<String>) -> Self {
        Self {
            item_name: item_name.into(),
            poll_seconds: 10,
            max_polls: 120,
            region: None,
        }
    }

    pub fn with_poll_seconds(mut self, secs: u64) -> Self {
        self.poll_seconds = secs;
        self
    }

    pub fn with_max_polls(mut self, max: u32) -> Self {
        self.max_polls = max;
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }
}

/// How a completed action affected the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ActionOutcome {
    /// The result was merged into state.
    Applied { detail: String },
    /// The action ran but its result changed nothing (empty, malformed, rejected).
    NoChange { reason: String },
}

impl ActionOutcome {
    pub fn applied(detail: impl Into<String>) -> Self {
        Self::Applied {
            detail: detail.into(),
        }
    }

    pub fn no_change(reason: impl Into<String>) -> Self {
        Self::NoChange {
            reason: reason.into(),
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

/// One completed action in the session history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub action: ActionKind,
    pub outcome: ActionOutcome,
    pub timestamp: DateTime<Utc>,
}

/// The mutable record for one monitoring session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    id: SessionId,
    params: SessionParams,
    historical: Vec<Listing>,
    reference_price: Option<f64>,
    current_poll: Vec<Listing>,
    seen: HashSet<Fingerprint>,
    deal: Option<Listing>,
    inquiry: Option<String>,
    polls_completed: u32,
    history: Vec<HistoryEntry>,
}

impl SessionState {
    pub fn new(params: SessionParams) -> Self {
        Self {
            id: SessionId::new(),
            params,
            historical: Vec::new(),
            reference_price: None,
            current_poll: Vec::new(),
            seen: HashSet::new(),
            deal: None,
            inquiry: None,
            polls_completed: 0,
            history: Vec::new(),
        }
    }

    // ── Read access ─────────────────────────────────────────────────────

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn params(&self) -> &SessionParams {
        &self.params
    }

    pub fn item_name(&self) -> &str {
        &self.params.item_name
    }

    pub fn region(&self) -> Option<&str> {
        self.params.region.as_deref()
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.params.poll_seconds)
    }

    pub fn max_polls(&self) -> u32 {
        self.params.max_polls
    }

    pub fn historical(&self) -> &[Listing] {
        &self.historical
    }

    /// The inferred fair price, if one has been set.
    pub fn reference_price(&self) -> Option<f64> {
        self.reference_price
    }

    pub fn current_poll(&self) -> &[Listing] {
        &self.current_poll
    }

    pub fn has_seen(&self, fingerprint: &Fingerprint) -> bool {
        self.seen.contains(fingerprint)
    }

    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }

    pub fn deal(&self) -> Option<&Listing> {
        self.deal.as_ref()
    }

    pub fn deal_found(&self) -> bool {
        self.deal.is_some()
    }

    pub fn inquiry(&self) -> Option<&str> {
        self.inquiry.as_deref()
    }

    pub fn polls_completed(&self) -> u32 {
        self.polls_completed
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn last_action(&self) -> Option<&HistoryEntry> {
        self.history.last()
    }

    // ── Mutators ────────────────────────────────────────────────────────

    /// Replace the historical listing set.
    pub fn set_historical(&mut self, listings: Vec<Listing>) {
        self.historical = listings;
    }

    /// Count one completed search against the poll budget.
    pub fn complete_poll(&mut self) {
        self.polls_completed = self.polls_completed.saturating_add(1);
    }

    /// Insert a fingerprint; returns `true` if it was not seen before.
    pub fn mark_seen(&mut self, fingerprint: Fingerprint) -> bool {
        self.seen.insert(fingerprint)
    }

    /// Replace the current-poll set. Callers pass only unseen listings.
    pub fn set_current_poll(&mut self, listings: Vec<Listing>) {
        self.current_poll = listings;
    }

    /// Set (or re-estimate) the reference price. Zero, negative and
    /// non-finite values mean "could not infer" and are refused.
    pub fn set_reference_price(&mut self, price: f64) -> bool {
        if price.is_finite() && price > 0.0 {
            self.reference_price = Some(price);
            true
        } else {
            false
        }
    }

    /// Record the selected deal and consume the current deal cycle.
    ///
    /// Refused if a deal is already held: once found, it stays.
    pub fn select_deal(&mut self, listing: Listing) -> bool {
        if self.deal.is_some() {
            return false;
        }
        self.deal = Some(listing);
        self.current_poll.clear();
        true
    }

    /// Store the drafted inquiry. Refused when `text` is blank or an inquiry
    /// already exists.
    pub fn set_inquiry(&mut self, text: impl Into<String>) -> bool {
        let text = text.into();
        if text.trim().is_empty() || self.inquiry.is_some() {
            return false;
        }
        self.inquiry = Some(text);
        true
    }

    /// Append a completed action to the history.
    pub fn record(&mut self, action: ActionKind, outcome: ActionOutcome) {
        self.history.push(HistoryEntry {
            action,
            outcome,
            timestamp: Utc::now(),
        });
    }
}
