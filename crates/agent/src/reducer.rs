//! Observation reducer — merges a dispatched action's raw result into state.
//!
//! One merge function per [`ActionKind`]. Every reduction appends exactly one
//! history entry. Malformed records are dropped one by one; a result with
//! nothing usable is a no-change outcome, never an error.

use dealwatch_core::action::ActionKind;
use dealwatch_core::listing::{Listing, parse_price, parse_records};
use dealwatch_core::state::{ActionOutcome, SessionState};
use serde_json::Value;
use tracing::{debug, info, warn};

/// Applies per-action merge rules.
#[derive(Debug, Clone)]
pub struct Reducer {
    /// Reject selected listings priced above the reference price.
    enforce_price_ceiling: bool,
}

impl Default for Reducer {
    fn default() -> Self {
        Self {
            enforce_price_ceiling: true,
        }
    }
}

impl Reducer {
    pub fn new(enforce_price_ceiling: bool) -> Self {
        Self {
            enforce_price_ceiling,
        }
    }

    /// Merge `raw` into `state` and record the outcome in its history.
    pub fn reduce(&self, action: ActionKind, raw: &Value, state: &mut SessionState) -> ActionOutcome {
        let outcome = match action {
            ActionKind::SearchHistorical => reduce_historical(raw, state),
            ActionKind::SearchCurrent => reduce_current(raw, state),
            ActionKind::InferPrice => reduce_price(raw, state),
            ActionKind::SelectDeal => self.reduce_selection(raw, state),
            ActionKind::ComposeMessage => reduce_message(raw, state),
        };
        debug!(%action, ?outcome, polls = state.polls_completed(), "Reduced observation");
        state.record(action, outcome.clone());
        outcome
    }

    fn reduce_selection(&self, raw: &Value, state: &mut SessionState) -> ActionOutcome {
        if state.deal_found() {
            return ActionOutcome::no_change("a deal is already selected");
        }

        let Some(listing) = Listing::from_record(raw) else {
            info!("No deal in this round");
            return ActionOutcome::no_change("no listing selected");
        };

        if self.enforce_price_ceiling
            && let Some(reference) = state.reference_price()
            && listing.price > reference
        {
            warn!(
                price = listing.price,
                reference, "Selected listing is above the reference price; rejected"
            );
            return ActionOutcome::no_change(format!(
                "{} is above the reference price {reference}",
                listing.price
            ));
        }

        info!(name = %listing.name, price = listing.price, "Deal selected");
        let detail = format!("{} at {}", listing.name, listing.price);
        state.select_deal(listing);
        ActionOutcome::applied(detail)
    }
}

fn reduce_historical(raw: &Value, state: &mut SessionState) -> ActionOutcome {
    let listings = parse_records(raw);
    let count = listings.len();
    state.set_historical(listings);
    state.complete_poll();

    info!(count, "Past sales loaded");
    if count == 0 {
        ActionOutcome::no_change("no past sales found")
    } else {
        ActionOutcome::applied(format!("{count} past sales"))
    }
}

fn reduce_current(raw: &Value, state: &mut SessionState) -> ActionOutcome {
    let fetched = parse_records(raw);
    let total = fetched.len();
    let fresh: Vec<Listing> = fetched
        .into_iter()
        .filter(|l| state.mark_seen(l.fingerprint()))
        .collect();
    let count = fresh.len();
    state.set_current_poll(fresh);
    state.complete_poll();

    info!(total, new = count, "Current listings polled");
    if count == 0 {
        ActionOutcome::no_change(format!("no new listings among {total}"))
    } else {
        ActionOutcome::applied(format!("{count} new listings"))
    }
}

fn reduce_price(raw: &Value, state: &mut SessionState) -> ActionOutcome {
    match parse_price(raw) {
        Some(price) if state.set_reference_price(price) => {
            info!(price, "Reference price set");
            ActionOutcome::applied(format!("reference price {price}"))
        }
        _ => {
            warn!(result = %raw, "Price inference failed");
            ActionOutcome::no_change("price could not be inferred")
        }
    }
}

fn reduce_message(raw: &Value, state: &mut SessionState) -> ActionOutcome {
    let text = raw.as_str().map(str::trim).unwrap_or_default();
    if text.is_empty() {
        warn!("Inquiry composition returned nothing");
        return ActionOutcome::no_change("empty inquiry");
    }
    if !state.set_inquiry(text) {
        return ActionOutcome::no_change("an inquiry is already drafted");
    }
    info!(chars = text.len(), "Inquiry drafted");
    ActionOutcome::applied("inquiry drafted")
}
