//! Action dispatcher — completes proposal arguments from state and invokes
//! the matching capability.
//!
//! A proposal may omit any argument; absent keys are filled from the session.
//! A key that is present but empty (`null`, `""`, `[]`, `{}`) is kept as-is, so
//! an explicitly empty argument still causes a skip. Capability failures are
//! absorbed into an empty raw result; only an unknown action name is an error.

use dealwatch_core::action::{ActionKind, ActionProposal};
use dealwatch_core::capability::Capabilities;
use dealwatch_core::error::{CapabilityError, DispatchError};
use dealwatch_core::listing::{Listing, parse_price, parse_records};
use dealwatch_core::state::SessionState;
use serde_json::{Map, Value, json};
use std::time::Instant;
use tracing::{debug, warn};

/// Result of a dispatch attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    /// The capability ran; `raw` is its (possibly empty) result.
    Completed {
        action: ActionKind,
        raw: Value,
        duration_ms: u64,
    },
    /// Required arguments were still empty after defaulting. Nothing ran.
    Skipped {
        action: ActionKind,
        missing: Vec<String>,
    },
}

/// How a required argument is checked after defaulting.
#[derive(Clone, Copy)]
enum Required {
    /// Non-blank string.
    Text,
    /// Array with at least one well-formed listing.
    Listings,
    /// Price greater than zero.
    PositivePrice,
    /// Any parseable price.
    Price,
}

impl Required {
    fn satisfied_by(self, value: Option<&Value>) -> bool {
        let Some(value) = value else {
            return false;
        };
        match self {
            Required::Text => value.as_str().is_some_and(|s| !s.trim().is_empty()),
            Required::Listings => value.is_array() && !parse_records(value).is_empty(),
            Required::PositivePrice => parse_price(value).is_some_and(|p| p > 0.0),
            Required::Price => parse_price(value).is_some(),
        }
    }
}

fn required(kind: ActionKind) -> &'static [(&'static str, Required)] {
    match kind {
        ActionKind::SearchHistorical | ActionKind::SearchCurrent => &[("item_name", Required::Text)],
        ActionKind::InferPrice => &[
            ("item_name", Required::Text),
            ("historical_listings", Required::Listings),
        ],
        ActionKind::SelectDeal => &[
            ("item_name", Required::Text),
            ("candidates", Required::Listings),
            ("reference_price", Required::PositivePrice),
        ],
        ActionKind::ComposeMessage => &[("name", Required::Text), ("price", Required::Price)],
    }
}

fn records(listings: &[Listing]) -> Value {
    Value::Array(listings.iter().map(Listing::to_record).collect())
}

/// Fill every absent argument from session state.
fn complete_arguments(kind: ActionKind, mut args: Map<String, Value>, state: &SessionState) -> Map<String, Value> {
    let mut default = |key: &str, value: Value| {
        args.entry(key.to_string()).or_insert(value);
    };

    match kind {
        ActionKind::SearchHistorical => {
            default("item_name", json!(state.item_name()));
        }
        ActionKind::SearchCurrent => {
            default("item_name", json!(state.item_name()));
            if let Some(region) = state.region() {
                default("region", json!(region));
            }
        }
        ActionKind::InferPrice => {
            default("item_name", json!(state.item_name()));
            default("historical_listings", records(state.historical()));
        }
        ActionKind::SelectDeal => {
            default("item_name", json!(state.item_name()));
            default("candidates", records(state.current_poll()));
            default(
                "reference_price",
                state.reference_price().map_or(Value::Null, |p| json!(p)),
            );
        }
        ActionKind::ComposeMessage => {
            if let Some(deal) = state.deal() {
                default("name", json!(deal.name));
                default("description", json!(deal.description));
                default("price", json!(deal.price));
            }
        }
    }

    args
}

fn text<'a>(args: &'a Map<String, Value>, key: &str) -> &'a str {
    args.get(key).and_then(Value::as_str).unwrap_or_default()
}

fn listings(args: &Map<String, Value>, key: &str) -> Vec<Listing> {
    args.get(key).map(parse_records).unwrap_or_default()
}

fn price(args: &Map<String, Value>, key: &str) -> f64 {
    args.get(key).and_then(parse_price).unwrap_or_default()
}

/// Routes proposals to capabilities.
pub struct Dispatcher {
    capabilities: Capabilities,
}

impl Dispatcher {
    pub fn new(capabilities: Capabilities) -> Self {
        Self { capabilities }
    }

    /// Complete, validate and run one proposal against `state`.
    ///
    /// `state` is only read. Merging the result is the reducer's job.
    pub async fn dispatch(
        &self,
        proposal: &ActionProposal,
        state: &SessionState,
    ) -> Result<Dispatch, DispatchError> {
        let kind: ActionKind = proposal.name.parse()?;

        let proposed = match &proposal.arguments {
            Value::Object(map) => map.clone(),
            Value::Null => Map::new(),
            other => {
                return Err(DispatchError::MalformedArguments(format!(
                    "{kind}: expected an object, got {other}"
                )));
            }
        };
        let args = complete_arguments(kind, proposed, state);

        let missing: Vec<String> = required(kind)
            .iter()
            .filter(|(key, check)| !check.satisfied_by(args.get(*key)))
            .map(|(key, _)| key.to_string())
            .collect();
        if !missing.is_empty() {
            warn!(action = %kind, ?missing, "Skipping action: required arguments are empty");
            return Ok(Dispatch::Skipped {
                action: kind,
                missing,
            });
        }

        debug!(action = %kind, "Dispatching");
        let started = Instant::now();
        let raw = match self.invoke(kind, &args).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(action = %kind, error = %e, "Capability failed; treating result as empty");
                empty_result(kind)
            }
        };

        Ok(Dispatch::Completed {
            action: kind,
            raw,
            duration_ms: started.elapsed().as_millis() as u64,
        })
    }

    async fn invoke(&self, kind: ActionKind, args: &Map<String, Value>) -> Result<Value, CapabilityError> {
        let caps = &self.capabilities;
        let item_name = text(args, "item_name");

        match kind {
            ActionKind::SearchHistorical => {
                let found = caps.listings.search_historical(item_name).await?;
                Ok(Value::Array(found))
            }
            ActionKind::SearchCurrent => {
                let region = args.get("region").and_then(Value::as_str).filter(|r| !r.is_empty());
                let found = caps.listings.search_current(item_name, region).await?;
                Ok(Value::Array(found))
            }
            ActionKind::InferPrice => {
                let historical = listings(args, "historical_listings");
                let price = caps.estimator.infer_price(item_name, &historical).await?;
                Ok(json!(price))
            }
            ActionKind::SelectDeal => {
                let candidates = listings(args, "candidates");
                let reference = price(args, "reference_price");
                let pick = caps.selector.select_deal(item_name, &candidates, reference).await?;
                Ok(pick.unwrap_or(Value::Null))
            }
            ActionKind::ComposeMessage => {
                let message = caps
                    .composer
                    .compose_message(text(args, "name"), text(args, "description"), price(args, "price"))
                    .await?;
                Ok(Value::String(message))
            }
        }
    }
}

/// What a failed capability is reduced as.
fn empty_result(kind: ActionKind) -> Value {
    if kind.is_search() {
        Value::Array(Vec::new())
    } else {
        Value::Null
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{MockCapabilities, listing};
    use dealwatch_core::state::SessionParams;

    fn state() -> SessionState {
        SessionState::new(SessionParams::new("X").with_region("Seoul"))
    }

    #[tokio::test]
    async fn unknown_action_is_an_error() {
        let mock = MockCapabilities::default();
        let dispatcher = Dispatcher::new(mock.capabilities());
        let err = dispatcher
            .dispatch(&ActionProposal::new("buy_now", json!({})), &state())
            .await
            .unwrap_err();
        assert_eq!(err, DispatchError::UnknownAction("buy_now".into()));
    }

    #[tokio::test]
    async fn non_object_arguments_are_rejected() {
        let mock = MockCapabilities::default();
        let dispatcher = Dispatcher::new(mock.capabilities());
        let err = dispatcher
            .dispatch(&ActionProposal::new("search_current", json!([1, 2])), &state())
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::MalformedArguments(_)));
    }

    #[tokio::test]
    async fn search_defaults_item_and_region_from_state() {
        let mock = MockCapabilities::default();
        mock.push_current(vec![listing("X", 95000.0).to_record()]);
        let dispatcher = Dispatcher::new(mock.capabilities());

        let result = dispatcher
            .dispatch(&ActionProposal::bare(ActionKind::SearchCurrent), &state())
            .await
            .unwrap();

        let Dispatch::Completed { action, raw, .. } = result else {
            panic!("expected completion");
        };
        assert_eq!(action, ActionKind::SearchCurrent);
        assert_eq!(raw.as_array().unwrap().len(), 1);
        assert_eq!(mock.calls(), vec!["search_current:X:Seoul".to_string()]);
    }

    #[tokio::test]
    async fn proposed_arguments_win_over_defaults() {
        let mock = MockCapabilities::default();
        mock.push_current(vec![]);
        let dispatcher = Dispatcher::new(mock.capabilities());

        dispatcher
            .dispatch(
                &ActionProposal::new("search_current", json!({"item_name": "Y", "region": "Busan"})),
                &state(),
            )
            .await
            .unwrap();
        assert_eq!(mock.calls(), vec!["search_current:Y:Busan".to_string()]);
    }

    #[tokio::test]
    async fn infer_price_without_history_is_skipped() {
        let mock = MockCapabilities::default();
        let dispatcher = Dispatcher::new(mock.capabilities());

        let result = dispatcher
            .dispatch(&ActionProposal::bare(ActionKind::InferPrice), &state())
            .await
            .unwrap();
        assert_eq!(
            result,
            Dispatch::Skipped {
                action: ActionKind::InferPrice,
                missing: vec!["historical_listings".into()],
            }
        );
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn explicit_empty_candidates_are_not_defaulted() {
        let mock = MockCapabilities::default();
        let dispatcher = Dispatcher::new(mock.capabilities());
        let mut s = state();
        s.set_reference_price(110000.0);
        s.set_current_poll(vec![listing("X", 95000.0)]);

        let result = dispatcher
            .dispatch(&ActionProposal::new("select_deal", json!({"candidates": []})), &s)
            .await
            .unwrap();
        assert!(matches!(result, Dispatch::Skipped { ref missing, .. } if missing == &["candidates"]));
    }

    #[tokio::test]
    async fn select_deal_requires_reference_price() {
        let mock = MockCapabilities::default();
        let dispatcher = Dispatcher::new(mock.capabilities());
        let mut s = state();
        s.set_current_poll(vec![listing("X", 95000.0)]);

        let result = dispatcher
            .dispatch(&ActionProposal::bare(ActionKind::SelectDeal), &s)
            .await
            .unwrap();
        assert!(matches!(result, Dispatch::Skipped { ref missing, .. } if missing == &["reference_price"]));
    }

    #[tokio::test]
    async fn compose_defaults_from_selected_deal() {
        let mock = MockCapabilities::default();
        mock.push_message("Is this still available?");
        let dispatcher = Dispatcher::new(mock.capabilities());
        let mut s = state();
        s.select_deal(Listing::new("X", "mint", 95000.0, "u"));

        let result = dispatcher
            .dispatch(&ActionProposal::bare(ActionKind::ComposeMessage), &s)
            .await
            .unwrap();
        assert!(matches!(result, Dispatch::Completed { ref raw, .. } if raw == "Is this still available?"));
        assert_eq!(mock.calls(), vec!["compose_message:X:mint:95000".to_string()]);
    }

    #[tokio::test]
    async fn compose_without_deal_is_skipped() {
        let mock = MockCapabilities::default();
        let dispatcher = Dispatcher::new(mock.capabilities());
        let result = dispatcher
            .dispatch(&ActionProposal::bare(ActionKind::ComposeMessage), &state())
            .await
            .unwrap();
        assert!(matches!(result, Dispatch::Skipped { ref missing, .. } if missing.len() == 2));
    }

    #[tokio::test]
    async fn capability_failure_becomes_empty_result() {
        let mock = MockCapabilities::default();
        mock.fail_next_search();
        let dispatcher = Dispatcher::new(mock.capabilities());

        let result = dispatcher
            .dispatch(&ActionProposal::bare(ActionKind::SearchHistorical), &state())
            .await
            .unwrap();
        assert!(matches!(result, Dispatch::Completed { ref raw, .. } if raw == &json!([])));
    }

    #[tokio::test]
    async fn skip_leaves_state_untouched() {
        let mock = MockCapabilities::default();
        let dispatcher = Dispatcher::new(mock.capabilities());
        let s = state();
        let before = s.clone();
        dispatcher
            .dispatch(&ActionProposal::bare(ActionKind::SelectDeal), &s)
            .await
            .unwrap();
        assert_eq!(s, before);
    }
}
