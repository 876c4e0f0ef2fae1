//! Tool-calling policy backed by a language model.
//!
//! The model sees a system prompt, a JSON summary of the session and the
//! names of the actions already run, and answers with a tool call. Only the
//! first call is used; the loop dispatches one action at a time.

use async_trait::async_trait;
use dealwatch_core::action::{ActionKind, ActionProposal};
use dealwatch_core::error::PolicyError;
use dealwatch_core::policy::Policy;
use dealwatch_core::provider::{Provider, ProviderRequest};
use dealwatch_core::state::{HistoryEntry, SessionState};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{debug, info};

const SYSTEM_PROMPT: &str = "\
You are a purchasing agent watching a second-hand marketplace on behalf of a user. \
Your goals:
1. Research past sales of the product to establish a fair price.
2. Poll the market periodically for newly listed items.
3. Find a listing worth buying against the fair price and draft an inquiry to the seller.

Tool guide (avoid repeating work):
- search_historical: fetch past sales once. Not worth calling again once past sales are loaded.
- infer_price: set the reference price. Not needed once a reference price exists.
- search_current: check for new listings. Keep calling it while no new listings are found.
- select_deal: when new listings exist, look for one worth buying at the reference price.
- compose_message: when a deal exists, draft the inquiry. This completes the goal.

Always consult the state summary and pick the tool that creates new value now.
Reply with a tool call only.";

/// Policy that asks a model which action comes next.
pub struct LlmPolicy {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
}

impl LlmPolicy {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>, temperature: f32) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature,
        }
    }

    fn summary(state: &SessionState, history: &[HistoryEntry]) -> Value {
        let previous: Vec<&str> = history.iter().map(|h| h.action.name()).collect();
        let max_polls = match state.max_polls() {
            0 => Value::Null,
            n => json!(n),
        };

        json!({
            "goal": format!("Buy '{}' carefully, on the best terms available", state.item_name()),
            "state_summary": {
                "historical_loaded": !state.historical().is_empty(),
                "historical_count": state.historical().len(),
                "new_listing_count": state.current_poll().len(),
                "reference_price": state.reference_price(),
                "deal_found": state.deal_found(),
                "inquiry_drafted": state.inquiry().is_some(),
                "polls_completed": state.polls_completed(),
                "max_polls": max_polls,
            },
            "previous_actions": if previous.is_empty() { "none".to_string() } else { previous.join(", ") },
            "hint": "Analyse the state and decide the next strategic action before calling a tool.",
        })
    }
}

/// Decode a tool-call argument string. Blank means no arguments.
fn parse_arguments(raw: &str) -> Result<Value, PolicyError> {
    if raw.trim().is_empty() {
        return Ok(json!({}));
    }
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| PolicyError::InvalidProposal(format!("tool arguments are not JSON: {e}")))?;
    if value.is_object() {
        Ok(value)
    } else {
        Err(PolicyError::InvalidProposal(format!(
            "tool arguments must be an object, got {value}"
        )))
    }
}

#[async_trait]
impl Policy for LlmPolicy {
    fn name(&self) -> &str {
        "llm"
    }

    async fn decide(
        &self,
        state: &SessionState,
        history: &[HistoryEntry],
    ) -> Result<Option<ActionProposal>, PolicyError> {
        let request = ProviderRequest::prompt(
            &self.model,
            Some(SYSTEM_PROMPT),
            Self::summary(state, history).to_string(),
            self.temperature,
        )
        .with_tools(ActionKind::definitions());

        let response = self.provider.complete(request).await?;
        let mut calls = response.message.tool_calls.into_iter();

        let Some(call) = calls.next() else {
            info!("Model answered without a tool call");
            return Ok(None);
        };
        let dropped = calls.count();
        if dropped > 0 {
            debug!(dropped, "Ignoring extra tool calls");
        }

        info!(action = %call.name, "Model chose action");
        Ok(Some(ActionProposal::new(call.name, parse_arguments(&call.arguments)?)))
    }
}
