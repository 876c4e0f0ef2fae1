//! Action vocabulary shared by policies, the dispatcher and the reducer.
//!
//! Policies speak in names (an LLM policy emits tool-call names verbatim), so
//! an [`ActionProposal`] carries a free-form name. The dispatcher resolves it
//! to a closed [`ActionKind`]; anything it cannot resolve is a contract
//! violation.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::DispatchError;
use crate::provider::ToolDefinition;

/// The closed set of actions the core knows how to dispatch and reduce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Fetch past (sold) listings; feeds price inference only.
    SearchHistorical,
    /// Fetch listings currently for sale; feeds deal selection.
    SearchCurrent,
    /// Estimate a reference price from historical listings.
    InferPrice,
    /// Pick one candidate from the current poll.
    SelectDeal,
    /// Draft an inquiry message for the selected deal.
    ComposeMessage,
}

impl ActionKind {
    pub const ALL: [ActionKind; 5] = [
        ActionKind::SearchHistorical,
        ActionKind::SearchCurrent,
        ActionKind::InferPrice,
        ActionKind::SelectDeal,
        ActionKind::ComposeMessage,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ActionKind::SearchHistorical => "search_historical",
            ActionKind::SearchCurrent => "search_current",
            ActionKind::InferPrice => "infer_price",
            ActionKind::SelectDeal => "select_deal",
            ActionKind::ComposeMessage => "compose_message",
        }
    }

    /// Whether a completed dispatch of this action counts against the poll budget.
    pub fn is_search(self) -> bool {
        matches!(self, ActionKind::SearchHistorical | ActionKind::SearchCurrent)
    }

    /// Description sent to tool-calling policies.
    pub fn description(self) -> &'static str {
        match self {
            ActionKind::SearchHistorical => {
                "Fetch completed past sales for the target item across all regions. \
                 Only useful once, at the start; the data is used for price estimation."
            }
            ActionKind::SearchCurrent => {
                "Fetch listings currently for sale in the target region. Only listings not \
                 seen in earlier polls are kept. Call repeatedly while no new listing has appeared."
            }
            ActionKind::InferPrice => {
                "Estimate a fair reference price from the historical listings. \
                 Not needed again once a reference price is set."
            }
            ActionKind::SelectDeal => {
                "Choose the single best new listing at or below the reference price. \
                 Only useful when new listings were found in the last poll."
            }
            ActionKind::ComposeMessage => {
                "Draft a polite purchase inquiry for the selected deal. \
                 Only useful once a deal has been selected."
            }
        }
    }

    /// JSON Schema of the arguments. Every argument is optional for the
    /// caller; missing ones are filled from session state before dispatch.
    pub fn parameters_schema(self) -> serde_json::Value {
        let listing_array = serde_json::json!({
            "type": "array",
            "items": {
                "type": "object",
                "properties": {
                    "name": { "type": "string" },
                    "description": { "type": "string" },
                    "price": { "type": "number" },
                    "url": { "type": "string" }
                },
                "required": ["name", "price"]
            }
        });

        let properties = match self {
            ActionKind::SearchHistorical => serde_json::json!({
                "item_name": { "type": "string", "description": "Product to search for" }
            }),
            ActionKind::SearchCurrent => serde_json::json!({
                "item_name": { "type": "string", "description": "Product to search for" },
                "region": { "type": "string", "description": "Region filter" }
            }),
            ActionKind::InferPrice => serde_json::json!({
                "item_name": { "type": "string" },
                "historical_listings": listing_array
            }),
            ActionKind::SelectDeal => serde_json::json!({
                "item_name": { "type": "string" },
                "candidates": listing_array,
                "reference_price": { "type": "number" }
            }),
            ActionKind::ComposeMessage => serde_json::json!({
                "name": { "type": "string" },
                "description": { "type": "string" },
                "price": { "type": "number" }
            }),
        };

        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": []
        })
    }

    pub fn to_definition(self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }

    /// Tool definitions for every known action.
    pub fn definitions() -> Vec<ToolDefinition> {
        Self::ALL.iter().map(|k| k.to_definition()).collect()
    }
}

impl FromStr for ActionKind {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.name() == s)
            .ok_or_else(|| DispatchError::UnknownAction(s.to_string()))
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// What a policy asks the dispatcher to do.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionProposal {
    /// Action name, resolved against [`ActionKind`] at dispatch time.
    pub name: String,

    /// Proposed arguments (a JSON object; absent keys are defaulted from state).
    #[serde(default = "empty_object")]
    pub arguments: serde_json::Value,
}

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

impl ActionProposal {
    pub fn new(name: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }

    /// A proposal with no arguments; everything is filled from state.
    pub fn bare(kind: ActionKind) -> Self {
        Self::new(kind.name(), empty_object())
    }
}
